use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use crate::database::{
    error::QueryError,
    schema::{Id, LinkedItem, Taxonomy, TaxonomyItem},
    store::{unique_names, TaxonomyStore},
};

use super::PgStore;

/// Returns the oldest row of `kind` named exactly `name` for `owner`, creating
/// it when absent.
pub(super) async fn get_or_create(
    conn: &mut PgConnection,
    kind: Taxonomy,
    owner: Id,
    name: &str,
) -> Result<TaxonomyItem, QueryError> {
    let table = kind.table();

    let existing: Option<TaxonomyItem> = sqlx::query_as(&format!(
        "SELECT id, name, user_id FROM {table} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1"
    ))
    .bind(owner)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(item) = existing {
        return Ok(item);
    }

    let created: TaxonomyItem = sqlx::query_as(&format!(
        "INSERT INTO {table} (name, user_id) VALUES ($1, $2) RETURNING id, name, user_id"
    ))
    .bind(name)
    .bind(owner)
    .fetch_one(&mut *conn)
    .await?;

    Ok(created)
}

/// Resolves each name with get-or-create and links it to the recipe.
pub(super) async fn attach(
    conn: &mut PgConnection,
    kind: Taxonomy,
    owner: Id,
    recipe_id: Id,
    names: &[String],
) -> Result<(), QueryError> {
    let (link_table, link_column) = (kind.link_table(), kind.link_column());

    for name in unique_names(names) {
        let item = get_or_create(conn, kind, owner, name).await?;

        sqlx::query(&format!(
            "INSERT INTO {link_table} (recipe_id, {link_column}) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        ))
        .bind(recipe_id)
        .bind(item.id)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub(super) async fn detach_all(
    conn: &mut PgConnection,
    kind: Taxonomy,
    recipe_id: Id,
) -> Result<(), QueryError> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Loads the linked items of every given recipe, grouped by recipe id.
pub(super) async fn linked_items<'c, E>(
    executor: E,
    kind: Taxonomy,
    recipe_ids: &[Id],
) -> Result<HashMap<Id, Vec<TaxonomyItem>>, QueryError>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let mut grouped: HashMap<Id, Vec<TaxonomyItem>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(grouped);
    }

    let rows: Vec<LinkedItem> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.user_id AS user_id
        FROM {link_table} l
        INNER JOIN {table} t ON t.id = l.{link_column}
        WHERE l.recipe_id = ANY($1)
        ORDER BY t.id
    ",
        link_table = kind.link_table(),
        table = kind.table(),
        link_column = kind.link_column(),
    ))
    .bind(recipe_ids)
    .fetch_all(executor)
    .await?;

    rows.into_iter().for_each(|row| {
        grouped.entry(row.recipe_id).or_default().push(row.into());
    });

    Ok(grouped)
}

async fn fetch_item(
    pool: &Pool<Postgres>,
    kind: Taxonomy,
    owner: Id,
    id: Id,
) -> Result<Option<TaxonomyItem>, QueryError> {
    let row: Option<TaxonomyItem> = sqlx::query_as(&format!(
        "SELECT id, name, user_id FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(owner)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

#[async_trait]
impl TaxonomyStore for PgStore {
    async fn list_items(
        &self,
        kind: Taxonomy,
        owner: Id,
        assigned_only: bool,
    ) -> Result<Vec<TaxonomyItem>, QueryError> {
        let table = kind.table();
        let sql = if assigned_only {
            format!(
                "
                SELECT DISTINCT t.id, t.name, t.user_id
                FROM {table} t
                INNER JOIN {link_table} l ON l.{link_column} = t.id
                WHERE t.user_id = $1
                ORDER BY t.name DESC, t.id DESC
            ",
                link_table = kind.link_table(),
                link_column = kind.link_column(),
            )
        } else {
            format!(
                "SELECT id, name, user_id FROM {table} WHERE user_id = $1 ORDER BY name DESC, id DESC"
            )
        };

        let rows: Vec<TaxonomyItem> = sqlx::query_as(&sql)
            .bind(owner)
            .fetch_all(self.pool())
            .await?;

        Ok(rows)
    }

    async fn get_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
    ) -> Result<Option<TaxonomyItem>, QueryError> {
        fetch_item(self.pool(), kind, owner, id).await
    }

    async fn rename_item(
        &self,
        kind: Taxonomy,
        owner: Id,
        id: Id,
        name: &str,
    ) -> Result<Option<TaxonomyItem>, QueryError> {
        let row: Option<TaxonomyItem> = sqlx::query_as(&format!(
            "UPDATE {} SET name = $1 WHERE id = $2 AND user_id = $3 RETURNING id, name, user_id",
            kind.table()
        ))
        .bind(name)
        .bind(id)
        .bind(owner)
        .fetch_optional(self.pool())
        .await?;

        Ok(row)
    }

    async fn delete_item(&self, kind: Taxonomy, owner: Id, id: Id) -> Result<bool, QueryError> {
        let mut tr = self.pool().begin().await?;

        sqlx::query(&format!(
            "DELETE FROM {link_table} WHERE {link_column} IN (SELECT id FROM {table} WHERE id = $1 AND user_id = $2)",
            link_table = kind.link_table(),
            link_column = kind.link_column(),
            table = kind.table(),
        ))
        .bind(id)
        .bind(owner)
        .execute(&mut *tr)
        .await?;

        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE id = $1 AND user_id = $2",
            kind.table()
        ))
        .bind(id)
        .bind(owner)
        .execute(&mut *tr)
        .await?;

        tr.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
