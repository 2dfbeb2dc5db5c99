use async_trait::async_trait;
use sqlx::{PgConnection, Postgres, QueryBuilder};

use crate::database::{
    error::QueryError,
    schema::{Id, Recipe, RecipeRow, Taxonomy},
    store::{RecipeDraft, RecipeFilter, RecipePatch, RecipeStore},
};

use super::{taxonomy, PgStore};

/// Attaches tags and ingredients to already fetched rows.
async fn with_items<'c, E>(executor: E, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>, QueryError>
where
    E: sqlx::Executor<'c, Database = Postgres> + Copy,
{
    let ids: Vec<Id> = rows.iter().map(|row| row.id).collect();
    let mut tags = taxonomy::linked_items(executor, Taxonomy::Tag, &ids).await?;
    let mut ingredients = taxonomy::linked_items(executor, Taxonomy::Ingredient, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let tags = tags.remove(&row.id).unwrap_or_default();
            let ingredients = ingredients.remove(&row.id).unwrap_or_default();
            Recipe::from_row(row, tags, ingredients)
        })
        .collect())
}

async fn load_recipe(
    conn: &mut PgConnection,
    owner: Id,
    id: Id,
) -> Result<Option<Recipe>, QueryError> {
    let row: Option<RecipeRow> =
        sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let mut tags = taxonomy::linked_items(&mut *conn, Taxonomy::Tag, &[id]).await?;
    let mut ingredients = taxonomy::linked_items(&mut *conn, Taxonomy::Ingredient, &[id]).await?;

    Ok(Some(Recipe::from_row(
        row,
        tags.remove(&id).unwrap_or_default(),
        ingredients.remove(&id).unwrap_or_default(),
    )))
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn list_recipes(
        &self,
        owner: Id,
        filter: &RecipeFilter,
    ) -> Result<Vec<Recipe>, QueryError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT r.* FROM recipes r WHERE r.user_id = ");
        query.push_bind(owner);

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            if let Some(ids) = filter.ids(kind) {
                query
                    .push(format!(
                        " AND r.id IN (SELECT recipe_id FROM {} WHERE {} = ANY(",
                        kind.link_table(),
                        kind.link_column()
                    ))
                    .push_bind(ids.to_owned())
                    .push("))");
            }
        }
        query.push(" ORDER BY r.id DESC");

        let rows: Vec<RecipeRow> = query.build_query_as().fetch_all(self.pool()).await?;

        with_items(self.pool(), rows).await
    }

    async fn get_recipe(&self, owner: Id, id: Id) -> Result<Option<Recipe>, QueryError> {
        let mut conn = self.pool().acquire().await?;
        load_recipe(&mut conn, owner, id).await
    }

    async fn create_recipe(&self, owner: Id, draft: RecipeDraft) -> Result<Recipe, QueryError> {
        let mut tr = self.pool().begin().await?;

        let row: (Id,) = sqlx::query_as(
            "
            INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
        ",
        )
        .bind(owner)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.time_minutes)
        .bind(draft.price)
        .bind(&draft.link)
        .fetch_one(&mut *tr)
        .await?;
        let id = row.0;

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            taxonomy::attach(&mut tr, kind, owner, id, draft.names(kind)).await?;
        }

        let recipe = load_recipe(&mut tr, owner, id)
            .await?
            .ok_or(QueryError::Vanished { entity: "recipe", id })?;

        tr.commit().await?;
        log::info!("Created recipe {id} for user {owner}");
        Ok(recipe)
    }

    async fn update_recipe(
        &self,
        owner: Id,
        id: Id,
        patch: RecipePatch,
    ) -> Result<Option<Recipe>, QueryError> {
        let mut tr = self.pool().begin().await?;

        let locked: Option<(Id,)> =
            sqlx::query_as("SELECT id FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tr)
                .await?;
        if locked.is_none() {
            return Ok(None);
        }

        let RecipePatch {
            title,
            description,
            time_minutes,
            price,
            link,
            ..
        } = patch.clone();

        if title.is_some()
            || description.is_some()
            || time_minutes.is_some()
            || price.is_some()
            || link.is_some()
        {
            let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE recipes SET ");
            let mut columns = query.separated(", ");
            if let Some(title) = title {
                columns.push("title = ").push_bind_unseparated(title);
            }
            if let Some(description) = description {
                columns.push("description = ").push_bind_unseparated(description);
            }
            if let Some(time_minutes) = time_minutes {
                columns.push("time_minutes = ").push_bind_unseparated(time_minutes);
            }
            if let Some(price) = price {
                columns.push("price = ").push_bind_unseparated(price);
            }
            if let Some(link) = link {
                columns.push("link = ").push_bind_unseparated(link);
            }
            query
                .push(" WHERE id = ")
                .push_bind(id)
                .push(" AND user_id = ")
                .push_bind(owner);

            query.build().execute(&mut *tr).await?;
        }

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            if let Some(names) = patch.names(kind) {
                taxonomy::detach_all(&mut tr, kind, id).await?;
                taxonomy::attach(&mut tr, kind, owner, id, names).await?;
            }
        }

        let recipe = load_recipe(&mut tr, owner, id).await?;
        tr.commit().await?;
        Ok(recipe)
    }

    async fn delete_recipe(&self, owner: Id, id: Id) -> Result<bool, QueryError> {
        let mut tr = self.pool().begin().await?;

        let owned: Option<(Id,)> =
            sqlx::query_as("SELECT id FROM recipes WHERE id = $1 AND user_id = $2 FOR UPDATE")
                .bind(id)
                .bind(owner)
                .fetch_optional(&mut *tr)
                .await?;
        if owned.is_none() {
            return Ok(false);
        }

        for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
            taxonomy::detach_all(&mut tr, kind, id).await?;
        }

        sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&mut *tr)
            .await?;

        tr.commit().await?;
        Ok(true)
    }

    async fn set_recipe_image(
        &self,
        owner: Id,
        id: Id,
        path: &str,
    ) -> Result<Option<Recipe>, QueryError> {
        let updated: Option<(Id,)> =
            sqlx::query_as("UPDATE recipes SET image = $1 WHERE id = $2 AND user_id = $3 RETURNING id")
                .bind(path)
                .bind(id)
                .bind(owner)
                .fetch_optional(self.pool())
                .await?;

        if updated.is_none() {
            return Ok(None);
        }

        self.get_recipe(owner, id).await
    }
}
