use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::database::{
    error::QueryError,
    schema::{Id, User},
    store::{NewUser, UserChanges, UserStore},
};

use super::PgStore;

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, QueryError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, name, password, is_active, is_staff, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
        ",
        )
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .fetch_one(self.pool())
        .await
        .map_err(QueryError::unique("user with this email"))?;

        Ok(row)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, QueryError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    async fn get_user_by_id(&self, id: Id) -> Result<Option<User>, QueryError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }

    async fn update_user(&self, id: Id, changes: UserChanges) -> Result<Option<User>, QueryError> {
        if changes.is_empty() {
            return self.get_user_by_id(id).await;
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut columns = query.separated(", ");
        if let Some(name) = changes.name {
            columns.push("name = ").push_bind_unseparated(name);
        }
        if let Some(password) = changes.password_hash {
            columns.push("password = ").push_bind_unseparated(password);
        }
        query.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        let row: Option<User> = query
            .build_query_as()
            .fetch_optional(self.pool())
            .await?;

        Ok(row)
    }
}
