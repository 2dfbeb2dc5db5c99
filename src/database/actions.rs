mod recipes;
mod taxonomy;
mod users;

use sqlx::{Pool, Postgres};

/// PostgreSQL backed storage. Implements every store trait; writes touching
/// more than one row run inside a single transaction.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}
