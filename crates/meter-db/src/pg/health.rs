//! PostgreSQL liveness probe

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::repo::StoreHealth;

/// Pings the pool with a trivial query
#[derive(Clone)]
pub struct PgStoreHealth {
    pool: PgPool,
}

impl PgStoreHealth {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StoreHealth for PgStoreHealth {
    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
