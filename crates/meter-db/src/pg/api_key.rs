//! PostgreSQL API key repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::ApiKeyRow;
use crate::repo::ApiKeyRepository;

/// PostgreSQL API key repository
#[derive(Clone)]
pub struct PgApiKeyRepository {
    pool: PgPool,
}

impl PgApiKeyRepository {
    /// Create a new API key repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ApiKeyRepository for PgApiKeyRepository {
    async fn find_by_key_hash(&self, key_hash: &str) -> DbResult<Option<ApiKeyRow>> {
        let key = sqlx::query_as::<_, ApiKeyRow>(
            r#"
            SELECT id, org_id, key_hash
            FROM api_keys
            WHERE key_hash = $1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(key)
    }
}
