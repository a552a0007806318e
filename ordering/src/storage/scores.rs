use crate::error::Result;
use crate::model::{ModelId, Score};
use crate::storage::base::{BaseRepository, Persistable};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

impl Persistable for Score {
    fn get_table_name() -> &'static str {
        "scores"
    }

    fn get_entity_name() -> &'static str {
        "Score"
    }

    fn get_select_columns() -> &'static str {
        "id, payment_amount::float8 AS payment_amount, payment_token, created_at"
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Score {
            id: row.try_get("id")?,
            payment_amount: row.try_get("payment_amount")?,
            payment_token: row.try_get("payment_token")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Read access to payment records.
#[async_trait]
pub trait ScoresStorage: Send + Sync {
    async fn get_by_id(&self, id: ModelId) -> Result<Score>;
}

#[derive(Clone)]
pub struct ProdScoresStorage {
    pool: PgPool,
    repository: BaseRepository<Score>,
}

impl ProdScoresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            repository: BaseRepository::new(),
        }
    }
}

#[async_trait]
impl ScoresStorage for ProdScoresStorage {
    async fn get_by_id(&self, id: ModelId) -> Result<Score> {
        let mut conn = self.pool.acquire().await?;
        self.repository.select_by_id(&mut conn, id).await
    }
}
