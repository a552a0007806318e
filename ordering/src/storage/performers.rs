use crate::error::Result;
use crate::model::{ModelId, NewPerformer, Performer};
use crate::storage::base::{BaseRepository, ColumnValue, Persistable};
use crate::ui_model::Filter;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};

impl Persistable for Performer {
    fn get_table_name() -> &'static str {
        "performers"
    }

    fn get_entity_name() -> &'static str {
        "Performer"
    }

    fn get_select_columns() -> &'static str {
        "id, performer_id, order_id, start_time, end_time"
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(Performer {
            id: row.try_get("id")?,
            performer_id: row.try_get("performer_id")?,
            order_id: row.try_get("order_id")?,
            start_time: row.try_get("start_time")?,
            end_time: row.try_get("end_time")?,
        })
    }
}

#[async_trait]
pub trait PerformersStorage: Send + Sync {
    async fn get_all(&self, filter: &Filter) -> Result<Vec<Performer>>;

    /// Starts an assignment now.
    async fn add(&self, performer: &NewPerformer) -> Result<Performer>;

    async fn get_by_id(&self, id: ModelId) -> Result<Performer>;
}

#[derive(Clone)]
pub struct ProdPerformersStorage {
    pool: PgPool,
    repository: BaseRepository<Performer>,
}

impl ProdPerformersStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            repository: BaseRepository::new(),
        }
    }
}

#[async_trait]
impl PerformersStorage for ProdPerformersStorage {
    async fn get_all(&self, filter: &Filter) -> Result<Vec<Performer>> {
        let mut conn = self.pool.acquire().await?;
        self.repository.select(&mut conn, &filter.to_predicate()).await
    }

    async fn add(&self, performer: &NewPerformer) -> Result<Performer> {
        let mut conn = self.pool.acquire().await?;
        add_in(&self.repository, &mut conn, performer).await
    }

    async fn get_by_id(&self, id: ModelId) -> Result<Performer> {
        let mut conn = self.pool.acquire().await?;
        self.repository.select_by_id(&mut conn, id).await
    }
}

pub(crate) async fn add_in(
    repository: &BaseRepository<Performer>,
    conn: &mut PgConnection,
    performer: &NewPerformer,
) -> Result<Performer> {
    repository
        .insert(
            conn,
            &[
                ("performer_id", ColumnValue::Int(Some(performer.performer_id))),
                ("start_time", ColumnValue::Timestamp(Some(Utc::now()))),
                ("order_id", ColumnValue::Int(Some(performer.order_id))),
            ],
        )
        .await
}

/// Sets `end_time` on every still open assignment of the order.
pub(crate) async fn close_open_in(conn: &mut PgConnection, order_id: ModelId) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE performers SET end_time = $1 WHERE order_id = $2 AND end_time IS NULL",
    )
    .bind(Utc::now())
    .bind(order_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
