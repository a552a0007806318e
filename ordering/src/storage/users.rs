use crate::error::Result;
use crate::model::{ModelId, User};
use crate::storage::base::{BaseRepository, Persistable, try_get_enum};
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

impl Persistable for User {
    fn get_table_name() -> &'static str {
        "users"
    }

    fn get_entity_name() -> &'static str {
        "User"
    }

    fn get_select_columns() -> &'static str {
        "id, role, name"
    }

    fn from_row(row: &PgRow) -> std::result::Result<Self, sqlx::Error> {
        Ok(User {
            id: row.try_get("id")?,
            role: try_get_enum(row, "role")?,
            name: row.try_get("name")?,
        })
    }
}

#[async_trait]
pub trait UsersStorage: Send + Sync {
    async fn get_by_id(&self, id: ModelId) -> Result<User>;
}

#[derive(Clone)]
pub struct ProdUsersStorage {
    pool: PgPool,
    repository: BaseRepository<User>,
}

impl ProdUsersStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            repository: BaseRepository::new(),
        }
    }
}

#[async_trait]
impl UsersStorage for ProdUsersStorage {
    async fn get_by_id(&self, id: ModelId) -> Result<User> {
        let mut conn = self.pool.acquire().await?;
        self.repository.select_by_id(&mut conn, id).await
    }
}
