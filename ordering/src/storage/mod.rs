pub mod base;
pub mod orders;
pub mod performers;
pub mod scores;
pub mod users;

pub use base::*;
pub use orders::*;
pub use performers::{PerformersStorage, ProdPerformersStorage};
pub use scores::*;
pub use users::*;

use sqlx::migrate::Migrator;

/// Schema migrations embedded from the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../migrations");
