mod error;
mod models;
mod store;

use anyhow::Result;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;

pub use error::StoreError;
pub use models::*;
pub use store::{AvailabilityStore, MemoryStore, PgStore, SessionStore};

/// Initialize the database connection pool and run migrations.
pub async fn init_pool(config: &DatabaseConfig, url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections.unwrap_or(10))
        .min_connections(config.min_connections.unwrap_or(1))
        .connect(url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
