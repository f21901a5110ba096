//! SQLite persistence: pool wrapper, per-entity repositories and the
//! transactional operations that keep the movie aggregate consistent.

pub mod media_items;
pub mod movies;
pub mod operations;
pub mod schema;
pub mod unmatched;

use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub use media_items::MediaItemRepository;
pub use movies::MovieRepository;
pub use unmatched::UnmatchedRepository;

#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect and apply the embedded schema. Creates the database file
    /// when missing.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url '{url}'"))?
            .create_if_missing(true)
            .foreign_keys(true);
        // An in-memory database exists per-connection; more than one
        // connection would see different schemas.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .context("failed to connect to database")?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    pub async fn migrate(&self) -> Result<()> {
        for statement in schema::CREATE_TABLES {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .context("failed to apply schema")?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn media_items(&self) -> MediaItemRepository {
        MediaItemRepository::new(self.pool.clone())
    }

    pub fn movies(&self) -> MovieRepository {
        MovieRepository::new(self.pool.clone())
    }

    pub fn unmatched(&self) -> UnmatchedRepository {
        UnmatchedRepository::new(self.pool.clone())
    }
}
