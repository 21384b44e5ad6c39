//! SQLite persistence layer for Nudge.
//!
//! This crate provides async database operations for sessions,
//! conversations, and transcript messages using SQLx with SQLite. Every
//! conversation query is scoped to an owner.
//!
//! # Example
//!
//! ```no_run
//! use database::{session, Database, SqliteTranscriptStore};
//! use nudge_core::TranscriptStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:nudge.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Issue a session and open a conversation for its user
//!     let session = session::create_session(db.pool(), "user-1", None).await?;
//!     let store = SqliteTranscriptStore::new(db.clone(), session.user_id);
//!     let id = store.create_conversation().await?;
//!     println!("created {}", id);
//!
//!     Ok(())
//! }
//! ```

pub mod conversation;
pub mod error;
pub mod message;
pub mod models;
pub mod session;
mod store;

pub use error::{DatabaseError, Result};
pub use models::{Conversation, MessageRecord, Session};
pub use store::SqliteTranscriptStore;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    /// In-memory databases (`sqlite::memory:`) need a pool size of 1, see
    /// [`Database::connect_with_pool_size`].
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
