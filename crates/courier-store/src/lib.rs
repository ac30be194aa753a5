//! # courier-store
//!
//! Persistent update cursor, so a restarted bot resumes from the last
//! acknowledged update instead of replaying the server's pending queue.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use courier_core::{config::StoreConfig, error::CourierError, shellexpand, traits::OffsetStore};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A stored cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRecord {
    pub bot_key: String,
    pub next_offset: i64,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed offset store. One row per bot.
#[derive(Clone)]
pub struct SqliteOffsetStore {
    pool: SqlitePool,
    bot_key: String,
}

impl SqliteOffsetStore {
    /// Open (or create) the database at `config.db_path` and scope the
    /// store to `bot_key` (typically the bot's numeric id).
    pub async fn open(config: &StoreConfig, bot_key: &str) -> Result<Self, CourierError> {
        let db_path = shellexpand(&config.db_path);

        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CourierError::Store(format!("failed to create data dir: {e}")))?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| CourierError::Store(format!("invalid db path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(opts)
            .await
            .map_err(|e| CourierError::Store(format!("failed to connect to sqlite: {e}")))?;

        Self::run_migrations(&pool).await?;
        info!("offset store initialized at {db_path}");

        Ok(Self {
            pool,
            bot_key: bot_key.to_string(),
        })
    }

    /// Run SQL migrations, tracking which have already been applied.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), CourierError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .execute(pool)
        .await
        .map_err(|e| CourierError::Store(format!("failed to create migrations table: {e}")))?;

        let migrations: &[(&str, &str)] = &[(
            "001_offsets",
            include_str!("../migrations/001_offsets.sql"),
        )];

        for (name, sql) in migrations {
            let applied: Option<(String,)> =
                sqlx::query_as("SELECT name FROM _migrations WHERE name = ?")
                    .bind(name)
                    .fetch_optional(pool)
                    .await
                    .map_err(|e| {
                        CourierError::Store(format!("failed to check migration {name}: {e}"))
                    })?;

            if applied.is_some() {
                continue;
            }

            sqlx::raw_sql(sql)
                .execute(pool)
                .await
                .map_err(|e| CourierError::Store(format!("migration {name} failed: {e}")))?;

            sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
                .bind(name)
                .execute(pool)
                .await
                .map_err(|e| {
                    CourierError::Store(format!("failed to record migration {name}: {e}"))
                })?;
            debug!("applied migration {name}");
        }
        Ok(())
    }

    /// Every stored cursor, most recently updated first.
    pub async fn records(&self) -> Result<Vec<OffsetRecord>, CourierError> {
        let rows: Vec<(String, i64, String)> = sqlx::query_as(
            "SELECT bot_key, next_offset, updated_at FROM update_offsets ORDER BY updated_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("failed to list offsets: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(bot_key, next_offset, updated_at)| OffsetRecord {
                bot_key,
                next_offset,
                updated_at: parse_timestamp(&updated_at),
            })
            .collect())
    }

    /// Forget the cursor for this bot.
    pub async fn reset(&self) -> Result<(), CourierError> {
        sqlx::query("DELETE FROM update_offsets WHERE bot_key = ?")
            .bind(&self.bot_key)
            .execute(&self.pool)
            .await
            .map_err(|e| CourierError::Store(format!("failed to reset offset: {e}")))?;
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .unwrap_or_default()
}

#[async_trait]
impl OffsetStore for SqliteOffsetStore {
    async fn load(&self) -> Result<Option<i64>, CourierError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT next_offset FROM update_offsets WHERE bot_key = ?")
                .bind(&self.bot_key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| CourierError::Store(format!("failed to load offset: {e}")))?;
        Ok(row.map(|(offset,)| offset))
    }

    async fn save(&self, offset: i64) -> Result<(), CourierError> {
        let now = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        // Never move backwards, even if saves race.
        sqlx::query(
            "INSERT INTO update_offsets (bot_key, next_offset, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(bot_key) DO UPDATE SET
                next_offset = MAX(next_offset, excluded.next_offset),
                updated_at = excluded.updated_at",
        )
        .bind(&self.bot_key)
        .bind(offset)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| CourierError::Store(format!("failed to save offset: {e}")))?;
        Ok(())
    }
}

/// In-process offset store. Survives `start`/`stop` cycles, not restarts.
#[derive(Debug, Default)]
pub struct MemoryOffsetStore {
    offset: Mutex<Option<i64>>,
}

impl MemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OffsetStore for MemoryOffsetStore {
    async fn load(&self) -> Result<Option<i64>, CourierError> {
        Ok(*self.offset.lock().unwrap_or_else(PoisonError::into_inner))
    }

    async fn save(&self, offset: i64) -> Result<(), CourierError> {
        let mut current = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *current = Some(current.map_or(offset, |c| c.max(offset)));
        Ok(())
    }
}
