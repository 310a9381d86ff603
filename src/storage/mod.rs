//! SQLite run-history store -- schema, pool, append-only run records.

pub mod schema;

use crate::tasks::{RunResult, RunStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

/// Connection pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the run-history database and return a connection pool.
pub fn open_pool(path: &Path) -> Result<Pool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Append one run result. Never updated or deleted afterwards.
pub fn record_run(pool: &Pool, result: &RunResult) -> Result<()> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO run_history (id, task, status, exit_code, log_excerpt, started_at, finished_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            result.id.to_string(),
            result.task,
            result.status.to_string(),
            result.exit_code,
            result.log_excerpt,
            result.started_at.to_rfc3339(),
            result.finished_at.map(|t| t.to_rfc3339()),
        ],
    )
    .context("Failed to insert run result")?;
    Ok(())
}

/// The most recent runs, newest first.
pub fn recent_runs(pool: &Pool, limit: u32) -> Result<Vec<RunResult>> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, task, status, exit_code, log_excerpt, started_at, finished_at
         FROM run_history ORDER BY started_at DESC, rowid DESC LIMIT ?1",
    )?;

    let rows = stmt.query_map([limit], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<i32>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    let mut out = Vec::new();
    for row in rows {
        let (id, task, status, exit_code, excerpt, started_at, finished_at) = row?;
        out.push(RunResult {
            id: id.parse().context("Corrupt run id in run_history")?,
            task,
            status: status
                .parse::<RunStatus>()
                .map_err(anyhow::Error::msg)
                .context("Corrupt status in run_history")?,
            exit_code,
            log_excerpt: excerpt.unwrap_or_default(),
            started_at: parse_ts(&started_at)?,
            finished_at: finished_at.as_deref().map(parse_ts).transpose()?,
        });
    }
    Ok(out)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("Bad timestamp '{raw}' in run_history"))?
        .with_timezone(&Utc))
}
