//! One-off upgrades for `tweets.db` files written by older scrapers.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use tweetdesk_types::ColumnInfo;

use super::connection::{table_columns, table_exists};
use super::schema::TWEETS_V2_INDEXES;
use super::Database;

/// Current `tweets_v2` column set, in table order.
pub const TWEETS_V2_COLUMNS: &[&str] = &["tweetID", "Content", "CreatedAt", "userid", "CreatedAtUtc"];

const REBUILD_TABLE: &str = "tweets_v2_rebuild";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RebuildReport {
    pub rows_before: i64,
    pub rows_after: i64,
    pub copied_columns: Vec<String>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
}

/// Recreate `tweets_v2` with the current column set, keeping every row.
///
/// Runs as copy, drop and rename inside one transaction. With `dry_run` the
/// transaction is rolled back after the copy has been counted.
pub fn rebuild_tweets_v2(db: &Database, dry_run: bool) -> Result<RebuildReport> {
    let mut conn = db.connection()?;
    if !table_exists(&conn, "tweets_v2")? {
        bail!("Table 'tweets_v2' does not exist");
    }

    let existing = table_columns(&conn, "tweets_v2")?;
    let copied: Vec<String> = TWEETS_V2_COLUMNS
        .iter()
        .filter(|column| existing.iter().any(|c| c.name.eq_ignore_ascii_case(column)))
        .map(|column| column.to_string())
        .collect();
    if !copied.iter().any(|c| c == "tweetID") {
        bail!("tweets_v2 has no tweetID column to rebuild from");
    }
    let column_list = copied.join(", ");

    let tx = conn.transaction()?;
    let rows_before: i64 = tx.query_row("SELECT COUNT(*) FROM tweets_v2", [], |row| row.get(0))?;

    tx.execute_batch(&format!(
        "DROP TABLE IF EXISTS {rebuild};
         CREATE TABLE {rebuild} (
             tweetID TEXT PRIMARY KEY,
             Content TEXT,
             CreatedAt TEXT,
             userid TEXT,
             CreatedAtUtc TEXT
         );
         INSERT OR IGNORE INTO {rebuild} ({columns}) SELECT {columns} FROM tweets_v2;",
        rebuild = REBUILD_TABLE,
        columns = column_list,
    ))
    .context("Failed to copy tweets_v2")?;

    let rows_after: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {}", REBUILD_TABLE), [], |row| row.get(0))?;

    tx.execute_batch(&format!(
        "DROP TABLE tweets_v2;
         ALTER TABLE {} RENAME TO tweets_v2;",
        REBUILD_TABLE
    ))
    .context("Failed to swap rebuilt tweets_v2")?;
    tx.execute_batch(TWEETS_V2_INDEXES)?;

    if dry_run {
        tx.rollback()?;
    } else {
        tx.commit().context("Failed to commit tweets_v2 rebuild")?;
        info!("Rebuilt tweets_v2: {} rows copied", rows_after);
    }

    Ok(RebuildReport {
        rows_before,
        rows_after,
        copied_columns: copied,
        dry_run,
    })
}

/// Columns and row count of any existing table.
pub fn inspect_table(db: &Database, table: &str) -> Result<TableReport> {
    Ok(TableReport {
        table: table.to_string(),
        columns: db.table_columns(table)?,
        row_count: db.row_count(table)?,
    })
}
