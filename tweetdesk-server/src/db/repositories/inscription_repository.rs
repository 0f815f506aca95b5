use std::collections::BTreeMap;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, OptionalExtension, Row};

use tweetdesk_types::{InscriptionRecord, RankedWallet, WalletCount};

use super::{loose_int, loose_text};
use crate::db::schema::COUNT_COLUMNS;
use crate::db::DbPool;
use crate::filter::{canonical_column, to_sql, Condition};

const SELECT_RECORD: &str =
    "SELECT number, count, subrace, inscription, wallet, content, image_url FROM count";

/// Rootverse inscription holdings in `count.db`.
pub struct InscriptionRepository {
    pool: DbPool,
}

impl InscriptionRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Occurrences of each value of `column`. NULL is keyed as `null`.
    pub fn distinct_values(&self, column: &str) -> Result<BTreeMap<String, i64>> {
        let column = canonical_column(column, COUNT_COLUMNS)?;
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {col}, COUNT(*) FROM count GROUP BY {col}",
            col = column
        ))?;
        let values = stmt
            .query_map([], |row| {
                Ok((
                    loose_text(row, 0)?.unwrap_or_else(|| "null".to_string()),
                    row.get::<_, i64>(1)?,
                ))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(values)
    }

    pub fn query(&self, conditions: &[Condition]) -> Result<Vec<InscriptionRecord>> {
        let (clause, params) = to_sql(conditions, COUNT_COLUMNS)?;
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!("{} WHERE {} ORDER BY number", SELECT_RECORD, clause))?;
        let records = stmt
            .query_map(params_from_iter(params.iter()), map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Rows per wallet among matching rows, most first.
    pub fn wallet_count(&self, conditions: &[Condition]) -> Result<Vec<WalletCount>> {
        let (clause, params) = to_sql(conditions, COUNT_COLUMNS)?;
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT wallet, COUNT(*) AS holdings FROM count WHERE {}
             GROUP BY wallet ORDER BY holdings DESC, wallet",
            clause
        ))?;
        let wallets = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(WalletCount {
                    wallet: loose_text(row, 0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wallets)
    }

    /// Wallets ranked by number of rows held.
    ///
    /// Ranks are assigned before `min_count` is applied, so filtering never
    /// renumbers wallets.
    pub fn ranked_wallets(&self, min_count: Option<i64>) -> Result<Vec<RankedWallet>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT rank, wallet, holdings FROM (
                 SELECT ROW_NUMBER() OVER (ORDER BY COUNT(*) DESC, wallet) AS rank,
                        wallet,
                        COUNT(*) AS holdings
                 FROM count
                 GROUP BY wallet
             )
             WHERE holdings >= ?
             ORDER BY rank",
        )?;
        let wallets = stmt
            .query_map([min_count.unwrap_or(0)], |row| {
                Ok(RankedWallet {
                    rank: row.get(0)?,
                    wallet: loose_text(row, 1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(wallets)
    }

    pub fn subrace_count(&self, subrace: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        let count = conn
            .query_row("SELECT COUNT(*) FROM count WHERE subrace = ?", [subrace], |row| {
                row.get(0)
            })
            .context("Failed to count subrace")?;
        Ok(count)
    }

    pub fn row_count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row("SELECT COUNT(*) FROM count", [], |row| row.get(0))?;
        Ok(count)
    }

    pub fn distinct_count(&self, column: &str) -> Result<i64> {
        let column = canonical_column(column, COUNT_COLUMNS)?;
        let conn = self.pool.get()?;
        let count = conn.query_row(
            &format!("SELECT COUNT(DISTINCT {}) FROM count", column),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn by_inscription(&self, inscription_id: &str) -> Result<Option<InscriptionRecord>> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                &format!("{} WHERE inscription = ? LIMIT 1", SELECT_RECORD),
                [inscription_id],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    pub fn by_number(&self, number: i64) -> Result<Option<InscriptionRecord>> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                &format!("{} WHERE number = ? LIMIT 1", SELECT_RECORD),
                [number],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Bulk load used by the maintenance tool and tests.
    pub fn insert(&self, record: &InscriptionRecord) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO count (number, count, subrace, inscription, wallet, content, image_url)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            (
                record.number,
                record.count,
                &record.subrace,
                &record.inscription,
                &record.wallet,
                &record.content,
                &record.image_url,
            ),
        )
        .with_context(|| format!("Failed to insert inscription #{}", record.number))?;
        Ok(())
    }
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<InscriptionRecord> {
    Ok(InscriptionRecord {
        number: loose_int(row, 0)?.unwrap_or_default(),
        count: loose_int(row, 1)?.unwrap_or_default(),
        subrace: loose_text(row, 2)?,
        inscription: loose_text(row, 3)?,
        wallet: loose_text(row, 4)?,
        content: loose_text(row, 5)?,
        image_url: loose_text(row, 6)?.filter(|url| !url.is_empty()),
    })
}
