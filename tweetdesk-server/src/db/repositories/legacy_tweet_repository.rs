use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Row;

use tweetdesk_types::{LegacyIngestReport, LegacyTweet, NewLegacyTweet};

use super::{loose_int, loose_text};
use crate::db::DbPool;
use crate::timestamps::legacy_day_prefix;

pub const DEFAULT_LATEST_LIMIT: u32 = 50;

const SELECT_COLUMNS: &str =
    "SELECT ID, Title, Author, CreateTime, Link, TweetId, Score, TweetType FROM tweets";

/// The first-generation `tweets` table written by the keyword scrapers.
pub struct LegacyTweetRepository {
    pool: DbPool,
}

impl LegacyTweetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert tweets whose `TweetId` is not stored yet.
    ///
    /// A repeated id, whether already stored or earlier in the same batch, is
    /// reported as skipped.
    pub fn insert_batch(&self, tweets: &[NewLegacyTweet]) -> Result<LegacyIngestReport> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        let mut report = LegacyIngestReport::default();

        for tweet in tweets {
            let changed = tx
                .execute(
                    "INSERT OR IGNORE INTO tweets (Title, Author, CreateTime, Link, TweetId, Score, TweetType)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                    (
                        &tweet.title,
                        &tweet.author,
                        &tweet.create_time,
                        &tweet.link,
                        &tweet.tweet_id,
                        tweet.score,
                        &tweet.tweet_type,
                    ),
                )
                .with_context(|| format!("Failed to insert tweet {}", tweet.tweet_id))?;

            if changed == 1 {
                report.inserted.push(tweet.tweet_id.clone());
            } else {
                report.skipped.push(tweet.tweet_id.clone());
            }
        }

        tx.commit().context("Failed to commit tweet batch")?;
        Ok(report)
    }

    /// Tweets created on `date`, matched on the `CreateTime` day prefix.
    pub fn get_for_day(&self, date: NaiveDate, tweet_type: Option<&str>) -> Result<Vec<LegacyTweet>> {
        let pattern = format!("{}%", legacy_day_prefix(date));
        let conn = self.pool.get()?;

        let tweets = match tweet_type {
            Some(kind) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE CreateTime LIKE ? AND TweetType = ? ORDER BY ID",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map((&pattern, kind), map_legacy_tweet)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt =
                    conn.prepare(&format!("{} WHERE CreateTime LIKE ? ORDER BY ID", SELECT_COLUMNS))?;
                let rows = stmt.query_map([&pattern], map_legacy_tweet)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(tweets)
    }

    pub fn get_latest(&self, limit: u32, tweet_type: Option<&str>) -> Result<Vec<LegacyTweet>> {
        let conn = self.pool.get()?;

        let tweets = match tweet_type {
            Some(kind) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE TweetType = ? ORDER BY CreateTime DESC LIMIT ?",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map((kind, limit), map_legacy_tweet)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY CreateTime DESC LIMIT ?",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt.query_map([limit], map_legacy_tweet)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(tweets)
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count = conn
            .query_row("SELECT COUNT(*) FROM tweets", [], |row| row.get(0))
            .context("Failed to count tweets")?;
        Ok(count)
    }
}

fn map_legacy_tweet(row: &Row<'_>) -> rusqlite::Result<LegacyTweet> {
    Ok(LegacyTweet {
        id: row.get(0)?,
        title: loose_text(row, 1)?,
        author: loose_text(row, 2)?,
        create_time: loose_text(row, 3)?,
        link: loose_text(row, 4)?,
        tweet_id: loose_text(row, 5)?.unwrap_or_default(),
        score: loose_int(row, 6)?,
        tweet_type: loose_text(row, 7)?,
    })
}
