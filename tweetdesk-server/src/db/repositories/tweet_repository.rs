use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row, Transaction};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use tweetdesk_types::{BatchIngestReport, TweetRecord, TweetSummary, TweetTableInfo};

use super::loose_text;
use crate::db::connection::table_columns;
use crate::db::DbPool;
use crate::timestamps::{parse_storage, parse_twitter_timestamp, to_storage};

const SELECT_RECORD: &str = "SELECT tweetID, Content, CreatedAt, userid, CreatedAtUtc FROM tweets_v2";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Missing key in tweet data: '{0}'")]
    MissingKey(&'static str),
    #[error("{0}")]
    InvalidPayload(&'static str),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of filling normalized columns on older rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BackfillReport {
    pub scanned: usize,
    pub created_at_filled: usize,
    pub userid_filled: usize,
}

/// A raw tweet prepared for `tweets_v2`.
#[derive(Debug)]
struct PendingTweet {
    tweet_id: String,
    content: String,
    created_at: Option<String>,
    userid: Option<String>,
    created_at_utc: Option<String>,
}

impl PendingTweet {
    fn from_raw(raw: &Value) -> Result<Self, IngestError> {
        let tweet_id = raw
            .get("rest_id")
            .and_then(json_id)
            .ok_or(IngestError::MissingKey("rest_id"))?;
        let created_at = raw
            .get("created_at")
            .and_then(Value::as_str)
            .map(str::to_string);
        let created_at_utc = created_at.as_deref().and_then(normalize_created_at);

        Ok(Self {
            tweet_id,
            content: raw.to_string(),
            created_at,
            userid: author_id(raw),
            created_at_utc,
        })
    }
}

/// Ids arrive as strings or bare numbers depending on the scraper.
fn json_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn author_id(raw: &Value) -> Option<String> {
    let user = raw.get("user")?;
    ["rest_id", "id_str", "id"]
        .iter()
        .find_map(|key| user.get(*key).and_then(json_id))
}

fn normalize_created_at(created_at: &str) -> Option<String> {
    match parse_twitter_timestamp(created_at) {
        Ok(dt) => Some(to_storage(&dt)),
        Err(e) => {
            debug!("Leaving CreatedAtUtc empty: {}", e);
            None
        }
    }
}

/// Project a stored tweet into the fields clients display.
pub fn summarize(content: &Value) -> TweetSummary {
    let field = |key: &str| content.get(key).cloned().unwrap_or(Value::Null);
    let screen_name = content.pointer("/user/screen_name").and_then(Value::as_str);
    let rest_id = content.get("rest_id").and_then(json_id);

    TweetSummary {
        created_at: field("created_at"),
        favorite_count: field("favorite_count"),
        full_text: field("full_text"),
        rest_id: field("rest_id"),
        retweet_count: field("retweet_count"),
        user: field("user"),
        link: match (screen_name, rest_id) {
            (Some(name), Some(id)) => Some(format!("https://twitter.com/{}/status/{}", name, id)),
            _ => None,
        },
    }
}

/// Raw scraped tweets in `tweets_v2`.
pub struct TweetRepository {
    pool: DbPool,
}

impl TweetRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a batch of raw tweets.
    ///
    /// Every tweet is validated before anything is written, so a tweet without
    /// `rest_id` rejects the whole batch.
    pub fn insert_batch(&self, raw_tweets: &[Value]) -> Result<BatchIngestReport, IngestError> {
        let pending = raw_tweets
            .iter()
            .map(PendingTweet::from_raw)
            .collect::<Result<Vec<_>, _>>()?;

        let mut conn = self.pool.get().context("Failed to get database connection")?;
        let tx = conn.transaction().context("Failed to start transaction")?;
        let mut inserted = Vec::new();
        let mut skipped = Vec::new();

        for tweet in &pending {
            if insert_pending(&tx, tweet)
                .with_context(|| format!("Failed to insert tweet {}", tweet.tweet_id))?
            {
                inserted.push(tweet.tweet_id.clone());
            } else {
                skipped.push(tweet.tweet_id.clone());
            }
        }

        tx.commit().context("Failed to commit tweet batch")?;
        Ok(BatchIngestReport::new(inserted, skipped, None))
    }

    /// Ingest the scraper's `output[].data.freeBusy.post[]` envelope.
    ///
    /// Bad tweets are collected in `errors` and the rest of the batch goes on.
    pub fn insert_scraper_output(&self, payload: &Value) -> Result<BatchIngestReport, IngestError> {
        let outputs = payload
            .get("output")
            .and_then(Value::as_array)
            .ok_or(IngestError::InvalidPayload("Invalid JSON data received"))?;

        let mut conn = self.pool.get().context("Failed to get database connection")?;
        let tx = conn.transaction().context("Failed to start transaction")?;
        let mut inserted = Vec::new();
        let mut skipped = Vec::new();
        let mut errors = Vec::new();

        let posts = outputs
            .iter()
            .filter_map(|item| item.pointer("/data/freeBusy/post").and_then(Value::as_array))
            .flatten();

        for raw in posts {
            let label = raw
                .get("rest_id")
                .and_then(json_id)
                .unwrap_or_else(|| "Unknown ID".to_string());

            let tweet = match PendingTweet::from_raw(raw) {
                Ok(tweet) => tweet,
                Err(e) => {
                    warn!("Skipping tweet {}: {}", label, e);
                    errors.push(label);
                    continue;
                }
            };

            match insert_pending(&tx, &tweet) {
                Ok(true) => inserted.push(tweet.tweet_id),
                Ok(false) => skipped.push(tweet.tweet_id),
                Err(e) => {
                    warn!("Failed to insert tweet {}: {}", label, e);
                    errors.push(label);
                }
            }
        }

        tx.commit().context("Failed to commit scraper output")?;
        Ok(BatchIngestReport::new(inserted, skipped, Some(errors)))
    }

    /// Tweets created strictly after `since`, newest first.
    pub fn get_since(&self, since: DateTime<Utc>) -> Result<Vec<TweetSummary>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT Content FROM tweets_v2 WHERE CreatedAtUtc > ? ORDER BY CreatedAtUtc DESC",
        )?;
        let summaries = stmt
            .query_map([to_storage(&since)], |row| loose_text(row, 0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|content| summarize(&decode_content(content.unwrap_or_default())))
            .collect();
        Ok(summaries)
    }

    /// Tweets with `start <= CreatedAtUtc <= end`, newest first.
    pub fn get_in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<TweetRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE CreatedAtUtc BETWEEN ? AND ? ORDER BY CreatedAtUtc DESC",
            SELECT_RECORD
        ))?;
        let records = stmt
            .query_map([to_storage(&start), to_storage(&end)], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_latest(&self, limit: u32) -> Result<Vec<TweetRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY CreatedAtUtc IS NULL, CreatedAtUtc DESC, tweetID DESC LIMIT ?",
            SELECT_RECORD
        ))?;
        let records = stmt
            .query_map([limit], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_by_userid(&self, userid: &str) -> Result<Vec<TweetRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} WHERE userid = ? ORDER BY CreatedAtUtc DESC",
            SELECT_RECORD
        ))?;
        let records = stmt
            .query_map([userid], map_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_by_id(&self, tweet_id: &str) -> Result<Option<TweetRecord>> {
        let conn = self.pool.get()?;
        let record = conn
            .query_row(
                &format!("{} WHERE tweetID = ?", SELECT_RECORD),
                [tweet_id],
                map_record,
            )
            .optional()?;
        Ok(record)
    }

    /// `(screen_name, created_at)` for tweets created at or after `since`.
    ///
    /// Rows without an author screen name are ignored.
    pub fn authored_since(&self, since: DateTime<Utc>) -> Result<Vec<(String, DateTime<Utc>)>> {
        let conn = self.pool.get()?;
        let mut stmt =
            conn.prepare("SELECT Content, CreatedAtUtc FROM tweets_v2 WHERE CreatedAtUtc >= ?")?;
        let rows = stmt
            .query_map([to_storage(&since)], |row| {
                Ok((loose_text(row, 0)?, loose_text(row, 1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(content, created_at_utc)| {
                let content = decode_content(content?);
                let screen_name = content.pointer("/user/screen_name")?.as_str()?.to_string();
                let created_at = parse_storage(&created_at_utc?).ok()?;
                Some((screen_name, created_at))
            })
            .collect())
    }

    pub fn table_info(&self) -> Result<TweetTableInfo> {
        let conn = self.pool.get()?;
        let columns = table_columns(&conn, "tweets_v2")?;
        let (row_count, earliest, latest, distinct_users) = conn.query_row(
            "SELECT COUNT(*), MIN(CreatedAtUtc), MAX(CreatedAtUtc),
                    COUNT(DISTINCT CASE WHEN userid IS NOT NULL AND userid != '' THEN userid END)
             FROM tweets_v2",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;

        Ok(TweetTableInfo {
            columns,
            row_count,
            earliest,
            latest,
            distinct_users,
        })
    }

    /// Delete every stored tweet, returning how many were removed.
    pub fn clear(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let removed = conn
            .execute("DELETE FROM tweets_v2", [])
            .context("Failed to clear tweets_v2")?;
        Ok(removed)
    }

    /// Fill `CreatedAtUtc` and `userid` on rows stored before those columns
    /// existed.
    pub fn backfill(&self, dry_run: bool) -> Result<BackfillReport> {
        let mut conn = self.pool.get()?;
        let rows = {
            let mut stmt = conn.prepare(
                "SELECT tweetID, Content, CreatedAt, userid, CreatedAtUtc FROM tweets_v2
                 WHERE CreatedAtUtc IS NULL OR userid IS NULL",
            )?;
            let rows = stmt
                .query_map([], map_record)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        };

        let mut report = BackfillReport {
            scanned: rows.len(),
            ..Default::default()
        };
        let tx = conn.transaction()?;

        for record in rows {
            let created_at_utc = match record.created_at_utc {
                Some(existing) => Some(existing),
                None => {
                    let filled = record
                        .created_at
                        .as_deref()
                        .or_else(|| record.content.get("created_at").and_then(Value::as_str))
                        .and_then(normalize_created_at);
                    if filled.is_some() {
                        report.created_at_filled += 1;
                    }
                    filled
                }
            };
            let userid = match record.userid {
                Some(existing) => Some(existing),
                None => {
                    let filled = author_id(&record.content);
                    if filled.is_some() {
                        report.userid_filled += 1;
                    }
                    filled
                }
            };

            if !dry_run {
                tx.execute(
                    "UPDATE tweets_v2 SET CreatedAtUtc = ?, userid = ? WHERE tweetID = ?",
                    (&created_at_utc, &userid, &record.tweet_id),
                )
                .with_context(|| format!("Failed to backfill tweet {}", record.tweet_id))?;
            }
        }

        if dry_run {
            tx.rollback()?;
        } else {
            tx.commit().context("Failed to commit backfill")?;
        }
        Ok(report)
    }
}

fn insert_pending(tx: &Transaction<'_>, tweet: &PendingTweet) -> rusqlite::Result<bool> {
    let changed = tx.execute(
        "INSERT OR IGNORE INTO tweets_v2 (tweetID, Content, CreatedAt, userid, CreatedAtUtc)
         VALUES (?, ?, ?, ?, ?)",
        (
            &tweet.tweet_id,
            &tweet.content,
            &tweet.created_at,
            &tweet.userid,
            &tweet.created_at_utc,
        ),
    )?;
    Ok(changed == 1)
}

/// Stored content is JSON; anything else is kept as a plain string.
fn decode_content(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn map_record(row: &Row<'_>) -> rusqlite::Result<TweetRecord> {
    Ok(TweetRecord {
        tweet_id: loose_text(row, 0)?.unwrap_or_default(),
        content: decode_content(loose_text(row, 1)?.unwrap_or_default()),
        created_at: loose_text(row, 2)?,
        userid: loose_text(row, 3)?,
        created_at_utc: loose_text(row, 4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::TWEETS;
    use crate::db::Database;
    use chrono::TimeZone;
    use serde_json::json;

    fn setup_test_db() -> Result<Database> {
        let db = Database::in_memory()?;
        db.initialize(&TWEETS)?;
        Ok(db)
    }

    fn raw_tweet(id: &str, screen_name: &str, created_at: &str) -> Value {
        json!({
            "rest_id": id,
            "created_at": created_at,
            "full_text": format!("tweet {}", id),
            "favorite_count": 3,
            "retweet_count": 1,
            "user": {"rest_id": format!("u-{}", screen_name), "screen_name": screen_name, "name": screen_name}
        })
    }

    #[test]
    fn test_insert_batch_reports_duplicates() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());

        let report = repo
            .insert_batch(&[
                raw_tweet("1", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
                raw_tweet("2", "bob", "Wed Oct 10 21:19:24 +0000 2018"),
            ])
            .unwrap();
        assert_eq!(report.total_inserted, 2);
        assert_eq!(report.errors, None);

        let again = repo
            .insert_batch(&[raw_tweet("2", "bob", "Wed Oct 10 21:19:24 +0000 2018")])
            .unwrap();
        assert_eq!(again.skipped, vec!["2"]);
        assert_eq!(again.total_processed, 1);

        let stored = repo.get_by_id("1")?.unwrap();
        assert_eq!(stored.userid.as_deref(), Some("u-alice"));
        assert_eq!(stored.created_at_utc.as_deref(), Some("2018-10-10 20:19:24"));
        assert_eq!(stored.content["full_text"], "tweet 1");
        Ok(())
    }

    #[test]
    fn test_missing_rest_id_rejects_whole_batch() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());

        let err = repo
            .insert_batch(&[
                raw_tweet("1", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
                json!({"full_text": "no id"}),
            ])
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing key in tweet data: 'rest_id'");
        assert!(repo.get_by_id("1")?.is_none());
        Ok(())
    }

    #[test]
    fn test_scraper_output_collects_errors() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());
        let payload = json!({
            "output": [
                {"data": {"freeBusy": {"post": [
                    raw_tweet("10", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
                    {"full_text": "missing id"}
                ]}}},
                {"data": {}},
                {"data": {"freeBusy": {"post": [
                    raw_tweet("10", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
                    raw_tweet("11", "bob", "not a date")
                ]}}}
            ]
        });

        let report = repo.insert_scraper_output(&payload).unwrap();
        assert_eq!(report.inserted, vec!["10", "11"]);
        assert_eq!(report.skipped, vec!["10"]);
        assert_eq!(report.errors, Some(vec!["Unknown ID".to_string()]));
        assert_eq!(report.total_errors, Some(1));
        assert_eq!(report.total_processed, 4);

        let undated = repo.get_by_id("11")?.unwrap();
        assert_eq!(undated.created_at_utc, None);
        Ok(())
    }

    #[test]
    fn test_scraper_output_requires_output_array() {
        let db = setup_test_db().unwrap();
        let repo = TweetRepository::new(db.pool.clone());
        let err = repo.insert_scraper_output(&json!({"data": []})).unwrap_err();
        assert!(matches!(err, IngestError::InvalidPayload(_)));
    }

    #[test]
    fn test_get_since_projects_summary_with_link() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());
        repo.insert_batch(&[
            raw_tweet("1", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
            raw_tweet("2", "bob", "Thu Oct 11 08:00:00 +0000 2018"),
        ])
        .unwrap();

        let since = Utc.with_ymd_and_hms(2018, 10, 11, 0, 0, 0).unwrap();
        let summaries = repo.get_since(since)?;
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].rest_id, json!("2"));
        assert_eq!(
            summaries[0].link.as_deref(),
            Some("https://twitter.com/bob/status/2")
        );
        Ok(())
    }

    #[test]
    fn test_range_latest_and_user_queries() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());
        repo.insert_batch(&[
            raw_tweet("1", "alice", "Mon Oct 08 10:00:00 +0000 2018"),
            raw_tweet("2", "alice", "Wed Oct 10 10:00:00 +0000 2018"),
            raw_tweet("3", "bob", "Fri Oct 12 10:00:00 +0000 2018"),
        ])
        .unwrap();

        let start = Utc.with_ymd_and_hms(2018, 10, 9, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2018, 10, 12, 23, 59, 59).unwrap();
        let in_range: Vec<String> = repo
            .get_in_range(start, end)?
            .into_iter()
            .map(|r| r.tweet_id)
            .collect();
        assert_eq!(in_range, vec!["3", "2"]);

        assert_eq!(repo.get_latest(1)?[0].tweet_id, "3");
        assert_eq!(repo.get_by_userid("u-alice")?.len(), 2);
        assert!(repo.get_by_id("404")?.is_none());
        Ok(())
    }

    #[test]
    fn test_authored_since_skips_rows_without_author() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());
        repo.insert_batch(&[
            raw_tweet("1", "alice", "Wed Oct 10 20:19:24 +0000 2018"),
            json!({"rest_id": "2", "created_at": "Wed Oct 10 20:19:24 +0000 2018"}),
        ])
        .unwrap();

        let since = Utc.with_ymd_and_hms(2018, 10, 1, 0, 0, 0).unwrap();
        let rows = repo.authored_since(since)?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "alice");
        Ok(())
    }

    #[test]
    fn test_table_info_and_clear() -> Result<()> {
        let db = setup_test_db()?;
        let repo = TweetRepository::new(db.pool.clone());
        repo.insert_batch(&[
            raw_tweet("1", "alice", "Mon Oct 08 10:00:00 +0000 2018"),
            raw_tweet("2", "bob", "Fri Oct 12 10:00:00 +0000 2018"),
        ])
        .unwrap();

        let info = repo.table_info()?;
        assert_eq!(info.row_count, 2);
        assert_eq!(info.distinct_users, 2);
        assert_eq!(info.earliest.as_deref(), Some("2018-10-08 10:00:00"));
        assert_eq!(info.latest.as_deref(), Some("2018-10-12 10:00:00"));
        assert!(info.columns.iter().any(|c| c.name == "tweetID" && c.primary_key));

        assert_eq!(repo.clear()?, 2);
        assert_eq!(repo.table_info()?.row_count, 0);
        Ok(())
    }

    #[test]
    fn test_backfill_fills_missing_columns() -> Result<()> {
        let db = setup_test_db()?;
        let content = raw_tweet("7", "carol", "Wed Oct 10 20:19:24 +0000 2018").to_string();
        db.connection()?.execute(
            "INSERT INTO tweets_v2 (tweetID, Content, CreatedAt) VALUES ('7', ?, 'Wed Oct 10 20:19:24 +0000 2018')",
            [&content],
        )?;
        let repo = TweetRepository::new(db.pool.clone());

        let preview = repo.backfill(true)?;
        assert_eq!(preview.created_at_filled, 1);
        assert!(repo.get_by_id("7")?.unwrap().created_at_utc.is_none());

        let report = repo.backfill(false)?;
        assert_eq!(report.scanned, 1);
        assert_eq!(report.userid_filled, 1);
        let record = repo.get_by_id("7")?.unwrap();
        assert_eq!(record.created_at_utc.as_deref(), Some("2018-10-10 20:19:24"));
        assert_eq!(record.userid.as_deref(), Some("u-carol"));

        assert_eq!(repo.backfill(false)?.scanned, 0);
        Ok(())
    }

    #[test]
    fn test_summarize_without_author_has_no_link() {
        let summary = summarize(&json!({"rest_id": 5, "full_text": "hi"}));
        assert_eq!(summary.link, None);
        assert_eq!(summary.rest_id, json!(5));
        assert!(summary.user.is_null());
    }
}
