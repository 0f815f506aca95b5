use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::enums::TimeWindow;

/// A row of the legacy `tweets` table, in the column casing the scrapers use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegacyTweet {
    #[serde(rename = "ID")]
    pub id: i64,
    pub title: Option<String>,
    pub author: Option<String>,
    pub create_time: Option<String>,
    pub link: Option<String>,
    pub tweet_id: String,
    pub score: Option<i64>,
    pub tweet_type: Option<String>,
}

/// Payload item for `POST /tweets/add_tweets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewLegacyTweet {
    pub title: String,
    pub author: String,
    pub create_time: String,
    pub link: String,
    pub tweet_id: String,
    pub score: i64,
    #[serde(default)]
    pub tweet_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyIngestReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetList<T> {
    pub tweets: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalTweetsResponse {
    pub total_tweets: i64,
}

/// A row of `tweets_v2`: the raw scraped tweet kept as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetRecord {
    #[serde(rename = "tweetID")]
    pub tweet_id: String,
    #[serde(rename = "Content")]
    pub content: Value,
    #[serde(rename = "CreatedAt")]
    pub created_at: Option<String>,
    pub userid: Option<String>,
    /// Normalized UTC timestamp (`%Y-%m-%d %H:%M:%S`) derived from `CreatedAt`.
    #[serde(rename = "CreatedAtUtc")]
    pub created_at_utc: Option<String>,
}

/// Projection of a stored tweet returned by `GET /v2/get_tweets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetSummary {
    pub created_at: Value,
    pub favorite_count: Value,
    pub full_text: Value,
    pub rest_id: Value,
    pub retweet_count: Value,
    pub user: Value,
    #[serde(rename = "Link")]
    pub link: Option<String>,
}

/// Outcome of a batch insert into `tweets_v2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchIngestReport {
    pub inserted: Vec<String>,
    pub skipped: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    pub total_processed: usize,
    pub total_inserted: usize,
    pub total_skipped: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_errors: Option<usize>,
}

impl BatchIngestReport {
    /// Build a report; `errors` is `None` for endpoints that abort on the first failure.
    pub fn new(inserted: Vec<String>, skipped: Vec<String>, errors: Option<Vec<String>>) -> Self {
        let error_count = errors.as_ref().map(Vec::len);
        Self {
            total_processed: inserted.len() + skipped.len() + error_count.unwrap_or(0),
            total_inserted: inserted.len(),
            total_skipped: skipped.len(),
            total_errors: error_count,
            inserted,
            skipped,
            errors,
        }
    }
}

/// Column description from `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub type_name: String,
    pub not_null: bool,
    pub primary_key: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TweetTableInfo {
    pub columns: Vec<ColumnInfo>,
    pub row_count: i64,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub distinct_users: i64,
}

/// Latest profile snapshot from `users_v2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub screen_name: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub followers_count: Option<i64>,
    pub friends_count: Option<i64>,
    pub listed_count: Option<i64>,
    pub favourites_count: Option<i64>,
    pub media_count: Option<i64>,
    pub created_at: Option<String>,
    pub profile_image_url: Option<String>,
    pub verified: bool,
    pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIngestReport {
    pub inserted: Vec<String>,
    pub updated: Vec<String>,
    pub errors: Vec<String>,
    pub total_processed: usize,
    pub total_inserted: usize,
    pub total_updated: usize,
    pub total_errors: usize,
}

impl UserIngestReport {
    pub fn new(inserted: Vec<String>, updated: Vec<String>, errors: Vec<String>) -> Self {
        Self {
            total_processed: inserted.len() + updated.len() + errors.len(),
            total_inserted: inserted.len(),
            total_updated: updated.len(),
            total_errors: errors.len(),
            inserted,
            updated,
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowerAverage {
    pub user_id: i64,
    pub screen_name: String,
    pub averages: BTreeMap<TimeWindow, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowerAveragesResponse {
    pub total_users: usize,
    pub updated_at: String,
    pub averages: Vec<FollowerAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserTweetStats {
    pub screen_name: String,
    pub tweet_counts: BTreeMap<TimeWindow, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStatsResponse {
    pub total_users: usize,
    pub updated_at: String,
    pub stats: Vec<UserTweetStats>,
}

/// A row of the inscription `count` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionRecord {
    pub number: i64,
    pub count: i64,
    pub subrace: Option<String>,
    pub inscription: Option<String>,
    pub wallet: Option<String>,
    pub content: Option<String>,
    pub image_url: Option<String>,
}

/// Inscription row enriched with its race and PFP image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionView {
    pub number: i64,
    pub count: i64,
    pub race: String,
    pub subrace: Option<String>,
    pub inscription: Option<String>,
    pub wallet: Option<String>,
    pub content: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCount {
    pub wallet: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedWallet {
    pub rank: i64,
    pub wallet: Option<String>,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InscriptionStats {
    pub total_rows: i64,
    pub distinct_wallets: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subrace_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KolUserIds {
    pub userids: Vec<String>,
}

/// One CSV row keyed by header.
pub type CsvRecord = BTreeMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunesQueryResponse {
    pub total_count: usize,
    pub data: Vec<CsvRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDataResponse {
    pub column: String,
    pub total_count: usize,
    pub data: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_tweet_uses_scraper_casing() {
        let tweet = LegacyTweet {
            id: 1,
            title: Some("gm".to_string()),
            author: Some("alice".to_string()),
            create_time: Some("Mon Sep 23 10:00:00 +0000 2024".to_string()),
            link: None,
            tweet_id: "42".to_string(),
            score: Some(7),
            tweet_type: None,
        };
        let json = serde_json::to_value(&tweet).unwrap();
        assert_eq!(json["ID"], 1);
        assert_eq!(json["TweetId"], "42");
        assert_eq!(json["CreateTime"], "Mon Sep 23 10:00:00 +0000 2024");
        assert!(json["TweetType"].is_null());
    }

    #[test]
    fn test_new_legacy_tweet_type_is_optional() {
        let tweet: NewLegacyTweet = serde_json::from_str(
            r#"{"Title":"t","Author":"a","CreateTime":"c","Link":"l","TweetId":"1","Score":3}"#,
        )
        .unwrap();
        assert_eq!(tweet.tweet_type, None);
        assert_eq!(tweet.score, 3);
    }

    #[test]
    fn test_batch_report_totals() {
        let report = BatchIngestReport::new(
            vec!["1".into(), "2".into()],
            vec!["3".into()],
            Some(vec!["Unknown ID".into()]),
        );
        assert_eq!(report.total_processed, 4);
        assert_eq!(report.total_errors, Some(1));

        let strict = BatchIngestReport::new(vec!["1".into()], vec![], None);
        let json = serde_json::to_value(&strict).unwrap();
        assert!(json.get("errors").is_none());
        assert_eq!(json["total_processed"], 1);
    }

    #[test]
    fn test_window_keyed_maps_serialize_with_short_keys() {
        let mut counts = BTreeMap::new();
        counts.insert(TimeWindow::NinetyDays, 4u32);
        counts.insert(TimeWindow::ThreeDays, 1u32);
        let stats = UserTweetStats {
            screen_name: "alice".to_string(),
            tweet_counts: counts,
        };
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(json, r#"{"screen_name":"alice","tweet_counts":{"3d":1,"90d":4}}"#);
    }
}
