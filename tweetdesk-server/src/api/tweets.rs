use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{Days, Utc};
use serde::Deserialize;

use tweetdesk_types::{
    LegacyIngestReport, LegacyTweet, NewLegacyTweet, TotalTweetsResponse, TweetList,
};

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::{LegacyTweetRepository, DEFAULT_LATEST_LIMIT},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct TodaysTweetsQuery {
    pub tweet_type: Option<String>,
    /// Which UTC day to return, counted back from today.
    #[serde(default = "default_days_ago")]
    pub days_ago: u64,
}

fn default_days_ago() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct LatestTweetsQuery {
    pub tweet_type: Option<String>,
}

/// `?tweet_type=` with a blank value means no filter.
fn type_filter(tweet_type: Option<&str>) -> Option<&str> {
    tweet_type.map(str::trim).filter(|t| !t.is_empty())
}

/// POST /tweets/add_tweets - Store scraped tweets, skipping known ids
pub async fn add_tweets(
    State(state): State<AppState>,
    Json(tweets): Json<Vec<NewLegacyTweet>>,
) -> ApiResult<Json<LegacyIngestReport>> {
    let repo = LegacyTweetRepository::new(state.tweets_db.pool.clone());
    let report = repo
        .insert_batch(&tweets)
        .map_err(|e| ApiError::InternalError(format!("Failed to add tweets: {:#}", e)))?;

    tracing::info!(
        "Legacy tweets: {} inserted, {} skipped",
        report.inserted.len(),
        report.skipped.len()
    );
    Ok(Json(report))
}

/// GET /tweets/get_todays_tweets - Tweets of one UTC day, yesterday by default
pub async fn get_todays_tweets(
    State(state): State<AppState>,
    Query(query): Query<TodaysTweetsQuery>,
) -> ApiResult<Json<TweetList<LegacyTweet>>> {
    let day = Utc::now()
        .date_naive()
        .checked_sub_days(Days::new(query.days_ago))
        .ok_or_else(|| ApiError::BadRequest("days_ago is out of range".to_string()))?;

    let repo = LegacyTweetRepository::new(state.tweets_db.pool.clone());
    let tweets = repo.get_for_day(day, type_filter(query.tweet_type.as_deref()))?;
    Ok(Json(TweetList { tweets }))
}

/// GET /tweets/get_latest_tweets - Newest 50 tweets
pub async fn get_latest_tweets(
    State(state): State<AppState>,
    Query(query): Query<LatestTweetsQuery>,
) -> ApiResult<Json<TweetList<LegacyTweet>>> {
    let repo = LegacyTweetRepository::new(state.tweets_db.pool.clone());
    let tweets = repo.get_latest(DEFAULT_LATEST_LIMIT, type_filter(query.tweet_type.as_deref()))?;
    Ok(Json(TweetList { tweets }))
}

/// GET /tweets/get_total_tweets
pub async fn get_total_tweets(State(state): State<AppState>) -> ApiResult<Json<TotalTweetsResponse>> {
    let repo = LegacyTweetRepository::new(state.tweets_db.pool.clone());
    let total_tweets = repo.count()?;
    Ok(Json(TotalTweetsResponse { total_tweets }))
}
