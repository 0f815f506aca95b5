use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::Value;

use tweetdesk_types::{BatchIngestReport, TweetList, TweetRecord, TweetSummary};

use crate::{
    api::{ApiError, ApiResult},
    db::repositories::TweetRepository,
    digest,
    state::AppState,
    timestamps::parse_range_bound,
};

const MAX_DAYS: i64 = 36_500;

#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// POST /v2/add_tweets - Store a JSON array of raw tweets
pub async fn add_tweets(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<BatchIngestReport>> {
    let tweets = match &payload {
        Value::Array(tweets) if !tweets.is_empty() => tweets,
        Value::Array(_) | Value::Null => {
            return Err(ApiError::BadRequest("No JSON data received".to_string()))
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Expected a JSON array of tweets".to_string(),
            ))
        }
    };

    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let report = repo.insert_batch(tweets)?;

    tracing::info!(
        "Inserted {} tweets, skipped {}",
        report.total_inserted,
        report.total_skipped
    );
    Ok(Json(report))
}

/// POST /v2/add_all_tweets - Store every post in a scraper run
pub async fn add_all_tweets(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<BatchIngestReport>> {
    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let report = repo.insert_scraper_output(&payload)?;

    tracing::info!(
        "Scraper output: {} inserted, {} skipped, {} errors",
        report.total_inserted,
        report.total_skipped,
        report.total_errors.unwrap_or(0)
    );
    Ok(Json(report))
}

/// GET /v2/get_tweets?days=N - Tweets created in the last N days
pub async fn get_tweets(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Json<TweetList<TweetSummary>>> {
    let days = match params.get("days") {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            ApiError::BadRequest("Invalid 'days' parameter. Must be an integer.".to_string())
        })?,
        None => 1,
    };
    if days.abs() > MAX_DAYS {
        return Err(ApiError::BadRequest(format!(
            "'days' must be between -{} and {}",
            MAX_DAYS, MAX_DAYS
        )));
    }
    let since = Utc::now()
        .checked_sub_signed(Duration::days(days))
        .ok_or_else(|| ApiError::BadRequest("'days' is out of range".to_string()))?;

    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let tweets = repo.get_since(since)?;
    Ok(Json(TweetList { tweets }))
}

/// GET /v2/get_todays_tweets_formated - HTML digest of today and yesterday
pub async fn get_todays_tweets_formated(State(state): State<AppState>) -> Response {
    let now = Utc::now();
    let repo = TweetRepository::new(state.tweets_db.pool.clone());

    let records = digest::digest_window(now)
        .map_err(anyhow::Error::from)
        .and_then(|(start, end)| repo.get_in_range(start, end));

    match records {
        Ok(records) => Html(digest::render(&records, now)).into_response(),
        Err(e) => {
            tracing::error!("Failed to build digest: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(digest::render_error(&e.to_string())),
            )
                .into_response()
        }
    }
}

/// GET /v2/tweets/:id
pub async fn get_tweet(
    State(state): State<AppState>,
    Path(tweet_id): Path<String>,
) -> ApiResult<Json<TweetRecord>> {
    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    repo.get_by_id(&tweet_id)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Tweet {} not found", tweet_id)))
}

/// GET /v2/users/:userid/tweets
pub async fn get_user_tweets(
    State(state): State<AppState>,
    Path(userid): Path<String>,
) -> ApiResult<Json<TweetList<TweetRecord>>> {
    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let tweets = repo.get_by_userid(&userid)?;
    Ok(Json(TweetList { tweets }))
}

/// GET /v2/tweets?start=&end= - Tweets created within a date range
pub async fn get_tweets_in_range(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<TweetList<TweetRecord>>> {
    let (Some(start), Some(end)) = (query.start.as_deref(), query.end.as_deref()) else {
        return Err(ApiError::BadRequest(
            "Both 'start' and 'end' are required".to_string(),
        ));
    };
    let start = parse_range_bound(start, false).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let end = parse_range_bound(end, true).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if start > end {
        return Err(ApiError::BadRequest("'start' is after 'end'".to_string()));
    }

    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let tweets = repo.get_in_range(start, end)?;
    Ok(Json(TweetList { tweets }))
}
