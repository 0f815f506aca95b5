use std::path::{Path as FsPath, PathBuf};

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use tweetdesk_types::{
    FollowerAveragesResponse, TimeWindow, UserIngestReport, UserProfile, UserStatsResponse,
};

use crate::{
    analytics::{count_by_screen_name, window_start},
    api::{ApiError, ApiResult},
    db::repositories::{extract_users, TweetRepository, UserRepository},
    state::AppState,
    timestamps::to_storage,
};

/// POST /users/add_users - Store user profiles from a scraper run
pub async fn add_users(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<UserIngestReport>> {
    let now = Utc::now();

    if let Some(dir) = &state.archive_dir {
        // Archiving is best effort; ingestion goes on without it
        match archive_request(dir, &payload, now).await {
            Ok(path) => tracing::debug!("Request saved to {}", path.display()),
            Err(e) => tracing::warn!("Failed to archive user request: {:#}", e),
        }
    }

    let users = extract_users(&payload)?;
    tracing::info!("Extracted {} unique users", users.len());

    let repo = UserRepository::new(state.tweets_db.pool.clone());
    let report = repo
        .upsert_batch(&users, now)
        .map_err(|e| ApiError::InternalError(format!("Failed to store users: {:#}", e)))?;

    tracing::info!(
        "Users: {} inserted, {} updated, {} errors",
        report.total_inserted,
        report.total_updated,
        report.total_errors
    );
    Ok(Json(report))
}

/// GET /users/get_user_follower_averages
pub async fn get_user_follower_averages(
    State(state): State<AppState>,
) -> ApiResult<Json<FollowerAveragesResponse>> {
    let now = Utc::now();
    let repo = UserRepository::new(state.tweets_db.pool.clone());
    let averages = repo.follower_averages(now)?;

    Ok(Json(FollowerAveragesResponse {
        total_users: averages.len(),
        updated_at: updated_at(now),
        averages,
    }))
}

/// GET /users/get_user_stats - Tweet counts per author and window
pub async fn get_user_stats(State(state): State<AppState>) -> ApiResult<Json<UserStatsResponse>> {
    let now = Utc::now();
    let repo = TweetRepository::new(state.tweets_db.pool.clone());
    let rows = repo.authored_since(window_start(now, TimeWindow::longest()))?;
    let stats = count_by_screen_name(now, rows);

    Ok(Json(UserStatsResponse {
        total_users: stats.len(),
        updated_at: updated_at(now),
        stats,
    }))
}

/// GET /users/by_screen_name/:screen_name
pub async fn get_user_by_screen_name(
    State(state): State<AppState>,
    Path(screen_name): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let repo = UserRepository::new(state.tweets_db.pool.clone());
    repo.get_by_screen_name(&screen_name)?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("User {} not found", screen_name)))
}

/// Report timestamp, e.g. `2024-09-23 08:05:01 UTC`.
pub fn updated_at(now: DateTime<Utc>) -> String {
    format!("{} UTC", to_storage(&now))
}

pub fn archive_file_name(now: DateTime<Utc>) -> String {
    format!(
        "user_request_{}_{}.json",
        now.format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().simple()
    )
}

async fn archive_request(dir: &FsPath, payload: &Value, now: DateTime<Utc>) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(archive_file_name(now));
    tokio::fs::write(&path, serde_json::to_vec_pretty(payload)?).await?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_updated_at_is_marked_utc() {
        let now = Utc.with_ymd_and_hms(2024, 9, 23, 8, 5, 1).unwrap();
        assert_eq!(updated_at(now), "2024-09-23 08:05:01 UTC");
    }

    #[test]
    fn test_archive_file_names_are_unique() {
        let now = Utc.with_ymd_and_hms(2024, 9, 23, 8, 5, 1).unwrap();
        let first = archive_file_name(now);
        let second = archive_file_name(now);
        assert!(first.starts_with("user_request_20240923_080501_"));
        assert!(first.ends_with(".json"));
        assert_ne!(first, second);
    }
}
