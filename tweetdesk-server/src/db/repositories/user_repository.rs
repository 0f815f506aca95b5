use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{OptionalExtension, Row, Transaction};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use tweetdesk_types::{FollowerAverage, TimeWindow, UserIngestReport, UserProfile};

use super::{loose_int, loose_text};
use crate::db::DbPool;
use crate::timestamps::to_storage;

const SELECT_PROFILE: &str = "SELECT user_id, screen_name, name, description, location,
        followers_count, friends_count, listed_count, favourites_count, media_count,
        created_at, profile_image_url, verified, last_updated
     FROM users_v2";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UserPayloadError {
    #[error("Invalid JSON data received")]
    InvalidPayload,
    #[error("No valid users data found")]
    NoUsers,
}

/// Pull user objects out of the scraper's `output[].data.users[]` envelope.
///
/// Items without a `data` object or users are skipped, as are users without
/// an id and repeats of an id already seen in this payload.
pub fn extract_users(payload: &Value) -> Result<Vec<Value>, UserPayloadError> {
    let outputs = payload
        .get("output")
        .and_then(Value::as_array)
        .ok_or(UserPayloadError::InvalidPayload)?;

    let mut seen = HashSet::new();
    let mut users = Vec::new();

    for (i, item) in outputs.iter().enumerate() {
        let Some(data) = item.get("data").and_then(Value::as_object) else {
            debug!("Skipping output item {}: no data object", i + 1);
            continue;
        };
        let Some(item_users) = data.get("users").and_then(Value::as_array) else {
            debug!("Skipping output item {}: no users", i + 1);
            continue;
        };

        for user in item_users {
            let Some(id) = user.get("id").and_then(user_key) else {
                debug!("Skipping user without id");
                continue;
            };
            if seen.insert(id) {
                users.push(user.clone());
            }
        }
    }

    if users.is_empty() {
        return Err(UserPayloadError::NoUsers);
    }
    Ok(users)
}

fn user_key(id: &Value) -> Option<String> {
    match id {
        Value::Number(n) if n.as_i64() != Some(0) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Profile fields taken from one scraped user object.
#[derive(Debug)]
struct ProfileRow<'a> {
    user_id: i64,
    screen_name: &'a str,
    user: &'a Value,
}

impl<'a> ProfileRow<'a> {
    fn from_raw(user: &'a Value) -> Result<Self, String> {
        let label = user.get("id").and_then(user_key).unwrap_or_else(|| "Unknown ID".to_string());
        let user_id = match user.get("id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .ok_or_else(|| label.clone())?;
        let screen_name = user
            .get("screen_name")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(label)?;
        Ok(Self {
            user_id,
            screen_name,
            user,
        })
    }

    fn text(&self, key: &str) -> Option<&'a str> {
        self.user.get(key).and_then(Value::as_str)
    }

    fn count(&self, key: &str) -> Option<i64> {
        self.user.get(key).and_then(Value::as_i64)
    }

    fn verified(&self) -> bool {
        self.user
            .get("verified")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Twitter profiles in `users_v2` and their follower history.
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store the latest profile of each user and append a history row.
    pub fn upsert_batch(&self, users: &[Value], now: DateTime<Utc>) -> Result<UserIngestReport> {
        let captured_at = to_storage(&now);
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;

        let mut inserted = Vec::new();
        let mut updated = Vec::new();
        let mut errors = Vec::new();

        for user in users {
            let profile = match ProfileRow::from_raw(user) {
                Ok(profile) => profile,
                Err(label) => {
                    warn!("Rejecting user {}: missing id or screen_name", label);
                    errors.push(label);
                    continue;
                }
            };

            match upsert_profile(&tx, &profile, &captured_at) {
                Ok(true) => inserted.push(profile.user_id.to_string()),
                Ok(false) => updated.push(profile.user_id.to_string()),
                Err(e) => {
                    warn!("Failed to store user {}: {}", profile.user_id, e);
                    errors.push(profile.user_id.to_string());
                }
            }
        }

        tx.commit().context("Failed to commit user batch")?;
        Ok(UserIngestReport::new(inserted, updated, errors))
    }

    /// Average follower count per user over each window's snapshots.
    ///
    /// A window covers snapshots captured at or after `now - days`.
    pub fn follower_averages(&self, now: DateTime<Utc>) -> Result<Vec<FollowerAverage>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT s.user_id, u.screen_name, AVG(s.followers_count)
             FROM user_snapshots s
             JOIN users_v2 u ON u.user_id = s.user_id
             WHERE s.captured_at >= ? AND s.followers_count IS NOT NULL
             GROUP BY s.user_id, u.screen_name",
        )?;

        let mut per_user: BTreeMap<i64, FollowerAverage> = BTreeMap::new();
        for window in TimeWindow::ALL {
            let since = to_storage(&(now - Duration::days(window.days())));
            let rows = stmt
                .query_map([since], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, f64>(2)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for (user_id, screen_name, average) in rows {
                per_user
                    .entry(user_id)
                    .or_insert_with(|| FollowerAverage {
                        user_id,
                        screen_name,
                        averages: BTreeMap::new(),
                    })
                    .averages
                    .insert(window, average);
            }
        }

        Ok(per_user.into_values().collect())
    }

    pub fn count(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let count = conn.query_row("SELECT COUNT(*) FROM users_v2", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Most recently updated profiles.
    pub fn latest(&self, limit: u32) -> Result<Vec<UserProfile>> {
        self.list(&format!("{} ORDER BY last_updated DESC LIMIT ?", SELECT_PROFILE), limit)
    }

    pub fn top_by_followers(&self, limit: u32) -> Result<Vec<UserProfile>> {
        self.list(
            &format!("{} ORDER BY followers_count DESC LIMIT ?", SELECT_PROFILE),
            limit,
        )
    }

    pub fn get_by_screen_name(&self, screen_name: &str) -> Result<Option<UserProfile>> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                &format!("{} WHERE screen_name = ? COLLATE NOCASE", SELECT_PROFILE),
                [screen_name],
                map_profile,
            )
            .optional()?;
        Ok(profile)
    }

    pub fn get_by_id(&self, user_id: i64) -> Result<Option<UserProfile>> {
        let conn = self.pool.get()?;
        let profile = conn
            .query_row(
                &format!("{} WHERE user_id = ?", SELECT_PROFILE),
                [user_id],
                map_profile,
            )
            .optional()?;
        Ok(profile)
    }

    fn list(&self, query: &str, limit: u32) -> Result<Vec<UserProfile>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(query)?;
        let profiles = stmt
            .query_map([limit], map_profile)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }
}

/// Returns `true` when the user was not stored before.
fn upsert_profile(tx: &Transaction<'_>, profile: &ProfileRow<'_>, captured_at: &str) -> Result<bool> {
    let existed = tx
        .query_row(
            "SELECT 1 FROM users_v2 WHERE user_id = ?",
            [profile.user_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();

    tx.execute(
        "INSERT INTO users_v2 (
            user_id, screen_name, name, description, location,
            followers_count, friends_count, listed_count,
            favourites_count, media_count, created_at,
            profile_image_url, verified, last_updated
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(user_id) DO UPDATE SET
            screen_name = excluded.screen_name,
            name = excluded.name,
            description = excluded.description,
            location = excluded.location,
            followers_count = excluded.followers_count,
            friends_count = excluded.friends_count,
            listed_count = excluded.listed_count,
            favourites_count = excluded.favourites_count,
            media_count = excluded.media_count,
            created_at = excluded.created_at,
            profile_image_url = excluded.profile_image_url,
            verified = excluded.verified,
            last_updated = excluded.last_updated",
        rusqlite::params![
            profile.user_id,
            profile.screen_name,
            profile.text("name"),
            profile.text("description"),
            profile.text("location"),
            profile.count("followers_count"),
            profile.count("friends_count"),
            profile.count("listed_count"),
            profile.count("favourites_count"),
            profile.count("media_count"),
            profile.text("created_at"),
            profile.text("profile_image_url_https"),
            profile.verified(),
            captured_at,
        ],
    )
    .with_context(|| format!("Failed to upsert user {}", profile.user_id))?;

    tx.execute(
        "INSERT INTO user_snapshots (user_id, screen_name, followers_count, captured_at)
         VALUES (?, ?, ?, ?)",
        (
            profile.user_id,
            profile.screen_name,
            profile.count("followers_count"),
            captured_at,
        ),
    )
    .with_context(|| format!("Failed to record snapshot for user {}", profile.user_id))?;

    Ok(!existed)
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<UserProfile> {
    Ok(UserProfile {
        user_id: row.get(0)?,
        screen_name: row.get(1)?,
        name: loose_text(row, 2)?,
        description: loose_text(row, 3)?,
        location: loose_text(row, 4)?,
        followers_count: loose_int(row, 5)?,
        friends_count: loose_int(row, 6)?,
        listed_count: loose_int(row, 7)?,
        favourites_count: loose_int(row, 8)?,
        media_count: loose_int(row, 9)?,
        created_at: loose_text(row, 10)?,
        profile_image_url: loose_text(row, 11)?,
        verified: loose_int(row, 12)?.unwrap_or(0) != 0,
        last_updated: loose_text(row, 13)?.unwrap_or_default(),
    })
}
