mod inscription_repository;
mod legacy_tweet_repository;
mod tweet_repository;
mod user_repository;

pub use inscription_repository::InscriptionRepository;
pub use legacy_tweet_repository::{LegacyTweetRepository, DEFAULT_LATEST_LIMIT};
pub use tweet_repository::{summarize, BackfillReport, IngestError, TweetRepository};
pub use user_repository::{extract_users, UserPayloadError, UserRepository};

use rusqlite::types::ValueRef;
use rusqlite::Row;

/// Read a column as text whatever its stored type.
///
/// Scraper-written files are not consistent about storing ids as text or
/// integers.
pub(crate) fn loose_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    })
}

/// Read a column as an integer, accepting numeric text.
pub(crate) fn loose_int(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<i64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i),
        ValueRef::Real(f) => Some(f as i64),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            String::from_utf8_lossy(bytes).trim().parse().ok()
        }
    })
}
