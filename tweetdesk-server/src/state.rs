use std::path::PathBuf;
use std::sync::Arc;

use crate::db::Database;
use crate::lookups::Lookups;

#[derive(Clone)]
pub struct AppState {
    /// `tweets.db`: legacy tweets, tweets_v2, users_v2 and snapshots.
    pub tweets_db: Database,
    /// `count.db`: Rootverse inscriptions.
    pub count_db: Database,
    pub lookups: Arc<Lookups>,
    /// Where `add_users` request bodies are archived, if anywhere.
    pub archive_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(tweets_db: Database, count_db: Database, lookups: Lookups) -> Self {
        Self {
            tweets_db,
            count_db,
            lookups: Arc::new(lookups),
            archive_dir: None,
        }
    }

    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }
}
