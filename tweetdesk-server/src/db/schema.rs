//! Table definitions for the two SQLite files the service reads.
//!
//! `tweets.db` holds the scraped tweets and user profiles, `count.db` the
//! Rootverse inscription holdings. Columns added after the first release are
//! listed separately so older files can be upgraded in place.

/// A column introduced after the table was first shipped.
#[derive(Debug, Clone, Copy)]
pub struct AddedColumn {
    pub table: &'static str,
    pub column: &'static str,
    pub definition: &'static str,
}

/// Schema of one database file.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub name: &'static str,
    pub tables: &'static str,
    pub added_columns: &'static [AddedColumn],
    /// Indexes that depend on added columns, created after the upgrade.
    pub indexes: &'static [&'static str],
}

pub const TWEETS_TABLES: &str = r#"
-- Legacy scraper output, one row per tweet
CREATE TABLE IF NOT EXISTS tweets (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    Title TEXT,
    Author TEXT,
    CreateTime TEXT,
    Link TEXT,
    TweetId TEXT UNIQUE,
    Score INTEGER,
    TweetType TEXT
);

-- Raw tweets as delivered by the scraper
CREATE TABLE IF NOT EXISTS tweets_v2 (
    tweetID TEXT PRIMARY KEY,
    Content TEXT,
    CreatedAt TEXT,
    userid TEXT,
    CreatedAtUtc TEXT
);

-- Latest profile per user
CREATE TABLE IF NOT EXISTS users_v2 (
    user_id INTEGER PRIMARY KEY,
    screen_name TEXT NOT NULL,
    name TEXT,
    description TEXT,
    location TEXT,
    followers_count INTEGER,
    friends_count INTEGER,
    listed_count INTEGER,
    favourites_count INTEGER,
    media_count INTEGER,
    created_at TEXT,
    profile_image_url TEXT,
    verified INTEGER NOT NULL DEFAULT 0,
    last_updated TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_screen_name ON users_v2(screen_name);

-- Follower history, one row per ingestion
CREATE TABLE IF NOT EXISTS user_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    screen_name TEXT NOT NULL,
    followers_count INTEGER,
    captured_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_snapshots_user_captured ON user_snapshots(user_id, captured_at);
CREATE INDEX IF NOT EXISTS idx_snapshots_captured ON user_snapshots(captured_at);
"#;

pub const TWEETS_ADDED_COLUMNS: &[AddedColumn] = &[
    AddedColumn {
        table: "tweets",
        column: "TweetType",
        definition: "TEXT",
    },
    AddedColumn {
        table: "tweets_v2",
        column: "userid",
        definition: "TEXT",
    },
    AddedColumn {
        table: "tweets_v2",
        column: "CreatedAtUtc",
        definition: "TEXT",
    },
];

pub const TWEETS_V2_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_tweets_v2_created_utc ON tweets_v2(CreatedAtUtc DESC);
CREATE INDEX IF NOT EXISTS idx_tweets_v2_userid ON tweets_v2(userid);
"#;

pub const LEGACY_TWEETS_INDEXES: &str =
    "CREATE INDEX IF NOT EXISTS idx_tweets_type ON tweets(TweetType);";

pub const COUNT_TABLES: &str = r#"
-- Rootverse inscriptions and their current holders
CREATE TABLE IF NOT EXISTS count (
    number INTEGER,
    count INTEGER,
    subrace TEXT,
    inscription TEXT,
    wallet TEXT,
    content TEXT,
    image_url TEXT
);
"#;

pub const COUNT_ADDED_COLUMNS: &[AddedColumn] = &[AddedColumn {
    table: "count",
    column: "image_url",
    definition: "TEXT",
}];

pub const COUNT_INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_count_inscription ON count(inscription);
CREATE INDEX IF NOT EXISTS idx_count_wallet ON count(wallet);
CREATE INDEX IF NOT EXISTS idx_count_number ON count(number);
"#;

pub const TWEETS: Schema = Schema {
    name: "tweets",
    tables: TWEETS_TABLES,
    added_columns: TWEETS_ADDED_COLUMNS,
    indexes: &[LEGACY_TWEETS_INDEXES, TWEETS_V2_INDEXES],
};

pub const COUNTS: Schema = Schema {
    name: "count",
    tables: COUNT_TABLES,
    added_columns: COUNT_ADDED_COLUMNS,
    indexes: &[COUNT_INDEXES],
};

/// Column set of `count`, used to vet user-supplied column names.
pub const COUNT_COLUMNS: &[&str] = &[
    "number",
    "count",
    "subrace",
    "inscription",
    "wallet",
    "content",
    "image_url",
];
