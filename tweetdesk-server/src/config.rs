use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub tweets_path: String,
    pub count_path: String,
}

/// Locations of the CSV lookup tables, relative to `dir` unless absolute.
#[derive(Debug, Clone, Deserialize)]
pub struct Data {
    pub dir: String,
    pub kols_file: String,
    pub pfp_file: String,
    pub runes_social_file: String,
    pub og_file: String,
}

impl Data {
    pub fn path_of(&self, file: &str) -> PathBuf {
        PathBuf::from(&self.dir).join(file)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Archive {
    /// When set, every `add_users` request body is saved here.
    pub request_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub data: Data,
    #[serde(default)]
    pub archive: Archive,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. Optional settings.toml
        let config_file_name = "settings.toml";

        let current_dir_path = PathBuf::from(config_file_name);
        if current_dir_path.exists() {
            builder = builder.add_source(File::from(current_dir_path).required(false));
        }

        // Development layout: run from the workspace root
        let dev_path = PathBuf::from("tweetdesk-server").join(config_file_name);
        if dev_path.exists() {
            builder = builder.add_source(File::from(dev_path).required(false));
        }

        // 2. Defaults
        builder = builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("database.tweets_path", "tweets.db")?
            .set_default("database.count_path", "count.db")?
            .set_default("data.dir", "./data")?
            .set_default("data.kols_file", "kols.csv")?
            .set_default("data.pfp_file", "pfp_rootverse.csv")?
            .set_default("data.runes_social_file", "runes_social.csv")?
            .set_default("data.og_file", "og.csv")?;

        // 3. Environment variables (highest priority)
        let overrides = [
            ("TWEETS_DB_PATH", "database.tweets_path"),
            ("COUNT_DB_PATH", "database.count_path"),
            ("DATA_DIR", "data.dir"),
            ("REQUEST_ARCHIVE_DIR", "archive.request_dir"),
            ("PORT", "server.port"),
            ("HOST", "server.host"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        let s = builder.build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_join_directory() {
        let data = Data {
            dir: "/srv/data".to_string(),
            kols_file: "kols.csv".to_string(),
            pfp_file: "pfp_rootverse.csv".to_string(),
            runes_social_file: "runes_social.csv".to_string(),
            og_file: "og.csv".to_string(),
        };
        assert_eq!(data.path_of(&data.kols_file), PathBuf::from("/srv/data/kols.csv"));
    }
}
