use std::path::Path;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use tweetdesk_server::db::{
    migrations::{inspect_table, rebuild_tweets_v2},
    repositories::{TweetRepository, UserRepository},
    schema::{COUNTS, TWEETS},
    Database,
};
use tweetdesk_server::timestamps::parse_range_bound;
use tweetdesk_types::UserProfile;

/// Tweetdesk maintenance utility
///
/// Creates schemas, runs one-shot migrations and prints reports for the
/// tweets and inscription databases.
#[derive(Parser, Debug)]
#[command(name = "tweetdesk-migrate")]
#[command(about = "Schema migrations and reports for tweetdesk databases", long_about = None)]
struct Cli {
    /// Path to the tweets database
    #[arg(short, long, global = true, default_value = "./tweets.db", env = "TWEETS_DB_PATH")]
    database: String,

    /// Path to the inscription count database
    #[arg(long, global = true, default_value = "./count.db", env = "COUNT_DB_PATH")]
    count_database: String,

    /// Report what a migration would change without committing it
    #[arg(short = 'n', long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create every table and index in both databases
    Init,
    /// Rebuild tweets_v2 into the current column layout
    RebuildTweetsV2,
    /// Fill CreatedAtUtc and userid on older tweets_v2 rows
    Backfill,
    /// Show the columns and row count of a table
    Inspect {
        #[arg(short, long)]
        table: String,
        /// Inspect the count database instead of the tweets database
        #[arg(long)]
        count: bool,
    },
    /// Browse and manage tweets_v2
    Tweets {
        #[command(subcommand)]
        command: TweetsCommand,
    },
    /// Reports over users_v2
    Users {
        #[command(subcommand)]
        command: UsersCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TweetsCommand {
    /// Table layout, row count and date span
    Info,
    /// Most recent tweets
    Latest {
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Tweets created between two dates (YYYY-MM-DD or YYYY-MM-DD HH:MM:SS)
    Range { start: String, end: String },
    /// Tweets by author id
    ByUser { userid: String },
    /// A single tweet
    ById { tweet_id: String },
    /// Delete every row of tweets_v2
    Clear {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
enum UsersCommand {
    /// Totals, latest updates and top accounts, or one account in detail
    Report {
        #[arg(short, long)]
        screen_name: Option<String>,
    },
}

/// Open an existing database file
fn connect_database(path: &str) -> Result<Database> {
    println!("Connecting to database: {}", path);

    if !Path::new(path).exists() {
        anyhow::bail!("Database file not found: {}", path);
    }

    Database::new(path).context("Failed to open database connection")
}

/// Open the tweets database and add any columns older files lack.
fn open_tweets_database(path: &str) -> Result<Database> {
    let db = connect_database(path)?;
    db.initialize(&TWEETS).with_context(|| {
        format!(
            "Failed to upgrade {} to the current schema; try `tweetdesk-migrate rebuild-tweets-v2`",
            path
        )
    })?;
    Ok(db)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    println!("{} (y/N): ", prompt);
    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn run_init(tweets: &Database, counts: &Database) -> Result<()> {
    tweets
        .initialize(&TWEETS)
        .context("Failed to initialize tweets database")?;
    counts
        .initialize(&COUNTS)
        .context("Failed to initialize count database")?;
    println!("Schemas '{}' and '{}' are up to date", TWEETS.name, COUNTS.name);
    Ok(())
}

fn run_rebuild(db: &Database, dry_run: bool) -> Result<()> {
    let report = rebuild_tweets_v2(db, dry_run)?;

    println!();
    println!("Rebuild Summary");
    println!("===============");
    println!("Rows before: {}", report.rows_before);
    println!("Rows after: {}", report.rows_after);
    println!("Copied columns: {}", report.copied_columns.join(", "));
    println!();
    if report.dry_run {
        println!("This was a dry run - no changes were made to the database.");
    } else {
        println!("Rebuild completed successfully!");
    }
    Ok(())
}

fn run_backfill(db: &Database, dry_run: bool) -> Result<()> {
    let report = TweetRepository::new(db.pool.clone()).backfill(dry_run)?;

    println!();
    println!("Backfill Summary");
    println!("================");
    println!("Rows scanned: {}", report.scanned);
    println!("CreatedAtUtc filled: {}", report.created_at_filled);
    println!("userid filled: {}", report.userid_filled);
    println!();
    if dry_run {
        println!("This was a dry run - no changes were made to the database.");
    }
    Ok(())
}

fn run_tweets(db: &Database, command: TweetsCommand) -> Result<()> {
    let repo = TweetRepository::new(db.pool.clone());
    match command {
        TweetsCommand::Info => print_json(&repo.table_info()?),
        TweetsCommand::Latest { limit } => print_json(&repo.get_latest(limit)?),
        TweetsCommand::Range { start, end } => {
            let start = parse_range_bound(&start, false)?;
            let end = parse_range_bound(&end, true)?;
            let tweets = repo.get_in_range(start, end)?;
            println!("Found {} tweets", tweets.len());
            print_json(&tweets)
        }
        TweetsCommand::ByUser { userid } => {
            let tweets = repo.get_by_userid(&userid)?;
            println!("Found {} tweets by {}", tweets.len(), userid);
            print_json(&tweets)
        }
        TweetsCommand::ById { tweet_id } => match repo.get_by_id(&tweet_id)? {
            Some(tweet) => print_json(&tweet),
            None => {
                println!("Tweet {} not found", tweet_id);
                Ok(())
            }
        },
        TweetsCommand::Clear { yes } => {
            if !yes && !confirm("This will delete every row of tweets_v2. Continue?")? {
                println!("Clear cancelled.");
                return Ok(());
            }
            let deleted = repo.clear()?;
            println!("Deleted {} tweets", deleted);
            Ok(())
        }
    }
}

fn print_profiles(title: &str, users: &[UserProfile]) {
    println!();
    println!("{}", title);
    for user in users {
        println!(
            "  @{} ({}) followers={} updated={}",
            user.screen_name,
            user.user_id,
            user.followers_count.unwrap_or_default(),
            user.last_updated
        );
    }
}

fn run_users(db: &Database, command: UsersCommand) -> Result<()> {
    let repo = UserRepository::new(db.pool.clone());
    match command {
        UsersCommand::Report {
            screen_name: Some(screen_name),
        } => match repo.get_by_screen_name(&screen_name)? {
            Some(user) => print_json(&user),
            None => {
                println!("User {} not found", screen_name);
                Ok(())
            }
        },
        UsersCommand::Report { screen_name: None } => {
            println!("Total users: {}", repo.count()?);
            print_profiles("Latest updated:", &repo.latest(5)?);
            print_profiles("Top by followers:", &repo.top_by_followers(5)?);
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    println!("Tweetdesk Maintenance Utility");
    println!("=============================");
    println!();

    match cli.command {
        Command::Init => {
            let tweets = Database::new(&cli.database).context("Failed to open tweets database")?;
            let counts =
                Database::new(&cli.count_database).context("Failed to open count database")?;
            run_init(&tweets, &counts)
        }
        Command::RebuildTweetsV2 => run_rebuild(&connect_database(&cli.database)?, cli.dry_run),
        Command::Backfill => run_backfill(&open_tweets_database(&cli.database)?, cli.dry_run),
        Command::Inspect { table, count } => {
            let path = if count { &cli.count_database } else { &cli.database };
            print_json(&inspect_table(&connect_database(path)?, &table)?)
        }
        Command::Tweets { command } => run_tweets(&open_tweets_database(&cli.database)?, command),
        Command::Users { command } => run_users(&open_tweets_database(&cli.database)?, command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn initialized() -> (Database, Database) {
        let tweets = Database::in_memory().expect("Failed to create tweets database");
        let counts = Database::in_memory().expect("Failed to create count database");
        run_init(&tweets, &counts).expect("Failed to initialize");
        (tweets, counts)
    }

    #[test]
    fn test_cli_parses_nested_subcommands() {
        let cli = Cli::try_parse_from([
            "tweetdesk-migrate",
            "--database",
            "/tmp/t.db",
            "tweets",
            "range",
            "2024-01-01",
            "2024-01-31",
        ])
        .expect("Failed to parse");
        assert_eq!(cli.database, "/tmp/t.db");
        assert!(matches!(
            cli.command,
            Command::Tweets {
                command: TweetsCommand::Range { .. }
            }
        ));

        let cli = Cli::try_parse_from(["tweetdesk-migrate", "backfill", "--dry-run"]).expect("Failed to parse");
        assert!(cli.dry_run);
    }

    #[test]
    fn test_inspect_requires_table() {
        assert!(Cli::try_parse_from(["tweetdesk-migrate", "inspect"]).is_err());
    }

    #[test]
    fn test_init_is_idempotent() {
        let (tweets, counts) = initialized();
        run_init(&tweets, &counts).expect("Second init failed");
        assert!(tweets.table_exists("users_v2").expect("Failed to check"));
        assert!(counts.table_exists("count").expect("Failed to check"));
    }

    #[test]
    fn test_backfill_dry_run_leaves_rows_untouched() {
        let (tweets, _) = initialized();
        tweets
            .connection()
            .expect("Failed to get connection")
            .execute(
                "INSERT INTO tweets_v2 (tweetID, Content, CreatedAt) VALUES (?, ?, ?)",
                (
                    "1",
                    json!({"rest_id": "1", "user": {"rest_id": "9"}}).to_string(),
                    "Wed Oct 10 20:19:24 +0000 2018",
                ),
            )
            .expect("Failed to insert tweet");

        run_backfill(&tweets, true).expect("Dry run failed");
        let repo = TweetRepository::new(tweets.pool.clone());
        let stored = repo.get_by_id("1").expect("Failed to read").expect("Missing tweet");
        assert_eq!(stored.created_at_utc, None);

        run_backfill(&tweets, false).expect("Backfill failed");
        let stored = repo.get_by_id("1").expect("Failed to read").expect("Missing tweet");
        assert_eq!(stored.created_at_utc.as_deref(), Some("2018-10-10 20:19:24"));
        assert_eq!(stored.userid.as_deref(), Some("9"));
    }

    #[test]
    fn test_older_file_is_upgraded_before_backfill() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("tweets.db");
        let path = path.to_str().expect("Non-UTF-8 temp path");

        let old = Database::new(path).expect("Failed to create database");
        old.connection()
            .expect("Failed to get connection")
            .execute_batch(
                "CREATE TABLE tweets_v2 (tweetID TEXT PRIMARY KEY, Content TEXT, CreatedAt TEXT);
                 INSERT INTO tweets_v2 VALUES ('7', '{\"user\": {\"rest_id\": \"42\"}}', 'Wed Oct 10 20:19:24 +0000 2018');",
            )
            .expect("Failed to create old layout");
        drop(old);

        let db = open_tweets_database(path).expect("Failed to open old file");
        run_backfill(&db, false).expect("Backfill failed");

        let stored = TweetRepository::new(db.pool.clone())
            .get_by_id("7")
            .expect("Failed to read")
            .expect("Missing tweet");
        assert_eq!(stored.userid.as_deref(), Some("42"));
        assert_eq!(stored.created_at_utc.as_deref(), Some("2018-10-10 20:19:24"));
    }

    #[test]
    fn test_clear_with_yes_deletes_rows() {
        let (tweets, _) = initialized();
        TweetRepository::new(tweets.pool.clone())
            .insert_batch(&[json!({"rest_id": "5", "created_at": "Wed Oct 10 20:19:24 +0000 2018"})])
            .expect("Failed to insert");

        run_tweets(&tweets, TweetsCommand::Clear { yes: true }).expect("Clear failed");
        assert_eq!(tweets.row_count("tweets_v2").expect("Failed to count"), 0);
    }
}
