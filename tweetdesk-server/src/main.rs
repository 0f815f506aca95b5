use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tweetdesk_server::{
    config::Settings,
    db::{
        schema::{COUNTS, TWEETS},
        Database,
    },
    lookups::Lookups,
    routes::router,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tweetdesk_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load settings
    let settings = Settings::new().context("Failed to load settings")?;

    // Initialize databases
    let tweets_db = Database::new(&settings.database.tweets_path)
        .context("Failed to open tweets database")?;
    tweets_db
        .initialize(&TWEETS)
        .context("Failed to initialize tweets schema")?;

    let count_db = Database::new(&settings.database.count_path)
        .context("Failed to open count database")?;
    count_db
        .initialize(&COUNTS)
        .context("Failed to initialize count schema")?;

    tracing::info!("Databases initialized successfully");

    // Lookup tables are read once; restart to pick up new files
    let lookups = Lookups::load(&settings.data).context("Failed to load lookup tables")?;
    tracing::info!(
        "Loaded {} KOL ids, {} PFP urls",
        lookups.kols.userids().len(),
        lookups.pfp.len()
    );

    // Create application state
    let mut state = AppState::new(tweets_db, count_db, lookups);
    if let Some(dir) = &settings.archive.request_dir {
        tracing::info!("Archiving add_users requests to {}", dir);
        state = state.with_archive_dir(dir);
    }

    let app = router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Failed to parse server address")?;
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
