use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{api, state::AppState};

/// Every route the service exposes, grouped by the data they serve.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Legacy tweets
        .route("/tweets/add_tweets", post(api::tweets::add_tweets))
        .route("/tweets/get_todays_tweets", get(api::tweets::get_todays_tweets))
        .route("/tweets/get_latest_tweets", get(api::tweets::get_latest_tweets))
        .route("/tweets/get_total_tweets", get(api::tweets::get_total_tweets))
        // Raw tweets
        .route("/v2/add_tweets", post(api::tweets_v2::add_tweets))
        .route("/v2/add_all_tweets", post(api::tweets_v2::add_all_tweets))
        .route("/v2/get_tweets", get(api::tweets_v2::get_tweets))
        .route(
            "/v2/get_todays_tweets_formated",
            get(api::tweets_v2::get_todays_tweets_formated),
        )
        .route("/v2/tweets", get(api::tweets_v2::get_tweets_in_range))
        .route("/v2/tweets/:id", get(api::tweets_v2::get_tweet))
        .route("/v2/users/:userid/tweets", get(api::tweets_v2::get_user_tweets))
        // User profiles
        .route("/users/add_users", post(api::users::add_users))
        .route(
            "/users/get_user_follower_averages",
            get(api::users::get_user_follower_averages),
        )
        .route("/users/get_user_stats", get(api::users::get_user_stats))
        .route(
            "/users/by_screen_name/:screen_name",
            get(api::users::get_user_by_screen_name),
        )
        // Rootverse inscriptions
        .route("/rootverse/distinct_values", get(api::rootverse::distinct_values))
        .route("/rootverse/query", get(api::rootverse::query))
        .route("/rootverse/wallet_count", get(api::rootverse::wallet_count))
        .route("/rootverse/ranked_wallets", get(api::rootverse::ranked_wallets))
        .route("/rootverse/stats", get(api::rootverse::stats))
        .route("/rootverse/root/:inscription_id", get(api::rootverse::root))
        .route(
            "/rootverse/root/PFP/inscriptions/:inscription_id",
            get(api::rootverse::pfp_by_inscription),
        )
        .route("/rootverse/root/PFP/nums/:num", get(api::rootverse::pfp_by_number))
        // CSV lookups
        .route("/kol/userids", get(api::lookups::kol_userids))
        .route("/runes/distinct_values", get(api::lookups::runes_distinct_values))
        .route("/runes/query", get(api::lookups::runes_query))
        .route("/runes/social_info", get(api::lookups::runes_social_info))
        .route("/runes/column_data", get(api::lookups::runes_column_data))
        .route("/og/unique_values", get(api::lookups::og_unique_values))
        .route("/og/query", post(api::lookups::og_query))
        .route(
            "/og/query_and_sort_wallets",
            post(api::lookups::og_query_and_sort_wallets),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health_check() -> &'static str {
    "OK"
}
