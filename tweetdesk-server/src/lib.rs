// Library exports for tweetdesk-server
// The maintenance tool and the integration tests use these modules directly

pub mod analytics;
pub mod api;
pub mod config;
pub mod db;
pub mod digest;
pub mod filter;
pub mod lookups;
pub mod rootverse;
pub mod routes;
pub mod state;
pub mod timestamps;
