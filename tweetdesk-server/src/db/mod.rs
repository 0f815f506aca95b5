pub mod schema;
pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{Database, DbConnection, DbPool};
