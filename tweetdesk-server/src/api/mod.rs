pub mod error;
pub mod lookups;
pub mod rootverse;
pub mod tweets;
pub mod tweets_v2;
pub mod users;

pub use error::{ApiError, ApiResult};
