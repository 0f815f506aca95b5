use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tweetdesk_types::ErrorResponse;

use crate::db::repositories::{IngestError, UserPayloadError};
use crate::filter::FilterError;
use crate::lookups::{DatasetError, LookupError};

pub type ApiResult<T> = Result<T, ApiError>;

/// Handler failure. Client errors carry the message shown as `error`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    Some("An unexpected error occurred".to_string()),
                )
            }
        };

        (status, Json(ErrorResponse { error, details })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        // Repositories validate column names and conditions before touching SQL
        match err.downcast_ref::<FilterError>() {
            Some(filter) => ApiError::BadRequest(filter.to_string()),
            None => ApiError::InternalError(format!("{:#}", err)),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::UnknownColumn(_) => ApiError::NotFound(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<DatasetError> for ApiError {
    fn from(err: DatasetError) -> Self {
        match err {
            DatasetError::Filter(e) => e.into(),
            DatasetError::Lookup(LookupError::UnknownColumn(column)) => {
                ApiError::BadRequest(format!("Column '{}' not found", column))
            }
            DatasetError::Lookup(e) => e.into(),
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Storage(e) => ApiError::InternalError(format!("{:#}", e)),
            client => ApiError::BadRequest(client.to_string()),
        }
    }
}

impl From<UserPayloadError> for ApiError {
    fn from(err: UserPayloadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_errors_surface_as_bad_request() {
        let err: ApiError = anyhow::Error::from(FilterError::UnknownColumn("pw".to_string())).into();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "unknown column 'pw'"));

        let err: ApiError = anyhow::anyhow!("disk full").into();
        assert!(matches!(err, ApiError::InternalError(_)));
    }

    #[test]
    fn test_ingest_errors_map_by_kind() {
        let err: ApiError = IngestError::MissingKey("rest_id").into();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Missing key in tweet data: 'rest_id'"));

        let err: ApiError = IngestError::Storage(anyhow::anyhow!("locked")).into();
        assert!(matches!(err, ApiError::InternalError(_)));
    }

    #[test]
    fn test_unknown_lookup_column_is_not_found() {
        let err: ApiError = LookupError::UnknownColumn("Website".to_string()).into();
        assert!(matches!(err, ApiError::NotFound(msg) if msg == "Column 'Website' not found"));
    }
}
