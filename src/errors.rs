use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// Rejected input on the mutation path. Surfaced to the caller as 400.
    #[error("validation error: {0}")]
    Validation(String),

    /// Subscriber channel whose receiving side is gone.
    #[error("subscriber channel {0} is defunct")]
    ChannelDefunct(u64),

    #[error("transport disconnected")]
    TransportDisconnected,

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl NotifyError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for NotifyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = NotifyError::validation("label must not be empty");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "validation error: label must not be empty");
    }

    #[test]
    fn internal_errors_map_to_500() {
        assert_eq!(
            NotifyError::ChannelDefunct(7).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            NotifyError::TransportDisconnected.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
