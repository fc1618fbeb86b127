//! Error types for the contract layer.
//!
//! Two distinct error families exist:
//! - [`ContractError`]: per-request failures (bad querystring, malformed
//!   payloads, rejected bodies). These render as client-facing responses.
//! - [`SchemaError`]: definition-time misconfiguration. These are raised
//!   while resolving a schema, before any request is handled, and are fatal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Kind of a per-request failure, matching the error taxonomy of the layer.
///
/// The kind determines the HTTP status; the message carries the detail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad querystring argument, malformed payload, or rejected field value.
    InvalidArgument,
    /// Content negotiation produced a media type the resource cannot serve.
    UnsupportedMedia,
    /// The layer itself failed; details are never client-actionable.
    Internal,
}

impl ErrorKind {
    /// HTTP status for this kind of failure.
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidArgument => StatusCode::BAD_REQUEST,
            Self::UnsupportedMedia => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A per-request failure carrying a kind and a message.
///
/// Field-scoped failures use the `"<field>: <detail>"` message convention;
/// pipeline-scoped failures use the `"_schema: <detail>"` prefix. The
/// constructors below produce those shapes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractError {
    kind: ErrorKind,
    message: String,
}

impl ContractError {
    /// Create an error with an explicit kind and message.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Create an invalid-argument error with a bare message.
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create a field-scoped invalid-argument error: `"<field>: <detail>"`.
    pub fn field(field: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidArgument, format!("{field}: {detail}"))
    }

    /// Create a pipeline-scoped invalid-argument error: `"_schema: <detail>"`.
    pub fn schema(detail: impl std::fmt::Display) -> Self {
        Self::new(ErrorKind::InvalidArgument, format!("_schema: {detail}"))
    }

    /// Create an unsupported-media error.
    pub fn unsupported_media<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::UnsupportedMedia, message)
    }

    /// Create an internal error.
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Blank the message while preserving the kind and status.
    ///
    /// Applied when error visibility is disabled; presentation policy only.
    pub fn redacted(self) -> Self {
        Self {
            kind: self.kind,
            message: String::new(),
        }
    }

    /// Render as an HTTP response, honoring the error-visibility flag.
    pub(crate) fn into_response_with(self, show_errors: bool) -> Response {
        let err = if show_errors { self } else { self.redacted() };
        err.into_response()
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ContractError {}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ContractError {
    fn into_response(self) -> Response {
        (
            self.kind.status(),
            Json(ErrorBody {
                message: self.message,
            }),
        )
            .into_response()
    }
}

/// Definition-time schema misconfiguration.
///
/// Raised while resolving a [`SchemaConfig`], never during request handling.
///
/// [`SchemaConfig`]: crate::schema::SchemaConfig
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// An ordering declaration used a direction that is not `asc` or `desc`.
    #[error("Invalid order option \"{option}\" provided for field {field}.")]
    InvalidOrderOption { field: String, option: String },

    /// An ordering declaration named a field the schema does not declare.
    #[error("Unknown ordering field \"{field}\".")]
    UnknownOrderingField { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_prefix() {
        let err = ContractError::field("page", "Not a valid page.");
        assert_eq!(err.message(), "page: Not a valid page.");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_schema_prefix() {
        let err = ContractError::schema("order is an invalid querystring argument.");
        assert_eq!(
            err.message(),
            "_schema: order is an invalid querystring argument."
        );
    }

    #[test]
    fn test_redacted_preserves_kind() {
        let err = ContractError::unsupported_media("Unsupported Media").redacted();
        assert_eq!(err.kind(), ErrorKind::UnsupportedMedia);
        assert_eq!(err.message(), "");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorKind::InvalidArgument.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ErrorKind::UnsupportedMedia.status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_schema_error_messages() {
        let err = SchemaError::InvalidOrderOption {
            field: "a".to_string(),
            option: "sideways".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid order option \"sideways\" provided for field a."
        );

        let err = SchemaError::UnknownOrderingField {
            field: "ghost".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown ordering field \"ghost\".");
    }
}
