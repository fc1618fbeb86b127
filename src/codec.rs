//! Content negotiation and wire encoding.
//!
//! The layer supports exactly two wire encodings: structured text (JSON)
//! and binary messages (protobuf, via a per-resource [`MessageCodec`]
//! binding). The format identifiers are opaque content-type strings
//! classified by prefix; anything that is not the binary identifier is
//! treated as JSON.

pub mod binding;

pub use binding::{MessageBindings, MessageCodec, ProstCodec};

use crate::error::ContractError;
use bytes::Bytes;
use http::{HeaderMap, header};
use serde_json::Value;
use std::sync::Arc;

/// Content type identifying the JSON encoding.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type identifying the binary message encoding.
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Wire encoding selected by content negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireFormat {
    /// Structured text (`application/json`). The default when no
    /// identifier is present or the identifier is unrecognized.
    #[default]
    Json,
    /// Binary message (`application/octet-stream`).
    Binary,
}

impl WireFormat {
    /// Classify a content-type-like identifier.
    ///
    /// Prefix matching tolerates parameters (`application/json;
    /// charset=utf-8`).
    pub fn from_content_type(value: Option<&str>) -> Self {
        match value {
            Some(value) if value.starts_with(CONTENT_TYPE_BINARY) => Self::Binary,
            _ => Self::Json,
        }
    }

    /// The content type to declare on a response in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => CONTENT_TYPE_JSON,
            Self::Binary => CONTENT_TYPE_BINARY,
        }
    }
}

/// Input format, from the request's `Content-Type` header.
pub fn request_format(headers: &HeaderMap) -> WireFormat {
    WireFormat::from_content_type(
        headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
    )
}

/// Output format: the `Accept` header when present, else the request's own
/// content type.
pub fn response_format(headers: &HeaderMap) -> WireFormat {
    if let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok())
        && !accept.is_empty()
    {
        return WireFormat::from_content_type(Some(accept));
    }
    request_format(headers)
}

/// Decode a request body into a record.
///
/// An empty JSON body decodes to an empty record. Binary decoding requires
/// the resource's message binding; a binary request against a resource
/// without one is an unsupported-media failure.
pub fn decode(
    bytes: &[u8],
    format: WireFormat,
    binding: Option<&Arc<dyn MessageCodec>>,
) -> Result<Value, ContractError> {
    match format {
        WireFormat::Json => {
            if bytes.is_empty() {
                return Ok(Value::Object(serde_json::Map::new()));
            }
            serde_json::from_slice(bytes).map_err(|err| {
                tracing::debug!(error = %err, "request body is not valid json");
                ContractError::invalid("Tried to deserialize invalid json data.")
            })
        }
        WireFormat::Binary => require_binding(binding)?.decode(bytes),
    }
}

/// Encode a result into a response body.
///
/// `None` encodes to the explicit empty-body sentinel, never to an empty
/// structured value.
pub fn encode(
    value: Option<&Value>,
    format: WireFormat,
    binding: Option<&Arc<dyn MessageCodec>>,
) -> Result<Bytes, ContractError> {
    let Some(value) = value else {
        return Ok(Bytes::new());
    };
    match format {
        WireFormat::Json => serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|err| ContractError::internal(format!("failed to serialize response: {err}"))),
        WireFormat::Binary => require_binding(binding)?.encode(value),
    }
}

fn require_binding(
    binding: Option<&Arc<dyn MessageCodec>>,
) -> Result<&Arc<dyn MessageCodec>, ContractError> {
    binding.ok_or_else(|| {
        ContractError::unsupported_media("Binary encoding is not configured for this resource.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_format_classification() {
        assert_eq!(
            WireFormat::from_content_type(Some("application/json")),
            WireFormat::Json
        );
        assert_eq!(
            WireFormat::from_content_type(Some("application/json; charset=utf-8")),
            WireFormat::Json
        );
        assert_eq!(
            WireFormat::from_content_type(Some("application/octet-stream")),
            WireFormat::Binary
        );
        // Unrecognized and absent identifiers fall back to JSON.
        assert_eq!(
            WireFormat::from_content_type(Some("text/plain")),
            WireFormat::Json
        );
        assert_eq!(WireFormat::from_content_type(None), WireFormat::Json);
    }

    #[test]
    fn test_response_format_prefers_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/octet-stream"),
        );
        assert_eq!(response_format(&headers), WireFormat::Binary);
    }

    #[test]
    fn test_response_format_mirrors_request_without_accept() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        assert_eq!(response_format(&headers), WireFormat::Binary);
        assert_eq!(response_format(&HeaderMap::new()), WireFormat::Json);
    }

    #[test]
    fn test_json_decode_empty_body() {
        let value = decode(b"", WireFormat::Json, None).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_json_decode_invalid() {
        let err = decode(b"{'a': 1}", WireFormat::Json, None).unwrap_err();
        assert_eq!(err.message(), "Tried to deserialize invalid json data.");
    }

    #[test]
    fn test_json_round_trip() {
        let record = json!({"a": 1, "b": "One"});
        let bytes = encode(Some(&record), WireFormat::Json, None).unwrap();
        let decoded = decode(&bytes, WireFormat::Json, None).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_body_sentinel() {
        let bytes = encode(None, WireFormat::Json, None).unwrap();
        assert!(bytes.is_empty());
        let bytes = encode(None, WireFormat::Binary, None).unwrap();
        assert!(bytes.is_empty());
    }

    #[test]
    fn test_binary_without_binding_is_unsupported_media() {
        let err = decode(b"\x0a\x01", WireFormat::Binary, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedMedia);
        let err = encode(Some(&json!({})), WireFormat::Binary, None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedMedia);
    }
}
