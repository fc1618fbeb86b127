//! Per-resource request pipeline.
//!
//! A [`ResourcePipeline`] is constructed once per resource from its schema,
//! overrides, and the runtime configuration, then handles requests for the
//! process lifetime. Each invocation: decode body, validate querystring,
//! invoke business logic, project fields, envelope, encode.
//!
//! The entry points are async only because reading the request body is;
//! every transformation is synchronous, CPU-bound work.

use crate::codec::{self, MessageCodec, WireFormat};
use crate::config::RuntimeConfig;
use crate::envelope::CollectionEnvelope;
use crate::error::{ContractError, SchemaError};
use crate::projection;
use crate::query::ValidatedQuery;
use crate::schema::{ResourceSchema, SchemaConfig, SchemaOverrides};
use axum::{
    extract::Request,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;

/// The pipeline for one resource.
///
/// Immutable after construction; safe to share across concurrently handled
/// requests.
#[derive(Debug)]
pub struct ResourcePipeline {
    schema: ResourceSchema,
    config: SchemaConfig,
    runtime: RuntimeConfig,
}

/// Per-request negotiated state: formats plus normalized query values.
struct Negotiated {
    query: ValidatedQuery,
    body: Option<Value>,
    output: WireFormat,
}

impl ResourcePipeline {
    /// Resolve the schema configuration and build the pipeline.
    ///
    /// Fails fast on misconfiguration; nothing request-scoped happens here.
    pub fn new(
        schema: ResourceSchema,
        overrides: SchemaOverrides,
        runtime: RuntimeConfig,
    ) -> Result<Self, SchemaError> {
        let config = SchemaConfig::resolve(&schema, overrides, &runtime)?;
        Ok(Self {
            schema,
            config,
            runtime,
        })
    }

    /// The resource schema this pipeline serves.
    pub fn schema(&self) -> &ResourceSchema {
        &self.schema
    }

    /// The resolved per-resource configuration.
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Handle a single-resource call.
    ///
    /// The closure receives the validated query and the decoded body (when
    /// one was sent) and returns the record to render, or `None` for an
    /// empty-body response.
    pub async fn handle_one<F>(&self, req: Request, logic: F) -> Response
    where
        F: FnOnce(ValidatedQuery, Option<Value>) -> Result<Option<Value>, ContractError>,
    {
        match self.run_one(req, logic).await {
            Ok(response) => response,
            Err(err) => self.fail(err),
        }
    }

    /// Handle a collection call.
    ///
    /// The closure should return up to `page_size + 1` records; the extra
    /// record drives `next_page` and is trimmed by the envelope.
    pub async fn handle_many<F>(&self, req: Request, logic: F) -> Response
    where
        F: FnOnce(ValidatedQuery, Option<Value>) -> Result<Option<Vec<Value>>, ContractError>,
    {
        match self.run_many(req, logic).await {
            Ok(response) => response,
            Err(err) => self.fail(err),
        }
    }

    async fn run_one<F>(&self, req: Request, logic: F) -> Result<Response, ContractError>
    where
        F: FnOnce(ValidatedQuery, Option<Value>) -> Result<Option<Value>, ContractError>,
    {
        let negotiated = self.read_request(req, false).await?;
        let Some(record) = logic(negotiated.query.clone(), negotiated.body)? else {
            return Ok(empty_response());
        };
        let projected = projection::project(record, &negotiated.query.fields);
        let bytes = codec::encode(
            Some(&projected),
            negotiated.output,
            self.config
                .bindings()
                .and_then(|b| b.encode_single.as_ref()),
        )?;
        Ok(payload_response(bytes, negotiated.output))
    }

    async fn run_many<F>(&self, req: Request, logic: F) -> Result<Response, ContractError>
    where
        F: FnOnce(ValidatedQuery, Option<Value>) -> Result<Option<Vec<Value>>, ContractError>,
    {
        let negotiated = self.read_request(req, true).await?;
        let Some(records) = logic(negotiated.query.clone(), negotiated.body)? else {
            return Ok(empty_response());
        };
        let projected: Vec<Value> = records
            .into_iter()
            .map(|record| projection::project(record, &negotiated.query.fields))
            .collect();
        let payload = if self.config.paged() {
            let envelope = CollectionEnvelope::paginate(projected, &negotiated.query);
            serde_json::to_value(envelope).map_err(|err| {
                ContractError::internal(format!("failed to build response envelope: {err}"))
            })?
        } else {
            Value::Array(projected)
        };
        let bytes = codec::encode(
            Some(&payload),
            negotiated.output,
            self.config
                .bindings()
                .and_then(|b| b.encode_collection.as_ref()),
        )?;
        Ok(payload_response(bytes, negotiated.output))
    }

    /// Decode the body, validate the querystring, negotiate formats.
    async fn read_request(&self, req: Request, many: bool) -> Result<Negotiated, ContractError> {
        let (parts, body) = req.into_parts();
        let input = codec::request_format(&parts.headers);
        let output = codec::response_format(&parts.headers);

        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|err| ContractError::internal(format!("failed to read request body: {err}")))?;

        let body = if bytes.is_empty() {
            None
        } else {
            let decoded = codec::decode(&bytes, input, self.decode_binding(many))?;
            self.schema.validate_body(&decoded)?;
            Some(decoded)
        };

        let raw_query = parts.uri.query().unwrap_or("");
        let query = self.config.validator(many).validate(raw_query)?;
        tracing::debug!(
            resource = %self.schema.name(),
            many,
            input = ?input,
            output = ?output,
            "request validated"
        );

        Ok(Negotiated {
            query,
            body,
            output,
        })
    }

    fn decode_binding(&self, many: bool) -> Option<&Arc<dyn MessageCodec>> {
        let bindings = self.config.bindings()?;
        if many {
            bindings.decode_collection.as_ref()
        } else {
            bindings.decode_single.as_ref()
        }
    }

    fn fail(&self, err: ContractError) -> Response {
        tracing::debug!(
            resource = %self.schema.name(),
            kind = ?err.kind(),
            message = %err.message(),
            "request rejected"
        );
        err.into_response_with(self.runtime.show_errors)
    }
}

fn empty_response() -> Response {
    StatusCode::OK.into_response()
}

fn payload_response(bytes: Bytes, format: WireFormat) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, format.content_type())],
        bytes,
    )
        .into_response()
}
