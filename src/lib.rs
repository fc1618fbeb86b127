//! # Facet Axum
//!
//! A declarative HTTP contract layer for [Axum](https://github.com/tokio-rs/axum)
//! services.
//!
//! Resources declare their shape once, as a [`schema::ResourceSchema`]; the
//! layer derives everything a well-behaved HTTP API needs around the
//! business logic:
//!
//! - **Querystring validation:** field projection (`fields=a,b`), paging
//!   (`page`, `page_size`, `page=*`), and ordering (`order_by`, `order`)
//!   are parsed and bounds-checked before business logic runs.
//! - **Field projection:** responses carry exactly the requested subset of
//!   declared, readable fields.
//! - **Paged envelopes:** collections render as
//!   `{"data": [...], "page_size": n, "next_page": bool}`, with `next_page`
//!   answered by an over-fetched probe record.
//! - **Content negotiation:** JSON by default, binary protobuf messages per
//!   resource via [`codec::ProstCodec`] bindings, selected by
//!   `Content-Type` and `Accept`.
//! - **Uniform errors:** every rejection renders as
//!   `{"message": "..."}` with the right status, and messages can be
//!   blanked process-wide with `SHOW_ERRORS`.
//!
//! The entry point is [`pipeline::ResourcePipeline`]: build one per
//! resource and call [`handle_one`](pipeline::ResourcePipeline::handle_one)
//! or [`handle_many`](pipeline::ResourcePipeline::handle_many) from an Axum
//! handler, passing the business logic as a closure.

pub mod codec;
pub mod config;
pub mod envelope;
pub mod error;
pub mod pipeline;
pub mod projection;
pub mod query;
pub mod schema;

// Re-export the crates that appear in the public API.
pub use bytes;
pub use prost;
pub use serde;
pub use serde_json;

pub mod prelude {
    //! A prelude providing the most common types.
    pub use crate::codec::{MessageBindings, ProstCodec, WireFormat};
    pub use crate::config::RuntimeConfig;
    pub use crate::envelope::CollectionEnvelope;
    pub use crate::error::{ContractError, ErrorKind, SchemaError};
    pub use crate::pipeline::ResourcePipeline;
    pub use crate::query::{FieldSelection, PageSelection, ValidatedQuery};
    pub use crate::schema::{FieldDef, ResourceSchema, SchemaOverrides, SortDir};
}
