//! Response envelope for paged collections.
//!
//! Business logic is expected to fetch up to `page_size + 1` records; the
//! extra record is the probe that answers `next_page` and is trimmed before
//! the response leaves the layer. Single resources and unpaged collections
//! carry no envelope.

use crate::query::{PageSelection, ValidatedQuery};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The response shape of a paged collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollectionEnvelope {
    pub data: Vec<Value>,
    pub page_size: u32,
    pub next_page: bool,
}

impl CollectionEnvelope {
    /// Wrap records according to the validated query.
    ///
    /// For a numbered page, keeps at most `page_size` records and reports
    /// `next_page` when more were supplied. For `page=*` everything is kept
    /// and there is never a next page.
    pub fn paginate(records: Vec<Value>, query: &ValidatedQuery) -> Self {
        match query.page {
            PageSelection::All => Self {
                data: records,
                page_size: query.page_size,
                next_page: false,
            },
            PageSelection::Number(_) => {
                let limit = query.page_size as usize;
                let next_page = records.len() > limit;
                let mut data = records;
                data.truncate(limit);
                Self {
                    data,
                    page_size: query.page_size,
                    next_page,
                }
            }
        }
    }
}
