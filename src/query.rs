//! Querystring validation.
//!
//! Two validator variants exist, built once per resource at schema
//! resolution and shared read-only across requests:
//! - [`SingleValidator`] recognizes only `fields`.
//! - [`CollectionValidator`] adds `page`, `page_size`, `order`, `order_by`.
//!
//! Validation produces a fresh [`ValidatedQuery`] per call; nothing shared
//! is mutated.

use crate::error::ContractError;
use crate::schema::SortDir;
use std::collections::{BTreeMap, BTreeSet};

/// The wildcard token in `fields` and `page` parameters.
const WILDCARD: &str = "*";

/// How many fields a `page=*` request may project without the resource
/// opting into unconditional paging.
const WILDCARD_PAGE_MAX_FIELDS: usize = 2;

/// The set of fields a request asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldSelection {
    /// Every declared field (`fields=*` or no `fields` parameter).
    All,
    /// An explicit subset, already checked against the allowed fields.
    Named(BTreeSet<String>),
}

impl FieldSelection {
    /// Whether the selection covers every field.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Whether a field is part of the selection.
    pub fn selects(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(set) => set.contains(name),
        }
    }
}

/// The page a request asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageSelection {
    /// A concrete page number, 1-based, within `max_pages`.
    Number(u32),
    /// `page=*`: return everything, no paging.
    All,
}

/// Normalized, validated query values handed to business logic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedQuery {
    pub fields: FieldSelection,
    pub page: PageSelection,
    pub page_size: u32,
    pub order: Option<SortDir>,
    pub order_by: Option<String>,
}

/// Process-wide paging bounds, captured at schema-resolution time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLimits {
    pub max_pages: u32,
    pub max_page_size: u32,
}

/// Per-resource ordering rules: which fields are sortable, each with its own
/// allowed directions. Preserves declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderingRules(Vec<(String, BTreeSet<SortDir>)>);

impl OrderingRules {
    /// Empty rule set: nothing is sortable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Field names are validated by the schema resolver
    /// before rules are constructed.
    pub fn insert<S: Into<String>>(&mut self, field: S, dirs: BTreeSet<SortDir>) {
        self.0.push((field.into(), dirs));
    }

    /// Allowed directions for a field, or `None` if it is not sortable.
    pub fn dirs_for(&self, field: &str) -> Option<&BTreeSet<SortDir>> {
        self.0.iter().find(|(name, _)| name == field).map(|(_, d)| d)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<SortDir>)> {
        self.0.iter().map(|(name, dirs)| (name.as_str(), dirs))
    }
}

/// A querystring validator for one resource.
///
/// Implementations are immutable and shared across requests via `Arc`.
pub trait QuerystringValidator: Send + Sync {
    /// Parse and validate a raw querystring into normalized values.
    fn validate(&self, query: &str) -> Result<ValidatedQuery, ContractError>;
}

/// Validator for single-resource calls: recognizes only `fields`.
#[derive(Clone, Debug)]
pub struct SingleValidator {
    allowed_fields: BTreeSet<String>,
    limits: PageLimits,
}

impl SingleValidator {
    pub fn new(allowed_fields: BTreeSet<String>, limits: PageLimits) -> Self {
        Self {
            allowed_fields,
            limits,
        }
    }

    /// The fields a request may project, derived from the schema.
    pub fn allowed_fields(&self) -> &BTreeSet<String> {
        &self.allowed_fields
    }
}

impl QuerystringValidator for SingleValidator {
    fn validate(&self, query: &str) -> Result<ValidatedQuery, ContractError> {
        let raw = parse_raw(query)?;
        reject_unknown_args(&raw, &["fields"])?;
        let fields = parse_fields(raw.get("fields"), &self.allowed_fields)?;
        Ok(ValidatedQuery {
            fields,
            page: PageSelection::Number(1),
            page_size: self.limits.max_page_size,
            order: None,
            order_by: None,
        })
    }
}

/// Validator for collection calls: `fields`, `page`, `page_size`, `order`,
/// `order_by`.
#[derive(Clone, Debug)]
pub struct CollectionValidator {
    allowed_fields: BTreeSet<String>,
    ordering: OrderingRules,
    limits: PageLimits,
    unconditional_paging: bool,
}

impl CollectionValidator {
    pub fn new(
        allowed_fields: BTreeSet<String>,
        ordering: OrderingRules,
        limits: PageLimits,
        unconditional_paging: bool,
    ) -> Self {
        Self {
            allowed_fields,
            ordering,
            limits,
            unconditional_paging,
        }
    }

    /// The fields a request may project, derived from the schema.
    pub fn allowed_fields(&self) -> &BTreeSet<String> {
        &self.allowed_fields
    }

    fn validate_ordering(
        &self,
        raw: &BTreeMap<String, String>,
    ) -> Result<(Option<SortDir>, Option<String>), ContractError> {
        let order = raw.get("order");
        let order_by = raw.get("order_by");

        match (order_by, order) {
            (None, None) => Ok((None, None)),
            // Asymmetric presence is itself the invalid-argument condition.
            (Some(_), None) => Err(ContractError::schema(
                "order_by is an invalid querystring argument.",
            )),
            (None, Some(_)) => Err(ContractError::schema(
                "order is an invalid querystring argument.",
            )),
            (Some(order_by), Some(order)) => {
                let dirs = self
                    .ordering
                    .dirs_for(order_by)
                    .ok_or_else(|| ContractError::schema("Not a valid field to order by."))?;
                let dir = SortDir::parse(order)
                    .filter(|d| dirs.contains(d))
                    .ok_or_else(|| ContractError::schema("Not a valid order for field."))?;
                Ok((Some(dir), Some(order_by.clone())))
            }
        }
    }
}

impl QuerystringValidator for CollectionValidator {
    fn validate(&self, query: &str) -> Result<ValidatedQuery, ContractError> {
        let raw = parse_raw(query)?;
        reject_unknown_args(&raw, &["fields", "page", "page_size", "order", "order_by"])?;

        let fields = parse_fields(raw.get("fields"), &self.allowed_fields)?;
        let page = parse_page(raw.get("page"), self.limits.max_pages)?;
        let page_size = parse_page_size(raw.get("page_size"), self.limits.max_page_size)?;
        let (order, order_by) = self.validate_ordering(&raw)?;

        // page=* is only allowed with a narrow projection unless the
        // resource opted into unconditional paging.
        if page == PageSelection::All && !self.unconditional_paging {
            let narrow = match &fields {
                FieldSelection::All => false,
                FieldSelection::Named(set) => set.len() <= WILDCARD_PAGE_MAX_FIELDS,
            };
            if !narrow {
                return Err(ContractError::schema(
                    "Maximum two fields allowed for page=*.",
                ));
            }
        }

        Ok(ValidatedQuery {
            fields,
            page,
            page_size,
            order,
            order_by,
        })
    }
}

/// Parse a raw querystring into a flat map.
///
/// Empty segments (`a=1&&b=2`) are tolerated and skipped.
fn parse_raw(query: &str) -> Result<BTreeMap<String, String>, ContractError> {
    let cleaned = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("&");
    serde_qs::from_str(&cleaned)
        .map_err(|err| ContractError::schema(format!("malformed querystring: {err}")))
}

fn reject_unknown_args(
    raw: &BTreeMap<String, String>,
    recognized: &[&str],
) -> Result<(), ContractError> {
    for name in raw.keys() {
        if !recognized.contains(&name.as_str()) {
            return Err(ContractError::schema(format!(
                "{name} is an invalid querystring argument."
            )));
        }
    }
    Ok(())
}

fn parse_fields(
    raw: Option<&String>,
    allowed: &BTreeSet<String>,
) -> Result<FieldSelection, ContractError> {
    let Some(raw) = raw else {
        return Ok(FieldSelection::All);
    };
    if raw == WILDCARD || raw.is_empty() {
        return Ok(FieldSelection::All);
    }
    let mut set = BTreeSet::new();
    for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if !allowed.contains(name) {
            return Err(ContractError::field(
                "fields",
                format!("Unknown field \"{name}\"."),
            ));
        }
        set.insert(name.to_string());
    }
    if set.is_empty() {
        Ok(FieldSelection::All)
    } else {
        Ok(FieldSelection::Named(set))
    }
}

fn parse_page(raw: Option<&String>, max_pages: u32) -> Result<PageSelection, ContractError> {
    let Some(raw) = raw else {
        return Ok(PageSelection::Number(1));
    };
    if raw == WILDCARD {
        return Ok(PageSelection::All);
    }
    match raw.parse::<u32>() {
        Ok(page) if (1..=max_pages).contains(&page) => Ok(PageSelection::Number(page)),
        _ => Err(ContractError::field("page", "Not a valid page.")),
    }
}

fn parse_page_size(raw: Option<&String>, max_page_size: u32) -> Result<u32, ContractError> {
    let Some(raw) = raw else {
        return Ok(max_page_size);
    };
    match raw.parse::<u32>() {
        Ok(size) if (1..=max_page_size).contains(&size) => Ok(size),
        _ => Err(ContractError::field("page_size", "Not a valid page.")),
    }
}
