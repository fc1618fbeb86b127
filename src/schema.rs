//! Resource schema declarations.
//!
//! A [`ResourceSchema`] is the contract layer's view of a resource: the set
//! of declared fields, which of them are write-only, and which are sortable
//! in which directions. Type coercion and per-field validation belong to the
//! surrounding validation engine; the schema exposes a single optional
//! body-validator hook as the seam to it.

pub mod config;

pub use config::{SchemaConfig, SchemaOverrides, ValidatorContext, ValidatorFactory};

use crate::error::ContractError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Sort direction for an orderable field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// The querystring spelling of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Parse a querystring or configuration spelling.
    ///
    /// Returns `None` for unrecognized directions; callers decide whether
    /// that is a request-time or definition-time failure.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// A single declared field of a resource.
///
/// Directions are carried as strings so that an unrecognized option is
/// representable and fails at schema-resolution time, not silently.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDef {
    name: String,
    write_only: bool,
    order: Vec<String>,
}

impl FieldDef {
    /// Declare a field.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            write_only: false,
            order: Vec::new(),
        }
    }

    /// Mark the field write-only; it is accepted in request bodies but never
    /// projectable or returned.
    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    /// Declare the allowed sort directions for this field.
    pub fn sortable<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.order = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the field is write-only.
    pub fn is_write_only(&self) -> bool {
        self.write_only
    }

    /// Declared sort directions, unvalidated.
    pub fn order(&self) -> &[String] {
        &self.order
    }
}

/// Hook invoked on every decoded request body.
///
/// The seam to the external field-validation engine: a hook may reject a
/// body with any [`ContractError`], including an unsupported-media error.
pub type BodyValidator = Arc<dyn Fn(&Value) -> Result<(), ContractError> + Send + Sync>;

/// The declared shape of a resource.
#[derive(Clone)]
pub struct ResourceSchema {
    name: String,
    fields: Vec<FieldDef>,
    body_validator: Option<BodyValidator>,
}

impl ResourceSchema {
    /// Start a schema declaration.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            body_validator: None,
        }
    }

    /// Declare a field.
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Install the body-validator hook.
    pub fn body_validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Value) -> Result<(), ContractError> + Send + Sync + 'static,
    {
        self.body_validator = Some(Arc::new(hook));
        self
    }

    /// Resource name, used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All declared fields.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Whether a field with this name is declared at all.
    pub fn declares(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// The fields a request may project or order by: declared minus
    /// write-only.
    pub fn allowed_fields(&self) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|f| !f.write_only)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Run the body-validator hook, if installed.
    pub(crate) fn validate_body(&self, body: &Value) -> Result<(), ContractError> {
        match &self.body_validator {
            Some(hook) => hook(body),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ResourceSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .field("body_validator", &self.body_validator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_dir_parse() {
        assert_eq!(SortDir::parse("asc"), Some(SortDir::Asc));
        assert_eq!(SortDir::parse("desc"), Some(SortDir::Desc));
        assert_eq!(SortDir::parse("sideways"), None);
        assert_eq!(SortDir::parse(""), None);
    }

    #[test]
    fn test_allowed_fields_excludes_write_only() {
        let schema = ResourceSchema::new("widget")
            .field(FieldDef::new("a").sortable(["asc"]))
            .field(FieldDef::new("b").write_only())
            .field(FieldDef::new("c"));

        let allowed = schema.allowed_fields();
        assert_eq!(
            allowed,
            BTreeSet::from(["a".to_string(), "c".to_string()])
        );
        assert!(schema.declares("b"));
    }

    #[test]
    fn test_body_validator_hook() {
        let schema = ResourceSchema::new("widget")
            .field(FieldDef::new("a"))
            .body_validator(|body| {
                if body.get("a").is_some() {
                    Err(ContractError::unsupported_media("Unsupported Media"))
                } else {
                    Ok(())
                }
            });

        assert!(schema.validate_body(&serde_json::json!({})).is_ok());
        let err = schema
            .validate_body(&serde_json::json!({"a": 1}))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedMedia);
    }
}
