//! Per-resource configuration resolution.
//!
//! A resource supplies an optional [`SchemaOverrides`]; resolution merges it
//! onto the defaults, validates the ordering declarations eagerly, and
//! builds the querystring validators once. The resulting [`SchemaConfig`]
//! is immutable and shared read-only across requests.

use crate::codec::binding::MessageBindings;
use crate::config::RuntimeConfig;
use crate::error::SchemaError;
use crate::query::{
    CollectionValidator, OrderingRules, PageLimits, QuerystringValidator, SingleValidator,
};
use crate::schema::{ResourceSchema, SortDir};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Everything a validator factory may need from the resolved schema.
#[derive(Debug)]
pub struct ValidatorContext<'a> {
    /// Projectable fields: declared minus write-only.
    pub allowed_fields: &'a BTreeSet<String>,
    /// Validated ordering rules.
    pub ordering: &'a OrderingRules,
    /// Process-wide paging bounds.
    pub limits: PageLimits,
    /// Whether `page=*` is unrestricted for this resource.
    pub unconditional_paging: bool,
}

/// Builds a querystring validator from the resolved schema context.
///
/// Resources override the single and collection validators independently;
/// the default factories build [`SingleValidator`] and
/// [`CollectionValidator`].
pub type ValidatorFactory =
    Arc<dyn Fn(&ValidatorContext<'_>) -> Arc<dyn QuerystringValidator> + Send + Sync>;

fn default_single_factory() -> ValidatorFactory {
    Arc::new(|ctx| {
        Arc::new(SingleValidator::new(ctx.allowed_fields.clone(), ctx.limits))
    })
}

fn default_collection_factory() -> ValidatorFactory {
    Arc::new(|ctx| {
        Arc::new(CollectionValidator::new(
            ctx.allowed_fields.clone(),
            ctx.ordering.clone(),
            ctx.limits,
            ctx.unconditional_paging,
        ))
    })
}

/// Overrides a resource definition supplies on top of the defaults.
///
/// Every key is optional. The validator pair merges at the sub-key level:
/// `single` and `collection` may be overridden independently. Keys the
/// layer does not recognize travel through `extensions` verbatim.
#[derive(Clone, Default)]
pub struct SchemaOverrides {
    paged: Option<bool>,
    unconditional_paging: Option<bool>,
    ordering: Option<Vec<(String, Vec<String>)>>,
    single_validator: Option<ValidatorFactory>,
    collection_validator: Option<ValidatorFactory>,
    bindings: Option<MessageBindings>,
    extensions: BTreeMap<String, Value>,
}

impl SchemaOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override whether collection responses are paged. Defaults to true.
    pub fn paged(mut self, paged: bool) -> Self {
        self.paged = Some(paged);
        self
    }

    /// Allow `page=*` regardless of the requested field count.
    pub fn unconditional_paging(mut self, unconditional: bool) -> Self {
        self.unconditional_paging = Some(unconditional);
        self
    }

    /// Declare ordering rules explicitly, replacing any per-field
    /// declarations. Directions are validated at resolution time.
    pub fn ordering<F, D, S>(mut self, rules: F) -> Self
    where
        F: IntoIterator<Item = (S, D)>,
        D: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ordering = Some(
            rules
                .into_iter()
                .map(|(field, dirs)| {
                    (
                        field.into(),
                        dirs.into_iter().map(Into::into).collect(),
                    )
                })
                .collect(),
        );
        self
    }

    /// Override the single-resource validator.
    pub fn single_validator(mut self, factory: ValidatorFactory) -> Self {
        self.single_validator = Some(factory);
        self
    }

    /// Override the collection validator.
    pub fn collection_validator(mut self, factory: ValidatorFactory) -> Self {
        self.collection_validator = Some(factory);
        self
    }

    /// Configure binary-message bindings for the resource.
    pub fn bindings(mut self, bindings: MessageBindings) -> Self {
        self.bindings = Some(bindings);
        self
    }

    /// Attach an unrecognized configuration key, carried verbatim.
    pub fn extension<S: Into<String>>(mut self, key: S, value: Value) -> Self {
        self.extensions.insert(key.into(), value);
        self
    }
}

impl std::fmt::Debug for SchemaOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaOverrides")
            .field("paged", &self.paged)
            .field("unconditional_paging", &self.unconditional_paging)
            .field("ordering", &self.ordering)
            .field("single_validator", &self.single_validator.is_some())
            .field("collection_validator", &self.collection_validator.is_some())
            .field("bindings", &self.bindings.is_some())
            .field("extensions", &self.extensions)
            .finish()
    }
}

/// Resolved per-resource configuration, immutable once constructed.
#[derive(Clone)]
pub struct SchemaConfig {
    paged: bool,
    unconditional_paging: bool,
    ordering: OrderingRules,
    single_validator: Arc<dyn QuerystringValidator>,
    collection_validator: Arc<dyn QuerystringValidator>,
    bindings: Option<MessageBindings>,
    extensions: BTreeMap<String, Value>,
}

impl SchemaConfig {
    /// Merge overrides onto the defaults and validate eagerly.
    ///
    /// Ordering declarations come from the overrides when present,
    /// otherwise from the per-field `sortable` declarations. Either way an
    /// unrecognized direction or field name fails here, not per-request.
    pub fn resolve(
        schema: &ResourceSchema,
        overrides: SchemaOverrides,
        runtime: &RuntimeConfig,
    ) -> Result<Self, SchemaError> {
        let ordering = resolve_ordering(schema, overrides.ordering)?;
        let allowed_fields = schema.allowed_fields();
        let unconditional_paging = overrides.unconditional_paging.unwrap_or(false);
        let limits = PageLimits {
            max_pages: runtime.max_pages,
            max_page_size: runtime.max_page_size,
        };

        let ctx = ValidatorContext {
            allowed_fields: &allowed_fields,
            ordering: &ordering,
            limits,
            unconditional_paging,
        };
        let single_factory = overrides
            .single_validator
            .unwrap_or_else(default_single_factory);
        let collection_factory = overrides
            .collection_validator
            .unwrap_or_else(default_collection_factory);

        Ok(Self {
            paged: overrides.paged.unwrap_or(true),
            unconditional_paging,
            single_validator: single_factory(&ctx),
            collection_validator: collection_factory(&ctx),
            ordering,
            bindings: overrides.bindings,
            extensions: overrides.extensions,
        })
    }

    /// Whether collection responses carry the paged envelope.
    pub fn paged(&self) -> bool {
        self.paged
    }

    /// Whether `page=*` is unrestricted for this resource.
    pub fn unconditional_paging(&self) -> bool {
        self.unconditional_paging
    }

    /// Validated ordering rules.
    pub fn ordering(&self) -> &OrderingRules {
        &self.ordering
    }

    /// The validator for the given call shape.
    pub fn validator(&self, many: bool) -> &Arc<dyn QuerystringValidator> {
        if many {
            &self.collection_validator
        } else {
            &self.single_validator
        }
    }

    /// Binary-message bindings, when configured.
    pub fn bindings(&self) -> Option<&MessageBindings> {
        self.bindings.as_ref()
    }

    /// Unrecognized override keys, carried verbatim.
    pub fn extensions(&self) -> &BTreeMap<String, Value> {
        &self.extensions
    }
}

impl std::fmt::Debug for SchemaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaConfig")
            .field("paged", &self.paged)
            .field("unconditional_paging", &self.unconditional_paging)
            .field("ordering", &self.ordering)
            .field("bindings", &self.bindings.is_some())
            .field("extensions", &self.extensions)
            .finish()
    }
}

fn resolve_ordering(
    schema: &ResourceSchema,
    declared: Option<Vec<(String, Vec<String>)>>,
) -> Result<OrderingRules, SchemaError> {
    let declared = declared.unwrap_or_else(|| {
        schema
            .fields()
            .iter()
            .filter(|f| !f.order().is_empty())
            .map(|f| (f.name().to_string(), f.order().to_vec()))
            .collect()
    });

    let mut rules = OrderingRules::new();
    for (field, options) in declared {
        if !schema.declares(&field) {
            return Err(SchemaError::UnknownOrderingField { field });
        }
        let mut dirs = BTreeSet::new();
        for option in options {
            let dir = SortDir::parse(&option).ok_or_else(|| SchemaError::InvalidOrderOption {
                field: field.clone(),
                option,
            })?;
            dirs.insert(dir);
        }
        rules.insert(field, dirs);
    }
    Ok(rules)
}
