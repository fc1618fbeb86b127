//! Field projection.
//!
//! Filters an output record, or each record in a collection, down to the
//! requested field subset. Unknown field *requests* never reach here; the
//! querystring validator rejects them first. Keys a record carries beyond
//! the requested set are simply dropped.

use crate::query::FieldSelection;
use serde_json::Value;

/// Project a record or collection onto the requested fields.
///
/// Wildcard selections return the input unchanged. Produces a new value;
/// the input is consumed, never mutated in place.
pub fn project(value: Value, fields: &FieldSelection) -> Value {
    let FieldSelection::Named(_) = fields else {
        return value;
    };
    match value {
        Value::Array(records) => Value::Array(
            records
                .into_iter()
                .map(|record| project_record(record, fields))
                .collect(),
        ),
        record => project_record(record, fields),
    }
}

fn project_record(record: Value, fields: &FieldSelection) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| fields.selects(key))
                .collect(),
        ),
        // Non-object records have no keys to filter.
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn named(names: &[&str]) -> FieldSelection {
        FieldSelection::Named(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_wildcard_is_identity() {
        let record = json!({"a": 1, "b": "One"});
        assert_eq!(project(record.clone(), &FieldSelection::All), record);
    }

    #[test]
    fn test_projects_single_record() {
        let record = json!({"a": 1, "b": "One", "c": false});
        assert_eq!(project(record, &named(&["a", "c"])), json!({"a": 1, "c": false}));
    }

    #[test]
    fn test_projects_each_record_in_collection() {
        let records = json!([{"a": 1, "b": "One"}, {"a": 2, "b": "Two"}]);
        assert_eq!(
            project(records, &named(&["a"])),
            json!([{"a": 1}, {"a": 2}])
        );
    }

    #[test]
    fn test_key_set_equals_requested_subset() {
        let record = json!({"a": 1, "b": "One", "c": false});
        let projected = project(record, &named(&["b", "c"]));
        let keys: BTreeSet<&str> = projected
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, BTreeSet::from(["b", "c"]));
    }

    #[test]
    fn test_missing_requested_keys_are_not_invented() {
        // A record may legitimately lack a requested (nullable) field.
        let record = json!({"a": 1});
        assert_eq!(project(record, &named(&["a", "b"])), json!({"a": 1}));
    }
}
