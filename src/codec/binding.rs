//! Binary-message bindings.
//!
//! A resource that supports the binary encoding configures a
//! [`MessageBindings`] set at schema-definition time: one codec per
//! direction and call shape. [`ProstCodec`] is the provided implementation,
//! bridging records to prost messages through serde and applying the
//! resource's explicit remapping hooks.

use crate::error::ContractError;
use bytes::Bytes;
use prost::Message;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::sync::Arc;

/// Bidirectional conversion between a record and binary message bytes.
///
/// Implementations are type-erased and shared via `Arc`; one instance
/// serves every request against the resource.
pub trait MessageCodec: Send + Sync {
    /// Decode binary message bytes into a record.
    fn decode(&self, bytes: &[u8]) -> Result<Value, ContractError>;

    /// Encode a record into binary message bytes.
    fn encode(&self, record: &Value) -> Result<Bytes, ContractError>;
}

/// Per-resource binary-message bindings, one codec per direction and call
/// shape. Present only when binary support is configured.
#[derive(Clone, Default)]
pub struct MessageBindings {
    pub decode_single: Option<Arc<dyn MessageCodec>>,
    pub encode_single: Option<Arc<dyn MessageCodec>>,
    pub decode_collection: Option<Arc<dyn MessageCodec>>,
    pub encode_collection: Option<Arc<dyn MessageCodec>>,
}

impl MessageBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one codec for both directions of single-resource calls.
    pub fn single(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.decode_single = Some(codec.clone());
        self.encode_single = Some(codec);
        self
    }

    /// Use one codec for both directions of collection calls.
    pub fn collection(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.decode_collection = Some(codec.clone());
        self.encode_collection = Some(codec);
        self
    }

    pub fn decode_single(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.decode_single = Some(codec);
        self
    }

    pub fn encode_single(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.encode_single = Some(codec);
        self
    }

    pub fn decode_collection(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.decode_collection = Some(codec);
        self
    }

    pub fn encode_collection(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.encode_collection = Some(codec);
        self
    }
}

impl std::fmt::Debug for MessageBindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBindings")
            .field("decode_single", &self.decode_single.is_some())
            .field("encode_single", &self.encode_single.is_some())
            .field("decode_collection", &self.decode_collection.is_some())
            .field("encode_collection", &self.encode_collection.is_some())
            .finish()
    }
}

/// Record adjustment applied before encoding to a message.
pub type ToMessageHook = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Codec for a prost message type, bridging through serde.
///
/// The generic structural conversion handles messages whose natural layout
/// matches the record. When they diverge, two explicit hooks remap:
/// - `to_message` adjusts the record before it is converted on encode;
/// - `to_record` produces field overrides merged into the converted record
///   after decode. Override keys may be dotted paths (`"parent.child"`),
///   assigned at the nested location; undotted keys overwrite top-level
///   keys.
pub struct ProstCodec<M> {
    to_message: Option<ToMessageHook>,
    to_record: Option<Arc<dyn Fn(&M) -> Map<String, Value> + Send + Sync>>,
    _message: PhantomData<M>,
}

impl<M> Default for ProstCodec<M> {
    fn default() -> Self {
        Self {
            to_message: None,
            to_record: None,
            _message: PhantomData,
        }
    }
}

impl<M> ProstCodec<M>
where
    M: Message + Serialize + DeserializeOwned + Default + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the record adjustment hook, applied before encoding.
    pub fn to_message<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.to_message = Some(Arc::new(hook));
        self
    }

    /// Install the override hook, applied to the converted record after
    /// decoding.
    pub fn to_record<F>(mut self, hook: F) -> Self
    where
        F: Fn(&M) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.to_record = Some(Arc::new(hook));
        self
    }

    /// Erase the message type for storage in [`MessageBindings`].
    pub fn shared(self) -> Arc<dyn MessageCodec> {
        Arc::new(self)
    }
}

impl<M> std::fmt::Debug for ProstCodec<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProstCodec")
            .field("message", &std::any::type_name::<M>())
            .field("to_message", &self.to_message.is_some())
            .field("to_record", &self.to_record.is_some())
            .finish()
    }
}

impl<M> MessageCodec for ProstCodec<M>
where
    M: Message + Serialize + DeserializeOwned + Default + 'static,
{
    fn decode(&self, bytes: &[u8]) -> Result<Value, ContractError> {
        let message = M::decode(bytes).map_err(|err| {
            tracing::debug!(error = %err, "request body is not a valid message");
            ContractError::invalid("Invalid protocol buffer data")
        })?;
        let mut record = serde_json::to_value(&message).map_err(|err| {
            ContractError::internal(format!("message is not representable as a record: {err}"))
        })?;
        if let Some(hook) = &self.to_record {
            apply_overrides(&mut record, hook(&message));
        }
        Ok(record)
    }

    fn encode(&self, record: &Value) -> Result<Bytes, ContractError> {
        let adjusted = match &self.to_message {
            Some(hook) => hook(record.clone()),
            None => record.clone(),
        };
        let message: M = serde_json::from_value(adjusted).map_err(|err| {
            ContractError::internal(format!("record does not match message shape: {err}"))
        })?;
        Ok(Bytes::from(message.encode_to_vec()))
    }
}

/// Merge hook-produced overrides into a converted record.
///
/// Dotted keys are written at the nested location, creating intermediate
/// objects as needed; plain keys overwrite at the top level.
pub fn apply_overrides(record: &mut Value, overrides: Map<String, Value>) {
    let Value::Object(map) = record else {
        return;
    };
    for (key, value) in overrides {
        if key.contains('.') {
            assign_path(map, &key, value);
        } else {
            map.insert(key, value);
        }
    }
}

fn assign_path(root: &mut Map<String, Value>, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };
    let mut current = root;
    for segment in parents {
        let slot = current
            .entry((*segment).to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        match slot {
            Value::Object(next) => current = next,
            _ => return,
        }
    }
    current.insert((*last).to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
    #[serde(default)]
    struct Widget {
        #[prost(int64, tag = "1")]
        a: i64,
        #[prost(string, tag = "2")]
        b: String,
        #[prost(bool, tag = "3")]
        c: bool,
    }

    #[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
    #[serde(default)]
    struct WidgetCollection {
        #[prost(message, repeated, tag = "1")]
        data: Vec<Widget>,
        #[prost(uint32, tag = "2")]
        page_size: u32,
        #[prost(bool, tag = "3")]
        next_page: bool,
    }

    #[test]
    fn test_round_trip_without_hooks() {
        let codec = ProstCodec::<Widget>::new();
        let record = json!({"a": 1, "b": "One", "c": true});
        let bytes = codec.encode(&record).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), record);
    }

    #[test]
    fn test_collection_round_trip_carries_paging_fields() {
        let codec = ProstCodec::<WidgetCollection>::new();
        let envelope = json!({
            "data": [
                {"a": 1, "b": "One", "c": false},
                {"a": 2, "b": "Two", "c": true}
            ],
            "page_size": 1,
            "next_page": true
        });
        let bytes = codec.encode(&envelope).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_truncated_bytes_fail_decode() {
        let codec = ProstCodec::<Widget>::new();
        let mut bytes = codec
            .encode(&json!({"a": 2, "b": "Two", "c": false}))
            .unwrap()
            .to_vec();
        bytes.pop();
        let err = codec.decode(&bytes).unwrap_err();
        assert_eq!(err.message(), "Invalid protocol buffer data");
    }

    #[test]
    fn test_to_message_hook_adjusts_record() {
        let codec = ProstCodec::<Widget>::new().to_message(|mut record| {
            if let Value::Object(map) = &mut record {
                map.remove("extra");
            }
            record
        });
        let bytes = codec
            .encode(&json!({"a": 1, "b": "One", "c": true, "extra": "dropped"}))
            .unwrap();
        assert_eq!(
            codec.decode(&bytes).unwrap(),
            json!({"a": 1, "b": "One", "c": true})
        );
    }

    #[test]
    fn test_to_record_hook_overrides_top_level() {
        let codec = ProstCodec::<Widget>::new().to_record(|message| {
            let mut overrides = Map::new();
            overrides.insert("b".to_string(), json!(message.b.to_uppercase()));
            overrides
        });
        let bytes = ProstCodec::<Widget>::new()
            .encode(&json!({"a": 1, "b": "one", "c": false}))
            .unwrap();
        assert_eq!(
            codec.decode(&bytes).unwrap(),
            json!({"a": 1, "b": "ONE", "c": false})
        );
    }

    #[test]
    fn test_apply_overrides_dotted_path() {
        let mut record = json!({"a": 1, "meta": {"kept": true}});
        let mut overrides = Map::new();
        overrides.insert("meta.flag".to_string(), json!("set"));
        overrides.insert("deep.nested.key".to_string(), json!(7));
        overrides.insert("a".to_string(), json!(2));
        apply_overrides(&mut record, overrides);
        assert_eq!(
            record,
            json!({
                "a": 2,
                "meta": {"kept": true, "flag": "set"},
                "deep": {"nested": {"key": 7}}
            })
        );
    }

    #[test]
    fn test_apply_overrides_replaces_non_object_parent() {
        let mut record = json!({"meta": 3});
        let mut overrides = Map::new();
        overrides.insert("meta.flag".to_string(), json!(true));
        apply_overrides(&mut record, overrides);
        assert_eq!(record, json!({"meta": {"flag": true}}));
    }
}
