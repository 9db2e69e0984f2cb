// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Value Model
//!
//! The tagged, metadata-carrying datum passed through the engine and across
//! the object bridge. Every command result, pipeline intermediate, and
//! scripted expression result is a [`Value`].
//!
//! ## Overview
//!
//! A value is a tagged union carrying one of:
//!
//! - **Null**: the absence of a result
//! - **Bool / Int / Float**: 64-bit scalars
//! - **Str**: UTF-8 text
//! - **Bytes**: opaque binary
//! - **List**: ordered values
//! - **Map**: string-keyed values
//! - **Handle**: an opaque id referring to a native resource pinned by the
//!   bridge's handle table
//!
//! ## Metadata
//!
//! Every value carries [`ValueMeta`]: a monotonically assigned process-unique
//! `id`, a declared type tag consistent with the union variant, creation and
//! modification timestamps on the process monotonic clock (nanoseconds), and
//! a best-effort payload size in bytes.
//!
//! ## Invariants
//!
//! - `id` is unique within a process lifetime
//! - the type tag always matches the payload variant
//! - handles resolve against the bridge's native-object table until released
//!
//! Equality compares payloads only; two values with equal payloads but
//! distinct ids are equal. This is what makes the marshalling round-trip
//! property (`to_scripted(to_native(x)) == x`) expressible.

use base64::Engine as _;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Opaque identity of a native resource pinned by the bridge handle table.
pub type HandleId = u64;

static NEXT_VALUE_ID: AtomicU64 = AtomicU64::new(1);
static PROCESS_EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

fn monotonic_ns() -> u64 {
    PROCESS_EPOCH.elapsed().as_nanos() as u64
}

/// The payload variants of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum ValuePayload {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Handle(HandleId),
}

impl ValuePayload {
    /// The declared type tag for this variant
    pub fn type_tag(&self) -> &'static str {
        match self {
            ValuePayload::Null => "null",
            ValuePayload::Bool(_) => "bool",
            ValuePayload::Int(_) => "int",
            ValuePayload::Float(_) => "float",
            ValuePayload::Str(_) => "string",
            ValuePayload::Bytes(_) => "bytes",
            ValuePayload::List(_) => "list",
            ValuePayload::Map(_) => "map",
            ValuePayload::Handle(_) => "handle",
        }
    }

    /// Best-effort payload size in bytes
    pub fn estimated_size(&self) -> u64 {
        match self {
            ValuePayload::Null => 0,
            ValuePayload::Bool(_) => 1,
            ValuePayload::Int(_) | ValuePayload::Float(_) | ValuePayload::Handle(_) => 8,
            ValuePayload::Str(s) => s.len() as u64,
            ValuePayload::Bytes(b) => b.len() as u64,
            ValuePayload::List(items) => items.iter().map(|v| 8 + v.meta().size()).sum(),
            ValuePayload::Map(entries) => entries
                .iter()
                .map(|(k, v)| k.len() as u64 + 8 + v.meta().size())
                .sum(),
        }
    }
}

/// Metadata attached to every value.
#[derive(Debug, Clone)]
pub struct ValueMeta {
    id: u64,
    type_tag: String,
    created_at: u64,
    modified_at: u64,
    size: u64,
}

impl ValueMeta {
    fn new(payload: &ValuePayload) -> Self {
        let now = monotonic_ns();
        Self {
            id: NEXT_VALUE_ID.fetch_add(1, Ordering::Relaxed),
            type_tag: payload.type_tag().to_string(),
            created_at: now,
            modified_at: now,
            size: payload.estimated_size(),
        }
    }

    /// Process-unique monotonically assigned id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Declared type tag, consistent with the payload variant
    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    /// Creation timestamp on the process monotonic clock (ns)
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Last-modification timestamp on the process monotonic clock (ns)
    pub fn modified_at(&self) -> u64 {
        self.modified_at
    }

    /// Best-effort payload size in bytes
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// The tagged, metadata-carrying datum of the shell core.
#[derive(Debug, Clone)]
pub struct Value {
    meta: ValueMeta,
    payload: ValuePayload,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
    }
}

impl Value {
    fn from_payload(payload: ValuePayload) -> Self {
        let meta = ValueMeta::new(&payload);
        Self { meta, payload }
    }

    /// Creates a null value
    pub fn null() -> Self {
        Self::from_payload(ValuePayload::Null)
    }

    /// Creates a boolean value
    pub fn boolean(v: bool) -> Self {
        Self::from_payload(ValuePayload::Bool(v))
    }

    /// Creates a 64-bit integer value
    pub fn int(v: i64) -> Self {
        Self::from_payload(ValuePayload::Int(v))
    }

    /// Creates a 64-bit float value
    pub fn float(v: f64) -> Self {
        Self::from_payload(ValuePayload::Float(v))
    }

    /// Creates a UTF-8 string value
    pub fn string(v: impl Into<String>) -> Self {
        Self::from_payload(ValuePayload::Str(v.into()))
    }

    /// Creates an opaque binary value
    pub fn bytes(v: Vec<u8>) -> Self {
        Self::from_payload(ValuePayload::Bytes(v))
    }

    /// Creates a list value
    pub fn list(items: Vec<Value>) -> Self {
        Self::from_payload(ValuePayload::List(items))
    }

    /// Creates a map value
    pub fn map(entries: BTreeMap<String, Value>) -> Self {
        Self::from_payload(ValuePayload::Map(entries))
    }

    /// Creates a map value from key/value pairs
    pub fn map_from(pairs: Vec<(&str, Value)>) -> Self {
        let mut entries = BTreeMap::new();
        for (k, v) in pairs {
            entries.insert(k.to_string(), v);
        }
        Self::map(entries)
    }

    /// Creates a handle value pinned against the bridge handle table
    pub fn handle(id: HandleId) -> Self {
        Self::from_payload(ValuePayload::Handle(id))
    }

    /// Gets the metadata
    pub fn meta(&self) -> &ValueMeta {
        &self.meta
    }

    /// Gets the payload
    pub fn payload(&self) -> &ValuePayload {
        &self.payload
    }

    /// Gets the declared type tag
    pub fn type_tag(&self) -> &str {
        self.meta.type_tag()
    }

    /// Checks whether this value is null
    pub fn is_null(&self) -> bool {
        matches!(self.payload, ValuePayload::Null)
    }

    /// Gets the boolean payload if present
    pub fn as_bool(&self) -> Option<bool> {
        match &self.payload {
            ValuePayload::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the integer payload if present
    pub fn as_int(&self) -> Option<i64> {
        match &self.payload {
            ValuePayload::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the float payload if present
    pub fn as_float(&self) -> Option<f64> {
        match &self.payload {
            ValuePayload::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Gets the string payload if present
    pub fn as_str(&self) -> Option<&str> {
        match &self.payload {
            ValuePayload::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the bytes payload if present
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            ValuePayload::Bytes(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the list payload if present
    pub fn as_list(&self) -> Option<&[Value]> {
        match &self.payload {
            ValuePayload::List(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the map payload if present
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match &self.payload {
            ValuePayload::Map(v) => Some(v),
            _ => None,
        }
    }

    /// Gets the handle id if present
    pub fn as_handle(&self) -> Option<HandleId> {
        match &self.payload {
            ValuePayload::Handle(v) => Some(*v),
            _ => None,
        }
    }

    /// Replaces the payload in place, refreshing the modification timestamp
    /// and size while keeping the identity.
    ///
    /// The replacement must keep the type tag consistent with the variant;
    /// the tag is recomputed from the new payload.
    pub fn replace_payload(&mut self, payload: ValuePayload) {
        self.meta.type_tag = payload.type_tag().to_string();
        self.meta.size = payload.estimated_size();
        self.meta.modified_at = monotonic_ns();
        self.payload = payload;
    }

    /// Produces a structural copy with fresh metadata ids throughout.
    pub fn deep_clone(&self) -> Value {
        match &self.payload {
            ValuePayload::List(items) => Value::list(items.iter().map(Value::deep_clone).collect()),
            ValuePayload::Map(entries) => {
                let copied = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.deep_clone()))
                    .collect();
                Value::map(copied)
            }
            other => Value::from_payload(other.clone()),
        }
    }

    /// Merges `other` into `self`, recursing through map values.
    ///
    /// Map entries merge key-wise with `other` winning on non-map conflicts;
    /// every other variant pairing is replaced wholesale by `other`.
    pub fn deep_merge(&self, other: &Value) -> Value {
        match (&self.payload, &other.payload) {
            (ValuePayload::Map(a), ValuePayload::Map(b)) => {
                let mut merged = a.clone();
                for (k, v) in b {
                    let next = match merged.get(k) {
                        Some(existing) => existing.deep_merge(v),
                        None => v.deep_clone(),
                    };
                    merged.insert(k.clone(), next);
                }
                Value::map(merged)
            }
            _ => other.deep_clone(),
        }
    }

    /// Serialises the value into the recording document representation.
    ///
    /// Bytes become `{"$bytes": <base64>}` and handles become
    /// `{"$handle": <id>}` so the round trip through JSON stays lossless for
    /// every variant.
    pub fn to_json(&self) -> serde_json::Value {
        match &self.payload {
            ValuePayload::Null => serde_json::Value::Null,
            ValuePayload::Bool(v) => serde_json::Value::Bool(*v),
            ValuePayload::Int(v) => serde_json::Value::from(*v),
            ValuePayload::Float(v) => serde_json::Value::from(*v),
            ValuePayload::Str(v) => serde_json::Value::String(v.clone()),
            ValuePayload::Bytes(v) => serde_json::json!({
                "$bytes": base64::engine::general_purpose::STANDARD.encode(v),
            }),
            ValuePayload::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            ValuePayload::Map(entries) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in entries {
                    obj.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(obj)
            }
            ValuePayload::Handle(id) => serde_json::json!({ "$handle": id }),
        }
    }

    /// Reconstructs a value from its recording document representation.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::null(),
            serde_json::Value::Bool(v) => Value::boolean(*v),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::int(i)
                } else {
                    Value::float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::string(s.clone()),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(obj) => {
                if obj.len() == 1 {
                    if let Some(serde_json::Value::String(encoded)) = obj.get("$bytes") {
                        let decoded = base64::engine::general_purpose::STANDARD
                            .decode(encoded)
                            .unwrap_or_default();
                        return Value::bytes(decoded);
                    }
                    if let Some(id) = obj.get("$handle").and_then(serde_json::Value::as_u64) {
                        return Value::handle(id);
                    }
                }
                let entries = obj
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v)))
                    .collect();
                Value::map(entries)
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.payload {
            ValuePayload::Null => write!(f, "null"),
            ValuePayload::Bool(v) => write!(f, "{}", v),
            ValuePayload::Int(v) => write!(f, "{}", v),
            ValuePayload::Float(v) => write!(f, "{}", v),
            ValuePayload::Str(v) => write!(f, "{}", v),
            ValuePayload::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            ValuePayload::Handle(id) => write!(f, "<handle {}>", id),
            _ => write!(f, "{}", self.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_monotonic() {
        let a = Value::int(1);
        let b = Value::int(1);
        assert!(b.meta().id() > a.meta().id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_type_tag_matches_variant() {
        assert_eq!(Value::null().type_tag(), "null");
        assert_eq!(Value::int(4).type_tag(), "int");
        assert_eq!(Value::string("x").type_tag(), "string");
        assert_eq!(Value::bytes(vec![1, 2]).type_tag(), "bytes");
        assert_eq!(Value::handle(9).type_tag(), "handle");
    }

    #[test]
    fn test_size_is_best_effort_payload_bytes() {
        assert_eq!(Value::string("hello").meta().size(), 5);
        assert_eq!(Value::bytes(vec![0u8; 32]).meta().size(), 32);
        let list = Value::list(vec![Value::string("ab"), Value::string("cd")]);
        assert_eq!(list.meta().size(), 2 * (8 + 2));
    }

    #[test]
    fn test_replace_payload_refreshes_meta() {
        let mut v = Value::string("short");
        let id = v.meta().id();
        let created = v.meta().created_at();
        v.replace_payload(ValuePayload::Str("a much longer string".into()));
        assert_eq!(v.meta().id(), id);
        assert_eq!(v.meta().created_at(), created);
        assert!(v.meta().modified_at() >= created);
        assert_eq!(v.meta().size(), 20);
    }

    #[test]
    fn test_json_round_trip_all_variants() {
        let value = Value::map_from(vec![
            ("null", Value::null()),
            ("flag", Value::boolean(true)),
            ("count", Value::int(42)),
            ("ratio", Value::float(0.5)),
            ("name", Value::string("nexus")),
            ("blob", Value::bytes(vec![1, 2, 3])),
            ("items", Value::list(vec![Value::int(1), Value::int(2)])),
            ("res", Value::handle(77)),
        ]);
        let restored = Value::from_json(&value.to_json());
        assert_eq!(restored, value);
    }

    #[test]
    fn test_deep_merge_recurses_maps() {
        let base = Value::map_from(vec![
            ("a", Value::int(1)),
            ("nested", Value::map_from(vec![("x", Value::int(1)), ("y", Value::int(2))])),
        ]);
        let patch = Value::map_from(vec![
            ("b", Value::int(3)),
            ("nested", Value::map_from(vec![("y", Value::int(9))])),
        ]);
        let merged = base.deep_merge(&patch);
        let map = merged.as_map().unwrap();
        assert_eq!(map.get("a").unwrap().as_int(), Some(1));
        assert_eq!(map.get("b").unwrap().as_int(), Some(3));
        let nested = map.get("nested").unwrap().as_map().unwrap();
        assert_eq!(nested.get("x").unwrap().as_int(), Some(1));
        assert_eq!(nested.get("y").unwrap().as_int(), Some(9));
    }

    #[test]
    fn test_deep_clone_assigns_fresh_ids() {
        let original = Value::list(vec![Value::int(1)]);
        let copy = original.deep_clone();
        assert_eq!(copy, original);
        assert_ne!(copy.meta().id(), original.meta().id());
    }
}
