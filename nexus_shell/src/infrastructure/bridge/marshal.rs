// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Marshalling
//!
//! Value conversion between the native model and the embedded runtime's
//! `Dynamic`. Primitive scalars map directly, strings are UTF-8, byte
//! buffers map to the runtime's blob container, lists and maps recurse,
//! and handles cross as an opaque [`ScriptHandle`] whose identity survives
//! the round trip.
//!
//! Marshalling is pure and idempotent: `to_scripted(to_native(x)) == x`
//! for round-trippable types. Cyclic scripted graphs (only expressible
//! through shared references) are cut off by the recursion bound and
//! surface as an error value rather than being silently flattened.

use crate::infrastructure::runtime::memory_gauge::MemoryGauge;
use nexus_shell_domain::{ShellError, Value, ValuePayload};
use rhai::{Array, Blob, Dynamic, Map};
use std::collections::BTreeMap;

/// Bound on scripted object nesting; crossing it reports a cyclic graph.
pub const MAX_MARSHAL_DEPTH: usize = 128;

/// Opaque identity of a pinned native resource inside the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptHandle {
    pub id: u64,
}

/// Converts a native value into the runtime representation.
pub fn to_scripted(value: &Value) -> Dynamic {
    match value.payload() {
        ValuePayload::Null => Dynamic::UNIT,
        ValuePayload::Bool(v) => Dynamic::from(*v),
        ValuePayload::Int(v) => Dynamic::from(*v),
        ValuePayload::Float(v) => Dynamic::from(*v),
        ValuePayload::Str(v) => Dynamic::from(v.clone()),
        ValuePayload::Bytes(v) => {
            let blob: Blob = v.clone();
            Dynamic::from(blob)
        }
        ValuePayload::List(items) => {
            let array: Array = items.iter().map(to_scripted).collect();
            Dynamic::from(array)
        }
        ValuePayload::Map(entries) => {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k.as_str().into(), to_scripted(v));
            }
            Dynamic::from(map)
        }
        ValuePayload::Handle(id) => Dynamic::from(ScriptHandle { id: *id }),
    }
}

/// Converts a runtime value into the native model, charging the memory
/// gauge at construction.
pub fn to_native(value: &Dynamic, gauge: &MemoryGauge) -> Result<Value, ShellError> {
    let native = convert(value, 0)?;
    gauge.check(native.meta().size())?;
    Ok(native)
}

fn convert(value: &Dynamic, depth: usize) -> Result<Value, ShellError> {
    if depth > MAX_MARSHAL_DEPTH {
        return Err(ShellError::invalid_argument(
            "cyclic or excessively nested scripted object",
        ));
    }
    // Shared values (closure captures) are materialised by value; a true
    // cycle keeps recursing until the depth bound cuts it off.
    let value = if value.is_shared() {
        value.flatten_clone()
    } else {
        value.clone()
    };

    if value.is_unit() {
        return Ok(Value::null());
    }
    if let Ok(v) = value.as_bool() {
        return Ok(Value::boolean(v));
    }
    if let Ok(v) = value.as_int() {
        return Ok(Value::int(v));
    }
    if let Ok(v) = value.as_float() {
        return Ok(Value::float(v));
    }
    if value.is_string() {
        let s = value
            .into_immutable_string()
            .map_err(|t| ShellError::internal_error(format!("string cast failed: {}", t)))?;
        return Ok(Value::string(s.to_string()));
    }
    if value.is::<Blob>() {
        if let Some(blob) = value.clone().try_cast::<Blob>() {
            return Ok(Value::bytes(blob));
        }
    }
    if value.is::<Array>() {
        if let Some(array) = value.clone().try_cast::<Array>() {
            let mut items = Vec::with_capacity(array.len());
            for item in &array {
                items.push(convert(item, depth + 1)?);
            }
            return Ok(Value::list(items));
        }
    }
    if value.is::<Map>() {
        if let Some(map) = value.clone().try_cast::<Map>() {
            let mut entries = BTreeMap::new();
            for (k, v) in &map {
                entries.insert(k.to_string(), convert(v, depth + 1)?);
            }
            return Ok(Value::map(entries));
        }
    }
    if let Some(handle) = value.clone().try_cast::<ScriptHandle>() {
        return Ok(Value::handle(handle.id));
    }
    Err(ShellError::invalid_argument(format!(
        "unmarshallable scripted value of type '{}'",
        value.type_name()
    )))
}
