// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical JSON serialization.
//!
//! Signatures and ledger lines require a byte-stable encoding: object
//! keys sorted, compact separators, no trailing whitespace. serde_json's
//! default `Map` is a `BTreeMap`, so round-tripping through `Value`
//! yields sorted keys, and `to_string` already uses `","`/`":"`.

use serde::Serialize;

/// Serialize `value` to canonical JSON (sorted keys, tight separators).
///
/// Struct field order does not survive: the value is converted to a
/// `serde_json::Value` first so object keys come out sorted.
pub fn to_canonical_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&value)
}

/// Canonical JSON of a `Value` with one named key removed.
///
/// Used when signing: the signature covers every field except the
/// signature itself.
pub fn to_canonical_json_without(
    value: &serde_json::Value,
    excluded_key: &str,
) -> Result<String, serde_json::Error> {
    let mut value = value.clone();
    if let Some(map) = value.as_object_mut() {
        map.remove(excluded_key);
    }
    serde_json::to_string(&value)
}

#[cfg(test)]
#[path = "canonical_tests.rs"]
mod tests;
