//! Helpers that reshape loosely-typed phpIPAM records
//!
//! phpIPAM names the same field differently across versions and endpoints
//! (`id`, `sectionId`, `subnetID`, ...). Lookups go through alias lists kept
//! as data so new spellings are a one-line change.

use std::net::Ipv4Addr;

use serde_json::{Map, Value};

/// Identifier spellings seen across phpIPAM objects, in priority order
pub const ID_ALIASES: &[&str] = &[
    "id",
    "ID",
    "sectionId",
    "sectionID",
    "sectionid",
    "subnetId",
    "subnetID",
    "subnetid",
    "locationId",
    "locationID",
    "locationid",
];

/// A field counts as present unless it is missing, `null` or a blank string
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// First present value among `keys`
pub fn first_present<'a>(record: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = record.as_object()?;
    keys.iter()
        .filter_map(|key| object.get(*key))
        .find(|value| is_present(value))
}

/// First present value among `keys`, rendered as text
pub fn text_field(record: &Value, keys: &[&str]) -> Option<String> {
    first_present(record, keys).map(value_to_text)
}

/// Resolve a record's identifier from [`ID_ALIASES`], then `fallback_keys`
pub fn resolve_id(record: &Value, fallback_keys: &[&str]) -> Option<Value> {
    first_present(record, ID_ALIASES)
        .or_else(|| first_present(record, fallback_keys))
        .cloned()
}

/// Canonical array-index form: "0", "1", ... (no sign, no leading zeros)
fn as_index_key(key: &str) -> Option<u32> {
    let index = key.parse::<u32>().ok()?;
    (index != u32::MAX && index.to_string() == key).then_some(index)
}

/// Turn phpIPAM's list shapes into a plain list
///
/// Arrays are returned as-is. Objects keyed by id (`{"1": {...}, "7": {...}}`)
/// yield their values, index-like keys first in numeric order, then the
/// remaining keys in key order. Anything else is an empty list.
pub fn normalise_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        Value::Object(map) => order_object_values(map),
        _ => Vec::new(),
    }
}

fn order_object_values(map: Map<String, Value>) -> Vec<Value> {
    let mut indexed = Vec::new();
    let mut named = Vec::new();
    for (key, value) in map {
        match as_index_key(&key) {
            Some(index) => indexed.push((index, value)),
            None => named.push(value),
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed
        .into_iter()
        .map(|(_, value)| value)
        .chain(named)
        .collect()
}

/// Numeric value of a JSON number or numeric string
fn numeric_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        },
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Wrap to an unsigned 32-bit integer: truncate, then modulo 2^32
fn to_uint32(number: f64) -> u32 {
    const TWO_POW_32: f64 = 4_294_967_296.0;
    number.trunc().rem_euclid(TWO_POW_32) as u32
}

/// Render an integer-encoded IPv4 address as a dotted quad
///
/// `3232235521` becomes `"192.168.0.1"`. Non-numeric or non-finite input
/// yields `None`.
pub fn int_to_ipv4(value: &Value) -> Option<String> {
    let raw = to_uint32(numeric_value(value)?);
    let octets = [
        (raw >> 24) as u8,
        ((raw >> 16) & 0xff) as u8,
        ((raw >> 8) & 0xff) as u8,
        (raw & 0xff) as u8,
    ];
    Some(Ipv4Addr::from(octets).to_string())
}

/// Display form of a subnet address that may be text or an integer
pub fn format_subnet(value: &Value) -> String {
    match value {
        Value::String(s) if s.contains('.') || s.contains(':') => s.clone(),
        Value::String(s) => int_to_ipv4(value).unwrap_or_else(|| s.clone()),
        Value::Number(_) => int_to_ipv4(value).unwrap_or_else(|| value_to_text(value)),
        other => value_to_text(other),
    }
}

/// Plain text form of a JSON value (`null` is empty)
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
