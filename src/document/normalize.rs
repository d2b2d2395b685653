//! Upgrade of stored snapshots to the canonical document shape.
//!
//! The schema only ever grows optional fields, so upgrading is "fill if absent": every
//! field below gets its default when it is missing or `null`, and is otherwise left
//! exactly as stored. No type coercion happens here; [`super::Document::from_value`]
//! rejects known fields of the wrong type after normalization.

use serde_json::{json, Map, Value};

/// Schema version written into documents that predate the `version` field.
pub const DEFAULT_VERSION: f64 = 5.1;

/// Display names for the dealer tiers when none have been configured.
pub const DEFAULT_DEALER_NAMES: [(&str, &str); 3] =
    [("t1", "Dealer T1"), ("t2", "Dealer T2"), ("t3", "Dealer T3")];

type DefaultFn = fn() -> Value;

/// Canonical top-level fields and the value each one takes when absent.
const FIELDS: [(&str, DefaultFn); 9] = [
    ("version", default_version),
    ("users", empty_array),
    ("products", empty_array),
    ("templates", empty_array),
    ("dealerNames", default_dealer_names),
    ("brandLogoUrls", empty_object),
    ("logoUrl", empty_string),
    ("logs", empty_array),
    ("otps", empty_object),
];

fn default_version() -> Value {
    json!(DEFAULT_VERSION)
}

fn default_dealer_names() -> Value {
    Value::Object(
        DEFAULT_DEALER_NAMES
            .iter()
            .map(|(tier, name)| ((*tier).to_string(), Value::String((*name).to_string())))
            .collect(),
    )
}

fn empty_array() -> Value {
    Value::Array(Vec::new())
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn empty_string() -> Value {
    Value::String(String::new())
}

/// Fill every absent or `null` canonical field with its default.
///
/// Total and idempotent: `normalize(normalize(x)) == normalize(x)` for any object.
#[must_use]
pub fn normalize(mut raw: Map<String, Value>) -> Map<String, Value> {
    for (field, default) in FIELDS {
        let slot = raw.entry(field).or_insert(Value::Null);
        if slot.is_null() {
            *slot = default();
        }
    }
    raw
}
