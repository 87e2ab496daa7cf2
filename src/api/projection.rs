// Entity-to-output projection. Each entity declares an explicit table of
// computed fields (epoch timestamps, embedded tiny projections, derived
// flags); anything not in the table falls back to the raw serialized
// attribute. Field specs support `"attr->alias"` renaming.

use serde::Serialize;
use serde_json::{Map, Value};

pub trait Project: Serialize {
    /// Computed substitute for a field, or None to read the raw attribute.
    fn computed(&self, _field: &str) -> Option<Value> {
        None
    }

    /// Project the requested fields into an ordered map keyed by alias.
    fn project(&self, fields: &[&str]) -> Map<String, Value> {
        let raw = serde_json::to_value(self).unwrap_or(Value::Null);
        let mut data = Map::new();
        for spec in fields {
            let (key, alias) = split_rename(spec);
            let value = match self.computed(key) {
                Some(value) => value,
                None => raw.get(key).cloned().unwrap_or(Value::Null),
            };
            data.insert(alias.to_string(), value);
        }
        data
    }
}

/// Split `"attr->alias"` into source and output names; without an arrow the
/// field projects under its own name.
fn split_rename(spec: &str) -> (&str, &str) {
    match spec.split_once("->") {
        Some((key, alias)) => (key, alias),
        None => (spec, spec),
    }
}
