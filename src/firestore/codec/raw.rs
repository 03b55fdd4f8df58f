use serde_json::Value as JsonValue;

use crate::firestore::codec::{decode_value, PlainFields, PlainValue};
use crate::firestore::remote::serializer;
use crate::firestore::value::WIRE_TAGS;

/// Returns `true` when any object key at any depth is a wire tag name,
/// i.e. the value looks like it was saved in raw REST form.
pub fn contains_wire_tags(value: &PlainValue) -> bool {
    match value {
        JsonValue::Object(object) => object
            .iter()
            .any(|(key, nested)| WIRE_TAGS.contains(&key.as_str()) || contains_wire_tags(nested)),
        JsonValue::Array(values) => values.iter().any(contains_wire_tags),
        _ => false,
    }
}

/// Brings fields saved in raw wire form back to plain form.
///
/// A raw value is an object with exactly one key, that key being a wire tag.
/// Raw values are parsed and decoded; plain objects and arrays are walked so
/// raw values nested inside them are decoded too. Anything that fails to
/// parse is kept as is.
pub fn normalize_fields(fields: &PlainFields) -> PlainFields {
    fields
        .iter()
        .map(|(name, value)| (name.clone(), normalize_value(name, value)))
        .collect()
}

fn normalize_value(name: &str, value: &PlainValue) -> PlainValue {
    if !contains_wire_tags(value) {
        return value.clone();
    }
    match value {
        JsonValue::Object(object) if is_tagged(object) => match serializer::decode_value(value) {
            Ok(wire) => decode_value(&wire),
            Err(err) => {
                log::debug!("field '{name}' kept as plain value: {err}");
                value.clone()
            }
        },
        JsonValue::Object(object) => JsonValue::Object(
            object
                .iter()
                .map(|(key, nested)| (key.clone(), normalize_value(name, nested)))
                .collect(),
        ),
        JsonValue::Array(values) => JsonValue::Array(
            values
                .iter()
                .map(|nested| normalize_value(name, nested))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn is_tagged(object: &serde_json::Map<String, JsonValue>) -> bool {
    object.len() == 1
        && object
            .keys()
            .next()
            .is_some_and(|key| WIRE_TAGS.contains(&key.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: JsonValue) -> PlainFields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn detects_tags_at_any_depth() {
        assert!(contains_wire_tags(&json!({ "stringValue": "x" })));
        assert!(contains_wire_tags(&json!({ "a": [{ "b": { "integerValue": "1" } }] })));
        assert!(!contains_wire_tags(&json!({ "a": [1, 2, { "b": "c" }] })));
        assert!(!contains_wire_tags(&json!("stringValue")));
    }

    #[test]
    fn raw_fields_are_decoded() {
        let raw = fields(json!({
            "name": { "stringValue": "Ada" },
            "age": { "integerValue": "36" },
            "home": { "geoPointValue": { "latitude": 51.5, "longitude": -0.12 } },
            "tags": { "arrayValue": { "values": [{ "stringValue": "math" }] } }
        }));
        assert_eq!(
            JsonValue::Object(normalize_fields(&raw)),
            json!({
                "name": "Ada",
                "age": 36,
                "home": { "_geopoint": true, "latitude": 51.5, "longitude": -0.12 },
                "tags": ["math"]
            })
        );
    }

    #[test]
    fn raw_values_nested_in_plain_objects_are_decoded() {
        let mixed = fields(json!({
            "address": { "city": { "stringValue": "Paris" }, "zip": "75001" }
        }));
        assert_eq!(
            JsonValue::Object(normalize_fields(&mixed)),
            json!({ "address": { "city": "Paris", "zip": "75001" } })
        );
    }

    #[test]
    fn malformed_raw_values_are_kept() {
        let broken = fields(json!({ "n": { "integerValue": "twelve" } }));
        assert_eq!(normalize_fields(&broken), broken);
    }

    #[test]
    fn plain_fields_are_untouched() {
        let plain = fields(json!({
            "name": "Ada",
            "meta": { "stringValue": "a", "note": "not a wire value" }
        }));
        assert_eq!(normalize_fields(&plain), plain);
    }
}
