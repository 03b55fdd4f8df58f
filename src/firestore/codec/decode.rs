use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Number, Value as JsonValue};

use crate::firestore::codec::{PlainFields, PlainValue, GEOPOINT_MARKER};
use crate::firestore::constants::REFERENCE_ERROR_SENTINEL;
use crate::firestore::value::{MapValue, WireValue};

static REFERENCE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"projects/([^/]+)/databases/([^/]+)/documents(/.*)")
        .expect("reference name pattern compiles")
});

/// Converts a wire value into its plain JSON form. Never fails.
pub fn decode_value(value: &WireValue) -> PlainValue {
    match value {
        WireValue::Null => JsonValue::Null,
        WireValue::Boolean(boolean) => JsonValue::Bool(*boolean),
        WireValue::Integer(integer) => json!(integer),
        WireValue::Double(double) => decode_double(*double),
        WireValue::Timestamp(timestamp) => JsonValue::String(timestamp.clone()),
        WireValue::String(string) => JsonValue::String(string.clone()),
        WireValue::Bytes(bytes) => JsonValue::String(bytes.to_base64()),
        WireValue::Reference(name) => JsonValue::String(
            reference_path(name).unwrap_or_else(|| {
                log::warn!("unparseable reference value '{name}'");
                REFERENCE_ERROR_SENTINEL.to_string()
            }),
        ),
        WireValue::GeoPoint(point) => json!({
            GEOPOINT_MARKER: true,
            "latitude": point.latitude(),
            "longitude": point.longitude(),
        }),
        WireValue::Array(values) => JsonValue::Array(values.iter().map(decode_value).collect()),
        WireValue::Map(map) => JsonValue::Object(decode_fields(map)),
    }
}

/// Converts every field of `map` into plain JSON.
pub fn decode_fields(map: &MapValue) -> PlainFields {
    map.fields()
        .iter()
        .map(|(name, value)| (name.clone(), decode_value(value)))
        .collect()
}

/// Extracts `/{path}` from `projects/{p}/databases/{d}/documents/{path}`.
///
/// The name may be embedded in a longer string, such as a full
/// `//firestore.googleapis.com/...` URL.
pub fn reference_path(name: &str) -> Option<String> {
    REFERENCE_NAME
        .captures(name)
        .and_then(|captures| captures.get(3))
        .map(|path| path.as_str().to_string())
}

fn decode_double(value: f64) -> PlainValue {
    match Number::from_f64(value) {
        Some(number) => JsonValue::Number(number),
        None if value.is_nan() => json!("NaN"),
        None if value > 0.0 => json!("Infinity"),
        None => json!("-Infinity"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::model::GeoPoint;
    use crate::firestore::value::BytesValue;

    #[test]
    fn integers_decode_to_numbers() {
        assert_eq!(decode_value(&WireValue::Integer(42)), json!(42));
    }

    #[test]
    fn references_keep_the_document_path() {
        let value = WireValue::reference("projects/p/databases/(default)/documents/users/u1");
        assert_eq!(decode_value(&value), json!("/users/u1"));
    }

    #[test]
    fn embedded_resource_names_are_found() {
        assert_eq!(
            reference_path("//firestore.googleapis.com/projects/p/databases/d/documents/users/u1"),
            Some("/users/u1".to_string())
        );
        assert_eq!(
            reference_path("projects/p/databases/d/documents/"),
            Some("/".to_string())
        );
    }

    #[test]
    fn malformed_references_yield_the_sentinel() {
        assert_eq!(
            decode_value(&WireValue::reference("users/u1")),
            json!(REFERENCE_ERROR_SENTINEL)
        );
        assert_eq!(
            decode_value(&WireValue::reference("projects/p/databases/d/documents")),
            json!(REFERENCE_ERROR_SENTINEL)
        );
    }

    #[test]
    fn geopoints_carry_the_marker() {
        let value = WireValue::GeoPoint(GeoPoint::new(48.8566, 2.3522));
        assert_eq!(
            decode_value(&value),
            json!({ "_geopoint": true, "latitude": 48.8566, "longitude": 2.3522 })
        );
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(
            decode_value(&WireValue::timestamp("2024-01-15T10:30:00Z")),
            json!("2024-01-15T10:30:00Z")
        );
        assert_eq!(
            decode_value(&WireValue::Bytes(BytesValue::new(b"hi".to_vec()))),
            json!("aGk=")
        );
        assert_eq!(decode_value(&WireValue::Null), JsonValue::Null);
        assert_eq!(decode_value(&WireValue::Double(f64::NAN)), json!("NaN"));
    }

    #[test]
    fn nested_collections_decode_recursively() {
        let map = MapValue::from_iter([(
            "tags".to_string(),
            WireValue::Array(vec![WireValue::string("a"), WireValue::Integer(2)]),
        )]);
        assert_eq!(
            decode_value(&WireValue::Map(map)),
            json!({ "tags": ["a", 2] })
        );
    }
}
