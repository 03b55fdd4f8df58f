use crate::firestore::model::GeoPoint;
use crate::firestore::value::{BytesValue, MapValue};

/// Tag names used by the REST API, one per [`WireValue`] variant.
pub const WIRE_TAGS: [&str; 11] = [
    "nullValue",
    "booleanValue",
    "integerValue",
    "doubleValue",
    "timestampValue",
    "stringValue",
    "bytesValue",
    "referenceValue",
    "geoPointValue",
    "arrayValue",
    "mapValue",
];

/// A single typed field value as transmitted by the Firestore REST API.
///
/// Timestamps keep their RFC 3339 text; references keep the full resource
/// name (`projects/{p}/databases/{d}/documents/{path}`).
#[derive(Clone, Debug, PartialEq)]
pub enum WireValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(String),
    String(String),
    Bytes(BytesValue),
    Reference(String),
    GeoPoint(GeoPoint),
    Array(Vec<WireValue>),
    Map(MapValue),
}

impl WireValue {
    pub fn tag(&self) -> &'static str {
        match self {
            WireValue::Null => "nullValue",
            WireValue::Boolean(_) => "booleanValue",
            WireValue::Integer(_) => "integerValue",
            WireValue::Double(_) => "doubleValue",
            WireValue::Timestamp(_) => "timestampValue",
            WireValue::String(_) => "stringValue",
            WireValue::Bytes(_) => "bytesValue",
            WireValue::Reference(_) => "referenceValue",
            WireValue::GeoPoint(_) => "geoPointValue",
            WireValue::Array(_) => "arrayValue",
            WireValue::Map(_) => "mapValue",
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        WireValue::String(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        WireValue::Reference(name.into())
    }

    pub fn timestamp(value: impl Into<String>) -> Self {
        WireValue::Timestamp(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_reports_a_known_tag() {
        let values = [
            WireValue::Null,
            WireValue::Boolean(true),
            WireValue::Integer(1),
            WireValue::Double(1.5),
            WireValue::timestamp("2024-01-15T10:30:00Z"),
            WireValue::string("hello"),
            WireValue::Bytes(BytesValue::new(vec![1])),
            WireValue::reference("projects/p/databases/(default)/documents/a/b"),
            WireValue::GeoPoint(GeoPoint::new(1.0, 2.0)),
            WireValue::Array(Vec::new()),
            WireValue::Map(MapValue::default()),
        ];
        for value in &values {
            assert!(WIRE_TAGS.contains(&value.tag()));
        }
    }
}
