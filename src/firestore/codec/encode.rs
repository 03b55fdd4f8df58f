use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::firestore::codec::{
    PlainFields, PlainValue, GEOPOINT_MARKER, GEOPOINT_TYPE, REFERENCE_TYPE, TYPE_MARKER,
};
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DatabaseId, GeoPoint, ResourcePath};
use crate::firestore::value::{MapValue, WireValue};

static ISO_DATE_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .expect("date-time pattern compiles")
});

// 2^63 as f64; integral doubles at or above it do not fit in an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Shape of a plain value, in the order the encoder tests for it.
///
/// The first matching row decides the wire type:
///
/// | # | plain input | wire type |
/// |---|---|---|
/// | 1 | `null` | null |
/// | 2 | boolean | boolean |
/// | 3 | integral number / other number | integer / double |
/// | 4 | ISO-8601 date-time string that parses / other string | timestamp / string |
/// | 5 | array | array |
/// | 6a | object with `_geopoint: true` or `_type: "geopoint"` and numeric lat/lon | geopoint |
/// | 6b | object with `_type: "reference"` and a string `path` | reference |
/// | 6c | object with exactly the numeric keys `latitude` and `longitude` | geopoint |
/// | 6d | any other object | map |
#[derive(Clone, Debug, PartialEq)]
pub enum PlainShape<'a> {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(String),
    Text(&'a str),
    List(&'a [JsonValue]),
    MarkedGeoPoint(GeoPoint),
    MarkedReference(&'a str),
    ImplicitGeoPoint(GeoPoint),
    Object(&'a JsonMap<String, JsonValue>),
}

impl<'a> PlainShape<'a> {
    pub fn classify(value: &'a PlainValue) -> Self {
        match value {
            JsonValue::Null => PlainShape::Null,
            JsonValue::Bool(boolean) => PlainShape::Boolean(*boolean),
            JsonValue::Number(number) => classify_number(number),
            JsonValue::String(text) => match normalize_timestamp(text) {
                Some(timestamp) => PlainShape::Timestamp(timestamp),
                None => PlainShape::Text(text),
            },
            JsonValue::Array(values) => PlainShape::List(values),
            JsonValue::Object(object) => classify_object(object),
        }
    }
}

fn classify_number(number: &Number) -> PlainShape<'static> {
    if let Some(integer) = number.as_i64() {
        return PlainShape::Integer(integer);
    }
    let double = number.as_f64().unwrap_or(f64::NAN);
    if number.is_f64() && double.fract() == 0.0 && double >= -I64_BOUND && double < I64_BOUND {
        PlainShape::Integer(double as i64)
    } else {
        PlainShape::Double(double)
    }
}

fn classify_object(object: &JsonMap<String, JsonValue>) -> PlainShape<'_> {
    let coordinates = || {
        let latitude = object.get("latitude").and_then(JsonValue::as_f64)?;
        let longitude = object.get("longitude").and_then(JsonValue::as_f64)?;
        Some(GeoPoint::new(latitude, longitude))
    };
    let type_marker = object.get(TYPE_MARKER).and_then(JsonValue::as_str);

    let geopoint_marked = object.get(GEOPOINT_MARKER) == Some(&JsonValue::Bool(true))
        || type_marker == Some(GEOPOINT_TYPE);
    if geopoint_marked {
        if let Some(point) = coordinates() {
            return PlainShape::MarkedGeoPoint(point);
        }
    }
    if type_marker == Some(REFERENCE_TYPE) {
        if let Some(path) = object.get("path").and_then(JsonValue::as_str) {
            return PlainShape::MarkedReference(path);
        }
    }
    if object.len() == 2 {
        if let Some(point) = coordinates() {
            return PlainShape::ImplicitGeoPoint(point);
        }
    }
    PlainShape::Object(object)
}

/// Returns the canonical UTC form of `text` when it is an ISO-8601 date-time
/// naming a real instant. A missing offset is read as UTC.
fn normalize_timestamp(text: &str) -> Option<String> {
    let captures = ISO_DATE_TIME.captures(text)?;
    let normalized = if captures.get(2).is_some() {
        text.to_string()
    } else {
        format!("{text}Z")
    };
    let parsed = DateTime::parse_from_rfc3339(&normalized).ok()?;
    Some(
        parsed
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::AutoSi, true),
    )
}

/// Encodes plain values, optionally qualifying reference paths with a database.
///
/// Without a database, the `path` of a marked reference is sent verbatim.
/// With one, relative paths such as `/users/u1` are expanded to the full
/// resource name the REST API expects.
#[derive(Clone, Debug, Default)]
pub struct ValueEncoder {
    database_id: Option<DatabaseId>,
}

impl ValueEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_database(database_id: DatabaseId) -> Self {
        Self {
            database_id: Some(database_id),
        }
    }

    pub fn encode_value(&self, value: &PlainValue) -> WireValue {
        match PlainShape::classify(value) {
            PlainShape::Null => WireValue::Null,
            PlainShape::Boolean(boolean) => WireValue::Boolean(boolean),
            PlainShape::Integer(integer) => WireValue::Integer(integer),
            PlainShape::Double(double) => WireValue::Double(double),
            PlainShape::Timestamp(timestamp) => WireValue::Timestamp(timestamp),
            PlainShape::Text(text) => WireValue::string(text),
            PlainShape::List(values) => {
                WireValue::Array(values.iter().map(|value| self.encode_value(value)).collect())
            }
            PlainShape::MarkedGeoPoint(point) | PlainShape::ImplicitGeoPoint(point) => {
                WireValue::GeoPoint(point)
            }
            PlainShape::MarkedReference(path) => WireValue::Reference(self.reference_name(path)),
            PlainShape::Object(object) => WireValue::Map(self.encode_fields(object)),
        }
    }

    pub fn encode_fields(&self, fields: &PlainFields) -> MapValue {
        fields
            .iter()
            .map(|(name, value)| (name.clone(), self.encode_value(value)))
            .collect()
    }

    fn reference_name(&self, path: &str) -> String {
        match &self.database_id {
            Some(database_id) if !path.starts_with("projects/") => {
                reference_resource_name(database_id, path).unwrap_or_else(|err| {
                    log::warn!("reference path '{path}' sent verbatim: {err}");
                    path.to_string()
                })
            }
            _ => path.to_string(),
        }
    }
}

/// Full resource name of the document at `path`, a decoded reference such as
/// `/users/u1`.
pub fn reference_resource_name(database_id: &DatabaseId, path: &str) -> FirestoreResult<String> {
    let resource = ResourcePath::from_string(path)?;
    if !resource.is_document() {
        return Err(invalid_argument(format!(
            "References must point to a document, got '{path}'"
        )));
    }
    Ok(database_id.resource_name(&resource))
}

/// Encodes a plain value using the shape table of [`PlainShape`].
pub fn encode_value(value: &PlainValue) -> WireValue {
    ValueEncoder::new().encode_value(value)
}

/// Encodes every field of a plain object.
pub fn encode_fields(fields: &PlainFields) -> MapValue {
    ValueEncoder::new().encode_fields(fields)
}
