use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map as JsonMap, Value as JsonValue};

use crate::firestore::error::{internal_error, invalid_argument, unknown_field_type, FirestoreResult};
use crate::firestore::model::{DatabaseId, Document, DocumentKey, GeoPoint};
use crate::firestore::remote::datastore::WriteOperation;
use crate::firestore::value::{BytesValue, MapValue, WireValue};

/// Translates between REST JSON bodies and the typed wire model.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentPayload {
    name: String,
    #[serde(default)]
    fields: Option<JsonMap<String, JsonValue>>,
    #[serde(default)]
    create_time: Option<String>,
    #[serde(default)]
    update_time: Option<String>,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    pub fn database_name(&self) -> String {
        self.database_id.database_name()
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        self.database_id.resource_name(key.path())
    }

    pub fn encode_document_fields(&self, map: &MapValue) -> JsonValue {
        json!({
            "fields": encode_map_fields(map)
        })
    }

    pub fn encode_write(&self, write: &WriteOperation) -> JsonValue {
        match write {
            WriteOperation::Update { key, fields } => json!({
                "update": {
                    "name": self.document_name(key),
                    "fields": encode_map_fields(fields)
                }
            }),
            WriteOperation::Delete { key } => json!({
                "delete": self.document_name(key)
            }),
        }
    }

    pub fn encode_batch_write_body(&self, writes: &[WriteOperation]) -> JsonValue {
        let encoded: Vec<JsonValue> = writes.iter().map(|write| self.encode_write(write)).collect();
        json!({ "writes": encoded })
    }

    pub fn decode_document(&self, value: &JsonValue) -> FirestoreResult<Document> {
        let payload = DocumentPayload::deserialize(value)
            .map_err(|err| internal_error(format!("Malformed document payload: {err}")))?;
        let path = self.database_id.relative_path(&payload.name)?;
        let key = DocumentKey::from_path(path)?;
        let fields = match payload.fields {
            Some(fields) => decode_field_entries(&fields)?,
            // Document exists but has no user fields (or the fields were masked).
            None => MapValue::default(),
        };
        Ok(Document {
            key,
            fields,
            create_time: payload.create_time,
            update_time: payload.update_time,
        })
    }

    pub fn encode_value(&self, value: &WireValue) -> JsonValue {
        encode_value(value)
    }

    pub fn decode_value(&self, value: &JsonValue) -> FirestoreResult<WireValue> {
        decode_value(value)
    }
}

/// Encodes a map of fields as the REST `fields` object.
pub fn encode_map_fields(map: &MapValue) -> JsonValue {
    let mut fields = JsonMap::new();
    for (key, value) in map.fields() {
        fields.insert(key.clone(), encode_value(value));
    }
    JsonValue::Object(fields)
}

/// Decodes a REST `fields` object.
pub fn decode_map_fields(value: &JsonValue) -> FirestoreResult<MapValue> {
    let fields = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected 'fields' to be an object"))?;
    decode_field_entries(fields)
}

fn decode_field_entries(fields: &JsonMap<String, JsonValue>) -> FirestoreResult<MapValue> {
    let mut decoded = BTreeMap::new();
    for (key, value) in fields {
        decoded.insert(key.clone(), decode_value(value)?);
    }
    Ok(MapValue::new(decoded))
}

/// Renders a wire value as its tagged REST JSON object.
pub fn encode_value(value: &WireValue) -> JsonValue {
    match value {
        WireValue::Null => json!({ "nullValue": JsonValue::Null }),
        WireValue::Boolean(boolean) => json!({ "booleanValue": boolean }),
        WireValue::Integer(integer) => json!({ "integerValue": integer.to_string() }),
        WireValue::Double(double) => json!({ "doubleValue": encode_double(*double) }),
        WireValue::Timestamp(timestamp) => json!({ "timestampValue": timestamp }),
        WireValue::String(string) => json!({ "stringValue": string }),
        WireValue::Bytes(bytes) => json!({ "bytesValue": bytes.to_base64() }),
        WireValue::Reference(reference) => json!({ "referenceValue": reference }),
        WireValue::GeoPoint(point) => json!({
            "geoPointValue": {
                "latitude": point.latitude(),
                "longitude": point.longitude(),
            }
        }),
        WireValue::Array(values) => {
            let values = values.iter().map(encode_value).collect::<Vec<_>>();
            json!({ "arrayValue": { "values": values } })
        }
        WireValue::Map(map) => json!({
            "mapValue": {
                "fields": encode_map_fields(map)
            }
        }),
    }
}

fn encode_double(value: f64) -> JsonValue {
    if value.is_nan() {
        json!("NaN")
    } else if value == f64::INFINITY {
        json!("Infinity")
    } else if value == f64::NEG_INFINITY {
        json!("-Infinity")
    } else {
        json!(value)
    }
}

/// Parses a tagged REST JSON object into a wire value.
///
/// Fails with `UnknownFieldType` when the object carries none of the known tags.
pub fn decode_value(value: &JsonValue) -> FirestoreResult<WireValue> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid_argument("Expected Firestore value object"))?;
    if object.contains_key("nullValue") {
        return Ok(WireValue::Null);
    }
    if let Some(bool_value) = object.get("booleanValue") {
        let value = bool_value
            .as_bool()
            .ok_or_else(|| invalid_argument("booleanValue must be bool"))?;
        return Ok(WireValue::Boolean(value));
    }
    if let Some(integer_value) = object.get("integerValue") {
        let parsed = match integer_value {
            JsonValue::String(value) => value
                .parse::<i64>()
                .map_err(|err| invalid_argument(format!("Invalid integerValue: {err}")))?,
            JsonValue::Number(number) => number
                .as_i64()
                .ok_or_else(|| invalid_argument("Integer out of range"))?,
            _ => return Err(invalid_argument("integerValue must be a string or number")),
        };
        return Ok(WireValue::Integer(parsed));
    }
    if let Some(double_value) = object.get("doubleValue") {
        let parsed = match double_value {
            JsonValue::Number(number) => number
                .as_f64()
                .ok_or_else(|| invalid_argument("Invalid doubleValue"))?,
            JsonValue::String(value) => parse_double_string(value)?,
            _ => return Err(invalid_argument("doubleValue must be a number or string")),
        };
        return Ok(WireValue::Double(parsed));
    }
    if let Some(timestamp_value) = object.get("timestampValue") {
        let timestamp = timestamp_value
            .as_str()
            .ok_or_else(|| invalid_argument("timestampValue must be string"))?;
        return Ok(WireValue::timestamp(timestamp));
    }
    if let Some(string_value) = object.get("stringValue") {
        let str_value = string_value
            .as_str()
            .ok_or_else(|| invalid_argument("stringValue must be string"))?;
        return Ok(WireValue::string(str_value));
    }
    if let Some(bytes_value) = object.get("bytesValue") {
        let str_value = bytes_value
            .as_str()
            .ok_or_else(|| invalid_argument("bytesValue must be base64 string"))?;
        let decoded = BytesValue::from_base64(str_value)
            .map_err(|err| invalid_argument(format!("Invalid bytesValue: {err}")))?;
        return Ok(WireValue::Bytes(decoded));
    }
    if let Some(reference_value) = object.get("referenceValue") {
        let str_value = reference_value
            .as_str()
            .ok_or_else(|| invalid_argument("referenceValue must be string"))?;
        return Ok(WireValue::reference(str_value));
    }
    if let Some(geo_point) = object.get("geoPointValue") {
        // Zero coordinates are omitted from proto3 JSON.
        let latitude = geo_point
            .get("latitude")
            .and_then(JsonValue::as_f64)
            .unwrap_or(0.0);
        let longitude = geo_point
            .get("longitude")
            .and_then(JsonValue::as_f64)
            .unwrap_or(0.0);
        return Ok(WireValue::GeoPoint(GeoPoint::new(latitude, longitude)));
    }
    if let Some(array_value) = object.get("arrayValue") {
        let decoded = match array_value.get("values").and_then(JsonValue::as_array) {
            Some(entries) => entries
                .iter()
                .map(decode_value)
                .collect::<FirestoreResult<Vec<_>>>()?,
            None => Vec::new(),
        };
        return Ok(WireValue::Array(decoded));
    }
    if let Some(map_value) = object.get("mapValue") {
        let map = match map_value.get("fields") {
            Some(fields) => decode_map_fields(fields)?,
            None => MapValue::default(),
        };
        return Ok(WireValue::Map(map));
    }

    Err(unknown_field_type(format!(
        "Unknown Firestore value type with keys [{}]",
        object.keys().cloned().collect::<Vec<_>>().join(", ")
    )))
}

fn parse_double_string(value: &str) -> FirestoreResult<f64> {
    match value {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|err| invalid_argument(format!("Invalid doubleValue: {err}"))),
    }
}
