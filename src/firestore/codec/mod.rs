//! Conversion between typed wire values and plain JSON values.
//!
//! Plain values are what users see and edit: exported files, the document
//! editor buffer, field-by-field input. Decoding is total. Encoding infers
//! types from JSON shapes (see [`PlainShape`]) and is therefore not always the
//! exact inverse of a previous decode:
//!
//! * strings shaped like ISO-8601 date-times become timestamps;
//! * an object with exactly the numeric keys `latitude` and `longitude`
//!   becomes a geopoint, even when a plain two-field map was intended;
//! * integral numbers become integers, so `3.0` comes back as `3`.

mod decode;
mod encode;
mod raw;

pub use decode::{decode_fields, decode_value, reference_path};
pub use encode::{encode_fields, encode_value, reference_resource_name, PlainShape, ValueEncoder};
pub use raw::{contains_wire_tags, normalize_fields};

/// Untyped JSON representation of a field value.
pub type PlainValue = serde_json::Value;

/// Untyped JSON representation of a document's fields.
pub type PlainFields = serde_json::Map<String, serde_json::Value>;

/// Marker key added to decoded geopoints: `{"_geopoint": true, ...}`.
pub const GEOPOINT_MARKER: &str = "_geopoint";

/// Marker key naming an explicit type: `{"_type": "geopoint" | "reference", ...}`.
pub const TYPE_MARKER: &str = "_type";

pub(crate) const GEOPOINT_TYPE: &str = "geopoint";
pub(crate) const REFERENCE_TYPE: &str = "reference";
