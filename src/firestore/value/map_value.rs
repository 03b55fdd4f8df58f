use std::collections::BTreeMap;

use crate::firestore::value::WireValue;

/// Named fields of a document or of a `mapValue`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: BTreeMap<String, WireValue>,
}

impl MapValue {
    pub fn new(fields: BTreeMap<String, WireValue>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &BTreeMap<String, WireValue> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&WireValue> {
        self.fields.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: WireValue) -> Option<WireValue> {
        self.fields.insert(name.into(), value)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, WireValue)> for MapValue {
    fn from_iter<T: IntoIterator<Item = (String, WireValue)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
