use crate::core::Document;
use serde_json::Value as JsonValue;

/// A partial update payload as supplied by a caller.
///
/// Kept untyped on purpose: the guard must see exactly which fields the
/// caller tried to touch, including ones no typed patch would carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Document,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &JsonValue)> {
        self.fields.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_document(self) -> Document {
        self.fields
    }
}

impl From<Document> for Patch {
    fn from(fields: Document) -> Self {
        Self { fields }
    }
}

impl TryFrom<JsonValue> for Patch {
    type Error = String;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(fields) => Ok(Self { fields }),
            other => Err(format!("update payload must be a JSON object, got {}", other)),
        }
    }
}
