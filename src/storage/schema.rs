//! Collection schemas used by [`DocumentStore::validate`].
//!
//! [`DocumentStore::validate`]: super::DocumentStore::validate

use super::error::SchemaViolation;
use crate::core::{Document, EntityId};
use chrono::DateTime;
use regex::Regex;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

type CustomRule = Arc<dyn Fn(&JsonValue) -> Result<(), String> + Send + Sync>;

#[derive(Clone)]
pub enum FieldKind {
    String,
    Boolean,
    Number,
    /// RFC 3339 timestamp string.
    Timestamp,
    /// Identifier string of another document.
    Reference,
    /// Array of identifier strings.
    ReferenceList,
    Array,
    Object,
    /// String matching the pattern in full.
    Pattern(Regex),
    Custom(CustomRule),
}

impl FieldKind {
    pub fn custom<F>(rule: F) -> Self
    where
        F: Fn(&JsonValue) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(rule))
    }

    fn check(&self, value: &JsonValue) -> Result<(), String> {
        match self {
            FieldKind::String => expect(value.is_string(), "must be a string"),
            FieldKind::Boolean => expect(value.is_boolean(), "must be a boolean"),
            FieldKind::Number => expect(value.is_number(), "must be a number"),
            FieldKind::Timestamp => {
                let raw = value.as_str().ok_or("must be a timestamp string")?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|_| ())
                    .map_err(|err| format!("must be an RFC 3339 timestamp ({})", err))
            }
            FieldKind::Reference => expect(
                EntityId::from_json(value).is_some(),
                "must be a document identifier",
            ),
            FieldKind::ReferenceList => {
                let items = value.as_array().ok_or("must be an array of identifiers")?;
                match items.iter().position(|item| EntityId::from_json(item).is_none()) {
                    Some(index) => Err(format!("entry {} is not a document identifier", index)),
                    None => Ok(()),
                }
            }
            FieldKind::Array => expect(value.is_array(), "must be an array"),
            FieldKind::Object => expect(value.is_object(), "must be an object"),
            FieldKind::Pattern(pattern) => {
                let raw = value.as_str().ok_or("must be a string")?;
                expect(
                    pattern.is_match(raw),
                    format!("must match pattern {}", pattern.as_str()),
                )
            }
            FieldKind::Custom(rule) => rule(value),
        }
    }
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => f.write_str("String"),
            FieldKind::Boolean => f.write_str("Boolean"),
            FieldKind::Number => f.write_str("Number"),
            FieldKind::Timestamp => f.write_str("Timestamp"),
            FieldKind::Reference => f.write_str("Reference"),
            FieldKind::ReferenceList => f.write_str("ReferenceList"),
            FieldKind::Array => f.write_str("Array"),
            FieldKind::Object => f.write_str("Object"),
            FieldKind::Pattern(pattern) => write!(f, "Pattern({})", pattern.as_str()),
            FieldKind::Custom(_) => f.write_str("Custom"),
        }
    }
}

fn expect(ok: bool, reason: impl Into<String>) -> Result<(), String> {
    if ok { Ok(()) } else { Err(reason.into()) }
}

#[derive(Debug, Clone)]
pub struct FieldRule {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn validate(&self, document: &Document) -> Option<SchemaViolation> {
        match document.get(&self.name) {
            None | Some(JsonValue::Null) if self.required => {
                Some(SchemaViolation::new(&self.name, "is required"))
            }
            None | Some(JsonValue::Null) => None,
            Some(value) => self
                .kind
                .check(value)
                .err()
                .map(|reason| SchemaViolation::new(&self.name, reason)),
        }
    }
}

/// Field rules of one collection. Fields without a rule are accepted as-is.
#[derive(Debug, Clone, Default)]
pub struct CollectionSchema {
    fields: Vec<FieldRule>,
}

impl CollectionSchema {
    pub fn new(fields: Vec<FieldRule>) -> Self {
        Self { fields }
    }

    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    /// Every violated rule, in declaration order.
    pub fn validate(&self, document: &Document) -> Vec<SchemaViolation> {
        self.fields
            .iter()
            .filter_map(|rule| rule.validate(document))
            .collect()
    }
}
