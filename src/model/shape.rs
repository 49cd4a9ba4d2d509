//! Structural rule for project-type shape descriptors.
//!
//! A shape maps field names to descriptors. A descriptor is either a bare
//! type name (`"string"`) or an object:
//!
//! ```json
//! {
//!   "title":    "string",
//!   "due":      { "type": "date", "required": true },
//!   "assets":   { "type": "array", "items": "file" },
//!   "settings": { "type": "object", "fields": { "public": "boolean" } }
//! }
//! ```

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value as JsonValue};
use std::fmt;

pub const SHAPE_TYPES: [&str; 7] = ["string", "number", "boolean", "date", "object", "array", "file"];

const DESCRIPTOR_KEYS: [&str; 4] = ["type", "required", "fields", "items"];

lazy_static! {
    static ref FIELD_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// First rule a shape breaks, located by a dotted path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    pub path: String,
    pub reason: String,
}

impl ShapeError {
    fn new(path: &str, reason: impl Into<String>) -> Self {
        Self {
            path: if path.is_empty() { "$".to_string() } else { path.to_string() },
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for ShapeError {}

pub fn validate_shape(shape: &JsonValue) -> Result<(), ShapeError> {
    let fields = shape
        .as_object()
        .ok_or_else(|| ShapeError::new("", "shape must be an object of field descriptors"))?;
    validate_fields(fields, "")
}

fn validate_fields(fields: &Map<String, JsonValue>, prefix: &str) -> Result<(), ShapeError> {
    for (name, descriptor) in fields {
        let path = join(prefix, name);
        if !FIELD_NAME.is_match(name) {
            return Err(ShapeError::new(&path, "field names must be identifiers"));
        }
        validate_descriptor(descriptor, &path)?;
    }
    Ok(())
}

fn validate_descriptor(descriptor: &JsonValue, path: &str) -> Result<(), ShapeError> {
    match descriptor {
        JsonValue::String(type_name) => check_type(type_name, path).map(|_| ()),
        JsonValue::Object(options) => validate_options(options, path),
        other => Err(ShapeError::new(
            path,
            format!("descriptor must be a type name or an object, got {}", other),
        )),
    }
}

fn validate_options(options: &Map<String, JsonValue>, path: &str) -> Result<(), ShapeError> {
    if let Some(unknown) = options
        .keys()
        .find(|key| !DESCRIPTOR_KEYS.contains(&key.as_str()))
    {
        return Err(ShapeError::new(path, format!("unknown descriptor key '{}'", unknown)));
    }

    let type_name = options
        .get("type")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| ShapeError::new(path, "descriptor needs a string 'type'"))?;
    let type_name = check_type(type_name, path)?;

    if options.get("required").is_some_and(|flag| !flag.is_boolean()) {
        return Err(ShapeError::new(path, "'required' must be a boolean"));
    }

    match (options.get("fields"), type_name) {
        (Some(JsonValue::Object(nested)), "object") => validate_fields(nested, path)?,
        (Some(_), "object") => {
            return Err(ShapeError::new(path, "'fields' must be an object"));
        }
        (Some(_), _) => {
            return Err(ShapeError::new(path, "'fields' is only allowed on object types"));
        }
        (None, _) => {}
    }

    match (options.get("items"), type_name) {
        (Some(items), "array") => validate_descriptor(items, &format!("{}[]", path))?,
        (Some(_), _) => {
            return Err(ShapeError::new(path, "'items' is only allowed on array types"));
        }
        (None, _) => {}
    }

    Ok(())
}

fn check_type<'a>(type_name: &'a str, path: &str) -> Result<&'a str, ShapeError> {
    if SHAPE_TYPES.contains(&type_name) {
        Ok(type_name)
    } else {
        Err(ShapeError::new(
            path,
            format!("unknown type '{}' (expected one of {})", type_name, SHAPE_TYPES.join(", ")),
        ))
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_nested_shape() {
        let shape = json!({
            "title": "string",
            "due": {"type": "date", "required": true},
            "assets": {"type": "array", "items": {"type": "file"}},
            "settings": {"type": "object", "fields": {"public": "boolean"}}
        });
        assert_eq!(validate_shape(&shape), Ok(()));
        assert_eq!(validate_shape(&json!({})), Ok(()));
    }

    #[test]
    fn test_rejects_non_object_shape() {
        let err = validate_shape(&json!(["title"])).unwrap_err();
        assert_eq!(err.path, "$");
    }

    #[test]
    fn test_reports_nested_path() {
        let shape = json!({
            "settings": {"type": "object", "fields": {"color": {"type": "colour"}}}
        });
        let err = validate_shape(&shape).unwrap_err();
        assert_eq!(err.path, "settings.color");
        assert!(err.reason.contains("unknown type 'colour'"));
    }

    #[test]
    fn test_rejects_misplaced_options() {
        let items_on_string = json!({"title": {"type": "string", "items": "file"}});
        assert!(validate_shape(&items_on_string).is_err());

        let unknown_key = json!({"title": {"type": "string", "max": 3}});
        let err = validate_shape(&unknown_key).unwrap_err();
        assert!(err.reason.contains("'max'"));

        for key in ["default", "label"] {
            let mut descriptor = json!({"type": "string"});
            descriptor[key] = json!("x");
            let err = validate_shape(&json!({ "title": descriptor })).unwrap_err();
            assert_eq!(err.path, "title");
            assert!(err.reason.contains(key));
        }

        let bad_name = json!({"due date": "date"});
        assert_eq!(validate_shape(&bad_name).unwrap_err().path, "due date");
    }

    #[test]
    fn test_array_items_path() {
        let shape = json!({"tags": {"type": "array", "items": 5}});
        assert_eq!(validate_shape(&shape).unwrap_err().path, "tags[]");
    }
}
