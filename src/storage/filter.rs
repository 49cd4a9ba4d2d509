//! Document filters
//!
//! A small, store-agnostic predicate language: a conjunction of field
//! conditions. Stores translate it to their native query form; the
//! in-memory store evaluates it directly with [`Filter::matches`].

use crate::core::{Document, EntityId, ID_FIELD};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

const AND_OPERATOR: &str = "$and";

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Field equals the value. A missing field matches `null`.
    Eq { field: String, value: JsonValue },
    /// Field equals one of the values.
    In { field: String, values: Vec<JsonValue> },
    /// Field is present (and not null) or absent.
    Exists { field: String, exists: bool },
}

impl Condition {
    fn matches(&self, document: &Document) -> bool {
        match self {
            Condition::Eq { field, value } => match document.get(field) {
                Some(JsonValue::Array(items)) if !value.is_array() => items.contains(value),
                Some(found) => found == value,
                None => value.is_null(),
            },
            Condition::In { field, values } => match document.get(field) {
                Some(found) => values.contains(found),
                None => values.iter().any(JsonValue::is_null),
            },
            Condition::Exists { field, exists } => {
                let present = document.get(field).is_some_and(|value| !value.is_null());
                present == *exists
            }
        }
    }

    fn field(&self) -> &str {
        match self {
            Condition::Eq { field, .. }
            | Condition::In { field, .. }
            | Condition::Exists { field, .. } => field,
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            Condition::Eq { value, .. } => value.clone(),
            Condition::In { values, .. } => serde_json::json!({ "$in": values }),
            Condition::Exists { exists, .. } => serde_json::json!({ "$exists": exists }),
        }
    }

    fn to_clause(&self) -> JsonValue {
        let mut clause = Map::new();
        clause.insert(self.field().to_string(), self.to_json());
        JsonValue::Object(clause)
    }
}

/// Conjunction of conditions. The empty filter matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: EntityId) -> Self {
        Self::new().eq(ID_FIELD, id.to_json())
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conditions.push(Condition::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<I, V>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<JsonValue>,
    {
        self.conditions.push(Condition::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn exists(mut self, field: impl Into<String>, exists: bool) -> Self {
        self.conditions.push(Condition::Exists {
            field: field.into(),
            exists,
        });
        self
    }

    /// Appends every condition of `other`.
    pub fn and(mut self, other: &Filter) -> Self {
        self.conditions.extend(other.conditions.iter().cloned());
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| condition.matches(document))
    }

    /// Parses the JSON filter form accepted by callers:
    /// `{"field": value}`, `{"field": {"$in": [...]}}`,
    /// `{"field": {"$exists": bool}}`, and `{"$and": [filter, ...]}`.
    pub fn from_json(value: &JsonValue) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("filter must be a JSON object, got {}", value))?;

        let mut filter = Filter::new();
        for (field, condition) in object {
            if field == AND_OPERATOR {
                let clauses = condition
                    .as_array()
                    .ok_or_else(|| format!("'{}' expects an array of filters", AND_OPERATOR))?;
                for clause in clauses {
                    filter = filter.and(&Filter::from_json(clause)?);
                }
                continue;
            }
            if field.is_empty() || field.starts_with('$') {
                return Err(format!("invalid filter field '{}'", field));
            }

            filter = match condition {
                JsonValue::Object(operator) if is_operator(operator) => {
                    parse_operator(filter, field, operator)?
                }
                other => filter.eq(field.clone(), other.clone()),
            };
        }
        Ok(filter)
    }

    /// JSON form of the filter. Falls back to an `$and` list when a field
    /// carries more than one condition.
    pub fn to_json(&self) -> JsonValue {
        let mut out = Map::new();
        for condition in &self.conditions {
            if out
                .insert(condition.field().to_string(), condition.to_json())
                .is_some()
            {
                let clauses = self.conditions.iter().map(Condition::to_clause).collect();
                return serde_json::json!({ AND_OPERATOR: JsonValue::Array(clauses) });
            }
        }
        JsonValue::Object(out)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

fn is_operator(object: &Map<String, JsonValue>) -> bool {
    object.keys().any(|key| key.starts_with('$'))
}

fn parse_operator(
    filter: Filter,
    field: &str,
    operator: &Map<String, JsonValue>,
) -> Result<Filter, String> {
    if operator.len() != 1 {
        return Err(format!(
            "field '{}' must use exactly one operator, got {}",
            field,
            operator.len()
        ));
    }

    let (name, argument) = operator
        .iter()
        .next()
        .ok_or_else(|| format!("field '{}' has an empty operator", field))?;

    match name.as_str() {
        "$in" => {
            let values = argument
                .as_array()
                .ok_or_else(|| format!("'$in' on '{}' expects an array", field))?;
            Ok(filter.is_in(field, values.iter().cloned()))
        }
        "$exists" => {
            let exists = argument
                .as_bool()
                .ok_or_else(|| format!("'$exists' on '{}' expects a boolean", field))?;
            Ok(filter.exists(field, exists))
        }
        other => Err(format!("unsupported operator '{}' on '{}'", other, field)),
    }
}
