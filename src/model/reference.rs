use crate::core::EntityId;
use serde::{Deserialize, Serialize};

/// Anything carrying its own store identifier.
pub trait Identified {
    fn id(&self) -> EntityId;
}

/// A relation value: either the related entity itself or its identifier.
///
/// Reads yield `ByValue` for populated paths and `ById` otherwise; callers
/// may hand either form to a writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference<T> {
    ById(EntityId),
    ByValue(T),
}

impl<T: Identified> Reference<T> {
    /// Identifier named by the reference. Not verified against the store.
    pub fn id(&self) -> EntityId {
        match self {
            Reference::ById(id) => *id,
            Reference::ByValue(entity) => entity.id(),
        }
    }
}

impl<T> Reference<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Reference::ByValue(entity) => Some(entity),
            Reference::ById(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            Reference::ByValue(entity) => Some(entity),
            Reference::ById(_) => None,
        }
    }

    pub fn is_hydrated(&self) -> bool {
        matches!(self, Reference::ByValue(_))
    }
}

impl<T> From<EntityId> for Reference<T> {
    fn from(id: EntityId) -> Self {
        Reference::ById(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::User;
    use serde_json::json;

    #[test]
    fn test_reads_identifier_or_object() {
        let id = EntityId::new();

        let by_id: Reference<User> = serde_json::from_value(json!(id.to_string())).unwrap();
        assert_eq!(by_id, Reference::ById(id));

        let by_value: Reference<User> =
            serde_json::from_value(json!({"_id": id.to_string(), "name": "Ada"})).unwrap();
        assert!(by_value.is_hydrated());
        assert_eq!(by_value.id(), id);
        assert_eq!(by_value.as_value().map(|user| user.name.as_str()), Some("Ada"));
    }

    #[test]
    fn test_rejects_other_shapes() {
        assert!(serde_json::from_value::<Reference<User>>(json!(42)).is_err());
        assert!(serde_json::from_value::<Reference<User>>(json!("not-an-id")).is_err());
    }
}
