use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A stored JSON document: one object with string keys.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";
/// Alias some callers send for the identifier.
pub const ID_ALIAS_FIELD: &str = "id";
pub const CREATED_AT_FIELD: &str = "createdAt";
pub const UPDATED_AT_FIELD: &str = "updatedAt";
pub const DELETED_AT_FIELD: &str = "deletedAt";

/// Store-assigned identifier of a document.
///
/// Serialized as the hyphenated UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Reads an identifier out of a JSON value, accepting only strings.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        value.as_str().and_then(|raw| raw.parse().ok())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::String(self.to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Storage collections known to the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Users,
    Workspaces,
    States,
    Organizations,
    Projects,
    ProjectTypes,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Users,
        Collection::Workspaces,
        Collection::States,
        Collection::Organizations,
        Collection::Projects,
        Collection::ProjectTypes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Workspaces => "workspaces",
            Self::States => "states",
            Self::Organizations => "organizations",
            Self::Projects => "projects",
            Self::ProjectTypes => "projectTypes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|collection| collection.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown collection '{}'", s))
    }
}

/// Current wall-clock time used for `createdAt` / `updatedAt` stamps.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Timestamp as stored in documents (RFC 3339 with nanoseconds).
pub fn timestamp_json(at: DateTime<Utc>) -> serde_json::Value {
    serde_json::Value::String(at.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_json_round_trip() {
        let id = EntityId::new();
        assert_eq!(EntityId::from_json(&id.to_json()), Some(id));
        assert_eq!(EntityId::from_json(&serde_json::json!("not-an-id")), None);
        assert_eq!(EntityId::from_json(&serde_json::json!(42)), None);
    }

    #[test]
    fn test_collection_parse() {
        assert_eq!("projectTypes".parse::<Collection>(), Ok(Collection::ProjectTypes));
        assert_eq!("USERS".parse::<Collection>(), Ok(Collection::Users));
        assert!("teams".parse::<Collection>().is_err());
    }
}
