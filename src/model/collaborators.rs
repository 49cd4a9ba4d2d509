//! Entities owned by other parts of the system. The layer only reads them
//! and checks their existence.

use super::reference::Identified;
use super::{Aggregate, DeletionMode};
use crate::core::{Collection, EntityId};
use crate::storage::{CollectionSchema, FieldKind, FieldRule, Populate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
}

/// Workflow state a project can be in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct State {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
}

impl Identified for User {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Identified for Workspace {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Identified for State {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Aggregate for User {
    const ENTITY: &'static str = "User";
    const COLLECTION: Collection = Collection::Users;
    const DELETION: DeletionMode = DeletionMode::Physical;
    const POPULATE: &'static [Populate] = &[];
}

impl Aggregate for Workspace {
    const ENTITY: &'static str = "Workspace";
    const COLLECTION: Collection = Collection::Workspaces;
    const DELETION: DeletionMode = DeletionMode::Physical;
    const POPULATE: &'static [Populate] = &[];
}

impl Aggregate for State {
    const ENTITY: &'static str = "State";
    const COLLECTION: Collection = Collection::States;
    const DELETION: DeletionMode = DeletionMode::Physical;
    const POPULATE: &'static [Populate] = &[];
}

pub(crate) fn schemas() -> Vec<(Collection, CollectionSchema)> {
    let named = || CollectionSchema::default().field(FieldRule::new("name", FieldKind::String).required());
    vec![
        (
            Collection::Users,
            named().field(FieldRule::new("email", FieldKind::String)),
        ),
        (Collection::Workspaces, named()),
        (Collection::States, named()),
    ]
}
