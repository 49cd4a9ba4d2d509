use super::collaborators::User;
use super::project::Project;
use super::reference::{Identified, Reference};
use super::{Aggregate, DeletionMode, related};
use crate::core::{Collection, EntityId};
use crate::storage::{CollectionSchema, FieldKind, FieldRule, Populate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An organization as read back from the store.
///
/// `owner` is `None` when the referenced user no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<Reference<User>>,
    #[serde(default)]
    pub members: Vec<Reference<User>>,
    #[serde(default)]
    pub projects: Vec<Reference<Project>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for Organization {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Aggregate for Organization {
    const ENTITY: &'static str = "Organization";
    const COLLECTION: Collection = Collection::Organizations;
    const DELETION: DeletionMode = DeletionMode::Physical;
    const POPULATE: &'static [Populate] = &[
        related::<User>("owner"),
        related::<User>("members"),
        related::<Project>("projects"),
    ];
}

/// Input of `OrganizationWriter::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Reference<User>,
    #[serde(default)]
    pub members: Vec<Reference<User>>,
    #[serde(default)]
    pub projects: Vec<Reference<Project>>,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>, owner: impl Into<Reference<User>>) -> Self {
        Self {
            name: name.into(),
            description: None,
            owner: owner.into(),
            members: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn members(mut self, members: Vec<Reference<User>>) -> Self {
        self.members = members;
        self
    }

    pub fn projects(mut self, projects: Vec<Reference<Project>>) -> Self {
        self.projects = projects;
        self
    }
}

pub(crate) fn schema() -> CollectionSchema {
    CollectionSchema::default()
        .field(FieldRule::new("name", FieldKind::String).required())
        .field(FieldRule::new("description", FieldKind::String))
        .field(FieldRule::new("owner", FieldKind::Reference).required())
        .field(FieldRule::new("members", FieldKind::ReferenceList))
        .field(FieldRule::new("projects", FieldKind::ReferenceList))
        .field(FieldRule::new("createdAt", FieldKind::Timestamp).required())
        .field(FieldRule::new("updatedAt", FieldKind::Timestamp).required())
}
