use super::project::Project;
use super::reference::{Identified, Reference};
use super::shape::validate_shape;
use super::{Aggregate, DeletionMode, related};
use crate::core::{Collection, EntityId};
use crate::storage::{CollectionSchema, FieldKind, FieldRule, Populate};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A project type; `shape` describes the fields its projects carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectType {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub shape: JsonValue,
    #[serde(default)]
    pub projects: Vec<Reference<Project>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identified for ProjectType {
    fn id(&self) -> EntityId {
        self.id
    }
}

impl Aggregate for ProjectType {
    const ENTITY: &'static str = "ProjectType";
    const COLLECTION: Collection = Collection::ProjectTypes;
    const DELETION: DeletionMode = DeletionMode::Physical;
    const POPULATE: &'static [Populate] = &[related::<Project>("projects")];
}

/// Input of `ProjectTypeWriter::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProjectType {
    pub name: String,
    pub shape: JsonValue,
    #[serde(default)]
    pub projects: Vec<Reference<Project>>,
}

impl NewProjectType {
    pub fn new(name: impl Into<String>, shape: JsonValue) -> Self {
        Self {
            name: name.into(),
            shape,
            projects: Vec::new(),
        }
    }

    pub fn projects(mut self, projects: Vec<Reference<Project>>) -> Self {
        self.projects = projects;
        self
    }
}

pub(crate) fn schema() -> CollectionSchema {
    CollectionSchema::default()
        .field(FieldRule::new("name", FieldKind::String).required())
        .field(
            FieldRule::new(
                "shape",
                FieldKind::custom(|value| validate_shape(value).map_err(|err| err.to_string())),
            )
            .required(),
        )
        .field(FieldRule::new("projects", FieldKind::ReferenceList))
        .field(FieldRule::new("createdAt", FieldKind::Timestamp).required())
        .field(FieldRule::new("updatedAt", FieldKind::Timestamp).required())
}
