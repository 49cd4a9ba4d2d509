#![allow(dead_code)]

use docintegrity::{
    Collection, Document, EntityId, IntegrityConfig, IntegrityLayer, MemoryDocumentStore,
    NewOrganization, NewProject, NewProjectType, Organization, Project, ProjectType, Result,
    memory_store,
};
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

pub fn doc(value: JsonValue) -> Document {
    value.as_object().cloned().expect("fixture must be an object")
}

/// A layer over a fresh in-memory store, plus direct access to the store
/// for seeding collaborators and inspecting raw documents.
pub struct Harness {
    pub layer: IntegrityLayer,
    pub store: Arc<MemoryDocumentStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(IntegrityConfig::default())
    }

    pub fn with_config(config: IntegrityConfig) -> Self {
        let store = memory_store(&config);
        Self {
            layer: IntegrityLayer::new(store.clone(), config),
            store,
        }
    }

    pub async fn seed(&self, collection: Collection, names: &[&str]) -> Vec<EntityId> {
        let documents = names.iter().map(|name| doc(json!({ "name": name }))).collect();
        self.store
            .import(collection, documents)
            .await
            .expect("seeding collaborators")
    }

    pub async fn users(&self, names: &[&str]) -> Vec<EntityId> {
        self.seed(Collection::Users, names).await
    }

    pub async fn organization(&self, owner: EntityId) -> Result<Organization> {
        self.layer
            .organizations()
            .create(NewOrganization::new("Acme", owner))
            .await
    }

    pub async fn project_type(&self) -> Result<ProjectType> {
        self.layer
            .project_types()
            .create(NewProjectType::new(
                "Report",
                json!({ "title": "string", "due": { "type": "date", "required": true } }),
            ))
            .await
    }

    /// A project with every required relation in place.
    pub async fn project(&self, name: &str) -> Result<ProjectFixture> {
        let owner = self.users(&["owner"]).await[0];
        let organization = self.organization(owner).await?;
        let project_type = self.project_type().await?;
        let project = self
            .layer
            .projects()
            .create(NewProject::new(name, organization.id, project_type.id, owner))
            .await?;

        Ok(ProjectFixture {
            owner,
            organization,
            project_type,
            project,
        })
    }

    pub async fn raw(&self, collection: Collection, id: EntityId) -> Option<Document> {
        self.store.raw(collection, id).await
    }
}

pub struct ProjectFixture {
    pub owner: EntityId,
    pub organization: Organization,
    pub project_type: ProjectType,
    pub project: Project,
}

/// True when `key` appears anywhere in `value`.
pub fn contains_key(value: &JsonValue, key: &str) -> bool {
    match value {
        JsonValue::Object(map) => {
            map.contains_key(key) || map.values().any(|nested| contains_key(nested, key))
        }
        JsonValue::Array(items) => items.iter().any(|item| contains_key(item, key)),
        _ => false,
    }
}
