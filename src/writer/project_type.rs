use super::{WriterCore, id_values, ids_json};
use crate::config::IntegrityConfig;
use crate::core::{Document, EntityId, Result};
use crate::integrity::{
    ExistenceCheck, Page, PagedReader, Patch, ReferenceResolver, RelationForm, UpdateGuard,
};
use crate::model::{NewProjectType, Project, ProjectType, Reference};
use crate::storage::{DocumentStore, Filter, UpdateSpec};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Instrument, info_span};

#[derive(Clone)]
pub struct ProjectTypeDeps {
    pub projects: Arc<dyn ExistenceCheck>,
}

pub struct ProjectTypeWriter {
    core: WriterCore<ProjectType>,
    projects: ReferenceResolver,
    guard: UpdateGuard,
}

impl ProjectTypeWriter {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig, deps: ProjectTypeDeps) -> Self {
        let guard = UpdateGuard::new("ProjectType", RelationForm::IdOnly)
            .plural("projects", "add_projects/remove_projects")
            .shape("shape");

        Self {
            core: WriterCore::new(store, config),
            projects: ReferenceResolver::new("Projects", deps.projects),
            guard,
        }
    }

    pub fn reader(&self) -> &PagedReader<ProjectType> {
        self.core.reader()
    }

    /// The shape is checked as part of structural validation.
    pub async fn create(&self, input: NewProjectType) -> Result<ProjectType> {
        let span = info_span!("project_type.create", name = %input.name);
        async move {
            let projects = self.projects.resolve_many(&input.projects).await?;

            let mut document = Document::new();
            document.insert("name".to_string(), JsonValue::String(input.name));
            document.insert("shape".to_string(), input.shape);
            document.insert("projects".to_string(), ids_json(&projects));

            self.core.insert(document).await
        }
        .instrument(span)
        .await
    }

    pub async fn get_by_id(&self, id: EntityId) -> Result<ProjectType> {
        self.core.reader().get_by_id(id).await
    }

    pub async fn query(
        &self,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<ProjectType>> {
        self.core.reader().query(filter, page, page_size).await
    }

    pub async fn update_by_id(&self, id: EntityId, patch: Patch) -> Result<ProjectType> {
        let span = info_span!("project_type.update", id = %id);
        self.core
            .update(&self.guard, &Filter::by_id(id), patch)
            .instrument(span)
            .await
    }

    pub async fn update_one(&self, filter: &Filter, patch: Patch) -> Result<ProjectType> {
        let span = info_span!("project_type.update", filter = %filter);
        self.core
            .update(&self.guard, filter, patch)
            .instrument(span)
            .await
    }

    pub async fn delete_by_id(&self, id: EntityId) -> Result<()> {
        let span = info_span!("project_type.delete", id = %id);
        self.core.delete(id).instrument(span).await
    }

    pub async fn add_projects(
        &self,
        id: EntityId,
        projects: &[Reference<Project>],
    ) -> Result<ProjectType> {
        let span = info_span!("project_type.add_projects", id = %id, count = projects.len());
        async move {
            let projects = self.projects.resolve_many(projects).await?;
            let update = UpdateSpec::default().add_to_set("projects", id_values(&projects));
            self.core.apply(&Filter::by_id(id), update).await
        }
        .instrument(span)
        .await
    }

    pub async fn remove_projects(&self, id: EntityId, projects: &[EntityId]) -> Result<ProjectType> {
        let span = info_span!("project_type.remove_projects", id = %id, count = projects.len());
        let update = UpdateSpec::default().pull("projects", id_values(projects));
        self.core
            .apply(&Filter::by_id(id), update)
            .instrument(span)
            .await
    }

    pub async fn all_project_type_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.core.all_ids_exist(ids).await
    }
}
