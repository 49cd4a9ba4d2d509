use super::WriterCore;
use crate::config::IntegrityConfig;
use crate::core::{Document, EntityId, IntegrityError, Result};
use crate::integrity::{
    ExistenceCheck, Page, PagedReader, Patch, ReferenceResolver, RelationForm, UpdateGuard,
};
use crate::model::{NewProject, Project, Reference, State, slugify};
use crate::storage::{DocumentStore, Filter};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Instrument, info_span};

/// Existence checks a [`ProjectWriter`] depends on.
#[derive(Clone)]
pub struct ProjectDeps {
    pub organizations: Arc<dyn ExistenceCheck>,
    pub project_types: Arc<dyn ExistenceCheck>,
    pub users: Arc<dyn ExistenceCheck>,
    pub states: Arc<dyn ExistenceCheck>,
    pub workspaces: Arc<dyn ExistenceCheck>,
}

/// Writer for projects. Deleting a project only stamps `deletedAt`.
pub struct ProjectWriter {
    core: WriterCore<Project>,
    organization: ReferenceResolver,
    project_type: ReferenceResolver,
    owner: ReferenceResolver,
    state: ReferenceResolver,
    workspace: ReferenceResolver,
    guard: UpdateGuard,
}

impl ProjectWriter {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig, deps: ProjectDeps) -> Self {
        let guard = UpdateGuard::new("Project", RelationForm::IdOrObject)
            .singular("organization", "Organization", true, deps.organizations.clone())
            .singular("type", "Type", true, deps.project_types.clone())
            .singular("owner", "Owner", true, deps.users.clone())
            .singular("state", "State", false, deps.states.clone())
            .singular("workspace", "Workspace", false, deps.workspaces.clone());

        Self {
            core: WriterCore::new(store, config),
            organization: ReferenceResolver::new("Organization", deps.organizations),
            project_type: ReferenceResolver::new("Type", deps.project_types),
            owner: ReferenceResolver::new("Owner", deps.users),
            state: ReferenceResolver::new("State", deps.states),
            workspace: ReferenceResolver::new("Workspace", deps.workspaces),
            guard,
        }
    }

    pub fn reader(&self) -> &PagedReader<Project> {
        self.core.reader()
    }

    pub async fn create(&self, input: NewProject) -> Result<Project> {
        let span = info_span!("project.create", name = %input.name);
        async move {
            let (organization, project_type, owner, state, workspace) = tokio::join!(
                self.organization.resolve(&input.organization),
                self.project_type.resolve(&input.project_type),
                self.owner.resolve(&input.owner),
                self.state.resolve_optional(input.state.as_ref()),
                self.workspace.resolve_optional(input.workspace.as_ref()),
            );
            let organization = organization?;
            let project_type = project_type?;
            let owner = owner?;
            let state = state?;
            let workspace = workspace?;

            let files = serde_json::to_value(&input.files).map_err(|err| {
                IntegrityError::data_validation("Project", Some("files".to_string()), err)
            })?;
            let slug = input.slug.unwrap_or_else(|| slugify(&input.name));

            let mut document = Document::new();
            document.insert("name".to_string(), JsonValue::String(input.name));
            if let Some(description) = input.description {
                document.insert("description".to_string(), JsonValue::String(description));
            }
            document.insert("organization".to_string(), organization.to_json());
            document.insert("type".to_string(), project_type.to_json());
            document.insert("owner".to_string(), owner.to_json());
            if let Some(state) = state {
                document.insert("state".to_string(), state.to_json());
            }
            if let Some(workspace) = workspace {
                document.insert("workspace".to_string(), workspace.to_json());
            }
            document.insert("files".to_string(), files);
            document.insert("slug".to_string(), JsonValue::String(slug));
            document.insert("isTemplate".to_string(), JsonValue::Bool(input.is_template));
            if let Some(path) = input.path {
                document.insert("path".to_string(), JsonValue::String(path));
            }
            if let Some(view) = input.view {
                document.insert("view".to_string(), JsonValue::String(view));
            }

            self.core.insert(document).await
        }
        .instrument(span)
        .await
    }

    pub async fn get_by_id(&self, id: EntityId) -> Result<Project> {
        self.core.reader().get_by_id(id).await
    }

    pub async fn query(
        &self,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Project>> {
        self.core.reader().query(filter, page, page_size).await
    }

    /// Relations may be given as identifiers or as hydrated objects.
    pub async fn update_by_id(&self, id: EntityId, patch: Patch) -> Result<Project> {
        let span = info_span!("project.update", id = %id);
        self.core
            .update(&self.guard, &Filter::by_id(id), patch)
            .instrument(span)
            .await
    }

    pub async fn update_one(&self, filter: &Filter, patch: Patch) -> Result<Project> {
        let span = info_span!("project.update", filter = %filter);
        self.core
            .update(&self.guard, filter, patch)
            .instrument(span)
            .await
    }

    /// Moves the project to `state`, or clears it with `None`.
    pub async fn set_state(&self, id: EntityId, state: Option<Reference<State>>) -> Result<Project> {
        let value = match state {
            Some(state) => state.id().to_json(),
            None => JsonValue::Null,
        };
        self.update_by_id(id, Patch::new().set("state", value)).await
    }

    pub async fn delete_by_id(&self, id: EntityId) -> Result<()> {
        let span = info_span!("project.delete", id = %id);
        self.core.delete(id).instrument(span).await
    }

    pub async fn all_project_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.core.all_ids_exist(ids).await
    }
}
