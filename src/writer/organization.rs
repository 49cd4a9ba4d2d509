use super::{WriterCore, id_values, ids_json};
use crate::config::IntegrityConfig;
use crate::core::{Document, EntityId, Result};
use crate::integrity::{
    ExistenceCheck, Page, PagedReader, Patch, ReferenceResolver, RelationForm, UpdateGuard,
};
use crate::model::{NewOrganization, Organization, Project, Reference, User};
use crate::storage::{DocumentStore, Filter, UpdateSpec};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Instrument, info_span};

/// Existence checks an [`OrganizationWriter`] depends on.
#[derive(Clone)]
pub struct OrganizationDeps {
    pub users: Arc<dyn ExistenceCheck>,
    pub projects: Arc<dyn ExistenceCheck>,
}

pub struct OrganizationWriter {
    core: WriterCore<Organization>,
    owner: ReferenceResolver,
    members: ReferenceResolver,
    projects: ReferenceResolver,
    guard: UpdateGuard,
}

impl OrganizationWriter {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig, deps: OrganizationDeps) -> Self {
        // The update path takes the owner as a bare identifier only.
        let guard = UpdateGuard::new("Organization", RelationForm::IdOnly)
            .singular("owner", "Owner", true, deps.users.clone())
            .plural("members", "add_members/remove_members")
            .plural("projects", "add_projects/remove_projects");

        Self {
            core: WriterCore::new(store, config),
            owner: ReferenceResolver::new("Owner", deps.users.clone()),
            members: ReferenceResolver::new("Members", deps.users),
            projects: ReferenceResolver::new("Projects", deps.projects),
            guard,
        }
    }

    pub fn reader(&self) -> &PagedReader<Organization> {
        self.core.reader()
    }

    pub async fn create(&self, input: NewOrganization) -> Result<Organization> {
        let span = info_span!("organization.create", name = %input.name);
        async move {
            let (owner, members, projects) = tokio::join!(
                self.owner.resolve(&input.owner),
                self.members.resolve_many(&input.members),
                self.projects.resolve_many(&input.projects),
            );
            let owner = owner?;
            let members = members?;
            let projects = projects?;

            let mut document = Document::new();
            document.insert("name".to_string(), JsonValue::String(input.name));
            if let Some(description) = input.description {
                document.insert("description".to_string(), JsonValue::String(description));
            }
            document.insert("owner".to_string(), owner.to_json());
            document.insert("members".to_string(), ids_json(&members));
            document.insert("projects".to_string(), ids_json(&projects));

            self.core.insert(document).await
        }
        .instrument(span)
        .await
    }

    pub async fn get_by_id(&self, id: EntityId) -> Result<Organization> {
        self.core.reader().get_by_id(id).await
    }

    pub async fn query(
        &self,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Organization>> {
        self.core.reader().query(filter, page, page_size).await
    }

    pub async fn update_by_id(&self, id: EntityId, patch: Patch) -> Result<Organization> {
        let span = info_span!("organization.update", id = %id);
        self.core
            .update(&self.guard, &Filter::by_id(id), patch)
            .instrument(span)
            .await
    }

    /// Updates the single organization matching `filter`.
    pub async fn update_one(&self, filter: &Filter, patch: Patch) -> Result<Organization> {
        let span = info_span!("organization.update", filter = %filter);
        self.core
            .update(&self.guard, filter, patch)
            .instrument(span)
            .await
    }

    /// Removes the document. References held by projects are left dangling.
    pub async fn delete_by_id(&self, id: EntityId) -> Result<()> {
        let span = info_span!("organization.delete", id = %id);
        self.core.delete(id).instrument(span).await
    }

    /// Adds users to `members`; every user must exist.
    pub async fn add_members(&self, id: EntityId, users: &[Reference<User>]) -> Result<Organization> {
        let span = info_span!("organization.add_members", id = %id, count = users.len());
        async move {
            let members = self.members.resolve_many(users).await?;
            let update = UpdateSpec::default().add_to_set("members", id_values(&members));
            self.core.apply(&Filter::by_id(id), update).await
        }
        .instrument(span)
        .await
    }

    pub async fn remove_members(&self, id: EntityId, users: &[EntityId]) -> Result<Organization> {
        let span = info_span!("organization.remove_members", id = %id, count = users.len());
        let update = UpdateSpec::default().pull("members", id_values(users));
        self.core
            .apply(&Filter::by_id(id), update)
            .instrument(span)
            .await
    }

    pub async fn add_projects(
        &self,
        id: EntityId,
        projects: &[Reference<Project>],
    ) -> Result<Organization> {
        let span = info_span!("organization.add_projects", id = %id, count = projects.len());
        async move {
            let projects = self.projects.resolve_many(projects).await?;
            let update = UpdateSpec::default().add_to_set("projects", id_values(&projects));
            self.core.apply(&Filter::by_id(id), update).await
        }
        .instrument(span)
        .await
    }

    pub async fn remove_projects(&self, id: EntityId, projects: &[EntityId]) -> Result<Organization> {
        let span = info_span!("organization.remove_projects", id = %id, count = projects.len());
        let update = UpdateSpec::default().pull("projects", id_values(projects));
        self.core
            .apply(&Filter::by_id(id), update)
            .instrument(span)
            .await
    }

    pub async fn all_organization_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.core.all_ids_exist(ids).await
    }
}

