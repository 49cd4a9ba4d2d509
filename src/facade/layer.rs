use crate::config::IntegrityConfig;
use crate::core::{Collection, Document, EntityId, Result};
use crate::integrity::{ExistenceCheck, Page, PagedReader};
use crate::model::{self, Organization, Project, ProjectType, State, User, Workspace};
use crate::storage::{DocumentStore, Filter, MemoryDocumentStore};
use crate::writer::{
    OrganizationDeps, OrganizationWriter, ProjectDeps, ProjectTypeDeps, ProjectTypeWriter,
    ProjectWriter, existence_of,
};
use std::sync::Arc;

/// The integrity layer over one document store.
///
/// Builds every writer with the existence checks it needs and exposes
/// collection-level reads for callers that only know a collection name.
pub struct IntegrityLayer {
    store: Arc<dyn DocumentStore>,
    config: IntegrityConfig,
    users: Arc<dyn ExistenceCheck>,
    workspaces: Arc<dyn ExistenceCheck>,
    states: Arc<dyn ExistenceCheck>,
    user_reader: PagedReader<User>,
    workspace_reader: PagedReader<Workspace>,
    state_reader: PagedReader<State>,
    organizations: OrganizationWriter,
    projects: ProjectWriter,
    project_types: ProjectTypeWriter,
}

impl IntegrityLayer {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig) -> Self {
        let users = existence_of::<User>(&store);
        let workspaces = existence_of::<Workspace>(&store);
        let states = existence_of::<State>(&store);
        let organization_check = existence_of::<Organization>(&store);
        let project_check = existence_of::<Project>(&store);
        let project_type_check = existence_of::<ProjectType>(&store);

        let organizations = OrganizationWriter::new(
            store.clone(),
            config.clone(),
            OrganizationDeps {
                users: users.clone(),
                projects: project_check.clone(),
            },
        );
        let projects = ProjectWriter::new(
            store.clone(),
            config.clone(),
            ProjectDeps {
                organizations: organization_check,
                project_types: project_type_check,
                users: users.clone(),
                states: states.clone(),
                workspaces: workspaces.clone(),
            },
        );
        let project_types = ProjectTypeWriter::new(
            store.clone(),
            config.clone(),
            ProjectTypeDeps {
                projects: project_check,
            },
        );

        Self {
            user_reader: PagedReader::new(store.clone(), config.clone()),
            workspace_reader: PagedReader::new(store.clone(), config.clone()),
            state_reader: PagedReader::new(store.clone(), config.clone()),
            store,
            config,
            users,
            workspaces,
            states,
            organizations,
            projects,
            project_types,
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &IntegrityConfig {
        &self.config
    }

    pub fn organizations(&self) -> &OrganizationWriter {
        &self.organizations
    }

    pub fn projects(&self) -> &ProjectWriter {
        &self.projects
    }

    pub fn project_types(&self) -> &ProjectTypeWriter {
        &self.project_types
    }

    pub async fn all_user_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.users.all_exist(ids).await
    }

    pub async fn all_workspace_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.workspaces.all_exist(ids).await
    }

    pub async fn all_state_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.states.all_exist(ids).await
    }

    pub async fn all_organization_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.organizations.all_organization_ids_exist(ids).await
    }

    pub async fn all_project_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.projects.all_project_ids_exist(ids).await
    }

    pub async fn all_project_type_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.project_types.all_project_type_ids_exist(ids).await
    }

    /// Bulk existence check against any collection.
    pub async fn all_ids_exist(&self, collection: Collection, ids: &[EntityId]) -> Result<()> {
        match collection {
            Collection::Users => self.all_user_ids_exist(ids).await,
            Collection::Workspaces => self.all_workspace_ids_exist(ids).await,
            Collection::States => self.all_state_ids_exist(ids).await,
            Collection::Organizations => self.all_organization_ids_exist(ids).await,
            Collection::Projects => self.all_project_ids_exist(ids).await,
            Collection::ProjectTypes => self.all_project_type_ids_exist(ids).await,
        }
    }

    /// Hydrated document of any collection, in the same read shape the
    /// typed readers decode.
    pub async fn get_document(&self, collection: Collection, id: EntityId) -> Result<Document> {
        match collection {
            Collection::Users => self.user_reader.get_document(id).await,
            Collection::Workspaces => self.workspace_reader.get_document(id).await,
            Collection::States => self.state_reader.get_document(id).await,
            Collection::Organizations => self.organizations.reader().get_document(id).await,
            Collection::Projects => self.projects.reader().get_document(id).await,
            Collection::ProjectTypes => self.project_types.reader().get_document(id).await,
        }
    }

    pub async fn query_documents(
        &self,
        collection: Collection,
        filter: &Filter,
        page: Option<u32>,
        page_size: Option<u32>,
    ) -> Result<Page<Document>> {
        match collection {
            Collection::Users => self.user_reader.query_documents(filter, page, page_size).await,
            Collection::Workspaces => {
                self.workspace_reader
                    .query_documents(filter, page, page_size)
                    .await
            }
            Collection::States => self.state_reader.query_documents(filter, page, page_size).await,
            Collection::Organizations => {
                self.organizations
                    .reader()
                    .query_documents(filter, page, page_size)
                    .await
            }
            Collection::Projects => {
                self.projects
                    .reader()
                    .query_documents(filter, page, page_size)
                    .await
            }
            Collection::ProjectTypes => {
                self.project_types
                    .reader()
                    .query_documents(filter, page, page_size)
                    .await
            }
        }
    }
}

/// In-memory store carrying every collection schema and the configured
/// version marker.
pub fn memory_store(config: &IntegrityConfig) -> Arc<MemoryDocumentStore> {
    Arc::new(
        MemoryDocumentStore::new()
            .with_schemas(model::schemas())
            .with_version_marker(config.version_marker.clone()),
    )
}
