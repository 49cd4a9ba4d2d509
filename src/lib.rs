//! Referential integrity for a schemaless document store.
//!
//! The store has no foreign keys, so every write of an [`Organization`],
//! [`Project`] or [`ProjectType`] goes through a writer that checks the
//! relations it names, guards system-controlled fields and reads the
//! result back in a stable shape.
//!
//! ```no_run
//! use docintegrity::{IntegrityConfig, IntegrityLayer, NewOrganization, memory_store};
//! # async fn demo(owner: docintegrity::EntityId) -> docintegrity::Result<()> {
//! let config = IntegrityConfig::default();
//! let layer = IntegrityLayer::new(memory_store(&config), config);
//!
//! let org = layer
//!     .organizations()
//!     .create(NewOrganization::new("Acme", owner))
//!     .await?;
//! assert_eq!(org.created_at, org.updated_at);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod facade;
pub mod integrity;
pub mod model;
pub mod storage;
pub mod writer;

pub use config::IntegrityConfig;
pub use crate::core::{
    ArgumentViolation, Cause, Collection, Document, EntityId, ErrorKind, IntegrityError,
    OperationViolation, Result,
};
pub use facade::{IntegrityLayer, memory_store};
pub use integrity::{
    ExistenceCheck, ExistenceValidator, Page, PagedReader, Patch, ReferenceResolver,
    RelationForm, UpdateGuard, parse_filter,
};
pub use model::{
    Aggregate, DeletionMode, Identified, NewOrganization, NewProject, NewProjectType,
    Organization, Project, ProjectFile, ProjectType, Reference, State, User, Workspace,
};
pub use storage::{DocumentStore, Filter, MemoryDocumentStore, StoreError, UpdateSpec};
pub use writer::{
    OrganizationDeps, OrganizationWriter, ProjectDeps, ProjectTypeDeps, ProjectTypeWriter,
    ProjectWriter,
};
