//! Aggregates, their collaborators and the relation type tying them together.

mod collaborators;
mod organization;
mod project;
mod project_type;
mod reference;
pub mod shape;

pub use collaborators::{State, User, Workspace};
pub use organization::{NewOrganization, Organization};
pub use project::{NewProject, Project, ProjectFile, slugify};
pub use project_type::{NewProjectType, ProjectType};
pub use reference::{Identified, Reference};

use crate::core::{Collection, DELETED_AT_FIELD};
use crate::storage::{CollectionSchema, Populate};
use serde::de::DeserializeOwned;

/// How an aggregate is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionMode {
    /// The document is removed from the store.
    Physical,
    /// `deletedAt` is stamped and the document is hidden from reads.
    Logical,
}

/// A top-level persisted entity with its own collection and lifecycle.
pub trait Aggregate: DeserializeOwned + Identified + Send + Sync + 'static {
    /// Name used in errors and logs.
    const ENTITY: &'static str;
    const COLLECTION: Collection;
    const DELETION: DeletionMode;
    /// Relation paths hydrated on every read.
    const POPULATE: &'static [Populate];
}

/// Population of `path` from `A`'s collection. Targets `A` deletes
/// logically are left out once deleted.
pub const fn related<A: Aggregate>(path: &'static str) -> Populate {
    let populate = Populate::new(path, A::COLLECTION);
    match A::DELETION {
        DeletionMode::Physical => populate,
        DeletionMode::Logical => populate.hidden_by(DELETED_AT_FIELD),
    }
}

/// Schemas of every collection the layer knows about.
pub fn schemas() -> Vec<(Collection, CollectionSchema)> {
    let mut all = collaborators::schemas();
    all.push((Collection::Organizations, organization::schema()));
    all.push((Collection::Projects, project::schema()));
    all.push((Collection::ProjectTypes, project_type::schema()));
    all
}
