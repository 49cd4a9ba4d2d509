//! Referential-integrity building blocks shared by the aggregate writers:
//! existence checks, reference resolution, update screening and reads.

mod existence;
mod guard;
mod patch;
mod reader;
mod resolver;

pub use existence::{ExistenceCheck, ExistenceValidator};
pub use guard::{IMMUTABLE_FIELDS, RelationForm, UpdateGuard};
pub use patch::Patch;
pub use reader::{Page, PagedReader, parse_filter};
pub use resolver::ReferenceResolver;
