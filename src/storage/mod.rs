//! Document store seam and its in-memory implementation.

pub mod engine;
pub mod error;
pub mod filter;
pub mod memory;
pub mod schema;

pub use engine::{DeleteAck, DocumentStore, InsertAck, Populate, UpdateAck, UpdateSpec, Window};
pub use error::{SchemaViolation, StoreError, StoreResult};
pub use filter::{Condition, Filter};
pub use memory::{DEFAULT_VERSION_MARKER, MemoryDocumentStore};
pub use schema::{CollectionSchema, FieldKind, FieldRule};
