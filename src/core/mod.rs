pub mod error;
pub mod types;

pub use error::{
    ArgumentViolation, Cause, ErrorKind, IntegrityError, OperationViolation, Result,
};
pub use types::{
    CREATED_AT_FIELD, Collection, DELETED_AT_FIELD, Document, EntityId, ID_ALIAS_FIELD, ID_FIELD,
    UPDATED_AT_FIELD, now, timestamp_json,
};
