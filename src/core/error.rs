use super::types::{Collection, EntityId};
use crate::storage::{Filter, StoreError};
use thiserror::Error;

/// Errors raised by the integrity layer.
///
/// Every variant carries enough structured context (collection, relation,
/// field, identifiers or filter) for a caller to act on it without parsing
/// the message.
#[derive(Error, Debug)]
pub enum IntegrityError {
    #[error("{} not found in '{collection}'{}", subject(.relation), describe_ids(.ids, .filter))]
    NotFound {
        collection: Collection,
        relation: Option<&'static str>,
        ids: Vec<EntityId>,
        filter: Option<Filter>,
    },

    #[error("invalid argument for {entity}: {violation}")]
    InvalidArgument {
        entity: &'static str,
        violation: ArgumentViolation,
    },

    #[error("invalid operation on {entity}.{field}: {violation}")]
    InvalidOperation {
        entity: &'static str,
        field: String,
        violation: OperationViolation,
    },

    #[error("{entity} failed data validation: {cause}")]
    DataValidation {
        entity: &'static str,
        field: Option<String>,
        #[source]
        cause: Cause,
    },

    #[error("database operation '{operation}' on '{collection}' failed: {cause}")]
    DatabaseOperation {
        operation: &'static str,
        collection: Collection,
        #[source]
        cause: Cause,
    },

    #[error("unexpected result from '{operation}' on '{collection}': {detail}")]
    Unexpected {
        operation: &'static str,
        collection: Collection,
        detail: String,
    },
}

pub type Result<T> = std::result::Result<T, IntegrityError>;

/// Coarse classification of an [`IntegrityError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    InvalidOperation,
    DataValidation,
    DatabaseOperation,
    Unexpected,
}

/// Caller-correctable problems with the shape of a request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArgumentViolation {
    #[error("page {page} is out of range ({total_pages} page(s) available)")]
    PageOutOfRange { page: u32, total_pages: u64 },

    #[error("page size {requested} must be between 1 and {max}")]
    PageSize { requested: u32, max: u32 },

    #[error("no document matched filter {filter}")]
    NoMatch { filter: Filter },

    #[error("malformed filter: {reason}")]
    MalformedFilter { reason: String },

    #[error("malformed shape at '{path}': {reason}")]
    MalformedShape { path: String, reason: String },

    #[error("update would leave the document invalid: {reason}")]
    RejectedUpdate {
        /// First field the store objected to, when it named one.
        field: Option<String>,
        reason: String,
    },

    #[error("field '{field}' does not hold a usable reference: {value}")]
    MalformedReference {
        field: String,
        value: serde_json::Value,
    },
}

/// Mutations the layer refuses to perform.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OperationViolation {
    #[error("field is system-controlled and cannot be updated")]
    ImmutableField,

    #[error("relation lists cannot be replaced through update; use {use_instead}")]
    PluralRelation { use_instead: &'static str },

    #[error("{relation} {id} does not exist")]
    MissingReference { relation: &'static str, id: EntityId },

    #[error("{relation} must be given as a bare identifier on update")]
    ObjectReferenceRejected { relation: &'static str },

    #[error("{relation} is required and cannot be cleared")]
    RequiredRelation { relation: &'static str },
}

/// Originating failure wrapped by `DataValidation` and `DatabaseOperation`.
#[derive(Error, Debug)]
pub enum Cause {
    #[error(transparent)]
    Integrity(Box<IntegrityError>),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("document decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Cause {
    pub fn as_integrity(&self) -> Option<&IntegrityError> {
        match self {
            Cause::Integrity(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn as_store(&self) -> Option<&StoreError> {
        match self {
            Cause::Store(inner) => Some(inner),
            _ => None,
        }
    }
}

impl From<IntegrityError> for Cause {
    fn from(err: IntegrityError) -> Self {
        Cause::Integrity(Box::new(err))
    }
}

impl IntegrityError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::DataValidation { .. } => ErrorKind::DataValidation,
            Self::DatabaseOperation { .. } => ErrorKind::DatabaseOperation,
            Self::Unexpected { .. } => ErrorKind::Unexpected,
        }
    }

    pub fn not_found(collection: Collection, ids: Vec<EntityId>) -> Self {
        Self::NotFound {
            collection,
            relation: None,
            ids,
            filter: None,
        }
    }

    pub fn not_found_matching(collection: Collection, filter: Filter) -> Self {
        Self::NotFound {
            collection,
            relation: None,
            ids: Vec::new(),
            filter: Some(filter),
        }
    }

    pub fn invalid_argument(entity: &'static str, violation: ArgumentViolation) -> Self {
        Self::InvalidArgument { entity, violation }
    }

    pub fn invalid_operation(
        entity: &'static str,
        field: impl Into<String>,
        violation: OperationViolation,
    ) -> Self {
        Self::InvalidOperation {
            entity,
            field: field.into(),
            violation,
        }
    }

    pub fn data_validation(
        entity: &'static str,
        field: Option<String>,
        cause: impl Into<Cause>,
    ) -> Self {
        Self::DataValidation {
            entity,
            field,
            cause: cause.into(),
        }
    }

    pub fn database(
        operation: &'static str,
        collection: Collection,
        cause: impl Into<Cause>,
    ) -> Self {
        Self::DatabaseOperation {
            operation,
            collection,
            cause: cause.into(),
        }
    }

    pub fn unexpected(
        operation: &'static str,
        collection: Collection,
        detail: impl Into<String>,
    ) -> Self {
        Self::Unexpected {
            operation,
            collection,
            detail: detail.into(),
        }
    }

    /// Tags a `NotFound` with the relation it was resolved for.
    pub fn for_relation(self, relation: &'static str) -> Self {
        match self {
            Self::NotFound {
                collection,
                ids,
                filter,
                ..
            } => Self::NotFound {
                collection,
                relation: Some(relation),
                ids,
                filter,
            },
            other => other,
        }
    }

    /// Identifiers named by a `NotFound`, empty for every other variant.
    pub fn missing_ids(&self) -> &[EntityId] {
        match self {
            Self::NotFound { ids, .. } => ids,
            _ => &[],
        }
    }

    pub fn cause(&self) -> Option<&Cause> {
        match self {
            Self::DataValidation { cause, .. } | Self::DatabaseOperation { cause, .. } => {
                Some(cause)
            }
            _ => None,
        }
    }
}

fn subject(relation: &Option<&'static str>) -> &'static str {
    relation.unwrap_or("entity")
}

fn describe_ids(ids: &[EntityId], filter: &Option<Filter>) -> String {
    let mut out = String::new();
    if !ids.is_empty() {
        let joined = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        out.push_str(&format!(": [{}]", joined));
    }
    if let Some(filter) = filter {
        out.push_str(&format!(" matching {}", filter));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_relation_and_ids() {
        let id = EntityId::new();
        let err = IntegrityError::not_found(Collection::Users, vec![id]).for_relation("Owner");

        let message = err.to_string();
        assert!(message.starts_with("Owner not found in 'users'"));
        assert!(message.contains(&id.to_string()));
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.missing_ids(), &[id]);
    }

    #[test]
    fn test_data_validation_keeps_cause() {
        let missing = IntegrityError::not_found(Collection::Users, vec![EntityId::new()]);
        let err = IntegrityError::data_validation("Organization", Some("members".into()), missing);

        let inner = err.cause().and_then(Cause::as_integrity).unwrap();
        assert_eq!(inner.kind(), ErrorKind::NotFound);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_for_relation_leaves_other_variants_untouched() {
        let err = IntegrityError::invalid_operation(
            "Project",
            "createdAt",
            OperationViolation::ImmutableField,
        )
        .for_relation("Owner");
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }
}
