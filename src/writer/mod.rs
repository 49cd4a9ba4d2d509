//! Per-aggregate writers and the persistence pipeline they share.

mod organization;
mod project;
mod project_type;

pub use organization::{OrganizationDeps, OrganizationWriter};
pub use project::{ProjectDeps, ProjectWriter};
pub use project_type::{ProjectTypeDeps, ProjectTypeWriter};

use crate::config::IntegrityConfig;
use crate::core::{
    ArgumentViolation, CREATED_AT_FIELD, DELETED_AT_FIELD, Document, EntityId, IntegrityError,
    Result, UPDATED_AT_FIELD, now, timestamp_json,
};
use crate::integrity::{ExistenceCheck, ExistenceValidator, PagedReader, Patch, UpdateGuard};
use crate::model::{Aggregate, DeletionMode};
use crate::storage::{DocumentStore, Filter, InsertAck, StoreError, UpdateSpec};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Level, event};

/// Insert, update and delete pipeline of one aggregate.
///
/// Relation resolution happens in the aggregate writers; this type takes
/// resolved documents and owns timestamps, structural validation, the
/// store round trip and read-back.
pub struct WriterCore<A> {
    store: Arc<dyn DocumentStore>,
    reader: PagedReader<A>,
    own: ExistenceValidator,
}

impl<A: Aggregate> WriterCore<A> {
    pub fn new(store: Arc<dyn DocumentStore>, config: IntegrityConfig) -> Self {
        Self {
            reader: PagedReader::new(store.clone(), config),
            own: ExistenceValidator::for_aggregate::<A>(store.clone()),
            store,
        }
    }

    pub fn reader(&self) -> &PagedReader<A> {
        &self.reader
    }

    /// Bulk existence check against this aggregate's own collection.
    pub async fn all_ids_exist(&self, ids: &[EntityId]) -> Result<()> {
        self.own.all_exist(ids).await
    }

    /// Stamps, validates, inserts and reads back a resolved document.
    pub async fn insert(&self, mut document: Document) -> Result<A> {
        let stamp = timestamp_json(now());
        document.insert(CREATED_AT_FIELD.to_string(), stamp.clone());
        document.insert(UPDATED_AT_FIELD.to_string(), stamp);

        self.store
            .validate(A::COLLECTION, &document)
            .await
            .map_err(|err| match err {
                StoreError::Unavailable(_) => {
                    event!(Level::ERROR, error = %err, "validation call failed");
                    IntegrityError::database("validate", A::COLLECTION, err)
                }
                StoreError::Validation { ref violations, .. } => {
                    let field = violations.first().map(|violation| violation.field.clone());
                    event!(Level::WARN, error = %err, "document rejected");
                    IntegrityError::data_validation(A::ENTITY, field, err)
                }
                StoreError::Malformed { .. } => {
                    event!(Level::WARN, error = %err, "document rejected");
                    IntegrityError::data_validation(A::ENTITY, None, err)
                }
            })?;

        let ack = self
            .store
            .insert_one(A::COLLECTION, document)
            .await
            .map_err(|err| {
                event!(Level::ERROR, error = %err, "insert failed");
                IntegrityError::database("insert_one", A::COLLECTION, err)
            })?;

        let id = match ack {
            InsertAck {
                acknowledged: true,
                inserted_id: Some(id),
            } => id,
            other => {
                event!(Level::ERROR, ack = ?other, "insert acknowledged without an identifier");
                return Err(IntegrityError::unexpected(
                    "insert_one",
                    A::COLLECTION,
                    format!("insert returned {:?}", other),
                ));
            }
        };

        event!(Level::DEBUG, id = %id, "document inserted");
        self.reader.get_by_id(id).await
    }

    /// Screens the patch, then writes it to the single document matching
    /// `filter`.
    pub async fn update(&self, guard: &UpdateGuard, filter: &Filter, patch: Patch) -> Result<A> {
        guard.check(&patch).await?;
        let update = UpdateSpec::set(guard.normalize(patch)?);
        self.validate_update(filter, &update).await?;
        self.apply(filter, update).await
    }

    /// Validates the document `update` would produce, without writing it.
    async fn validate_update(&self, filter: &Filter, update: &UpdateSpec) -> Result<()> {
        let scoped = filter.clone().and(self.reader.scope());
        let current = self
            .store
            .find_one(A::COLLECTION, &scoped, &[])
            .await
            .map_err(|err| {
                event!(Level::ERROR, error = %err, "lookup before update failed");
                IntegrityError::database("find_one", A::COLLECTION, err)
            })?;
        let Some(mut candidate) = current else {
            event!(Level::WARN, filter = %filter, "update matched nothing");
            return Err(no_match::<A>(filter.clone()));
        };

        candidate.extend(update.set.clone());
        for field in &update.unset {
            candidate.remove(field);
        }
        candidate.insert(UPDATED_AT_FIELD.to_string(), timestamp_json(now()));

        self.store
            .validate(A::COLLECTION, &candidate)
            .await
            .map_err(|err| {
                if let StoreError::Unavailable(_) = err {
                    event!(Level::ERROR, error = %err, "validation call failed");
                    return IntegrityError::database("validate", A::COLLECTION, err);
                }
                let field = match &err {
                    StoreError::Validation { violations, .. } => {
                        violations.first().map(|violation| violation.field.clone())
                    }
                    _ => None,
                };
                event!(Level::WARN, error = %err, "update rejected");
                IntegrityError::invalid_argument(
                    A::ENTITY,
                    ArgumentViolation::RejectedUpdate {
                        field,
                        reason: err.to_string(),
                    },
                )
            })
    }

    /// Writes `update` plus a fresh `updatedAt` and reads the document back.
    pub async fn apply(&self, filter: &Filter, update: UpdateSpec) -> Result<A> {
        let id = self.write(filter, update).await?;
        self.reader.get_by_id(id).await
    }

    pub async fn delete(&self, id: EntityId) -> Result<()> {
        let filter = Filter::by_id(id);
        match A::DELETION {
            DeletionMode::Physical => {
                let ack = self
                    .store
                    .delete_one(A::COLLECTION, &filter)
                    .await
                    .map_err(|err| {
                        event!(Level::ERROR, error = %err, "delete failed");
                        IntegrityError::database("delete_one", A::COLLECTION, err)
                    })?;
                if ack.deleted_count != 1 {
                    return Err(no_match::<A>(filter));
                }
            }
            DeletionMode::Logical => {
                let update = UpdateSpec::default().with_set(DELETED_AT_FIELD, timestamp_json(now()));
                self.write(&filter, update).await?;
            }
        }
        event!(Level::DEBUG, id = %id, "document deleted");
        Ok(())
    }

    async fn write(&self, filter: &Filter, update: UpdateSpec) -> Result<EntityId> {
        let update = update.with_set(UPDATED_AT_FIELD, timestamp_json(now()));
        let scoped = filter.clone().and(self.reader.scope());

        let ack = self
            .store
            .update_one(A::COLLECTION, &scoped, &update)
            .await
            .map_err(|err| {
                event!(Level::ERROR, error = %err, "update failed");
                IntegrityError::database("update_one", A::COLLECTION, err)
            })?;

        if ack.modified_count == 0 {
            event!(Level::WARN, filter = %filter, "update matched nothing");
            return Err(no_match::<A>(filter.clone()));
        }

        ack.modified_id.ok_or_else(|| {
            IntegrityError::unexpected(
                "update_one",
                A::COLLECTION,
                "modified document reported without an identifier",
            )
        })
    }
}

fn no_match<A: Aggregate>(filter: Filter) -> IntegrityError {
    IntegrityError::invalid_argument(A::ENTITY, ArgumentViolation::NoMatch { filter })
}

/// Existence check over `A`'s collection, for injection into other writers.
pub fn existence_of<A: Aggregate>(store: &Arc<dyn DocumentStore>) -> Arc<dyn ExistenceCheck> {
    Arc::new(ExistenceValidator::for_aggregate::<A>(store.clone()))
}

pub(crate) fn id_values(ids: &[EntityId]) -> Vec<JsonValue> {
    ids.iter().map(EntityId::to_json).collect()
}

pub(crate) fn ids_json(ids: &[EntityId]) -> JsonValue {
    JsonValue::Array(id_values(ids))
}
