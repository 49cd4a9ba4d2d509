use super::reader::visible_scope;
use crate::core::{Collection, EntityId, ID_FIELD, IntegrityError, Result};
use crate::model::Aggregate;
use crate::storage::{DocumentStore, Filter, Window};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{Level, event};

/// Existence checks against one collection.
///
/// Writers receive these by injection, one per relation target.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    fn collection(&self) -> Collection;

    /// `Ok(false)` for a legitimate miss; store failures are errors.
    async fn exists_by_id(&self, id: EntityId) -> Result<bool>;

    /// Succeeds only if every id exists. Fails with `NotFound` naming
    /// exactly the missing ids, sorted and without duplicates.
    async fn all_exist(&self, ids: &[EntityId]) -> Result<()>;
}

/// Store-backed [`ExistenceCheck`].
#[derive(Clone)]
pub struct ExistenceValidator {
    store: Arc<dyn DocumentStore>,
    collection: Collection,
    scope: Filter,
}

impl ExistenceValidator {
    pub fn new(store: Arc<dyn DocumentStore>, collection: Collection) -> Self {
        Self {
            store,
            collection,
            scope: Filter::new(),
        }
    }

    /// Validator for an aggregate's collection; logically deleted documents
    /// do not count as existing.
    pub fn for_aggregate<A: Aggregate>(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            collection: A::COLLECTION,
            scope: visible_scope::<A>(),
        }
    }
}

#[async_trait]
impl ExistenceCheck for ExistenceValidator {
    fn collection(&self) -> Collection {
        self.collection
    }

    async fn exists_by_id(&self, id: EntityId) -> Result<bool> {
        let filter = Filter::by_id(id).and(&self.scope);
        let count = self
            .store
            .count(self.collection, &filter)
            .await
            .map_err(|err| {
                event!(Level::ERROR, error = %err, collection = %self.collection, "existence check failed");
                IntegrityError::database("exists_by_id", self.collection, err)
            })?;
        Ok(count > 0)
    }

    async fn all_exist(&self, ids: &[EntityId]) -> Result<()> {
        let requested: BTreeSet<EntityId> = ids.iter().copied().collect();
        if requested.is_empty() {
            return Ok(());
        }

        let filter = Filter::new()
            .is_in(ID_FIELD, requested.iter().map(EntityId::to_json))
            .and(&self.scope);
        let documents = self
            .store
            .find(self.collection, &filter, Window::default(), &[])
            .await
            .map_err(|err| {
                event!(Level::ERROR, error = %err, collection = %self.collection, "bulk existence check failed");
                IntegrityError::database("all_exist", self.collection, err)
            })?;

        let found: BTreeSet<EntityId> = documents
            .iter()
            .filter_map(|document| document.get(ID_FIELD).and_then(EntityId::from_json))
            .collect();
        let missing: Vec<EntityId> = requested.difference(&found).copied().collect();

        if missing.is_empty() {
            Ok(())
        } else {
            event!(
                Level::DEBUG,
                collection = %self.collection,
                missing = missing.len(),
                "bulk existence check found missing ids"
            );
            Err(IntegrityError::not_found(self.collection, missing))
        }
    }
}
