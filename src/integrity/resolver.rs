use super::existence::ExistenceCheck;
use crate::core::{EntityId, IntegrityError, Result};
use crate::model::{Identified, Reference};
use std::sync::Arc;

/// Turns relation values into verified identifiers.
///
/// Hydrated references are never trusted: the embedded id is checked
/// against the store like a bare one.
#[derive(Clone)]
pub struct ReferenceResolver {
    relation: &'static str,
    check: Arc<dyn ExistenceCheck>,
}

impl ReferenceResolver {
    /// `relation` names the field in errors, e.g. `"Owner"`.
    pub fn new(relation: &'static str, check: Arc<dyn ExistenceCheck>) -> Self {
        Self { relation, check }
    }

    pub fn relation(&self) -> &'static str {
        self.relation
    }

    /// Fails with `NotFound` tagged with the relation name.
    pub async fn resolve<T: Identified>(&self, reference: &Reference<T>) -> Result<EntityId> {
        let id = reference.id();
        if self.check.exists_by_id(id).await? {
            Ok(id)
        } else {
            Err(IntegrityError::not_found(self.check.collection(), vec![id]).for_relation(self.relation))
        }
    }

    pub async fn resolve_optional<T: Identified>(
        &self,
        reference: Option<&Reference<T>>,
    ) -> Result<Option<EntityId>> {
        match reference {
            Some(reference) => self.resolve(reference).await.map(Some),
            None => Ok(None),
        }
    }

    /// All-or-nothing resolution of a relation list.
    ///
    /// A missing id surfaces as `DataValidation` whose cause is the bulk
    /// `NotFound`. Output keeps input order, without duplicates.
    pub async fn resolve_many<T: Identified>(&self, references: &[Reference<T>]) -> Result<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = Vec::with_capacity(references.len());
        for id in references.iter().map(Reference::id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }

        self.check.all_exist(&ids).await.map_err(|err| match err {
            IntegrityError::NotFound { .. } => IntegrityError::data_validation(
                self.relation,
                None,
                err.for_relation(self.relation),
            ),
            other => other,
        })?;

        Ok(ids)
    }
}
