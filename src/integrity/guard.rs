use super::existence::ExistenceCheck;
use super::patch::Patch;
use crate::core::{
    ArgumentViolation, CREATED_AT_FIELD, DELETED_AT_FIELD, Document, EntityId, ID_ALIAS_FIELD,
    ID_FIELD, IntegrityError, OperationViolation, Result, UPDATED_AT_FIELD,
};
use crate::model::shape::validate_shape;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{Level, event};

static NULL: JsonValue = JsonValue::Null;

/// Fields no update payload may carry.
pub const IMMUTABLE_FIELDS: [&str; 5] = [
    ID_FIELD,
    ID_ALIAS_FIELD,
    CREATED_AT_FIELD,
    UPDATED_AT_FIELD,
    DELETED_AT_FIELD,
];

/// Which relation forms an aggregate's update path accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationForm {
    /// Only a bare identifier string.
    IdOnly,
    /// A bare identifier or a hydrated object carrying `_id`.
    IdOrObject,
}

struct SingularRelation {
    field: &'static str,
    relation: &'static str,
    required: bool,
    check: Arc<dyn ExistenceCheck>,
}

struct PluralRelation {
    field: &'static str,
    use_instead: &'static str,
}

/// Screens update payloads before anything is written.
pub struct UpdateGuard {
    entity: &'static str,
    form: RelationForm,
    singular: Vec<SingularRelation>,
    plural: Vec<PluralRelation>,
    shapes: Vec<&'static str>,
}

impl UpdateGuard {
    pub fn new(entity: &'static str, form: RelationForm) -> Self {
        Self {
            entity,
            form,
            singular: Vec::new(),
            plural: Vec::new(),
            shapes: Vec::new(),
        }
    }

    /// A single-valued relation; its target must exist at update time.
    pub fn singular(
        mut self,
        field: &'static str,
        relation: &'static str,
        required: bool,
        check: Arc<dyn ExistenceCheck>,
    ) -> Self {
        self.singular.push(SingularRelation {
            field,
            relation,
            required,
            check,
        });
        self
    }

    /// A relation list only editable through `use_instead`.
    pub fn plural(mut self, field: &'static str, use_instead: &'static str) -> Self {
        self.plural.push(PluralRelation { field, use_instead });
        self
    }

    /// A field validated by the shape rule.
    pub fn shape(mut self, field: &'static str) -> Self {
        self.shapes.push(field);
        self
    }

    pub fn form(&self) -> RelationForm {
        self.form
    }

    /// Rejects the payload or lets it through untouched.
    pub async fn check(&self, patch: &Patch) -> Result<()> {
        if let Some(field) = IMMUTABLE_FIELDS.iter().find(|field| patch.contains(field)) {
            return Err(self.reject(field, OperationViolation::ImmutableField));
        }

        if let Some(plural) = self.plural.iter().find(|plural| patch.contains(plural.field)) {
            return Err(self.reject(
                plural.field,
                OperationViolation::PluralRelation {
                    use_instead: plural.use_instead,
                },
            ));
        }

        for field in &self.shapes {
            if let Some(shape) = patch.get(field) {
                validate_shape(shape).map_err(|err| {
                    IntegrityError::invalid_argument(
                        self.entity,
                        ArgumentViolation::MalformedShape {
                            path: if err.path == "$" {
                                field.to_string()
                            } else {
                                format!("{}.{}", field, err.path)
                            },
                            reason: err.reason,
                        },
                    )
                })?;
            }
        }

        for relation in &self.singular {
            let Some(value) = patch.get(relation.field) else {
                continue;
            };
            let Some(id) = self.reference_id(relation, value)? else {
                continue;
            };
            if !relation.check.exists_by_id(id).await? {
                return Err(self.reject(
                    relation.field,
                    OperationViolation::MissingReference {
                        relation: relation.relation,
                        id,
                    },
                ));
            }
        }

        Ok(())
    }

    /// Rewrites relation values to bare identifiers. Expects a payload that
    /// already passed [`UpdateGuard::check`].
    pub fn normalize(&self, patch: Patch) -> Result<Document> {
        let mut document = patch.into_document();
        for relation in &self.singular {
            let Some(value) = document.get(relation.field) else {
                continue;
            };
            let normalized = match self.reference_id(relation, value)? {
                Some(id) => id.to_json(),
                None => JsonValue::Null,
            };
            document.insert(relation.field.to_string(), normalized);
        }
        Ok(document)
    }

    fn reference_id(&self, relation: &SingularRelation, value: &JsonValue) -> Result<Option<EntityId>> {
        let embedded = match value {
            JsonValue::Null if relation.required => {
                return Err(self.reject(
                    relation.field,
                    OperationViolation::RequiredRelation {
                        relation: relation.relation,
                    },
                ));
            }
            JsonValue::Null => return Ok(None),
            JsonValue::String(_) => value,
            JsonValue::Object(_) if self.form == RelationForm::IdOnly => {
                return Err(self.reject(
                    relation.field,
                    OperationViolation::ObjectReferenceRejected {
                        relation: relation.relation,
                    },
                ));
            }
            JsonValue::Object(object) => object
                .get(ID_FIELD)
                .or_else(|| object.get(ID_ALIAS_FIELD))
                .unwrap_or(&NULL),
            _ => &NULL,
        };

        EntityId::from_json(embedded).map(Some).ok_or_else(|| {
            IntegrityError::invalid_argument(
                self.entity,
                ArgumentViolation::MalformedReference {
                    field: relation.field.to_string(),
                    value: value.clone(),
                },
            )
        })
    }

    fn reject(&self, field: &str, violation: OperationViolation) -> IntegrityError {
        event!(
            Level::WARN,
            entity = self.entity,
            field = field,
            violation = %violation,
            "update rejected"
        );
        IntegrityError::invalid_operation(self.entity, field, violation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Collection, ErrorKind};
    use crate::integrity::ExistenceValidator;
    use crate::storage::MemoryDocumentStore;
    use serde_json::json;

    async fn guard(form: RelationForm) -> (UpdateGuard, EntityId) {
        let store = Arc::new(MemoryDocumentStore::new());
        let ids = store
            .import(
                Collection::Users,
                vec![json!({"name": "ada"}).as_object().cloned().unwrap()],
            )
            .await
            .unwrap();
        let users: Arc<dyn ExistenceCheck> =
            Arc::new(ExistenceValidator::new(store, Collection::Users));

        let guard = UpdateGuard::new("Widget", form)
            .singular("owner", "Owner", true, users.clone())
            .singular("reviewer", "Reviewer", false, users)
            .plural("members", "add_members/remove_members")
            .shape("shape");
        (guard, ids[0])
    }

    #[tokio::test]
    async fn test_immutable_fields_rejected() {
        let (guard, _) = guard(RelationForm::IdOrObject).await;
        for field in IMMUTABLE_FIELDS {
            let err = guard.check(&Patch::new().set(field, "x")).await.unwrap_err();
            assert!(matches!(
                err,
                IntegrityError::InvalidOperation { ref field, violation: OperationViolation::ImmutableField, .. }
                    if IMMUTABLE_FIELDS.contains(&field.as_str())
            ));
        }
    }

    #[tokio::test]
    async fn test_plural_relation_rejected_with_hint() {
        let (guard, _) = guard(RelationForm::IdOrObject).await;
        let err = guard
            .check(&Patch::new().set("members", json!([])))
            .await
            .unwrap_err();
        match err {
            IntegrityError::InvalidOperation { field, violation, .. } => {
                assert_eq!(field, "members");
                assert_eq!(
                    violation,
                    OperationViolation::PluralRelation {
                        use_instead: "add_members/remove_members"
                    }
                );
            }
            other => panic!("expected InvalidOperation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_reference_names_relation() {
        let (guard, _) = guard(RelationForm::IdOrObject).await;
        let ghost = EntityId::new();
        let err = guard
            .check(&Patch::new().set("owner", ghost.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::InvalidOperation {
                violation: OperationViolation::MissingReference { relation: "Owner", id },
                ..
            } if id == ghost
        ));
    }

    #[tokio::test]
    async fn test_object_reference_depends_on_form() {
        let (lenient, id) = guard(RelationForm::IdOrObject).await;
        let patch = Patch::new().set("owner", json!({"_id": id.to_string(), "name": "ada"}));
        assert!(lenient.check(&patch).await.is_ok());
        let normalized = lenient.normalize(patch.clone()).unwrap();
        assert_eq!(normalized["owner"], id.to_json());

        let (strict, _) = guard(RelationForm::IdOnly).await;
        let err = strict.check(&patch).await.unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::InvalidOperation {
                violation: OperationViolation::ObjectReferenceRejected { relation: "Owner" },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_null_relations() {
        let (guard, _) = guard(RelationForm::IdOrObject).await;

        let cleared = Patch::new().set("reviewer", JsonValue::Null);
        assert!(guard.check(&cleared).await.is_ok());
        assert_eq!(guard.normalize(cleared).unwrap()["reviewer"], JsonValue::Null);

        let err = guard
            .check(&Patch::new().set("owner", JsonValue::Null))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    }

    #[tokio::test]
    async fn test_malformed_values_are_invalid_arguments() {
        let (guard, _) = guard(RelationForm::IdOrObject).await;

        let err = guard.check(&Patch::new().set("owner", 17)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = guard
            .check(&Patch::new().set("shape", json!({"title": "colour"})))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            IntegrityError::InvalidArgument {
                violation: ArgumentViolation::MalformedShape { ref path, .. },
                ..
            } if path == "shape.title"
        ));
    }

    #[tokio::test]
    async fn test_plain_fields_pass() {
        let (guard, id) = guard(RelationForm::IdOnly).await;
        let patch = Patch::new().set("name", "renamed").set("owner", id.to_string());
        assert!(guard.check(&patch).await.is_ok());
    }
}
