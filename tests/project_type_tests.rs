mod common;

use common::Harness;
use docintegrity::{
    ArgumentViolation, Cause, EntityId, ErrorKind, IntegrityError, NewProjectType,
    OperationViolation, Patch, Reference, Result, StoreError,
};
use serde_json::json;
use tokio_test::assert_err;

#[tokio::test]
async fn test_create_validates_shape_structurally() {
    let harness = Harness::new();

    let err = assert_err!(
        harness
            .layer
            .project_types()
            .create(NewProjectType::new("Broken", json!({ "title": "colour" })))
            .await
    );

    assert_eq!(err.kind(), ErrorKind::DataValidation);
    let cause = err.cause().and_then(Cause::as_store).unwrap();
    assert!(matches!(cause, StoreError::Validation { .. }));
}

#[tokio::test]
async fn test_update_shape_is_invalid_argument() -> Result<()> {
    let harness = Harness::new();
    let project_type = harness.project_type().await?;
    let writer = harness.layer.project_types();

    let bad = json!({ "meta": { "type": "object", "fields": { "9lives": "string" } } });
    let err = assert_err!(writer.update_by_id(project_type.id, Patch::new().set("shape", bad)).await);
    match err {
        IntegrityError::InvalidArgument {
            violation: ArgumentViolation::MalformedShape { path, .. },
            ..
        } => assert_eq!(path, "shape.meta.9lives"),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }

    let good = json!({ "assets": { "type": "array", "items": "file" } });
    let updated = writer
        .update_by_id(project_type.id, Patch::new().set("shape", good.clone()))
        .await?;
    assert_eq!(updated.shape, good);
    Ok(())
}

#[tokio::test]
async fn test_projects_list_is_not_updatable_directly() -> Result<()> {
    let harness = Harness::new();
    let project_type = harness.project_type().await?;

    let err = assert_err!(
        harness
            .layer
            .project_types()
            .update_by_id(project_type.id, Patch::new().set("projects", json!([])))
            .await
    );
    assert!(matches!(
        err,
        IntegrityError::InvalidOperation {
            violation: OperationViolation::PluralRelation { use_instead: "add_projects/remove_projects" },
            ..
        }
    ));
    Ok(())
}

#[tokio::test]
async fn test_project_list_operations() -> Result<()> {
    let harness = Harness::new();
    let fixture = harness.project("alpha").await?;
    let writer = harness.layer.project_types();
    let type_id = fixture.project_type.id;

    let project_type = writer.add_projects(type_id, &[fixture.project.id.into()]).await?;
    let linked: Vec<_> = project_type.projects.iter().map(Reference::id).collect();
    assert_eq!(linked, vec![fixture.project.id]);

    let ghost = EntityId::new();
    let err = assert_err!(writer.add_projects(type_id, &[ghost.into()]).await);
    assert_eq!(err.kind(), ErrorKind::DataValidation);

    let project_type = writer.remove_projects(type_id, &[fixture.project.id]).await?;
    assert!(project_type.projects.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_is_physical_and_leaves_projects_dangling() -> Result<()> {
    let harness = Harness::new();
    let fixture = harness.project("alpha").await?;
    let writer = harness.layer.project_types();

    writer.delete_by_id(fixture.project_type.id).await?;
    let err = assert_err!(writer.get_by_id(fixture.project_type.id).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let project = harness.layer.projects().get_by_id(fixture.project.id).await?;
    assert!(project.project_type.is_none());

    let err = assert_err!(
        harness
            .layer
            .all_project_type_ids_exist(&[fixture.project_type.id])
            .await
    );
    assert_eq!(err.missing_ids(), &[fixture.project_type.id]);
    Ok(())
}
