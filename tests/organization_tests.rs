mod common;

use common::Harness;
use docintegrity::{
    ArgumentViolation, Cause, Collection, DocumentStore, EntityId, ErrorKind, Filter, IntegrityError,
    NewOrganization, OperationViolation, Patch, Reference, Result, User,
};
use serde_json::json;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_create_stamps_equal_timestamps_and_hydrates() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada", "grace"]).await;

    let org = harness
        .layer
        .organizations()
        .create(
            NewOrganization::new("Acme", users[0])
                .description("rockets")
                .members(vec![users[1].into()]),
        )
        .await?;

    assert_eq!(org.created_at, org.updated_at);
    assert_eq!(org.description.as_deref(), Some("rockets"));

    let owner = org.owner.as_ref().and_then(Reference::as_value).unwrap();
    assert_eq!(owner.id, users[0]);
    assert_eq!(owner.name, "ada");
    assert_eq!(org.members.len(), 1);
    assert!(org.members[0].is_hydrated());
    Ok(())
}

#[tokio::test]
async fn test_create_accepts_hydrated_owner() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let owner = Reference::ByValue(User {
        id: users[0],
        name: "ada".into(),
        email: None,
        created_at: None,
        updated_at: None,
    });

    let org = harness
        .layer
        .organizations()
        .create(NewOrganization::new("Acme", owner))
        .await?;
    assert_eq!(org.owner.map(|owner| owner.id()), Some(users[0]));
    Ok(())
}

#[tokio::test]
async fn test_create_with_missing_member_persists_nothing() {
    let harness = Harness::new();
    let users = harness.users(&["u1", "u2"]).await;
    let u3 = EntityId::new();

    // 1. Owner exists, one of the members does not
    let input = NewOrganization::new("Acme", users[0]).members(vec![users[1].into(), u3.into()]);
    let err = assert_err!(harness.layer.organizations().create(input).await);

    // 2. DataValidation wrapping a NotFound that names exactly U3
    assert_eq!(err.kind(), ErrorKind::DataValidation);
    let cause = err.cause().and_then(Cause::as_integrity).unwrap();
    assert_eq!(cause.kind(), ErrorKind::NotFound);
    assert_eq!(cause.missing_ids(), &[u3]);

    // 3. Nothing was written
    assert!(harness.store.is_empty(Collection::Organizations).await);
}

#[tokio::test]
async fn test_create_with_missing_owner_is_not_found() {
    let harness = Harness::new();
    let ghost = EntityId::new();

    let err = assert_err!(harness.organization(ghost).await);
    assert!(matches!(
        err,
        IntegrityError::NotFound { relation: Some("Owner"), collection: Collection::Users, .. }
    ));
    assert_eq!(err.missing_ids(), &[ghost]);
}

#[tokio::test]
async fn test_update_moves_updated_at_only() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;

    tokio::time::sleep(Duration::from_millis(5)).await;
    let updated = harness
        .layer
        .organizations()
        .update_by_id(org.id, Patch::new().set("name", "Acme Corp"))
        .await?;

    assert_eq!(updated.name, "Acme Corp");
    assert_eq!(updated.created_at, org.created_at);
    assert!(updated.updated_at > org.updated_at);
    Ok(())
}

#[tokio::test]
async fn test_update_rejects_system_fields_and_writes_nothing() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;
    let before = harness.raw(Collection::Organizations, org.id).await;

    for field in ["_id", "id", "createdAt", "updatedAt", "deletedAt"] {
        let patch = Patch::new().set(field, "2020-01-01T00:00:00Z").set("name", "changed");
        let err = assert_err!(harness.layer.organizations().update_by_id(org.id, patch).await);
        assert!(matches!(
            err,
            IntegrityError::InvalidOperation { violation: OperationViolation::ImmutableField, .. }
        ));
    }

    assert_eq!(harness.raw(Collection::Organizations, org.id).await, before);
    Ok(())
}

#[tokio::test]
async fn test_update_with_wrong_field_type_writes_nothing() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;
    let before = harness.raw(Collection::Organizations, org.id).await;

    // 1. A number where the name string belongs is refused up front
    let err = assert_err!(
        harness
            .layer
            .organizations()
            .update_by_id(org.id, Patch::new().set("name", 42))
            .await
    );
    match err {
        IntegrityError::InvalidArgument {
            violation: ArgumentViolation::RejectedUpdate { field, .. },
            ..
        } => assert_eq!(field.as_deref(), Some("name")),
        other => panic!("expected InvalidArgument, got {:?}", other),
    }

    // 2. Stored document untouched and still readable
    assert_eq!(harness.raw(Collection::Organizations, org.id).await, before);
    let reread = harness.layer.organizations().get_by_id(org.id).await?;
    assert_eq!(reread.name, "Acme");
    Ok(())
}

#[tokio::test]
async fn test_update_rejects_invalid_optional_field() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;

    let err = assert_err!(
        harness
            .layer
            .organizations()
            .update_by_id(org.id, Patch::new().set("description", json!(["not", "text"])))
            .await
    );
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(harness.layer.organizations().get_by_id(org.id).await?.description.is_none());
    Ok(())
}

#[tokio::test]
async fn test_update_rejects_plural_relations() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada", "grace"]).await;
    let org = harness.organization(users[0]).await?;
    let before = harness.raw(Collection::Organizations, org.id).await;

    let patch = Patch::new().set("members", json!([users[1].to_string()]));
    let err = assert_err!(harness.layer.organizations().update_by_id(org.id, patch).await);

    match err {
        IntegrityError::InvalidOperation { field, violation, .. } => {
            assert_eq!(field, "members");
            assert_eq!(
                violation,
                OperationViolation::PluralRelation { use_instead: "add_members/remove_members" }
            );
        }
        other => panic!("expected InvalidOperation, got {:?}", other),
    }
    assert_eq!(harness.raw(Collection::Organizations, org.id).await, before);
    Ok(())
}

#[tokio::test]
async fn test_update_owner_accepts_only_bare_identifier() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada", "grace"]).await;
    let org = harness.organization(users[0]).await?;

    // 1. Hydrated object is refused on this aggregate's update path
    let hydrated = Patch::new().set("owner", json!({ "_id": users[1].to_string(), "name": "grace" }));
    let err = assert_err!(harness.layer.organizations().update_by_id(org.id, hydrated).await);
    assert!(matches!(
        err,
        IntegrityError::InvalidOperation {
            violation: OperationViolation::ObjectReferenceRejected { relation: "Owner" },
            ..
        }
    ));

    // 2. Bare identifier goes through
    let updated = harness
        .layer
        .organizations()
        .update_by_id(org.id, Patch::new().set("owner", users[1].to_string()))
        .await?;
    assert_eq!(updated.owner.map(|owner| owner.id()), Some(users[1]));
    Ok(())
}

#[tokio::test]
async fn test_update_one_by_filter() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    harness.organization(users[0]).await?;

    let renamed = harness
        .layer
        .organizations()
        .update_one(&Filter::new().eq("name", "Acme"), Patch::new().set("description", "found"))
        .await?;
    assert_eq!(renamed.description.as_deref(), Some("found"));

    let missing = Filter::new().eq("name", "Nobody");
    let err = assert_err!(
        harness
            .layer
            .organizations()
            .update_one(&missing, Patch::new().set("description", "lost"))
            .await
    );
    match err {
        IntegrityError::InvalidArgument { violation: ArgumentViolation::NoMatch { filter }, .. } => {
            assert_eq!(filter, missing);
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_member_operations() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada", "grace", "alan"]).await;
    let org = harness.organization(users[0]).await?;
    let writer = harness.layer.organizations();

    // 1. Add twice, stored once
    writer.add_members(org.id, &[users[1].into()]).await?;
    let org = writer
        .add_members(org.id, &[users[1].into(), users[2].into()])
        .await?;
    let members: Vec<_> = org.members.iter().map(Reference::id).collect();
    assert_eq!(members, vec![users[1], users[2]]);

    // 2. Missing user rejects the whole batch
    let ghost = EntityId::new();
    let err = assert_err!(writer.add_members(org.id, &[users[0].into(), ghost.into()]).await);
    assert_eq!(err.kind(), ErrorKind::DataValidation);
    assert_eq!(writer.get_by_id(org.id).await?.members.len(), 2);

    // 3. Removal does not require the user to exist
    let org = writer.remove_members(org.id, &[users[1], ghost]).await?;
    let members: Vec<_> = org.members.iter().map(Reference::id).collect();
    assert_eq!(members, vec![users[2]]);
    Ok(())
}

#[tokio::test]
async fn test_project_list_operations() -> Result<()> {
    let harness = Harness::new();
    let fixture = harness.project("alpha").await?;
    let writer = harness.layer.organizations();
    let org_id = fixture.organization.id;

    let org = writer.add_projects(org_id, &[fixture.project.id.into()]).await?;
    assert_eq!(org.projects.len(), 1);
    assert_eq!(org.projects[0].as_value().map(|project| project.slug.as_str()), Some("alpha"));

    let org = writer.remove_projects(org_id, &[fixture.project.id]).await?;
    assert!(org.projects.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_delete_is_physical() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;
    let writer = harness.layer.organizations();

    assert_ok!(writer.delete_by_id(org.id).await);
    assert!(harness.raw(Collection::Organizations, org.id).await.is_none());

    let err = assert_err!(writer.get_by_id(org.id).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = assert_err!(writer.delete_by_id(org.id).await);
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    Ok(())
}

#[tokio::test]
async fn test_dangling_references_after_collaborator_removal() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada", "grace"]).await;
    let org = harness
        .layer
        .organizations()
        .create(NewOrganization::new("Acme", users[0]).members(vec![users[0].into(), users[1].into()]))
        .await?;

    // No cascade: removing a user leaves the organization referencing it
    let removed = harness
        .store
        .delete_one(Collection::Users, &Filter::by_id(users[0]))
        .await
        .expect("delete user");
    assert_eq!(removed.deleted_count, 1);

    let org = harness.layer.organizations().get_by_id(org.id).await?;
    assert!(org.owner.is_none());
    let members: Vec<_> = org.members.iter().map(Reference::id).collect();
    assert_eq!(members, vec![users[1]]);

    let raw = harness.raw(Collection::Organizations, org.id).await.unwrap();
    assert_eq!(raw["owner"], json!(users[0].to_string()));
    Ok(())
}

#[tokio::test]
async fn test_bulk_existence_checks() -> Result<()> {
    let harness = Harness::new();
    let users = harness.users(&["ada"]).await;
    let org = harness.organization(users[0]).await?;
    let ghost = EntityId::new();

    assert_ok!(harness.layer.all_organization_ids_exist(&[org.id]).await);
    let err = assert_err!(harness.layer.all_organization_ids_exist(&[org.id, ghost]).await);
    assert_eq!(err.missing_ids(), &[ghost]);

    assert_ok!(harness.layer.all_user_ids_exist(&users).await);
    assert_ok!(harness.layer.all_ids_exist(Collection::Users, &users).await);
    Ok(())
}
