use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use stockroom_core::auth::claims::{
    resolve_effective_access, resolve_effective_permissions, resolve_role_names,
};
use stockroom_core::extractors::Pagination;
use stockroom_core::models::{role, user_role, Role, RolePermission, UserRole};
use stockroom_core::services::permissions::{self, NewPermission, PermissionChanges, PermissionFilter};
use stockroom_core::services::roles::{self, NewRole, RoleChanges};
use stockroom_core::services::users::{self, NewUser, UserChanges, UserFilter};
use stockroom_core::{Config, StockroomError};

async fn setup() -> DatabaseConnection {
    let db = stockroom_core::db::connect(&Config::for_tests())
        .await
        .expect("connect");
    stockroom_core::db::migrate(&db).await.expect("migrate");
    db
}

async fn permission(db: &DatabaseConnection, name: &str) -> i32 {
    permissions::create(
        db,
        NewPermission {
            name: name.to_string(),
            description: None,
            feature: None,
        },
    )
    .await
    .expect("create permission")
    .id
}

async fn role_with(db: &DatabaseConnection, name: &str, permission_ids: Vec<i32>) -> i32 {
    roles::create(
        db,
        NewRole {
            name: name.to_string(),
            description: Some(format!("{name} role")),
            permissions: permission_ids,
        },
    )
    .await
    .expect("create role")
    .id
}

async fn user_with(db: &DatabaseConnection, email: &str, role_ids: Vec<i32>) -> i32 {
    users::create(
        db,
        NewUser {
            name: "Test User".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            roles: role_ids,
        },
    )
    .await
    .expect("create user")
    .id
}

// ═══ Permissions ═══

#[tokio::test]
async fn test_permission_feature_is_derived_from_name() {
    let db = setup().await;
    let id = permission(&db, "brands.view").await;
    let stored = permissions::get(&db, id).await.unwrap();
    assert_eq!(stored.feature, "brands");
}

#[tokio::test]
async fn test_permission_feature_mismatch_is_rejected() {
    let db = setup().await;
    let err = permissions::create(
        &db,
        NewPermission {
            name: "brands.view".into(),
            description: None,
            feature: Some("products".into()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, StockroomError::BadRequest(_)));
}

#[tokio::test]
async fn test_duplicate_permission_is_conflict() {
    let db = setup().await;
    permission(&db, "users.view").await;
    let err = permissions::create(
        &db,
        NewPermission {
            name: "users.view".into(),
            description: None,
            feature: None,
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_duplicate());
    assert_eq!(err.public_message(), "Permission with this name already exists");
}

#[tokio::test]
async fn test_missing_permission_is_not_found_not_failure() {
    let db = setup().await;
    assert!(permissions::find_by_id(&db, 999).await.unwrap().is_none());
    assert!(matches!(
        permissions::get(&db, 999).await,
        Err(StockroomError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_permission_list_filters_and_paginates() {
    let db = setup().await;
    for name in ["users.view", "users.create", "roles.view"] {
        permission(&db, name).await;
    }

    let users_only = permissions::list(
        &db,
        Pagination::default(),
        &PermissionFilter {
            feature: Some("users".into()),
            search: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(users_only.pagination.total, 2);

    let paged = permissions::list(&db, Pagination::new(2, 2), &PermissionFilter::default())
        .await
        .unwrap();
    assert_eq!(paged.items.len(), 1);
    assert_eq!(paged.pagination.pages, 2);

    let searched = permissions::list(
        &db,
        Pagination::default(),
        &PermissionFilter {
            feature: None,
            search: Some("ROLES".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(searched.items.len(), 1);
}

#[tokio::test]
async fn test_permission_rename_rederives_feature() {
    let db = setup().await;
    let id = permission(&db, "users.view").await;
    let renamed = permissions::update(
        &db,
        id,
        PermissionChanges {
            name: Some("products.view".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(renamed.feature, "products");
}

// ═══ Roles ═══

#[tokio::test]
async fn test_duplicate_role_is_conflict() {
    let db = setup().await;
    role_with(&db, "cashier", vec![]).await;
    let err = roles::create(
        &db,
        NewRole {
            name: "cashier".into(),
            description: None,
            permissions: vec![],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "Role with this name already exists");
}

#[tokio::test]
async fn test_assign_permissions_replaces_the_whole_set() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let create = permission(&db, "users.create").await;
    let delete = permission(&db, "users.delete").await;
    let role_id = role_with(&db, "clerk", vec![view, create]).await;

    let updated = roles::assign_permissions(&db, role_id, &[delete, delete])
        .await
        .unwrap();
    assert_eq!(updated.permission_names(), vec!["users.delete"]);
}

#[tokio::test]
async fn test_assign_unknown_permission_fails_without_changes() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let role_id = role_with(&db, "clerk", vec![view]).await;

    let err = roles::assign_permissions(&db, role_id, &[view, 9999])
        .await
        .unwrap_err();
    assert_eq!(err.public_message(), "One or more permissions not found");

    let unchanged = roles::get(&db, role_id).await.unwrap();
    assert_eq!(unchanged.permission_names(), vec!["users.view"]);
}

#[tokio::test]
async fn test_clone_names_count_up_until_free() {
    let db = setup().await;
    let view = permission(&db, "roles.view").await;
    let admin = role_with(&db, "admin", vec![view]).await;

    let first = roles::clone(&db, admin).await.unwrap();
    let second = roles::clone(&db, admin).await.unwrap();
    let third = roles::clone(&db, admin).await.unwrap();

    assert_eq!(first.name, "Copy of admin");
    assert_eq!(second.name, "Copy of admin (1)");
    assert_eq!(third.name, "Copy of admin (2)");
    assert_eq!(third.permission_names(), vec!["roles.view"]);
    assert_eq!(third.description.as_deref(), Some("admin role"));
}

#[tokio::test]
async fn test_clone_of_missing_role_is_not_found() {
    let db = setup().await;
    assert_eq!(
        roles::clone(&db, 404).await.unwrap_err().public_message(),
        "Role not found"
    );
}

#[tokio::test]
async fn test_role_delete_keeps_user_links() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let role_id = role_with(&db, "temp", vec![view]).await;
    user_with(&db, "holder@example.com", vec![role_id]).await;

    roles::delete(&db, role_id).await.unwrap();

    assert!(Role::find_by_id(role_id).one(&db).await.unwrap().is_none());
    assert!(RolePermission::find().all(&db).await.unwrap().is_empty());
    assert_eq!(UserRole::find().all(&db).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_role_update_detects_rename_collision() {
    let db = setup().await;
    role_with(&db, "a", vec![]).await;
    let b = role_with(&db, "b", vec![]).await;
    let err = roles::update(
        &db,
        b,
        RoleChanges {
            name: Some("a".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_duplicate());
}

#[tokio::test]
async fn test_blank_role_name_is_rejected() {
    let db = setup().await;
    let err = roles::create(
        &db,
        NewRole {
            name: "   ".into(),
            description: None,
            permissions: vec![],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "Validation failed");

    let id = role_with(&db, "  padded  ", vec![]).await;
    assert_eq!(roles::get(&db, id).await.unwrap().name, "padded");

    let err = roles::update(
        &db,
        id,
        RoleChanges {
            name: Some("\t ".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "Validation failed");
    assert_eq!(roles::get(&db, id).await.unwrap().name, "padded");
}

// ═══ Users ═══

#[tokio::test]
async fn test_email_is_stored_lowercase_and_unique() {
    let db = setup().await;
    let id = user_with(&db, "Mixed@Example.COM", vec![]).await;
    assert_eq!(users::get(&db, id).await.unwrap().email, "mixed@example.com");
    assert!(users::find_by_email(&db, "MIXED@example.com").await.unwrap().is_some());

    let err = users::create(
        &db,
        NewUser {
            name: "Dup".into(),
            email: "mixed@EXAMPLE.com".into(),
            password: "secret1".into(),
            roles: vec![],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "User with this email already exists");
}

#[tokio::test]
async fn test_assign_unknown_role_is_bad_request() {
    let db = setup().await;
    let id = user_with(&db, "u@example.com", vec![]).await;
    let err = users::assign_roles(&db, id, &[77]).await.unwrap_err();
    assert!(matches!(err, StockroomError::BadRequest(_)));
    assert_eq!(err.public_message(), "One or more roles not found");
}

#[tokio::test]
async fn test_user_list_shows_active_users_and_filters_by_role() {
    let db = setup().await;
    let cashier = role_with(&db, "cashier", vec![]).await;
    let a = user_with(&db, "a@example.com", vec![cashier]).await;
    user_with(&db, "b@example.com", vec![]).await;
    let c = user_with(&db, "c@example.com", vec![cashier]).await;
    users::deactivate(&db, c).await.unwrap();

    let all = users::list(&db, Pagination::default(), &UserFilter::default())
        .await
        .unwrap();
    assert_eq!(all.pagination.total, 2);

    let cashiers = users::list(
        &db,
        Pagination::default(),
        &UserFilter {
            search: None,
            role: Some("cashier".into()),
        },
    )
    .await
    .unwrap();
    assert_eq!(cashiers.items.len(), 1);
    assert_eq!(cashiers.items[0].id, a);

    let unknown = users::list(
        &db,
        Pagination::default(),
        &UserFilter {
            search: None,
            role: Some("ghost".into()),
        },
    )
    .await
    .unwrap();
    assert!(unknown.items.is_empty());
}

#[tokio::test]
async fn test_update_replaces_roles_when_given() {
    let db = setup().await;
    let a = role_with(&db, "a", vec![]).await;
    let b = role_with(&db, "b", vec![]).await;
    let id = user_with(&db, "u@example.com", vec![a]).await;

    let updated = users::update(
        &db,
        id,
        UserChanges {
            roles: Some(vec![b]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let names: Vec<&str> = updated.roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["b"]);
}

#[tokio::test]
async fn test_blank_user_name_is_rejected() {
    let db = setup().await;
    let err = users::create(
        &db,
        NewUser {
            name: " ".into(),
            email: "blank@example.com".into(),
            password: "secret1".into(),
            roles: vec![],
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "Validation failed");
    assert!(users::find_by_email(&db, "blank@example.com").await.unwrap().is_none());

    let id = user_with(&db, "named@example.com", vec![]).await;
    let err = users::update(
        &db,
        id,
        UserChanges {
            name: Some("   ".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.public_message(), "Validation failed");
    assert_eq!(users::get(&db, id).await.unwrap().name, "Test User");
}

// ═══ Claims assembly ═══

#[tokio::test]
async fn test_effective_permissions_are_the_union_of_roles() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let create = permission(&db, "users.create").await;
    let r1 = role_with(&db, "r1", vec![view]).await;
    let r2 = role_with(&db, "r2", vec![view, create]).await;
    let user = user_with(&db, "u@example.com", vec![r1, r2]).await;

    let access = resolve_effective_access(&db, user).await.unwrap();
    assert_eq!(access.role_names(), vec!["r1", "r2"]);
    assert_eq!(access.permission_names(), vec!["users.create", "users.view"]);
}

#[tokio::test]
async fn test_user_without_roles_has_empty_access() {
    let db = setup().await;
    let user = user_with(&db, "none@example.com", vec![]).await;
    let access = resolve_effective_access(&db, user).await.unwrap();
    assert!(access.role_names.is_empty());
    assert!(access.permission_names.is_empty());
}

#[tokio::test]
async fn test_inactive_roles_are_excluded() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let delete = permission(&db, "users.delete").await;
    let active = role_with(&db, "active", vec![view]).await;
    let retired = role_with(&db, "retired", vec![delete]).await;
    roles::update(
        &db,
        retired,
        RoleChanges {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let user = user_with(&db, "u@example.com", vec![active, retired]).await;

    let access = resolve_effective_access(&db, user).await.unwrap();
    assert_eq!(access.role_names(), vec!["active"]);
    assert_eq!(access.permission_names(), vec!["users.view"]);
}

#[tokio::test]
async fn test_dangling_references_are_skipped_and_counted() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let doomed_permission = permission(&db, "users.delete").await;
    let keeper = role_with(&db, "keeper", vec![view, doomed_permission]).await;
    let doomed_role = role_with(&db, "doomed", vec![view]).await;
    let user = user_with(&db, "u@example.com", vec![keeper, doomed_role]).await;

    permissions::delete(&db, doomed_permission).await.unwrap();
    roles::delete(&db, doomed_role).await.unwrap();

    let access = resolve_effective_access(&db, user).await.unwrap();
    assert_eq!(access.role_names(), vec!["keeper"]);
    assert_eq!(access.permission_names(), vec!["users.view"]);
    assert_eq!(access.skipped_roles, 1);
    assert_eq!(access.skipped_permissions, 1);
}

#[tokio::test]
async fn test_links_written_directly_are_resolved() {
    let db = setup().await;
    let view = permission(&db, "brands.view").await;
    let role_id = role_with(&db, "direct", vec![view]).await;
    let user = user_with(&db, "direct@example.com", vec![]).await;

    user_role::ActiveModel {
        user_id: Set(user),
        role_id: Set(role_id),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let access = resolve_effective_access(&db, user).await.unwrap();
    assert_eq!(access.permission_names(), vec!["brands.view"]);
    let stored: Option<role::Model> = Role::find_by_id(role_id).one(&db).await.unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_name_resolvers_match_full_access() {
    let db = setup().await;
    let view = permission(&db, "users.view").await;
    let create = permission(&db, "users.create").await;
    let viewer = role_with(&db, "viewer", vec![view]).await;
    let editor = role_with(&db, "editor", vec![view, create]).await;
    let user = user_with(&db, "both@example.com", vec![viewer, editor]).await;

    let permissions = resolve_effective_permissions(&db, user).await.unwrap();
    assert_eq!(
        permissions.into_iter().collect::<Vec<_>>(),
        vec!["users.create", "users.view"]
    );

    let names = resolve_role_names(&db, user).await.unwrap();
    assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["editor", "viewer"]);

    let bare = user_with(&db, "bare@example.com", vec![]).await;
    assert!(resolve_effective_permissions(&db, bare).await.unwrap().is_empty());
    assert!(resolve_role_names(&db, bare).await.unwrap().is_empty());
}
