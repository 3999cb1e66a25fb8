use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use stockroom_core::auth::claims::resolve_effective_access;
use stockroom_core::config::AdminConfig;
use stockroom_core::models::{Permission, Role, User};
use stockroom_core::seed;
use stockroom_core::services::{roles, users};
use stockroom_core::taxonomy::{ADMIN_ROLE, CANONICAL};
use stockroom_core::Config;

async fn setup() -> DatabaseConnection {
    let db = stockroom_core::db::connect(&Config::for_tests())
        .await
        .expect("connect");
    stockroom_core::db::migrate(&db).await.expect("migrate");
    db
}

// ═══ First run ═══

#[tokio::test]
async fn test_first_run_creates_catalog_role_and_admin() {
    let db = setup().await;
    let report = seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();

    assert_eq!(report.permissions_created, CANONICAL.len());
    assert_eq!(report.permissions_skipped, 0);
    assert!(report.admin_role_created);
    assert!(report.admin_user_created);
    assert_eq!(Permission::find().count(&db).await.unwrap(), 26);
}

#[tokio::test]
async fn test_admin_role_holds_every_seeded_permission() {
    let db = setup().await;
    seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();

    let admin = roles::find_by_name(&db, ADMIN_ROLE).await.unwrap().unwrap();
    let view = roles::get(&db, admin.id).await.unwrap();
    assert_eq!(view.permissions.len(), CANONICAL.len());
}

#[tokio::test]
async fn test_seeded_admin_gets_full_snapshot() {
    let db = setup().await;
    let admin = AdminConfig::default();
    seed::run(&db, CANONICAL, &admin).await.unwrap();

    let user = users::find_by_email(&db, &admin.email).await.unwrap().unwrap();
    let access = resolve_effective_access(&db, user.id).await.unwrap();
    assert_eq!(access.role_names(), vec![ADMIN_ROLE]);
    assert_eq!(access.permission_names.len(), CANONICAL.len());
    assert!(access.permission_names.contains("users.assign_roles"));
}

// ═══ Idempotency ═══

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let db = setup().await;
    seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();
    let again = seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();

    assert_eq!(again.permissions_created, 0);
    assert_eq!(again.permissions_skipped, CANONICAL.len());
    assert!(!again.admin_role_created);
    assert!(!again.admin_user_created);

    assert_eq!(Permission::find().count(&db).await.unwrap(), 26);
    assert_eq!(Role::find().count(&db).await.unwrap(), 1);
    assert_eq!(User::find().count(&db).await.unwrap(), 1);
}

#[tokio::test]
async fn test_partial_catalog_is_completed() {
    let db = setup().await;
    seed::run(&db, &CANONICAL[..4], &AdminConfig::default()).await.unwrap();
    let report = seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();

    assert_eq!(report.permissions_skipped, 4);
    assert_eq!(report.permissions_created, CANONICAL.len() - 4);
}

#[tokio::test]
async fn test_existing_admin_role_is_left_untouched() {
    let db = setup().await;
    roles::create(
        &db,
        roles::NewRole {
            name: ADMIN_ROLE.into(),
            description: None,
            permissions: vec![],
        },
    )
    .await
    .unwrap();

    let report = seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();
    assert!(!report.admin_role_created);

    let admin = roles::find_by_name(&db, ADMIN_ROLE).await.unwrap().unwrap();
    assert!(roles::get(&db, admin.id).await.unwrap().permissions.is_empty());
}

#[tokio::test]
async fn test_admin_email_is_matched_case_insensitively() {
    let db = setup().await;
    seed::run(&db, CANONICAL, &AdminConfig::default()).await.unwrap();

    let shouty = AdminConfig {
        email: "ADMIN@EXAMPLE.COM".into(),
        ..AdminConfig::default()
    };
    let report = seed::run(&db, CANONICAL, &shouty).await.unwrap();
    assert!(!report.admin_user_created);
}
