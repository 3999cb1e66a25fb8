use serde_json::json;
use stockroom_core::services::permissions::{self, NewPermission};
use stockroom_core::services::roles::{self, NewRole};
use stockroom_core::services::users::{self, NewUser};
use stockroom_core::TestApp;

async fn add_permission(app: &TestApp, name: &str) -> i32 {
    permissions::create(
        &app.db,
        NewPermission {
            name: name.into(),
            description: None,
            feature: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn add_role(app: &TestApp, name: &str, permission_ids: Vec<i32>) -> i32 {
    roles::create(
        &app.db,
        NewRole {
            name: name.into(),
            description: None,
            permissions: permission_ids,
        },
    )
    .await
    .unwrap()
    .id
}

async fn add_user(app: &TestApp, email: &str, role_ids: Vec<i32>) -> i32 {
    users::create(
        &app.db,
        NewUser {
            name: "Scenario User".into(),
            email: email.into(),
            password: "hunter22".into(),
            roles: role_ids,
        },
    )
    .await
    .unwrap()
    .id
}

// ═══ Login to gate ═══

#[tokio::test]
async fn test_login_snapshot_drives_permission_gate() {
    let app = TestApp::empty().await;
    let view = add_permission(&app, "users.view").await;
    add_permission(&app, "users.delete").await;
    let r1 = add_role(&app, "r1", vec![view]).await;
    let u1 = add_user(&app, "u1@example.com", vec![r1]).await;

    let res = app
        .client
        .post(
            &app.url("/api/auth/login"),
            &json!({"email": "u1@example.com", "password": "hunter22"}).to_string(),
        )
        .await;
    assert_eq!(res.status, 200);
    let body = res.json();
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], u1);
    assert_eq!(body["user"]["roleNames"], json!(["r1"]));

    let token = body["token"].as_str().unwrap().to_string();
    let claims = app.codec.verify(&token).unwrap();
    assert_eq!(claims.sub, u1.to_string());
    assert_eq!(claims.permissions, Some(vec!["users.view".to_string()]));

    let list = app.client.get_with_auth(&app.url("/api/users"), &token).await;
    assert_eq!(list.status, 200);

    let denied = app
        .client
        .delete_with_auth(&app.url(&format!("/api/users/{u1}")), &token)
        .await;
    assert_eq!(denied.status, 403);
    assert_eq!(
        denied.json(),
        json!({"success": false, "message": "Insufficient permissions"})
    );
}

#[tokio::test]
async fn test_snapshot_is_not_refreshed_by_role_edits() {
    let app = TestApp::empty().await;
    let view = add_permission(&app, "users.view").await;
    let r1 = add_role(&app, "r1", vec![view]).await;
    add_user(&app, "stale@example.com", vec![r1]).await;

    let token = app.login("stale@example.com", "hunter22").await;
    roles::assign_permissions(&app.db, r1, &[]).await.unwrap();

    let still_allowed = app.client.get_with_auth(&app.url("/api/users"), &token).await;
    assert_eq!(still_allowed.status, 200);

    let fresh = app.login("stale@example.com", "hunter22").await;
    let now_denied = app.client.get_with_auth(&app.url("/api/users"), &fresh).await;
    assert_eq!(now_denied.status, 403);
}

#[tokio::test]
async fn test_deactivated_user_cannot_log_in() {
    let app = TestApp::empty().await;
    let id = add_user(&app, "gone@example.com", vec![]).await;
    users::deactivate(&app.db, id).await.unwrap();

    let res = app
        .client
        .post(
            &app.url("/api/auth/login"),
            &json!({"email": "gone@example.com", "password": "hunter22"}).to_string(),
        )
        .await;
    assert_eq!(res.status, 401);
    let body = res.json();
    assert_eq!(body["message"], "Account is deactivated");
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn test_deactivated_check_precedes_password_check() {
    let app = TestApp::empty().await;
    let id = add_user(&app, "gone@example.com", vec![]).await;
    users::deactivate(&app.db, id).await.unwrap();

    let res = app
        .client
        .post(
            &app.url("/api/auth/login"),
            &json!({"email": "gone@example.com", "password": "wrong-password"}).to_string(),
        )
        .await;
    assert_eq!(res.status, 401);
    assert_eq!(res.message().as_deref(), Some("Account is deactivated"));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::empty().await;
    add_user(&app, "real@example.com", vec![]).await;

    for (email, password) in [("real@example.com", "nope-nope"), ("ghost@example.com", "hunter22")] {
        let res = app
            .client
            .post(
                &app.url("/api/auth/login"),
                &json!({"email": email, "password": password}).to_string(),
            )
            .await;
        assert_eq!(res.status, 401);
        assert_eq!(res.message().as_deref(), Some("Invalid credentials"));
    }
}

#[tokio::test]
async fn test_wildcard_and_specific_grants_both_survive_the_union() {
    let app = TestApp::empty().await;
    let specific = add_permission(&app, "brands.view").await;
    let wildcard = add_permission(&app, "brands.*").await;
    let a = add_role(&app, "brand-viewer", vec![specific]).await;
    let b = add_role(&app, "brand-manager", vec![wildcard]).await;
    add_user(&app, "brands@example.com", vec![a, b]).await;

    let token = app.login("brands@example.com", "hunter22").await;
    let claims = app.codec.verify(&token).unwrap();
    assert_eq!(
        claims.permissions,
        Some(vec!["brands.*".to_string(), "brands.view".to_string()])
    );
}

#[tokio::test]
async fn test_wildcard_grant_passes_http_gate() {
    let app = TestApp::empty().await;
    let wildcard = add_permission(&app, "users.*").await;
    let role = add_role(&app, "user-admin", vec![wildcard]).await;
    let target = add_user(&app, "wild@example.com", vec![role]).await;

    let token = app.login("wild@example.com", "hunter22").await;
    let res = app
        .client
        .post_with_auth(
            &app.url(&format!("/api/users/{target}/roles")),
            &token,
            &json!({"roles": [role]}).to_string(),
        )
        .await;
    assert_eq!(res.status, 200);
    assert_eq!(
        res.message().as_deref(),
        Some("Roles assigned to user successfully")
    );
}

#[tokio::test]
async fn test_user_without_roles_gets_empty_snapshot() {
    let app = TestApp::empty().await;
    add_user(&app, "bare@example.com", vec![]).await;

    let token = app.login("bare@example.com", "hunter22").await;
    let claims = app.codec.verify(&token).unwrap();
    assert!(claims.roles.is_empty());
    assert_eq!(claims.permissions, Some(vec![]));

    let res = app.client.get_with_auth(&app.url("/api/protected"), &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.json()["user"]["permissions"], json!([]));
}

// ═══ Seeded admin ═══

#[tokio::test]
async fn test_seeded_admin_reaches_admin_routes() {
    let app = TestApp::new().await;
    let token = app.login_admin().await;

    let res = app.client.get_with_auth(&app.url("/api/admin-only"), &token).await;
    assert_eq!(res.status, 200);
    assert_eq!(res.message().as_deref(), Some("Admin-only request successful"));
    assert_eq!(res.json()["user"]["roleNames"], json!(["admin"]));

    let roles = app.client.get_with_auth(&app.url("/api/roles"), &token).await;
    assert_eq!(roles.status, 200);
    assert_eq!(roles.json()["roles"][0]["name"], "admin");
}
