//! Idempotent bootstrap: the permission catalog, the `admin` role and the
//! first administrator. Safe to run on every start.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::auth::password::hash_password;
use crate::config::AdminConfig;
use crate::error::StockroomError;
use crate::models::permission::{self, feature_of};
use crate::models::{role, role_permission, user, user_role, Permission, Role, RolePermission};
use crate::services::{now, users::normalize_email};
use crate::taxonomy::{describe, ADMIN_ROLE};

/// What a seeding run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_created: usize,
    pub permissions_skipped: usize,
    pub admin_role_created: bool,
    pub admin_user_created: bool,
}

/// Create every permission in `catalog` that does not exist yet.
pub async fn seed_permissions(
    db: &DatabaseConnection,
    catalog: &[&str],
    report: &mut SeedReport,
) -> Result<(), StockroomError> {
    for &name in catalog {
        let feature = feature_of(name).ok_or_else(|| {
            StockroomError::Internal(format!("catalog permission '{name}' has no feature"))
        })?;

        let exists = Permission::find()
            .filter(permission::Column::Name.eq(name))
            .one(db)
            .await?
            .is_some();
        if exists {
            report.permissions_skipped += 1;
            continue;
        }

        let now = now();
        permission::ActiveModel {
            name: Set(name.to_string()),
            feature: Set(feature.to_string()),
            description: Set(Some(describe(name))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;
        report.permissions_created += 1;
    }
    Ok(())
}

/// Create the `admin` role holding every permission that exists right now.
///
/// Returns the role id. An existing admin role is left untouched.
pub async fn seed_admin_role(
    db: &DatabaseConnection,
    report: &mut SeedReport,
) -> Result<i32, StockroomError> {
    if let Some(existing) = Role::find()
        .filter(role::Column::Name.eq(ADMIN_ROLE))
        .one(db)
        .await?
    {
        return Ok(existing.id);
    }

    let permission_ids: Vec<i32> = Permission::find()
        .all(db)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    let txn = db.begin().await?;
    let now = now();
    let admin = role::ActiveModel {
        name: Set(ADMIN_ROLE.to_string()),
        description: Set(Some("Administrator with all permissions".to_string())),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    if !permission_ids.is_empty() {
        let links = permission_ids.iter().map(|&permission_id| role_permission::ActiveModel {
            role_id: Set(admin.id),
            permission_id: Set(permission_id),
            created_at: Set(now),
            ..Default::default()
        });
        RolePermission::insert_many(links).exec(&txn).await?;
    }
    txn.commit().await?;

    report.admin_role_created = true;
    Ok(admin.id)
}

/// Create the bootstrap administrator, holding `admin_role_id`, if absent.
pub async fn seed_admin_user(
    db: &DatabaseConnection,
    admin: &AdminConfig,
    admin_role_id: i32,
    report: &mut SeedReport,
) -> Result<(), StockroomError> {
    let email = normalize_email(&admin.email);
    let exists = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some();
    if exists {
        return Ok(());
    }

    let password_hash = hash_password(&admin.password)?;
    let txn = db.begin().await?;
    let now = now();
    let created = user::ActiveModel {
        name: Set(admin.name.clone()),
        email: Set(email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    user_role::ActiveModel {
        user_id: Set(created.id),
        role_id: Set(admin_role_id),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    txn.commit().await?;

    report.admin_user_created = true;
    Ok(())
}

/// Run the full bootstrap against `catalog`.
pub async fn run(
    db: &DatabaseConnection,
    catalog: &[&str],
    admin: &AdminConfig,
) -> Result<SeedReport, StockroomError> {
    let mut report = SeedReport::default();

    seed_permissions(db, catalog, &mut report).await?;
    let admin_role_id = seed_admin_role(db, &mut report).await?;
    seed_admin_user(db, admin, admin_role_id, &mut report).await?;

    tracing::info!(
        permissions_created = report.permissions_created,
        permissions_skipped = report.permissions_skipped,
        admin_role_created = report.admin_role_created,
        admin_user_created = report.admin_user_created,
        "seeding complete"
    );
    Ok(report)
}
