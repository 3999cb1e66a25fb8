//! Claims assembly: turn a user's role assignments into the flattened
//! role/permission snapshot embedded in their token.
//!
//! Runs once per login. Protected requests never come back here.

use std::collections::BTreeSet;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::error::StockroomError;
use crate::models::{role_permission, user_role, Permission, Role, RolePermission, UserRole};

/// One role assignment as loaded from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleGrant {
    pub name: String,
    pub is_active: bool,
    /// Permission names; `None` marks a reference to a deleted permission.
    pub permissions: Vec<Option<String>>,
}

/// The effective access of one user at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectiveAccess {
    pub role_names: BTreeSet<String>,
    pub permission_names: BTreeSet<String>,
    /// Role references that no longer resolve.
    pub skipped_roles: usize,
    /// Permission references that no longer resolve.
    pub skipped_permissions: usize,
}

impl EffectiveAccess {
    pub fn role_names(&self) -> Vec<String> {
        self.role_names.iter().cloned().collect()
    }

    pub fn permission_names(&self) -> Vec<String> {
        self.permission_names.iter().cloned().collect()
    }
}

/// Flatten role grants into an [`EffectiveAccess`].
///
/// `None` entries are dangling role references. Inactive roles contribute
/// neither their name nor their permissions. Wildcards are kept as-is; they
/// are only expanded at match time.
pub fn assemble(grants: &[Option<RoleGrant>]) -> EffectiveAccess {
    let mut access = EffectiveAccess::default();

    for grant in grants {
        let Some(role) = grant else {
            access.skipped_roles += 1;
            continue;
        };
        if !role.is_active {
            continue;
        }

        access.role_names.insert(role.name.clone());
        for permission in &role.permissions {
            match permission {
                Some(name) => {
                    access.permission_names.insert(name.clone());
                }
                None => access.skipped_permissions += 1,
            }
        }
    }

    access
}

/// Load every role grant of `user_id`, including dangling references.
pub async fn load_grants<C>(db: &C, user_id: i32) -> Result<Vec<Option<RoleGrant>>, StockroomError>
where
    C: ConnectionTrait,
{
    let links = UserRole::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .find_also_related(Role)
        .all(db)
        .await?;

    let mut grants = Vec::with_capacity(links.len());
    for (link, role) in links {
        let Some(role) = role else {
            tracing::warn!(user_id, role_id = link.role_id, "user references a missing role");
            grants.push(None);
            continue;
        };

        let permissions = if role.is_active {
            RolePermission::find()
                .filter(role_permission::Column::RoleId.eq(role.id))
                .find_also_related(Permission)
                .all(db)
                .await?
                .into_iter()
                .map(|(rp, permission)| {
                    if permission.is_none() {
                        tracing::warn!(
                            role = %role.name,
                            permission_id = rp.permission_id,
                            "role references a missing permission"
                        );
                    }
                    permission.map(|p| p.name)
                })
                .collect()
        } else {
            tracing::debug!(user_id, role = %role.name, "skipping inactive role");
            Vec::new()
        };

        grants.push(Some(RoleGrant {
            name: role.name,
            is_active: role.is_active,
            permissions,
        }));
    }

    Ok(grants)
}

/// Resolve the effective access of `user_id` from the store.
pub async fn resolve_effective_access<C>(
    db: &C,
    user_id: i32,
) -> Result<EffectiveAccess, StockroomError>
where
    C: ConnectionTrait,
{
    let grants = load_grants(db, user_id).await?;
    let access = assemble(&grants);

    if access.skipped_roles > 0 || access.skipped_permissions > 0 {
        tracing::warn!(
            user_id,
            skipped_roles = access.skipped_roles,
            skipped_permissions = access.skipped_permissions,
            "dangling references skipped while assembling claims"
        );
    }

    Ok(access)
}

/// Effective permission names of `user_id`.
pub async fn resolve_effective_permissions<C>(
    db: &C,
    user_id: i32,
) -> Result<BTreeSet<String>, StockroomError>
where
    C: ConnectionTrait,
{
    Ok(resolve_effective_access(db, user_id).await?.permission_names)
}

/// Names of the active roles of `user_id`.
pub async fn resolve_role_names<C>(db: &C, user_id: i32) -> Result<BTreeSet<String>, StockroomError>
where
    C: ConnectionTrait,
{
    Ok(resolve_effective_access(db, user_id).await?.role_names)
}
