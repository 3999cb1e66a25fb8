use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::StockroomError;
use crate::extractors::Pagination;
use crate::models::{permission, role, role_permission, Permission, Role, RolePermission};
use crate::response::PageInfo;

use super::{icontains, non_blank, not_blank, now, trimmed_name, Page};

/// A role with its resolved permissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleView {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub permissions: Vec<permission::Model>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RoleView {
    fn new(role: role::Model, permissions: Vec<permission::Model>) -> Self {
        RoleView {
            id: role.id,
            name: role.name,
            description: role.description,
            is_active: role.is_active,
            permissions,
            created_at: role.created_at,
            updated_at: role.updated_at,
        }
    }

    pub fn permission_names(&self) -> Vec<&str> {
        self.permissions.iter().map(|p| p.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewRole {
    #[validate(
        length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(length(max = 200, message = "Description must be less than 200 characters"))]
    pub description: Option<String>,
    /// Initial permission ids.
    #[serde(default)]
    pub permissions: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RoleChanges {
    #[validate(
        length(min = 1, max = 50, message = "Name must be between 1 and 50 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(length(max = 200, message = "Description must be less than 200 characters"))]
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

fn role_not_found() -> StockroomError {
    StockroomError::NotFound("Role not found".to_string())
}

async fn ensure_name_free<C: ConnectionTrait>(db: &C, name: &str) -> Result<(), StockroomError> {
    let taken = Role::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(StockroomError::Conflict(
            "Role with this name already exists".to_string(),
        ));
    }
    Ok(())
}

/// De-duplicate `ids` and check every one names an existing permission.
async fn checked_permission_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<Vec<i32>, StockroomError> {
    let unique: Vec<i32> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if unique.is_empty() {
        return Ok(unique);
    }

    let found = Permission::find()
        .filter(permission::Column::Id.is_in(unique.clone()))
        .count(db)
        .await?;
    if found != unique.len() as u64 {
        return Err(StockroomError::NotFound(
            "One or more permissions not found".to_string(),
        ));
    }
    Ok(unique)
}

/// Replace the permission links of `role_id` with `permission_ids`.
async fn replace_links<C: ConnectionTrait>(
    db: &C,
    role_id: i32,
    permission_ids: &[i32],
) -> Result<(), StockroomError> {
    RolePermission::delete_many()
        .filter(role_permission::Column::RoleId.eq(role_id))
        .exec(db)
        .await?;

    if permission_ids.is_empty() {
        return Ok(());
    }

    let now = now();
    let links = permission_ids.iter().map(|&permission_id| role_permission::ActiveModel {
        role_id: Set(role_id),
        permission_id: Set(permission_id),
        created_at: Set(now),
        ..Default::default()
    });
    RolePermission::insert_many(links).exec(db).await?;
    Ok(())
}

async fn with_permissions<C: ConnectionTrait>(
    db: &C,
    role: role::Model,
) -> Result<RoleView, StockroomError> {
    let permissions = role
        .find_related(Permission)
        .order_by_asc(permission::Column::Name)
        .all(db)
        .await?;
    Ok(RoleView::new(role, permissions))
}

pub async fn create(db: &DatabaseConnection, input: NewRole) -> Result<RoleView, StockroomError> {
    let name = trimmed_name(&input.name)?;
    ensure_name_free(db, &name).await?;
    let permission_ids = checked_permission_ids(db, &input.permissions).await?;

    let txn = db.begin().await?;
    let now = now();
    let created = role::ActiveModel {
        name: Set(name),
        description: Set(input.description),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_links(&txn, created.id, &permission_ids).await?;
    let view = with_permissions(&txn, created).await?;
    txn.commit().await?;

    tracing::info!(role = %view.name, permissions = view.permissions.len(), "role created");
    Ok(view)
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<role::Model>, StockroomError> {
    Ok(Role::find_by_id(id).one(db).await?)
}

pub async fn find_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<role::Model>, StockroomError> {
    Ok(Role::find()
        .filter(role::Column::Name.eq(name))
        .one(db)
        .await?)
}

/// Fetch a role with its permissions, or `NotFound`.
pub async fn get(db: &DatabaseConnection, id: i32) -> Result<RoleView, StockroomError> {
    let role = find_by_id(db, id).await?.ok_or_else(role_not_found)?;
    with_permissions(db, role).await
}

/// Newest first, optionally narrowed by a name/description search.
pub async fn list(
    db: &DatabaseConnection,
    pagination: Pagination,
    search: Option<&str>,
) -> Result<Page<RoleView>, StockroomError> {
    let pagination = pagination.clamped();
    let mut query = Role::find();
    if let Some(term) = non_blank(search) {
        query = query.filter(
            Condition::any()
                .add(icontains(role::Column::Name, term))
                .add(icontains(role::Column::Description, term)),
        );
    }

    let paginator = query
        .order_by_desc(role::Column::CreatedAt)
        .order_by_desc(role::Column::Id)
        .paginate(db, pagination.limit);
    let total = paginator.num_items().await?;

    let mut items = Vec::new();
    for role in paginator.fetch_page(pagination.index()).await? {
        items.push(with_permissions(db, role).await?);
    }

    Ok(Page {
        items,
        pagination: PageInfo::new(pagination.page, pagination.limit, total),
    })
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    changes: RoleChanges,
) -> Result<RoleView, StockroomError> {
    let existing = find_by_id(db, id).await?.ok_or_else(role_not_found)?;

    let mut active: role::ActiveModel = existing.clone().into();
    if let Some(name) = changes.name.as_deref() {
        let name = trimmed_name(name)?;
        if name != existing.name {
            ensure_name_free(db, &name).await?;
        }
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(now());

    let updated = active.update(db).await?;
    with_permissions(db, updated).await
}

/// Delete a role and its permission links. User assignments are left in
/// place and skipped at login.
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), StockroomError> {
    let existing = find_by_id(db, id).await?.ok_or_else(role_not_found)?;

    let txn = db.begin().await?;
    RolePermission::delete_many()
        .filter(role_permission::Column::RoleId.eq(existing.id))
        .exec(&txn)
        .await?;
    Role::delete_by_id(existing.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(role = %existing.name, "role deleted");
    Ok(())
}

/// Replace the role's permission set. Every id must exist.
pub async fn assign_permissions(
    db: &DatabaseConnection,
    role_id: i32,
    permission_ids: &[i32],
) -> Result<RoleView, StockroomError> {
    let role = find_by_id(db, role_id).await?.ok_or_else(role_not_found)?;
    let permission_ids = checked_permission_ids(db, permission_ids).await?;

    let txn = db.begin().await?;
    replace_links(&txn, role.id, &permission_ids).await?;
    let mut active: role::ActiveModel = role.into();
    active.updated_at = Set(now());
    let touched = active.update(&txn).await?;
    let view = with_permissions(&txn, touched).await?;
    txn.commit().await?;

    tracing::info!(role = %view.name, permissions = view.permissions.len(), "role permissions replaced");
    Ok(view)
}

/// Name candidates for a copy of `name`, in probing order.
pub fn clone_names(name: &str) -> impl Iterator<Item = String> + '_ {
    std::iter::once(format!("Copy of {name}"))
        .chain((1u32..).map(move |n| format!("Copy of {name} ({n})")))
}

/// Copy a role and its permission set under the first free `Copy of` name.
pub async fn clone(db: &DatabaseConnection, id: i32) -> Result<RoleView, StockroomError> {
    let source = get(db, id).await?;

    let txn = db.begin().await?;
    let mut name = String::new();
    for candidate in clone_names(&source.name) {
        let taken = Role::find()
            .filter(role::Column::Name.eq(candidate.as_str()))
            .one(&txn)
            .await?
            .is_some();
        if !taken {
            name = candidate;
            break;
        }
    }

    let now = now();
    let created = role::ActiveModel {
        name: Set(name),
        description: Set(source.description.clone()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let permission_ids: Vec<i32> = source.permissions.iter().map(|p| p.id).collect();
    replace_links(&txn, created.id, &permission_ids).await?;
    let view = with_permissions(&txn, created).await?;
    txn.commit().await?;

    tracing::info!(source = %source.name, role = %view.name, "role cloned");
    Ok(view)
}
