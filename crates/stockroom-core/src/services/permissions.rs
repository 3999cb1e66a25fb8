use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Deserialize;
use validator::Validate;

use crate::error::StockroomError;
use crate::extractors::Pagination;
use crate::models::permission::{self, feature_of};
use crate::models::Permission;
use crate::response::PageInfo;

use super::{icontains, non_blank, now, Page};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPermission {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
    /// Defaults to the prefix of `name`; must match it when given.
    #[validate(length(min = 1, max = 50, message = "Feature must be between 1 and 50 characters"))]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PermissionChanges {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 500, message = "Description must be less than 500 characters"))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Feature must be between 1 and 50 characters"))]
    pub feature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionFilter {
    pub feature: Option<String>,
    pub search: Option<String>,
}

/// Resolve and check the feature of a permission name.
fn checked_feature(name: &str, feature: Option<&str>) -> Result<String, StockroomError> {
    let derived = feature_of(name).ok_or_else(|| {
        StockroomError::BadRequest(
            "Permission name must have the form <feature>.<action>".to_string(),
        )
    })?;
    match feature {
        Some(given) if given != derived => Err(StockroomError::BadRequest(
            "Permission feature must match its name prefix".to_string(),
        )),
        _ => Ok(derived.to_string()),
    }
}

async fn ensure_name_free(db: &DatabaseConnection, name: &str) -> Result<(), StockroomError> {
    if find_by_name(db, name).await?.is_some() {
        return Err(StockroomError::Conflict(
            "Permission with this name already exists".to_string(),
        ));
    }
    Ok(())
}

pub async fn create(
    db: &DatabaseConnection,
    input: NewPermission,
) -> Result<permission::Model, StockroomError> {
    let name = input.name.trim().to_string();
    let feature = checked_feature(&name, input.feature.as_deref())?;
    ensure_name_free(db, &name).await?;

    let now = now();
    let created = permission::ActiveModel {
        name: Set(name),
        feature: Set(feature),
        description: Set(input.description),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(permission = %created.name, "permission created");
    Ok(created)
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<permission::Model>, StockroomError> {
    Ok(Permission::find_by_id(id).one(db).await?)
}

pub async fn find_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<permission::Model>, StockroomError> {
    Ok(Permission::find()
        .filter(permission::Column::Name.eq(name))
        .one(db)
        .await?)
}

/// Like [`find_by_id`], but a missing permission is `NotFound`.
pub async fn get(db: &DatabaseConnection, id: i32) -> Result<permission::Model, StockroomError> {
    find_by_id(db, id)
        .await?
        .ok_or_else(|| StockroomError::NotFound("Permission not found".to_string()))
}

/// Newest first, optionally narrowed to one feature and a name/description search.
pub async fn list(
    db: &DatabaseConnection,
    pagination: Pagination,
    filter: &PermissionFilter,
) -> Result<Page<permission::Model>, StockroomError> {
    let pagination = pagination.clamped();
    let mut query = Permission::find();
    if let Some(feature) = non_blank(filter.feature.as_deref()) {
        query = query.filter(permission::Column::Feature.eq(feature));
    }
    if let Some(term) = non_blank(filter.search.as_deref()) {
        query = query.filter(
            Condition::any()
                .add(icontains(permission::Column::Name, term))
                .add(icontains(permission::Column::Description, term)),
        );
    }

    let paginator = query
        .order_by_desc(permission::Column::CreatedAt)
        .order_by_desc(permission::Column::Id)
        .paginate(db, pagination.limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(pagination.index()).await?;

    Ok(Page {
        items,
        pagination: PageInfo::new(pagination.page, pagination.limit, total),
    })
}

/// Apply the given changes. Renaming re-derives the feature.
pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    changes: PermissionChanges,
) -> Result<permission::Model, StockroomError> {
    let existing = get(db, id).await?;

    let name = changes
        .name
        .as_deref()
        .map(str::trim)
        .unwrap_or(&existing.name)
        .to_string();
    let feature_hint = changes.feature.as_deref();
    let feature = checked_feature(&name, feature_hint)?;

    if name != existing.name {
        ensure_name_free(db, &name).await?;
    }

    let mut active: permission::ActiveModel = existing.into();
    active.name = Set(name);
    active.feature = Set(feature);
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    active.updated_at = Set(now());

    Ok(active.update(db).await?)
}

/// Delete a permission. Role links to it are left behind and skipped at login.
pub async fn delete(db: &DatabaseConnection, id: i32) -> Result<(), StockroomError> {
    let existing = get(db, id).await?;
    Permission::delete_by_id(existing.id).exec(db).await?;
    tracing::info!(permission = %existing.name, "permission deleted");
    Ok(())
}
