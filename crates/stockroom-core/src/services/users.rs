use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use sea_orm::sea_query::Query;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::password::hash_password;
use crate::error::StockroomError;
use crate::extractors::Pagination;
use crate::models::{role, user, user_role, Role, User, UserRole};
use crate::response::PageInfo;

use super::{icontains, non_blank, not_blank, now, trimmed_name, Page};

/// A user with their assigned roles. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub is_active: bool,
    pub roles: Vec<role::Model>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl UserView {
    fn new(user: user::Model, roles: Vec<role::Model>) -> Self {
        UserView {
            id: user.id,
            name: user.name,
            email: user.email,
            is_active: user.is_active,
            roles,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    /// Role ids to assign on creation.
    #[serde(default)]
    pub roles: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UserChanges {
    #[validate(
        length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    /// Full replacement of the role set when present.
    pub roles: Option<Vec<i32>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub search: Option<String>,
    /// Role name.
    pub role: Option<String>,
}

/// Emails are compared and stored lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn user_not_found() -> StockroomError {
    StockroomError::NotFound("User not found".to_string())
}

async fn ensure_email_free<C: ConnectionTrait>(db: &C, email: &str) -> Result<(), StockroomError> {
    let taken = User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await?
        .is_some();
    if taken {
        return Err(StockroomError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }
    Ok(())
}

/// De-duplicate `ids` and check every one names an existing role.
async fn checked_role_ids<C: ConnectionTrait>(
    db: &C,
    ids: &[i32],
) -> Result<Vec<i32>, StockroomError> {
    let unique: Vec<i32> = ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    if unique.is_empty() {
        return Ok(unique);
    }

    let found = Role::find()
        .filter(role::Column::Id.is_in(unique.clone()))
        .count(db)
        .await?;
    if found != unique.len() as u64 {
        return Err(StockroomError::BadRequest(
            "One or more roles not found".to_string(),
        ));
    }
    Ok(unique)
}

async fn replace_links<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    role_ids: &[i32],
) -> Result<(), StockroomError> {
    UserRole::delete_many()
        .filter(user_role::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    if role_ids.is_empty() {
        return Ok(());
    }

    let now = now();
    let links = role_ids.iter().map(|&role_id| user_role::ActiveModel {
        user_id: Set(user_id),
        role_id: Set(role_id),
        created_at: Set(now),
        ..Default::default()
    });
    UserRole::insert_many(links).exec(db).await?;
    Ok(())
}

async fn with_roles<C: ConnectionTrait>(
    db: &C,
    user: user::Model,
) -> Result<UserView, StockroomError> {
    let roles = user
        .find_related(Role)
        .order_by_asc(role::Column::Name)
        .all(db)
        .await?;
    Ok(UserView::new(user, roles))
}

pub async fn create(db: &DatabaseConnection, input: NewUser) -> Result<UserView, StockroomError> {
    let name = trimmed_name(&input.name)?;
    let email = normalize_email(&input.email);
    ensure_email_free(db, &email).await?;
    let role_ids = checked_role_ids(db, &input.roles).await?;
    let password_hash = hash_password(&input.password)?;

    let txn = db.begin().await?;
    let now = now();
    let created = user::ActiveModel {
        name: Set(name),
        email: Set(email),
        password_hash: Set(password_hash),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;
    replace_links(&txn, created.id, &role_ids).await?;
    let view = with_roles(&txn, created).await?;
    txn.commit().await?;

    tracing::info!(user_id = view.id, roles = view.roles.len(), "user created");
    Ok(view)
}

pub async fn find_by_id(
    db: &DatabaseConnection,
    id: i32,
) -> Result<Option<user::Model>, StockroomError> {
    Ok(User::find_by_id(id).one(db).await?)
}

/// Look a user up by email, case-insensitively.
pub async fn find_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user::Model>, StockroomError> {
    Ok(User::find()
        .filter(user::Column::Email.eq(normalize_email(email)))
        .one(db)
        .await?)
}

/// Fetch a user with their roles, or `NotFound`.
pub async fn get(db: &DatabaseConnection, id: i32) -> Result<UserView, StockroomError> {
    let user = find_by_id(db, id).await?.ok_or_else(user_not_found)?;
    with_roles(db, user).await
}

/// Active users only, newest first.
///
/// `role` narrows to holders of the named role; an unknown role name yields
/// an empty page.
pub async fn list(
    db: &DatabaseConnection,
    pagination: Pagination,
    filter: &UserFilter,
) -> Result<Page<UserView>, StockroomError> {
    let pagination = pagination.clamped();
    let mut query = User::find().filter(user::Column::IsActive.eq(true));

    if let Some(term) = non_blank(filter.search.as_deref()) {
        query = query.filter(
            Condition::any()
                .add(icontains(user::Column::Name, term))
                .add(icontains(user::Column::Email, term)),
        );
    }

    if let Some(role_name) = non_blank(filter.role.as_deref()) {
        let role_id = Role::find()
            .filter(role::Column::Name.eq(role_name))
            .one(db)
            .await?
            .map(|r| r.id);
        let Some(role_id) = role_id else {
            return Ok(Page {
                items: Vec::new(),
                pagination: PageInfo::new(pagination.page, pagination.limit, 0),
            });
        };
        query = query.filter(
            user::Column::Id.in_subquery(
                Query::select()
                    .column(user_role::Column::UserId)
                    .from(UserRole)
                    .and_where(user_role::Column::RoleId.eq(role_id))
                    .to_owned(),
            ),
        );
    }

    let paginator = query
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .paginate(db, pagination.limit);
    let total = paginator.num_items().await?;

    let mut items = Vec::new();
    for user in paginator.fetch_page(pagination.index()).await? {
        items.push(with_roles(db, user).await?);
    }

    Ok(Page {
        items,
        pagination: PageInfo::new(pagination.page, pagination.limit, total),
    })
}

pub async fn update(
    db: &DatabaseConnection,
    id: i32,
    changes: UserChanges,
) -> Result<UserView, StockroomError> {
    let existing = find_by_id(db, id).await?.ok_or_else(user_not_found)?;

    let name = changes.name.as_deref().map(trimmed_name).transpose()?;
    let email = changes.email.as_deref().map(normalize_email);
    if let Some(email) = email.as_deref() {
        if email != existing.email {
            ensure_email_free(db, email).await?;
        }
    }
    let role_ids = match changes.roles.as_deref() {
        Some(ids) => Some(checked_role_ids(db, ids).await?),
        None => None,
    };

    let txn = db.begin().await?;
    let mut active: user::ActiveModel = existing.into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(email) = email {
        active.email = Set(email);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(now());
    let updated = active.update(&txn).await?;

    if let Some(role_ids) = role_ids {
        replace_links(&txn, updated.id, &role_ids).await?;
    }
    let view = with_roles(&txn, updated).await?;
    txn.commit().await?;

    Ok(view)
}

/// Replace the user's role set. Every id must exist.
pub async fn assign_roles(
    db: &DatabaseConnection,
    user_id: i32,
    role_ids: &[i32],
) -> Result<UserView, StockroomError> {
    let user = find_by_id(db, user_id).await?.ok_or_else(user_not_found)?;
    let role_ids = checked_role_ids(db, role_ids).await?;

    let txn = db.begin().await?;
    replace_links(&txn, user.id, &role_ids).await?;
    let view = with_roles(&txn, user).await?;
    txn.commit().await?;

    tracing::info!(user_id, roles = view.roles.len(), "user roles replaced");
    Ok(view)
}

async fn set_active(
    db: &DatabaseConnection,
    id: i32,
    is_active: bool,
) -> Result<user::Model, StockroomError> {
    let existing = find_by_id(db, id).await?.ok_or_else(user_not_found)?;
    let mut active: user::ActiveModel = existing.into();
    active.is_active = Set(is_active);
    active.updated_at = Set(now());
    let updated = active.update(db).await?;

    tracing::info!(user_id = id, is_active, "user activation changed");
    Ok(updated)
}

/// Soft-delete: the user stays in the store but can no longer log in.
pub async fn deactivate(db: &DatabaseConnection, id: i32) -> Result<(), StockroomError> {
    set_active(db, id, false).await.map(|_| ())
}

pub async fn activate(db: &DatabaseConnection, id: i32) -> Result<UserView, StockroomError> {
    let user = set_active(db, id, true).await?;
    with_roles(db, user).await
}
