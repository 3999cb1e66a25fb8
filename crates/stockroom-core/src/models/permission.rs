use chrono::NaiveDateTime;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Permission entity: one named capability, `<feature>.<action>` or the
/// wildcard `<feature>.*`.
///
/// Permissions reach users only through roles (`role_permissions`).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "permissions")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique dot-namespaced name (e.g. "users.view")
    #[sea_orm(unique)]
    pub name: String,

    /// Namespace prefix of `name` (e.g. "users")
    pub feature: String,

    pub description: Option<String>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::role_permission::Entity")]
    RolePermissions,
}

impl Related<super::role_permission::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RolePermissions.def()
    }
}

impl Related<super::role::Entity> for Entity {
    fn to() -> RelationDef {
        super::role_permission::Relation::Role.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::role_permission::Relation::Permission.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Split a permission name into its feature prefix.
///
/// Returns `None` unless the name has the shape `<feature>.<action>` with both
/// parts non-empty.
pub fn feature_of(name: &str) -> Option<&str> {
    let (feature, action) = name.split_once('.')?;
    if feature.is_empty() || action.is_empty() {
        None
    } else {
        Some(feature)
    }
}
