//! The canonical permission catalog.
//!
//! Every name here is `<feature>.<action>`. The seeder creates any that are
//! missing; handlers reference the constants in their gates.

pub const USERS_VIEW: &str = "users.view";
pub const USERS_CREATE: &str = "users.create";
pub const USERS_UPDATE: &str = "users.update";
pub const USERS_DELETE: &str = "users.delete";
pub const USERS_ASSIGN_ROLES: &str = "users.assign_roles";

pub const ROLES_VIEW: &str = "roles.view";
pub const ROLES_CREATE: &str = "roles.create";
pub const ROLES_UPDATE: &str = "roles.update";
pub const ROLES_DELETE: &str = "roles.delete";
pub const ROLES_ASSIGN_PERMISSIONS: &str = "roles.assign_permissions";

pub const PERMISSIONS_VIEW: &str = "permissions.view";
pub const PERMISSIONS_CREATE: &str = "permissions.create";
pub const PERMISSIONS_UPDATE: &str = "permissions.update";
pub const PERMISSIONS_DELETE: &str = "permissions.delete";

pub const BRANDS_VIEW: &str = "brands.view";
pub const BRANDS_CREATE: &str = "brands.create";
pub const BRANDS_UPDATE: &str = "brands.update";
pub const BRANDS_DELETE: &str = "brands.delete";

pub const PRODUCTS_VIEW: &str = "products.view";
pub const PRODUCTS_CREATE: &str = "products.create";
pub const PRODUCTS_UPDATE: &str = "products.update";
pub const PRODUCTS_DELETE: &str = "products.delete";

pub const CATEGORIES_VIEW: &str = "categories.view";
pub const CATEGORIES_CREATE: &str = "categories.create";
pub const CATEGORIES_UPDATE: &str = "categories.update";
pub const CATEGORIES_DELETE: &str = "categories.delete";

/// Name of the role that holds every seeded permission.
pub const ADMIN_ROLE: &str = "admin";

/// Every seeded permission, grouped by feature.
pub const CANONICAL: &[&str] = &[
    USERS_VIEW,
    USERS_CREATE,
    USERS_UPDATE,
    USERS_DELETE,
    USERS_ASSIGN_ROLES,
    ROLES_VIEW,
    ROLES_CREATE,
    ROLES_UPDATE,
    ROLES_DELETE,
    ROLES_ASSIGN_PERMISSIONS,
    PERMISSIONS_VIEW,
    PERMISSIONS_CREATE,
    PERMISSIONS_UPDATE,
    PERMISSIONS_DELETE,
    BRANDS_VIEW,
    BRANDS_CREATE,
    BRANDS_UPDATE,
    BRANDS_DELETE,
    PRODUCTS_VIEW,
    PRODUCTS_CREATE,
    PRODUCTS_UPDATE,
    PRODUCTS_DELETE,
    CATEGORIES_VIEW,
    CATEGORIES_CREATE,
    CATEGORIES_UPDATE,
    CATEGORIES_DELETE,
];

/// Seeded description for a permission: `users.assign_roles` becomes
/// `"users assign roles permission"`.
pub fn describe(name: &str) -> String {
    let words = name.replace(['.', '_'], " ").to_lowercase();
    format!("{words} permission")
}
