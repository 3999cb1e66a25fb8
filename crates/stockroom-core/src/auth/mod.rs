pub mod claims;
pub mod gate;
pub mod middleware;
pub mod password;
pub mod token;

pub use claims::{assemble, resolve_effective_access, EffectiveAccess, RoleGrant};
pub use gate::{
    authenticate, authorize, permission_matches, require_any_role, require_permission, GateError,
    Identity, Requirement,
};
pub use password::{hash_password, verify_password};
pub use token::{extract_bearer, Claims, TokenCodec, TOKEN_TTL_HOURS};
