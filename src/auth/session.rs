use actix_session::Session;

use crate::auth::permissions::PermissionStore;
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::user::{self, AuthUser};

pub fn get_user_id(session: &Session) -> Option<String> {
    session.get::<String>("user_id").unwrap_or(None)
}

/// Resolve the signed-in user. Deleted or deactivated accounts end the session.
pub fn current_user(session: &Session, store: &dyn KeyValueStore) -> Result<AuthUser, AppError> {
    let user_id = get_user_id(session)
        .ok_or_else(|| AppError::Session("Not authenticated".to_string()))?;
    match user::find_by_id(store, &user_id)? {
        Some(u) if u.active => Ok(u),
        Some(_) => {
            session.purge();
            Err(AppError::Session("Account is inactive".to_string()))
        }
        None => {
            session.purge();
            Err(AppError::Session("Unknown user".to_string()))
        }
    }
}

/// Resolve the signed-in user and check one permission.
pub fn require_permission(
    session: &Session,
    store: &dyn KeyValueStore,
    permissions: &PermissionStore,
    permission: Permission,
) -> Result<AuthUser, AppError> {
    let user = current_user(session, store)?;
    permissions.require(user.role, permission)?;
    Ok(user)
}
