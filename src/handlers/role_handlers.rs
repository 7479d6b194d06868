//! Profile configuration: the per-role permission map. Only administrators
//! may read or change it, whatever their permission set says.

use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::api_types::{PermissionInfo, RolePermissionsResponse, RolePermissionsUpdate};
use crate::auth::permissions::PermissionStore;
use crate::auth::session::current_user;
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::models::user::AuthUser;

fn require_admin(session: &Session, store: &dyn KeyValueStore) -> Result<AuthUser, AppError> {
    let user = current_user(session, store)?;
    if user.role != Role::Admin {
        return Err(AppError::PermissionDenied(
            "Only administrators can configure profiles".to_string(),
        ));
    }
    Ok(user)
}

fn role_map(permissions: &PermissionStore) -> Vec<RolePermissionsResponse> {
    permissions
        .effective_map()
        .into_iter()
        .map(|(role, perms)| RolePermissionsResponse {
            role,
            label: role.label(),
            permissions: perms,
        })
        .collect()
}

/// GET /api/roles/permissions - effective map plus the permission catalogue.
pub async fn list(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_admin(&session, store.get_ref())?;

    let catalogue: Vec<PermissionInfo> = Permission::ALL
        .into_iter()
        .map(|p| PermissionInfo { permission: p, category: p.category() })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "roles": role_map(&permissions),
        "permissions": catalogue,
    })))
}

/// PUT /api/roles/{role}/permissions - replace one role's set.
pub async fn update(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<RolePermissionsUpdate>,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session, store.get_ref())?;

    let role: Role = path.parse().map_err(AppError::Configuration)?;
    let saved = permissions.update_role_permissions(role.code(), body.permissions.as_slice())?;
    log::info!("{} set {} permission(s) on role {}", admin.email, saved.len(), role);

    Ok(HttpResponse::Ok().json(RolePermissionsResponse {
        role,
        label: role.label(),
        permissions: saved,
    }))
}

/// POST /api/roles/permissions/reset
pub async fn reset(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let admin = require_admin(&session, store.get_ref())?;

    permissions.reset_to_default()?;
    log::info!("{} reset role permissions to defaults", admin.email);

    Ok(HttpResponse::Ok().json(role_map(&permissions)))
}
