use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::api_types::{ApiErrorResponse, ApiUserResponse, LoginRequest, MeResponse};
use crate::auth::password;
use crate::auth::permissions::PermissionStore;
use crate::auth::session::current_user;
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::user;

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiErrorResponse {
        error: "Invalid email or password".to_string(),
        details: None,
    })
}

/// POST /login
pub async fn login(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let found = user::find_by_email(store.get_ref(), &body.email)?;

    let Some(u) = found else {
        log::info!("Login failed for unknown email {}", body.email.trim());
        return Ok(invalid_credentials());
    };
    if !u.active {
        log::info!("Login refused for inactive user {}", u.email);
        return Ok(invalid_credentials());
    }
    if !password::verify_password_blocking(body.password.clone(), u.password_hash.clone()).await? {
        log::info!("Login failed for {}", u.email);
        return Ok(invalid_credentials());
    }

    session.renew();
    session
        .insert("user_id", &u.id)
        .map_err(|e| AppError::Session(e.to_string()))?;
    if let Err(e) = user::set_active_user(store.get_ref(), &u.id) {
        log::warn!("Failed to remember active user {}: {}", u.id, e);
    }
    log::info!("User {} signed in as {}", u.email, u.role);

    let perms = permissions.permissions_for(u.role);
    Ok(HttpResponse::Ok().json(MeResponse {
        user: ApiUserResponse::from(u),
        permissions: perms,
    }))
}

/// POST /logout
pub async fn logout(session: Session) -> Result<HttpResponse, AppError> {
    session.purge();
    Ok(HttpResponse::NoContent().finish())
}

/// GET /me
pub async fn me(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let u = current_user(&session, store.get_ref())?;
    let perms = permissions.permissions_for(u.role);
    Ok(HttpResponse::Ok().json(MeResponse {
        user: ApiUserResponse::from(u),
        permissions: perms,
    }))
}
