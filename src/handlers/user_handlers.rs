use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::api_types::{ApiErrorResponse, ApiUserRequest, ApiUserResponse, PaginatedResponse, page_offset};
use crate::auth::permissions::PermissionStore;
use crate::auth::session::require_permission;
use crate::auth::{password, validate};
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::user::{self, NewUser, UserUpdate};

fn validation_failed(errors: Vec<String>) -> HttpResponse {
    HttpResponse::UnprocessableEntity().json(ApiErrorResponse {
        error: "Validation failed".to_string(),
        details: Some(errors.join("; ")),
    })
}

/// GET /api/users - List users with pagination
/// Query params: page (default 1), per_page (default 25)
pub async fn list(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    query: web::Query<std::collections::HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, store.get_ref(), &permissions, Permission::ViewUsers)?;

    let page = query
        .get("page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(1)
        .max(1);
    let per_page = query
        .get("per_page")
        .and_then(|p| p.parse::<i64>().ok())
        .unwrap_or(25)
        .clamp(1, 100);

    let mut users = user::find_all(store.get_ref())?;
    users.sort_by(|a, b| a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase()));
    let total = users.len() as i64;

    let response = PaginatedResponse {
        items: users
            .into_iter()
            .skip(page_offset(page, per_page))
            .take(per_page as usize)
            .map(ApiUserResponse::from)
            .collect(),
        page,
        per_page,
        total,
    };

    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/users/{id}
pub async fn read(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, store.get_ref(), &permissions, Permission::ViewUsers)?;

    let u = user::find_by_id(store.get_ref(), &path)?.ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(ApiUserResponse::from(u)))
}

/// POST /api/users
pub async fn create(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    body: web::Json<ApiUserRequest>,
) -> Result<HttpResponse, AppError> {
    let admin = require_permission(&session, store.get_ref(), &permissions, Permission::ManageUsers)?;

    let mut errors = Vec::new();
    errors.extend(validate::validate_full_name(&body.full_name));
    errors.extend(validate::validate_email(&body.email));
    match &body.password {
        Some(pwd) => errors.extend(validate::validate_password(pwd)),
        None => errors.push("Password required for user creation".to_string()),
    }
    let Some(pwd) = body.password.clone().filter(|_| errors.is_empty()) else {
        return Ok(validation_failed(errors));
    };
    let password_hash = password::hash_password_blocking(pwd).await?;

    let created = user::create(
        store.get_ref(),
        NewUser {
            full_name: body.full_name.clone(),
            email: body.email.clone(),
            password_hash,
            role: body.role,
        },
    )?;
    log::info!("{} created user {}", admin.email, created.email);

    Ok(HttpResponse::Created().json(ApiUserResponse::from(created)))
}

/// PUT /api/users/{id}
pub async fn update(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<ApiUserRequest>,
) -> Result<HttpResponse, AppError> {
    let admin = require_permission(&session, store.get_ref(), &permissions, Permission::ManageUsers)?;
    let user_id = path.into_inner();

    let mut errors = Vec::new();
    errors.extend(validate::validate_full_name(&body.full_name));
    errors.extend(validate::validate_email(&body.email));
    if let Some(pwd) = &body.password {
        errors.extend(validate::validate_password(pwd));
    }
    if !errors.is_empty() {
        return Ok(validation_failed(errors));
    }

    // An administrator cannot lock themselves out
    if user_id == admin.id && (body.active == Some(false) || body.role != admin.role) {
        return Err(AppError::PermissionDenied(
            "Cannot deactivate or change the role of your own account".to_string(),
        ));
    }

    let password_hash = match &body.password {
        Some(pwd) => Some(password::hash_password_blocking(pwd.clone()).await?),
        None => None,
    };
    let updated = user::update(
        store.get_ref(),
        &user_id,
        UserUpdate {
            full_name: Some(body.full_name.clone()),
            email: Some(body.email.clone()),
            password_hash,
            role: Some(body.role),
            active: body.active,
        },
    )?;
    log::info!("{} updated user {}", admin.email, updated.email);

    Ok(HttpResponse::Ok().json(ApiUserResponse::from(updated)))
}

/// DELETE /api/users/{id}
pub async fn delete(
    store: web::Data<dyn KeyValueStore>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let admin = require_permission(&session, store.get_ref(), &permissions, Permission::ManageUsers)?;
    let user_id = path.into_inner();

    if user_id == admin.id {
        return Err(AppError::PermissionDenied("Cannot delete your own account".to_string()));
    }

    user::delete(store.get_ref(), &user_id)?;
    Ok(HttpResponse::NoContent().finish())
}
