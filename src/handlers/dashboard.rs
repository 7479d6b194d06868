use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::api_types::StatisticsResponse;
use crate::auth::permissions::PermissionStore;
use crate::auth::session::require_permission;
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::service::{self, ServiceRepository};

/// GET /api/statistics - totals over the requests the user can see.
pub async fn statistics(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::ViewStatistics)?;
    let visible = permissions.filter_by_phase_permission(user.role, services.find_all()?);

    Ok(HttpResponse::Ok().json(StatisticsResponse {
        total: visible.len(),
        by_status: service::status_counts(&visible),
    }))
}
