pub mod auth_handlers;
pub mod dashboard;
pub mod role_handlers;
pub mod service_handlers;
pub mod user_handlers;

use actix_web::{middleware::from_fn, web};

use crate::auth::middleware::{require_auth, require_json_content_type};

/// Register every route. Shared state (`dyn KeyValueStore`, `ServiceRepository`,
/// `PermissionStore`, `dyn Notifier`) must already be in the app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Public
    cfg.service(
        web::resource("/login")
            .wrap(from_fn(require_json_content_type))
            .route(web::post().to(auth_handlers::login)),
    );

    // Protected
    cfg.service(
        web::scope("")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/logout", web::post().to(auth_handlers::logout))
            .route("/me", web::get().to(auth_handlers::me))
            .service(
                web::scope("/api/services")
                    .route("", web::get().to(service_handlers::list))
                    .route("/{id}", web::get().to(service_handlers::detail))
                    .route("/{id}/applicant", web::put().to(service_handlers::update_applicant))
                    .route("/{id}/approve", web::post().to(service_handlers::approve))
                    .route("/{id}/almost", web::post().to(service_handlers::almost))
                    .route("/{id}/irn", web::post().to(service_handlers::enter_irn))
                    .route("/{id}/client-confirm", web::post().to(service_handlers::client_confirm))
                    .route("/{id}/government-confirm", web::post().to(service_handlers::government_confirm))
                    .route("/{id}/submit", web::post().to(service_handlers::submit))
                    .route("/{id}/documents", web::post().to(service_handlers::add_document))
                    .route("/{id}/documents/{doc_id}", web::delete().to(service_handlers::delete_document)),
            )
            .route("/api/statistics", web::get().to(dashboard::statistics))
            .service(
                web::scope("/api/users")
                    .route("", web::get().to(user_handlers::list))
                    .route("", web::post().to(user_handlers::create))
                    .route("/{id}", web::get().to(user_handlers::read))
                    .route("/{id}", web::put().to(user_handlers::update))
                    .route("/{id}", web::delete().to(user_handlers::delete)),
            )
            // /api/roles/permissions/reset before /api/roles/{role}/permissions
            .route("/api/roles/permissions/reset", web::post().to(role_handlers::reset))
            .route("/api/roles/permissions", web::get().to(role_handlers::list))
            .route("/api/roles/{role}/permissions", web::put().to(role_handlers::update)),
    );
}
