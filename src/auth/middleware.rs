use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
};

use crate::api_types::ApiErrorResponse;

/// Reject requests without a signed-in user with 401.
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    let has_user = session.get::<String>("user_id").unwrap_or(None).is_some();

    if !has_user {
        let response = HttpResponse::Unauthorized().json(ApiErrorResponse {
            error: "Not authenticated".to_string(),
            details: None,
        });
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Mutations must be JSON. Browsers cannot send cross-origin JSON with
/// cookies through a plain form post, so this doubles as a CSRF guard.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
