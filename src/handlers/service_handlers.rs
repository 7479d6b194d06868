use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::api_types::{
    ApiServiceDetail, ApiServiceItem, ApplicantUpdateRequest, PaginatedResponse,
    ServiceListQuery, TransitionRequest, TransitionResponse, page_offset,
};
use crate::audit;
use crate::auth::permissions::PermissionStore;
use crate::auth::session::require_permission;
use crate::db::KeyValueStore;
use crate::errors::AppError;
use crate::models::permission::Permission;
use crate::models::service::{
    self, NewDocument, ServiceFilters, ServiceRepository, ServiceRequest, ServiceStatus, SortSpec,
};
use crate::models::user::AuthUser;
use crate::models::workflow::{self, Transition, WorkflowAction};
use crate::notify::Notifier;

/// Load a request the user's phase permissions allow them to see. Hidden
/// requests answer 404 so their existence is not disclosed.
fn load_visible(
    services: &ServiceRepository,
    permissions: &PermissionStore,
    user: &AuthUser,
    id: &str,
) -> Result<ServiceRequest, AppError> {
    let svc = services.find_by_id(id)?;
    if !permissions.can_view(user.role, &svc) {
        log::info!("{} denied phase access to service {}", user.email, id);
        return Err(AppError::NotFound);
    }
    Ok(svc)
}

/// GET /api/services
/// Query params: search, status, date_from, date_to, sort, dir, page (default 1), per_page (default 25)
pub async fn list(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    query: web::Query<ServiceListQuery>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::ViewServices)?;

    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            raw.parse::<ServiceStatus>()
                .map_err(|e| AppError::validation("status", e))?,
        ),
        None => None,
    };
    let filters = ServiceFilters {
        search: query.search.clone(),
        status,
        date_from: query.date_from,
        date_to: query.date_to,
    };

    let visible = permissions.filter_by_phase_permission(user.role, services.find_all()?);
    let mut matched = service::search(visible, &filters);
    service::sort(&mut matched, &SortSpec::from_params(query.sort.as_deref(), query.dir.as_deref()));

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let total = matched.len() as i64;
    let items = matched
        .iter()
        .skip(page_offset(page, per_page))
        .take(per_page as usize)
        .map(ApiServiceItem::from)
        .collect();

    Ok(HttpResponse::Ok().json(PaginatedResponse { items, page, per_page, total }))
}

/// GET /api/services/{id}
pub async fn detail(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::ViewServices)?;
    let mut svc = load_visible(&services, &permissions, &user, &path)?;

    let available_actions = if permissions.has_permission(user.role, Permission::ChangeStatus) {
        workflow::available_actions(svc.status)
    } else {
        Vec::new()
    };
    if !permissions.has_permission(user.role, Permission::ViewDocuments) {
        svc.documents.clear();
    }
    let history = audit::find_for_service(store.get_ref(), &svc.id)?;

    Ok(HttpResponse::Ok().json(ApiServiceDetail { service: svc, available_actions, history }))
}

/// PUT /api/services/{id}/applicant
pub async fn update_applicant(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<ApplicantUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::EditService)?;
    load_visible(&services, &permissions, &user, &path)?;

    let updated = services.update_applicant(&path, &body.person, body.expected_updated_at)?;
    log::info!("{} updated applicant data of service {}", user.email, updated.id);
    Ok(HttpResponse::Ok().json(updated))
}

/// Build the transition for `action`. Missing payload fields become empty
/// strings so the field validation reports them.
fn build_transition(action: WorkflowAction, body: &TransitionRequest) -> Transition {
    let field = |v: &Option<String>| v.clone().unwrap_or_default();
    match action {
        WorkflowAction::Approve => Transition::Approve,
        WorkflowAction::Almost => Transition::Almost { justification: field(&body.justification) },
        WorkflowAction::EnterIrnData => Transition::EnterIrnData {
            entity: field(&body.entity),
            reference: field(&body.reference),
        },
        WorkflowAction::ClientConfirmPayment => Transition::ClientConfirmPayment,
        WorkflowAction::GovernmentConfirmPayment => Transition::GovernmentConfirmPayment,
        WorkflowAction::SubmitProcess => Transition::SubmitProcess {
            process_number: field(&body.process_number),
            process_password: field(&body.process_password),
        },
    }
}

async fn run_transition(
    action: WorkflowAction,
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    notifier: web::Data<dyn Notifier>,
    session: Session,
    id: String,
    body: Option<web::Json<TransitionRequest>>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::ChangeStatus)?;
    load_visible(&services, &permissions, &user, &id)?;

    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let transition = build_transition(action, &body);
    let (svc, outcome) = services.apply_transition(
        &id,
        &transition,
        body.expected_updated_at,
        &user.id,
        notifier.get_ref(),
    )?;
    log::info!("{} applied {} to service {}", user.email, action, id);
    Ok(HttpResponse::Ok().json(TransitionResponse { service: svc, outcome }))
}

macro_rules! transition_handler {
    ($name:ident, $action:expr, $route:literal) => {
        #[doc = concat!("POST /api/services/{id}/", $route)]
        pub async fn $name(
            store: web::Data<dyn KeyValueStore>,
            services: web::Data<ServiceRepository>,
            permissions: web::Data<PermissionStore>,
            notifier: web::Data<dyn Notifier>,
            session: Session,
            path: web::Path<String>,
            body: Option<web::Json<TransitionRequest>>,
        ) -> Result<HttpResponse, AppError> {
            run_transition($action, store, services, permissions, notifier, session, path.into_inner(), body).await
        }
    };
}

transition_handler!(approve, WorkflowAction::Approve, "approve");
transition_handler!(almost, WorkflowAction::Almost, "almost");
transition_handler!(enter_irn, WorkflowAction::EnterIrnData, "irn");
transition_handler!(client_confirm, WorkflowAction::ClientConfirmPayment, "client-confirm");
transition_handler!(government_confirm, WorkflowAction::GovernmentConfirmPayment, "government-confirm");
transition_handler!(submit, WorkflowAction::SubmitProcess, "submit");

/// POST /api/services/{id}/documents
pub async fn add_document(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<String>,
    body: web::Json<NewDocument>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::UploadDocuments)?;
    load_visible(&services, &permissions, &user, &path)?;

    let document = services.add_document(&path, &body)?;
    log::info!("{} attached document {} to service {}", user.email, document.id, path);
    Ok(HttpResponse::Created().json(document))
}

/// DELETE /api/services/{id}/documents/{doc_id}
pub async fn delete_document(
    store: web::Data<dyn KeyValueStore>,
    services: web::Data<ServiceRepository>,
    permissions: web::Data<PermissionStore>,
    session: Session,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let user = require_permission(&session, store.get_ref(), &permissions, Permission::DeleteDocuments)?;
    let (id, doc_id) = path.into_inner();
    load_visible(&services, &permissions, &user, &id)?;

    services.remove_document(&id, &doc_id)?;
    log::info!("{} removed document {} from service {}", user.email, doc_id, id);
    Ok(HttpResponse::NoContent().finish())
}
