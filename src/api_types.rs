use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::StatusHistory;
use crate::models::permission::{Permission, PermissionCategory};
use crate::models::role::Role;
use crate::models::service::{ServiceRequest, StatusCount};
use crate::models::user::AuthUser;
use crate::models::workflow::{TransitionOutcome, WorkflowAction};

/// Generic paginated response wrapper for API endpoints.
#[derive(Serialize, Debug, Clone)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

/// Items to skip for a 1-based `page`. Out-of-range pages saturate to an
/// offset past the end instead of overflowing.
pub fn page_offset(page: i64, per_page: i64) -> usize {
    let skipped = page.saturating_sub(1).max(0).saturating_mul(per_page.max(0));
    usize::try_from(skipped).unwrap_or(usize::MAX)
}

/// API error response.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// User response for API (no password hash).
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiUserResponse {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub role_label: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<AuthUser> for ApiUserResponse {
    fn from(u: AuthUser) -> Self {
        ApiUserResponse {
            id: u.id,
            full_name: u.full_name,
            email: u.email,
            role: u.role,
            role_label: u.role.label().to_string(),
            active: u.active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

/// Create/update user request for API.
#[derive(Deserialize, Debug)]
pub struct ApiUserRequest {
    pub full_name: String,
    pub email: String,
    pub password: Option<String>, // required for create, optional for update
    pub role: Role,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signed-in user with the effective permission set.
#[derive(Serialize, Deserialize, Debug)]
pub struct MeResponse {
    pub user: ApiUserResponse,
    pub permissions: BTreeSet<Permission>,
}

/// Service list row.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ApiServiceItem {
    pub id: String,
    pub client_name: String,
    pub client_email: String,
    pub status: Option<String>,
    pub status_label: Option<String>,
    pub process_number: Option<String>,
    pub document_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&ServiceRequest> for ApiServiceItem {
    fn from(s: &ServiceRequest) -> Self {
        ApiServiceItem {
            id: s.id.clone(),
            client_name: s.user.full_name.clone(),
            client_email: s.user.email.clone(),
            status: s.status.map(|st| st.code().to_string()),
            status_label: s.status.map(|st| st.label().to_string()),
            process_number: s.process_number.clone(),
            document_count: s.documents.len(),
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

/// Full service detail with what the viewer may do next.
#[derive(Serialize, Debug)]
pub struct ApiServiceDetail {
    pub service: ServiceRequest,
    pub available_actions: Vec<WorkflowAction>,
    pub history: Vec<StatusHistory>,
}

/// Body for every workflow action; only the fields the action needs are read.
#[derive(Deserialize, Debug, Default)]
pub struct TransitionRequest {
    #[serde(default)]
    pub justification: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub process_number: Option<String>,
    #[serde(default)]
    pub process_password: Option<String>,
    /// `updated_at` the caller last saw; stale writes are rejected.
    #[serde(default)]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
pub struct TransitionResponse {
    pub service: ServiceRequest,
    pub outcome: TransitionOutcome,
}

#[derive(Deserialize, Debug)]
pub struct ApplicantUpdateRequest {
    #[serde(flatten)]
    pub person: crate::models::service::PersonUpdate,
    #[serde(default)]
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Query string accepted by the service list.
#[derive(Deserialize, Debug, Default)]
pub struct ServiceListQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct StatisticsResponse {
    pub total: usize,
    pub by_status: Vec<StatusCount>,
}

#[derive(Serialize, Debug)]
pub struct PermissionInfo {
    pub permission: Permission,
    pub category: PermissionCategory,
}

#[derive(Serialize, Debug)]
pub struct RolePermissionsResponse {
    pub role: Role,
    pub label: &'static str,
    pub permissions: BTreeSet<Permission>,
}

/// Role configuration tokens are taken raw so unknown ones can be reported.
#[derive(Deserialize, Debug)]
pub struct RolePermissionsUpdate {
    pub permissions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_counts_from_page_one() {
        assert_eq!(page_offset(1, 25), 0);
        assert_eq!(page_offset(3, 25), 50);
        assert_eq!(page_offset(0, 25), 0);
    }

    #[test]
    fn page_offset_saturates_on_huge_pages() {
        assert_eq!(page_offset(i64::MAX, 100), usize::try_from(i64::MAX).unwrap_or(usize::MAX));
        assert_eq!(page_offset(2, i64::MAX), usize::try_from(i64::MAX).unwrap_or(usize::MAX));
    }
}
