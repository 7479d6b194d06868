use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::service::ServiceStatus;

/// Capability tokens. Serialized as their snake_case token (`view_services`, `access_step_7`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum Permission {
    ViewServices,
    CreateService,
    EditService,
    DeleteService,
    ChangeStatus,

    ViewDocuments,
    UploadDocuments,
    DeleteDocuments,

    ViewUsers,
    ManageUsers,

    ViewAllServices,
    AssignServices,
    ViewStatistics,
    ExportData,

    AccessStep1,
    AccessStep2,
    AccessStep3,
    AccessStep4,
    AccessStep5,
    AccessStep6,
    AccessStep7,
    AccessStep8,
    AccessCancelled,
    AccessSubmitted,
    AccessUnderAnalysis,
    AccessWaitingResponse,
    AccessForDecision,
    AccessCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionCategory {
    Services,
    Documents,
    Users,
    Special,
    Phase,
}

impl Permission {
    pub const ALL: [Permission; 28] = [
        Permission::ViewServices,
        Permission::CreateService,
        Permission::EditService,
        Permission::DeleteService,
        Permission::ChangeStatus,
        Permission::ViewDocuments,
        Permission::UploadDocuments,
        Permission::DeleteDocuments,
        Permission::ViewUsers,
        Permission::ManageUsers,
        Permission::ViewAllServices,
        Permission::AssignServices,
        Permission::ViewStatistics,
        Permission::ExportData,
        Permission::AccessStep1,
        Permission::AccessStep2,
        Permission::AccessStep3,
        Permission::AccessStep4,
        Permission::AccessStep5,
        Permission::AccessStep6,
        Permission::AccessStep7,
        Permission::AccessStep8,
        Permission::AccessCancelled,
        Permission::AccessSubmitted,
        Permission::AccessUnderAnalysis,
        Permission::AccessWaitingResponse,
        Permission::AccessForDecision,
        Permission::AccessCompleted,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Permission::ViewServices => "view_services",
            Permission::CreateService => "create_service",
            Permission::EditService => "edit_service",
            Permission::DeleteService => "delete_service",
            Permission::ChangeStatus => "change_status",
            Permission::ViewDocuments => "view_documents",
            Permission::UploadDocuments => "upload_documents",
            Permission::DeleteDocuments => "delete_documents",
            Permission::ViewUsers => "view_users",
            Permission::ManageUsers => "manage_users",
            Permission::ViewAllServices => "view_all_services",
            Permission::AssignServices => "assign_services",
            Permission::ViewStatistics => "view_statistics",
            Permission::ExportData => "export_data",
            Permission::AccessStep1 => "access_step_1",
            Permission::AccessStep2 => "access_step_2",
            Permission::AccessStep3 => "access_step_3",
            Permission::AccessStep4 => "access_step_4",
            Permission::AccessStep5 => "access_step_5",
            Permission::AccessStep6 => "access_step_6",
            Permission::AccessStep7 => "access_step_7",
            Permission::AccessStep8 => "access_step_8",
            Permission::AccessCancelled => "access_cancelled",
            Permission::AccessSubmitted => "access_submitted",
            Permission::AccessUnderAnalysis => "access_under_analysis",
            Permission::AccessWaitingResponse => "access_waiting_response",
            Permission::AccessForDecision => "access_for_decision",
            Permission::AccessCompleted => "access_completed",
        }
    }

    pub fn category(self) -> PermissionCategory {
        match self {
            Permission::ViewServices
            | Permission::CreateService
            | Permission::EditService
            | Permission::DeleteService
            | Permission::ChangeStatus => PermissionCategory::Services,
            Permission::ViewDocuments | Permission::UploadDocuments | Permission::DeleteDocuments => {
                PermissionCategory::Documents
            }
            Permission::ViewUsers | Permission::ManageUsers => PermissionCategory::Users,
            Permission::ViewAllServices
            | Permission::AssignServices
            | Permission::ViewStatistics
            | Permission::ExportData => PermissionCategory::Special,
            Permission::AccessStep1
            | Permission::AccessStep2
            | Permission::AccessStep3
            | Permission::AccessStep4
            | Permission::AccessStep5
            | Permission::AccessStep6
            | Permission::AccessStep7
            | Permission::AccessStep8
            | Permission::AccessCancelled
            | Permission::AccessSubmitted
            | Permission::AccessUnderAnalysis
            | Permission::AccessWaitingResponse
            | Permission::AccessForDecision
            | Permission::AccessCompleted => PermissionCategory::Phase,
        }
    }

    /// Phase-access token gating visibility of a request in `status`.
    /// All STEP_7 sub-states share one token, as do all STEP_8 sub-states.
    pub fn for_phase(status: ServiceStatus) -> Permission {
        match status {
            ServiceStatus::Step1 => Permission::AccessStep1,
            ServiceStatus::Step2 => Permission::AccessStep2,
            ServiceStatus::Step3 => Permission::AccessStep3,
            ServiceStatus::Step4 => Permission::AccessStep4,
            ServiceStatus::Step5 => Permission::AccessStep5,
            ServiceStatus::Step6 => Permission::AccessStep6,
            ServiceStatus::Step7
            | ServiceStatus::Step7Waiting
            | ServiceStatus::Step7Approved
            | ServiceStatus::Step7Recused
            | ServiceStatus::Step7Almost => Permission::AccessStep7,
            ServiceStatus::Step8
            | ServiceStatus::Step8ClientConfirmed
            | ServiceStatus::Step8ConfirmedByGovernment => Permission::AccessStep8,
            ServiceStatus::Submitted => Permission::AccessSubmitted,
            ServiceStatus::Cancelled => Permission::AccessCancelled,
            ServiceStatus::UnderAnalysis => Permission::AccessUnderAnalysis,
            ServiceStatus::WaitingResponse => Permission::AccessWaitingResponse,
            ServiceStatus::ForDecision => Permission::AccessForDecision,
            ServiceStatus::Completed => Permission::AccessCompleted,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Permission::ALL
            .into_iter()
            .find(|p| p.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| format!("Unknown permission '{token}'"))
    }
}

impl From<Permission> for &'static str {
    fn from(p: Permission) -> Self {
        p.token()
    }
}

impl TryFrom<String> for Permission {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
