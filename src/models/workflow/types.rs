use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::service::ServiceStatus;
use crate::notify::TemplateKind;

/// The manual actions that move a request through the review and IRN phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Approve,
    Almost,
    EnterIrnData,
    ClientConfirmPayment,
    GovernmentConfirmPayment,
    SubmitProcess,
}

impl WorkflowAction {
    pub const ALL: [WorkflowAction; 6] = [
        WorkflowAction::Approve,
        WorkflowAction::Almost,
        WorkflowAction::EnterIrnData,
        WorkflowAction::ClientConfirmPayment,
        WorkflowAction::GovernmentConfirmPayment,
        WorkflowAction::SubmitProcess,
    ];

    /// Statuses from which the action may be taken.
    pub fn preconditions(self) -> &'static [ServiceStatus] {
        match self {
            WorkflowAction::Approve | WorkflowAction::Almost => {
                &[ServiceStatus::Step7, ServiceStatus::Step7Waiting]
            }
            WorkflowAction::EnterIrnData => &[ServiceStatus::Step7Approved],
            WorkflowAction::ClientConfirmPayment => &[ServiceStatus::Step8],
            WorkflowAction::GovernmentConfirmPayment => &[ServiceStatus::Step8ClientConfirmed],
            WorkflowAction::SubmitProcess => &[ServiceStatus::Step8ConfirmedByGovernment],
        }
    }

    pub fn target(self) -> ServiceStatus {
        match self {
            WorkflowAction::Approve => ServiceStatus::Step7Approved,
            WorkflowAction::Almost => ServiceStatus::Step7Almost,
            WorkflowAction::EnterIrnData => ServiceStatus::Step8,
            WorkflowAction::ClientConfirmPayment => ServiceStatus::Step8ClientConfirmed,
            WorkflowAction::GovernmentConfirmPayment => ServiceStatus::Step8ConfirmedByGovernment,
            WorkflowAction::SubmitProcess => ServiceStatus::Submitted,
        }
    }

    /// Client email due after the action commits, if any.
    pub fn notification(self) -> Option<TemplateKind> {
        match self {
            WorkflowAction::Approve => Some(TemplateKind::DocumentsApproved),
            WorkflowAction::Almost => Some(TemplateKind::DocumentsAlmost),
            WorkflowAction::EnterIrnData => Some(TemplateKind::IrnPaymentInstructions),
            WorkflowAction::SubmitProcess => Some(TemplateKind::ProcessSubmitted),
            WorkflowAction::ClientConfirmPayment | WorkflowAction::GovernmentConfirmPayment => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            WorkflowAction::Approve => "approve",
            WorkflowAction::Almost => "almost",
            WorkflowAction::EnterIrnData => "enter_irn_data",
            WorkflowAction::ClientConfirmPayment => "client_confirm_payment",
            WorkflowAction::GovernmentConfirmPayment => "government_confirm_payment",
            WorkflowAction::SubmitProcess => "submit_process",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for WorkflowAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkflowAction::ALL
            .into_iter()
            .find(|a| a.code() == s.trim())
            .ok_or_else(|| format!("Unknown workflow action '{s}'"))
    }
}

/// An action together with the payload it requires.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Approve,
    Almost { justification: String },
    EnterIrnData { entity: String, reference: String },
    ClientConfirmPayment,
    GovernmentConfirmPayment,
    SubmitProcess { process_number: String, process_password: String },
}

impl Transition {
    pub fn action(&self) -> WorkflowAction {
        match self {
            Transition::Approve => WorkflowAction::Approve,
            Transition::Almost { .. } => WorkflowAction::Almost,
            Transition::EnterIrnData { .. } => WorkflowAction::EnterIrnData,
            Transition::ClientConfirmPayment => WorkflowAction::ClientConfirmPayment,
            Transition::GovernmentConfirmPayment => WorkflowAction::GovernmentConfirmPayment,
            Transition::SubmitProcess { .. } => WorkflowAction::SubmitProcess,
        }
    }
}

/// A notification the caller should hand to the notifier; delivery is not the machine's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationIntent {
    pub recipient: String,
    pub kind: TemplateKind,
    pub data: serde_json::Value,
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionOutcome {
    pub action: WorkflowAction,
    pub from: ServiceStatus,
    pub to: ServiceStatus,
    pub notification: Option<NotificationIntent>,
}
