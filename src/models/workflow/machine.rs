use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::service::{ServiceRequest, ServiceStatus};
use super::fields;
use super::types::*;

/// Actions whose precondition holds for `status`, in workflow order.
pub fn available_actions(status: Option<ServiceStatus>) -> Vec<WorkflowAction> {
    let Some(status) = status else {
        return Vec::new();
    };
    WorkflowAction::ALL
        .into_iter()
        .filter(|a| a.preconditions().contains(&status))
        .collect()
}

/// Check the action's precondition against the current status.
pub fn check_precondition(service: &ServiceRequest, action: WorkflowAction) -> Result<ServiceStatus, AppError> {
    match service.status {
        Some(current) if action.preconditions().contains(&current) => Ok(current),
        from => Err(AppError::InvalidTransition { from, action }),
    }
}

/// Field values a transition writes, computed before anything is mutated.
enum Changes {
    None,
    Justification(String),
    Irn { entity: String, reference: String },
    GovernmentPaid,
    Process { number: String, password: String },
}

fn require_present(value: &Option<String>, field: &'static str) -> Result<(), AppError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(AppError::validation(field, format!("{field} must be set before this step"))),
    }
}

fn validate(service: &ServiceRequest, transition: &Transition) -> Result<Changes, AppError> {
    match transition {
        Transition::Approve | Transition::ClientConfirmPayment => Ok(Changes::None),
        Transition::Almost { justification } => {
            Ok(Changes::Justification(fields::validate_justification(justification)?))
        }
        Transition::EnterIrnData { entity, reference } => Ok(Changes::Irn {
            entity: fields::validate_entity(entity)?,
            reference: fields::normalize_reference(reference)?,
        }),
        Transition::GovernmentConfirmPayment => {
            require_present(&service.entity, "entity")?;
            require_present(&service.reference, "reference")?;
            Ok(Changes::GovernmentPaid)
        }
        Transition::SubmitProcess { process_number, process_password } => {
            // Earlier phases must be complete before a process number is recorded
            require_present(&service.entity, "entity")?;
            require_present(&service.reference, "reference")?;
            if !service.is_paid_government {
                return Err(AppError::validation(
                    "is_paid_government",
                    "Government payment must be confirmed before submission",
                ));
            }
            Ok(Changes::Process {
                number: fields::validate_process_number(process_number)?,
                password: fields::validate_process_password(process_password)?,
            })
        }
    }
}

fn notification_for(service: &ServiceRequest, action: WorkflowAction) -> Option<NotificationIntent> {
    let kind = action.notification()?;
    let data = match action {
        WorkflowAction::Almost => serde_json::json!({
            "service_id": service.id,
            "client_name": service.user.full_name,
            "justification": service.almost_justification,
        }),
        WorkflowAction::EnterIrnData => serde_json::json!({
            "service_id": service.id,
            "client_name": service.user.full_name,
            "entity": service.entity,
            "reference": service.reference,
        }),
        WorkflowAction::SubmitProcess => serde_json::json!({
            "service_id": service.id,
            "client_name": service.user.full_name,
            "process_number": service.process_number,
            "process_password": service.process_password,
        }),
        _ => serde_json::json!({
            "service_id": service.id,
            "client_name": service.user.full_name,
        }),
    };
    Some(NotificationIntent {
        recipient: service.user.email.clone(),
        kind,
        data,
    })
}

/// Apply one transition to `service`.
///
/// The precondition and every payload field are checked first; on error the
/// record is left exactly as it was. On success status, payload fields and
/// `updated_at` change together and the outcome carries the notification
/// intent (if the action has one).
pub fn apply_transition(
    service: &mut ServiceRequest,
    transition: &Transition,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, AppError> {
    let action = transition.action();
    let from = check_precondition(service, action)?;
    let changes = validate(service, transition)?;

    match changes {
        Changes::None => {}
        Changes::Justification(note) => service.almost_justification = Some(note),
        Changes::Irn { entity, reference } => {
            service.entity = Some(entity);
            service.reference = Some(reference);
        }
        Changes::GovernmentPaid => {
            service.is_paid_government = true;
            service.paid_government_at = Some(now);
        }
        Changes::Process { number, password } => {
            service.process_number = Some(number);
            service.process_password = Some(password);
            service.submission_date = Some(now);
        }
    }
    let to = action.target();
    service.status = Some(to);
    service.updated_at = now;

    log::info!("Service {} moved {} -> {} via {}", service.id, from, to, action);

    Ok(TransitionOutcome {
        action,
        from,
        to,
        notification: notification_for(service, action),
    })
}
