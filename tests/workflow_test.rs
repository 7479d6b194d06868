//! Workflow state machine tests.
//!
//! Covers the transition table, payload validation and the guarantee that a
//! rejected transition leaves the request untouched.

mod common;

use chrono::Utc;

use backadmin::errors::AppError;
use backadmin::models::service::ServiceStatus;
use backadmin::models::workflow::{self, Transition, WorkflowAction};
use backadmin::notify::TemplateKind;
use common::*;

fn irn(entity: &str, reference: &str) -> Transition {
    Transition::EnterIrnData { entity: entity.to_string(), reference: reference.to_string() }
}

fn submit(number: &str, password: &str) -> Transition {
    Transition::SubmitProcess {
        process_number: number.to_string(),
        process_password: password.to_string(),
    }
}

fn assert_field_error(err: AppError, expected: &str) {
    match err {
        AppError::Validation { field, .. } => assert_eq!(field, expected),
        other => panic!("expected validation error on {expected}, got {other:?}"),
    }
}

#[test]
fn approve_from_both_review_states() {
    for status in [ServiceStatus::Step7, ServiceStatus::Step7Waiting] {
        let mut svc = service("Ana Souza", Some(status));
        let outcome = workflow::apply_transition(&mut svc, &Transition::Approve, Utc::now()).unwrap();
        assert_eq!(svc.status, Some(ServiceStatus::Step7Approved));
        assert_eq!(outcome.from, status);
        assert_eq!(outcome.to, ServiceStatus::Step7Approved);
        let intent = outcome.notification.expect("approval notifies the client");
        assert_eq!(intent.kind, TemplateKind::DocumentsApproved);
        assert_eq!(intent.recipient, svc.user.email);
    }
}

#[test]
fn approve_twice_is_rejected() {
    let mut svc = service("Ana Souza", Some(ServiceStatus::Step7));
    workflow::apply_transition(&mut svc, &Transition::Approve, Utc::now()).unwrap();
    let before = svc.clone();

    let err = workflow::apply_transition(&mut svc, &Transition::Approve, Utc::now()).unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition { from: Some(ServiceStatus::Step7Approved), action: WorkflowAction::Approve }
    ));
    assert_eq!(svc, before);
}

/// A transition for `action` carrying a payload that passes validation.
fn valid_transition(action: WorkflowAction) -> Transition {
    match action {
        WorkflowAction::Approve => Transition::Approve,
        WorkflowAction::Almost => Transition::Almost { justification: "Falta passaporte".to_string() },
        WorkflowAction::EnterIrnData => irn(ENTITY, REFERENCE),
        WorkflowAction::ClientConfirmPayment => Transition::ClientConfirmPayment,
        WorkflowAction::GovernmentConfirmPayment => Transition::GovernmentConfirmPayment,
        WorkflowAction::SubmitProcess => submit(PROCESS_NUMBER, PROCESS_PASSWORD),
    }
}

#[test]
fn wrong_state_leaves_record_unchanged() {
    let mut checked = 0;
    for action in WorkflowAction::ALL {
        for status in ServiceStatus::ALL {
            if action.preconditions().contains(&status) {
                continue;
            }
            let transition = valid_transition(action);
            let mut svc = service("Bruno Lima", Some(status));
            let before = svc.clone();
            let err = workflow::apply_transition(&mut svc, &transition, Utc::now()).unwrap_err();
            assert!(
                matches!(err, AppError::InvalidTransition { from: Some(f), action: a } if f == status && a == action),
                "{status} / {action:?}: {err:?}"
            );
            assert_eq!(svc, before, "{status} / {action:?}");
            checked += 1;
        }
    }
    let allowed: usize = WorkflowAction::ALL.iter().map(|a| a.preconditions().len()).sum();
    assert_eq!(checked, ServiceStatus::ALL.len() * WorkflowAction::ALL.len() - allowed);
}

#[test]
fn valid_transitions_succeed_from_every_precondition() {
    for action in WorkflowAction::ALL {
        for &status in action.preconditions() {
            let mut svc = service("Bruno Lima", Some(status));
            let outcome = workflow::apply_transition(&mut svc, &valid_transition(action), Utc::now())
                .unwrap_or_else(|e| panic!("{status} / {action:?}: {e:?}"));
            assert_eq!(svc.status, Some(action.target()));
            assert_eq!(outcome.to, action.target());
        }
    }
}

#[test]
fn unset_status_rejects_every_action() {
    let mut svc = service("Carla Pereira", None);
    assert!(workflow::available_actions(svc.status).is_empty());
    let err = workflow::apply_transition(&mut svc, &Transition::Approve, Utc::now()).unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { from: None, .. }));
}

#[test]
fn almost_requires_justification() {
    let mut svc = service("Daniel Costa", Some(ServiceStatus::Step7Waiting));
    let before = svc.clone();

    let err = workflow::apply_transition(
        &mut svc,
        &Transition::Almost { justification: "   ".to_string() },
        Utc::now(),
    )
    .unwrap_err();
    assert_field_error(err, "almost_justification");
    assert_eq!(svc, before);

    let outcome = workflow::apply_transition(
        &mut svc,
        &Transition::Almost { justification: "  Falta certidão de nascimento  ".to_string() },
        Utc::now(),
    )
    .unwrap();
    assert_eq!(svc.status, Some(ServiceStatus::Step7Almost));
    assert_eq!(svc.almost_justification.as_deref(), Some("Falta certidão de nascimento"));
    assert_eq!(outcome.notification.unwrap().kind, TemplateKind::DocumentsAlmost);
}

#[test]
fn irn_payload_is_validated_before_any_change() {
    let bad = [
        irn("", REFERENCE),
        irn("1234", REFERENCE),
        irn("12a45", REFERENCE),
        irn(ENTITY, ""),
        irn(ENTITY, "12345678"),
        irn(ENTITY, "1234567890"),
        irn(ENTITY, "123/456/789"),
    ];
    for transition in bad {
        let mut svc = service("Eduarda Rocha", Some(ServiceStatus::Step7Approved));
        let before = svc.clone();
        let err = workflow::apply_transition(&mut svc, &transition, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }), "{transition:?}");
        assert_eq!(svc, before);
    }
}

#[test]
fn irn_reference_is_stored_as_digits() {
    let mut svc = service("Eduarda Rocha", Some(ServiceStatus::Step7Approved));
    let outcome = workflow::apply_transition(&mut svc, &irn(ENTITY, "123.456-789"), Utc::now()).unwrap();
    assert_eq!(svc.status, Some(ServiceStatus::Step8));
    assert_eq!(svc.entity.as_deref(), Some(ENTITY));
    assert_eq!(svc.reference.as_deref(), Some("123456789"));

    let intent = outcome.notification.unwrap();
    assert_eq!(intent.kind, TemplateKind::IrnPaymentInstructions);
    assert_eq!(intent.data["reference"], "123456789");
}

#[test]
fn payment_confirmations_do_not_notify() {
    let mut svc = service("Fábio Nunes", Some(ServiceStatus::Step8));
    svc.entity = Some(ENTITY.to_string());
    svc.reference = Some("123456789".to_string());

    let outcome = workflow::apply_transition(&mut svc, &Transition::ClientConfirmPayment, Utc::now()).unwrap();
    assert!(outcome.notification.is_none());
    assert!(!svc.is_paid_government);

    let now = Utc::now();
    let outcome = workflow::apply_transition(&mut svc, &Transition::GovernmentConfirmPayment, now).unwrap();
    assert!(outcome.notification.is_none());
    assert_eq!(svc.status, Some(ServiceStatus::Step8ConfirmedByGovernment));
    assert!(svc.is_paid_government);
    assert_eq!(svc.paid_government_at, Some(now));
}

#[test]
fn government_confirmation_needs_irn_data() {
    let mut svc = service("Gabriela Dias", Some(ServiceStatus::Step8ClientConfirmed));
    let before = svc.clone();
    let err = workflow::apply_transition(&mut svc, &Transition::GovernmentConfirmPayment, Utc::now()).unwrap_err();
    assert_field_error(err, "entity");
    assert_eq!(svc, before);
}

#[test]
fn submit_validates_process_fields() {
    let mut svc = service("Hugo Alves", Some(ServiceStatus::Step8ConfirmedByGovernment));
    svc.entity = Some(ENTITY.to_string());
    svc.reference = Some("123456789".to_string());
    svc.is_paid_government = true;
    let before = svc.clone();

    for (t, field) in [
        (submit("", PROCESS_PASSWORD), "process_number"),
        (submit("1234/24", PROCESS_PASSWORD), "process_number"),
        (submit(PROCESS_NUMBER, ""), "process_password"),
        (submit(PROCESS_NUMBER, "AB12-CD34-EF56"), "process_password"),
    ] {
        let err = workflow::apply_transition(&mut svc, &t, Utc::now()).unwrap_err();
        assert_field_error(err, field);
        assert_eq!(svc, before);
    }
}

#[test]
fn submit_requires_government_payment() {
    let mut svc = service("Hugo Alves", Some(ServiceStatus::Step8ConfirmedByGovernment));
    svc.entity = Some(ENTITY.to_string());
    svc.reference = Some("123456789".to_string());
    let err = workflow::apply_transition(&mut svc, &submit(PROCESS_NUMBER, PROCESS_PASSWORD), Utc::now())
        .unwrap_err();
    assert_field_error(err, "is_paid_government");
}

#[test]
fn full_round_trip_ends_submitted() {
    let mut svc = service("Inês Marques", Some(ServiceStatus::Step7Waiting));
    let steps = [
        Transition::Approve,
        irn(ENTITY, REFERENCE),
        Transition::ClientConfirmPayment,
        Transition::GovernmentConfirmPayment,
        submit(PROCESS_NUMBER, PROCESS_PASSWORD),
    ];
    let mut kinds = Vec::new();
    for step in &steps {
        let outcome = workflow::apply_transition(&mut svc, step, Utc::now()).unwrap();
        kinds.extend(outcome.notification.map(|n| n.kind));
    }

    assert_eq!(svc.status, Some(ServiceStatus::Submitted));
    assert_eq!(svc.entity.as_deref(), Some(ENTITY));
    assert_eq!(svc.reference.as_deref(), Some("123456789"));
    assert!(svc.is_paid_government);
    assert!(svc.paid_government_at.is_some());
    assert_eq!(svc.process_number.as_deref(), Some(PROCESS_NUMBER));
    assert_eq!(svc.process_password.as_deref(), Some(PROCESS_PASSWORD));
    assert!(svc.submission_date.is_some());
    assert_eq!(
        kinds,
        vec![
            TemplateKind::DocumentsApproved,
            TemplateKind::IrnPaymentInstructions,
            TemplateKind::ProcessSubmitted,
        ]
    );
    assert!(workflow::available_actions(svc.status).is_empty());
}

#[test]
fn available_actions_follow_status() {
    assert_eq!(
        workflow::available_actions(Some(ServiceStatus::Step7Waiting)),
        vec![WorkflowAction::Approve, WorkflowAction::Almost]
    );
    assert_eq!(
        workflow::available_actions(Some(ServiceStatus::Step7Approved)),
        vec![WorkflowAction::EnterIrnData]
    );
    assert_eq!(
        workflow::available_actions(Some(ServiceStatus::Step8ClientConfirmed)),
        vec![WorkflowAction::GovernmentConfirmPayment]
    );
    assert!(workflow::available_actions(Some(ServiceStatus::Step7Almost)).is_empty());
    assert!(workflow::available_actions(Some(ServiceStatus::Cancelled)).is_empty());
}
