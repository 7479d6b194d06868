//! Service repository tests: persisted transitions, history, notifications,
//! applicant edits, documents, search and statistics.

mod common;

use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};

use backadmin::audit;
use backadmin::errors::AppError;
use backadmin::models::service::{
    self, DocumentType, NewDocument, PersonUpdate, ServiceFilters, ServiceRepository, ServiceStatus,
    SortSpec,
};
use backadmin::models::workflow::Transition;
use backadmin::notify::{LogNotifier, RecordingNotifier, TemplateKind};
use common::*;

#[test]
fn transition_is_persisted_with_history_and_notification() {
    let (_dir, repo) = setup_repo();
    let svc = service_in(&repo, "Ana Souza", ServiceStatus::Step7Waiting);
    let notifier = RecordingNotifier::new();

    let (updated, outcome) = repo
        .apply_transition(
            &svc.id,
            &Transition::Almost { justification: "Falta passaporte".to_string() },
            None,
            "user-1",
            &notifier,
        )
        .unwrap();
    assert_eq!(updated.status, Some(ServiceStatus::Step7Almost));
    assert_eq!(repo.find_by_id(&svc.id).unwrap(), updated);

    let history = audit::find_for_service(repo.store().as_ref(), &svc.id).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_status, ServiceStatus::Step7Waiting);
    assert_eq!(history[0].to_status, ServiceStatus::Step7Almost);
    assert_eq!(history[0].changed_by, "user-1");
    assert_eq!(history[0].notes.as_deref(), Some("Falta passaporte"));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, svc.user.email);
    assert_eq!(sent[0].1, TemplateKind::DocumentsAlmost);
    assert_eq!(outcome.notification.unwrap().kind, TemplateKind::DocumentsAlmost);
}

#[test]
fn rejected_transition_persists_nothing() {
    let (_dir, repo) = setup_repo();
    let svc = service_in(&repo, "Bruno Lima", ServiceStatus::Step7Approved);
    let notifier = RecordingNotifier::new();

    let err = repo
        .apply_transition(
            &svc.id,
            &Transition::EnterIrnData { entity: "1".to_string(), reference: REFERENCE.to_string() },
            None,
            "user-1",
            &notifier,
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "entity", .. }));
    assert_eq!(repo.find_by_id(&svc.id).unwrap(), svc);
    assert!(audit::find_for_service(repo.store().as_ref(), &svc.id).unwrap().is_empty());
    assert!(notifier.sent().is_empty());
}

#[test]
fn stale_write_is_a_conflict() {
    let (_dir, repo) = setup_repo();
    let svc = service_in(&repo, "Carla Pereira", ServiceStatus::Step7);
    let notifier = RecordingNotifier::new();
    let seen = svc.updated_at;

    repo.apply_transition(&svc.id, &Transition::Approve, Some(seen), "u1", &notifier)
        .unwrap();
    let err = repo
        .apply_transition(
            &svc.id,
            &Transition::EnterIrnData { entity: ENTITY.to_string(), reference: REFERENCE.to_string() },
            Some(seen),
            "u2",
            &notifier,
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(repo.find_by_id(&svc.id).unwrap().status, Some(ServiceStatus::Step7Approved));
}

#[test]
fn concurrent_transitions_each_record_history() {
    let (_dir, repo) = setup_repo();
    let ids: Vec<String> = (0..16)
        .map(|i| service_in(&repo, &format!("Cliente {i}"), ServiceStatus::Step7Waiting).id)
        .collect();
    let repo = Arc::new(repo);

    let handles: Vec<_> = ids
        .iter()
        .cloned()
        .map(|id| {
            let repo = repo.clone();
            thread::spawn(move || {
                repo.apply_transition(&id, &Transition::Approve, None, "user-1", &LogNotifier)
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let store = repo.store().as_ref();
    let total: usize = ids
        .iter()
        .map(|id| audit::find_for_service(store, id).unwrap().len())
        .sum();
    assert_eq!(total, 16);
    assert!(
        repo.find_all()
            .unwrap()
            .iter()
            .all(|s| s.status == Some(ServiceStatus::Step7Approved))
    );
}

#[test]
fn unknown_service_is_not_found() {
    let (_dir, repo) = setup_repo();
    let notifier = RecordingNotifier::new();
    assert!(matches!(repo.find_by_id("nope"), Err(AppError::NotFound)));
    assert!(matches!(
        repo.apply_transition("nope", &Transition::Approve, None, "u", &notifier),
        Err(AppError::NotFound)
    ));
}

#[test]
fn applicant_update_sets_and_clears_fields() {
    let (_dir, repo) = setup_repo();
    let svc = service_in(&repo, "Daniel Costa", ServiceStatus::Step3);

    let update = PersonUpdate {
        profession: Some("Engenheiro".to_string()),
        nationality: Some("Brasileira".to_string()),
        birth_date: chrono::NaiveDate::from_ymd_opt(1980, 5, 17),
        ..Default::default()
    };
    let updated = repo.update_applicant(&svc.id, &update, None).unwrap();
    let person = updated.person.clone().unwrap();
    assert_eq!(person.first_name, "Daniel");
    assert_eq!(person.profession.as_deref(), Some("Engenheiro"));
    assert!(updated.updated_at >= svc.updated_at);

    let clear = PersonUpdate { profession: Some(String::new()), ..Default::default() };
    let cleared = repo.update_applicant(&svc.id, &clear, None).unwrap();
    assert_eq!(cleared.person.unwrap().profession, None);

    let blank = PersonUpdate { last_name: Some("  ".to_string()), ..Default::default() };
    let err = repo.update_applicant(&svc.id, &blank, None).unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "last_name", .. }));
}

#[test]
fn documents_can_be_added_and_removed() {
    let (_dir, repo) = setup_repo();
    let svc = service_in(&repo, "Eduarda Rocha", ServiceStatus::Step7);

    let doc = repo
        .add_document(
            &svc.id,
            &NewDocument {
                name: "Passaporte.pdf".to_string(),
                url: "https://files.example.com/passaporte.pdf".to_string(),
                doc_type: DocumentType::Identity,
                size: Some(2048),
            },
        )
        .unwrap();
    assert_eq!(repo.find_by_id(&svc.id).unwrap().documents, vec![doc.clone()]);

    let err = repo
        .add_document(
            &svc.id,
            &NewDocument { name: " ".to_string(), url: "x".to_string(), doc_type: DocumentType::Other, size: None },
        )
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { field: "name", .. }));

    repo.remove_document(&svc.id, &doc.id).unwrap();
    assert!(repo.find_by_id(&svc.id).unwrap().documents.is_empty());
    assert!(matches!(repo.remove_document(&svc.id, &doc.id), Err(AppError::NotFound)));
}

#[test]
fn search_filters_by_text_status_and_date() {
    let mut old = service("Ana Souza", Some(ServiceStatus::Step7));
    old.created_at = Utc::now() - Duration::days(30);
    let mut numbered = service("Bruno Lima", Some(ServiceStatus::Submitted));
    numbered.process_number = Some("54321/23".to_string());
    let recent = service("Carla Pereira", Some(ServiceStatus::Step7));
    let all = vec![old.clone(), numbered.clone(), recent.clone()];

    let by_text = service::search(all.clone(), &ServiceFilters { search: Some("SOUZA".to_string()), ..Default::default() });
    assert_eq!(by_text, vec![old.clone()]);

    let by_number = service::search(all.clone(), &ServiceFilters { search: Some("54321".to_string()), ..Default::default() });
    assert_eq!(by_number, vec![numbered]);

    let by_status = service::search(
        all.clone(),
        &ServiceFilters { status: Some(ServiceStatus::Step7), ..Default::default() },
    );
    assert_eq!(by_status.len(), 2);

    let since = (Utc::now() - Duration::days(7)).date_naive();
    let by_date = service::search(
        all,
        &ServiceFilters { status: Some(ServiceStatus::Step7), date_from: Some(since), ..Default::default() },
    );
    assert_eq!(by_date, vec![recent]);
}

#[test]
fn sort_by_name_and_creation() {
    let mut a = service("Carla Pereira", Some(ServiceStatus::Step1));
    a.created_at = Utc::now() - Duration::days(2);
    let mut b = service("ana Souza", Some(ServiceStatus::Step2));
    b.created_at = Utc::now() - Duration::days(1);
    let mut list = vec![a.clone(), b.clone()];

    service::sort(&mut list, &SortSpec::from_params(Some("name"), Some("asc")));
    assert_eq!(list[0].id, b.id);

    service::sort(&mut list, &SortSpec::from_params(None, None));
    assert_eq!(list[0].id, b.id, "newest first by default");

    service::sort(&mut list, &SortSpec::from_params(Some("created_at"), Some("asc")));
    assert_eq!(list[0].id, a.id);
}

#[test]
fn status_counts_skip_empty_statuses() {
    let list = vec![
        service("A B", Some(ServiceStatus::Step7)),
        service("C D", Some(ServiceStatus::Step7)),
        service("E F", Some(ServiceStatus::Submitted)),
        service("G H", None),
    ];
    let counts = service::status_counts(&list);
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0].status, ServiceStatus::Step7);
    assert_eq!(counts[0].count, 2);
    assert_eq!(counts[1].status, ServiceStatus::Submitted);
}

#[test]
fn duplicate_insert_conflicts() {
    let (_dir, store) = setup_store();
    let repo = ServiceRepository::new(store);
    let svc = service_in(&repo, "Ana Souza", ServiceStatus::Step1);
    assert!(matches!(repo.insert(svc), Err(AppError::Conflict(_))));
}
