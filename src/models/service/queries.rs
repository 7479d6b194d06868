use chrono::{DateTime, Utc};

use crate::audit;
use crate::db::{self, SERVICES_KEY, Store};
use crate::errors::AppError;
use crate::models::workflow::{self, Transition, TransitionOutcome};
use crate::notify::{self, Notifier};
use super::types::*;

/// Load/save access to service requests.
///
/// Every read-modify-write runs as one store transaction, so two requests
/// acting on the same record cannot interleave. Callers may additionally pass
/// the `updated_at` they last saw; a mismatch is rejected as a stale write.
pub struct ServiceRepository {
    store: Store,
}

impl ServiceRepository {
    pub fn new(store: Store) -> Self {
        ServiceRepository { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn find_all(&self) -> Result<Vec<ServiceRequest>, AppError> {
        db::load_list(self.store.as_ref(), SERVICES_KEY)
    }

    pub fn find_by_id(&self, id: &str) -> Result<ServiceRequest, AppError> {
        self.find_all()?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound)
    }

    /// Store a request created by the intake flow.
    pub fn insert(&self, service: ServiceRequest) -> Result<ServiceRequest, AppError> {
        db::update_list(self.store.as_ref(), SERVICES_KEY, |services: &mut Vec<ServiceRequest>| {
            if services.iter().any(|s| s.id == service.id) {
                return Err(AppError::Conflict(format!("Service {} already exists", service.id)));
            }
            services.push(service.clone());
            Ok(service)
        })
    }

    /// Run `f` on a copy of the record and persist it only if `f` succeeds.
    fn modify<T>(
        &self,
        id: &str,
        expected_updated_at: Option<DateTime<Utc>>,
        f: impl FnOnce(&mut ServiceRequest) -> Result<T, AppError>,
    ) -> Result<(ServiceRequest, T), AppError> {
        db::update_list(self.store.as_ref(), SERVICES_KEY, |services: &mut Vec<ServiceRequest>| {
            let current = services
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or(AppError::NotFound)?;

            if let Some(expected) = expected_updated_at {
                if current.updated_at != expected {
                    return Err(AppError::Conflict(format!(
                        "Service {} was modified at {}, expected {}",
                        id, current.updated_at, expected
                    )));
                }
            }

            let mut updated = current.clone();
            let result = f(&mut updated)?;
            *current = updated.clone();
            Ok((updated, result))
        })
    }

    /// Apply a workflow transition, record it in the status history and dispatch
    /// the notification intent.
    pub fn apply_transition(
        &self,
        id: &str,
        transition: &Transition,
        expected_updated_at: Option<DateTime<Utc>>,
        actor_id: &str,
        notifier: &dyn Notifier,
    ) -> Result<(ServiceRequest, TransitionOutcome), AppError> {
        let now = Utc::now();
        let (service, outcome) = self.modify(id, expected_updated_at, |service| {
            workflow::apply_transition(service, transition, now)
        })?;

        let notes = match transition {
            Transition::Almost { .. } => service.almost_justification.as_deref(),
            _ => None,
        };
        if let Err(e) = audit::log_status_change(self.store.as_ref(), id, &outcome, actor_id, notes, now) {
            log::warn!("Failed to record status history for service {}: {}", id, e);
        }
        if let Some(intent) = &outcome.notification {
            notify::dispatch(notifier, intent);
        }
        Ok((service, outcome))
    }

    /// Edit the applicant's civil data.
    pub fn update_applicant(
        &self,
        id: &str,
        update: &PersonUpdate,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<ServiceRequest, AppError> {
        let (service, ()) = self.modify(id, expected_updated_at, |service| {
            let person = service.person.get_or_insert_with(|| Person::named("", ""));
            apply_person_update(person, update)?;
            service.updated_at = Utc::now();
            Ok(())
        })?;
        Ok(service)
    }

    pub fn add_document(&self, id: &str, new_doc: &NewDocument) -> Result<Document, AppError> {
        let name = new_doc.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "Document name is required"));
        }
        let url = new_doc.url.trim();
        if url.is_empty() {
            return Err(AppError::validation("url", "Document URL is required"));
        }
        let document = Document {
            id: db::new_id(),
            name: name.to_string(),
            url: url.to_string(),
            doc_type: new_doc.doc_type,
            size: new_doc.size,
            uploaded_at: Utc::now(),
        };
        let doc = document.clone();
        self.modify(id, None, move |service| {
            service.documents.push(doc);
            service.updated_at = Utc::now();
            Ok(())
        })?;
        Ok(document)
    }

    pub fn remove_document(&self, id: &str, document_id: &str) -> Result<(), AppError> {
        self.modify(id, None, |service| {
            let before = service.documents.len();
            service.documents.retain(|d| d.id != document_id);
            if service.documents.len() == before {
                return Err(AppError::NotFound);
            }
            service.updated_at = Utc::now();
            Ok(())
        })?;
        Ok(())
    }
}

fn set_optional(field: &mut Option<String>, value: &Option<String>) {
    if let Some(v) = value {
        let trimmed = v.trim();
        *field = if trimmed.is_empty() { None } else { Some(trimmed.to_string()) };
    }
}

fn apply_person_update(person: &mut Person, update: &PersonUpdate) -> Result<(), AppError> {
    if let Some(first) = &update.first_name {
        if first.trim().is_empty() {
            return Err(AppError::validation("first_name", "First name cannot be blank"));
        }
    }
    if let Some(last) = &update.last_name {
        if last.trim().is_empty() {
            return Err(AppError::validation("last_name", "Last name cannot be blank"));
        }
    }

    if let Some(first) = &update.first_name {
        person.first_name = first.trim().to_string();
    }
    if let Some(last) = &update.last_name {
        person.last_name = last.trim().to_string();
    }
    set_optional(&mut person.profession, &update.profession);
    set_optional(&mut person.nationality, &update.nationality);
    set_optional(&mut person.father_full_name, &update.father_full_name);
    set_optional(&mut person.mother_full_name, &update.mother_full_name);
    if update.birth_date.is_some() {
        person.birth_date = update.birth_date;
    }

    if person.first_name.is_empty() || person.last_name.is_empty() {
        return Err(AppError::validation("first_name", "Applicant name is required"));
    }
    Ok(())
}

/// Apply search text, status and creation date range filters, keeping input order.
pub fn search(services: Vec<ServiceRequest>, filters: &ServiceFilters) -> Vec<ServiceRequest> {
    let needle = filters
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    services
        .into_iter()
        .filter(|s| {
            if let Some(needle) = &needle {
                let matches = s.user.full_name.to_lowercase().contains(needle)
                    || s.user.email.to_lowercase().contains(needle)
                    || s
                        .process_number
                        .as_deref()
                        .is_some_and(|n| n.to_lowercase().contains(needle));
                if !matches {
                    return false;
                }
            }
            if let Some(status) = filters.status {
                if s.status != Some(status) {
                    return false;
                }
            }
            let created = s.created_at.date_naive();
            if filters.date_from.is_some_and(|from| created < from) {
                return false;
            }
            if filters.date_to.is_some_and(|to| created > to) {
                return false;
            }
            true
        })
        .collect()
}

pub fn sort(services: &mut [ServiceRequest], spec: &SortSpec) {
    services.sort_by(|a, b| {
        let ord = match spec.column {
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortColumn::Name => a.user.full_name.to_lowercase().cmp(&b.user.full_name.to_lowercase()),
            SortColumn::Status => a.status.cmp(&b.status),
        };
        match spec.dir {
            SortDir::Asc => ord,
            SortDir::Desc => ord.reverse(),
        }
    });
}

/// Totals per status, in workflow order, omitting statuses with no requests.
pub fn status_counts(services: &[ServiceRequest]) -> Vec<StatusCount> {
    ServiceStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            label: status.label(),
            count: services.iter().filter(|s| s.status == Some(status)).count(),
        })
        .filter(|c| c.count > 0)
        .collect()
}
