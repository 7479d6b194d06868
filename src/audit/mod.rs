use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{self, KeyValueStore, STATUS_HISTORY_KEY};
use crate::errors::AppError;
use crate::models::service::ServiceStatus;
use crate::models::workflow::TransitionOutcome;

/// One committed status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub id: String,
    pub service_id: String,
    pub from_status: ServiceStatus,
    pub to_status: ServiceStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Append a status history entry in one store transaction. Callers treat
/// failure as non-fatal.
pub fn log_status_change(
    store: &dyn KeyValueStore,
    service_id: &str,
    outcome: &TransitionOutcome,
    changed_by: &str,
    notes: Option<&str>,
    changed_at: DateTime<Utc>,
) -> Result<(), AppError> {
    let entry = StatusHistory {
        id: db::new_id(),
        service_id: service_id.to_string(),
        from_status: outcome.from,
        to_status: outcome.to,
        changed_by: changed_by.to_string(),
        changed_at,
        notes: notes.map(String::from),
    };
    db::update_list(store, STATUS_HISTORY_KEY, |history: &mut Vec<StatusHistory>| {
        history.push(entry);
        Ok(())
    })
}

/// History of one service, oldest first.
pub fn find_for_service(store: &dyn KeyValueStore, service_id: &str) -> Result<Vec<StatusHistory>, AppError> {
    let history: Vec<StatusHistory> = db::load_list(store, STATUS_HISTORY_KEY)?;
    let mut entries: Vec<StatusHistory> = history
        .into_iter()
        .filter(|h| h.service_id == service_id)
        .collect();
    entries.sort_by_key(|h| h.changed_at);
    Ok(entries)
}
