//! Client notifications.
//!
//! The workflow only signals that an email is due; delivering it belongs to
//! whatever `Notifier` the server is wired with. `LogNotifier` is the default
//! and simply records the intent in the log.

use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::models::workflow::NotificationIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    DocumentsApproved,
    DocumentsAlmost,
    IrnPaymentInstructions,
    ProcessSubmitted,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, recipient: &str, kind: TemplateKind, data: &Value);
}

/// Hand an intent produced by a transition to the notifier.
pub fn dispatch(notifier: &dyn Notifier, intent: &NotificationIntent) {
    notifier.notify(&intent.recipient, intent.kind, &intent.data);
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, kind: TemplateKind, data: &Value) {
        log::info!("Notification {:?} due for {}: {}", kind, recipient, data);
    }
}

/// Keeps every call in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, TemplateKind, Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, TemplateKind, Value)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipient: &str, kind: TemplateKind, data: &Value) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((recipient.to_string(), kind, data.clone()));
        }
    }
}
