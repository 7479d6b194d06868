use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::new_id;

/// Status of a service request. STEP_1..STEP_6 belong to the intake flow;
/// the workflow core drives everything from STEP_7 onward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ServiceStatus {
    #[serde(rename = "STEP_1")]
    Step1,
    #[serde(rename = "STEP_2")]
    Step2,
    #[serde(rename = "STEP_3")]
    Step3,
    #[serde(rename = "STEP_4")]
    Step4,
    #[serde(rename = "STEP_5")]
    Step5,
    #[serde(rename = "STEP_6")]
    Step6,
    #[serde(rename = "STEP_7")]
    Step7,
    #[serde(rename = "STEP_7_WAITING")]
    Step7Waiting,
    #[serde(rename = "STEP_7_APPROVED")]
    Step7Approved,
    #[serde(rename = "STEP_7_RECUSED")]
    Step7Recused,
    #[serde(rename = "STEP_7_ALMOST")]
    Step7Almost,
    #[serde(rename = "STEP_8")]
    Step8,
    #[serde(rename = "STEP_8_CLIENT_CONFIRMED")]
    Step8ClientConfirmed,
    #[serde(rename = "STEP_8_CONFIRMED_BY_GOVERNMENT")]
    Step8ConfirmedByGovernment,
    #[serde(rename = "SUBMITTED")]
    Submitted,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "UNDER_ANALYSIS")]
    UnderAnalysis,
    #[serde(rename = "WAITING_RESPONSE")]
    WaitingResponse,
    #[serde(rename = "FOR_DECISION")]
    ForDecision,
    #[serde(rename = "COMPLETED")]
    Completed,
}

impl ServiceStatus {
    pub const ALL: [ServiceStatus; 20] = [
        ServiceStatus::Step1,
        ServiceStatus::Step2,
        ServiceStatus::Step3,
        ServiceStatus::Step4,
        ServiceStatus::Step5,
        ServiceStatus::Step6,
        ServiceStatus::Step7,
        ServiceStatus::Step7Waiting,
        ServiceStatus::Step7Approved,
        ServiceStatus::Step7Recused,
        ServiceStatus::Step7Almost,
        ServiceStatus::Step8,
        ServiceStatus::Step8ClientConfirmed,
        ServiceStatus::Step8ConfirmedByGovernment,
        ServiceStatus::Submitted,
        ServiceStatus::Cancelled,
        ServiceStatus::UnderAnalysis,
        ServiceStatus::WaitingResponse,
        ServiceStatus::ForDecision,
        ServiceStatus::Completed,
    ];

    pub fn code(self) -> &'static str {
        match self {
            ServiceStatus::Step1 => "STEP_1",
            ServiceStatus::Step2 => "STEP_2",
            ServiceStatus::Step3 => "STEP_3",
            ServiceStatus::Step4 => "STEP_4",
            ServiceStatus::Step5 => "STEP_5",
            ServiceStatus::Step6 => "STEP_6",
            ServiceStatus::Step7 => "STEP_7",
            ServiceStatus::Step7Waiting => "STEP_7_WAITING",
            ServiceStatus::Step7Approved => "STEP_7_APPROVED",
            ServiceStatus::Step7Recused => "STEP_7_RECUSED",
            ServiceStatus::Step7Almost => "STEP_7_ALMOST",
            ServiceStatus::Step8 => "STEP_8",
            ServiceStatus::Step8ClientConfirmed => "STEP_8_CLIENT_CONFIRMED",
            ServiceStatus::Step8ConfirmedByGovernment => "STEP_8_CONFIRMED_BY_GOVERNMENT",
            ServiceStatus::Submitted => "SUBMITTED",
            ServiceStatus::Cancelled => "CANCELLED",
            ServiceStatus::UnderAnalysis => "UNDER_ANALYSIS",
            ServiceStatus::WaitingResponse => "WAITING_RESPONSE",
            ServiceStatus::ForDecision => "FOR_DECISION",
            ServiceStatus::Completed => "COMPLETED",
        }
    }

    /// Display label shown to backoffice staff.
    pub fn label(self) -> &'static str {
        match self {
            ServiceStatus::Step1 => "Passo 1",
            ServiceStatus::Step2 => "Passo 2",
            ServiceStatus::Step3 => "Passo 3",
            ServiceStatus::Step4 => "Passo 4",
            ServiceStatus::Step5 => "Passo 5",
            ServiceStatus::Step6 => "Passo 6",
            ServiceStatus::Step7 => "Passo 7",
            ServiceStatus::Step7Waiting => "Passo 7 Esperando",
            ServiceStatus::Step7Approved => "Passo 7 Aprovado",
            ServiceStatus::Step7Recused => "Passo 7 Recusado",
            ServiceStatus::Step7Almost => "Passo 7 Quase",
            ServiceStatus::Step8 => "Passo 8",
            ServiceStatus::Step8ClientConfirmed => "Passo 8 Confirmado pelo Cliente",
            ServiceStatus::Step8ConfirmedByGovernment => "Passo 8 Confirmado pelo Governo",
            ServiceStatus::Submitted => "Submetido",
            ServiceStatus::Cancelled => "Cancelado",
            ServiceStatus::UnderAnalysis => "Em análise",
            ServiceStatus::WaitingResponse => "Aguarda resposta",
            ServiceStatus::ForDecision => "Para decisão",
            ServiceStatus::Completed => "Concluído",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for ServiceStatus {
    type Err = String;

    /// Accepts either the status code (`STEP_7_APPROVED`) or its label (`Passo 7 Aprovado`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        ServiceStatus::ALL
            .into_iter()
            .find(|st| st.code().eq_ignore_ascii_case(trimmed) || st.label() == trimmed)
            .ok_or_else(|| format!("Unknown service status '{trimmed}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Identity,
    BirthCertificate,
    CriminalRecord,
    ResidenceTitle,
    MarriageCertificate,
    #[default]
    Other,
}

/// Applicant contact identity (the client account behind the request).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Applicant civil data. Fields not collected yet are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub profession: Option<String>,
    #[serde(default)]
    pub nationality: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub father_full_name: Option<String>,
    #[serde(default)]
    pub mother_full_name: Option<String>,
}

impl Person {
    pub fn named(first_name: &str, last_name: &str) -> Self {
        Person {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            profession: None,
            nationality: None,
            birth_date: None,
            father_full_name: None,
            mother_full_name: None,
        }
    }
}

/// Partial update of the applicant's civil data. `None` leaves a field untouched;
/// `Some("")` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub profession: Option<String>,
    pub nationality: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub father_full_name: Option<String>,
    pub mother_full_name: Option<String>,
}

/// Pointer to an uploaded file; the bytes live in an external file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default, rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub size: Option<u64>,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub url: String,
    #[serde(default, rename = "type")]
    pub doc_type: DocumentType,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A citizenship service request ("processo").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub id: String,
    pub status: Option<ServiceStatus>,
    pub user: Client,
    #[serde(default)]
    pub person: Option<Person>,

    // Workflow payload, filled in as the request advances
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub process_number: Option<String>,
    #[serde(default)]
    pub process_password: Option<String>,
    #[serde(default)]
    pub almost_justification: Option<String>,
    #[serde(default)]
    pub is_paid_government: bool,
    #[serde(default)]
    pub paid_government_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submission_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub documents: Vec<Document>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    pub fn new(user: Client, person: Option<Person>, now: DateTime<Utc>) -> Self {
        ServiceRequest {
            id: new_id(),
            status: None,
            user,
            person,
            entity: None,
            reference: None,
            process_number: None,
            process_password: None,
            almost_justification: None,
            is_paid_government: false,
            paid_government_at: None,
            submission_date: None,
            documents: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Search and filter criteria for the service list.
#[derive(Debug, Clone, Default)]
pub struct ServiceFilters {
    /// Case-insensitive match on client name, email or process number.
    pub search: Option<String>,
    pub status: Option<ServiceStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    Name,
    Status,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum SortDir {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SortSpec {
    pub column: SortColumn,
    pub dir: SortDir,
}

impl SortSpec {
    /// Unknown column names fall back to `created_at`; anything but `asc` sorts descending.
    pub fn from_params(sort: Option<&str>, dir: Option<&str>) -> Self {
        let column = match sort.unwrap_or("") {
            "updated_at" => SortColumn::UpdatedAt,
            "name" => SortColumn::Name,
            "status" => SortColumn::Status,
            _ => SortColumn::CreatedAt,
        };
        SortSpec {
            column,
            dir: if dir == Some("asc") { SortDir::Asc } else { SortDir::Desc },
        }
    }
}

/// Per-status totals for the statistics view.
#[derive(Debug, Clone, Serialize)]
pub struct StatusCount {
    pub status: ServiceStatus,
    pub label: &'static str,
    pub count: usize,
}
