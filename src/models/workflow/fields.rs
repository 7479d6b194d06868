use std::sync::LazyLock;

use regex::Regex;

use crate::errors::AppError;

static PROCESS_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{5}/\d{2}$").expect("valid process number regex"));

static PROCESS_PASSWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}-[A-Za-z0-9]{4}$")
        .expect("valid process password regex")
});

pub const ENTITY_DIGITS: usize = 5;
pub const REFERENCE_DIGITS: usize = 9;
/// Raw reference input may carry separators ("123 456 789").
pub const REFERENCE_MAX_RAW_LEN: usize = 11;
pub const JUSTIFICATION_MAX_LEN: usize = 2000;

/// Trimmed, non-empty justification note.
pub fn validate_justification(note: &str) -> Result<String, AppError> {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("almost_justification", "Justification is required"));
    }
    if trimmed.chars().count() > JUSTIFICATION_MAX_LEN {
        return Err(AppError::validation(
            "almost_justification",
            format!("Justification must be at most {JUSTIFICATION_MAX_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// IRN payment entity: exactly five digits.
pub fn validate_entity(entity: &str) -> Result<String, AppError> {
    let trimmed = entity.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("entity", "Entity is required"));
    }
    if trimmed.len() != ENTITY_DIGITS || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation("entity", "Entity must be exactly 5 digits"));
    }
    Ok(trimmed.to_string())
}

/// IRN payment reference. Accepts up to 11 raw characters where spaces, dots and
/// hyphens are separators; the canonical stored form is the 9 digits alone.
pub fn normalize_reference(reference: &str) -> Result<String, AppError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("reference", "Reference is required"));
    }
    if trimmed.chars().count() > REFERENCE_MAX_RAW_LEN {
        return Err(AppError::validation(
            "reference",
            format!("Reference must be at most {REFERENCE_MAX_RAW_LEN} characters"),
        ));
    }
    if let Some(bad) = trimmed.chars().find(|c| !(c.is_ascii_digit() || matches!(c, ' ' | '.' | '-'))) {
        return Err(AppError::validation("reference", format!("Reference contains invalid character '{bad}'")));
    }
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != REFERENCE_DIGITS {
        return Err(AppError::validation("reference", "Reference must contain exactly 9 digits"));
    }
    Ok(digits)
}

/// Process number in `NNNNN/NN` form.
pub fn validate_process_number(number: &str) -> Result<String, AppError> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("process_number", "Process number is required"));
    }
    if !PROCESS_NUMBER_RE.is_match(trimmed) {
        return Err(AppError::validation("process_number", "Process number must look like 12345/24"));
    }
    Ok(trimmed.to_string())
}

/// Process password in `XXXX-XXXX-XXXX-XXXX` form.
pub fn validate_process_password(password: &str) -> Result<String, AppError> {
    let trimmed = password.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("process_password", "Process password is required"));
    }
    if !PROCESS_PASSWORD_RE.is_match(trimmed) {
        return Err(AppError::validation(
            "process_password",
            "Process password must look like ABCD-EFGH-IJKL-MNOP",
        ));
    }
    Ok(trimmed.to_string())
}
