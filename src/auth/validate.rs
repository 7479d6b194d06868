/// Validate a person's full name: 2-100 chars.
pub fn validate_full_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Some("Full name is required".to_string());
    }
    if trimmed.chars().count() < 2 {
        return Some("Full name must be at least 2 characters".to_string());
    }
    if trimmed.chars().count() > 100 {
        return Some("Full name must be at most 100 characters".to_string());
    }
    None
}

/// Validate an email: must contain '@' and '.', max 254 chars.
pub fn validate_email(email: &str) -> Option<String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Some("Email is required".to_string());
    }
    if trimmed.len() > 254 {
        return Some("Email must be at most 254 characters".to_string());
    }
    if !trimmed.contains('@') || !trimmed.contains('.') {
        return Some("Email must be a valid address (contain '@' and '.')".to_string());
    }
    None
}

/// Validate a password: min 8 chars.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.len() < 8 {
        return Some("Password must be at least 8 characters".to_string());
    }
    None
}
