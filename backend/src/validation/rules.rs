//! Common validation rules shared across request payloads.

use validator::ValidationError;

/// Rejects values that are empty once surrounding whitespace is removed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Canonical form of a contact phone number.
///
/// Surrounding whitespace and the usual visual separators (spaces, dashes,
/// dots, parentheses) are removed; everything else is kept as submitted.
pub fn normalize_phone(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '.' | '(' | ')'))
        .collect()
}
