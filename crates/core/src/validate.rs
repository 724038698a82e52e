use thiserror::Error;

/// Upper bound for free-text fields unless configured otherwise.
pub const DEFAULT_MAX_TEXT_LEN: usize = 4000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing required field: {field}")]
    MissingField { field: String },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },
    #[error("invalid {field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ValidationError {
    /// Name of the offending request field.
    pub fn field(&self) -> &str {
        match self {
            Self::MissingField { field }
            | Self::TooLong { field, .. }
            | Self::Invalid { field, .. } => field,
        }
    }
}

/// Trim a required free-text field. Blank input is rejected.
pub fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField {
            field: field.to_string(),
        });
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: max_len,
        });
    }
    Ok(trimmed.to_string())
}

/// Trim an optional free-text field; blank collapses to `None`.
pub fn optional_text(
    field: &str,
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => require_text(field, text, max_len).map(Some),
    }
}

/// Dispute notes are mandatory: a dispute without an explanation is rejected.
pub fn dispute_notes(notes: &str) -> Result<String, ValidationError> {
    require_text("notes", notes, DEFAULT_MAX_TEXT_LEN)
}

/// Admin identity attached to reply/clear/cancel (an email or staff handle).
pub fn admin_identity(identity: &str) -> Result<String, ValidationError> {
    let identity = require_text("admin", identity, 254)?;
    if identity.chars().any(char::is_whitespace) {
        return Err(ValidationError::Invalid {
            field: "admin".to_string(),
            reason: "must not contain whitespace".to_string(),
        });
    }
    Ok(identity)
}

/// Suggested descriptions keep interior whitespace verbatim; only blank is rejected.
pub fn suggested_description(
    value: Option<&str>,
    max_len: usize,
) -> Result<Option<String>, ValidationError> {
    match value {
        None => Ok(None),
        Some(text) if text.trim().is_empty() => Ok(None),
        Some(text) if text.chars().count() > max_len => Err(ValidationError::TooLong {
            field: "suggested_description".to_string(),
            max: max_len,
        }),
        Some(text) => Ok(Some(text.to_string())),
    }
}
