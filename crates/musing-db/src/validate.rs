use std::sync::LazyLock;

use regex::Regex;

use crate::{DbError, Result};

pub const MAX_TEXT_CHARS: usize = 280;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[\w.-]+@([\w-]+\.)+[\w-]{2,4}$").expect("email pattern compiles")
});

/// Trimmed, non-empty name.
pub fn username(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DbError::Validation("username is required".into()));
    }
    Ok(trimmed.to_string())
}

pub fn email(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if !EMAIL_RE.is_match(trimmed) {
        return Err(DbError::Validation(format!(
            "'{}' is not a valid email address",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

/// Between 1 and 280 characters, counted as chars rather than bytes.
pub fn text(field: &str, raw: &str) -> Result<String> {
    let len = raw.chars().count();
    if raw.trim().is_empty() {
        return Err(DbError::Validation(format!("{} is required", field)));
    }
    if len > MAX_TEXT_CHARS {
        return Err(DbError::Validation(format!(
            "{} must be at most {} characters (got {})",
            field, MAX_TEXT_CHARS, len
        )));
    }
    Ok(raw.to_string())
}
