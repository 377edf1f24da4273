//! Form input validation.
//!
//! Each form is a plain struct deserialized from the request; `validate`
//! returns the first failing rule as a user-facing [`ValidationError`].

use serde::Deserialize;

use crate::error::ValidationError;

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

/// Sign-in form: email 3..=255 chars, password 8..=100 chars.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> ValidationResult<()> {
        email(&self.email)?;
        length("email", &self.email, 3, 255)?;
        length("password", &self.password, 8, 100)
    }
}

/// Sign-up form: valid email, password of at least 8 chars, optional name.
#[derive(Debug, Clone, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl SignUpForm {
    pub fn validate(&self) -> ValidationResult<()> {
        email(&self.email)?;
        length("email", &self.email, 3, 255)?;
        min_length("password", &self.password, 8)?;
        if let Some(name) = &self.name {
            length("name", name, 0, 100)?;
        }
        Ok(())
    }

    /// Blank names are stored as NULL.
    pub fn normalized_name(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
    }
}

/// Emails are stored trimmed and lowercased.
pub fn normalize_email(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Minimal structural email check: one `@`, non-empty local part, and a
/// dotted domain without whitespace.
pub fn email(value: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::new("email", "Invalid email address.");
    if value.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = value.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(())
}

/// Character count within `min..=max`.
pub fn length(field: &'static str, value: &str, min: usize, max: usize) -> ValidationResult<()> {
    min_length(field, value, min)?;
    let len = value.chars().count();
    if len > max {
        return Err(ValidationError::new(
            field,
            format!("{} must contain at most {max} character(s).", label(field)),
        ));
    }
    Ok(())
}

/// Character count of at least `min`.
pub fn min_length(field: &'static str, value: &str, min: usize) -> ValidationResult<()> {
    if value.chars().count() < min {
        return Err(ValidationError::new(
            field,
            format!("{} must contain at least {min} character(s).", label(field)),
        ));
    }
    Ok(())
}

/// Required, trimmed text of at most `max` chars.
pub fn required_text(field: &'static str, value: &str, max: usize) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(
            field,
            format!("{} is required.", label(field)),
        ));
    }
    length(field, trimmed, 1, max)?;
    Ok(trimmed.to_string())
}

/// Error for a number that must not be negative.
pub fn negative(field: &'static str) -> ValidationError {
    ValidationError::new(field, format!("{} must not be negative.", label(field)))
}

fn label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
