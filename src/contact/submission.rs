//! Sanitizing and validating contact form input.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;
use uuid::Uuid;

/// Longest accepted email address.
const MAX_EMAIL_LEN: usize = 254;
const MIN_NAME_LEN: usize = 2;
const MIN_MESSAGE_LEN: usize = 10;

// An unclosed `<` is kept as text.
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static JAVASCRIPT_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)javascript:").unwrap());
// Inline handler prefixes such as `onclick=` or `ONLOAD=`.
static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i-u)on\w+=").unwrap());
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Reasons a contact submission is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("All fields are required: name, email, and message")]
    MissingFields,

    #[error("Please provide a valid name (at least 2 characters)")]
    InvalidName,

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Message must be at least 10 characters long")]
    MessageTooShort,
}

/// Raw contact form body as posted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// A sanitized, validated contact submission.
#[derive(Debug, Clone, Serialize)]
pub struct ContactSubmission {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub message: String,
    pub received_at: DateTime<Utc>,
}

impl ContactSubmission {
    /// Sanitize every field of `request` and validate the result.
    pub fn from_request(
        request: &ContactRequest,
        max_field_len: usize,
    ) -> Result<Self, ValidationError> {
        let (name, email, message) = match (&request.name, &request.email, &request.message) {
            (Some(name), Some(email), Some(message))
                if !name.is_empty() && !email.is_empty() && !message.is_empty() =>
            {
                (name, email, message)
            }
            _ => return Err(ValidationError::MissingFields),
        };

        let name = sanitize(name, max_field_len);
        let email = sanitize(email, max_field_len).to_lowercase();
        let message = sanitize(message, max_field_len);

        if name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::InvalidName);
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }
        if message.chars().count() < MIN_MESSAGE_LEN {
            return Err(ValidationError::MessageTooShort);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            email,
            message,
            received_at: Utc::now(),
        })
    }
}

/// Strip markup and script vectors from user input, then trim and cap it
/// at `max_len` characters.
pub fn sanitize(input: &str, max_len: usize) -> String {
    let cleaned = TAG.replace_all(input, "");
    let cleaned = JAVASCRIPT_SCHEME.replace_all(&cleaned, "");
    let cleaned = EVENT_HANDLER.replace_all(&cleaned, "");
    cleaned.trim().chars().take(max_len).collect()
}

/// `local@domain.tld` with no whitespace, exactly one `@` and at most 254 characters.
pub fn is_valid_email(email: &str) -> bool {
    email.chars().count() <= MAX_EMAIL_LEN && EMAIL.is_match(email)
}
