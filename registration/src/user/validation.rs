//! Schema validation for registration payloads.
//!
//! Rules, checked in order with the first violation reported:
//! - the body must be a JSON object
//! - `name`: string, 3 to 100 characters
//! - `email`: string, valid address on a dotted host name
//! - `phone`: string of exactly 9 digits
//! - no other keys
//!
//! String values are trimmed before they are checked and returned.

use serde_json::{Map, Value};
use thiserror::Error;
use validator::ValidateEmail;

use super::UserPayload;

/// Minimum name length, in characters.
pub const NAME_MIN_LEN: usize = 3;

/// Maximum name length, in characters.
pub const NAME_MAX_LEN: usize = 100;

/// Number of digits in a phone number.
pub const PHONE_DIGITS: usize = 9;

const FIELDS: [&str; 3] = ["name", "email", "phone"];

/// Why a field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationReason {
    #[error("must be of type object")]
    NotAnObject,
    #[error("is required")]
    Required,
    #[error("must be a string")]
    NotAString,
    #[error("is not allowed to be empty")]
    Empty,
    #[error("length must be at least {0} characters long")]
    TooShort(usize),
    #[error("length must be less than or equal to {0} characters long")]
    TooLong(usize),
    #[error("must be a valid email")]
    InvalidEmail,
    #[error("must contain exactly {0} digits")]
    InvalidPhone(usize),
    #[error("is not allowed")]
    NotAllowed,
}

/// First schema violation found in a payload.
///
/// The message always embeds the quoted field name, e.g.
/// `"email" must be a valid email`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("\"{field}\" {reason}")]
pub struct ValidationError {
    field: String,
    reason: ValidationReason,
}

impl ValidationError {
    fn new(field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            field: field.into(),
            reason,
        }
    }

    /// Name of the offending field (`value` when the body itself is wrong).
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn reason(&self) -> &ValidationReason {
        &self.reason
    }
}

/// Validate a raw JSON body and return the normalized payload.
pub fn validate_user(raw: &Value) -> Result<UserPayload, ValidationError> {
    let object = raw
        .as_object()
        .ok_or_else(|| ValidationError::new("value", ValidationReason::NotAnObject))?;

    let name = required_string(object, "name")?;
    let name_len = name.chars().count();
    if name_len < NAME_MIN_LEN {
        return Err(ValidationError::new(
            "name",
            ValidationReason::TooShort(NAME_MIN_LEN),
        ));
    }
    if name_len > NAME_MAX_LEN {
        return Err(ValidationError::new(
            "name",
            ValidationReason::TooLong(NAME_MAX_LEN),
        ));
    }

    let email = required_string(object, "email")?;
    if !email.validate_email() || !has_dotted_domain(&email) {
        return Err(ValidationError::new("email", ValidationReason::InvalidEmail));
    }

    let phone = required_string(object, "phone")?;
    if phone.len() != PHONE_DIGITS || !phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(
            "phone",
            ValidationReason::InvalidPhone(PHONE_DIGITS),
        ));
    }

    if let Some(unknown) = object.keys().find(|key| !FIELDS.contains(&key.as_str())) {
        return Err(ValidationError::new(
            unknown.as_str(),
            ValidationReason::NotAllowed,
        ));
    }

    Ok(UserPayload { name, email, phone })
}

/// Domain part is a dotted host name, not a single label or an IP literal.
fn has_dotted_domain(email: &str) -> bool {
    match email.rsplit_once('@') {
        Some((_, domain)) => {
            !domain.starts_with('[')
                && domain.contains('.')
                && domain.split('.').all(|label| !label.is_empty())
        }
        None => false,
    }
}

/// Fetch a present, non-blank string field, trimmed.
fn required_string(object: &Map<String, Value>, field: &str) -> Result<String, ValidationError> {
    match object.get(field) {
        None => Err(ValidationError::new(field, ValidationReason::Required)),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                Err(ValidationError::new(field, ValidationReason::Empty))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(_) => Err(ValidationError::new(field, ValidationReason::NotAString)),
    }
}
