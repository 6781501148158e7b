//! Contact and alert message validation

/// Contact validation errors with helpful messages
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("Name and number cannot be empty")]
    Empty,

    #[error("Name is too long (maximum {max} characters)")]
    NameTooLong { max: usize },

    #[error("Number contains invalid characters: {chars}")]
    InvalidNumber { chars: String },

    #[error("Number must contain at least one digit")]
    NoDigits,

    #[error("No contact at position {index}")]
    NoSuchContact { index: usize },
}

pub const MAX_NAME_CHARS: usize = 64;

/// Characters a dialable number may contain besides digits.
const NUMBER_PUNCTUATION: &[char] = &['+', ' ', '-', '(', ')', '.'];

/// Trim and validate a contact's name and number.
///
/// Returns the trimmed pair on success.
pub fn validate_contact(name: &str, number: &str) -> Result<(String, String), ContactError> {
    let name = name.trim();
    let number = number.trim();

    if name.is_empty() || number.is_empty() {
        return Err(ContactError::Empty);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(ContactError::NameTooLong {
            max: MAX_NAME_CHARS,
        });
    }

    let invalid: String = number
        .chars()
        .filter(|c| !c.is_ascii_digit() && !NUMBER_PUNCTUATION.contains(c))
        .collect();
    if !invalid.is_empty() {
        return Err(ContactError::InvalidNumber { chars: invalid });
    }
    if !number.chars().any(|c| c.is_ascii_digit()) {
        return Err(ContactError::NoDigits);
    }

    Ok((name.to_string(), number.to_string()))
}
