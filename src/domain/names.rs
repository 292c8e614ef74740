//! Shape checks for post IDs and attachment names.

use super::error::DomainError;

pub const MAX_FILE_NAME_BYTES: usize = 255;

/// Post IDs double as route segments and storage prefixes, so only
/// `[A-Za-z0-9_-]` is accepted.
pub fn validate_post_id(id: &str) -> Result<(), DomainError> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidPostId { id: id.to_string() })
    }
}

/// Attachment names must be a single storage path segment.
pub fn validate_file_name(name: &str) -> Result<(), DomainError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_FILE_NAME_BYTES
        && name != "."
        && name != ".."
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control());

    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidFileName {
            name: name.to_string(),
        })
    }
}
