use crate::services::StoreError;

/// Maximum handle length in characters
pub const MAX_HANDLE_LEN: usize = 32;

/// Check a directory handle: 1..=32 chars of `[A-Za-z0-9_.-]`
pub fn validate_handle(handle: &str) -> Result<(), StoreError> {
    if handle.is_empty() || handle.chars().count() > MAX_HANDLE_LEN {
        return Err(StoreError::InvalidInput(format!(
            "handle must be 1 to {} characters",
            MAX_HANDLE_LEN
        )));
    }

    if let Some(bad) = handle
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(StoreError::InvalidInput(format!(
            "handle contains invalid character {:?}",
            bad
        )));
    }

    Ok(())
}

/// Check message content against the configured length cap.
///
/// Whitespace-only content counts as empty. The content itself is stored as sent.
#[inline]
pub fn validate_message(content: &str, max_len: usize) -> Result<(), StoreError> {
    if content.trim().is_empty() {
        return Err(StoreError::InvalidInput(
            "message content must not be empty".to_string(),
        ));
    }

    if content.chars().count() > max_len {
        return Err(StoreError::InvalidInput(format!(
            "message content exceeds {} characters",
            max_len
        )));
    }

    Ok(())
}
