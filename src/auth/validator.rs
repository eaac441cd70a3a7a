//! Sender identity validation
//!
//! Inbound sender identifiers become file and variable names, so they are
//! checked before anything else touches them.

use crate::error::AuthError;

/// Longest accepted sender identifier
pub const MAX_SENDER_LENGTH: usize = 64;

/// Performs basic input sanitation to check for malicious or malformed identifiers.
fn is_valid_input(input: &str, max_length: usize) -> bool {
    !input.trim().is_empty() && input.len() <= max_length && !input.contains(['\r', '\n', '\0'])
}

/// Validates a channel sender identifier such as `whatsapp:+15550100`.
pub fn validate_sender(sender: &str) -> Result<(), AuthError> {
    if !is_valid_input(sender, MAX_SENDER_LENGTH) {
        return Err(AuthError::InvalidSender("malformed sender identifier".into()));
    }

    if sender.contains(['/', '\\', '.', '\'', '"']) {
        return Err(AuthError::InvalidSender(sender.to_string()));
    }

    Ok(())
}
