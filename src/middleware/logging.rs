//! Logging middleware
//!
//! Provides message logging functionality. Message bodies are cut short so
//! long documents pasted into chat do not flood the log.

use log::info;

const PREVIEW_CHARS: usize = 80;

/// Log an inbound chat message
pub fn log_inbound(channel: &str, sender: &str, message: &str) {
    info!("[{}] {} sent: {}", channel, sender, preview(message));
}

/// Log the reply sent back for a message
pub fn log_reply(channel: &str, sender: &str, reply: &str) {
    info!("[{}] reply to {}: {}", channel, sender, preview(reply));
}

/// First line of `text`, capped at a fixed number of characters
pub fn preview(text: &str) -> String {
    let first_line = text.lines().next().unwrap_or_default();
    let mut cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
    if cut.len() < text.trim_end().len() {
        cut.push('…');
    }
    cut
}
