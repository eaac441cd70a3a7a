//! Chat response formatting
//!
//! The help text and the formatters that turn backend results into the
//! WhatsApp-flavoured markdown replies senders receive.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::storage::{DriveObject, ObjectKind};
use crate::summary::{DocumentSummary, FolderSummary};

/// Bumped whenever the command surface described by [`HELP_TEXT`] changes
pub const HELP_TEXT_VERSION: u32 = 2;

/// Reply to HELP, H and ?
pub const HELP_TEXT: &str = "🤖 *Drive Assistant*

*Available Commands:*

📁 *LIST /FolderName*
   List all files in a folder (LIST / for the top level)

🗑️ *DELETE /FolderName/file.pdf*
   Delete a specific file

📦 *MOVE /Source/file.pdf /Destination*
   Move file to different folder

📦 *COPY /Source/file.pdf /Destination*
   Copy file to different folder

📋 *FolderSummary /FolderName*
   Generate AI summaries of all documents in the folder

📋 *FileSummary /FolderName/file.pdf*
   Generate an AI summary of a specific file

❓ *HELP*, *H* or *?*
   Show this message

*Notes:*
• Use forward slashes (/) for paths, nested folders work too: /Projects/2024/plan.pdf
• Folder and file names are case-sensitive, commands are not
• Supported documents: PDF, DOCX, Google Docs, TXT";

pub const NO_FILES_FOUND: &str = "📁 No files found in the specified folder";
pub const NO_DOCUMENTS: &str = "ℹ️ No documents found in folder";
pub const NO_SUMMARIZABLE_DOCUMENTS: &str = "ℹ️ No summarizable documents found in folder";

/// Fixed reply for senders without a usable Drive session
pub fn sign_in_message(sign_in_url: &str) -> String {
    format!(
        "Please first sign in to your google drive account to use this command. Visit {} to sign in.",
        sign_in_url
    )
}

/// Numbered folder listing with type, size and modification time per entry
pub fn format_listing(entries: &[DriveObject]) -> String {
    if entries.is_empty() {
        return NO_FILES_FOUND.to_string();
    }

    let mut response = String::from("📁 *Files in folder:*\n\n");
    for (i, entry) in entries.iter().enumerate() {
        let kind = match entry.kind {
            ObjectKind::Folder => "Folder",
            ObjectKind::File => entry.mime_type.as_str(),
        };
        let _ = writeln!(response, "{}. *{}*", i + 1, entry.name);
        let _ = writeln!(response, "   📄 Type: {}", kind);
        let _ = writeln!(response, "   📏 Size: {}", format_size(entry.size.unwrap_or(0)));
        let _ = writeln!(
            response,
            "   📅 Modified: {}\n",
            format_modified(entry.modified_time.as_ref())
        );
    }
    response
}

/// Human readable size, one decimal place above bytes
pub fn format_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", size, UNITS[unit])
}

pub fn format_modified(modified: Option<&DateTime<Utc>>) -> String {
    modified
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn format_file_summary(summary: &DocumentSummary) -> String {
    format!("📄 *{}*\n\n{}\n\n", summary.filename, summary.summary)
}

pub fn format_folder_summary(summary: &FolderSummary) -> String {
    let mut response = format!("📁 *{} Folder*\n\n", summary.folder_path);
    let _ = write!(
        response,
        "📊 Total documents: {}\n\n",
        summary.documents.len()
    );
    let _ = write!(response, "📋 *Folder Overview:*\n{}\n\n", summary.overview);
    response.push_str("📄 *Document Summaries:*\n");
    for (i, doc) in summary.documents.iter().enumerate() {
        let _ = write!(response, "\n{}. *{}*\n{}\n", i + 1, doc.filename, doc.summary);
    }
    response
}
