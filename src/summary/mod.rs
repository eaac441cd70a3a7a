//! Document summarization
//!
//! Drives the summarizer collaborator over one document or a whole folder.
//! Per-document failures inside a folder are logged and skipped.

pub mod gemini;

pub use gemini::GeminiSummarizer;

use log::{info, warn};
use std::fmt;

use crate::error::SummaryError;
use crate::navigate::ResolvedObject;
use crate::storage::{DriveObject, ListQuery, ObjectStore};

pub const TRUNCATION_MARKER: &str = "[Content truncated for summarization]";

/// What a piece of text passed to the summarizer represents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryLabel {
    /// A single document, by file name
    Document(String),
    /// A folder synthesis over per-document summaries, by folder path
    Folder(String),
}

impl fmt::Display for SummaryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryLabel::Document(name) => write!(f, "document '{}'", name),
            SummaryLabel::Folder(path) => write!(f, "folder '{}'", path),
        }
    }
}

/// Turns text into a short summary
pub trait Summarizer: Send + Sync {
    fn summarize(&self, text: &str, label: &SummaryLabel) -> Result<String, SummaryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub filename: String,
    pub summary: String,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSummary {
    pub folder_path: String,
    pub overview: String,
    pub documents: Vec<DocumentSummary>,
}

/// Result of summarizing a folder that could be listed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderOutcome {
    Summarized(FolderSummary),
    EmptyFolder,
    NothingSummarizable,
}

/// Cuts `content` to `max_chars` characters, appending the truncation marker
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}\n\n{}", &content[..cut], TRUNCATION_MARKER),
        None => content.to_string(),
    }
}

/// Extracts and summarizes a single document
pub fn summarize_document(
    store: &dyn ObjectStore,
    summarizer: &dyn Summarizer,
    document: &DriveObject,
    max_chars: usize,
) -> Result<DocumentSummary, SummaryError> {
    let content = store.get_content(document)?;
    if content.trim().is_empty() {
        return Err(SummaryError::EmptyDocument(document.name.clone()));
    }

    let content = truncate_content(&content, max_chars);
    let summary = summarizer.summarize(&content, &SummaryLabel::Document(document.name.clone()))?;

    Ok(DocumentSummary {
        filename: document.name.clone(),
        summary,
        word_count: content.split_whitespace().count(),
    })
}

/// Summarizes every summarizable document in `folder`, then asks for an
/// overview built from those summaries.
pub fn summarize_folder(
    store: &dyn ObjectStore,
    summarizer: &dyn Summarizer,
    folder: &ResolvedObject,
    max_chars: usize,
) -> Result<FolderOutcome, SummaryError> {
    let children = store
        .list(&ListQuery::children_of(folder.id()))
        .map_err(SummaryError::Listing)?;
    if children.is_empty() {
        return Ok(FolderOutcome::EmptyFolder);
    }

    let candidates: Vec<&DriveObject> = children.iter().filter(|c| c.is_summarizable()).collect();
    if candidates.is_empty() {
        return Ok(FolderOutcome::NothingSummarizable);
    }

    let mut documents = Vec::new();
    for document in candidates {
        match summarize_document(store, summarizer, document, max_chars) {
            Ok(summary) => documents.push(summary),
            Err(e) => warn!("Skipping '{}' in {}: {}", document.name, folder.path, e),
        }
    }

    if documents.is_empty() {
        return Err(SummaryError::NoneSucceeded);
    }
    info!("Summarized {} documents in {}", documents.len(), folder.path);

    let folder_path = folder.path.to_string();
    let overview = summarizer
        .summarize(
            &overview_input(&folder_path, &documents),
            &SummaryLabel::Folder(folder_path.clone()),
        )
        .unwrap_or_else(|e| {
            warn!("Folder overview for {} failed: {}", folder_path, e);
            format!(
                "Folder contains {} documents. Individual summaries available above.",
                documents.len()
            )
        });

    Ok(FolderOutcome::Summarized(FolderSummary {
        folder_path,
        overview,
        documents,
    }))
}

fn overview_input(folder_path: &str, documents: &[DocumentSummary]) -> String {
    let mut combined = format!(
        "Folder: {}\n\nTotal documents: {}\n\n",
        folder_path,
        documents.len()
    );
    for (i, doc) in documents.iter().enumerate() {
        combined.push_str(&format!("{}. {}\n   {}\n\n", i + 1, doc.filename, doc.summary));
    }
    combined
}
