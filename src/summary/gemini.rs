//! Gemini `generateContent` summarizer

use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::SummarizerConfig;
use crate::error::SummaryError;
use crate::summary::{SummaryLabel, Summarizer};

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

pub struct GeminiSummarizer {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl GeminiSummarizer {
    pub fn new(http: Client, config: &SummarizerConfig) -> Self {
        Self {
            http,
            endpoint: format!(
                "{}/models/{}:generateContent",
                config.api_base.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Builds the instruction sent with `text`
pub fn prompt(text: &str, label: &SummaryLabel) -> String {
    match label {
        SummaryLabel::Document(name) => format!(
            "Provide only a 1-2 sentence short summary with bullet points of the following document: \"{}\"\n\nDocument content:\n{}\n",
            name, text
        ),
        SummaryLabel::Folder(_) => format!(
            "Please provide a single line, very short description of this folder based on the following document summaries:\n\n{}\n",
            text
        ),
    }
}

impl Summarizer for GeminiSummarizer {
    fn summarize(&self, text: &str, label: &SummaryLabel) -> Result<String, SummaryError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| SummaryError::NotConfigured("no Gemini API key set".into()))?;

        let prompt = prompt(text, label);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        debug!("Requesting summary of {}", label);
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .map_err(|e| SummaryError::Generation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(SummaryError::Generation(format!("{}: {}", status, detail)));
        }

        response
            .json::<GenerateContentResponse>()
            .map_err(|e| SummaryError::Generation(e.to_string()))?
            .text()
            .ok_or_else(|| SummaryError::Generation("response contained no text".into()))
    }
}
