//! HTTP envelopes
//!
//! Request body decoding and the response shapes the routes produce: TwiML
//! for the messaging webhook, JSON for everything else.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io::Cursor;
use tiny_http::{Header, Response};
use url::form_urlencoded;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TWIML_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// A response ready to hand to tiny_http
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Reply {
    pub fn json(status: u16, value: Value) -> Self {
        Self {
            status,
            content_type: JSON_CONTENT_TYPE,
            body: value.to_string(),
        }
    }

    /// `{"success": false, "error": message}` with `status`
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, json!({ "success": false, "error": message.into() }))
    }

    /// TwiML message reply; always 200 so the channel relays the text
    pub fn twiml(text: &str) -> Self {
        Self {
            status: 200,
            content_type: TWIML_CONTENT_TYPE,
            body: twiml(text),
        }
    }

    pub fn into_response(self) -> Response<Cursor<Vec<u8>>> {
        let response = Response::from_string(self.body).with_status_code(self.status);
        match Header::from_bytes("Content-Type", self.content_type) {
            Ok(header) => response.with_header(header),
            Err(()) => response,
        }
    }

    /// Parsed JSON body, for tests and logging
    pub fn json_body(&self) -> Option<Value> {
        serde_json::from_str(&self.body).ok()
    }
}

pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wraps `text` in a single-message TwiML document
pub fn twiml(text: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(text)
    )
}

/// Decodes an `application/x-www-form-urlencoded` body or query string
pub fn parse_form(body: &str) -> HashMap<String, String> {
    form_urlencoded::parse(body.as_bytes()).into_owned().collect()
}

/// Splits a request URL into its path and query parameters
pub fn split_url(url: &str) -> (&str, HashMap<String, String>) {
    match url.split_once('?') {
        Some((path, query)) => (path, parse_form(query)),
        None => (url, HashMap::new()),
    }
}

/// Decodes a JSON body into `T`, with the error as a reply
pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, Reply> {
    if body.trim().is_empty() {
        return Err(Reply::error(400, "No data received"));
    }
    serde_json::from_str(body).map_err(|e| Reply::error(400, format!("Invalid JSON body: {}", e)))
}
