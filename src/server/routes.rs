//! HTTP routes
//!
//! Maps each request onto the message pipeline or the account endpoints.
//! Routing works on plain strings so it can be exercised without a socket.

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use tiny_http::{Method, Request};

use crate::auth::validate_sender;
use crate::error::ParseError;
use crate::protocol::responses::HELP_TEXT_VERSION;
use crate::protocol::{Command, Outcome, VirtualPath};
use crate::server::core::{AppState, MessageOutcome};
use crate::server::envelope::{Reply, parse_form, parse_json, split_url};
use crate::storage::DriveObject;

const FILES_PREFIX: &str = "/api/files/";
const FILE_SUMMARY_PREFIX: &str = "/api/summary/file/";
const FOLDER_SUMMARY_PREFIX: &str = "/api/summary/folder/";

#[derive(Debug, Deserialize)]
struct ExecuteRequest {
    #[serde(default)]
    message: String,
    #[serde(default, alias = "whatsapp_number")]
    sender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SignInRequest {
    #[serde(default)]
    code: Option<String>,
    #[serde(default, alias = "whatsapp_number")]
    sender: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransferRequest {
    #[serde(default)]
    source_path: Option<String>,
    #[serde(default)]
    destination_path: Option<String>,
    #[serde(default, alias = "whatsapp_number")]
    sender: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum Transfer {
    Move,
    Copy,
}

#[derive(Debug, Deserialize)]
struct SenderRequest {
    #[serde(default, alias = "whatsapp_number")]
    sender: Option<String>,
}

/// Reads the request body, routes it and sends the reply
pub fn handle_request(state: &AppState, mut request: Request) {
    let method = request.method().clone();
    let url = request.url().to_string();

    let mut body = String::new();
    let reply = match request.as_reader().read_to_string(&mut body) {
        Ok(_) => route(state, &method, &url, &body),
        Err(e) => {
            warn!("Failed to read body of {} {}: {}", method, url, e);
            Reply::error(400, "Unreadable request body")
        }
    };

    if let Err(e) = request.respond(reply.into_response()) {
        error!("Failed to respond to {} {}: {}", method, url, e);
    }
}

/// Picks the handler for `method` and `url`
pub fn route(state: &AppState, method: &Method, url: &str, body: &str) -> Reply {
    let (path, query) = split_url(url);
    match (method, path) {
        (Method::Get, "/") => Reply::json(
            200,
            json!({
                "message": "Drive Assistant API is running",
                "status": "running",
                "help_version": HELP_TEXT_VERSION,
            }),
        ),
        (Method::Post, "/api/webhook") => webhook(state, body),
        (Method::Get, "/api/files") => list_files(state, &query),
        (Method::Post, "/api/files/move") => transfer(state, body, &query, Transfer::Move),
        (Method::Post, "/api/files/copy") => transfer(state, body, &query, Transfer::Copy),
        (Method::Delete, p) if p.starts_with(FILES_PREFIX) => {
            delete_file(state, tail(p, FILES_PREFIX), &query)
        }
        (Method::Get, p) if p.starts_with(FILE_SUMMARY_PREFIX) => {
            summarize(state, tail(p, FILE_SUMMARY_PREFIX), &query, false)
        }
        (Method::Get, p) if p.starts_with(FOLDER_SUMMARY_PREFIX) => {
            summarize(state, tail(p, FOLDER_SUMMARY_PREFIX), &query, true)
        }
        (Method::Post, "/api/execute") => execute(state, body),
        (Method::Post, "/api/auth") => sign_in(state, body),
        (Method::Get, "/api/auth/status") => auth_status(state, &query),
        (Method::Post, "/api/disconnect") => disconnect(state, body),
        _ => Reply::error(404, format!("No route for {} {}", method, path)),
    }
}

/// Messaging channel webhook; always answers with TwiML
fn webhook(state: &AppState, body: &str) -> Reply {
    let form = parse_form(body);
    let sender = form.get("From").map(String::as_str).unwrap_or_default();
    let text = form.get("Body").map(String::as_str).unwrap_or_default();

    if text.trim().is_empty() {
        return Reply::twiml("No message provided");
    }

    let outcome = state.handle_message("webhook", sender, text);
    Reply::twiml(outcome.reply())
}

fn execute(state: &AppState, body: &str) -> Reply {
    let request: ExecuteRequest = match parse_json(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    if request.message.trim().is_empty() {
        return Reply::error(400, "No message provided");
    }
    let Some(sender) = request.sender.filter(|s| !s.trim().is_empty()) else {
        return Reply::error(400, "Sender is required");
    };

    match state.handle_message("api", &sender, &request.message) {
        MessageOutcome::Executed { verb, reply } => Reply::json(
            200,
            json!({ "success": true, "command": verb.as_str(), "response": reply }),
        ),
        MessageOutcome::ParseFailed { error, reply } => Reply::json(
            200,
            json!({ "success": false, "error": error.to_string(), "response": reply }),
        ),
        MessageOutcome::Rejected(reply) => Reply::error(400, reply),
    }
}

fn sign_in(state: &AppState, body: &str) -> Reply {
    let request: SignInRequest = match parse_json(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let Some(code) = request.code.filter(|c| !c.is_empty()) else {
        return Reply::error(400, "Authorization code is required");
    };
    let sender = match required_sender(request.sender.as_deref()) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };

    match state.accounts().sign_in(&code, sender) {
        Ok(()) => Reply::json(200, json!({ "success": true, "message": "Connected to Google Drive" })),
        Err(e) => {
            error!("Sign-in failed for {}: {}", sender, e);
            Reply::error(500, e.to_string())
        }
    }
}

fn auth_status(state: &AppState, query: &HashMap<String, String>) -> Reply {
    let sender = match required_sender(query_sender(query)) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };

    let authenticated = state.sessions().has_valid_session(sender);
    Reply::json(200, json!({ "success": true, "authenticated": authenticated }))
}

fn disconnect(state: &AppState, body: &str) -> Reply {
    let request: SenderRequest = match parse_json(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let sender = match required_sender(request.sender.as_deref()) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };

    match state.accounts().disconnect(sender) {
        Ok(()) => {
            info!("Disconnected {}", sender);
            Reply::json(200, json!({ "success": true }))
        }
        Err(e) => {
            error!("Disconnect failed for {}: {}", sender, e);
            Reply::json(500, json!({ "success": false, "error": e.to_string() }))
        }
    }
}

/// Folder listing as JSON; `folder` defaults to the root
fn list_files(state: &AppState, query: &HashMap<String, String>) -> Reply {
    let sender = match required_sender(query_sender(query)) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };
    let folder = query.get("folder").map(String::as_str).unwrap_or("/");
    let folder = match path_param(folder, "folder") {
        Ok(folder) => folder,
        Err(reply) => return reply,
    };

    run(state, sender, &Command::List(folder), "message")
}

fn delete_file(state: &AppState, encoded: &str, query: &HashMap<String, String>) -> Reply {
    let sender = match required_sender(query_sender(query)) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };
    let file = match decoded_path(encoded, "file") {
        Ok(file) => file,
        Err(reply) => return reply,
    };

    run(state, sender, &Command::Delete(file), "message")
}

fn transfer(state: &AppState, body: &str, query: &HashMap<String, String>, kind: Transfer) -> Reply {
    let request: TransferRequest = match parse_json(body) {
        Ok(request) => request,
        Err(reply) => return reply,
    };
    let (Some(source), Some(destination)) = (
        request.source_path.filter(|p| !p.is_empty()),
        request.destination_path.filter(|p| !p.is_empty()),
    ) else {
        return Reply::error(400, "Source and destination paths are required");
    };
    let sender = match required_sender(request.sender.as_deref().or(query_sender(query))) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };
    let source = match path_param(&source, "source") {
        Ok(source) => source,
        Err(reply) => return reply,
    };
    let destination = match path_param(&destination, "destination") {
        Ok(destination) => destination,
        Err(reply) => return reply,
    };

    let command = match kind {
        Transfer::Move => Command::Move {
            source,
            destination,
        },
        Transfer::Copy => Command::Copy {
            source,
            destination,
        },
    };
    run(state, sender, &command, "message")
}

fn summarize(state: &AppState, encoded: &str, query: &HashMap<String, String>, folder: bool) -> Reply {
    let sender = match required_sender(query_sender(query)) {
        Ok(sender) => sender,
        Err(reply) => return reply,
    };
    let role = if folder { "folder" } else { "file" };
    let path = match decoded_path(encoded, role) {
        Ok(path) => path,
        Err(reply) => return reply,
    };

    let command = if folder {
        Command::FolderSummary(path)
    } else {
        Command::FileSummary(path)
    };
    run(state, sender, &command, "summary")
}

/// Runs `command` for `sender` and shapes the outcome as
/// `{success, files | <text_key> | error}`
fn run(state: &AppState, sender: &str, command: &Command, text_key: &str) -> Reply {
    let outcome = match state.run_command("api", sender, command) {
        Ok(outcome) => outcome,
        Err(rejection) => return Reply::error(400, rejection),
    };

    match outcome {
        Outcome::Listing(entries) => Reply::json(
            200,
            json!({
                "success": true,
                "files": entries.iter().map(file_json).collect::<Vec<_>>(),
            }),
        ),
        Outcome::Done(text) => {
            let mut body = Map::new();
            body.insert("success".to_string(), Value::Bool(true));
            body.insert(text_key.to_string(), Value::String(text));
            Reply::json(200, Value::Object(body))
        }
        Outcome::Failed(reply) => Reply::error(400, reply),
        Outcome::SignInRequired(reply) => Reply::error(401, reply),
    }
}

fn file_json(object: &DriveObject) -> Value {
    json!({
        "id": object.id,
        "name": object.name,
        "mimeType": object.mime_type,
        "isFolder": object.is_folder(),
        "size": object.size,
        "modifiedTime": object.modified_time.map(|t| t.to_rfc3339()),
    })
}

fn tail<'a>(path: &'a str, prefix: &str) -> &'a str {
    path.strip_prefix(prefix).unwrap_or_default()
}

/// Percent-decodes a path taken from the URL and roots it at `/`
fn decoded_path(encoded: &str, role: &'static str) -> Result<VirtualPath, Reply> {
    let decoded = urlencoding::decode(encoded)
        .map_err(|e| Reply::error(400, format!("Invalid {} path encoding: {}", role, e)))?;
    path_param(&format!("/{}", decoded), role)
}

fn path_param(raw: &str, role: &'static str) -> Result<VirtualPath, Reply> {
    VirtualPath::parse(raw).ok_or_else(|| {
        let error = ParseError::InvalidPath {
            role,
            path: raw.to_string(),
        };
        Reply::error(400, error.to_string())
    })
}

fn query_sender(query: &HashMap<String, String>) -> Option<&str> {
    query
        .get("sender")
        .or_else(|| query.get("whatsapp_number"))
        .map(String::as_str)
}

fn required_sender(sender: Option<&str>) -> Result<&str, Reply> {
    let sender = sender
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| Reply::error(400, "Sender is required"))?;
    validate_sender(sender).map_err(|e| Reply::error(400, e.to_string()))?;
    Ok(sender)
}
