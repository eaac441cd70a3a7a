use log::{error, info, warn};
use reqwest::blocking::Client;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

use crate::auth::{self, AccountLinker, SessionManager, SessionProvider};
use crate::config::AppConfig;
use crate::error::ServerError;
use crate::error::handlers::{failure_reply, panic_message, parse_error_reply};
use crate::error::ParseError;
use crate::middleware::logging::{log_inbound, log_reply};
use crate::middleware::{RateLimiter, SenderLocks};
use crate::protocol::{AuthContext, Command, DispatchOptions, Dispatcher, Outcome, Verb, parse_command};
use crate::server::routes;
use crate::summary::GeminiSummarizer;

/// Limits applied to every inbound message before parsing
#[derive(Debug, Clone)]
pub struct MessageLimits {
    pub max_message_length: usize,
    pub rate_limit_max_messages: usize,
    pub rate_limit_window: Duration,
}

impl From<&AppConfig> for MessageLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_message_length: config.server.max_message_length,
            rate_limit_max_messages: config.server.rate_limit_max_messages,
            rate_limit_window: config.server.rate_limit_window(),
        }
    }
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Refused before parsing: too long, bad sender or rate limited
    Rejected(String),
    ParseFailed { error: ParseError, reply: String },
    Executed { verb: Verb, reply: String },
}

impl MessageOutcome {
    pub fn reply(&self) -> &str {
        match self {
            MessageOutcome::Rejected(reply)
            | MessageOutcome::ParseFailed { reply, .. }
            | MessageOutcome::Executed { reply, .. } => reply,
        }
    }
}

/// Shared state behind every request handler
pub struct AppState {
    dispatcher: Dispatcher,
    sessions: Arc<dyn SessionProvider>,
    accounts: Arc<dyn AccountLinker>,
    limits: MessageLimits,
    rate_limiter: Mutex<RateLimiter>,
    sender_locks: SenderLocks,
}

impl AppState {
    pub fn new(
        dispatcher: Dispatcher,
        sessions: Arc<dyn SessionProvider>,
        accounts: Arc<dyn AccountLinker>,
        limits: MessageLimits,
    ) -> Self {
        Self {
            dispatcher,
            sessions,
            accounts,
            rate_limiter: Mutex::new(RateLimiter::new(
                limits.rate_limit_max_messages,
                limits.rate_limit_window,
            )),
            limits,
            sender_locks: SenderLocks::new(),
        }
    }

    /// Wires the Drive, OAuth and Gemini clients from configuration.
    ///
    /// Builds blocking HTTP clients, so it must not run on an async worker.
    pub fn from_config(config: &AppConfig) -> Result<Self, ServerError> {
        let http = Client::builder()
            .timeout(config.google.http_timeout())
            .user_agent(concat!("drive-assistant/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let credentials = auth::create_store(&config.credentials);
        let sessions = Arc::new(SessionManager::new(credentials, http.clone(), config.google.clone()));

        let summarizer = GeminiSummarizer::new(http, &config.summarizer);
        if !summarizer.is_configured() {
            warn!("No Gemini API key configured; summary commands will fail");
        }
        if config.google.client_secrets_file.is_none() {
            warn!("google.client_secrets_file is not set; sign-in will fail");
        }

        let dispatcher = Dispatcher::new(
            sessions.clone(),
            Arc::new(summarizer),
            DispatchOptions::from(config),
        );
        Ok(Self::new(
            dispatcher,
            sessions.clone(),
            sessions,
            MessageLimits::from(config),
        ))
    }

    pub fn sessions(&self) -> &dyn SessionProvider {
        self.sessions.as_ref()
    }

    pub fn accounts(&self) -> &dyn AccountLinker {
        self.accounts.as_ref()
    }

    /// Runs one chat message through limits, parsing and dispatch.
    pub fn handle_message(&self, channel: &str, sender: &str, text: &str) -> MessageOutcome {
        log_inbound(channel, sender, text);
        let outcome = self.process_message(sender, text);
        log_reply(channel, sender, outcome.reply());
        outcome
    }

    fn process_message(&self, sender: &str, text: &str) -> MessageOutcome {
        if text.chars().count() > self.limits.max_message_length {
            return MessageOutcome::Rejected(failure_reply(format!(
                "Message too long (max {} characters)",
                self.limits.max_message_length
            )));
        }

        if let Err(reply) = self.admit(sender) {
            return MessageOutcome::Rejected(reply);
        }

        self.sender_locks.with_sender(sender, || {
            let command = match parse_command(text) {
                Ok(command) => command,
                Err(error) => {
                    let reply = parse_error_reply(&error);
                    return MessageOutcome::ParseFailed { error, reply };
                }
            };

            MessageOutcome::Executed {
                verb: command.verb(),
                reply: self.dispatch(&command, sender).into_reply(),
            }
        })
    }

    /// Runs an already-built command under the same sender checks, rate
    /// limit and per-sender lock as chat messages.
    ///
    /// Returns the rejection reply when the sender is refused.
    pub fn run_command(&self, channel: &str, sender: &str, command: &Command) -> Result<Outcome, String> {
        log_inbound(channel, sender, command.verb().as_str());
        self.admit(sender)?;
        let outcome = self
            .sender_locks
            .with_sender(sender, || self.dispatch(command, sender));
        if !outcome.is_success() {
            warn!("[{}] {} for {} did not succeed", channel, command.verb().as_str(), sender);
        }
        Ok(outcome)
    }

    /// Sender validation and rate limiting
    fn admit(&self, sender: &str) -> Result<(), String> {
        if let Err(e) = auth::validate_sender(sender) {
            warn!("Rejected message: {}", e);
            return Err(failure_reply(e));
        }

        if !self.allow(sender) {
            warn!("Rate limit hit for {}", sender);
            return Err(failure_reply(
                "Too many messages. Please wait a moment and try again.",
            ));
        }
        Ok(())
    }

    fn dispatch(&self, command: &Command, sender: &str) -> Outcome {
        let auth = AuthContext::new(sender);
        panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.run(command, &auth))).unwrap_or_else(
            |payload| {
                let message = panic_message(payload.as_ref());
                error!("Dispatch for {} panicked: {}", sender, message);
                Outcome::Failed(failure_reply(format!("Error executing command: {}", message)))
            },
        )
    }

    fn allow(&self, sender: &str) -> bool {
        self.rate_limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_allowed(sender)
    }

    /// Forgets senders that have been idle for a full window
    pub fn prune_rate_limits(&self) {
        self.rate_limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prune(Instant::now());
    }
}

pub struct Server {
    http: Arc<tiny_http::Server>,
    state: Arc<AppState>,
    permits: Arc<Semaphore>,
    listen_addr: String,
    max_concurrent: usize,
    prune_interval: Duration,
}

impl Server {
    pub async fn new(config: AppConfig) -> Result<Self, ServerError> {
        let listen_addr = config.server.listen_addr();
        let max_concurrent = config.server.max_concurrent_requests;
        let prune_interval = config.server.rate_limit_window();

        let state = tokio::task::spawn_blocking(move || AppState::from_config(&config))
            .await
            .map_err(|e| ServerError::Startup(e.to_string()))??;

        let http = match tiny_http::Server::http(&listen_addr) {
            Ok(http) => {
                info!("Server bound to {}", listen_addr);
                http
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", listen_addr, e);
                return Err(ServerError::Bind {
                    addr: listen_addr,
                    message: e.to_string(),
                });
            }
        };

        Ok(Self {
            http: Arc::new(http),
            state: Arc::new(state),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            listen_addr,
            max_concurrent,
            prune_interval,
        })
    }

    pub async fn start(&self) {
        info!(
            "Starting drive assistant on http://{} (max {} concurrent requests)",
            self.listen_addr, self.max_concurrent
        );

        let state = Arc::clone(&self.state);
        let prune_interval = self.prune_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(prune_interval);
            loop {
                ticker.tick().await;
                state.prune_rate_limits();
            }
        });

        loop {
            let http = Arc::clone(&self.http);
            let request = match tokio::task::spawn_blocking(move || http.recv()).await {
                Ok(Ok(request)) => request,
                Ok(Err(e)) => {
                    error!("Error accepting request: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("Accept task failed: {}", e);
                    continue;
                }
            };

            let permit = match Arc::clone(&self.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!("Request semaphore closed: {}", e);
                    return;
                }
            };

            // Spawn a blocking task per request so the accept loop doesn't block
            let state = Arc::clone(&self.state);
            tokio::task::spawn_blocking(move || {
                routes::handle_request(&state, request);
                drop(permit);
            });
        }
    }
}
