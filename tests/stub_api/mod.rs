//! In-process stand-in for a token-protected REST API.
//!
//! The stub issues tokens from `POST /api/token` for the accounts it was
//! built with and guards every other path the way the real service does:
//! no valid bearer token gives 401, a token without privilege gives 403, an
//! unknown path gives 404. Every request is captured for later inspection.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{Value, json};
use tiny_http::{Header, Request, Response, Server};

/// Path prefix under which the stub serves its API.
pub const API_PREFIX: &str = "/api";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// A request as observed by the stub.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    /// HTTP method, upper case.
    pub method: String,
    /// Request target including the `/api` prefix.
    pub url: String,
    /// Header name/value pairs in arrival order.
    pub headers: Vec<(String, String)>,
    /// Request body decoded as UTF-8.
    pub body: String,
}

impl SeenRequest {
    /// All values of the header `name`, compared case-insensitively.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
            .collect()
    }
}

/// Accounts, tokens and routes the stub knows about.
#[derive(Debug, Clone, Default)]
pub struct StubApiConfig {
    accounts: HashMap<(String, String), String>,
    privileged: HashSet<String>,
    paths: HashSet<String>,
}

impl StubApiConfig {
    /// Issue `token` when `username` logs in with `password`.
    #[must_use]
    pub fn with_account(mut self, username: &str, password: &str, token: &str) -> Self {
        self.accounts
            .insert((username.to_owned(), password.to_owned()), token.to_owned());
        self
    }

    /// Let `token` through the privilege check.
    #[must_use]
    pub fn with_privileged_token(mut self, token: &str) -> Self {
        self.privileged.insert(token.to_owned());
        self
    }

    /// Serve `path` (relative to `/api`) as an existing resource.
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.paths.insert(path.to_owned());
        self
    }

    fn issued(&self, token: &str) -> bool {
        self.accounts.values().any(|issued| issued == token)
    }

    fn route(&self, request: &SeenRequest) -> (u16, Value) {
        let Some(path) = request.url.strip_prefix(API_PREFIX) else {
            return (404, json!({"error": "Not Found"}));
        };

        if path == "/token" && request.method == "POST" {
            return self.login(&request.body);
        }

        let bearer = request.header_values("Authorization");
        let token = match bearer.as_slice() {
            [single] => single.strip_prefix("Bearer "),
            _ => None,
        };
        let Some(token) = token.filter(|candidate| self.issued(candidate)) else {
            return (401, json!({"error": "Unauthorized"}));
        };
        if !self.privileged.contains(token) {
            return (403, json!({"error": "Forbidden"}));
        }
        if !self.paths.contains(path) {
            return (404, json!({"error": "Not Found"}));
        }
        if request.method == "PUT" {
            let echoed = serde_json::from_str(&request.body).unwrap_or(Value::Null);
            return (200, echoed);
        }
        (200, json!({"status": "ok"}))
    }

    fn login(&self, body: &str) -> (u16, Value) {
        let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let username = parsed["username"].as_str().unwrap_or_default();
        let password = parsed["password"].as_str().unwrap_or_default();
        self.accounts
            .get(&(username.to_owned(), password.to_owned()))
            .map_or_else(
                || (401, json!({"error": "Unauthorized"})),
                |token| (200, json!({"token": token})),
            )
    }
}

/// A running stub API bound to an ephemeral local port.
///
/// The serving thread stops when the stub is dropped.
pub struct StubApi {
    base_url: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StubApi {
    /// Bind to `127.0.0.1:0` and start serving `config`.
    ///
    /// # Errors
    ///
    /// Returns a message if the listener cannot be bound.
    pub fn start(config: StubApiConfig) -> Result<Self, String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| format!("failed to bind stub API: {error}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| String::from("stub API should listen on an IP socket"))?;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let handle = {
            let seen_by_server = Arc::clone(&seen);
            let stop_flag = Arc::clone(&stop);
            thread::spawn(move || serve(&server, &config, &seen_by_server, &stop_flag))
        };

        Ok(Self {
            base_url: format!("http://{addr}{API_PREFIX}"),
            seen,
            stop,
            handle: Some(handle),
        })
    }

    /// Base API path, e.g. `http://127.0.0.1:41234/api`.
    #[must_use]
    pub fn base_api_path(&self) -> &str {
        &self.base_url
    }

    /// Requests received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SeenRequest> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for StubApi {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            drop(handle.join());
        }
    }
}

fn serve(
    server: &Server,
    config: &StubApiConfig,
    seen: &Mutex<Vec<SeenRequest>>,
    stop: &AtomicBool,
) {
    while !stop.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handle(request, config, seen),
            Ok(None) => {}
            Err(_) => break,
        }
    }
}

fn handle(mut request: Request, config: &StubApiConfig, seen: &Mutex<Vec<SeenRequest>>) {
    let mut body = String::new();
    drop(request.as_reader().read_to_string(&mut body));
    let observed = SeenRequest {
        method: request.method().as_str().to_owned(),
        url: request.url().to_owned(),
        headers: request
            .headers()
            .iter()
            .map(|header| {
                (
                    header.field.as_str().as_str().to_owned(),
                    header.value.as_str().to_owned(),
                )
            })
            .collect(),
        body,
    };

    let (status, payload) = config.route(&observed);
    seen.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(observed);

    let mut response = Response::from_string(payload.to_string()).with_status_code(status);
    if let Ok(content_type) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response.add_header(content_type);
    }
    drop(request.respond(response));
}

/// A base API path on a local port nothing listens on.
///
/// # Errors
///
/// Returns a message if no ephemeral port can be reserved.
pub fn unreachable_base_api_path() -> Result<String, String> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")
        .map_err(|error| format!("failed to reserve a local port: {error}"))?;
    let addr = listener
        .local_addr()
        .map_err(|error| format!("failed to read reserved address: {error}"))?;
    drop(listener);
    Ok(format!("http://{addr}{API_PREFIX}"))
}
