//! Test harness for REST APIs protected by bearer-token authentication.
//!
//! `apiprobe` obtains tokens for two fixed roles, sends GET and PUT requests
//! with or without a token, and keeps the latest response so that scenario
//! steps can assert on its status (401, 403, 404, success).
//!
//! # Architecture
//!
//! Configuration is loaded once into a [`config::HarnessConfig`] and turned
//! into a read-only [`credentials::CredentialStore`]. The store is handed to a
//! [`token::TokenExchanger`] at construction; nothing is global. Every HTTP
//! call acquires and drops its own client. An [`session::ApiSession`] ties the
//! pieces together for one scenario.
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (CLI > env > file > defaults)
//! - [`credentials`]: Roles, credentials, and the base API path
//! - [`error`]: Semantic error types
//! - [`http`]: Authenticated GET/PUT execution
//! - [`session`]: Response holder, scenario steps, and status assertions
//! - [`token`]: Credential-to-token exchange

use std::env;
use std::io;

pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod session;
pub mod token;


/// Default filter used when `APIPROBE_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "info,reqwest=warn,hyper=warn,hyper_util=warn";

/// Initialise the global tracing subscriber from the environment.
///
/// `APIPROBE_LOG` holds an `EnvFilter` directive. `APIPROBE_LOG_STYLE=always`
/// turns on ANSI colours. Logs go to stderr so command output on stdout stays
/// machine-readable.
pub fn init_tracing() {
    let directives = log_directives(env::var("APIPROBE_LOG").ok().as_deref());
    let ansi = ansi_enabled(env::var("APIPROBE_LOG_STYLE").ok().as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(directives))
        .with_writer(io::stderr)
        .with_ansi(ansi)
        .with_target(false)
        .init();
}

/// Picks the filter directives: the requested ones if they parse, otherwise
/// [`DEFAULT_LOG_FILTER`].
fn log_directives(requested: Option<&str>) -> String {
    requested
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter(|value| tracing_subscriber::EnvFilter::try_new(value).is_ok())
        .unwrap_or(DEFAULT_LOG_FILTER)
        .to_owned()
}

/// Colours are opt-in.
fn ansi_enabled(style: Option<&str>) -> bool {
    style.is_some_and(|value| value.trim().eq_ignore_ascii_case("always"))
}
