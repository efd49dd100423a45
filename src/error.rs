//! Semantic error types for the apiprobe harness.
//!
//! Conditions a caller might inspect are modelled as `thiserror` enums. Opaque
//! errors (`eyre::Report`) are reserved for the binary boundary.
//!
//! A non-success HTTP status is never represented here. Statuses are data for
//! the assertion layer, so a scenario that expects a 401 sees `Ok` from the
//! executor and a mismatch only from [`ScenarioError::UnexpectedStatus`].

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be read or parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// One or more required configuration values are missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The names of the missing keys, comma-separated.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// The `OrthoConfig` library returned an error while merging layers.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// Errors raised while talking to the API under test.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The per-call HTTP client could not be constructed.
    #[error("failed to build HTTP client: {message}")]
    ClientBuild {
        /// A description of the builder failure.
        message: String,
    },

    /// The request payload could not be serialised.
    #[error("failed to encode request payload: {message}")]
    Encode {
        /// A description of the serialisation failure.
        message: String,
    },

    /// The request never produced a response (connection refused, DNS, timeout).
    #[error("{method} {url} failed: {message}")]
    Transport {
        /// The HTTP method of the failed request.
        method: String,
        /// The target URL.
        url: String,
        /// A description of the transport failure.
        message: String,
    },

    /// The response body could not be read.
    #[error("failed to read response body from {url}: {message}")]
    BodyRead {
        /// The URL the response came from.
        url: String,
        /// A description of the read failure.
        message: String,
    },

    /// The response body was not the expected JSON document.
    #[error("failed to decode response from {url}: {message}")]
    Decode {
        /// The URL the response came from.
        url: String,
        /// A description of the decoding failure.
        message: String,
    },
}

/// Errors raised by scenario bookkeeping and status assertions.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The response holder was read before any request was made.
    #[error("no API response has been recorded yet")]
    NoResponseRecorded,

    /// The recorded response carried a different status than expected.
    #[error("expected status {expected} from {path}, got {actual}")]
    UnexpectedStatus {
        /// The API path the response was recorded for.
        path: String,
        /// The expected status code.
        expected: u16,
        /// The status code actually received.
        actual: u16,
    },
}

/// Top-level error type for the harness.
#[derive(Debug, Error)]
pub enum ApiProbeError {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred while issuing a request.
    #[error(transparent)]
    Request(#[from] RequestError),

    /// A scenario step or assertion failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// A specialised `Result` type for apiprobe operations.
pub type Result<T> = std::result::Result<T, ApiProbeError>;
