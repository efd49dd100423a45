//! Credential-to-token exchange.
//!
//! [`TokenExchanger`] posts a role's username and password to
//! `{base_api_path}/token` and returns the bearer token from the JSON reply.
//! The exchange is plumbing only: a rejected login is not an error here. The
//! server's reply is decoded as usual and any downstream request made with the
//! resulting token fails with the server's own authentication error.
//!
//! Tokens are fetched fresh on every call. Nothing is cached or retried.

use std::fmt;

use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::credentials::{CredentialStore, Credentials, Role};
use crate::error::RequestError;
use crate::http::{APPLICATION_JSON, HttpSettings, transport_error};

/// Path of the token endpoint relative to the base API path.
pub const TOKEN_PATH: &str = "/token";

/// Charset used when the response does not name one.
const DEFAULT_CHARSET: &str = "utf-8";

/// An opaque bearer token.
///
/// The harness never inspects its structure. An empty token is a valid value:
/// whether it works is for the server to decide.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
    /// Wraps a raw token string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw token string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the server handed back an empty token.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} chars>)", self.0.chars().count())
    }
}

/// Login payload sent to the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    /// The login username.
    pub username: String,
    /// The login password.
    pub password: String,
}

impl fmt::Debug for AuthRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl From<&Credentials> for AuthRequest {
    fn from(credentials: &Credentials) -> Self {
        Self {
            username: credentials.username().to_owned(),
            password: credentials.password().to_owned(),
        }
    }
}

/// Reply from the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthResponse {
    /// The issued bearer token.
    pub token: String,
}

/// Source of bearer tokens for a role.
///
/// Scenario code depends on this trait rather than on [`TokenExchanger`] so
/// that tests can substitute a mock.
#[cfg_attr(test, mockall::automock)]
pub trait TokenSource {
    /// Obtains a fresh token for `role`.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] if the exchange fails at the transport or
    /// decoding level.
    fn get_token(&self, role: Role) -> Result<Token, RequestError>;
}

/// Exchanges role credentials for bearer tokens over HTTP.
#[derive(Debug, Clone)]
pub struct TokenExchanger {
    store: CredentialStore,
    settings: HttpSettings,
}

impl TokenExchanger {
    /// Creates an exchanger for the credentials in `store`.
    #[must_use]
    pub const fn new(store: CredentialStore, settings: HttpSettings) -> Self {
        Self { store, settings }
    }

    /// The credential store backing this exchanger.
    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }
}

impl TokenSource for TokenExchanger {
    fn get_token(&self, role: Role) -> Result<Token, RequestError> {
        let url = self.store.endpoint(TOKEN_PATH);
        let payload = AuthRequest::from(self.store.credentials(role));
        let body = serde_json::to_string(&payload).map_err(|error| RequestError::Encode {
            message: error.to_string(),
        })?;

        debug!(%role, url = %url, "Requesting bearer token");
        let client = self.settings.open_client()?;
        let response = client
            .post(&url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(body)
            .send()
            .map_err(|error| transport_error("POST", &url, &error))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                %role,
                status = status.as_u16(),
                "Token endpoint returned a non-success status"
            );
        }

        let charset = response_charset(response.headers());
        let text = response
            .text_with_charset(&charset)
            .map_err(|error| RequestError::BodyRead {
                url: url.clone(),
                message: error.to_string(),
            })?;

        let auth: AuthResponse =
            serde_json::from_str(&text).map_err(|error| RequestError::Decode {
                url,
                message: error.to_string(),
            })?;
        Ok(Token::new(auth.token))
    }
}

/// Picks the charset label for a token endpoint reply.
///
/// The `Content-Encoding` header names the charset when the server sets it;
/// otherwise UTF-8 is assumed. Labels that are not charsets fall back to
/// UTF-8 when decoded.
fn response_charset(headers: &HeaderMap) -> String {
    headers
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .unwrap_or(DEFAULT_CHARSET)
        .to_owned()
}
