//! Scenario-facing API: step operations, the response holder, and status checks.
//!
//! An [`ApiSession`] is what a scenario runner drives. It fetches tokens via a
//! [`TokenSource`], sends requests through a [`RequestExecutor`], and keeps
//! only the most recent response in its [`ResponseHolder`] for assertions.
//!
//! Sessions are single-threaded: one request is in flight and inspected at a
//! time.

use reqwest::StatusCode;

use crate::credentials::Role;
use crate::error::{Result, ScenarioError};
use crate::http::{ApiCallResult, RequestExecutor};
use crate::token::{Token, TokenExchanger, TokenSource};

/// Single-slot store for the most recent API response.
///
/// Reading an empty holder fails with [`ScenarioError::NoResponseRecorded`]
/// rather than returning a previous scenario's data.
#[derive(Debug, Default)]
pub struct ResponseHolder {
    api_path: Option<String>,
    response: Option<ApiCallResult>,
}

impl ResponseHolder {
    /// Creates an empty holder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            api_path: None,
            response: None,
        }
    }

    /// Replaces the stored response and request path.
    pub fn record(&mut self, api_path: &str, result: ApiCallResult) {
        self.api_path = Some(api_path.to_owned());
        self.response = Some(result);
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.response.is_none()
    }

    /// The path of the most recent request.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoResponseRecorded`] if no call has been made.
    pub fn api_path(&self) -> std::result::Result<&str, ScenarioError> {
        self.api_path
            .as_deref()
            .ok_or(ScenarioError::NoResponseRecorded)
    }

    /// The most recent response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoResponseRecorded`] if no call has been made.
    pub fn response(&self) -> std::result::Result<&ApiCallResult, ScenarioError> {
        self.response
            .as_ref()
            .ok_or(ScenarioError::NoResponseRecorded)
    }

    /// The status of the most recent response.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoResponseRecorded`] if no call has been made.
    pub fn status(&self) -> std::result::Result<StatusCode, ScenarioError> {
        self.response().map(ApiCallResult::status)
    }

    /// Removes and returns the most recent response, e.g. to read its body.
    ///
    /// The holder is empty afterwards, path included.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoResponseRecorded`] if the holder is empty.
    pub fn take(&mut self) -> std::result::Result<ApiCallResult, ScenarioError> {
        self.api_path = None;
        self.response.take().ok_or(ScenarioError::NoResponseRecorded)
    }

    /// Empties the holder.
    pub fn clear(&mut self) {
        self.api_path = None;
        self.response = None;
    }
}

/// Drives one scenario against the API under test.
#[derive(Debug)]
pub struct ApiSession<T = TokenExchanger> {
    tokens: T,
    executor: RequestExecutor,
    holder: ResponseHolder,
}

impl<T: TokenSource> ApiSession<T> {
    /// Creates a session with an empty response holder.
    #[must_use]
    pub const fn new(tokens: T, executor: RequestExecutor) -> Self {
        Self {
            tokens,
            executor,
            holder: ResponseHolder::new(),
        }
    }

    /// Obtains a fresh token for `role`.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` if the exchange fails.
    pub fn token(&self, role: Role) -> Result<Token> {
        Ok(self.tokens.get_token(role)?)
    }

    /// Obtains a fresh token for the ordinary user.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` if the exchange fails.
    pub fn user_token(&self) -> Result<Token> {
        self.token(Role::User)
    }

    /// Obtains a fresh token for the administrator.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` if the exchange fails.
    pub fn admin_token(&self) -> Result<Token> {
        self.token(Role::Admin)
    }

    /// GETs `api_path` with a bearer token and records the response.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` on transport failure.
    pub fn get_with_token(&mut self, api_path: &str, token: &Token) -> Result<StatusCode> {
        let result = self.executor.get(api_path, Some(token))?;
        Ok(self.record(api_path, result))
    }

    /// GETs `api_path` without authentication and records the response.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` on transport failure.
    pub fn get_without_token(&mut self, api_path: &str) -> Result<StatusCode> {
        let result = self.executor.get(api_path, None)?;
        Ok(self.record(api_path, result))
    }

    /// PUTs `payload` to `api_path` with a bearer token and records the response.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` on transport failure.
    pub fn update_with_token(
        &mut self,
        api_path: &str,
        token: &Token,
        payload: &str,
    ) -> Result<StatusCode> {
        let result = self.executor.update(api_path, Some(token), payload)?;
        Ok(self.record(api_path, result))
    }

    /// PUTs `payload` to `api_path` without a token and records the response.
    ///
    /// # Errors
    ///
    /// Returns `RequestError` on transport failure.
    pub fn update_without_token(&mut self, api_path: &str, payload: &str) -> Result<StatusCode> {
        let result = self.executor.update(api_path, None, payload)?;
        Ok(self.record(api_path, result))
    }

    fn record(&mut self, api_path: &str, result: ApiCallResult) -> StatusCode {
        let status = result.status();
        self.holder.record(api_path, result);
        status
    }
}

impl<T> ApiSession<T> {
    /// The response holder.
    #[must_use]
    pub const fn holder(&self) -> &ResponseHolder {
        &self.holder
    }

    /// Mutable access to the response holder, e.g. to take the body.
    pub const fn holder_mut(&mut self) -> &mut ResponseHolder {
        &mut self.holder
    }

    /// Checks that the stored response carries `expected`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::NoResponseRecorded`] before any call and
    /// [`ScenarioError::UnexpectedStatus`] on a mismatch.
    pub fn assert_status(&self, expected: StatusCode) -> Result<()> {
        let actual = self.holder.status()?;
        if actual == expected {
            return Ok(());
        }
        Err(ScenarioError::UnexpectedStatus {
            path: self.holder.api_path()?.to_owned(),
            expected: expected.as_u16(),
            actual: actual.as_u16(),
        }
        .into())
    }

    /// Checks for `401 Unauthorized`.
    ///
    /// # Errors
    ///
    /// See [`assert_status`](Self::assert_status).
    pub fn assert_unauthorized(&self) -> Result<()> {
        self.assert_status(StatusCode::UNAUTHORIZED)
    }

    /// Checks for `404 Not Found`.
    ///
    /// # Errors
    ///
    /// See [`assert_status`](Self::assert_status).
    pub fn assert_not_found(&self) -> Result<()> {
        self.assert_status(StatusCode::NOT_FOUND)
    }

    /// Checks for `403 Forbidden`.
    ///
    /// # Errors
    ///
    /// See [`assert_status`](Self::assert_status).
    pub fn assert_forbidden(&self) -> Result<()> {
        self.assert_status(StatusCode::FORBIDDEN)
    }
}
