//! Authenticated request execution against the API under test.
//!
//! Every call acquires its own blocking `reqwest` client and drops it before
//! returning, on success and failure alike. Idle connections are not kept, so
//! no socket or authentication state leaks from one call into the next.
//!
//! Responses come back unread: callers decide whether to look at the body or
//! only at the status. A non-success status is never an error at this layer.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap};
use tracing::{debug, info};

use crate::config::HttpConfig;
use crate::error::RequestError;
use crate::token::Token;

/// Media type sent with every JSON request body.
pub const APPLICATION_JSON: &str = "application/json";

/// Header value sent on unauthenticated updates in legacy mode.
const LEGACY_NULL_BEARER: &str = "Bearer null";

/// Settings applied each time a client is acquired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpSettings {
    timeout: Option<Duration>,
    legacy_null_bearer: bool,
}

impl HttpSettings {
    /// Creates settings with an optional overall request timeout.
    #[must_use]
    pub const fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            legacy_null_bearer: false,
        }
    }

    /// Sends `Authorization: Bearer null` on updates issued without a token.
    #[must_use]
    pub const fn with_legacy_null_bearer(mut self, enabled: bool) -> Self {
        self.legacy_null_bearer = enabled;
        self
    }

    /// Builds settings from the `[http]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the configured timeout is zero.
    pub fn from_config(config: &HttpConfig) -> crate::error::Result<Self> {
        Ok(Self::new(config.timeout()?).with_legacy_null_bearer(config.legacy_null_bearer))
    }

    /// The overall request timeout, if one is configured.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Acquires a fresh client for a single call.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::ClientBuild`] if the TLS backend or resolver
    /// cannot be initialised.
    pub(crate) fn open_client(&self) -> Result<Client, RequestError> {
        let mut builder = Client::builder().pool_max_idle_per_host(0);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build().map_err(|error| RequestError::ClientBuild {
            message: error.to_string(),
        })
    }
}

/// The raw response of one API call together with the URL it came from.
#[derive(Debug)]
pub struct ApiCallResult {
    url: String,
    response: Response,
}

impl ApiCallResult {
    pub(crate) fn new(url: &str, response: Response) -> Self {
        Self {
            url: url.to_owned(),
            response,
        }
    }

    /// The URL the request was sent to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The HTTP status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// The response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    /// Reads the body as text, consuming the result.
    ///
    /// The charset comes from the `Content-Type` header when present and
    /// defaults to UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::BodyRead`] if the body cannot be read.
    pub fn text(self) -> Result<String, RequestError> {
        let Self { url, response } = self;
        response
            .text()
            .map_err(|error| RequestError::BodyRead {
                url,
                message: error.to_string(),
            })
    }

    /// Unwraps the underlying `reqwest` response.
    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Issues GET and PUT requests against fully qualified API URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestExecutor {
    settings: HttpSettings,
}

impl RequestExecutor {
    /// Creates an executor using `settings` for every call.
    #[must_use]
    pub const fn new(settings: HttpSettings) -> Self {
        Self { settings }
    }

    /// Sends a GET request to `url`.
    ///
    /// With a token, exactly one `Authorization: Bearer <token>` header is
    /// sent. Without one, no `Authorization` header is sent at all.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::ClientBuild`] or [`RequestError::Transport`].
    pub fn get(&self, url: &str, token: Option<&Token>) -> Result<ApiCallResult, RequestError> {
        let client = self.settings.open_client()?;
        let request = with_authorization(client.get(url), token.map(bearer));
        execute("GET", url, request)
    }

    /// Sends a PUT request with a JSON `payload` to `url`.
    ///
    /// `Content-Type: application/json` is always set. Token handling matches
    /// [`get`](Self::get) unless legacy mode is enabled, in which case a
    /// missing token is sent as `Bearer null`.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::ClientBuild`] or [`RequestError::Transport`].
    pub fn update(
        &self,
        url: &str,
        token: Option<&Token>,
        payload: &str,
    ) -> Result<ApiCallResult, RequestError> {
        let client = self.settings.open_client()?;
        let authorization = match token {
            Some(token) => Some(bearer(token)),
            None if self.settings.legacy_null_bearer => Some(LEGACY_NULL_BEARER.to_owned()),
            None => None,
        };
        let request = client
            .put(url)
            .header(CONTENT_TYPE, APPLICATION_JSON)
            .body(payload.to_owned());
        execute("PUT", url, with_authorization(request, authorization))
    }
}

/// Formats the `Authorization` header value for `token`.
fn bearer(token: &Token) -> String {
    format!("Bearer {}", token.as_str())
}

fn with_authorization(request: RequestBuilder, authorization: Option<String>) -> RequestBuilder {
    match authorization {
        Some(value) => request.header(AUTHORIZATION, value),
        None => request,
    }
}

/// Sends the request and wraps the response without touching its body.
fn execute(method: &str, url: &str, request: RequestBuilder) -> Result<ApiCallResult, RequestError> {
    debug!(method, url, "Sending API request");
    let response = request
        .send()
        .map_err(|error| transport_error(method, url, &error))?;
    info!(method, url, status = response.status().as_u16(), "API request completed");
    Ok(ApiCallResult::new(url, response))
}

pub(crate) fn transport_error(method: &str, url: &str, error: &reqwest::Error) -> RequestError {
    RequestError::Transport {
        method: method.to_owned(),
        url: url.to_owned(),
        message: error.to_string(),
    }
}
