//! Configuration data types for apiprobe.

use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};

use crate::credentials::Role;

/// Login credentials for a single role.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct RoleCredentialsConfig {
    /// The username sent to the token endpoint.
    pub username: Option<String>,

    /// The password sent to the token endpoint.
    pub password: Option<String>,
}

impl std::fmt::Debug for RoleCredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleCredentialsConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// HTTP client settings applied each time a client is acquired.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Overall request timeout in seconds. Unset keeps the client default.
    pub timeout_secs: Option<u64>,

    /// Send `Authorization: Bearer null` on unauthenticated updates.
    ///
    /// Some servers under test were written against a harness that always set
    /// the header on PUT requests, even without a token. Leave this off unless
    /// a server depends on it.
    pub legacy_null_bearer: bool,
}

impl HttpConfig {
    /// Returns the configured timeout as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the timeout is zero.
    pub fn timeout(&self) -> crate::error::Result<Option<Duration>> {
        match self.timeout_secs {
            Some(0) => Err(crate::error::ConfigError::InvalidValue {
                field: String::from("http.timeout_secs"),
                reason: String::from("must be greater than zero"),
            }
            .into()),
            Some(secs) => Ok(Some(Duration::from_secs(secs))),
            None => Ok(None),
        }
    }
}

/// Root harness configuration.
///
/// Loaded from configuration files, environment variables, and command-line
/// arguments with layered precedence (lowest to highest): defaults,
/// configuration file, environment variables, command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `APIPROBE_CONFIG_PATH` environment variable
/// 2. `.apiprobe.toml` in the current working directory
/// 3. `.apiprobe.toml` in the home directory
/// 4. `~/.config/apiprobe/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "APIPROBE",
    post_merge_hook,
    discovery(
        app_name = "apiprobe",
        env_var = "APIPROBE_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".apiprobe.toml",
        config_cli_long = "config",
        config_cli_visible = true,
    )
)]
pub struct HarnessConfig {
    /// Base URL of the API under test, e.g. `http://localhost:8080/api`.
    pub base_api_path: Option<String>,

    /// Administrator credentials.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub admin: RoleCredentialsConfig,

    /// Ordinary user credentials.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub user: RoleCredentialsConfig,

    /// HTTP client settings.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub http: HttpConfig,
}

impl HarnessConfig {
    /// Returns the configured credentials for `role`.
    #[must_use]
    pub const fn role(&self, role: Role) -> &RoleCredentialsConfig {
        match role {
            Role::Admin => &self.admin,
            Role::User => &self.user,
        }
    }
}

impl PostMergeHook for HarnessConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Trailing slashes would double up when paths are joined.
        if let Some(base) = self.base_api_path.as_mut() {
            let trimmed_len = base.trim_end_matches('/').len();
            base.truncate(trimmed_len);
        }
        Ok(())
    }
}
