//! Role credentials and the base API path.
//!
//! A [`CredentialStore`] is built once from a merged [`HarnessConfig`] and is
//! read-only afterwards. It is passed by reference to the token exchanger, so
//! separate stores can drive isolated test runs side by side.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::HarnessConfig;
use crate::error::{ConfigError, Result};

/// The identity a token is requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// An ordinary user with read access.
    User,
    /// An administrator with write access.
    Admin,
}

impl Role {
    /// Every role, in the order their configuration keys are validated.
    pub const ALL: [Self; 2] = [Self::Admin, Self::User];

    /// Configuration key prefix for this role (`admin` or `user`).
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Username and password for one role.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    role: Role,
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials for `role`.
    #[must_use]
    pub fn new(role: Role, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            role,
            username: username.into(),
            password: password.into(),
        }
    }

    /// The role these credentials belong to.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// The login username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("role", &self.role)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The credentials for both roles plus the base API path.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    base_api_path: String,
    admin: Credentials,
    user: Credentials,
}

impl CredentialStore {
    /// Creates a store from already-validated values.
    #[must_use]
    pub fn new(base_api_path: impl Into<String>, admin: Credentials, user: Credentials) -> Self {
        let mut base = base_api_path.into();
        let trimmed_len = base.trim_end_matches('/').len();
        base.truncate(trimmed_len);
        Self {
            base_api_path: base,
            admin,
            user,
        }
    }

    /// Builds the store from merged configuration.
    ///
    /// Every required key is checked before failing so that a single error
    /// names all of them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` listing every missing or blank
    /// key among `base_api_path`, `admin.username`, `admin.password`,
    /// `user.username` and `user.password`.
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        let mut missing: Vec<String> = Vec::new();

        let base = required(
            config.base_api_path.as_deref().map(str::trim),
            "base_api_path",
            &mut missing,
        );
        let [admin, user] = Role::ALL.map(|role| {
            let section = config.role(role);
            let key = role.config_key();
            let username = required(
                section.username.as_deref(),
                &format!("{key}.username"),
                &mut missing,
            );
            let password = required(
                section.password.as_deref(),
                &format!("{key}.password"),
                &mut missing,
            );
            Credentials::new(role, username, password)
        });

        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: missing.join(", "),
            }
            .into());
        }

        let store = Self::new(base, admin, user);
        info!(base_api_path = %store.base_api_path, "Base API path configured");
        for role in Role::ALL {
            info!(%role, username = %store.credentials(role).username(), "Credentials configured");
        }
        Ok(store)
    }

    /// The base URL every API path lives under.
    #[must_use]
    pub fn base_api_path(&self) -> &str {
        &self.base_api_path
    }

    /// Looks up the credentials for `role`.
    #[must_use]
    pub const fn credentials(&self, role: Role) -> &Credentials {
        match role {
            Role::Admin => &self.admin,
            Role::User => &self.user,
        }
    }

    /// Joins `suffix` onto the base API path with exactly one `/`.
    #[must_use]
    pub fn endpoint(&self, suffix: &str) -> String {
        let trimmed = suffix.trim_start_matches('/');
        if trimmed.is_empty() {
            return self.base_api_path.clone();
        }
        format!("{}/{trimmed}", self.base_api_path)
    }
}

/// Returns the value as configured, or records `key` as missing and returns
/// an empty string. Whitespace-only values count as missing.
fn required(value: Option<&str>, key: &str, missing: &mut Vec<String>) -> String {
    match value.filter(|v| !v.trim().is_empty()) {
        Some(v) => v.to_owned(),
        None => {
            missing.push(key.to_owned());
            String::new()
        }
    }
}
