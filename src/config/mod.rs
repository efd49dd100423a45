//! Configuration system for apiprobe.
//!
//! This module provides the configuration structures and CLI definitions for the
//! harness. Layer merging is handled by the `ortho_config` crate. Precedence:
//! CLI flags override environment variables, which override configuration
//! files, which override defaults.
//!
//! The configuration file is expected at `~/.config/apiprobe/config.toml` by
//! default.
//!
//! # Example Configuration
//!
//! ```toml
//! base_api_path = "http://localhost:8080/api"
//!
//! [admin]
//! username = "admin"
//! password = "admin"
//!
//! [user]
//! username = "user"
//! password = "user"
//!
//! [http]
//! timeout_secs = 30
//! legacy_null_bearer = false
//! ```
//!
//! The same keys can be supplied as a `.properties` file:
//!
//! ```text
//! baseApiPath=http://localhost:8080/api
//! admin.username=admin
//! admin.password=admin
//! user.username=user
//! user.password=user
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{CheckArgs, Cli, Commands, GetArgs, PutArgs, TokenArgs};
pub use loader::{env_var_names, load_config};
pub use types::{HarnessConfig, HttpConfig, RoleCredentialsConfig};
