//! Command-line argument definitions for apiprobe.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

use crate::credentials::Role;

/// Command-line interface for apiprobe.
#[derive(Debug, Parser)]
#[command(name = "apiprobe")]
#[command(
    author,
    version,
    about = "Exercise a token-protected REST API from the command line"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (TOML or `.properties`).
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Base URL of the API under test.
    #[arg(long, global = true)]
    pub base_api_path: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Obtain a bearer token for a role and print it.
    Token(TokenArgs),

    /// Issue a GET request against an API path.
    Get(GetArgs),

    /// Issue a PUT request with a JSON payload against an API path.
    Put(PutArgs),

    /// Issue a GET request and check the response status.
    Check(CheckArgs),
}

/// Arguments for the `token` subcommand.
#[derive(Debug, Parser)]
pub struct TokenArgs {
    /// Role whose credentials are exchanged.
    #[arg(value_enum)]
    pub role: Role,
}

/// Arguments for the `get` subcommand.
#[derive(Debug, Parser)]
pub struct GetArgs {
    /// API path relative to the base API path.
    #[arg(required = true)]
    pub path: String,

    /// Authenticate as this role. Omit to send the request without a token.
    #[arg(long, value_enum)]
    pub role: Option<Role>,
}

/// Arguments for the `put` subcommand.
#[derive(Debug, Parser)]
pub struct PutArgs {
    /// API path relative to the base API path.
    #[arg(required = true)]
    pub path: String,

    /// JSON request body.
    #[arg(long, required = true)]
    pub payload: String,

    /// Authenticate as this role. Omit to send the request without a token.
    #[arg(long, value_enum)]
    pub role: Option<Role>,
}

/// Arguments for the `check` subcommand.
#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// API path relative to the base API path.
    #[arg(required = true)]
    pub path: String,

    /// Expected HTTP status code.
    #[arg(long, required = true)]
    pub expect: u16,

    /// Authenticate as this role. Omit to send the request without a token.
    #[arg(long, value_enum)]
    pub role: Option<Role>,
}
