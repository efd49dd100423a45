//! `apiprobe` command-line entry point.
//!
//! Uses `eyre` for opaque error handling at the application boundary,
//! converting domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Configuration file (`~/.config/apiprobe/config.toml` or path from
//!    `APIPROBE_CONFIG_PATH`)
//! 3. Environment variables (`APIPROBE_*`)
//! 4. Command-line arguments

use apiprobe::config::{
    CheckArgs, Cli, Commands, GetArgs, HarnessConfig, PutArgs, TokenArgs, load_config,
};
use apiprobe::credentials::{CredentialStore, Role};
use apiprobe::error::{ConfigError, Result as HarnessResult};
use apiprobe::http::{HttpSettings, RequestExecutor};
use apiprobe::init_tracing;
use apiprobe::session::ApiSession;
use apiprobe::token::{Token, TokenExchanger, TokenSource};
use clap::Parser;
use eyre::{Report, Result as EyreResult};
use reqwest::StatusCode;

/// Application entry point.
///
/// Configuration problems abort before any request is sent.
fn main() -> EyreResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;
    run(&cli, &config).map_err(Report::from)
}

/// Execute the CLI command, returning domain-specific errors.
fn run(cli: &Cli, config: &HarnessConfig) -> HarnessResult<()> {
    let store = CredentialStore::from_config(config)?;
    let settings = HttpSettings::from_config(&config.http)?;
    let mut session = ApiSession::new(
        TokenExchanger::new(store.clone(), settings),
        RequestExecutor::new(settings),
    );

    match &cli.command {
        Commands::Token(args) => print_token(&session, args),
        Commands::Get(args) => get(&mut session, &store, args),
        Commands::Put(args) => put(&mut session, &store, args),
        Commands::Check(args) => check(&mut session, &store, args),
    }
}

/// Print a freshly issued token.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_token(session: &ApiSession, args: &TokenArgs) -> HarnessResult<()> {
    let token = session.token(args.role)?;
    println!("{}", token.as_str());
    Ok(())
}

/// Fetch a token when a role was requested.
fn optional_token<T: TokenSource>(
    session: &ApiSession<T>,
    role: Option<Role>,
) -> HarnessResult<Option<Token>> {
    role.map(|r| session.token(r)).transpose()
}

fn get(session: &mut ApiSession, store: &CredentialStore, args: &GetArgs) -> HarnessResult<()> {
    let url = store.endpoint(&args.path);
    match optional_token(session, args.role)? {
        Some(token) => session.get_with_token(&url, &token)?,
        None => session.get_without_token(&url)?,
    };
    print_response(session)
}

fn put(session: &mut ApiSession, store: &CredentialStore, args: &PutArgs) -> HarnessResult<()> {
    let url = store.endpoint(&args.path);
    match optional_token(session, args.role)? {
        Some(token) => session.update_with_token(&url, &token, &args.payload)?,
        None => session.update_without_token(&url, &args.payload)?,
    };
    print_response(session)
}

/// Issue a GET and compare the status; a mismatch becomes a non-zero exit.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn check(session: &mut ApiSession, store: &CredentialStore, args: &CheckArgs) -> HarnessResult<()> {
    let url = store.endpoint(&args.path);
    let expected = StatusCode::from_u16(args.expect).map_err(|_| ConfigError::InvalidValue {
        field: String::from("--expect"),
        reason: format!("{} is not an HTTP status code", args.expect),
    })?;
    match optional_token(session, args.role)? {
        Some(token) => session.get_with_token(&url, &token)?,
        None => session.get_without_token(&url)?,
    };
    session.assert_status(expected)?;
    println!("{url}: {expected}");
    Ok(())
}

/// Print the status line and body of the stored response.
#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn print_response(session: &mut ApiSession) -> HarnessResult<()> {
    let result = session.holder_mut().take()?;
    println!("{}", result.status());
    let body = result.text()?;
    if !body.is_empty() {
        println!("{body}");
    }
    Ok(())
}
