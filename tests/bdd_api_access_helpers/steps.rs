//! Given/when step definitions for authenticated API access scenarios.

use std::sync::Arc;

use apiprobe::credentials::{CredentialStore, Credentials, Role};
use apiprobe::error::{ApiProbeError, RequestError};
use apiprobe::http::{HttpSettings, RequestExecutor};
use apiprobe::session::ApiSession;
use apiprobe::token::TokenExchanger;
use clap::ValueEnum;
use rstest_bdd_macros::{given, when};

use super::state::{ApiAccessState, SharedSession, StepResult, UPDATE_PAYLOAD};
use crate::stub_api::{StubApi, unreachable_base_api_path};

/// How a step calls the API.
#[derive(Debug, Clone, Copy)]
enum Call {
    Get,
    Update,
}

#[given("the API issues token {token} to {username} with password {password}")]
fn api_issues_token(
    api_access_state: &ApiAccessState,
    token: String,
    username: String,
    password: String,
) {
    let api = api_access_state.api.get().unwrap_or_default();
    api_access_state
        .api
        .set(api.with_account(&username, &password, &token));
}

#[given("the API serves the path {path}")]
fn api_serves_path(api_access_state: &ApiAccessState, path: String) {
    let api = api_access_state.api.get().unwrap_or_default();
    api_access_state.api.set(api.with_path(&path));
}

#[given("the API grants privilege to token {token}")]
fn api_grants_privilege(api_access_state: &ApiAccessState, token: String) {
    let api = api_access_state.api.get().unwrap_or_default();
    api_access_state.api.set(api.with_privileged_token(&token));
}

#[given("the API is not running")]
fn api_is_not_running(api_access_state: &ApiAccessState) {
    api_access_state.api_unreachable.set(true);
}

#[when("the path {path} is fetched without a token")]
fn path_fetched_without_token(api_access_state: &ApiAccessState, path: String) -> StepResult<()> {
    call_api(api_access_state, Call::Get, &path, None)
}

#[when("the path {path} is fetched with the {role} token")]
fn path_fetched_with_token(
    api_access_state: &ApiAccessState,
    path: String,
    role: String,
) -> StepResult<()> {
    call_api(api_access_state, Call::Get, &path, Some(parse_role(&role)?))
}

#[when("the path {path} is updated without a token")]
fn path_updated_without_token(api_access_state: &ApiAccessState, path: String) -> StepResult<()> {
    call_api(api_access_state, Call::Update, &path, None)
}

#[when("the path {path} is updated with the {role} token")]
fn path_updated_with_token(
    api_access_state: &ApiAccessState,
    path: String,
    role: String,
) -> StepResult<()> {
    call_api(
        api_access_state,
        Call::Update,
        &path,
        Some(parse_role(&role)?),
    )
}

fn call_api(
    state: &ApiAccessState,
    call: Call,
    path: &str,
    role: Option<Role>,
) -> StepResult<()> {
    let base_api_path = ensure_base_api_path(state)?;
    let store = CredentialStore::new(
        base_api_path,
        Credentials::new(Role::Admin, "admin", "admin-pass"),
        Credentials::new(Role::User, "user", "user-pass"),
    );
    let url = store.endpoint(path);
    let settings = HttpSettings::default();
    let session = SharedSession::new(ApiSession::new(
        TokenExchanger::new(store, settings),
        RequestExecutor::new(settings),
    ));

    let outcome = session.with(|api| -> Result<(), ApiProbeError> {
        let token = role.map(|r| api.token(r)).transpose()?;
        match (call, token) {
            (Call::Get, Some(token)) => api.get_with_token(&url, &token)?,
            (Call::Get, None) => api.get_without_token(&url)?,
            (Call::Update, Some(token)) => api.update_with_token(&url, &token, UPDATE_PAYLOAD)?,
            (Call::Update, None) => api.update_without_token(&url, UPDATE_PAYLOAD)?,
        };
        Ok(())
    });

    match outcome {
        Ok(()) => {}
        Err(ApiProbeError::Request(error @ RequestError::Transport { .. })) => {
            state.call_error.set(error.to_string());
        }
        Err(error) => return Err(format!("API call to {url} failed: {error}")),
    }
    state.session.set(session);
    Ok(())
}

fn ensure_base_api_path(state: &ApiAccessState) -> StepResult<String> {
    if state.api_unreachable.get().unwrap_or(false) {
        return unreachable_base_api_path();
    }
    if let Some(stub) = state.stub.get() {
        return Ok(stub.base_api_path().to_owned());
    }

    let stub = Arc::new(StubApi::start(state.api.get().unwrap_or_default())?);
    let base_api_path = stub.base_api_path().to_owned();
    state.stub.set(stub);
    Ok(base_api_path)
}

fn parse_role(value: &str) -> StepResult<Role> {
    Role::from_str(value, true).map_err(|error| format!("unknown role '{value}': {error}"))
}
