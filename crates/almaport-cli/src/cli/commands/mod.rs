//! CLI command handlers.

pub mod activities;
pub mod auth;
pub mod config;
pub mod contact;
pub mod events;
pub mod gallery;
pub mod projects;
pub mod staff;

use std::sync::Arc;

use almaport_client::config::Config;
use almaport_client::error::{ApiError, ApiErrorKind};
use almaport_client::session::SessionClient;
use almaport_client::session::store::FileTokenStore;
use anyhow::{Context, Result};

/// Builds a session client over the default on-disk token store.
pub(crate) fn new_client(config: &Config) -> Result<SessionClient> {
    let store = Arc::new(FileTokenStore::open_default());
    SessionClient::new(config, store).context("build session client")
}

/// Wraps an API error, adding the re-login hint after session expiry.
pub(crate) fn api_error(client: &SessionClient, err: ApiError) -> anyhow::Error {
    if err.kind == ApiErrorKind::SessionExpired
        && let Some(expiry) = client.subscribe().borrow().clone()
    {
        return anyhow::anyhow!("Session expired, sign in again at {}", expiry.login_route());
    }
    anyhow::Error::new(err)
}
