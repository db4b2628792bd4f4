//! Session command handlers.

use std::io::{self, BufRead, Write};

use almaport_client::config::Config;
use almaport_client::session::store::{FileTokenStore, TokenKind, TokenStore, mask_token};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use super::{api_error, new_client};

pub async fn login(
    config: &Config,
    email: &str,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let password = resolve_password(password)?;

    let client = new_client(config)?;
    client
        .login(email, &password, remember)
        .await
        .map_err(|e| api_error(&client, e))?;

    println!("✓ Signed in as {email}");
    if remember {
        println!("  Session will be kept for 30 days.");
    }
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let client = new_client(config)?;
    client.logout().map_err(|e| api_error(&client, e))?;
    println!("✓ Signed out");
    Ok(())
}

pub fn status() -> Result<()> {
    let store = FileTokenStore::open_default();
    let access = store.get(TokenKind::Access).context("read session store")?;
    let refresh = store.get(TokenKind::Refresh).context("read session store")?;

    if access.is_none() && refresh.is_none() {
        println!("Not signed in (no session found).");
        return Ok(());
    }

    match access {
        Some(token) => println!(
            "Access token:  {} (expires {})",
            mask_token(&token.value),
            format_expiry(token.expires)
        ),
        None => println!("Access token:  expired"),
    }
    match refresh {
        Some(token) => println!(
            "Refresh token: {} (expires {})",
            mask_token(&token.value),
            format_expiry(token.expires)
        ),
        None => println!("Refresh token: expired"),
    }
    Ok(())
}

fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password
        && !password.is_empty()
    {
        return Ok(password);
    }

    print!("Password: ");
    io::stdout().flush().context("flush password prompt")?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .context("read password")?;

    let password = input.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("No password provided");
    }
    Ok(password)
}

fn format_expiry(millis: u64) -> String {
    i64::try_from(millis)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map_or_else(
            || "unknown".to_string(),
            |when| when.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
}
