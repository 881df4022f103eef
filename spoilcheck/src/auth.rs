//! One-shot JWT exchange against the authentication endpoint.

use eyre::OptionExt;
use serde::{Deserialize, Serialize};
use spoilcheck_core::{http::Client, Credentials};
use tracing::*;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthRequest<'a> {
    user_name: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    access_token: Option<String>,
}

/// Exchange credentials for a bearer token. Any failure here is fatal to
/// the whole run: without a session no scenario can execute, so the caller
/// is expected to abort before registering any.
pub async fn authenticate(client: &Client, credentials: &Credentials) -> eyre::Result<String> {
    let res = client
        .post("/api/User/Authentication")
        .json(&AuthRequest {
            user_name: &credentials.username,
            password: &credentials.password,
        })
        .send()
        .await?;

    eyre::ensure!(
        res.status().is_success(),
        "authentication failed with status {}",
        res.status()
    );

    let body: AuthResponse = res.json().await?;
    let token = body
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_eyre("authentication response did not contain an access token")?;

    debug!("authenticated as {}", credentials.username);
    Ok(token)
}
