//! Sequential contract verifier for the Story Spoiler REST API.
//!
//! Authenticates once, then runs the seven ordered scenarios against the
//! configured deployment. Pass/fail per scenario is printed by the
//! reporter; the process exits non-zero when any scenario failed.

mod auth;
mod context;
mod model;
mod payload;
mod story;

use std::sync::Arc;

use eyre::WrapErr;
use spoilcheck_core::{get_config, http::Client, Config, ListReporter, Runner};
use tracing_subscriber::EnvFilter;

use crate::context::Context;

fn build_client(cfg: &Config, bearer: Option<String>) -> eyre::Result<Client> {
    let mut builder = Client::builder(&cfg.base_url);
    if let Some(timeout) = cfg.request_timeout() {
        builder = builder.timeout(timeout);
    }
    if let Some(token) = bearer {
        builder = builder.bearer(token);
    }
    builder
        .build()
        .wrap_err_with(|| format!("failed to construct a client for {:?}", cfg.base_url))
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cfg = get_config();
    eyre::ensure!(
        !cfg.base_url.is_empty(),
        "base_url is not configured; set it in spoilcheck.toml or SPOILCHECK_BASE_URL"
    );

    // Authentication is the one fatal setup step: without a session no
    // scenario can run, so any error here aborts before the runner starts.
    let client = build_client(cfg, None)?;
    let token = auth::authenticate(&client, &cfg.auth)
        .await
        .wrap_err("failed to obtain a session; no scenarios were run")?;

    let client = build_client(cfg, Some(token))?;
    let ctx = Arc::new(Context::new(client));

    let mut runner = Runner::new();
    runner.terminate_channel();
    runner.add_reporter(ListReporter::new(cfg.capture_http));
    story::register(&mut runner, &ctx);

    runner.run(&[]).await
}
