//! Reporters consume the runner's event channel and turn it into output.

use console::{style, Term};
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::*;

use crate::{
    http,
    runner::{self, Check, Test},
};

/// Reporter trait. The trait is based on the "template method" pattern.
/// Implement the on_xxx hooks to observe the run; override `run` only when
/// you need full control over the event loop.
#[async_trait::async_trait]
pub trait Reporter {
    async fn run(&mut self) -> eyre::Result<()> {
        let mut rx = runner::subscribe()?;

        loop {
            match rx.recv().await {
                Ok(runner::Message::Start(module, test_name)) => {
                    self.on_start(module, test_name).await?;
                }
                Ok(runner::Message::Check(module, test_name, check)) => {
                    self.on_check(module, test_name, check).await?;
                }
                Ok(runner::Message::HttpLog(module, test_name, log)) => {
                    self.on_http_call(module, test_name, log).await?;
                }
                Ok(runner::Message::End(module, test_name, test)) => {
                    self.on_end(module, test_name, test).await?;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("runner channel has been closed");
                    break;
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    debug!("runner channel recv error");
                    continue;
                }
            }
        }

        Ok(())
    }

    /// Called when a scenario starts.
    async fn on_start(&mut self, _module: String, _test_name: String) -> eyre::Result<()> {
        Ok(())
    }

    /// Called for every assertion a scenario evaluates.
    async fn on_check(
        &mut self,
        _module: String,
        _test_name: String,
        _check: Box<Check>,
    ) -> eyre::Result<()> {
        Ok(())
    }

    /// Called for every HTTP call a scenario made.
    async fn on_http_call(
        &mut self,
        _module: String,
        _test_name: String,
        _log: Box<http::Log>,
    ) -> eyre::Result<()> {
        Ok(())
    }

    /// Called when a scenario ends.
    async fn on_end(
        &mut self,
        _module: String,
        _test_name: String,
        _test: Test,
    ) -> eyre::Result<()> {
        Ok(())
    }
}

pub struct NullReporter;

#[async_trait::async_trait]
impl Reporter for NullReporter {}

/// Prints one ✓/✘ line per scenario and, when http capture is on, the
/// dimmed request/response traffic that led up to it.
#[allow(clippy::vec_box)]
pub struct ListReporter {
    terminal: Term,
    buffer: HashMap<String, Vec<Box<http::Log>>>,
    capture_http: bool,
}

impl ListReporter {
    pub fn new(capture_http: bool) -> ListReporter {
        ListReporter {
            terminal: Term::stdout(),
            buffer: HashMap::new(),
            capture_http,
        }
    }
}

#[async_trait::async_trait]
impl Reporter for ListReporter {
    async fn on_start(&mut self, module: String, test_name: String) -> eyre::Result<()> {
        self.buffer.insert(format!("{module}::{test_name}"), Vec::new());
        Ok(())
    }

    async fn on_http_call(
        &mut self,
        module: String,
        test_name: String,
        log: Box<http::Log>,
    ) -> eyre::Result<()> {
        if self.capture_http {
            let key = format!("{module}::{test_name}");
            self.buffer
                .get_mut(&key)
                .ok_or_else(|| eyre::eyre!("scenario \"{key}\" not found in the buffer"))?
                .push(log);
        }
        Ok(())
    }

    async fn on_end(
        &mut self,
        module: String,
        test_name: String,
        test: Test,
    ) -> eyre::Result<()> {
        let key = format!("{module}::{test_name}");
        let http_logs = self
            .buffer
            .remove(&key)
            .ok_or_else(|| eyre::eyre!("scenario \"{key}\" not found in the buffer"))?;

        for log in http_logs {
            write(
                &self.terminal,
                format!(" => {} {}", log.request.method, log.request.url),
            )?;
            write(&self.terminal, "  > request:")?;
            write(&self.terminal, "    > headers:")?;
            for (key, value) in &log.request.headers {
                write(
                    &self.terminal,
                    format!("       > {key}: {}", value.to_str().unwrap_or("<binary>")),
                )?;
            }
            write(&self.terminal, "  < response")?;
            if let Some(status) = log.response.status {
                write(&self.terminal, format!("    < status: {status}"))?;
            }
            write(&self.terminal, "    < headers:")?;
            for (key, value) in &log.response.headers {
                write(
                    &self.terminal,
                    format!("       < {key}: {}", value.to_str().unwrap_or("<binary>")),
                )?;
            }
            write(&self.terminal, format!("    < body: {}", log.response.body))?;
        }

        let Test { info, result } = test;
        match result {
            Ok(()) => {
                let status = style("✓").green();
                self.terminal
                    .write_line(&format!("{status} {}::{}", info.module, info.name))?;
            }
            Err(e) => {
                let status = style("✘").red();
                self.terminal
                    .write_line(&format!("{status} {}::{}: {e:#}", info.module, info.name))?;
            }
        }

        Ok(())
    }
}

fn write(term: &Term, s: impl AsRef<str>) -> eyre::Result<()> {
    use eyre::WrapErr;

    let colored = style(s.as_ref()).dim();
    term.write_line(&format!("{colored}"))
        .wrap_err("failed to write character on terminal")
}
