//! The ordered scenario runner.
//!
//! Cases execute strictly sequentially, in registration order, on the
//! current task. The ordering is the contract: later scenarios consume
//! state captured by earlier ones, so there is no parallelism and no
//! retrying here. Execution events flow through a broadcast channel that
//! reporters subscribe to.

use eyre::WrapErr;
use futures::FutureExt;
use once_cell::sync::Lazy;
use std::{
    ops::Deref,
    pin::Pin,
    sync::{Arc, Mutex},
};
use tokio::sync::broadcast;
use tracing::*;

use crate::{config::Config, get_config, http, reporter::Reporter, ModuleName, TestName};

pub static CHANNEL: Lazy<Mutex<Option<broadcast::Sender<Message>>>> =
    Lazy::new(|| Mutex::new(Some(broadcast::channel(1000).0)));

tokio::task_local! {
    static CURRENT: TestInfo;
}

pub fn publish(msg: Message) -> eyre::Result<()> {
    let Ok(guard) = CHANNEL.lock() else {
        eyre::bail!("failed to acquire runner channel lock");
    };
    let Some(tx) = guard.deref() else {
        eyre::bail!("runner channel has been already closed");
    };

    tx.send(msg)
        .wrap_err("failed to publish message to the runner channel")?;

    Ok(())
}

/// Subscribe to the channel to see the real-time test execution events.
pub fn subscribe() -> eyre::Result<broadcast::Receiver<Message>> {
    let Ok(guard) = CHANNEL.lock() else {
        eyre::bail!("failed to acquire runner channel lock");
    };
    let Some(tx) = guard.deref() else {
        eyre::bail!("runner channel has been already closed");
    };

    Ok(tx.subscribe())
}

/// Publish an assertion outcome for the currently running scenario.
/// Outside a runner scope (e.g. a scenario function exercised directly in
/// a unit test) there is no current scenario and nothing to report to, so
/// this is a no-op.
pub fn publish_check(check: Check) -> eyre::Result<()> {
    let Ok(info) = CURRENT.try_with(TestInfo::clone) else {
        return Ok(());
    };
    publish(Message::Check(info.module, info.name, Box::new(check)))
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("panic: {0}")]
    Panicked(String),
    #[error("error: {0}")]
    ErrorReturned(String),
}

/// Outcome of a single assertion macro evaluation.
#[derive(Debug, Clone)]
pub struct Check {
    pub success: bool,
    pub message: String,
}

impl Check {
    pub fn success(message: &str) -> Check {
        Check {
            success: true,
            message: message.into(),
        }
    }

    pub fn error(message: &str) -> Check {
        Check {
            success: false,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    Start(ModuleName, TestName),
    Check(ModuleName, TestName, Box<Check>),
    HttpLog(ModuleName, TestName, Box<http::Log>),
    End(ModuleName, TestName, Test),
}

#[derive(Debug, Clone)]
pub struct Test {
    pub info: TestInfo,
    pub result: Result<(), Error>,
}

#[derive(Debug, Clone)]
pub struct TestInfo {
    pub module: String,
    pub name: String,
}

impl TestInfo {
    /// Full test name including module
    pub fn full_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}

type TestCaseFactory = Arc<
    dyn Fn() -> Pin<Box<dyn futures::Future<Output = eyre::Result<()>> + Send + 'static>>
        + Sync
        + Send
        + 'static,
>;

#[derive(Debug, Clone, Default)]
pub struct Options {
    pub terminate_channel: bool,
}

/// Test case filter trait.
pub trait Filter {
    fn filter(&self, info: &TestInfo) -> bool;
}

/// Filter test cases by full test name.
pub struct TestNameFilter<'a> {
    test_names: &'a [String],
}

impl Filter for TestNameFilter<'_> {
    fn filter(&self, info: &TestInfo) -> bool {
        if self.test_names.is_empty() {
            return true;
        }

        self.test_names
            .iter()
            .any(|test_name| &info.full_name() == test_name)
    }
}

/// Filter test cases by the `test_ignore` config list.
pub struct TestIgnoreFilter {
    test_ignore: Vec<String>,
}

impl TestIgnoreFilter {
    pub fn new(cfg: &Config) -> TestIgnoreFilter {
        TestIgnoreFilter {
            test_ignore: cfg.test_ignore.clone(),
        }
    }
}

impl Filter for TestIgnoreFilter {
    fn filter(&self, info: &TestInfo) -> bool {
        self.test_ignore
            .iter()
            .all(|test_name| &info.full_name() != test_name)
    }
}

#[derive(Default)]
pub struct Runner {
    cfg: Config,
    options: Options,
    test_cases: Vec<(TestInfo, TestCaseFactory)>,
    reporters: Vec<Box<dyn Reporter + Send>>,
}

impl Runner {
    pub fn new() -> Runner {
        Runner::with_config(get_config().clone())
    }

    pub fn with_config(cfg: Config) -> Runner {
        Runner {
            cfg,
            options: Options::default(),
            test_cases: Vec::new(),
            reporters: Vec::new(),
        }
    }

    /// Close the event channel once the run finishes so attached reporters
    /// drain and return. Leave unset when the channel outlives the run.
    pub fn terminate_channel(&mut self) {
        self.options.terminate_channel = true;
    }

    pub fn add_reporter(&mut self, reporter: impl Reporter + 'static + Send) {
        self.reporters.push(Box::new(reporter));
    }

    /// Add a test case to the runner. Registration order is execution order.
    pub fn add_test(&mut self, name: &str, module: &str, factory: TestCaseFactory) {
        self.test_cases.push((
            TestInfo {
                name: name.into(),
                module: module.into(),
            },
            factory,
        ));
    }

    /// Run every registered case in order. Individual failures are
    /// reported and do not stop the sequence; the returned error only
    /// states that at least one scenario failed.
    pub async fn run(&mut self, test_names: &[String]) -> eyre::Result<()> {
        let mut reporters = std::mem::take(&mut self.reporters);
        let reporters =
            futures::future::join_all(reporters.iter_mut().map(|reporter| reporter.run().boxed()));

        let name_filter = TestNameFilter { test_names };
        let ignore_filter = TestIgnoreFilter::new(&self.cfg);
        let test_cases = self.test_cases.clone();
        let options = self.options.clone();

        let runner = async move {
            let mut executed = 0usize;
            let mut failed = 0usize;

            for (info, factory) in test_cases {
                if !name_filter.filter(&info) || !ignore_filter.filter(&info) {
                    debug!("skipping {}", info.full_name());
                    continue;
                }

                executed += 1;
                if !Self::run_one(info, factory).await? {
                    failed += 1;
                }
            }

            if executed == 0 {
                console::Term::stdout().write_line("no test cases found")?;
            }

            debug!("all tests finished");

            if options.terminate_channel {
                let Ok(mut guard) = CHANNEL.lock() else {
                    eyre::bail!("failed to acquire runner channel lock");
                };
                guard.take(); // closing the runner channel.
            }

            if failed > 0 {
                eyre::bail!("{failed} of {executed} scenarios failed");
            }

            eyre::Ok(())
        };

        // Reporters are polled first so their subscriptions exist before
        // the first event is published.
        let (_, result) = tokio::join!(reporters, runner);

        debug!("runner stopped");

        result
    }

    /// Execute a single case: scope the per-test http capture channel and
    /// the current-test context, translate panics and returned errors into
    /// a reported result, and forward the captured traffic.
    async fn run_one(info: TestInfo, factory: TestCaseFactory) -> eyre::Result<bool> {
        let scoped = info.clone();
        CURRENT
            .scope(
                scoped,
                http::CHANNEL.scope(
                    Arc::new(Mutex::new(Some(broadcast::channel(1000).0))),
                    async move {
                        let mut http_rx = http::subscribe()?;

                        publish(Message::Start(info.module.clone(), info.name.clone()))
                            .wrap_err("failed to send Message::Start to the channel")?;

                        let res = std::panic::AssertUnwindSafe(async { factory().await })
                            .catch_unwind()
                            .await;

                        let test_name = &info.name;
                        let result = match res {
                            Ok(Ok(())) => {
                                debug!("{test_name} ok");
                                Ok(())
                            }
                            Ok(Err(e)) => {
                                debug!("{test_name} failed: {e:#}");
                                Err(Error::ErrorReturned(format!("{e:?}")))
                            }
                            Err(e) => {
                                let panic_message = if let Some(panic_message) =
                                    e.downcast_ref::<&str>()
                                {
                                    format!("{test_name} failed with message: {panic_message}")
                                } else if let Some(panic_message) = e.downcast_ref::<String>() {
                                    format!("{test_name} failed with message: {panic_message}")
                                } else {
                                    format!("{test_name} failed with unknown message")
                                };
                                Err(Error::Panicked(panic_message))
                            }
                        };

                        while let Ok(log) = http_rx.try_recv() {
                            publish(Message::HttpLog(
                                info.module.clone(),
                                info.name.clone(),
                                Box::new(log),
                            ))
                            .wrap_err("failed to send Message::HttpLog to the channel")?;
                        }

                        let passed = result.is_ok();
                        publish(Message::End(
                            info.module.clone(),
                            info.name.clone(),
                            Test { info, result },
                        ))
                        .wrap_err("failed to send Message::End to the channel")?;

                        eyre::Ok(passed)
                    },
                ),
            )
            .await
    }

    pub fn list(&self) -> Vec<&TestInfo> {
        self.test_cases
            .iter()
            .map(|(meta, _test)| meta)
            .collect::<Vec<_>>()
    }
}
