//! # spoilcheck-core
//!
//! The harness underneath the Story Spoiler contract verifier. It provides
//! the building blocks for a sequential, stateful API-contract test suite:
//!
//! - an HTTP session wrapper pinning a base URL and bearer token
//! - assertion macros that fail a scenario without killing the run
//! - a strictly ordered scenario runner with an event channel
//! - pluggable reporters consuming that channel
//! - TOML + environment configuration
//!
//! ## Event flow (block diagram)
//!
//! ```text
//! +---------------------+      +---------------------+      +---------------------+
//! | scenario functions  | ---> | runner (sequential) | ---> | reporter (output)   |
//! | Runner::add_test    |      | + event channel     |      | List/Null/custom    |
//! +---------------------+      +---------------------+      +---------------------+
//!            |                           ^                            ^
//!            v                           |                            |
//! +---------------------+                |                 +---------------------+
//! | assertion macros    | ---publish-----+----publish----- | HTTP client + logs  |
//! | check!, check_eq!   |                                  | req/res capture     |
//! +---------------------+                                  +---------------------+
//! ```
//!
//! Scenario ordering is the load-bearing guarantee: cases execute one at a
//! time, in registration order, on the current task. State captured by an
//! early scenario (such as a created resource id) is carried to later ones
//! through whatever context the scenario closures share.

#[doc(hidden)]
pub mod assertion;
pub mod config;
pub mod error;
pub mod http;
pub mod reporter;
#[doc(hidden)]
pub mod runner;

// Re-export the crates the assertion macros expand into.
pub use eyre;
pub use pretty_assertions;

/// Module portion of a scenario's full name, e.g. "story".
pub type ModuleName = String;

/// Scenario name within a module.
pub type TestName = String;

pub use config::{get_config, Config, Credentials};
pub use error::{Error, Result};
pub use reporter::{ListReporter, NullReporter, Reporter};
pub use runner::{Filter, Runner, TestIgnoreFilter, TestInfo, TestNameFilter};
