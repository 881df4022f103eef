//! # Configuration Module
//!
//! Handles loading the verifier configuration from `spoilcheck.toml`,
//! `.env` files and environment variables. Credentials and the base URL of
//! the deployment under test are configuration, never constants in code.
//!
//! ## Config File Location
//!
//! The configuration file is loaded in the following order:
//!
//! 1. If `SPOILCHECK_CONFIG` environment variable is set, load from that path
//! 2. Otherwise, load from `spoilcheck.toml` in the current directory
//!
//! **Note:** `SPOILCHECK_CONFIG` is reserved for specifying the config file
//! path. Individual keys are overridden with their own variables instead:
//! `SPOILCHECK_BASE_URL`, `SPOILCHECK_TIMEOUT`, `SPOILCHECK_CAPTURE_HTTP`,
//! `SPOILCHECK_USERNAME` and `SPOILCHECK_PASSWORD`. Environment variables
//! win over file values, so CI secrets never need to live in the file.
//!
//! ## Configuration Structure
//!
//! ```toml
//! base_url = "https://staging.example.com"
//! timeout = 30000
//! capture_http = false
//! test_ignore = ["story::delete_missing_story"]
//!
//! [auth]
//! username = "someone"
//! password = "secret"
//! ```

use once_cell::sync::Lazy;
use serde::Deserialize;
use std::{fmt, io::Read, path::Path, time::Duration};
use tracing::*;

use crate::{Error, Result};

/// Environment variable name for specifying the config file path.
const SPOILCHECK_CONFIG_ENV: &str = "SPOILCHECK_CONFIG";

static CONFIG: Lazy<Config> = Lazy::new(|| {
    let _ = dotenv::dotenv();
    Config::load().unwrap_or_default()
});

/// Get the configuration for the current run. Loaded once per process.
pub fn get_config() -> &'static Config {
    &CONFIG
}

/// The verifier's configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Base URL of the API deployment under test.
    #[serde(default)]
    pub base_url: String,
    /// Per-request timeout in milliseconds. The HTTP client default applies
    /// when unset.
    #[serde(default)]
    pub timeout: Option<u64>,
    /// Echo captured request/response traffic through the reporter.
    #[serde(default)]
    pub capture_http: bool,
    /// Full scenario names to skip, e.g. "story::delete_missing_story".
    #[serde(default)]
    pub test_ignore: Vec<String>,
    #[serde(default)]
    pub auth: Credentials,
}

/// Credentials exchanged for a bearer token at suite start.
#[derive(Clone, Default, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// The password must not leak into logs or reporter output.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"*****")
            .finish()
    }
}

impl Config {
    /// Load the configuration from a TOML file. A missing file yields the
    /// defaults so env-only setups keep working.
    pub fn load_from(path: &Path) -> Result<Config> {
        let Ok(mut file) = std::fs::File::open(path) else {
            return Ok(Config::default());
        };

        let mut buf = String::new();
        file.read_to_string(&mut buf)
            .map_err(|e| Error::LoadError(e.to_string()))?;

        let cfg: Config = toml::from_str(&buf).map_err(|e| {
            Error::LoadError(format!(
                "failed to deserialize spoilcheck.toml into spoilcheck::Config: {e}"
            ))
        })?;

        debug!("spoilcheck.toml was successfully loaded: {cfg:#?}");

        Ok(cfg)
    }

    /// Load the verifier configuration.
    ///
    /// Loading order:
    /// 1. If `SPOILCHECK_CONFIG` env var is set, load from that path
    /// 2. Otherwise, load from `spoilcheck.toml` in the current directory
    ///
    /// Environment overrides are applied on top in both cases.
    fn load() -> Result<Config> {
        let mut cfg = match std::env::var(SPOILCHECK_CONFIG_ENV) {
            Ok(path) => {
                let path = Path::new(&path);

                // Detect misuse: if it doesn't look like a file path, error out
                if path.extension().is_none_or(|ext| ext != "toml")
                    && !path.to_string_lossy().contains(std::path::MAIN_SEPARATOR)
                    && !path.to_string_lossy().contains('/')
                {
                    return Err(Error::LoadError(format!(
                        "{SPOILCHECK_CONFIG_ENV} should be a path to a config file, not a config \
                         value. Got: {path:?}. Use SPOILCHECK_<KEY>=value for config values instead.",
                    )));
                }

                if !path.exists() {
                    return Err(Error::LoadError(format!(
                        "Config file specified by {SPOILCHECK_CONFIG_ENV} not found: {path:?}",
                    )));
                }

                debug!("Loading config from {SPOILCHECK_CONFIG_ENV}={path:?}");
                Config::load_from(path)?
            }
            Err(_) => Config::load_from(Path::new("spoilcheck.toml"))?,
        };

        cfg.load_env();

        Ok(cfg)
    }

    /// Apply `SPOILCHECK_*` environment variable overrides.
    fn load_env(&mut self) {
        if let Ok(v) = std::env::var("SPOILCHECK_BASE_URL") {
            self.base_url = v;
        }
        if let Ok(v) = std::env::var("SPOILCHECK_TIMEOUT") {
            match v.parse() {
                Ok(millis) => self.timeout = Some(millis),
                Err(e) => warn!("ignoring unparsable SPOILCHECK_TIMEOUT={v:?}: {e}"),
            }
        }
        if let Ok(v) = std::env::var("SPOILCHECK_CAPTURE_HTTP") {
            match v.parse() {
                Ok(flag) => self.capture_http = flag,
                Err(e) => warn!("ignoring unparsable SPOILCHECK_CAPTURE_HTTP={v:?}: {e}"),
            }
        }
        if let Ok(v) = std::env::var("SPOILCHECK_USERNAME") {
            self.auth.username = v;
        }
        if let Ok(v) = std::env::var("SPOILCHECK_PASSWORD") {
            self.auth.password = v;
        }

        debug!("configuration after env overrides: {self:#?}");
    }

    /// Per-request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::path::PathBuf;

    fn sample_path() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../spoilcheck-sample.toml")
    }

    #[test]
    fn load_sample_config() -> eyre::Result<()> {
        let cfg = Config::load_from(&sample_path())?;
        assert_eq!(cfg.base_url, "https://d3s5nxhwblsjbi.cloudfront.net");
        assert_eq!(cfg.timeout, Some(30_000));
        assert_eq!(cfg.request_timeout(), Some(Duration::from_millis(30_000)));
        assert!(!cfg.capture_http);
        assert_eq!(cfg.test_ignore, Vec::<String>::new());
        assert_eq!(cfg.auth.username, "example");
        assert_eq!(cfg.auth.password, "example");
        Ok(())
    }

    #[test]
    fn missing_file_falls_back_to_default() -> eyre::Result<()> {
        let cfg = Config::load_from(Path::new("/nonexistent/spoilcheck.toml"))?;
        assert_eq!(cfg.base_url, "");
        assert_eq!(cfg.timeout, None);
        Ok(())
    }

    #[test]
    fn garbage_file_is_an_error() {
        let dir = std::env::temp_dir().join("spoilcheck-config-garbage");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("spoilcheck.toml");
        std::fs::write(&path, "base_url = [not, toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to load spoilcheck.toml"));
    }

    #[test]
    fn password_is_redacted_in_debug_output() -> eyre::Result<()> {
        let cfg = Config::load_from(&sample_path())?;
        let rendered = format!("{:?}", cfg.auth);
        assert!(rendered.contains("username"));
        assert!(!rendered.contains("example\", password: \"example"));
        assert!(rendered.contains("*****"));
        Ok(())
    }

    #[test]
    #[serial]
    fn env_overrides_win() -> eyre::Result<()> {
        std::env::set_var("SPOILCHECK_BASE_URL", "http://localhost:1234");
        std::env::set_var("SPOILCHECK_USERNAME", "ci-user");
        std::env::set_var("SPOILCHECK_PASSWORD", "ci-pass");
        std::env::set_var("SPOILCHECK_TIMEOUT", "5000");
        std::env::set_var("SPOILCHECK_CAPTURE_HTTP", "true");

        let mut cfg = Config::load_from(&sample_path())?;
        cfg.load_env();

        for key in [
            "SPOILCHECK_BASE_URL",
            "SPOILCHECK_USERNAME",
            "SPOILCHECK_PASSWORD",
            "SPOILCHECK_TIMEOUT",
            "SPOILCHECK_CAPTURE_HTTP",
        ] {
            std::env::remove_var(key);
        }

        assert_eq!(cfg.base_url, "http://localhost:1234");
        assert_eq!(cfg.auth.username, "ci-user");
        assert_eq!(cfg.auth.password, "ci-pass");
        assert_eq!(cfg.timeout, Some(5_000));
        assert!(cfg.capture_http);
        Ok(())
    }

    #[test]
    #[serial]
    fn unparsable_timeout_is_ignored() -> eyre::Result<()> {
        std::env::set_var("SPOILCHECK_TIMEOUT", "soon");

        let mut cfg = Config::load_from(&sample_path())?;
        cfg.load_env();

        std::env::remove_var("SPOILCHECK_TIMEOUT");

        assert_eq!(cfg.timeout, Some(30_000));
        Ok(())
    }

    mod spoilcheck_config_env {
        use super::{Config, SPOILCHECK_CONFIG_ENV};
        use serial_test::serial;

        #[test]
        #[serial]
        fn load_from_spoilcheck_config_env() {
            let config_path = super::sample_path();

            std::env::set_var(SPOILCHECK_CONFIG_ENV, config_path.to_str().unwrap());
            let cfg = Config::load().unwrap();
            std::env::remove_var(SPOILCHECK_CONFIG_ENV);

            assert_eq!(cfg.base_url, "https://d3s5nxhwblsjbi.cloudfront.net");
        }

        #[test]
        #[serial]
        fn error_when_file_not_found() {
            std::env::set_var(SPOILCHECK_CONFIG_ENV, "/nonexistent/path/spoilcheck.toml");
            let result = Config::load();
            std::env::remove_var(SPOILCHECK_CONFIG_ENV);

            assert!(result.is_err());
            let err = result.unwrap_err().to_string();
            assert!(
                err.contains("not found"),
                "error should mention file not found: {err}"
            );
        }

        #[test]
        #[serial]
        fn error_when_value_looks_like_config_value() {
            for value in ["true", "123", "some_value"] {
                std::env::set_var(SPOILCHECK_CONFIG_ENV, value);
                let result = Config::load();
                std::env::remove_var(SPOILCHECK_CONFIG_ENV);

                assert!(result.is_err());
                let err = result.unwrap_err().to_string();
                assert!(
                    err.contains("should be a path"),
                    "error should guide user: {err}"
                );
            }
        }
    }
}
