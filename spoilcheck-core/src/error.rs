pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Occurs when `spoilcheck.toml` fails to load.
    #[error("failed to load spoilcheck.toml: {0}")]
    LoadError(String),
}
