//! Runtime configuration.

use {
    serde::Deserialize,
    std::{fs, io, path::Path},
    thiserror::Error,
};

/// Options that affect elaboration and evaluation.
///
/// None of the options change the result of a successful evaluation.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config
{
    /// Compile calls in tail position as tail calls.
    ///
    /// When disabled, such calls recurse on the native stack.
    pub tail_calls: bool,

    /// Cache direct call paths at call sites.
    pub dispatch_cache: bool,

    /// Fault when a single trampoline bounces more often than this.
    pub tail_call_limit: Option<u64>,
}

/// Error returned when loading configuration.
#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum ConfigError
{
    #[error("Cannot read configuration: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl Config
{
    /// Parse configuration from JSON.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError>
    {
        Ok(serde_json::from_str(json)?)
    }

    /// Read configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError>
    {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

impl Default for Config
{
    fn default() -> Self
    {
        Self{tail_calls: true, dispatch_cache: true, tail_call_limit: None}
    }
}
