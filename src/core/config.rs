//! Settings file (`rigfile.yaml`) parsing and validation.
//!
//! Every field is optional. Precedence is defaults, then the file, then
//! command-line flags (applied by the CLI on top of the loaded value).

use super::context::ExecutionContext;
use super::error::ConfigError;
use super::resolver::is_valid_name;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file name, looked up next to the recipe.
pub const DEFAULT_CONFIG_FILE: &str = "rigfile.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Shell that receives each script on stdin
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Pass the full launching environment to commands. When false only
    /// PATH and HOME are carried over.
    #[serde(default = "default_true")]
    pub inherit_env: bool,

    /// Write the event log and last-run record
    #[serde(default = "default_true")]
    pub journal: bool,

    /// Where the journal lives
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Build argument overrides (order-preserving)
    #[serde(default)]
    pub build_args: IndexMap<String, String>,

    /// Variables set before the first step
    #[serde(default)]
    pub env: IndexMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shell: default_shell(),
            inherit_env: true,
            journal: true,
            state_dir: default_state_dir(),
            build_args: IndexMap::new(),
            env: IndexMap::new(),
        }
    }
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_true() -> bool {
    true
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".rigfile")
}

impl Config {
    /// Initial execution context for a run rooted at `cwd`.
    pub fn initial_context(&self, cwd: impl Into<PathBuf>) -> ExecutionContext {
        let mut ctx = ExecutionContext::from_process(cwd, self.inherit_env);
        for (k, v) in &self.env {
            ctx = ctx.with_env(k, v);
        }
        for (k, v) in &self.build_args {
            ctx = ctx.with_build_arg(k, v);
        }
        ctx
    }
}

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a settings file from disk.
pub fn parse_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse settings from a string. An empty document yields the defaults.
pub fn parse_config(yaml: &str) -> Result<Config, serde_yaml_ng::Error> {
    if yaml.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml_ng::from_str(yaml)
}

/// Load settings. An explicitly named file must exist; the default file is
/// optional.
pub fn load_config(explicit: Option<&Path>, default_path: &Path) -> Result<Config, ConfigError> {
    match explicit {
        Some(path) => parse_config_file(path),
        None if default_path.is_file() => {
            log::debug!("using config {}", default_path.display());
            parse_config_file(default_path)
        }
        None => Ok(Config::default()),
    }
}

/// Validate a parsed config. Returns a list of errors (empty = valid).
pub fn validate_config(config: &Config) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if config.shell.trim().is_empty() {
        errors.push(ValidationError {
            message: "shell must not be empty".to_string(),
        });
    }

    for name in config.build_args.keys() {
        if !is_valid_name(name) {
            errors.push(ValidationError {
                message: format!("build_args: invalid variable name '{}'", name),
            });
        }
    }
    for name in config.env.keys() {
        if !is_valid_name(name) {
            errors.push(ValidationError {
                message: format!("env: invalid variable name '{}'", name),
            });
        }
    }

    errors
}

/// Parse `KEY=VALUE` from the command line.
pub fn parse_key_value(s: &str) -> Result<(String, String), ConfigError> {
    match s.split_once('=') {
        Some((k, v)) if is_valid_name(k) => Ok((k.to_string(), v.to_string())),
        _ => Err(ConfigError::KeyValue(s.to_string())),
    }
}
