//! TOML-based configuration.
//!
//! Supports a config file (magpie.toml) with environment variable expansion.
//!
//! Example configuration:
//! ```toml
//! [worker]
//! path = "${VIRTUAL_ENV}/bin/pytkdocs"
//! setup_commands = ["import django", "django.setup()"]
//! timeout_seconds = 30
//!
//! [selection]
//! filters = ["!^_[^_]"]
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Worker executable looked up when no path is configured.
const WORKER_PROGRAM: &str = "pytkdocs";

/// Module entry point used when setup commands wrap the worker in an
/// interpreter invocation.
const WORKER_ENTRY_POINT: &str = "pytkdocs.cli";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Worker configuration.
    pub worker: WorkerSettings,

    /// Default selection options.
    pub selection: SelectionSettings,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `MAGPIE_CONFIG`
    /// 2. `./magpie.toml`
    /// 3. `~/.config/magpie/config.toml`
    ///
    /// Falls back to defaults when no config file exists.
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("MAGPIE_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("magpie.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("magpie").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }
}

/// Worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerSettings {
    /// Path to the worker executable (supports ${ENV_VAR} expansion).
    pub path: Option<String>,

    /// Python interpreter used when setup commands are configured.
    pub python: String,

    /// Statements executed inside the worker interpreter before it starts
    /// serving requests. Their stdout is redirected away from the protocol
    /// stream.
    pub setup_commands: Vec<String>,

    /// Per-exchange timeout in seconds. Unset means block indefinitely.
    pub timeout_seconds: Option<u64>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            path: None,
            python: "python3".to_string(),
            setup_commands: Vec::new(),
            timeout_seconds: None,
        }
    }
}

impl WorkerSettings {
    /// The configured per-exchange timeout.
    pub fn exchange_timeout(&self) -> Option<Duration> {
        self.timeout_seconds.map(Duration::from_secs)
    }

    /// Compose the worker command line.
    ///
    /// Without setup commands the worker executable serves lines directly.
    /// With setup commands, the Python interpreter runs them first with its
    /// stdout swapped for an in-memory buffer, so nothing they print can be
    /// mistaken for a protocol response, then restores stdout and enters
    /// the worker's serving loop.
    pub fn worker_command(&self) -> Result<(String, Vec<String>), SettingsError> {
        if self.setup_commands.is_empty() {
            return Ok((self.resolve_worker_path()?, vec!["--line-by-line".to_string()]));
        }

        let mut statements = vec![
            "import sys".to_string(),
            "from io import StringIO".to_string(),
            format!("from {WORKER_ENTRY_POINT} import main as serve"),
            "sys.stdout = StringIO()".to_string(),
        ];
        statements.extend(self.setup_commands.iter().cloned());
        statements.extend([
            "sys.stdout.flush()".to_string(),
            "sys.stdout = sys.__stdout__".to_string(),
            "serve(['--line-by-line'])".to_string(),
        ]);

        Ok((
            self.python.clone(),
            vec!["-c".to_string(), statements.join("; ")],
        ))
    }

    /// Resolve the worker executable path.
    ///
    /// Uses the configured path when present, otherwise prefers a local
    /// virtualenv installation over whatever `PATH` resolves.
    fn resolve_worker_path(&self) -> Result<String, SettingsError> {
        if let Some(path) = &self.path {
            return expand_env_vars(path);
        }

        let candidates = [
            format!("./.venv/bin/{WORKER_PROGRAM}"),
            format!("./venv/bin/{WORKER_PROGRAM}"),
        ];
        for candidate in candidates {
            if Path::new(&candidate).exists() {
                return Ok(candidate);
            }
        }

        Ok(WORKER_PROGRAM.to_string())
    }
}

/// Default selection options.
///
/// These are merged under caller-supplied overrides and forwarded to the
/// worker verbatim; this crate never interprets them.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SelectionSettings {
    /// Member filter patterns.
    pub filters: Vec<String>,

    /// Explicit member selection, forwarded when set.
    pub members: Option<Value>,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            // Exclude single-underscore-private names, keep dunders.
            filters: vec!["!^_[^_]".to_string()],
            members: None,
        }
    }
}

impl SelectionSettings {
    /// The selection options in wire form.
    pub fn to_options(&self) -> Map<String, Value> {
        let mut options = Map::new();
        options.insert("filters".to_string(), Value::from(self.filters.clone()));
        if let Some(members) = &self.members {
            options.insert("members".to_string(), members.clone());
        }
        options
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if chars.peek() == Some(&'{') {
                chars.next(); // consume '{'
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch == '}' {
                        chars.next(); // consume '}'
                        break;
                    }
                    var_name.push(ch);
                    chars.next();
                }
                let value = env::var(&var_name)
                    .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                result.push_str(&value);
            } else {
                // $VAR (ends at non-alphanumeric/underscore)
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else {
                    let value = env::var(&var_name)
                        .map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
                    result.push_str(&value);
                }
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}
