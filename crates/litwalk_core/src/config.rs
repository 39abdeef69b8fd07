//! User configuration file.
//!
//! # Responsibility
//! - Locate the per-user config file and create it with defaults if missing.
//! - Resolve `~/` and relative paths to absolute ones.
//!
//! # Invariants
//! - Keys missing from the file take their default value.
//! - A file that exists but does not parse is an error naming that file.
//! - Failing to write a missing file is a warning, never an error.

use crate::bibtex::ParseOptions;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "lit-walk";
pub const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "db.sqlite";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration load failure.
#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "cannot read config file `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid config file `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Settings read from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notes_dir: PathBuf,
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Decode LaTeX and collapse whitespace in imported text fields.
    pub normalize_text: bool,
    /// Editor command line; `$VISUAL`, `$EDITOR` and `vi` are tried when unset.
    pub editor: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            notes_dir: data_dir.join("notes"),
            db_path: data_dir.join(DB_FILE_NAME),
            log_dir: data_dir.join("logs"),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            normalize_text: true,
            editor: None,
        }
    }
}

/// Outcome of [`Config::load_or_create`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: Config,
    pub path: PathBuf,
    /// Whether a default file was written during this load.
    pub created: bool,
    /// Problems that did not prevent loading; emit once logging is up.
    pub warnings: Vec<String>,
}

impl Config {
    /// Reads `path`, writing a commented default file first if it is missing.
    ///
    /// # Errors
    /// - `ConfigError::Read` when the file exists but cannot be read.
    /// - `ConfigError::Parse` when the file is not valid config TOML.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<LoadedConfig, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let mut warnings = Vec::new();

        if !path.exists() {
            let defaults = Config::default();
            let created = match write_template(&path, &defaults) {
                Ok(()) => true,
                Err(err) => {
                    warnings.push(format!(
                        "could not create config file `{}`: {err}; using defaults",
                        path.display()
                    ));
                    false
                }
            };
            return Ok(LoadedConfig {
                config: defaults,
                path,
                created,
                warnings,
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut config = Self::from_toml(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.resolve_paths(&base);

        if crate::logging::normalize_level(&config.log_level).is_err() {
            warnings.push(format!(
                "unsupported log_level `{}` in `{}`; using `{}`",
                config.log_level,
                path.display(),
                DEFAULT_LOG_LEVEL
            ));
            config.log_level = DEFAULT_LOG_LEVEL.to_string();
        }

        Ok(LoadedConfig {
            config,
            path,
            created: false,
            warnings,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Expands `~/` and anchors relative paths at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.notes_dir, &mut self.db_path, &mut self.log_dir] {
            *path = resolve_path(path, base);
        }
        self.editor = self
            .editor
            .take()
            .filter(|command| !command.trim().is_empty());
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            normalize_text: self.normalize_text,
        }
    }
}

/// `$XDG_CONFIG_HOME/lit-walk/config.toml` when set; otherwise the platform
/// config dir on Linux and `~/.lit-walk/config.toml` elsewhere.
pub fn default_config_path() -> PathBuf {
    config_home().join(CONFIG_FILE_NAME)
}

fn config_home() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        return PathBuf::from(xdg).join(APP_DIR_NAME);
    }
    if cfg!(target_os = "linux") {
        if let Some(dir) = dirs::config_dir() {
            return dir.join(APP_DIR_NAME);
        }
    }
    home_fallback()
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(home_fallback)
}

fn home_fallback() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(format!(".{APP_DIR_NAME}")))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR_NAME}")))
}

fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    };
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

/// Commented default config file for `config`.
pub fn render_template(config: &Config) -> String {
    let quoted = |path: &Path| toml::Value::String(path.display().to_string()).to_string();
    format!(
        "# lit-walk configuration\n\
         \n\
         # Directory holding one markdown note per article.\n\
         notes_dir = {notes}\n\
         \n\
         # SQLite file with the article collection and walk history.\n\
         db_path = {db}\n\
         \n\
         # Rolling log files are written here.\n\
         log_dir = {logs}\n\
         \n\
         # One of trace, debug, info, warn, error.\n\
         log_level = {level}\n\
         \n\
         # Decode LaTeX escapes and collapse whitespace in imported text.\n\
         normalize_text = {normalize}\n\
         \n\
         # Editor command for `notes`. Falls back to $VISUAL, $EDITOR, then vi.\n\
         # editor = \"vim\"\n",
        notes = quoted(&config.notes_dir),
        db = quoted(&config.db_path),
        logs = quoted(&config.log_dir),
        level = toml::Value::String(config.log_level.clone()),
        normalize = config.normalize_text,
    )
}

fn write_template(path: &Path, config: &Config) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_template(config))
}
