// Configuration loading and parsing (overcoach.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use overcoach_client::{DEFAULT_COACH_URL, DEFAULT_OVERFAST_URL};

/// Name of the single config file inside `config/` and `defaults/`.
pub const CONFIG_FILE: &str = "overcoach.toml";

/// Environment variable overriding `catalog.base_url`.
pub const ENV_CATALOG_URL: &str = "OVERFAST_API_URL";

/// Environment variable overriding `coach.base_url`.
pub const ENV_COACH_URL: &str = "OVERCOACH_API_URL";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },

    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub coach: CoachConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// `[catalog]`: where heroes and maps come from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            base_url: DEFAULT_OVERFAST_URL.to_string(),
        }
    }
}

/// `[coach]`: the recommendation service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CoachConfig {
    pub base_url: String,
}

impl Default for CoachConfig {
    fn default() -> Self {
        CoachConfig {
            base_url: DEFAULT_COACH_URL.to_string(),
        }
    }
}

/// `[session]`: display preferences for the terminal front end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on alternative heroes listed under a recommendation.
    #[serde(default = "default_max_alternatives")]
    pub max_alternatives_shown: usize,
}

fn default_max_alternatives() -> usize {
    5
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            max_alternatives_shown: default_max_alternatives(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Read, parse and validate one config file. Environment overrides are
/// applied separately by `load_config()`.
fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let text = read_file(path)?;
    let config: Config = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Seed `config/overcoach.toml` from `defaults/overcoach.toml` when it does
/// not exist yet. Returns the path written, or `None` when a config was
/// already in place. An existing file is never overwritten.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE);
    if target.is_file() {
        return Ok(None);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE);
    let defaults = std::fs::read(&source).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot read {}: {e}", source.display()),
    })?;
    std::fs::create_dir_all(base_dir.join("config")).map_err(|e| {
        ConfigError::DefaultsCopyError {
            message: format!("failed to create config directory: {e}"),
        }
    })?;

    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };
    std::io::Write::write_all(&mut dest, &defaults).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;
    info!("Created {} from defaults", target.display());
    Ok(Some(target))
}

/// A working directory carrying `config/` or `defaults/` is a project
/// checkout and owns its config.
fn is_project_dir(dir: &Path) -> bool {
    dir.join("config").exists() || dir.join("defaults").exists()
}

/// The config file to read: `config/overcoach.toml` in a project directory,
/// otherwise `overcoach.toml` directly inside the per-user config directory
/// when it exists. `None` means built-in defaults.
fn locate_config(cwd: &Path, user_config_dir: Option<&Path>) -> Option<PathBuf> {
    if is_project_dir(cwd) {
        return Some(cwd.join("config").join(CONFIG_FILE));
    }
    user_config_dir
        .map(|dir| dir.join(CONFIG_FILE))
        .filter(|path| path.is_file())
}

/// Load configuration for the binary.
///
/// Seeds `config/` from `defaults/` on first run, falls back to the per-user
/// config directory and then to built-in defaults, then applies environment
/// overrides and validates the result.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
    if is_project_dir(&cwd) {
        ensure_config_file(&cwd)?;
    }

    let user_dir = directories::ProjectDirs::from("", "", "overcoach")
        .map(|dirs| dirs.config_dir().to_path_buf());
    let mut config = match locate_config(&cwd, user_dir.as_deref()) {
        Some(path) => {
            info!("Loading config from {}", path.display());
            read_config(&path)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate(&config)?;
    Ok(config)
}

/// Override service URLs from the environment. `lookup` is injected so tests
/// don't have to touch process-wide state.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_CATALOG_URL).filter(|u| !u.trim().is_empty()) {
        config.catalog.base_url = url.trim().to_string();
    }
    if let Some(url) = lookup(ENV_COACH_URL).filter(|u| !u.trim().is_empty()) {
        config.coach.base_url = url.trim().to_string();
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url_fields: &[(&str, &str)] = &[
        ("catalog.base_url", config.catalog.base_url.as_str()),
        ("coach.base_url", config.coach.base_url.as_str()),
    ];
    for (name, url) in url_fields {
        if url.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must not be empty".into(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must start with http:// or https://, got {url}"),
            });
        }
    }

    if config.session.max_alternatives_shown == 0 {
        return Err(ConfigError::ValidationError {
            field: "session.max_alternatives_shown".into(),
            message: "must be > 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
