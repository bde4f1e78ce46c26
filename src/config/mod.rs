//! Completion settings: how the workspace is scanned and how much is suggested.
//!
//! User-level config: `~/.crane/settings.yaml`
//! Project-level config: `.crane/settings.yaml` under the workspace root (wins over user)
//!
//! Keys missing from both files keep their defaults. `CRANE_MAX_SUGGESTION_SIZE`
//! overrides the suggestion bound last.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Project-level settings file, relative to the workspace root.
pub const PROJECT_SETTINGS: &str = ".crane/settings.yaml";

/// Environment override for [`Settings::max_suggestion_size`].
pub const MAX_SUGGESTION_ENV: &str = "CRANE_MAX_SUGGESTION_SIZE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// How registered finders are polled for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinderMode {
    /// Stop at the first finder that produces candidates.
    #[default]
    First,
    /// Merge the candidates of every matching finder.
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound on the number of completion items per request.
    pub max_suggestion_size: usize,
    /// Lowers the default log filter to `debug`.
    pub debug_mode: bool,
    /// Glob patterns (relative to the workspace root) scanned at startup.
    pub include: Vec<String>,
    /// Glob patterns skipped during the scan.
    pub exclude: Vec<String>,
    /// File extensions the workspace reflects, without the dot.
    pub extensions: Vec<String>,
    pub finder_mode: FinderMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_suggestion_size: 100,
            debug_mode: false,
            include: vec!["**/*".into()],
            exclude: vec![
                "**/vendor/**/tests/**".into(),
                "**/.git/**".into(),
                "**/node_modules/**".into(),
            ],
            extensions: ["php", "php3", "php5", "phtml", "inc"]
                .into_iter()
                .map(String::from)
                .collect(),
            finder_mode: FinderMode::First,
        }
    }
}

/// Path to `~/.crane/settings.yaml`.
fn user_settings_path() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|p| PathBuf::from(p).join(".crane").join("settings.yaml"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("HOME")
            .ok()
            .map(|p| PathBuf::from(p).join(".crane").join("settings.yaml"))
    }
}

impl Settings {
    /// Load settings for a workspace, merging user and project files.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let mut merged = Value::Mapping(Mapping::new());
        if let Some(path) = user_settings_path() {
            merge_file(&mut merged, &path)?;
        }
        merge_file(&mut merged, &root.join(PROJECT_SETTINGS))?;

        let mut settings: Settings = serde_yaml::from_value(merged)?;
        if let Ok(raw) = std::env::var(MAX_SUGGESTION_ENV) {
            settings.override_max_suggestion_size(&raw)?;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from one explicit file, ignoring discovery.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        // An empty document means "all defaults".
        let settings: Settings = match serde_yaml::from_str::<Value>(content)? {
            Value::Null => Settings::default(),
            value => serde_yaml::from_value(value)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_suggestion_size == 0 {
            return Err(ConfigError::Invalid {
                key: "max_suggestion_size",
                reason: "must be at least 1".into(),
            });
        }
        if let Some(ext) = self.extensions.iter().find(|e| e.starts_with('.')) {
            return Err(ConfigError::Invalid {
                key: "extensions",
                reason: format!("`{ext}` should be given without the leading dot"),
            });
        }
        Ok(())
    }

    /// Apply the value of [`MAX_SUGGESTION_ENV`].
    pub fn override_max_suggestion_size(&mut self, raw: &str) -> Result<(), ConfigError> {
        self.max_suggestion_size = raw.trim().parse().map_err(|e| ConfigError::Invalid {
            key: "max_suggestion_size",
            reason: format!("{MAX_SUGGESTION_ENV}={raw}: {e}"),
        })?;
        Ok(())
    }

    /// Whether `filename` carries one of the configured extensions.
    pub fn accepts(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Default `tracing` filter directive for the binary.
    pub fn log_directive(&self) -> &'static str {
        if self.debug_mode {
            "crane=debug"
        } else {
            "crane=info"
        }
    }
}

/// Merge a YAML file into `into`; a missing file is not an error.
fn merge_file(into: &mut Value, path: &Path) -> Result<(), ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let layer: Value = serde_yaml::from_str(&content)?;
    merge(into, layer);
    Ok(())
}

/// Top-level keys of `layer` replace those of `base`.
fn merge(base: &mut Value, layer: Value) {
    if let (Value::Mapping(base), Value::Mapping(layer)) = (base, layer) {
        for (key, value) in layer {
            base.insert(key, value);
        }
    }
}
