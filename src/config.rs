//! Layered application configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config FILE`, or `config.toml` in the platform config
//!    directory: `~/.config/dedupe-flatten` on Linux)
//! 3. A named `[profile.<name>]` table from that file, when `--profile` is given
//! 4. Environment variables prefixed with `DEDUPE_FLATTEN_`
//! 5. Command-line flags
//!
//! A file that cannot be parsed, or whose values fail validation, is ignored
//! with a warning and the defaults are used instead.
//!
//! ```toml
//! duplicates_dir = "_duplicates"
//! duplicate_suffix = "_dup"
//! max_rename_attempts = 10000
//! hash_buffer_size = 1048576
//!
//! [profile.photos]
//! skip_hidden = true
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;
use crate::flatten::{
    has_separator, is_plain_name, FlattenConfig, DEFAULT_DUPLICATES_DIR, DEFAULT_MAX_ATTEMPTS,
};
use crate::scanner::DEFAULT_BUFFER_SIZE;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "DEDUPE_FLATTEN_";

/// Validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The quarantine folder name is not a single plain path component.
    #[error("invalid duplicates_dir '{0}': must be a single directory name")]
    InvalidDuplicatesDir(String),

    /// The duplicate suffix contains a path separator or NUL.
    #[error("invalid duplicate_suffix '{0}': must not contain '/', '\\' or NUL")]
    InvalidDuplicateSuffix(String),

    /// Renaming must be allowed at least one attempt.
    #[error("max_rename_attempts must be at least 1")]
    ZeroRenameAttempts,
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the quarantine folder created in the root.
    pub duplicates_dir: String,
    /// Suffix inserted into quarantined file names.
    pub duplicate_suffix: String,
    /// Bound on numbered name candidates.
    pub max_rename_attempts: u32,
    /// Hash read buffer size in bytes.
    pub hash_buffer_size: usize,
    /// Treat symlinks to regular files as files.
    pub follow_symlinks: bool,
    /// Skip hidden entries.
    pub skip_hidden: bool,
    /// Named overrides selected with `--profile`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profile: BTreeMap<String, ProfileConfig>,
}

/// A named set of overrides. Unset keys keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rename_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_buffer_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_symlinks: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_hidden: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duplicates_dir: DEFAULT_DUPLICATES_DIR.to_string(),
            duplicate_suffix: String::new(),
            max_rename_attempts: DEFAULT_MAX_ATTEMPTS,
            hash_buffer_size: DEFAULT_BUFFER_SIZE,
            follow_symlinks: false,
            skip_hidden: false,
            profile: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Default config file location, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "dedupe-flatten").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from `path` (or the default location) with an optional profile.
    #[must_use]
    pub fn load(path: Option<&Path>, profile: Option<&str>) -> Self {
        match path.map(Path::to_path_buf).or_else(Self::default_path) {
            Some(path) => {
                if !path.exists() {
                    log::debug!("No config file at {}", path.display());
                }
                Self::load_from_path(path, profile)
            }
            None => {
                log::debug!("No platform config directory, using defaults and environment");
                Self::extract(Self::base_figment(), profile)
            }
        }
    }

    /// Load from a specific file. A missing file is the same as an empty one.
    #[must_use]
    pub fn load_from_path(path: PathBuf, profile: Option<&str>) -> Self {
        let figment = Self::base_figment().merge(Toml::file(&path));
        let config = Self::extract(figment, profile);
        log::debug!("Configuration loaded from {}", path.display());
        config
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn extract(file_layers: Figment, profile: Option<&str>) -> Self {
        let env = || Env::prefixed(ENV_PREFIX).ignore(&["profile"]);

        let base: Self = match file_layers.clone().merge(env()).extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                return Self::default();
            }
        };

        let config = match profile {
            None => base,
            Some(name) => match base.profile.get(name) {
                Some(overrides) => {
                    log::debug!("Applying profile '{}'", name);
                    let layered = file_layers
                        .merge(Serialized::defaults(overrides.clone()))
                        .merge(env());
                    match layered.extract() {
                        Ok(config) => config,
                        Err(e) => {
                            log::warn!("Invalid profile '{}', ignoring it: {}", name, e);
                            base
                        }
                    }
                }
                None => {
                    log::warn!(
                        "Profile '{}' not found (available: {})",
                        name,
                        base.profile.keys().cloned().collect::<Vec<_>>().join(", ")
                    );
                    base
                }
            },
        };

        match config.validate() {
            Ok(()) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Apply command-line overrides. Flags that were not given change nothing.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(ref name) = cli.duplicates_dir {
            self.duplicates_dir = name.clone();
        }
        if let Some(ref suffix) = cli.duplicate_suffix {
            self.duplicate_suffix = suffix.clone();
        }
        if let Some(attempts) = cli.max_rename_attempts {
            self.max_rename_attempts = attempts;
        }
        if let Some(size) = cli.hash_buffer_size {
            self.hash_buffer_size = size;
        }
        if cli.follow_symlinks {
            self.follow_symlinks = true;
        }
        if cli.skip_hidden {
            self.skip_hidden = true;
        }
    }

    /// Check the values that could make a run unsafe.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_plain_name(&self.duplicates_dir) {
            return Err(ConfigError::InvalidDuplicatesDir(self.duplicates_dir.clone()));
        }

        if has_separator(&self.duplicate_suffix) {
            return Err(ConfigError::InvalidDuplicateSuffix(
                self.duplicate_suffix.clone(),
            ));
        }

        if self.max_rename_attempts == 0 {
            return Err(ConfigError::ZeroRenameAttempts);
        }

        Ok(())
    }

    /// Engine settings for this configuration.
    #[must_use]
    pub fn to_flatten_config(&self) -> FlattenConfig {
        FlattenConfig::default()
            .with_duplicates_dir_name(self.duplicates_dir.clone())
            .with_duplicate_suffix(self.duplicate_suffix.clone())
            .with_max_rename_attempts(self.max_rename_attempts)
            .with_hash_buffer_size(self.hash_buffer_size)
            .with_follow_symlinks(self.follow_symlinks)
            .with_skip_hidden(self.skip_hidden)
    }

    /// Render as TOML, profiles included.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
