use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ErrorCode;

/// Free-space floor expressed as a number of maximum-size log files.
pub const FREE_SPACE_FILE_MULTIPLIER: u64 = 20;

/// Process-wide tunables for the file writer and the console channel.
///
/// Values are read at every write call, so replacing the config on a live
/// [`LogWriter`](crate::writer::LogWriter) takes effect on the next write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Ceiling for a single physical log file, in KB.
    #[serde(default = "default_max_log_file_size_kb")]
    pub max_log_file_size_kb: u64,
    /// Writes are skipped while the log volume has less than this many KB free.
    #[serde(default = "default_write_log_free_space_kb")]
    pub write_log_free_space_kb: u64,
    /// Number of buffered messages that triggers a flush in collect mode.
    #[serde(default = "default_collect_log_size")]
    pub collect_log_size: usize,
    /// Maximum characters per console line before a message is split.
    #[serde(default = "default_log_max_length")]
    pub log_max_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            max_log_file_size_kb: default_max_log_file_size_kb(),
            write_log_free_space_kb: default_write_log_free_space_kb(),
            collect_log_size: default_collect_log_size(),
            log_max_length: default_log_max_length(),
        }
    }
}

impl LogConfig {
    /// Size ceiling for one physical file, in bytes.
    #[must_use]
    pub const fn max_file_bytes(&self) -> u64 {
        self.max_log_file_size_kb.saturating_mul(1024)
    }

    /// Reject values that would make the writer rotate or flush on every call
    /// forever, or never split console output.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first field that is zero.
    pub fn validate(&self) -> Result<()> {
        let zero_field = if self.max_log_file_size_kb == 0 {
            Some("max_log_file_size_kb")
        } else if self.collect_log_size == 0 {
            Some("collect_log_size")
        } else if self.log_max_length == 0 {
            Some("log_max_length")
        } else {
            None
        };

        if let Some(field) = zero_field {
            let code = ErrorCode::InvalidConfigValue;
            bail!("{}: {} ({field} must be > 0)", code.code(), code.message());
        }
        Ok(())
    }
}

/// One configuration layer. Unset fields fall through to the layer below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default)]
    pub max_log_file_size_kb: Option<u64>,
    #[serde(default)]
    pub write_log_free_space_kb: Option<u64>,
    #[serde(default)]
    pub collect_log_size: Option<usize>,
    #[serde(default)]
    pub log_max_length: Option<usize>,
}

impl ConfigOverrides {
    /// Lay `self` over `base`; fields set here win.
    #[must_use]
    pub fn or(self, base: Self) -> Self {
        Self {
            max_log_file_size_kb: self.max_log_file_size_kb.or(base.max_log_file_size_kb),
            write_log_free_space_kb: self
                .write_log_free_space_kb
                .or(base.write_log_free_space_kb),
            collect_log_size: self.collect_log_size.or(base.collect_log_size),
            log_max_length: self.log_max_length.or(base.log_max_length),
        }
    }

    /// Materialize a full config. The free-space floor follows the file size
    /// ceiling unless it was set explicitly.
    #[must_use]
    pub fn into_config(self) -> LogConfig {
        let defaults = LogConfig::default();
        let max_log_file_size_kb = self
            .max_log_file_size_kb
            .unwrap_or(defaults.max_log_file_size_kb);

        LogConfig {
            max_log_file_size_kb,
            write_log_free_space_kb: self
                .write_log_free_space_kb
                .unwrap_or_else(|| max_log_file_size_kb.saturating_mul(FREE_SPACE_FILE_MULTIPLIER)),
            collect_log_size: self.collect_log_size.unwrap_or(defaults.collect_log_size),
            log_max_length: self.log_max_length.unwrap_or(defaults.log_max_length),
        }
    }
}

/// Read one config layer from a TOML file. A missing file is an empty layer.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_config_file(path: &Path) -> Result<ConfigOverrides> {
    if !path.exists() {
        return Ok(ConfigOverrides::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ConfigOverrides>(&content).with_context(|| {
        format!(
            "{}: failed to parse {}",
            ErrorCode::ConfigParseError.code(),
            path.display()
        )
    })
}

/// Location of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("logspool/config.toml"))
}

/// Read the per-user config layer.
///
/// # Errors
///
/// Returns an error if the user config exists but is unreadable or invalid.
pub fn load_user_config() -> Result<ConfigOverrides> {
    let Some(path) = user_config_path() else {
        return Ok(ConfigOverrides::default());
    };
    load_config_file(&path)
}

/// Resolve the effective config.
///
/// Precedence (highest wins): `flags`, the explicit config file, the user
/// config file, built-in defaults.
///
/// # Errors
///
/// Returns an error if a config file is unreadable or the merged result fails
/// [`LogConfig::validate`].
pub fn resolve_config(explicit: Option<&Path>, flags: ConfigOverrides) -> Result<LogConfig> {
    let user = load_user_config()?;
    let file = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            load_config_file(path)?
        }
        None => ConfigOverrides::default(),
    };

    let config = flags.or(file).or(user).into_config();
    config.validate()?;
    Ok(config)
}

const fn default_max_log_file_size_kb() -> u64 {
    1024
}

const fn default_write_log_free_space_kb() -> u64 {
    default_max_log_file_size_kb() * FREE_SPACE_FILE_MULTIPLIER
}

const fn default_collect_log_size() -> usize {
    1000
}

const fn default_log_max_length() -> usize {
    3000
}
