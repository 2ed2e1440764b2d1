//! stowage.toml configuration parser.
//!
//! Every key is optional. Integer keys use `-1` to mean "unbounded" where
//! that makes sense; the raw values are validated and folded into
//! [`BackupConfig`], which carries `Option`s instead of sentinels.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::short_id;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "stowage.toml";

/// Docker socket used when neither the config nor `DOCKER_HOST` names one.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error parsing TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where the effective configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// No file at the given path; defaults were used.
    Defaults(PathBuf),
}

/// The on-disk shape of stowage.toml, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    min_backup_interval: Option<i64>,
    ghost_backup_keep_days: Option<i64>,
    backup_keep_num: Option<i64>,
    warn_large_backup_mb: Option<i64>,
    backup_by_default: Option<bool>,
    container_paths: Option<BTreeMap<String, Vec<String>>>,
    archive_dir_path: Option<PathBuf>,
    telegram_chat_id: Option<ChatId>,
    telegram_bot_token: Option<String>,
    docker_host: Option<String>,
}

/// Telegram chat ids are numeric, but quoting them in TOML is common.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatId {
    Number(i64),
    Text(String),
}

impl ChatId {
    fn into_string(self) -> String {
        match self {
            ChatId::Number(n) => n.to_string(),
            ChatId::Text(s) => s,
        }
    }
}

/// Credentials for the Telegram notifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelegramConfig {
    pub chat_id: String,
    #[serde(skip_serializing)]
    pub bot_token: String,
}

/// Validated backup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupConfig {
    /// Minimum whole days between two backups of the same instance.
    pub min_backup_interval: u32,
    /// Days a ghost instance keeps its backups. `None` keeps them forever.
    pub ghost_backup_keep_days: Option<u32>,
    /// Backups kept per instance. `None` keeps all of them.
    pub backup_keep_num: Option<u32>,
    /// Net growth (created minus pruned) that triggers a warning, in MiB.
    pub warn_large_backup_mb: u64,
    /// Back up `/` of every container that has no `container_paths` entry.
    pub backup_by_default: bool,
    /// Short container id (12 chars) → paths to back up.
    pub container_paths: BTreeMap<String, Vec<String>>,
    pub archive_dir_path: PathBuf,
    pub telegram: Option<TelegramConfig>,
    pub docker_host: String,
}

impl BackupConfig {
    /// Defaults rooted at `archive_dir`.
    pub fn defaults(archive_dir: &Path) -> Self {
        BackupConfig {
            min_backup_interval: 0,
            ghost_backup_keep_days: None,
            backup_keep_num: None,
            warn_large_backup_mb: 1024,
            backup_by_default: true,
            container_paths: BTreeMap::new(),
            archive_dir_path: archive_dir.to_path_buf(),
            telegram: None,
            docker_host: DEFAULT_DOCKER_HOST.to_string(),
        }
    }

    /// Load and validate the config at `path`.
    ///
    /// A missing file is not an error: defaults rooted at the file's
    /// directory are returned along with [`ConfigSource::Defaults`].
    pub fn load(path: &Path) -> ConfigResult<(Self, ConfigSource)> {
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let docker_env = std::env::var("DOCKER_HOST").ok();

        if !path.exists() {
            let mut config = Self::defaults(&base_dir);
            if let Some(host) = docker_env {
                config.docker_host = host;
            }
            return Ok((config, ConfigSource::Defaults(path.to_path_buf())));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content, &base_dir, docker_env).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    /// Parse and validate TOML text. `base_dir` is the default archive
    /// directory; `docker_env` is the value of `DOCKER_HOST`, if any.
    pub fn from_toml_str(
        content: &str,
        base_dir: &Path,
        docker_env: Option<String>,
    ) -> ConfigResult<Self> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        Self::from_raw(raw, base_dir, docker_env)
    }

    fn from_raw(raw: RawConfig, base_dir: &Path, docker_env: Option<String>) -> ConfigResult<Self> {
        let mut config = Self::defaults(base_dir);

        if let Some(v) = raw.min_backup_interval {
            if v < 0 {
                return Err(ConfigError::Invalid(format!(
                    "min_backup_interval expected a non-negative integer but got {v}. \
                     0 means that if the container is currently running, backups are made \
                     every time the tool is run."
                )));
            }
            config.min_backup_interval = to_u32("min_backup_interval", v)?;
        }

        if let Some(v) = raw.ghost_backup_keep_days {
            config.ghost_backup_keep_days = match v {
                -1 => None,
                v if v >= 0 => Some(to_u32("ghost_backup_keep_days", v)?),
                v => {
                    return Err(ConfigError::Invalid(format!(
                        "ghost_backup_keep_days expected either -1 (disable ghost backup pruning) \
                         or a non-negative integer, but got {v}"
                    )));
                }
            };
        }

        if let Some(v) = raw.backup_keep_num {
            config.backup_keep_num = match v {
                -1 => None,
                v if v > 0 => Some(to_u32("backup_keep_num", v)?),
                v => {
                    return Err(ConfigError::Invalid(format!(
                        "backup_keep_num expected either -1 (disable old backup pruning) \
                         or a positive integer, but got {v}"
                    )));
                }
            };
        }

        if let Some(v) = raw.warn_large_backup_mb {
            if v < 0 {
                return Err(ConfigError::Invalid(format!(
                    "warn_large_backup_mb expected a non-negative integer, but got {v}"
                )));
            }
            config.warn_large_backup_mb = v as u64;
        }

        if let Some(v) = raw.backup_by_default {
            config.backup_by_default = v;
        }

        if let Some(paths) = raw.container_paths {
            for (container_id, list) in paths {
                if list.is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "Error for container {container_id}: list of paths cannot be empty! \
                         Use \"/\" to back up the root path"
                    )));
                }
                if list.iter().any(|p| p.is_empty()) {
                    return Err(ConfigError::Invalid(format!(
                        "Error for container {container_id}: paths cannot be empty strings"
                    )));
                }
                let short = short_id(&container_id);
                let entry = config.container_paths.entry(short).or_default();
                for path in list {
                    if !entry.contains(&path) {
                        entry.push(path);
                    }
                }
            }
        }

        if let Some(dir) = raw.archive_dir_path {
            config.archive_dir_path = if dir.is_relative() {
                base_dir.join(dir)
            } else {
                dir
            };
        }

        config.telegram = match (raw.telegram_chat_id, raw.telegram_bot_token) {
            (Some(chat_id), Some(bot_token)) if !bot_token.is_empty() => Some(TelegramConfig {
                chat_id: chat_id.into_string(),
                bot_token,
            }),
            _ => None,
        };

        config.docker_host = raw
            .docker_host
            .or(docker_env)
            .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string());

        Ok(config)
    }

    /// Paths to track for a container, or `None` if it is not tracked.
    ///
    /// Explicit `container_paths` entries win; otherwise `/` is tracked
    /// when `backup_by_default` is set.
    pub fn paths_for(&self, container_id: &str) -> Option<Vec<String>> {
        match self.container_paths.get(&short_id(container_id)) {
            Some(paths) if !paths.is_empty() => Some(paths.clone()),
            _ if self.backup_by_default => Some(vec!["/".to_string()]),
            _ => None,
        }
    }

    /// Large-backup threshold in bytes.
    pub fn warn_large_backup_bytes(&self) -> u64 {
        self.warn_large_backup_mb.saturating_mul(1024 * 1024)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn to_u32(key: &str, v: i64) -> ConfigResult<u32> {
    u32::try_from(v).map_err(|_| ConfigError::Invalid(format!("{key} is out of range: {v}")))
}
