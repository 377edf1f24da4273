//! Application configuration, persisted as TOML.
//!
//! The config file lives at `$XDG_CONFIG_HOME/anchor-day/config.toml`. Every
//! field has a default, so a missing file or a partial file are both fine.
//! A handful of `ANCHOR_*` environment variables override the file.

use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::paths::AppPaths;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Minimum accepted length of a configured session secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Interface the HTTP server binds to.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// SQLite database file. Defaults to `$XDG_DATA_HOME/anchor-day/anchor-day.db`.
    #[serde(default)]
    pub database: Option<PathBuf>,
    /// Session signing secret. A random key is generated and kept in the
    /// state directory when unset.
    #[serde(default)]
    pub session_secret: Option<String>,
    /// How long a session cookie stays valid.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure` (serve behind TLS).
    #[serde(default)]
    pub secure_cookies: bool,
    /// Fixed UTC offset used to decide what "today" is. Local zone when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Seed packs applied by `anchor seed` and on `anchord` startup.
    #[serde(default = "default_seed_packs")]
    pub seed_packs: Vec<String>,
}

fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8300
}
fn default_session_ttl_hours() -> i64 {
    24
}
fn default_seed_packs() -> Vec<String> {
    vec!["initial-user".into(), "playbook".into(), "anchors".into()]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            database: None,
            session_secret: None,
            session_ttl_hours: default_session_ttl_hours(),
            secure_cookies: false,
            utc_offset_minutes: None,
            seed_packs: default_seed_packs(),
        }
    }
}

impl AppConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a TOML file, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Apply `ANCHOR_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(bind) = lookup("ANCHOR_SERVER_BIND") {
            self.bind = bind;
        }
        if let Some(port) = lookup("ANCHOR_SERVER_PORT") {
            self.port = port.parse().map_err(|_| ConfigError::Invalid {
                key: "ANCHOR_SERVER_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(db) = lookup("ANCHOR_DATABASE") {
            self.database = Some(PathBuf::from(db));
        }
        if let Some(secret) = lookup("ANCHOR_SESSION_SECRET") {
            self.session_secret = Some(secret);
        }
        Ok(())
    }

    /// `bind:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Database path, defaulting into the XDG data directory.
    pub fn database_path(&self, paths: &AppPaths) -> PathBuf {
        self.database
            .clone()
            .unwrap_or_else(|| paths.database_file())
    }

    /// Session TTL as a chrono duration.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours.max(1))
    }

    /// Resolve the session signing secret.
    ///
    /// A configured secret wins. Otherwise the hex key in
    /// `state_dir/session.key` is used, generating it on first run.
    pub fn session_secret(&self, paths: &AppPaths) -> ConfigResult<Vec<u8>> {
        if let Some(secret) = &self.session_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(ConfigError::Invalid {
                    key: "session_secret",
                    value: format!("{} bytes, need at least {MIN_SECRET_LEN}", secret.len()),
                });
            }
            return Ok(secret.as_bytes().to_vec());
        }

        let key_file = paths.session_key_file();
        if key_file.exists() {
            let encoded = std::fs::read_to_string(&key_file).map_err(|e| ConfigError::Read {
                path: key_file.display().to_string(),
                source: e,
            })?;
            return hex::decode(encoded.trim()).map_err(|e| ConfigError::Parse {
                path: key_file.display().to_string(),
                message: e.to_string(),
            });
        }

        let mut secret = vec![0u8; MIN_SECRET_LEN];
        rand::thread_rng().fill_bytes(&mut secret);
        if let Some(parent) = key_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(&key_file, hex::encode(&secret)).map_err(|e| ConfigError::Write {
            path: key_file.display().to_string(),
            source: e,
        })?;
        tracing::info!(path = %key_file.display(), "generated new session key");
        Ok(secret)
    }
}
