use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ModlogError, Result};

/// Job name the default schedule binds to; the server registers the report
/// job under it.
pub const REPORT_JOB: &str = "report";

fn config_error(path: &Path, e: impl std::fmt::Display) -> ModlogError {
    ModlogError::Config {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Top-level application configuration, loaded from TOML.
///
/// Built once at startup and handed to the store, the auth gate, and the
/// scheduler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Read the config file at `path`. A file that does not exist yet
    /// yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| config_error(path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {}; using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write this configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| config_error(path, e))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Write the built-in defaults to `path` unless a file is already there.
    /// Returns whether a file was written.
    pub fn init_file(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }

    /// `~/.config/modlog/config.toml`, or `./modlog/config.toml` when the
    /// platform has no config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("modlog")
            .join("config.toml")
    }

    /// Apply `ACTION_FILE`, `USER_FILE` and `PORT` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply environment-style overrides from an arbitrary lookup.
    ///
    /// Empty values are ignored. An unparsable `PORT` is logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(file) = get("ACTION_FILE") {
            self.storage.action_file = PathBuf::from(file);
        }
        if let Some(file) = get("USER_FILE") {
            self.auth.user_file = PathBuf::from(file);
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Port.
    pub port: u16,
    /// Enable CORS.
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 3000,
            cors: false,
        }
    }
}

/// Action log location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub action_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            action_file: PathBuf::from("actions.json"),
        }
    }
}

/// HTTP Basic Auth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JSON credential file: `[{ "name": ..., "password": <argon2 hash> }]`.
    pub user_file: PathBuf,
    /// Realm announced in the `WWW-Authenticate` header.
    pub realm: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            user_file: PathBuf::from("users.json"),
            realm: "User Visible Realm".into(),
        }
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Where run history is persisted. `None` keeps it in memory only.
    pub state_file: Option<PathBuf>,
    pub schedules: Vec<ScheduleConfig>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            state_file: None,
            schedules: vec![ScheduleConfig::monthly_report()],
        }
    }
}

/// A single cron entry bound to a named job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub name: String,
    /// Cron expression (5, 6 or 7 fields), evaluated in server-local time.
    pub cron: String,
    /// Name of the registered job to invoke.
    pub job: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ScheduleConfig {
    /// First day of every month at noon.
    pub fn monthly_report() -> Self {
        Self {
            name: "monthly-report".into(),
            cron: "0 0 12 1 * *".into(),
            job: REPORT_JOB.into(),
            enabled: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("actions.json"));
        assert!(toml_str.contains("monthly-report"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.scheduler.schedules, config.scheduler.schedules);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig = toml::from_str("[server]\nport = 8081\n").unwrap();
        assert_eq!(parsed.server.port, 8081);
        assert_eq!(parsed.server.host, "127.0.0.1");
        assert_eq!(parsed.storage.action_file, PathBuf::from("actions.json"));
        assert_eq!(parsed.auth.realm, "User Visible Realm");
    }

    #[test]
    fn test_schedule_enabled_defaults_true() {
        let parsed: AppConfig = toml::from_str(
            "[[scheduler.schedules]]\nname = \"r\"\ncron = \"0 12 1 * *\"\njob = \"report\"\n",
        )
        .unwrap();
        assert_eq!(parsed.scheduler.schedules.len(), 1);
        assert!(parsed.scheduler.schedules[0].enabled);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("ACTION_FILE", "/data/actions.json"),
            ("USER_FILE", ""),
            ("PORT", "9000"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.storage.action_file, PathBuf::from("/data/actions.json"));
        assert_eq!(config.auth.user_file, PathBuf::from("users.json"));
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_load_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.scheduler.schedules, vec![ScheduleConfig::monthly_report()]);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ModlogError::Config { .. }));
    }

    #[test]
    fn test_save_to_then_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.server.port = 8443;
        config.storage.action_file = PathBuf::from("/srv/modlog/actions.json");
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 8443);
        assert_eq!(loaded.storage.action_file, config.storage.action_file);
    }

    #[test]
    fn test_init_file_writes_defaults_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        assert!(AppConfig::init_file(&path).unwrap());
        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.server.port, 3000);
        assert_eq!(loaded.storage.action_file, PathBuf::from("actions.json"));

        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();
        assert!(!AppConfig::init_file(&path).unwrap());
        assert_eq!(AppConfig::load(&path).unwrap().server.port, 9000);
    }

    #[test]
    fn test_default_schedule_targets_report_job() {
        assert_eq!(ScheduleConfig::monthly_report().job, REPORT_JOB);
    }

    #[test]
    fn test_invalid_port_ignored() {
        let mut config = AppConfig::default();
        config.apply_overrides(|k| (k == "PORT").then(|| "http".to_string()));
        assert_eq!(config.server.port, 3000);
    }
}
