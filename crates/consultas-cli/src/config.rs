// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "consultas";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_FILE_NAME: &str = "consultas.log";

pub const CONFIG_PATH_ENV: &str = "CONSULTAS_CONFIG_PATH";
pub const BASE_URL_ENV: &str = "CONSULTAS_BASE_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            server: Server::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Server {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version -- add `version = 1` and put settings under [server] and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {} -- expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.server.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed.is_zero() {
                bail!(
                    "server.timeout in {} must be positive, got {} -- remove it to wait indefinitely",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(level) = &self.log.level
            && level.trim().is_empty()
        {
            bail!("log.level in {} must not be empty", path.display());
        }

        Ok(())
    }

    /// Resolves the server base URL: `override_url` (the command line) wins,
    /// then `CONSULTAS_BASE_URL`, then `[server].base_url`, then the default.
    /// The client validates the result.
    pub fn base_url(&self, override_url: Option<&str>) -> String {
        match override_url {
            Some(url) => url.to_owned(),
            None => match env::var(BASE_URL_ENV) {
                Ok(url) if !url.trim().is_empty() => url,
                _ => self
                    .server
                    .base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned()),
            },
        }
    }

    pub fn timeout(&self) -> Result<Option<Duration>> {
        self.server
            .timeout
            .as_deref()
            .map(parse_duration)
            .transpose()
    }

    pub fn log_level(&self) -> &str {
        self.log
            .level
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// `None` when neither `[log].file` nor a platform data directory is
    /// available.
    pub fn log_path(&self) -> Option<PathBuf> {
        match &self.log.file {
            Some(file) => Some(PathBuf::from(file)),
            None => dirs::data_local_dir().map(|root| root.join(APP_NAME).join(LOG_FILE_NAME)),
        }
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# consultas config\n# Place this file at: {}\n\nversion = 1\n\n[server]\nbase_url = \"{}\"\n# Optional. Omit to wait on the server indefinitely.\n# timeout = \"30s\"\n\n[log]\n# Overridden by the {} environment variable when set.\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/consultas/consultas.log)\n# file = \"/absolute/path/to/consultas.log\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            crate::logging::LOG_ENV,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        let secs = mins
            .checked_mul(60)
            .ok_or_else(|| anyhow!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 30s)")
}

#[cfg(test)]
mod tests {
    use super::{BASE_URL_ENV, CONFIG_PATH_ENV, Config, parse_duration};
    use anyhow::Result;
    use consultas_client::Client;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(BASE_URL_ENV);
        }
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(None), "http://localhost:8000");
        assert_eq!(config.timeout()?, None);
        assert_eq!(config.log_level(), "info");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[server]\nbase_url = \"http://db:8000\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[server] and [log]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(BASE_URL_ENV);
        }
        let (_temp, path) = write_config(
            "version = 1\n[server]\nbase_url = \"https://consultas.example.edu/\"\ntimeout = \"2m\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/consultas-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(None), "https://consultas.example.edu/");
        assert_eq!(config.timeout()?, Some(Duration::from_secs(120)));
        assert_eq!(config.log_level(), "debug");
        assert_eq!(
            config.log_path(),
            Some(PathBuf::from("/tmp/consultas-test.log"))
        );
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_left_to_the_client() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(BASE_URL_ENV);
        }
        let (_temp, path) = write_config("version = 1\n[server]\nbase_url = \"ftp://files\"\n")?;
        let config = Config::load(&path)?;
        let error = Client::new(&config.base_url(None), None)
            .expect_err("ftp base url should fail");
        assert!(error.to_string().contains("must use http or https"), "{error}");
        Ok(())
    }

    #[test]
    fn zero_timeout_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[server]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn base_url_override_order_is_flag_then_env_then_file() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[server]\nbase_url = \"http://from-file:8000\"\n")?;
        let config = Config::load(&path)?;

        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(BASE_URL_ENV, "http://from-env:8000/");
        }
        let from_env = config.base_url(None);
        let from_flag = config.base_url(Some("http://from-flag:8000"));
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(BASE_URL_ENV);
        }
        let from_file = config.base_url(None);

        assert_eq!(from_env, "http://from-env:8000/");
        assert_eq!(from_flag, "http://from-flag:8000");
        assert_eq!(from_file, "http://from-file:8000");
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, &override_path);
        }
        let resolved = Config::default_path();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        assert_eq!(resolved?, override_path);
        Ok(())
    }

    #[test]
    fn default_path_lives_under_app_dir() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var(CONFIG_PATH_ENV);
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("consultas/config.toml"), "got {}", path.display());
        Ok(())
    }

    #[test]
    fn timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("30s")?, Duration::from_secs(30));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn timeout_rejects_overflowing_minutes() {
        let error = parse_duration(&format!("{}m", u64::MAX))
            .expect_err("overflowing minutes should fail");
        assert!(error.to_string().contains("invalid timeout duration"));
    }

    #[test]
    fn timeout_rejects_invalid_duration() {
        let error = parse_duration("soon").expect_err("invalid duration should fail");
        let message = error.to_string();
        assert!(
            message.contains("invalid duration") || message.contains("invalid timeout duration"),
            "unexpected message: {message}"
        );
    }

    #[test]
    fn example_config_loads_back() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[server]"));
        assert!(example.contains("[log]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.log_level(), "info");
        Ok(())
    }
}
