// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "CONSULTAS_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Disabled,
}

impl LogTarget {
    /// The terminal belongs to the UI in interactive mode, so events go to
    /// a file there and to stderr for one-shot commands.
    pub fn for_mode(config: &Config, interactive: bool) -> Self {
        if !interactive {
            return Self::Stderr;
        }
        config.log_path().map_or(Self::Disabled, Self::File)
    }
}

pub fn build_filter(config: &Config) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return Ok(filter);
    }
    EnvFilter::try_new(config.log_level()).with_context(|| {
        format!(
            "invalid log level {:?} -- use a level like info or debug, or a {LOG_ENV} directive",
            config.log_level()
        )
    })
}

pub fn init(config: &Config, target: &LogTarget) -> Result<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match target {
        LogTarget::Disabled => Ok(()),
        LogTarget::Stderr => builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|error| anyhow!("install stderr logger: {error}")),
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|error| anyhow!("install file logger: {error}"))
        }
    }
}

fn open_log_file(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {} -- set [log].file to a writable path",
                path.display()
            )
        })
}
