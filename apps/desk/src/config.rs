use std::{fs, path::Path};

use anyhow::{bail, Context};
use client_core::{normalize_base_url, DEFAULT_API_URL};
use serde::Deserialize;
use shared::domain::DEFAULT_PAGE_SIZE;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "request_desk.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub page_size: u32,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            page_size: DEFAULT_PAGE_SIZE,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    page_size: Option<u32>,
    log_filter: Option<String>,
}

/// Defaults, then the TOML file, then environment variables. An explicit
/// `path` must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let raw = match path {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?,
        ),
        None => fs::read_to_string(DEFAULT_CONFIG_FILE).ok(),
    };
    if let Some(raw) = raw {
        let file_cfg: FileSettings = toml::from_str(&raw).context("invalid config file")?;
        apply_file(&mut settings, file_cfg);
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings.api_url = normalize_api_url(&settings.api_url)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.api_url {
        settings.api_url = v;
    }
    if let Some(v) = file_cfg.page_size.filter(|size| *size > 0) {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.log_filter {
        settings.log_filter = v;
    }
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("REQUEST_DESK_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = lookup("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = lookup("APP__PAGE_SIZE") {
        if let Ok(parsed) = v.trim().parse::<u32>() {
            if parsed > 0 {
                settings.page_size = parsed;
            }
        }
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }
}

pub fn normalize_api_url(raw: &str) -> anyhow::Result<String> {
    let normalized = normalize_base_url(raw);
    if normalized.is_empty() {
        return Ok(DEFAULT_API_URL.to_string());
    }

    let url = Url::parse(&normalized).with_context(|| format!("invalid api url '{normalized}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api url '{normalized}' must use http or https");
    }
    Ok(normalized)
}
