use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// How decoded calls are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// ABI file used when none is given on the command line
    #[serde(default)]
    pub abi: Option<String>,

    #[serde(default)]
    pub format: Option<OutputFormat>,

    /// Tracing filter directive, e.g. "abi_decode=debug"
    #[serde(default)]
    pub log: Option<String>,
}

impl Config {
    /// Default ABI path with a leading `~/` expanded
    pub fn abi_path(&self) -> Option<PathBuf> {
        self.abi
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(expand_home)
    }
}

/// Load the config file, falling back to defaults when it is missing or invalid
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_from(&path).unwrap_or_default()
}

pub fn load_from(path: &Path) -> Result<Config> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str::<Config>(&content).with_context(|| format!("parse config {}", path.display()))
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("ABI_DECODE_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("abi-decode").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("abi-decode").join("config.toml"));
    }

    directories::ProjectDirs::from("io", "abi-decode", "abi-decode")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
