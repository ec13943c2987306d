//! User settings: `~/.config/retro-chd/settings.toml`.
//!
//! ```toml
//! [cache]
//! hunks = 64
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use retro_chd::ChdOptions;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub cache: CacheSettings,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct CacheSettings {
    /// Decompressed hunks kept in memory.
    pub hunks: Option<usize>,
}

impl Settings {
    /// Reader options, with a command-line cache size taking priority.
    pub(crate) fn chd_options(&self, cache_override: Option<usize>) -> ChdOptions {
        let mut options = ChdOptions::new();
        if let Some(hunks) = cache_override.or(self.cache.hunks) {
            options = options.cache_hunks(hunks);
        }
        options
    }
}

/// Canonical path to the settings file.
pub(crate) fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("retro-chd").join("settings.toml")
}

/// Load settings, falling back to defaults when the file is missing or bad.
pub(crate) fn load_settings() -> Settings {
    let path = settings_path();
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return Settings::default();
    };
    match parse_settings(&contents) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("Ignoring {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

pub(crate) fn parse_settings(contents: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(contents)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
