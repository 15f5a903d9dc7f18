// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Tether Contributors

//! Configuration for the connection manager.
//!
//! Settings merge, in order: built-in defaults, the user config file
//! (`~/.config/tether/config.toml`), an explicit file passed on the command
//! line, and `TETHER_*` environment variables.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// User-tunable settings for the connection manager.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Default server port, also the fallback bind target (default: 4096).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound (inclusive) of the free-port search range (default: 5096).
    #[serde(default = "default_port_range_end")]
    pub port_range_end: u16,

    /// Server executable name or path override (default: "opencode").
    #[serde(default = "default_binary")]
    pub binary: String,

    /// Whether the terminal running a spawned server should take focus.
    #[serde(default)]
    pub auto_focus_terminal: bool,
}

fn default_port() -> u16 {
    4096
}

fn default_port_range_end() -> u16 {
    5096
}

fn default_binary() -> String {
    "opencode".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            port_range_end: default_port_range_end(),
            binary: default_binary(),
            auto_focus_terminal: false,
        }
    }
}

impl Settings {
    /// Load settings from standard paths or a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if a config source fails to parse or deserialize.
    pub fn load(explicit_file: Option<PathBuf>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // 1. Start with defaults
        builder = builder
            .set_default("port", i64::from(default_port()))?
            .set_default("port_range_end", i64::from(default_port_range_end()))?
            .set_default("binary", default_binary())?
            .set_default("auto_focus_terminal", false)?;

        // 2. Load from user config directory (~/.config/tether/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("tether").join("config.toml");
            if config_path.exists() {
                builder = builder.add_source(config::File::from(config_path));
            }
        }

        // 3. Load from explicit file if provided
        if let Some(path) = explicit_file {
            builder = builder.add_source(config::File::from(path));
        }

        // 4. Load from environment variables (TETHER_PORT, etc.)
        builder = builder.add_source(config::Environment::with_prefix("TETHER"));

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sane() {
        let settings = Settings::default();
        assert_eq!(settings.port, 4096);
        assert_eq!(settings.port_range_end, 5096);
        assert_eq!(settings.binary, "opencode");
        assert!(!settings.auto_focus_terminal);
    }

    #[test]
    fn explicit_file_overrides_defaults() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(file, "port = 5000")?;
        writeln!(file, "binary = \"opencode-nightly\"")?;

        let settings = Settings::load(Some(file.path().to_path_buf()))?;

        assert_eq!(settings.port, 5000);
        assert_eq!(settings.binary, "opencode-nightly");
        // Untouched keys keep their defaults.
        assert_eq!(settings.port_range_end, 5096);
        Ok(())
    }
}
