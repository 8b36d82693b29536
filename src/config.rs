//! Configuration persistence for AppVol
//!
//! The configuration is a small JSON document with two sections: `hotkeys`
//! (action name -> ordered list of lowercase key tokens) and `gui` (overlay
//! opacity and auto-hide timeout). A missing file is created with defaults;
//! a corrupt file is logged, overwritten with defaults, and the application
//! continues. Every recognized action always resolves to *some* binding:
//! actions absent from the document fall back to their built-in default
//! individually, not as a whole-document fallback.

use anyhow::{Context, Result};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    OVERLAY_OPACITY_DEFAULT, OVERLAY_TIMEOUT_DEFAULT_MS, OVERLAY_TIMEOUT_MIN_MS,
};

/// A user-triggerable action that can be bound to a global hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    VolumeUp,
    VolumeDown,
    Mute,
    SwitchApp,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::VolumeUp,
        Action::VolumeDown,
        Action::Mute,
        Action::SwitchApp,
    ];

    /// Stable key used in the config document.
    pub fn name(self) -> &'static str {
        match self {
            Action::VolumeUp => "volume_up",
            Action::VolumeDown => "volume_down",
            Action::Mute => "mute",
            Action::SwitchApp => "switch_app",
        }
    }

    /// Human-readable label for the settings dialog.
    pub fn label(self) -> &'static str {
        match self {
            Action::VolumeUp => "Volume up",
            Action::VolumeDown => "Volume down",
            Action::Mute => "Mute",
            Action::SwitchApp => "Switch application",
        }
    }

    /// Built-in binding used when the action is absent from the document.
    pub fn default_binding(self) -> Vec<String> {
        let keys: &[&str] = match self {
            Action::VolumeUp => &["ctrl", "alt", "up"],
            Action::VolumeDown => &["ctrl", "alt", "down"],
            Action::Mute => &["ctrl", "alt", "m"],
            Action::SwitchApp => &["ctrl", "alt", "tab"],
        };
        keys.iter().map(|k| k.to_string()).collect()
    }
}

/// Overlay tunables.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct GuiConfig {
    /// Overlay window opacity in [0.0, 1.0].
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    /// Overlay auto-hide timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

fn default_opacity() -> f64 {
    OVERLAY_OPACITY_DEFAULT
}

fn default_timeout() -> u64 {
    OVERLAY_TIMEOUT_DEFAULT_MS
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            opacity: default_opacity(),
            timeout: default_timeout(),
        }
    }
}

/// The persisted configuration document.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub hotkeys: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub gui: GuiConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut hotkeys = BTreeMap::new();
        for action in Action::ALL {
            hotkeys.insert(action.name().to_string(), action.default_binding());
        }
        Self {
            hotkeys,
            gui: GuiConfig::default(),
        }
    }
}

impl Config {
    /// Binding for `action`, falling back to the built-in default when the
    /// action is missing or bound to an empty list.
    pub fn binding(&self, action: Action) -> Vec<String> {
        self.hotkeys
            .get(action.name())
            .filter(|keys| !keys.is_empty())
            .cloned()
            .unwrap_or_else(|| action.default_binding())
    }

    /// Auto-hide timeout with the configured floor applied.
    pub fn overlay_timeout_ms(&self) -> u64 {
        self.timeout_clamped()
    }

    /// Opacity clamped to [0.0, 1.0].
    pub fn overlay_opacity(&self) -> f64 {
        self.gui.opacity.clamp(0.0, 1.0)
    }

    fn timeout_clamped(&self) -> u64 {
        self.gui.timeout.max(OVERLAY_TIMEOUT_MIN_MS)
    }

    fn warn_on_out_of_range(&self) {
        if !(0.0..=1.0).contains(&self.gui.opacity) {
            warn!(
                "Configured opacity {} out of [0,1], clamping",
                self.gui.opacity
            );
        }
        if self.gui.timeout < OVERLAY_TIMEOUT_MIN_MS {
            warn!(
                "Configured timeout {}ms below minimum, using {}ms",
                self.gui.timeout, OVERLAY_TIMEOUT_MIN_MS
            );
        }
    }
}

/// Owns the on-disk configuration and writes every mutation through.
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Standard config file path: `<config_dir>/appvol/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("appvol")
            .join("config.json")
    }

    /// Load the configuration from `path`, recovering to defaults on any
    /// failure. This never prevents startup: a missing file is created with
    /// defaults, a corrupt file is overwritten with defaults.
    pub fn load(path: PathBuf) -> Self {
        let config = match Self::read(&path) {
            Ok(Some(config)) => {
                info!("Config loaded from {}", path.display());
                config
            }
            Ok(None) => {
                info!(
                    "Config file not found at {}, creating defaults",
                    path.display()
                );
                let config = Config::default();
                Self::write(&path, &config);
                config
            }
            Err(e) => {
                error!(
                    "Failed to load config from {}: {:#}. Rewriting defaults.",
                    path.display(),
                    e
                );
                let config = Config::default();
                Self::write(&path, &config);
                config
            }
        };
        config.warn_on_out_of_range();
        Self { path, config }
    }

    fn read(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(Some(config))
    }

    fn write(path: &Path, config: &Config) {
        let result: Result<()> = (|| {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            let contents =
                serde_json::to_string_pretty(config).context("Failed to serialize config")?;
            fs::write(path, contents)
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;
            Ok(())
        })();
        match result {
            Ok(()) => info!("Config saved to {}", path.display()),
            // Save failures are logged and swallowed; the in-memory config stays live.
            Err(e) => error!("Failed to save config: {:#}", e),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn binding(&self, action: Action) -> Vec<String> {
        self.config.binding(action)
    }

    /// Replace the binding for `action` and persist immediately.
    pub fn set_binding(&mut self, action: Action, keys: Vec<String>) {
        self.config.hotkeys.insert(action.name().to_string(), keys);
        self.save();
    }

    pub fn save(&self) {
        Self::write(&self.path, &self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_has_a_default_binding() {
        for action in Action::ALL {
            assert!(
                !action.default_binding().is_empty(),
                "{} must have a default binding",
                action.name()
            );
        }
    }

    #[test]
    fn binding_falls_back_per_action() {
        let mut config = Config {
            hotkeys: BTreeMap::new(),
            gui: GuiConfig::default(),
        };
        config.hotkeys.insert(
            "mute".to_string(),
            vec!["ctrl".into(), "alt".into(), "m".into()],
        );

        assert_eq!(config.binding(Action::Mute), vec!["ctrl", "alt", "m"]);
        assert_eq!(
            config.binding(Action::VolumeUp),
            Action::VolumeUp.default_binding()
        );
    }

    #[test]
    fn empty_binding_falls_back_to_default() {
        let mut config = Config::default();
        config.hotkeys.insert("volume_up".to_string(), vec![]);
        assert_eq!(
            config.binding(Action::VolumeUp),
            Action::VolumeUp.default_binding()
        );
    }

    #[test]
    fn gui_values_are_clamped_by_accessors() {
        let config = Config {
            hotkeys: BTreeMap::new(),
            gui: GuiConfig {
                opacity: 1.7,
                timeout: 10,
            },
        };
        assert_eq!(config.overlay_opacity(), 1.0);
        assert_eq!(config.overlay_timeout_ms(), OVERLAY_TIMEOUT_MIN_MS);
    }
}
