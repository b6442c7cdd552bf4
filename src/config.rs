use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One dropdown entry. A plain item jumps straight to `step`; an item with
/// `submenu` children expands instead and the children carry the targets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MenuEntry {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default)]
    pub submenu: Vec<SubmenuEntry>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmenuEntry {
    pub label: String,
    pub step: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_theme")]
    pub theme: String,
    /// Flow CSV to load; the bundled demo flow when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// Delay between a modal action and the focus re-application.
    #[serde(default = "default_transition_delay_ms")]
    pub transition_delay_ms: u64,
    /// Delay before the confirmation's initial yes-highlight appears.
    #[serde(default = "default_focus_delay_ms")]
    pub focus_delay_ms: u64,
    /// Pause before an auto-replayed choice advances, long enough for the
    /// user to see what was picked for them.
    #[serde(default = "default_auto_advance_delay_ms")]
    pub auto_advance_delay_ms: u64,
    /// How long the destination-section highlight lingers.
    #[serde(default = "default_highlight_decay_ms")]
    pub highlight_decay_ms: u64,
    /// Terms rendered in the highlight color wherever they appear in step
    /// descriptions.
    #[serde(default)]
    pub highlight_terms: Vec<String>,
    #[serde(default = "default_show_guide")]
    pub show_guide: bool,
    #[serde(default = "default_menu")]
    pub menu: Vec<MenuEntry>,
}

fn default_theme() -> String {
    "catppuccin-mocha".to_string()
}
fn default_transition_delay_ms() -> u64 {
    150
}
fn default_focus_delay_ms() -> u64 {
    100
}
fn default_auto_advance_delay_ms() -> u64 {
    1500
}
fn default_highlight_decay_ms() -> u64 {
    500
}
fn default_show_guide() -> bool {
    true
}
fn default_menu() -> Vec<MenuEntry> {
    vec![MenuEntry {
        label: "Restart".to_string(),
        step: Some("1".to_string()),
        submenu: Vec::new(),
    }]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            flow: None,
            transition_delay_ms: default_transition_delay_ms(),
            focus_delay_ms: default_focus_delay_ms(),
            auto_advance_delay_ms: default_auto_advance_delay_ms(),
            highlight_decay_ms: default_highlight_decay_ms(),
            highlight_terms: Vec::new(),
            show_guide: default_show_guide(),
            menu: default_menu(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    #[allow(dead_code)]
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stepflow")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.transition_delay_ms, 150);
        assert_eq!(config.focus_delay_ms, 100);
        assert_eq!(config.auto_advance_delay_ms, 1500);
        assert_eq!(config.highlight_decay_ms, 500);
        assert!(config.show_guide);
        assert_eq!(config.menu.len(), 1);
        assert_eq!(config.menu[0].step.as_deref(), Some("1"));
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_the_rest() {
        let toml_str = r#"
theme = "terminal-dim"
auto_advance_delay_ms = 800
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.theme, "terminal-dim");
        assert_eq!(config.auto_advance_delay_ms, 800);
        assert_eq!(config.transition_delay_ms, 150);
    }

    #[test]
    fn test_menu_with_submenu() {
        let toml_str = r#"
[[menu]]
label = "Restart"
step = "1"

[[menu]]
label = "Chapters"

[[menu.submenu]]
label = "Intake"
step = "10"

[[menu.submenu]]
label = "Review"
step = "20"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.menu.len(), 2);
        assert!(config.menu[1].step.is_none());
        assert_eq!(config.menu[1].submenu.len(), 2);
        assert_eq!(config.menu[1].submenu[1].step, "20");
    }

    #[test]
    fn test_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.theme, deserialized.theme);
        assert_eq!(config.menu.len(), deserialized.menu.len());
    }
}
