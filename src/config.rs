use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "INFINITE_WIKI_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub start_url: String,
    pub fetch: FetchConfig,
    pub layout: LayoutConfig,
    pub keybindings: KeybindingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Id of the element holding the article body.
    pub content_id: String,
    /// Class of the element holding the article title.
    pub title_class: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Tab labels longer than this are shortened with an ellipsis.
    pub tab_label_max: usize,
    /// Smallest height a level frame is given, borders included.
    pub min_frame_height: u16,
    /// How many level frames share the screen at once.
    pub visible_frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub quit: char,
    pub open_url: char,
    pub close_tab: char,
    pub scroll_down: char,
    pub scroll_up: char,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            start_url: "https://en.wikipedia.org/wiki/Main_Page".to_string(),
            fetch: FetchConfig::default(),
            layout: LayoutConfig::default(),
            keybindings: KeybindingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("infinite-wiki/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 30,
            content_id: "content".to_string(),
            title_class: "firstHeading".to_string(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tab_label_max: 20,
            min_frame_height: 8,
            visible_frames: 3,
        }
    }
}

impl Default for KeybindingConfig {
    fn default() -> Self {
        Self {
            quit: 'q',
            open_url: 'o',
            close_tab: 'x',
            scroll_down: 'j',
            scroll_up: 'k',
        }
    }
}

impl Config {
    /// Load from `$INFINITE_WIKI_CONFIG` if it is set, defaults otherwise.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                log::info!("⚙️ Loading config from {}", path);
                Self::load_from_file(path)
            }
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
