//! Match settings and preferences
//!
//! Persisted as JSON next to the binary (or wherever `EMOJI_SIEGE_CONFIG`
//! points). A missing or malformed file silently falls back to defaults so a
//! bad config can never block a match from starting.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::consts;
use crate::sim::team::TeamColor;

/// Match settings/preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Turn rules ===
    /// Seconds each combatant gets before the turn force-resolves
    pub turn_time_limit: u32,

    // === Teams ===
    /// Display name overrides, keyed by team color
    pub team_names: BTreeMap<TeamColor, String>,
    /// Combatant emoji overrides, keyed by team color
    pub team_emojis: BTreeMap<TeamColor, String>,

    // === Terrain generation ===
    /// Maximum height delta between adjacent surface samples
    pub terrain_smoothness: f32,
    /// Highest point the surface may reach (smaller y is higher on screen)
    pub terrain_min_height: f32,
    /// Lowest point the surface may reach
    pub terrain_max_height: f32,

    // === Frontend ===
    /// Whether a match was running when settings were last saved; frontends
    /// use this to skip the menu and offer a resume prompt.
    pub match_in_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            turn_time_limit: consts::DEFAULT_TURN_SECONDS,
            team_names: BTreeMap::new(),
            team_emojis: BTreeMap::new(),
            terrain_smoothness: consts::TERRAIN_SMOOTHNESS,
            terrain_min_height: consts::TERRAIN_MIN_HEIGHT,
            terrain_max_height: consts::TERRAIN_MAX_HEIGHT,
            match_in_progress: false,
        }
    }
}

impl Settings {
    /// Display name for a team, falling back to the color's stock name.
    pub fn team_name(&self, color: TeamColor) -> String {
        self.team_names
            .get(&color)
            .cloned()
            .unwrap_or_else(|| color.default_name())
    }

    /// Combatant emoji for a team, falling back to the color's stock emoji.
    pub fn team_emoji(&self, color: TeamColor) -> &str {
        self.team_emojis
            .get(&color)
            .map(String::as_str)
            .unwrap_or_else(|| color.default_emoji())
    }

    fn config_path() -> PathBuf {
        std::env::var_os("EMOJI_SIEGE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("emoji-siege.json"))
    }

    /// Load settings from disk, falling back to defaults on any failure.
    pub fn load() -> Self {
        let path = Self::config_path();
        match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Malformed settings in {}: {e}, using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    /// Save settings to disk.
    pub fn save(&self) {
        let path = Self::config_path();
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    log::warn!("Could not save settings to {}: {e}", path.display());
                } else {
                    log::info!("Settings saved");
                }
            }
            Err(e) => log::warn!("Could not serialize settings: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.turn_time_limit, 10);
        assert_eq!(settings.team_name(TeamColor::Yellow), "Yellow Team");
        assert_eq!(settings.team_emoji(TeamColor::Blue), "😎");
    }

    #[test]
    fn test_overrides_win_over_stock() {
        let mut settings = Settings::default();
        settings
            .team_names
            .insert(TeamColor::Green, "Grasshoppers".to_string());
        settings.team_emojis.insert(TeamColor::Green, "🐸".to_string());
        assert_eq!(settings.team_name(TeamColor::Green), "Grasshoppers");
        assert_eq!(settings.team_emoji(TeamColor::Green), "🐸");
        assert_eq!(settings.team_name(TeamColor::Violet), "Violet Team");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"turn_time_limit": 30}"#).unwrap();
        assert_eq!(settings.turn_time_limit, 30);
        assert_eq!(settings.terrain_smoothness, consts::TERRAIN_SMOOTHNESS);
    }
}
