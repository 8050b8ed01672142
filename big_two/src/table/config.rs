//! Game and engine configuration models.

use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

use crate::game::{
    GameError,
    constants::{
        AUTO_PASS_DURATION_MS, DEFAULT_SCORE_LIMIT, MAX_PLAYER_NAME_LENGTH, NUM_PLAYERS,
        STATE_STORAGE_KEY, TICK_INTERVAL_MS,
    },
};

/// Bot difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotDifficulty {
    Easy,   // Passes a beatable table 40% of the time
    Medium, // Passes a beatable table 15% of the time
    Hard,   // Reads opponents' card counts, keeps high cards back
}

impl std::fmt::Display for BotDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BotDifficulty::Easy => write!(f, "easy"),
            BotDifficulty::Medium => write!(f, "medium"),
            BotDifficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            "hard" => Ok(BotDifficulty::Hard),
            other => Err(format!("unknown bot difficulty: {other}")),
        }
    }
}

/// Input to `initialize_game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Display name of the human in seat 0
    pub player_name: String,

    /// Number of bot seats (1-3); any seat left over is another human seat
    pub bot_count: u8,

    /// Difficulty shared by every bot seat
    pub bot_difficulty: BotDifficulty,

    /// Seed for shuffles and bot randomness; `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            bot_count: 3,
            bot_difficulty: BotDifficulty::Medium,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), GameError> {
        let name = self.player_name.trim();
        if name.is_empty() {
            return Err(GameError::InvalidConfig(
                "Player name must not be empty".to_string(),
            ));
        }

        if name.chars().count() > MAX_PLAYER_NAME_LENGTH {
            return Err(GameError::InvalidConfig(format!(
                "Player name must be at most {MAX_PLAYER_NAME_LENGTH} characters"
            )));
        }

        if self.bot_count == 0 || self.bot_count as usize >= NUM_PLAYERS {
            return Err(GameError::InvalidConfig(format!(
                "Bot count must be between 1 and {}",
                NUM_PLAYERS - 1
            )));
        }

        Ok(())
    }
}

/// Process-wide engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Auto-pass countdown length in milliseconds
    pub auto_pass_duration_ms: u64,

    /// Countdown tick period in milliseconds
    pub tick_interval_ms: u64,

    /// Cumulative score that ends the game
    pub score_limit: u32,

    /// Key of the whole-game snapshot in the state store
    pub storage_key: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            auto_pass_duration_ms: AUTO_PASS_DURATION_MS,
            tick_interval_ms: TICK_INTERVAL_MS,
            score_limit: DEFAULT_SCORE_LIMIT,
            storage_key: STATE_STORAGE_KEY.to_string(),
        }
    }
}

impl EngineSettings {
    /// Load settings from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns error if a loaded value fails validation
    pub fn from_env() -> Result<Self, SettingsError> {
        let defaults = Self::default();
        let settings = Self {
            auto_pass_duration_ms: parse_env_or(
                "BIG_TWO_AUTO_PASS_MS",
                defaults.auto_pass_duration_ms,
            ),
            tick_interval_ms: parse_env_or("BIG_TWO_TICK_MS", defaults.tick_interval_ms),
            score_limit: parse_env_or("BIG_TWO_SCORE_LIMIT", defaults.score_limit),
            storage_key: std::env::var("BIG_TWO_STORAGE_KEY").unwrap_or(defaults.storage_key),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.tick_interval_ms == 0 {
            return Err(SettingsError::Invalid {
                var: "BIG_TWO_TICK_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.auto_pass_duration_ms < self.tick_interval_ms {
            return Err(SettingsError::Invalid {
                var: "BIG_TWO_AUTO_PASS_MS".to_string(),
                reason: format!(
                    "Must be at least one tick ({} ms)",
                    self.tick_interval_ms
                ),
            });
        }

        if self.score_limit == 0 {
            return Err(SettingsError::Invalid {
                var: "BIG_TWO_SCORE_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.storage_key.trim().is_empty() {
            return Err(SettingsError::Invalid {
                var: "BIG_TWO_STORAGE_KEY".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }

    #[must_use]
    pub fn auto_pass_duration(&self) -> Duration {
        Duration::from_millis(self.auto_pass_duration_ms)
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Settings error types
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: tests touching the environment run serially.
        unsafe {
            std::env::remove_var("BIG_TWO_AUTO_PASS_MS");
            std::env::remove_var("BIG_TWO_TICK_MS");
            std::env::remove_var("BIG_TWO_SCORE_LIMIT");
            std::env::remove_var("BIG_TWO_STORAGE_KEY");
        }
    }

    #[test]
    fn test_default_game_config_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bot_count_bounds() {
        for bot_count in [0, 4] {
            let config = GameConfig {
                bot_count,
                ..GameConfig::default()
            };
            assert!(matches!(config.validate(), Err(GameError::InvalidConfig(_))));
        }
        let config = GameConfig {
            bot_count: 1,
            ..GameConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_player_name_rejected() {
        let config = GameConfig {
            player_name: "   ".to_string(),
            ..GameConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_difficulty_parse_and_display() {
        assert_eq!("HARD".parse::<BotDifficulty>(), Ok(BotDifficulty::Hard));
        assert!("tag".parse::<BotDifficulty>().is_err());
        assert_eq!(BotDifficulty::Medium.to_string(), "medium");
        assert_eq!(
            serde_json::to_string(&BotDifficulty::Easy).unwrap(),
            "\"easy\""
        );
    }

    #[test]
    #[serial]
    fn test_settings_from_env_defaults() {
        clear_env();
        let settings = EngineSettings::from_env().unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.auto_pass_duration(), Duration::from_secs(10));
        assert_eq!(settings.tick_interval(), Duration::from_millis(100));
    }

    #[test]
    #[serial]
    fn test_settings_from_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("BIG_TWO_AUTO_PASS_MS", "5000");
            std::env::set_var("BIG_TWO_SCORE_LIMIT", "51");
            std::env::set_var("BIG_TWO_TICK_MS", "not-a-number");
        }
        let settings = EngineSettings::from_env().unwrap();
        assert_eq!(settings.auto_pass_duration_ms, 5000);
        assert_eq!(settings.score_limit, 51);
        assert_eq!(settings.tick_interval_ms, TICK_INTERVAL_MS);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_settings_from_env_rejects_zero_tick() {
        clear_env();
        unsafe {
            std::env::set_var("BIG_TWO_TICK_MS", "0");
        }
        let err = EngineSettings::from_env().unwrap_err();
        assert!(err.to_string().contains("BIG_TWO_TICK_MS"));
        clear_env();
    }
}
