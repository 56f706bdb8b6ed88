//! Player configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the script player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Divisor applied to timed waits while skipping.
    pub skip_time_scale: f64,
    /// Seconds auto-play waits before continuing past an input wait.
    pub min_auto_play_delay_secs: f64,
    /// Whether `goto` into another script resets services by default.
    pub reset_on_goto: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_time_scale: 10.0,
            min_auto_play_delay_secs: 3.0,
            reset_on_goto: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: PlayerConfig = serde_json::from_str(r#"{"reset_on_goto": false}"#).unwrap();

        assert!(!config.reset_on_goto);
        assert!((config.skip_time_scale - 10.0).abs() < f64::EPSILON);
        assert!((config.min_auto_play_delay_secs - 3.0).abs() < f64::EPSILON);
    }
}
