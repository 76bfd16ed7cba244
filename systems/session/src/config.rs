//! Aggregated configuration of a session.

use gauntlet_core::ConfigError;
use gauntlet_system_encounters::Config as EncounterConfig;
use gauntlet_system_rooms::Config as RoomConfig;
use gauntlet_system_spawning::Config as SpawnConfig;
use gauntlet_system_waves::Config as WaveConfig;
use serde::Deserialize;

/// Configuration of every system owned by a session.
///
/// Per-system seeds are derived from [`SessionConfig::seed`]; seeds set on
/// the nested configurations are ignored.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Room sequencing.
    pub rooms: RoomConfig,
    /// Enemy count curve.
    pub encounters: EncounterConfig,
    /// Spawn placement and stat scaling.
    pub spawning: SpawnConfig,
    /// Wave progression.
    pub waves: WaveConfig,
    /// Distance from an unlocked exit at which the next room is spawned.
    pub exit_radius: f32,
    /// Whether reaching an unlocked exit spawns the next room.
    pub auto_advance: bool,
    /// Master seed of every random stream.
    pub seed: u64,
}

impl SessionConfig {
    /// Checks every nested configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rooms.validate()?;
        self.encounters.validate()?;
        self.spawning.validate()?;
        self.waves.validate()?;
        ConfigError::check_non_negative("exit_radius", self.exit_radius)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rooms: RoomConfig::default(),
            encounters: EncounterConfig::default(),
            spawning: SpawnConfig::default(),
            waves: WaveConfig::default(),
            exit_radius: 1.5,
            auto_advance: true,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_system_waves::ProgressionMode;

    #[test]
    fn nested_tables_override_defaults() {
        let config: SessionConfig = toml::from_str(
            r#"
            seed = 99
            exit_radius = 2.5

            [rooms]
            max_active_rooms = 5
            boss_every = 2

            [waves]
            mode = "timed"
            max_concurrent_waves = 3
            timed_interval = 4.0
            "#,
        )
        .expect("parse session config");

        assert_eq!(config.seed, 99);
        assert_eq!(config.rooms, RoomConfig::new(5, 2));
        assert_eq!(config.waves.mode(), ProgressionMode::Timed);
        assert_eq!(config.spawning, SpawnConfig::default());
        assert!(config.auto_advance);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validation_reports_the_first_offending_field() {
        let mut config = SessionConfig::default();
        config.exit_radius = -1.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "exit_radius"
            })
        );

        config.rooms = RoomConfig::new(0, 2);
        assert_eq!(config.validate(), Err(ConfigError::ZeroActiveRooms));
    }
}
