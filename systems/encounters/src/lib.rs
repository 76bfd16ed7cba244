#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Difficulty-gated weighted selection over the encounter catalog.

use gauntlet_core::{ConfigError, EncounterEntry};
use rand::Rng;
use serde::Deserialize;

/// Parameters of the linear enemy count curve.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    base_count: u32,
    count_rate: f32,
    max_bonus: u32,
}

impl Config {
    /// Creates a count curve `min(base + round(difficulty * rate), base + max_bonus)`.
    #[must_use]
    pub const fn new(base_count: u32, count_rate: f32, max_bonus: u32) -> Self {
        Self {
            base_count,
            count_rate,
            max_bonus,
        }
    }

    /// Rejects non-finite or negative growth rates.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("count_rate", self.count_rate)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(3, 0.5, 5)
    }
}

/// Read-only encounter catalog with weighted selection.
#[derive(Clone, Debug)]
pub struct EncounterSelector {
    entries: Vec<EncounterEntry>,
    config: Config,
}

impl EncounterSelector {
    /// Creates a selector over the provided catalog.
    #[must_use]
    pub fn new(entries: Vec<EncounterEntry>, config: Config) -> Self {
        Self { entries, config }
    }

    /// Every catalog entry, available or not.
    #[must_use]
    pub fn entries(&self) -> &[EncounterEntry] {
        &self.entries
    }

    /// Entries with a valid template whose minimum difficulty is met.
    #[must_use]
    pub fn available(&self, difficulty: u32) -> Vec<&EncounterEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.is_available(difficulty))
            .collect()
    }

    /// Picks an available entry with probability proportional to its weight.
    ///
    /// Falls back to a uniform pick when every available weight is zero and
    /// returns `None` when nothing is available at `difficulty`.
    pub fn weighted_pick<R>(&self, difficulty: u32, rng: &mut R) -> Option<&EncounterEntry>
    where
        R: Rng + ?Sized,
    {
        let available = self.available(difficulty);
        if available.is_empty() {
            return None;
        }

        let total: f32 = available.iter().map(|entry| effective_weight(entry)).sum();
        if !(total > 0.0 && total.is_finite()) {
            let index = rng.gen_range(0..available.len());
            return Some(available[index]);
        }

        let roll = rng.gen::<f32>() * total;
        let mut cumulative = 0.0;
        let mut last_weighted = None;
        for entry in available {
            let weight = effective_weight(entry);
            if weight <= 0.0 {
                continue;
            }
            cumulative += weight;
            last_weighted = Some(entry);
            if cumulative >= roll {
                return Some(entry);
            }
        }

        last_weighted
    }

    /// Number of enemies a room of the provided difficulty receives.
    #[must_use]
    pub fn calculate_count(&self, difficulty: u32) -> u32 {
        let bonus = (difficulty as f32 * self.config.count_rate).round();
        let bonus = if bonus.is_finite() && bonus > 0.0 {
            bonus.min(u32::MAX as f32) as u32
        } else {
            0
        };
        let scaled = self.config.base_count.saturating_add(bonus);
        let cap = self.config.base_count.saturating_add(self.config.max_bonus);
        scaled.min(cap)
    }
}

fn effective_weight(entry: &EncounterEntry) -> f32 {
    if entry.weight.is_finite() {
        entry.weight.max(0.0)
    } else {
        0.0
    }
}
