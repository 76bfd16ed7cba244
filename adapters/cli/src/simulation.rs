//! Headless session runs against the in-memory world.

use std::{collections::BTreeMap, fmt, time::Duration};

use anyhow::{bail, Context, Result};
use gauntlet_core::{Command, EntityRef, Event, RoomKind};
use gauntlet_system_session::{Session, SessionConfig};
use gauntlet_world as world;
use tracing::debug;

use crate::demo;

/// Parameters of a single headless run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct RunOptions {
    /// Number of rooms that must be cleared before the run stops.
    pub(crate) rooms: u64,
    /// Simulated time advanced per step.
    pub(crate) dt: Duration,
    /// Time a spawned enemy survives before it is killed.
    pub(crate) enemy_lifetime: Duration,
    /// Upper bound on simulated steps.
    pub(crate) max_steps: u64,
}

/// Aggregated outcome of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub(crate) steps: u64,
    pub(crate) simulated: Duration,
    pub(crate) rooms_spawned: u64,
    pub(crate) boss_rooms: u64,
    pub(crate) rooms_evicted: u64,
    pub(crate) final_difficulty: u32,
    pub(crate) anchor_fallbacks: u64,
    pub(crate) entities_spawned: u64,
    pub(crate) spawns_skipped: u64,
    pub(crate) enemies_killed: u64,
    pub(crate) waves_triggered: u64,
    pub(crate) waves_cleared: u64,
    pub(crate) exits_unlocked: u64,
}

impl Summary {
    fn record(&mut self, event: &Event) {
        match event {
            Event::RoomSpawned { kind, .. } => {
                self.rooms_spawned += 1;
                if *kind == RoomKind::Boss {
                    self.boss_rooms += 1;
                }
            }
            Event::RoomEvicted { .. } => self.rooms_evicted += 1,
            Event::AnchorFallback { .. } => self.anchor_fallbacks += 1,
            Event::EntitySpawned { .. } => self.entities_spawned += 1,
            Event::SpawnSkipped { .. } => self.spawns_skipped += 1,
            Event::EntityDestroyed { .. } => self.enemies_killed += 1,
            Event::WaveTriggered { .. } => self.waves_triggered += 1,
            Event::WaveCleared { .. } => self.waves_cleared += 1,
            Event::ExitUnlocked { .. } => self.exits_unlocked += 1,
            Event::PlayerRelocated { .. }
            | Event::WaveWarningElapsed { .. }
            | Event::WaveCompleted { .. }
            | Event::AllWavesCompleted { .. }
            | Event::RewardSpawned { .. } => {}
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "simulated {:.1}s over {} steps",
            self.simulated.as_secs_f64(),
            self.steps
        )?;
        writeln!(
            f,
            "rooms: {} spawned ({} boss), {} evicted, final difficulty {}",
            self.rooms_spawned, self.boss_rooms, self.rooms_evicted, self.final_difficulty
        )?;
        writeln!(
            f,
            "enemies: {} spawned, {} skipped, {} killed",
            self.entities_spawned, self.spawns_skipped, self.enemies_killed
        )?;
        writeln!(
            f,
            "waves: {} triggered, {} cleared",
            self.waves_triggered, self.waves_cleared
        )?;
        write!(
            f,
            "exits unlocked: {}, anchor fallbacks: {}",
            self.exits_unlocked, self.anchor_fallbacks
        )
    }
}

/// Runs a session until `options.rooms` rooms have been cleared.
///
/// Spawned enemies are killed once they outlive `options.enemy_lifetime`, and
/// the player walks to every exit as soon as it unlocks.
pub(crate) fn simulate(config: SessionConfig, options: &RunOptions) -> Result<Summary> {
    let mut world = demo::world();
    let mut session = Session::new(config, demo::catalog(), demo::boss_catalog())
        .context("invalid session configuration")?;
    let mut summary = Summary::default();
    let mut ages: BTreeMap<EntityRef, Duration> = BTreeMap::new();
    let mut events = Vec::new();

    let _ = session
        .spawn_next_room(&mut world, &mut events)
        .context("failed to spawn the first room")?;

    loop {
        for event in events.drain(..) {
            if let Event::EntitySpawned { handle, .. } = &event {
                let _ = ages.insert(handle.entity(), Duration::ZERO);
            }
            summary.record(&event);
        }

        if session.is_exit_unlocked() {
            if session.total_rooms_spawned() >= options.rooms {
                break;
            }
            if let Some(room) = session.current_room() {
                let position = room.exit();
                world::apply(&mut world, Command::MovePlayer { position }, &mut events);
            }
        }

        if summary.steps >= options.max_steps {
            bail!(
                "run stalled after {} steps in room {} of {}",
                summary.steps,
                session.total_rooms_spawned(),
                options.rooms
            );
        }

        let mut expired = Vec::new();
        for (entity, age) in &mut ages {
            *age += options.dt;
            if *age >= options.enemy_lifetime {
                expired.push(*entity);
            }
        }
        for entity in expired {
            let _ = ages.remove(&entity);
            world::apply(&mut world, Command::KillEntity { entity }, &mut events);
        }

        session.tick(options.dt, &mut world, &mut events);
        summary.steps += 1;
        summary.simulated += options.dt;
    }

    summary.final_difficulty = session.current_difficulty();
    debug!(steps = summary.steps, "run finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(rooms: u64) -> RunOptions {
        RunOptions {
            rooms,
            dt: Duration::from_millis(100),
            enemy_lifetime: Duration::from_millis(800),
            max_steps: 20_000,
        }
    }

    fn seeded(seed: u64) -> SessionConfig {
        SessionConfig {
            seed,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn run_clears_the_requested_rooms() {
        let summary = simulate(seeded(3), &options(6)).expect("run completes");

        assert_eq!(summary.rooms_spawned, 6);
        assert_eq!(summary.final_difficulty, 6);
        assert_eq!(summary.exits_unlocked, 6);
        assert!(summary.boss_rooms >= 1);
        assert!(summary.entities_spawned > 0);
        assert_eq!(summary.anchor_fallbacks, 0);
    }

    #[test]
    fn identical_seeds_reproduce_the_run() {
        let first = simulate(seeded(11), &options(5)).expect("first run");
        let second = simulate(seeded(11), &options(5)).expect("second run");
        assert_eq!(first, second);
    }

    #[test]
    fn exhausted_step_budget_is_reported() {
        let options = RunOptions {
            max_steps: 3,
            ..options(4)
        };
        let error = simulate(seeded(1), &options).expect_err("budget too small");
        assert!(error.to_string().contains("stalled"));
    }
}
