#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Session driver that wires the room, spawning and wave systems together.
//!
//! A [`Session`] owns every orchestration system and forwards the events they
//! produce in a fixed order: room events reach the enemy spawner first and the
//! wave orchestrator second. It also owns the exit lock of the current room,
//! unlocking it once the room's population is defeated, and optionally spawns
//! the next room when the player reaches an unlocked exit. Entities of
//! earlier rooms are no longer tracked for clear checks but stay reachable so
//! a reset tears every one of them down.

use std::time::Duration;

use gauntlet_core::{
    ConfigError, EncounterEntry, EntityRef, Event, GameHost, RoomError, RoomId, RoomInstance,
    RoomKind, RoomTemplateProvider, RoomView, TriggerOutcome, WaveId,
};
use gauntlet_system_encounters::EncounterSelector;
use gauntlet_system_rooms::RoomOrchestrator;
use gauntlet_system_spawning::EnemySpawner;
use gauntlet_system_waves::{MixedPolicy, WaveOrchestrator};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

mod config;

pub use config::SessionConfig;

const ROOM_STREAM: &str = "rooms";
const SPAWN_STREAM: &str = "spawning";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ExitLock {
    room: Option<RoomId>,
    waves_done: bool,
    unlocked: bool,
}

/// Top-level driver of a run through procedurally chained rooms.
#[derive(Debug)]
pub struct Session {
    rooms: RoomOrchestrator,
    spawner: EnemySpawner,
    waves: WaveOrchestrator,
    retired: Vec<EntityRef>,
    exit: ExitLock,
    exit_radius: f32,
    auto_advance: bool,
}

impl Session {
    /// Creates a session drawing regular enemies from `catalog` and bosses from `boss_catalog`.
    pub fn new(
        config: SessionConfig,
        catalog: Vec<EncounterEntry>,
        boss_catalog: Vec<EncounterEntry>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let rooms = config
            .rooms
            .with_seed(derive_labeled_seed(config.seed, ROOM_STREAM));
        let spawning = config
            .spawning
            .with_seed(derive_labeled_seed(config.seed, SPAWN_STREAM));

        Ok(Self {
            rooms: RoomOrchestrator::new(rooms),
            spawner: EnemySpawner::new(
                spawning,
                EncounterSelector::new(catalog, config.encounters),
                EncounterSelector::new(boss_catalog, config.encounters),
            ),
            waves: WaveOrchestrator::new(config.waves),
            retired: Vec::new(),
            exit: ExitLock::default(),
            exit_radius: config.exit_radius,
            auto_advance: config.auto_advance,
        })
    }

    /// Replaces the policy consulted by the mixed progression mode.
    #[must_use]
    pub fn with_mixed_policy(mut self, policy: Box<dyn MixedPolicy>) -> Self {
        self.waves = WaveOrchestrator::with_policy(self.waves.config().clone(), policy);
        self
    }

    /// Spawns the next room and lets the room-scoped systems populate it.
    pub fn spawn_next_room<H>(
        &mut self,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<RoomId, RoomError>
    where
        H: GameHost + ?Sized,
    {
        let first_event = out.len();
        let room = self.rooms.spawn_next(host, out)?;
        self.retire_tracked(&*host);
        self.dispatch(first_event, host, out);
        Ok(room)
    }

    /// Destroys every room and spawned entity, then starts over from the first room.
    pub fn reset_room_system<H>(
        &mut self,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<RoomId, RoomError>
    where
        H: GameHost + ?Sized,
    {
        self.waves.reset_all_waves(host);
        self.spawner.despawn_all(host);
        let retired = self.retired.len();
        for entity in self.retired.drain(..) {
            host.destroy(entity);
        }
        debug!(retired, "untracked entities destroyed");
        self.exit = ExitLock::default();

        let first_event = out.len();
        let room = self.rooms.reset_room_system(host, out)?;
        self.dispatch(first_event, host, out);
        Ok(room)
    }

    /// Advances every time-driven system by `dt`.
    pub fn tick<H>(&mut self, dt: Duration, host: &mut H, out: &mut Vec<Event>)
    where
        H: GameHost + ?Sized,
    {
        let first_event = out.len();
        self.waves.tick(dt, &mut self.spawner, host, out);
        self.update_exit(first_event, host, out);

        if self.auto_advance && self.player_at_exit(host) {
            if let Err(error) = self.spawn_next_room(host, out) {
                warn!(%error, "auto-advance failed");
            }
        }
    }

    /// Requests that wave `id` of the current room starts.
    pub fn trigger_wave(&mut self, id: WaveId) -> TriggerOutcome {
        self.waves.trigger_wave(id)
    }

    /// Starts wave `id` immediately, bypassing trigger-once and gating.
    pub fn force_trigger(&mut self, id: WaveId, out: &mut Vec<Event>) -> TriggerOutcome {
        self.waves.force_trigger(id, out)
    }

    /// Returns wave `id` to idle.
    pub fn reset_wave<H>(&mut self, id: WaveId, host: &mut H) -> bool
    where
        H: GameHost + ?Sized,
    {
        self.waves.reset_wave(id, host)
    }

    /// Returns every wave of the current room to idle.
    pub fn reset_all_waves<H>(&mut self, host: &mut H)
    where
        H: GameHost + ?Sized,
    {
        self.waves.reset_all_waves(host);
    }

    /// Difficulty of the current room.
    #[must_use]
    pub fn current_difficulty(&self) -> u32 {
        self.rooms.current_difficulty()
    }

    /// Rooms spawned since the session started or was reset.
    #[must_use]
    pub fn total_rooms_spawned(&self) -> u64 {
        self.rooms.total_rooms_spawned()
    }

    /// Kind of the current room.
    #[must_use]
    pub fn current_room_kind(&self) -> Option<RoomKind> {
        self.rooms.current_room_kind()
    }

    /// Normal rooms left before the boss cadence is due.
    #[must_use]
    pub fn rooms_until_next_boss(&self) -> u32 {
        self.rooms.rooms_until_next_boss()
    }

    /// Reports whether the next room would be a boss room.
    #[must_use]
    pub fn is_next_room_boss<P>(&self, provider: &P) -> bool
    where
        P: RoomTemplateProvider + ?Sized,
    {
        self.rooms.is_next_room_boss(provider)
    }

    /// Current room, if any.
    #[must_use]
    pub fn current_room(&self) -> Option<&RoomInstance> {
        self.rooms.current_room()
    }

    /// Read-only view over the active room window.
    #[must_use]
    pub fn room_view(&self) -> RoomView<'_> {
        self.rooms.room_view()
    }

    /// Reports whether the exit of the current room is open.
    #[must_use]
    pub const fn is_exit_unlocked(&self) -> bool {
        self.exit.unlocked
    }

    /// Wave orchestrator of the current room.
    #[must_use]
    pub const fn waves(&self) -> &WaveOrchestrator {
        &self.waves
    }

    /// Enemy spawner shared by direct rooms and wave zones.
    #[must_use]
    pub const fn spawner(&self) -> &EnemySpawner {
        &self.spawner
    }

    fn dispatch<H>(&mut self, first_event: usize, host: &mut H, out: &mut Vec<Event>)
    where
        H: GameHost + ?Sized,
    {
        let events: Vec<Event> = out[first_event..].to_vec();
        let view = self.rooms.room_view();
        self.spawner.handle(&events, view, host, out);
        self.waves.handle(&events, view);

        for event in &events {
            if let Event::RoomSpawned { room, .. } = event {
                self.exit = ExitLock {
                    room: Some(*room),
                    waves_done: view
                        .get(*room)
                        .map_or(true, |instance| instance.wave_zones().is_empty()),
                    unlocked: false,
                };
            }
        }
    }

    /// Moves every entity the systems still track into the retired list.
    fn retire_tracked<H>(&mut self, host: &H)
    where
        H: GameHost + ?Sized,
    {
        self.retired.retain(|entity| host.is_alive(*entity));
        let released = self
            .spawner
            .release_registry()
            .into_iter()
            .chain(self.waves.release_handles());
        self.retired.extend(
            released
                .map(|handle| handle.entity())
                .filter(|entity| host.is_alive(*entity)),
        );
    }

    /// Opens the exit once the waves reported completion and the spawner's population is gone.
    ///
    /// The wave orchestrator's own unlock notice is held back until then so
    /// each room reports exactly one [`Event::ExitUnlocked`].
    fn update_exit<H>(&mut self, first_event: usize, host: &mut H, out: &mut Vec<Event>)
    where
        H: GameHost + ?Sized,
    {
        let Some(room) = self.exit.room else {
            return;
        };
        if self.exit.unlocked {
            return;
        }

        let notice = Event::ExitUnlocked { room };
        if out[first_event..].contains(&notice) {
            let tail = out.split_off(first_event);
            out.extend(tail.into_iter().filter(|event| *event != notice));
            self.exit.waves_done = true;
        }
        if !self.exit.waves_done {
            return;
        }

        let _ = self.spawner.prune(host);
        if self.spawner.live_count() > 0 {
            debug!(
                room = room.get(),
                live = self.spawner.live_count(),
                "exit held until the room population is defeated"
            );
            return;
        }

        info!(room = room.get(), "room exit unlocked");
        self.exit.unlocked = true;
        out.push(Event::ExitUnlocked { room });
    }

    fn player_at_exit<H>(&self, host: &H) -> bool
    where
        H: GameHost + ?Sized,
    {
        if !self.exit.unlocked {
            return false;
        }
        match (self.rooms.current_room(), host.player_position()) {
            (Some(room), Some(player)) => player.distance(room.exit()) <= self.exit_radius,
            _ => false,
        }
    }
}

/// Derives an independent stream seed from the master seed.
fn derive_labeled_seed(base: u64, label: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base.to_le_bytes());
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
