#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave orchestration system coordinating every wave zone of the current room.
//!
//! The orchestrator owns the zones of one room at a time. It decides when
//! zones may start according to the progression mode and the concurrency
//! gate, advances every zone on each tick, and executes the room's completion
//! action exactly once after every zone has been cleared.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
    time::Duration,
};

use gauntlet_core::{
    count_down, duration_secs, CompletionAction, ConfigError, EntityFactory, Event, RoomId,
    RoomInstance, RoomView, SpawnHost, SpawnedEntityHandle, StatMultipliers, TriggerOutcome, Vec3,
    WaveId, WaveState,
};
use gauntlet_system_spawning::EnemySpawner;
use serde::Deserialize;
use tracing::{debug, info, warn};

mod zone;

pub use zone::{wave_difficulty, WaveZone};

/// Rule that decides how the zones of a room are started.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionMode {
    /// Zones trigger themselves when the player dwells inside them.
    #[default]
    PlayerTriggered,
    /// Zones start one after another in identifier order once the previous one clears.
    Sequential,
    /// Zones start on a fixed interval regardless of whether earlier waves cleared.
    Timed,
    /// Player triggering combined with orchestrator fires chosen by a [`MixedPolicy`].
    Mixed,
}

/// Configuration of the wave orchestrator.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    mode: ProgressionMode,
    max_concurrent_waves: u32,
    require_previous_cleared: bool,
    #[serde(with = "duration_secs")]
    initial_delay: Duration,
    #[serde(with = "duration_secs")]
    time_between_waves: Duration,
    #[serde(with = "duration_secs")]
    timed_interval: Duration,
    #[serde(with = "duration_secs")]
    completion_delay: Duration,
    completion_action: CompletionAction,
}

impl Config {
    /// Creates a configuration for `mode` allowing `max_concurrent_waves` running waves.
    #[must_use]
    pub const fn new(mode: ProgressionMode, max_concurrent_waves: u32) -> Self {
        Self {
            mode,
            max_concurrent_waves,
            require_previous_cleared: false,
            initial_delay: Duration::from_secs(1),
            time_between_waves: Duration::from_secs(2),
            timed_interval: Duration::from_secs(10),
            completion_delay: Duration::from_millis(500),
            completion_action: CompletionAction::OpenExit,
        }
    }

    /// Requires zone `id - 1` to be cleared before zone `id` may start.
    #[must_use]
    pub const fn with_require_previous_cleared(mut self, required: bool) -> Self {
        self.require_previous_cleared = required;
        self
    }

    /// Sets the delay before the first orchestrated fire.
    #[must_use]
    pub const fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the pause between a clear and the next orchestrated fire.
    #[must_use]
    pub const fn with_time_between_waves(mut self, delay: Duration) -> Self {
        self.time_between_waves = delay;
        self
    }

    /// Sets the interval of timed fires.
    #[must_use]
    pub const fn with_timed_interval(mut self, interval: Duration) -> Self {
        self.timed_interval = interval;
        self
    }

    /// Sets the delay between the last clear and the completion action.
    #[must_use]
    pub const fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    /// Sets the action executed once every zone has cleared.
    #[must_use]
    pub fn with_completion_action(mut self, action: CompletionAction) -> Self {
        self.completion_action = action;
        self
    }

    /// Progression mode.
    #[must_use]
    pub const fn mode(&self) -> ProgressionMode {
        self.mode
    }

    /// Pause between a clear and the next orchestrated fire.
    #[must_use]
    pub const fn time_between_waves(&self) -> Duration {
        self.time_between_waves
    }

    /// Action executed once every zone has cleared.
    #[must_use]
    pub fn completion_action(&self) -> &CompletionAction {
        &self.completion_action
    }

    /// Rejects configurations that could never start a wave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_waves == 0 {
            return Err(ConfigError::ZeroConcurrentWaves);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(ProgressionMode::PlayerTriggered, 1)
    }
}

/// Policy consulted by [`ProgressionMode::Mixed`].
pub trait MixedPolicy: fmt::Debug {
    /// Whether zones trigger themselves when the player enters them.
    fn zones_self_trigger(&self) -> bool {
        true
    }

    /// Delay before the orchestrator fires the first idle zone, if it should.
    fn initial_fire(&self, _config: &Config) -> Option<Duration> {
        None
    }

    /// Delay before the orchestrator fires the next idle zone after `cleared` clears.
    fn after_clear(&self, cleared: WaveId, config: &Config) -> Option<Duration>;
}

/// Keeps player triggering and chains the next idle zone after every clear.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChainAfterClear;

impl MixedPolicy for ChainAfterClear {
    fn after_clear(&self, _cleared: WaveId, config: &Config) -> Option<Duration> {
        Some(config.time_between_waves())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    Pending,
    Waiting(Duration),
    Done,
}

/// Coordinates the wave zones of the current room.
#[derive(Debug)]
pub struct WaveOrchestrator {
    config: Config,
    policy: Box<dyn MixedPolicy>,
    zones: BTreeMap<WaveId, WaveZone>,
    room: Option<RoomId>,
    room_center: Vec3,
    difficulty: u32,
    scheduled: Option<Duration>,
    timed: Option<Duration>,
    completion: Completion,
}

impl WaveOrchestrator {
    /// Creates an orchestrator that uses [`ChainAfterClear`] in mixed mode.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_policy(config, Box::new(ChainAfterClear))
    }

    /// Creates an orchestrator with a custom mixed mode policy.
    #[must_use]
    pub fn with_policy(config: Config, policy: Box<dyn MixedPolicy>) -> Self {
        Self {
            config,
            policy,
            zones: BTreeMap::new(),
            room: None,
            room_center: Vec3::ZERO,
            difficulty: 1,
            scheduled: None,
            timed: None,
            completion: Completion::Pending,
        }
    }

    /// Consumes room events and takes over the zones of newly spawned rooms.
    pub fn handle(&mut self, events: &[Event], rooms: RoomView<'_>) {
        for event in events {
            if let Event::RoomSpawned { room, .. } = event {
                match rooms.get(*room) {
                    Some(instance) => self.register_room(instance),
                    None => self.clear(),
                }
            }
        }
    }

    /// Replaces the registered zones with those of `room`.
    ///
    /// Entities spawned by the previous room's zones are left to the host;
    /// callers that must reach them later take them with [`Self::release_handles`] first.
    /// When several layouts share an id only the first is registered.
    pub fn register_room(&mut self, room: &RoomInstance) {
        self.clear();
        if room.wave_zones().is_empty() {
            return;
        }

        let self_trigger = self.zones_self_trigger();
        for layout in room.wave_zones() {
            match self.zones.entry(layout.id) {
                Entry::Vacant(slot) => {
                    let zone = WaveZone::from_layout(layout, room.origin(), self_trigger);
                    let _ = slot.insert(zone);
                }
                Entry::Occupied(_) => warn!(
                    room = room.id().get(),
                    wave = layout.id.get(),
                    name = %layout.name,
                    "duplicate wave zone id ignored"
                ),
            }
        }
        self.room = Some(room.id());
        self.room_center = room.bounds().center();
        self.difficulty = room.difficulty();
        self.arm_schedule();
        info!(
            room = room.id().get(),
            zones = self.zones.len(),
            mode = ?self.config.mode,
            "wave zones registered"
        );
    }

    /// Advances the schedule, every zone and the completion countdown by `dt`.
    pub fn tick<H>(
        &mut self,
        dt: Duration,
        spawner: &mut EnemySpawner,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: SpawnHost + ?Sized,
    {
        if self.zones.is_empty() {
            return;
        }

        self.advance_schedule(dt);

        let first_event = out.len();
        let ids: Vec<WaveId> = self.zones.keys().copied().collect();
        for id in ids {
            let gate_open = self.can_trigger(id);
            let difficulty = self.difficulty;
            if let Some(zone) = self.zones.get_mut(&id) {
                zone.tick(dt, gate_open, difficulty, spawner, host, out);
            }
        }

        let cleared: Vec<WaveId> = out[first_event..]
            .iter()
            .filter_map(|event| match event {
                Event::WaveCleared { wave } => Some(*wave),
                _ => None,
            })
            .collect();
        for wave in cleared {
            self.schedule_after_clear(wave);
        }

        self.advance_completion(dt, host, out);
    }

    /// Reports whether a new wave may start in zone `id`.
    #[must_use]
    pub fn can_trigger(&self, id: WaveId) -> bool {
        if self.active_wave_count() >= self.config.max_concurrent_waves as usize {
            return false;
        }
        if !self.config.require_previous_cleared {
            return true;
        }
        id.previous()
            .and_then(|previous| self.zones.get(&previous))
            .map_or(true, |previous| previous.state() == WaveState::Cleared)
    }

    /// Requests that zone `id` starts its trigger sequence.
    ///
    /// Rejections leave every zone untouched.
    pub fn trigger_wave(&mut self, id: WaveId) -> TriggerOutcome {
        let Some(zone) = self.zones.get(&id) else {
            return TriggerOutcome::UnknownWave;
        };
        if !zone.accepts_trigger() {
            return TriggerOutcome::AlreadyTriggered;
        }
        if !self.can_trigger(id) {
            debug!(wave = id.get(), "wave trigger rejected by concurrency gate");
            return TriggerOutcome::InvalidConcurrency;
        }

        self.zones
            .get_mut(&id)
            .map_or(TriggerOutcome::UnknownWave, WaveZone::request_trigger)
    }

    /// Starts zone `id` immediately, bypassing trigger-once and the concurrency gate.
    pub fn force_trigger(&mut self, id: WaveId, out: &mut Vec<Event>) -> TriggerOutcome {
        let difficulty = self.difficulty;
        match self.zones.get_mut(&id) {
            Some(zone) => zone.force_trigger(difficulty, out),
            None => TriggerOutcome::UnknownWave,
        }
    }

    /// Stops tracking the entities spawned by every zone and hands their handles to the caller.
    ///
    /// Zones still waiting on those entities see them as gone on their next tick.
    pub fn release_handles(&mut self) -> Vec<SpawnedEntityHandle> {
        self.zones
            .values_mut()
            .flat_map(WaveZone::release_handles)
            .collect()
    }

    /// Returns zone `id` to idle, destroying the entities it still tracks.
    pub fn reset_wave<H>(&mut self, id: WaveId, host: &mut H) -> bool
    where
        H: EntityFactory + ?Sized,
    {
        match self.zones.get_mut(&id) {
            Some(zone) => {
                zone.reset(host);
                debug!(wave = id.get(), "wave reset");
                true
            }
            None => false,
        }
    }

    /// Returns every zone to idle and rearms the schedule and the completion action.
    pub fn reset_all_waves<H>(&mut self, host: &mut H)
    where
        H: EntityFactory + ?Sized,
    {
        for zone in self.zones.values_mut() {
            zone.reset(host);
        }
        self.completion = Completion::Pending;
        self.arm_schedule();
        debug!(zones = self.zones.len(), "all waves reset");
    }

    /// Reports whether at least one zone is registered and every zone is cleared.
    #[must_use]
    pub fn all_cleared(&self) -> bool {
        !self.zones.is_empty()
            && self
                .zones
                .values()
                .all(|zone| zone.state() == WaveState::Cleared)
    }

    /// Number of zones that count toward the concurrency limit.
    #[must_use]
    pub fn active_wave_count(&self) -> usize {
        self.zones
            .values()
            .filter(|zone| zone.state().is_active())
            .count()
    }

    /// Number of cleared zones.
    #[must_use]
    pub fn cleared_wave_count(&self) -> usize {
        self.zones
            .values()
            .filter(|zone| zone.state() == WaveState::Cleared)
            .count()
    }

    /// Number of registered zones.
    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// State of zone `id`, if registered.
    #[must_use]
    pub fn zone_state(&self, id: WaveId) -> Option<WaveState> {
        self.zones.get(&id).map(WaveZone::state)
    }

    /// Zone `id`, if registered.
    #[must_use]
    pub fn zone(&self, id: WaveId) -> Option<&WaveZone> {
        self.zones.get(&id)
    }

    /// Entities tracked by every zone, as of each zone's last prune.
    #[must_use]
    pub fn live_enemy_count(&self) -> usize {
        self.zones.values().map(|zone| zone.handles().len()).sum()
    }

    /// Room whose zones are registered.
    #[must_use]
    pub const fn room(&self) -> Option<RoomId> {
        self.room
    }

    /// Configuration the orchestrator was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Reports whether the completion action already ran for the current room.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completion == Completion::Done
    }

    fn clear(&mut self) {
        self.zones.clear();
        self.room = None;
        self.scheduled = None;
        self.timed = None;
        self.completion = Completion::Pending;
    }

    fn zones_self_trigger(&self) -> bool {
        match self.config.mode {
            ProgressionMode::PlayerTriggered => true,
            ProgressionMode::Sequential | ProgressionMode::Timed => false,
            ProgressionMode::Mixed => self.policy.zones_self_trigger(),
        }
    }

    fn arm_schedule(&mut self) {
        self.scheduled = None;
        self.timed = None;
        match self.config.mode {
            ProgressionMode::PlayerTriggered => {}
            ProgressionMode::Sequential => self.scheduled = Some(self.config.initial_delay),
            ProgressionMode::Timed => self.timed = Some(self.config.initial_delay),
            ProgressionMode::Mixed => self.scheduled = self.policy.initial_fire(&self.config),
        }
    }

    fn schedule_after_clear(&mut self, cleared: WaveId) {
        let delay = match self.config.mode {
            ProgressionMode::Sequential => Some(self.config.time_between_waves),
            ProgressionMode::Mixed => self.policy.after_clear(cleared, &self.config),
            ProgressionMode::PlayerTriggered | ProgressionMode::Timed => None,
        };
        if delay.is_some() && self.next_idle().is_some() {
            self.scheduled = delay;
        }
    }

    fn advance_schedule(&mut self, dt: Duration) {
        if let Some(mut remaining) = self.scheduled {
            if count_down(&mut remaining, dt) {
                self.scheduled = match self.fire_next_idle() {
                    FireOutcome::Fired | FireOutcome::Exhausted => None,
                    FireOutcome::Gated => Some(Duration::ZERO),
                };
            } else {
                self.scheduled = Some(remaining);
            }
        }

        if let Some(mut remaining) = self.timed {
            if count_down(&mut remaining, dt) {
                self.timed = match self.fire_next_idle() {
                    FireOutcome::Fired => Some(self.config.timed_interval),
                    FireOutcome::Gated => Some(Duration::ZERO),
                    FireOutcome::Exhausted => None,
                };
            } else {
                self.timed = Some(remaining);
            }
        }
    }

    fn next_idle(&self) -> Option<WaveId> {
        self.zones
            .values()
            .find(|zone| zone.state() == WaveState::Idle && !zone.has_triggered())
            .map(WaveZone::id)
    }

    fn fire_next_idle(&mut self) -> FireOutcome {
        let Some(id) = self.next_idle() else {
            return FireOutcome::Exhausted;
        };
        match self.trigger_wave(id) {
            TriggerOutcome::Accepted => {
                debug!(wave = id.get(), "orchestrated wave fire");
                FireOutcome::Fired
            }
            TriggerOutcome::InvalidConcurrency => FireOutcome::Gated,
            TriggerOutcome::AlreadyTriggered | TriggerOutcome::UnknownWave => {
                FireOutcome::Exhausted
            }
        }
    }

    fn advance_completion<H>(&mut self, dt: Duration, host: &mut H, out: &mut Vec<Event>)
    where
        H: SpawnHost + ?Sized,
    {
        let due = match self.completion {
            Completion::Pending => {
                if !self.all_cleared() {
                    return;
                }
                let delay = self.config.completion_delay;
                self.completion = Completion::Waiting(delay);
                delay.is_zero()
            }
            Completion::Waiting(mut remaining) => {
                let due = count_down(&mut remaining, dt);
                self.completion = Completion::Waiting(remaining);
                due
            }
            Completion::Done => false,
        };

        if due {
            self.completion = Completion::Done;
            self.complete(host, out);
        }
    }

    fn complete<H>(&mut self, host: &mut H, out: &mut Vec<Event>)
    where
        H: SpawnHost + ?Sized,
    {
        let action = self.config.completion_action.clone();
        info!(room = ?self.room.map(|room| room.get()), ?action, "all waves completed");
        out.push(Event::AllWavesCompleted {
            action: action.clone(),
        });

        match action {
            CompletionAction::None | CompletionAction::CustomEvent { .. } => {}
            CompletionAction::OpenExit => {
                if let Some(room) = self.room {
                    out.push(Event::ExitUnlocked { room });
                }
            }
            CompletionAction::SpawnReward { prefab } => {
                let position = self.room_center;
                let entity = host.instantiate(prefab, position, StatMultipliers::IDENTITY);
                out.push(Event::RewardSpawned { entity, position });
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FireOutcome {
    Fired,
    Gated,
    Exhausted,
}
