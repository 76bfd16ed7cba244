//! Trigger volume state machine that batches one wave of spawns.

use std::time::Duration;

use gauntlet_core::{
    Aabb, EntityFactory, Event, SpawnHost, SpawnOrigin, SpawnedEntityHandle, TriggerOutcome, Vec3,
    WaveId, WaveState, WaveZoneLayout,
};
use gauntlet_system_spawning::{EnemySpawner, SpawnArea};
use tracing::{debug, info};

/// Runtime state of a single wave zone placed in the world.
#[derive(Clone, Debug)]
pub struct WaveZone {
    id: WaveId,
    name: String,
    trigger_volume: Aabb,
    area: SpawnArea,
    enemy_count: u32,
    wave_multiplier: f32,
    trigger_on_player_enter: bool,
    trigger_once: bool,
    trigger_duration: Duration,
    spawn_delay: Duration,
    spawn_interval: Duration,
    self_trigger: bool,
    state: WaveState,
    dwell: Duration,
    warning: Duration,
    stagger: Duration,
    explicit: bool,
    triggered: bool,
    left_since_clear: bool,
    issued: u32,
    wave_difficulty: u32,
    handles: Vec<SpawnedEntityHandle>,
}

impl WaveZone {
    /// Places a zone layout in a room whose origin lies at `room_origin`.
    ///
    /// Zones with `self_trigger` disabled ignore the player and only start
    /// through explicit requests.
    #[must_use]
    pub fn from_layout(layout: &WaveZoneLayout, room_origin: Vec3, self_trigger: bool) -> Self {
        let trigger_volume = layout.trigger_volume.translated(room_origin);
        let spawn_bounds = layout
            .spawn_bounds
            .map_or(trigger_volume, |bounds| bounds.translated(room_origin));
        let area = SpawnArea::new(Some(spawn_bounds)).with_spawn_points(
            layout
                .spawn_points
                .iter()
                .map(|point| *point + room_origin),
        );

        Self {
            id: layout.id,
            name: layout.name.clone(),
            trigger_volume,
            area,
            enemy_count: layout.enemy_count,
            wave_multiplier: layout.wave_multiplier,
            trigger_on_player_enter: layout.trigger_on_player_enter,
            trigger_once: layout.trigger_once,
            trigger_duration: layout.trigger_duration,
            spawn_delay: layout.spawn_delay,
            spawn_interval: layout.spawn_interval,
            self_trigger,
            state: WaveState::Idle,
            dwell: Duration::ZERO,
            warning: Duration::ZERO,
            stagger: Duration::ZERO,
            explicit: false,
            triggered: false,
            left_since_clear: false,
            issued: 0,
            wave_difficulty: 0,
            handles: Vec::new(),
        }
    }

    /// Identifier of the zone.
    #[must_use]
    pub const fn id(&self) -> WaveId {
        self.id
    }

    /// Human-readable name of the zone.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state of the zone.
    #[must_use]
    pub const fn state(&self) -> WaveState {
        self.state
    }

    /// World-space volume the player must dwell in.
    #[must_use]
    pub const fn trigger_volume(&self) -> Aabb {
        self.trigger_volume
    }

    /// Reports whether the zone committed to a wave since it was created or reset.
    #[must_use]
    pub const fn has_triggered(&self) -> bool {
        self.triggered
    }

    /// Number of spawn requests issued by the current wave.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.issued
    }

    /// Difficulty the current wave spawns at.
    #[must_use]
    pub const fn wave_difficulty(&self) -> u32 {
        self.wave_difficulty
    }

    /// Handles of entities spawned by the current wave, as of the last prune.
    #[must_use]
    pub fn handles(&self) -> &[SpawnedEntityHandle] {
        &self.handles
    }

    /// Reports whether an explicit trigger request would be accepted, ignoring gating.
    #[must_use]
    pub fn accepts_trigger(&self) -> bool {
        match self.state {
            WaveState::Idle => !(self.trigger_once && self.triggered),
            WaveState::Cleared => !self.trigger_once,
            _ => false,
        }
    }

    pub(crate) fn request_trigger(&mut self) -> TriggerOutcome {
        if !self.accepts_trigger() {
            return TriggerOutcome::AlreadyTriggered;
        }

        self.begin_triggering(true);
        TriggerOutcome::Accepted
    }

    pub(crate) fn force_trigger(&mut self, difficulty: u32, out: &mut Vec<Event>) -> TriggerOutcome {
        match self.state {
            WaveState::Warning | WaveState::Spawning | WaveState::Active => {
                TriggerOutcome::AlreadyTriggered
            }
            WaveState::Idle | WaveState::Triggering | WaveState::Cleared => {
                self.commit(difficulty, out);
                TriggerOutcome::Accepted
            }
        }
    }

    /// Advances the state machine by `dt`.
    ///
    /// `gate_open` reports whether the orchestrator would accept a new wave and
    /// only affects self-triggering. Several transitions may happen within one
    /// tick; time consumed by one transition is not available to the next.
    pub(crate) fn tick<H>(
        &mut self,
        dt: Duration,
        gate_open: bool,
        difficulty: u32,
        spawner: &mut EnemySpawner,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: SpawnHost + ?Sized,
    {
        let inside = host
            .player_position()
            .map_or(false, |position| self.trigger_volume.contains(position));
        let mut budget = dt;
        let mut armed = gate_open;

        loop {
            match self.state {
                WaveState::Idle => {
                    if !(armed && self.wants_self_trigger(inside)) {
                        break;
                    }
                    armed = false;
                    self.begin_triggering(false);
                }
                WaveState::Triggering => {
                    if self.explicit {
                        self.commit(difficulty, out);
                        continue;
                    }
                    if !inside {
                        debug!(wave = self.id.get(), "player left trigger volume");
                        self.state = WaveState::Idle;
                        self.dwell = Duration::ZERO;
                        break;
                    }
                    self.dwell += budget;
                    budget = Duration::ZERO;
                    if self.dwell < self.trigger_duration {
                        break;
                    }
                    self.commit(difficulty, out);
                }
                WaveState::Warning => {
                    if self.warning > budget {
                        self.warning -= budget;
                        break;
                    }
                    budget -= self.warning;
                    self.warning = Duration::ZERO;
                    self.stagger = Duration::ZERO;
                    self.state = WaveState::Spawning;
                    debug!(wave = self.id.get(), "wave warning elapsed");
                    out.push(Event::WaveWarningElapsed { wave: self.id });
                }
                WaveState::Spawning => {
                    while self.issued < self.enemy_count {
                        if self.stagger > budget {
                            self.stagger -= budget;
                            budget = Duration::ZERO;
                            break;
                        }
                        budget -= self.stagger;
                        self.spawn_one(spawner, host, out);
                        self.stagger = self.spawn_interval;
                    }
                    if self.issued < self.enemy_count {
                        break;
                    }
                    self.state = WaveState::Active;
                    debug!(
                        wave = self.id.get(),
                        live = self.handles.len(),
                        "wave finished spawning"
                    );
                    out.push(Event::WaveCompleted { wave: self.id });
                }
                WaveState::Active => {
                    self.prune(host);
                    if !self.handles.is_empty() {
                        break;
                    }
                    self.state = WaveState::Cleared;
                    self.left_since_clear = false;
                    info!(wave = self.id.get(), name = %self.name, "wave cleared");
                    out.push(Event::WaveCleared { wave: self.id });
                    break;
                }
                WaveState::Cleared => {
                    if !inside {
                        self.left_since_clear = true;
                    }
                    if !(armed && self.left_since_clear && self.wants_self_trigger(inside)) {
                        break;
                    }
                    armed = false;
                    self.begin_triggering(false);
                }
            }
        }
    }

    pub(crate) fn release_handles(&mut self) -> Vec<SpawnedEntityHandle> {
        std::mem::take(&mut self.handles)
    }

    /// Returns the zone to `Idle`, destroying every entity it still tracks.
    pub(crate) fn reset<H>(&mut self, host: &mut H)
    where
        H: EntityFactory + ?Sized,
    {
        for handle in self.handles.drain(..) {
            host.destroy(handle.entity());
        }
        self.state = WaveState::Idle;
        self.dwell = Duration::ZERO;
        self.warning = Duration::ZERO;
        self.stagger = Duration::ZERO;
        self.explicit = false;
        self.triggered = false;
        self.left_since_clear = false;
        self.issued = 0;
        self.wave_difficulty = 0;
    }

    fn wants_self_trigger(&self, inside: bool) -> bool {
        self.self_trigger
            && self.trigger_on_player_enter
            && inside
            && !(self.trigger_once && self.triggered)
    }

    fn begin_triggering(&mut self, explicit: bool) {
        self.state = WaveState::Triggering;
        self.dwell = Duration::ZERO;
        self.explicit = explicit;
        debug!(wave = self.id.get(), explicit, "wave triggering");
    }

    fn commit(&mut self, difficulty: u32, out: &mut Vec<Event>) {
        self.state = WaveState::Warning;
        self.warning = self.spawn_delay;
        self.dwell = Duration::ZERO;
        self.explicit = false;
        self.triggered = true;
        self.left_since_clear = false;
        self.issued = 0;
        self.handles.clear();
        self.wave_difficulty = wave_difficulty(difficulty, self.wave_multiplier);
        info!(
            wave = self.id.get(),
            name = %self.name,
            difficulty = self.wave_difficulty,
            "wave triggered"
        );
        out.push(Event::WaveTriggered { wave: self.id });
    }

    fn spawn_one<H>(&mut self, spawner: &mut EnemySpawner, host: &mut H, out: &mut Vec<Event>)
    where
        H: SpawnHost + ?Sized,
    {
        let result = spawner.spawn_unit(
            self.wave_difficulty,
            &self.area,
            SpawnOrigin::Wave(self.id),
            host,
            out,
        );
        if let Ok(handle) = result {
            self.handles.push(handle);
        }
        self.issued += 1;
    }

    fn prune<H>(&mut self, host: &H)
    where
        H: EntityFactory + ?Sized,
    {
        self.handles.retain(|handle| host.is_alive(handle.entity()));
    }
}

/// Difficulty a wave spawns at: the room difficulty scaled by the zone multiplier, at least one.
#[must_use]
pub fn wave_difficulty(difficulty: u32, multiplier: f32) -> u32 {
    let scaled = (difficulty as f32 * multiplier).round();
    if scaled.is_finite() && scaled >= 1.0 {
        scaled.min(u32::MAX as f32) as u32
    } else {
        1
    }
}
