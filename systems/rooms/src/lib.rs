#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Room orchestration system that chains rooms end to end.
//!
//! The orchestrator owns the active room window, the global difficulty counter
//! and the boss cadence. Every successful [`RoomOrchestrator::spawn_next`]
//! mutates the window first, then the counters, relocates the player and
//! finally broadcasts [`Event::RoomSpawned`] so room-scoped systems can
//! populate the new room.

use std::collections::VecDeque;

use gauntlet_core::{
    ConfigError, Event, GameHost, RoomError, RoomId, RoomInstance, RoomKind, RoomTemplate,
    RoomTemplateProvider, RoomView, StatMultipliers, Vec3,
};
use gauntlet_system_placement::SpawnPositionResolver;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Configuration parameters required to construct the room orchestrator.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    max_active_rooms: usize,
    boss_every: u32,
    start_position: Vec3,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration keeping `max_active_rooms` rooms alive and
    /// spawning a boss after every `boss_every` normal rooms.
    #[must_use]
    pub const fn new(max_active_rooms: usize, boss_every: u32) -> Self {
        Self {
            max_active_rooms,
            boss_every,
            start_position: Vec3::ZERO,
            rng_seed: 0,
        }
    }

    /// Sets the position of the first room of a session.
    #[must_use]
    pub const fn with_start_position(mut self, start_position: Vec3) -> Self {
        self.start_position = start_position;
        self
    }

    /// Sets the seed of the template selection stream.
    #[must_use]
    pub const fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Capacity of the active room window.
    #[must_use]
    pub const fn max_active_rooms(&self) -> usize {
        self.max_active_rooms
    }

    /// Number of normal rooms between two bosses.
    #[must_use]
    pub const fn boss_every(&self) -> u32 {
        self.boss_every
    }

    /// Rejects a window that could not hold the current room.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_active_rooms == 0 {
            return Err(ConfigError::ZeroActiveRooms);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(3, 4)
    }
}

/// Top-level sequencer of rooms.
#[derive(Debug)]
pub struct RoomOrchestrator {
    config: Config,
    resolver: SpawnPositionResolver,
    window: VecDeque<RoomInstance>,
    difficulty: u32,
    rooms_since_last_boss: u32,
    total_spawned: u64,
    next_id: u64,
    rng: ChaCha8Rng,
}

impl RoomOrchestrator {
    /// Creates an orchestrator with an empty window.
    ///
    /// A window capacity of zero is raised to one so the current room always stays alive.
    #[must_use]
    pub fn new(mut config: Config) -> Self {
        if config.max_active_rooms == 0 {
            warn!("max_active_rooms is zero, keeping the current room alive");
            config.max_active_rooms = 1;
        }
        Self {
            resolver: SpawnPositionResolver::new(config.start_position),
            window: VecDeque::with_capacity(config.max_active_rooms.saturating_add(1)),
            difficulty: 0,
            rooms_since_last_boss: 0,
            total_spawned: 0,
            next_id: 1,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
        }
    }

    /// Spawns the next room after the current one.
    ///
    /// The first room of a session is always a normal room placed at the
    /// start position. Fails without touching any state when the provider
    /// has no template of the chosen kind.
    pub fn spawn_next<H>(&mut self, host: &mut H, out: &mut Vec<Event>) -> Result<RoomId, RoomError>
    where
        H: GameHost + ?Sized,
    {
        let kind = if self.is_next_room_boss(host) {
            RoomKind::Boss
        } else {
            RoomKind::Normal
        };
        let template = choose_template(host.templates(kind), &mut self.rng)
            .cloned()
            .ok_or(RoomError::MissingTemplate { kind })?;

        let previous_exit = self.window.back().map(RoomInstance::exit);
        let placement = self.resolver.place(previous_exit, &template);
        for reason in placement.fallbacks {
            out.push(Event::AnchorFallback {
                template: template.id(),
                reason,
            });
        }

        let difficulty = self.difficulty.saturating_add(1);
        let entity = host.instantiate(
            template.prefab(),
            placement.room.origin,
            StatMultipliers::IDENTITY,
        );
        let id = RoomId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);

        if let Some(current) = self.window.back_mut() {
            current.set_active(false);
        }
        self.window.push_back(RoomInstance::new(
            id,
            &template,
            difficulty,
            placement.room,
            entity,
        ));
        while self.window.len() > self.config.max_active_rooms {
            if let Some(evicted) = self.window.pop_front() {
                host.destroy(evicted.entity());
                debug!(room = evicted.id().get(), "room evicted");
                out.push(Event::RoomEvicted { room: evicted.id() });
            }
        }

        self.difficulty = difficulty;
        self.total_spawned = self.total_spawned.saturating_add(1);
        self.rooms_since_last_boss = match kind {
            RoomKind::Boss => 0,
            RoomKind::Normal => self.rooms_since_last_boss.saturating_add(1),
        };

        host.relocate_player(placement.room.entry);
        out.push(Event::PlayerRelocated {
            position: placement.room.entry,
        });

        info!(
            room = id.get(),
            template = template.id().get(),
            ?kind,
            difficulty,
            "room spawned"
        );
        out.push(Event::RoomSpawned {
            room: id,
            kind,
            difficulty,
        });
        Ok(id)
    }

    /// Destroys every room, restores the counters and spawns a fresh first room.
    pub fn reset_room_system<H>(
        &mut self,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<RoomId, RoomError>
    where
        H: GameHost + ?Sized,
    {
        for room in self.window.drain(..) {
            host.destroy(room.entity());
            out.push(Event::RoomEvicted { room: room.id() });
        }
        self.difficulty = 0;
        self.rooms_since_last_boss = 0;
        self.total_spawned = 0;
        self.rng = ChaCha8Rng::seed_from_u64(self.config.rng_seed);
        info!("room system reset");

        self.spawn_next(host, out)
    }

    /// Difficulty of the most recently spawned room.
    #[must_use]
    pub const fn current_difficulty(&self) -> u32 {
        self.difficulty
    }

    /// Rooms spawned since construction or the last reset.
    #[must_use]
    pub const fn total_rooms_spawned(&self) -> u64 {
        self.total_spawned
    }

    /// Normal rooms spawned since the last boss.
    #[must_use]
    pub const fn rooms_since_last_boss(&self) -> u32 {
        self.rooms_since_last_boss
    }

    /// Kind of the current room, if any room exists.
    #[must_use]
    pub fn current_room_kind(&self) -> Option<RoomKind> {
        self.current_room().map(RoomInstance::kind)
    }

    /// Most recently spawned room.
    #[must_use]
    pub fn current_room(&self) -> Option<&RoomInstance> {
        self.window.back()
    }

    /// Normal rooms left before the boss cadence is due.
    #[must_use]
    pub const fn rooms_until_next_boss(&self) -> u32 {
        self.config.boss_every.saturating_sub(self.rooms_since_last_boss)
    }

    /// Reports whether the next spawn would be a boss room.
    ///
    /// The cadence must be due and `provider` must offer a boss template. The
    /// first room of a session is never a boss.
    #[must_use]
    pub fn is_next_room_boss<P>(&self, provider: &P) -> bool
    where
        P: RoomTemplateProvider + ?Sized,
    {
        !self.window.is_empty()
            && self.rooms_since_last_boss >= self.config.boss_every
            && !provider.templates(RoomKind::Boss).is_empty()
    }

    /// Read-only view over the active window, oldest room first.
    #[must_use]
    pub fn room_view(&self) -> RoomView<'_> {
        RoomView::new(&self.window)
    }

    /// Configuration the orchestrator was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

/// Picks a template by weight, or uniformly when no template has a positive weight.
fn choose_template<'a, R>(templates: &'a [RoomTemplate], rng: &mut R) -> Option<&'a RoomTemplate>
where
    R: Rng + ?Sized,
{
    if templates.is_empty() {
        return None;
    }

    let effective_weight = |template: &RoomTemplate| {
        let weight = template.weight();
        if weight.is_finite() && weight > 0.0 {
            weight
        } else {
            0.0
        }
    };
    let total: f32 = templates.iter().map(effective_weight).sum();
    if !(total > 0.0 && total.is_finite()) {
        return templates.get(rng.gen_range(0..templates.len()));
    }

    let roll = rng.gen::<f32>() * total;
    let mut cumulative = 0.0;
    let mut last_weighted = None;
    for template in templates {
        let weight = effective_weight(template);
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last_weighted = Some(template);
        if cumulative >= roll {
            return Some(template);
        }
    }
    last_weighted
}
