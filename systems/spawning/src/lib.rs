#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy spawning system responsible for placing scaled entities inside rooms.

use gauntlet_core::{
    Aabb, ConfigError, EntityFactory, Event, PrefabId, RoomInstance, RoomKind, RoomView,
    ScalingFactors, SpawnError, SpawnHost, SpawnOrigin, SpawnedEntityHandle, Vec3,
};
use gauntlet_system_encounters::EncounterSelector;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use tracing::{debug, warn};

const BOSS_MINION_CAP: u32 = 2;
const BOSS_MINION_DIVISOR: u32 = 3;
const BOSS_MINION_MIN_DIFFICULTY: u32 = 3;

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    max_attempts: u32,
    obstacle_check_radius: f32,
    min_distance_from_player: f32,
    health_scaling: f32,
    damage_scaling: f32,
    origin: Vec3,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration with the provided placement rules and no stat scaling.
    #[must_use]
    pub const fn new(
        max_attempts: u32,
        obstacle_check_radius: f32,
        min_distance_from_player: f32,
    ) -> Self {
        Self {
            max_attempts,
            obstacle_check_radius,
            min_distance_from_player,
            health_scaling: 0.0,
            damage_scaling: 0.0,
            origin: Vec3::ZERO,
            rng_seed: 0,
        }
    }

    /// Sets the default per-level health and damage growth.
    #[must_use]
    pub const fn with_scaling(mut self, health_scaling: f32, damage_scaling: f32) -> Self {
        self.health_scaling = health_scaling;
        self.damage_scaling = damage_scaling;
        self
    }

    /// Sets the position used when a boss has no better anchor.
    #[must_use]
    pub const fn with_origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the seed of the spawner's random stream.
    #[must_use]
    pub const fn with_seed(mut self, rng_seed: u64) -> Self {
        self.rng_seed = rng_seed;
        self
    }

    /// Rejects negative or non-finite radii and scaling factors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigError::check_non_negative("obstacle_check_radius", self.obstacle_check_radius)?;
        ConfigError::check_non_negative(
            "min_distance_from_player",
            self.min_distance_from_player,
        )?;
        ConfigError::check_non_negative("health_scaling", self.health_scaling)?;
        ConfigError::check_non_negative("damage_scaling", self.damage_scaling)
    }

    fn scaling(&self) -> ScalingFactors {
        ScalingFactors::new(self.health_scaling, self.damage_scaling)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(10, 1.0, 5.0).with_scaling(0.2, 0.1)
    }
}

/// Region a batch of entities may be placed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpawnArea {
    bounds: Option<Aabb>,
    spawn_points: Vec<Vec3>,
    boss_anchor: Option<Vec3>,
}

impl SpawnArea {
    /// Creates an area that draws random candidates from `bounds`.
    #[must_use]
    pub fn new(bounds: Option<Aabb>) -> Self {
        Self {
            bounds,
            spawn_points: Vec::new(),
            boss_anchor: None,
        }
    }

    /// Captures the bounds, spawn points and boss anchor of a room.
    #[must_use]
    pub fn from_room(room: &RoomInstance) -> Self {
        Self {
            bounds: Some(room.bounds()),
            spawn_points: room.spawn_points().to_vec(),
            boss_anchor: room.boss_anchor(),
        }
    }

    /// Adds predefined spawn points tried before random candidates.
    #[must_use]
    pub fn with_spawn_points(mut self, points: impl IntoIterator<Item = Vec3>) -> Self {
        self.spawn_points.extend(points);
        self
    }

    /// Designates the boss spawn position.
    #[must_use]
    pub fn with_boss_anchor(mut self, anchor: Vec3) -> Self {
        self.boss_anchor = Some(anchor);
        self
    }

    /// Bounds random candidates are drawn from.
    #[must_use]
    pub const fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }
}

/// Counts produced by a room population batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpawnReport {
    /// Units that were instantiated.
    pub spawned: u32,
    /// Units that were skipped.
    pub skipped: u32,
}

impl SpawnReport {
    fn record(&mut self, result: &Result<SpawnedEntityHandle, SpawnError>) {
        match result {
            Ok(_) => self.spawned += 1,
            Err(_) => self.skipped += 1,
        }
    }
}

/// System that selects, places and instantiates enemies.
#[derive(Debug)]
pub struct EnemySpawner {
    config: Config,
    encounters: EncounterSelector,
    bosses: EncounterSelector,
    rng: ChaCha8Rng,
    registry: Vec<SpawnedEntityHandle>,
}

impl EnemySpawner {
    /// Creates a spawner drawing regular units from `encounters` and bosses from `bosses`.
    #[must_use]
    pub fn new(config: Config, encounters: EncounterSelector, bosses: EncounterSelector) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            config,
            encounters,
            bosses,
            registry: Vec::new(),
        }
    }

    /// Consumes room events and populates new rooms.
    ///
    /// Normal rooms with wave zones are left to their zones. Boss rooms always
    /// receive their boss and minions, zones or not.
    pub fn handle<H>(
        &mut self,
        events: &[Event],
        rooms: RoomView<'_>,
        host: &mut H,
        out: &mut Vec<Event>,
    ) where
        H: SpawnHost + ?Sized,
    {
        for event in events {
            let Event::RoomSpawned {
                room,
                kind,
                difficulty,
            } = event
            else {
                continue;
            };
            let Some(instance) = rooms.get(*room) else {
                continue;
            };
            if *kind == RoomKind::Normal && !instance.wave_zones().is_empty() {
                self.clear_registry();
                continue;
            }

            let area = SpawnArea::from_room(instance);
            let report = self.spawn_for_room(
                *kind,
                *difficulty,
                &area,
                SpawnOrigin::Room(*room),
                host,
                out,
            );
            debug!(
                room = room.get(),
                spawned = report.spawned,
                skipped = report.skipped,
                "room populated"
            );
        }
    }

    /// Replaces the registry with a fresh population for a room.
    pub fn spawn_for_room<H>(
        &mut self,
        kind: RoomKind,
        difficulty: u32,
        area: &SpawnArea,
        origin: SpawnOrigin,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> SpawnReport
    where
        H: SpawnHost + ?Sized,
    {
        self.clear_registry();
        let mut report = SpawnReport::default();

        let count = match kind {
            RoomKind::Normal => self.encounters.calculate_count(difficulty),
            RoomKind::Boss => {
                let result = self.spawn_boss(difficulty, area, origin, host, out);
                report.record(&result);
                if let Ok(handle) = result {
                    self.registry.push(handle);
                }
                boss_minion_count(difficulty)
            }
        };

        for _ in 0..count {
            let result = self.spawn_unit(difficulty, area, origin, host, out);
            report.record(&result);
            if let Ok(handle) = result {
                self.registry.push(handle);
            }
        }

        report
    }

    /// Selects, places and instantiates one regular unit without registering it.
    ///
    /// Emits [`Event::EntitySpawned`] on success and [`Event::SpawnSkipped`] on failure.
    pub fn spawn_unit<H>(
        &mut self,
        difficulty: u32,
        area: &SpawnArea,
        origin: SpawnOrigin,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<SpawnedEntityHandle, SpawnError>
    where
        H: SpawnHost + ?Sized,
    {
        let Some(chosen) = pick(&self.encounters, difficulty, &mut self.rng) else {
            return Err(skip(origin, SpawnError::MissingTemplate { difficulty }, out));
        };

        let position = match self.resolve_position(area, host) {
            Ok(position) => position,
            Err(error) => return Err(skip(origin, error, out)),
        };

        Ok(self.instantiate(chosen, difficulty, position, origin, host, out))
    }

    /// Reports whether an entity may be placed at `position`.
    #[must_use]
    pub fn is_valid_position<H>(&self, position: Vec3, host: &H) -> bool
    where
        H: SpawnHost + ?Sized,
    {
        if host.overlaps_obstacle(position, self.config.obstacle_check_radius) {
            return false;
        }

        host.player_position().map_or(true, |player| {
            player.distance(position) >= self.config.min_distance_from_player
        })
    }

    /// Drops registry handles whose entities no longer exist and returns how many were dropped.
    pub fn prune<H>(&mut self, host: &H) -> usize
    where
        H: EntityFactory + ?Sized,
    {
        let before = self.registry.len();
        self.registry.retain(|handle| host.is_alive(handle.entity()));
        before - self.registry.len()
    }

    /// Destroys every tracked entity and empties the registry.
    pub fn despawn_all<H>(&mut self, host: &mut H)
    where
        H: EntityFactory + ?Sized,
    {
        for handle in self.registry.drain(..) {
            host.destroy(handle.entity());
        }
    }

    /// Forgets every tracked handle without destroying the entities.
    pub fn clear_registry(&mut self) {
        self.registry.clear();
    }

    /// Stops tracking every registered entity and hands the handles to the caller.
    pub fn release_registry(&mut self) -> Vec<SpawnedEntityHandle> {
        std::mem::take(&mut self.registry)
    }

    /// Handles registered by the most recent room population.
    #[must_use]
    pub fn registry(&self) -> &[SpawnedEntityHandle] {
        &self.registry
    }

    /// Number of tracked handles, as of the last prune.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.registry.len()
    }

    /// Catalog used for regular units.
    #[must_use]
    pub fn encounters(&self) -> &EncounterSelector {
        &self.encounters
    }

    fn spawn_boss<H>(
        &mut self,
        difficulty: u32,
        area: &SpawnArea,
        origin: SpawnOrigin,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> Result<SpawnedEntityHandle, SpawnError>
    where
        H: SpawnHost + ?Sized,
    {
        let Some(chosen) = pick(&self.bosses, difficulty, &mut self.rng) else {
            return Err(skip(origin, SpawnError::MissingTemplate { difficulty }, out));
        };

        let position = area
            .boss_anchor
            .or_else(|| area.bounds.map(|bounds| bounds.center()))
            .unwrap_or(self.config.origin);

        Ok(self.instantiate(chosen, difficulty, position, origin, host, out))
    }

    fn resolve_position<H>(&mut self, area: &SpawnArea, host: &H) -> Result<Vec3, SpawnError>
    where
        H: SpawnHost + ?Sized,
    {
        let valid_points: Vec<Vec3> = area
            .spawn_points
            .iter()
            .copied()
            .filter(|point| self.is_valid_position(*point, host))
            .collect();
        if !valid_points.is_empty() {
            let index = self.rng.gen_range(0..valid_points.len());
            return Ok(valid_points[index]);
        }

        if let Some(bounds) = area.bounds {
            for _ in 0..self.config.max_attempts {
                let candidate = random_point(bounds, &mut self.rng);
                if self.is_valid_position(candidate, host) {
                    return Ok(candidate);
                }
            }
        }

        Err(SpawnError::SpawnPositionUnresolved {
            attempts: if area.bounds.is_some() {
                self.config.max_attempts
            } else {
                0
            },
        })
    }

    fn instantiate<H>(
        &mut self,
        (prefab, scaling): (PrefabId, Option<ScalingFactors>),
        difficulty: u32,
        position: Vec3,
        origin: SpawnOrigin,
        host: &mut H,
        out: &mut Vec<Event>,
    ) -> SpawnedEntityHandle
    where
        H: SpawnHost + ?Sized,
    {
        let multipliers = scaling
            .unwrap_or_else(|| self.config.scaling())
            .multipliers_at(difficulty);
        let entity = host.instantiate(prefab, position, multipliers);
        let handle = SpawnedEntityHandle::new(entity, origin, multipliers);
        debug!(
            entity = entity.get(),
            prefab = prefab.get(),
            difficulty,
            "entity spawned"
        );
        out.push(Event::EntitySpawned { handle, position });
        handle
    }
}

/// Number of minions that accompany a boss at the provided difficulty.
#[must_use]
pub fn boss_minion_count(difficulty: u32) -> u32 {
    if difficulty < BOSS_MINION_MIN_DIFFICULTY {
        0
    } else {
        BOSS_MINION_CAP.min(difficulty / BOSS_MINION_DIVISOR)
    }
}

fn pick(
    selector: &EncounterSelector,
    difficulty: u32,
    rng: &mut ChaCha8Rng,
) -> Option<(PrefabId, Option<ScalingFactors>)> {
    selector
        .weighted_pick(difficulty, rng)
        .and_then(|entry| entry.template.map(|prefab| (prefab, entry.scaling)))
}

fn skip(origin: SpawnOrigin, reason: SpawnError, out: &mut Vec<Event>) -> SpawnError {
    warn!(?origin, %reason, "spawn unit skipped");
    out.push(Event::SpawnSkipped { origin, reason });
    reason
}

fn random_point(bounds: Aabb, rng: &mut ChaCha8Rng) -> Vec3 {
    let min = bounds.min();
    let max = bounds.max();
    let x = min.x + (max.x - min.x) * rng.gen::<f32>();
    let z = min.z + (max.z - min.z) * rng.gen::<f32>();
    Vec3::new(x, min.y, z)
}
