#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Gauntlet room and wave orchestration engine.
//!
//! This crate defines the message surface that connects the orchestrating
//! systems with the host simulation. Hosts implement the collaborator traits in
//! [`host`] to expose templates, the player actor, physics queries and entity
//! lifetimes. Systems mutate only the state they own, query the host through
//! those traits and broadcast [`Event`] values describing every observable
//! outcome. Adapters drive the host through [`Command`] values.

use std::{collections::VecDeque, time::Duration};

use serde::{Deserialize, Serialize};

pub mod error;
pub mod host;
pub mod template;

pub use error::{AnchorError, ConfigError, RoomError, SpawnError};
pub use glam::Vec3;
pub use host::{
    ActorLocator, EntityFactory, GameHost, PhysicsQuery, RoomTemplateProvider, SpawnHost,
};
pub use template::{Anchor, RoomTemplate, WaveZoneLayout};

/// Name of the anchor that marks where a room is entered.
pub const ENTRY_ANCHOR: &str = "Entry";
/// Name of the anchor that marks where a room is exited.
pub const EXIT_ANCHOR: &str = "Exit";
/// Name of the optional anchor that designates the boss spawn position.
pub const BOSS_ANCHOR: &str = "BossSpawn";

/// Commands that express all permissible host mutations issued by adapters.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Moves the player-controlled actor to the provided world position.
    MovePlayer {
        /// Destination of the player actor.
        position: Vec3,
    },
    /// Places a spherical obstacle used by spawn validity queries.
    PlaceObstacle {
        /// Centre of the obstacle in world space.
        center: Vec3,
        /// Radius of the obstacle in world units.
        radius: f32,
    },
    /// Destroys a single entity, as combat outside the core would.
    KillEntity {
        /// Entity that should be destroyed.
        entity: EntityRef,
    },
    /// Destroys every entity that is not a room root.
    KillAllEnemies,
}

/// Events broadcast by the orchestrating systems and the host.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A room was created, registered in the active window and is now current.
    RoomSpawned {
        /// Identifier of the new room.
        room: RoomId,
        /// Kind of the new room.
        kind: RoomKind,
        /// Difficulty assigned to the new room.
        difficulty: u32,
    },
    /// The oldest room fell out of the active window and was destroyed.
    RoomEvicted {
        /// Identifier of the evicted room.
        room: RoomId,
    },
    /// Placement fell back to a degraded position because an anchor was missing.
    AnchorFallback {
        /// Template whose anchor could not be resolved.
        template: TemplateId,
        /// Reason the lookup failed.
        reason: AnchorError,
    },
    /// The player actor was moved onto a room's entry anchor.
    PlayerRelocated {
        /// Destination of the relocation.
        position: Vec3,
    },
    /// An entity was instantiated by a spawner.
    EntitySpawned {
        /// Handle registered for the spawned entity.
        handle: SpawnedEntityHandle,
        /// World position the entity was placed at.
        position: Vec3,
    },
    /// A single spawn unit was skipped while the rest of its batch continued.
    SpawnSkipped {
        /// Room or wave that requested the unit.
        origin: SpawnOrigin,
        /// Reason the unit was skipped.
        reason: SpawnError,
    },
    /// The host destroyed an entity.
    EntityDestroyed {
        /// Entity that was destroyed.
        entity: EntityRef,
    },
    /// A wave zone committed to its wave and entered the warning telegraph.
    WaveTriggered {
        /// Zone that triggered.
        wave: WaveId,
    },
    /// A wave zone finished its warning telegraph and began spawning.
    WaveWarningElapsed {
        /// Zone that began spawning.
        wave: WaveId,
    },
    /// A wave zone issued every spawn request of its batch.
    WaveCompleted {
        /// Zone that finished spawning.
        wave: WaveId,
    },
    /// Every entity spawned by a wave zone is gone.
    WaveCleared {
        /// Zone that was cleared.
        wave: WaveId,
    },
    /// Every registered wave zone of the room was cleared and the completion delay elapsed.
    AllWavesCompleted {
        /// Completion action executed for the room.
        action: CompletionAction,
    },
    /// A reward entity was created by the completion action.
    RewardSpawned {
        /// Entity created as the reward.
        entity: EntityRef,
        /// Position of the reward.
        position: Vec3,
    },
    /// The exit of a room was unlocked.
    ExitUnlocked {
        /// Room whose exit opened.
        room: RoomId,
    },
}

/// Distinguishes regular rooms from boss rooms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomKind {
    /// Standard room populated according to its difficulty.
    Normal,
    /// Boss room that appears according to the boss cadence.
    Boss,
}

/// Unique, monotonically increasing identifier assigned to a room instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(u64);

impl RoomId {
    /// Creates a new room identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Identifier of a room blueprint supplied by the template provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(u32);

impl TemplateId {
    /// Creates a new template identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of an instantiable prefab, used for room roots, enemies and rewards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrefabId(u32);

impl PrefabId {
    /// Creates a new prefab identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a wave zone. Zones are ordered by this value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WaveId(u32);

impl WaveId {
    /// Creates a new wave identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Identifier that precedes this one in zone order, if any.
    #[must_use]
    pub const fn previous(&self) -> Option<WaveId> {
        match self.0.checked_sub(1) {
            Some(value) => Some(WaveId(value)),
            None => None,
        }
    }
}

/// Opaque reference to an entity owned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityRef(u64);

impl EntityRef {
    /// Creates a new entity reference with the provided numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the reference.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Axis-aligned box expressed in world or template-local units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners, normalising their component order.
    #[must_use]
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a box centred on `center` extending `half_extents` along each axis.
    #[must_use]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half = half_extents.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Lower corner of the box.
    #[must_use]
    pub const fn min(&self) -> Vec3 {
        self.min
    }

    /// Upper corner of the box.
    #[must_use]
    pub const fn max(&self) -> Vec3 {
        self.max
    }

    /// Geometric centre of the box.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Reports whether the point lies inside the box, boundary included.
    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    /// Returns the box moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// Per-entry overrides for how entity stats scale with difficulty.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScalingFactors {
    /// Health gained per difficulty level above one, as a fraction of base health.
    pub health: f32,
    /// Damage gained per difficulty level above one, as a fraction of base damage.
    pub damage: f32,
}

impl ScalingFactors {
    /// Creates a new set of scaling factors.
    #[must_use]
    pub const fn new(health: f32, damage: f32) -> Self {
        Self { health, damage }
    }

    /// Multipliers produced by these factors at the provided difficulty.
    ///
    /// Difficulty one and below leave stats untouched.
    #[must_use]
    pub fn multipliers_at(&self, difficulty: u32) -> StatMultipliers {
        let steps = difficulty.saturating_sub(1) as f32;
        StatMultipliers::new(1.0 + steps * self.health, 1.0 + steps * self.damage)
    }
}

/// Difficulty scalars attached to a spawned entity.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatMultipliers {
    health: f32,
    damage: f32,
}

impl StatMultipliers {
    /// Multipliers that leave base stats unchanged.
    pub const IDENTITY: Self = Self::new(1.0, 1.0);

    /// Creates a new pair of multipliers.
    #[must_use]
    pub const fn new(health: f32, damage: f32) -> Self {
        Self { health, damage }
    }

    /// Multiplier applied to base health.
    #[must_use]
    pub const fn health(&self) -> f32 {
        self.health
    }

    /// Multiplier applied to base damage.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        self.damage
    }
}

/// Catalog row describing an entity that may be spawned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EncounterEntry {
    /// Prefab to instantiate. Entries without a prefab are never selected.
    pub template: Option<PrefabId>,
    /// Relative selection weight. Negative weights count as zero.
    #[serde(default = "default_weight")]
    pub weight: f32,
    /// Lowest difficulty at which the entry becomes available.
    #[serde(default = "default_min_difficulty")]
    pub min_difficulty: u32,
    /// Optional scaling that replaces the spawner's defaults for this entry.
    #[serde(default)]
    pub scaling: Option<ScalingFactors>,
}

impl EncounterEntry {
    /// Creates an entry for the provided prefab with no scaling override.
    #[must_use]
    pub const fn new(template: PrefabId, weight: f32, min_difficulty: u32) -> Self {
        Self {
            template: Some(template),
            weight,
            min_difficulty,
            scaling: None,
        }
    }

    /// Attaches a scaling override to the entry.
    #[must_use]
    pub fn with_scaling(mut self, scaling: ScalingFactors) -> Self {
        self.scaling = Some(scaling);
        self
    }

    /// Reports whether the entry may be picked at the provided difficulty.
    #[must_use]
    pub fn is_available(&self, difficulty: u32) -> bool {
        self.template.is_some() && self.min_difficulty <= difficulty
    }
}

fn default_weight() -> f32 {
    1.0
}

fn default_min_difficulty() -> u32 {
    1
}

/// Identifies what requested a spawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpawnOrigin {
    /// Direct population of a room by the enemy spawner.
    Room(RoomId),
    /// A wave zone batch.
    Wave(WaveId),
}

/// Registry record describing an entity created by a spawner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnedEntityHandle {
    entity: EntityRef,
    origin: SpawnOrigin,
    multipliers: StatMultipliers,
}

impl SpawnedEntityHandle {
    /// Creates a new handle.
    #[must_use]
    pub const fn new(entity: EntityRef, origin: SpawnOrigin, multipliers: StatMultipliers) -> Self {
        Self {
            entity,
            origin,
            multipliers,
        }
    }

    /// Entity tracked by the handle.
    #[must_use]
    pub const fn entity(&self) -> EntityRef {
        self.entity
    }

    /// Room or wave that requested the entity.
    #[must_use]
    pub const fn origin(&self) -> SpawnOrigin {
        self.origin
    }

    /// Difficulty scalars applied at spawn time.
    #[must_use]
    pub const fn multipliers(&self) -> StatMultipliers {
        self.multipliers
    }
}

/// States of the wave zone state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WaveState {
    /// Waiting for a trigger.
    Idle,
    /// Accumulating dwell time before committing to the wave.
    Triggering,
    /// Telegraphing the wave before spawning begins.
    Warning,
    /// Issuing spawn requests one unit at a time.
    Spawning,
    /// Every unit was issued; waiting for the spawned entities to disappear.
    Active,
    /// Every spawned entity is gone.
    Cleared,
}

impl WaveState {
    /// Reports whether the state counts toward the concurrent wave limit.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(
            self,
            Self::Triggering | Self::Warning | Self::Spawning | Self::Active
        )
    }
}

/// Action executed once every wave of a room has been cleared.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionAction {
    /// Emit the completion event only.
    None,
    /// Unlock the room's exit.
    #[default]
    OpenExit,
    /// Instantiate a reward prefab at the room centre.
    SpawnReward {
        /// Prefab spawned as the reward.
        prefab: PrefabId,
    },
    /// Emit a named event for external consumers.
    CustomEvent {
        /// Name carried by the completion event.
        name: String,
    },
}

/// Result of a wave trigger request.
///
/// Rejections are status values rather than errors: callers may ignore them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerOutcome {
    /// The zone started its trigger sequence.
    Accepted,
    /// The zone was already triggered or is still running.
    AlreadyTriggered,
    /// The concurrency gate rejected the request.
    InvalidConcurrency,
    /// No zone with the requested identifier is registered.
    UnknownWave,
}

impl TriggerOutcome {
    /// Reports whether the request started the zone.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Room placed in the world by the room orchestrator.
#[derive(Clone, Debug, PartialEq)]
pub struct RoomInstance {
    id: RoomId,
    template: TemplateId,
    kind: RoomKind,
    difficulty: u32,
    origin: Vec3,
    entry: Vec3,
    exit: Vec3,
    bounds: Aabb,
    spawn_points: Vec<Vec3>,
    boss_anchor: Option<Vec3>,
    wave_zones: Vec<WaveZoneLayout>,
    entity: EntityRef,
    active: bool,
}

/// Resolved world-space placement of a room.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoomPlacement {
    /// World position of the room's local origin.
    pub origin: Vec3,
    /// World position of the entry anchor.
    pub entry: Vec3,
    /// World position of the exit anchor.
    pub exit: Vec3,
}

impl RoomInstance {
    /// Creates an active room from a template and its resolved placement.
    #[must_use]
    pub fn new(
        id: RoomId,
        template: &RoomTemplate,
        difficulty: u32,
        placement: RoomPlacement,
        entity: EntityRef,
    ) -> Self {
        let origin = placement.origin;
        Self {
            id,
            template: template.id(),
            kind: template.kind(),
            difficulty,
            origin,
            entry: placement.entry,
            exit: placement.exit,
            bounds: template.bounds().translated(origin),
            spawn_points: template
                .spawn_points()
                .iter()
                .map(|point| *point + origin)
                .collect(),
            boss_anchor: template
                .anchors()
                .iter()
                .find(|anchor| anchor.name() == BOSS_ANCHOR)
                .map(|anchor| anchor.offset() + origin),
            wave_zones: template.wave_zones().to_vec(),
            entity,
            active: true,
        }
    }

    /// Identifier of the room.
    #[must_use]
    pub const fn id(&self) -> RoomId {
        self.id
    }

    /// Template the room was built from.
    #[must_use]
    pub const fn template(&self) -> TemplateId {
        self.template
    }

    /// Kind of the room.
    #[must_use]
    pub const fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Difficulty assigned when the room spawned.
    #[must_use]
    pub const fn difficulty(&self) -> u32 {
        self.difficulty
    }

    /// World position of the room's local origin.
    #[must_use]
    pub const fn origin(&self) -> Vec3 {
        self.origin
    }

    /// World position of the entry anchor.
    #[must_use]
    pub const fn entry(&self) -> Vec3 {
        self.entry
    }

    /// World position of the exit anchor.
    #[must_use]
    pub const fn exit(&self) -> Vec3 {
        self.exit
    }

    /// World-space bounds of the room.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// World-space predefined spawn points.
    #[must_use]
    pub fn spawn_points(&self) -> &[Vec3] {
        &self.spawn_points
    }

    /// World-space boss anchor, if the template designates one.
    #[must_use]
    pub const fn boss_anchor(&self) -> Option<Vec3> {
        self.boss_anchor
    }

    /// Wave zone layouts expressed relative to [`RoomInstance::origin`].
    #[must_use]
    pub fn wave_zones(&self) -> &[WaveZoneLayout] {
        &self.wave_zones
    }

    /// Host entity that represents the room root.
    #[must_use]
    pub const fn entity(&self) -> EntityRef {
        self.entity
    }

    /// Reports whether the room is the current room.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Updates the active flag, the only mutable attribute of a room.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }
}

/// Read-only view over the active room window, oldest room first.
#[derive(Clone, Copy, Debug)]
pub struct RoomView<'a> {
    rooms: &'a VecDeque<RoomInstance>,
}

impl<'a> RoomView<'a> {
    /// Captures a view over the provided window.
    #[must_use]
    pub fn new(rooms: &'a VecDeque<RoomInstance>) -> Self {
        Self { rooms }
    }

    /// Looks up a room by identifier.
    #[must_use]
    pub fn get(&self, id: RoomId) -> Option<&'a RoomInstance> {
        self.rooms.iter().find(|room| room.id() == id)
    }

    /// Most recently spawned room.
    #[must_use]
    pub fn current(&self) -> Option<&'a RoomInstance> {
        self.rooms.back()
    }

    /// Number of rooms in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Reports whether the window is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Iterator over the rooms, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &'a RoomInstance> + 'a {
        self.rooms.iter()
    }
}

/// Serde helpers that express [`Duration`] values as fractional seconds.
pub mod duration_secs {
    use std::time::Duration;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serializes a duration as fractional seconds.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(duration.as_secs_f64())
    }

    /// Deserializes a duration from non-negative fractional seconds.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let seconds = f64::deserialize(deserializer)?;
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(D::Error::custom(
                "duration must be a non-negative number of seconds",
            ));
        }
        Ok(Duration::from_secs_f64(seconds))
    }
}

/// Advances a countdown by `dt`, reporting whether it reached zero.
#[must_use]
pub fn count_down(remaining: &mut Duration, dt: Duration) -> bool {
    *remaining = remaining.saturating_sub(dt);
    remaining.is_zero()
}
