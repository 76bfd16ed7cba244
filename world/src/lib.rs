#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative in-memory host for Gauntlet sessions.
//!
//! The world stores room templates, the player actor, obstacle geometry and
//! every instantiated entity. It implements the collaborator traits from
//! `gauntlet-core` so systems can run headless, and it accepts [`Command`]
//! values that stand in for gameplay the core does not simulate, such as
//! combat destroying enemies.

use std::collections::BTreeMap;

use gauntlet_core::{
    ActorLocator, Command, EntityFactory, EntityRef, Event, PhysicsQuery, PrefabId, RoomKind,
    RoomTemplate, RoomTemplateProvider, StatMultipliers, Vec3,
};
use tracing::trace;

const DEFAULT_PLAYER_POSITION: Vec3 = Vec3::ZERO;

/// Represents the authoritative Gauntlet world state.
#[derive(Debug)]
pub struct World {
    normal_templates: Vec<RoomTemplate>,
    boss_templates: Vec<RoomTemplate>,
    player: Option<Vec3>,
    obstacles: Vec<Obstacle>,
    entities: BTreeMap<EntityRef, EntityRecord>,
    next_entity: u64,
    instantiate_calls: u64,
}

impl World {
    /// Creates an empty world with a player standing at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            normal_templates: Vec::new(),
            boss_templates: Vec::new(),
            player: Some(DEFAULT_PLAYER_POSITION),
            obstacles: Vec::new(),
            entities: BTreeMap::new(),
            next_entity: 1,
            instantiate_calls: 0,
        }
    }

    /// Creates a world that serves the provided templates.
    #[must_use]
    pub fn with_templates<I>(templates: I) -> Self
    where
        I: IntoIterator<Item = RoomTemplate>,
    {
        let mut world = Self::new();
        for template in templates {
            world.register_template(template);
        }
        world
    }

    /// Adds a template to the catalog for its kind.
    pub fn register_template(&mut self, template: RoomTemplate) {
        match template.kind() {
            RoomKind::Normal => self.normal_templates.push(template),
            RoomKind::Boss => self.boss_templates.push(template),
        }
    }

    /// Removes the player actor, as if it had not been spawned yet.
    pub fn remove_player(&mut self) {
        self.player = None;
    }

    fn is_room_prefab(&self, prefab: PrefabId) -> bool {
        self.normal_templates
            .iter()
            .chain(self.boss_templates.iter())
            .any(|template| template.prefab() == prefab)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomTemplateProvider for World {
    fn templates(&self, kind: RoomKind) -> &[RoomTemplate] {
        match kind {
            RoomKind::Normal => &self.normal_templates,
            RoomKind::Boss => &self.boss_templates,
        }
    }
}

impl ActorLocator for World {
    fn player_position(&self) -> Option<Vec3> {
        self.player
    }

    fn relocate_player(&mut self, position: Vec3) {
        self.player = Some(position);
    }
}

impl PhysicsQuery for World {
    fn overlaps_obstacle(&self, center: Vec3, radius: f32) -> bool {
        self.obstacles
            .iter()
            .any(|obstacle| obstacle.center.distance(center) <= obstacle.radius + radius)
    }
}

impl EntityFactory for World {
    fn instantiate(
        &mut self,
        prefab: PrefabId,
        position: Vec3,
        multipliers: StatMultipliers,
    ) -> EntityRef {
        let entity = EntityRef::new(self.next_entity);
        self.next_entity = self.next_entity.saturating_add(1);
        self.instantiate_calls = self.instantiate_calls.saturating_add(1);
        let role = if self.is_room_prefab(prefab) {
            EntityRole::Room
        } else {
            EntityRole::Actor
        };
        let _ = self.entities.insert(
            entity,
            EntityRecord {
                prefab,
                position,
                multipliers,
                role,
            },
        );
        trace!(entity = entity.get(), prefab = prefab.get(), "entity instantiated");
        entity
    }

    fn destroy(&mut self, entity: EntityRef) {
        if self.entities.remove(&entity).is_some() {
            trace!(entity = entity.get(), "entity destroyed");
        }
    }

    fn is_alive(&self, entity: EntityRef) -> bool {
        self.entities.contains_key(&entity)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { position } => world.relocate_player(position),
        Command::PlaceObstacle { center, radius } => world.obstacles.push(Obstacle {
            center,
            radius: radius.max(0.0),
        }),
        Command::KillEntity { entity } => {
            if world.entities.remove(&entity).is_some() {
                out_events.push(Event::EntityDestroyed { entity });
            }
        }
        Command::KillAllEnemies => {
            let doomed: Vec<EntityRef> = world
                .entities
                .iter()
                .filter(|(_, record)| record.role == EntityRole::Actor)
                .map(|(entity, _)| *entity)
                .collect();
            for entity in doomed {
                let _ = world.entities.remove(&entity);
                out_events.push(Event::EntityDestroyed { entity });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use gauntlet_core::{EntityRef, PrefabId, StatMultipliers, Vec3};

    use super::{EntityRole, World};

    /// Current player position, if the player exists.
    #[must_use]
    pub fn player_position(world: &World) -> Option<Vec3> {
        world.player
    }

    /// Number of times any entity was instantiated since the world was created.
    #[must_use]
    pub fn instantiate_calls(world: &World) -> u64 {
        world.instantiate_calls
    }

    /// Captures a snapshot of a single entity.
    #[must_use]
    pub fn entity(world: &World, entity: EntityRef) -> Option<EntitySnapshot> {
        world
            .entities
            .get(&entity)
            .map(|record| EntitySnapshot::capture(entity, record))
    }

    /// Captures snapshots of every live entity in identifier order.
    #[must_use]
    pub fn entity_view(world: &World) -> Vec<EntitySnapshot> {
        world
            .entities
            .iter()
            .map(|(entity, record)| EntitySnapshot::capture(*entity, record))
            .collect()
    }

    /// Number of live entities that are not room roots.
    #[must_use]
    pub fn live_actor_count(world: &World) -> usize {
        world
            .entities
            .values()
            .filter(|record| record.role == EntityRole::Actor)
            .count()
    }

    /// Number of live room roots.
    #[must_use]
    pub fn live_room_count(world: &World) -> usize {
        world
            .entities
            .values()
            .filter(|record| record.role == EntityRole::Room)
            .count()
    }

    /// Immutable representation of a single entity used for queries.
    #[derive(Clone, Copy, Debug, PartialEq)]
    pub struct EntitySnapshot {
        /// Reference of the entity.
        pub entity: EntityRef,
        /// Prefab the entity was instantiated from.
        pub prefab: PrefabId,
        /// Position the entity was instantiated at.
        pub position: Vec3,
        /// Stat scalars attached at instantiation.
        pub multipliers: StatMultipliers,
        /// Indicates whether the entity is a room root.
        pub is_room: bool,
    }

    impl EntitySnapshot {
        fn capture(entity: EntityRef, record: &super::EntityRecord) -> Self {
            Self {
                entity,
                prefab: record.prefab,
                position: record.position,
                multipliers: record.multipliers,
                is_room: record.role == EntityRole::Room,
            }
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Obstacle {
    center: Vec3,
    radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum EntityRole {
    Room,
    Actor,
}

#[derive(Clone, Copy, Debug)]
struct EntityRecord {
    prefab: PrefabId,
    position: Vec3,
    multipliers: StatMultipliers,
    role: EntityRole,
}
