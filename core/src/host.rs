//! Collaborator traits implemented by the host simulation.
//!
//! Systems never reach into the host directly. They receive a host reference
//! for the duration of a call and use these traits to query it.

use crate::{EntityRef, PrefabId, RoomKind, RoomTemplate, StatMultipliers, Vec3};

/// Supplies room blueprints grouped by kind.
pub trait RoomTemplateProvider {
    /// Templates available for rooms of the provided kind.
    fn templates(&self, kind: RoomKind) -> &[RoomTemplate];
}

/// Locates and moves the player-controlled actor.
pub trait ActorLocator {
    /// Current player position, if a player exists.
    fn player_position(&self) -> Option<Vec3>;

    /// Moves the player to the provided position.
    fn relocate_player(&mut self, position: Vec3);
}

/// Answers spatial queries against obstacle geometry.
pub trait PhysicsQuery {
    /// Reports whether any obstacle-layer collider lies within `radius` of `center`.
    fn overlaps_obstacle(&self, center: Vec3, radius: f32) -> bool;
}

/// Creates and destroys host entities.
pub trait EntityFactory {
    /// Instantiates `prefab` at `position` with the provided stat scalars.
    fn instantiate(
        &mut self,
        prefab: PrefabId,
        position: Vec3,
        multipliers: StatMultipliers,
    ) -> EntityRef;

    /// Destroys an entity. Destroying a dead entity is a no-op.
    fn destroy(&mut self, entity: EntityRef);

    /// Reports whether the entity still exists.
    fn is_alive(&self, entity: EntityRef) -> bool;
}

/// Everything a spawner needs from the host.
pub trait SpawnHost: ActorLocator + PhysicsQuery + EntityFactory {}

impl<T> SpawnHost for T where T: ActorLocator + PhysicsQuery + EntityFactory + ?Sized {}

/// Everything the session needs from the host.
pub trait GameHost: RoomTemplateProvider + SpawnHost {}

impl<T> GameHost for T where T: RoomTemplateProvider + SpawnHost + ?Sized {}
