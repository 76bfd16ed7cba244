//! Built-in room templates and encounter catalogs used by headless runs.

use gauntlet_core::{
    Aabb, EncounterEntry, PrefabId, RoomKind, RoomTemplate, ScalingFactors, TemplateId, Vec3,
    WaveId, WaveZoneLayout, BOSS_ANCHOR, ENTRY_ANCHOR, EXIT_ANCHOR,
};
use gauntlet_world::World;

const GRUNT: PrefabId = PrefabId::new(1);
const RUNNER: PrefabId = PrefabId::new(2);
const BRUTE: PrefabId = PrefabId::new(3);
const WARDEN: PrefabId = PrefabId::new(900);

/// World serving the demo corridor, arena and boss hall templates.
pub(crate) fn world() -> World {
    World::with_templates([corridor(), arena(), boss_hall()])
}

/// Regular enemies, unlocked progressively as difficulty rises.
pub(crate) fn catalog() -> Vec<EncounterEntry> {
    vec![
        EncounterEntry::new(GRUNT, 3.0, 1),
        EncounterEntry::new(RUNNER, 1.0, 3).with_scaling(ScalingFactors::new(0.1, 0.25)),
        EncounterEntry::new(BRUTE, 1.0, 5).with_scaling(ScalingFactors::new(0.4, 0.1)),
    ]
}

/// Bosses placed in boss rooms.
pub(crate) fn boss_catalog() -> Vec<EncounterEntry> {
    vec![EncounterEntry::new(WARDEN, 1.0, 1)]
}

fn corridor() -> RoomTemplate {
    RoomTemplate::new(
        TemplateId::new(1),
        RoomKind::Normal,
        PrefabId::new(101),
        Aabb::from_corners(Vec3::new(-6.0, 0.0, 0.0), Vec3::new(6.0, 4.0, 24.0)),
    )
    .with_weight(3.0)
    .with_anchor(ENTRY_ANCHOR, Vec3::new(0.0, 0.0, 0.5))
    .with_anchor(EXIT_ANCHOR, Vec3::new(0.0, 0.0, 23.5))
    .with_spawn_point(Vec3::new(-4.0, 0.0, 12.0))
    .with_spawn_point(Vec3::new(4.0, 0.0, 12.0))
    .with_spawn_point(Vec3::new(0.0, 0.0, 18.0))
}

fn arena() -> RoomTemplate {
    let mut gate = WaveZoneLayout::new(
        WaveId::new(0),
        Aabb::from_corners(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 8.0)),
    );
    gate.name = String::from("gate");
    gate.enemy_count = 3;
    gate.spawn_bounds = Some(Aabb::from_corners(
        Vec3::new(-10.0, 0.0, 8.0),
        Vec3::new(10.0, 0.0, 20.0),
    ));

    let mut pit = WaveZoneLayout::new(
        WaveId::new(1),
        Aabb::from_corners(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 4.0, 30.0)),
    );
    pit.name = String::from("pit");
    pit.enemy_count = 5;
    pit.wave_multiplier = 1.5;
    pit.spawn_points = vec![
        Vec3::new(-8.0, 0.0, 24.0),
        Vec3::new(8.0, 0.0, 24.0),
        Vec3::new(0.0, 0.0, 28.0),
    ];

    RoomTemplate::new(
        TemplateId::new(2),
        RoomKind::Normal,
        PrefabId::new(102),
        Aabb::from_corners(Vec3::new(-10.0, 0.0, 0.0), Vec3::new(10.0, 6.0, 30.0)),
    )
    .with_anchor(ENTRY_ANCHOR, Vec3::new(0.0, 0.0, 1.0))
    .with_anchor(EXIT_ANCHOR, Vec3::new(0.0, 0.0, 29.0))
    .with_wave_zone(gate)
    .with_wave_zone(pit)
}

fn boss_hall() -> RoomTemplate {
    RoomTemplate::new(
        TemplateId::new(9),
        RoomKind::Boss,
        PrefabId::new(109),
        Aabb::from_corners(Vec3::new(-12.0, 0.0, 0.0), Vec3::new(12.0, 8.0, 32.0)),
    )
    .with_anchor(ENTRY_ANCHOR, Vec3::new(0.0, 0.0, 1.0))
    .with_anchor(EXIT_ANCHOR, Vec3::new(0.0, 0.0, 31.0))
    .with_anchor(BOSS_ANCHOR, Vec3::new(0.0, 0.0, 22.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::RoomTemplateProvider;

    #[test]
    fn arena_zones_cover_the_entry() {
        let arena = arena();
        let entry = Vec3::new(0.0, 0.0, 1.0);
        assert!(arena
            .wave_zones()
            .iter()
            .all(|zone| zone.trigger_volume.contains(entry)));
    }

    #[test]
    fn world_serves_both_kinds() {
        let world = world();
        assert_eq!(world.templates(RoomKind::Normal).len(), 2);
        assert_eq!(world.templates(RoomKind::Boss).len(), 1);
    }
}
