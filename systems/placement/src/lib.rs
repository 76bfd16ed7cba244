#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Anchor-based placement that stitches consecutive rooms end to end.

use gauntlet_core::{
    Anchor, AnchorError, RoomPlacement, RoomTemplate, Vec3, ENTRY_ANCHOR, EXIT_ANCHOR,
};
use tracing::warn;

/// Computes where a room must be placed so its entry lands on the previous exit.
#[derive(Clone, Copy, Debug)]
pub struct SpawnPositionResolver {
    start_position: Vec3,
}

impl SpawnPositionResolver {
    /// Creates a resolver that places the first room of a session at `start_position`.
    #[must_use]
    pub const fn new(start_position: Vec3) -> Self {
        Self { start_position }
    }

    /// Position used for the first room, which has no predecessor.
    #[must_use]
    pub const fn start_position(&self) -> Vec3 {
        self.start_position
    }

    /// Room origin that puts an entry anchor at `entry_offset` exactly on `previous_exit`.
    #[must_use]
    pub fn resolve(previous_exit: Vec3, entry_offset: Vec3) -> Vec3 {
        previous_exit - entry_offset
    }

    /// Places `template` after a room whose exit lies at `previous_exit`.
    ///
    /// The first room of a session passes `None` and is placed at the start
    /// position. A missing entry anchor degrades to placing the room origin on
    /// the previous exit; a missing exit anchor degrades to the room origin.
    /// Every degradation is reported in the returned placement.
    #[must_use]
    pub fn place(&self, previous_exit: Option<Vec3>, template: &RoomTemplate) -> Placement {
        let mut fallbacks = Vec::new();
        let entry_offset = match find_anchor(template.anchors(), ENTRY_ANCHOR) {
            Ok(anchor) => Some(anchor.offset()),
            Err(error) => {
                warn!(template = template.id().get(), %error, "entry anchor missing");
                fallbacks.push(error);
                None
            }
        };

        let origin = match (previous_exit, entry_offset) {
            (None, _) => self.start_position,
            (Some(exit), Some(offset)) => Self::resolve(exit, offset),
            (Some(exit), None) => exit,
        };

        let exit = match find_anchor(template.anchors(), EXIT_ANCHOR) {
            Ok(anchor) => origin + anchor.offset(),
            Err(error) => {
                warn!(template = template.id().get(), %error, "exit anchor missing");
                fallbacks.push(error);
                origin
            }
        };

        Placement {
            room: RoomPlacement {
                origin,
                entry: origin + entry_offset.unwrap_or(Vec3::ZERO),
                exit,
            },
            fallbacks,
        }
    }
}

impl Default for SpawnPositionResolver {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

/// Outcome of placing a room, including any degraded anchor lookups.
#[derive(Clone, Debug, PartialEq)]
pub struct Placement {
    /// Resolved world-space placement.
    pub room: RoomPlacement,
    /// Anchor lookups that failed and were replaced by fallback positions.
    pub fallbacks: Vec<AnchorError>,
}

impl Placement {
    /// Reports whether placement used any fallback position.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.fallbacks.is_empty()
    }
}

/// Finds an anchor by exact name, then by case-insensitive substring.
pub fn find_anchor<'a>(anchors: &'a [Anchor], name: &str) -> Result<&'a Anchor, AnchorError> {
    if let Some(anchor) = anchors.iter().find(|anchor| anchor.name() == name) {
        return Ok(anchor);
    }

    let needle = name.to_lowercase();
    anchors
        .iter()
        .find(|anchor| anchor.name().to_lowercase().contains(&needle))
        .ok_or_else(|| AnchorError::MissingAnchor {
            name: name.to_owned(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_core::{Aabb, PrefabId, RoomKind, TemplateId};

    fn template(anchors: &[(&str, Vec3)]) -> RoomTemplate {
        anchors.iter().fold(
            RoomTemplate::new(
                TemplateId::new(1),
                RoomKind::Normal,
                PrefabId::new(1),
                Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(5.0)),
            ),
            |template, (name, offset)| template.with_anchor(*name, *offset),
        )
    }

    #[test]
    fn exact_match_wins_over_substring() {
        let anchors = vec![
            Anchor::new("SecondaryEntry", Vec3::X),
            Anchor::new("Entry", Vec3::Y),
        ];
        let anchor = find_anchor(&anchors, "Entry").expect("anchor");
        assert_eq!(anchor.offset(), Vec3::Y);
    }

    #[test]
    fn substring_match_ignores_case() {
        let anchors = vec![Anchor::new("room_EXIT_north", Vec3::Z)];
        let anchor = find_anchor(&anchors, "Exit").expect("anchor");
        assert_eq!(anchor.offset(), Vec3::Z);
    }

    #[test]
    fn missing_anchor_reports_name() {
        let anchors = vec![Anchor::new("Door", Vec3::Z)];
        assert_eq!(
            find_anchor(&anchors, "Exit"),
            Err(AnchorError::MissingAnchor {
                name: "Exit".to_owned()
            })
        );
    }

    #[test]
    fn first_room_uses_start_position() {
        let resolver = SpawnPositionResolver::new(Vec3::new(10.0, 0.0, 0.0));
        let template = template(&[
            ("Entry", Vec3::new(0.0, 0.0, -5.0)),
            ("Exit", Vec3::new(0.0, 0.0, 5.0)),
        ]);

        let placement = resolver.place(None, &template);

        assert_eq!(placement.room.origin, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(placement.room.exit, Vec3::new(10.0, 0.0, 5.0));
        assert!(!placement.is_degraded());
    }

    #[test]
    fn entry_lands_on_previous_exit() {
        let resolver = SpawnPositionResolver::default();
        let previous_exit = Vec3::new(3.5, 1.25, 42.0);
        let template = template(&[
            ("Entry", Vec3::new(-2.0, 0.5, -7.0)),
            ("Exit", Vec3::new(2.0, 0.0, 7.0)),
        ]);

        let placement = resolver.place(Some(previous_exit), &template);

        assert!(placement.room.entry.distance(previous_exit) < 1e-5);
        assert_eq!(
            placement.room.exit,
            placement.room.origin + Vec3::new(2.0, 0.0, 7.0)
        );
    }

    #[test]
    fn missing_entry_degrades_to_previous_exit() {
        let resolver = SpawnPositionResolver::default();
        let previous_exit = Vec3::new(0.0, 0.0, 20.0);
        let template = template(&[("Exit", Vec3::new(0.0, 0.0, 5.0))]);

        let placement = resolver.place(Some(previous_exit), &template);

        assert_eq!(placement.room.origin, previous_exit);
        assert_eq!(placement.fallbacks.len(), 1);
    }

    #[test]
    fn missing_exit_degrades_to_origin() {
        let resolver = SpawnPositionResolver::default();
        let template = template(&[("Entry", Vec3::new(0.0, 0.0, -5.0))]);

        let placement = resolver.place(Some(Vec3::new(0.0, 0.0, 10.0)), &template);

        assert_eq!(placement.room.origin, Vec3::new(0.0, 0.0, 15.0));
        assert_eq!(placement.room.exit, placement.room.origin);
        assert!(placement.is_degraded());
    }
}
