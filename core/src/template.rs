//! Room blueprints supplied by the template provider.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{duration_secs, Aabb, PrefabId, RoomKind, TemplateId, Vec3, WaveId};

/// Named point inside a template, expressed relative to the template origin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    name: String,
    offset: Vec3,
}

impl Anchor {
    /// Creates a new anchor.
    #[must_use]
    pub fn new(name: impl Into<String>, offset: Vec3) -> Self {
        Self {
            name: name.into(),
            offset,
        }
    }

    /// Name of the anchor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Offset of the anchor from the template origin.
    #[must_use]
    pub const fn offset(&self) -> Vec3 {
        self.offset
    }
}

/// Static blueprint of a room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomTemplate {
    id: TemplateId,
    kind: RoomKind,
    prefab: PrefabId,
    #[serde(default)]
    weight: f32,
    #[serde(default)]
    anchors: Vec<Anchor>,
    bounds: Aabb,
    #[serde(default)]
    spawn_points: Vec<Vec3>,
    #[serde(default)]
    wave_zones: Vec<WaveZoneLayout>,
}

impl RoomTemplate {
    /// Creates an empty template of the provided kind spanning `bounds`.
    #[must_use]
    pub fn new(id: TemplateId, kind: RoomKind, prefab: PrefabId, bounds: Aabb) -> Self {
        Self {
            id,
            kind,
            prefab,
            weight: 0.0,
            anchors: Vec::new(),
            bounds,
            spawn_points: Vec::new(),
            wave_zones: Vec::new(),
        }
    }

    /// Sets the selection weight used when choosing among templates of the same kind.
    #[must_use]
    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = weight;
        self
    }

    /// Adds a named anchor.
    #[must_use]
    pub fn with_anchor(mut self, name: impl Into<String>, offset: Vec3) -> Self {
        self.anchors.push(Anchor::new(name, offset));
        self
    }

    /// Adds a predefined spawn point.
    #[must_use]
    pub fn with_spawn_point(mut self, point: Vec3) -> Self {
        self.spawn_points.push(point);
        self
    }

    /// Adds a wave zone layout.
    #[must_use]
    pub fn with_wave_zone(mut self, zone: WaveZoneLayout) -> Self {
        self.wave_zones.push(zone);
        self
    }

    /// Identifier of the template.
    #[must_use]
    pub const fn id(&self) -> TemplateId {
        self.id
    }

    /// Kind of room built from the template.
    #[must_use]
    pub const fn kind(&self) -> RoomKind {
        self.kind
    }

    /// Prefab instantiated as the room root.
    #[must_use]
    pub const fn prefab(&self) -> PrefabId {
        self.prefab
    }

    /// Selection weight. Zero or negative weights only matter for uniform fallback.
    #[must_use]
    pub const fn weight(&self) -> f32 {
        self.weight
    }

    /// Named anchors of the template.
    #[must_use]
    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Local-space bounds.
    #[must_use]
    pub const fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Local-space predefined spawn points.
    #[must_use]
    pub fn spawn_points(&self) -> &[Vec3] {
        &self.spawn_points
    }

    /// Local-space wave zone layouts.
    #[must_use]
    pub fn wave_zones(&self) -> &[WaveZoneLayout] {
        &self.wave_zones
    }
}

/// Local-space description of a wave zone carried by a room template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaveZoneLayout {
    /// Identifier of the zone, unique within its room.
    pub id: WaveId,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Volume the player must enter to trigger the zone.
    pub trigger_volume: Aabb,
    /// Bounds random spawn candidates are drawn from. Defaults to the trigger volume.
    #[serde(default)]
    pub spawn_bounds: Option<Aabb>,
    /// Predefined spawn points tried before random candidates.
    #[serde(default)]
    pub spawn_points: Vec<Vec3>,
    /// Number of spawn requests issued by the batch.
    #[serde(default = "default_enemy_count")]
    pub enemy_count: u32,
    /// Multiplier applied to the room difficulty for this wave.
    #[serde(default = "default_wave_multiplier")]
    pub wave_multiplier: f32,
    /// Whether the zone triggers itself when the player enters its volume.
    #[serde(default = "default_true")]
    pub trigger_on_player_enter: bool,
    /// Whether the zone may only trigger once until reset.
    #[serde(default = "default_true")]
    pub trigger_once: bool,
    /// Dwell time required inside the volume.
    #[serde(default = "default_trigger_duration", with = "duration_secs")]
    pub trigger_duration: Duration,
    /// Length of the warning telegraph before spawning.
    #[serde(default = "default_spawn_delay", with = "duration_secs")]
    pub spawn_delay: Duration,
    /// Delay between consecutive spawn requests.
    #[serde(default = "default_spawn_interval", with = "duration_secs")]
    pub spawn_interval: Duration,
}

impl WaveZoneLayout {
    /// Creates a layout with default timings and three enemies.
    #[must_use]
    pub fn new(id: WaveId, trigger_volume: Aabb) -> Self {
        Self {
            id,
            name: format!("wave-{}", id.get()),
            trigger_volume,
            spawn_bounds: None,
            spawn_points: Vec::new(),
            enemy_count: default_enemy_count(),
            wave_multiplier: default_wave_multiplier(),
            trigger_on_player_enter: true,
            trigger_once: true,
            trigger_duration: default_trigger_duration(),
            spawn_delay: default_spawn_delay(),
            spawn_interval: default_spawn_interval(),
        }
    }
}

fn default_enemy_count() -> u32 {
    3
}

fn default_wave_multiplier() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_trigger_duration() -> Duration {
    Duration::from_millis(500)
}

fn default_spawn_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_spawn_interval() -> Duration {
    Duration::from_millis(200)
}
