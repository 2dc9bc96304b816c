use thiserror::Error;
use tracing::debug;

use super::{Rect, Vec2};

pub const DEFAULT_ZONE_SIZE_PX: f32 = 32.0;
const POINT_PROBE_SIZE_PX: f32 = 4.0;

/// Named rectangle the actor can walk up to and interact with.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionZone {
    id: String,
    center: Vec2,
    width: f32,
    height: f32,
}

impl InteractionZone {
    pub fn new(id: impl Into<String>, center: Vec2, width: f32, height: f32) -> Self {
        Self {
            id: id.into(),
            center,
            width,
            height,
        }
    }

    /// Builds a zone from a map object anchored at its top-left corner.
    /// Missing or zero sizes fall back to one default tile.
    pub fn from_top_left(
        id: impl Into<String>,
        x: f32,
        y: f32,
        width: Option<f32>,
        height: Option<f32>,
    ) -> Self {
        let width = non_zero_or_default(width);
        let height = non_zero_or_default(height);
        Self::new(
            id,
            Vec2 {
                x: x + width * 0.5,
                y: y + height * 0.5,
            },
            width,
            height,
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_center(self.center, self.width, self.height)
    }
}

fn non_zero_or_default(value: Option<f32>) -> f32 {
    match value {
        Some(value) if value > 0.0 => value,
        _ => DEFAULT_ZONE_SIZE_PX,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ZoneRegistryError {
    #[error("duplicate interaction zone id '{0}'")]
    DuplicateId(String),
}

/// Immutable set of interaction zones for one room, kept in map order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneRegistry {
    zones: Vec<InteractionZone>,
}

impl ZoneRegistry {
    pub fn new(zones: Vec<InteractionZone>) -> Result<Self, ZoneRegistryError> {
        for (index, zone) in zones.iter().enumerate() {
            if zones[..index].iter().any(|other| other.id == zone.id) {
                return Err(ZoneRegistryError::DuplicateId(zone.id.clone()));
            }
        }
        debug!(zone_count = zones.len(), "zone_registry_built");
        Ok(Self { zones })
    }

    pub fn get_zone_by_id(&self, id: &str) -> Option<&InteractionZone> {
        self.zones.iter().find(|zone| zone.id == id)
    }

    /// Zone under a pointer position. Uses a small probe so taps on an edge still land;
    /// overlapping hits resolve to the nearest zone center.
    pub fn get_zone_at(&self, point: Vec2) -> Option<&InteractionZone> {
        let probe = Rect::from_center(point, POINT_PROBE_SIZE_PX, POINT_PROBE_SIZE_PX);
        self.nearest_overlapping(&probe, point)
    }

    /// Nearest zone center (squared distance) among zones intersecting `probe`.
    /// Equal distances keep the earlier zone.
    pub fn nearest_overlapping(&self, probe: &Rect, probe_center: Vec2) -> Option<&InteractionZone> {
        let mut best: Option<(&InteractionZone, f32)> = None;
        for zone in &self.zones {
            if !probe.intersects(&zone.bounds()) {
                continue;
            }
            let distance_sq = zone.center.distance_sq(probe_center);
            match best {
                Some((_, best_distance_sq)) if best_distance_sq <= distance_sq => {}
                _ => best = Some((zone, distance_sq)),
            }
        }
        best.map(|(zone, _)| zone)
    }

    pub fn all_zones(&self) -> &[InteractionZone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
