//! World snapshot components: ZoneType, Zone, WorldSnapshot.
//!
//! Zones and obstacles are owned by the world collaborator. The engine treats
//! a `WorldSnapshot` as immutable between "world changed" notifications.

use serde::{Deserialize, Serialize};

use super::common::{Bounds, Vec2, ZoneId};
use super::needs::NeedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    Food,
    Water,
    Rest,
    Shelter,
    Social,
    Hygiene,
    Entertainment,
    Work,
    Medical,
    Park,
    Library,
    Market,
}

impl ZoneType {
    /// Needs affected while an agent occupies this zone, with a weight applied
    /// to the base benefit rate. Negative weights drain the need.
    pub fn benefits(&self) -> &'static [(NeedType, f32)] {
        match self {
            ZoneType::Food => &[(NeedType::Hunger, 1.0)],
            ZoneType::Water => &[(NeedType::Thirst, 1.0)],
            ZoneType::Rest => &[(NeedType::Energy, 1.0)],
            ZoneType::Shelter => &[(NeedType::Energy, 0.8)],
            ZoneType::Social => &[
                (NeedType::Social, 1.0),
                (NeedType::MentalHealth, 0.3),
                (NeedType::Fun, 0.3),
            ],
            ZoneType::Hygiene => &[(NeedType::Hygiene, 1.0), (NeedType::MentalHealth, 0.2)],
            ZoneType::Entertainment => &[(NeedType::Fun, 1.0), (NeedType::MentalHealth, 0.3)],
            ZoneType::Work => &[(NeedType::Energy, -0.4), (NeedType::MentalHealth, 0.3)],
            ZoneType::Medical => &[(NeedType::MentalHealth, 0.8), (NeedType::Energy, 0.3)],
            ZoneType::Park => &[(NeedType::MentalHealth, 0.5), (NeedType::Fun, 0.5)],
            ZoneType::Library => &[(NeedType::Fun, 0.4), (NeedType::MentalHealth, 0.6)],
            ZoneType::Market => &[(NeedType::Hunger, 0.5), (NeedType::Social, 0.4)],
        }
    }

    /// Whether this zone type restores the given need
    pub fn serves(&self, need: NeedType) -> bool {
        self.benefits().iter().any(|(n, w)| *n == need && *w > 0.0)
    }
}

/// A named spatial region agents can travel to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    pub id: ZoneId,
    pub zone_type: ZoneType,
    pub bounds: Bounds,
    pub attractiveness: f32,
}

impl Zone {
    pub fn new(id: impl Into<String>, zone_type: ZoneType, bounds: Bounds) -> Self {
        Self {
            id: ZoneId::new(id),
            zone_type,
            bounds,
            attractiveness: 0.5,
        }
    }

    pub fn with_attractiveness(mut self, attractiveness: f32) -> Self {
        self.attractiveness = attractiveness;
        self
    }

    pub fn center(&self) -> Vec2 {
        self.bounds.center()
    }
}

/// Immutable per-tick view of the world handed to the core
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    /// Walkable extent of the world
    pub bounds: Bounds,
    pub zones: Vec<Zone>,
    /// Blocked rectangles
    #[serde(default)]
    pub obstacles: Vec<Bounds>,
}

impl WorldSnapshot {
    pub fn new(bounds: Bounds) -> Self {
        Self {
            bounds,
            zones: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.zones.push(zone);
        self
    }

    pub fn with_obstacle(mut self, obstacle: Bounds) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn zone(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    /// Zone containing `point`, first match in snapshot order
    pub fn zone_at(&self, point: &Vec2) -> Option<&Zone> {
        self.zones.iter().find(|z| z.bounds.contains(point))
    }
}
