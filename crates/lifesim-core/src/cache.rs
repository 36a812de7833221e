//! Route caches used by locomotion.
//!
//! Both caches are owned by whoever builds the `Locomotion` system and are
//! dropped wholesale when the obstacle map changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::components::ZoneId;
use crate::config::LocomotionConfig;
use crate::pathfinding::{Cell, PathResult};

#[derive(Debug, Clone)]
struct CachedPath {
    result: PathResult,
    created_at: f64,
}

/// Path results keyed by (start tile, destination zone), expiring after a TTL
#[derive(Debug, Clone)]
pub struct PathCache {
    entries: HashMap<(Cell, ZoneId), CachedPath>,
    ttl_secs: f64,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl PathCache {
    pub fn new(ttl_secs: f32, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl_secs: ttl_secs.max(0.0) as f64,
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn from_config(config: &LocomotionConfig) -> Self {
        Self::new(config.path_cache_ttl_secs, config.path_cache_capacity)
    }

    /// Fresh entry for the key, if any. Expired entries are dropped.
    pub fn get(&mut self, start: Cell, zone: &ZoneId, now: f64) -> Option<PathResult> {
        let key = (start, zone.clone());
        match self.entries.get(&key) {
            Some(entry) if now - entry.created_at <= self.ttl_secs => {
                self.hits += 1;
                Some(entry.result.clone())
            }
            Some(_) => {
                self.entries.remove(&key);
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, start: Cell, zone: ZoneId, result: PathResult, now: f64) {
        if self.entries.len() >= self.capacity {
            let ttl = self.ttl_secs;
            self.entries.retain(|_, e| now - e.created_at <= ttl);
        }
        if self.entries.len() >= self.capacity {
            // Evict the oldest entry
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by(|a, b| {
                    a.1.created_at
                        .partial_cmp(&b.1.created_at)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            (start, zone),
            CachedPath {
                result,
                created_at: now,
            },
        );
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TravelDifficulty {
    Easy,
    Medium,
    Hard,
}

impl TravelDifficulty {
    pub fn classify(distance: f32, config: &LocomotionConfig) -> Self {
        if distance < config.easy_max_distance {
            TravelDifficulty::Easy
        } else if distance < config.medium_max_distance {
            TravelDifficulty::Medium
        } else {
            TravelDifficulty::Hard
        }
    }
}

/// Precomputed travel estimate between two zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDistanceEntry {
    pub from: ZoneId,
    pub to: ZoneId,
    /// Straight-line distance between zone centers in world units
    pub distance: f32,
    /// Seconds at zero fatigue
    pub travel_time: f32,
    pub difficulty: TravelDifficulty,
}

#[derive(Debug, Clone, Default)]
pub struct ZoneDistanceCache {
    entries: HashMap<(ZoneId, ZoneId), ZoneDistanceEntry>,
}

impl ZoneDistanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: &ZoneId, to: &ZoneId) -> Option<&ZoneDistanceEntry> {
        self.entries.get(&(from.clone(), to.clone()))
    }

    pub fn insert(&mut self, entry: ZoneDistanceEntry) {
        self.entries
            .insert((entry.from.clone(), entry.to.clone()), entry);
    }

    pub fn invalidate(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Vec2;

    fn result(x: f32) -> PathResult {
        PathResult::direct(Vec2::ZERO, Vec2::new(x, 0.0), true)
    }

    #[test]
    fn test_path_cache_hit_and_expiry() {
        let mut cache = PathCache::new(30.0, 8);
        let zone = ZoneId::from("cafe");
        cache.insert((1, 1), zone.clone(), result(100.0), 0.0);
        assert_eq!(cache.get((1, 1), &zone, 10.0), Some(result(100.0)));
        assert!(cache.get((2, 1), &zone, 10.0).is_none());
        assert!(cache.get((1, 1), &zone, 31.0).is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), (1, 2));
    }

    #[test]
    fn test_path_cache_evicts_oldest_at_capacity() {
        let mut cache = PathCache::new(1000.0, 2);
        cache.insert((0, 0), ZoneId::from("a"), result(1.0), 1.0);
        cache.insert((0, 0), ZoneId::from("b"), result(2.0), 2.0);
        cache.insert((0, 0), ZoneId::from("c"), result(3.0), 3.0);
        assert_eq!(cache.len(), 2);
        assert!(cache.get((0, 0), &ZoneId::from("a"), 3.0).is_none());
        assert!(cache.get((0, 0), &ZoneId::from("c"), 3.0).is_some());
    }

    #[test]
    fn test_invalidate_clears_everything() {
        let mut paths = PathCache::new(30.0, 8);
        paths.insert((0, 0), ZoneId::from("a"), result(1.0), 0.0);
        paths.invalidate();
        assert!(paths.is_empty());

        let mut distances = ZoneDistanceCache::new();
        distances.insert(ZoneDistanceEntry {
            from: ZoneId::from("a"),
            to: ZoneId::from("b"),
            distance: 120.0,
            travel_time: 2.0,
            difficulty: TravelDifficulty::Easy,
        });
        assert_eq!(
            distances.get(&ZoneId::from("a"), &ZoneId::from("b")).map(|e| e.distance),
            Some(120.0)
        );
        assert!(distances.get(&ZoneId::from("b"), &ZoneId::from("a")).is_none());
        distances.invalidate();
        assert!(distances.is_empty());
    }

    #[test]
    fn test_difficulty_bands() {
        let config = LocomotionConfig::default();
        assert_eq!(TravelDifficulty::classify(150.0, &config), TravelDifficulty::Easy);
        assert_eq!(TravelDifficulty::classify(200.0, &config), TravelDifficulty::Medium);
        assert_eq!(TravelDifficulty::classify(499.0, &config), TravelDifficulty::Medium);
        assert_eq!(TravelDifficulty::classify(500.0, &config), TravelDifficulty::Hard);
    }
}
