//! Per-subsystem agent storage.
//!
//! Each subsystem keeps its records in an `AgentArena`: a `hecs::World` holding
//! one record per agent (dense storage, stable generational handles) plus a
//! lookup from the external `AgentId` to the handle.

use hecs::{Component, Entity, World};
use std::collections::HashMap;
use std::marker::PhantomData;

use crate::components::AgentId;

pub struct AgentArena<T: Component> {
    world: World,
    index: HashMap<AgentId, Entity>,
    _marker: PhantomData<T>,
}

impl<T: Component> Default for AgentArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> AgentArena<T> {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            _marker: PhantomData,
        }
    }

    /// Insert or replace the record for `id`. Returns the handle.
    pub fn insert(&mut self, id: AgentId, value: T) -> Entity {
        if let Some(&entity) = self.index.get(&id) {
            if let Ok(slot) = self.world.query_one_mut::<&mut T>(entity) {
                *slot = value;
                return entity;
            }
        }
        let entity = self.world.spawn((id.clone(), value));
        self.index.insert(id, entity);
        entity
    }

    pub fn remove(&mut self, id: &AgentId) -> Option<T> {
        let entity = self.index.remove(id)?;
        let value = self.world.remove_one::<T>(entity).ok();
        let _ = self.world.despawn(entity);
        value
    }

    pub fn handle(&self, id: &AgentId) -> Option<Entity> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.index.contains_key(id)
    }

    pub fn get(&self, id: &AgentId) -> Option<hecs::Ref<'_, T>> {
        let entity = self.handle(id)?;
        self.world.get::<&T>(entity).ok()
    }

    pub fn get_mut(&mut self, id: &AgentId) -> Option<&mut T> {
        let entity = self.handle(id)?;
        self.world.query_one_mut::<&mut T>(entity).ok()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Registered ids in storage order
    pub fn ids(&self) -> Vec<AgentId> {
        self.world
            .query::<&AgentId>()
            .iter()
            .map(|(_, id)| id.clone())
            .collect()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&AgentId, &mut T)> + '_ {
        self.world
            .query_mut::<(&AgentId, &mut T)>()
            .into_iter()
            .map(|(_, (id, value))| (id, value))
    }
}

impl<T: Component + Clone> AgentArena<T> {
    pub fn get_cloned(&self, id: &AgentId) -> Option<T> {
        self.get(id).map(|value| (*value).clone())
    }
}
