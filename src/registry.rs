//! Subscription registry: which entities are currently traced
//!
//! Membership is by reference identity and checked on every event, so the
//! map is behind an `RwLock`: concurrent membership reads, exclusive
//! mutation. Visibility of a concurrent add/remove is best-effort; the
//! structure itself is never corrupted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::entity::{Entity, EntityId};

/// Identity-keyed set of traced entities. Mapping each entity to itself
/// keeps membership O(1) while letting removal hand back the exact
/// reference that was registered.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<HashMap<EntityId, Entity>>,
    /// Identities that must never be registered: the owning session and
    /// the current output sink. Tracing either would loop the engine back
    /// onto itself.
    exclusions: RwLock<Vec<EntityId>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_exclusions(&self, ids: Vec<EntityId>) {
        *self
            .exclusions
            .write()
            .unwrap_or_else(PoisonError::into_inner) = ids;
    }

    fn is_excluded(&self, id: EntityId) -> bool {
        self.exclusions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Register one entity. Self-excluded entities are silently skipped;
    /// the entity is returned either way.
    pub fn add(&self, entity: Entity) -> Entity {
        let id = entity.identity();
        if self.is_excluded(id) {
            tracing::debug!(id = id.as_usize(), "refusing to trace engine-owned object");
            return entity;
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entity.clone());
        tracing::trace!(id = id.as_usize(), "entity registered");
        entity
    }

    pub fn add_all(&self, entities: &[Entity]) -> Vec<Entity> {
        entities.iter().map(|e| self.add(e.clone())).collect()
    }

    /// Register an entity only for the extent of `body`. An entity that
    /// was already registered stays registered throughout and afterward;
    /// a newly added one is removed even if `body` unwinds.
    pub fn add_scoped<R>(&self, entity: Entity, body: impl FnOnce() -> R) -> R {
        self.add_all_scoped(std::slice::from_ref(&entity), body)
    }

    /// Batch scoped registration; only entities newly added here are
    /// removed afterward.
    pub fn add_all_scoped<R>(&self, entities: &[Entity], body: impl FnOnce() -> R) -> R {
        let mut added = Vec::new();
        for entity in entities {
            let id = entity.identity();
            if self.is_excluded(id) || self.contains(id) {
                continue;
            }
            self.add(entity.clone());
            added.push(id);
        }
        let _guard = ScopedRemoval {
            registry: self,
            ids: added,
        };
        body()
    }

    /// Unregister one entity, returning it if it was present.
    pub fn remove(&self, entity: &Entity) -> Option<Entity> {
        self.remove_id(entity.identity())
    }

    pub(crate) fn remove_id(&self, id: EntityId) -> Option<Entity> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            tracing::trace!(id = id.as_usize(), "entity unregistered");
        }
        removed
    }

    pub fn remove_all(&self, entities: &[Entity]) -> Vec<Entity> {
        entities.iter().filter_map(|e| self.remove(e)).collect()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    pub fn contains_entity(&self, entity: &Entity) -> bool {
        self.contains(entity.identity())
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes scope-added entities on drop, unwinding included.
struct ScopedRemoval<'a> {
    registry: &'a Registry,
    ids: Vec<EntityId>,
}

impl Drop for ScopedRemoval<'_> {
    fn drop(&mut self) {
        for id in &self.ids {
            self.registry.remove_id(*id);
        }
    }
}
