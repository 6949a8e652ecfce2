//! Per-event unit of work over an [`EntityStore`]
//!
//! Handlers never write to the store directly. They load and save entities
//! through an [`EntityTx`], which buffers writes in a [`ChangeSet`] and serves
//! reads from the buffer first. The indexer commits the change set (and the
//! cursor) once the handler returns successfully, so a failed event leaves
//! the store untouched.

use crate::entity::Entity;
use crate::error::ProjectionError;
use crate::store::{ChangeSet, EntityStore};
use anyhow::{Context, Result};

pub struct EntityTx<'a> {
    store: &'a dyn EntityStore,
    changes: ChangeSet,
}

impl<'a> EntityTx<'a> {
    pub fn new(store: &'a dyn EntityStore) -> Self {
        Self {
            store,
            changes: ChangeSet::new(),
        }
    }

    /// Load an entity, seeing writes staged earlier in this unit of work.
    pub fn load<E: Entity>(&self, id: &str) -> Result<Option<E>> {
        let bytes = match self.changes.get(E::KIND, id) {
            Some(Some(staged)) => staged.to_vec(),
            Some(None) => return Ok(None),
            None => match self.store.get(E::KIND, id)? {
                Some(stored) => stored,
                None => return Ok(None),
            },
        };
        let entity = postcard::from_bytes(&bytes)
            .with_context(|| format!("Failed to deserialize {} '{}'", E::KIND, id))?;
        Ok(Some(entity))
    }

    /// Load an entity that must exist.
    ///
    /// A missing entity is a data-consistency failure: some earlier event
    /// that should have created it was never applied.
    pub fn require<E: Entity>(&self, id: &str) -> Result<E> {
        match self.load(id)? {
            Some(entity) => Ok(entity),
            None => Err(ProjectionError::MissingEntity {
                kind: E::KIND,
                id: id.to_string(),
            }
            .into()),
        }
    }

    pub fn exists<E: Entity>(&self, id: &str) -> Result<bool> {
        Ok(self.load::<E>(id)?.is_some())
    }

    /// Load an entity, or build a fresh one with `init`.
    ///
    /// The fresh entity is not staged; callers save it after updating.
    pub fn get_or_create<E: Entity>(&self, id: &str, init: impl FnOnce() -> E) -> Result<E> {
        Ok(match self.load(id)? {
            Some(entity) => entity,
            None => init(),
        })
    }

    /// Stage an upsert of the full entity.
    pub fn save<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let bytes = postcard::to_allocvec(entity)
            .with_context(|| format!("Failed to serialize {} '{}'", E::KIND, entity.id()))?;
        self.changes.put(E::KIND, entity.id(), bytes);
        Ok(())
    }

    /// Stage a hard delete.
    pub fn remove<E: Entity>(&mut self, id: &str) {
        self.changes.delete(E::KIND, id);
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    pub fn into_changes(self) -> ChangeSet {
        self.changes
    }
}
