//! In-memory collection mirrored to a persistence backend.

use std::marker::PhantomData;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::entity::Entity;
use crate::error::{PocketError, PocketResult};
use crate::persistence::{Persistence, Stored, load_or_empty};

/// An ordered collection of entities, loaded once and saved after every mutation.
///
/// Entries are kept as the JSON they were loaded from, so older or hand-edited
/// entries survive a save untouched. Only new entries go through `T`.
///
/// The persisted copy is a mirror, not a second source of truth: a failed save
/// is logged and the in-memory mutation stands.
pub struct CollectionStore<T: Entity> {
    entries: Vec<Value>,
    /// `None` once every id up to `u64::MAX` has been handed out
    next_id: Option<u64>,
    persistence: Box<dyn Persistence<Value>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> CollectionStore<T> {
    /// Load the collection. Unreadable or malformed data yields an empty store.
    pub fn load(persistence: impl Persistence<Value> + 'static) -> Self {
        let mut store = CollectionStore {
            entries: Vec::new(),
            next_id: Some(1),
            persistence: Box::new(persistence),
            _marker: PhantomData,
        };
        store.reload();
        store
    }

    /// Discard in-memory state and read it back from the backend.
    pub fn reload(&mut self) {
        let Stored { items, next_id } = load_or_empty(&*self.persistence);

        // Never hand out an id that is already taken, even if the counter is stale
        let after_max = match items.iter().filter_map(entry_id).max() {
            Some(max) => max.checked_add(1),
            None => Some(1),
        };
        self.next_id = after_max.map(|after_max| next_id.unwrap_or(1).max(after_max));
        self.entries = items;

        if self.next_id.is_none() {
            warn!(
                kind = T::KIND,
                location = %self.persistence.location(),
                "Highest possible id is taken, new entries will be rejected"
            );
        }

        debug!(
            kind = T::KIND,
            count = self.entries.len(),
            next_id = ?self.next_id,
            "Loaded collection"
        );
    }

    pub fn list(&self) -> &[Value] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Value> {
        self.entries.iter().find(|entry| entry_id(entry) == Some(id))
    }

    /// The id the next insert will receive.
    pub fn next_id(&self) -> Option<u64> {
        self.next_id
    }

    /// Assign the next id to `draft`, append it and save.
    pub fn insert(&mut self, draft: T::Draft) -> PocketResult<T> {
        let id = self
            .next_id
            .ok_or_else(|| PocketError::IdsExhausted(T::KIND.to_lowercase()))?;
        let entity = T::with_id(id, draft);
        let entry = serde_json::to_value(&entity)?;

        self.next_id = id.checked_add(1);
        self.entries.push(entry);
        self.save();
        Ok(entity)
    }

    /// Validate an untyped body and insert it. Nothing changes if validation fails.
    pub fn create(&mut self, body: Value) -> PocketResult<T> {
        let draft = T::parse_draft(body)?;
        self.insert(draft)
    }

    /// Remove the first entry with `id`, keeping the order of the rest.
    pub fn delete_by_id(&mut self, id: u64) -> PocketResult<Value> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry_id(entry) == Some(id))
            .ok_or_else(|| not_found::<T>(id))?;

        let removed = self.entries.remove(index);
        self.save();
        Ok(removed)
    }

    fn save(&self) {
        if let Err(e) = self.persistence.save(&self.entries, self.next_id) {
            error!(
                kind = T::KIND,
                location = %self.persistence.location(),
                error = %e,
                "Could not write data file; memory and disk now differ"
            );
        }
    }
}

/// The numeric `id` of a stored entry. Entries without one never match a delete.
fn entry_id(entry: &Value) -> Option<u64> {
    entry.get("id").and_then(Value::as_u64)
}

pub fn not_found<T: Entity>(id: impl std::fmt::Display) -> PocketError {
    PocketError::NotFound(format!("{} not found: {}", T::KIND, id))
}
