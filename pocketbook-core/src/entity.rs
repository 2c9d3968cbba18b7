//! Shared shape of the entities kept in a [`CollectionStore`](crate::collection::CollectionStore).

use serde::Serialize;
use serde_json::Value;

use crate::error::PocketResult;

/// An entity with a numeric id that lives in a JSON-backed collection.
///
/// The store only builds typed entities for new entries. What it loads from
/// disk stays as plain JSON.
pub trait Entity: Clone + Serialize + Send + Sync + 'static {
    /// Validated fields of a new entity, before an id is assigned.
    type Draft;

    /// Human-readable kind, used in log lines and "not found" messages.
    const KIND: &'static str;

    /// Build the entity from a draft once the store has picked its id.
    fn with_id(id: u64, draft: Self::Draft) -> Self;

    /// Validate an untyped request body into a draft.
    fn parse_draft(body: Value) -> PocketResult<Self::Draft>;
}
