//! Core of pocketbook: a personal finance and calendar tracker.
//!
//! This crate holds everything the HTTP server works on:
//! - `Record` and `Event` entities and the validation of incoming bodies
//! - `CollectionStore`, an in-memory collection mirrored to a `Persistence` backend
//! - `ImageStore`, the upload directory plus its metadata index
//! - `PocketbookConfig`, the server settings

pub mod collection;
pub mod config;
pub mod entity;
pub mod error;
pub mod event;
pub mod images;
pub mod persistence;
pub mod record;

mod validate;

pub use collection::CollectionStore;
pub use config::PocketbookConfig;
pub use entity::Entity;
pub use error::{PocketError, PocketResult};
pub use event::{Event, NewEvent};
pub use images::{ImageDetails, ImageMeta, ImageStore};
pub use persistence::{JsonFile, MemoryPersistence, Persistence, Stored};
pub use record::{NewRecord, Record};
