use std::sync::Arc;

use anyhow::Result;
use pocketbook_core::{CollectionStore, Event, ImageStore, JsonFile, PocketbookConfig, Record};
use serde_json::Value;
use tokio::sync::Mutex;

/// Shared application state
///
/// Each store is loaded once at startup and then only changed through
/// handlers. Handlers hold the lock across mutate-and-save, so ids are handed
/// out one at a time.
#[derive(Clone)]
pub struct AppState {
    pub records: Arc<Mutex<CollectionStore<Record>>>,
    pub events: Arc<Mutex<CollectionStore<Event>>>,
    pub images: Arc<Mutex<ImageStore>>,
}

impl AppState {
    /// Load every store from the files named by `config`.
    pub fn open(config: &PocketbookConfig) -> Result<Self> {
        let records = CollectionStore::load(JsonFile::<Value>::new(config.records_file()));
        let events = CollectionStore::load(JsonFile::<Value>::new(config.events_file()));
        let images = ImageStore::open(
            config.upload_dir(),
            JsonFile::new(config.image_index_file()),
        )?;

        Ok(Self::new(records, events, images))
    }

    pub fn new(
        records: CollectionStore<Record>,
        events: CollectionStore<Event>,
        images: ImageStore,
    ) -> Self {
        AppState {
            records: Arc::new(Mutex::new(records)),
            events: Arc::new(Mutex::new(events)),
            images: Arc::new(Mutex::new(images)),
        }
    }
}
