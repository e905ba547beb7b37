//! Whole-value key-value persistence.
//!
//! Every collection lives as one JSON array under its own key. Writes replace
//! the stored value wholesale; there are no partial updates and no versioning,
//! so the last writer wins.

use async_trait::async_trait;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::model::Collection;

mod memory;
mod sqlite;
mod upstash;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use upstash::UpstashStore;

const PROBE_KEY: &str = "test-key";

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Short backend name, reported by the connectivity probe.
    fn backend(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Reads a collection, treating a never-written key as an empty array.
pub async fn read_collection<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    let key = collection.key();
    match store.get(key).await? {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                key: key.to_string(),
                source,
            })
        }
        _ => Ok(Vec::new()),
    }
}

pub async fn write_collection<T: Serialize>(
    store: &dyn KeyValueStore,
    collection: Collection,
    items: &[T],
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(items)?;
    store.set(collection.key(), &raw).await
}

/// Reads the probe key and then overwrites it, returning what was there before.
pub async fn probe(store: &dyn KeyValueStore) -> Result<String, StoreError> {
    let previous = store
        .get(PROBE_KEY)
        .await?
        .unwrap_or_else(|| String::from("No value found"));

    let marker = format!("Connection working at {}", Utc::now().to_rfc3339());
    store.set(PROBE_KEY, &marker).await?;

    Ok(previous)
}
