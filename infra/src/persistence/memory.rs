use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use log::*;
use r2d2::ManageConnection;
use serde::{de::DeserializeOwned, Serialize};

use super::{ConcurrencyError, Storage};
use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

const VERSION_FIELD: &str = "_version";

/// Process local document storage with the same versioning rules as the
/// PostgreSQL backend. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocuments {
    docs: Arc<Mutex<BTreeMap<String, serde_json::Value>>>,
    versions: Arc<AtomicU64>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryConnectionManager {
    docs: MemoryDocuments,
}

impl MemoryDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<BTreeMap<String, serde_json::Value>>> {
        self.docs
            .lock()
            .map_err(|_| anyhow!("document map lock poisoned"))
    }

    fn next_version(&self) -> Version {
        let v = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        Version::from(format!("{:x}", v))
    }

    fn stored_version(json: &serde_json::Value) -> Version {
        json.get(VERSION_FIELD)
            .and_then(|v| v.as_str())
            .map(|v| Version::from(v.to_string()))
            .unwrap_or_default()
    }
}

impl Storage for MemoryDocuments {
    fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        let docs = self.lock()?;
        match docs.get(&id.to_string()) {
            Some(json) => Ok(Some(serde_json::from_value(json.clone())?)),
            None => Ok(None),
        }
    }

    fn load_all<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>> {
        let prefix = Id::<D>::prefix_pattern();
        let docs = self.lock()?;
        docs.range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(_, json)| -> Result<D> { Ok(serde_json::from_value(json.clone())?) })
            .collect()
    }

    fn save<D: Serialize + HasMeta>(&self, document: &mut D) -> Result<()> {
        let mut json = serde_json::to_value(&*document)?;
        let key = document.meta().id.to_string();
        let mut docs = self.lock()?;

        let expected = &document.meta().version;
        let current = docs.get(&key).map(Self::stored_version);
        let fresh = match current {
            None => expected.is_new(),
            Some(ref v) => !expected.is_new() && v == expected,
        };
        if !fresh {
            warn!(
                "Stale save of {}: stored {:?}, given {:?}",
                key, current, expected
            );
            return Err(ConcurrencyError.into());
        }

        let version = self.next_version();
        json.as_object_mut()
            .ok_or_else(|| anyhow!("document {} is not a JSON object", key))?
            .insert(
                VERSION_FIELD.to_string(),
                serde_json::Value::String(version.to_string()),
            );
        debug!("Save {} at version {}", key, version);
        docs.insert(key, json);
        document.meta_mut().version = version;
        Ok(())
    }

    fn delete<D: HasMeta>(&self, document: &D) -> Result<()> {
        let meta = document.meta();
        let key = meta.id.to_string();
        let mut docs = self.lock()?;
        match docs.get(&key).map(Self::stored_version) {
            Some(ref v) if v == &meta.version => {
                docs.remove(&key);
                debug!("Deleted {}", key);
                Ok(())
            }
            other => {
                warn!(
                    "Stale delete of {}: stored {:?}, given {:?}",
                    key, other, meta.version
                );
                Err(ConcurrencyError.into())
            }
        }
    }
}

impl MemoryConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ManageConnection for MemoryConnectionManager {
    type Connection = MemoryDocuments;
    type Error = Infallible;

    fn connect(&self) -> Result<MemoryDocuments, Infallible> {
        Ok(self.docs.clone())
    }

    fn is_valid(&self, _: &mut MemoryDocuments) -> Result<(), Infallible> {
        Ok(())
    }

    fn has_broken(&self, _: &mut MemoryDocuments) -> bool {
        false
    }
}
