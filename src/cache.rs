//! This module provides a local store for iCal files
//!
//! It is mostly useful for tests, or to work on files that have been downloaded beforehand.

use std::path::PathBuf;
use std::path::Path;
use std::error::Error;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use async_trait::async_trait;

use crate::error::StoreError;
use crate::item::ItemId;
use crate::mock_behaviour::MockBehaviour;
use crate::traits::TaskStore;


/// A [`TaskStore`] that keeps its items in memory, and that can be saved to a JSON file
#[derive(Debug, Default)]
pub struct Cache {
    backing_file: Option<PathBuf>,
    data: CachedData,

    mock_behaviour: Option<Arc<Mutex<MockBehaviour>>>,
}

#[derive(Default, Debug, PartialEq, Serialize, Deserialize)]
struct CachedData {
    items: HashMap<ItemId, String>,
}

impl Cache {
    /// Initialize an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a cache from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let data = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self{
            backing_file: Some(PathBuf::from(path)),
            data,
            mock_behaviour: None,
        })
    }

    /// Set the file [`Self::save_to_file`] will write to
    pub fn set_backing_file(&mut self, path: &Path) {
        self.backing_file = Some(PathBuf::from(path));
    }

    /// Store the current Cache to its backing file
    pub fn save_to_file(&self) -> Result<(), Box<dyn Error>> {
        let path = match &self.backing_file {
            None => return Err("This cache has no backing file".into()),
            Some(path) => path,
        };
        let file = std::fs::File::create(path)
            .map_err(|err| format!("Unable to save file {:?}: {}", path, err))?;
        serde_json::to_writer(file, &self.data)?;
        Ok(())
    }

    /// Make this cache fail on purpose, the way `behaviour` tells
    pub fn set_mock_behaviour(&mut self, behaviour: Option<Arc<Mutex<MockBehaviour>>>) {
        self.mock_behaviour = behaviour;
    }

    /// Add (or replace) an item, bypassing any mock behaviour
    pub fn insert(&mut self, id: ItemId, content: String) {
        self.data.items.insert(id, content);
    }

    pub fn get(&self, id: &ItemId) -> Option<&str> {
        self.data.items.get(id).map(|content| content.as_str())
    }

    pub fn len(&self) -> usize {
        self.data.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.items.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ItemId> {
        self.data.items.keys()
    }

    fn check_behaviour<F>(&self, check: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MockBehaviour) -> Result<(), StoreError>,
    {
        match &self.mock_behaviour {
            None => Ok(()),
            Some(behaviour) => {
                let mut behaviour = behaviour.lock()
                    .map_err(|_| "Mock behaviour is poisoned")?;
                check(&mut behaviour)
            },
        }
    }
}

#[async_trait]
impl TaskStore for Cache {
    async fn fetch(&self, id: &ItemId) -> Result<String, StoreError> {
        self.check_behaviour(|b| b.can_fetch())?;
        match self.data.items.get(id) {
            None => Err(format!("No item {} in cache", id).into()),
            Some(content) => Ok(content.clone()),
        }
    }

    async fn write(&mut self, id: &ItemId, content: String) -> Result<(), StoreError> {
        self.check_behaviour(|b| b.can_write())?;
        log::debug!("Writing {} to the cache", id);
        self.data.items.insert(id.clone(), content);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_and_write() {
        let mut cache = Cache::new();
        let id = ItemId::from("tasks/abc.ics");
        assert!(cache.fetch(&id).await.is_err());

        cache.write(&id, "BEGIN:VCALENDAR".to_string()).await.unwrap();
        assert_eq!(cache.fetch(&id).await.unwrap(), "BEGIN:VCALENDAR");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_mocked_failures() {
        let mut cache = Cache::new();
        let id = ItemId::from("tasks/abc.ics");
        cache.insert(id.clone(), "content".to_string());

        let behaviour = Arc::new(Mutex::new(MockBehaviour { write_behaviour: (0, 1), ..MockBehaviour::default() }));
        cache.set_mock_behaviour(Some(Arc::clone(&behaviour)));

        assert!(cache.fetch(&id).await.is_ok());
        assert!(cache.write(&id, "other".to_string()).await.is_err());
        assert_eq!(cache.get(&id), Some("content"));
        assert!(cache.write(&id, "other".to_string()).await.is_ok());
        assert_eq!(cache.get(&id), Some("other"));
    }

    #[test]
    fn serde_cache() {
        let cache_path = std::env::temp_dir().join("caldav-todo-completer-cache.json");

        let mut cache = Cache::new();
        cache.set_backing_file(&cache_path);
        cache.insert(ItemId::from("tasks/abc.ics"), "BEGIN:VCALENDAR\r\nEND:VCALENDAR".to_string());
        cache.save_to_file().unwrap();

        let retrieved_cache = Cache::from_file(&cache_path).unwrap();
        assert_eq!(cache.data, retrieved_cache.data);
        let _ = std::fs::remove_file(&cache_path);
    }
}
