use async_trait::async_trait;

use crate::error::StoreError;
use crate::item::ItemId;

/// Where iCal files are read from and written to (usually a CalDAV server)
///
/// Retries and timeouts, if any, are up to the implementors. Writing the same content twice must be harmless.
#[async_trait]
pub trait TaskStore {
    /// Returns the full iCal text of an item
    async fn fetch(&self, id: &ItemId) -> Result<String, StoreError>;

    /// Creates or replaces an item.
    /// This must be able to create an item at an identifier that does not exist yet.
    async fn write(&mut self, id: &ItemId, content: String) -> Result<(), StoreError>;
}
