//! [`RawBlobSink`] adapter over [`StoragePort`].
//!
//! `focus-registry`'s `Extractor` trait writes through a `RawBlobSink` it
//! doesn't otherwise know the shape of; this is the one real
//! implementation, handing every captured blob straight to the storage
//! backend a run is configured with.

use std::sync::Arc;

use async_trait::async_trait;

use focus_core::error::Result;
use focus_core::raw_blob::RawBlob;
use focus_registry::RawBlobSink;
use focus_store::StoragePort;

pub struct StorageRawBlobSink {
    storage: Arc<dyn StoragePort>,
}

impl StorageRawBlobSink {
    pub fn new(storage: Arc<dyn StoragePort>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RawBlobSink for StorageRawBlobSink {
    async fn store(&self, blob: RawBlob) -> Result<()> {
        self.storage.save_raw_blob(&blob).await?;
        Ok(())
    }
}
