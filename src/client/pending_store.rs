//! Persistence for the one purchase a client may have in flight.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;

use crate::domain::foundation::{MovieId, Timestamp};
use crate::domain::purchase::TxRef;

use super::ClientError;

/// A checkout the user left for and has not yet been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPurchase {
    pub movie_id: MovieId,
    pub tx_ref: TxRef,
    pub started_at: Timestamp,
}

impl PendingPurchase {
    pub fn new(movie_id: MovieId, tx_ref: TxRef, started_at: Timestamp) -> Self {
        Self {
            movie_id,
            tx_ref,
            started_at,
        }
    }
}

/// Holds at most one pending purchase.
#[async_trait]
pub trait PendingPurchaseStore: Send + Sync {
    async fn load(&self) -> Result<Option<PendingPurchase>, ClientError>;

    /// Replaces whatever was stored.
    async fn save(&self, pending: &PendingPurchase) -> Result<(), ClientError>;

    async fn clear(&self) -> Result<(), ClientError>;
}

/// JSON file store, the desktop stand-in for browser session storage.
///
/// A missing file means nothing is pending. A file that no longer parses
/// is treated the same way so one bad write cannot wedge the poller.
#[derive(Debug, Clone)]
pub struct FilePendingStore {
    path: PathBuf,
}

impl FilePendingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PendingPurchaseStore for FilePendingStore {
    async fn load(&self) -> Result<Option<PendingPurchase>, ClientError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::Storage(e.to_string())),
        };

        match serde_json::from_slice(&bytes) {
            Ok(pending) => Ok(Some(pending)),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable pending purchase"
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, pending: &PendingPurchase) -> Result<(), ClientError> {
        let json =
            serde_json::to_vec_pretty(pending).map_err(|e| ClientError::Storage(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Storage(e.to_string()))?;
        }
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| ClientError::Storage(e.to_string()))
    }

    async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Storage(e.to_string())),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryPendingStore {
    slot: Mutex<Option<PendingPurchase>>,
}

impl InMemoryPendingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(pending: PendingPurchase) -> Self {
        Self {
            slot: Mutex::new(Some(pending)),
        }
    }

    pub fn current(&self) -> Option<PendingPurchase> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PendingPurchaseStore for InMemoryPendingStore {
    async fn load(&self) -> Result<Option<PendingPurchase>, ClientError> {
        Ok(self.current())
    }

    async fn save(&self, pending: &PendingPurchase) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(pending.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
