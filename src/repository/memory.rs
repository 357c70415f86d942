//! In-memory snapshot repository

use super::SnapshotRepository;
use crate::domain::Snapshot;
use crate::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryRepository {
    snapshot: RwLock<Snapshot>,
}

impl InMemoryRepository {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Copy of the current contents
    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl SnapshotRepository for InMemoryRepository {
    async fn load(&self) -> Result<Snapshot> {
        Ok(self.snapshot.read().await.clone())
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.write().await = snapshot.clone();
        Ok(())
    }
}
