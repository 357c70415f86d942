//! Snapshot storage (Repository pattern)

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRepository;
pub use memory::InMemoryRepository;

use crate::domain::Snapshot;
use crate::error::Result;
use async_trait::async_trait;

/// Source and sink of the dataset a routing cycle operates on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Load the current snapshot
    async fn load(&self) -> Result<Snapshot>;

    /// Replace the stored snapshot
    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}
