use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};

use super::{Records, Store};

/// In-process store. Clones share the same records, so a test can keep one handle
/// and hand another to a ledger.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<Records>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `records`.
    pub fn with_records(records: Records) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            saves: Arc::default(),
        }
    }

    /// The records as last saved.
    pub fn snapshot(&self) -> Result<Records> {
        self.records
            .lock()
            .map(|records| records.clone())
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// How many times `save` has been called.
    pub fn save_count(&self) -> Result<usize> {
        self.saves
            .lock()
            .map(|saves| *saves)
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

impl Store for MemoryStore {
    async fn load(&self) -> Result<Records> {
        self.snapshot()
    }

    async fn save(&self, records: &Records) -> Result<()> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *stored = records.clone();
        drop(stored);

        let mut saves = self
            .saves
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        *saves += 1;
        Ok(())
    }
}
