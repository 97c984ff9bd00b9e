// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::NaiveDate;
use cobranca::application::Ledger;
use cobranca::storage::{JsonStore, MemoryStore};
use tempfile::TempDir;

/// Helper to create a ledger over JSON files in a temporary directory
pub async fn json_ledger() -> Result<(Ledger<JsonStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let ledger = Ledger::open(JsonStore::new(temp_dir.path())).await?;
    Ok((ledger, temp_dir))
}

/// Helper to create a ledger over an in-memory store
pub async fn memory_ledger() -> Result<Ledger<MemoryStore>> {
    Ok(Ledger::open(MemoryStore::new()).await?)
}

/// Helper to parse a DD/MM/YYYY date
pub fn date(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%d/%m/%Y").unwrap()
}

/// Test fixture: a few clients with charges in different states
pub struct StandardClients;

impl StandardClients {
    /// Clients 1 (Ana), 2 (Bruno), 3 (Carla)
    pub async fn create<S: cobranca::storage::Store>(ledger: &mut Ledger<S>) -> Result<()> {
        ledger
            .add_client("Ana Souza", "ana@example.com", "11 91111-1111")
            .await?;
        ledger
            .add_client("Bruno Lima", "bruno@example.com", "11 92222-2222")
            .await?;
        ledger
            .add_client("Carla Dias", "carla@example.com", "11 93333-3333")
            .await?;
        Ok(())
    }

    /// Charges 1..=3: 100.00 (Ana, paid), 50.00 (Bruno), 25.00 (Ana)
    pub async fn create_with_charges<S: cobranca::storage::Store>(
        ledger: &mut Ledger<S>,
    ) -> Result<()> {
        Self::create(ledger).await?;
        ledger
            .add_charge(1, "100.00", "Mensalidade março", "10/03/2024")
            .await?;
        ledger
            .add_charge(2, "50", "Material escolar", "15/03/2024")
            .await?;
        ledger
            .add_charge(1, "25.0", "Mensalidade abril", "10/04/2024")
            .await?;
        ledger.mark_paid(1).await?;
        Ok(())
    }
}
