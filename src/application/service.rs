use chrono::NaiveDate;

use crate::domain::{
    Charge, ChargeId, Client, ClientId, OverdueRule, parse_amount, timestamp,
};
use crate::storage::{Records, Store};

use super::{AppError, CLIENT_NOT_FOUND, ChargeRow, FinancialSummary, OverdueEntry};

/// The client and charge ledger.
///
/// Both collections live in memory for the lifetime of the ledger. Every
/// mutation rewrites the whole store before returning; if that write fails the
/// in-memory change is undone, so memory never runs ahead of storage.
pub struct Ledger<S: Store> {
    store: S,
    records: Records,
    next_client_id: ClientId,
    next_charge_id: ChargeId,
    overdue_rule: OverdueRule,
}

impl<S: Store> Ledger<S> {
    /// Open a ledger over `store`, loading whatever it already holds.
    pub async fn open(store: S) -> Result<Self, AppError> {
        let mut ledger = Self {
            store,
            records: Records::default(),
            next_client_id: 1,
            next_charge_id: 1,
            overdue_rule: OverdueRule::default(),
        };
        ledger.load().await?;
        Ok(ledger)
    }

    pub fn with_overdue_rule(mut self, rule: OverdueRule) -> Self {
        self.overdue_rule = rule;
        self
    }

    pub fn overdue_rule(&self) -> OverdueRule {
        self.overdue_rule
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace the in-memory collections with the store's contents.
    ///
    /// Id counters restart after the highest id present, so ids stay unique
    /// even when the stored sequence has gaps.
    pub async fn load(&mut self) -> Result<(), AppError> {
        let records = self.store.load().await?;
        self.next_client_id = id_after(records.clients.iter().map(|c| c.id).max().unwrap_or(0))?;
        self.next_charge_id = id_after(records.charges.iter().map(|c| c.id).max().unwrap_or(0))?;
        self.records = records;
        Ok(())
    }

    /// Write both collections to the store, replacing its contents.
    pub async fn save(&self) -> Result<(), AppError> {
        self.store.save(&self.records).await?;
        Ok(())
    }

    // ========================
    // Clients
    // ========================

    /// Register a client. Nothing is validated and duplicates are allowed.
    pub async fn add_client(
        &mut self,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<Client, AppError> {
        let following = id_after(self.next_client_id)?;
        let client = Client::new(self.next_client_id, name, email, phone);
        self.records.clients.push(client.clone());

        if let Err(e) = self.save().await {
            self.records.clients.pop();
            return Err(e);
        }

        self.next_client_id = following;
        tracing::info!(client_id = client.id, name = %client.name, "client added");
        Ok(client)
    }

    pub fn list_clients(&self) -> &[Client] {
        &self.records.clients
    }

    /// First client with the given id.
    pub fn find_client(&self, id: ClientId) -> Option<&Client> {
        self.records.clients.iter().find(|c| c.id == id)
    }

    /// Name of the client, or the "not found" placeholder for a dangling id.
    pub fn client_name(&self, id: ClientId) -> &str {
        self.find_client(id)
            .map(|c| c.name.as_str())
            .unwrap_or(CLIENT_NOT_FOUND)
    }

    // ========================
    // Charges
    // ========================

    /// Create an unpaid charge. `amount` must parse as a number; the client id
    /// is not checked.
    pub async fn add_charge(
        &mut self,
        client_id: ClientId,
        amount: &str,
        description: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Result<Charge, AppError> {
        let amount = parse_amount(amount)?;

        let following = id_after(self.next_charge_id)?;
        let charge = Charge::new(self.next_charge_id, client_id, amount, description, due_date);
        self.records.charges.push(charge.clone());

        if let Err(e) = self.save().await {
            self.records.charges.pop();
            return Err(e);
        }

        self.next_charge_id = following;
        if self.find_client(client_id).is_none() {
            tracing::warn!(
                charge_id = charge.id,
                client_id,
                "charge added for a client that does not exist"
            );
        }
        tracing::info!(charge_id = charge.id, client_id, amount, "charge added");
        Ok(charge)
    }

    /// Mark the first charge with `id` as paid now. Returns `None`, and writes
    /// nothing, when no such charge exists.
    pub async fn mark_paid(&mut self, id: ChargeId) -> Result<Option<Charge>, AppError> {
        let Some(index) = self.records.charges.iter().position(|c| c.id == id) else {
            return Ok(None);
        };

        let previous = self.records.charges[index].clone();
        self.records.charges[index].pay(timestamp::now());

        if let Err(e) = self.save().await {
            self.records.charges[index] = previous;
            return Err(e);
        }

        tracing::info!(charge_id = id, "charge paid");
        Ok(Some(self.records.charges[index].clone()))
    }

    pub fn list_charges(&self) -> &[Charge] {
        &self.records.charges
    }

    /// First charge with the given id.
    pub fn find_charge(&self, id: ChargeId) -> Option<&Charge> {
        self.records.charges.iter().find(|c| c.id == id)
    }

    /// Charges owned by `client_id`, in insertion order.
    pub fn charges_for_client(&self, client_id: ClientId) -> Vec<&Charge> {
        self.records
            .charges
            .iter()
            .filter(|c| c.client_id == client_id)
            .collect()
    }

    /// Charges whose client exists and whose name contains `filter`, ignoring
    /// case. An empty filter matches every charge with an existing client.
    pub fn search_charges(&self, filter: &str) -> Vec<&Charge> {
        let needle = filter.trim().to_lowercase();
        self.records
            .charges
            .iter()
            .filter(|charge| match self.find_client(charge.client_id) {
                Some(client) => needle.is_empty() || client.name.to_lowercase().contains(&needle),
                None => false,
            })
            .collect()
    }

    /// Unpaid charges, in insertion order.
    pub fn pending_charges(&self) -> Vec<&Charge> {
        self.records.charges.iter().filter(|c| !c.paid).collect()
    }

    /// Unpaid charges past their due date as of today.
    pub fn overdue_charges(&self) -> Vec<&Charge> {
        self.overdue_charges_on(timestamp::today())
    }

    /// Unpaid charges past their due date as of `today`.
    pub fn overdue_charges_on(&self, today: NaiveDate) -> Vec<&Charge> {
        self.records
            .charges
            .iter()
            .filter(|c| self.overdue_rule.is_overdue(c, today))
            .collect()
    }

    // ========================
    // Report queries
    // ========================

    /// Every charge with its client name resolved.
    pub fn charge_report(&self) -> Vec<ChargeRow> {
        self.records
            .charges
            .iter()
            .map(|charge| ChargeRow {
                id: charge.id,
                client_id: charge.client_id,
                client_name: self.client_name(charge.client_id).to_string(),
                amount: charge.amount,
                description: charge.description.clone(),
                due_date: charge.due_date.clone(),
                status: charge.status(),
            })
            .collect()
    }

    pub fn financial_summary(&self) -> FinancialSummary {
        self.financial_summary_on(timestamp::today())
    }

    /// Totals and the overdue list as of `today`.
    pub fn financial_summary_on(&self, today: NaiveDate) -> FinancialSummary {
        let charges = &self.records.charges;

        FinancialSummary {
            client_count: self.records.clients.len(),
            charge_count: charges.len(),
            pending: charges.iter().filter(|c| !c.paid).map(|c| c.amount).sum(),
            received: charges.iter().filter(|c| c.paid).map(|c| c.amount).sum(),
            overdue: self
                .overdue_charges_on(today)
                .into_iter()
                .map(|charge| OverdueEntry {
                    charge_id: charge.id,
                    client_name: self.client_name(charge.client_id).to_string(),
                    amount: charge.amount,
                    due_date: charge.due_date.clone(),
                })
                .collect(),
        }
    }
}

fn id_after(id: i64) -> Result<i64, AppError> {
    id.checked_add(1)
        .ok_or_else(|| AppError::Storage(anyhow::anyhow!("No ids left after {}", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    async fn ledger() -> Ledger<MemoryStore> {
        Ledger::open(MemoryStore::new()).await.unwrap()
    }

    #[tokio::test]
    async fn test_ids_follow_highest_loaded_id() {
        let mut seeded = ledger().await;
        seeded.add_client("A", "", "").await.unwrap();
        seeded.add_client("B", "", "").await.unwrap();
        seeded.add_client("C", "", "").await.unwrap();

        // Simulate a hand-edited store where the middle client was removed
        let mut records = seeded.store().snapshot().unwrap();
        records.clients.remove(1);

        let mut ledger = Ledger::open(MemoryStore::with_records(records)).await.unwrap();
        let client = ledger.add_client("D", "", "").await.unwrap();
        assert_eq!(client.id, 4);
    }

    #[tokio::test]
    async fn test_exhausted_ids_are_a_storage_error() {
        let mut records = Records::default();
        records.clients.push(Client::new(i64::MAX, "Last", "", ""));
        let result = Ledger::open(MemoryStore::with_records(records)).await;
        assert!(matches!(result, Err(AppError::Storage(_))));

        let mut records = Records::default();
        records.charges.push(Charge::new(i64::MAX - 1, 1, 1.0, "", "01/01/2030"));
        let mut ledger = Ledger::open(MemoryStore::with_records(records)).await.unwrap();
        let result = ledger.add_charge(1, "10", "x", "01/01/2030").await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(ledger.list_charges().len(), 1);
        assert_eq!(ledger.store().save_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_client_returns_first_duplicate() {
        let mut records = Records::default();
        records.clients.push(Client::new(7, "First", "", ""));
        records.clients.push(Client::new(7, "Second", "", ""));

        let ledger = Ledger::open(MemoryStore::with_records(records)).await.unwrap();
        assert_eq!(ledger.find_client(7).unwrap().name, "First");
    }

    #[tokio::test]
    async fn test_invalid_amount_does_not_persist() {
        let mut ledger = ledger().await;
        let err = ledger.add_charge(1, "dez reais", "x", "01/01/2030").await;

        assert!(matches!(err, Err(AppError::InvalidAmount(_))));
        assert!(ledger.list_charges().is_empty());
        assert_eq!(ledger.store().save_count().unwrap(), 0);

        // The failed attempt does not consume an id
        let charge = ledger.add_charge(1, "10", "x", "01/01/2030").await.unwrap();
        assert_eq!(charge.id, 1);
    }

    #[tokio::test]
    async fn test_every_mutation_saves() {
        let mut ledger = ledger().await;
        ledger.add_client("A", "", "").await.unwrap();
        ledger.add_charge(1, "10", "x", "01/01/2030").await.unwrap();
        ledger.mark_paid(1).await.unwrap();
        assert_eq!(ledger.store().save_count().unwrap(), 3);

        ledger.mark_paid(99).await.unwrap();
        assert_eq!(ledger.store().save_count().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_client_name_placeholder() {
        let mut ledger = ledger().await;
        ledger.add_client("Ana", "", "").await.unwrap();
        assert_eq!(ledger.client_name(1), "Ana");
        assert_eq!(ledger.client_name(2), CLIENT_NOT_FOUND);
    }
}
