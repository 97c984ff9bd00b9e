use crate::domain::{Amount, ChargeId, ChargeStatus, ClientId};

/// Shown wherever a charge points at a client that does not exist.
pub const CLIENT_NOT_FOUND: &str = "Cliente não encontrado";

/// One line of the charge report.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRow {
    pub id: ChargeId,
    pub client_id: ClientId,
    /// Resolved client name, or [`CLIENT_NOT_FOUND`]
    pub client_name: String,
    pub amount: Amount,
    pub description: String,
    pub due_date: String,
    pub status: ChargeStatus,
}

/// An overdue charge as listed in the financial report.
#[derive(Debug, Clone, PartialEq)]
pub struct OverdueEntry {
    pub charge_id: ChargeId,
    pub client_name: String,
    pub amount: Amount,
    pub due_date: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinancialSummary {
    pub client_count: usize,
    pub charge_count: usize,
    /// Sum of unpaid amounts
    pub pending: Amount,
    /// Sum of paid amounts
    pub received: Amount,
    pub overdue: Vec<OverdueEntry>,
}
