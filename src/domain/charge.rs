use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::timestamp::{self, Timestamp, serde_timestamp};
use super::{Amount, ClientId};

pub type ChargeId = i64;

/// A charge ("cobrança") owed by a client.
///
/// The owning client is referenced by id only and may not exist; readers must
/// handle a dangling reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    #[serde(rename = "id_cliente")]
    pub client_id: ClientId,
    #[serde(rename = "valor")]
    pub amount: Amount,
    #[serde(rename = "descricao")]
    pub description: String,
    /// Due date as entered, expected `DD/MM/YYYY`
    #[serde(rename = "vencimento")]
    pub due_date: String,
    #[serde(rename = "data_criacao", with = "serde_timestamp")]
    pub created_at: Timestamp,
    #[serde(rename = "pago")]
    pub paid: bool,
    /// Set once the charge is paid
    #[serde(
        rename = "data_pagamento",
        with = "serde_timestamp::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub paid_at: Option<Timestamp>,
}

impl Charge {
    /// Create an unpaid charge. The id must be allocated by the ledger.
    pub fn new(
        id: ChargeId,
        client_id: ClientId,
        amount: Amount,
        description: impl Into<String>,
        due_date: impl Into<String>,
    ) -> Self {
        Self {
            id,
            client_id,
            amount,
            description: description.into(),
            due_date: due_date.into(),
            created_at: timestamp::now(),
            paid: false,
            paid_at: None,
        }
    }

    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = created_at;
        self
    }

    /// Mark as paid at the given time. Paying twice refreshes the payment time.
    pub fn pay(&mut self, at: Timestamp) {
        self.paid = true;
        self.paid_at = Some(at);
    }

    /// The due date as a calendar date, if it is well formed.
    pub fn due_on(&self) -> Option<NaiveDate> {
        timestamp::parse_date(&self.due_date).ok()
    }

    pub fn status(&self) -> ChargeStatus {
        if self.paid {
            ChargeStatus::Paid
        } else {
            ChargeStatus::Pending
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeStatus {
    Paid,
    Pending,
}

impl ChargeStatus {
    /// Label printed in reports.
    pub fn label(&self) -> &'static str {
        match self {
            ChargeStatus::Paid => "Pago",
            ChargeStatus::Pending => "Pendente",
        }
    }
}

impl std::fmt::Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.label())
    }
}

/// How "past due" is decided for an unpaid charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverdueRule {
    /// Compare calendar dates. Malformed due dates are never overdue.
    #[default]
    Chronological,
    /// Compare the `DD/MM/YYYY` strings as text, as older installations did.
    /// "01/12/2030" sorts before "02/01/2020" under this rule.
    Lexicographic,
}

impl OverdueRule {
    pub fn is_overdue(&self, charge: &Charge, today: NaiveDate) -> bool {
        if charge.paid {
            return false;
        }
        match self {
            OverdueRule::Chronological => match charge.due_on() {
                Some(due) => due < today,
                None => {
                    tracing::warn!(
                        charge_id = charge.id,
                        due_date = %charge.due_date,
                        "due date is not DD/MM/YYYY, not treating charge as overdue"
                    );
                    false
                }
            },
            OverdueRule::Lexicographic => {
                charge.due_date.as_str() < timestamp::format_date(&today).as_str()
            }
        }
    }
}
