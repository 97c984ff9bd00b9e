use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::Ledger;
use crate::domain::timestamp::{self, Timestamp, format_timestamp, serde_timestamp};
use crate::domain::{Charge, Client, format_amount};
use crate::storage::Store;

/// Full ledger snapshot for JSON export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    #[serde(with = "serde_timestamp")]
    pub exported_at: Timestamp,
    #[serde(rename = "clientes")]
    pub clients: Vec<Client>,
    #[serde(rename = "cobrancas")]
    pub charges: Vec<Charge>,
}

/// Exporter for converting ledger data to CSV and JSON
pub struct Exporter<'a, S: Store> {
    ledger: &'a Ledger<S>,
}

impl<'a, S: Store> Exporter<'a, S> {
    pub fn new(ledger: &'a Ledger<S>) -> Self {
        Self { ledger }
    }

    /// Export clients to CSV format
    pub fn export_clients_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["id", "nome", "email", "telefone", "data_cadastro"])?;

        let mut count = 0;
        for client in self.ledger.list_clients() {
            csv_writer.write_record([
                client.id.to_string(),
                client.name.clone(),
                client.email.clone(),
                client.phone.clone(),
                format_timestamp(&client.registered_at),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export charges to CSV format, with the client name resolved
    pub fn export_charges_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record([
            "id",
            "id_cliente",
            "cliente",
            "valor",
            "descricao",
            "vencimento",
            "data_criacao",
            "pago",
            "data_pagamento",
        ])?;

        let mut count = 0;
        for charge in self.ledger.list_charges() {
            csv_writer.write_record([
                charge.id.to_string(),
                charge.client_id.to_string(),
                self.ledger.client_name(charge.client_id).to_string(),
                format_amount(charge.amount),
                charge.description.clone(),
                charge.due_date.clone(),
                format_timestamp(&charge.created_at),
                charge.paid.to_string(),
                charge
                    .paid_at
                    .as_ref()
                    .map(format_timestamp)
                    .unwrap_or_default(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole ledger as a JSON snapshot
    pub fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: timestamp::now(),
            clients: self.ledger.list_clients().to_vec(),
            charges: self.ledger.list_charges().to_vec(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
