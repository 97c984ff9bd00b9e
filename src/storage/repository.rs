use anyhow::{Context, Result};
use sqlx::{Row, SqlitePool};

use crate::domain::Charge;
use crate::domain::Client;
use crate::domain::timestamp::{format_timestamp, parse_timestamp};

use super::{MIGRATION_001_INITIAL, Records, Store};

/// SQLite-backed store. Each save rewrites both tables inside one transaction,
/// so clients and charges can never be persisted out of step.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new store with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Open the database file at `path`, creating and migrating it if needed.
    pub async fn init(path: &str) -> Result<Self> {
        let store = Self::connect(&format!("sqlite:{}?mode=rwc", path)).await?;
        store.migrate().await?;
        Ok(store)
    }

    fn row_to_client(row: &sqlx::sqlite::SqliteRow) -> Result<Client> {
        let registered_at: String = row.get("data_cadastro");

        Ok(Client {
            id: row.get("id"),
            name: row.get("nome"),
            email: row.get("email"),
            phone: row.get("telefone"),
            registered_at: parse_timestamp(&registered_at)
                .context("Invalid data_cadastro timestamp")?,
        })
    }

    fn row_to_charge(row: &sqlx::sqlite::SqliteRow) -> Result<Charge> {
        let created_at: String = row.get("data_criacao");
        let paid_at: Option<String> = row.get("data_pagamento");

        Ok(Charge {
            id: row.get("id"),
            client_id: row.get("id_cliente"),
            amount: row.get("valor"),
            description: row.get("descricao"),
            due_date: row.get("vencimento"),
            created_at: parse_timestamp(&created_at).context("Invalid data_criacao timestamp")?,
            paid: row.get::<i32, _>("pago") != 0,
            paid_at: paid_at
                .map(|s| parse_timestamp(&s))
                .transpose()
                .context("Invalid data_pagamento timestamp")?,
        })
    }
}

impl Store for SqliteStore {
    async fn load(&self) -> Result<Records> {
        let client_rows = sqlx::query(
            r#"
            SELECT id, nome, email, telefone, data_cadastro
            FROM clientes
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list clients")?;

        let charge_rows = sqlx::query(
            r#"
            SELECT id, id_cliente, valor, descricao, vencimento, data_criacao, pago, data_pagamento
            FROM cobrancas
            ORDER BY position
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list charges")?;

        let records = Records {
            clients: client_rows
                .iter()
                .map(Self::row_to_client)
                .collect::<Result<Vec<_>>>()?,
            charges: charge_rows
                .iter()
                .map(Self::row_to_charge)
                .collect::<Result<Vec<_>>>()?,
        };
        tracing::debug!(
            clients = records.clients.len(),
            charges = records.charges.len(),
            "loaded SQLite store"
        );
        Ok(records)
    }

    async fn save(&self, records: &Records) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        sqlx::query("DELETE FROM clientes")
            .execute(&mut *tx)
            .await
            .context("Failed to clear clients")?;
        sqlx::query("DELETE FROM cobrancas")
            .execute(&mut *tx)
            .await
            .context("Failed to clear charges")?;

        for (position, client) in records.clients.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO clientes (position, id, nome, email, telefone, data_cadastro)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(client.id)
            .bind(&client.name)
            .bind(&client.email)
            .bind(&client.phone)
            .bind(format_timestamp(&client.registered_at))
            .execute(&mut *tx)
            .await
            .context("Failed to save client")?;
        }

        for (position, charge) in records.charges.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cobrancas (position, id, id_cliente, valor, descricao, vencimento, data_criacao, pago, data_pagamento)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(charge.id)
            .bind(charge.client_id)
            .bind(charge.amount)
            .bind(&charge.description)
            .bind(&charge.due_date)
            .bind(format_timestamp(&charge.created_at))
            .bind(charge.paid)
            .bind(charge.paid_at.as_ref().map(format_timestamp))
            .execute(&mut *tx)
            .await
            .context("Failed to save charge")?;
        }

        tx.commit().await.context("Failed to commit records")?;
        tracing::debug!(
            clients = records.clients.len(),
            charges = records.charges.len(),
            "saved SQLite store"
        );
        Ok(())
    }
}
