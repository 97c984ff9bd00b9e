use std::future::Future;

use anyhow::Result;

use crate::domain::{Charge, Client};

mod json;
mod memory;
mod repository;

pub use json::*;
pub use memory::*;
pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// Both record collections, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records {
    pub clients: Vec<Client>,
    pub charges: Vec<Charge>,
}

/// A persistence backend. Collections are always loaded and saved whole.
pub trait Store {
    /// Load both collections. A store that does not exist yet loads as empty.
    fn load(&self) -> impl Future<Output = Result<Records>> + Send;

    /// Replace the stored collections with `records`.
    fn save(&self, records: &Records) -> impl Future<Output = Result<()>> + Send;
}

/// Backend chosen at runtime.
pub enum AnyStore {
    Json(JsonStore),
    Sqlite(SqliteStore),
}

impl Store for AnyStore {
    async fn load(&self) -> Result<Records> {
        match self {
            AnyStore::Json(store) => store.load().await,
            AnyStore::Sqlite(store) => store.load().await,
        }
    }

    async fn save(&self, records: &Records) -> Result<()> {
        match self {
            AnyStore::Json(store) => store.save(records).await,
            AnyStore::Sqlite(store) => store.save(records).await,
        }
    }
}
