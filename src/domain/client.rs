use serde::{Deserialize, Serialize};

use super::timestamp::{self, Timestamp, serde_timestamp};

pub type ClientId = i64;

/// A billed client. Clients are never edited or deleted once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "telefone")]
    pub phone: String,
    /// When the client was registered
    #[serde(rename = "data_cadastro", with = "serde_timestamp")]
    pub registered_at: Timestamp,
}

impl Client {
    /// Create a client registered now. The id must be allocated by the ledger.
    pub fn new(
        id: ClientId,
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            registered_at: timestamp::now(),
        }
    }

    pub fn with_registered_at(mut self, registered_at: Timestamp) -> Self {
        self.registered_at = registered_at;
        self
    }
}
