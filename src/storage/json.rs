use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Records, Store};

pub const CLIENTS_FILE: &str = "clientes.json";
pub const CHARGES_FILE: &str = "cobrancas.json";

/// Two JSON files in a data directory: `clientes.json` and `cobrancas.json`.
///
/// A save writes both collections to temporary files first and only then renames
/// them into place, so a failed write leaves both files untouched. The pair is
/// still not replaced atomically: a crash between the two renames leaves the
/// clients file newer than the charges file.
#[derive(Debug, Clone)]
pub struct JsonStore {
    clients_path: PathBuf,
    charges_path: PathBuf,
}

impl JsonStore {
    /// Store both files inside `dir`.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::with_paths(dir.join(CLIENTS_FILE), dir.join(CHARGES_FILE))
    }

    pub fn with_paths(clients_path: impl Into<PathBuf>, charges_path: impl Into<PathBuf>) -> Self {
        Self {
            clients_path: clients_path.into(),
            charges_path: charges_path.into(),
        }
    }

    pub fn clients_path(&self) -> &Path {
        &self.clients_path
    }

    pub fn charges_path(&self) -> &Path {
        &self.charges_path
    }
}

impl Store for JsonStore {
    async fn load(&self) -> Result<Records> {
        let clients = read_collection(&self.clients_path).await?;
        let charges = read_collection(&self.charges_path).await?;
        tracing::debug!(
            clients = clients.len(),
            charges = charges.len(),
            "loaded JSON store"
        );
        Ok(Records { clients, charges })
    }

    async fn save(&self, records: &Records) -> Result<()> {
        let clients_tmp = stage(&self.clients_path, &records.clients).await?;
        let charges_tmp = match stage(&self.charges_path, &records.charges).await {
            Ok(tmp) => tmp,
            Err(e) => {
                discard(&clients_tmp).await;
                return Err(e);
            }
        };

        if let Err(e) = commit(&clients_tmp, &self.clients_path).await {
            discard(&charges_tmp).await;
            return Err(e);
        }
        commit(&charges_tmp, &self.charges_path).await?;

        tracing::debug!(
            clients = records.clients.len(),
            charges = records.charges.len(),
            "saved JSON store"
        );
        Ok(())
    }
}

async fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    Ok(read_json_file(path).await?.unwrap_or_default())
}

/// Read and parse a JSON file. A missing file is `None`.
pub(crate) async fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match tokio::fs::read(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    serde_json::from_slice(&contents)
        .map(Some)
        .with_context(|| format!("Malformed JSON in {}", path.display()))
}

/// Replace a single JSON file through a temporary file and a rename.
pub(crate) async fn write_json_file<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let tmp = stage(path, value).await?;
    commit(&tmp, path).await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    PathBuf::from(tmp_name)
}

/// Write `value` next to `path` and return the temporary file's path.
async fn stage<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf> {
    let contents = to_pretty_json(value)?;
    let tmp = tmp_path(path);

    if let Err(e) = tokio::fs::write(&tmp, contents).await {
        discard(&tmp).await;
        return Err(e).with_context(|| format!("Failed to write {}", tmp.display()));
    }
    Ok(tmp)
}

async fn commit(tmp: &Path, path: &Path) -> Result<()> {
    if let Err(e) = tokio::fs::rename(tmp, path).await {
        discard(tmp).await;
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }
    Ok(())
}

async fn discard(tmp: &Path) {
    match tokio::fs::remove_file(tmp).await {
        Err(e) if e.kind() != ErrorKind::NotFound => {
            tracing::warn!(path = %tmp.display(), error = %e, "could not remove temporary file");
        }
        _ => {}
    }
}

/// Serialize with four-space indentation, matching files written by hand or by
/// older tools.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .context("Failed to serialize records")?;
    Ok(buf)
}
