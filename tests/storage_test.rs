mod common;

use anyhow::Result;
use cobranca::application::{AppError, Ledger};
use cobranca::storage::{CHARGES_FILE, CLIENTS_FILE, JsonStore, Records, SqliteStore, Store};
use common::{StandardClients, json_ledger};
use tempfile::TempDir;

fn files_in(dir: &TempDir) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir.path())? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn test_missing_files_load_empty() -> Result<()> {
    let (ledger, temp) = json_ledger().await?;

    assert!(ledger.list_clients().is_empty());
    assert!(ledger.list_charges().is_empty());
    // Opening alone writes nothing
    assert!(!temp.path().join(CLIENTS_FILE).exists());
    assert!(!temp.path().join(CHARGES_FILE).exists());

    Ok(())
}

#[tokio::test]
async fn test_json_roundtrip() -> Result<()> {
    let (mut ledger, temp) = json_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;

    let reopened = Ledger::open(JsonStore::new(temp.path())).await?;
    assert_eq!(reopened.list_clients(), ledger.list_clients());
    assert_eq!(reopened.list_charges(), ledger.list_charges());

    Ok(())
}

#[tokio::test]
async fn test_reopened_ledger_continues_ids() -> Result<()> {
    let (mut ledger, temp) = json_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;
    drop(ledger);

    let mut reopened = Ledger::open(JsonStore::new(temp.path())).await?;
    assert_eq!(reopened.add_client("Davi", "", "").await?.id, 4);
    assert_eq!(reopened.add_charge(4, "1", "", "01/01/2030").await?.id, 4);

    Ok(())
}

#[tokio::test]
async fn test_json_file_layout() -> Result<()> {
    let (mut ledger, temp) = json_ledger().await?;
    ledger.add_client("Ana", "ana@example.com", "123").await?;
    ledger.add_charge(1, "10.5", "Mensalidade", "10/03/2024").await?;
    ledger.add_charge(1, "20", "Material", "10/03/2024").await?;
    ledger.mark_paid(2).await?;

    let clients: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(temp.path().join(CLIENTS_FILE))?)?;
    let client = &clients[0];
    assert_eq!(client["id"], 1);
    assert_eq!(client["nome"], "Ana");
    assert_eq!(client["email"], "ana@example.com");
    assert_eq!(client["telefone"], "123");
    assert!(client["data_cadastro"].is_string());

    let raw = std::fs::read_to_string(temp.path().join(CHARGES_FILE))?;
    assert!(raw.starts_with("[\n    {"));
    let charges: serde_json::Value = serde_json::from_str(&raw)?;
    assert_eq!(charges[0]["id_cliente"], 1);
    assert_eq!(charges[0]["valor"], 10.5);
    assert_eq!(charges[0]["descricao"], "Mensalidade");
    assert_eq!(charges[0]["vencimento"], "10/03/2024");
    assert_eq!(charges[0]["pago"], false);
    assert!(charges[0].get("data_pagamento").is_none());
    assert_eq!(charges[1]["pago"], true);
    assert!(charges[1]["data_pagamento"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_loads_files_written_by_hand() -> Result<()> {
    let temp = TempDir::new()?;
    std::fs::write(
        temp.path().join(CLIENTS_FILE),
        r#"[
    {
        "id": 1,
        "nome": "Ana",
        "email": "ana@example.com",
        "telefone": "123",
        "data_cadastro": "05/02/2024 09:15:00"
    }
]"#,
    )?;
    std::fs::write(
        temp.path().join(CHARGES_FILE),
        r#"[
    {
        "id": 1,
        "id_cliente": 1,
        "valor": 100,
        "descricao": "Mensalidade",
        "vencimento": "10/02/2024",
        "data_criacao": "05/02/2024 09:16:00",
        "pago": true,
        "data_pagamento": "09/02/2024 18:00:00"
    }
]"#,
    )?;

    let ledger = Ledger::open(JsonStore::new(temp.path())).await?;
    let charge = ledger.find_charge(1).unwrap();
    assert_eq!(charge.amount, 100.0);
    assert!(charge.paid);
    assert_eq!(ledger.financial_summary().received, 100.0);

    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_a_storage_error() -> Result<()> {
    let temp = TempDir::new()?;
    std::fs::write(temp.path().join(CLIENTS_FILE), "{not json")?;

    let result = Ledger::open(JsonStore::new(temp.path())).await;
    assert!(matches!(result, Err(AppError::Storage(_))));

    Ok(())
}

#[tokio::test]
async fn test_failed_save_rolls_back_memory() -> Result<()> {
    let temp = TempDir::new()?;
    // Point the charges file into a directory that does not exist
    let store = JsonStore::with_paths(
        temp.path().join(CLIENTS_FILE),
        temp.path().join("missing").join(CHARGES_FILE),
    );
    let mut ledger = Ledger::open(store).await?;

    let result = ledger.add_client("Ana", "", "").await;
    assert!(matches!(result, Err(AppError::Storage(_))));
    assert!(ledger.list_clients().is_empty());

    // Neither file was replaced, and no temporary file is left behind
    assert_eq!(files_in(&temp)?, Vec::<String>::new());

    let retry = ledger.add_client("Bruno", "", "").await;
    assert!(matches!(retry, Err(AppError::Storage(_))));
    assert!(ledger.list_clients().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_failed_save_keeps_previous_files() -> Result<()> {
    let (mut ledger, temp) = json_ledger().await?;
    ledger.add_client("Ana", "", "").await?;
    let before = std::fs::read_to_string(temp.path().join(CLIENTS_FILE))?;

    // A directory in the way of the charges temporary file makes its write fail
    std::fs::create_dir(temp.path().join(format!("{}.tmp", CHARGES_FILE)))?;

    let result = ledger.add_client("Bruno", "", "").await;
    assert!(matches!(result, Err(AppError::Storage(_))));
    assert_eq!(ledger.list_clients().len(), 1);

    let after = std::fs::read_to_string(temp.path().join(CLIENTS_FILE))?;
    assert_eq!(after, before);
    assert!(!after.contains("Bruno"));
    assert!(!temp.path().join(format!("{}.tmp", CLIENTS_FILE)).exists());

    // The next client reuses the id that was rolled back, matching the file
    std::fs::remove_dir(temp.path().join(format!("{}.tmp", CHARGES_FILE)))?;
    assert_eq!(ledger.add_client("Bruno", "", "").await?.id, 2);

    Ok(())
}

#[tokio::test]
async fn test_failed_rename_removes_temporary_files() -> Result<()> {
    let temp = TempDir::new()?;
    std::fs::create_dir(temp.path().join(CLIENTS_FILE))?;
    let store = JsonStore::new(temp.path());

    assert!(store.save(&Records::default()).await.is_err());
    assert_eq!(files_in(&temp)?, vec![CLIENTS_FILE.to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_sqlite_roundtrip() -> Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("test.db");
    let db_path = db_path.to_str().unwrap();

    let mut ledger = Ledger::open(SqliteStore::init(db_path).await?).await?;
    assert!(ledger.list_clients().is_empty());
    StandardClients::create_with_charges(&mut ledger).await?;

    let reopened = Ledger::open(SqliteStore::init(db_path).await?).await?;
    assert_eq!(reopened.list_clients(), ledger.list_clients());
    assert_eq!(reopened.list_charges(), ledger.list_charges());
    assert!(reopened.find_charge(1).unwrap().paid_at.is_some());

    Ok(())
}

#[tokio::test]
async fn test_sqlite_save_replaces_contents() -> Result<()> {
    let temp = TempDir::new()?;
    let db_path = temp.path().join("test.db");
    let store = SqliteStore::init(db_path.to_str().unwrap()).await?;

    let mut ledger = Ledger::open(store.clone()).await?;
    StandardClients::create(&mut ledger).await?;

    let mut records = store.load().await?;
    records.clients.truncate(1);
    store.save(&records).await?;

    let reloaded = store.load().await?;
    assert_eq!(reloaded.clients.len(), 1);
    assert_eq!(reloaded.clients[0].name, "Ana Souza");

    Ok(())
}
