mod common;

use anyhow::Result;
use cobranca::application::AppError;
use cobranca::report::{ReportFormat, ReportKind, Reporter};
use common::{StandardClients, memory_ledger};
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
async fn test_invalid_format_writes_nothing() -> Result<()> {
    let mut ledger = memory_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;
    let out = TempDir::new()?;
    let reporter = Reporter::new(&ledger, out.path());

    for kind in [ReportKind::Clients, ReportKind::Charges, ReportKind::Financial] {
        let result = reporter.generate(kind, "docx");
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }
    assert!(matches!(
        reporter.financial_report("TXT"),
        Err(AppError::InvalidArgument(_))
    ));
    assert!(files_in(&out)?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_client_report_txt() -> Result<()> {
    let mut ledger = memory_ledger().await?;
    StandardClients::create(&mut ledger).await?;
    let out = TempDir::new()?;

    let path = Reporter::new(&ledger, out.path()).client_report("txt")?;
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("relatorio_clientes_"));
    assert!(name.ends_with(".txt"));

    let contents = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "RELATÓRIO DE CLIENTES");
    assert!(lines[1].starts_with("Data: "));
    assert_eq!(lines.len(), 5 + 3);
    assert!(lines[5].contains("Ana Souza"));
    assert!(lines[7].contains("carla@example.com"));

    Ok(())
}

#[tokio::test]
async fn test_charge_report_txt_marks_missing_clients() -> Result<()> {
    let mut ledger = memory_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;
    ledger.add_charge(77, "12.3", "orphan", "01/01/2030").await?;
    let out = TempDir::new()?;

    let path = Reporter::new(&ledger, out.path()).charge_report("txt")?;
    let contents = std::fs::read_to_string(&path)?;

    assert!(contents.starts_with("RELATÓRIO DE COBRANÇAS\n"));
    assert!(contents.contains("| R$100.00    |"));
    assert!(contents.contains("| Pago      \n"));
    assert!(contents.contains("4     | Cliente não encontrado | R$12.30     |"));

    Ok(())
}

#[tokio::test]
async fn test_financial_report_txt() -> Result<()> {
    let mut ledger = memory_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;
    let out = TempDir::new()?;

    let path = Reporter::new(&ledger, out.path()).financial_report("txt")?;
    let contents = std::fs::read_to_string(&path)?;

    assert!(contents.contains("Total de Clientes: 3\n"));
    assert!(contents.contains("Total de Cobranças: 3\n"));
    assert!(contents.contains("Valor Pendente: R$ 75.00\n"));
    assert!(contents.contains("Valor Recebido: R$ 100.00\n"));
    // Both unpaid fixtures fell due in 2024
    assert!(contents.contains("- Bruno Lima: R$ 50.00 (Vencimento: 15/03/2024)\n"));
    assert!(contents.contains("- Ana Souza: R$ 25.00 (Vencimento: 10/04/2024)\n"));

    Ok(())
}

#[tokio::test]
async fn test_pdf_reports() -> Result<()> {
    let mut ledger = memory_ledger().await?;
    StandardClients::create_with_charges(&mut ledger).await?;
    let out = TempDir::new()?;
    let reporter = Reporter::new(&ledger, out.path());

    for kind in [ReportKind::Clients, ReportKind::Charges, ReportKind::Financial] {
        let path = reporter.write(kind, ReportFormat::Pdf)?;
        assert_eq!(path.extension().unwrap(), "pdf");
        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(b"%PDF"));
    }
    assert_eq!(files_in(&out)?.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_repeated_reports_never_overwrite() -> Result<()> {
    let ledger = memory_ledger().await?;
    let out = TempDir::new()?;
    let reporter = Reporter::new(&ledger, out.path());

    let paths: Vec<_> = (0..3)
        .map(|_| reporter.client_report("txt"))
        .collect::<Result<_, _>>()?;

    assert_eq!(files_in(&out)?.len(), 3);
    assert_ne!(paths[0], paths[1]);
    assert_ne!(paths[1], paths[2]);

    Ok(())
}
