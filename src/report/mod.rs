//! Report files: the client listing, the charge listing and the financial
//! summary, each as plain text or PDF.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::application::{AppError, Ledger};
use crate::domain::timestamp::{self, Timestamp};
use crate::storage::Store;

mod pdf;
mod txt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    Clients,
    Charges,
    Financial,
}

impl ReportKind {
    /// Name used in generated file names.
    pub fn slug(&self) -> &'static str {
        match self {
            ReportKind::Clients => "clientes",
            ReportKind::Charges => "cobrancas",
            ReportKind::Financial => "financeiro",
        }
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clients" | "clientes" => Ok(ReportKind::Clients),
            "charges" | "cobrancas" | "cobranças" => Ok(ReportKind::Charges),
            "financial" | "financeiro" => Ok(ReportKind::Financial),
            _ => Err(AppError::InvalidArgument(format!(
                "unknown report '{}'. Use clients, charges or financial",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Txt,
    Pdf,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Txt => "txt",
            ReportFormat::Pdf => "pdf",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" => Ok(ReportFormat::Txt),
            "pdf" => Ok(ReportFormat::Pdf),
            _ => Err(AppError::InvalidArgument(format!(
                "invalid report format '{}'. Use 'txt' or 'pdf'",
                s
            ))),
        }
    }
}

/// Writes report files for a ledger into an output directory.
pub struct Reporter<'a, S: Store> {
    ledger: &'a Ledger<S>,
    out_dir: PathBuf,
}

impl<'a, S: Store> Reporter<'a, S> {
    pub fn new(ledger: &'a Ledger<S>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            ledger,
            out_dir: out_dir.into(),
        }
    }

    pub fn client_report(&self, format: &str) -> Result<PathBuf, AppError> {
        self.generate(ReportKind::Clients, format)
    }

    pub fn charge_report(&self, format: &str) -> Result<PathBuf, AppError> {
        self.generate(ReportKind::Charges, format)
    }

    pub fn financial_report(&self, format: &str) -> Result<PathBuf, AppError> {
        self.generate(ReportKind::Financial, format)
    }

    /// Write one report and return its path. The format is checked before any
    /// file is created.
    pub fn generate(&self, kind: ReportKind, format: &str) -> Result<PathBuf, AppError> {
        let format: ReportFormat = format.parse()?;
        self.write(kind, format)
    }

    pub fn write(&self, kind: ReportKind, format: ReportFormat) -> Result<PathBuf, AppError> {
        let generated_at = timestamp::now();
        let (path, file) = create_report_file(&self.out_dir, kind, format, &generated_at)?;

        if let Err(e) = self.render(kind, format, file, &generated_at) {
            // Don't leave a truncated report behind
            let _ = std::fs::remove_file(&path);
            return Err(e);
        }

        tracing::info!(report = kind.slug(), path = %path.display(), "report written");
        Ok(path)
    }

    fn render(
        &self,
        kind: ReportKind,
        format: ReportFormat,
        file: File,
        generated_at: &Timestamp,
    ) -> Result<(), AppError> {
        let ledger = self.ledger;
        match (format, kind) {
            (ReportFormat::Txt, ReportKind::Clients) => {
                txt::write_clients(BufWriter::new(file), ledger.list_clients(), generated_at)?
            }
            (ReportFormat::Txt, ReportKind::Charges) => {
                txt::write_charges(BufWriter::new(file), &ledger.charge_report(), generated_at)?
            }
            (ReportFormat::Txt, ReportKind::Financial) => txt::write_financial(
                BufWriter::new(file),
                &ledger.financial_summary_on(generated_at.date()),
                generated_at,
            )?,
            (ReportFormat::Pdf, ReportKind::Clients) => {
                pdf::write_clients(file, ledger.list_clients(), generated_at)?
            }
            (ReportFormat::Pdf, ReportKind::Charges) => {
                pdf::write_charges(file, &ledger.charge_report(), generated_at)?
            }
            (ReportFormat::Pdf, ReportKind::Financial) => pdf::write_financial(
                file,
                &ledger.financial_summary_on(generated_at.date()),
                generated_at,
            )?,
        }
        Ok(())
    }
}

/// `relatorio_<kind>_<YYYYMMDD_HHMMSS>.<ext>`
pub fn report_file_name(kind: ReportKind, format: ReportFormat, generated_at: &Timestamp) -> String {
    format!(
        "relatorio_{}_{}.{}",
        kind.slug(),
        generated_at.format("%Y%m%d_%H%M%S"),
        format.extension()
    )
}

/// Create a new report file, adding `_2`, `_3`, ... to the name when reports are
/// generated more than once in the same second.
fn create_report_file(
    dir: &Path,
    kind: ReportKind,
    format: ReportFormat,
    generated_at: &Timestamp,
) -> Result<(PathBuf, File), AppError> {
    let base = report_file_name(kind, format, generated_at);
    let suffix = format!(".{}", format.extension());
    let stem = base.strip_suffix(&suffix).unwrap_or(&base);

    let mut attempt = 1;
    loop {
        let name = if attempt == 1 {
            base.clone()
        } else {
            format!("{}_{}.{}", stem, attempt, format.extension())
        };
        let path = dir.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}
