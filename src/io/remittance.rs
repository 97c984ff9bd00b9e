//! Automatic debit remittance files ("remessa").
//!
//! A remittance is a fixed-width text file with one header record (`A`), one
//! detail record (`E`) per debited charge and a trailer record (`Z`) carrying
//! the record count and the sum of the debits. Every file carries a sequence
//! number (NSA) that must never repeat, so the last one used is kept in the
//! remittance settings file next to the ledger data, together with the bank
//! agreement and each client's debit account.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::{AppError, Ledger};
use crate::domain::{Charge, ChargeId, ClientId, timestamp};
use crate::storage::{Store, read_json_file, write_json_file};

pub const REMITTANCE_FILE: &str = "remessa.json";

pub const HEADER_WIDTH: usize = 169;
pub const RECORD_WIDTH: usize = 150;

const SERVICE_CODE: &str = "1";
const LAYOUT_VERSION: &str = "DEBITO AUTOMATICO";
const CURRENCY_CODE: &str = "3";
const OCCURRENCE_CODE: &str = "0";

/// A client's account as registered with the bank for automatic debit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebitAccount {
    /// Client code agreed with the bank
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "conta_corrente")]
    pub account: String,
}

impl DebitAccount {
    pub fn new(code: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            account: account.into(),
        }
    }
}

/// Bank agreement, NSA counter and debit accounts, stored as `remessa.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceSettings {
    #[serde(rename = "convenio")]
    pub agreement: String,
    #[serde(rename = "nome_empresa")]
    pub company_name: String,
    #[serde(rename = "codigo_banco")]
    pub bank_code: String,
    #[serde(rename = "nome_banco")]
    pub bank_name: String,
    #[serde(rename = "id_sistema")]
    pub system_id: String,
    /// Digits appended to the six-digit sequence to form the NSA
    #[serde(rename = "parte_fixa_nsa")]
    pub nsa_suffix: String,
    /// Sequence of the last remittance generated, 0 before the first one
    #[serde(rename = "ultimo_nsa_sequencial")]
    pub last_sequence: u32,
    #[serde(rename = "contas", default)]
    pub accounts: BTreeMap<ClientId, DebitAccount>,
}

impl Default for RemittanceSettings {
    fn default() -> Self {
        Self {
            agreement: String::new(),
            company_name: String::new(),
            bank_code: String::new(),
            bank_name: String::new(),
            system_id: String::new(),
            nsa_suffix: "04".to_string(),
            last_sequence: 0,
            accounts: BTreeMap::new(),
        }
    }
}

impl RemittanceSettings {
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        read_json_file(path).await?.ok_or_else(|| {
            AppError::InvalidArgument(format!(
                "No remittance settings at {}. Run `remittance init` first",
                path.display()
            ))
        })
    }

    pub async fn save(&self, path: &Path) -> Result<(), AppError> {
        write_json_file(path, self).await?;
        Ok(())
    }

    /// Write default settings to `path`. Existing settings are never replaced.
    pub async fn create(path: &Path) -> Result<Self, AppError> {
        if read_json_file::<RemittanceSettings>(path).await?.is_some() {
            return Err(AppError::InvalidArgument(format!(
                "Remittance settings already exist at {}",
                path.display()
            )));
        }
        let settings = Self::default();
        settings.save(path).await?;
        Ok(settings)
    }

    pub fn set_account(&mut self, client_id: ClientId, account: DebitAccount) {
        self.accounts.insert(client_id, account);
    }

    pub fn next_sequence(&self) -> Result<u32, AppError> {
        self.last_sequence
            .checked_add(1)
            .ok_or_else(|| AppError::InvalidArgument("NSA sequence exhausted".into()))
    }

    /// The eight-digit NSA for a sequence number.
    pub fn nsa(&self, sequence: u32) -> String {
        format!("{:06}{}", sequence, self.nsa_suffix)
    }

    fn validate(&self) -> Result<(), AppError> {
        if digits(&self.agreement).is_empty() {
            return Err(AppError::InvalidArgument(
                "Remittance settings have no agreement code (convenio)".into(),
            ));
        }
        if digits(&self.bank_code).is_empty() {
            return Err(AppError::InvalidArgument(
                "Remittance settings have no bank code (codigo_banco)".into(),
            ));
        }
        Ok(())
    }
}

/// Why a selected charge was left out of a remittance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingClient,
    NoDebitAccount,
    MalformedDueDate,
    NonPositiveAmount,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::MissingClient => "client does not exist",
            SkipReason::NoDebitAccount => "client has no debit account",
            SkipReason::MalformedDueDate => "due date is not DD/MM/YYYY",
            SkipReason::NonPositiveAmount => "amount is not positive",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCharge {
    pub charge_id: ChargeId,
    pub reason: SkipReason,
}

/// A remittance ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceFile {
    pub sequence: u32,
    pub nsa: String,
    /// Header, details and trailer, without line terminators
    pub lines: Vec<String>,
    pub charge_ids: Vec<ChargeId>,
    pub total_cents: u64,
    pub skipped: Vec<SkippedCharge>,
}

impl RemittanceFile {
    pub fn file_name(&self) -> String {
        format!("REMESSA_NSA_{}.txt", self.sequence)
    }

    /// Latin-1 bytes, records separated by `\n`.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.lines
            .join("\n")
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect()
    }
}

/// One fixed-width record, filled field by field.
struct Record {
    line: String,
}

impl Record {
    fn new(kind: &str) -> Self {
        Self {
            line: kind.to_string(),
        }
    }

    /// Text cut to `width` characters and padded with spaces on the right.
    fn alpha(mut self, value: &str, width: usize) -> Self {
        let cut: String = value
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .take(width)
            .collect();
        self.line.push_str(&format!("{:<width$}", cut));
        self
    }

    fn blank(self, width: usize) -> Self {
        self.alpha("", width)
    }

    /// The digits of `value`, zero-padded on the left.
    fn num(mut self, field: &str, value: &str, width: usize) -> Result<Self, AppError> {
        let digits = digits(value);
        if digits.len() > width {
            return Err(AppError::InvalidArgument(format!(
                "{} '{}' does not fit in {} digits",
                field, value, width
            )));
        }
        self.line.push_str(&format!("{:0>width$}", digits));
        Ok(self)
    }

    fn finish(self) -> String {
        self.line
    }
}

fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn to_cents(amount: f64) -> Option<u64> {
    if amount.is_finite() && amount > 0.0 {
        Some((amount * 100.0).round() as u64)
    } else {
        None
    }
}

/// Build the remittance for `charges`. Charges that cannot be debited are
/// reported in `skipped`; if none can, nothing is built.
pub fn build_remittance<S: Store>(
    settings: &RemittanceSettings,
    ledger: &Ledger<S>,
    charges: &[&Charge],
    sequence: u32,
    generated_on: NaiveDate,
) -> Result<RemittanceFile, AppError> {
    settings.validate()?;
    let nsa = settings.nsa(sequence);

    let header = Record::new("A")
        .num("service code", SERVICE_CODE, 1)?
        .num("agreement", &settings.agreement, 20)?
        .alpha(&settings.company_name, 20)
        .num("bank code", &settings.bank_code, 3)?
        .alpha(&settings.bank_name, 20)
        .num("date", &generated_on.format("%Y%m%d").to_string(), 8)?
        .num("NSA", &nsa, 8)?
        .alpha(LAYOUT_VERSION, 59)
        .alpha(&settings.system_id, 29)
        .finish();

    let mut lines = vec![header];
    let mut charge_ids = Vec::new();
    let mut skipped = Vec::new();
    let mut total_cents: u64 = 0;

    for charge in charges {
        let skip = |reason| SkippedCharge {
            charge_id: charge.id,
            reason,
        };
        if ledger.find_client(charge.client_id).is_none() {
            skipped.push(skip(SkipReason::MissingClient));
            continue;
        }
        let Some(account) = settings.accounts.get(&charge.client_id) else {
            skipped.push(skip(SkipReason::NoDebitAccount));
            continue;
        };
        let Some(due) = charge.due_on() else {
            skipped.push(skip(SkipReason::MalformedDueDate));
            continue;
        };
        let Some(cents) = to_cents(charge.amount) else {
            skipped.push(skip(SkipReason::NonPositiveAmount));
            continue;
        };

        let detail = Record::new("E")
            .alpha(&account.code, 25)
            .alpha(&account.account, 20)
            .num("due date", &due.format("%Y%m%d").to_string(), 8)?
            .num("amount", &cents.to_string(), 15)?
            .num("currency code", CURRENCY_CODE, 1)?
            .blank(79)
            .num("occurrence code", OCCURRENCE_CODE, 1)?
            .finish();

        lines.push(detail);
        charge_ids.push(charge.id);
        total_cents += cents;
    }

    if charge_ids.is_empty() {
        return Err(AppError::InvalidArgument(
            "No charges can be included in a remittance".into(),
        ));
    }

    let trailer = Record::new("Z")
        .num("record count", &(lines.len() + 1).to_string(), 6)?
        .num("total", &total_cents.to_string(), 18)?
        .blank(125)
        .finish();
    lines.push(trailer);

    Ok(RemittanceFile {
        sequence,
        nsa,
        lines,
        charge_ids,
        total_cents,
        skipped,
    })
}

/// Writes remittance files and advances the NSA counter.
pub struct Remitter<'a, S: Store> {
    ledger: &'a Ledger<S>,
    settings_path: PathBuf,
    out_dir: PathBuf,
}

impl<'a, S: Store> Remitter<'a, S> {
    pub fn new(
        ledger: &'a Ledger<S>,
        settings_path: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            ledger,
            settings_path: settings_path.into(),
            out_dir: out_dir.into(),
        }
    }

    /// Write the remittance for `charges` and record its NSA as used.
    ///
    /// The counter only advances once the file is on disk. A file for the
    /// same NSA is never overwritten.
    pub async fn generate(
        &self,
        charges: &[&Charge],
    ) -> Result<(PathBuf, RemittanceFile), AppError> {
        let mut settings = RemittanceSettings::load(&self.settings_path).await?;
        let sequence = settings.next_sequence()?;
        let remittance =
            build_remittance(&settings, self.ledger, charges, sequence, timestamp::today())?;

        let path = self.out_dir.join(remittance.file_name());
        write_new_file(&path, &remittance.to_bytes())?;

        settings.last_sequence = sequence;
        write_json_file(&self.settings_path, &settings)
            .await
            .with_context(|| {
                format!(
                    "Remittance {} was written but NSA {} could not be recorded",
                    path.display(),
                    sequence
                )
            })?;

        for skipped in &remittance.skipped {
            tracing::warn!(
                charge_id = skipped.charge_id,
                reason = %skipped.reason,
                "charge left out of remittance"
            );
        }
        tracing::info!(
            nsa = %remittance.nsa,
            charges = remittance.charge_ids.len(),
            total_cents = remittance.total_cents,
            path = %path.display(),
            "remittance written"
        );
        Ok((path, remittance))
    }
}

fn write_new_file(path: &Path, contents: &[u8]) -> Result<(), AppError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(AppError::InvalidArgument(format!(
                "{} already exists",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if let Err(e) = file.write_all(contents).and_then(|_| file.sync_all()) {
        let _ = std::fs::remove_file(path);
        return Err(e.into());
    }
    Ok(())
}
