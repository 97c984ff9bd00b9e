use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::application::Ledger;
use crate::domain::{Charge, ChargeId, ClientId, OverdueRule, format_brl, timestamp};
use crate::io::{DebitAccount, REMITTANCE_FILE, RemittanceSettings, Remitter};
use crate::report::{ReportKind, Reporter};
use crate::storage::{AnyStore, JsonStore, SqliteStore, Store};

/// Cobrança - client and charge ledger
#[derive(Parser)]
#[command(name = "cobranca")]
#[command(about = "Track clients and charges, and print billing reports")]
#[command(version)]
pub struct Cli {
    /// Directory holding clientes.json, cobrancas.json and remessa.json
    #[arg(long, env = "COBRANCA_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Storage backend
    #[arg(long, env = "COBRANCA_BACKEND", value_enum, default_value_t = Backend::Json)]
    pub backend: Backend,

    /// SQLite database file (sqlite backend only)
    #[arg(long, env = "COBRANCA_DATABASE", default_value = "cobranca.db")]
    pub database: String,

    /// Directory where report files are written
    #[arg(long, env = "COBRANCA_REPORTS_DIR", default_value = ".")]
    pub reports_dir: PathBuf,

    /// Compare due dates as DD/MM/YYYY text instead of calendar dates
    #[arg(long, global = true)]
    pub legacy_overdue: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    Json,
    Sqlite,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Client management commands
    #[command(subcommand)]
    Client(ClientCommands),

    /// Charge management commands
    #[command(subcommand)]
    Charge(ChargeCommands),

    /// Write a report file and print its path
    Report {
        /// Which report: clients, charges, financial
        kind: String,

        /// Output format: txt or pdf
        #[arg(short, long, default_value = "txt")]
        format: String,
    },

    /// Automatic debit remittance files
    #[command(subcommand)]
    Remittance(RemittanceCommands),

    /// Export data to CSV or JSON
    Export {
        /// What to export: clients, charges, full
        what: String,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ClientCommands {
    /// Register a new client
    Add {
        name: String,

        #[arg(short, long, default_value = "")]
        email: String,

        #[arg(short, long, default_value = "")]
        phone: String,
    },

    /// List all clients
    List,

    /// Show a client and its charges
    Show { id: ClientId },
}

#[derive(Subcommand)]
pub enum ChargeCommands {
    /// Create a charge for a client
    Add {
        client_id: ClientId,

        /// Amount (e.g., "150.00" or "150")
        amount: String,

        #[arg(short, long, default_value = "")]
        description: String,

        /// Due date (DD/MM/YYYY)
        #[arg(long)]
        due: String,
    },

    /// List charges
    List {
        /// Only charges of this client
        #[arg(long)]
        client: Option<ClientId>,

        /// Only charges whose client name contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// Mark a charge as paid
    Pay { id: ChargeId },

    /// List unpaid charges past their due date
    Overdue,
}

#[derive(Subcommand)]
pub enum RemittanceCommands {
    /// Create remessa.json with default settings
    Init,

    /// Register the debit account of a client
    Account {
        client_id: ClientId,

        /// Client code agreed with the bank
        code: String,

        /// Agency and account number
        account: String,
    },

    /// Write a remittance file for unpaid charges
    Generate {
        /// Only charges whose client name contains this text
        #[arg(long)]
        search: Option<String>,
    },
}

impl Cli {
    async fn open_store(&self) -> Result<AnyStore> {
        Ok(match self.backend {
            Backend::Json => AnyStore::Json(JsonStore::new(&self.data_dir)),
            Backend::Sqlite => AnyStore::Sqlite(
                SqliteStore::init(&self.database)
                    .await
                    .with_context(|| format!("Failed to open database {}", self.database))?,
            ),
        })
    }

    fn overdue_rule(&self) -> OverdueRule {
        if self.legacy_overdue {
            OverdueRule::Lexicographic
        } else {
            OverdueRule::Chronological
        }
    }

    pub async fn run(self) -> Result<()> {
        let store = self.open_store().await?;
        let mut ledger = Ledger::open(store)
            .await?
            .with_overdue_rule(self.overdue_rule());

        match self.command {
            Commands::Client(cmd) => run_client_command(&mut ledger, cmd).await?,
            Commands::Charge(cmd) => run_charge_command(&mut ledger, cmd).await?,
            Commands::Report { kind, format } => {
                let kind: ReportKind = kind.parse()?;
                let path = Reporter::new(&ledger, &self.reports_dir).generate(kind, &format)?;
                println!("Report written: {}", path.display());
            }
            Commands::Remittance(cmd) => {
                let settings_path = self.data_dir.join(REMITTANCE_FILE);
                run_remittance_command(&ledger, cmd, &settings_path, &self.reports_dir).await?
            }
            Commands::Export { what, output } => {
                run_export_command(&ledger, &what, output.as_deref())?
            }
        }
        Ok(())
    }
}

async fn run_client_command<S: Store>(ledger: &mut Ledger<S>, cmd: ClientCommands) -> Result<()> {
    match cmd {
        ClientCommands::Add { name, email, phone } => {
            let client = ledger.add_client(name, email, phone).await?;
            println!("Added client: {} (#{})", client.name, client.id);
        }

        ClientCommands::List => {
            let clients = ledger.list_clients();
            if clients.is_empty() {
                println!("No clients found.");
            } else {
                println!("{:<5} {:<30} {:<30} {:<15}", "ID", "NAME", "EMAIL", "PHONE");
                println!("{}", "-".repeat(83));
                for client in clients {
                    println!(
                        "{:<5} {:<30} {:<30} {:<15}",
                        client.id,
                        truncate(&client.name, 30),
                        truncate(&client.email, 30),
                        client.phone
                    );
                }
            }
        }

        ClientCommands::Show { id } => {
            let client = ledger
                .find_client(id)
                .with_context(|| format!("Client #{} not found", id))?;

            println!("Client: {}", client.name);
            println!("  ID:          {}", client.id);
            println!("  Email:       {}", client.email);
            println!("  Phone:       {}", client.phone);
            println!(
                "  Registered:  {}",
                timestamp::format_timestamp(&client.registered_at)
            );

            let charges = ledger.charges_for_client(id);
            println!();
            if charges.is_empty() {
                println!("  No charges.");
            } else {
                print_charges(ledger, &charges);
            }
        }
    }
    Ok(())
}

async fn run_charge_command<S: Store>(ledger: &mut Ledger<S>, cmd: ChargeCommands) -> Result<()> {
    match cmd {
        ChargeCommands::Add {
            client_id,
            amount,
            description,
            due,
        } => {
            let charge = ledger
                .add_charge(client_id, &amount, description, due)
                .await?;
            println!(
                "Created charge #{}: {} for {} due {}",
                charge.id,
                format_brl(charge.amount),
                ledger.client_name(charge.client_id),
                charge.due_date
            );
        }

        ChargeCommands::List { client, search } => {
            let charges: Vec<&Charge> = match (client, search) {
                (Some(id), _) => ledger.charges_for_client(id),
                (None, Some(text)) => ledger.search_charges(&text),
                (None, None) => ledger.list_charges().iter().collect(),
            };
            if charges.is_empty() {
                println!("No charges found.");
            } else {
                print_charges(ledger, &charges);
            }
        }

        ChargeCommands::Pay { id } => match ledger.mark_paid(id).await? {
            Some(charge) => {
                let paid_at = charge
                    .paid_at
                    .as_ref()
                    .map(timestamp::format_timestamp)
                    .unwrap_or_default();
                println!(
                    "Charge #{} paid: {} ({})",
                    charge.id,
                    format_brl(charge.amount),
                    paid_at
                );
            }
            None => anyhow::bail!("Charge #{} not found", id),
        },

        ChargeCommands::Overdue => {
            let overdue = ledger.overdue_charges();
            if overdue.is_empty() {
                println!("No overdue charges.");
            } else {
                print_charges(ledger, &overdue);
                let total: f64 = overdue.iter().map(|c| c.amount).sum();
                println!("{}", "-".repeat(86));
                println!("Total overdue: {}", format_brl(total));
            }
        }
    }
    Ok(())
}

async fn run_remittance_command<S: Store>(
    ledger: &Ledger<S>,
    cmd: RemittanceCommands,
    settings_path: &Path,
    out_dir: &Path,
) -> Result<()> {
    match cmd {
        RemittanceCommands::Init => {
            RemittanceSettings::create(settings_path).await?;
            println!(
                "Created {}. Fill in the bank agreement before generating remittances.",
                settings_path.display()
            );
        }

        RemittanceCommands::Account {
            client_id,
            code,
            account,
        } => {
            let client = ledger
                .find_client(client_id)
                .with_context(|| format!("Client #{} not found", client_id))?;
            let mut settings = RemittanceSettings::load(settings_path).await?;
            settings.set_account(client_id, DebitAccount::new(code, account));
            settings.save(settings_path).await?;
            println!("Debit account set for {} (#{})", client.name, client.id);
        }

        RemittanceCommands::Generate { search } => {
            let charges: Vec<&Charge> = match search {
                Some(text) => ledger
                    .search_charges(&text)
                    .into_iter()
                    .filter(|c| !c.paid)
                    .collect(),
                None => ledger.pending_charges(),
            };
            let (path, remittance) = Remitter::new(ledger, settings_path, out_dir)
                .generate(&charges)
                .await?;

            println!("Remittance written: {}", path.display());
            println!(
                "NSA {}: {} charge(s), total {}",
                remittance.nsa,
                remittance.charge_ids.len(),
                format_brl(remittance.total_cents as f64 / 100.0)
            );
            if !remittance.skipped.is_empty() {
                println!("{} charge(s) left out", remittance.skipped.len());
            }
        }
    }
    Ok(())
}

fn run_export_command<S: Store>(ledger: &Ledger<S>, what: &str, output: Option<&str>) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(ledger);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match what {
        "clients" => {
            let count = exporter.export_clients_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} clients", count);
            }
        }
        "charges" => {
            let count = exporter.export_charges_csv(writer)?;
            if output.is_some() {
                eprintln!("Exported {} charges", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(writer)?;
            if output.is_some() {
                eprintln!(
                    "Exported full ledger: {} clients, {} charges",
                    snapshot.clients.len(),
                    snapshot.charges.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: clients, charges, full",
                what
            );
        }
    }

    Ok(())
}

fn print_charges<S: Store>(ledger: &Ledger<S>, charges: &[&Charge]) {
    println!(
        "{:<5} {:<25} {:>12} {:<12} {:<10} {:<20}",
        "ID", "CLIENT", "AMOUNT", "DUE", "STATUS", "DESCRIPTION"
    );
    println!("{}", "-".repeat(86));
    for charge in charges {
        println!(
            "{:<5} {:<25} {:>12} {:<12} {:<10} {:<20}",
            charge.id,
            truncate(ledger.client_name(charge.client_id), 25),
            format_brl(charge.amount),
            charge.due_date,
            charge.status(),
            truncate(&charge.description, 20)
        );
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
