use std::io::{self, Write};

use crate::application::{ChargeRow, FinancialSummary};
use crate::domain::timestamp::{Timestamp, format_timestamp};
use crate::domain::{Client, format_brl};

fn write_heading<W: Write>(w: &mut W, title: &str, generated_at: &Timestamp) -> io::Result<()> {
    writeln!(w, "{}", title)?;
    writeln!(w, "Data: {}", format_timestamp(generated_at))?;
    writeln!(w, "{}", "=".repeat(50))
}

pub fn write_clients<W: Write>(
    mut w: W,
    clients: &[Client],
    generated_at: &Timestamp,
) -> io::Result<()> {
    write_heading(&mut w, "RELATÓRIO DE CLIENTES", generated_at)?;
    writeln!(
        w,
        "{:<5} | {:<30} | {:<30} | {:<15}",
        "ID", "Nome", "Email", "Telefone"
    )?;
    writeln!(w, "{}", "-".repeat(80))?;

    for client in clients {
        writeln!(
            w,
            "{:<5} | {:<30} | {:<30} | {:<15}",
            client.id, client.name, client.email, client.phone
        )?;
    }
    w.flush()
}

pub fn write_charges<W: Write>(
    mut w: W,
    rows: &[ChargeRow],
    generated_at: &Timestamp,
) -> io::Result<()> {
    write_heading(&mut w, "RELATÓRIO DE COBRANÇAS", generated_at)?;
    writeln!(
        w,
        "{:<5} | {:<20} | {:<10} | {:<12} | {:<10}",
        "ID", "Cliente", "Valor", "Vencimento", "Status"
    )?;
    writeln!(w, "{}", "-".repeat(80))?;

    for row in rows {
        writeln!(
            w,
            "{:<5} | {:<20} | R${:<9.2} | {:<12} | {:<10}",
            row.id,
            row.client_name,
            row.amount,
            row.due_date,
            row.status.label()
        )?;
    }
    w.flush()
}

pub fn write_financial<W: Write>(
    mut w: W,
    summary: &FinancialSummary,
    generated_at: &Timestamp,
) -> io::Result<()> {
    write_heading(&mut w, "RELATÓRIO FINANCEIRO", generated_at)?;
    writeln!(w, "Total de Clientes: {}", summary.client_count)?;
    writeln!(w, "Total de Cobranças: {}", summary.charge_count)?;
    writeln!(w, "Valor Pendente: {}", format_brl(summary.pending))?;
    writeln!(w, "Valor Recebido: {}", format_brl(summary.received))?;
    writeln!(w, "{}", "=".repeat(50))?;
    writeln!(w, "Cobranças Vencidas:")?;

    for entry in &summary.overdue {
        writeln!(
            w,
            "- {}: {} (Vencimento: {})",
            entry.client_name,
            format_brl(entry.amount),
            entry.due_date
        )?;
    }
    w.flush()
}
