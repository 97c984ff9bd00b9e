use std::io::{BufWriter, Write};

use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use crate::application::{AppError, ChargeRow, FinancialSummary};
use crate::domain::timestamp::{Timestamp, format_timestamp};
use crate::domain::{Client, format_brl};

// A4 portrait, in millimetres
const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const ROW_HEIGHT: f32 = 10.0;

const PT_TO_MM: f32 = 0.3528;

fn render_error<E: std::fmt::Debug>(e: E) -> AppError {
    AppError::Render(format!("{:?}", e))
}

/// Shorten `text` to at most `max` characters, marking the cut with "...".
fn fit(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

/// A document being filled top to bottom, one line at a time. Starts a new page
/// when the current one is full.
struct Sheet {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Baseline of the next line, measured from the bottom edge
    cursor: f32,
    pages: usize,
}

impl Sheet {
    fn new(title: &str) -> Result<Self, AppError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: PAGE_HEIGHT - MARGIN - ROW_HEIGHT,
            pages: 1,
        })
    }

    /// Title and generation time, centered, followed by a blank gap.
    fn heading(&mut self, title: &str, generated_at: &Timestamp) {
        self.centered(title, 12.0);
        self.centered(&format!("Data: {}", format_timestamp(generated_at)), 12.0);
        self.skip(ROW_HEIGHT);
    }

    fn ensure_room(&mut self) {
        if self.cursor < MARGIN {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Page {}, Layer 1", self.pages),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor = PAGE_HEIGHT - MARGIN - ROW_HEIGHT;
        }
    }

    fn font(&self, bold: bool) -> &IndirectFontRef {
        if bold { &self.bold } else { &self.regular }
    }

    fn skip(&mut self, height: f32) {
        self.cursor -= height;
    }

    /// One line of text at the left margin.
    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.row(&[(0.0, text.to_string())], size, bold);
    }

    /// Builtin fonts carry no metrics here, so centering uses an average
    /// glyph width of half the font size.
    fn centered(&mut self, text: &str, size: f32) {
        self.ensure_room();
        let width = text.chars().count() as f32 * size * 0.5 * PT_TO_MM;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.layer
            .use_text(text, size, Mm(x), Mm(self.cursor), &self.regular);
        self.skip(ROW_HEIGHT);
    }

    /// Cells at column offsets (mm from the left margin) on one line.
    fn row(&mut self, cells: &[(f32, String)], size: f32, bold: bool) {
        self.ensure_room();
        let font = self.font(bold).clone();
        for (offset, text) in cells {
            self.layer
                .use_text(text.as_str(), size, Mm(MARGIN + offset), Mm(self.cursor), &font);
        }
        self.skip(ROW_HEIGHT);
    }

    fn save<W: Write>(self, writer: W) -> Result<(), AppError> {
        let mut writer = BufWriter::new(writer);
        self.doc.save(&mut writer).map_err(render_error)?;
        writer.flush()?;
        Ok(())
    }
}

pub fn write_clients<W: Write>(
    writer: W,
    clients: &[Client],
    generated_at: &Timestamp,
) -> Result<(), AppError> {
    let title = "RELATÓRIO DE CLIENTES";
    let mut sheet = Sheet::new(title)?;
    sheet.heading(title, generated_at);

    // ID 10mm | Nome 60mm | Email 70mm | Telefone 50mm
    let columns = [0.0, 10.0, 70.0, 140.0];
    let header = ["ID", "Nome", "Email", "Telefone"];
    sheet.row(&cells(&columns, &header.map(String::from)), 10.0, true);

    for client in clients {
        let values = [
            client.id.to_string(),
            fit(&client.name, 30),
            fit(&client.email, 34),
            fit(&client.phone, 24),
        ];
        sheet.row(&cells(&columns, &values), 10.0, false);
    }

    sheet.save(writer)
}

pub fn write_charges<W: Write>(
    writer: W,
    rows: &[ChargeRow],
    generated_at: &Timestamp,
) -> Result<(), AppError> {
    let title = "RELATÓRIO DE COBRANÇAS";
    let mut sheet = Sheet::new(title)?;
    sheet.heading(title, generated_at);

    // ID 10mm | Cliente 50mm | Valor 30mm | Vencimento 30mm | Status 30mm
    let columns = [0.0, 10.0, 60.0, 90.0, 120.0];
    let header = ["ID", "Cliente", "Valor", "Vencimento", "Status"];
    sheet.row(&cells(&columns, &header.map(String::from)), 10.0, true);

    for row in rows {
        let values = [
            row.id.to_string(),
            fit(&row.client_name, 20),
            format_brl(row.amount),
            row.due_date.clone(),
            row.status.label().to_string(),
        ];
        sheet.row(&cells(&columns, &values), 10.0, false);
    }

    sheet.save(writer)
}

pub fn write_financial<W: Write>(
    writer: W,
    summary: &FinancialSummary,
    generated_at: &Timestamp,
) -> Result<(), AppError> {
    let title = "RELATÓRIO FINANCEIRO";
    let mut sheet = Sheet::new(title)?;
    sheet.heading(title, generated_at);

    sheet.line("Resumo Financeiro", 12.0, true);
    sheet.line(&format!("Total de Clientes: {}", summary.client_count), 12.0, false);
    sheet.line(&format!("Total de Cobranças: {}", summary.charge_count), 12.0, false);
    sheet.line(&format!("Valor Pendente: {}", format_brl(summary.pending)), 12.0, false);
    sheet.line(&format!("Valor Recebido: {}", format_brl(summary.received)), 12.0, false);
    sheet.skip(ROW_HEIGHT);

    if summary.overdue.is_empty() {
        sheet.line("Nenhuma cobrança vencida", 12.0, false);
    } else {
        sheet.line("Cobranças Vencidas", 12.0, true);
        for entry in &summary.overdue {
            let text = format!(
                "- {}: {} (Vencimento: {})",
                entry.client_name,
                format_brl(entry.amount),
                entry.due_date
            );
            sheet.line(&text, 10.0, false);
        }
    }

    sheet.save(writer)
}

fn cells(columns: &[f32], values: &[String]) -> Vec<(f32, String)> {
    columns.iter().copied().zip(values.iter().cloned()).collect()
}
