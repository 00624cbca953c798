// Menu document parsing (CSV uploads and PDF menus)

use std::path::Path;

use tracing::{debug, warn};

use crate::types::{AppError, AppResult};

/// Where a batch of menu records came from. Decides id prefix and sentence shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Csv,
    Pdf,
}

impl SourceKind {
    /// Infer from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(SourceKind::Csv),
            "pdf" => Some(SourceKind::Pdf),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Csv => "CSV",
            SourceKind::Pdf => "PDF",
        }
    }

    /// Stable id for the `n`th record (1-based) of an ingestion batch.
    pub fn record_id(&self, n: usize) -> String {
        match self {
            SourceKind::Csv => format!("menu-csv-{}", n),
            SourceKind::Pdf => format!("menu-{}", n),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(SourceKind::Csv),
            "pdf" => Ok(SourceKind::Pdf),
            other => Err(format!("unsupported format: {}", other)),
        }
    }
}

/// CSV header names, in record field order.
pub const CSV_COLUMNS: [&str; 4] = ["Name", "Price", "Description", "Stock"];

/// One menu row. Cells the source did not provide are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuRecord {
    pub name: String,
    pub price: String,
    pub description: String,
    pub stock: String,
}

impl MenuRecord {
    /// The descriptive sentence that gets embedded and stored as metadata.
    pub fn structured_text(&self, kind: SourceKind) -> String {
        match kind {
            SourceKind::Csv => format!(
                "Menu Name: {} | Price: Rp {} | Description: {} | Stock: {}.",
                self.name, self.price, self.description, self.stock
            ),
            SourceKind::Pdf => format!(
                "Our menu item is {}. The price is Rp {}. Short description: {}. Current stock is {} units.",
                self.name, self.price, self.description, self.stock
            ),
        }
    }
}

pub struct DocumentProcessor;

impl DocumentProcessor {
    pub fn parse(bytes: &[u8], kind: SourceKind) -> AppResult<Vec<MenuRecord>> {
        match kind {
            SourceKind::Csv => Self::parse_csv(bytes),
            SourceKind::Pdf => Self::parse_pdf(bytes),
        }
    }

    /// Parse a menu CSV with a `Name,Price,Description,Stock` header.
    ///
    /// Columns are matched by header name, so their order does not matter.
    /// A missing column or a short row leaves those cells empty; only an
    /// unreadable file is an error.
    pub fn parse_csv(bytes: &[u8]) -> AppResult<Vec<MenuRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(bytes);

        let headers = reader
            .headers()
            .map_err(|e| AppError::Ingestion(format!("Unreadable CSV header: {}", e)))?
            .clone();
        let columns = CSV_COLUMNS.map(|name| headers.iter().position(|h| h == name));
        for (name, index) in CSV_COLUMNS.iter().zip(columns.iter()) {
            if index.is_none() && !headers.is_empty() {
                warn!(column = *name, "CSV header has no such column, values will be empty");
            }
        }

        let mut records = Vec::new();
        for (line, row) in reader.records().enumerate() {
            let row = row.map_err(|e| {
                AppError::Ingestion(format!("Unreadable CSV row {}: {}", line + 1, e))
            })?;
            let cell = |column: Option<usize>| {
                column
                    .and_then(|i| row.get(i))
                    .unwrap_or_default()
                    .to_string()
            };
            let record = MenuRecord {
                name: cell(columns[0]),
                price: cell(columns[1]),
                description: cell(columns[2]),
                stock: cell(columns[3]),
            };
            debug!(name = %record.name, "Parsed CSV menu row");
            records.push(record);
        }
        Ok(records)
    }

    /// Extract menu records from a PDF table.
    ///
    /// The extracted text is expected to be one header line followed by
    /// repeating runs of four lines: name, price, description, stock.
    /// A trailing partial run is dropped.
    pub fn parse_pdf(bytes: &[u8]) -> AppResult<Vec<MenuRecord>> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| AppError::Ingestion(format!("Unreadable PDF: {}", e)))?;
        let pages: Vec<u32> = document.get_pages().keys().copied().collect();
        let text = document
            .extract_text(&pages)
            .map_err(|e| AppError::Ingestion(format!("Failed to extract PDF text: {}", e)))?;
        Ok(Self::group_lines(&text))
    }

    /// Group non-blank lines (after the header) into four-line menu records.
    pub fn group_lines(text: &str) -> Vec<MenuRecord> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .skip(1)
            .collect();

        let chunks = lines.chunks_exact(4);
        let leftover = chunks.remainder().len();
        if leftover > 0 {
            warn!(leftover, "Dropping incomplete trailing menu entry from PDF text");
        }

        chunks
            .map(|chunk| MenuRecord {
                name: chunk[0].to_string(),
                price: chunk[1].to_string(),
                description: chunk[2].to_string(),
                stock: chunk[3].to_string(),
            })
            .collect()
    }
}
