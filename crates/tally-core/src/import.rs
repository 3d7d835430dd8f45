//! Statement import: row sources, row parsing, categorization, persistence
//!
//! Documents are turned into a lazy stream of [`RawRow`]s (CSV exports, or
//! statement text scanned line by line, PDFs included). Each row is parsed,
//! categorized and collected; rows that fail to parse are skipped and reported,
//! never fatal. A document with no usable rows is an import error and nothing
//! is stored.

use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::categorize::Categorizer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::health::{summarize, SummaryRow};
use crate::keywords::keyword_category;
use crate::models::{CategorySource, NewTransaction, Statement};
use crate::store::{PatternUses, RecordStore};

/// Longest description kept from a scanned statement line
const MAX_SCANNED_DESCRIPTION: usize = 50;

/// A row as found in the document, before any parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source document
    pub line: usize,
    pub date: String,
    pub description: String,
    pub amount: String,
}

/// Why a row could not become a transaction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("unparsable date '{0}'")]
    BadDate(String),
    #[error("unparsable amount '{0}'")]
    BadAmount(String),
    #[error("missing {0}")]
    MissingField(&'static str),
    #[error("empty description")]
    EmptyDescription,
    #[error("no dollar amount on dated line")]
    NoAmount,
    #[error("both debit '{0}' and credit '{1}' are set")]
    DebitAndCredit(String, String),
    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// A row left out of an import, with the reason shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: usize,
    pub reason: String,
}

impl SkippedRow {
    pub fn new(line: usize, error: RowError) -> Self {
        Self {
            line,
            reason: error.to_string(),
        }
    }
}

/// Item produced by every row source
pub type RowResult = std::result::Result<RawRow, SkippedRow>;

/// Supported statement document types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Csv,
    Text,
    Pdf,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Text => "text",
            Self::Pdf => "pdf",
        }
    }

    /// Guess the format from the file name, falling back to the content
    pub fn detect(filename: &str, bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            return Self::Pdf;
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match extension.as_deref() {
            Some("pdf") => Self::Pdf,
            Some("csv") => Self::Csv,
            Some("txt") => Self::Text,
            _ => {
                let first_line = bytes
                    .split(|b| *b == b'\n')
                    .next()
                    .map(|l| String::from_utf8_lossy(l).to_lowercase())
                    .unwrap_or_default();
                if first_line.contains(',') && first_line.contains("date") {
                    Self::Csv
                } else {
                    Self::Text
                }
            }
        }
    }
}

impl std::str::FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "text" | "txt" => Ok(Self::Text),
            "pdf" => Ok(Self::Pdf),
            _ => Err(format!("Unknown document format: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CSV source
// ---------------------------------------------------------------------------

const DATE_HEADERS: &[&str] = &[
    "date",
    "transaction date",
    "posting date",
    "post date",
    "posted date",
    "trans date",
];
const DESCRIPTION_HEADERS: &[&str] = &[
    "description",
    "transaction description",
    "details",
    "memo",
    "payee",
    "name",
];
const AMOUNT_HEADERS: &[&str] = &["amount", "transaction amount"];

#[derive(Debug, Clone, Copy)]
enum AmountColumns {
    Single(usize),
    /// Separate debit and credit columns, both holding positive numbers
    Split { debit: usize, credit: usize },
}

#[derive(Debug, Clone, Copy)]
struct CsvColumns {
    date: usize,
    description: usize,
    amount: AmountColumns,
}

impl CsvColumns {
    fn from_headers(headers: &StringRecord) -> Option<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect();
        let find = |candidates: &[&str]| {
            candidates
                .iter()
                .find_map(|c| names.iter().position(|n| n == c))
        };

        let amount = match find(AMOUNT_HEADERS) {
            Some(idx) => AmountColumns::Single(idx),
            None => AmountColumns::Split {
                debit: find(&["debit", "withdrawal", "withdrawals"])?,
                credit: find(&["credit", "deposit", "deposits"])?,
            },
        };

        Some(Self {
            date: find(DATE_HEADERS)?,
            description: find(DESCRIPTION_HEADERS)?,
            amount,
        })
    }

    fn extract(&self, record: &StringRecord) -> RowResult {
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or_default();
        let field = |idx: usize, name: &'static str| {
            record
                .get(idx)
                .map(str::to_string)
                .ok_or_else(|| SkippedRow::new(line, RowError::MissingField(name)))
        };

        let amount = match self.amount {
            AmountColumns::Single(idx) => field(idx, "amount")?,
            AmountColumns::Split { debit, credit } => {
                split_amount(record.get(debit), record.get(credit))
                    .map_err(|e| SkippedRow::new(line, e))?
            }
        };

        Ok(RawRow {
            line,
            date: field(self.date, "date")?,
            description: field(self.description, "description")?,
            amount,
        })
    }
}

/// Combine separate debit and credit cells into one signed amount
///
/// Exports often put `0.00` in the unused cell, so only a non-zero value
/// decides the side. Two non-zero cells are ambiguous and the row is skipped.
fn split_amount(
    debit: Option<&str>,
    credit: Option<&str>,
) -> std::result::Result<String, RowError> {
    let cell = |raw: Option<&str>| -> std::result::Result<Option<f64>, RowError> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => parse_amount(s).map(|a| Some(a.abs())),
            None => Ok(None),
        }
    };
    let debit_value = cell(debit)?;
    let credit_value = cell(credit)?;

    match (debit_value, credit_value) {
        (None, None) => Err(RowError::MissingField("amount")),
        (Some(d), Some(c)) if d != 0.0 && c != 0.0 => Err(RowError::DebitAndCredit(
            debit.unwrap_or_default().trim().to_string(),
            credit.unwrap_or_default().trim().to_string(),
        )),
        (Some(d), _) if d != 0.0 => Ok(format!("{:.2}", -d)),
        (_, Some(c)) => Ok(format!("{:.2}", c)),
        (Some(_), None) => Ok("0.00".to_string()),
    }
}

/// Rows of a CSV export with date, description and amount columns
pub struct CsvRows<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    columns: CsvColumns,
}

/// Open a CSV export, failing if its header has no recognisable layout
pub fn csv_rows<R: Read>(reader: R) -> Result<CsvRows<R>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| Error::Import(format!("Unreadable CSV header: {}", e)))?
        .clone();
    let columns = CsvColumns::from_headers(&headers).ok_or_else(|| {
        Error::Import(format!(
            "Unrecognised CSV layout (need date, description and amount columns, found: {})",
            headers.iter().collect::<Vec<_>>().join(", ")
        ))
    })?;
    debug!("CSV columns: {:?}", columns);

    Ok(CsvRows {
        records: rdr.into_records(),
        columns,
    })
}

impl<R: Read> Iterator for CsvRows<R> {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.records.next()?;
        Some(match result {
            Ok(record) => self.columns.extract(&record),
            Err(e) => {
                let line = e.position().map(|p| p.line() as usize).unwrap_or_default();
                Err(SkippedRow::new(line, RowError::Unreadable(e.to_string())))
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Statement text source
// ---------------------------------------------------------------------------

/// Finds transaction lines in statement text: a leading date and a `$` amount
pub struct LineScanner {
    date: Regex,
    amount: Regex,
    spaces: Regex,
}

impl LineScanner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            date: Regex::new(
                r"^\s*(\d{4}-\d{2}-\d{2}|\d{1,2}-\d{1,2}-\d{4}|\d{1,2}/\d{1,2}(?:/\d{2,4})?)\b",
            )?,
            amount: Regex::new(r"\(\s*\$\s?[\d,]*\d\.\d{2}\s*\)|-?\$\s?-?[\d,]*\d\.\d{2}")?,
            spaces: Regex::new(r"\s+")?,
        })
    }

    /// None for lines that do not start with a date
    pub fn scan(&self, line_no: usize, line: &str) -> Option<RowResult> {
        let date = self.date.captures(line)?.get(1)?;
        let rest = &line[date.end()..];

        // First amount is the transaction; later ones are usually running balances
        let Some(amount) = self.amount.find(rest) else {
            return Some(Err(SkippedRow::new(line_no, RowError::NoAmount)));
        };

        let without_amounts = self.amount.replace_all(rest, " ");
        let description: String = self
            .spaces
            .replace_all(without_amounts.trim(), " ")
            .chars()
            .take(MAX_SCANNED_DESCRIPTION)
            .collect();

        Some(Ok(RawRow {
            line: line_no,
            date: date.as_str().to_string(),
            description: description.trim_end().to_string(),
            amount: amount.as_str().to_string(),
        }))
    }
}

/// Transaction lines of plain statement text
pub struct TextRows {
    lines: std::iter::Enumerate<std::vec::IntoIter<String>>,
    scanner: LineScanner,
}

pub fn text_rows(text: &str) -> Result<TextRows> {
    let lines: Vec<String> = text.lines().map(str::to_string).collect();
    Ok(TextRows {
        lines: lines.into_iter().enumerate(),
        scanner: LineScanner::new()?,
    })
}

impl Iterator for TextRows {
    type Item = RowResult;

    fn next(&mut self) -> Option<Self::Item> {
        for (idx, line) in self.lines.by_ref() {
            if let Some(row) = self.scanner.scan(idx + 1, &line) {
                return Some(row);
            }
        }
        None
    }
}

/// Extract the text layer of a PDF statement
pub fn pdf_text(bytes: &[u8]) -> Result<String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))
}

/// Open any supported document as a row stream
pub fn document_rows<'a>(
    bytes: &'a [u8],
    format: DocumentFormat,
) -> Result<Box<dyn Iterator<Item = RowResult> + 'a>> {
    match format {
        DocumentFormat::Csv => Ok(Box::new(csv_rows(bytes)?)),
        DocumentFormat::Text => {
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::Import("Statement is not valid UTF-8 text".to_string()))?;
            Ok(Box::new(text_rows(text)?))
        }
        DocumentFormat::Pdf => {
            let text = pdf_text(bytes)?;
            Ok(Box::new(text_rows(&text)?))
        }
    }
}

// ---------------------------------------------------------------------------
// Field parsing
// ---------------------------------------------------------------------------

/// Parse a statement date; `MM/DD` takes the reference year
pub fn parse_date(s: &str, reference_year: i32) -> std::result::Result<NaiveDate, RowError> {
    let s = s.trim();
    let slashes = s.matches('/').count();

    let two_digit_year = slashes == 2 && s.rsplit('/').next().is_some_and(|y| y.len() == 2);
    let formats: &[&str] = if two_digit_year {
        &["%m/%d/%y"]
    } else {
        &["%m/%d/%Y", "%Y-%m-%d", "%m-%d-%Y"]
    };

    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    if slashes == 1 {
        let mut parts = s.split('/');
        let month = parts.next().and_then(|m| m.parse::<u32>().ok());
        let day = parts.next().and_then(|d| d.parse::<u32>().ok());
        if let (Some(month), Some(day)) = (month, day) {
            if let Some(date) = NaiveDate::from_ymd_opt(reference_year, month, day) {
                return Ok(date);
            }
        }
    }

    Err(RowError::BadDate(s.to_string()))
}

/// Parse an amount string, handling currency symbols, commas and `(negatives)`
pub fn parse_amount(s: &str) -> std::result::Result<f64, RowError> {
    let cleaned: String = s
        .trim()
        .replace(['$', ',', ' '], "")
        .replace('(', "-")
        .replace(')', "");

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| RowError::BadAmount(s.trim().to_string()))
}

fn parse_row(
    raw: &RawRow,
    reference_year: i32,
) -> std::result::Result<(NaiveDate, String, f64), RowError> {
    let description = raw.description.trim();
    if description.is_empty() {
        return Err(RowError::EmptyDescription);
    }
    let date = parse_date(&raw.date, reference_year)?;
    let amount = parse_amount(&raw.amount)?;
    Ok((date, description.to_string(), amount))
}

// ---------------------------------------------------------------------------
// Importer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Fall back to the built-in keyword table when no learned pattern matches
    pub keyword_defaults: bool,
    /// Year used for `MM/DD` dates
    pub reference_year: i32,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            keyword_defaults: true,
            reference_year: Utc::now().year(),
        }
    }
}

impl ImportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            keyword_defaults: config.keyword_defaults,
            ..Self::default()
        }
    }
}

/// How imported transactions got their categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    pub learned: usize,
    pub keyword: usize,
    pub uncategorized: usize,
}

impl CategoryBreakdown {
    fn count(&mut self, source: CategorySource) {
        match source {
            CategorySource::Learned | CategorySource::Manual => self.learned += 1,
            CategorySource::Keyword => self.keyword += 1,
            CategorySource::Default => self.uncategorized += 1,
        }
    }
}

/// Categorized rows of one document, not yet stored
#[derive(Debug, Clone, Default)]
pub struct PreparedImport {
    pub transactions: Vec<NewTransaction>,
    pub skipped: Vec<SkippedRow>,
    pub breakdown: CategoryBreakdown,
    /// Matches per learned pattern, applied when the statement is stored
    pub pattern_uses: PatternUses,
}

/// Result of a completed import
#[derive(Debug, Clone, Serialize)]
pub struct ImportOutcome {
    pub statement: Statement,
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    pub breakdown: CategoryBreakdown,
}

/// Turns row streams into stored statements for one store
pub struct StatementImporter<'s, S: RecordStore + ?Sized> {
    store: &'s S,
    options: ImportOptions,
}

impl<'s, S: RecordStore + ?Sized> StatementImporter<'s, S> {
    pub fn new(store: &'s S, options: ImportOptions) -> Self {
        Self { store, options }
    }

    /// Parse and categorize rows one at a time
    ///
    /// Nothing is written here; pattern matches are only tallied.
    pub fn prepare<I>(&self, categorizer: &Categorizer<'s, S>, rows: I) -> PreparedImport
    where
        I: IntoIterator<Item = RowResult>,
    {
        let mut prepared = PreparedImport::default();

        for row in rows {
            let raw = match row {
                Ok(raw) => raw,
                Err(skipped) => {
                    warn!("Skipping line {}: {}", skipped.line, skipped.reason);
                    prepared.skipped.push(skipped);
                    continue;
                }
            };

            let (date, description, amount) = match parse_row(&raw, self.options.reference_year) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("Skipping line {}: {}", raw.line, e);
                    prepared.skipped.push(SkippedRow::new(raw.line, e));
                    continue;
                }
            };

            let mut result = categorizer.preview(Some(description.as_str()));
            if let Some(pattern_id) = result.pattern_id {
                *prepared.pattern_uses.entry(pattern_id).or_insert(0) += 1;
            }
            if result.is_uncategorized() && self.options.keyword_defaults {
                if let Some(keyword) = keyword_category(&description) {
                    result = keyword;
                }
            }
            prepared.breakdown.count(result.source);

            prepared.transactions.push(NewTransaction {
                date,
                description,
                amount,
                category: result.category,
                category_confidence: result.confidence,
                source: result.source,
            });
        }

        prepared
    }

    /// Import a row stream as a new statement for the user
    pub fn import<I>(&self, user_id: &str, filename: &str, rows: I) -> Result<ImportOutcome>
    where
        I: IntoIterator<Item = RowResult>,
    {
        let categorizer = Categorizer::load(self.store, user_id)?;
        let prepared = self.prepare(&categorizer, rows);

        if prepared.transactions.is_empty() {
            return Err(Error::Import(format!(
                "No valid transactions found in {} ({} rows skipped)",
                filename,
                prepared.skipped.len()
            )));
        }

        let summary_rows: Vec<SummaryRow> =
            prepared.transactions.iter().map(SummaryRow::from).collect();
        let summary = summarize(&summary_rows);
        let raw_data = serde_json::to_value(&prepared.transactions)?;

        let statement = self.store.create_statement(
            user_id,
            filename,
            &summary,
            &raw_data,
            &prepared.transactions,
            &prepared.pattern_uses,
        )?;

        info!(
            "Imported {} transactions from {} ({} skipped, {} learned, {} keyword, {} uncategorized)",
            prepared.transactions.len(),
            filename,
            prepared.skipped.len(),
            prepared.breakdown.learned,
            prepared.breakdown.keyword,
            prepared.breakdown.uncategorized
        );

        Ok(ImportOutcome {
            statement,
            imported: prepared.transactions.len(),
            skipped: prepared.skipped,
            breakdown: prepared.breakdown,
        })
    }

    /// Detect the document type (unless given) and import it
    pub fn import_document(
        &self,
        user_id: &str,
        filename: &str,
        bytes: &[u8],
        format: Option<DocumentFormat>,
    ) -> Result<ImportOutcome> {
        let format = format.unwrap_or_else(|| DocumentFormat::detect(filename, bytes));
        debug!("Importing {} as {}", filename, format);
        let rows = document_rows(bytes, format)?;
        self.import(user_id, filename, rows)
    }
}
