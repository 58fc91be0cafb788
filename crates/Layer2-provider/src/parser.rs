//! Text document parser
//!
//! `txt` and `data` files are UTF-8 text. `csv` files are re-rendered as a
//! right-aligned plain text table (header first, no row index), missing
//! trailing cells shown as `NaN`. There is no PDF text extractor in the
//! stack, so `pdf` is reported as unsupported.

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;
use crate::r#trait::{DocumentFormat, DocumentParser};

/// Parser for plain text, `.data` and CSV reports
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDocumentParser;

impl TextDocumentParser {
    pub fn new() -> Self {
        Self
    }

    fn decode(raw: &[u8]) -> Result<&str, ProviderError> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| ProviderError::Parse(format!("document is not valid UTF-8: {}", e)))?;
        Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
    }
}

#[async_trait]
impl DocumentParser for TextDocumentParser {
    async fn extract_text(
        &self,
        raw: &[u8],
        format: DocumentFormat,
    ) -> Result<String, ProviderError> {
        debug!(format = %format, bytes = raw.len(), "extracting document text");
        match format {
            DocumentFormat::Txt | DocumentFormat::Data => Ok(Self::decode(raw)?.to_string()),
            DocumentFormat::Csv => render_csv_table(Self::decode(raw)?),
            DocumentFormat::Pdf => Err(ProviderError::UnsupportedFormat(
                "pdf text extraction is not available; export the report as txt or csv".to_string(),
            )),
        }
    }
}

/// Split CSV text into records (RFC 4180 quoting, `""` escapes)
pub fn parse_csv(text: &str) -> Result<Vec<Vec<String>>, ProviderError> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    field.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                record.push(std::mem::take(&mut field));
                push_record(&mut records, std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(ProviderError::Parse("unterminated quoted field".to_string()));
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        push_record(&mut records, record);
    }
    Ok(records)
}

fn push_record(records: &mut Vec<Vec<String>>, record: Vec<String>) {
    // blank lines are skipped
    if record.len() == 1 && record[0].trim().is_empty() {
        return;
    }
    records.push(record);
}

/// Render CSV text as an aligned table
pub fn render_csv_table(text: &str) -> Result<String, ProviderError> {
    let mut records = parse_csv(text)?;
    if records.is_empty() {
        return Err(ProviderError::Parse("no columns to parse".to_string()));
    }

    let columns = records[0].len();
    for (line, record) in records.iter_mut().enumerate().skip(1) {
        if record.len() > columns {
            return Err(ProviderError::Parse(format!(
                "expected {} fields in row {}, saw {}",
                columns,
                line + 1,
                record.len()
            )));
        }
        record.resize(columns, "NaN".to_string());
    }

    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            records
                .iter()
                .map(|r| r[col].trim().chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let lines: Vec<String> = records
        .iter()
        .map(|record| {
            record
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:>width$}", cell.trim(), width = *width))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    Ok(lines.join("\n"))
}
