//! CSV rendering of tabular results
//!
//! Output is deterministic: columns in the order received, one `\n`-terminated
//! line per row after the header, fields quoted only when they contain the
//! delimiter, a quote or a line break. NULL renders as an empty field, except
//! that a record made of one empty field is written as `""` so it stays a row.

use crate::error::{BridgeError, Result};
use crate::types::messages::TabularResult;

/// Field delimiter
pub const DELIMITER: u8 = b',';

/// Quote character
pub const QUOTE: u8 = b'"';

/// Line terminator written after every line, header included
pub const LINE_TERMINATOR: u8 = b'\n';

/// File name of every result attachment
pub const DEFAULT_FILENAME: &str = "results.csv";

/// Title shown for the attachment
pub const DEFAULT_TITLE: &str = "Query Results";

/// MIME type of the attachment
pub const CSV_MIME_TYPE: &str = "text/csv";

/// A rendered result ready to attach to a reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvArtifact {
    /// File name, always ending in `.csv`
    pub filename: String,
    /// Display title
    pub title: String,
    /// Encoded CSV bytes
    pub bytes: Vec<u8>,
    /// Data rows (header excluded)
    pub row_count: usize,
    /// Columns
    pub column_count: usize,
}

impl CsvArtifact {
    /// MIME type of the payload
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        CSV_MIME_TYPE
    }

    /// One-line description used in the chat reply
    #[must_use]
    pub fn summary(&self) -> String {
        if self.row_count == 0 {
            "_No results_".to_string()
        } else {
            format!(
                "Returned {} row(s), {} column(s)",
                self.row_count, self.column_count
            )
        }
    }
}

/// Render `result` as a CSV artifact
///
/// # Errors
/// Returns `BridgeError::Csv` if a row cannot be written
pub fn format(result: &TabularResult) -> Result<CsvArtifact> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .quote(QUOTE)
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(LINE_TERMINATOR))
        .from_writer(Vec::new());

    writer.write_record(&result.columns)?;
    for row in &result.rows {
        writer.write_record(row.iter().map(|v| v.to_field().unwrap_or_default()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| BridgeError::Io(e.into_error()))?;

    Ok(CsvArtifact {
        filename: DEFAULT_FILENAME.to_string(),
        title: DEFAULT_TITLE.to_string(),
        bytes,
        row_count: result.row_count(),
        column_count: result.column_count(),
    })
}
