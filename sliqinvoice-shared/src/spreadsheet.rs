/// Spreadsheet codec for export and import
///
/// Exports are single-sheet `.xlsx` workbooks with a bold header row and one
/// row per record. Imports read the first worksheet of any format `calamine`
/// understands and key every cell by its header text.
///
/// # Example
///
/// ```
/// use sliqinvoice_shared::spreadsheet::{read_workbook, write_workbook};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes = write_workbook(
///     "Modules",
///     &["Key", "Name"],
///     vec![vec!["billing".to_string(), "Billing".to_string()]],
/// )?;
///
/// let rows = read_workbook(&bytes)?;
/// assert_eq!(rows[0].get("Key"), Some("billing"));
/// # Ok(())
/// # }
/// ```

use std::collections::HashMap;
use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{DateTime, NaiveDate, Utc};
use rust_xlsxwriter::{Format, Workbook};

/// MIME type of generated workbooks
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Error type for spreadsheet operations
#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    /// Building the workbook failed
    #[error("Failed to write spreadsheet: {0}")]
    Write(String),

    /// The upload is not a readable workbook
    #[error("Failed to read spreadsheet: {0}")]
    Read(String),

    /// The workbook has no worksheet to import
    #[error("Spreadsheet contains no worksheets")]
    NoWorksheet,

    /// The first worksheet has no header row
    #[error("Spreadsheet is empty")]
    Empty,
}

impl From<rust_xlsxwriter::XlsxError> for SpreadsheetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SpreadsheetError::Write(err.to_string())
    }
}

/// Fixed export layout of a record type
pub trait SheetExport {
    /// Worksheet name
    const SHEET_NAME: &'static str;

    /// Header row, in column order
    const EXPORT_HEADERS: &'static [&'static str];

    /// One cell per header, in the same order
    fn export_row(&self) -> Vec<String>;
}

/// Builds a single-sheet workbook in memory
pub fn write_workbook(
    sheet_name: &str,
    headers: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name)?;

    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    let mut written = 0u32;
    for (i, row) in rows.into_iter().enumerate() {
        let row_index = (i + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                worksheet.write_string(row_index, col as u16, value.as_str())?;
            }
        }
        written += 1;
    }

    worksheet.set_freeze_panes(1, 0)?;
    worksheet.autofit();

    let buffer = workbook.save_to_buffer()?;

    tracing::debug!(sheet = sheet_name, rows = written, bytes = buffer.len(), "Workbook written");

    Ok(buffer)
}

/// Exports records using their [`SheetExport`] layout
pub fn export_records<R: SheetExport>(records: &[R]) -> Result<Vec<u8>, SpreadsheetError> {
    write_workbook(
        R::SHEET_NAME,
        R::EXPORT_HEADERS,
        records.iter().map(SheetExport::export_row),
    )
}

/// Download name such as `customers_export_2026-01-31.xlsx`
pub fn export_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{}_export_{}.xlsx", prefix, date.format("%Y-%m-%d"))
}

/// Timestamp format used in exported cells
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// A data row of an uploaded sheet, keyed by header text
#[derive(Debug, Clone, Default)]
pub struct SheetRow {
    /// 1-based row number as shown by spreadsheet applications
    pub number: usize,

    cells: HashMap<String, String>,
}

impl SheetRow {
    /// Builds a row from header/value pairs
    pub fn new<I, K, V>(number: usize, cells: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            number,
            cells: cells
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Trimmed cell text under `header`, `None` when missing or blank
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .get(header)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Whether every cell is blank
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(|v| v.trim().is_empty())
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Phone numbers and IDs typed into a sheet come back as floats
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Reads the first worksheet of an uploaded workbook
///
/// The first non-empty row is the header row. Header text is trimmed and
/// matched exactly; columns with an empty header are ignored.
///
/// # Errors
///
/// Fails when the bytes are not a workbook, when it has no worksheet, or when
/// the first worksheet is empty.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<SheetRow>, SpreadsheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)?
        .map_err(|e| SpreadsheetError::Read(e.to_string()))?;

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows().enumerate();

    let headers: Vec<String> = loop {
        match rows.next() {
            Some((_, cells)) if cells.iter().all(|c| cell_text(c).trim().is_empty()) => continue,
            Some((_, cells)) => break cells.iter().map(|c| cell_text(c).trim().to_string()).collect(),
            None => return Err(SpreadsheetError::Empty),
        }
    };

    let parsed: Vec<SheetRow> = rows
        .map(|(offset, cells)| {
            let pairs = headers
                .iter()
                .zip(cells.iter())
                .filter(|(header, _)| !header.is_empty())
                .map(|(header, cell)| (header.clone(), cell_text(cell)));
            SheetRow::new(first_row + offset + 1, pairs)
        })
        .collect();

    tracing::debug!(rows = parsed.len(), columns = headers.len(), "Workbook read");

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Item {
        code: &'static str,
        label: &'static str,
    }

    impl SheetExport for Item {
        const SHEET_NAME: &'static str = "Items";
        const EXPORT_HEADERS: &'static [&'static str] = &["Code", "Label"];

        fn export_row(&self) -> Vec<String> {
            vec![self.code.to_string(), self.label.to_string()]
        }
    }

    #[test]
    fn test_export_then_read_back() {
        let bytes = export_records(&[
            Item { code: "a-1", label: "First" },
            Item { code: "b-2", label: "" },
        ])
        .expect("workbook should build");

        assert!(bytes.starts_with(b"PK"), "xlsx is a zip container");

        let rows = read_workbook(&bytes).expect("workbook should parse");
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].number, 2);
        assert_eq!(rows[0].get("Code"), Some("a-1"));
        assert_eq!(rows[0].get("Label"), Some("First"));

        assert_eq!(rows[1].number, 3);
        assert_eq!(rows[1].get("Label"), None);
        assert_eq!(rows[1].get("Missing Column"), None);
    }

    #[test]
    fn test_read_rejects_garbage() {
        let err = read_workbook(b"definitely not a spreadsheet").unwrap_err();
        assert!(matches!(err, SpreadsheetError::Read(_)));
    }

    #[test]
    fn test_header_only_sheet_has_no_rows() {
        let bytes = write_workbook("Empty", &["Key", "Name"], Vec::new()).unwrap();
        let rows = read_workbook(&bytes).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_sheet_row_blank() {
        let row = SheetRow::new(4, [("Name", "  "), ("Email", "")]);
        assert!(row.is_blank());

        let row = SheetRow::new(5, [("Name", "Ada")]);
        assert!(!row.is_blank());
    }

    #[test]
    fn test_cell_text_numbers() {
        assert_eq!(cell_text(&Data::Float(5551234.0)), "5551234");
        assert_eq!(cell_text(&Data::Float(1.5)), "1.5");
        assert_eq!(cell_text(&Data::Int(7)), "7");
        assert_eq!(cell_text(&Data::Empty), "");
    }

    #[test]
    fn test_export_filename() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        assert_eq!(export_filename("customers", date), "customers_export_2026-01-31.xlsx");
    }
}
