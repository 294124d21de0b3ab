use crate::error::{MergeError, MergeResult, SourceKind};
use crate::model::{CellValue, Record};
use chrono::{Days, NaiveDate, NaiveTime};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use umya_spreadsheet::reader::xlsx;
use umya_spreadsheet::{Cell, Spreadsheet, Worksheet};

/// A loaded workbook whose active sheet supplies the merge records.
pub struct RecordSource {
    path: Option<PathBuf>,
    spreadsheet: Spreadsheet,
}

impl RecordSource {
    pub fn open(path: &Path) -> MergeResult<Self> {
        let spreadsheet = xlsx::read(path).map_err(|err| {
            MergeError::source_read(
                SourceKind::Spreadsheet,
                Some(path.to_path_buf()),
                err.to_string(),
            )
        })?;
        Self::from_spreadsheet(Some(path.to_path_buf()), spreadsheet)
    }

    pub fn from_bytes(bytes: &[u8]) -> MergeResult<Self> {
        let spreadsheet = xlsx::read_reader(Cursor::new(bytes), true).map_err(|err| {
            MergeError::source_read(SourceKind::Spreadsheet, None, err.to_string())
        })?;
        Self::from_spreadsheet(None, spreadsheet)
    }

    fn from_spreadsheet(path: Option<PathBuf>, spreadsheet: Spreadsheet) -> MergeResult<Self> {
        if spreadsheet.get_sheet_collection().is_empty() {
            return Err(MergeError::source_read(
                SourceKind::Spreadsheet,
                path,
                "workbook contains no worksheets",
            ));
        }
        Ok(Self { path, spreadsheet })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn sheet(&self) -> &Worksheet {
        self.spreadsheet.get_active_sheet()
    }

    pub fn sheet_name(&self) -> &str {
        self.sheet().get_name()
    }

    /// Header texts of row 1, in column order. Blank header cells are omitted.
    pub fn headers(&self) -> Vec<String> {
        header_columns(self.sheet())
            .into_iter()
            .map(|(_, name)| name)
            .collect()
    }

    /// One pass over the data rows below the header. Call again to restart.
    pub fn records(&self) -> Records<'_> {
        let sheet = self.sheet();
        let (_, max_row) = sheet.get_highest_column_and_row();
        let headers = header_columns(sheet);
        tracing::debug!(
            sheet = sheet.get_name(),
            columns = headers.len(),
            data_rows = max_row.saturating_sub(1),
            "reading records"
        );
        Records {
            sheet,
            headers,
            next_row: 2,
            last_row: max_row,
        }
    }
}

fn header_columns(sheet: &Worksheet) -> Vec<(u32, String)> {
    let (max_col, _) = sheet.get_highest_column_and_row();
    (1..=max_col)
        .filter_map(|col| {
            let header = sheet.get_cell((col, 1u32)).map(cell_to_value)?;
            let name = header.to_string();
            if name.is_empty() { None } else { Some((col, name)) }
        })
        .collect()
}

/// Lazy record sequence over one worksheet.
pub struct Records<'a> {
    sheet: &'a Worksheet,
    headers: Vec<(u32, String)>,
    next_row: u32,
    last_row: u32,
}

impl Iterator for Records<'_> {
    type Item = Record;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_row > self.last_row {
            return None;
        }
        let row = self.next_row;
        self.next_row += 1;

        let mut record = Record::new((row - 1) as usize);
        for (col, name) in &self.headers {
            let value = self
                .sheet
                .get_cell((*col, row))
                .map(cell_to_value)
                .unwrap_or_default();
            record.insert(name.clone(), value);
        }
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.last_row + 1).saturating_sub(self.next_row) as usize;
        (remaining, Some(remaining))
    }
}

pub fn cell_to_value(cell: &Cell) -> CellValue {
    let raw = cell.get_value();
    if raw.is_empty() {
        return CellValue::Empty;
    }

    match cell.get_data_type() {
        "s" | "str" | "inlineStr" => CellValue::Text(raw.to_string()),
        "b" => CellValue::Bool(raw.eq_ignore_ascii_case("true") || raw == "1"),
        "e" => CellValue::Error(raw.to_string()),
        _ => match raw.parse::<f64>() {
            Ok(number) if is_date_cell(cell) => {
                excel_serial_to_value(number).unwrap_or(CellValue::Number(number))
            }
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(raw.to_string()),
        },
    }
}

fn is_date_cell(cell: &Cell) -> bool {
    cell.get_style()
        .get_number_format()
        .map(|fmt| is_date_format(fmt.get_format_code()))
        .unwrap_or(false)
}

/// True when a number format code renders a calendar date. Quoted literals,
/// bracketed sections (`[h]`, `[Red]`) and escaped characters are ignored.
pub fn is_date_format(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut escaped = false;
    for ch in code.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ if in_quotes || in_brackets => {}
            'd' | 'D' | 'y' | 'Y' => return true,
            _ => {}
        }
    }
    false
}

/// Convert a 1900-system serial to a date, keeping the time of day when present.
pub fn excel_serial_to_value(serial: f64) -> Option<CellValue> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    // Serials below 61 predate the phantom 1900-02-29.
    let epoch = if serial < 61.0 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    let date = epoch.checked_add_days(Days::new(serial.trunc() as u64))?;
    let seconds = (serial.fract() * 86_400.0).round() as u32;
    if seconds == 0 {
        return Some(CellValue::Date(date));
    }
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds.min(86_399), 0)?;
    Some(CellValue::DateTime(date.and_time(time)))
}
