//! Record extraction: apply an [`ImportConfig`] to a sheet and normalize the
//! mapped cells into [`PayrollRecord`]s.

use std::{path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use encoding_rs::Encoding;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    cli::ExtractArgs,
    config::ImportConfig,
    detect::DetectOptions,
    hints::PayrollField,
    io_utils, require_detection,
    sheet::{Cell, Sheet},
};

const NATIONAL_ID_DIGITS: usize = 13;
/// Two-digit years below this pivot are read as 20YY.
const TWO_DIGIT_YEAR_PIVOT: u32 = 50;

static UNMAPPED: Cell = Cell::Empty;

pub const RECORD_HEADERS: [&str; 6] = [
    "name",
    "national_id",
    "join_date",
    "leave_date",
    "wage",
    "phone",
];

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayrollRecord {
    pub name: String,
    pub national_id: String,
    pub join_date: String,
    pub leave_date: String,
    pub wage: i64,
    pub phone: String,
}

impl PayrollRecord {
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.national_id.clone(),
            self.join_date.clone(),
            self.leave_date.clone(),
            self.wage.to_string(),
            self.phone.clone(),
        ]
    }
}

pub fn execute(args: &ExtractArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let workbook = io_utils::load_workbook(&args.input.inputs, args.input.delimiter, encoding)?;

    let (sheet, config) = match &args.config {
        Some(path) => {
            let config = ImportConfig::load(path)
                .with_context(|| format!("Loading import config from {path:?}"))?;
            let options = DetectOptions {
                preferred_sheet: Some(config.sheet_name.clone()),
                sheet_keywords: if config.sheet_keywords.is_empty() {
                    DetectOptions::default().sheet_keywords
                } else {
                    config.sheet_keywords.clone()
                },
                ..DetectOptions::default()
            };
            let sheet = io_utils::sheet_for(&workbook, args.input.sheet.as_deref(), &options)?;
            (sheet, config)
        }
        None => {
            let options = args.input.detect_options();
            let sheet = io_utils::sheet_for(&workbook, args.input.sheet.as_deref(), &options)?;
            let result = require_detection(sheet, &options)?;
            let config = ImportConfig::from_detection(&result, &options.sheet_keywords);
            (sheet, config)
        }
    };

    let records = extract_records(sheet, &config);
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;
    write_records(
        args.output.as_deref(),
        &records,
        args
            .output_delimiter
            .unwrap_or(io_utils::DEFAULT_CSV_DELIMITER),
        output_encoding,
    )?;
    info!(
        "Extracted {} record(s) from sheet '{}'",
        records.len(),
        sheet.name
    );
    Ok(())
}

/// Reads every row from the configured data start to the end of the sheet.
/// Rows without a name are skipped.
pub fn extract_records(sheet: &Sheet, config: &ImportConfig) -> Vec<PayrollRecord> {
    let start = config.data_start_row.saturating_sub(1);
    let read = |row: usize, field: PayrollField| mapped_cell(sheet, config, row, field);

    (start..sheet.row_count())
        .filter_map(|row| {
            let name = plain_text(read(row, PayrollField::Name));
            if name.is_empty() {
                return None;
            }
            Some(PayrollRecord {
                name,
                national_id: normalize_national_id(read(row, PayrollField::NationalId)),
                join_date: normalize_date(read(row, PayrollField::JoinDate)),
                leave_date: normalize_date(read(row, PayrollField::LeaveDate)),
                wage: parse_amount(read(row, PayrollField::Wage)),
                phone: plain_text(read(row, PayrollField::Phone)),
            })
        })
        .collect()
}

fn mapped_cell<'a>(
    sheet: &'a Sheet,
    config: &ImportConfig,
    row: usize,
    field: PayrollField,
) -> &'a Cell {
    match config.column(field) {
        Some(column) => sheet.cell(row, column),
        None => &UNMAPPED,
    }
}

fn plain_text(cell: &Cell) -> String {
    cell.text()
        .map(|text| text.trim().to_string())
        .unwrap_or_default()
}

/// Digits only, zero-padded to 13 when a spreadsheet dropped leading zeros.
pub fn normalize_national_id(cell: &Cell) -> String {
    let digits: String = plain_text(cell)
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if !digits.is_empty() && digits.len() < NATIONAL_ID_DIGITS {
        format!("{digits:0>width$}", width = NATIONAL_ID_DIGITS)
    } else {
        digits
    }
}

/// Renders a date cell as `YYYY-MM-DD`; unrecognized text is returned trimmed.
pub fn normalize_date(cell: &Cell) -> String {
    static SHORT_YEAR: OnceLock<Regex> = OnceLock::new();
    static LONG_YEAR: OnceLock<Regex> = OnceLock::new();

    match cell {
        Cell::Empty => String::new(),
        Cell::Number(serial) => serial_to_date(*serial)
            .map(|date| date.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        Cell::Text(raw) => {
            let text = raw.trim();
            if text.len() == 8 && text.chars().all(|ch| ch.is_ascii_digit()) {
                return format!("{}-{}-{}", &text[..4], &text[4..6], &text[6..]);
            }
            let short = SHORT_YEAR.get_or_init(|| {
                Regex::new(r"^(\d{2})\.(\d{1,2})\.(\d{1,2})$").expect("valid pattern")
            });
            if let Some(caps) = short.captures(text) {
                let yy: u32 = caps[1].parse().unwrap_or(0);
                let century = if yy < TWO_DIGIT_YEAR_PIVOT { 2000 } else { 1900 };
                return format!("{}-{:0>2}-{:0>2}", century + yy, &caps[2], &caps[3]);
            }
            let long = LONG_YEAR.get_or_init(|| {
                Regex::new(r"^(\d{4})[./-](\d{1,2})[./-](\d{1,2})$").expect("valid pattern")
            });
            if let Some(caps) = long.captures(text) {
                return format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]);
            }
            text.to_string()
        }
    }
}

/// Spreadsheet serial day number to a calendar date (epoch 1899-12-30).
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.trunc() as u64;
    // serials before 60 precede the phantom 1900-02-29
    let days = if days < 60 { days + 1 } else { days };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(days))
}

/// Whole currency units; unparsable values read as 0.
pub fn parse_amount(cell: &Cell) -> i64 {
    match cell {
        Cell::Number(value) => value.trunc() as i64,
        Cell::Text(text) => {
            let cleaned: String = text
                .chars()
                .filter(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-'))
                .collect();
            cleaned
                .parse::<f64>()
                .map(|value| value.trunc() as i64)
                .unwrap_or(0)
        }
        Cell::Empty => 0,
    }
}

pub fn write_records(
    path: Option<&Path>,
    records: &[PayrollRecord],
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<()> {
    let mut writer = io_utils::open_csv_writer(path, delimiter, encoding)?;
    writer
        .write_record(RECORD_HEADERS)
        .context("Writing record header")?;
    for (idx, record) in records.iter().enumerate() {
        writer
            .write_record(record.to_row())
            .with_context(|| format!("Writing record {}", idx + 1))?;
    }
    writer.flush().context("Flushing extracted records")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    #[test]
    fn national_ids_are_digits_padded_to_thirteen() {
        assert_eq!(normalize_national_id(&text("950101-1234567")), "9501011234567");
        assert_eq!(
            normalize_national_id(&Cell::Number(5_214_567_890.0)),
            "0005214567890"
        );
        assert_eq!(normalize_national_id(&Cell::Empty), "");
    }

    #[test]
    fn dates_normalize_to_iso() {
        assert_eq!(normalize_date(&Cell::Number(45_306.0)), "2024-01-15");
        assert_eq!(normalize_date(&Cell::Number(1.0)), "1900-01-01");
        assert_eq!(normalize_date(&Cell::Number(61.0)), "1900-03-01");
        assert_eq!(normalize_date(&Cell::Number(0.5)), "");
        assert_eq!(serial_to_date(0.0), None);
        assert_eq!(serial_to_date(-3.0), None);
        assert_eq!(normalize_date(&text("2024-01-15")), "2024-01-15");
        assert_eq!(normalize_date(&text("20240115")), "2024-01-15");
        assert_eq!(normalize_date(&text("24.1.5")), "2024-01-05");
        assert_eq!(normalize_date(&text("98.12.31")), "1998-12-31");
        assert_eq!(normalize_date(&text("2024/3/9")), "2024-03-09");
        assert_eq!(normalize_date(&text("재직중")), "재직중");
        assert_eq!(normalize_date(&Cell::Empty), "");
    }

    #[test]
    fn amounts_truncate_and_default_to_zero() {
        assert_eq!(parse_amount(&Cell::Number(2_500_000.7)), 2_500_000);
        assert_eq!(parse_amount(&text("3,000,000원")), 3_000_000);
        assert_eq!(parse_amount(&text("없음")), 0);
        assert_eq!(parse_amount(&Cell::Empty), 0);
    }

    #[test]
    fn extraction_skips_nameless_rows_and_tolerates_short_rows() {
        let sheet = Sheet::new(
            "임금대장",
            vec![
                vec![text("성명"), text("주민번호"), text("급여총액")],
                vec![text("김철수"), text("950101-1234567"), Cell::Number(3_000_000.0)],
                vec![Cell::Empty, Cell::Empty, Cell::Number(5_500_000.0)],
                vec![text("이영희")],
            ],
        );
        let config = ImportConfig {
            version: crate::config::CURRENT_CONFIG_VERSION,
            sheet_name: sheet.name.clone(),
            sheet_keywords: Vec::new(),
            header_row: 1,
            data_start_row: 2,
            columns: BTreeMap::from([
                ("name".to_string(), 1),
                ("nationalId".to_string(), 2),
                ("wage".to_string(), 3),
                ("phone".to_string(), 7),
            ]),
            low_confidence: false,
        };
        let records = extract_records(&sheet, &config);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].national_id, "9501011234567");
        assert_eq!(records[0].wage, 3_000_000);
        assert_eq!(records[1].name, "이영희");
        assert_eq!(records[1].wage, 0);
        assert_eq!(records[1].phone, "");
    }
}
