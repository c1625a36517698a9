//! End-to-end column detection for one sheet.
//!
//! Pipeline: locate the data start, locate the header above it, profile the
//! columns of the sampled data window, then map fields. The result is a plain
//! value; nothing is cached between calls, so identical input always yields an
//! identical [`DetectionResult`].

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    locate::{DataStartSource, HeaderSource, locate_data_start, locate_header},
    mapper::{FieldMapping, map_fields},
    profile::{ColumnDetection, profile_columns},
    select::PAYROLL_SHEET_KEYWORDS,
    sheet::{Sheet, Workbook},
};

/// Confidence added when a column's header caption agrees with its data.
pub const DEFAULT_HEADER_MATCH_BOOST: f64 = 0.2;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectOptions {
    pub header_match_boost: f64,
    pub sheet_keywords: Vec<String>,
    pub preferred_sheet: Option<String>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            header_match_boost: DEFAULT_HEADER_MATCH_BOOST,
            sheet_keywords: PAYROLL_SHEET_KEYWORDS
                .iter()
                .map(|keyword| keyword.to_string())
                .collect(),
            preferred_sheet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// One-based header row.
    pub header_row: usize,
    /// One-based first data row; always greater than `header_row`.
    pub data_start_row: usize,
    pub columns: Vec<ColumnDetection>,
    pub mapping: FieldMapping,
    pub sheet_name: String,
    pub header_source: HeaderSource,
    pub data_start_source: DataStartSource,
}

impl DetectionResult {
    /// True when the header or data start is a positional guess rather than
    /// something backed by keywords or data patterns.
    pub fn is_low_confidence(&self) -> bool {
        self.header_source == HeaderSource::RowAboveData
            || self.data_start_source == DataStartSource::DefaultRow
    }

    pub fn column(&self, index: usize) -> Option<&ColumnDetection> {
        self.columns
            .iter()
            .find(|detection| detection.column_index == index)
    }
}

pub fn detect_columns(workbook: &Workbook, sheet_name: &str) -> Option<DetectionResult> {
    detect_columns_with(workbook, sheet_name, &DetectOptions::default())
}

pub fn detect_columns_with(
    workbook: &Workbook,
    sheet_name: &str,
    options: &DetectOptions,
) -> Option<DetectionResult> {
    let sheet = workbook.sheet(sheet_name)?;
    detect_sheet(sheet, options)
}

/// Runs detection on a single sheet; `None` when it is too small to hold a
/// header and data.
pub fn detect_sheet(sheet: &Sheet, options: &DetectOptions) -> Option<DetectionResult> {
    let data_start = locate_data_start(sheet)?;
    let header = locate_header(sheet, data_start.row);
    let columns = profile_columns(
        sheet,
        header.row,
        data_start.row,
        options.header_match_boost,
    );
    let mapping = map_fields(&columns);

    debug!(
        "Sheet '{}': header row {}, data from row {}, {} profiled column(s)",
        sheet.name,
        header.row + 1,
        data_start.row + 1,
        columns.len()
    );

    Some(DetectionResult {
        header_row: header.row + 1,
        data_start_row: data_start.row + 1,
        columns,
        mapping,
        sheet_name: sheet.name.clone(),
        header_source: header.source,
        data_start_source: data_start.source,
    })
}

/// One-based column per mapped field, keyed by field name; unmapped fields are
/// omitted.
pub fn to_one_indexed_mapping(result: &DetectionResult) -> BTreeMap<String, usize> {
    result
        .mapping
        .assigned()
        .map(|(field, column)| (field.key().to_string(), column + 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn example_workbook() -> Workbook {
        Workbook::new(vec![Sheet::new(
            "Sheet1",
            vec![
                vec![text("이름"), text("주민번호"), text("급여총액")],
                vec![text("김철수"), text("950101-1234567"), Cell::Number(3_000_000.0)],
                vec![text("이영희"), text("880315-2345678"), Cell::Number(2_500_000.0)],
                vec![text("박민수"), text("921001-3456789"), Cell::Number(2_800_000.0)],
            ],
        )])
    }

    #[test]
    fn detects_reference_layout() {
        let result = detect_columns(&example_workbook(), "Sheet1").expect("detected");
        assert_eq!(result.header_row, 1);
        assert_eq!(result.data_start_row, 2);
        assert_eq!(result.mapping.name, Some(0));
        assert_eq!(result.mapping.national_id, Some(1));
        assert_eq!(result.mapping.wage, Some(2));
        assert!(!result.is_low_confidence());
        assert_eq!(result.column(1).map(|c| c.confidence), Some(1.0));
    }

    #[test]
    fn unknown_sheet_yields_none() {
        assert!(detect_columns(&example_workbook(), "Missing").is_none());
    }

    #[test]
    fn one_indexed_mapping_omits_unmapped_fields() {
        let result = detect_columns(&example_workbook(), "Sheet1").expect("detected");
        let columns = to_one_indexed_mapping(&result);
        assert_eq!(columns.get("name"), Some(&1));
        assert_eq!(columns.get("nationalId"), Some(&2));
        assert_eq!(columns.get("wage"), Some(&3));
        assert!(!columns.contains_key("phone"));
        assert!(!columns.contains_key("joinDate"));
    }
}
