//! Locating the data region and header row of a sheet.
//!
//! Both locators work on a bounded top-left window of the sheet. Results carry
//! the evidence they were derived from so that guessed positions can be told
//! apart from pattern-backed ones.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{classify::is_national_id, hints::match_header_hint, sheet::Sheet};

pub const MAX_SCAN_ROWS: usize = 100;
pub const MAX_SCAN_COLUMNS: usize = 100;
/// Sheets with fewer rows than this cannot hold a header plus data.
pub const MIN_SHEET_ROWS: usize = 3;
/// Zero-based data start used when no row looks like data.
pub const DEFAULT_DATA_START: usize = 2;
pub const HEADER_LOOKBACK_ROWS: usize = 3;

const NUMERIC_ROW_MIN_CELLS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataStartSource {
    /// First row holding a national ID.
    NationalId,
    /// First row with several numeric cells.
    NumericRow,
    /// Nothing looked like data; fixed default row.
    DefaultRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderSource {
    KeywordMatch,
    /// No caption matched; the row just above the data was assumed.
    RowAboveData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataStart {
    pub row: usize,
    pub source: DataStartSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderRow {
    pub row: usize,
    pub source: HeaderSource,
}

/// Row and column limits of the detection window for `sheet`.
pub fn scan_bounds(sheet: &Sheet) -> (usize, usize) {
    (
        sheet.row_count().min(MAX_SCAN_ROWS),
        sheet.width().min(MAX_SCAN_COLUMNS),
    )
}

/// Finds the first data row, or `None` when the sheet is too short.
///
/// Row 0 is never a data row: a header has to fit above the data.
pub fn locate_data_start(sheet: &Sheet) -> Option<DataStart> {
    if sheet.row_count() < MIN_SHEET_ROWS {
        return None;
    }
    let (max_row, max_col) = scan_bounds(sheet);

    let id_row = (1..max_row).find(|&row| {
        sheet
            .row(row)
            .iter()
            .take(max_col)
            .any(is_national_id)
    });
    if let Some(row) = id_row {
        return Some(DataStart {
            row,
            source: DataStartSource::NationalId,
        });
    }

    let numeric_row = (1..max_row).find(|&row| {
        sheet
            .row(row)
            .iter()
            .take(max_col)
            .filter(|cell| cell.is_number())
            .count()
            >= NUMERIC_ROW_MIN_CELLS
    });
    if let Some(row) = numeric_row {
        debug!(
            "Sheet '{}': no national ID found, data starts at numeric row {}",
            sheet.name,
            row + 1
        );
        return Some(DataStart {
            row,
            source: DataStartSource::NumericRow,
        });
    }

    debug!(
        "Sheet '{}': no data-like row found, assuming data starts at row {}",
        sheet.name,
        DEFAULT_DATA_START + 1
    );
    Some(DataStart {
        row: DEFAULT_DATA_START,
        source: DataStartSource::DefaultRow,
    })
}

/// Picks the row above `data_start` with the most header-keyword hits.
///
/// Ties keep the earlier row; with no hits at all the row immediately above
/// the data is used.
pub fn locate_header(sheet: &Sheet, data_start: usize) -> HeaderRow {
    let (_, max_col) = scan_bounds(sheet);
    let fallback = data_start.saturating_sub(1);
    let mut best = HeaderRow {
        row: fallback,
        source: HeaderSource::RowAboveData,
    };
    let mut best_hits = 0usize;

    for row in data_start.saturating_sub(HEADER_LOOKBACK_ROWS)..data_start {
        let hits = header_hits(sheet, row, max_col);
        if hits > best_hits {
            best_hits = hits;
            best = HeaderRow {
                row,
                source: HeaderSource::KeywordMatch,
            };
        }
    }

    if best.source == HeaderSource::RowAboveData {
        debug!(
            "Sheet '{}': no header keywords above data, using row {}",
            sheet.name,
            fallback + 1
        );
    }
    best
}

fn header_hits(sheet: &Sheet, row: usize, max_col: usize) -> usize {
    sheet
        .row(row)
        .iter()
        .take(max_col)
        .filter_map(|cell| cell.text())
        .filter(|text| {
            let trimmed = text.trim();
            !trimmed.is_empty() && match_header_hint(trimmed).is_some()
        })
        .count()
}
