//! Per-column type profiling over a bounded window of data rows.

use std::cmp::Reverse;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    classify::{ColumnType, classify},
    hints::match_header_hint,
    locate::scan_bounds,
    sheet::{Cell, Sheet},
};

/// Data rows sampled per column, counted from the data start.
pub const SAMPLE_ROWS: usize = 30;
pub const MAX_SAMPLE_VALUES: usize = 3;
pub const SAMPLE_VALUE_CHARS: usize = 20;

/// Header rows above the header row consulted when a caption is missing.
const HEADER_INHERIT_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDetection {
    pub column_index: usize,
    pub dominant_type: ColumnType,
    pub confidence: f64,
    pub sample_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_hint: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ColumnAccumulator {
    counts: [usize; ColumnType::ALL.len()],
    first_seen: [Option<usize>; ColumnType::ALL.len()],
    recorded: usize,
    samples: Vec<String>,
}

impl ColumnAccumulator {
    fn record(&mut self, cell: &Cell) {
        let kind = classify(cell);
        self.counts[kind.index()] += 1;
        self.first_seen[kind.index()].get_or_insert(self.recorded);
        self.recorded += 1;
        if kind != ColumnType::Empty
            && self.samples.len() < MAX_SAMPLE_VALUES
            && let Some(text) = cell.text()
        {
            self.samples
                .push(text.chars().take(SAMPLE_VALUE_CHARS).collect());
        }
    }

    fn non_empty(&self) -> usize {
        ColumnType::ALL
            .iter()
            .filter(|kind| **kind != ColumnType::Empty)
            .map(|kind| self.counts[kind.index()])
            .sum()
    }

    /// Most frequent non-empty type; ties go to the type seen first.
    fn dominant(&self) -> (ColumnType, usize) {
        ColumnType::ALL
            .into_iter()
            .filter(|kind| *kind != ColumnType::Empty && self.counts[kind.index()] > 0)
            .min_by_key(|kind| {
                (
                    Reverse(self.counts[kind.index()]),
                    self.first_seen[kind.index()],
                )
            })
            .map_or((ColumnType::Text, 0), |kind| (kind, self.counts[kind.index()]))
    }
}

/// Profiles every column of the detection window from `data_start` on.
///
/// Columns without a single non-empty sampled cell are left out. A column
/// whose header caption corroborates its dominant type gets `header_boost`
/// added to its confidence, kept within `[0, 1]`.
pub fn profile_columns(
    sheet: &Sheet,
    header_row: usize,
    data_start: usize,
    header_boost: f64,
) -> Vec<ColumnDetection> {
    let (max_row, max_col) = scan_bounds(sheet);
    let sample_end = (data_start + SAMPLE_ROWS).min(max_row);

    let mut accumulators = vec![ColumnAccumulator::default(); max_col];
    for row in data_start..sample_end {
        for (column, accumulator) in accumulators.iter_mut().enumerate() {
            accumulator.record(sheet.cell(row, column));
        }
    }

    accumulators
        .into_iter()
        .enumerate()
        .filter_map(|(column, accumulator)| {
            let total = accumulator.non_empty();
            if total == 0 {
                return None;
            }
            let (dominant_type, count) = accumulator.dominant();
            let base = count as f64 / total as f64;
            let header_hint = header_hint(sheet, header_row, column);
            let corroborated = header_hint
                .as_deref()
                .and_then(match_header_hint)
                .is_some_and(|field| field.expected_types().contains(&dominant_type));
            let confidence = if corroborated {
                boosted_confidence(base, header_boost)
            } else {
                base
            };
            Some(ColumnDetection {
                column_index: column,
                dominant_type,
                confidence,
                sample_values: accumulator.samples,
                header_hint,
            })
        })
        .collect()
}

fn boosted_confidence(base: f64, header_boost: f64) -> f64 {
    if header_boost.is_nan() {
        return base;
    }
    (base + header_boost).clamp(0.0, 1.0)
}

/// Caption text for `column`, approximating merged header cells.
///
/// An empty header cell inherits the nearest caption to its left, then the
/// nearest one above. The cell one row above the header row is prepended so
/// two-level headers keep both captions.
pub fn header_hint(sheet: &Sheet, header_row: usize, column: usize) -> Option<String> {
    let own = sheet.cell(header_row, column);
    let resolved = if !own.is_blank() {
        Some(own)
    } else {
        (0..column)
            .rev()
            .map(|left| sheet.cell(header_row, left))
            .find(|cell| !cell.is_blank())
            .or_else(|| {
                (header_row.saturating_sub(HEADER_INHERIT_ROWS)..header_row)
                    .rev()
                    .map(|up| sheet.cell(up, column))
                    .find(|cell| !cell.is_blank())
            })
    };
    let above = sheet.cell(header_row.saturating_sub(1), column);

    let hint = [Some(above), resolved]
        .into_iter()
        .flatten()
        .filter_map(Cell::text)
        .map(|text| text.replace("\r\n", " ").replace('\n', " ").trim().to_string())
        .filter(|text| !text.is_empty())
        .unique()
        .join(" ");
    (!hint.is_empty()).then_some(hint)
}
