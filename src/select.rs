//! Picking the payroll sheet out of a multi-sheet workbook.

use log::debug;

use crate::{
    classify::is_national_id,
    detect::DetectOptions,
    sheet::{Sheet, Workbook},
};

/// Sheet-name fragments that mark a payroll ledger.
pub const PAYROLL_SHEET_KEYWORDS: &[&str] =
    &["임금대장", "급여대장", "급여", "임금", "급여현황", "급여명세"];

const ID_WINDOW_ROWS: usize = 30;
const ID_WINDOW_COLUMNS: usize = 30;

/// Best sheet using the default keyword list.
pub fn select_best_sheet(workbook: &Workbook) -> Option<String> {
    select_sheet(workbook, &DetectOptions::default())
}

/// Picks a sheet in tiers: the preferred sheet when it exists, the first sheet
/// (in workbook order) whose name contains a keyword, the sheet with the most
/// national IDs in its top-left corner, and finally the first sheet.
pub fn select_sheet(workbook: &Workbook, options: &DetectOptions) -> Option<String> {
    if let Some(preferred) = options.preferred_sheet.as_deref()
        && workbook.sheet(preferred).is_some()
    {
        return Some(preferred.to_string());
    }

    if let Some(name) = workbook.sheet_names().find(|name| {
        options
            .sheet_keywords
            .iter()
            .any(|keyword| name.contains(keyword.as_str()))
    }) {
        debug!("Selected sheet '{name}' by name");
        return Some(name.to_string());
    }

    let first = workbook.first()?;
    let mut best = (first.name.as_str(), 0usize);
    for sheet in &workbook.sheets {
        let count = national_id_count(sheet);
        if count > best.1 {
            best = (sheet.name.as_str(), count);
        }
    }
    if best.1 > 0 {
        debug!(
            "Selected sheet '{}' holding {} national ID cell(s)",
            best.0, best.1
        );
    }
    Some(best.0.to_string())
}

/// National-ID cells in the sheet's top-left selection window.
pub fn national_id_count(sheet: &Sheet) -> usize {
    sheet
        .rows
        .iter()
        .take(ID_WINDOW_ROWS)
        .map(|row| {
            row.iter()
                .take(ID_WINDOW_COLUMNS)
                .filter(|cell| is_national_id(cell))
                .count()
        })
        .sum()
}
