use anyhow::Result;
use log::info;

use crate::{cli::PreviewArgs, io_utils, sheet::Sheet, table};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let workbook = io_utils::load_workbook(&args.input.inputs, args.input.delimiter, encoding)?;
    let sheet = io_utils::sheet_for(
        &workbook,
        args.input.sheet.as_deref(),
        &args.input.detect_options(),
    )?;

    let (headers, rows) = preview_rows(sheet, args.rows);
    table::print_table(&headers, &rows);
    info!(
        "Displayed {} of {} row(s) from sheet '{}'",
        rows.len(),
        sheet.row_count(),
        sheet.name
    );
    Ok(())
}

/// Grid rows labelled with one-based row and column numbers, matching the
/// numbering used by detection reports.
pub fn preview_rows(sheet: &Sheet, limit: usize) -> (Vec<String>, Vec<Vec<String>>) {
    let width = sheet.rows.iter().take(limit).map(Vec::len).max().unwrap_or(0);
    let headers = std::iter::once("row".to_string())
        .chain((1..=width).map(|column| column.to_string()))
        .collect();
    let rows = sheet
        .rows
        .iter()
        .take(limit)
        .enumerate()
        .map(|(idx, row)| {
            std::iter::once((idx + 1).to_string())
                .chain((0..width).map(|column| {
                    row.get(column)
                        .and_then(|cell| cell.text())
                        .map(|text| text.into_owned())
                        .unwrap_or_default()
                }))
                .collect()
        })
        .collect();
    (headers, rows)
}
