pub mod classify;
pub mod cli;
pub mod config;
pub mod detect;
pub mod extract;
pub mod hints;
pub mod io_utils;
pub mod locate;
pub mod mapper;
pub mod preview;
pub mod profile;
pub mod select;
pub mod sheet;
pub mod table;

use std::{env, io::Write, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{Cli, Commands, OutputFormat},
    config::ImportConfig,
    detect::{DetectOptions, DetectionResult, detect_sheet, to_one_indexed_mapping},
    locate::{DataStartSource, HeaderSource},
    select::{national_id_count, select_sheet},
    sheet::Sheet,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("payroll_detect", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect(args) => handle_detect(&args),
        Commands::Sheets(args) => handle_sheets(&args),
        Commands::Config(args) => handle_config(&args),
        Commands::Extract(args) => extract::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}

/// Detection that must succeed; a sheet too small to hold a header and data
/// is an error for every command.
pub(crate) fn require_detection(sheet: &Sheet, options: &DetectOptions) -> Result<DetectionResult> {
    let result = detect_sheet(sheet, options).ok_or_else(|| {
        anyhow!(
            "Sheet '{}' is too small to detect a header and data rows",
            sheet.name
        )
    })?;
    if result.is_low_confidence() {
        warn!(
            "Layout of sheet '{}' was partly guessed (header: {}, data start: {})",
            sheet.name,
            header_source_label(result.header_source),
            data_start_source_label(result.data_start_source)
        );
    }
    Ok(result)
}

fn handle_detect(args: &cli::DetectArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let workbook = io_utils::load_workbook(&args.input.inputs, args.input.delimiter, encoding)?;
    let options = args.detect_options();
    let sheet = io_utils::sheet_for(&workbook, args.input.sheet.as_deref(), &options)?;
    info!("Detecting columns in sheet '{}'", sheet.name);
    let result = require_detection(sheet, &options)?;

    match args.format {
        OutputFormat::Table => print_detection(&result),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result)
                .context("Serializing detection result to JSON")?;
            println!("{json}");
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(&result)
                .context("Serializing detection result to YAML")?;
            print!("{yaml}");
        }
    }
    info!(
        "Mapped {} field(s) across {} profiled column(s)",
        result.mapping.assigned().count(),
        result.columns.len()
    );
    Ok(())
}

fn print_detection(result: &DetectionResult) {
    println!("Sheet: {}", result.sheet_name);
    println!(
        "Header row: {} ({})",
        result.header_row,
        header_source_label(result.header_source)
    );
    println!(
        "Data start row: {} ({})",
        result.data_start_row,
        data_start_source_label(result.data_start_source)
    );
    if result.is_low_confidence() {
        println!("Low confidence: review the mapping before importing");
    }
    println!();

    let headers = ["column", "type", "confidence", "field", "header", "samples"]
        .map(String::from)
        .to_vec();
    let rows = result
        .columns
        .iter()
        .map(|column| {
            let field = result
                .mapping
                .assigned()
                .find(|(_, index)| *index == column.column_index)
                .map(|(field, _)| field.key().to_string())
                .unwrap_or_default();
            vec![
                (column.column_index + 1).to_string(),
                column.dominant_type.to_string(),
                format!("{:.2}", column.confidence),
                field,
                column.header_hint.clone().unwrap_or_default(),
                column.sample_values.join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    println!();

    let headers = vec!["field".to_string(), "column".to_string()];
    let rows = to_one_indexed_mapping(result)
        .into_iter()
        .map(|(field, column)| vec![field, column.to_string()])
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);

    if !result.mapping.numeric_columns.is_empty() {
        let extra = result
            .mapping
            .numeric_columns
            .iter()
            .map(|numeric| match &numeric.header_hint {
                Some(hint) => format!("{} ({hint})", numeric.column_index + 1),
                None => (numeric.column_index + 1).to_string(),
            })
            .collect::<Vec<_>>();
        println!();
        println!("Other amount columns: {}", extra.join(", "));
    }
}

fn handle_sheets(args: &cli::SheetsArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let workbook = io_utils::load_workbook(&args.input.inputs, args.input.delimiter, encoding)?;
    let selected = select_sheet(&workbook, &args.input.detect_options());
    debug!("Selected sheet: {selected:?}");

    let headers = ["sheet", "rows", "columns", "national_ids", "selected"]
        .map(String::from)
        .to_vec();
    let rows = workbook
        .sheets
        .iter()
        .map(|sheet| {
            let marker = if selected.as_deref() == Some(sheet.name.as_str()) {
                "*"
            } else {
                ""
            };
            vec![
                sheet.name.clone(),
                sheet.row_count().to_string(),
                sheet.width().to_string(),
                national_id_count(sheet).to_string(),
                marker.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input.input_encoding.as_deref())?;
    let workbook = io_utils::load_workbook(&args.input.inputs, args.input.delimiter, encoding)?;
    let options = args.input.detect_options();
    let sheet = io_utils::sheet_for(&workbook, args.input.sheet.as_deref(), &options)?;
    let result = require_detection(sheet, &options)?;
    let config = ImportConfig::from_detection(&result, &options.sheet_keywords);

    match &args.output {
        Some(path) => {
            config
                .save(path)
                .with_context(|| format!("Writing import config to {path:?}"))?;
            info!(
                "Import config for sheet '{}' with {} mapped field(s) written to {:?}",
                config.sheet_name,
                config.columns.len(),
                path
            );
        }
        None => {
            let yaml = config.to_yaml_string()?;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(yaml.as_bytes())
                .context("Writing import config to stdout")?;
        }
    }
    Ok(())
}

fn header_source_label(source: HeaderSource) -> &'static str {
    match source {
        HeaderSource::KeywordMatch => "matched header keywords",
        HeaderSource::RowAboveData => "assumed row above data",
    }
}

fn data_start_source_label(source: DataStartSource) -> &'static str {
    match source {
        DataStartSource::NationalId => "first national ID",
        DataStartSource::NumericRow => "first numeric row",
        DataStartSource::DefaultRow => "default row",
    }
}
