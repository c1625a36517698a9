use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::detect::{DEFAULT_HEADER_MATCH_BOOST, DetectOptions};

#[derive(Debug, Parser)]
#[command(author, version, about = "Detect payroll columns in spreadsheet exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Detect the header row, data start, and payroll field columns of a sheet
    Detect(DetectArgs),
    /// List the sheets of a workbook and mark the one detection would pick
    Sheets(SheetsArgs),
    /// Write a reusable import configuration from a detection
    Config(ConfigArgs),
    /// Extract normalized payroll records as CSV
    Extract(ExtractArgs),
    /// Preview the first rows of a sheet in a formatted table
    Preview(PreviewArgs),
}

/// Input options shared by every command.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Workbook JSON file, or one or more CSV/TSV files (one sheet each; '-' reads stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Sheet to use instead of automatic selection
    #[arg(long)]
    pub sheet: Option<String>,
}

impl InputArgs {
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            preferred_sheet: self.sheet.clone(),
            ..DetectOptions::default()
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq, Default)]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format for the detection report
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    /// Confidence added when a header caption agrees with the column data
    #[arg(long = "header-boost", default_value_t = DEFAULT_HEADER_MATCH_BOOST, value_parser = parse_header_boost)]
    pub header_boost: f64,
}

impl DetectArgs {
    pub fn detect_options(&self) -> DetectOptions {
        DetectOptions {
            header_match_boost: self.header_boost,
            ..self.input.detect_options()
        }
    }
}

#[derive(Debug, Args)]
pub struct SheetsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Destination YAML file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Import configuration to apply instead of running detection
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output file/stdout (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

/// Boost between 0 and 1 inclusive.
pub fn parse_header_boost(value: &str) -> Result<f64, String> {
    let boost: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("Header boost '{value}' is not a number"))?;
    if !(0.0..=1.0).contains(&boost) {
        return Err(format!("Header boost must be between 0 and 1, got {boost}"));
    }
    Ok(boost)
}
