//! I/O utilities: workbook loading, encoding, delimiter resolution, CSV output.
//!
//! All file access in payroll-detect flows through this module. It provides:
//!
//! - **Workbook loading**: a `.json` workbook file, or one sheet per delimited
//!   file (named after the file stem), materialized into a [`Workbook`] grid.
//! - **Delimiter resolution**: extension-based auto-detection (`.csv` → comma,
//!   `.tsv` → tab) with manual override support.
//! - **Encoding**: input decoding and output transcoding via `encoding_rs`,
//!   defaulting to UTF-8. Ledgers exported by older Korean office suites are
//!   usually `euc-kr`.
//! - **stdin/stdout**: the `-` path convention routes through standard streams.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::debug;
use thiserror::Error;

use crate::{
    detect::DetectOptions,
    select::select_sheet,
    sheet::{Cell, Sheet, Workbook},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

const STDIN_SHEET_NAME: &str = "stdin";

#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Workbook does not contain any sheets")]
    Empty,
    #[error("Sheet '{0}' not found in workbook")]
    UnknownSheet(String),
    #[error("A JSON workbook cannot be combined with other inputs: {0:?}")]
    UnsupportedInput(PathBuf),
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'"))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Builds a workbook from the given inputs.
///
/// A single `.json` path is read as a whole workbook; otherwise each path is
/// one delimited sheet, in argument order.
pub fn load_workbook(
    inputs: &[PathBuf],
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Workbook> {
    if let [single] = inputs
        && is_json(single)
    {
        return load_json_workbook(single);
    }
    let mut sheets = Vec::with_capacity(inputs.len());
    for path in inputs {
        if is_json(path) {
            return Err(WorkbookError::UnsupportedInput(path.clone()).into());
        }
        let delimiter = resolve_input_delimiter(path, delimiter);
        sheets.push(load_delimited_sheet(path, delimiter, encoding)?);
    }
    if sheets.is_empty() {
        return Err(WorkbookError::Empty.into());
    }
    Ok(Workbook::new(sheets))
}

pub fn load_json_workbook(path: &Path) -> Result<Workbook> {
    let file = File::open(path).with_context(|| format!("Opening workbook file {path:?}"))?;
    let workbook: Workbook = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Parsing workbook JSON {path:?}"))?;
    if workbook.is_empty() {
        return Err(WorkbookError::Empty.into());
    }
    debug!(
        "Loaded {} sheet(s) from {:?}",
        workbook.sheets.len(),
        path
    );
    Ok(workbook)
}

pub fn load_delimited_sheet(
    path: &Path,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<Sheet> {
    let name = if is_dash(path) {
        STDIN_SHEET_NAME.to_string()
    } else {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    };
    let mut reader = open_csv_reader_from_path(path, delimiter)?;
    let mut rows = Vec::new();
    for (idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", idx + 1))?;
        let decoded = decode_record(&record, encoding).with_context(|| {
            format!(
                "Decoding row {} of {path:?} (is --input-encoding set correctly?)",
                idx + 1
            )
        })?;
        rows.push(decoded.iter().map(|field| Cell::from_field(field)).collect());
    }
    debug!("Loaded {} row(s) from {:?} as sheet '{}'", rows.len(), path, name);
    Ok(Sheet::new(name, rows))
}

/// The explicitly requested sheet, or the best payroll sheet otherwise.
pub fn resolve_sheet<'a>(workbook: &'a Workbook, options: &DetectOptions) -> Result<&'a Sheet> {
    let name = select_sheet(workbook, options).ok_or(WorkbookError::Empty)?;
    if let Some(requested) = options.preferred_sheet.as_deref()
        && requested != name
    {
        debug!("Requested sheet '{requested}' not present, using '{name}'");
    }
    workbook
        .sheet(&name)
        .ok_or_else(|| WorkbookError::UnknownSheet(name).into())
}

pub fn require_sheet<'a>(workbook: &'a Workbook, name: &str) -> Result<&'a Sheet> {
    workbook
        .sheet(name)
        .ok_or_else(|| WorkbookError::UnknownSheet(name.to_string()).into())
}

/// A sheet named on the command line must exist; otherwise selection decides.
pub fn sheet_for<'a>(
    workbook: &'a Workbook,
    explicit: Option<&str>,
    options: &DetectOptions,
) -> Result<&'a Sheet> {
    match explicit {
        Some(name) => require_sheet(workbook, name),
        None => resolve_sheet(workbook, options),
    }
}

/// Spreadsheet exports are ragged, so rows may differ in length.
pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(false)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(path: &Path, delimiter: u8) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn open_csv_writer(
    path: Option<&Path>,
    delimiter: u8,
    encoding: &'static Encoding,
) -> Result<csv::Writer<Box<dyn Write>>> {
    let base: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };

    let writer: Box<dyn Write> = if encoding == UTF_8 {
        base
    } else {
        Box::new(TranscodingWriter::new(base, encoding))
    };

    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    Ok(builder.from_writer(writer))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    // BOM sniffing would silently override an explicit legacy encoding
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Re-encodes UTF-8 output (as produced by the csv writer) into a legacy
/// encoding, buffering partial multi-byte sequences between writes.
struct TranscodingWriter<W: Write> {
    inner: W,
    encoding: &'static Encoding,
    buffer: Vec<u8>,
}

impl<W: Write> TranscodingWriter<W> {
    fn new(inner: W, encoding: &'static Encoding) -> Self {
        Self {
            inner,
            encoding,
            buffer: Vec::new(),
        }
    }

    fn flush_buffer(&mut self, force: bool) -> io::Result<()> {
        let valid_up_to = match std::str::from_utf8(&self.buffer) {
            Ok(_) => self.buffer.len(),
            Err(err) => {
                if let Some(error_len) = err.error_len() {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Invalid UTF-8 sequence in output stream ({error_len} bytes)"),
                    ));
                }
                if force {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "Incomplete UTF-8 sequence at end of output stream",
                    ));
                }
                err.valid_up_to()
            }
        };
        if valid_up_to == 0 {
            return Ok(());
        }
        let pending: Vec<u8> = self.buffer.drain(..valid_up_to).collect();
        let text = std::str::from_utf8(&pending)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.encode_and_write(text)
    }

    fn encode_and_write(&mut self, text: &str) -> io::Result<()> {
        let (encoded, _output_encoding, had_errors) = self.encoding.encode(text);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to encode text using {}", self.encoding.name()),
            ));
        }
        self.inner.write_all(encoded.as_ref())
    }
}

impl<W: Write> Write for TranscodingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush_buffer(false)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_buffer(true)?;
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::EUC_KR;
    use tempfile::tempdir;

    #[test]
    fn delimited_files_become_named_sheets() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("급여대장.csv");
        std::fs::write(&path, "이름,주민번호,급여\n김철수,9501011234567,3000000\n이영희\n")
            .expect("write csv");

        let workbook = load_workbook(&[path], None, UTF_8).expect("load workbook");
        let sheet = workbook.sheet("급여대장").expect("sheet by stem");
        assert_eq!(sheet.row_count(), 3);
        assert_eq!(sheet.width(), 3);
        assert_eq!(sheet.cell(1, 2), &Cell::Number(3_000_000.0));
        assert_eq!(sheet.row(2).len(), 1);
    }

    #[test]
    fn legacy_encoded_input_decodes_with_label() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("ledger.tsv");
        let (bytes, _, _) = EUC_KR.encode("성명\t급여\n김철수\t2500000\n");
        std::fs::write(&path, bytes.as_ref()).expect("write tsv");

        let encoding = resolve_encoding(Some("euc-kr")).expect("known label");
        let sheet = load_delimited_sheet(&path, resolve_input_delimiter(&path, None), encoding)
            .expect("decode sheet");
        assert_eq!(sheet.cell(1, 0), &Cell::Text("김철수".to_string()));

        let err = load_delimited_sheet(&path, b'\t', UTF_8).unwrap_err();
        assert!(format!("{err:#}").contains("input-encoding"));
    }

    #[test]
    fn json_workbook_must_stand_alone() {
        let dir = tempdir().expect("temp dir");
        let json = dir.path().join("book.json");
        std::fs::write(&json, r#"{"sheets":[{"name":"A","rows":[["x"]]}]}"#).expect("write json");
        let csv = dir.path().join("other.csv");
        std::fs::write(&csv, "a\n").expect("write csv");

        let workbook = load_workbook(std::slice::from_ref(&json), None, UTF_8).expect("json workbook");
        assert_eq!(workbook.sheet_names().collect::<Vec<_>>(), vec!["A"]);

        let err = load_workbook(&[csv, json], None, UTF_8).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WorkbookError>(),
            Some(WorkbookError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn transcoding_writer_handles_split_sequences() {
        let mut output = Vec::new();
        {
            let mut writer = TranscodingWriter::new(&mut output, EUC_KR);
            let bytes = "김철수".as_bytes();
            writer.write_all(&bytes[..4]).expect("first half");
            writer.write_all(&bytes[4..]).expect("second half");
            writer.flush().expect("flush");
        }
        let (decoded, _, had_errors) = EUC_KR.decode(&output);
        assert!(!had_errors);
        assert_eq!(decoded, "김철수");
    }

    #[test]
    fn unknown_sheet_is_reported() {
        let workbook = Workbook::new(vec![Sheet::new("A", Vec::new())]);
        let err = sheet_for(&workbook, Some("B"), &DetectOptions::default()).unwrap_err();
        assert!(err.to_string().contains("Sheet 'B' not found"));

        let preferred = DetectOptions {
            preferred_sheet: Some("B".to_string()),
            ..DetectOptions::default()
        };
        let sheet = sheet_for(&workbook, None, &preferred).expect("falls back");
        assert_eq!(sheet.name, "A");
    }
}
