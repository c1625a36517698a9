//! Import configuration derived from a detection.
//!
//! An [`ImportConfig`] pins the sheet, header row, data start row, and the
//! one-based column of each field so that later imports of the same layout
//! skip detection entirely. Configurations are stored as YAML.

use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::{
    detect::{DetectionResult, to_one_indexed_mapping},
    hints::PayrollField,
};

pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConfig {
    #[serde(default = "ImportConfig::default_version")]
    pub version: u32,
    pub sheet_name: String,
    #[serde(default)]
    pub sheet_keywords: Vec<String>,
    /// One-based.
    pub header_row: usize,
    /// One-based.
    pub data_start_row: usize,
    /// One-based column per field name.
    #[serde(default)]
    pub columns: BTreeMap<String, usize>,
    #[serde(default)]
    pub low_confidence: bool,
}

impl ImportConfig {
    const fn default_version() -> u32 {
        CURRENT_CONFIG_VERSION
    }

    pub fn from_detection(result: &DetectionResult, sheet_keywords: &[String]) -> Self {
        Self {
            version: CURRENT_CONFIG_VERSION,
            sheet_name: result.sheet_name.clone(),
            sheet_keywords: sheet_keywords.to_vec(),
            header_row: result.header_row,
            data_start_row: result.data_start_row,
            columns: to_one_indexed_mapping(result),
            low_confidence: result.is_low_confidence(),
        }
    }

    /// Zero-based column for `field`, if configured.
    pub fn column(&self, field: PayrollField) -> Option<usize> {
        self.columns
            .get(field.key())
            .and_then(|column| column.checked_sub(1))
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.header_row >= 1, "headerRow must be at least 1");
        ensure!(
            self.data_start_row > self.header_row,
            "dataStartRow ({}) must come after headerRow ({})",
            self.data_start_row,
            self.header_row
        );
        for (field, column) in &self.columns {
            if PayrollField::from_key(field).is_none() {
                bail!("Unknown field '{field}' in column mapping");
            }
            ensure!(*column >= 1, "Column for '{field}' must be 1-based");
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let file = File::create(path).with_context(|| format!("Creating config file {path:?}"))?;
        serde_yaml::to_writer(file, self).context("Writing import config YAML")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening config file {path:?}"))?;
        let reader = BufReader::new(file);
        let config: ImportConfig =
            serde_yaml::from_reader(reader).context("Parsing import config YAML")?;
        config
            .validate()
            .with_context(|| format!("Validating config file {path:?}"))?;
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Serializing import config to YAML string")
    }
}
