//! Optional YAML run profile.
//!
//! A profile captures defaults for a recurring reconciliation (output format,
//! delimiter, encoding, duplicate handling, amount tolerance). Command-line
//! flags always win over profile values.
//!
//! ```yaml
//! format: html
//! delimiter: ";"
//! input_encoding: windows-1252
//! duplicate_ids: reject
//! amount_tolerance: "0.01"
//! parallel: false
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use log::debug;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{cli::parse_delimiter, engine::DuplicatePolicy, render::OutputFormat};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconConfig {
    pub format: Option<String>,
    pub delimiter: Option<String>,
    pub input_encoding: Option<String>,
    pub duplicate_ids: Option<DuplicatePolicy>,
    pub amount_tolerance: Option<Decimal>,
    pub parallel: Option<bool>,
}

impl ReconConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw =
            fs::read_to_string(path).with_context(|| format!("Opening config file {path:?}"))?;
        let config = Self::from_yaml(&raw).with_context(|| format!("Parsing config {path:?}"))?;
        debug!("Loaded run profile from {path:?}: {config:?}");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if let Some(format) = &self.format {
            format.parse::<OutputFormat>()?;
        }
        if let Some(delimiter) = &self.delimiter {
            parse_delimiter(delimiter).map_err(anyhow::Error::msg)?;
        }
        if let Some(tolerance) = self.amount_tolerance {
            ensure!(
                !tolerance.is_sign_negative(),
                "amount_tolerance must not be negative (got {tolerance})"
            );
        }
        Ok(())
    }

    pub fn output_format(&self) -> Result<Option<OutputFormat>> {
        Ok(self.format.as_deref().map(str::parse::<OutputFormat>).transpose()?)
    }

    pub fn delimiter_byte(&self) -> Result<Option<u8>> {
        self.delimiter
            .as_deref()
            .map(parse_delimiter)
            .transpose()
            .map_err(anyhow::Error::msg)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
