use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;

use crate::{dataset::DatasetLabel, engine::DuplicatePolicy, render::OutputFormat};

#[derive(Debug, Parser)]
#[command(author, version, about = "Reconcile two CSV record sets keyed by ID", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare a source and a target file and report missing and differing records
    Reconcile(ReconcileArgs),
    /// Validate a single file's columns and rows without reconciling
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Source CSV file (left-hand side)
    #[arg(short = 's', long = "source")]
    pub source: PathBuf,
    /// Target CSV file (right-hand side)
    #[arg(short = 't', long = "target")]
    pub target: PathBuf,
    /// Report format: json, csv or html (defaults to json)
    #[arg(short = 'f', long = "format", value_parser = parse_format)]
    pub format: Option<OutputFormat>,
    /// Report destination (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Optional YAML run profile supplying defaults for the options below
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// CSV delimiter character for both inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of both input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// How repeated IDs within one file are handled
    #[arg(long = "duplicate-ids", value_enum)]
    pub duplicate_ids: Option<DuplicatePolicy>,
    /// Largest amount difference still treated as a match (defaults to exact)
    #[arg(long = "amount-tolerance", value_parser = parse_tolerance)]
    pub amount_tolerance: Option<Decimal>,
    /// Run the source and target passes on separate threads
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
#[value(rename_all = "kebab-case")]
pub enum LabelArg {
    Source,
    Target,
}

impl From<LabelArg> for DatasetLabel {
    fn from(value: LabelArg) -> Self {
        match value {
            LabelArg::Source => DatasetLabel::Source,
            LabelArg::Target => DatasetLabel::Target,
        }
    }
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// CSV file to validate
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Label used in validation messages
    #[arg(long, value_enum, default_value = "source")]
    pub label: LabelArg,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
}

pub fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse::<OutputFormat>().map_err(|err| err.to_string())
}

pub fn parse_tolerance(value: &str) -> Result<Decimal, String> {
    let parsed = value
        .trim()
        .parse::<Decimal>()
        .map_err(|err| format!("Invalid amount tolerance '{value}': {err}"))?;
    if parsed.is_sign_negative() {
        return Err("Amount tolerance must not be negative".to_string());
    }
    Ok(parsed)
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
