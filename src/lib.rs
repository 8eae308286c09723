pub mod cli;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod io_utils;
pub mod model;
pub mod record;
pub mod render;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result};
use clap::Parser;
use encoding_rs::Encoding;
use log::{LevelFilter, debug, info};

pub use dataset::{Dataset, DatasetLabel, RawRow};
pub use engine::{CancelToken, DuplicatePolicy, ReconOptions, reconcile};
pub use error::ReconError;
pub use model::ReconResult;
pub use record::{Record, validate_row};
pub use render::OutputFormat;

use crate::{
    cli::{CheckArgs, Cli, Commands, ReconcileArgs},
    config::ReconConfig,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_recon", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Reconcile(args) => handle_reconcile(&args),
        Commands::Check(args) => handle_check(&args),
    }
}

fn handle_reconcile(args: &ReconcileArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => {
            ReconConfig::load(path).with_context(|| format!("Loading run profile {path:?}"))?
        }
        None => ReconConfig::default(),
    };
    let format = match args.format {
        Some(format) => format,
        None => config.output_format()?.unwrap_or_default(),
    };
    let delimiter = match args.delimiter {
        Some(delimiter) => Some(delimiter),
        None => config.delimiter_byte()?,
    };
    let encoding = io_utils::resolve_encoding(
        args.input_encoding
            .as_deref()
            .or(config.input_encoding.as_deref()),
    )?;
    let options = ReconOptions {
        duplicate_ids: args
            .duplicate_ids
            .or(config.duplicate_ids)
            .unwrap_or_default(),
        amount_tolerance: args
            .amount_tolerance
            .or(config.amount_tolerance)
            .unwrap_or_default(),
        parallel: args.parallel || config.parallel.unwrap_or(false),
        cancel: None,
    };
    debug!("Reconcile options: {options:?}, format {format}");

    info!(
        "Reconciling '{}' against '{}'",
        args.source.display(),
        args.target.display()
    );
    let source = load_dataset(&args.source, DatasetLabel::Source, delimiter, encoding)?;
    let target = load_dataset(&args.target, DatasetLabel::Target, delimiter, encoding)?;
    let result = reconcile(&source, &target, &options).context("Reconciling datasets")?;
    info!(
        "Reconciliation complete: {} missing in target, {} missing in source, {} discrepant record(s)",
        result.missing_in_target.len(),
        result.missing_in_source.len(),
        result.record_discrepancies.len()
    );

    let sink = io_utils::open_output(args.output.as_deref())?;
    format
        .render(&result, sink)
        .with_context(|| format!("Rendering {format} report"))?;
    if let Some(path) = &args.output {
        info!("{format} report written to {path:?}");
    }
    Ok(())
}

fn handle_check(args: &CheckArgs) -> Result<()> {
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let label = DatasetLabel::from(args.label);
    let dataset = load_dataset(&args.input, label, args.delimiter, encoding)?;
    let records = dataset
        .rows()
        .iter()
        .map(|row| validate_row(row, label))
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Validating {:?}", args.input))?;
    info!("✓ {:?} holds {} valid record(s)", args.input, records.len());
    Ok(())
}

fn load_dataset(
    path: &Path,
    label: DatasetLabel,
    delimiter: Option<u8>,
    encoding: &'static Encoding,
) -> Result<Dataset> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    Dataset::from_path(path, label, delimiter, encoding)
        .with_context(|| format!("Loading {label} file {path:?}"))
}
