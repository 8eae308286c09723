//! Rendering of a [`ReconResult`] into one of the supported output encodings.
//!
//! All three encodings go through [`OutputFormat::render`]; the engine never
//! sees which one was chosen.

use std::{fmt, fmt::Write as _, io::Write, str::FromStr};

use anyhow::{Context, Result};
use csv::QuoteStyle;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    error::ReconError,
    model::{FieldValues, MissingRecord, ReconResult, display_amount},
};

pub const CSV_HEADERS: [&str; 8] = [
    "Record ID",
    "Status",
    "Name",
    "Date",
    "Amount",
    "Discrepancy Field",
    "Source Value",
    "Target Value",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Html,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Html => "html",
        }
    }

    pub fn render<W: Write>(self, result: &ReconResult, mut writer: W) -> Result<()> {
        match self {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, result)
                    .context("Writing JSON report")?;
                writeln!(writer).context("Writing JSON report")?;
            }
            OutputFormat::Csv => write_csv(result, &mut writer)?,
            OutputFormat::Html => writer
                .write_all(render_html(result).as_bytes())
                .context("Writing HTML report")?,
        }
        writer.flush().context("Flushing report output")
    }

    pub fn render_to_vec(self, result: &ReconResult) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.render(result, &mut buffer)?;
        Ok(buffer)
    }
}

impl FromStr for OutputFormat {
    type Err = ReconError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "html" => Ok(OutputFormat::Html),
            _ => Err(ReconError::UnsupportedFormat {
                requested: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

fn write_csv<W: Write>(result: &ReconResult, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(writer);
    csv_writer
        .write_record(CSV_HEADERS)
        .context("Writing CSV report headers")?;

    let missing_sections = [
        ("Missing in Source", &result.missing_in_source),
        ("Missing in Target", &result.missing_in_target),
    ];
    for (status, records) in missing_sections {
        for record in records {
            csv_writer
                .write_record(missing_row(status, record))
                .context("Writing CSV report row")?;
        }
    }

    for entry in &result.record_discrepancies {
        for (field, diff) in &entry.discrepancy {
            let [name, date, amount] = value_cells(&entry.source_data);
            csv_writer
                .write_record([
                    entry.record_id.to_string(),
                    "Discrepancy".to_string(),
                    name,
                    date,
                    amount,
                    field.to_string(),
                    diff.source_value.to_string(),
                    diff.target_value.to_string(),
                ])
                .context("Writing CSV report row")?;
        }
    }
    csv_writer.flush().context("Flushing CSV report")?;
    Ok(())
}

fn missing_row(status: &str, record: &MissingRecord) -> [String; 8] {
    let [name, date, amount] = value_cells(&record.data);
    [
        record.record_id.to_string(),
        status.to_string(),
        name,
        date,
        amount,
        String::new(),
        String::new(),
        String::new(),
    ]
}

fn value_cells(values: &FieldValues) -> [String; 3] {
    [
        values.name.clone(),
        values.date.clone(),
        display_amount(values.amount),
    ]
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Reconciliation Report</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 20px; }
    h1 { color: #333; }
    h2 { color: #555; }
    table { width: 100%; border-collapse: collapse; margin-bottom: 20px; }
    th, td { border: 1px solid #ccc; padding: 8px; text-align: left; }
    th { background-color: #f4f4f4; }
    .discrepancy { color: red; }
  </style>
</head>
<body>
  <h1>Reconciliation Status</h1>
  <p>Status: <strong>success</strong></p>
  <p>Message: <strong>Reconciliation completed successfully.</strong></p>

  <h2>Discrepancies</h2>
"#;

const HTML_TAIL: &str = "</body>\n</html>\n";

pub fn render_html(result: &ReconResult) -> String {
    let mut html = String::from(HTML_HEAD);
    missing_table(
        &mut html,
        "Missing in Target",
        &result.missing_in_target,
        "No records missing in target.",
    );
    missing_table(
        &mut html,
        "Missing in Source",
        &result.missing_in_source,
        "No records missing in source.",
    );

    open_table(
        &mut html,
        "Discrepancies in Matching Records",
        &[
            "Record ID",
            "Source Name",
            "Source Date",
            "Source Amount",
            "Target Name",
            "Target Date",
            "Target Amount",
            "Discrepancy",
        ],
    );
    if result.record_discrepancies.is_empty() {
        placeholder_row(&mut html, 8, "No discrepancies found in matching records.");
    }
    for entry in &result.record_discrepancies {
        let summary = entry
            .discrepancy
            .iter()
            .map(|(field, diff)| {
                format!("{field}: {} vs {}", diff.source_value, diff.target_value)
            })
            .join(", ");
        let [source_name, source_date, source_amount] = value_cells(&entry.source_data);
        let [target_name, target_date, target_amount] = value_cells(&entry.target_data);
        html.push_str("      <tr>\n");
        for cell in [
            entry.record_id.to_string(),
            source_name,
            source_date,
            source_amount,
            target_name,
            target_date,
            target_amount,
        ] {
            let _ = writeln!(html, "        <td>{}</td>", escape_html(&cell));
        }
        let _ = writeln!(
            html,
            "        <td class=\"discrepancy\">{}</td>",
            escape_html(&summary)
        );
        html.push_str("      </tr>\n");
    }
    close_table(&mut html);

    html.push_str(HTML_TAIL);
    html
}

fn missing_table(html: &mut String, title: &str, records: &[MissingRecord], empty: &str) {
    open_table(html, title, &["Record ID", "Name", "Date", "Amount"]);
    if records.is_empty() {
        placeholder_row(html, 4, empty);
    }
    for record in records {
        let [name, date, amount] = value_cells(&record.data);
        html.push_str("      <tr>\n");
        for cell in [record.record_id.to_string(), name, date, amount] {
            let _ = writeln!(html, "        <td>{}</td>", escape_html(&cell));
        }
        html.push_str("      </tr>\n");
    }
    close_table(html);
}

fn open_table(html: &mut String, title: &str, headers: &[&str]) {
    let _ = writeln!(html, "\n  <h3>{title}</h3>");
    html.push_str("  <table>\n    <thead>\n      <tr>\n");
    for header in headers {
        let _ = writeln!(html, "        <th>{header}</th>");
    }
    html.push_str("      </tr>\n    </thead>\n    <tbody>\n");
}

fn placeholder_row(html: &mut String, columns: usize, text: &str) {
    let _ = writeln!(
        html,
        "      <tr>\n        <td colspan=\"{columns}\" style=\"text-align:center;\">{text}</td>\n      </tr>"
    );
}

fn close_table(html: &mut String) {
    html.push_str("    </tbody>\n  </table>\n");
}

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
