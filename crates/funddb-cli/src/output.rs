use std::io::{self, Write};

use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;
use crate::commands::CommandOutput;
use crate::error::CliError;

pub fn render(output: &CommandOutput, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    write_output(&mut writer, output, format, pretty)?;
    writer.flush()?;
    Ok(())
}

pub fn write_output<W: Write>(
    writer: &mut W,
    output: &CommandOutput,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let document = json_document(output);
            let payload = if pretty {
                serde_json::to_string_pretty(&document)?
            } else {
                serde_json::to_string(&document)?
            };
            writeln!(writer, "{payload}")?;
        }
        OutputFormat::Ndjson => {
            for record in &output.records {
                writeln!(writer, "{}", serde_json::to_string(record)?)?;
            }
            if let Some(summary) = &output.summary {
                writeln!(writer, "{}", serde_json::to_string(&json!({ "summary": summary }))?)?;
            }
        }
        OutputFormat::Table => write_table(writer, output)?,
    }
    Ok(())
}

fn json_document(output: &CommandOutput) -> Value {
    let mut document = Map::new();
    document.insert(String::from("command"), Value::String(output.path.to_string()));
    document.insert(String::from("records"), Value::Array(output.records.clone()));
    if let Some(summary) = &output.summary {
        document.insert(String::from("summary"), summary.clone());
    }
    Value::Object(document)
}

fn write_table<W: Write>(writer: &mut W, output: &CommandOutput) -> Result<(), CliError> {
    if !output.columns.is_empty() {
        let rows = output
            .records
            .iter()
            .map(|record| {
                output
                    .columns
                    .iter()
                    .map(|column| cell(record.get(*column)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();

        let mut widths = output
            .columns
            .iter()
            .map(|column| column.chars().count())
            .collect::<Vec<_>>();
        for row in &rows {
            for (width, value) in widths.iter_mut().zip(row) {
                *width = (*width).max(value.chars().count());
            }
        }

        let header = output
            .columns
            .iter()
            .map(|column| (*column).to_owned())
            .collect::<Vec<_>>();
        write_row(writer, &header, &widths)?;
        for row in &rows {
            write_row(writer, row, &widths)?;
        }
    }

    if let Some(Value::Object(summary)) = &output.summary {
        let width = summary.keys().map(|key| key.len()).max().unwrap_or(0);
        for (key, value) in summary {
            writeln!(writer, "{key:<width$} : {}", cell(Some(value)))?;
        }
    }
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> io::Result<()> {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let padding = width.saturating_sub(value.chars().count());
            format!("{value}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(writer, "{}", line.trim_end())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::from("-"),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Array(items)) => items.len().to_string(),
        Some(other) => other.to_string(),
    }
}
