pub mod event_stream;

use std::io::{self, Write};

use serde_json::Value;

use self::event_stream::{EventStream, StreamEvent};
use crate::cli::OutputFormat;
use crate::envelope::Envelope;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    render_to(&mut stdout.lock(), envelope, format, pretty)
}

pub fn render_to<W: Write>(
    out: &mut W,
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Ndjson => {
            let payload = serde_json::to_string(envelope)?;
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => render_table(out, envelope)?,
    }

    Ok(())
}

pub fn render_stream(envelope: &Envelope<Value>) -> Result<(), CliError> {
    let stdout = io::stdout();
    render_stream_to(stdout.lock(), envelope)
}

/// Stream the envelope as events: one `result` per titled result, then one
/// `failure` per envelope error.
pub fn render_stream_to<W: Write>(out: W, envelope: &Envelope<Value>) -> Result<(), CliError> {
    let results = titled_results(&envelope.data);
    let mut stream = EventStream::new(out);
    for event in StreamEvent::sequence(envelope, &results) {
        stream.send(&event)?;
    }
    Ok(())
}

fn titled_results(data: &Value) -> Vec<&Value> {
    match data.get("results").and_then(Value::as_array) {
        Some(results) => results.iter().collect(),
        None if is_titled_result(data) => vec![data],
        None => Vec::new(),
    }
}

fn is_titled_result(value: &Value) -> bool {
    value.get("title").is_some() && value.get("columns").is_some() && value.get("rows").is_some()
}

fn render_table<W: Write>(out: &mut W, envelope: &Envelope<Value>) -> Result<(), CliError> {
    let results = titled_results(&envelope.data);

    if results.is_empty() {
        if let Some((columns, rows)) = grid_parts(&envelope.data) {
            write_grid(out, &columns, &rows)?;
        } else {
            let pretty_data = serde_json::to_string_pretty(&envelope.data)?;
            writeln!(out, "{pretty_data}")?;
        }
    } else {
        for (index, result) in results.iter().enumerate() {
            if index > 0 {
                writeln!(out)?;
            }
            let title = result.get("title").and_then(Value::as_str).unwrap_or("");
            writeln!(out, "== {title} ==")?;
            if let Some((columns, rows)) = grid_parts(result) {
                write_grid(out, &columns, &rows)?;
            }
        }
    }

    if !envelope.meta.warnings.is_empty() {
        writeln!(out)?;
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    if !envelope.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            match &error.target {
                Some(target) => writeln!(out, "  - {} [{target}]: {}", error.code, error.message)?,
                None => writeln!(out, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

/// Column names and cell text of a `{columns, rows}` payload.
fn grid_parts(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
    let columns = value
        .get("columns")?
        .as_array()?
        .iter()
        .map(|column| {
            column
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        })
        .collect::<Vec<_>>();
    let rows = value
        .get("rows")?
        .as_array()?
        .iter()
        .map(|row| {
            row.as_array()
                .map(|cells| cells.iter().map(format_cell).collect())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>();
    Some((columns, rows))
}

fn write_grid<W: Write>(out: &mut W, columns: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    let mut widths = columns.iter().map(|name| name.chars().count()).collect::<Vec<_>>();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    writeln!(out, "{}", line(columns).trim_end())?;
    let rule = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");
    writeln!(out, "{rule}")?;
    for row in rows {
        writeln!(out, "{}", line(row.as_slice()).trim_end())?;
    }
    writeln!(out, "({} rows)", rows.len())
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("NULL"),
        Value::String(text) => text.clone(),
        _ => value.to_string(),
    }
}
