use crate::{commands::OutputFormat, error::CliError};
use model::records::table::Table;
use serde_json::Value;
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

/// Rows as a JSON array of objects keyed by column name.
pub fn to_json(table: &Table) -> Result<String, CliError> {
    let records: Vec<Value> = table.records().map(Value::Object).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Header line with the column names, then one record per row. Empty and
/// null cells are written as empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<(), CliError> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(table.columns())?;
    for row in table.rows() {
        csv.write_record(row.iter().map(ToString::to_string))?;
    }
    csv.flush()?;
    Ok(())
}

fn render<W: Write>(table: &Table, format: OutputFormat, mut writer: W) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            writeln!(writer, "{}", to_json(table)?)?;
            writer.flush()?;
            Ok(())
        }
        OutputFormat::Csv => write_csv(table, writer),
    }
}

pub fn write_table(
    table: &Table,
    format: OutputFormat,
    path: Option<&Path>,
) -> Result<(), CliError> {
    match path {
        Some(path) => render(table, format, BufWriter::new(File::create(path)?)),
        None => render(table, format, io::stdout().lock()),
    }
}

/// `1234567` as `1,234,567`.
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
