//! One-shot writers persisting a row sequence.
//!
//! Writers consume extended rows and never look back, so any stream that can
//! be iterated can be saved.

use std::io::Write;

use serde_json::Value;

use crate::error::{ConfigError, ErrorKind, TabularError};
use crate::format::FormatKind;
use crate::io::OutputTarget;
use crate::row::{ExtendedRow, cell_to_string};

/// Formats a stream can be saved as.
pub fn is_writable(format: FormatKind) -> bool {
    match format {
        #[cfg(feature = "csv")]
        FormatKind::Csv => true,
        FormatKind::Json | FormatKind::Ndjson => true,
        _ => false,
    }
}

/// Write `rows` to `target` in `format`, returning the number of rows
/// written. `headers` become the CSV header line and the JSON object keys.
pub fn write_rows<I>(
    rows: I,
    headers: Option<&[String]>,
    format: FormatKind,
    target: &dyn OutputTarget,
) -> Result<usize, TabularError>
where
    I: IntoIterator<Item = Result<ExtendedRow, TabularError>>,
{
    if !is_writable(format) {
        return Err(TabularError::format(
            target.id(),
            ConfigError::UnsupportedFormat(format.to_string()),
        ));
    }
    let id = target.id().to_string();
    let mut out = target
        .open_overwrite()
        .map_err(|e| TabularError::io(&id, e))?;

    let written = match format {
        #[cfg(feature = "csv")]
        FormatKind::Csv => write_csv(rows, headers, &mut out, &id)?,
        FormatKind::Json => write_json(rows, headers, &mut out, &id)?,
        _ => write_ndjson(rows, headers, &mut out, &id)?,
    };
    out.flush().map_err(|e| TabularError::io(&id, e))?;
    tracing::debug!(target = %id, format = %format, rows = written, "saved rows");
    Ok(written)
}

#[cfg(feature = "csv")]
fn write_csv<I>(
    rows: I,
    headers: Option<&[String]>,
    out: &mut dyn Write,
    id: &str,
) -> Result<usize, TabularError>
where
    I: IntoIterator<Item = Result<ExtendedRow, TabularError>>,
{
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(out);
    let csv_err = |e: csv::Error| TabularError::new(ErrorKind::Io, id, e);
    if let Some(headers) = headers {
        wtr.write_record(headers).map_err(csv_err)?;
    }
    let mut written = 0;
    for row in rows {
        let row = row?;
        wtr.write_record(row.values.iter().map(cell_to_string))
            .map_err(csv_err)?;
        written += 1;
    }
    wtr.flush().map_err(|e| TabularError::io(id, e))?;
    Ok(written)
}

/// Rows become objects when headers are known, arrays otherwise.
fn record(row: ExtendedRow, headers: Option<&[String]>) -> Value {
    match headers.or(row.headers.as_deref()) {
        Some(headers) => Value::Object(
            headers
                .iter()
                .cloned()
                .zip(row.values.into_iter().chain(std::iter::repeat(Value::Null)))
                .collect(),
        ),
        None => Value::Array(row.values),
    }
}

fn write_json<I>(
    rows: I,
    headers: Option<&[String]>,
    out: &mut dyn Write,
    id: &str,
) -> Result<usize, TabularError>
where
    I: IntoIterator<Item = Result<ExtendedRow, TabularError>>,
{
    let io_err = |e: std::io::Error| TabularError::io(id, e);
    out.write_all(b"[").map_err(io_err)?;
    let mut written = 0;
    for row in rows {
        let row = row?;
        out.write_all(if written == 0 { b"\n  " } else { b",\n  " })
            .map_err(io_err)?;
        serde_json::to_writer(&mut *out, &record(row, headers))
            .map_err(|e| TabularError::new(ErrorKind::Io, id, e))?;
        written += 1;
    }
    out.write_all(if written == 0 { b"]\n" } else { b"\n]\n" })
        .map_err(io_err)?;
    Ok(written)
}

fn write_ndjson<I>(
    rows: I,
    headers: Option<&[String]>,
    out: &mut dyn Write,
    id: &str,
) -> Result<usize, TabularError>
where
    I: IntoIterator<Item = Result<ExtendedRow, TabularError>>,
{
    let mut written = 0;
    for row in rows {
        let row = row?;
        serde_json::to_writer(&mut *out, &record(row, headers))
            .map_err(|e| TabularError::new(ErrorKind::Io, id, e))?;
        out.write_all(b"\n").map_err(|e| TabularError::io(id, e))?;
        written += 1;
    }
    Ok(written)
}
