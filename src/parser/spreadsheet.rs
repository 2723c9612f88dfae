//! Spreadsheet workbooks (xls, xlsx, ods) through `calamine`.

use std::fs::File;
use std::io::{self, BufReader, Seek, SeekFrom};

use calamine::{Data, Dimensions, Ods, Range, Reader, Xls, Xlsx, open_workbook_from_rs};
use serde::Deserialize;
use serde_json::Value;

use super::{Parser, closed_error};
use crate::error::{SourceError, TabularError};
use crate::format::FormatKind;
use crate::loader::{ByteStream, Loader, Mode};
use crate::row::ExtendedRow;
use crate::source::Source;

/// Which sheet to read: a 1-based position or a name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(1)
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Index(i) => write!(f, "{i}"),
            SheetSelector::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

/// Options claimed by the spreadsheet parsers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpreadsheetOptions {
    pub sheet: SheetSelector,
    /// Copy the top-left value of each merged range into all of its cells
    pub fill_merged_cells: bool,
}

/// Parser for workbook formats.
///
/// The selected sheet is decoded at open. Row numbers follow the sheet's own
/// numbering, so rows above the used range come out empty and cells left of
/// it come out null.
pub struct SpreadsheetParser {
    loader: Box<dyn Loader>,
    format: FormatKind,
    options: SpreadsheetOptions,
    target: String,
    /// Local copy of a forward-only stream; unlinked when dropped
    staged: Option<File>,
    rows: Option<Vec<Vec<Value>>>,
    cursor: usize,
}

impl SpreadsheetParser {
    pub fn new(loader: Box<dyn Loader>, format: FormatKind, options: SpreadsheetOptions) -> Self {
        Self {
            loader,
            format,
            options,
            target: String::new(),
            staged: None,
            rows: None,
            cursor: 0,
        }
    }

    /// Give calamine random access, staging forward-only bytes on disk.
    fn random_access(&mut self, mut stream: ByteStream) -> io::Result<ByteStream> {
        if stream.is_seekable() {
            return Ok(stream);
        }
        let mut file = tempfile::tempfile()?;
        let copied = io::copy(&mut stream, &mut file)?;
        file.seek(SeekFrom::Start(0))?;
        tracing::debug!(source = %self.target, bytes = copied, "staged workbook to a temporary file");
        let reader = BufReader::new(file.try_clone()?);
        self.staged = Some(file);
        Ok(ByteStream::seekable(stream.id().to_string(), Box::new(reader)))
    }

    fn decode(&self, stream: ByteStream) -> Result<Vec<Vec<Value>>, TabularError> {
        let fill = self.options.fill_merged_cells;
        let (range, merged) = match self.format {
            FormatKind::Xlsx => {
                let mut workbook: Xlsx<_> =
                    open_workbook_from_rs(stream).map_err(|e| self.workbook_error(e))?;
                let name = self.sheet_name(&workbook.sheet_names())?;
                let range = workbook
                    .worksheet_range(&name)
                    .map_err(|e| self.workbook_error(e))?;
                let mut merged = Vec::new();
                if fill {
                    workbook
                        .load_merged_regions()
                        .map_err(|e| self.workbook_error(e))?;
                    merged = workbook
                        .merged_regions_by_sheet(&name)
                        .into_iter()
                        .map(|(_, _, dims)| dims.clone())
                        .collect();
                }
                (range, merged)
            }
            FormatKind::Xls => {
                let mut workbook: Xls<_> =
                    open_workbook_from_rs(stream).map_err(|e| self.workbook_error(e))?;
                let name = self.sheet_name(&workbook.sheet_names())?;
                let range = workbook
                    .worksheet_range(&name)
                    .map_err(|e| self.workbook_error(e))?;
                let merged = if fill {
                    workbook.worksheet_merge_cells(&name).unwrap_or_default()
                } else {
                    Vec::new()
                };
                (range, merged)
            }
            FormatKind::Ods => {
                let mut workbook: Ods<_> =
                    open_workbook_from_rs(stream).map_err(|e| self.workbook_error(e))?;
                let name = self.sheet_name(&workbook.sheet_names())?;
                let range = workbook
                    .worksheet_range(&name)
                    .map_err(|e| self.workbook_error(e))?;
                (range, Vec::new())
            }
            other => {
                return Err(TabularError::source(
                    &self.target,
                    SourceError::Other(format!("{other} is not a workbook format")),
                ));
            }
        };

        let mut grid = to_grid(&range);
        for dims in &merged {
            fill_merged(&mut grid, dims);
        }
        Ok(grid)
    }

    fn sheet_name(&self, names: &[String]) -> Result<String, TabularError> {
        let found = match &self.options.sheet {
            SheetSelector::Index(i) => i.checked_sub(1).and_then(|i| names.get(i)).cloned(),
            SheetSelector::Name(name) => names.iter().find(|n| *n == name).cloned(),
        };
        found.ok_or_else(|| {
            TabularError::source(
                &self.target,
                SourceError::SheetNotFound(self.options.sheet.to_string()),
            )
        })
    }

    fn workbook_error(&self, e: impl std::fmt::Display) -> TabularError {
        TabularError::source(
            &self.target,
            SourceError::Other(format!("cannot read {} workbook: {e}", self.format)),
        )
    }
}

/// Lay the used range out in absolute sheet coordinates.
fn to_grid(range: &Range<Data>) -> Vec<Vec<Value>> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };
    let mut grid: Vec<Vec<Value>> = (0..first_row).map(|_| Vec::new()).collect();
    for cells in range.rows() {
        let mut row = vec![Value::Null; first_col as usize];
        row.extend(cells.iter().map(cell_value));
        grid.push(row);
    }
    grid
}

fn fill_merged(grid: &mut [Vec<Value>], dims: &Dimensions) {
    let (top, left) = (dims.start.0 as usize, dims.start.1 as usize);
    let (bottom, right) = (dims.end.0 as usize, dims.end.1 as usize);
    let Some(value) = grid.get(top).and_then(|row| row.get(left)).cloned() else {
        return;
    };
    for row in grid.iter_mut().take(bottom + 1).skip(top) {
        if row.len() <= right {
            row.resize(right + 1, Value::Null);
        }
        for cell in &mut row[left..=right] {
            *cell = value.clone();
        }
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::from(*f as i64)
            } else {
                serde_json::Number::from_f64(*f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    }
}

impl std::fmt::Debug for SpreadsheetParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpreadsheetParser")
            .field("target", &self.target)
            .field("format", &self.format)
            .field("options", &self.options)
            .field("staged", &self.staged.is_some())
            .field("closed", &self.rows.is_none())
            .finish()
    }
}

impl Parser for SpreadsheetParser {
    fn open(&mut self, source: &mut Source, encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        self.target = source.id();
        let stream = self.loader.load(source, Mode::Binary, encoding)?.into_binary();
        let stream = self
            .random_access(stream)
            .map_err(|e| TabularError::io(&self.target, e))?;
        let rows = self.decode(stream)?;
        tracing::debug!(
            source = %self.target,
            sheet = %self.options.sheet,
            rows = rows.len(),
            "decoded worksheet"
        );
        self.rows = Some(rows);
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.rows = None;
        self.staged = None;
    }

    fn closed(&self) -> bool {
        self.rows.is_none()
    }

    fn reset(&mut self) -> Result<(), TabularError> {
        if self.rows.is_none() {
            return Err(closed_error(&self.target));
        }
        self.cursor = 0;
        Ok(())
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let rows = self.rows.as_ref().ok_or_else(|| closed_error(&self.target))?;
        let Some(values) = rows.get(self.cursor) else {
            return Ok(None);
        };
        self.cursor += 1;
        Ok(Some(ExtendedRow::positional(self.cursor, values.clone())))
    }
}
