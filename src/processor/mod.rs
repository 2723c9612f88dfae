//! Row processors applied between the parser and the consumer.
//!
//! A processor sees one [`RowState`] at a time and may rewrite its headers
//! and values, mark it skipped, or end the sequence. The stream runs its
//! built-in processors first, then the caller's, in registration order.
//! Every processor in the chain sees every row, including rows an earlier
//! processor already marked as skipped.

mod builtin;

pub use builtin::{AssignHeaders, ConvertValues, HeaderRow, SkipRows, Strict, parse_literal};

use crate::error::TabularError;
use crate::row::ExtendedRow;

/// A row on its way through the processor chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RowState {
    /// Row number assigned by the parser
    pub row_number: usize,
    pub headers: Option<Vec<String>>,
    pub values: Vec<serde_json::Value>,
    /// Drop this row; it does not consume an output row number
    pub skip: bool,
    /// Drop this row and end the sequence
    pub stop: bool,
}

impl RowState {
    pub fn new(row: ExtendedRow) -> Self {
        Self {
            row_number: row.row_number,
            headers: row.headers,
            values: row.values,
            skip: false,
            stop: false,
        }
    }

    /// Whether the parser produced this row with its own field names.
    pub fn is_keyed(&self) -> bool {
        self.headers.is_some()
    }
}

/// A stage of the row pipeline.
pub trait Processor: Send {
    fn name(&self) -> &str {
        "processor"
    }

    /// Forget per-pass state. Called at the start of every iteration.
    fn restart(&mut self) {}

    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError>;
}

impl<F> Processor for F
where
    F: FnMut(&mut RowState) -> Result<(), TabularError> + Send,
{
    fn process(&mut self, row: &mut RowState) -> Result<(), TabularError> {
        self(row)
    }
}

/// What the chain decided for one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Emit(RowState),
    Skip,
    Stop,
}

/// Run `row` through `stages` in order.
pub fn apply<'a, I>(stages: I, row: ExtendedRow) -> Result<Outcome, TabularError>
where
    I: IntoIterator<Item = &'a mut (dyn Processor + 'static)>,
{
    let mut state = RowState::new(row);
    for stage in stages {
        stage.process(&mut state)?;
        if state.stop {
            tracing::debug!(processor = stage.name(), row = state.row_number, "sequence stopped");
            return Ok(Outcome::Stop);
        }
    }
    if state.skip {
        tracing::trace!(row = state.row_number, "row skipped");
        return Ok(Outcome::Skip);
    }
    Ok(Outcome::Emit(state))
}
