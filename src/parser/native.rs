//! In-process record sequences.

use std::sync::Arc;

use serde_json::Value;

use super::{Parser, closed_error, dispatch_record};
use crate::error::{SourceError, TabularError};
use crate::row::ExtendedRow;
use crate::source::{NativeSource, RecordFactory, RecordIter, Source};

const TARGET: &str = "<native>";

enum Origin {
    Rows(Arc<Vec<Value>>),
    Factory(RecordFactory),
}

/// Parser for native lists, mappings and record factories.
///
/// A materialized list is re-read from the start on reset; a factory is
/// invoked again. One-shot iterators are rejected at open because they
/// could not honor a reset.
pub struct NativeParser {
    force_parse: bool,
    origin: Option<Origin>,
    records: Option<RecordIter>,
    row_number: usize,
}

impl NativeParser {
    pub fn new(force_parse: bool) -> Self {
        Self {
            force_parse,
            origin: None,
            records: None,
            row_number: 0,
        }
    }

    fn start(&mut self) -> Result<(), TabularError> {
        let records: RecordIter = match self.origin.as_ref() {
            Some(Origin::Rows(rows)) => {
                let rows = Arc::clone(rows);
                Box::new((0..rows.len()).map(move |i| rows[i].clone()))
            }
            Some(Origin::Factory(factory)) => factory(),
            None => return Err(closed_error(TARGET)),
        };
        self.records = Some(records);
        self.row_number = 0;
        Ok(())
    }
}

impl std::fmt::Debug for NativeParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match &self.origin {
            Some(Origin::Rows(rows)) => format!("rows({})", rows.len()),
            Some(Origin::Factory(_)) => "factory".to_string(),
            None => "closed".to_string(),
        };
        f.debug_struct("NativeParser")
            .field("origin", &origin)
            .field("row_number", &self.row_number)
            .finish()
    }
}

impl Parser for NativeParser {
    fn open(&mut self, source: &mut Source, _encoding: Option<&str>) -> Result<(), TabularError> {
        self.close();
        let Source::Native(native) = source else {
            return Err(TabularError::source(
                source.id(),
                SourceError::Other("the native format expects an in-process sequence".into()),
            ));
        };
        self.origin = Some(match native {
            NativeSource::Rows(rows) => Origin::Rows(Arc::clone(rows)),
            NativeSource::Factory(factory) => Origin::Factory(Arc::clone(factory)),
            NativeSource::Once(_) => {
                return Err(TabularError::source(TARGET, SourceError::OneShotIterator));
            }
        });
        self.start()
    }

    fn close(&mut self) {
        self.origin = None;
        self.records = None;
    }

    fn closed(&self) -> bool {
        self.origin.is_none()
    }

    fn reset(&mut self) -> Result<(), TabularError> {
        self.start()
    }

    fn next_row(&mut self) -> Result<Option<ExtendedRow>, TabularError> {
        let records = self.records.as_mut().ok_or_else(|| closed_error(TARGET))?;
        let Some(record) = records.next() else {
            return Ok(None);
        };
        self.row_number += 1;
        dispatch_record(record, self.row_number, self.force_parse, TARGET).map(Some)
    }
}
