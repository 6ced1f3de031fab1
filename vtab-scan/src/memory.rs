//! Table-function adapter over rows held in memory.

use std::sync::Arc;

use tracing::{debug, trace};
use vtab_expr::Restriction;
use vtab_result::{Error, Result};
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue};

use crate::context::{FunctionMetadata, ScanContext};
use crate::costing::{CostEstimate, CostingEnvironment, ScanCosting};
use crate::cursor::RowCursor;
use crate::init::{RestrictedScan, ScanSetup};
use crate::projection::ProjectionMap;
use crate::state::{CursorState, no_current_row};
use crate::string_cursor::{StringColumnCursor, StringRowSource};

/// Rows as raw column text; `None` is SQL NULL.
pub type MemoryRows = Vec<Vec<Option<String>>>;

#[derive(Debug, Clone)]
pub struct MemoryTableOptions {
    /// Skip rows that fail the pushed restriction instead of leaving all
    /// filtering to the engine.
    pub apply_restriction: bool,
    /// Fixed planner estimates. `None` reports the exact row count.
    pub costing: Option<CostEstimate>,
}

impl Default for MemoryTableOptions {
    fn default() -> Self {
        Self {
            apply_restriction: true,
            costing: None,
        }
    }
}

#[derive(Debug)]
struct MemorySource {
    schema: ColumnSchema,
    rows: Arc<[Vec<Option<String>>]>,
    /// Index of the next row to consider.
    state: CursorState<usize>,
    current: Option<usize>,
    required: Option<ProjectionMap>,
    filter: Option<Restriction>,
}

impl StringRowSource for MemorySource {
    fn next_row(&mut self) -> Result<bool> {
        let Self {
            schema,
            rows,
            state,
            current,
            filter,
            ..
        } = self;
        let pos = state.ensure_open(|| {
            debug!(rows = rows.len(), "memory table opened");
            Ok(0)
        })?;

        while *pos < rows.len() {
            let idx = *pos;
            *pos += 1;
            let row = &rows[idx];
            let keep = match filter {
                Some(restriction) => restriction.matches_text_row(schema, &mut |column| {
                    Ok(row.get(column - 1).cloned().flatten())
                })?,
                None => true,
            };
            if keep {
                trace!(row = idx, "memory table row");
                *current = Some(idx);
                return Ok(true);
            }
        }

        *current = None;
        state.close();
        debug!("memory table exhausted");
        Ok(false)
    }

    fn raw_column(&self, column: usize) -> Result<Option<&str>> {
        self.state.resource()?;
        let idx = self.current.ok_or_else(no_current_row)?;
        if self
            .required
            .as_ref()
            .is_some_and(|projection| !projection.is_mapped(column))
        {
            return Ok(None);
        }
        Ok(self.rows[idx].get(column - 1).and_then(|v| v.as_deref()))
    }

    fn close(&mut self) -> Result<()> {
        self.state.close();
        self.current = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Restricted table function over a fixed set of text rows.
///
/// Columns the engine did not ask for read as null. With
/// [`MemoryTableOptions::apply_restriction`] set, rows failing the pushed
/// restriction are skipped, comparing cells as the schema's declared kinds.
#[derive(Debug)]
pub struct MemoryTableAdapter {
    cursor: StringColumnCursor<MemorySource>,
    setup: ScanSetup,
    options: MemoryTableOptions,
}

impl MemoryTableAdapter {
    pub fn new(schema: ColumnSchema, rows: MemoryRows) -> Result<Self> {
        Self::with_options(schema, rows, MemoryTableOptions::default())
    }

    pub fn with_options(
        schema: ColumnSchema,
        rows: MemoryRows,
        options: MemoryTableOptions,
    ) -> Result<Self> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() > schema.len())
        {
            return Err(Error::configuration(format!(
                "row {} has {} values but the table declares {} columns",
                idx + 1,
                row.len(),
                schema.len()
            )));
        }
        let source = MemorySource {
            schema: schema.clone(),
            rows: rows.into(),
            state: CursorState::new(),
            current: None,
            required: None,
            filter: None,
        };
        Ok(Self {
            cursor: StringColumnCursor::new(schema, source),
            setup: ScanSetup::new(),
            options,
        })
    }

    /// Build the adapter for a registered function, taking column names from
    /// its declared return signature.
    pub fn from_context(
        context: &ScanContext,
        metadata: &dyn FunctionMetadata,
        rows: MemoryRows,
        options: MemoryTableOptions,
    ) -> Result<Self> {
        Self::with_options(context.column_schema(metadata)?, rows, options)
    }

    pub fn row_count(&self) -> usize {
        self.cursor.source().rows.len()
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.setup.restriction()
    }
}

impl RowCursor for MemoryTableAdapter {
    fn next(&mut self) -> Result<bool> {
        self.setup.mark_fetch_started();
        self.cursor.next()
    }

    fn close(&mut self) -> Result<()> {
        if !self.cursor.is_closed() {
            debug!("memory table closed");
        }
        self.setup.release();
        self.cursor.close()
    }

    fn is_closed(&self) -> bool {
        let state = &self.cursor.source().state;
        state.is_unopened() || state.is_closed()
    }

    fn was_null(&self) -> Result<bool> {
        self.cursor.was_null()
    }

    fn metadata(&self) -> Result<ColumnSchema> {
        Ok(self.cursor.schema().clone())
    }

    fn get_value(&mut self, column: usize, kind: ScalarKind) -> Result<ScalarValue> {
        self.cursor.get_value(column, kind)
    }
}

impl RestrictedScan for MemoryTableAdapter {
    fn init_scan(
        &mut self,
        required_columns: &[Option<String>],
        restriction: Option<Restriction>,
    ) -> Result<()> {
        let projection = self
            .setup
            .init(self.cursor.schema(), required_columns, restriction)?
            .clone();
        let filter = if self.options.apply_restriction {
            self.setup.restriction().cloned()
        } else {
            None
        };
        let source = self.cursor.source_mut();
        source.required = Some(projection);
        source.filter = filter;
        Ok(())
    }
}

impl ScanCosting for MemoryTableAdapter {
    fn estimated_row_count(&self, _env: &CostingEnvironment) -> Result<f64> {
        Ok(match &self.options.costing {
            Some(fixed) => fixed.row_count,
            None => self.row_count() as f64,
        })
    }

    fn estimated_cost_per_instantiation(&self, _env: &CostingEnvironment) -> Result<f64> {
        Ok(match &self.options.costing {
            Some(fixed) => fixed.cost_per_instantiation,
            None => self.row_count() as f64,
        })
    }

    fn supports_multiple_instantiations(&self, _env: &CostingEnvironment) -> Result<bool> {
        Ok(self
            .options
            .costing
            .is_none_or(|fixed| fixed.multiple_instantiations))
    }
}
