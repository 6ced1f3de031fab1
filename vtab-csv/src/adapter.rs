//! Restricted table function over a CSV file.

use std::path::{Path, PathBuf};

use arrow::record_batch::RecordBatch;
use tracing::{debug, trace};
use vtab_expr::Restriction;
use vtab_result::{Error, Result};
use vtab_scan::{
    CursorState, FunctionMetadata, ProjectionMap, RestrictedScan, RowCursor, ScanContext,
    ScanCosting, ScanSetup, StringColumnCursor, StringRowSource,
};
use vtab_types::{ColumnSchema, ScalarKind, ScalarValue};

use crate::reader::{CsvReadOptions, read_header, read_text_batches, text_at};

/// Loaded file contents and the read position.
#[derive(Debug)]
struct CsvRows {
    batches: Vec<RecordBatch>,
    /// Exposed column (0-based) to batch column, `None` when not loaded.
    slots: Vec<Option<usize>>,
    batch: usize,
    row: usize,
    current: Option<(usize, usize)>,
}

impl CsvRows {
    fn text(
        &self,
        column: usize,
        (batch, row): (usize, usize),
        options: &CsvReadOptions,
    ) -> Result<Option<&str>> {
        match self.slots.get(column - 1).copied().flatten() {
            Some(slot) => text_at(&self.batches[batch], slot, row, options),
            None => Ok(None),
        }
    }
}

#[derive(Debug)]
struct CsvSource {
    path: PathBuf,
    options: CsvReadOptions,
    schema: ColumnSchema,
    state: CursorState<CsvRows>,
    required: Option<ProjectionMap>,
    filter: Option<Restriction>,
}

fn load(
    path: &Path,
    options: &CsvReadOptions,
    schema: &ColumnSchema,
    required: Option<&ProjectionMap>,
    filter: Option<&Restriction>,
) -> Result<CsvRows> {
    let resource = || path.display().to_string();
    let header = read_header(path, options).map_err(|err| Error::resource(resource(), err))?;

    let mut file_columns = Vec::with_capacity(schema.len());
    for (idx, name) in schema.names().iter().enumerate() {
        let position = if options.has_header {
            header.iter().position(|field| field == name)
        } else {
            (idx < header.len()).then_some(idx)
        };
        let position = position.ok_or_else(|| {
            Error::resource(
                resource(),
                format!("column \"{name}\" is not in the file header"),
            )
        })?;
        file_columns.push(position);
    }

    let referenced: Vec<&str> = filter
        .map(Restriction::referenced_columns)
        .unwrap_or_default();
    let needed = |idx: usize, name: &str| {
        required.is_none_or(|projection| projection.is_mapped(idx + 1))
            || referenced.contains(&name)
    };

    let mut projection: Vec<usize> = schema
        .names()
        .iter()
        .enumerate()
        .filter(|(idx, name)| needed(*idx, name))
        .map(|(idx, _)| file_columns[idx])
        .collect();
    projection.sort_unstable();
    projection.dedup();
    if projection.is_empty() {
        // Row count still comes from the file.
        projection.push(0);
    }

    let slots = schema
        .names()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if needed(idx, name) {
                projection.binary_search(&file_columns[idx]).ok()
            } else {
                None
            }
        })
        .collect();

    let batches = read_text_batches(path, options, &header, projection)
        .map_err(|err| Error::resource(resource(), err))?;
    Ok(CsvRows {
        batches,
        slots,
        batch: 0,
        row: 0,
        current: None,
    })
}

impl StringRowSource for CsvSource {
    fn next_row(&mut self) -> Result<bool> {
        let Self {
            path,
            options,
            schema,
            state,
            required,
            filter,
        } = self;
        let rows = state.ensure_open(|| {
            debug!(path = %path.display(), "opening csv file");
            load(path, options, schema, required.as_ref(), filter.as_ref())
        })?;

        while let Some(batch) = rows.batches.get(rows.batch) {
            if rows.row >= batch.num_rows() {
                rows.batch += 1;
                rows.row = 0;
                continue;
            }
            let position = (rows.batch, rows.row);
            rows.row += 1;

            let keep = match filter.as_ref() {
                Some(restriction) => restriction.matches_text_row(schema, &mut |column| {
                    Ok(rows.text(column, position, options)?.map(str::to_string))
                })?,
                None => true,
            };
            if keep {
                trace!(batch = position.0, row = position.1, "csv row");
                rows.current = Some(position);
                return Ok(true);
            }
        }

        state.close();
        debug!(path = %path.display(), "csv file exhausted");
        Ok(false)
    }

    fn raw_column(&self, column: usize) -> Result<Option<&str>> {
        let rows = self.state.resource()?;
        let position = rows.current.ok_or_else(vtab_scan::state::no_current_row)?;
        if self
            .required
            .as_ref()
            .is_some_and(|projection| !projection.is_mapped(column))
        {
            return Ok(None);
        }
        rows.text(column, position, &self.options)
    }

    fn close(&mut self) -> Result<()> {
        self.state.close();
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.is_closed()
    }
}

/// Exposes columns of a CSV file as a restricted table function.
///
/// The adapter's column names select header fields (or positions, for files
/// without a header). The file is read once, on the first `next()`, keeping
/// only the fields the scan needs.
#[derive(Debug)]
pub struct CsvTableAdapter {
    cursor: StringColumnCursor<CsvSource>,
    setup: ScanSetup,
}

impl CsvTableAdapter {
    pub fn new(
        path: impl Into<PathBuf>,
        schema: ColumnSchema,
        options: CsvReadOptions,
    ) -> Self {
        let source = CsvSource {
            path: path.into(),
            options,
            schema: schema.clone(),
            state: CursorState::new(),
            required: None,
            filter: None,
        };
        Self {
            cursor: StringColumnCursor::new(schema, source),
            setup: ScanSetup::new(),
        }
    }

    /// Adapter exposing the columns declared by a registered function.
    pub fn from_context(
        context: &ScanContext,
        metadata: &dyn FunctionMetadata,
        path: impl Into<PathBuf>,
        options: CsvReadOptions,
    ) -> Result<Self> {
        Ok(Self::new(path, context.column_schema(metadata)?, options))
    }

    /// Adapter exposing every header field of `path`, in file order.
    /// No types are declared, so the pushed restriction compares text.
    pub fn with_header_columns(path: impl Into<PathBuf>, options: CsvReadOptions) -> Result<Self> {
        let path = path.into();
        let header = read_header(&path, &options)
            .map_err(|err| Error::resource(path.display().to_string(), err))?;
        Ok(Self::new(path, ColumnSchema::new(header)?, options))
    }

    pub fn path(&self) -> &Path {
        &self.cursor.source().path
    }
}

impl RowCursor for CsvTableAdapter {
    fn next(&mut self) -> Result<bool> {
        self.setup.mark_fetch_started();
        self.cursor.next()
    }

    fn close(&mut self) -> Result<()> {
        if self.cursor.source().state.is_open() {
            debug!(path = %self.path().display(), "csv file closed");
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

impl RestrictedScan for CsvTableAdapter {
    fn init_scan(
        &mut self,
        required_columns: &[Option<String>],
        restriction: Option<Restriction>,
    ) -> Result<()> {
        let projection = self
            .setup
            .init(self.cursor.schema(), required_columns, restriction)?
            .clone();
        let filter = if self.cursor.source().options.apply_restriction {
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

impl ScanCosting for CsvTableAdapter {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file(lines: &[&str]) -> NamedTempFile {
        let mut tmp = NamedTempFile::new().expect("create tmp");
        for line in lines {
            writeln!(tmp, "{line}").expect("write");
        }
        tmp
    }

    #[test]
    fn columns_select_header_fields_by_name() {
        let tmp = file(&["a,b,c", "1,2,3", "4,5,6"]);
        let schema = ColumnSchema::new(["c", "a"]).expect("schema");
        let mut t = CsvTableAdapter::new(tmp.path(), schema, CsvReadOptions::default());
        let mut seen = Vec::new();
        while t.next().expect("next") {
            seen.push((t.get_int(1).expect("c"), t.get_int(2).expect("a")));
        }
        assert_eq!(seen, [(3, 1), (6, 4)]);
    }

    #[test]
    fn headerless_files_map_by_position() {
        let tmp = file(&["x,10", "y,20"]);
        let schema = ColumnSchema::new(["LABEL", "AMOUNT"]).expect("schema");
        let options = CsvReadOptions {
            has_header: false,
            ..Default::default()
        };
        let mut t = CsvTableAdapter::new(tmp.path(), schema, options);
        assert!(t.next().expect("row"));
        assert_eq!(t.get_string(1).expect("label").as_deref(), Some("x"));
        assert_eq!(t.get_long(2).expect("amount"), 10);
    }

    #[test]
    fn unknown_header_name_fails_at_open() {
        let tmp = file(&["a,b", "1,2"]);
        let schema = ColumnSchema::new(["a", "missing"]).expect("schema");
        let mut t = CsvTableAdapter::new(tmp.path(), schema, CsvReadOptions::default());
        let err = t.next().expect_err("unknown column");
        assert!(matches!(err, Error::Resource { .. }));
        assert!(err.to_string().contains("missing"));
        assert!(t.is_closed(), "still unopened");
    }

    #[test]
    fn missing_file_is_a_resource_failure() {
        let schema = ColumnSchema::new(["a"]).expect("schema");
        let mut t = CsvTableAdapter::new(
            "/nonexistent/vtab/input.csv",
            schema,
            CsvReadOptions::default(),
        );
        assert!(matches!(t.next(), Err(Error::Resource { .. })));
    }
}
