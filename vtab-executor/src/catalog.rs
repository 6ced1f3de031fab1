//! Registry of table-function return signatures.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;
use vtab_result::{Error, Result};
use vtab_scan::FunctionMetadata;
use vtab_types::ColumnDescriptor;

/// Declared return columns keyed by `(schema, function)`.
///
/// Names are matched exactly.
#[derive(Debug, Default, Clone)]
pub struct FunctionCatalog {
    functions: FxHashMap<(String, String), Vec<ColumnDescriptor>>,
}

impl FunctionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema.function` returning `columns`.
    ///
    /// Signatures must declare at least one column and no column name twice;
    /// a function is registered at most once.
    pub fn register(
        &mut self,
        schema: impl Into<String>,
        function: impl Into<String>,
        columns: Vec<ColumnDescriptor>,
    ) -> Result<()> {
        let key = (schema.into(), function.into());
        if columns.is_empty() {
            return Err(Error::configuration(format!(
                "{}.{} must declare at least one return column",
                key.0, key.1
            )));
        }
        let mut seen = FxHashSet::default();
        for column in &columns {
            if column.column_name.trim().is_empty() {
                return Err(Error::configuration(format!(
                    "{}.{} declares a column with an empty name",
                    key.0, key.1
                )));
            }
            if !seen.insert(column.column_name.as_str()) {
                return Err(Error::configuration(format!(
                    "{}.{} declares column \"{}\" more than once",
                    key.0, key.1, column.column_name
                )));
            }
        }
        if self.functions.contains_key(&key) {
            return Err(Error::configuration(format!(
                "table function {}.{} is already registered",
                key.0, key.1
            )));
        }
        debug!(schema = %key.0, function = %key.1, columns = columns.len(), "registered table function");
        self.functions.insert(key, columns);
        Ok(())
    }

    pub fn contains(&self, schema: &str, function: &str) -> bool {
        self.functions
            .contains_key(&(schema.to_string(), function.to_string()))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl FunctionMetadata for FunctionCatalog {
    fn return_table_columns(&self, schema: &str, function: &str) -> Result<Vec<ColumnDescriptor>> {
        self.functions
            .get(&(schema.to_string(), function.to_string()))
            .cloned()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "table function {schema}.{function} does not exist"
                ))
            })
    }
}
