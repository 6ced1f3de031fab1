//! Where a scan runs: the invoking function and its declared return shape.

use vtab_result::{Error, Result};
use vtab_types::{ColumnDescriptor, ColumnSchema};

/// Identity of the table-function invocation an adapter serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContext {
    pub schema_name: String,
    pub function_name: String,
    pub statement_text: Option<String>,
}

impl ScanContext {
    pub fn new(schema_name: impl Into<String>, function_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
            function_name: function_name.into(),
            statement_text: None,
        }
    }

    pub fn with_statement(mut self, text: impl Into<String>) -> Self {
        self.statement_text = Some(text.into());
        self
    }

    /// The function's return signature, sorted by ordinal position.
    pub fn return_table_signature(
        &self,
        metadata: &dyn FunctionMetadata,
    ) -> Result<Vec<ColumnDescriptor>> {
        let mut signature =
            metadata.return_table_columns(&self.schema_name, &self.function_name)?;
        if signature.is_empty() {
            return Err(Error::configuration(format!(
                "{}.{} declares no return columns",
                self.schema_name, self.function_name
            )));
        }
        signature.sort();
        Ok(signature)
    }

    /// Column schema built from the sorted return signature.
    pub fn column_schema(&self, metadata: &dyn FunctionMetadata) -> Result<ColumnSchema> {
        ColumnSchema::from_descriptors(&self.return_table_signature(metadata)?)
    }
}

/// Catalog lookup of a table function's declared return columns.
pub trait FunctionMetadata {
    /// Return columns of `schema.function` in any order.
    fn return_table_columns(&self, schema: &str, function: &str) -> Result<Vec<ColumnDescriptor>>;
}
