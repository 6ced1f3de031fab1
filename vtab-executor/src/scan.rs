//! Driving one table-function scan to an Arrow batch.

use std::sync::Arc;

use arrow::datatypes::{Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};
use vtab_expr::{Operand, Predicate, Restriction, build_restriction};
use vtab_result::{Error, Result};
use vtab_scan::{FunctionMetadata, ScanContext};
use vtab_types::{ColumnDescriptor, ScalarValue};

use crate::filter;
use crate::function::TableFunction;
use crate::materialize::ColumnBuilder;
use crate::planner::{InstantiationStrategy, ScanPlan};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Hand the translated WHERE clause to adapters through `init_scan`.
    /// The engine filters every row either way.
    pub push_restriction: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            push_restriction: true,
        }
    }
}

/// A table-function reference in a query: which columns the query reads and
/// which rows it keeps.
#[derive(Debug, Clone)]
pub struct TableFunctionScan {
    context: ScanContext,
    signature: Vec<ColumnDescriptor>,
    /// Signature positions of the output columns, in output order.
    output: Vec<usize>,
    predicates: Vec<Predicate>,
    /// Exposed column name to declared column name.
    names: FxHashMap<String, String>,
    options: ScanOptions,
}

impl TableFunctionScan {
    /// Scan of every declared column with no predicate.
    pub fn new(context: ScanContext, metadata: &dyn FunctionMetadata) -> Result<Self> {
        let signature = context.return_table_signature(metadata)?;
        let names = signature
            .iter()
            .map(|c| (c.column_name.clone(), c.column_name.clone()))
            .collect();
        Ok(Self {
            output: (0..signature.len()).collect(),
            context,
            signature,
            predicates: Vec::new(),
            names,
            options: ScanOptions::default(),
        })
    }

    /// Output only `columns`, in the given order.
    pub fn select<S: AsRef<str>>(mut self, columns: impl IntoIterator<Item = S>) -> Result<Self> {
        self.output = columns
            .into_iter()
            .map(|name| self.position(name.as_ref()))
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Keep only rows for which every conjunct is true.
    pub fn filter(mut self, conjuncts: Vec<Predicate>) -> Self {
        self.predicates = conjuncts;
        self
    }

    /// Let predicates refer to `declared` as `exposed`.
    pub fn with_alias(mut self, exposed: impl Into<String>, declared: impl Into<String>) -> Self {
        self.names.insert(exposed.into(), declared.into());
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &ScanContext {
        &self.context
    }

    pub fn signature(&self) -> &[ColumnDescriptor] {
        &self.signature
    }

    pub fn output_schema(&self) -> SchemaRef {
        let fields: Vec<Field> = self
            .output
            .iter()
            .map(|&idx| {
                let column = &self.signature[idx];
                Field::new(&column.column_name, column.arrow_type(), true)
            })
            .collect();
        Arc::new(Schema::new(fields))
    }

    fn position(&self, exposed: &str) -> Result<usize> {
        let declared = self.names.get(exposed).map_or(exposed, String::as_str);
        self.signature
            .iter()
            .position(|c| c.column_name == declared)
            .ok_or_else(|| Error::ColumnNotFound(exposed.to_string()))
    }

    /// One slot per declared column: its name when the query reads it.
    pub fn required_columns(&self) -> Result<Vec<Option<String>>> {
        let mut read = vec![false; self.signature.len()];
        for &idx in &self.output {
            read[idx] = true;
        }
        let mut referenced = Vec::new();
        for predicate in &self.predicates {
            predicate_columns(predicate, &mut referenced);
        }
        for name in referenced {
            read[self.position(name)?] = true;
        }
        Ok(self
            .signature
            .iter()
            .zip(read)
            .map(|(column, read)| read.then(|| column.column_name.clone()))
            .collect())
    }

    /// The WHERE clause as a restriction, when all of it translates.
    pub fn restriction(&self) -> Option<Restriction> {
        build_restriction(&self.predicates, &self.names)
    }

    /// Run the scan on `function` and materialize the surviving rows.
    ///
    /// The function is closed before returning, on success and on error.
    pub fn execute(&self, function: &mut dyn TableFunction) -> Result<RecordBatch> {
        match self.drive(function) {
            Ok(batch) => {
                function.close()?;
                Ok(batch)
            }
            Err(err) => {
                if let Err(close_err) = function.close() {
                    warn!(%err, %close_err, "closing table function after a failed scan");
                }
                Err(err)
            }
        }
    }

    /// Run the scan as the inner side of a join with `outer_rows` rows.
    ///
    /// Functions that allow several instantiations are instantiated and
    /// scanned once per outer row; the others are scanned once and their
    /// rows reused. With no outer rows nothing is instantiated.
    pub fn execute_inner<F>(
        &self,
        plan: &ScanPlan,
        outer_rows: usize,
        mut instantiate: F,
    ) -> Result<Vec<RecordBatch>>
    where
        F: FnMut() -> Result<Box<dyn TableFunction>>,
    {
        match plan.strategy {
            InstantiationStrategy::PerOuterRow => (0..outer_rows)
                .map(|_| {
                    let mut function = instantiate()?;
                    self.execute(function.as_mut())
                })
                .collect(),
            InstantiationStrategy::MaterializeOnce if outer_rows == 0 => Ok(Vec::new()),
            InstantiationStrategy::MaterializeOnce => {
                let mut function = instantiate()?;
                let batch = self.execute(function.as_mut())?;
                Ok(vec![batch; outer_rows])
            }
        }
    }

    fn drive(&self, function: &mut dyn TableFunction) -> Result<RecordBatch> {
        let required = self.required_columns()?;
        if let Some(restricted) = function.as_restricted() {
            let restriction = if self.options.push_restriction {
                self.restriction()
            } else {
                None
            };
            restricted.init_scan(&required, restriction)?;
        }

        let fetched: Vec<usize> = required
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| slot.as_ref().map(|_| idx))
            .collect();
        let mut builders: Vec<ColumnBuilder> = self
            .output
            .iter()
            .map(|&idx| ColumnBuilder::new(self.signature[idx].clone()))
            .collect();
        let mut row = vec![ScalarValue::Null; self.signature.len()];
        let (mut scanned, mut kept) = (0usize, 0usize);

        while function.next()? {
            scanned += 1;
            for &idx in &fetched {
                let kind = self.signature[idx].sql_type.scalar_kind();
                row[idx] = function.get_value(idx + 1, kind)?;
            }
            let keep = filter::passes(&self.predicates, &mut |name: &str| {
                Ok(row[self.position(name)?].clone())
            })?;
            if !keep {
                trace!(row = scanned, "row rejected by engine filter");
                continue;
            }
            kept += 1;
            for (builder, &idx) in builders.iter_mut().zip(&self.output) {
                builder.push(row[idx].clone());
            }
        }
        debug!(
            function = %self.context.function_name,
            scanned,
            kept,
            "table-function scan finished"
        );

        let arrays = builders
            .into_iter()
            .map(ColumnBuilder::finish)
            .collect::<Result<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(kept));
        Ok(RecordBatch::try_new_with_options(
            self.output_schema(),
            arrays,
            &options,
        )?)
    }
}

fn predicate_columns<'a>(predicate: &'a Predicate, out: &mut Vec<&'a str>) {
    match predicate {
        Predicate::And(l, r) | Predicate::Or(l, r) => {
            predicate_columns(l, out);
            predicate_columns(r, out);
        }
        Predicate::Compare { left, right, .. } => {
            for operand in [left, right] {
                if let Operand::Column(name) = operand {
                    out.push(name);
                }
            }
        }
        Predicate::IsNull { column, .. } => out.push(column),
        Predicate::Literal(_) | Predicate::Other(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FunctionCatalog;
    use vtab_expr::CompareOp;
    use vtab_types::SqlType;

    fn scan() -> TableFunctionScan {
        let mut catalog = FunctionCatalog::new();
        catalog
            .register(
                "APP",
                "T",
                vec![
                    ColumnDescriptor::new("ID", SqlType::Integer, 1),
                    ColumnDescriptor::new("NAME", SqlType::Varchar, 2),
                    ColumnDescriptor::new("AGE", SqlType::Integer, 3),
                ],
            )
            .expect("register");
        TableFunctionScan::new(ScanContext::new("APP", "T"), &catalog).expect("scan")
    }

    #[test]
    fn required_columns_cover_output_and_predicates() {
        let s = scan()
            .select(["NAME"])
            .expect("select")
            .filter(vec![Predicate::compare(
                Operand::Column("A".into()),
                CompareOp::Gt,
                Operand::Constant(30.into()),
            )])
            .with_alias("A", "AGE");
        assert_eq!(
            s.required_columns().expect("required"),
            [None, Some("NAME".to_string()), Some("AGE".to_string())]
        );
        assert_eq!(s.restriction().expect("pushable").to_sql(), r#""AGE" > 30"#);
    }

    #[test]
    fn unknown_output_column() {
        assert!(matches!(scan().select(["NOPE"]), Err(Error::ColumnNotFound(_))));
    }

    #[test]
    fn untranslatable_clause_disables_pushdown() {
        let s = scan().filter(vec![
            Predicate::IsNull {
                column: "NAME".into(),
                negated: true,
            },
            Predicate::Other("UPPER(NAME) = 'X'".into()),
        ]);
        assert!(s.restriction().is_none());
    }
}
