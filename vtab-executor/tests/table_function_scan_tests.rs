use std::cell::Cell;
use std::io::Write;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Decimal128Type, Int32Type, TimestampMillisecondType};
use tempfile::NamedTempFile;
use vtab_csv::{CsvReadOptions, CsvTableAdapter};
use vtab_executor::{
    FunctionCatalog, InstantiationStrategy, PlainTableFunction, ScanOptions, ScanPlanner,
    TableFunction, TableFunctionScan,
};
use vtab_expr::{CompareOp, NoPushdown, Operand, Predicate};
use vtab_foreign::{
    ForeignTableAdapter, ForeignTableConfig, MemoryConnection, MemoryDatabase, Ownership,
};
use vtab_result::Error;
use vtab_scan::{
    CostEstimate, CostingEnvironment, MemoryTableAdapter, MemoryTableOptions, RowCursor,
    ScanContext,
};
use vtab_test_utils::fixtures::{PEOPLE_COLUMNS, people_csv, people_rows};
use vtab_types::{ColumnDescriptor, SqlType, TemporalKind, TemporalValue};

fn catalog() -> FunctionCatalog {
    let mut catalog = FunctionCatalog::new();
    catalog
        .register(
            "APP",
            "PEOPLE",
            vec![
                ColumnDescriptor::new("JOINED", SqlType::Timestamp, 4),
                ColumnDescriptor::new("ID", SqlType::Integer, 1),
                ColumnDescriptor::new("SCORE", SqlType::Decimal, 3).with_precision_scale(5, 2),
                ColumnDescriptor::new("NAME", SqlType::Varchar, 2),
            ],
        )
        .expect("register");
    catalog
}

fn context() -> ScanContext {
    ScanContext::new("APP", "PEOPLE").with_statement("SELECT * FROM TABLE(APP.PEOPLE()) P")
}

fn memory(options: MemoryTableOptions) -> MemoryTableAdapter {
    MemoryTableAdapter::from_context(&context(), &catalog(), people_rows(), options)
        .expect("adapter")
}

fn high_scores() -> Vec<Predicate> {
    vec![Predicate::compare(
        Operand::Column("SCORE".into()),
        CompareOp::Gt,
        Operand::Constant(80.into()),
    )]
}

fn names(batch: &arrow::record_batch::RecordBatch, column: usize) -> Vec<Option<String>> {
    let array = batch.column(column).as_string::<i32>();
    (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| array.value(i).to_string()))
        .collect()
}

#[test]
fn full_scan_materializes_declared_types() {
    let scan = TableFunctionScan::new(context(), &catalog()).expect("scan");
    let mut function = memory(MemoryTableOptions::default());
    let batch = scan.execute(&mut function).expect("execute");

    assert_eq!(batch.num_rows(), 5);
    let schema = batch.schema();
    let names_in_order: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names_in_order, PEOPLE_COLUMNS);
    assert_eq!(schema.field(2).data_type(), &DataType::Decimal128(5, 2));

    let ids = batch.column(0).as_primitive::<Int32Type>();
    assert_eq!(ids.values().to_vec(), [1, 2, 3, 4, 5]);
    let scores = batch.column(2).as_primitive::<Decimal128Type>();
    assert_eq!(scores.value(0), 9150);
    assert!(scores.is_null(1));
    let joined = batch.column(3).as_primitive::<TimestampMillisecondType>();
    assert!(joined.is_null(2));
    assert!(function.is_closed());
}

#[test]
fn restriction_is_reapplied_whatever_the_adapter_does() {
    let scan = TableFunctionScan::new(context(), &catalog())
        .expect("scan")
        .select(["NAME"])
        .expect("select")
        .filter(high_scores());
    let expected = [Some("alice".to_string()), Some("dana".to_string())];

    for (apply, push) in [(true, true), (false, true), (true, false)] {
        let mut function = memory(MemoryTableOptions {
            apply_restriction: apply,
            ..MemoryTableOptions::default()
        });
        let batch = scan
            .clone()
            .with_options(ScanOptions {
                push_restriction: push,
            })
            .execute(&mut function)
            .expect("execute");
        assert_eq!(names(&batch, 0), expected, "apply={apply} push={push}");
    }

    let mut plain = PlainTableFunction(memory(MemoryTableOptions::default()));
    let batch = scan.execute(&mut plain).expect("execute");
    assert_eq!(names(&batch, 0), expected);
}

#[test]
fn foreign_adapter_with_and_without_pushdown() {
    let db = MemoryDatabase::new();
    db.create_table("APP.PEOPLE", PEOPLE_COLUMNS, people_rows())
        .expect("table");
    let scan = TableFunctionScan::new(context(), &catalog())
        .expect("scan")
        .select(["ID", "NAME"])
        .expect("select")
        .filter(high_scores());

    let mut results = Vec::new();
    for pushdown in [true, false] {
        let mut config = ForeignTableConfig::new("PEOPLE", PEOPLE_COLUMNS).with_schema("APP");
        if !pushdown {
            config = config.with_renderer(Arc::new(NoPushdown));
        }
        let conn = Arc::new(MemoryConnection::new("mem://people", Arc::clone(&db)));
        let mut function =
            ForeignTableAdapter::with_connection(config, conn, Ownership::Owned).expect("adapter");
        let batch = scan.execute(&mut function).expect("execute");
        results.push(names(&batch, 1));
    }
    assert_eq!(results[0], results[1]);
    assert_eq!(results[0].len(), 2);

    let queries = db.executed_queries();
    assert_eq!(
        queries[0],
        r#"SELECT "ID", "NAME", "SCORE" FROM "APP"."PEOPLE" WHERE "SCORE" > 80"#
    );
    assert_eq!(queries[1], r#"SELECT "ID", "NAME", "SCORE" FROM "APP"."PEOPLE""#);
}

#[test]
fn csv_adapter_through_the_driver() {
    let mut tmp = NamedTempFile::new().expect("tmp");
    tmp.write_all(people_csv().as_bytes()).expect("write");
    let scan = TableFunctionScan::new(context(), &catalog())
        .expect("scan")
        .select(["JOINED", "ID"])
        .expect("select")
        .filter(vec![Predicate::IsNull {
            column: "JOINED".into(),
            negated: true,
        }]);
    let mut function =
        CsvTableAdapter::from_context(&context(), &catalog(), tmp.path(), CsvReadOptions::default())
            .expect("adapter");
    let batch = scan.execute(&mut function).expect("execute");
    assert_eq!(batch.num_rows(), 4);
    assert_eq!(
        batch.column(1).as_primitive::<Int32Type>().values().to_vec(),
        [1, 2, 4, 5]
    );
}

#[test]
fn failed_scan_still_closes_the_adapter() {
    let mut catalog = FunctionCatalog::new();
    catalog
        .register(
            "APP",
            "BAD",
            vec![
                ColumnDescriptor::new("ID", SqlType::Integer, 1),
                ColumnDescriptor::new("NAME", SqlType::Integer, 2),
            ],
        )
        .expect("register");
    let ctx = ScanContext::new("APP", "BAD");
    let rows = people_rows()
        .into_iter()
        .map(|row| row.into_iter().take(2).collect())
        .collect();
    let mut function =
        MemoryTableAdapter::from_context(&ctx, &catalog, rows, MemoryTableOptions::default())
            .expect("adapter");
    let scan = TableFunctionScan::new(ctx, &catalog).expect("scan");

    let err = scan.execute(&mut function).expect_err("NAME is not an integer");
    assert!(matches!(err, Error::Coercion { column: 2, .. }));
    assert!(function.is_closed());
    assert!(matches!(function.next(), Err(Error::CursorClosed)));
}

#[test]
fn single_instantiation_functions_are_scanned_once() {
    let scan = TableFunctionScan::new(context(), &catalog()).expect("scan");
    for (multiple, expected_instances) in [(true, 3), (false, 1)] {
        let options = MemoryTableOptions {
            costing: Some(CostEstimate {
                multiple_instantiations: multiple,
                ..CostEstimate::default()
            }),
            ..MemoryTableOptions::default()
        };
        let costed = memory(options.clone());
        let mut planner = ScanPlanner::new(CostingEnvironment::new("SELECT 1"));
        let plan = planner.plan(scan.context(), costed.costing(), 3.0);
        assert_eq!(
            plan.strategy == InstantiationStrategy::MaterializeOnce,
            !multiple
        );

        let instances = Cell::new(0);
        let batches = scan
            .execute_inner(&plan, 3, || {
                instances.set(instances.get() + 1);
                Ok(Box::new(memory(options.clone())) as Box<dyn TableFunction>)
            })
            .expect("execute");
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.num_rows() == 5));
        assert_eq!(instances.get(), expected_instances);
    }
}

#[test]
fn empty_outer_side_instantiates_nothing() {
    let scan = TableFunctionScan::new(context(), &catalog()).expect("scan");
    let mut planner = ScanPlanner::new(CostingEnvironment::new("SELECT 1"));
    for multiple in [true, false] {
        let options = MemoryTableOptions {
            costing: Some(CostEstimate {
                multiple_instantiations: multiple,
                ..CostEstimate::default()
            }),
            ..MemoryTableOptions::default()
        };
        let costed = memory(options);
        let plan = planner.plan(
            &ScanContext::new("APP", if multiple { "MANY" } else { "ONCE" }),
            costed.costing(),
            0.0,
        );
        let instances = Cell::new(0);
        let batches = scan
            .execute_inner(&plan, 0, || {
                instances.set(instances.get() + 1);
                Ok(Box::new(memory(MemoryTableOptions::default())) as Box<dyn TableFunction>)
            })
            .expect("execute");
        assert!(batches.is_empty());
        assert_eq!(instances.get(), 0, "multiple={multiple}");
    }
}

const NUMS_CSV: &str = "ID,D\n9,2024-03-05\n10,2019-06-01\n11,\n";

fn nums_catalog() -> FunctionCatalog {
    let mut catalog = FunctionCatalog::new();
    catalog
        .register(
            "APP",
            "NUMS",
            vec![
                ColumnDescriptor::new("ID", SqlType::Integer, 1),
                ColumnDescriptor::new("D", SqlType::Date, 2),
            ],
        )
        .expect("register");
    catalog
}

fn nums_rows() -> Vec<Vec<Option<String>>> {
    NUMS_CSV
        .lines()
        .skip(1)
        .map(|line| {
            line.split(',')
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect()
        })
        .collect()
}

fn ids(batch: &arrow::record_batch::RecordBatch) -> Vec<i32> {
    batch.column(0).as_primitive::<Int32Type>().values().to_vec()
}

/// Runs `predicate` over the NUMS table through every adapter, with the
/// restriction pushed and not pushed, and returns the distinct results.
fn ids_everywhere(predicate: Predicate) -> Vec<Vec<i32>> {
    let ctx = ScanContext::new("APP", "NUMS");
    let catalog = nums_catalog();
    let scan = TableFunctionScan::new(ctx.clone(), &catalog)
        .expect("scan")
        .select(["ID"])
        .expect("select")
        .filter(vec![predicate]);
    let mut tmp = NamedTempFile::new().expect("tmp");
    tmp.write_all(NUMS_CSV.as_bytes()).expect("write");
    let db = MemoryDatabase::new();
    db.create_table_sql("CREATE TABLE APP.NUMS (ID INTEGER, D DATE)", nums_rows())
        .expect("table");

    let mut results: Vec<Vec<i32>> = Vec::new();
    for push in [true, false] {
        let scan = scan.clone().with_options(ScanOptions {
            push_restriction: push,
        });
        let mut functions: Vec<Box<dyn TableFunction>> = vec![
            Box::new(
                MemoryTableAdapter::from_context(
                    &ctx,
                    &catalog,
                    nums_rows(),
                    MemoryTableOptions::default(),
                )
                .expect("memory"),
            ),
            Box::new(
                CsvTableAdapter::from_context(&ctx, &catalog, tmp.path(), CsvReadOptions::default())
                    .expect("csv"),
            ),
            Box::new(
                ForeignTableAdapter::with_connection(
                    ForeignTableConfig::new("NUMS", ["ID", "D"]).with_schema("APP"),
                    Arc::new(MemoryConnection::new("mem://nums", Arc::clone(&db))),
                    Ownership::Owned,
                )
                .expect("foreign"),
            ),
        ];
        for function in &mut functions {
            let batch = scan.execute(function.as_mut()).expect("execute");
            let found = ids(&batch);
            if !results.contains(&found) {
                results.push(found);
            }
        }
    }
    results
}

#[test]
fn pushdown_keeps_numeric_comparison_with_text_constant() {
    let below_ten = Predicate::compare(
        Operand::Column("ID".into()),
        CompareOp::Lt,
        Operand::Constant("10".into()),
    );
    assert_eq!(ids_everywhere(below_ten), [vec![9]]);
}

#[test]
fn pushdown_keeps_date_against_timestamp_comparison() {
    // 2020-01-01T00:00:00Z
    let after_2020 = Predicate::compare(
        Operand::Column("D".into()),
        CompareOp::Gt,
        Operand::Constant(TemporalValue::new(TemporalKind::Timestamp, 1_577_836_800_000).into()),
    );
    assert_eq!(ids_everywhere(after_2020), [vec![9]]);
}
