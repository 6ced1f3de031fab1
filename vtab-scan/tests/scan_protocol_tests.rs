use vtab_expr::{CompareOp, DelimitedSqlRenderer, NoPushdown, Restriction, RestrictionRenderer};
use vtab_result::Error;
use vtab_scan::{
    ForwardingCursor, MemoryTableAdapter, MemoryTableOptions, ProjectionMap, RestrictedScan,
    RowCursor,
};
use vtab_test_utils::fixtures::{PEOPLE_COLUMNS, people_rows};
use vtab_types::{ColumnSchema, ScalarValue};

fn people(options: MemoryTableOptions) -> MemoryTableAdapter {
    let schema = ColumnSchema::new(PEOPLE_COLUMNS).expect("schema");
    MemoryTableAdapter::with_options(schema, people_rows(), options).expect("adapter")
}

fn required(names: &[Option<&str>]) -> Vec<Option<String>> {
    names.iter().map(|n| n.map(str::to_string)).collect()
}

#[test]
fn unrequired_columns_read_as_null_on_every_row() {
    let mut t = people(MemoryTableOptions::default());
    t.init_scan(&required(&[Some("ID"), None, None, None]), None)
        .expect("init");

    let mut ids = Vec::new();
    while t.next().expect("next") {
        ids.push(t.get_int(1).expect("id"));
        assert!(!t.was_null().expect("flag"));
        assert_eq!(t.get_string(2).expect("name"), None);
        assert!(t.was_null().expect("flag"));
    }
    assert_eq!(ids, [1, 2, 3, 4, 5]);
}

#[test]
fn projection_map_for_id_only_scan() {
    let map = ProjectionMap::from_required(&required(&[Some("ID"), None]));
    assert_eq!(map.map(1), Some(1));
    assert_eq!(map.map(2), None);
    assert_eq!(map.mapped_count(), 1);
}

#[test]
fn text_value_reads_as_int_and_string() {
    let mut t = people(MemoryTableOptions::default());
    assert!(t.next().expect("row"));
    assert_eq!(t.get_int(1).expect("int"), 1);
    assert_eq!(t.get_string(1).expect("string").as_deref(), Some("1"));
    assert!(!t.was_null().expect("flag"));
}

#[test]
fn null_value_uses_kind_defaults() {
    let mut t = people(MemoryTableOptions::default());
    assert!(t.next().expect("row 1"));
    assert!(t.next().expect("row 2"));

    // Row 2 has a NULL SCORE.
    assert_eq!(t.get_int(3).expect("int"), 0);
    assert!(t.was_null().expect("flag"));
    assert_eq!(t.get_decimal(3).expect("decimal"), None);
    assert!(t.was_null().expect("flag"));
    assert_eq!(t.get_double(3).expect("double"), 0.0);
    assert!(t.was_null().expect("flag"));
    assert!(!t.get_boolean(3).expect("bool"));
    assert_eq!(t.get_timestamp(3).expect("ts"), None);
}

#[test]
fn refetching_a_column_is_idempotent() {
    let mut t = people(MemoryTableOptions::default());
    assert!(t.next().expect("row"));
    let first = t.get_decimal(3).expect("score");
    let second = t.get_decimal(3).expect("score again");
    assert_eq!(first, second);
    assert_eq!(first.map(|d| d.to_string()).as_deref(), Some("91.50"));
    assert_eq!(t.get_string_by_name("NAME").expect("by name").as_deref(), Some("alice"));
    assert_eq!(t.get_date(4).expect("date"), t.get_date(4).expect("date again"));
}

#[test]
fn ignored_restriction_still_yields_correct_rows_after_reapplication() {
    let restriction = Restriction::compare("ID", CompareOp::Eq, 2);
    assert!(!DelimitedSqlRenderer.render(&restriction).trim().is_empty());
    assert!(NoPushdown.render(&restriction).is_empty());

    for apply in [true, false] {
        let mut t = people(MemoryTableOptions {
            apply_restriction: apply,
            ..MemoryTableOptions::default()
        });
        t.init_scan(&required(&[Some("ID"), Some("NAME"), None, None]), Some(restriction.clone()))
            .expect("init");

        let mut kept = Vec::new();
        while t.next().expect("next") {
            let id = t.get_long(1).expect("id");
            let passes = restriction
                .matches(&mut |name: &str| match name {
                    "ID" => Ok(ScalarValue::Int64(id)),
                    other => Err(Error::ColumnNotFound(other.to_string())),
                })
                .expect("evaluate");
            if passes {
                kept.push(t.get_string(2).expect("name"));
            }
        }
        assert_eq!(kept, [Some("bob".to_string())], "apply_restriction={apply}");
    }
}

#[test]
fn second_init_scan_is_a_configuration_error() {
    let mut t = people(MemoryTableOptions::default());
    let slots = required(&[Some("ID"), None, None, None]);
    t.init_scan(&slots, None).expect("first");
    assert!(matches!(t.init_scan(&slots, None), Err(Error::Configuration(_))));
}

#[test]
fn init_scan_after_first_fetch_is_rejected() {
    let mut t = people(MemoryTableOptions::default());
    assert!(t.next().expect("row"));
    assert!(matches!(
        t.init_scan(&required(&[None, None, None, None]), None),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn cursor_lifecycle() {
    let mut t = people(MemoryTableOptions::default());
    assert!(t.is_closed(), "unopened without a supplied resource");
    assert!(t.next().expect("open"));
    assert!(!t.is_closed());

    t.close().expect("close");
    assert!(t.is_closed());
    t.close().expect("close is idempotent");
    assert!(matches!(t.next(), Err(Error::CursorClosed)));
    assert!(matches!(t.get_int(1), Err(Error::CursorClosed)));
}

#[test]
fn exhaustion_closes_the_cursor() {
    let mut t = people(MemoryTableOptions::default());
    let mut rows = 0;
    while t.next().expect("next") {
        rows += 1;
    }
    assert_eq!(rows, 5);
    assert!(t.is_closed());
    assert!(matches!(t.next(), Err(Error::CursorClosed)));
}

#[test]
fn getters_before_first_row_fail() {
    let mut t = people(MemoryTableOptions::default());
    assert!(matches!(t.get_int(1), Err(Error::InvalidArgumentError(_))));
}

#[test]
fn forwarding_over_boxed_adapter() {
    let inner: Box<dyn RowCursor + Send> = Box::new(people(MemoryTableOptions::default()));
    let mut cursor = ForwardingCursor::new(inner);
    assert!(cursor.next().expect("row"));
    assert_eq!(cursor.get_string(2).expect("name").as_deref(), Some("alice"));
    assert_eq!(cursor.metadata().expect("metadata").len(), PEOPLE_COLUMNS.len());
    assert!(matches!(cursor.absolute(3), Err(Error::NotImplemented("absolute"))));
}

#[test]
fn temporal_columns_accept_every_supported_shape() {
    let mut t = people(MemoryTableOptions::default());
    let mut stamps = Vec::new();
    while t.next().expect("next") {
        stamps.push(t.get_timestamp(4).expect("timestamp").map(|ts| ts.to_string()));
    }
    assert_eq!(
        stamps,
        [
            Some("2021-01-04 00:00:00.000".to_string()),
            Some("2022-06-30 08:15:00.000".to_string()),
            None,
            Some("2024-03-05 18:07:08.000".to_string()),
            Some("2023-11-11 00:00:00.000".to_string()),
        ]
    );
}
