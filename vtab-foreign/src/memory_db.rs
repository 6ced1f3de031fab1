//! An in-process foreign database for tests and examples.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use rustc_hash::FxHashMap;
use tracing::{debug, trace};
use vtab_expr::{Restriction, build_restriction};
use vtab_result::{Error, Result};
use vtab_scan::{MemoryTableAdapter, MemoryTableOptions, RowCursor};
use vtab_types::{ColumnSchema, ScalarKind};

use crate::connection::{ConnectionFactory, ForeignConnection};
use crate::sql::{SelectTarget, SqlName, parse_create_table, parse_select, translate_selection};

#[derive(Debug)]
struct StoredTable {
    columns: ColumnSchema,
    rows: Arc<[Vec<Option<String>>]>,
}

/// Tables of text rows queried with the `SELECT` shape the foreign adapter
/// generates.
///
/// Every executed query is recorded. WHERE clauses are applied when every
/// part of them is understood and ignored otherwise.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    tables: RwLock<FxHashMap<String, StoredTable>>,
    executed: Mutex<Vec<String>>,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create or replace `name` (optionally `SCHEMA.TABLE`).
    pub fn create_table<S: Into<String>>(
        &self,
        name: &str,
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<()> {
        self.insert_table(name, ColumnSchema::new(columns)?, rows)
    }

    /// Create or replace a table declared with `CREATE TABLE` text.
    ///
    /// WHERE clauses against a typed table compare cells as their declared
    /// types; tables from [`create_table`](Self::create_table) compare text.
    pub fn create_table_sql(&self, ddl: &str, rows: Vec<Vec<Option<String>>>) -> Result<()> {
        let parsed = parse_create_table(ddl)?;
        let name: Vec<&str> = parsed.table.iter().map(|part| part.value.as_str()).collect();
        let kinds: Vec<ScalarKind> = parsed
            .columns
            .iter()
            .map(|(_, sql_type)| sql_type.scalar_kind())
            .collect();
        let columns = ColumnSchema::new(parsed.columns.iter().map(|(column, _)| column.clone()))?
            .with_kinds(kinds)?;
        self.insert_table(&name.join("."), columns, rows)
    }

    fn insert_table(
        &self,
        name: &str,
        columns: ColumnSchema,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<()> {
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(Error::configuration(format!(
                "table {name} declares {} columns but a row has {}",
                columns.len(),
                row.len()
            )));
        }
        let mut tables = self
            .tables
            .write()
            .map_err(|_| Error::Internal("memory database poisoned".into()))?;
        debug!(table = name, rows = rows.len(), "memory database table created");
        tables.insert(
            name.to_string(),
            StoredTable {
                columns,
                rows: rows.into(),
            },
        );
        Ok(())
    }

    /// Every query executed so far, oldest first.
    pub fn executed_queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .expect("memory database query log poisoned")
            .clone()
    }

    pub fn last_query(&self) -> Option<String> {
        self.executed
            .lock()
            .expect("memory database query log poisoned")
            .last()
            .cloned()
    }

    fn run_query(&self, sql: &str) -> Result<Box<dyn RowCursor + Send>> {
        trace!(sql, "memory database query");
        self.executed
            .lock()
            .map_err(|_| Error::Internal("memory database poisoned".into()))?
            .push(sql.to_string());

        let parsed = parse_select(sql)?;
        let tables = self
            .tables
            .read()
            .map_err(|_| Error::Internal("memory database poisoned".into()))?;
        let table = resolve_table(&tables, &parsed.table)?;

        let mut names = Vec::with_capacity(parsed.targets.len());
        let mut sources: Vec<Option<usize>> = Vec::with_capacity(parsed.targets.len());
        for target in &parsed.targets {
            match target {
                SelectTarget::Wildcard => {
                    for (idx, name) in table.columns.names().iter().enumerate() {
                        names.push(name.clone());
                        sources.push(Some(idx));
                    }
                }
                SelectTarget::Column(name) => {
                    let idx = find_declared(&table.columns, name)
                        .ok_or_else(|| Error::ColumnNotFound(name.value.clone()))?;
                    names.push(table.columns.names()[idx].clone());
                    sources.push(Some(idx));
                }
                SelectTarget::Constant(text) => {
                    names.push(text.clone());
                    sources.push(None);
                }
            }
        }

        let filter = parsed
            .selection
            .as_ref()
            .and_then(|expr| where_restriction(&table.columns, expr));

        let mut out = Vec::new();
        for row in table.rows.iter() {
            if let Some(restriction) = &filter {
                let keep = restriction
                    .matches_text_row(&table.columns, &mut |column| Ok(row[column - 1].clone()))?;
                if !keep {
                    continue;
                }
            }
            out.push(
                parsed
                    .targets
                    .iter()
                    .zip(&sources)
                    .flat_map(|(target, source)| match (target, source) {
                        (SelectTarget::Wildcard, _) => row.clone(),
                        (_, Some(idx)) => vec![row[*idx].clone()],
                        (SelectTarget::Constant(text), None) => vec![Some(text.clone())],
                        (SelectTarget::Column(_), None) => vec![None],
                    })
                    .collect(),
            );
        }
        debug!(rows = out.len(), filtered = filter.is_some(), "memory database result");

        let schema = ColumnSchema::new(names)?;
        let result = MemoryTableAdapter::with_options(
            schema,
            out,
            MemoryTableOptions {
                apply_restriction: false,
                costing: None,
            },
        )?;
        Ok(Box::new(result))
    }
}

fn resolve_table<'a>(
    tables: &'a FxHashMap<String, StoredTable>,
    parts: &[SqlName],
) -> Result<&'a StoredTable> {
    let wanted: Vec<&SqlName> = parts.iter().collect();
    tables
        .iter()
        .find(|(key, _)| {
            let key_parts: Vec<&str> = key.split('.').collect();
            key_parts.len() == wanted.len()
                && key_parts.iter().zip(&wanted).all(|(k, w)| w.matches(k))
        })
        .map(|(_, table)| table)
        .ok_or_else(|| {
            let name: Vec<&str> = parts.iter().map(|p| p.value.as_str()).collect();
            Error::InvalidArgumentError(format!("table {} does not exist", name.join(".")))
        })
}

fn find_declared(columns: &ColumnSchema, name: &SqlName) -> Option<usize> {
    columns
        .names()
        .iter()
        .position(|declared| declared == &name.value)
        .or_else(|| columns.names().iter().position(|declared| name.matches(declared)))
}

fn where_restriction(columns: &ColumnSchema, expr: &sqlparser::ast::Expr) -> Option<Restriction> {
    let resolve = |name: &SqlName| find_declared(columns, name).map(|idx| columns.names()[idx].clone());
    let predicate = translate_selection(expr, &resolve);
    let identity: FxHashMap<String, String> = columns
        .names()
        .iter()
        .map(|n| (n.clone(), n.clone()))
        .collect();
    let restriction = build_restriction(&[predicate], &identity);
    if restriction.is_none() {
        debug!(%expr, "WHERE clause not understood, returning unfiltered rows");
    }
    restriction
}

/// A connection to a [`MemoryDatabase`].
#[derive(Debug)]
pub struct MemoryConnection {
    url: String,
    database: Arc<MemoryDatabase>,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub fn new(url: impl Into<String>, database: Arc<MemoryDatabase>) -> Self {
        Self {
            url: url.into(),
            database,
            closed: AtomicBool::new(false),
        }
    }

    pub fn database(&self) -> &Arc<MemoryDatabase> {
        &self.database
    }
}

impl ForeignConnection for MemoryConnection {
    fn url(&self) -> &str {
        &self.url
    }

    fn execute_query(&self, sql: &str) -> Result<Box<dyn RowCursor + Send>> {
        if self.is_closed() {
            return Err(Error::resource(
                self.url.clone(),
                "connection is closed",
            ));
        }
        self.database.run_query(sql)
    }

    fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(url = %self.url, "memory connection closed");
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Opens [`MemoryConnection`]s to one database and counts them.
///
/// URLs listed with [`refuse`](Self::refuse) fail to connect.
#[derive(Debug)]
pub struct MemoryConnectionFactory {
    database: Arc<MemoryDatabase>,
    connects: AtomicUsize,
    refused: RwLock<Vec<String>>,
}

impl MemoryConnectionFactory {
    pub fn new(database: Arc<MemoryDatabase>) -> Self {
        Self {
            database,
            connects: AtomicUsize::new(0),
            refused: RwLock::new(Vec::new()),
        }
    }

    /// Number of successful connects.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Acquire)
    }

    pub fn refuse(&self, url: impl Into<String>) {
        self.refused
            .write()
            .expect("refused url list poisoned")
            .push(url.into());
    }
}

impl ConnectionFactory for MemoryConnectionFactory {
    fn connect(&self, url: &str) -> Result<Arc<dyn ForeignConnection>> {
        let refused = self
            .refused
            .read()
            .map_err(|_| Error::Internal("refused url list poisoned".into()))?
            .iter()
            .any(|u| u == url);
        if refused {
            return Err(Error::resource(url, "connection refused"));
        }
        self.connects.fetch_add(1, Ordering::AcqRel);
        debug!(url, "memory connection opened");
        Ok(Arc::new(MemoryConnection::new(url, Arc::clone(&self.database))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Arc<MemoryDatabase> {
        let db = MemoryDatabase::new();
        db.create_table(
            "APP.PEOPLE",
            ["ID", "NAME"],
            vec![
                vec![Some("1".into()), Some("ann".into())],
                vec![Some("2".into()), None],
                vec![Some("3".into()), Some("cy".into())],
            ],
        )
        .expect("table");
        db
    }

    fn collect(mut cursor: Box<dyn RowCursor + Send>, columns: usize) -> Vec<Vec<Option<String>>> {
        let mut rows = Vec::new();
        while cursor.next().expect("next") {
            rows.push(
                (1..=columns)
                    .map(|c| cursor.get_string(c).expect("value"))
                    .collect(),
            );
        }
        rows
    }

    #[test]
    fn honours_projection_and_where() {
        let conn = MemoryConnection::new("mem://db", db());
        let cursor = conn
            .execute_query(r#"SELECT "NAME" FROM "APP"."PEOPLE" WHERE ("ID" >= 2) AND ("NAME" IS NOT NULL)"#)
            .expect("query");
        assert_eq!(collect(cursor, 1), [vec![Some("cy".to_string())]]);
    }

    #[test]
    fn ununderstood_where_returns_every_row() {
        let conn = MemoryConnection::new("mem://db", db());
        let cursor = conn
            .execute_query(r#"SELECT "ID" FROM "APP"."PEOPLE" WHERE UPPER("NAME") = 'ANN'"#)
            .expect("query");
        assert_eq!(collect(cursor, 1).len(), 3);
    }

    #[test]
    fn constant_select_keeps_row_count() {
        let conn = MemoryConnection::new("mem://db", db());
        let cursor = conn
            .execute_query(r#"SELECT 1 FROM "APP"."PEOPLE""#)
            .expect("query");
        assert_eq!(collect(cursor, 1).len(), 3);
        assert_eq!(conn.database().executed_queries().len(), 1);
    }

    #[test]
    fn closed_connection_refuses_queries() {
        let conn = MemoryConnection::new("mem://db", db());
        conn.close().expect("close");
        conn.close().expect("close twice");
        assert!(matches!(
            conn.execute_query(r#"SELECT 1 FROM "APP"."PEOPLE""#),
            Err(Error::Resource { .. })
        ));
    }

    #[test]
    fn unknown_table_or_column_fails() {
        let conn = MemoryConnection::new("mem://db", db());
        assert!(conn.execute_query(r#"SELECT 1 FROM "NOPE""#).is_err());
        assert!(matches!(
            conn.execute_query(r#"SELECT "AGE" FROM "APP"."PEOPLE""#),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn typed_tables_filter_by_declared_type() {
        let db = MemoryDatabase::new();
        let rows = || {
            ["9", "10", "11"]
                .into_iter()
                .map(|id| vec![Some(id.to_string())])
                .collect()
        };
        db.create_table_sql("CREATE TABLE APP.NUMS (ID INTEGER)", rows())
            .expect("typed");
        db.create_table("APP.TEXTS", ["ID"], rows()).expect("untyped");
        let conn = MemoryConnection::new("mem://db", Arc::clone(&db));

        let typed = conn
            .execute_query(r#"SELECT "ID" FROM "APP"."NUMS" WHERE "ID" < '10'"#)
            .expect("query");
        assert_eq!(collect(typed, 1), [vec![Some("9".to_string())]]);

        let untyped = conn
            .execute_query(r#"SELECT "ID" FROM "APP"."TEXTS" WHERE "ID" < '10'"#)
            .expect("query");
        // Text order: "9" sorts after "10".
        assert!(collect(untyped, 1).is_empty());
    }
}
