//! The slice of SQL the in-memory foreign database understands.
//!
//! Queries have the shape the foreign adapter generates: a single-table
//! `SELECT` of plain or delimited identifiers (or the constant `1`), with an
//! optional `WHERE` clause. WHERE clauses that do not translate are reported
//! as [`Predicate::Other`] and the caller skips filtering.

use sqlparser::ast::{
    BinaryOperator, Expr as SqlExpr, Ident, ObjectName, ObjectNamePart, SelectItem, SetExpr,
    Statement, TableFactor, UnaryOperator, Value, ValueWithSpan,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use vtab_expr::{CompareOp, Operand, Predicate};
use vtab_result::{Error, Result};
use vtab_types::{DecimalValue, ScalarValue, SqlType};

/// One name as written in the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SqlName {
    pub value: String,
    pub quoted: bool,
}

impl From<&Ident> for SqlName {
    fn from(ident: &Ident) -> Self {
        Self {
            value: ident.value.clone(),
            quoted: ident.quote_style.is_some(),
        }
    }
}

impl SqlName {
    /// Delimited names match exactly; plain names ignore case.
    pub fn matches(&self, declared: &str) -> bool {
        if self.quoted {
            self.value == declared
        } else {
            self.value.eq_ignore_ascii_case(declared)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectTarget {
    Wildcard,
    Column(SqlName),
    Constant(String),
}

#[derive(Debug)]
pub(crate) struct ParsedSelect {
    pub table: Vec<SqlName>,
    pub targets: Vec<SelectTarget>,
    pub selection: Option<SqlExpr>,
}

#[derive(Debug)]
pub(crate) struct ParsedCreateTable {
    pub table: Vec<SqlName>,
    pub columns: Vec<(String, SqlType)>,
}

fn parse_statement(sql: &str) -> Result<Statement> {
    let dialect = GenericDialect {};
    let mut statements = Parser::parse_sql(&dialect, sql)
        .map_err(|err| Error::InvalidArgumentError(format!("cannot parse query: {err}")))?;
    if statements.len() != 1 {
        return Err(Error::InvalidArgumentError(
            "expected exactly one statement".into(),
        ));
    }
    Ok(statements.remove(0))
}

/// Table name and typed columns of a plain `CREATE TABLE`.
pub(crate) fn parse_create_table(sql: &str) -> Result<ParsedCreateTable> {
    let stmt = match parse_statement(sql)? {
        Statement::CreateTable(stmt) => stmt,
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "expected CREATE TABLE, got: {other}"
            )));
        }
    };
    if stmt.query.is_some() || stmt.like.is_some() || stmt.clone.is_some() {
        return Err(Error::InvalidArgumentError(
            "CREATE TABLE AS/LIKE/CLONE is not supported".into(),
        ));
    }
    if stmt.columns.is_empty() {
        return Err(Error::InvalidArgumentError(
            "CREATE TABLE requires at least one column".into(),
        ));
    }

    let columns = stmt
        .columns
        .iter()
        .map(|def| {
            let type_name = def.data_type.to_string();
            let sql_type = SqlType::from_type_name(&type_name).ok_or_else(|| {
                Error::configuration(format!(
                    "column {} has unsupported type {type_name}",
                    def.name.value
                ))
            })?;
            Ok((def.name.value.clone(), sql_type))
        })
        .collect::<Result<_>>()?;
    Ok(ParsedCreateTable {
        table: object_name_parts(&stmt.name)?,
        columns,
    })
}

pub(crate) fn parse_select(sql: &str) -> Result<ParsedSelect> {
    let query = match parse_statement(sql)? {
        Statement::Query(query) => query,
        other => {
            return Err(Error::InvalidArgumentError(format!(
                "only SELECT is supported, got: {other}"
            )));
        }
    };
    let select = match *query.body {
        SetExpr::Select(select) => select,
        _ => {
            return Err(Error::InvalidArgumentError(
                "only simple SELECT statements are supported".into(),
            ));
        }
    };

    if select.from.len() != 1 || !select.from[0].joins.is_empty() {
        return Err(Error::InvalidArgumentError(
            "only single-table SELECT statements are supported".into(),
        ));
    }
    let table = match &select.from[0].relation {
        TableFactor::Table { name, .. } => object_name_parts(name)?,
        _ => {
            return Err(Error::InvalidArgumentError(
                "SELECT requires a plain table name in FROM".into(),
            ));
        }
    };

    let mut targets = Vec::with_capacity(select.projection.len());
    for item in &select.projection {
        let target = match item {
            SelectItem::Wildcard(_) => SelectTarget::Wildcard,
            SelectItem::UnnamedExpr(SqlExpr::Identifier(ident)) => {
                SelectTarget::Column(SqlName::from(ident))
            }
            SelectItem::UnnamedExpr(SqlExpr::Value(ValueWithSpan {
                value: Value::Number(text, _),
                ..
            })) => SelectTarget::Constant(text.clone()),
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "unsupported SELECT item: {other}"
                )));
            }
        };
        targets.push(target);
    }

    Ok(ParsedSelect {
        table,
        targets,
        selection: select.selection.clone(),
    })
}

fn object_name_parts(name: &ObjectName) -> Result<Vec<SqlName>> {
    name.0
        .iter()
        .map(|part| match part {
            ObjectNamePart::Identifier(ident) => Ok(SqlName::from(ident)),
            _ => Err(Error::InvalidArgumentError(
                "object names using functions are not supported".into(),
            )),
        })
        .collect()
}

/// Translate a WHERE clause, resolving column names with `resolve`.
pub(crate) fn translate_selection(
    expr: &SqlExpr,
    resolve: &dyn Fn(&SqlName) -> Option<String>,
) -> Predicate {
    match expr {
        SqlExpr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Predicate::and(
                translate_selection(left, resolve),
                translate_selection(right, resolve),
            ),
            BinaryOperator::Or => Predicate::or(
                translate_selection(left, resolve),
                translate_selection(right, resolve),
            ),
            _ => match (compare_op(op), operand(left, resolve), operand(right, resolve)) {
                (Some(op), Some(left), Some(right)) => Predicate::compare(left, op, right),
                _ => Predicate::Other(expr.to_string()),
            },
        },
        SqlExpr::IsNull(inner) | SqlExpr::IsNotNull(inner) => match inner.as_ref() {
            SqlExpr::Identifier(ident) => match resolve(&SqlName::from(ident)) {
                Some(column) => Predicate::IsNull {
                    column,
                    negated: matches!(expr, SqlExpr::IsNotNull(_)),
                },
                None => Predicate::Other(expr.to_string()),
            },
            _ => Predicate::Other(expr.to_string()),
        },
        SqlExpr::Nested(inner) => translate_selection(inner, resolve),
        SqlExpr::Value(ValueWithSpan {
            value: Value::Boolean(b),
            ..
        }) => Predicate::Literal(*b),
        other => Predicate::Other(other.to_string()),
    }
}

fn compare_op(op: &BinaryOperator) -> Option<CompareOp> {
    Some(match op {
        BinaryOperator::Eq => CompareOp::Eq,
        BinaryOperator::NotEq => CompareOp::NotEq,
        BinaryOperator::Lt => CompareOp::Lt,
        BinaryOperator::LtEq => CompareOp::LtEq,
        BinaryOperator::Gt => CompareOp::Gt,
        BinaryOperator::GtEq => CompareOp::GtEq,
        _ => return None,
    })
}

fn operand(expr: &SqlExpr, resolve: &dyn Fn(&SqlName) -> Option<String>) -> Option<Operand> {
    match expr {
        SqlExpr::Identifier(ident) => resolve(&SqlName::from(ident)).map(Operand::Column),
        SqlExpr::Nested(inner) => operand(inner, resolve),
        SqlExpr::Value(value) => literal(&value.value).map(Operand::Constant),
        SqlExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            SqlExpr::Value(ValueWithSpan {
                value: Value::Number(text, _),
                ..
            }) => number(&format!("-{text}")).map(Operand::Constant),
            _ => None,
        },
        _ => None,
    }
}

fn literal(value: &Value) -> Option<ScalarValue> {
    match value {
        Value::Number(text, _) => number(text),
        Value::SingleQuotedString(text) => Some(ScalarValue::Utf8(text.clone())),
        Value::Boolean(b) => Some(ScalarValue::Boolean(*b)),
        Value::Null => Some(ScalarValue::Null),
        _ => None,
    }
}

fn number(text: &str) -> Option<ScalarValue> {
    if let Ok(v) = text.parse::<i64>() {
        return Some(ScalarValue::Int64(v));
    }
    if let Ok(d) = text.parse::<DecimalValue>() {
        return Some(ScalarValue::Decimal(d));
    }
    text.parse::<f64>().ok().map(ScalarValue::Float64)
}
