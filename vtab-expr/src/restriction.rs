//! The restriction tree handed to adapters at scan initialization.

use std::fmt;

use vtab_types::ScalarValue;

use crate::render::{quote_identifier, render_literal};

/// Comparison operator of a restriction leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Lt,
    LtEq,
    Eq,
    Gt,
    GtEq,
    NotEq,
    /// Unary null test; the leaf's constant is ignored.
    IsNull,
    /// Unary non-null test; the leaf's constant is ignored.
    IsNotNull,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Eq => "=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::NotEq => "!=",
            CompareOp::IsNull => "IS NULL",
            CompareOp::IsNotNull => "IS NOT NULL",
        }
    }

    /// Operator to use when the operands of a binary comparison are swapped.
    ///
    /// `a < b` holds exactly when `b > a` does.
    pub fn flip(self) -> Self {
        match self {
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::LtEq => CompareOp::GtEq,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::GtEq => CompareOp::LtEq,
            other => other,
        }
    }

    #[inline]
    pub fn is_unary(self) -> bool {
        matches!(self, CompareOp::IsNull | CompareOp::IsNotNull)
    }

    /// Parse the textual operator forms accepted by the engine.
    pub fn parse(text: &str) -> Option<Self> {
        let op = match text.trim() {
            "<" => CompareOp::Lt,
            "<=" => CompareOp::LtEq,
            "=" => CompareOp::Eq,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::GtEq,
            "!=" | "<>" => CompareOp::NotEq,
            other if other.eq_ignore_ascii_case("IS NULL") => CompareOp::IsNull,
            other if other.eq_ignore_ascii_case("IS NOT NULL") => CompareOp::IsNotNull,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A leaf comparing one declared column with a constant.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnQualifier {
    pub column_name: String,
    pub op: CompareOp,
    pub constant: ScalarValue,
}

/// Immutable predicate tree over an adapter's declared column names.
///
/// The tree is advisory: an adapter may ignore it entirely and the engine
/// still filters every returned row.
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    And(Box<Restriction>, Box<Restriction>),
    Or(Box<Restriction>, Box<Restriction>),
    Column(ColumnQualifier),
}

impl Restriction {
    #[inline]
    pub fn and(left: Restriction, right: Restriction) -> Self {
        Restriction::And(Box::new(left), Box::new(right))
    }

    #[inline]
    pub fn or(left: Restriction, right: Restriction) -> Self {
        Restriction::Or(Box::new(left), Box::new(right))
    }

    pub fn compare(
        column_name: impl Into<String>,
        op: CompareOp,
        constant: impl Into<ScalarValue>,
    ) -> Self {
        Restriction::Column(ColumnQualifier {
            column_name: column_name.into(),
            op,
            constant: constant.into(),
        })
    }

    pub fn is_null(column_name: impl Into<String>) -> Self {
        Self::compare(column_name, CompareOp::IsNull, ScalarValue::Null)
    }

    pub fn is_not_null(column_name: impl Into<String>) -> Self {
        Self::compare(column_name, CompareOp::IsNotNull, ScalarValue::Null)
    }

    /// Fold a list of restrictions into a left-deep AND chain.
    pub fn conjunction(parts: impl IntoIterator<Item = Restriction>) -> Option<Self> {
        parts.into_iter().reduce(Restriction::and)
    }

    /// Names of every column the tree mentions, in first-seen order.
    pub fn referenced_columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        self.visit_leaves(&mut |leaf| {
            if !out.contains(&leaf.column_name.as_str()) {
                out.push(leaf.column_name.as_str());
            }
        });
        out
    }

    fn visit_leaves<'a>(&'a self, f: &mut impl FnMut(&'a ColumnQualifier)) {
        match self {
            Restriction::And(l, r) | Restriction::Or(l, r) => {
                l.visit_leaves(f);
                r.visit_leaves(f);
            }
            Restriction::Column(leaf) => f(leaf),
        }
    }

    /// Render the tree as a SQL boolean expression with delimited
    /// identifiers.
    ///
    /// Inner nodes wrap each side in parentheses; leaves render as
    /// `"COLUMN" op literal`.
    ///
    /// # Examples
    ///
    /// ```
    /// use vtab_expr::{CompareOp, Restriction};
    ///
    /// let r = Restriction::and(
    ///     Restriction::compare("ID", CompareOp::Gt, 2),
    ///     Restriction::compare("NAME", CompareOp::Eq, "O'Brien"),
    /// );
    /// assert_eq!(r.to_sql(), r#"("ID" > 2) AND ("NAME" = 'O''Brien')"#);
    /// ```
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    fn write_sql(&self, out: &mut String) {
        match self {
            Restriction::And(l, r) => write_binary(out, l, "AND", r),
            Restriction::Or(l, r) => write_binary(out, l, "OR", r),
            Restriction::Column(leaf) => {
                out.push_str(&quote_identifier(&leaf.column_name));
                out.push(' ');
                out.push_str(leaf.op.as_str());
                if !leaf.op.is_unary() {
                    out.push(' ');
                    out.push_str(&render_literal(&leaf.constant));
                }
            }
        }
    }
}

fn write_binary(out: &mut String, left: &Restriction, keyword: &str, right: &Restriction) {
    out.push('(');
    left.write_sql(out);
    out.push_str(") ");
    out.push_str(keyword);
    out.push_str(" (");
    right.write_sql(out);
    out.push(')');
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}
