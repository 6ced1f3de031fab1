//! Rendering restrictions into a source's native query text.

use std::fmt::Write as _;

use vtab_types::{LargeObject, ScalarValue, TemporalKind};

use crate::restriction::Restriction;

/// Turns a restriction into query text understood by one kind of source.
///
/// An empty string means "no native filtering"; the caller then omits the
/// filter clause and relies on the engine's re-application.
pub trait RestrictionRenderer: Send + Sync {
    fn render(&self, restriction: &Restriction) -> String;
}

/// SQL with double-quoted identifiers and single-quoted strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct DelimitedSqlRenderer;

impl RestrictionRenderer for DelimitedSqlRenderer {
    fn render(&self, restriction: &Restriction) -> String {
        restriction.to_sql()
    }
}

/// Renders nothing, for sources that cannot filter natively.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPushdown;

impl RestrictionRenderer for NoPushdown {
    fn render(&self, _restriction: &Restriction) -> String {
        String::new()
    }
}

/// Wrap an identifier in double quotes, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for b in bytes {
        let _ = write!(out, "{b:02X}");
    }
    out.push('\'');
    out
}

pub(crate) fn render_literal(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "NULL".to_string(),
        ScalarValue::Boolean(true) => "TRUE".to_string(),
        ScalarValue::Boolean(false) => "FALSE".to_string(),
        ScalarValue::Int64(v) => v.to_string(),
        ScalarValue::Float64(v) => v.to_string(),
        ScalarValue::Decimal(d) => d.to_string(),
        ScalarValue::Utf8(s) => quote_string(s),
        ScalarValue::Binary(bytes) => hex_literal(bytes),
        ScalarValue::Temporal(t) => {
            let function = match t.kind() {
                TemporalKind::Date => "DATE",
                TemporalKind::Time => "TIME",
                TemporalKind::Timestamp => "TIMESTAMP",
            };
            format!("{function}({})", quote_string(&t.to_string()))
        }
        ScalarValue::LargeObject(LargeObject::Character(text)) => quote_string(text),
        ScalarValue::LargeObject(LargeObject::Binary(bytes)) => hex_literal(bytes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CompareOp;
    use vtab_types::{DecimalValue, TemporalValue};

    #[test]
    fn literal_forms() {
        let ts = TemporalValue::new(TemporalKind::Timestamp, 1_709_618_828_009);
        assert_eq!(
            render_literal(&ScalarValue::Temporal(ts)),
            "TIMESTAMP('2024-03-05 06:07:08.009')"
        );
        assert_eq!(
            render_literal(&ScalarValue::Temporal(ts.with_kind(TemporalKind::Date))),
            "DATE('2024-03-05')"
        );
        assert_eq!(render_literal(&ScalarValue::Binary(vec![0xab, 1])), "X'AB01'");
        let dec: DecimalValue = "-1.50".parse().expect("decimal");
        assert_eq!(render_literal(&ScalarValue::Decimal(dec)), "-1.50");
        assert_eq!(render_literal(&ScalarValue::Boolean(true)), "TRUE");
    }

    #[test]
    fn no_pushdown_renders_empty() {
        let r = Restriction::compare("ID", CompareOp::Eq, 2);
        assert_eq!(NoPushdown.render(&r), "");
        assert_eq!(DelimitedSqlRenderer.render(&r), r#""ID" = 2"#);
    }
}
