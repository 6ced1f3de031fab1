//! Three-valued evaluation of restrictions against a row.

use std::cmp::Ordering;

use tracing::trace;
use vtab_result::{Error, Result};
use vtab_types::{
    ColumnSchema, DecimalValue, LargeObject, ScalarKind, ScalarValue, TemporalKind,
    TemporalValue, coerce,
};

use crate::restriction::{ColumnQualifier, CompareOp, Restriction};

impl Restriction {
    /// Evaluate the tree for one row.
    ///
    /// `column` returns the current value of a declared column. The result is
    /// `Some(true)`/`Some(false)` when the row definitely passes or fails and
    /// `None` when the outcome is unknown because a compared value was null
    /// or could not be compared. Callers keep a row only on `Some(true)`.
    pub fn evaluate<F>(&self, column: &mut F) -> Result<Option<bool>>
    where
        F: FnMut(&str) -> Result<ScalarValue> + ?Sized,
    {
        match self {
            Restriction::And(l, r) => {
                let left = l.evaluate(column)?;
                if left == Some(false) {
                    return Ok(Some(false));
                }
                let right = r.evaluate(column)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                })
            }
            Restriction::Or(l, r) => {
                let left = l.evaluate(column)?;
                if left == Some(true) {
                    return Ok(Some(true));
                }
                let right = r.evaluate(column)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                })
            }
            Restriction::Column(leaf) => {
                let value = column(&leaf.column_name)?;
                Ok(evaluate_leaf(leaf, &value))
            }
        }
    }

    /// Convenience wrapper: `true` only when the row definitely passes.
    pub fn matches<F>(&self, column: &mut F) -> Result<bool>
    where
        F: FnMut(&str) -> Result<ScalarValue> + ?Sized,
    {
        Ok(self.evaluate(column)? == Some(true))
    }

    /// Filter a row of raw column text the way the engine would.
    ///
    /// Each referenced cell is coerced to its declared kind in `schema`
    /// before comparison, so `"9" < '10'` on an integer column is numeric.
    /// A cell that fails to coerce keeps the row; the engine reports the
    /// failure when it fetches the column.
    pub fn matches_text_row<F>(&self, schema: &ColumnSchema, text: &mut F) -> Result<bool>
    where
        F: FnMut(usize) -> Result<Option<String>>,
    {
        let outcome = self.matches(&mut |name: &str| {
            let column = schema.find_column(name)?;
            let raw = text(column)?;
            match schema.kind(column) {
                Some(kind) => coerce(raw.as_deref(), kind)
                    .map_err(|err| Error::coercion(column, kind.name(), err)),
                None => Ok(ScalarValue::from(raw)),
            }
        });
        match outcome {
            Err(err) if err.is_coercion() => {
                trace!(%err, "cell not coercible, leaving row to the engine");
                Ok(true)
            }
            other => other,
        }
    }
}

fn evaluate_leaf(leaf: &ColumnQualifier, value: &ScalarValue) -> Option<bool> {
    match leaf.op {
        CompareOp::IsNull => return Some(value.is_null()),
        CompareOp::IsNotNull => return Some(!value.is_null()),
        _ => {}
    }
    let ordering = compare_scalars(value, &leaf.constant)?;
    Some(match leaf.op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::IsNull | CompareOp::IsNotNull => unreachable!("handled above"),
    })
}

/// Order two scalars, or `None` when either is null or they are not
/// comparable.
///
/// Numeric variants compare across representations. Text compared with a
/// typed value is first coerced to that value's kind, so rows from sources
/// that expose raw strings can be filtered against typed constants.
pub fn compare_scalars(left: &ScalarValue, right: &ScalarValue) -> Option<Ordering> {
    use ScalarValue as S;

    match (left, right) {
        (S::Null, _) | (_, S::Null) => None,
        (S::Boolean(a), S::Boolean(b)) => Some(a.cmp(b)),
        (S::Int64(a), S::Int64(b)) => Some(a.cmp(b)),
        (S::Decimal(a), S::Decimal(b)) => Some(a.cmp(b)),
        (S::Int64(a), S::Decimal(b)) => Some(DecimalValue::from_i64(*a).cmp(b)),
        (S::Decimal(a), S::Int64(b)) => Some(a.cmp(&DecimalValue::from_i64(*b))),
        (S::Float64(_), _) | (_, S::Float64(_)) if is_numeric(left) && is_numeric(right) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        (S::Utf8(a), S::Utf8(b)) => Some(a.cmp(b)),
        (S::Binary(a), S::Binary(b)) => Some(a.cmp(b)),
        (S::Temporal(a), S::Temporal(b)) => compare_temporal(a, b),
        (S::LargeObject(a), S::LargeObject(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (S::Utf8(text), other) => {
            let coerced = coerce(Some(text), kind_of(other)?).ok()?;
            compare_scalars(&coerced, other)
        }
        (other, S::Utf8(text)) => {
            let coerced = coerce(Some(text), kind_of(other)?).ok()?;
            compare_scalars(other, &coerced)
        }
        (S::LargeObject(lob), other) => compare_scalars(&flatten(lob), other),
        (other, S::LargeObject(lob)) => compare_scalars(other, &flatten(lob)),
        _ => None,
    }
}

fn flatten(lob: &LargeObject) -> ScalarValue {
    match lob {
        LargeObject::Character(text) => ScalarValue::Utf8(text.to_string()),
        LargeObject::Binary(bytes) => ScalarValue::Binary(bytes.to_vec()),
    }
}

fn is_numeric(value: &ScalarValue) -> bool {
    matches!(
        value,
        ScalarValue::Int64(_) | ScalarValue::Float64(_) | ScalarValue::Decimal(_)
    )
}

const MILLIS_PER_DAY: i64 = 86_400_000;

// Dates compare by day and times by time of day; timestamps use the instant.
// A date against a timestamp compares the date's midnight with the instant;
// a time of day has no instant and never compares with either.
fn compare_temporal(a: &TemporalValue, b: &TemporalValue) -> Option<Ordering> {
    use TemporalKind as K;

    match (a.kind(), b.kind()) {
        (K::Date, K::Date) => Some(a.epoch_days().cmp(&b.epoch_days())),
        (K::Time, K::Time) => Some(a.millis_of_day().cmp(&b.millis_of_day())),
        (K::Time, _) | (_, K::Time) => None,
        _ => Some(instant(a).cmp(&instant(b))),
    }
}

fn instant(value: &TemporalValue) -> i64 {
    match value.kind() {
        TemporalKind::Date => value.epoch_days() * MILLIS_PER_DAY,
        _ => value.epoch_millis(),
    }
}

fn kind_of(value: &ScalarValue) -> Option<ScalarKind> {
    let kind = match value {
        ScalarValue::Boolean(_) => ScalarKind::Boolean,
        // Integer constants still match fractional text such as "91.50".
        ScalarValue::Int64(_) => ScalarKind::Decimal,
        ScalarValue::Float64(_) => ScalarKind::Double,
        ScalarValue::Decimal(_) => ScalarKind::Decimal,
        ScalarValue::Binary(_) => ScalarKind::Binary,
        ScalarValue::Temporal(t) => match t.kind() {
            TemporalKind::Date => ScalarKind::Date,
            TemporalKind::Time => ScalarKind::Time,
            TemporalKind::Timestamp => ScalarKind::Timestamp,
        },
        ScalarValue::LargeObject(LargeObject::Binary(_)) => ScalarKind::Blob,
        ScalarValue::LargeObject(LargeObject::Character(_)) => ScalarKind::Clob,
        ScalarValue::Null | ScalarValue::Utf8(_) => return None,
    };
    Some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row<'a>(
        values: &'a [(&'a str, ScalarValue)],
    ) -> impl FnMut(&str) -> Result<ScalarValue> + 'a {
        move |name| {
            values
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
        }
    }

    #[test]
    fn null_comparisons_are_unknown() {
        let values = [("A", ScalarValue::Null)];
        let mut get = row(&values);
        let eq = Restriction::compare("A", CompareOp::Eq, 1);
        assert_eq!(eq.evaluate(&mut get).expect("eval"), None);
        let ne = Restriction::compare("A", CompareOp::NotEq, 1);
        assert_eq!(ne.evaluate(&mut get).expect("eval"), None);
        assert_eq!(
            Restriction::is_null("A").evaluate(&mut get).expect("eval"),
            Some(true)
        );
    }

    #[test]
    fn kleene_logic_for_and_or() {
        let values = [("A", ScalarValue::Null), ("B", ScalarValue::Int64(5))];
        let mut get = row(&values);
        let unknown = Restriction::compare("A", CompareOp::Eq, 1);
        let yes = Restriction::compare("B", CompareOp::GtEq, 5);
        let no = Restriction::compare("B", CompareOp::Lt, 5);

        let and_false = Restriction::and(unknown.clone(), no.clone());
        assert_eq!(and_false.evaluate(&mut get).expect("eval"), Some(false));
        let and_unknown = Restriction::and(unknown.clone(), yes.clone());
        assert_eq!(and_unknown.evaluate(&mut get).expect("eval"), None);
        let or_true = Restriction::or(unknown.clone(), yes);
        assert_eq!(or_true.evaluate(&mut get).expect("eval"), Some(true));
        let or_unknown = Restriction::or(unknown, no);
        assert_eq!(or_unknown.evaluate(&mut get).expect("eval"), None);
        assert!(!or_unknown.matches(&mut get).expect("eval"));
    }

    #[test]
    fn text_is_coerced_to_constant_kind() {
        let values = [
            ("N", ScalarValue::Utf8("10".into())),
            ("D", ScalarValue::Utf8("2024-03-05".into())),
        ];
        let mut get = row(&values);
        // Numeric, not lexical: "10" > 9.
        assert!(
            Restriction::compare("N", CompareOp::Gt, 9)
                .matches(&mut get)
                .expect("eval")
        );
        let day = TemporalValue::new(TemporalKind::Date, 1_709_596_800_000 + 3_600_000);
        assert!(
            Restriction::compare("D", CompareOp::Eq, day)
                .matches(&mut get)
                .expect("eval")
        );
    }

    #[test]
    fn mixed_numeric_representations() {
        let dec: DecimalValue = "2.50".parse().expect("decimal");
        assert_eq!(
            compare_scalars(&ScalarValue::Int64(2), &ScalarValue::Decimal(dec)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_scalars(&ScalarValue::Float64(2.5), &ScalarValue::Decimal(dec)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_scalars(&ScalarValue::Boolean(true), &ScalarValue::Int64(1)),
            None
        );
    }

    #[test]
    fn missing_column_propagates() {
        let values: [(&str, ScalarValue); 0] = [];
        let mut get = row(&values);
        let err = Restriction::compare("X", CompareOp::Eq, 1)
            .evaluate(&mut get)
            .expect_err("missing");
        assert!(matches!(err, Error::ColumnNotFound(_)));
    }

    #[test]
    fn dates_and_timestamps_compare_as_instants() {
        // 2024-03-05 and 2020-01-01T00:00:00Z.
        let day = ScalarValue::Temporal(TemporalValue::new(TemporalKind::Date, 1_709_596_800_000));
        let ts = |millis| ScalarValue::Temporal(TemporalValue::new(TemporalKind::Timestamp, millis));
        assert_eq!(
            compare_scalars(&day, &ts(1_577_836_800_000)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_scalars(&ts(1_577_836_800_000), &day),
            Some(Ordering::Less)
        );
        // Midnight of the same day is equal; any later instant is greater.
        assert_eq!(
            compare_scalars(&day, &ts(1_709_596_800_000)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_scalars(&day, &ts(1_709_596_800_001)),
            Some(Ordering::Less)
        );
        let noon = ScalarValue::Temporal(TemporalValue::new(TemporalKind::Time, 43_200_000));
        assert_eq!(compare_scalars(&noon, &day), None);

        let values = [("D", day.clone())];
        let mut get = row(&values);
        let after_2020 = Restriction::compare(
            "D",
            CompareOp::Gt,
            TemporalValue::new(TemporalKind::Timestamp, 1_577_836_800_000),
        );
        assert!(after_2020.matches(&mut get).expect("eval"));
    }

    #[test]
    fn text_rows_are_typed_by_declared_kind() {
        let schema = ColumnSchema::new(["ID", "NOTE"])
            .expect("schema")
            .with_kinds(vec![ScalarKind::Int, ScalarKind::Utf8])
            .expect("kinds");
        let below_ten = Restriction::compare("ID", CompareOp::Lt, "10");
        let kept: Vec<&str> = ["9", "10", "11"]
            .into_iter()
            .filter(|id| {
                below_ten
                    .matches_text_row(&schema, &mut |_| Ok(Some(id.to_string())))
                    .expect("eval")
            })
            .collect();
        assert_eq!(kept, ["9"]);

        // Untyped schemas still compare text with text.
        let untyped = ColumnSchema::new(["ID"]).expect("schema");
        assert!(
            !below_ten
                .matches_text_row(&untyped, &mut |_| Ok(Some("9".into())))
                .expect("eval")
        );

        // Malformed cells are left for the engine to report.
        assert!(
            below_ten
                .matches_text_row(&schema, &mut |_| Ok(Some("nine".into())))
                .expect("eval")
        );
    }
}
