//! Engine-side evaluation of the full WHERE predicate.
//!
//! Whatever an adapter did with the pushed restriction, every returned row
//! passes through here before it reaches the result.

use std::cmp::Ordering;

use vtab_expr::{CompareOp, Operand, Predicate, compare_scalars};
use vtab_result::{Error, Result};
use vtab_types::ScalarValue;

/// Three-valued result of `predicate` over one row; `None` is unknown.
pub(crate) fn evaluate<F>(predicate: &Predicate, column: &mut F) -> Result<Option<bool>>
where
    F: FnMut(&str) -> Result<ScalarValue>,
{
    Ok(match predicate {
        Predicate::And(left, right) => match evaluate(left, column)? {
            Some(false) => Some(false),
            l => match (l, evaluate(right, column)?) {
                (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
        },
        Predicate::Or(left, right) => match evaluate(left, column)? {
            Some(true) => Some(true),
            l => match (l, evaluate(right, column)?) {
                (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
        },
        Predicate::Compare { left, op, right } => {
            let left = operand(left, column)?;
            let right = operand(right, column)?;
            compare(&left, *op, &right)
        }
        Predicate::IsNull { column: name, negated } => {
            Some(column(name)?.is_null() != *negated)
        }
        Predicate::Literal(value) => Some(*value),
        Predicate::Other(text) => {
            return Err(Error::InvalidArgumentError(format!(
                "cannot evaluate predicate: {text}"
            )));
        }
    })
}

/// Rows are kept only when every conjunct is true.
pub(crate) fn passes<F>(conjuncts: &[Predicate], column: &mut F) -> Result<bool>
where
    F: FnMut(&str) -> Result<ScalarValue>,
{
    for conjunct in conjuncts {
        if evaluate(conjunct, column)? != Some(true) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn operand<F>(operand: &Operand, column: &mut F) -> Result<ScalarValue>
where
    F: FnMut(&str) -> Result<ScalarValue>,
{
    match operand {
        Operand::Column(name) => column(name),
        Operand::Constant(value) => Ok(value.clone()),
    }
}

fn compare(left: &ScalarValue, op: CompareOp, right: &ScalarValue) -> Option<bool> {
    match op {
        CompareOp::IsNull => return Some(left.is_null()),
        CompareOp::IsNotNull => return Some(!left.is_null()),
        _ => {}
    }
    let ordering = compare_scalars(left, right)?;
    Some(match op {
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::LtEq => ordering != Ordering::Greater,
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::GtEq => ordering != Ordering::Less,
        CompareOp::NotEq => ordering != Ordering::Equal,
        CompareOp::IsNull | CompareOp::IsNotNull => return None,
    })
}
