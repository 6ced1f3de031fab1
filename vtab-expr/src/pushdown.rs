//! Translating the engine's WHERE-clause conjuncts into a [`Restriction`].
//!
//! The planner hands over the conjuncts it decided are pushable for one
//! table-function reference. Translation is all-or-nothing: a single clause
//! that cannot be expressed over the function's declared columns disables
//! push-down for the whole scan. That is always safe because the engine
//! re-applies the full predicate to every returned row.

use rustc_hash::FxHashMap;
use vtab_types::ScalarValue;

use crate::restriction::{CompareOp, Restriction};

/// One side of a binary comparison in the engine's predicate form.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A column by the name it is exposed under in the query.
    Column(String),
    /// A literal or an already-bound parameter value.
    Constant(ScalarValue),
}

/// Engine-side predicate node, as produced by the planner.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    IsNull {
        column: String,
        negated: bool,
    },
    /// A constant truth value, typically the terminator of a normalized
    /// AND/OR chain.
    Literal(bool),
    /// Anything else (function calls, subqueries, LIKE, ...).
    Other(String),
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Self {
        Predicate::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Predicate, right: Predicate) -> Self {
        Predicate::Or(Box::new(left), Box::new(right))
    }

    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }
}

/// Build the restriction for one scan from its pushable conjuncts.
///
/// `exposed_to_declared` maps each column name visible in the query to the
/// function's declared column name. Returns `None` when there is nothing to
/// push or when any conjunct cannot be translated.
pub fn build_restriction(
    conjuncts: &[Predicate],
    exposed_to_declared: &FxHashMap<String, String>,
) -> Option<Restriction> {
    let mut parts = Vec::with_capacity(conjuncts.len());
    for conjunct in conjuncts {
        match translate(conjunct, exposed_to_declared) {
            Some(part) => parts.push(part),
            None => {
                tracing::debug!(?conjunct, "restriction push-down disabled");
                return None;
            }
        }
    }
    Restriction::conjunction(parts)
}

fn translate(pred: &Predicate, names: &FxHashMap<String, String>) -> Option<Restriction> {
    match pred {
        Predicate::And(left, right) => match right.as_ref() {
            Predicate::Literal(true) => translate(left, names),
            _ => Some(Restriction::and(
                translate(left, names)?,
                translate(right, names)?,
            )),
        },
        Predicate::Or(left, right) => match right.as_ref() {
            Predicate::Literal(false) => translate(left, names),
            _ => Some(Restriction::or(
                translate(left, names)?,
                translate(right, names)?,
            )),
        },
        Predicate::Compare { left, op, right } => {
            if op.is_unary() {
                return None;
            }
            let (column, op, constant) = match (left, right) {
                (Operand::Column(c), Operand::Constant(v)) => (c, *op, v),
                (Operand::Constant(v), Operand::Column(c)) => (c, op.flip(), v),
                _ => return None,
            };
            let declared = names.get(column)?;
            Some(Restriction::compare(declared.clone(), op, constant.clone()))
        }
        Predicate::IsNull { column, negated } => {
            let declared = names.get(column)?.clone();
            Some(if *negated {
                Restriction::is_not_null(declared)
            } else {
                Restriction::is_null(declared)
            })
        }
        Predicate::Literal(_) | Predicate::Other(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> FxHashMap<String, String> {
        [("t_id", "ID"), ("t_name", "NAME")]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    fn col(name: &str) -> Operand {
        Operand::Column(name.to_string())
    }

    fn lit(v: impl Into<ScalarValue>) -> Operand {
        Operand::Constant(v.into())
    }

    #[test]
    fn constant_on_left_is_flipped() {
        let r = build_restriction(
            &[Predicate::compare(lit(5), CompareOp::Lt, col("t_id"))],
            &names(),
        )
        .expect("restriction");
        assert_eq!(r, Restriction::compare("ID", CompareOp::Gt, 5));
    }

    #[test]
    fn conjuncts_join_with_and() {
        let r = build_restriction(
            &[
                Predicate::compare(col("t_id"), CompareOp::GtEq, lit(1)),
                Predicate::IsNull {
                    column: "t_name".into(),
                    negated: true,
                },
            ],
            &names(),
        )
        .expect("restriction");
        assert_eq!(r.to_sql(), r#"("ID" >= 1) AND ("NAME" IS NOT NULL)"#);
    }

    #[test]
    fn vacuous_terminators_are_stripped() {
        let pred = Predicate::and(
            Predicate::or(
                Predicate::compare(col("t_id"), CompareOp::Eq, lit(1)),
                Predicate::Literal(false),
            ),
            Predicate::Literal(true),
        );
        let r = build_restriction(&[pred], &names()).expect("restriction");
        assert_eq!(r, Restriction::compare("ID", CompareOp::Eq, 1));
    }

    #[test]
    fn any_unknown_clause_disables_pushdown() {
        let good = Predicate::compare(col("t_id"), CompareOp::Eq, lit(1));
        for bad in [
            Predicate::Other("f(t_id) = 1".into()),
            Predicate::compare(col("t_id"), CompareOp::Eq, col("t_name")),
            Predicate::compare(col("missing"), CompareOp::Eq, lit(1)),
            Predicate::or(good.clone(), Predicate::Other("x LIKE 'a%'".into())),
        ] {
            assert_eq!(build_restriction(&[good.clone(), bad], &names()), None);
        }
        assert_eq!(build_restriction(&[], &names()), None);
    }
}
