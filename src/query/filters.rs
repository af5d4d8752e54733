//! Predicate filtering for scans
//!
//! Comparison semantics follow the literal's type, with no coercion:
//! - number literal: only JSON numbers are compared, numerically
//! - string literal: only JSON strings; exact for `=`/`!=`, lexical order
//!   for `<`, `<=`, `>`, `>=`
//! - bool literal: only JSON booleans; ordering operators never match
//!
//! A missing property, or a value of a different type, fails every
//! operator except `!=`, which it satisfies.

use serde_json::Value;

use super::ast::{ComparisonOp, Literal, Predicate};
use super::result::ScanCandidate;

/// Evaluates predicates against scan candidates
pub struct PredicateFilter;

impl PredicateFilter {
    /// Checks if a candidate matches the predicate tree
    pub fn matches(candidate: &ScanCandidate, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::Compare {
                property,
                op,
                literal,
            } => Self::compare(candidate.property(property), *op, literal),
            Predicate::And(children) => children.iter().all(|p| Self::matches(candidate, p)),
            Predicate::Or(children) => children.iter().any(|p| Self::matches(candidate, p)),
        }
    }

    /// Applies one comparison to a (possibly missing) property value
    pub fn compare(actual: Option<&Value>, op: ComparisonOp, literal: &Literal) -> bool {
        let ordering = match (actual, literal) {
            (Some(Value::Number(a)), Literal::Number(b)) => match a.as_f64() {
                Some(a) => a.partial_cmp(b),
                None => return op == ComparisonOp::Ne,
            },
            (Some(Value::String(a)), Literal::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Some(Value::Bool(a)), Literal::Bool(b)) => {
                if op.is_ordering() {
                    return false;
                }
                Some(a.cmp(b))
            }
            // Missing, or a type the literal does not compare against
            _ => return op == ComparisonOp::Ne,
        };

        op.holds(ordering)
    }
}
