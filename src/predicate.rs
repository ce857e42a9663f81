//! Predicate refutation over block statistics.
//!
//! Pruning asks one question per block: given that every non-null value of a
//! column falls in `[minimum, maximum]`, can the scan's predicates possibly
//! hold for some row? The answer must be one-sided: "unsatisfiable" may only
//! be returned when provably true, while "maybe" is always safe and merely
//! reads more blocks. Evaluation never fails; anything it cannot reason about
//! is treated as satisfiable.

use std::cmp::Ordering;

use crate::schema::{ColumnKind, Value};

/// Comparison operator of a scan predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Not equal.
    NotEq,
    /// Less than.
    Lt,
    /// Less than or equal.
    LtEq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    GtEq,
}

/// One conjunct of a scan's predicate set: `column <op> value`.
///
/// Predicates combine with AND semantics; a row matches when every predicate
/// holds. Null rows match no predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Table column index the predicate constrains.
    pub column: usize,
    /// Comparison operator.
    pub op: CompareOp,
    /// Comparison operand.
    pub value: Value,
}

impl Predicate {
    /// Create a predicate.
    pub fn new(column: usize, op: CompareOp, value: Value) -> Self {
        Self { column, op, value }
    }
}

/// The accumulated range of one column over one block: every non-null row
/// satisfies `minimum ≤ value ≤ maximum`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRange {
    /// Table column index the range describes.
    pub column: usize,
    /// Smallest non-null value in the block.
    pub minimum: Value,
    /// Largest non-null value in the block.
    pub maximum: Value,
}

impl ColumnRange {
    /// Create a range constraint.
    pub fn new(column: usize, minimum: Value, maximum: Value) -> Self {
        Self {
            column,
            minimum,
            maximum,
        }
    }
}

/// Decides whether a predicate set is provably false over a block's range.
///
/// Implementations must be pure and side-effect free, and may always return
/// `false` when unsure. Returning `true` for a block that contains a matching
/// row is a correctness bug, not a performance issue.
pub trait PredicateEvaluator: Send + Sync {
    /// Whether this evaluator can reason about values of `kind`. Columns of
    /// unsupported kinds contribute no pruning.
    fn supports(&self, kind: ColumnKind) -> bool;

    /// Whether `predicates` (AND semantics) can be satisfied by no value in
    /// `range`.
    fn is_unsatisfiable(&self, range: &ColumnRange, predicates: &[Predicate]) -> bool;
}

/// Built-in evaluator comparing predicate operands against block min/max.
///
/// Handles every [`CompareOp`] over the ordered column kinds. Predicates on
/// other columns, operands of a different kind than the range, and unordered
/// kinds all conservatively decline to refute.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinMaxEvaluator;

impl MinMaxEvaluator {
    fn refutes(&self, range: &ColumnRange, predicate: &Predicate) -> bool {
        if predicate.column != range.column {
            return false;
        }
        // Kind mismatches surface here as None and decline to refute.
        let (Some(to_min), Some(to_max)) = (
            predicate.value.compare(&range.minimum),
            predicate.value.compare(&range.maximum),
        ) else {
            return false;
        };

        match predicate.op {
            // No value in [min, max] equals the operand.
            CompareOp::Eq => to_min == Ordering::Less || to_max == Ordering::Greater,
            // Every non-null value equals the operand.
            CompareOp::NotEq => to_min == Ordering::Equal && to_max == Ordering::Equal,
            // col < v needs min < v.
            CompareOp::Lt => matches!(to_min, Ordering::Less | Ordering::Equal),
            // col <= v needs min <= v.
            CompareOp::LtEq => to_min == Ordering::Less,
            // col > v needs max > v.
            CompareOp::Gt => matches!(to_max, Ordering::Greater | Ordering::Equal),
            // col >= v needs max >= v.
            CompareOp::GtEq => to_max == Ordering::Greater,
        }
    }
}

impl PredicateEvaluator for MinMaxEvaluator {
    fn supports(&self, kind: ColumnKind) -> bool {
        kind.is_ordered()
    }

    fn is_unsatisfiable(&self, range: &ColumnRange, predicates: &[Predicate]) -> bool {
        predicates
            .iter()
            .any(|predicate| self.refutes(range, predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_range(min: i64, max: i64) -> ColumnRange {
        ColumnRange::new(0, Value::Int64(min), Value::Int64(max))
    }

    fn int_predicate(op: CompareOp, value: i64) -> Predicate {
        Predicate::new(0, op, Value::Int64(value))
    }

    fn refuted(range: &ColumnRange, predicate: Predicate) -> bool {
        MinMaxEvaluator.is_unsatisfiable(range, &[predicate])
    }

    #[test]
    fn test_eq_refutation() {
        let range = int_range(10, 20);
        assert!(refuted(&range, int_predicate(CompareOp::Eq, 9)));
        assert!(refuted(&range, int_predicate(CompareOp::Eq, 21)));
        assert!(!refuted(&range, int_predicate(CompareOp::Eq, 10)));
        assert!(!refuted(&range, int_predicate(CompareOp::Eq, 15)));
        assert!(!refuted(&range, int_predicate(CompareOp::Eq, 20)));
    }

    #[test]
    fn test_not_eq_refutation() {
        let constant = int_range(5, 5);
        assert!(refuted(&constant, int_predicate(CompareOp::NotEq, 5)));
        assert!(!refuted(&constant, int_predicate(CompareOp::NotEq, 6)));

        let spread = int_range(5, 7);
        assert!(!refuted(&spread, int_predicate(CompareOp::NotEq, 5)));
    }

    #[test]
    fn test_lt_refutation() {
        let range = int_range(10, 20);
        assert!(refuted(&range, int_predicate(CompareOp::Lt, 10)));
        assert!(refuted(&range, int_predicate(CompareOp::Lt, 9)));
        assert!(!refuted(&range, int_predicate(CompareOp::Lt, 11)));
    }

    #[test]
    fn test_lt_eq_refutation() {
        let range = int_range(10, 20);
        assert!(refuted(&range, int_predicate(CompareOp::LtEq, 9)));
        assert!(!refuted(&range, int_predicate(CompareOp::LtEq, 10)));
    }

    #[test]
    fn test_gt_refutation() {
        let range = int_range(10, 20);
        assert!(refuted(&range, int_predicate(CompareOp::Gt, 20)));
        assert!(refuted(&range, int_predicate(CompareOp::Gt, 25)));
        assert!(!refuted(&range, int_predicate(CompareOp::Gt, 19)));
    }

    #[test]
    fn test_gt_eq_refutation() {
        let range = int_range(10, 20);
        assert!(refuted(&range, int_predicate(CompareOp::GtEq, 21)));
        assert!(!refuted(&range, int_predicate(CompareOp::GtEq, 20)));
    }

    #[test]
    fn test_and_semantics_any_refuted_conjunct_suffices() {
        let range = int_range(10, 20);
        let predicates = vec![
            int_predicate(CompareOp::GtEq, 15),
            int_predicate(CompareOp::Eq, 100),
        ];
        assert!(MinMaxEvaluator.is_unsatisfiable(&range, &predicates));
    }

    #[test]
    fn test_empty_predicate_set_is_satisfiable() {
        assert!(!MinMaxEvaluator.is_unsatisfiable(&int_range(0, 1), &[]));
    }

    #[test]
    fn test_other_column_predicates_are_ignored() {
        let range = int_range(10, 20);
        let predicate = Predicate::new(3, CompareOp::Eq, Value::Int64(999));
        assert!(!MinMaxEvaluator.is_unsatisfiable(&range, &[predicate]));
    }

    #[test]
    fn test_kind_mismatch_declines_to_refute() {
        let range = int_range(10, 20);
        let predicate = Predicate::new(0, CompareOp::Eq, Value::Text("9".to_string()));
        assert!(!MinMaxEvaluator.is_unsatisfiable(&range, &[predicate]));
    }

    #[test]
    fn test_text_ranges_prune() {
        let range = ColumnRange::new(
            0,
            Value::Text("apple".to_string()),
            Value::Text("melon".to_string()),
        );
        let refute = Predicate::new(0, CompareOp::Eq, Value::Text("zebra".to_string()));
        let keep = Predicate::new(0, CompareOp::Eq, Value::Text("banana".to_string()));
        assert!(MinMaxEvaluator.is_unsatisfiable(&range, &[refute]));
        assert!(!MinMaxEvaluator.is_unsatisfiable(&range, &[keep]));
    }

    #[test]
    fn test_binary_kind_is_unsupported() {
        assert!(!MinMaxEvaluator.supports(ColumnKind::Binary));
        assert!(MinMaxEvaluator.supports(ColumnKind::Text));
        assert!(MinMaxEvaluator.supports(ColumnKind::Float64));
    }

    #[test]
    fn test_float_ranges_prune() {
        let range = ColumnRange::new(0, Value::Float64(0.5), Value::Float64(2.5));
        let refute = Predicate::new(0, CompareOp::Gt, Value::Float64(2.5));
        let keep = Predicate::new(0, CompareOp::Gt, Value::Float64(2.4));
        assert!(MinMaxEvaluator.is_unsatisfiable(&range, &[refute]));
        assert!(!MinMaxEvaluator.is_unsatisfiable(&range, &[keep]));
    }
}
