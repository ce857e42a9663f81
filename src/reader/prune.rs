//! Block selection from skip-list statistics.
//!
//! Pruning decides, per block, whether the scan's predicates could possibly
//! hold for any row of that block, using only stored min/max statistics. A
//! block starts selected and is dropped only on proof that no row can match.
//! The result is one-sided: keeping a useless block costs I/O, dropping a
//! useful one would lose rows, so every doubt resolves toward keeping.

use crate::format::StripeSkipList;
use crate::predicate::{ColumnRange, Predicate, PredicateEvaluator};
use crate::schema::TableSchema;

/// Compute the selected-block mask for one stripe.
///
/// `projected` must hold one entry per grid column. Columns outside the
/// projection, columns whose kind the evaluator cannot order, and blocks
/// without min/max statistics (all rows null) never refute anything; with no
/// predicates at all, every block stays selected.
pub fn selected_block_mask(
    skip_list: &StripeSkipList,
    schema: &TableSchema,
    projected: &[bool],
    predicates: &[Predicate],
    evaluator: &dyn PredicateEvaluator,
) -> Vec<bool> {
    let mut mask = vec![true; skip_list.block_count()];
    if predicates.is_empty() {
        return mask;
    }

    for column_index in 0..skip_list.column_count() {
        if !projected[column_index] {
            continue;
        }
        if !evaluator.supports(schema.column_kind(column_index)) {
            continue;
        }

        for (block_index, selected) in mask.iter_mut().enumerate() {
            if !*selected {
                continue;
            }
            let node = skip_list.node(column_index, block_index);
            let Some((minimum, maximum)) = &node.min_max else {
                continue;
            };
            let range = ColumnRange::new(column_index, minimum.clone(), maximum.clone());
            if evaluator.is_unsatisfiable(&range, predicates) {
                *selected = false;
            }
        }
    }

    mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Compression;
    use crate::format::ColumnBlockSkipNode;
    use crate::predicate::{CompareOp, MinMaxEvaluator};
    use crate::schema::{Column, ColumnKind, Value};

    fn node(row_count: u64, min_max: Option<(Value, Value)>) -> ColumnBlockSkipNode {
        ColumnBlockSkipNode {
            row_count,
            min_max,
            exists_block_offset: 0,
            exists_length: 1,
            value_block_offset: 0,
            value_length: 0,
            value_compression: Compression::None,
        }
    }

    fn int_range(min: i32, max: i32) -> Option<(Value, Value)> {
        Some((Value::Int32(min), Value::Int32(max)))
    }

    fn two_column_schema() -> TableSchema {
        TableSchema::new(vec![
            Column::new("measure", ColumnKind::Int32),
            Column::new("payload", ColumnKind::Binary),
        ])
    }

    fn sample_grid() -> StripeSkipList {
        StripeSkipList::new(vec![
            vec![node(3, int_range(1, 5)), node(3, int_range(10, 20)), node(2, None)],
            vec![node(3, None), node(3, None), node(2, None)],
        ])
    }

    #[test]
    fn test_no_predicates_selects_everything() {
        let mask = selected_block_mask(
            &sample_grid(),
            &two_column_schema(),
            &[true, true],
            &[],
            &MinMaxEvaluator,
        );
        assert_eq!(mask, vec![true, true, true]);
    }

    #[test]
    fn test_refuted_block_is_cleared() {
        let predicates = vec![Predicate::new(0, CompareOp::Gt, Value::Int32(6))];
        let mask = selected_block_mask(
            &sample_grid(),
            &two_column_schema(),
            &[true, true],
            &predicates,
            &MinMaxEvaluator,
        );
        // Block 0's range [1, 5] refutes `> 6`; block 2 has no statistics.
        assert_eq!(mask, vec![false, true, true]);
    }

    #[test]
    fn test_unprojected_column_never_refutes() {
        let predicates = vec![Predicate::new(0, CompareOp::Gt, Value::Int32(6))];
        let mask = selected_block_mask(
            &sample_grid(),
            &two_column_schema(),
            &[false, true],
            &predicates,
            &MinMaxEvaluator,
        );
        assert_eq!(mask, vec![true, true, true]);
    }

    #[test]
    fn test_unordered_column_never_refutes() {
        // Statistics on a Binary column must be ignored even if present.
        let grid = StripeSkipList::new(vec![
            vec![node(3, int_range(0, 100))],
            vec![node(
                3,
                Some((
                    Value::Binary(vec![0x00]),
                    Value::Binary(vec![0xFF]),
                )),
            )],
        ]);
        let predicates = vec![Predicate::new(
            1,
            CompareOp::Eq,
            Value::Binary(vec![0x42]),
        )];
        let mask = selected_block_mask(
            &grid,
            &two_column_schema(),
            &[true, true],
            &predicates,
            &MinMaxEvaluator,
        );
        assert_eq!(mask, vec![true]);
    }

    #[test]
    fn test_conjunction_refutes_across_columns() {
        let schema = TableSchema::new(vec![
            Column::new("a", ColumnKind::Int32),
            Column::new("b", ColumnKind::Int32),
        ]);
        let grid = StripeSkipList::new(vec![
            vec![node(3, int_range(1, 5)), node(3, int_range(1, 5))],
            vec![node(3, int_range(1, 5)), node(3, int_range(50, 60))],
        ]);
        // `a > 0 AND b < 10`: block 0 satisfiable, block 1 refuted by b.
        let predicates = vec![
            Predicate::new(0, CompareOp::Gt, Value::Int32(0)),
            Predicate::new(1, CompareOp::Lt, Value::Int32(10)),
        ];
        let mask = selected_block_mask(&grid, &schema, &[true, true], &predicates, &MinMaxEvaluator);
        assert_eq!(mask, vec![true, false]);
    }
}
