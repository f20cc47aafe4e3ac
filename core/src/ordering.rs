//! Position reconciliation.
//!
//! The ordering core shared by items, categories and questions: compare a
//! submitted desired order against stored positions and emit a change for
//! every record that actually moved, leaving everything else untouched.
//! Planning is pure: callers load a scope snapshot, plan against it, then
//! apply the resulting changes and their audit records in one transaction.
//!
//! Write avoidance is deliberate: the number of emitted changes bounds both
//! write amplification and audit-log volume, so an unchanged record must
//! never produce a change.
//!
//! Stored positions are allowed to contain gaps (deletions do not renumber
//! survivors), so planners accept non-contiguous input while guaranteeing a
//! contiguous `0..n-1` result for every scope they fully reassign.

use crate::ids::{CategoryId, ItemId};
use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

// ============================================================================
// Inputs and outputs
// ============================================================================

/// A snapshot row of an ordering scope: just enough to plan with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ranked<I> {
    /// Entity identifier.
    pub id: I,
    /// Currently stored position.
    pub position: i32,
}

/// A snapshot row for item reordering, which also tracks the category scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Item identifier.
    pub id: ItemId,
    /// Currently stored position.
    pub position: i32,
    /// Currently stored category.
    pub category: Option<CategoryId>,
}

/// A planned position reassignment for one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChange<I> {
    /// Entity identifier.
    pub id: I,
    /// Position before the change.
    pub from: i32,
    /// Position after the change.
    pub to: i32,
}

/// A planned item reassignment; position and category persist in one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementChange {
    /// Item identifier.
    pub id: ItemId,
    /// Position after the change.
    pub to_position: i32,
    /// Category after the change.
    pub to_category: Option<CategoryId>,
}

/// Direction of a single-step move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    /// Towards position 0.
    Up,
    /// Towards the end of the scope.
    Down,
}

/// Why a reorder request was rejected. No changes are applied on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReorderError {
    /// An id did not resolve to an entity in scope (also covers duplicate
    /// submissions in relaxed mode, where the resolved set comes up short).
    #[error("Some of the provided object ids are invalid.")]
    UnknownIds,
    /// Strict mode: the submitted ids do not cover the universe exactly once.
    #[error("Not all objects have been selected.")]
    IncompleteSelection,
}

// ============================================================================
// Planning
// ============================================================================

/// Whether a set of positions is exactly `{0..n-1}`.
#[must_use]
pub fn is_contiguous(positions: &[i32]) -> bool {
    let mut sorted: Vec<i32> = positions.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(idx, &pos)| pos == i32::try_from(idx).unwrap_or(i32::MAX))
}

/// Plan a strict reconciliation: `requested` must be a permutation of the
/// whole `universe`.
///
/// Emits one change per entity whose stored position differs from its index
/// in `requested`; the result is guaranteed to be a contiguous `0..n-1`
/// assignment matching the request. Stored input positions may contain gaps
/// (flagged at `warn` level, not an error; deletions leave gaps behind).
///
/// # Errors
///
/// [`ReorderError::IncompleteSelection`] when an id is duplicated or the
/// universe is not fully covered; [`ReorderError::UnknownIds`] when an id
/// resolves to nothing in the universe.
pub fn plan_strict<I>(
    universe: &[Ranked<I>],
    requested: &[I],
) -> Result<Vec<PositionChange<I>>, ReorderError>
where
    I: Copy + Eq + Hash,
{
    let desired: Vec<(I, i32)> = requested
        .iter()
        .enumerate()
        .map(|(idx, id)| (*id, index_position(idx)))
        .collect();
    let changes = plan_positions(universe, &desired)?;

    debug_assert!(is_contiguous(
        &desired.iter().map(|&(_, pos)| pos).collect::<Vec<_>>()
    ));
    Ok(changes)
}

/// Plan a strict reconciliation with explicit target positions.
///
/// Question reordering shares its position namespace with system fields, so
/// the target positions are indices into a larger mixed sequence rather than
/// `0..n-1` of the universe itself. Validation is identical to
/// [`plan_strict`]: every universe id exactly once, nothing else.
///
/// # Errors
///
/// Same as [`plan_strict`].
pub fn plan_positions<I>(
    universe: &[Ranked<I>],
    desired: &[(I, i32)],
) -> Result<Vec<PositionChange<I>>, ReorderError>
where
    I: Copy + Eq + Hash,
{
    let mut targets: HashMap<I, i32> = HashMap::with_capacity(desired.len());
    for &(id, pos) in desired {
        if targets.insert(id, pos).is_some() {
            // A duplicate implies the true universe cannot be covered.
            return Err(ReorderError::IncompleteSelection);
        }
    }

    let known: HashMap<I, i32> = universe.iter().map(|r| (r.id, r.position)).collect();
    if targets.keys().any(|id| !known.contains_key(id)) {
        return Err(ReorderError::UnknownIds);
    }
    if targets.len() != known.len() {
        return Err(ReorderError::IncompleteSelection);
    }

    let stored: Vec<i32> = universe.iter().map(|r| r.position).collect();
    if !is_contiguous(&stored) {
        tracing::warn!(
            scope_size = universe.len(),
            "stored positions are not contiguous before reconciliation"
        );
    }

    Ok(universe
        .iter()
        .filter_map(|row| {
            let to = targets[&row.id];
            (to != row.position).then_some(PositionChange {
                id: row.id,
                from: row.position,
                to,
            })
        })
        .collect())
}

/// Plan a relaxed reconciliation for items: `requested` may be any subset of
/// the event's items, and every mentioned item is additionally re-scoped to
/// `target` (its new category).
///
/// `resolved` must hold exactly the items the caller found for the requested
/// ids; a shortfall (unknown or duplicated ids) rejects the request. Items
/// not mentioned stay untouched, even if their positions then collide with
/// reassigned ones.
///
/// # Errors
///
/// [`ReorderError::UnknownIds`] when the resolved set does not match the
/// request one-for-one.
pub fn plan_relaxed(
    resolved: &[Placement],
    requested: &[ItemId],
    target: Option<CategoryId>,
) -> Result<Vec<PlacementChange>, ReorderError> {
    let mut desired: HashMap<ItemId, i32> = HashMap::with_capacity(requested.len());
    for (idx, id) in requested.iter().enumerate() {
        if desired.insert(*id, index_position(idx)).is_some() {
            return Err(ReorderError::UnknownIds);
        }
    }
    if resolved.len() != desired.len() || resolved.iter().any(|p| !desired.contains_key(&p.id)) {
        return Err(ReorderError::UnknownIds);
    }

    Ok(resolved
        .iter()
        .filter_map(|row| {
            let to = desired[&row.id];
            (to != row.position || target != row.category).then_some(PlacementChange {
                id: row.id,
                to_position: to,
                to_category: target,
            })
        })
        .collect())
}

/// Plan a single-step move of `subject` within its scope.
///
/// `scope` is the full list of rows sharing the subject's scope; order of the
/// slice does not matter, rows are ranked by stored position. At the first or
/// last slot the move is a silent no-op, but the whole scope is renumbered to
/// its list index either way, so gapped scopes are repaired (each repair is a
/// reported change).
///
/// # Errors
///
/// [`ReorderError::UnknownIds`] when the subject is not part of the scope.
pub fn plan_adjacent<I>(
    scope: &[Ranked<I>],
    subject: I,
    direction: MoveDirection,
) -> Result<Vec<PositionChange<I>>, ReorderError>
where
    I: Copy + Eq + Hash,
{
    let mut rows: Vec<Ranked<I>> = scope.to_vec();
    rows.sort_by_key(|r| r.position);

    let Some(index) = rows.iter().position(|r| r.id == subject) else {
        return Err(ReorderError::UnknownIds);
    };

    match direction {
        MoveDirection::Up if index > 0 => rows.swap(index - 1, index),
        MoveDirection::Down if index + 1 < rows.len() => rows.swap(index, index + 1),
        MoveDirection::Up | MoveDirection::Down => {}
    }

    Ok(rows
        .iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let to = index_position(idx);
            (to != row.position).then_some(PositionChange {
                id: row.id,
                from: row.position,
                to,
            })
        })
        .collect())
}

/// The position a new entity receives when appended to a scope.
#[must_use]
pub fn append_position(existing: &[i32]) -> i32 {
    existing.iter().max().map_or(0, |max| max.saturating_add(1))
}

fn index_position(idx: usize) -> i32 {
    i32::try_from(idx).unwrap_or(i32::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranked(rows: &[(i64, i32)]) -> Vec<Ranked<ItemId>> {
        rows.iter()
            .map(|&(id, position)| Ranked {
                id: ItemId::new(id),
                position,
            })
            .collect()
    }

    fn ids(raw: &[i64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId::new).collect()
    }

    #[test]
    fn strict_full_rotation_changes_every_row() {
        // Items A=1, B=2, C=3 at [0,1,2]; submit C,A,B.
        let universe = ranked(&[(1, 0), (2, 1), (3, 2)]);
        let changes = plan_strict(&universe, &ids(&[3, 1, 2])).unwrap();

        assert_eq!(changes.len(), 3);
        let to_of = |id: i64| changes.iter().find(|c| c.id == ItemId::new(id)).unwrap().to;
        assert_eq!(to_of(3), 0);
        assert_eq!(to_of(1), 1);
        assert_eq!(to_of(2), 2);
    }

    #[test]
    fn strict_identity_order_changes_nothing() {
        let universe = ranked(&[(1, 0), (2, 1), (3, 2)]);
        let changes = plan_strict(&universe, &ids(&[1, 2, 3])).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn strict_partial_swap_touches_only_movers() {
        let universe = ranked(&[(1, 0), (2, 1), (3, 2)]);
        let changes = plan_strict(&universe, &ids(&[2, 1, 3])).unwrap();
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.id != ItemId::new(3)));
    }

    #[test]
    fn strict_rejects_unknown_id() {
        let universe = ranked(&[(1, 0), (2, 1)]);
        let err = plan_strict(&universe, &ids(&[1, 99])).unwrap_err();
        assert_eq!(err, ReorderError::UnknownIds);
    }

    #[test]
    fn strict_rejects_missing_coverage() {
        let universe = ranked(&[(1, 0), (2, 1), (3, 2)]);
        let err = plan_strict(&universe, &ids(&[2, 1])).unwrap_err();
        assert_eq!(err, ReorderError::IncompleteSelection);
    }

    #[test]
    fn strict_rejects_duplicates_as_incomplete() {
        // The sole entity submitted twice still fails coverage.
        let universe = ranked(&[(1, 0)]);
        let err = plan_strict(&universe, &ids(&[1, 1])).unwrap_err();
        assert_eq!(err, ReorderError::IncompleteSelection);
    }

    #[test]
    fn strict_repairs_gapped_input() {
        // Positions left gapped by deletions still reconcile to 0..n-1.
        let universe = ranked(&[(1, 0), (2, 4), (3, 9)]);
        let changes = plan_strict(&universe, &ids(&[1, 2, 3])).unwrap();
        assert_eq!(changes.len(), 2);
        let to_of = |id: i64| changes.iter().find(|c| c.id == ItemId::new(id)).unwrap().to;
        assert_eq!(to_of(2), 1);
        assert_eq!(to_of(3), 2);
    }

    #[test]
    fn relaxed_moves_between_categories() {
        let cat_a = Some(CategoryId::new(10));
        let cat_b = Some(CategoryId::new(20));
        let resolved = vec![
            Placement {
                id: ItemId::new(1),
                position: 0,
                category: cat_a,
            },
            Placement {
                id: ItemId::new(2),
                position: 1,
                category: cat_b,
            },
        ];

        let changes = plan_relaxed(&resolved, &ids(&[1, 2]), cat_b).unwrap();

        // Item 1 changes category at an unchanged position; item 2 is
        // untouched on both axes.
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, ItemId::new(1));
        assert_eq!(changes[0].to_position, 0);
        assert_eq!(changes[0].to_category, cat_b);
    }

    #[test]
    fn relaxed_leaves_unmentioned_items_alone() {
        let resolved = vec![Placement {
            id: ItemId::new(1),
            position: 3,
            category: None,
        }];
        let changes = plan_relaxed(&resolved, &ids(&[1]), None).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].to_position, 0);
    }

    #[test]
    fn relaxed_rejects_duplicates_and_shortfalls() {
        let resolved = vec![Placement {
            id: ItemId::new(1),
            position: 0,
            category: None,
        }];
        assert_eq!(
            plan_relaxed(&resolved, &ids(&[1, 1]), None).unwrap_err(),
            ReorderError::UnknownIds
        );
        assert_eq!(
            plan_relaxed(&resolved, &ids(&[1, 2]), None).unwrap_err(),
            ReorderError::UnknownIds
        );
    }

    #[test]
    fn adjacent_up_at_top_is_a_noop() {
        let scope = ranked(&[(1, 0), (2, 1)]);
        let changes = plan_adjacent(&scope, ItemId::new(1), MoveDirection::Up).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn adjacent_down_at_bottom_is_a_noop() {
        let scope = ranked(&[(1, 0), (2, 1)]);
        let changes = plan_adjacent(&scope, ItemId::new(2), MoveDirection::Down).unwrap();
        assert!(changes.is_empty());
    }

    #[test]
    fn adjacent_swap_touches_exactly_two_rows() {
        let scope = ranked(&[(1, 0), (2, 1), (3, 2)]);
        let changes = plan_adjacent(&scope, ItemId::new(3), MoveDirection::Up).unwrap();
        assert_eq!(changes.len(), 2);
        let to_of = |id: i64| changes.iter().find(|c| c.id == ItemId::new(id)).unwrap().to;
        assert_eq!(to_of(3), 1);
        assert_eq!(to_of(2), 2);
    }

    #[test]
    fn adjacent_noop_still_repairs_gaps() {
        // Moving the top row further up cannot swap, but renumbering closes
        // the gap behind it.
        let scope = ranked(&[(1, 0), (2, 2)]);
        let changes = plan_adjacent(&scope, ItemId::new(1), MoveDirection::Up).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, ItemId::new(2));
        assert_eq!(changes[0].to, 1);
    }

    #[test]
    fn adjacent_rejects_subject_outside_scope() {
        let scope = ranked(&[(1, 0)]);
        let err = plan_adjacent(&scope, ItemId::new(9), MoveDirection::Down).unwrap_err();
        assert_eq!(err, ReorderError::UnknownIds);
    }

    #[test]
    fn append_position_extends_the_scope() {
        assert_eq!(append_position(&[]), 0);
        assert_eq!(append_position(&[0, 1, 2]), 3);
        // Gapped scopes append after the highest survivor.
        assert_eq!(append_position(&[0, 4]), 5);
    }

    proptest! {
        /// After a successful strict reconciliation, every entity's new
        /// position equals its index in the request, and the assignment is a
        /// contiguous permutation.
        #[test]
        fn strict_result_matches_request_indices(perm in proptest::sample::subsequence((0..32i64).collect::<Vec<_>>(), 1..20).prop_shuffle()) {
            let universe: Vec<Ranked<ItemId>> = perm
                .iter()
                .enumerate()
                .map(|(pos, &id)| Ranked { id: ItemId::new(id), position: index_position(pos) })
                .collect();
            let mut requested: Vec<ItemId> = perm.iter().copied().map(ItemId::new).collect();
            requested.reverse();

            let changes = plan_strict(&universe, &requested).unwrap();

            let mut final_positions: HashMap<ItemId, i32> =
                universe.iter().map(|r| (r.id, r.position)).collect();
            for change in &changes {
                final_positions.insert(change.id, change.to);
            }
            for (idx, id) in requested.iter().enumerate() {
                prop_assert_eq!(final_positions[id], index_position(idx));
            }
            let positions: Vec<i32> = final_positions.values().copied().collect();
            prop_assert!(is_contiguous(&positions));
        }

        /// Write avoidance: the change count equals the number of entities
        /// whose stored position differs from the requested index, never
        /// more.
        #[test]
        fn strict_change_count_is_minimal(n in 1usize..24, seed in any::<u64>()) {
            let mut order: Vec<i64> = (0..n as i64).collect();
            // Cheap deterministic shuffle driven by the seed.
            for i in (1..order.len()).rev() {
                let j = (seed as usize).wrapping_mul(i).wrapping_add(i) % (i + 1);
                order.swap(i, j);
            }
            let universe: Vec<Ranked<ItemId>> = (0..n as i64)
                .map(|id| Ranked { id: ItemId::new(id), position: index_position(id as usize) })
                .collect();
            let requested: Vec<ItemId> = order.iter().copied().map(ItemId::new).collect();

            let changes = plan_strict(&universe, &requested).unwrap();

            let moved = requested
                .iter()
                .enumerate()
                .filter(|(idx, id)| universe.iter().any(|r| {
                    r.id == **id && r.position != index_position(*idx)
                }))
                .count();
            prop_assert_eq!(changes.len(), moved);
        }
    }
}
