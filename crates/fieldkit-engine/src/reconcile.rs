#![forbid(unsafe_code)]

//! Overlay reconciliation.
//!
//! The reconciler owns the one-to-one map from field-item id to live overlay
//! node and computes the operations that make the overlay match the
//! authoritative item list. It produces a plan; the host applies it to the
//! viewer DOM. Reconciliation is idempotent: a second pass over an unchanged
//! item set yields zero operations.
//!
//! Ids present in both the live map and the authoritative list are left
//! untouched, so a pass never disrupts the node of an in-flight gesture.

use fieldkit_core::{FieldItem, ItemId, PercentRect};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The live UI element representing one field item while mounted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayNode {
    pub item_id: ItemId,
    pub page: u32,
    /// Current visual rectangle. Mutated directly during an active gesture,
    /// before the commit reaches the backend.
    pub rect: PercentRect,
}

/// One DOM operation in a reconciliation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReconcileOp {
    /// Create (or re-create) the node under its page container.
    Mount { item: FieldItem },
    /// Remove the node for an id no longer in the authoritative list.
    Remove { item_id: ItemId },
}

/// Maintains the id-to-node map and plans idempotent create/remove passes.
#[derive(Debug, Clone, Default)]
pub struct OverlayReconciler {
    nodes: FxHashMap<ItemId, OverlayNode>,
}

impl OverlayReconciler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the live node set match `items`.
    ///
    /// Ops are ordered removals first, then mounts, both sorted by id so the
    /// plan is deterministic for a given input.
    pub fn reconcile(&mut self, items: &FxHashMap<ItemId, FieldItem>) -> Vec<ReconcileOp> {
        let mut removed: Vec<ItemId> = self
            .nodes
            .keys()
            .filter(|id| !items.contains_key(id))
            .copied()
            .collect();
        removed.sort_unstable();

        let mut mounted: Vec<&FieldItem> = items
            .values()
            .filter(|item| !self.nodes.contains_key(&item.id))
            .collect();
        mounted.sort_unstable_by_key(|item| item.id);

        let mut ops = Vec::with_capacity(removed.len() + mounted.len());
        for item_id in removed {
            self.nodes.remove(&item_id);
            ops.push(ReconcileOp::Remove { item_id });
        }
        for item in mounted {
            self.nodes.insert(
                item.id,
                OverlayNode {
                    item_id: item.id,
                    page: item.page,
                    rect: item.rect(),
                },
            );
            ops.push(ReconcileOp::Mount { item: item.clone() });
        }
        if !ops.is_empty() {
            tracing::debug!(ops = ops.len(), live = self.nodes.len(), "reconciled overlay");
        }
        ops
    }

    /// Targeted remount of a single item's node (edit-dialog save path).
    pub fn refresh(&mut self, item: &FieldItem) -> Vec<ReconcileOp> {
        let mut ops = Vec::with_capacity(2);
        if self.nodes.remove(&item.id).is_some() {
            ops.push(ReconcileOp::Remove { item_id: item.id });
        }
        self.nodes.insert(
            item.id,
            OverlayNode {
                item_id: item.id,
                page: item.page,
                rect: item.rect(),
            },
        );
        ops.push(ReconcileOp::Mount { item: item.clone() });
        ops
    }

    /// Drop a node after a confirmed backend delete.
    pub fn remove(&mut self, item_id: ItemId) -> bool {
        self.nodes.remove(&item_id).is_some()
    }

    /// Forget all live nodes.
    ///
    /// Called when the viewer re-rendered and wiped the injected DOM: the
    /// next reconciliation pass then mounts every item again.
    pub fn invalidate(&mut self) {
        self.nodes.clear();
    }

    /// Mutate a node's visual rectangle during an active gesture.
    pub fn set_gesture_rect(&mut self, item_id: ItemId, rect: PercentRect) -> bool {
        match self.nodes.get_mut(&item_id) {
            Some(node) => {
                node.rect = rect;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn node(&self, item_id: ItemId) -> Option<&OverlayNode> {
        self.nodes.get(&item_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Live node ids in sorted order.
    #[must_use]
    pub fn live_ids(&self) -> Vec<ItemId> {
        let mut ids: Vec<ItemId> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldkit_core::{FieldTypeId, RoleId};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn item(id: u64, page: u32) -> FieldItem {
        FieldItem {
            id: ItemId(id),
            page,
            position_x: 10.0,
            position_y: 10.0,
            width: 20.0,
            height: 1.5,
            field_type: FieldTypeId(1),
            role: RoleId(1),
            required: false,
            placeholder: String::new(),
            name: String::new(),
        }
    }

    fn item_map(ids: &[u64]) -> FxHashMap<ItemId, FieldItem> {
        ids.iter().map(|&id| (ItemId(id), item(id, 1))).collect()
    }

    #[test]
    fn initial_population_mounts_everything() {
        let mut reconciler = OverlayReconciler::new();
        let ops = reconciler.reconcile(&item_map(&[3, 1, 2]));
        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], ReconcileOp::Mount { item } if item.id == ItemId(1)));
        assert_eq!(reconciler.live_ids(), vec![ItemId(1), ItemId(2), ItemId(3)]);
    }

    #[test]
    fn second_pass_with_same_items_is_a_noop() {
        let mut reconciler = OverlayReconciler::new();
        let items = item_map(&[1, 2]);
        reconciler.reconcile(&items);
        assert_eq!(reconciler.reconcile(&items), Vec::new());
    }

    #[test]
    fn removed_items_are_unmounted() {
        let mut reconciler = OverlayReconciler::new();
        reconciler.reconcile(&item_map(&[1, 2, 3]));
        let ops = reconciler.reconcile(&item_map(&[2]));
        assert_eq!(
            ops,
            vec![
                ReconcileOp::Remove { item_id: ItemId(1) },
                ReconcileOp::Remove { item_id: ItemId(3) },
            ]
        );
        assert_eq!(reconciler.live_ids(), vec![ItemId(2)]);
    }

    #[test]
    fn refresh_remounts_a_live_node() {
        let mut reconciler = OverlayReconciler::new();
        reconciler.reconcile(&item_map(&[5]));
        let mut updated = item(5, 1);
        updated.position_x = 42.0;
        let ops = reconciler.refresh(&updated);
        assert!(matches!(&ops[0], ReconcileOp::Remove { item_id } if *item_id == ItemId(5)));
        assert!(matches!(&ops[1], ReconcileOp::Mount { item } if item.position_x == 42.0));
        let node = reconciler.node(ItemId(5)).expect("node present");
        assert_eq!(node.rect.x, 42.0);
    }

    #[test]
    fn invalidate_forces_full_remount() {
        let mut reconciler = OverlayReconciler::new();
        let items = item_map(&[1, 2]);
        reconciler.reconcile(&items);
        reconciler.invalidate();
        assert!(reconciler.is_empty());
        assert_eq!(reconciler.reconcile(&items).len(), 2);
    }

    #[test]
    fn gesture_rect_only_touches_live_nodes() {
        let mut reconciler = OverlayReconciler::new();
        reconciler.reconcile(&item_map(&[1]));
        assert!(reconciler.set_gesture_rect(ItemId(1), PercentRect::new(1.0, 2.0, 3.0, 4.0)));
        assert!(!reconciler.set_gesture_rect(ItemId(9), PercentRect::new(0.0, 0.0, 0.0, 0.0)));
    }

    proptest! {
        #[test]
        fn live_ids_always_match_authoritative_set(
            first in proptest::collection::btree_set(0u64..64, 0..12),
            second in proptest::collection::btree_set(0u64..64, 0..12),
        ) {
            let mut reconciler = OverlayReconciler::new();
            let first_ids: Vec<u64> = first.into_iter().collect();
            let second_ids: Vec<u64> = second.into_iter().collect();
            reconciler.reconcile(&item_map(&first_ids));
            prop_assert_eq!(
                reconciler.live_ids(),
                first_ids.iter().map(|&id| ItemId(id)).collect::<Vec<_>>()
            );
            reconciler.reconcile(&item_map(&second_ids));
            prop_assert_eq!(
                reconciler.live_ids(),
                second_ids.iter().map(|&id| ItemId(id)).collect::<Vec<_>>()
            );
            // Idempotence on the final set.
            prop_assert_eq!(reconciler.reconcile(&item_map(&second_ids)), Vec::new());
        }
    }
}
