use crate::{CodecError, NodeId, TREE, sequence};
use serde_json::Value;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub val: Value,
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
}

/// Binary tree with level-order (breadth-first, null-for-missing) encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryTree {
    pub nodes: Vec<TreeNode>,
    pub root: Option<NodeId>,
}

impl BinaryTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a level-order sequence. Children are assigned to parents in
    /// breadth-first order; a `null` leaves the slot empty and the null's
    /// own children are never consumed. Entries left over once the queue of
    /// open parents drains are ignored.
    pub fn from_flat(flat: &Value) -> Result<Self, CodecError> {
        let items = sequence(TREE, flat)?;
        let mut tree = Self::new();
        let Some(first) = items.first().filter(|item| !item.is_null()) else {
            return Ok(tree);
        };
        let root = tree.push(first.clone());
        tree.root = Some(root);

        let mut open = VecDeque::from([root]);
        let mut cursor = 1;
        while cursor < items.len() {
            let Some(parent) = open.pop_front() else {
                break;
            };
            if let Some(val) = items.get(cursor).filter(|item| !item.is_null()) {
                let child = tree.push(val.clone());
                tree.nodes[parent].left = Some(child);
                open.push_back(child);
            }
            cursor += 1;
            if let Some(val) = items.get(cursor).filter(|item| !item.is_null()) {
                let child = tree.push(val.clone());
                tree.nodes[parent].right = Some(child);
                open.push_back(child);
            }
            cursor += 1;
        }
        Ok(tree)
    }

    /// Level-order encoding with trailing nulls stripped; interior nulls are
    /// kept so the shape survives a round trip.
    pub fn to_flat(&self) -> Result<Value, CodecError> {
        let mut out = Vec::new();
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::from([self.root]);
        while let Some(slot) = queue.pop_front() {
            let Some(id) = slot else {
                out.push(Value::Null);
                continue;
            };
            let node = self.checked(id)?;
            if seen[id] {
                return Err(CodecError::CycleDetected {
                    shape: TREE,
                    node: id,
                });
            }
            seen[id] = true;
            out.push(node.val.clone());
            queue.push_back(node.left);
            queue.push_back(node.right);
        }
        while out.last().is_some_and(Value::is_null) {
            out.pop();
        }
        Ok(Value::Array(out))
    }

    /// Allocates a detached node.
    pub fn push(&mut self, val: Value) -> NodeId {
        self.nodes.push(TreeNode {
            val,
            left: None,
            right: None,
        });
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// First node carrying `target` in pre-order, left subtree first.
    #[must_use]
    pub fn find_by_value(&self, target: &Value) -> Option<NodeId> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.root.into_iter().collect();
        while let Some(id) = stack.pop() {
            let node = self.nodes.get(id)?;
            if std::mem::replace(&mut seen[id], true) {
                continue;
            }
            if &node.val == target {
                return Some(id);
            }
            stack.extend(node.right);
            stack.extend(node.left);
        }
        None
    }

    /// Level-order encoding of the subtree rooted at `id`.
    pub fn subtree_to_flat(&self, id: NodeId) -> Result<Value, CodecError> {
        self.checked(id)?;
        let view = Self {
            nodes: self.nodes.clone(),
            root: Some(id),
        };
        view.to_flat()
    }

    fn checked(&self, id: NodeId) -> Result<&TreeNode, CodecError> {
        self.nodes
            .get(id)
            .ok_or(CodecError::DanglingLink { shape: TREE, node: id })
    }
}

#[cfg(test)]
mod tests {
    use super::BinaryTree;
    use crate::CodecError;
    use proptest::prelude::*;
    use serde_json::{Value, json};

    #[test]
    fn level_order_skips_children_of_nulls() {
        let tree = BinaryTree::from_flat(&json!([1, null, 2, 3])).expect("decode");
        let root = tree.root.expect("root");
        assert_eq!(tree.nodes[root].left, None);
        let right = tree.nodes[root].right.expect("right child");
        assert_eq!(tree.nodes[right].val, json!(2));
        let grandchild = tree.nodes[right].left.expect("left grandchild");
        assert_eq!(tree.nodes[grandchild].val, json!(3));
        assert_eq!(tree.to_flat().expect("encode"), json!([1, null, 2, 3]));
    }

    #[test]
    fn trailing_nulls_are_stripped_and_surplus_ignored() {
        let tree = BinaryTree::from_flat(&json!([1, 2, null, null, null])).expect("decode");
        assert_eq!(tree.to_flat().expect("encode"), json!([1, 2]));

        let surplus = BinaryTree::from_flat(&json!([1, null, null, 9, 9])).expect("decode");
        assert_eq!(surplus.nodes.len(), 1);
        assert_eq!(surplus.to_flat().expect("encode"), json!([1]));
    }

    #[test]
    fn absent_tree_encodes_as_empty_list() {
        for flat in [json!([]), json!(null), json!([null, 1])] {
            let tree = BinaryTree::from_flat(&flat).expect("decode");
            assert!(tree.is_empty());
            assert_eq!(tree.to_flat().expect("encode"), json!([]));
        }
    }

    #[test]
    fn find_by_value_prefers_left_subtree_in_preorder() {
        let tree = BinaryTree::from_flat(&json!([6, 2, 8, 0, 4, 7, 9, null, null, 3, 5])).expect("decode");
        let four = tree.find_by_value(&json!(4)).expect("present");
        assert_eq!(tree.nodes[four].val, json!(4));
        assert_eq!(tree.subtree_to_flat(four).expect("subtree"), json!([4, 3, 5]));
        assert_eq!(tree.find_by_value(&json!(42)), None);

        let dup = BinaryTree::from_flat(&json!([1, 5, 5])).expect("decode");
        let root = dup.root.expect("root");
        assert_eq!(dup.find_by_value(&json!(5)), dup.nodes[root].left);
    }

    #[test]
    fn shared_node_is_a_cycle_on_encode() {
        let mut tree = BinaryTree::from_flat(&json!([1, 2])).expect("decode");
        let root = tree.root.expect("root");
        tree.nodes[root].right = tree.nodes[root].left;
        assert!(matches!(tree.to_flat(), Err(CodecError::CycleDetected { .. })));
    }

    fn level_order() -> impl Strategy<Value = Value> {
        proptest::collection::vec(proptest::option::weighted(0.8, -100_i64..100), 0..24).prop_map(
            |slots| {
                Value::Array(
                    slots
                        .into_iter()
                        .map(|slot| slot.map_or(Value::Null, Value::from))
                        .collect(),
                )
            },
        )
    }

    /// Level order exactly as the decoder consumes it: every non-null entry
    /// gets two child slots, then `trailing` surplus nulls.
    fn well_formed_level_order(slots: Vec<Option<i64>>, trailing: usize) -> Value {
        let mut out = Vec::new();
        let mut slots = slots.into_iter();
        if let Some(Some(root)) = slots.next() {
            out.push(Value::from(root));
            let mut open = 1_usize;
            'fill: while open > 0 {
                open -= 1;
                for _ in 0..2 {
                    match slots.next() {
                        Some(Some(val)) => {
                            out.push(Value::from(val));
                            open += 1;
                        }
                        Some(None) => out.push(Value::Null),
                        None => break 'fill,
                    }
                }
            }
        }
        out.extend(std::iter::repeat_n(Value::Null, trailing));
        Value::Array(out)
    }

    fn strip_trailing_nulls(flat: &Value) -> Value {
        let mut items = flat.as_array().cloned().unwrap_or_default();
        while items.last().is_some_and(Value::is_null) {
            items.pop();
        }
        Value::Array(items)
    }

    proptest! {
        #[test]
        fn round_trip_strips_only_trailing_nulls(
            slots in proptest::collection::vec(proptest::option::weighted(0.7, -100_i64..100), 0..24),
            trailing in 0_usize..4,
        ) {
            let flat = well_formed_level_order(slots, trailing);
            let encoded = BinaryTree::from_flat(&flat).expect("decode").to_flat().expect("encode");
            prop_assert_eq!(encoded, strip_trailing_nulls(&flat));
        }

        #[test]
        fn canonical_level_order_is_a_fixed_point(flat in level_order()) {
            let canonical = BinaryTree::from_flat(&flat).expect("decode").to_flat().expect("encode");
            let again = BinaryTree::from_flat(&canonical).expect("decode canonical");
            prop_assert_eq!(again.to_flat().expect("encode canonical"), canonical.clone());
            let last_is_null = canonical.as_array().and_then(|items| items.last()).is_some_and(Value::is_null);
            prop_assert!(!last_is_null);
        }
    }
}
