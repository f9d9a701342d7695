use crate::{CYCLIC_LIST, CodecError, LINKED_LIST, NodeId, integer, kind_name, sequence};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub val: Value,
    pub next: Option<NodeId>,
}

/// Singly linked list. The tail's `next` may point back into the chain, in
/// which case the list is cyclic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkedList {
    pub nodes: Vec<ListNode>,
    pub head: Option<NodeId>,
}

impl LinkedList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a chain in the given order.
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut list = Self::new();
        let mut tail: Option<NodeId> = None;
        for val in values {
            let id = list.push(val);
            match tail {
                Some(prev) => list.nodes[prev].next = Some(id),
                None => list.head = Some(id),
            }
            tail = Some(id);
        }
        list
    }

    pub fn from_flat(flat: &Value) -> Result<Self, CodecError> {
        Ok(Self::from_values(sequence(LINKED_LIST, flat)?.iter().cloned()))
    }

    /// Decodes `values` and joins the tail to the node at `pos`; `-1` means
    /// no cycle.
    pub fn from_cyclic_flat(values: &Value, pos: &Value) -> Result<Self, CodecError> {
        let items = sequence(CYCLIC_LIST, values)?;
        let join = integer(CYCLIC_LIST, pos)?;
        let mut list = Self::from_values(items.iter().cloned());
        if join == -1 {
            return Ok(list);
        }
        let target = usize::try_from(join)
            .ok()
            .filter(|idx| *idx < items.len())
            .ok_or(CodecError::IndexOutOfRange {
                shape: CYCLIC_LIST,
                index: join,
                len: items.len(),
            })?;
        if let Some(last) = list.nodes.len().checked_sub(1) {
            list.nodes[last].next = Some(target);
        }
        Ok(list)
    }

    /// Allocates a detached node.
    pub fn push(&mut self, val: Value) -> NodeId {
        self.nodes.push(ListNode { val, next: None });
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&ListNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Node ids reachable from `head`, in order. Errors on a cycle.
    pub fn walk(&self) -> Result<Vec<NodeId>, CodecError> {
        let (order, join) = self.walk_until_repeat(LINKED_LIST)?;
        match join {
            Some(node) => Err(CodecError::CycleDetected {
                shape: LINKED_LIST,
                node,
            }),
            None => Ok(order),
        }
    }

    pub fn values(&self) -> Result<Vec<Value>, CodecError> {
        Ok(self
            .walk()?
            .into_iter()
            .map(|id| self.nodes[id].val.clone())
            .collect())
    }

    pub fn to_flat(&self) -> Result<Value, CodecError> {
        Ok(Value::Array(self.values()?))
    }

    #[must_use]
    pub fn has_cycle(&self) -> bool {
        matches!(self.walk_until_repeat(LINKED_LIST), Ok((_, Some(_))))
    }

    /// Inverse of [`LinkedList::from_cyclic_flat`]: the distinct values and
    /// the position the tail links back to, or `-1`.
    pub fn to_cyclic_flat(&self) -> Result<(Value, Value), CodecError> {
        let (order, join) = self.walk_until_repeat(CYCLIC_LIST)?;
        let pos = match join {
            Some(node) => order
                .iter()
                .position(|id| *id == node)
                .and_then(|idx| i64::try_from(idx).ok())
                .unwrap_or(-1),
            None => -1,
        };
        let values = order.iter().map(|id| self.nodes[*id].val.clone()).collect();
        Ok((Value::Array(values), Value::from(pos)))
    }

    /// Walks from `head` and stops at the first revisited node, returning the
    /// visited order and the revisited node if any.
    fn walk_until_repeat(&self, shape: &'static str) -> Result<(Vec<NodeId>, Option<NodeId>), CodecError> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self
                .nodes
                .get(id)
                .ok_or(CodecError::DanglingLink { shape, node: id })?;
            if seen[id] {
                return Ok((order, Some(id)));
            }
            seen[id] = true;
            order.push(id);
            cursor = node.next;
        }
        Ok((order, None))
    }
}

/// Decodes a list of flat lists into independent linked lists.
pub fn list_seq_from_flat(flat: &Value) -> Result<Vec<LinkedList>, CodecError> {
    sequence(LINKED_LIST, flat)?
        .iter()
        .map(|item| match item {
            Value::Null | Value::Array(_) => LinkedList::from_flat(item),
            other => Err(CodecError::UnexpectedType {
                shape: LINKED_LIST,
                expected: "list of lists",
                found: kind_name(other),
            }),
        })
        .collect()
}

pub fn list_seq_to_flat(lists: &[LinkedList]) -> Result<Value, CodecError> {
    lists
        .iter()
        .map(LinkedList::to_flat)
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Array)
}
