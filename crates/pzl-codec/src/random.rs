use crate::{CodecError, NodeId, RANDOM_POINTER_LIST, checked_index, kind_name, sequence};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct RandomNode {
    pub val: Value,
    pub next: Option<NodeId>,
    pub random: Option<NodeId>,
}

/// Linked list whose nodes carry an extra pointer to any node of the same
/// list. Flat form: `[[val, random_index | null], ...]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RandomList {
    pub nodes: Vec<RandomNode>,
    pub head: Option<NodeId>,
}

impl RandomList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flat(flat: &Value) -> Result<Self, CodecError> {
        let entries = sequence(RANDOM_POINTER_LIST, flat)?;
        let count = entries.len();
        let mut list = Self::new();
        for (position, entry) in entries.iter().enumerate() {
            let Value::Array(pair) = entry else {
                return Err(CodecError::UnexpectedType {
                    shape: RANDOM_POINTER_LIST,
                    expected: "[val, random_index]",
                    found: kind_name(entry),
                });
            };
            let [val, random] = pair.as_slice() else {
                return Err(CodecError::WrongArity {
                    shape: RANDOM_POINTER_LIST,
                    position,
                    arity: pair.len(),
                });
            };
            let random = match random {
                Value::Null => None,
                index => Some(checked_index(RANDOM_POINTER_LIST, index, count)?),
            };
            list.nodes.push(RandomNode {
                val: val.clone(),
                next: (position + 1 < count).then_some(position + 1),
                random,
            });
        }
        if count > 0 {
            list.head = Some(0);
        }
        Ok(list)
    }

    pub fn to_flat(&self) -> Result<Value, CodecError> {
        let order = self.walk()?;
        let mut position_of = vec![None; self.nodes.len()];
        for (position, id) in order.iter().enumerate() {
            position_of[*id] = Some(position);
        }
        let mut entries = Vec::with_capacity(order.len());
        for id in order {
            let node = &self.nodes[id];
            let random = match node.random {
                None => Value::Null,
                Some(target) => position_of
                    .get(target)
                    .copied()
                    .flatten()
                    .map(Value::from)
                    .ok_or(CodecError::DanglingLink {
                        shape: RANDOM_POINTER_LIST,
                        node: target,
                    })?,
            };
            entries.push(Value::Array(vec![node.val.clone(), random]));
        }
        Ok(Value::Array(entries))
    }

    /// Allocates a detached node.
    pub fn push(&mut self, val: Value) -> NodeId {
        self.nodes.push(RandomNode {
            val,
            next: None,
            random: None,
        });
        self.nodes.len() - 1
    }

    /// Node ids along `next` from `head`.
    pub fn walk(&self) -> Result<Vec<NodeId>, CodecError> {
        let mut seen = vec![false; self.nodes.len()];
        let mut order = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let node = self.nodes.get(id).ok_or(CodecError::DanglingLink {
                shape: RANDOM_POINTER_LIST,
                node: id,
            })?;
            if std::mem::replace(&mut seen[id], true) {
                return Err(CodecError::CycleDetected {
                    shape: RANDOM_POINTER_LIST,
                    node: id,
                });
            }
            order.push(id);
            cursor = node.next;
        }
        Ok(order)
    }
}
