use crate::{CodecError, GRAPH, NodeId, integer, kind_name, sequence};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphNode {
    pub val: i64,
    pub neighbors: Vec<NodeId>,
}

/// Undirected graph given as a 1-indexed adjacency list. Node `i` (0-based
/// arena slot) carries value `i + 1`; the entry node is the node valued 1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub entry: Option<NodeId>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flat(flat: &Value) -> Result<Self, CodecError> {
        let rows = sequence(GRAPH, flat)?;
        let count = rows.len();
        let mut graph = Self::new();
        for (position, row) in rows.iter().enumerate() {
            let Value::Array(ids) = row else {
                return Err(CodecError::UnexpectedType {
                    shape: GRAPH,
                    expected: "list of neighbor ids",
                    found: kind_name(row),
                });
            };
            let mut neighbors = Vec::with_capacity(ids.len());
            for id in ids {
                let raw = integer(GRAPH, id)?;
                let slot = usize::try_from(raw)
                    .ok()
                    .filter(|value| (1..=count).contains(value))
                    .ok_or(CodecError::IndexOutOfRange {
                        shape: GRAPH,
                        index: raw,
                        len: count,
                    })?;
                neighbors.push(slot - 1);
            }
            let val = i64::try_from(position + 1).unwrap_or(i64::MAX);
            graph.nodes.push(GraphNode { val, neighbors });
        }
        if count > 0 {
            graph.entry = Some(0);
        }
        Ok(graph)
    }

    /// Adjacency list ordered by node value, each neighbor list sorted
    /// ascending. An absent entry encodes as `[]`.
    pub fn to_flat(&self) -> Result<Value, CodecError> {
        if self.entry.is_none() {
            return Ok(Value::Array(Vec::new()));
        }
        let mut order: Vec<NodeId> = (0..self.nodes.len()).collect();
        order.sort_by_key(|id| self.nodes[*id].val);
        let mut rows = Vec::with_capacity(order.len());
        for id in order {
            let mut vals = Vec::with_capacity(self.nodes[id].neighbors.len());
            for neighbor in &self.nodes[id].neighbors {
                let node = self.nodes.get(*neighbor).ok_or(CodecError::DanglingLink {
                    shape: GRAPH,
                    node: *neighbor,
                })?;
                vals.push(node.val);
            }
            vals.sort_unstable();
            rows.push(Value::Array(vals.into_iter().map(Value::from).collect()));
        }
        Ok(Value::Array(rows))
    }

    /// Allocates a detached node.
    pub fn push(&mut self, val: i64) -> NodeId {
        self.nodes.push(GraphNode {
            val,
            neighbors: Vec::new(),
        });
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(id)
    }
}
