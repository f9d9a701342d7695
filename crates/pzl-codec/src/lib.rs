#![forbid(unsafe_code)]

//! Pointer-based puzzle structures stored in arenas, together with the flat
//! JSON encodings used by test fixtures.
//!
//! Nodes are addressed by [`NodeId`] indices into a per-structure arena, so
//! cycles, shared random pointers and graph back-edges need no reference
//! counting. Decoders reject malformed flat input; encoders walk from the
//! root and fail with [`CodecError::CycleDetected`] instead of looping.

pub mod graph;
pub mod list;
pub mod random;
pub mod tree;

pub use graph::{Graph, GraphNode};
pub use list::{LinkedList, ListNode, list_seq_from_flat, list_seq_to_flat};
pub use random::{RandomList, RandomNode};
pub use tree::{BinaryTree, TreeNode};

use serde_json::Value;

pub type NodeId = usize;

pub const LINKED_LIST: &str = "linked_list";
pub const CYCLIC_LIST: &str = "cyclic_list";
pub const TREE: &str = "tree";
pub const GRAPH: &str = "graph";
pub const RANDOM_POINTER_LIST: &str = "random_pointer_list";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{shape}: expected {expected}, found {found}")]
    UnexpectedType {
        shape: &'static str,
        expected: &'static str,
        found: &'static str,
    },
    #[error("{shape}: index {index} out of range for {len} nodes")]
    IndexOutOfRange {
        shape: &'static str,
        index: i64,
        len: usize,
    },
    #[error("{shape}: entry {position} has {arity} elements, expected 2")]
    WrongArity {
        shape: &'static str,
        position: usize,
        arity: usize,
    },
    #[error("{shape}: node {node} reached twice while walking")]
    CycleDetected { shape: &'static str, node: NodeId },
    #[error("{shape}: link to node {node} outside the arena")]
    DanglingLink { shape: &'static str, node: NodeId },
}

impl CodecError {
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::UnexpectedType { .. } => "codec_unexpected_type",
            Self::IndexOutOfRange { .. } => "codec_index_out_of_range",
            Self::WrongArity { .. } => "codec_wrong_arity",
            Self::CycleDetected { .. } => "codec_cycle_detected",
            Self::DanglingLink { .. } => "codec_dangling_link",
        }
    }

    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::UnexpectedType { shape, .. }
            | Self::IndexOutOfRange { shape, .. }
            | Self::WrongArity { shape, .. }
            | Self::CycleDetected { shape, .. }
            | Self::DanglingLink { shape, .. } => *shape,
        }
    }
}

/// JSON kind name used in error messages.
#[must_use]
pub const fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

/// `null` and `[]` both denote an absent structure.
pub(crate) fn sequence<'a>(shape: &'static str, flat: &'a Value) -> Result<&'a [Value], CodecError> {
    match flat {
        Value::Null => Ok(&[]),
        Value::Array(items) => Ok(items.as_slice()),
        other => Err(CodecError::UnexpectedType {
            shape,
            expected: "list or null",
            found: kind_name(other),
        }),
    }
}

pub(crate) fn integer(shape: &'static str, value: &Value) -> Result<i64, CodecError> {
    value.as_i64().ok_or(CodecError::UnexpectedType {
        shape,
        expected: "integer",
        found: kind_name(value),
    })
}

/// Index in `0..len`.
pub(crate) fn checked_index(shape: &'static str, value: &Value, len: usize) -> Result<usize, CodecError> {
    let index = integer(shape, value)?;
    usize::try_from(index)
        .ok()
        .filter(|idx| *idx < len)
        .ok_or(CodecError::IndexOutOfRange { shape, index, len })
}
