//! JSON protocol between the dispatcher and out-of-process language drivers.
//!
//! The dispatcher writes one [`InvocationRequest`] to the driver's stdin.
//! The driver rebuilds native structures from the flat forms, calls the
//! candidate, and prints one [`InvocationResponse`] line as the last line of
//! stdout. Structures cross the boundary only in flat form, so the driver
//! never sees arena indices and the dispatcher never sees foreign objects.

use crate::HarnessError;
use crate::bind::{Bound, Returned};
use crate::candidate::{Invocation, InvocationResult};
use pzl_codec::{BinaryTree, CodecError, Graph, LinkedList, RandomList, list_seq_from_flat, list_seq_to_flat};
use pzl_shape::{OutputShape, RoundTripKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WireValue {
    Value {
        #[serde(default)]
        value: Value,
    },
    List {
        values: Value,
    },
    ListSeq {
        lists: Value,
    },
    CyclicList {
        values: Value,
        pos: Value,
    },
    RandomList {
        nodes: Value,
    },
    Tree {
        level_order: Value,
    },
    TreeNode {
        tree_arg: usize,
        value: Value,
    },
    Graph {
        adjacency: Value,
    },
    Unit,
}

impl WireValue {
    pub fn encode(bound: &Bound) -> Result<Self, CodecError> {
        Ok(match bound {
            Bound::Value(value) => Self::Value {
                value: value.clone(),
            },
            Bound::List(list) => Self::List {
                values: list.to_flat()?,
            },
            Bound::CyclicList(list) => {
                let (values, pos) = list.to_cyclic_flat()?;
                Self::CyclicList { values, pos }
            }
            Bound::ListSeq(lists) => Self::ListSeq {
                lists: list_seq_to_flat(lists)?,
            },
            Bound::Tree(tree) => Self::Tree {
                level_order: tree.to_flat()?,
            },
            Bound::TreeNode {
                tree_arg, value, ..
            } => Self::TreeNode {
                tree_arg: *tree_arg,
                value: value.clone(),
            },
            Bound::Graph(graph) => Self::Graph {
                adjacency: graph.to_flat()?,
            },
            Bound::RandomList(list) => Self::RandomList {
                nodes: list.to_flat()?,
            },
        })
    }

    /// Rebuilds a returned value through the codecs.
    pub fn into_returned(self) -> Result<Returned, CodecError> {
        Ok(match self {
            Self::Unit => Returned::Unit,
            Self::Value { value } | Self::TreeNode { value, .. } | Self::ListSeq { lists: value } => {
                Returned::Value(value)
            }
            Self::List { values } => Returned::List(LinkedList::from_flat(&values)?),
            Self::CyclicList { values, pos } => {
                Returned::CyclicList(LinkedList::from_cyclic_flat(&values, &pos)?)
            }
            Self::RandomList { nodes } => Returned::RandomList(RandomList::from_flat(&nodes)?),
            Self::Tree { level_order } => Returned::Tree(BinaryTree::from_flat(&level_order)?),
            Self::Graph { adjacency } => Returned::Graph(Graph::from_flat(&adjacency)?),
        })
    }

    /// Rebuilds a post-call argument state.
    pub fn into_bound(self) -> Result<Bound, CodecError> {
        Ok(match self {
            Self::Unit => Bound::Value(Value::Null),
            Self::Value { value } => Bound::Value(value),
            Self::TreeNode { tree_arg, value } => Bound::TreeNode {
                tree_arg,
                node: None,
                value,
            },
            Self::List { values } => Bound::List(LinkedList::from_flat(&values)?),
            Self::ListSeq { lists } => Bound::ListSeq(list_seq_from_flat(&lists)?),
            Self::CyclicList { values, pos } => {
                Bound::CyclicList(LinkedList::from_cyclic_flat(&values, &pos)?)
            }
            Self::RandomList { nodes } => Bound::RandomList(RandomList::from_flat(&nodes)?),
            Self::Tree { level_order } => Bound::Tree(BinaryTree::from_flat(&level_order)?),
            Self::Graph { adjacency } => Bound::Graph(Graph::from_flat(&adjacency)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WireCall {
    Function {
        entry_point: String,
        args: Vec<WireValue>,
        output: OutputShape,
    },
    Stateful {
        class_name: String,
        methods: Vec<String>,
        arguments: Vec<Vec<Value>>,
    },
    RoundTrip {
        kind: RoundTripKind,
        payload: WireValue,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub protocol: u32,
    pub call: WireCall,
}

impl InvocationRequest {
    pub fn from_invocation(invocation: &Invocation) -> Result<Self, HarnessError> {
        let encode = |bound: &Bound| {
            WireValue::encode(bound).map_err(|err| {
                HarnessError::MalformedInput(format!("cannot encode {} argument: {err}", bound.kind()))
            })
        };
        let call = match invocation {
            Invocation::Function {
                entry_point,
                args,
                output,
            } => WireCall::Function {
                entry_point: entry_point.clone(),
                args: args.iter().map(encode).collect::<Result<_, _>>()?,
                output: *output,
            },
            Invocation::Stateful {
                class_name,
                methods,
                arguments,
            } => WireCall::Stateful {
                class_name: class_name.clone(),
                methods: methods.clone(),
                arguments: arguments.clone(),
            },
            Invocation::RoundTrip { kind, payload } => WireCall::RoundTrip {
                kind: *kind,
                payload: encode(payload)?,
            },
        };
        Ok(Self {
            protocol: PROTOCOL_VERSION,
            call,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    pub status: ResponseStatus,
    #[serde(default)]
    pub result: Option<WireValue>,
    #[serde(default)]
    pub first_arg_after: Option<WireValue>,
    #[serde(default)]
    pub message: Option<String>,
}

impl InvocationResponse {
    pub fn into_result(self) -> Result<InvocationResult, HarnessError> {
        if self.status == ResponseStatus::Error {
            return Err(HarnessError::Invocation(
                self.message
                    .unwrap_or_else(|| "driver reported an error without a message".to_string()),
            ));
        }
        let returned = match self.result {
            Some(wire) => wire.into_returned().map_err(returned_codec_error)?,
            None => Returned::Unit,
        };
        let first_arg_after = self
            .first_arg_after
            .map(WireValue::into_bound)
            .transpose()
            .map_err(returned_codec_error)?;
        Ok(InvocationResult {
            returned,
            first_arg_after,
        })
    }
}

fn returned_codec_error(err: CodecError) -> HarnessError {
    HarnessError::Invocation(format!("driver returned malformed structure: {err}"))
}
