#![forbid(unsafe_code)]

//! Static registry describing how each puzzle entry point is called.
//!
//! A [`ShapeDescriptor`] names the call convention, how every positional
//! argument is materialized, how the result is flattened, and which
//! equality policy judges it. Lookups are total: unknown names get the
//! opaque default descriptor.

use pzl_compare::EqualityPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputShape {
    /// Opaque JSON value.
    Scalar,
    /// Opaque JSON list.
    Array,
    /// Opaque JSON list of lists.
    Matrix,
    LinkedList,
    /// A list of linked lists.
    LinkedListSeq,
    Tree,
    /// A value naming a node inside the tree bound at `tree_arg`.
    TreeNode { tree_arg: usize },
    Graph,
    /// Consumes two raw arguments: the values and the join position.
    CyclicList,
    RandomPointerList,
}

impl InputShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scalar => "scalar",
            Self::Array => "array",
            Self::Matrix => "matrix",
            Self::LinkedList => "linked_list",
            Self::LinkedListSeq => "linked_list_seq",
            Self::Tree => "tree",
            Self::TreeNode { .. } => "tree_node",
            Self::Graph => "graph",
            Self::CyclicList => "cyclic_list",
            Self::RandomPointerList => "random_pointer_list",
        }
    }

    /// Whether binding goes through a structural codec rather than passing
    /// the JSON value through.
    #[must_use]
    pub const fn is_structural(self) -> bool {
        !matches!(self, Self::Scalar | Self::Array | Self::Matrix)
    }

    /// Number of raw positional arguments the shape consumes.
    #[must_use]
    pub const fn raw_arity(self) -> usize {
        match self {
            Self::CyclicList => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    #[default]
    Value,
    LinkedList,
    Tree,
    Graph,
    CyclicList,
    RandomPointerList,
    /// The first argument's state after the call, not the return value.
    InPlace,
    /// Per-method results of a replayed call sequence.
    Stateful,
    /// A returned tree node, reported by its value.
    TreeNodeValue,
}

impl OutputShape {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::LinkedList => "linked_list",
            Self::Tree => "tree",
            Self::Graph => "graph",
            Self::CyclicList => "cyclic_list",
            Self::RandomPointerList => "random_pointer_list",
            Self::InPlace => "in_place",
            Self::Stateful => "stateful",
            Self::TreeNodeValue => "tree_node_value",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundTripKind {
    /// `decode(encode(strings))` over a list of strings.
    EncodeDecode,
    /// `deserialize(serialize(tree))` over a binary tree.
    TreeCodec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "convention", rename_all = "snake_case")]
pub enum CallConvention {
    Function,
    Stateful { class_name: String },
    RoundTrip { kind: RoundTripKind },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DescriptorError {
    #[error("entry point `{0}` registered twice")]
    DuplicateEntry(String),
    #[error("entry point name must not be empty")]
    EmptyName,
    #[error("tree_node input at position {position} references argument {tree_arg}, which is not an earlier tree input")]
    TreeNodeTarget { position: usize, tree_arg: usize },
    #[error("in_place output needs at least one input")]
    InPlaceWithoutInput,
    #[error("{convention} convention takes no positional input shapes")]
    UnexpectedInputs { convention: &'static str },
    #[error("{convention} convention cannot produce {output} output")]
    OutputMismatch {
        convention: &'static str,
        output: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShapeDescriptor {
    pub convention: CallConvention,
    #[serde(default)]
    pub inputs: Vec<InputShape>,
    #[serde(default)]
    pub output: OutputShape,
    #[serde(default)]
    pub policy: EqualityPolicy,
}

impl Default for ShapeDescriptor {
    fn default() -> Self {
        Self::opaque()
    }
}

impl ShapeDescriptor {
    /// Free function, opaque arguments, value output, exact comparison.
    #[must_use]
    pub const fn opaque() -> Self {
        Self {
            convention: CallConvention::Function,
            inputs: Vec::new(),
            output: OutputShape::Value,
            policy: EqualityPolicy::Exact,
        }
    }

    #[must_use]
    pub fn function(inputs: &[InputShape], output: OutputShape) -> Self {
        Self {
            convention: CallConvention::Function,
            inputs: inputs.to_vec(),
            output,
            policy: EqualityPolicy::Exact,
        }
    }

    #[must_use]
    pub fn stateful(class_name: &str) -> Self {
        Self {
            convention: CallConvention::Stateful {
                class_name: class_name.to_string(),
            },
            inputs: Vec::new(),
            output: OutputShape::Stateful,
            policy: EqualityPolicy::Exact,
        }
    }

    #[must_use]
    pub fn round_trip(kind: RoundTripKind) -> Self {
        let output = match kind {
            RoundTripKind::EncodeDecode => OutputShape::Value,
            RoundTripKind::TreeCodec => OutputShape::Tree,
        };
        Self {
            convention: CallConvention::RoundTrip { kind },
            inputs: Vec::new(),
            output,
            policy: EqualityPolicy::Exact,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: EqualityPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Shape of the argument at `position`; undeclared positions are opaque.
    #[must_use]
    pub fn input_shape(&self, position: usize) -> InputShape {
        self.inputs
            .get(position)
            .copied()
            .unwrap_or(InputShape::Scalar)
    }

    #[must_use]
    pub fn convention_name(&self) -> &'static str {
        match self.convention {
            CallConvention::Function => "function",
            CallConvention::Stateful { .. } => "stateful",
            CallConvention::RoundTrip { .. } => "round_trip",
        }
    }

    pub fn validate(&self) -> Result<(), DescriptorError> {
        let convention = self.convention_name();
        match &self.convention {
            CallConvention::Function => {
                if self.output == OutputShape::Stateful {
                    return Err(DescriptorError::OutputMismatch {
                        convention,
                        output: self.output.as_str(),
                    });
                }
            }
            CallConvention::Stateful { .. } | CallConvention::RoundTrip { .. } => {
                if !self.inputs.is_empty() {
                    return Err(DescriptorError::UnexpectedInputs { convention });
                }
                let allowed = match &self.convention {
                    CallConvention::Stateful { .. } => self.output == OutputShape::Stateful,
                    _ => matches!(self.output, OutputShape::Value | OutputShape::Tree),
                };
                if !allowed {
                    return Err(DescriptorError::OutputMismatch {
                        convention,
                        output: self.output.as_str(),
                    });
                }
            }
        }

        if self.output == OutputShape::InPlace && self.inputs.is_empty() {
            return Err(DescriptorError::InPlaceWithoutInput);
        }

        for (position, shape) in self.inputs.iter().enumerate() {
            if let InputShape::TreeNode { tree_arg } = *shape {
                let targets_tree =
                    tree_arg < position && self.inputs.get(tree_arg) == Some(&InputShape::Tree);
                if !targets_tree {
                    return Err(DescriptorError::TreeNodeTarget { position, tree_arg });
                }
            }
        }
        Ok(())
    }
}

/// Immutable name → descriptor table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeRegistry {
    entries: BTreeMap<String, ShapeDescriptor>,
    fallback: ShapeDescriptor,
}

impl ShapeRegistry {
    /// The process-wide table of known entry points.
    #[must_use]
    pub fn builtin() -> &'static Self {
        static BUILTIN: OnceLock<ShapeRegistry> = OnceLock::new();
        BUILTIN.get_or_init(|| Self {
            entries: builtin_entries()
                .into_iter()
                .map(|(name, descriptor)| (name.to_string(), descriptor))
                .collect(),
            fallback: ShapeDescriptor::opaque(),
        })
    }

    /// Builds a registry from caller-supplied entries, validating each
    /// descriptor and rejecting duplicate names.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, DescriptorError>
    where
        I: IntoIterator<Item = (S, ShapeDescriptor)>,
        S: Into<String>,
    {
        let mut table = BTreeMap::new();
        for (name, descriptor) in entries {
            let name = name.into();
            if name.is_empty() {
                return Err(DescriptorError::EmptyName);
            }
            descriptor.validate()?;
            if table.contains_key(&name) {
                return Err(DescriptorError::DuplicateEntry(name));
            }
            table.insert(name, descriptor);
        }
        Ok(Self {
            entries: table,
            fallback: ShapeDescriptor::opaque(),
        })
    }

    /// Total lookup: unregistered names get the opaque default.
    #[must_use]
    pub fn lookup(&self, name: &str) -> &ShapeDescriptor {
        self.entries.get(name).unwrap_or(&self.fallback)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ShapeDescriptor> {
        self.entries.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shorthand for [`ShapeRegistry::builtin`] lookups.
#[must_use]
pub fn lookup(name: &str) -> &'static ShapeDescriptor {
    ShapeRegistry::builtin().lookup(name)
}

const STATEFUL_CLASSES: &[(&str, &str)] = &[
    ("LRUCache", "LRUCache"),
    ("MinStack", "MinStack"),
    ("Trie", "Trie"),
    ("trie", "Trie"),
    ("WordDictionary", "WordDictionary"),
    ("wordDictionary", "WordDictionary"),
    ("MedianFinder", "MedianFinder"),
    ("medianFinder", "MedianFinder"),
    ("Twitter", "Twitter"),
    ("KthLargest", "KthLargest"),
    ("TimeMap", "TimeMap"),
    ("DetectSquares", "DetectSquares"),
];

const ORDER_INDEPENDENT: &[&str] = &[
    "subsets",
    "subsetsWithDup",
    "permute",
    "permuteUnique",
    "combinationSum",
    "combinationSum2",
    "threeSum",
    "letterCombinations",
    "generateParenthesis",
    "partition",
    "solveNQueens",
    "groupAnagrams",
    "findWords",
    "pacificAtlantic",
    "topKFrequent",
];

const SINGLE_TREE_TO_VALUE: &[&str] = &[
    "maxDepth",
    "diameterOfBinaryTree",
    "isBalanced",
    "levelOrder",
    "rightSideView",
    "isValidBST",
    "maxPathSum",
    "goodNodes",
];

const IN_PLACE_MATRIX: &[&str] = &["rotate", "setZeroes", "solve", "wallsAndGates"];

fn builtin_entries() -> Vec<(&'static str, ShapeDescriptor)> {
    use InputShape::{
        Array, CyclicList, Graph, LinkedList, LinkedListSeq, Matrix, RandomPointerList, Scalar,
        Tree, TreeNode,
    };

    let mut entries: Vec<(&'static str, ShapeDescriptor)> = Vec::new();

    for &(name, class_name) in STATEFUL_CLASSES {
        entries.push((name, ShapeDescriptor::stateful(class_name)));
    }
    entries.push(("encodeDecode", ShapeDescriptor::round_trip(RoundTripKind::EncodeDecode)));
    entries.push(("codec", ShapeDescriptor::round_trip(RoundTripKind::TreeCodec)));

    let list_out = OutputShape::LinkedList;
    entries.extend([
        ("addTwoNumbers", ShapeDescriptor::function(&[LinkedList, LinkedList], list_out)),
        ("removeNthFromEnd", ShapeDescriptor::function(&[LinkedList, Scalar], list_out)),
        ("mergeTwoLists", ShapeDescriptor::function(&[LinkedList, LinkedList], list_out)),
        ("reverseKGroup", ShapeDescriptor::function(&[LinkedList, Scalar], list_out)),
        ("reverseList", ShapeDescriptor::function(&[LinkedList], list_out)),
        ("reorderList", ShapeDescriptor::function(&[LinkedList], OutputShape::InPlace)),
        ("mergeKLists", ShapeDescriptor::function(&[LinkedListSeq], list_out)),
        ("hasCycle", ShapeDescriptor::function(&[CyclicList], OutputShape::Value)),
    ]);

    for &name in SINGLE_TREE_TO_VALUE {
        entries.push((name, ShapeDescriptor::function(&[Tree], OutputShape::Value)));
    }
    entries.extend([
        ("invertTree", ShapeDescriptor::function(&[Tree], OutputShape::Tree)),
        ("isSubtree", ShapeDescriptor::function(&[Tree, Tree], OutputShape::Value)),
        ("isSameTree", ShapeDescriptor::function(&[Tree, Tree], OutputShape::Value)),
        ("kthSmallest", ShapeDescriptor::function(&[Tree, Scalar], OutputShape::Value)),
        ("buildTree", ShapeDescriptor::function(&[Array, Array], OutputShape::Tree)),
        (
            "lowestCommonAncestor",
            ShapeDescriptor::function(
                &[Tree, TreeNode { tree_arg: 0 }, TreeNode { tree_arg: 0 }],
                OutputShape::TreeNodeValue,
            ),
        ),
        ("cloneGraph", ShapeDescriptor::function(&[Graph], OutputShape::Graph)),
        (
            "copyRandomList",
            ShapeDescriptor::function(&[RandomPointerList], OutputShape::RandomPointerList),
        ),
    ]);

    for &name in ORDER_INDEPENDENT {
        entries.push((
            name,
            ShapeDescriptor::opaque().with_policy(EqualityPolicy::OrderIndependent),
        ));
    }
    for &name in IN_PLACE_MATRIX {
        entries.push((name, ShapeDescriptor::function(&[Matrix], OutputShape::InPlace)));
    }
    entries.push((
        "longestPalindrome",
        ShapeDescriptor::opaque().with_policy(EqualityPolicy::Membership),
    ));
    for name in ["findMedianSortedArrays", "myPow"] {
        entries.push((
            name,
            ShapeDescriptor::opaque().with_policy(EqualityPolicy::FloatTolerant),
        ));
    }
    entries
}
