use crate::HarnessError;
use pzl_codec::{BinaryTree, CodecError, Graph, LinkedList, NodeId, RandomList, list_seq_from_flat, list_seq_to_flat};
use pzl_shape::{InputShape, OutputShape, ShapeDescriptor};
use serde_json::Value;

/// An argument materialized according to its input shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Value(Value),
    List(LinkedList),
    CyclicList(LinkedList),
    ListSeq(Vec<LinkedList>),
    Tree(BinaryTree),
    /// A node of the tree bound at argument `tree_arg`, found by `value`.
    TreeNode {
        tree_arg: usize,
        node: Option<NodeId>,
        value: Value,
    },
    Graph(Graph),
    RandomList(RandomList),
}

impl Bound {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Value(_) => "value",
            Self::List(_) => "linked_list",
            Self::CyclicList(_) => "cyclic_list",
            Self::ListSeq(_) => "linked_list_seq",
            Self::Tree(_) => "tree",
            Self::TreeNode { .. } => "tree_node",
            Self::Graph(_) => "graph",
            Self::RandomList(_) => "random_pointer_list",
        }
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_value_mut(&mut self) -> Option<&mut Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&LinkedList> {
        match self {
            Self::List(list) | Self::CyclicList(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut LinkedList> {
        match self {
            Self::List(list) | Self::CyclicList(list) => Some(list),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list_seq(&self) -> Option<&[LinkedList]> {
        match self {
            Self::ListSeq(lists) => Some(lists),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_tree(&self) -> Option<&BinaryTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_tree_mut(&mut self) -> Option<&mut BinaryTree> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Self::TreeNode { node, .. } => *node,
            _ => None,
        }
    }

    #[must_use]
    pub fn as_graph(&self) -> Option<&Graph> {
        match self {
            Self::Graph(graph) => Some(graph),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_random_list(&self) -> Option<&RandomList> {
        match self {
            Self::RandomList(list) => Some(list),
            _ => None,
        }
    }

    /// Flat form of the argument's current state.
    pub fn to_flat(&self) -> Result<Value, CodecError> {
        match self {
            Self::Value(value) => Ok(value.clone()),
            Self::List(list) => list.to_flat(),
            Self::CyclicList(list) => {
                let (values, pos) = list.to_cyclic_flat()?;
                Ok(Value::Array(vec![values, pos]))
            }
            Self::ListSeq(lists) => list_seq_to_flat(lists),
            Self::Tree(tree) => tree.to_flat(),
            Self::TreeNode { value, .. } => Ok(value.clone()),
            Self::Graph(graph) => graph.to_flat(),
            Self::RandomList(list) => list.to_flat(),
        }
    }
}

/// What a candidate handed back, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub enum Returned {
    /// No return value (in-place mutation).
    Unit,
    Value(Value),
    List(LinkedList),
    CyclicList(LinkedList),
    Tree(BinaryTree),
    /// A node of the tree bound at argument `tree_arg`.
    Node {
        tree_arg: usize,
        node: Option<NodeId>,
    },
    Graph(Graph),
    RandomList(RandomList),
}

/// A list sequence is flattened on the way out; a malformed one is the
/// candidate's fault.
impl TryFrom<Bound> for Returned {
    type Error = HarnessError;

    fn try_from(bound: Bound) -> Result<Self, Self::Error> {
        Ok(match bound {
            Bound::Value(value) | Bound::TreeNode { value, .. } => Self::Value(value),
            Bound::List(list) => Self::List(list),
            Bound::CyclicList(list) => Self::CyclicList(list),
            Bound::ListSeq(lists) => Self::Value(list_seq_to_flat(&lists).map_err(invocation)?),
            Bound::Tree(tree) => Self::Tree(tree),
            Bound::Graph(graph) => Self::Graph(graph),
            Bound::RandomList(list) => Self::RandomList(list),
        })
    }
}

fn malformed(position: usize, shape: InputShape) -> impl Fn(CodecError) -> HarnessError {
    move |err| {
        HarnessError::MalformedInput(format!(
            "argument {position} ({}): {err}",
            shape.as_str()
        ))
    }
}

/// Binds positional raw arguments through the descriptor's input shapes.
///
/// A cyclic list consumes two raw values (values and join position). A
/// tree node is looked up by value in an earlier bound tree. Raw arguments
/// beyond the declared shapes are passed through as opaque values.
pub fn bind_arguments(descriptor: &ShapeDescriptor, raw: &[Value]) -> Result<Vec<Bound>, HarnessError> {
    let mut bound: Vec<Bound> = Vec::with_capacity(raw.len());
    let mut cursor = 0;
    for (position, shape) in descriptor.inputs.iter().copied().enumerate() {
        let needed = shape.raw_arity();
        let Some(slice) = raw.get(cursor..cursor + needed) else {
            return Err(HarnessError::MalformedInput(format!(
                "argument {position} ({}) needs {needed} raw value(s), only {} supplied",
                shape.as_str(),
                raw.len().saturating_sub(cursor)
            )));
        };
        cursor += needed;
        let on_error = malformed(position, shape);
        let value = &slice[0];
        let arg = match shape {
            InputShape::Scalar | InputShape::Array | InputShape::Matrix => Bound::Value(value.clone()),
            InputShape::LinkedList => Bound::List(LinkedList::from_flat(value).map_err(&on_error)?),
            InputShape::LinkedListSeq => Bound::ListSeq(list_seq_from_flat(value).map_err(&on_error)?),
            InputShape::CyclicList => {
                Bound::CyclicList(LinkedList::from_cyclic_flat(value, &slice[1]).map_err(&on_error)?)
            }
            InputShape::Tree => Bound::Tree(BinaryTree::from_flat(value).map_err(&on_error)?),
            InputShape::Graph => Bound::Graph(Graph::from_flat(value).map_err(&on_error)?),
            InputShape::RandomPointerList => {
                Bound::RandomList(RandomList::from_flat(value).map_err(&on_error)?)
            }
            InputShape::TreeNode { tree_arg } => {
                let tree = bound.get(tree_arg).and_then(Bound::as_tree).ok_or_else(|| {
                    HarnessError::HarnessConfig(format!(
                        "argument {position} refers to argument {tree_arg}, which is not a bound tree"
                    ))
                })?;
                let node = if value.is_null() {
                    None
                } else {
                    Some(tree.find_by_value(value).ok_or_else(|| {
                        HarnessError::MalformedInput(format!(
                            "argument {position}: value {value} not found in tree argument {tree_arg}"
                        ))
                    })?)
                };
                Bound::TreeNode {
                    tree_arg,
                    node,
                    value: value.clone(),
                }
            }
        };
        bound.push(arg);
    }
    bound.extend(raw.iter().skip(cursor).cloned().map(Bound::Value));
    Ok(bound)
}

fn invocation(err: CodecError) -> HarnessError {
    HarnessError::Invocation(format!("returned structure: {err}"))
}

/// Flattens a candidate's result for comparison.
///
/// `InPlace` ignores the return value and reports `first_arg_after`. Codec
/// failures here are the candidate's fault and surface as invocation
/// errors.
pub fn convert_output(
    output: OutputShape,
    returned: Returned,
    args: &[Bound],
    first_arg_after: Option<&Bound>,
) -> Result<Value, HarnessError> {
    if output == OutputShape::InPlace {
        let state = first_arg_after.ok_or_else(|| {
            HarnessError::Invocation("candidate did not report the mutated argument".to_string())
        })?;
        return state.to_flat().map_err(invocation);
    }

    let structural = !matches!(
        output,
        OutputShape::Value | OutputShape::Stateful | OutputShape::TreeNodeValue
    );
    match returned {
        Returned::Unit => Ok(if structural {
            Value::Array(Vec::new())
        } else {
            Value::Null
        }),
        Returned::Value(Value::Null) if structural => Ok(Value::Array(Vec::new())),
        Returned::Value(value) => Ok(value),
        Returned::List(list) => list.to_flat().map_err(invocation),
        Returned::CyclicList(list) => {
            let (values, pos) = list.to_cyclic_flat().map_err(invocation)?;
            Ok(Value::Array(vec![values, pos]))
        }
        Returned::Tree(tree) => tree.to_flat().map_err(invocation),
        Returned::Graph(graph) => graph.to_flat().map_err(invocation),
        Returned::RandomList(list) => list.to_flat().map_err(invocation),
        Returned::Node { node: None, .. } => Ok(Value::Null),
        Returned::Node {
            tree_arg,
            node: Some(id),
        } => args
            .get(tree_arg)
            .and_then(Bound::as_tree)
            .and_then(|tree| tree.node(id))
            .map(|node| node.val.clone())
            .ok_or_else(|| {
                HarnessError::Invocation(format!(
                    "returned node {id} does not belong to tree argument {tree_arg}"
                ))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::{Bound, Returned, bind_arguments, convert_output};
    use crate::HarnessError;
    use pzl_codec::LinkedList;
    use pzl_shape::{InputShape, OutputShape, ShapeDescriptor, lookup};
    use serde_json::{Value, json};

    #[test]
    fn binds_lists_and_passes_surplus_through() {
        let args = bind_arguments(lookup("removeNthFromEnd"), &[json!([1, 2, 3]), json!(2), json!("x")])
            .expect("bind");
        assert_eq!(args.len(), 3);
        assert_eq!(args[0].kind(), "linked_list");
        assert_eq!(args[1].as_i64(), Some(2));
        assert_eq!(args[2], Bound::Value(json!("x")));
    }

    #[test]
    fn cyclic_list_consumes_two_raw_values() {
        let args = bind_arguments(lookup("hasCycle"), &[json!([3, 2, 0, -4]), json!(1)]).expect("bind");
        assert_eq!(args.len(), 1);
        assert!(args[0].as_list().is_some_and(LinkedList::has_cycle));

        let err = bind_arguments(lookup("hasCycle"), &[json!([1, 2, 3]), json!(5)]).expect_err("bad pos");
        assert!(matches!(err, HarnessError::MalformedInput(_)));
        let short = bind_arguments(lookup("hasCycle"), &[json!([1, 2, 3])]).expect_err("missing pos");
        assert!(matches!(short, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn tree_node_binds_against_earlier_tree() {
        let tree = json!([6, 2, 8, 0, 4, 7, 9, null, null, 3, 5]);
        let args = bind_arguments(lookup("lowestCommonAncestor"), &[tree.clone(), json!(2), json!(8)])
            .expect("bind");
        let root_tree = args[0].as_tree().expect("tree");
        let p = args[1].as_node().expect("p");
        assert_eq!(root_tree.nodes[p].val, json!(2));

        let err = bind_arguments(lookup("lowestCommonAncestor"), &[tree, json!(2), json!(42)])
            .expect_err("value not in tree");
        assert!(matches!(err, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn too_few_arguments_is_malformed() {
        let err = bind_arguments(lookup("mergeTwoLists"), &[json!([1])]).expect_err("one list");
        assert!(matches!(err, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn opaque_descriptor_keeps_everything() {
        let args = bind_arguments(&ShapeDescriptor::opaque(), &[json!([1]), json!(2)]).expect("bind");
        assert_eq!(args, vec![Bound::Value(json!([1])), Bound::Value(json!(2))]);
    }

    #[test]
    fn in_place_reports_first_argument_state() {
        let descriptor = ShapeDescriptor::function(&[InputShape::Matrix], OutputShape::InPlace);
        let args = bind_arguments(&descriptor, &[json!([[1, 2], [3, 4]])]).expect("bind");
        let after = Bound::Value(json!([[3, 1], [4, 2]]));
        let got = convert_output(OutputShape::InPlace, Returned::Value(json!(null)), &args, Some(&after))
            .expect("convert");
        assert_eq!(got, json!([[3, 1], [4, 2]]));
        assert!(convert_output(OutputShape::InPlace, Returned::Unit, &args, None).is_err());
    }

    #[test]
    fn structural_outputs_normalize_absent_results() {
        let got = convert_output(OutputShape::LinkedList, Returned::Value(Value::Null), &[], None)
            .expect("convert");
        assert_eq!(got, json!([]));
        let unit = convert_output(OutputShape::Value, Returned::Unit, &[], None).expect("convert");
        assert_eq!(unit, Value::Null);
    }

    #[test]
    fn returned_cycle_is_an_invocation_failure() {
        let mut list = LinkedList::from_values([json!(1), json!(2)]);
        list.nodes[1].next = Some(0);
        let err = convert_output(OutputShape::LinkedList, Returned::List(list), &[], None)
            .expect_err("cycle");
        assert!(matches!(err, HarnessError::Invocation(_)));
    }

    #[test]
    fn cyclic_list_sequence_is_an_invocation_failure() {
        let mut looped = LinkedList::from_values([json!(1), json!(2)]);
        looped.nodes[1].next = Some(0);
        let bound = Bound::ListSeq(vec![LinkedList::from_values([json!(3)]), looped]);
        let err = Returned::try_from(bound).expect_err("cycle");
        assert!(matches!(err, HarnessError::Invocation(_)));

        let fine = Bound::ListSeq(vec![LinkedList::from_values([json!(3)])]);
        assert_eq!(Returned::try_from(fine).expect("flat"), Returned::Value(json!([[3]])));
    }

    #[test]
    fn returned_node_reports_its_value() {
        let args = bind_arguments(
            lookup("lowestCommonAncestor"),
            &[json!([3, 5, 1]), json!(5), json!(1)],
        )
        .expect("bind");
        let root = args[0].as_tree().and_then(|tree| tree.root);
        let got = convert_output(
            OutputShape::TreeNodeValue,
            Returned::Node {
                tree_arg: 0,
                node: root,
            },
            &args,
            None,
        )
        .expect("convert");
        assert_eq!(got, json!(3));
        let absent = convert_output(
            OutputShape::TreeNodeValue,
            Returned::Node {
                tree_arg: 0,
                node: None,
            },
            &args,
            None,
        )
        .expect("convert");
        assert_eq!(absent, Value::Null);
    }
}
