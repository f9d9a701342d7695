//! Per-case state machine: bind, invoke, convert, judge.
//!
//! ```text
//! Pending -> ArgsBound -> Invoked -> Converted -> Verdicted
//!                            \-> Errored ----------^
//! ```
//!
//! Malformed fixtures and harness misconfiguration stop a case before it
//! reaches a verdict and are returned to the caller as errors. Candidate
//! failures (exceptions, bad exits, timeouts, broken structures) always end
//! in a failing verdict.

use crate::bind::{Bound, bind_arguments, convert_output};
use crate::candidate::{Candidate, Invocation};
use crate::case::{ProblemSignature, TestCase, Verdict, positional_args};
use crate::{ErrorKind, HarnessError};
use pzl_codec::BinaryTree;
use pzl_compare::EqualityPolicy;
use pzl_shape::{CallConvention, OutputShape, RoundTripKind, ShapeDescriptor, ShapeRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    ArgsBound,
    Invoked,
    Converted,
    Errored,
    Verdicted,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ArgsBound => "args_bound",
            Self::Invoked => "invoked",
            Self::Converted => "converted",
            Self::Errored => "errored",
            Self::Verdicted => "verdicted",
        }
    }
}

/// A bound call plus what is needed to judge its result.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub invocation: Invocation,
    pub output: OutputShape,
    pub policy: EqualityPolicy,
    /// Arguments as bound before the call; returned tree nodes resolve
    /// against these.
    pub reference_args: Vec<Bound>,
}

/// A case that could not be run because of its fixture or the harness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureError {
    pub case_index: usize,
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub verdicts: Vec<Verdict>,
    pub fixture_errors: Vec<FixtureError>,
}

impl CaseReport {
    #[must_use]
    pub fn passed(&self) -> usize {
        self.verdicts.iter().filter(|verdict| verdict.pass).count()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.verdicts.len()
    }

    /// Every case reached a verdict and every verdict passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.fixture_errors.is_empty() && self.verdicts.iter().all(|verdict| verdict.pass)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Dispatcher<'r> {
    registry: &'r ShapeRegistry,
}

impl Dispatcher<'static> {
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(ShapeRegistry::builtin())
    }
}

impl Default for Dispatcher<'static> {
    fn default() -> Self {
        Self::builtin()
    }
}

impl<'r> Dispatcher<'r> {
    #[must_use]
    pub const fn new(registry: &'r ShapeRegistry) -> Self {
        Self { registry }
    }

    #[must_use]
    pub const fn registry(&self) -> &'r ShapeRegistry {
        self.registry
    }

    pub fn descriptor(&self, entry_point: &str) -> Result<&'r ShapeDescriptor, HarnessError> {
        let descriptor = self.registry.lookup(entry_point);
        descriptor
            .validate()
            .map_err(|err| HarnessError::HarnessConfig(format!("`{entry_point}`: {err}")))?;
        Ok(descriptor)
    }

    /// Pending -> ArgsBound. Every error here is a fixture defect.
    pub fn prepare(&self, problem: &ProblemSignature, input: &Value) -> Result<PreparedCall, HarnessError> {
        let descriptor = self.descriptor(&problem.entry_point)?;
        let raw = positional_args(input, &problem.params)?;
        let (invocation, reference_args) = match &descriptor.convention {
            CallConvention::Function => {
                let args = bind_arguments(descriptor, &raw)?;
                let reference_args = args.clone();
                (
                    Invocation::Function {
                        entry_point: problem.entry_point.clone(),
                        args,
                        output: descriptor.output,
                    },
                    reference_args,
                )
            }
            CallConvention::Stateful { class_name } => {
                let (methods, arguments) = stateful_script(&raw)?;
                (
                    Invocation::Stateful {
                        class_name: class_name.clone(),
                        methods,
                        arguments,
                    },
                    Vec::new(),
                )
            }
            CallConvention::RoundTrip { kind } => (
                Invocation::RoundTrip {
                    kind: *kind,
                    payload: round_trip_payload(*kind, raw)?,
                },
                Vec::new(),
            ),
        };
        tracing::debug!(
            target: "pzl.harness",
            entry_point = %problem.entry_point,
            convention = descriptor.convention_name(),
            stage = Stage::ArgsBound.as_str(),
            "case stage"
        );
        Ok(PreparedCall {
            invocation,
            output: descriptor.output,
            policy: descriptor.policy,
            reference_args,
        })
    }

    /// Invoked -> Converted. Errors here are candidate failures unless the
    /// candidate reports a harness misconfiguration.
    pub fn execute(&self, prepared: PreparedCall, candidate: &dyn Candidate) -> Result<Value, HarnessError> {
        let PreparedCall {
            invocation,
            output,
            reference_args,
            ..
        } = prepared;
        let result = candidate.invoke(invocation)?;
        tracing::debug!(
            target: "pzl.harness",
            candidate = candidate.label(),
            stage = Stage::Invoked.as_str(),
            "case stage"
        );
        let got = convert_output(
            output,
            result.returned,
            &reference_args,
            result.first_arg_after.as_ref(),
        )?;
        tracing::debug!(
            target: "pzl.harness",
            candidate = candidate.label(),
            stage = Stage::Converted.as_str(),
            "case stage"
        );
        Ok(got)
    }

    /// Runs one input through a candidate and returns the flat result,
    /// without judging it.
    pub fn observe(
        &self,
        problem: &ProblemSignature,
        candidate: &dyn Candidate,
        input: &Value,
    ) -> Result<Value, HarnessError> {
        let prepared = self.prepare(problem, input)?;
        self.execute(prepared, candidate)
    }

    /// Runs one case to a verdict. Fixture defects are returned as `Err`.
    pub fn run_case(
        &self,
        problem: &ProblemSignature,
        candidate: &dyn Candidate,
        case: &TestCase,
    ) -> Result<Verdict, HarnessError> {
        let prepared = self.prepare(problem, &case.input)?;
        let policy = prepared.policy;
        match self.execute(prepared, candidate) {
            Ok(got) => {
                let pass = policy.evaluate(&case.expected, &got);
                tracing::debug!(
                    target: "pzl.harness",
                    entry_point = %problem.entry_point,
                    policy = policy.as_str(),
                    pass,
                    stage = Stage::Verdicted.as_str(),
                    "case stage"
                );
                Ok(Verdict::judged(case, got, pass))
            }
            Err(err) if err.is_fixture_defect() => Err(err),
            Err(err) => {
                tracing::debug!(
                    target: "pzl.harness",
                    entry_point = %problem.entry_point,
                    error_kind = err.kind().as_str(),
                    error = %err,
                    stage = Stage::Errored.as_str(),
                    "case stage"
                );
                Ok(Verdict::errored(case, &err))
            }
        }
    }

    /// Runs every case; one bad case never stops the others.
    pub fn run_cases(
        &self,
        problem: &ProblemSignature,
        candidate: &dyn Candidate,
        cases: &[TestCase],
    ) -> CaseReport {
        let mut report = CaseReport::default();
        for (case_index, case) in cases.iter().enumerate() {
            match self.run_case(problem, candidate, case) {
                Ok(verdict) => report.verdicts.push(verdict),
                Err(err) => report.fixture_errors.push(FixtureError {
                    case_index,
                    kind: err.kind(),
                    message: err.to_string(),
                }),
            }
        }
        report
    }
}

/// Splits a `[methods, argument_lists]` case into a replay script.
fn stateful_script(raw: &[Value]) -> Result<(Vec<String>, Vec<Vec<Value>>), HarnessError> {
    let [methods, arguments] = raw else {
        return Err(HarnessError::MalformedInput(format!(
            "stateful case needs [methods, arguments], got {} value(s)",
            raw.len()
        )));
    };
    let methods = methods
        .as_array()
        .ok_or_else(|| HarnessError::MalformedInput("stateful methods must be a list".to_string()))?
        .iter()
        .map(|method| {
            method.as_str().map(str::to_string).ok_or_else(|| {
                HarnessError::MalformedInput(format!("method name {method} is not a string"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let arguments = arguments
        .as_array()
        .ok_or_else(|| HarnessError::MalformedInput("stateful arguments must be a list".to_string()))?
        .iter()
        .map(|args| match args {
            Value::Array(items) => Ok(items.clone()),
            Value::Null => Ok(Vec::new()),
            other => Err(HarnessError::MalformedInput(format!(
                "method arguments {other} are not a list"
            ))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if methods.is_empty() {
        return Err(HarnessError::MalformedInput("stateful case has no methods".to_string()));
    }
    if methods.len() != arguments.len() {
        return Err(HarnessError::MalformedInput(format!(
            "{} methods but {} argument lists",
            methods.len(),
            arguments.len()
        )));
    }
    Ok((methods, arguments))
}

fn round_trip_payload(kind: RoundTripKind, mut raw: Vec<Value>) -> Result<Bound, HarnessError> {
    match kind {
        RoundTripKind::EncodeDecode => {
            let mut payload = if raw.len() == 1 {
                raw.remove(0)
            } else {
                Value::Array(raw)
            };
            // [["a", "b"]] and [[["a", "b"]]] both mean the list ["a", "b"].
            while let Value::Array(items) = &mut payload {
                if items.len() == 1 && items[0].is_array() {
                    payload = items.remove(0);
                } else {
                    break;
                }
            }
            Ok(Bound::Value(payload))
        }
        RoundTripKind::TreeCodec => {
            let level_order = if raw.len() == 1 && (raw[0].is_array() || raw[0].is_null()) {
                raw.remove(0)
            } else {
                Value::Array(raw)
            };
            BinaryTree::from_flat(&level_order)
                .map(Bound::Tree)
                .map_err(|err| HarnessError::MalformedInput(format!("tree payload: {err}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, Stage};
    use crate::bind::{Bound, Returned};
    use crate::candidate::{NativeCandidate, StatefulObject};
    use crate::case::{ProblemSignature, TestCase};
    use crate::{ErrorKind, HarnessError};
    use pzl_codec::{BinaryTree, LinkedList};
    use pzl_shape::{InputShape, OutputShape, ShapeDescriptor, ShapeRegistry};
    use serde_json::{Value, json};
    use std::time::Duration;

    fn two_sum() -> NativeCandidate {
        NativeCandidate::function("two-sum", |args: &mut [Bound]| {
            let nums = args[0]
                .as_value()
                .and_then(Value::as_array)
                .ok_or("nums must be a list")?;
            let target = args[1].as_i64().ok_or("target must be an integer")?;
            for (i, a) in nums.iter().enumerate() {
                for (j, b) in nums.iter().enumerate().skip(i + 1) {
                    if a.as_i64().zip(b.as_i64()).is_some_and(|(a, b)| a + b == target) {
                        return Ok(Returned::Value(json!([i, j])));
                    }
                }
            }
            Ok(Returned::Value(json!([])))
        })
    }

    #[test]
    fn named_input_is_positioned_by_declared_params() {
        let problem = ProblemSignature::new("twoSum").with_params(["nums", "target"]);
        let case = TestCase::new(json!({"target": 9, "nums": [2, 7, 11, 15]}), json!([0, 1]));
        let verdict = Dispatcher::builtin()
            .run_case(&problem, &two_sum(), &case)
            .expect("verdict");
        assert!(verdict.pass);
        assert_eq!(verdict.got, Some(json!([0, 1])));
        assert_eq!(verdict.error, None);
    }

    #[test]
    fn merged_lists_are_flattened_for_comparison() {
        let merge = NativeCandidate::function("merge", |args: &mut [Bound]| {
            let mut values = Vec::new();
            for arg in args.iter() {
                values.extend(arg.as_list().ok_or("expected a list")?.values().map_err(|e| e.to_string())?);
            }
            values.sort_by_key(|value| value.as_i64());
            Ok(Returned::List(LinkedList::from_values(values)))
        });
        let problem = ProblemSignature::new("mergeTwoLists");
        let case = TestCase::new(json!([[1, 2, 4], [1, 3, 4]]), json!([1, 1, 2, 3, 4, 4]));
        let verdict = Dispatcher::builtin().run_case(&problem, &merge, &case).expect("verdict");
        assert!(verdict.pass, "{verdict:?}");

        let empty = TestCase::new(json!([[], []]), json!([]));
        let verdict = Dispatcher::builtin().run_case(&problem, &merge, &empty).expect("verdict");
        assert!(verdict.pass);
    }

    #[test]
    fn subsets_compare_without_order() {
        let subsets = NativeCandidate::function("subsets", |_args: &mut [Bound]| {
            Ok(Returned::Value(json!([[1, 2], [], [2], [1]])))
        });
        let problem = ProblemSignature::new("subsets");
        let case = TestCase::new(json!([[1, 2]]), json!([[], [1], [2], [1, 2]]));
        let verdict = Dispatcher::builtin().run_case(&problem, &subsets, &case).expect("verdict");
        assert!(verdict.pass);

        let exact_problem = ProblemSignature::new("notRegistered");
        let verdict = Dispatcher::builtin()
            .run_case(&exact_problem, &subsets, &case)
            .expect("verdict");
        assert!(!verdict.pass);
    }

    #[test]
    fn two_sum_with_duplicate_values_by_name() {
        let problem = ProblemSignature::new("twoSum").with_params(["nums", "target"]);
        let case = TestCase::new(json!({"nums": [3, 3], "target": 6}), json!([0, 1]));
        let verdict = Dispatcher::builtin()
            .run_case(&problem, &two_sum(), &case)
            .expect("verdict");
        assert!(verdict.pass, "{verdict:?}");
        assert_eq!(verdict.got, Some(json!([0, 1])));
    }

    #[test]
    fn interleaved_chains_merge_into_one() {
        let merge = NativeCandidate::function("merge", |args: &mut [Bound]| {
            let left = args[0].as_list().ok_or("expected a list")?.values().map_err(|e| e.to_string())?;
            let right = args[1].as_list().ok_or("expected a list")?.values().map_err(|e| e.to_string())?;
            let (mut i, mut j) = (0, 0);
            let mut merged = Vec::with_capacity(left.len() + right.len());
            while i < left.len() || j < right.len() {
                let take_left = j >= right.len()
                    || (i < left.len() && left[i].as_i64() <= right[j].as_i64());
                if take_left {
                    merged.push(left[i].clone());
                    i += 1;
                } else {
                    merged.push(right[j].clone());
                    j += 1;
                }
            }
            Ok(Returned::List(LinkedList::from_values(merged)))
        });
        let problem = ProblemSignature::new("mergeTwoLists");
        let case = TestCase::new(json!([[1, 3, 5], [2, 4, 6]]), json!([1, 2, 3, 4, 5, 6]));
        let verdict = Dispatcher::builtin().run_case(&problem, &merge, &case).expect("verdict");
        assert!(verdict.pass, "{verdict:?}");
        assert_eq!(verdict.got, Some(json!([1, 2, 3, 4, 5, 6])));
    }

    #[test]
    fn all_subsets_pass_in_any_enumeration_order() {
        // Walks the bitmasks downwards so the emitted order is far from
        // the expected listing.
        let subsets = NativeCandidate::function("subsets", |args: &mut [Bound]| {
            let nums = args[0]
                .as_value()
                .and_then(Value::as_array)
                .ok_or("nums must be a list")?
                .clone();
            let mut out = Vec::new();
            for mask in (0..1_u32 << nums.len()).rev() {
                let subset: Vec<Value> = nums
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| mask & (1 << idx) != 0)
                    .map(|(_, value)| value.clone())
                    .collect();
                out.push(Value::Array(subset));
            }
            Ok(Returned::Value(Value::Array(out)))
        });
        let problem = ProblemSignature::new("subsets").with_params(["nums"]);
        let expected = json!([[], [1], [2], [3], [1, 2], [1, 3], [2, 3], [1, 2, 3]]);
        let case = TestCase::new(json!({"nums": [1, 2, 3]}), expected.clone());
        let verdict = Dispatcher::builtin().run_case(&problem, &subsets, &case).expect("verdict");
        assert!(verdict.pass, "{verdict:?}");
        let got = verdict.got.expect("got");
        assert_ne!(got, expected);
        assert_eq!(got.as_array().map(Vec::len), Some(8));
    }

    #[test]
    fn cycle_position_out_of_range_is_a_fixture_defect() {
        let never_called = NativeCandidate::function("has-cycle", |_args: &mut [Bound]| {
            Err("must not be invoked".to_string())
        });
        let problem = ProblemSignature::new("hasCycle");
        let case = TestCase::new(json!([[1, 2, 3], 5]), json!(true));
        let err = Dispatcher::builtin()
            .run_case(&problem, &never_called, &case)
            .expect_err("bad pos");
        assert!(matches!(err, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn cyclic_input_reaches_candidate() {
        let has_cycle = NativeCandidate::function("has-cycle", |args: &mut [Bound]| {
            let list = args[0].as_list().ok_or("expected a list")?;
            Ok(Returned::Value(json!(list.has_cycle())))
        });
        let problem = ProblemSignature::new("hasCycle");
        let dispatcher = Dispatcher::builtin();
        let cyclic = TestCase::new(json!([[3, 2, 0, -4], 1]), json!(true));
        let straight = TestCase::new(json!([[1], -1]), json!(false));
        assert!(dispatcher.run_case(&problem, &has_cycle, &cyclic).expect("verdict").pass);
        assert!(dispatcher.run_case(&problem, &has_cycle, &straight).expect("verdict").pass);
    }

    #[test]
    fn slow_candidate_times_out_with_failing_verdict() {
        let slow = NativeCandidate::function("slow", |_args: &mut [Bound]| {
            std::thread::sleep(Duration::from_secs(2));
            Ok(Returned::Value(json!(0)))
        })
        .with_timeout(Duration::from_millis(50));
        let problem = ProblemSignature::new("climbStairs");
        let case = TestCase::new(json!([3]), json!(3));
        let verdict = Dispatcher::builtin().run_case(&problem, &slow, &case).expect("verdict");
        assert!(!verdict.pass);
        assert_eq!(verdict.got, None);
        assert_eq!(verdict.error_kind, Some(ErrorKind::Timeout));
    }

    #[test]
    fn candidate_errors_become_failing_verdicts() {
        let broken = NativeCandidate::function("broken", |_args: &mut [Bound]| {
            Err("IndexError: list index out of range".to_string())
        });
        let problem = ProblemSignature::new("climbStairs");
        let verdict = Dispatcher::builtin()
            .run_case(&problem, &broken, &TestCase::new(json!([3]), json!(3)))
            .expect("verdict");
        assert!(!verdict.pass);
        assert_eq!(verdict.error_kind, Some(ErrorKind::Invocation));
        assert!(verdict.error.as_deref().is_some_and(|msg| msg.contains("IndexError")));
    }

    #[test]
    fn in_place_rotation_is_judged_on_the_mutated_argument() {
        let rotate = NativeCandidate::function("rotate", |args: &mut [Bound]| {
            let matrix = args[0].as_value_mut().ok_or("expected a matrix")?;
            let rows: Vec<Vec<Value>> = serde_json::from_value(matrix.clone()).map_err(|e| e.to_string())?;
            let n = rows.len();
            let rotated: Vec<Vec<Value>> = (0..n)
                .map(|i| (0..n).map(|j| rows[n - 1 - j][i].clone()).collect())
                .collect();
            *matrix = json!(rotated);
            Ok(Returned::Unit)
        });
        let problem = ProblemSignature::new("rotate");
        let case = TestCase::new(json!([[[1, 2], [3, 4]]]), json!([[3, 1], [4, 2]]));
        let verdict = Dispatcher::builtin().run_case(&problem, &rotate, &case).expect("verdict");
        assert!(verdict.pass, "{verdict:?}");
    }

    #[test]
    fn lowest_common_ancestor_reports_node_value() {
        let lca = NativeCandidate::function("lca", |args: &mut [Bound]| {
            let tree = args[0].as_tree().ok_or("expected a tree")?;
            let p = args[1].as_node().ok_or("p missing")?;
            let q = args[2].as_node().ok_or("q missing")?;
            let value = |id: usize| tree.nodes[id].val.as_i64().unwrap_or_default();
            let (low, high) = (value(p).min(value(q)), value(p).max(value(q)));
            let mut current = tree.root;
            while let Some(id) = current {
                let val = value(id);
                current = if val > high {
                    tree.nodes[id].left
                } else if val < low {
                    tree.nodes[id].right
                } else {
                    return Ok(Returned::Node {
                        tree_arg: 0,
                        node: Some(id),
                    });
                };
            }
            Ok(Returned::Node {
                tree_arg: 0,
                node: None,
            })
        });
        let problem = ProblemSignature::new("lowestCommonAncestor");
        let tree = json!([6, 2, 8, 0, 4, 7, 9, null, null, 3, 5]);
        let dispatcher = Dispatcher::builtin();
        let across = TestCase::new(json!([tree.clone(), 2, 8]), json!(6));
        let nested = TestCase::new(json!([tree, 2, 4]), json!(2));
        assert!(dispatcher.run_case(&problem, &lca, &across).expect("verdict").pass);
        assert!(dispatcher.run_case(&problem, &lca, &nested).expect("verdict").pass);
    }

    struct Counter {
        total: i64,
    }

    impl StatefulObject for Counter {
        fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, String> {
            match method {
                "add" => {
                    self.total += args.first().and_then(Value::as_i64).ok_or("add needs a number")?;
                    Ok(Value::Null)
                }
                "get" => Ok(json!(self.total)),
                other => Err(format!("unknown method {other}")),
            }
        }
    }

    fn counter_registry() -> ShapeRegistry {
        ShapeRegistry::from_entries([("Counter", ShapeDescriptor::stateful("Counter"))]).expect("registry")
    }

    #[test]
    fn stateful_replay_records_null_for_constructor() {
        let registry = counter_registry();
        let counter = NativeCandidate::stateful("counter", |_args: &[Value]| {
            Ok(Box::new(Counter { total: 0 }) as Box<dyn StatefulObject>)
        });
        let problem = ProblemSignature::new("Counter");
        let case = TestCase::new(
            json!([["Counter", "add", "add", "get"], [[], [2], [3], []]]),
            json!([null, null, null, 5]),
        );
        let verdict = Dispatcher::new(&registry)
            .run_case(&problem, &counter, &case)
            .expect("verdict");
        assert!(verdict.pass, "{verdict:?}");

        let uneven = TestCase::new(json!([["Counter", "get"], [[]]]), json!([null, 0]));
        let err = Dispatcher::new(&registry)
            .run_case(&problem, &counter, &uneven)
            .expect_err("uneven");
        assert!(matches!(err, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn tree_codec_round_trip_compares_level_order() {
        let codec = NativeCandidate::round_trip(
            "codec",
            |payload: &Bound| {
                let flat = payload.to_flat().map_err(|e| e.to_string())?;
                Ok(Value::String(flat.to_string()))
            },
            |encoded: &Value| {
                let text = encoded.as_str().ok_or("expected a string")?;
                let flat: Value = serde_json::from_str(text).map_err(|e| e.to_string())?;
                BinaryTree::from_flat(&flat).map(Bound::Tree).map_err(|e| e.to_string())
            },
        );
        let problem = ProblemSignature::new("codec");
        let dispatcher = Dispatcher::builtin();
        let spread = TestCase::new(json!([1, 2, 3, null, null, 4, 5]), json!([1, 2, 3, null, null, 4, 5]));
        let wrapped = TestCase::new(json!([[1, null, 2]]), json!([1, null, 2]));
        let empty = TestCase::new(json!([]), json!([]));
        for case in [spread, wrapped, empty] {
            let verdict = dispatcher.run_case(&problem, &codec, &case).expect("verdict");
            assert!(verdict.pass, "{verdict:?}");
        }
    }

    #[test]
    fn encode_decode_unwraps_single_element_wrappers() {
        let identity = NativeCandidate::round_trip(
            "strings",
            |payload: &Bound| Ok(payload.as_value().cloned().unwrap_or(Value::Null)),
            |encoded: &Value| Ok(Bound::Value(encoded.clone())),
        );
        let problem = ProblemSignature::new("encodeDecode");
        let case = TestCase::new(json!([[["neet", "code"]]]), json!(["neet", "code"]));
        let verdict = Dispatcher::builtin().run_case(&problem, &identity, &case).expect("verdict");
        assert!(verdict.pass, "{verdict:?}");
    }

    #[test]
    fn invalid_descriptor_is_a_config_error() {
        let registry = ShapeRegistry::builtin();
        let dispatcher = Dispatcher::new(registry);
        assert!(dispatcher.descriptor("maxDepth").is_ok());
        let bad = ShapeDescriptor::function(&[InputShape::TreeNode { tree_arg: 0 }], OutputShape::Value);
        assert!(ShapeRegistry::from_entries([("bad", bad)]).is_err());
    }

    #[test]
    fn run_cases_separates_fixture_errors() {
        let problem = ProblemSignature::new("twoSum").with_params(["nums", "target"]);
        let cases = vec![
            TestCase::new(json!([[3, 3], 6]), json!([0, 1])),
            TestCase::new(json!({"nums": [1, 2]}), json!([0, 1])),
            TestCase::new(json!([[1, 2], 7]), json!([0, 1])),
        ];
        let report = Dispatcher::builtin().run_cases(&problem, &two_sum(), &cases);
        assert_eq!(report.total(), 2);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.fixture_errors.len(), 1);
        assert_eq!(report.fixture_errors[0].case_index, 1);
        assert_eq!(report.fixture_errors[0].kind, ErrorKind::MalformedInput);
        assert!(!report.all_passed());
        assert_eq!(Stage::ArgsBound.as_str(), "args_bound");
    }
}
