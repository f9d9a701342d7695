//! Edge-case derivation and expectation capture.
//!
//! Boundary inputs are derived from one sample case by replacing a single
//! structural argument with its degenerate forms (empty, single element,
//! skewed). Expected outputs come from a trusted reference candidate, never
//! from guesses.

use pzl_harness::{Candidate, Dispatcher, HarnessError, ProblemSignature, TestCase, positional_args};
use pzl_shape::{CallConvention, InputShape, RoundTripKind, ShapeDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Degenerate variants of `sample`, each a positional input list. The
/// sample itself and duplicates are left out.
#[must_use]
pub fn boundary_inputs(descriptor: &ShapeDescriptor, sample: &[Value]) -> Vec<Value> {
    let mut variants: Vec<Value> = Vec::new();
    let mut push = |candidate: Vec<Value>| {
        let candidate = Value::Array(candidate);
        if candidate.as_array().map(Vec::as_slice) != Some(sample) && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    };

    match &descriptor.convention {
        CallConvention::Stateful { .. } => {}
        CallConvention::RoundTrip {
            kind: RoundTripKind::EncodeDecode,
        } => {
            push(vec![json!([])]);
            push(vec![json!([""])]);
        }
        CallConvention::RoundTrip {
            kind: RoundTripKind::TreeCodec,
        } => {
            let level_order = match sample {
                [Value::Array(items)] => items.as_slice(),
                spread => spread,
            };
            push(vec![json!([])]);
            if let Some(root) = level_order.iter().find(|value| !value.is_null()) {
                push(vec![json!([root])]);
            }
        }
        CallConvention::Function => {
            // Trees that other arguments point into keep their shape.
            let pinned: Vec<usize> = descriptor
                .inputs
                .iter()
                .filter_map(|shape| match shape {
                    InputShape::TreeNode { tree_arg } => Some(*tree_arg),
                    _ => None,
                })
                .collect();
            let mut cursor = 0;
            for (position, shape) in descriptor.inputs.iter().copied().enumerate() {
                let start = cursor;
                cursor += shape.raw_arity();
                if cursor > sample.len() || pinned.contains(&position) {
                    continue;
                }
                for replacement in degenerate_forms(shape, &sample[start..cursor]) {
                    let mut variant = sample.to_vec();
                    variant.splice(start..cursor, replacement);
                    push(variant);
                }
            }
        }
    }
    variants
}

/// Replacement raw values for one argument occupying `raw`.
fn degenerate_forms(shape: InputShape, raw: &[Value]) -> Vec<Vec<Value>> {
    let first = first_scalar(&raw[..1]);
    match shape {
        InputShape::Array | InputShape::LinkedList => {
            let mut forms = vec![vec![json!([])]];
            forms.extend(first.map(|value| vec![json!([value])]));
            forms
        }
        InputShape::LinkedListSeq => vec![vec![json!([])], vec![json!([[]])]],
        InputShape::CyclicList => {
            let mut forms = vec![vec![json!([]), json!(-1)]];
            if let Some(value) = first {
                forms.push(vec![json!([value.clone()]), json!(-1)]);
                forms.push(vec![json!([value]), json!(0)]);
            }
            forms
        }
        InputShape::Tree => {
            let mut forms = vec![vec![json!([])]];
            let values: Vec<Value> = raw[0]
                .as_array()
                .map(|items| items.iter().filter(|item| !item.is_null()).take(3).cloned().collect())
                .unwrap_or_default();
            if let Some(root) = values.first() {
                forms.push(vec![json!([root])]);
            }
            if let [a, b, c] = values.as_slice() {
                forms.push(vec![json!([a, b, null, c])]);
                forms.push(vec![json!([a, null, b, null, c])]);
            }
            forms
        }
        InputShape::Graph => vec![vec![json!([])], vec![json!([[]])]],
        InputShape::RandomPointerList => {
            let mut forms = vec![vec![json!([])]];
            if let Some(value) = raw[0]
                .as_array()
                .and_then(|entries| entries.first())
                .and_then(|entry| entry.get(0))
            {
                forms.push(vec![json!([[value, null]])]);
                forms.push(vec![json!([[value, 0]])]);
            }
            forms
        }
        InputShape::Scalar | InputShape::Matrix | InputShape::TreeNode { .. } => Vec::new(),
    }
}

/// First non-null element of the first array found in `values`.
fn first_scalar(values: &[Value]) -> Option<Value> {
    values
        .iter()
        .find_map(Value::as_array)
        .and_then(|items| items.iter().find(|item| !item.is_null() && !item.is_array()))
        .cloned()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRejection {
    pub input: Value,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureReport {
    pub captured: Vec<TestCase>,
    pub rejected: Vec<CaptureRejection>,
}

impl CaptureReport {
    /// The reference handled every derived input.
    #[must_use]
    pub fn all_captured(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Runs each input through the reference candidate and records its output
/// as the expectation. Inputs the reference cannot handle are rejected.
#[must_use]
pub fn capture_expectations(
    dispatcher: &Dispatcher<'_>,
    problem: &ProblemSignature,
    reference: &dyn Candidate,
    inputs: &[Value],
) -> CaptureReport {
    let mut report = CaptureReport::default();
    for input in inputs {
        match dispatcher.observe(problem, reference, input) {
            Ok(expected) => report.captured.push(TestCase::new(input.clone(), expected)),
            Err(err) => report.rejected.push(CaptureRejection {
                input: input.clone(),
                message: err.to_string(),
            }),
        }
    }
    report
}

/// Boundary variants for the first case of `cases`, in positional form.
pub fn boundary_inputs_for(
    descriptor: &ShapeDescriptor,
    problem: &ProblemSignature,
    cases: &[TestCase],
) -> Result<Vec<Value>, HarnessError> {
    let Some(sample) = cases.first() else {
        return Ok(Vec::new());
    };
    let raw = positional_args(&sample.input, &problem.params)?;
    Ok(boundary_inputs(descriptor, &raw))
}
