use crate::HarnessError;
use crate::bind::{Bound, Returned};
use pzl_shape::{OutputShape, RoundTripKind};
use serde_json::Value;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

pub const DEFAULT_NATIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully bound call, ready for a candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    Function {
        entry_point: String,
        args: Vec<Bound>,
        output: OutputShape,
    },
    /// `methods[0]` names the constructor; `arguments[i]` belongs to
    /// `methods[i]`.
    Stateful {
        class_name: String,
        methods: Vec<String>,
        arguments: Vec<Vec<Value>>,
    },
    RoundTrip {
        kind: RoundTripKind,
        payload: Bound,
    },
}

impl Invocation {
    #[must_use]
    pub const fn convention_name(&self) -> &'static str {
        match self {
            Self::Function { .. } => "function",
            Self::Stateful { .. } => "stateful",
            Self::RoundTrip { .. } => "round_trip",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult {
    pub returned: Returned,
    /// State of the first argument after the call, for in-place outputs.
    pub first_arg_after: Option<Bound>,
}

impl InvocationResult {
    #[must_use]
    pub fn returned(returned: Returned) -> Self {
        Self {
            returned,
            first_arg_after: None,
        }
    }
}

/// Something that can execute an [`Invocation`].
pub trait Candidate: Send + Sync {
    fn label(&self) -> &str;

    /// Runs the call. Failures of the candidate itself are `Invocation` or
    /// `Timeout` errors; a convention the candidate cannot serve is a
    /// `HarnessConfig` error.
    fn invoke(&self, invocation: Invocation) -> Result<InvocationResult, HarnessError>;
}

/// Instance created by a stateful candidate's constructor.
pub trait StatefulObject: Send {
    fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, String>;
}

type FunctionBody = dyn Fn(&mut [Bound]) -> Result<Returned, String> + Send + Sync;
type Factory = dyn Fn(&[Value]) -> Result<Box<dyn StatefulObject>, String> + Send + Sync;
type Encoder = dyn Fn(&Bound) -> Result<Value, String> + Send + Sync;
type Decoder = dyn Fn(&Value) -> Result<Bound, String> + Send + Sync;

#[derive(Clone)]
enum NativeBody {
    Function(Arc<FunctionBody>),
    Stateful(Arc<Factory>),
    RoundTrip {
        encode: Arc<Encoder>,
        decode: Arc<Decoder>,
    },
}

/// In-process Rust candidate, run on a worker thread under a deadline.
///
/// A candidate that misses the deadline is reported as timed out and its
/// thread is left detached; a panic is reported as an invocation failure.
#[derive(Clone)]
pub struct NativeCandidate {
    label: String,
    body: NativeBody,
    timeout: Duration,
}

impl std::fmt::Debug for NativeCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeCandidate")
            .field("label", &self.label)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NativeCandidate {
    /// Free function over bound arguments. Mutations to the arguments are
    /// visible to in-place outputs.
    pub fn function<F>(label: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut [Bound]) -> Result<Returned, String> + Send + Sync + 'static,
    {
        Self::with_body(label, NativeBody::Function(Arc::new(body)))
    }

    /// Class-style candidate: `factory` receives the constructor arguments.
    pub fn stateful<F>(label: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Box<dyn StatefulObject>, String> + Send + Sync + 'static,
    {
        Self::with_body(label, NativeBody::Stateful(Arc::new(factory)))
    }

    /// Encoder/decoder pair; only the decoded value is judged.
    pub fn round_trip<E, D>(label: impl Into<String>, encode: E, decode: D) -> Self
    where
        E: Fn(&Bound) -> Result<Value, String> + Send + Sync + 'static,
        D: Fn(&Value) -> Result<Bound, String> + Send + Sync + 'static,
    {
        Self::with_body(
            label,
            NativeBody::RoundTrip {
                encode: Arc::new(encode),
                decode: Arc::new(decode),
            },
        )
    }

    fn with_body(label: impl Into<String>, body: NativeBody) -> Self {
        Self {
            label: label.into(),
            body,
            timeout: DEFAULT_NATIVE_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Candidate for NativeCandidate {
    fn label(&self) -> &str {
        &self.label
    }

    fn invoke(&self, invocation: Invocation) -> Result<InvocationResult, HarnessError> {
        let body = self.body.clone();
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name(format!("pzl-native-{}", self.label))
            .spawn(move || {
                let _ = sender.send(run_native(&body, invocation));
            })
            .map_err(|err| HarnessError::Invocation(format!("failed to start candidate thread: {err}")))?;

        match receiver.recv_timeout(self.timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(HarnessError::Timeout {
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(HarnessError::Invocation(format!(
                "candidate `{}` panicked",
                self.label
            ))),
        }
    }
}

fn run_native(body: &NativeBody, invocation: Invocation) -> Result<InvocationResult, HarnessError> {
    match (body, invocation) {
        (NativeBody::Function(function), Invocation::Function { mut args, .. }) => {
            let returned = function(&mut args).map_err(HarnessError::Invocation)?;
            Ok(InvocationResult {
                returned,
                first_arg_after: args.into_iter().next(),
            })
        }
        (
            NativeBody::Stateful(factory),
            Invocation::Stateful {
                methods, arguments, ..
            },
        ) => {
            let results = replay(factory.as_ref(), &methods, &arguments)?;
            Ok(InvocationResult::returned(Returned::Value(Value::Array(results))))
        }
        (NativeBody::RoundTrip { encode, decode }, Invocation::RoundTrip { payload, .. }) => {
            let encoded = encode(&payload).map_err(HarnessError::Invocation)?;
            let decoded = decode(&encoded).map_err(HarnessError::Invocation)?;
            Ok(InvocationResult::returned(Returned::try_from(decoded)?))
        }
        (_, invocation) => Err(HarnessError::HarnessConfig(format!(
            "native candidate cannot serve the {} convention",
            invocation.convention_name()
        ))),
    }
}

/// Constructs the object from `arguments[0]`, records `null` for the
/// constructor, then calls each remaining method in order.
fn replay(factory: &Factory, methods: &[String], arguments: &[Vec<Value>]) -> Result<Vec<Value>, HarnessError> {
    let constructor_args = arguments
        .first()
        .ok_or_else(|| HarnessError::MalformedInput("stateful case has no constructor call".to_string()))?;
    let mut object = factory(constructor_args).map_err(HarnessError::Invocation)?;
    let mut results = Vec::with_capacity(methods.len());
    results.push(Value::Null);
    for (method, args) in methods.iter().zip(arguments).skip(1) {
        let value = object
            .call(method, args)
            .map_err(|err| HarnessError::Invocation(format!("{method}: {err}")))?;
        results.push(value);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::{Candidate, Invocation, NativeCandidate, StatefulObject};
    use crate::HarnessError;
    use crate::bind::{Bound, Returned};
    use pzl_shape::{OutputShape, RoundTripKind};
    use serde_json::{Value, json};
    use std::time::Duration;

    struct Counter {
        total: i64,
    }

    impl StatefulObject for Counter {
        fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, String> {
            match method {
                "add" => {
                    self.total += args.first().and_then(Value::as_i64).unwrap_or(0);
                    Ok(Value::Null)
                }
                "get" => Ok(json!(self.total)),
                other => Err(format!("no method {other}")),
            }
        }
    }

    fn counter() -> NativeCandidate {
        NativeCandidate::stateful("Counter", |args| {
            let start = args.first().and_then(Value::as_i64).unwrap_or(0);
            Ok(Box::new(Counter { total: start }) as Box<dyn StatefulObject>)
        })
    }

    fn function_call(args: Vec<Bound>) -> Invocation {
        Invocation::Function {
            entry_point: "f".to_string(),
            args,
            output: OutputShape::Value,
        }
    }

    #[test]
    fn stateful_replay_records_null_for_constructor() {
        let result = counter()
            .invoke(Invocation::Stateful {
                class_name: "Counter".to_string(),
                methods: vec!["Counter".into(), "add".into(), "get".into()],
                arguments: vec![vec![json!(5)], vec![json!(2)], vec![]],
            })
            .expect("replay");
        assert_eq!(result.returned, Returned::Value(json!([null, null, 7])));
    }

    #[test]
    fn method_errors_are_invocation_failures() {
        let err = counter()
            .invoke(Invocation::Stateful {
                class_name: "Counter".to_string(),
                methods: vec!["Counter".into(), "boom".into()],
                arguments: vec![vec![], vec![]],
            })
            .expect_err("unknown method");
        assert!(matches!(err, HarnessError::Invocation(message) if message.contains("boom")));
    }

    #[test]
    fn function_sees_and_reports_mutated_first_argument() {
        let candidate = NativeCandidate::function("negate", |args| {
            if let Some(Value::Array(items)) = args.first_mut().and_then(Bound::as_value_mut) {
                for item in items.iter_mut() {
                    *item = json!(-item.as_i64().unwrap_or(0));
                }
            }
            Ok(Returned::Unit)
        });
        let result = candidate
            .invoke(function_call(vec![Bound::Value(json!([1, 2]))]))
            .expect("invoke");
        assert_eq!(result.first_arg_after, Some(Bound::Value(json!([-1, -2]))));
    }

    #[test]
    fn hanging_candidate_times_out() {
        let candidate = NativeCandidate::function("spin", |_| {
            std::thread::sleep(Duration::from_secs(5));
            Ok(Returned::Unit)
        })
        .with_timeout(Duration::from_millis(50));
        let err = candidate.invoke(function_call(Vec::new())).expect_err("timeout");
        assert_eq!(err, HarnessError::Timeout { timeout_ms: 50 });
    }

    #[test]
    fn panicking_candidate_is_an_invocation_failure() {
        let candidate = NativeCandidate::function("panics", |_| panic!("index out of bounds"));
        let err = candidate.invoke(function_call(Vec::new())).expect_err("panic");
        assert!(matches!(err, HarnessError::Invocation(_)));
    }

    #[test]
    fn convention_mismatch_is_a_config_error() {
        let err = counter()
            .invoke(Invocation::RoundTrip {
                kind: RoundTripKind::EncodeDecode,
                payload: Bound::Value(json!(["a"])),
            })
            .expect_err("mismatch");
        assert!(err.is_fixture_defect());
    }

    #[test]
    fn round_trip_judges_decoded_value() {
        let candidate = NativeCandidate::round_trip(
            "joiner",
            |payload| {
                let parts: Vec<String> = payload
                    .as_value()
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default();
                Ok(json!(parts.join("\u{1}")))
            },
            |encoded| {
                let text = encoded.as_str().ok_or("not a string")?;
                let parts: Vec<Value> = if text.is_empty() {
                    Vec::new()
                } else {
                    text.split('\u{1}').map(|part| json!(part)).collect()
                };
                Ok(Bound::Value(Value::Array(parts)))
            },
        );
        let result = candidate
            .invoke(Invocation::RoundTrip {
                kind: RoundTripKind::EncodeDecode,
                payload: Bound::Value(json!(["lint", "code"])),
            })
            .expect("round trip");
        assert_eq!(result.returned, Returned::Value(json!(["lint", "code"])));
    }
}
