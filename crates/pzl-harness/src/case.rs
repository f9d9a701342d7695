use crate::{ErrorKind, HarnessError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One `{input, expected}` fixture entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub expected: Value,
}

impl TestCase {
    #[must_use]
    pub fn new(input: Value, expected: Value) -> Self {
        Self { input, expected }
    }
}

/// Entry point name plus the declared parameter order used to position
/// named inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemSignature {
    pub entry_point: String,
    #[serde(default)]
    pub params: Vec<String>,
}

impl ProblemSignature {
    #[must_use]
    pub fn new(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }
}

/// Normalizes a case input to positional arguments.
///
/// Lists are already positional. A named mapping is ordered by `params`,
/// never by the mapping's own key order; every declared parameter must be
/// present and no other key may appear. `null` means no arguments and any
/// other scalar is a single argument.
pub fn positional_args(input: &Value, params: &[String]) -> Result<Vec<Value>, HarnessError> {
    match input {
        Value::Array(items) => Ok(items.clone()),
        Value::Null => Ok(Vec::new()),
        Value::Object(fields) => {
            if params.is_empty() {
                return Err(HarnessError::HarnessConfig(
                    "named input given but the problem declares no parameter order".to_string(),
                ));
            }
            if let Some(unknown) = fields.keys().find(|key| !params.iter().any(|param| param == *key)) {
                return Err(HarnessError::MalformedInput(format!(
                    "unexpected input field `{unknown}`"
                )));
            }
            params
                .iter()
                .map(|param| {
                    fields.get(param).cloned().ok_or_else(|| {
                        HarnessError::MalformedInput(format!("missing input field `{param}`"))
                    })
                })
                .collect()
        }
        scalar => Ok(vec![scalar.clone()]),
    }
}

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub input: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub got: Option<Value>,
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl Verdict {
    #[must_use]
    pub fn judged(case: &TestCase, got: Value, pass: bool) -> Self {
        Self {
            input: case.input.clone(),
            expected: case.expected.clone(),
            got: Some(got),
            pass,
            error: None,
            error_kind: None,
        }
    }

    /// A failed invocation: never passing, no observed value.
    #[must_use]
    pub fn errored(case: &TestCase, err: &HarnessError) -> Self {
        Self {
            input: case.input.clone(),
            expected: case.expected.clone(),
            got: None,
            pass: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ProblemSignature, TestCase, Verdict, positional_args};
    use crate::{ErrorKind, HarnessError};
    use serde_json::json;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn named_inputs_follow_declared_order() {
        let input = json!({"target": 9, "nums": [2, 7, 11, 15]});
        let args = positional_args(&input, &params(&["nums", "target"])).expect("positional");
        assert_eq!(args, vec![json!([2, 7, 11, 15]), json!(9)]);
    }

    #[test]
    fn named_inputs_without_params_are_config_errors() {
        let err = positional_args(&json!({"nums": []}), &[]).expect_err("no params");
        assert!(matches!(err, HarnessError::HarnessConfig(_)));
    }

    #[test]
    fn missing_and_unknown_fields_are_malformed() {
        let declared = params(&["nums", "target"]);
        let missing = positional_args(&json!({"nums": [1]}), &declared).expect_err("missing");
        assert_eq!(missing, HarnessError::MalformedInput("missing input field `target`".into()));
        let unknown = positional_args(&json!({"nums": [1], "target": 1, "k": 2}), &declared)
            .expect_err("unknown");
        assert!(matches!(unknown, HarnessError::MalformedInput(_)));
    }

    #[test]
    fn scalars_lists_and_null() {
        assert_eq!(positional_args(&json!(5), &[]).expect("scalar"), vec![json!(5)]);
        assert_eq!(
            positional_args(&json!([[1, 2], 3]), &[]).expect("list"),
            vec![json!([1, 2]), json!(3)]
        );
        assert!(positional_args(&json!(null), &[]).expect("null").is_empty());
    }

    #[test]
    fn verdict_serialization_omits_unset_fields() {
        let case = TestCase::new(json!([1]), json!(2));
        let ok = serde_json::to_value(Verdict::judged(&case, json!(null), false)).expect("ok");
        assert_eq!(ok["got"], json!(null));
        assert!(ok.get("error").is_none());

        let failed = Verdict::errored(&case, &HarnessError::Timeout { timeout_ms: 10 });
        assert!(!failed.pass);
        assert_eq!(failed.error_kind, Some(ErrorKind::Timeout));
        let encoded = serde_json::to_value(&failed).expect("errored");
        assert!(encoded.get("got").is_none());
        assert_eq!(encoded["error"], json!("timed out after 10 ms"));
    }

    #[test]
    fn signature_builder() {
        let signature = ProblemSignature::new("twoSum").with_params(["nums", "target"]);
        assert_eq!(signature.params, params(&["nums", "target"]));
    }
}
