//! Problem metadata and test-case stores on disk.

use crate::{BatchError, sha256_hex};
use pzl_harness::{HarnessError, ProblemSignature, TestCase, positional_args};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemRecord {
    pub id: String,
    pub function_name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl ProblemRecord {
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let raw = fs::read_to_string(path).map_err(BatchError::io(path))?;
        serde_json::from_str(&raw).map_err(BatchError::json(path))
    }

    #[must_use]
    pub fn signature(&self) -> ProblemSignature {
        ProblemSignature::new(self.function_name.clone()).with_params(self.params.iter().cloned())
    }
}

/// `{run_tests, submit_tests}`; other top-level keys are kept on rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestFile {
    #[serde(default)]
    pub run_tests: Vec<TestCase>,
    #[serde(default)]
    pub submit_tests: Vec<TestCase>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed test file plus the SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTests {
    pub file: TestFile,
    pub sha256: String,
}

impl TestFile {
    pub fn load(path: &Path) -> Result<LoadedTests, BatchError> {
        let bytes = fs::read(path).map_err(BatchError::io(path))?;
        let file = serde_json::from_slice(&bytes).map_err(BatchError::json(path))?;
        Ok(LoadedTests {
            file,
            sha256: sha256_hex(&bytes),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), BatchError> {
        let mut payload = serde_json::to_string_pretty(self).map_err(BatchError::json(path))?;
        payload.push('\n');
        fs::write(path, payload).map_err(BatchError::io(path))
    }

    /// Run tests followed by submit tests.
    #[must_use]
    pub fn all_cases(&self) -> Vec<TestCase> {
        self.run_tests
            .iter()
            .chain(&self.submit_tests)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn case_count(&self) -> usize {
        self.run_tests.len() + self.submit_tests.len()
    }
}

/// Rewrites named-mapping inputs to positional lists in declared parameter
/// order. Returns how many cases changed. Nothing is rewritten unless every
/// named input converts.
pub fn normalize_test_file(file: &mut TestFile, params: &[String]) -> Result<usize, HarnessError> {
    let mut rewrites = Vec::new();
    for (section, cases) in [("run_tests", &file.run_tests), ("submit_tests", &file.submit_tests)] {
        for (index, case) in cases.iter().enumerate() {
            if case.input.is_object() {
                let positional = positional_args(&case.input, params).map_err(|err| match err {
                    HarnessError::MalformedInput(message) => {
                        HarnessError::MalformedInput(format!("{section}[{index}]: {message}"))
                    }
                    other => other,
                })?;
                rewrites.push((section, index, Value::Array(positional)));
            }
        }
    }
    let changed = rewrites.len();
    for (section, index, input) in rewrites {
        let cases = if section == "run_tests" {
            &mut file.run_tests
        } else {
            &mut file.submit_tests
        };
        cases[index].input = input;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::{ProblemRecord, TestFile, normalize_test_file};
    use pzl_harness::HarnessError;
    use serde_json::json;
    use std::fs;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn run_tests_precede_submit_tests() {
        let file: TestFile = serde_json::from_value(json!({
            "run_tests": [{"input": [1], "expected": 1}],
            "submit_tests": [{"input": [2], "expected": 2}, {"input": [3], "expected": 3}]
        }))
        .expect("parse");
        let inputs: Vec<_> = file.all_cases().into_iter().map(|case| case.input).collect();
        assert_eq!(inputs, vec![json!([1]), json!([2]), json!([3])]);
        assert_eq!(file.case_count(), 3);
    }

    #[test]
    fn normalization_uses_declared_order_not_key_order() {
        let mut file: TestFile = serde_json::from_value(json!({
            "run_tests": [{"input": {"target": 9, "nums": [2, 7]}, "expected": [0, 1]}],
            "submit_tests": [{"input": [[1, 2], 3], "expected": [0, 1]}],
            "source": "import"
        }))
        .expect("parse");
        let changed = normalize_test_file(&mut file, &params(&["nums", "target"])).expect("normalize");
        assert_eq!(changed, 1);
        assert_eq!(file.run_tests[0].input, json!([[2, 7], 9]));
        assert_eq!(file.submit_tests[0].input, json!([[1, 2], 3]));
        assert_eq!(file.extra.get("source"), Some(&json!("import")));
    }

    #[test]
    fn failed_normalization_leaves_file_untouched() {
        let original: TestFile = serde_json::from_value(json!({
            "run_tests": [
                {"input": {"nums": [1], "target": 1}, "expected": []},
                {"input": {"nums": [1]}, "expected": []}
            ]
        }))
        .expect("parse");
        let mut file = original.clone();
        let err = normalize_test_file(&mut file, &params(&["nums", "target"])).expect_err("missing");
        assert!(matches!(err, HarnessError::MalformedInput(message) if message.starts_with("run_tests[1]")));
        assert_eq!(file, original);
    }

    #[test]
    fn load_fingerprints_file_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tests.json");
        fs::write(&path, r#"{"run_tests": []}"#).expect("write");
        let loaded = TestFile::load(&path).expect("load");
        assert_eq!(loaded.sha256.len(), 64);
        assert!(loaded.file.all_cases().is_empty());

        let problem_path = dir.path().join("problem.json");
        fs::write(&problem_path, r#"{"id": "two-sum", "title": "Two Sum", "function_name": "twoSum"}"#)
            .expect("write");
        let record = ProblemRecord::load(&problem_path).expect("problem");
        assert_eq!(record.signature().entry_point, "twoSum");
        assert!(record.params.is_empty());
    }
}
