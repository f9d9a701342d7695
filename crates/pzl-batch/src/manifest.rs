use crate::BatchError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// One problem × language pairing to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub problem_id: String,
    pub language: String,
    /// Problem metadata (`{id, function_name, params}`).
    pub problem: PathBuf,
    /// Test-case store (`{run_tests, submit_tests}`).
    pub tests: PathBuf,
    pub solution: PathBuf,
}

/// `suite.json`: the explicit list of units, paths relative to the file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteManifest {
    #[serde(default)]
    pub suite: String,
    pub units: Vec<UnitSpec>,
}

impl SuiteManifest {
    /// Reads a manifest and resolves every unit path against its directory.
    pub fn load(path: &Path) -> Result<Self, BatchError> {
        let raw = fs::read_to_string(path).map_err(BatchError::io(path))?;
        let mut manifest: Self = serde_json::from_str(&raw).map_err(BatchError::json(path))?;
        if manifest.suite.is_empty() {
            manifest.suite = path
                .file_stem()
                .map_or_else(|| "suite".to_string(), |stem| stem.to_string_lossy().into_owned());
        }
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        for unit in &mut manifest.units {
            unit.problem = base.join(&unit.problem);
            unit.tests = base.join(&unit.tests);
            unit.solution = base.join(&unit.solution);
        }
        Ok(manifest)
    }

    /// Units kept by the language and problem filters; an empty filter keeps
    /// everything.
    pub fn selected<'a>(
        &'a self,
        languages: &'a [String],
        problems: &'a [String],
    ) -> impl Iterator<Item = &'a UnitSpec> + 'a {
        self.units.iter().filter(move |unit| {
            (languages.is_empty()
                || languages
                    .iter()
                    .any(|language| language.eq_ignore_ascii_case(&unit.language)))
                && (problems.is_empty() || problems.iter().any(|id| *id == unit.problem_id))
        })
    }
}
