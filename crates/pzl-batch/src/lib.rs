#![forbid(unsafe_code)]

pub mod boundary;
pub mod manifest;
pub mod store;

pub use boundary::{CaptureRejection, CaptureReport, boundary_inputs, boundary_inputs_for, capture_expectations};
pub use manifest::{SuiteManifest, UnitSpec};
pub use store::{LoadedTests, ProblemRecord, TestFile, normalize_test_file};

use pzl_harness::{Dispatcher, ErrorKind, FixtureError, HarnessError, Language, ProcessCandidate, Verdict};
use pzl_sandbox::{DEFAULT_TIMEOUT, RuntimeCommand};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

pub const DEFAULT_WORKERS: usize = 8;
/// Failing verdicts kept per unit report.
pub const DEFAULT_MAX_FAILURES: usize = 3;
pub const VERDICT_LOG_ENV: &str = "PZL_VERDICT_LOG_PATH";

static VERDICT_LOG_PATH: OnceLock<Mutex<Option<PathBuf>>> = OnceLock::new();

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("no unit for problem `{problem_id}` in language `{language}`")]
    UnknownUnit { problem_id: String, language: String },
    #[error(transparent)]
    Harness(#[from] HarnessError),
}

impl BatchError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path) -> impl FnOnce(serde_json::Error) -> Self + '_ {
        move |source| Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub manifest_path: PathBuf,
    pub workers: usize,
    pub timeout: Duration,
    pub max_failures: usize,
    /// Language filter; empty runs every language.
    pub languages: Vec<String>,
    /// Problem-id filter; empty runs every problem.
    pub problems: Vec<String>,
    pub python: RuntimeCommand,
    pub node: RuntimeCommand,
}

impl BatchConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            manifest_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/suite.json"),
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            max_failures: DEFAULT_MAX_FAILURES,
            languages: Vec::new(),
            problems: Vec::new(),
            python: RuntimeCommand::python(),
            node: RuntimeCommand::node(),
        }
    }

    #[must_use]
    pub fn runtime(&self, language: Language) -> &RuntimeCommand {
        match language {
            Language::Python => &self.python,
            Language::Javascript => &self.node,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub problem_id: String,
    pub language: String,
    pub passed: usize,
    pub total: usize,
    /// The first failing verdicts, up to the configured limit.
    pub failures: Vec<Verdict>,
    pub fixture_errors: Vec<FixtureError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    pub corpus_sha256: String,
}

impl UnitReport {
    #[must_use]
    pub fn success(&self) -> bool {
        self.error.is_none() && self.fixture_errors.is_empty() && self.total > 0 && self.passed == self.total
    }
}

/// A unit that could not be prepared (unknown language, missing runtime,
/// unreadable file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedUnit {
    pub problem_id: String,
    pub language: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub suite: String,
    pub generated_unix_ms: u128,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub units: Vec<UnitReport>,
    pub skipped_units: Vec<SkippedUnit>,
}

impl BatchSummary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Ran(UnitReport),
    Skipped(SkippedUnit),
}

/// One JSONL line per judged case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictLogEntry {
    pub ts_unix_ms: u128,
    pub suite: String,
    pub problem_id: String,
    pub language: String,
    pub case_index: usize,
    pub pass: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn set_verdict_log_path(path: Option<PathBuf>) {
    let cell = VERDICT_LOG_PATH.get_or_init(|| Mutex::new(None));
    if let Ok(mut slot) = cell.lock() {
        *slot = path;
    }
}

fn maybe_append_verdict_log(entry: &VerdictLogEntry) -> Result<(), String> {
    let configured = VERDICT_LOG_PATH
        .get()
        .and_then(|cell| cell.lock().ok())
        .and_then(|slot| slot.clone());
    let from_env = std::env::var_os(VERDICT_LOG_ENV).map(PathBuf::from);
    let Some(path) = configured.or(from_env) else {
        return Ok(());
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|err| format!("failed opening {}: {err}", path.display()))?;
    let line = serde_json::to_string(entry).map_err(|err| format!("failed serializing verdict log entry: {err}"))?;
    let mut payload = line.into_bytes();
    payload.push(b'\n');
    file.write_all(&payload)
        .map_err(|err| format!("failed appending verdict log {}: {err}", path.display()))
}

/// Runs every selected unit of the manifest on a bounded worker pool.
///
/// Only an unreadable manifest or a pool that cannot start is fatal; every
/// unit problem lands in the summary.
pub fn run_batch(cfg: &BatchConfig) -> Result<BatchSummary, BatchError> {
    let manifest = SuiteManifest::load(&cfg.manifest_path)?;
    let units: Vec<&UnitSpec> = manifest.selected(&cfg.languages, &cfg.problems).collect();
    let available = runtime_availability(cfg, &units);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.workers.max(1))
        .build()?;
    let dispatcher = Dispatcher::builtin();
    tracing::info!(
        target: "pzl.batch",
        suite = %manifest.suite,
        units = units.len(),
        workers = cfg.workers.max(1),
        "starting batch"
    );

    let outcomes: Vec<UnitOutcome> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| run_prepared_unit(&dispatcher, cfg, &manifest.suite, unit, &available))
            .collect()
    });

    let mut summary = BatchSummary {
        suite: manifest.suite.clone(),
        generated_unix_ms: now_unix_ms(),
        passed: 0,
        failed: 0,
        skipped: 0,
        units: Vec::new(),
        skipped_units: Vec::new(),
    };
    for outcome in outcomes {
        match outcome {
            UnitOutcome::Ran(report) => {
                if report.success() {
                    summary.passed += 1;
                } else {
                    summary.failed += 1;
                }
                summary.units.push(report);
            }
            UnitOutcome::Skipped(skipped) => {
                summary.skipped += 1;
                summary.skipped_units.push(skipped);
            }
        }
    }
    tracing::info!(
        target: "pzl.batch",
        passed = summary.passed,
        failed = summary.failed,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(summary)
}

/// Runs a single unit outside a batch.
pub fn run_unit(dispatcher: &Dispatcher<'_>, cfg: &BatchConfig, unit: &UnitSpec) -> UnitOutcome {
    let available = runtime_availability(cfg, &[unit]);
    run_prepared_unit(dispatcher, cfg, "adhoc", unit, &available)
}

fn runtime_availability(cfg: &BatchConfig, units: &[&UnitSpec]) -> BTreeMap<Language, bool> {
    units
        .iter()
        .filter_map(|unit| unit.language.parse::<Language>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|language| (language, cfg.runtime(language).is_available()))
        .collect()
}

struct PreparedUnit {
    language: Language,
    record: ProblemRecord,
    tests: LoadedTests,
    source: String,
}

fn prepare_unit(unit: &UnitSpec, available: &BTreeMap<Language, bool>) -> Result<PreparedUnit, String> {
    let language = unit.language.parse::<Language>()?;
    if !available.get(&language).copied().unwrap_or(false) {
        return Err(format!("{language} runtime is not available"));
    }
    let record = ProblemRecord::load(&unit.problem).map_err(|err| err.to_string())?;
    let tests = TestFile::load(&unit.tests).map_err(|err| err.to_string())?;
    let source =
        fs::read_to_string(&unit.solution).map_err(|err| format!("{}: {err}", unit.solution.display()))?;
    Ok(PreparedUnit {
        language,
        record,
        tests,
        source,
    })
}

fn run_prepared_unit(
    dispatcher: &Dispatcher<'_>,
    cfg: &BatchConfig,
    suite: &str,
    unit: &UnitSpec,
    available: &BTreeMap<Language, bool>,
) -> UnitOutcome {
    let prepared = match prepare_unit(unit, available) {
        Ok(prepared) => prepared,
        Err(reason) => {
            tracing::warn!(
                target: "pzl.batch",
                problem_id = %unit.problem_id,
                language = %unit.language,
                %reason,
                "skipping unit"
            );
            return UnitOutcome::Skipped(SkippedUnit {
                problem_id: unit.problem_id.clone(),
                language: unit.language.clone(),
                reason,
            });
        }
    };

    let started = Instant::now();
    let mut report = UnitReport {
        problem_id: unit.problem_id.clone(),
        language: unit.language.clone(),
        passed: 0,
        total: 0,
        failures: Vec::new(),
        fixture_errors: Vec::new(),
        error: None,
        duration_ms: 0,
        corpus_sha256: prepared.tests.sha256.clone(),
    };
    let problem = prepared.record.signature();

    if let Err(err) = dispatcher.descriptor(&problem.entry_point) {
        report.error = Some(err.to_string());
    } else {
        let candidate = ProcessCandidate::new(prepared.language, prepared.source)
            .with_label(format!("{}/{}", unit.problem_id, prepared.language))
            .with_runtime(cfg.runtime(prepared.language).clone())
            .with_timeout(cfg.timeout);
        let cases = prepared.tests.file.all_cases();
        let case_report = dispatcher.run_cases(&problem, &candidate, &cases);

        let errored: BTreeSet<usize> = case_report
            .fixture_errors
            .iter()
            .map(|fixture| fixture.case_index)
            .collect();
        let judged = (0..cases.len()).filter(|index| !errored.contains(index));
        for (case_index, verdict) in judged.zip(&case_report.verdicts) {
            let entry = VerdictLogEntry {
                ts_unix_ms: now_unix_ms(),
                suite: suite.to_string(),
                problem_id: unit.problem_id.clone(),
                language: unit.language.clone(),
                case_index,
                pass: verdict.pass,
                error_kind: verdict.error_kind,
                error: verdict.error.clone(),
            };
            if let Err(err) = maybe_append_verdict_log(&entry) {
                tracing::warn!(target: "pzl.batch", error = %err, "verdict log append failed");
            }
        }

        report.passed = case_report.passed();
        report.total = case_report.total();
        report.failures = case_report
            .verdicts
            .iter()
            .filter(|verdict| !verdict.pass)
            .take(cfg.max_failures)
            .cloned()
            .collect();
        report.fixture_errors = case_report.fixture_errors;
    }

    report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        target: "pzl.batch",
        problem_id = %report.problem_id,
        language = %report.language,
        passed = report.passed,
        total = report.total,
        fixture_errors = report.fixture_errors.len(),
        duration_ms = report.duration_ms,
        "unit finished"
    );
    UnitOutcome::Ran(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub problem_id: String,
    pub tests: PathBuf,
    /// `None` when the whole file could not be checked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub suite: String,
    pub files_checked: usize,
    pub cases_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Binds every case of every selected test file without running anything.
///
/// Files shared by several language units are checked once.
pub fn validate_suite(cfg: &BatchConfig) -> Result<ValidationReport, BatchError> {
    let manifest = SuiteManifest::load(&cfg.manifest_path)?;
    let dispatcher = Dispatcher::builtin();
    let mut report = ValidationReport {
        suite: manifest.suite.clone(),
        ..ValidationReport::default()
    };
    let mut seen = BTreeSet::new();
    for unit in manifest.selected(&cfg.languages, &cfg.problems) {
        if !seen.insert((unit.problem.clone(), unit.tests.clone())) {
            continue;
        }
        report.files_checked += 1;
        let whole_file = |message: String| ValidationIssue {
            problem_id: unit.problem_id.clone(),
            tests: unit.tests.clone(),
            case_index: None,
            kind: None,
            message,
        };
        let record = match ProblemRecord::load(&unit.problem) {
            Ok(record) => record,
            Err(err) => {
                report.issues.push(whole_file(err.to_string()));
                continue;
            }
        };
        let tests = match TestFile::load(&unit.tests) {
            Ok(loaded) => loaded.file,
            Err(err) => {
                report.issues.push(whole_file(err.to_string()));
                continue;
            }
        };
        let problem = record.signature();
        for (case_index, case) in tests.all_cases().iter().enumerate() {
            report.cases_checked += 1;
            if let Err(err) = dispatcher.prepare(&problem, &case.input) {
                report.issues.push(ValidationIssue {
                    problem_id: unit.problem_id.clone(),
                    tests: unit.tests.clone(),
                    case_index: Some(case_index),
                    kind: Some(err.kind()),
                    message: err.to_string(),
                });
            }
        }
    }
    tracing::info!(
        target: "pzl.batch",
        files = report.files_checked,
        cases = report.cases_checked,
        issues = report.issues.len(),
        "validation finished"
    );
    Ok(report)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeOutcome {
    pub tests: PathBuf,
    pub rewritten: usize,
    pub written: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rewrites named-mapping inputs in every selected test file to positional
/// form. Files are only touched when `write` is set and something changed.
pub fn normalize_suite(cfg: &BatchConfig, write: bool) -> Result<Vec<NormalizeOutcome>, BatchError> {
    let manifest = SuiteManifest::load(&cfg.manifest_path)?;
    let mut seen = BTreeSet::new();
    let mut outcomes = Vec::new();
    for unit in manifest.selected(&cfg.languages, &cfg.problems) {
        if !seen.insert(unit.tests.clone()) {
            continue;
        }
        let mut outcome = NormalizeOutcome {
            tests: unit.tests.clone(),
            rewritten: 0,
            written: false,
            error: None,
        };
        match normalize_one(unit, write) {
            Ok((rewritten, written)) => {
                outcome.rewritten = rewritten;
                outcome.written = written;
            }
            Err(err) => outcome.error = Some(err.to_string()),
        }
        outcomes.push(outcome);
    }
    Ok(outcomes)
}

fn normalize_one(unit: &UnitSpec, write: bool) -> Result<(usize, bool), BatchError> {
    let record = ProblemRecord::load(&unit.problem)?;
    let mut file = TestFile::load(&unit.tests)?.file;
    let rewritten = normalize_test_file(&mut file, &record.params)?;
    let written = write && rewritten > 0;
    if written {
        file.save(&unit.tests)?;
        tracing::info!(
            target: "pzl.batch",
            tests = %unit.tests.display(),
            rewritten,
            "normalized test file"
        );
    }
    Ok((rewritten, written))
}

/// Derives boundary inputs for one problem, records the reference
/// solution's outputs as expectations, and optionally appends them to the
/// problem's submit tests. Inputs already in the file are not repeated.
pub fn capture_boundary_cases(
    cfg: &BatchConfig,
    problem_id: &str,
    language: Language,
    write: bool,
) -> Result<CaptureReport, BatchError> {
    let manifest = SuiteManifest::load(&cfg.manifest_path)?;
    let unit = manifest
        .units
        .iter()
        .find(|unit| {
            unit.problem_id == problem_id && unit.language.parse::<Language>().is_ok_and(|parsed| parsed == language)
        })
        .ok_or_else(|| BatchError::UnknownUnit {
            problem_id: problem_id.to_string(),
            language: language.to_string(),
        })?;

    let record = ProblemRecord::load(&unit.problem)?;
    let mut file = TestFile::load(&unit.tests)?.file;
    let source = fs::read_to_string(&unit.solution).map_err(BatchError::io(&unit.solution))?;
    let dispatcher = Dispatcher::builtin();
    let problem = record.signature();
    let descriptor = dispatcher.descriptor(&problem.entry_point)?;

    let existing = file.all_cases();
    let inputs: Vec<_> = boundary_inputs_for(descriptor, &problem, &existing)?
        .into_iter()
        .filter(|input| existing.iter().all(|case| case.input != *input))
        .collect();
    let reference = ProcessCandidate::new(language, source)
        .with_label(format!("{problem_id}/{language}/reference"))
        .with_runtime(cfg.runtime(language).clone())
        .with_timeout(cfg.timeout);
    let report = capture_expectations(&dispatcher, &problem, &reference, &inputs);

    if write && !report.captured.is_empty() {
        file.submit_tests.extend(report.captured.iter().cloned());
        file.save(&unit.tests)?;
    }
    tracing::info!(
        target: "pzl.batch",
        problem_id,
        captured = report.captured.len(),
        rejected = report.rejected.len(),
        written = write && !report.captured.is_empty(),
        "boundary capture finished"
    );
    Ok(report)
}

pub fn write_summary(path: &Path, summary: &BatchSummary) -> Result<(), BatchError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(BatchError::io(parent))?;
    }
    let raw = serde_json::to_string_pretty(summary).map_err(BatchError::json(path))?;
    fs::write(path, raw).map_err(BatchError::io(path))
}

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}
