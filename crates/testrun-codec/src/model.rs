//! Canonical test-run model shared by the reader, normalizer and writer.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical four-value outcome, independent of the source vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl Outcome {
    /// Whether a failure detail must accompany this outcome
    pub fn requires_detail(&self) -> bool {
        matches!(self, Outcome::Failed | Outcome::Error)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Skipped => write!(f, "skipped"),
            Outcome::Error => write!(f, "error"),
        }
    }
}

/// Message and trace attached to a failed or errored case.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FailureDetail {
    pub message: String,
    pub stack_trace: Option<String>,
}

impl FailureDetail {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: None,
        }
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }
}

/// One test method or parameterized invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    /// Fully-qualified name, unique within its run
    pub name: String,
    pub class_name: String,
    pub method_name: String,
    /// Parameter signature such as `(a: 1, b: 2)` or `[row 3]`
    pub parameters: Option<String>,
    pub outcome: Outcome,
    /// Outcome exactly as the source log spelled it
    pub source_outcome: String,
    pub duration_ms: u64,
    pub detail: Option<FailureDetail>,
    pub stdout: Option<String>,
}

impl TestCase {
    /// Build a case whose name is composed from class, method and parameters.
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        parameters: Option<String>,
        outcome: Outcome,
    ) -> Self {
        let class_name = class_name.into();
        let method_name = method_name.into();
        let name = compose_name(&class_name, &method_name, parameters.as_deref());
        Self {
            name,
            class_name,
            method_name,
            parameters,
            outcome,
            source_outcome: outcome_source_default(outcome).to_string(),
            duration_ms: 0,
            detail: None,
            stdout: None,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_detail(mut self, detail: FailureDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_source_outcome(mut self, source: impl Into<String>) -> Self {
        self.source_outcome = source.into();
        self
    }

    /// Name as shown in a report: the method plus its parameter signature.
    pub fn display_name(&self) -> String {
        match &self.parameters {
            Some(params) => format!("{}{}", self.method_name, params),
            None => self.method_name.clone(),
        }
    }
}

fn outcome_source_default(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Passed => "Passed",
        Outcome::Failed => "Failed",
        Outcome::Skipped => "NotExecuted",
        Outcome::Error => "Error",
    }
}

/// Join class, method and parameter signature into a fully-qualified name.
pub fn compose_name(class_name: &str, method_name: &str, parameters: Option<&str>) -> String {
    let params = parameters.unwrap_or("");
    if class_name.is_empty() {
        format!("{}{}", method_name, params)
    } else {
        format!("{}.{}{}", class_name, method_name, params)
    }
}

/// One execution of a test project or assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub name: String,
    pub start: Option<DateTime<FixedOffset>>,
    /// Wall-clock length of the run. Report times never use it; they are
    /// summed from the cases. The driver reports it per file.
    pub duration_ms: u64,
    pub cases: Vec<TestCase>,
}

impl TestRun {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: None,
            duration_ms: 0,
            cases: Vec::new(),
        }
    }

    pub fn with_cases(mut self, cases: Vec<TestCase>) -> Self {
        self.cases = cases;
        self
    }

    /// Tally outcomes directly from the cases
    pub fn counts(&self) -> Counts {
        Counts::tally(&self.cases)
    }
}

/// Aggregate counts, always derived from a sequence of cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl Counts {
    pub fn tally<'a>(cases: impl IntoIterator<Item = &'a TestCase>) -> Self {
        let mut counts = Counts::default();
        for case in cases {
            counts.add(case);
        }
        counts
    }

    fn add(&mut self, case: &TestCase) {
        self.total += 1;
        self.duration_ms = self.duration_ms.saturating_add(case.duration_ms);
        match case.outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Error => self.errors += 1,
            Outcome::Skipped => self.skipped += 1,
        }
    }

    /// Sum of two tallies
    pub fn combine(self, other: Counts) -> Counts {
        Counts {
            total: self.total + other.total,
            passed: self.passed + other.passed,
            failed: self.failed + other.failed,
            errors: self.errors + other.errors,
            skipped: self.skipped + other.skipped,
            duration_ms: self.duration_ms.saturating_add(other.duration_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_name_with_class_and_parameters() {
        assert_eq!(
            compose_name("Ns.CalcTests", "Add", Some("(a: 1, b: 2)")),
            "Ns.CalcTests.Add(a: 1, b: 2)"
        );
        assert_eq!(compose_name("", "Add", None), "Add");
    }

    #[test]
    fn test_counts_tally() {
        let cases = vec![
            TestCase::new("C", "a", None, Outcome::Passed).with_duration_ms(5),
            TestCase::new("C", "b", None, Outcome::Failed).with_duration_ms(7),
            TestCase::new("C", "c", None, Outcome::Skipped),
            TestCase::new("C", "d", None, Outcome::Error),
        ];
        let counts = Counts::tally(&cases);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.passed, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.errors, 1);
        assert_eq!(counts.duration_ms, 12);
    }

    #[test]
    fn test_display_name_includes_parameters() {
        let case = TestCase::new("C", "Add", Some("(1,2)".to_string()), Outcome::Passed);
        assert_eq!(case.display_name(), "Add(1,2)");
        assert_eq!(case.name, "C.Add(1,2)");
    }

    #[test]
    fn test_outcome_requires_detail() {
        assert!(Outcome::Failed.requires_detail());
        assert!(Outcome::Error.requires_detail());
        assert!(!Outcome::Passed.requires_detail());
        assert!(!Outcome::Skipped.requires_detail());
    }
}
