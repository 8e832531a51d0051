//! Suite-based report assembled from one or more test runs

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::model::{Counts, TestCase, TestRun};

/// How cases are grouped into suites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteGrouping {
    /// One suite per test run
    #[default]
    Run,
    /// One suite per test class, in first-seen order
    Class,
}

impl FromStr for SuiteGrouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(SuiteGrouping::Run),
            "class" => Ok(SuiteGrouping::Class),
            other => Err(format!("unknown suite grouping '{}' (expected run or class)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suite {
    pub name: String,
    pub timestamp: Option<DateTime<FixedOffset>>,
    pub cases: Vec<TestCase>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timestamp: None,
            cases: Vec::new(),
        }
    }

    /// Counts recomputed from the suite's cases
    pub fn counts(&self) -> Counts {
        Counts::tally(&self.cases)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub name: String,
    pub suites: Vec<Suite>,
}

impl Report {
    /// Report for a single run
    pub fn from_run(run: TestRun, grouping: SuiteGrouping) -> Self {
        let name = run.name.clone();
        Self::merged(name, vec![run], grouping)
    }

    /// Report combining several runs, in the order given
    pub fn merged(name: impl Into<String>, runs: Vec<TestRun>, grouping: SuiteGrouping) -> Self {
        let mut suites: Vec<Suite> = Vec::new();
        for run in runs {
            match grouping {
                SuiteGrouping::Run => suites.push(Suite {
                    name: run.name,
                    timestamp: run.start,
                    cases: run.cases,
                }),
                SuiteGrouping::Class => {
                    for case in run.cases {
                        let suite_name = if case.class_name.is_empty() {
                            run.name.clone()
                        } else {
                            case.class_name.clone()
                        };
                        match suites.iter_mut().find(|s| s.name == suite_name) {
                            Some(suite) => suite.cases.push(case),
                            None => suites.push(Suite {
                                name: suite_name,
                                timestamp: run.start,
                                cases: vec![case],
                            }),
                        }
                    }
                }
            }
        }
        Self {
            name: name.into(),
            suites,
        }
    }

    /// Counts across every suite
    pub fn counts(&self) -> Counts {
        self.suites
            .iter()
            .map(Suite::counts)
            .fold(Counts::default(), Counts::combine)
    }

    pub fn cases(&self) -> impl Iterator<Item = &TestCase> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Outcome;

    fn run(name: &str, cases: &[(&str, &str, Outcome)]) -> TestRun {
        TestRun::new(name).with_cases(
            cases
                .iter()
                .map(|(class, method, outcome)| TestCase::new(*class, *method, None, *outcome))
                .collect(),
        )
    }

    #[test]
    fn test_run_grouping_keeps_one_suite_per_run() {
        let a = run("a", &[("X", "one", Outcome::Passed), ("Y", "two", Outcome::Failed)]);
        let b = run("b", &[("X", "three", Outcome::Skipped)]);
        let report = Report::merged("all", vec![a, b], SuiteGrouping::Run);
        assert_eq!(report.suites.len(), 2);
        assert_eq!(report.suites[0].name, "a");
        assert_eq!(report.suites[1].counts().skipped, 1);
        assert_eq!(report.counts().total, 3);
    }

    #[test]
    fn test_class_grouping_merges_across_runs() {
        let a = run("a", &[("X", "one", Outcome::Passed), ("Y", "two", Outcome::Failed)]);
        let b = run("b", &[("X", "three", Outcome::Passed), ("", "loose", Outcome::Passed)]);
        let report = Report::merged("all", vec![a, b], SuiteGrouping::Class);
        let names: Vec<_> = report.suites.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "b"]);
        assert_eq!(report.suites[0].cases.len(), 2);
        assert_eq!(report.suites[0].cases[1].method_name, "three");
    }

    #[test]
    fn test_counts_ignore_nothing_but_cases() {
        let mut a = run("a", &[("X", "one", Outcome::Passed)]);
        a.duration_ms = 99_999;
        let report = Report::from_run(a, SuiteGrouping::Run);
        assert_eq!(report.counts().duration_ms, 0);
        assert_eq!(report.counts().passed, 1);
    }

    #[test]
    fn test_grouping_from_str() {
        assert_eq!("run".parse::<SuiteGrouping>().unwrap(), SuiteGrouping::Run);
        assert_eq!("class".parse::<SuiteGrouping>().unwrap(), SuiteGrouping::Class);
        assert!("suite".parse::<SuiteGrouping>().is_err());
    }
}
