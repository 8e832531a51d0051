//! Outcome and failure-detail normalization
//!
//! `normalize` is total: every input run yields a run whose cases carry a
//! canonical outcome and satisfy the detail invariant (a detail exists
//! exactly when the outcome is Failed or Error).

use tracing::debug;

use crate::model::{FailureDetail, Outcome, TestCase, TestRun};
use crate::trx::{map_outcome, OutcomeMapping};

/// Default cap on message and stack trace length, in characters
pub const DEFAULT_MAX_DETAIL_LENGTH: usize = 8_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub max_detail_length: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_detail_length: DEFAULT_MAX_DETAIL_LENGTH,
        }
    }
}

impl NormalizeOptions {
    pub fn with_max_detail_length(max_detail_length: usize) -> Self {
        Self { max_detail_length }
    }
}

/// Normalize every case of a run.
pub fn normalize(mut run: TestRun, options: &NormalizeOptions) -> TestRun {
    for case in run.cases.iter_mut() {
        normalize_case(case, options);
    }
    run
}

fn normalize_case(case: &mut TestCase, options: &NormalizeOptions) {
    match map_outcome(&case.source_outcome) {
        OutcomeMapping::Known(outcome) => case.outcome = outcome,
        OutcomeMapping::Unrecognized => {
            debug!(case = %case.name, outcome = %case.source_outcome, "unrecognized outcome");
            let note = format!("unrecognized outcome '{}'", case.source_outcome);
            case.outcome = Outcome::Error;
            case.detail = Some(match case.detail.take() {
                Some(detail) if detail.message.starts_with(&note) => detail,
                Some(mut detail) if !detail.message.is_empty() => {
                    detail.message = format!("{}: {}", note, detail.message);
                    detail
                }
                Some(detail) => FailureDetail {
                    message: note,
                    stack_trace: detail.stack_trace,
                },
                None => FailureDetail::new(note),
            });
        }
    }

    if case.outcome.requires_detail() {
        if case.detail.is_none() {
            case.detail = Some(FailureDetail::new(format!(
                "test reported outcome '{}' without failure details",
                case.source_outcome
            )));
        }
    } else {
        case.detail = None;
    }

    if let Some(detail) = case.detail.as_mut() {
        detail.message = truncate_detail(&detail.message, options.max_detail_length);
        detail.stack_trace = detail
            .stack_trace
            .take()
            .map(|trace| truncate_detail(&trace, options.max_detail_length));
    }
}

const TRUNCATION_PREFIX: &str = "... [truncated ";
const TRUNCATION_SUFFIX: &str = " chars]";

/// Keep the first `max_chars` characters and append a marker naming how
/// many were dropped. Text at or under the limit, or already cut to it,
/// is returned unchanged.
pub fn truncate_detail(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars || is_truncated_within(text, max_chars) {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{}{}{}{}", head, TRUNCATION_PREFIX, total - max_chars, TRUNCATION_SUFFIX)
}

/// A head of at most `max_chars` followed by a truncation marker
fn is_truncated_within(text: &str, max_chars: usize) -> bool {
    let Some(rest) = text.strip_suffix(TRUNCATION_SUFFIX) else {
        return false;
    };
    let Some(idx) = rest.rfind(TRUNCATION_PREFIX) else {
        return false;
    };
    let count = &rest[idx + TRUNCATION_PREFIX.len()..];
    !count.is_empty()
        && count.bytes().all(|b| b.is_ascii_digit())
        && rest[..idx].chars().count() <= max_chars
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(source: &str) -> TestCase {
        TestCase::new("C", "m", None, Outcome::Passed).with_source_outcome(source)
    }

    #[test]
    fn test_vocabulary_is_mapped() {
        let run = TestRun::new("r").with_cases(vec![
            case("Passed"),
            case("Failed"),
            case("NotExecuted"),
            case("Inconclusive"),
            case("Timeout"),
        ]);
        let run = normalize(run, &NormalizeOptions::default());
        let outcomes: Vec<_> = run.cases.iter().map(|c| c.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Passed,
                Outcome::Failed,
                Outcome::Skipped,
                Outcome::Skipped,
                Outcome::Error
            ]
        );
    }

    #[test]
    fn test_unknown_outcome_gets_error_and_note() {
        let run = TestRun::new("r").with_cases(vec![case("Exploded")]);
        let run = normalize(run, &NormalizeOptions::default());
        let case = &run.cases[0];
        assert_eq!(case.outcome, Outcome::Error);
        assert_eq!(
            case.detail.as_ref().unwrap().message,
            "unrecognized outcome 'Exploded'"
        );
    }

    #[test]
    fn test_unknown_outcome_keeps_existing_message() {
        let run = TestRun::new("r").with_cases(vec![
            case("Weird").with_detail(FailureDetail::new("boom").with_stack_trace("at x"))
        ]);
        let run = normalize(run, &NormalizeOptions::default());
        let detail = run.cases[0].detail.as_ref().unwrap();
        assert_eq!(detail.message, "unrecognized outcome 'Weird': boom");
        assert_eq!(detail.stack_trace.as_deref(), Some("at x"));
    }

    #[test]
    fn test_failure_without_detail_gets_synthetic_detail() {
        let run = TestRun::new("r").with_cases(vec![case("Failed")]);
        let run = normalize(run, &NormalizeOptions::default());
        let detail = run.cases[0].detail.as_ref().unwrap();
        assert!(detail.message.contains("'Failed'"));
    }

    #[test]
    fn test_passed_case_loses_detail() {
        let run = TestRun::new("r")
            .with_cases(vec![case("Passed").with_detail(FailureDetail::new("stale"))]);
        let run = normalize(run, &NormalizeOptions::default());
        assert!(run.cases[0].detail.is_none());
    }

    #[test]
    fn test_detail_is_truncated() {
        let long = "x".repeat(100);
        let run = TestRun::new("r").with_cases(vec![
            case("Failed").with_detail(FailureDetail::new(long.clone()).with_stack_trace(long))
        ]);
        let run = normalize(run, &NormalizeOptions::with_max_detail_length(10));
        let detail = run.cases[0].detail.as_ref().unwrap();
        assert_eq!(detail.message, "xxxxxxxxxx... [truncated 90 chars]");
        assert_eq!(
            detail.stack_trace.as_deref(),
            Some("xxxxxxxxxx... [truncated 90 chars]")
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_detail("héllo wörld", 4), "héll... [truncated 7 chars]");
        assert_eq!(truncate_detail("short", 5), "short");
        assert_eq!(truncate_detail("", 0), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let run = TestRun::new("r").with_cases(vec![case("Failed"), case("Mystery"), case("Passed")]);
        let options = NormalizeOptions::default();
        let once = normalize(run, &options);
        let twice = normalize(once.clone(), &options);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_truncated_detail_is_not_cut_again() {
        let long = "y".repeat(300);
        let run = TestRun::new("r").with_cases(vec![
            case("Failed").with_detail(FailureDetail::new(long.clone()).with_stack_trace(long))
        ]);
        let options = NormalizeOptions::with_max_detail_length(64);
        let once = normalize(run, &options);
        let twice = normalize(once.clone(), &options);
        assert_eq!(once, twice);
        assert!(twice.cases[0].detail.as_ref().unwrap().message.ends_with("[truncated 236 chars]"));
    }

    #[test]
    fn test_marker_lookalike_past_limit_is_truncated() {
        let text = format!("{}... [truncated 3 chars]", "z".repeat(20));
        assert_eq!(truncate_detail(&text, 10), format!("{}... [truncated 33 chars]", "z".repeat(10)));
        assert_eq!(truncate_detail(&text, 20), text);
    }
}
