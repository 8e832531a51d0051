//! TRX outcome vocabulary and its mapping onto canonical outcomes

use crate::model::Outcome;

/// Every outcome value the TRX schema defines, paired with its canonical
/// outcome. Matching is exact; TRX writers emit these spellings verbatim.
pub const OUTCOME_TABLE: &[(&str, Outcome)] = &[
    ("Passed", Outcome::Passed),
    ("PassedButRunAborted", Outcome::Passed),
    ("Completed", Outcome::Passed),
    ("Warning", Outcome::Passed),
    ("Failed", Outcome::Failed),
    ("Error", Outcome::Error),
    ("Timeout", Outcome::Error),
    ("Aborted", Outcome::Error),
    ("Disconnected", Outcome::Error),
    ("NotExecuted", Outcome::Skipped),
    ("NotRunnable", Outcome::Skipped),
    ("Inconclusive", Outcome::Skipped),
    ("Pending", Outcome::Skipped),
    ("InProgress", Outcome::Skipped),
];

/// Result of looking a source outcome up in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeMapping {
    Known(Outcome),
    Unrecognized,
}

impl OutcomeMapping {
    /// Canonical outcome, with unrecognized values treated as errors
    pub fn outcome(&self) -> Outcome {
        match self {
            OutcomeMapping::Known(outcome) => *outcome,
            OutcomeMapping::Unrecognized => Outcome::Error,
        }
    }
}

/// Look up a TRX outcome string
pub fn map_outcome(source: &str) -> OutcomeMapping {
    OUTCOME_TABLE
        .iter()
        .find(|(name, _)| *name == source)
        .map(|(_, outcome)| OutcomeMapping::Known(*outcome))
        .unwrap_or(OutcomeMapping::Unrecognized)
}
