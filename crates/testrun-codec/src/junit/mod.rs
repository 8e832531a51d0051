//! JUnit XML serialization
//!
//! Every count and time attribute is recomputed from the report's cases.
//! The serialized bytes are re-validated before they are handed back, so a
//! successful return is always a well-formed, self-consistent document.

mod validate;

pub use validate::{validate_junit, JunitSummary};

use chrono::SecondsFormat;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::WriteError;
use crate::model::{Counts, Outcome, TestCase};
use crate::report::{Report, Suite};

const TAG_TEST_SUITES: &str = "testsuites";
const TAG_TEST_SUITE: &str = "testsuite";
const TAG_TEST_CASE: &str = "testcase";
const TAG_FAILURE: &str = "failure";
const TAG_ERROR: &str = "error";
const TAG_SKIPPED: &str = "skipped";
const TAG_SYSTEM_OUT: &str = "system-out";

/// Serialize a report to JUnit XML and validate the result.
pub fn to_junit_xml(report: &Report) -> Result<Vec<u8>, WriteError> {
    let bytes = serialize(report).map_err(|e| WriteError::io_failure(e.to_string()))?;
    validate_junit(&bytes)?;
    Ok(bytes)
}

fn serialize(report: &Report) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(TAG_TEST_SUITES);
    root.push_attribute(("name", sanitize(&report.name).as_str()));
    push_counts(&mut root, &report.counts());
    writer.write_event(Event::Start(root))?;

    for suite in &report.suites {
        write_suite(&mut writer, suite)?;
    }

    writer.write_event(Event::End(BytesEnd::new(TAG_TEST_SUITES)))?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_suite(writer: &mut Writer<Vec<u8>>, suite: &Suite) -> quick_xml::Result<()> {
    let mut start = BytesStart::new(TAG_TEST_SUITE);
    start.push_attribute(("name", sanitize(&suite.name).as_str()));
    push_counts(&mut start, &suite.counts());
    if let Some(timestamp) = suite.timestamp {
        let formatted = timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        start.push_attribute(("timestamp", formatted.as_str()));
    }

    if suite.cases.is_empty() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;
    for case in &suite.cases {
        write_case(writer, suite, case)?;
    }
    writer.write_event(Event::End(BytesEnd::new(TAG_TEST_SUITE)))
}

fn write_case(writer: &mut Writer<Vec<u8>>, suite: &Suite, case: &TestCase) -> quick_xml::Result<()> {
    let class_name = if case.class_name.is_empty() {
        suite.name.as_str()
    } else {
        case.class_name.as_str()
    };

    let mut start = BytesStart::new(TAG_TEST_CASE);
    start.push_attribute(("name", sanitize(&case.display_name()).as_str()));
    start.push_attribute(("classname", sanitize(class_name).as_str()));
    start.push_attribute(("time", format_seconds(case.duration_ms).as_str()));

    let has_status = case.outcome != Outcome::Passed;
    if !has_status && case.stdout.is_none() {
        return writer.write_event(Event::Empty(start));
    }

    writer.write_event(Event::Start(start))?;

    match case.outcome {
        Outcome::Passed => {}
        Outcome::Skipped => {
            let mut skipped = BytesStart::new(TAG_SKIPPED);
            skipped.push_attribute(("message", sanitize(&case.source_outcome).as_str()));
            writer.write_event(Event::Empty(skipped))?;
        }
        Outcome::Failed | Outcome::Error => {
            let tag = if case.outcome == Outcome::Failed {
                TAG_FAILURE
            } else {
                TAG_ERROR
            };
            let message = case
                .detail
                .as_ref()
                .map(|d| d.message.as_str())
                .unwrap_or_default();
            let mut status = BytesStart::new(tag);
            status.push_attribute(("message", sanitize(message).as_str()));
            status.push_attribute(("type", sanitize(&case.source_outcome).as_str()));

            match case.detail.as_ref().and_then(|d| d.stack_trace.as_deref()) {
                Some(trace) => {
                    writer.write_event(Event::Start(status))?;
                    writer.write_event(Event::Text(BytesText::new(&sanitize(trace))))?;
                    writer.write_event(Event::End(BytesEnd::new(tag)))?;
                }
                None => writer.write_event(Event::Empty(status))?,
            }
        }
    }

    if let Some(stdout) = &case.stdout {
        writer.write_event(Event::Start(BytesStart::new(TAG_SYSTEM_OUT)))?;
        writer.write_event(Event::Text(BytesText::new(&sanitize(stdout))))?;
        writer.write_event(Event::End(BytesEnd::new(TAG_SYSTEM_OUT)))?;
    }

    writer.write_event(Event::End(BytesEnd::new(TAG_TEST_CASE)))
}

fn push_counts(start: &mut BytesStart, counts: &Counts) {
    start.push_attribute(("tests", counts.total.to_string().as_str()));
    start.push_attribute(("failures", counts.failed.to_string().as_str()));
    start.push_attribute(("errors", counts.errors.to_string().as_str()));
    start.push_attribute(("skipped", counts.skipped.to_string().as_str()));
    start.push_attribute(("time", format_seconds(counts.duration_ms).as_str()));
}

/// Milliseconds as seconds with three decimals
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1_000, ms % 1_000)
}

/// Drop characters XML 1.0 cannot carry
fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|&c| {
            matches!(c, '\t' | '\n' | '\r')
                || ('\u{20}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || c >= '\u{10000}'
        })
        .collect()
}
