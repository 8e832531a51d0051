//! TRX (Visual Studio test results) reader
//!
//! Streams the document with quick-xml and builds a [`TestRun`]. Only the
//! elements needed for a report are interpreted; everything else is
//! skipped so newer TRX writers keep working.

mod duration;
mod outcome;

pub use duration::{parse_timespan_millis, parse_timespan_ticks, ticks_to_millis};
pub use outcome::{map_outcome, OutcomeMapping, OUTCOME_TABLE};

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::ParseError;
use crate::model::{compose_name, FailureDetail, TestCase, TestRun};

const TAG_TEST_RUN: &[u8] = b"TestRun";
const TAG_TIMES: &[u8] = b"Times";
const TAG_UNIT_TEST_RESULT: &[u8] = b"UnitTestResult";
const TAG_OUTPUT: &[u8] = b"Output";
const TAG_ERROR_INFO: &[u8] = b"ErrorInfo";
const TAG_STD_OUT: &[u8] = b"StdOut";
const TAG_MESSAGE: &[u8] = b"Message";
const TAG_STACK_TRACE: &[u8] = b"StackTrace";
const TAG_UNIT_TEST: &[u8] = b"UnitTest";
const TAG_TEST_METHOD: &[u8] = b"TestMethod";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Name used when the document carries no `TestRun@name`
pub const DEFAULT_RUN_NAME: &str = "TestRun";

/// Parse TRX bytes into a test run.
pub fn parse(bytes: &[u8]) -> Result<TestRun, ParseError> {
    parse_with_name(bytes, DEFAULT_RUN_NAME)
}

/// Parse TRX bytes, naming the run `fallback_name` when the document
/// does not name it.
pub fn parse_with_name(bytes: &[u8], fallback_name: &str) -> Result<TestRun, ParseError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut parser = TrxParser::default();
    parser.parse(bytes)?;
    parser.into_run(fallback_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    StdOut,
    Message,
    StackTrace,
}

/// A `UnitTestResult` as it appeared in the document
#[derive(Debug, Clone, Default)]
struct RawResult {
    offset: u64,
    test_id: Option<String>,
    test_name: Option<String>,
    outcome: Option<String>,
    duration: Option<String>,
    data_row: Option<String>,
    stdout: Option<String>,
    message: Option<String>,
    stack_trace: Option<String>,
    inner: Vec<RawResult>,
}

#[derive(Debug, Default)]
struct TrxParser {
    path: Vec<Vec<u8>>,
    seen_root: bool,
    run_name: Option<String>,
    start: Option<String>,
    finish: Option<String>,
    open_results: Vec<RawResult>,
    results: Vec<RawResult>,
    /// test id -> class name from `TestDefinitions`
    definitions: HashMap<String, String>,
    current_definition: Option<String>,
    capture: Option<(Capture, String)>,
}

impl TrxParser {
    fn parse(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        // captured text is kept verbatim
        let mut reader = Reader::from_reader(bytes);

        let mut buf = Vec::new();
        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ParseError::malformed(reader.buffer_position() as u64, e.to_string()))?;
            let offset = reader.buffer_position() as u64;

            match event {
                Event::Eof => break,
                Event::Start(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    self.open(&name, &e, offset)?;
                    self.path.push(name);
                }
                Event::Empty(e) => {
                    let name = e.local_name().as_ref().to_vec();
                    self.open(&name, &e, offset)?;
                    self.close(&name);
                }
                Event::End(e) => {
                    self.path.pop();
                    self.close(e.local_name().as_ref());
                }
                Event::Text(e) => {
                    if let Some((_, text)) = self.capture.as_mut() {
                        let value = e
                            .unescape()
                            .map_err(|err| ParseError::malformed(offset, err.to_string()))?;
                        text.push_str(&value);
                    }
                }
                Event::CData(e) => {
                    if let Some((_, text)) = self.capture.as_mut() {
                        let value = std::str::from_utf8(&e)
                            .map_err(|err| ParseError::malformed(offset, err.to_string()))?;
                        text.push_str(value);
                    }
                }
                _ => (),
            }
            buf.clear();
        }

        let end = reader.buffer_position() as u64;
        if let Some(open) = self.path.last() {
            return Err(ParseError::malformed(
                end,
                format!(
                    "unexpected end of document inside <{}>",
                    String::from_utf8_lossy(open)
                ),
            ));
        }
        if !self.seen_root {
            return Err(ParseError::malformed(end, "document has no TestRun element"));
        }
        Ok(())
    }

    fn parent(&self) -> Option<&[u8]> {
        self.path.last().map(|p| p.as_slice())
    }

    fn open(&mut self, name: &[u8], e: &BytesStart, offset: u64) -> Result<(), ParseError> {
        if self.path.is_empty() {
            if name != TAG_TEST_RUN {
                return Err(ParseError::malformed(
                    offset,
                    format!(
                        "root element is <{}>, expected <TestRun>",
                        String::from_utf8_lossy(name)
                    ),
                ));
            }
            self.seen_root = true;
            self.run_name = parse_attr::string(e, "name", offset)?;
            return Ok(());
        }

        match name {
            TAG_TIMES if self.parent() == Some(TAG_TEST_RUN) => {
                self.start = parse_attr::string(e, "start", offset)?;
                self.finish = parse_attr::string(e, "finish", offset)?;
            }
            TAG_UNIT_TEST_RESULT => {
                self.open_results.push(RawResult {
                    offset,
                    test_id: parse_attr::string(e, "testId", offset)?,
                    test_name: parse_attr::string(e, "testName", offset)?,
                    outcome: parse_attr::string(e, "outcome", offset)?,
                    duration: parse_attr::string(e, "duration", offset)?,
                    data_row: parse_attr::string(e, "dataRowInfo", offset)?,
                    ..RawResult::default()
                });
            }
            TAG_STD_OUT if self.parent() == Some(TAG_OUTPUT) => self.start_capture(Capture::StdOut),
            TAG_MESSAGE if self.parent() == Some(TAG_ERROR_INFO) => {
                self.start_capture(Capture::Message)
            }
            TAG_STACK_TRACE if self.parent() == Some(TAG_ERROR_INFO) => {
                self.start_capture(Capture::StackTrace)
            }
            TAG_UNIT_TEST => {
                self.current_definition = parse_attr::string(e, "id", offset)?;
            }
            TAG_TEST_METHOD => {
                if let Some(id) = self.current_definition.clone() {
                    if let Some(class_name) = parse_attr::string(e, "className", offset)? {
                        self.definitions.insert(id, strip_assembly(&class_name));
                    }
                }
            }
            _ => (),
        }
        Ok(())
    }

    fn start_capture(&mut self, capture: Capture) {
        if !self.open_results.is_empty() {
            self.capture = Some((capture, String::new()));
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            TAG_UNIT_TEST_RESULT => {
                if let Some(result) = self.open_results.pop() {
                    match self.open_results.last_mut() {
                        Some(parent) => parent.inner.push(result),
                        None => self.results.push(result),
                    }
                }
            }
            TAG_STD_OUT | TAG_MESSAGE | TAG_STACK_TRACE => {
                if let (Some((capture, text)), Some(result)) =
                    (self.capture.take(), self.open_results.last_mut())
                {
                    match capture {
                        Capture::StdOut => result.stdout = Some(text),
                        Capture::Message => result.message = Some(text),
                        Capture::StackTrace => result.stack_trace = Some(text),
                    }
                }
            }
            TAG_UNIT_TEST => self.current_definition = None,
            _ => (),
        }
    }

    fn into_run(self, fallback_name: &str) -> Result<TestRun, ParseError> {
        let mut flat = Vec::new();
        for result in self.results {
            flatten(result, &mut flat);
        }

        let mut cases = Vec::with_capacity(flat.len());
        let mut seen = HashSet::new();
        for raw in flat {
            let offset = raw.offset;
            let case = build_case(raw, &self.definitions)?;
            if !seen.insert(case.name.clone()) {
                return Err(ParseError::duplicate_case(offset, &case.name));
            }
            cases.push(case);
        }

        let start = self
            .start
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok());
        let finish = self
            .finish
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok());

        let duration_ms = match (start, finish) {
            (Some(start), Some(finish)) => (finish - start)
                .num_microseconds()
                .map(|us| (us.max(0) as u64 + 500) / 1_000)
                .unwrap_or(0),
            _ => cases.iter().map(|c| c.duration_ms).sum(),
        };

        debug!(cases = cases.len(), "parsed TRX document");

        Ok(TestRun {
            name: self
                .run_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| fallback_name.to_string()),
            start,
            duration_ms,
            cases,
        })
    }
}

/// Replace data-driven parents by their inner rows, inheriting identity
fn flatten(result: RawResult, out: &mut Vec<RawResult>) {
    if result.inner.is_empty() {
        out.push(result);
        return;
    }
    let RawResult {
        test_id,
        test_name,
        inner,
        ..
    } = result;
    for mut row in inner {
        if row.test_id.is_none() {
            row.test_id = test_id.clone();
        }
        if row.test_name.is_none() {
            row.test_name = test_name.clone();
        }
        flatten(row, out);
    }
}

fn build_case(raw: RawResult, definitions: &HashMap<String, String>) -> Result<TestCase, ParseError> {
    let test_name = raw
        .test_name
        .ok_or_else(|| ParseError::malformed(raw.offset, "UnitTestResult without testName"))?;

    let (base, signature) = split_signature(&test_name);
    let parameters = signature
        .map(str::to_string)
        .or_else(|| raw.data_row.as_ref().map(|row| format!("[row {}]", row)));

    let class_name = raw
        .test_id
        .as_ref()
        .and_then(|id| definitions.get(id))
        .cloned()
        .unwrap_or_else(|| {
            base.rsplit_once('.')
                .map(|(class, _)| class.to_string())
                .unwrap_or_default()
        });

    let method_name = if class_name.is_empty() {
        base.to_string()
    } else {
        base.strip_prefix(class_name.as_str())
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(base)
            .to_string()
    };

    let duration_ms = match raw.duration.as_deref() {
        Some(value) => parse_timespan_millis(value).ok_or_else(|| {
            ParseError::malformed(raw.offset, format!("invalid duration '{}'", value))
        })?,
        None => 0,
    };

    let source_outcome = raw.outcome.unwrap_or_default();
    let detail = match (raw.message, raw.stack_trace) {
        (None, None) => None,
        (message, stack_trace) => Some(FailureDetail {
            message: message.unwrap_or_default(),
            stack_trace,
        }),
    };

    Ok(TestCase {
        name: compose_name(&class_name, &method_name, parameters.as_deref()),
        class_name,
        method_name,
        parameters,
        outcome: map_outcome(&source_outcome).outcome(),
        source_outcome,
        duration_ms,
        detail,
        stdout: raw.stdout,
    })
}

/// Split `Add(a: 1, b: 2)` into `("Add", Some("(a: 1, b: 2)"))`
fn split_signature(test_name: &str) -> (&str, Option<&str>) {
    let trimmed = test_name.trim();
    if trimmed.ends_with(')') {
        if let Some(idx) = trimmed.find('(') {
            return (trimmed[..idx].trim_end(), Some(&trimmed[idx..]));
        }
    }
    (trimmed, None)
}

/// `Ns.Class, Assembly, Version=1.0` -> `Ns.Class`
fn strip_assembly(class_name: &str) -> String {
    class_name
        .split(',')
        .next()
        .unwrap_or(class_name)
        .trim()
        .to_string()
}

mod parse_attr {
    use quick_xml::events::BytesStart;

    use crate::error::ParseError;

    pub fn string(e: &BytesStart, name: &str, offset: u64) -> Result<Option<String>, ParseError> {
        let attr = e
            .try_get_attribute(name)
            .map_err(|err| ParseError::malformed(offset, err.to_string()))?;
        match attr {
            Some(attr) => attr
                .unescape_value()
                .map(|v| Some(v.into_owned()))
                .map_err(|err| ParseError::malformed(offset, err.to_string())),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;
    use crate::model::Outcome;

    const HEADER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<TestRun id="1" name="ci@agent 2024-05-01 10:00:00" xmlns="http://microsoft.com/schemas/VisualStudio/TeamTest/2010">
  <Times creation="2024-05-01T10:00:00.0000000+00:00" start="2024-05-01T10:00:00.0000000+00:00" finish="2024-05-01T10:00:02.5000000+00:00" />"#;

    fn doc(results: &str, definitions: &str) -> String {
        format!(
            "{}\n<Results>{}</Results>\n<TestDefinitions>{}</TestDefinitions>\n</TestRun>",
            HEADER, results, definitions
        )
    }

    #[test]
    fn test_parse_basic_run() {
        let xml = doc(
            r#"<UnitTestResult testId="t1" testName="Adds" outcome="Passed" duration="00:00:00.0015000" />
               <UnitTestResult testId="t2" testName="Divides" outcome="Failed" duration="00:00:00.0100000">
                 <Output><ErrorInfo><Message>Assert.Equal() Failure</Message><StackTrace>at Calc.Divides()</StackTrace></ErrorInfo></Output>
               </UnitTestResult>"#,
            r#"<UnitTest name="Adds" id="t1"><TestMethod className="Calc.Tests, Calc.Tests, Version=1.0.0.0" name="Adds" /></UnitTest>
               <UnitTest name="Divides" id="t2"><TestMethod className="Calc.Tests" name="Divides" /></UnitTest>"#,
        );

        let run = parse(xml.as_bytes()).unwrap();
        assert_eq!(run.name, "ci@agent 2024-05-01 10:00:00");
        assert_eq!(run.duration_ms, 2_500);
        assert!(run.start.is_some());
        assert_eq!(run.cases.len(), 2);

        let adds = &run.cases[0];
        assert_eq!(adds.name, "Calc.Tests.Adds");
        assert_eq!(adds.class_name, "Calc.Tests");
        assert_eq!(adds.outcome, Outcome::Passed);
        assert_eq!(adds.duration_ms, 2);

        let divides = &run.cases[1];
        assert_eq!(divides.outcome, Outcome::Failed);
        let detail = divides.detail.as_ref().unwrap();
        assert_eq!(detail.message, "Assert.Equal() Failure");
        assert_eq!(detail.stack_trace.as_deref(), Some("at Calc.Divides()"));
    }

    #[test]
    fn test_preserves_result_order() {
        let xml = doc(
            r#"<UnitTestResult testName="N.C.zeta" outcome="Passed" />
               <UnitTestResult testName="N.C.alpha" outcome="Passed" />
               <UnitTestResult testName="N.C.mid" outcome="Passed" />"#,
            "",
        );
        let run = parse(xml.as_bytes()).unwrap();
        let names: Vec<_> = run.cases.iter().map(|c| c.method_name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parameterized_cases_are_disambiguated() {
        let xml = doc(
            r#"<UnitTestResult testId="t1" testName="Calc.Tests.Add(a: 1, b: 2)" outcome="Passed" />
               <UnitTestResult testId="t1" testName="Calc.Tests.Add(a: 3, b: 4)" outcome="Passed" />"#,
            r#"<UnitTest id="t1"><TestMethod className="Calc.Tests" name="Add" /></UnitTest>"#,
        );
        let run = parse(xml.as_bytes()).unwrap();
        assert_eq!(run.cases[0].name, "Calc.Tests.Add(a: 1, b: 2)");
        assert_eq!(run.cases[1].name, "Calc.Tests.Add(a: 3, b: 4)");
        assert_eq!(run.cases[0].method_name, "Add");
        assert_eq!(run.cases[1].parameters.as_deref(), Some("(a: 3, b: 4)"));
    }

    #[test]
    fn test_data_driven_inner_results_replace_parent() {
        let xml = doc(
            r#"<UnitTestResult testId="t1" testName="Multiply" outcome="Failed" resultType="DataDrivenTest">
                 <InnerResults>
                   <UnitTestResult testId="t1" testName="Multiply" outcome="Passed" dataRowInfo="1" resultType="DataDrivenDataRow" />
                   <UnitTestResult testId="t1" testName="Multiply" outcome="Failed" dataRowInfo="2" resultType="DataDrivenDataRow" />
                 </InnerResults>
               </UnitTestResult>"#,
            r#"<UnitTest id="t1"><TestMethod className="Calc.Tests" name="Multiply" /></UnitTest>"#,
        );
        let run = parse(xml.as_bytes()).unwrap();
        assert_eq!(run.cases.len(), 2);
        assert_eq!(run.cases[0].name, "Calc.Tests.Multiply[row 1]");
        assert_eq!(run.cases[1].name, "Calc.Tests.Multiply[row 2]");
        assert_eq!(run.cases[1].outcome, Outcome::Failed);
    }

    #[test]
    fn test_duplicate_case_is_rejected() {
        let xml = doc(
            r#"<UnitTestResult testName="N.C.Same" outcome="Passed" />
               <UnitTestResult testName="N.C.Same" outcome="Failed" />"#,
            "",
        );
        let err = parse(xml.as_bytes()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::DuplicateCase);
        assert!(err.message.contains("N.C.Same"));
    }

    #[test]
    fn test_truncated_document_is_malformed() {
        let xml = doc(r#"<UnitTestResult testName="A" outcome="Passed" />"#, "");
        let truncated = &xml.as_bytes()[..xml.len() / 2];
        let err = parse(truncated).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Malformed);
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let err = parse(b"<TestRun><Results></TestRun></Results>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Malformed);
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let err = parse(b"<testsuites></testsuites>").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Malformed);
        assert!(err.message.contains("testsuites"));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        let err = parse(b"").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Malformed);
    }

    #[test]
    fn test_invalid_duration_is_malformed() {
        let xml = doc(r#"<UnitTestResult testName="A" outcome="Passed" duration="soon" />"#, "");
        let err = parse(xml.as_bytes()).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Malformed);
        assert!(err.message.contains("soon"));
    }

    #[test]
    fn test_unknown_elements_are_ignored() {
        let xml = doc(
            r#"<UnitTestResult testName="N.C.A" outcome="Passed" futureAttr="x">
                 <FutureElement><Nested>text</Nested></FutureElement>
                 <Output><StdOut>hello</StdOut><DebugTrace>ignored</DebugTrace></Output>
               </UnitTestResult>
               <SomethingNew />"#,
            "",
        );
        let run = parse(xml.as_bytes()).unwrap();
        assert_eq!(run.cases.len(), 1);
        assert_eq!(run.cases[0].stdout.as_deref(), Some("hello"));
    }

    #[test]
    fn test_unknown_outcome_maps_to_error() {
        let xml = doc(r#"<UnitTestResult testName="N.C.A" outcome="Exploded" />"#, "");
        let run = parse(xml.as_bytes()).unwrap();
        assert_eq!(run.cases[0].outcome, Outcome::Error);
        assert_eq!(run.cases[0].source_outcome, "Exploded");
    }

    #[test]
    fn test_fallback_name_and_summed_duration() {
        let xml = r#"<TestRun><Results>
            <UnitTestResult testName="A" outcome="Passed" duration="00:00:00.0040000" />
            <UnitTestResult testName="B" outcome="Passed" duration="00:00:00.0060000" />
        </Results></TestRun>"#;
        let run = parse_with_name(xml.as_bytes(), "nightly").unwrap();
        assert_eq!(run.name, "nightly");
        assert_eq!(run.duration_ms, 10);
        assert_eq!(run.cases[0].name, "A");
        assert_eq!(run.cases[0].class_name, "");
    }

    #[test]
    fn test_byte_order_mark_is_accepted() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<TestRun name=\"bom\"></TestRun>");
        let run = parse(&bytes).unwrap();
        assert_eq!(run.name, "bom");
        assert!(run.cases.is_empty());
    }

    #[test]
    fn test_cdata_and_entities_in_messages() {
        let xml = doc(
            r#"<UnitTestResult testName="N.C.A" outcome="Failed">
                 <Output><ErrorInfo><Message>expected &lt;1&gt;</Message><StackTrace><![CDATA[at A() <here>]]></StackTrace></ErrorInfo></Output>
               </UnitTestResult>"#,
            "",
        );
        let run = parse(xml.as_bytes()).unwrap();
        let detail = run.cases[0].detail.as_ref().unwrap();
        assert_eq!(detail.message, "expected <1>");
        assert_eq!(detail.stack_trace.as_deref(), Some("at A() <here>"));
    }

    #[test]
    fn test_captured_text_keeps_surrounding_whitespace() {
        let xml = doc(
            "<UnitTestResult testName=\"N.C.A\" outcome=\"Failed\">\
             <Output><StdOut>  indented line\n</StdOut><ErrorInfo>\
             <Message>expected: x </Message>\
             <StackTrace>   at N.C.A() in a.cs:line 1\n   at Runner.Invoke()</StackTrace>\
             </ErrorInfo></Output></UnitTestResult>",
            "",
        );
        let run = parse(xml.as_bytes()).unwrap();
        let case = &run.cases[0];
        assert_eq!(case.stdout.as_deref(), Some("  indented line\n"));
        let detail = case.detail.as_ref().unwrap();
        assert_eq!(detail.message, "expected: x ");
        assert_eq!(
            detail.stack_trace.as_deref(),
            Some("   at N.C.A() in a.cs:line 1\n   at Runner.Invoke()")
        );
    }

    #[test]
    fn test_split_signature() {
        assert_eq!(split_signature("Add(1, 2)"), ("Add", Some("(1, 2)")));
        assert_eq!(split_signature("Add (1,2)"), ("Add", Some("(1,2)")));
        assert_eq!(split_signature("Plain"), ("Plain", None));
        assert_eq!(split_signature("Odd(name"), ("Odd(name", None));
    }
}
