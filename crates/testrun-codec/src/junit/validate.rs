//! Structural validation of JUnit XML documents
//!
//! Checks well-formedness, required attributes, and that every declared
//! count matches a recount of the child elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::WriteError;

const REQUIRED_SUITE_ATTRS: &[&str] = &["name", "tests", "failures", "errors", "skipped", "time"];
const REQUIRED_CASE_ATTRS: &[&str] = &["name", "classname", "time"];

/// Counts recovered from a validated document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JunitSummary {
    pub suites: usize,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
}

impl JunitSummary {
    pub fn passed(&self) -> usize {
        self.tests - self.failures - self.errors - self.skipped
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    tests: usize,
    failures: usize,
    errors: usize,
    skipped: usize,
}

impl Tally {
    fn add(&mut self, other: &Tally) {
        self.tests += other.tests;
        self.failures += other.failures;
        self.errors += other.errors;
        self.skipped += other.skipped;
    }
}

#[derive(Debug, Default)]
struct Declared {
    name: String,
    tally: Tally,
}

#[derive(Debug, Default)]
struct Validator {
    depth: usize,
    root: Option<Declared>,
    root_closed: bool,
    suite: Option<Declared>,
    suite_tally: Tally,
    total_tally: Tally,
    in_case: bool,
    case_statuses: usize,
    suites: usize,
}

/// Validate a JUnit XML document produced by this crate's writer.
pub fn validate_junit(bytes: &[u8]) -> Result<JunitSummary, WriteError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut validator = Validator::default();
    let mut buf = Vec::new();
    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| WriteError::schema_violation(format!("not well-formed: {}", e)))?;
        match event {
            Event::Eof => break,
            Event::Start(e) => {
                validator.open(&e)?;
                validator.depth += 1;
            }
            Event::Empty(e) => {
                validator.open(&e)?;
                validator.close(e.local_name().as_ref())?;
            }
            Event::End(e) => {
                validator.depth = validator.depth.saturating_sub(1);
                validator.close(e.local_name().as_ref())?;
            }
            _ => (),
        }
        buf.clear();
    }

    if validator.depth != 0 {
        return Err(WriteError::schema_violation("document ends with unclosed elements"));
    }
    if !validator.root_closed {
        return Err(WriteError::schema_violation("missing <testsuites> root"));
    }

    let tally = validator.total_tally;
    Ok(JunitSummary {
        suites: validator.suites,
        tests: tally.tests,
        failures: tally.failures,
        errors: tally.errors,
        skipped: tally.skipped,
    })
}

impl Validator {
    fn open(&mut self, e: &BytesStart) -> Result<(), WriteError> {
        let name = e.local_name();
        match (name.as_ref(), self.depth) {
            (b"testsuites", 0) if !self.root_closed && self.root.is_none() => {
                self.root = Some(read_declared(e, REQUIRED_SUITE_ATTRS)?);
            }
            (b"testsuite", 1) => {
                self.suite = Some(read_declared(e, REQUIRED_SUITE_ATTRS)?);
                self.suite_tally = Tally::default();
                self.suites += 1;
            }
            (b"testcase", 2) => {
                require_attrs(e, REQUIRED_CASE_ATTRS)?;
                parse_time(e)?;
                self.in_case = true;
                self.case_statuses = 0;
                self.suite_tally.tests += 1;
            }
            (b"failure" | b"error" | b"skipped", 3) if self.in_case => {
                self.case_statuses += 1;
                if self.case_statuses > 1 {
                    return Err(WriteError::schema_violation(
                        "testcase carries more than one status element",
                    ));
                }
                match name.as_ref() {
                    b"failure" => self.suite_tally.failures += 1,
                    b"error" => self.suite_tally.errors += 1,
                    _ => self.suite_tally.skipped += 1,
                }
            }
            (b"system-out" | b"system-err", 3) if self.in_case => {}
            (other, depth) => {
                return Err(WriteError::schema_violation(format!(
                    "unexpected <{}> at depth {}",
                    String::from_utf8_lossy(other),
                    depth
                )));
            }
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), WriteError> {
        match name {
            b"testcase" => self.in_case = false,
            b"testsuite" => {
                let suite = self.suite.take().unwrap_or_default();
                check_tally(&suite, &self.suite_tally)?;
                self.total_tally.add(&self.suite_tally);
            }
            b"testsuites" => {
                let root = self.root.take().unwrap_or_default();
                check_tally(&root, &self.total_tally)?;
                self.root_closed = true;
            }
            _ => (),
        }
        Ok(())
    }
}

fn check_tally(declared: &Declared, actual: &Tally) -> Result<(), WriteError> {
    let pairs = [
        ("tests", declared.tally.tests, actual.tests),
        ("failures", declared.tally.failures, actual.failures),
        ("errors", declared.tally.errors, actual.errors),
        ("skipped", declared.tally.skipped, actual.skipped),
    ];
    for (attr, expected, found) in pairs {
        if expected != found {
            return Err(WriteError::schema_violation(format!(
                "'{}' declares {}={} but contains {}",
                declared.name, attr, expected, found
            )));
        }
    }
    Ok(())
}

fn read_declared(e: &BytesStart, required: &[&str]) -> Result<Declared, WriteError> {
    require_attrs(e, required)?;
    parse_time(e)?;
    Ok(Declared {
        name: attr_value(e, "name")?.unwrap_or_default(),
        tally: Tally {
            tests: count_attr(e, "tests")?,
            failures: count_attr(e, "failures")?,
            errors: count_attr(e, "errors")?,
            skipped: count_attr(e, "skipped")?,
        },
    })
}

fn require_attrs(e: &BytesStart, required: &[&str]) -> Result<(), WriteError> {
    for attr in required {
        if attr_value(e, attr)?.is_none() {
            return Err(WriteError::schema_violation(format!(
                "<{}> is missing required attribute '{}'",
                String::from_utf8_lossy(e.local_name().as_ref()),
                attr
            )));
        }
    }
    Ok(())
}

fn attr_value(e: &BytesStart, name: &str) -> Result<Option<String>, WriteError> {
    match e
        .try_get_attribute(name)
        .map_err(|err| WriteError::schema_violation(err.to_string()))?
    {
        Some(attr) => attr
            .unescape_value()
            .map(|v| Some(v.into_owned()))
            .map_err(|err| WriteError::schema_violation(err.to_string())),
        None => Ok(None),
    }
}

fn count_attr(e: &BytesStart, name: &str) -> Result<usize, WriteError> {
    let value = attr_value(e, name)?.unwrap_or_default();
    value.parse().map_err(|_| {
        WriteError::schema_violation(format!("attribute '{}' is not a count: '{}'", name, value))
    })
}

fn parse_time(e: &BytesStart) -> Result<(), WriteError> {
    let value = attr_value(e, "time")?.unwrap_or_default();
    match value.parse::<f64>() {
        Ok(t) if t.is_finite() && t >= 0.0 => Ok(()),
        _ => Err(WriteError::schema_violation(format!(
            "attribute 'time' is not a non-negative number: '{}'",
            value
        ))),
    }
}
