//! Shared helpers for integration tests
//!
//! - Paths to the checked-in TRX fixtures
//! - A small builder for synthetic TRX documents
//! - Helpers to lay out input files in a scratch directory

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Path to a checked-in TRX fixture
pub fn trx_fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/trx")
        .join(name)
}

/// One `UnitTestResult` of a synthetic document
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub test_id: String,
    pub test_name: String,
    pub outcome: String,
    pub duration: String,
    pub message: Option<String>,
    pub stack_trace: Option<String>,
}

impl ResultRow {
    pub fn new(test_id: &str, test_name: &str, outcome: &str) -> Self {
        Self {
            test_id: test_id.to_string(),
            test_name: test_name.to_string(),
            outcome: outcome.to_string(),
            duration: "00:00:00.0010000".to_string(),
            message: None,
            stack_trace: None,
        }
    }

    pub fn duration(mut self, duration: &str) -> Self {
        self.duration = duration.to_string();
        self
    }

    pub fn error(mut self, message: &str, stack_trace: &str) -> Self {
        self.message = Some(message.to_string());
        self.stack_trace = Some(stack_trace.to_string());
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            r#"    <UnitTestResult testId="{}" testName="{}" outcome="{}" duration="{}""#,
            escape(&self.test_id),
            escape(&self.test_name),
            escape(&self.outcome),
            escape(&self.duration)
        );
        match (&self.message, &self.stack_trace) {
            (None, None) => xml.push_str(" />\n"),
            (message, trace) => {
                xml.push_str(">\n      <Output><ErrorInfo>");
                if let Some(message) = message {
                    xml.push_str(&format!("<Message>{}</Message>", escape(message)));
                }
                if let Some(trace) = trace {
                    xml.push_str(&format!("<StackTrace>{}</StackTrace>", escape(trace)));
                }
                xml.push_str("</ErrorInfo></Output>\n    </UnitTestResult>\n");
            }
        }
        xml
    }
}

/// Build a TRX document. `classes` maps test ids to `TestMethod@className`.
pub fn trx_document(run_name: &str, results: &[ResultRow], classes: &[(&str, &str)]) -> String {
    let body: String = results.iter().map(ResultRow::to_xml).collect();
    let definitions: String = classes
        .iter()
        .map(|(id, class)| {
            format!(
                "    <UnitTest id=\"{}\" name=\"x\"><TestMethod className=\"{}\" name=\"x\" /></UnitTest>\n",
                escape(id),
                escape(class)
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <TestRun id=\"1\" name=\"{}\" xmlns=\"http://microsoft.com/schemas/VisualStudio/TeamTest/2010\">\n\
         <Results>\n{}</Results>\n<TestDefinitions>\n{}</TestDefinitions>\n</TestRun>\n",
        escape(run_name),
        body,
        definitions
    )
}

/// A run of `count` passing cases in class `Suite.Tests`
pub fn passing_document(run_name: &str, count: usize) -> String {
    let results: Vec<_> = (0..count)
        .map(|i| ResultRow::new("t", &format!("Suite.Tests.Case{}", i), "Passed"))
        .collect();
    trx_document(run_name, &results, &[])
}

/// Write `contents` to `dir/rel`, creating parents; returns the path as a string
pub fn write_input(dir: &Path, rel: &str, contents: &str) -> String {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

/// Copy a checked-in fixture into `dir` under `rel`
pub fn copy_fixture(name: &str, dir: &Path, rel: &str) -> String {
    let contents = fs::read_to_string(trx_fixture(name)).unwrap();
    write_input(dir, rel, &contents)
}

/// Sorted file names in a directory
pub fn list_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
