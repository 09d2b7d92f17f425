//! Structural gate for code candidates.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::anchors::SourceAnchors;
use crate::normalizer::{Extraction, ExtractionMethod};

/// Outcome of checking a candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub reasons: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            reasons: Vec::new(),
        }
    }

    pub fn add_reason(&mut self, reason: impl Into<String>) {
        self.valid = false;
        self.reasons.push(reason.into());
    }

    /// Reasons joined into one line, for logs and retry bookkeeping.
    pub fn summary(&self) -> String {
        self.reasons.join("; ")
    }
}

/// Checks that a candidate looks like a test file for the automation library.
///
/// Substring and pattern checks only. This catches a model answering with an
/// explanation instead of code; it says nothing about whether the test works.
#[derive(Debug, Clone)]
pub struct OutputValidator {
    anchors: SourceAnchors,
}

impl OutputValidator {
    pub fn new(anchors: SourceAnchors) -> Self {
        Self { anchors }
    }

    pub fn check(&self, candidate: &str) -> ValidationResult {
        let mut result = ValidationResult::new();

        if candidate.trim().is_empty() {
            result.add_reason("Candidate is empty");
            return result;
        }

        if !self.anchors.has_library_import(candidate) {
            result.add_reason(format!(
                "Missing import or require of '{}'",
                self.anchors.library()
            ));
        }

        if !self.anchors.has_test_call(candidate) {
            result.add_reason("No test(), test.describe() or describe() invocation found");
        }

        if candidate.contains("```") {
            result.add_reason("Candidate still contains markdown fences");
        }

        result
    }

    pub fn check_extraction(&self, extraction: &Extraction) -> ValidationResult {
        if extraction.method == ExtractionMethod::Raw {
            warn!("No code block or source anchor found in reply; validating raw text");
        }
        self.check(&extraction.code)
    }
}
