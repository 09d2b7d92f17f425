//! Recovering pure source from a raw model reply.
//!
//! Best effort, not a parser. [`ResponseNormalizer::extract`] never fails; a
//! degraded candidate is returned with a method that says how it was found,
//! and the validator decides whether it is usable.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::anchors::SourceAnchors;
use crate::error::{WrightError, WrightResult};

/// How a candidate was recovered from the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Longest fenced code block
    Fenced,
    /// Sliced from the first source anchor to the last closing brace
    Anchored,
    /// Whole reply, trimmed
    Raw,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fenced => write!(f, "fenced"),
            Self::Anchored => write!(f, "anchored"),
            Self::Raw => write!(f, "raw"),
        }
    }
}

/// A code candidate plus the confidence signal for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub code: String,
    pub method: ExtractionMethod,
}

/// Extracts a single best candidate from a model reply.
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    fence: Regex,
    anchors: SourceAnchors,
}

impl ResponseNormalizer {
    pub fn new(anchors: SourceAnchors) -> WrightResult<Self> {
        // An unterminated fence runs to the end of the reply.
        let fence = Regex::new(r"(?s)```[^\n`]*\n(.*?)(?:```|\z)")
            .map_err(|e| WrightError::InvalidConfig(format!("bad fence pattern: {}", e)))?;
        Ok(Self { fence, anchors })
    }

    pub fn extract(&self, reply: &str) -> Extraction {
        if let Some(code) = self.longest_fenced_block(reply) {
            return Extraction {
                code,
                method: ExtractionMethod::Fenced,
            };
        }

        if let Some(code) = self.anchored_slice(reply) {
            return Extraction {
                code,
                method: ExtractionMethod::Anchored,
            };
        }

        Extraction {
            code: reply.trim().to_string(),
            method: ExtractionMethod::Raw,
        }
    }

    fn longest_fenced_block(&self, reply: &str) -> Option<String> {
        let mut best: Option<&str> = None;

        for caps in self.fence.captures_iter(reply) {
            let body = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            // Strictly longer wins, so ties keep the earlier block.
            if best.map_or(true, |b| body.chars().count() > b.chars().count()) {
                best = Some(body);
            }
        }

        best.map(str::to_string)
    }

    fn anchored_slice(&self, reply: &str) -> Option<String> {
        let start = self.anchors.first_anchor(reply)?;
        let tail = &reply[start..];

        let code = match tail.rfind('}') {
            Some(brace) => {
                // Keep the `);` that closes a test(...) call.
                let after = &tail[brace + 1..];
                let closers = after
                    .char_indices()
                    .take_while(|(_, c)| *c == ')' || *c == ';')
                    .last()
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(0);
                &tail[..brace + 1 + closers]
            }
            None => tail,
        };

        Some(code.trim().to_string())
    }
}
