//! Core data types flowing through the pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default automation library the generated tests import.
pub const DEFAULT_LIBRARY: &str = "@playwright/test";

/// What the pipeline has been asked to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TaskInput {
    /// Write a new test from a plain-language description.
    Generate { description: String },
    /// Fix an existing test given its failure log.
    Repair {
        original_source: String,
        failure_log: String,
        file_name: String,
    },
}

impl TaskInput {
    pub fn generate(description: impl Into<String>) -> Self {
        Self::Generate {
            description: description.into(),
        }
    }

    pub fn repair(
        original_source: impl Into<String>,
        failure_log: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self::Repair {
            original_source: original_source.into(),
            failure_log: failure_log.into(),
            file_name: file_name.into(),
        }
    }

    /// Short label for logging.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Generate { .. } => "generate",
            Self::Repair { .. } => "repair",
        }
    }
}

/// Role-structured instructions for the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system_instruction: String,
    pub user_instruction: String,
}

impl Prompt {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system_instruction: system.into(),
            user_instruction: user.into(),
        }
    }

    /// Both instructions joined into one text blob, for backends that take
    /// a single prompt string.
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system_instruction, self.user_instruction)
    }
}

/// Raw text returned by a provider, plus usage info when reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReply {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl ProviderReply {
    pub fn new(text: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            provider: provider.into(),
            model: model.into(),
            input_tokens: None,
            output_tokens: None,
        }
    }

    pub fn with_usage(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = Some(input_tokens);
        self.output_tokens = Some(output_tokens);
        self
    }
}

/// One provider/normalize/validate attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// 1-based attempt number
    pub attempt: u32,
    /// Why the attempt failed, if it did
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// A snapshot of the target file taken before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDescriptor {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub created_at: DateTime<Utc>,
}
