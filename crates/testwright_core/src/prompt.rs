//! Prompt construction for generation and repair tasks.

use crate::error::{WrightError, WrightResult};
use crate::types::{Prompt, TaskInput, DEFAULT_LIBRARY};

/// Default ceiling on any single input embedded in a prompt.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 200_000;

/// Renders a [`TaskInput`] into a [`Prompt`].
///
/// Pure: no filesystem or network access. Inputs over the size ceiling are
/// rejected, never truncated, since a clipped log or source file would hand
/// the model a misleading repair context.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    library: String,
    max_input_bytes: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            library: DEFAULT_LIBRARY.to_string(),
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the automation library module the tests should import.
    pub fn library(mut self, library: impl Into<String>) -> Self {
        self.library = library.into();
        self
    }

    /// Set the per-input size ceiling in bytes.
    pub fn max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Build the prompt for a task.
    pub fn build(&self, task: &TaskInput) -> WrightResult<Prompt> {
        match task {
            TaskInput::Generate { description } => {
                self.check_size("description", description)?;
                Ok(Prompt::new(self.system_instruction(), self.generation_instruction(description)))
            }
            TaskInput::Repair {
                original_source,
                failure_log,
                file_name,
            } => {
                self.check_size("original source", original_source)?;
                self.check_size("failure log", failure_log)?;
                Ok(Prompt::new(
                    self.system_instruction(),
                    self.repair_instruction(original_source, failure_log, file_name),
                ))
            }
        }
    }

    fn check_size(&self, what: &str, content: &str) -> WrightResult<()> {
        if content.len() > self.max_input_bytes {
            return Err(WrightError::InputTooLarge {
                what: what.to_string(),
                size: content.len(),
                limit: self.max_input_bytes,
            });
        }
        Ok(())
    }

    fn system_instruction(&self) -> String {
        format!(
            "You are an expert QA automation engineer who writes end-to-end browser tests \
             with {lib}. You always answer with the complete contents of a single test file \
             and nothing else: no explanations, no commentary, no markdown code fences.",
            lib = self.library
        )
    }

    fn output_rules(&self) -> String {
        format!(
            "Requirements:\n\
             - Import test helpers from '{lib}' at the top of the file\n\
             - Use modern async syntax: test('...', async ({{ page }}) => {{ ... }})\n\
             - Give every test a descriptive name\n\
             - Include the standard setup boilerplate (test.describe, test.beforeEach where useful)\n\
             - Use meaningful assertions with expect()\n\
             - Return ONLY the source code of the file. Do not add prose before or after it \
             and do not wrap it in ``` fences.",
            lib = self.library
        )
    }

    fn generation_instruction(&self, description: &str) -> String {
        format!(
            "Write a complete, self-contained {lib} test file for the following scenario.\n\n\
             Scenario:\n{description}\n\n{rules}",
            lib = self.library,
            description = description.trim(),
            rules = self.output_rules()
        )
    }

    fn repair_instruction(&self, source: &str, log: &str, file_name: &str) -> String {
        format!(
            "The test file `{file_name}` is failing. Fix it.\n\n\
             Address only the root cause shown in the error log. Preserve the original \
             structure, test names and intent; do not rewrite unrelated steps.\n\n\
             Original source:\n{source}\n\n\
             Error log:\n{log}\n\n{rules}",
            rules = self.output_rules()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_contents() {
        let prompt = PromptBuilder::new()
            .build(&TaskInput::generate("user logs in with valid credentials"))
            .unwrap();

        assert!(prompt.system_instruction.contains("@playwright/test"));
        assert!(prompt.user_instruction.contains("user logs in with valid credentials"));
        assert!(prompt.user_instruction.contains("async"));
        assert!(prompt.user_instruction.contains("expect()"));
        assert!(prompt.user_instruction.contains("Return ONLY the source code"));
    }

    #[test]
    fn test_repair_prompt_embeds_inputs_verbatim() {
        let source = "import { test } from '@playwright/test';\n\n  test('x', async () => {});\n";
        let log = "Error: element not found: button.old-label\n    at login.spec.ts:12:5";
        let prompt = PromptBuilder::new()
            .build(&TaskInput::repair(source, log, "login.spec.ts"))
            .unwrap();

        assert!(prompt.user_instruction.contains(source));
        assert!(prompt.user_instruction.contains(log));
        assert!(prompt.user_instruction.contains("login.spec.ts"));
        assert!(prompt.user_instruction.contains("root cause"));
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = PromptBuilder::new();
        let task = TaskInput::generate("checkout flow");
        assert_eq!(builder.build(&task).unwrap(), builder.build(&task).unwrap());
    }

    #[test]
    fn test_oversized_input_rejected() {
        let builder = PromptBuilder::new().max_input_bytes(16);
        let task = TaskInput::repair("short", "x".repeat(17), "a.spec.ts");

        match builder.build(&task).unwrap_err() {
            WrightError::InputTooLarge { what, size, limit } => {
                assert_eq!(what, "failure log");
                assert_eq!(size, 17);
                assert_eq!(limit, 16);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_custom_library() {
        let prompt = PromptBuilder::new()
            .library("playwright")
            .build(&TaskInput::generate("search"))
            .unwrap();
        assert!(prompt.user_instruction.contains("'playwright'"));
    }
}
