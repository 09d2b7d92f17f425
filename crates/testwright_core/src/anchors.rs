//! Recognizable source anchors for the automation library.
//!
//! Shared by the normalizer (to find where code starts in an unfenced reply)
//! and the validator (to check the candidate looks like a test file).

use regex::Regex;

use crate::error::{WrightError, WrightResult};

/// Compiled patterns for one automation library.
#[derive(Debug, Clone)]
pub struct SourceAnchors {
    library: String,
    import: Regex,
    require: Regex,
    test_call: Regex,
}

impl SourceAnchors {
    pub fn new(library: impl Into<String>) -> WrightResult<Self> {
        let library = library.into();
        if library.trim().is_empty() {
            return Err(WrightError::InvalidConfig(
                "automation library name cannot be empty".to_string(),
            ));
        }
        let lib = regex::escape(&library);

        let import = compile(&format!(r#"import\s+(?:[^;]*?\bfrom\s*)?['"]{lib}['"]"#))?;
        let require = compile(&format!(r#"require\(\s*['"]{lib}['"]\s*\)"#))?;
        let test_call =
            compile(r"\b(?:test|describe|it)(?:\.(?:describe|only|skip|serial|parallel|fixme))*\s*\(")?;

        Ok(Self {
            library,
            import,
            require,
            test_call,
        })
    }

    pub fn library(&self) -> &str {
        &self.library
    }

    /// Whether the text imports or requires the library.
    pub fn has_library_import(&self, text: &str) -> bool {
        self.import.is_match(text) || self.require.is_match(text)
    }

    /// Whether the text invokes test/describe/it.
    pub fn has_test_call(&self, text: &str) -> bool {
        self.test_call.is_match(text)
    }

    /// Byte offset of the earliest anchor in the text.
    pub fn first_anchor(&self, text: &str) -> Option<usize> {
        [&self.import, &self.require, &self.test_call]
            .iter()
            .filter_map(|re| re.find(text).map(|m| m.start()))
            .min()
    }
}

fn compile(pattern: &str) -> WrightResult<Regex> {
    Regex::new(pattern).map_err(|e| WrightError::InvalidConfig(format!("bad anchor pattern: {}", e)))
}
