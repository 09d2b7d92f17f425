//! Reading task inputs from disk.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{WrightError, WrightResult};
use crate::types::TaskInput;

/// Loads [`TaskInput`]s from the filesystem.
pub struct ContentSource;

impl ContentSource {
    /// Build a generation task from a description file.
    pub fn description(path: impl AsRef<Path>) -> WrightResult<TaskInput> {
        let description = Self::read_non_empty(path.as_ref())?;
        Ok(TaskInput::Generate { description })
    }

    /// Build a repair task from a failing test and its error log.
    pub fn repair(test_path: impl AsRef<Path>, log_path: impl AsRef<Path>) -> WrightResult<TaskInput> {
        let test_path = test_path.as_ref();
        let original_source = Self::read_non_empty(test_path)?;
        let failure_log = Self::read_non_empty(log_path.as_ref())?;

        let file_name = test_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| test_path.display().to_string());

        Ok(TaskInput::Repair {
            original_source,
            failure_log,
            file_name,
        })
    }

    fn read_non_empty(path: &Path) -> WrightResult<String> {
        debug!("Reading input from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => WrightError::InputNotFound(path.to_path_buf()),
            _ => WrightError::InputUnreadable {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        if content.trim().is_empty() {
            return Err(WrightError::InputEmpty(path.to_path_buf()));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_description_roundtrip() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("login.txt");
        fs::write(&path, "user logs in").unwrap();

        let task = ContentSource::description(&path).unwrap();
        assert_eq!(task, TaskInput::generate("user logs in"));
    }

    #[test]
    fn test_missing_file() {
        let temp = tempdir().unwrap();
        let err = ContentSource::description(temp.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, WrightError::InputNotFound(_)));
    }

    #[test]
    fn test_whitespace_only_file_is_empty() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("blank.txt");
        fs::write(&path, "  \n\t\n").unwrap();

        let err = ContentSource::description(&path).unwrap_err();
        assert!(matches!(err, WrightError::InputEmpty(_)));
    }

    #[test]
    fn test_repair_reads_both_files() {
        let temp = tempdir().unwrap();
        let test = temp.path().join("login.spec.ts");
        let log = temp.path().join("error.log");
        fs::write(&test, "test('a', async () => {});").unwrap();
        fs::write(&log, "element not found").unwrap();

        match ContentSource::repair(&test, &log).unwrap() {
            TaskInput::Repair {
                original_source,
                failure_log,
                file_name,
            } => {
                assert!(original_source.contains("test('a'"));
                assert_eq!(failure_log, "element not found");
                assert_eq!(file_name, "login.spec.ts");
            }
            other => panic!("unexpected task: {:?}", other),
        }
    }

    #[test]
    fn test_repair_empty_log() {
        let temp = tempdir().unwrap();
        let test = temp.path().join("login.spec.ts");
        let log = temp.path().join("error.log");
        fs::write(&test, "test('a', async () => {});").unwrap();
        fs::write(&log, "").unwrap();

        let err = ContentSource::repair(&test, &log).unwrap_err();
        assert!(matches!(err, WrightError::InputEmpty(p) if p == log));
    }
}
