//! Backup-then-overwrite output writing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, info};

use crate::error::{WrightError, WrightResult};
use crate::types::BackupDescriptor;

/// Marker inserted into backup file names.
pub const BACKUP_MARKER: &str = "backup";

/// Suffix used when the target has no extension.
const NO_EXTENSION_SUFFIX: &str = "bak";

/// How the sink should treat the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Snapshot an existing target before overwriting it
    pub backup: bool,
    /// Render only; leave the filesystem alone
    pub dry_run: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            backup: true,
            dry_run: false,
        }
    }
}

/// What the sink did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written {
        path: PathBuf,
        backup: Option<BackupDescriptor>,
    },
    DryRun {
        path: PathBuf,
        rendered: String,
    },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            Self::Written { path, .. } | Self::DryRun { path, .. } => path,
        }
    }

    pub fn backup(&self) -> Option<&BackupDescriptor> {
        match self {
            Self::Written { backup, .. } => backup.as_ref(),
            Self::DryRun { .. } => None,
        }
    }
}

/// Persists a validated candidate.
pub struct OutputSink;

impl OutputSink {
    /// Write `candidate` to `path`.
    ///
    /// With `backup`, an existing target is copied to a timestamped sibling
    /// first; if that copy fails the target is left untouched. The write
    /// itself goes through a temp file in the same directory and a rename,
    /// so readers never observe a half-written file.
    pub fn write(path: impl AsRef<Path>, candidate: &str, options: WriteOptions) -> WrightResult<WriteOutcome> {
        let path = path.as_ref();

        if options.dry_run {
            info!(path = %path.display(), "Dry run; target left unchanged");
            return Ok(WriteOutcome::DryRun {
                path: path.to_path_buf(),
                rendered: candidate.to_string(),
            });
        }

        let backup = if options.backup && path.exists() {
            Some(Self::backup(path)?)
        } else {
            if options.backup {
                debug!(path = %path.display(), "Target does not exist yet; nothing to back up");
            }
            None
        };

        Self::replace(path, candidate)?;
        info!(
            path = %path.display(),
            backup = ?backup.as_ref().map(|b| b.backup_path.display().to_string()),
            "Wrote candidate"
        );

        Ok(WriteOutcome::Written {
            path: path.to_path_buf(),
            backup,
        })
    }

    /// Copy the target to `<stem>.backup.<timestamp>.<ext>` beside it.
    pub fn backup(path: &Path) -> WrightResult<BackupDescriptor> {
        let created_at = Utc::now();
        let backup_path = Self::backup_path(path, &created_at.format("%Y%m%d-%H%M%S").to_string());

        fs::copy(path, &backup_path).map_err(|e| WrightError::BackupFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!("Backed up {:?} to {:?}", path, backup_path);

        Ok(BackupDescriptor {
            original_path: path.to_path_buf(),
            backup_path,
            created_at,
        })
    }

    fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| NO_EXTENSION_SUFFIX.to_string());

        path.with_file_name(format!("{}.{}.{}.{}", stem, BACKUP_MARKER, timestamp, ext))
    }

    fn replace(path: &Path, candidate: &str) -> WrightResult<()> {
        let write_failed = |e: std::io::Error| WrightError::WriteFailed {
            path: path.to_path_buf(),
            source: e,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(write_failed)?;

        // An existing target keeps its mode; a new one gets the umask default.
        let existing = fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.permissions());

        let mut temp = Self::temp_file(&parent).map_err(write_failed)?;
        temp.write_all(candidate.as_bytes()).map_err(write_failed)?;
        if let Some(permissions) = existing {
            temp.as_file().set_permissions(permissions).map_err(write_failed)?;
        }
        temp.as_file().sync_all().map_err(write_failed)?;
        temp.persist(path).map_err(|e| write_failed(e.error))?;

        Ok(())
    }

    #[cfg(unix)]
    fn temp_file(dir: &Path) -> std::io::Result<NamedTempFile> {
        use std::os::unix::fs::PermissionsExt;

        Builder::new()
            .prefix(".testwright")
            .permissions(fs::Permissions::from_mode(0o666))
            .tempfile_in(dir)
    }

    #[cfg(not(unix))]
    fn temp_file(dir: &Path) -> std::io::Result<NamedTempFile> {
        Builder::new().prefix(".testwright").tempfile_in(dir)
    }
}
