//! Staging directories for uploads and their derived artifacts.
//!
//! Every upload passes through three directories:
//!
//! - `uploads/`: the original bytes, removed once processed
//! - `processed/`: the converted plain text, kept for debugging
//! - `outputs/`: the rendered HTML/JSON/CSV reports
//!
//! Files are named after the [`UploadId`] assigned on arrival, so no
//! client-supplied name ever reaches the filesystem. Anything older than
//! the retention window is removed by [`Staging::purge_expired`].

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Locations of the three staging directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingConfig {
    /// Raw uploads awaiting conversion.
    pub intake_dir: PathBuf,
    /// Converted plain text.
    pub processed_dir: PathBuf,
    /// Rendered reports.
    pub output_dir: PathBuf,
}

impl StagingConfig {
    /// Lays the three directories out under `base`.
    #[must_use]
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            intake_dir: base.join("uploads"),
            processed_dir: base.join("processed"),
            output_dir: base.join("outputs"),
        }
    }
}

/// Identifier assigned to an upload, e.g. `sof_20240105_143000_1a2b3c4d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadId(String);

impl UploadId {
    /// Generates a fresh identifier from the current UTC time and a random
    /// suffix.
    #[must_use]
    pub fn generate() -> Self {
        let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("sof_{stamp}_{}", &suffix[..8]))
    }

    /// Accepts a client-supplied identifier if it could name a staged file.
    ///
    /// Only ASCII letters, digits and `_` are allowed, which rules out path
    /// separators and `..`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let valid = !value.is_empty()
            && value.len() <= 64
            && value.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_');
        valid.then(|| Self(value.to_owned()))
    }

    /// The identifier as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File operations on the staging directories.
#[derive(Debug, Clone)]
pub struct Staging {
    config: StagingConfig,
}

impl Staging {
    #[must_use]
    pub const fn new(config: StagingConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &StagingConfig {
        &self.config
    }

    /// Creates any missing staging directories.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory cannot be created.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.dirs() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Writes the original upload bytes to the intake directory.
    ///
    /// The file keeps the upload's extension (if it is purely
    /// alphanumeric) but is otherwise named after `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn stage_upload(
        &self,
        id: &UploadId,
        filename: &str,
        bytes: &[u8],
    ) -> std::io::Result<PathBuf> {
        let ext = Path::new(filename)
            .extension()
            .and_then(OsStr::to_str)
            .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
            .map(str::to_ascii_lowercase);

        let name = match ext {
            Some(ext) => format!("{id}.{ext}"),
            None => id.to_string(),
        };

        let path = self.config.intake_dir.join(name);
        std::fs::write(&path, bytes)?;
        log::debug!("Staged {} bytes at {}", bytes.len(), path.display());
        Ok(path)
    }

    /// Writes the converted text for `id` to the processed directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_processed(&self, id: &UploadId, text: &str) -> std::io::Result<PathBuf> {
        let path = self.config.processed_dir.join(format!("{id}.txt"));
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Path of the `extension` report for `id` in the output directory.
    #[must_use]
    pub fn output_path(&self, id: &UploadId, extension: &str) -> PathBuf {
        self.config.output_dir.join(format!("{id}.{extension}"))
    }

    /// Removes a staged file, logging (not failing) if that is impossible.
    pub fn discard(&self, path: &Path) {
        match std::fs::remove_file(path) {
            Ok(()) => log::debug!("Removed {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove {}: {e}", path.display()),
        }
    }

    /// Deletes files in all three directories whose last modification is at
    /// least `max_age` ago. Returns the number of files removed.
    ///
    /// Directories that do not exist are skipped. Files that cannot be
    /// inspected or removed are logged and left in place.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing directory cannot be listed.
    pub fn purge_expired(&self, max_age: Duration) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;

        for dir in self.dirs() {
            if !dir.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(dir)? {
                let entry = entry?;
                let path = entry.path();

                let modified = match entry.metadata().and_then(|m| {
                    if m.is_file() {
                        m.modified().map(Some)
                    } else {
                        Ok(None)
                    }
                }) {
                    Ok(Some(modified)) => modified,
                    Ok(None) => continue,
                    Err(e) => {
                        log::warn!("Cannot inspect {}: {e}", path.display());
                        continue;
                    }
                };

                let age = now.duration_since(modified).unwrap_or_default();
                if age < max_age {
                    continue;
                }

                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        log::info!("Removed expired file {}", path.display());
                        removed += 1;
                    }
                    Err(e) => log::warn!("Failed to remove {}: {e}", path.display()),
                }
            }
        }

        Ok(removed)
    }

    fn dirs(&self) -> [&Path; 3] {
        [
            self.config.intake_dir.as_path(),
            self.config.processed_dir.as_path(),
            self.config.output_dir.as_path(),
        ]
    }
}
