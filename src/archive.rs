//! Pack/unpack between the canonical `.docx` and its mirror directory.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

use crate::error::{Result, SyncError};
use crate::paths::PathSet;
use crate::walker::walk_mirror;
use crate::watcher::ChangeWatcher;
use crate::xml;

/// Summary of one unpack run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UnpackReport {
    pub entries: usize,
    /// Watched parts rewritten in normalized form.
    pub normalized: Vec<PathBuf>,
    /// Watched parts left as extracted because they did not parse.
    pub malformed: Vec<PathBuf>,
}

/// Summary of one pack run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PackReport {
    pub entries: usize,
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// The zip <-> directory transformation for one document.
#[derive(Debug, Clone)]
pub struct ArchiveSync {
    paths: PathSet,
}

impl ArchiveSync {
    pub fn new(paths: PathSet) -> Self {
        Self { paths }
    }

    #[cfg(test)]
    pub fn paths(&self) -> &PathSet {
        &self.paths
    }

    /// Extract the canonical archive into the mirror directory and normalize
    /// the watched parts.
    ///
    /// `parts_watcher` is paused for the duration so these writes are never
    /// reported, and restarted afterwards even if extraction fails. Malformed
    /// watched parts are logged and listed in the report, not returned as errors.
    pub fn unpack(&self, parts_watcher: &ChangeWatcher) -> Result<UnpackReport> {
        parts_watcher.stop();
        let result = self.extract_and_normalize();
        parts_watcher.start();
        result
    }

    fn extract_and_normalize(&self) -> Result<UnpackReport> {
        let mut report = UnpackReport {
            entries: self.extract()?,
            ..UnpackReport::default()
        };

        for part in self.paths.watched_parts() {
            if !part.exists() {
                tracing::debug!("watched part {} not present in archive", part.display());
                continue;
            }
            match xml::normalize_part(part) {
                Ok(()) => report.normalized.push(part.clone()),
                Err(err @ SyncError::MalformedPart { .. }) => {
                    tracing::warn!("{err}; leaving it unformatted");
                    report.malformed.push(part.clone());
                }
                Err(err) => return Err(err),
            }
        }

        Ok(report)
    }

    fn extract(&self) -> Result<usize> {
        let mirror = self.paths.mirror_dir();
        let file = File::open(self.paths.canonical())?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
        fs::create_dir_all(mirror)?;

        let mut extracted = 0;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let Some(relative) = entry.enclosed_name() else {
                tracing::warn!("skipping archive entry with unsafe name {:?}", entry.name());
                continue;
            };
            let dest = mirror.join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&dest)?;
                continue;
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut out = File::create(&dest)?;
            io::copy(&mut entry, &mut out)?;
            extracted += 1;
        }

        tracing::debug!("extracted {extracted} entries into {}", mirror.display());
        Ok(extracted)
    }

    /// Rebuild the canonical archive from the mirror directory.
    ///
    /// With `suppress_reload`, `document_watcher` is told to ignore its next
    /// observation before anything is written, and is paused until the new
    /// archive is in place, so polls during a long pack neither see the
    /// rename nor use up the suppression. The archive is assembled in a
    /// temporary file beside the canonical path, given the document's
    /// permissions, and renamed into place.
    pub fn pack(&self, document_watcher: &ChangeWatcher, suppress_reload: bool) -> Result<PackReport> {
        let mirror = self.paths.mirror_dir();
        if !mirror.is_dir() {
            return Err(SyncError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("mirror directory {} does not exist", mirror.display()),
            )));
        }

        let _paused = suppress_reload.then(|| {
            document_watcher.suppress_next();
            document_watcher.pause()
        });
        self.write_archive()
    }

    fn write_archive(&self) -> Result<PackReport> {
        let files = walk_mirror(self.paths.mirror_dir());
        let canonical = self.paths.canonical();
        let tmp = tempfile::NamedTempFile::new_in(self.paths.document_dir())?;

        let mut zip = zip::ZipWriter::new(tmp);
        for file in &files {
            zip.start_file(file.entry_name.as_str(), entry_options())?;
            let mut src = File::open(&file.path)?;
            io::copy(&mut src, &mut zip)?;
        }
        let mut tmp = zip.finish()?;
        tmp.flush()?;

        // The temp file is created owner-only; keep the document's own mode.
        match fs::metadata(canonical) {
            Ok(meta) => fs::set_permissions(tmp.path(), meta.permissions())?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        tmp.persist(canonical).map_err(|e| SyncError::Persist {
            path: canonical.to_path_buf(),
            source: e.error,
        })?;

        tracing::debug!("packed {} entries into {}", files.len(), canonical.display());
        Ok(PackReport {
            entries: files.len(),
        })
    }

    /// Check that every watched part still parses. Returns the failures.
    pub fn validate_parts(&self) -> Vec<SyncError> {
        self.paths
            .watched_parts()
            .iter()
            .filter(|part| part.exists())
            .filter_map(|part| xml::validate_part(part).err())
            .collect()
    }
}
