//! Fetcher for an install tree that is already a local directory.

use std::fs::{self, File};
use std::io::{self, Read};

use camino::{Utf8Path, Utf8PathBuf};

use super::{Fetcher, FetcherKind, MAX_SNIFF_BYTES, copy_with_progress, persist, scratch_file, too_large_to_inspect};
use crate::error::DistroError;
use crate::progress::ProgressMeter;

/// Reads files straight from a local directory.
///
/// Fetched files are copied into the scratch directory so the caller may
/// delete them without touching the tree.
#[derive(Debug)]
pub struct DirectFetcher {
    location: String,
    root: Utf8PathBuf,
    scratch_dir: Utf8PathBuf,
    prepared: bool,
}

impl DirectFetcher {
    pub fn new(root: impl Into<Utf8PathBuf>, scratch_dir: &Utf8Path) -> Self {
        let root = root.into();
        Self {
            location: root.to_string(),
            root,
            scratch_dir: scratch_dir.to_owned(),
            prepared: false,
        }
    }

    /// Reads from `root` while reporting `location` (used for mount points).
    pub(super) fn for_mount(location: &str, root: &Utf8Path, scratch_dir: &Utf8Path) -> Self {
        Self {
            location: location.to_string(),
            root: root.to_owned(),
            scratch_dir: scratch_dir.to_owned(),
            prepared: true,
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Utf8PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    fn ensure_prepared(&self) -> Result<(), DistroError> {
        if self.prepared {
            Ok(())
        } else {
            Err(DistroError::Location(format!("{} has not been prepared", self.location)))
        }
    }

    fn open(&self, relative: &str) -> Result<(File, u64), DistroError> {
        let path = self.resolve(relative);
        let unreadable = |e: io::Error| match e.kind() {
            io::ErrorKind::NotFound => DistroError::fetch(relative, "no such file in tree"),
            _ => DistroError::fetch(relative, crate::error::io_error_kind_message(&e)),
        };
        // Checked before opening: a FIFO or device would block the open.
        let metadata = fs::metadata(&path).map_err(unreadable)?;
        if metadata.is_dir() {
            return Err(DistroError::fetch(relative, "is a directory"));
        }
        if !metadata.is_file() {
            return Err(DistroError::fetch(relative, "not a regular file"));
        }
        let file = File::open(&path).map_err(unreadable)?;
        Ok((file, metadata.len()))
    }
}

impl Fetcher for DirectFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Direct
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        if !self.root.is_dir() {
            return Err(DistroError::Location(format!("{} is not a directory", self.root)));
        }
        self.prepared = true;
        Ok(())
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        self.ensure_prepared()?;
        match fs::symlink_metadata(self.resolve(relative)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DistroError::io(format!("failed to stat {}", self.resolve(relative)), e)),
        }
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        self.ensure_prepared()?;
        let (file, size) = self.open(relative)?;
        if size > MAX_SNIFF_BYTES {
            return Err(too_large_to_inspect(relative));
        }
        let mut contents = Vec::with_capacity(size as usize);
        file.take(MAX_SNIFF_BYTES)
            .read_to_end(&mut contents)
            .map_err(|e| DistroError::fetch(relative, crate::error::io_error_kind_message(&e)))?;
        Ok(contents)
    }

    fn fetch_file(
        &mut self,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        self.ensure_prepared()?;
        let (mut source, size) = self.open(relative)?;
        let mut target = scratch_file(&self.scratch_dir, relative)?;
        let text = format!("Copying {}...", relative);
        copy_with_progress(&mut source, target.as_file_mut(), relative, Some(size), &text, meter)?;
        let path = persist(target)?;
        tracing::debug!("copied {} to {}", self.resolve(relative), path);
        Ok(path)
    }

    fn cleanup(&mut self) {
        self.prepared = false;
    }
}
