//! In-memory fetcher for family probe tests.

use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::DistroError;
use crate::fetcher::{Fetcher, FetcherKind};
use crate::progress::ProgressMeter;

pub(crate) struct MapFetcher {
    files: HashMap<String, String>,
    scratch: tempfile::TempDir,
    pub lookups: Vec<String>,
}

impl MapFetcher {
    pub fn with(files: &[(&str, &str)]) -> Self {
        Self {
            files: files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            scratch: tempfile::tempdir().unwrap(),
            lookups: Vec::new(),
        }
    }
}

impl Fetcher for MapFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Custom
    }

    fn location(&self) -> &str {
        "memory://tree/"
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        Ok(())
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        self.lookups.push(relative.to_string());
        Ok(self.files.contains_key(relative))
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        self.lookups.push(relative.to_string());
        self.files
            .get(relative)
            .map(|s| s.as_bytes().to_vec())
            .ok_or_else(|| DistroError::fetch(relative, "not in map"))
    }

    fn fetch_file(&mut self, relative: &str, _meter: &mut dyn ProgressMeter) -> Result<Utf8PathBuf, DistroError> {
        let contents = self.read_file(relative)?;
        let dir = Utf8Path::from_path(self.scratch.path()).unwrap();
        let path = dir.join(relative.replace('/', "_"));
        std::fs::write(&path, contents).unwrap();
        Ok(path)
    }

    fn cleanup(&mut self) {}
}
