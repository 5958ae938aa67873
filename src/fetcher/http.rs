//! HTTP(S) fetcher built on a blocking `ureq` agent.

use std::io::Read;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use ureq::Agent;
use url::Url;

use super::{Fetcher, FetcherKind, MAX_SNIFF_BYTES, copy_with_progress, persist, scratch_file, too_large_to_inspect};
use crate::error::DistroError;
use crate::progress::ProgressMeter;

/// Fetches files relative to an HTTP base URL.
pub struct HttpFetcher {
    location: String,
    base: Url,
    scratch_dir: Utf8PathBuf,
    timeout: Duration,
    agent: Option<Agent>,
}

impl HttpFetcher {
    pub fn new(location: &str, scratch_dir: &Utf8Path, timeout: Duration) -> Result<Self, DistroError> {
        // A base without a trailing slash would make `Url::join` drop its
        // last path segment.
        let mut base = location.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base)
            .map_err(|e| DistroError::Location(format!("malformed URL {}: {}", location, e)))?;
        Ok(Self {
            location: location.to_string(),
            base,
            scratch_dir: scratch_dir.to_owned(),
            timeout,
            agent: None,
        })
    }

    fn url_for(&self, relative: &str) -> Result<Url, DistroError> {
        self.base
            .join(relative.trim_start_matches('/'))
            .map_err(|e| DistroError::fetch(relative, format!("invalid path: {}", e)))
    }

    fn agent(&self) -> Result<&Agent, DistroError> {
        self.agent
            .as_ref()
            .ok_or_else(|| DistroError::Location(format!("{} has not been prepared", self.location)))
    }

    /// Maps a transport failure (not a status code) to a location error.
    fn transport_error(&self, err: ureq::Error) -> DistroError {
        DistroError::Location(format!("{}: {}", self.location, err))
    }

    /// A 5xx answer means the server, not the file, is broken.
    fn server_error(&self, code: u16, url: &Url) -> DistroError {
        DistroError::Location(format!("{}: server error (HTTP {}) for {}", self.location, code, url))
    }

    fn get(&self, relative: &str) -> Result<ureq::http::Response<ureq::Body>, DistroError> {
        let url = self.url_for(relative)?;
        match self.agent()?.get(url.as_str()).call() {
            Ok(response) => Ok(response),
            Err(ureq::Error::StatusCode(code)) if code >= 500 => Err(self.server_error(code, &url)),
            Err(ureq::Error::StatusCode(code)) => {
                Err(DistroError::fetch(relative, format!("HTTP status {} for {}", code, url)))
            }
            Err(e) => Err(self.transport_error(e)),
        }
    }
}

impl Fetcher for HttpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Http
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        if self.agent.is_some() {
            return Ok(());
        }
        let config = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .build();
        let agent = Agent::new_with_config(config);

        // Reach the server once so DNS failures, refused connections and
        // timeouts surface here rather than as negative probes.
        match agent.head(self.base.as_str()).call() {
            Ok(_) => {}
            Err(ureq::Error::StatusCode(404)) => {
                return Err(DistroError::Location(format!("{}: not found (HTTP 404)", self.location)));
            }
            Err(ureq::Error::StatusCode(code)) => {
                // Many mirrors refuse directory listings; the tree may
                // still be readable file by file.
                tracing::debug!("base URL {} answered HTTP {}", self.base, code);
            }
            Err(e) => return Err(self.transport_error(e)),
        }

        self.agent = Some(agent);
        Ok(())
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        let url = self.url_for(relative)?;
        match self.agent()?.head(url.as_str()).call() {
            Ok(_) => Ok(true),
            Err(ureq::Error::StatusCode(code)) if code < 500 => {
                tracing::trace!("HEAD {} -> {}", url, code);
                Ok(false)
            }
            Err(ureq::Error::StatusCode(code)) => Err(self.server_error(code, &url)),
            Err(e) => Err(self.transport_error(e)),
        }
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        let response = self.get(relative)?;
        if response.body().content_length().is_some_and(|len| len > MAX_SNIFF_BYTES) {
            return Err(too_large_to_inspect(relative));
        }
        let mut contents = Vec::new();
        response
            .into_body()
            .into_reader()
            .take(MAX_SNIFF_BYTES + 1)
            .read_to_end(&mut contents)
            .map_err(|e| DistroError::fetch(relative, format!("read failed: {}", e)))?;
        if contents.len() as u64 > MAX_SNIFF_BYTES {
            return Err(too_large_to_inspect(relative));
        }
        Ok(contents)
    }

    fn fetch_file(
        &mut self,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        let response = self.get(relative)?;
        let size = response.body().content_length();
        let mut target = scratch_file(&self.scratch_dir, relative)?;

        let name = Utf8Path::new(relative).file_name().unwrap_or(relative);
        let text = format!("Retrieving file {}...", name);
        let mut reader = response.into_body().into_reader();
        let total = copy_with_progress(&mut reader, target.as_file_mut(), relative, size, &text, meter)?;

        let path = persist(target)?;
        tracing::info!("fetched {} ({} bytes) to {}", self.url_for(relative)?, total, path);
        Ok(path)
    }

    fn cleanup(&mut self) {
        self.agent = None;
    }
}
