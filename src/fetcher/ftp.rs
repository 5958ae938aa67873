//! FTP fetcher driving `curl` through the command executor.
//!
//! curl's exit status tells a missing remote file (9, 19, 78) apart from a
//! host that cannot be reached or logged into, which is exactly the
//! distinction between a negative probe and a broken location.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};

use super::{
    Fetcher, FetcherKind, MAX_SNIFF_BYTES, TransportSettings, join_relative, persist, scratch_file,
    too_large_to_inspect,
};
use crate::error::DistroError;
use crate::executor::{CommandExecutor, CommandSpec};
use crate::interrupt;
use crate::progress::ProgressMeter;

/// curl exit codes meaning "the server is fine, the file is not there".
const MISSING_FILE_CODES: &[i32] = &[
    9,  // FTP access denied (cwd into a missing directory)
    19, // FTP RETR failed
    78, // remote file not found
];

/// curl exit code for a transfer refused by `--max-filesize`.
const FILE_TOO_LARGE_CODE: i32 = 63;

enum CurlOutcome {
    Ok,
    Missing(i32),
    TooLarge,
    Failed(String),
}

pub struct FtpFetcher {
    location: String,
    scratch_dir: Utf8PathBuf,
    executor: Arc<dyn CommandExecutor>,
    timeout: Duration,
    credentials: Option<(String, String)>,
    prepared: bool,
}

impl FtpFetcher {
    pub fn new(location: &str, scratch_dir: &Utf8Path, settings: &TransportSettings) -> Result<Self, DistroError> {
        let url = url::Url::parse(location)
            .map_err(|e| DistroError::Location(format!("malformed URL {}: {}", location, e)))?;
        if url.host_str().is_none_or(str::is_empty) {
            return Err(DistroError::Location(format!("no host in {}", location)));
        }
        Ok(Self {
            location: location.to_string(),
            scratch_dir: scratch_dir.to_owned(),
            executor: Arc::clone(&settings.executor),
            timeout: settings.timeout,
            credentials: settings.ftp_credentials.clone(),
            prepared: false,
        })
    }

    fn url_for(&self, relative: &str) -> String {
        join_relative(&self.location, relative)
    }

    /// Runs one curl transfer. A pending Ctrl-C stops before curl starts
    /// and turns a transfer killed by the same signal into `Interrupted`.
    fn curl(&self, extra: &[&str], url: &str) -> Result<CurlOutcome, DistroError> {
        interrupt::check()?;
        let mut args = vec![
            "--silent".to_string(),
            "--show-error".to_string(),
            "--fail".to_string(),
            "--max-time".to_string(),
            self.timeout.as_secs().max(1).to_string(),
        ];
        if let Some((user, password)) = &self.credentials {
            args.push("--user".to_string());
            args.push(format!("{}:{}", user, password));
        }
        args.extend(extra.iter().map(|s| s.to_string()));
        args.push(url.to_string());

        let spec = CommandSpec::new("curl", args);
        let outcome = match self.executor.execute(&spec) {
            Ok(result) if result.success() => CurlOutcome::Ok,
            Ok(result) => match result.code() {
                Some(code) if MISSING_FILE_CODES.contains(&code) => CurlOutcome::Missing(code),
                Some(FILE_TOO_LARGE_CODE) => CurlOutcome::TooLarge,
                Some(code) => CurlOutcome::Failed(format!("curl exited with code {}", code)),
                None => CurlOutcome::Failed(format!("curl terminated: {}", result.status)),
            },
            Err(e) => CurlOutcome::Failed(format!("{:#}", e)),
        };
        if matches!(outcome, CurlOutcome::Failed(_)) {
            interrupt::check()?;
        }
        Ok(outcome)
    }

    fn ensure_prepared(&self) -> Result<(), DistroError> {
        if self.prepared {
            Ok(())
        } else {
            Err(DistroError::Location(format!("{} has not been prepared", self.location)))
        }
    }

    /// Downloads `relative` into the scratch directory, refusing files
    /// over `max_size` bytes before they are transferred.
    fn download(&self, relative: &str, max_size: Option<u64>) -> Result<tempfile::NamedTempFile, DistroError> {
        self.ensure_prepared()?;
        let target = scratch_file(&self.scratch_dir, relative)?;
        let target_path = target.path().to_string_lossy().into_owned();
        let limit = max_size.map(|size| size.to_string());
        let mut extra = vec!["--output", target_path.as_str()];
        if let Some(limit) = &limit {
            extra.extend(["--max-filesize", limit.as_str()]);
        }
        match self.curl(&extra, &self.url_for(relative))? {
            CurlOutcome::Ok => Ok(target),
            CurlOutcome::Missing(code) => Err(DistroError::fetch(
                relative,
                format!("not found on FTP server (curl exit {})", code),
            )),
            CurlOutcome::TooLarge => Err(too_large_to_inspect(relative)),
            CurlOutcome::Failed(reason) => Err(DistroError::Location(format!("{}: {}", self.location, reason))),
        }
    }
}

impl Fetcher for FtpFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Ftp
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        if self.prepared {
            return Ok(());
        }
        let base = format!("{}/", self.location.trim_end_matches('/'));
        match self.curl(&["--list-only", "--output", "/dev/null"], &base)? {
            CurlOutcome::Ok => {
                self.prepared = true;
                Ok(())
            }
            CurlOutcome::Missing(_) | CurlOutcome::TooLarge => Err(DistroError::Location(format!("{}: no such directory", self.location))),
            CurlOutcome::Failed(reason) => Err(DistroError::Location(format!("{}: {}", self.location, reason))),
        }
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        self.ensure_prepared()?;
        match self.curl(&["--head", "--output", "/dev/null"], &self.url_for(relative))? {
            CurlOutcome::Ok | CurlOutcome::TooLarge => Ok(true),
            CurlOutcome::Missing(_) => Ok(false),
            CurlOutcome::Failed(reason) => Err(DistroError::Location(format!("{}: {}", self.location, reason))),
        }
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        let file = self.download(relative, Some(MAX_SNIFF_BYTES))?;
        // --max-filesize cannot stop a transfer whose size the server
        // does not announce.
        let size = file
            .as_file()
            .metadata()
            .map_err(|e| DistroError::io(format!("failed to stat download of {}", relative), e))?
            .len();
        if size > MAX_SNIFF_BYTES {
            return Err(too_large_to_inspect(relative));
        }
        fs::read(file.path()).map_err(|e| DistroError::io(format!("failed to read download of {}", relative), e))
    }

    fn fetch_file(
        &mut self,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        // curl does the transfer itself, so only the endpoints are reported.
        meter.start(None, &format!("Retrieving file {}...", relative));
        let file = self.download(relative, None)?;
        let size = file.as_file().metadata().map(|m| m.len()).unwrap_or(0);
        meter.end(size);
        let path = persist(file)?;
        tracing::info!("fetched {} ({} bytes) to {}", self.url_for(relative), size, path);
        Ok(path)
    }

    fn cleanup(&mut self) {
        self.prepared = false;
    }
}
