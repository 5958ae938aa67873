//! Transport abstraction over install sources.
//!
//! A [`Fetcher`] reads files relative to the base of an install tree,
//! whatever the transport: HTTP, FTP, an NFS or loop mount, or a plain
//! local directory. [`select_fetcher`] picks the implementation from the
//! location string and [`PreparedFetcher`] ties `prepare` to a guaranteed
//! `cleanup`.

mod direct;
mod ftp;
mod http;
mod mounted;

use std::fs::File;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use strum::Display;
use tempfile::NamedTempFile;

use crate::error::{DistroError, io_error_kind_message};
use crate::executor::CommandExecutor;
use crate::interrupt;
use crate::location::Scheme;
use crate::privilege::PrivilegeMethod;
use crate::progress::ProgressMeter;

pub use direct::DirectFetcher;
pub use ftp::FtpFetcher;
pub use http::HttpFetcher;
pub use mounted::MountedFetcher;

/// Small files read for content sniffing are capped at this size.
pub const MAX_SNIFF_BYTES: u64 = 1024 * 1024;

const COPY_CHUNK: usize = 64 * 1024;

/// Which transport a fetcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum FetcherKind {
    Http,
    Ftp,
    Mounted,
    Direct,
    /// Fetchers supplied by callers (tests, embedders).
    Custom,
}

/// Uniform access to the files of an install tree.
///
/// Lifecycle: constructed unprepared, [`prepare`](Fetcher::prepare)d once,
/// used for any number of lookups, then [`cleanup`](Fetcher::cleanup)ed.
/// Paths passed to the lookup methods are relative to the tree root.
pub trait Fetcher {
    fn kind(&self) -> FetcherKind;

    /// The location string this fetcher was built for.
    fn location(&self) -> &str;

    /// Establishes access: mounts, connects or verifies the local path.
    ///
    /// Fails with [`DistroError::Location`] if the source is unusable.
    fn prepare(&mut self) -> Result<(), DistroError>;

    /// Cheap existence check.
    ///
    /// `Ok(false)` for an ordinary "not found"; `Err` only for failures of
    /// the transport itself.
    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError>;

    /// Reads a small file into memory (release notes, `.treeinfo`).
    ///
    /// Fails with [`DistroError::Fetch`] if the file is absent.
    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError>;

    /// Retrieves one file into the scratch directory and returns its path.
    ///
    /// Fails with [`DistroError::Fetch`] if the file is absent. The caller
    /// owns the returned file.
    fn fetch_file(
        &mut self,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError>;

    /// Unmounts or disconnects. Idempotent and infallible: secondary
    /// failures are logged.
    fn cleanup(&mut self);
}

/// Settings shared by every fetcher of a process.
#[derive(Clone)]
pub struct TransportSettings {
    /// Runs mount, umount and curl.
    pub executor: Arc<dyn CommandExecutor>,
    /// Wraps mount and umount.
    pub privilege: Option<PrivilegeMethod>,
    /// Applies to every HTTP request and FTP transfer.
    pub timeout: Duration,
    /// FTP login; anonymous when `None`.
    pub ftp_credentials: Option<(String, String)>,
}

impl TransportSettings {
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            privilege: None,
            timeout: Duration::from_secs(60),
            ftp_credentials: None,
        }
    }
}

impl std::fmt::Debug for TransportSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSettings")
            .field("privilege", &self.privilege)
            .field("timeout", &self.timeout)
            .field("ftp_user", &self.ftp_credentials.as_ref().map(|(user, _)| user))
            .finish()
    }
}

/// Chooses a fetcher by the prefix of `uri`.
///
/// `http://` and `ftp://` get network fetchers, `nfs://` a mount-backed
/// one; anything else is read directly if it is an existing directory and
/// loop-mounted otherwise.
pub fn select_fetcher(
    uri: &str,
    scratch_dir: &Utf8Path,
    settings: &TransportSettings,
) -> Result<Box<dyn Fetcher>, DistroError> {
    let scheme = Scheme::classify(uri);
    tracing::debug!("selecting {} fetcher for {}", scheme, uri);
    let fetcher: Box<dyn Fetcher> = match scheme {
        Scheme::Http => Box::new(HttpFetcher::new(uri, scratch_dir, settings.timeout)?),
        Scheme::Ftp => Box::new(FtpFetcher::new(uri, scratch_dir, settings)?),
        Scheme::Nfs | Scheme::LocalDevice => Box::new(MountedFetcher::new(uri, scratch_dir, settings)),
        Scheme::LocalDir => Box::new(DirectFetcher::new(uri, scratch_dir)),
    };
    Ok(fetcher)
}

/// A prepared fetcher whose `cleanup` runs exactly once.
///
/// Cleanup happens on [`finish`](Self::finish) or, on every other exit
/// path including unwinding, when the guard is dropped.
pub struct PreparedFetcher<'a> {
    fetcher: &'a mut dyn Fetcher,
    cleaned_up: bool,
}

impl<'a> PreparedFetcher<'a> {
    /// Prepares `fetcher`. Nothing needs releasing if this fails.
    pub fn prepare(fetcher: &'a mut dyn Fetcher) -> Result<Self, DistroError> {
        fetcher.prepare()?;
        Ok(Self {
            fetcher,
            cleaned_up: false,
        })
    }

    pub fn fetcher(&mut self) -> &mut dyn Fetcher {
        &mut *self.fetcher
    }

    /// Cleans up now instead of at drop.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.cleaned_up {
            self.cleaned_up = true;
            self.fetcher.cleanup();
        }
    }
}

impl Drop for PreparedFetcher<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Joins a tree-relative path onto a base URL or path with exactly one `/`.
pub(crate) fn join_relative(base: &str, relative: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), relative.trim_start_matches('/'))
}

/// Creates the scratch file a download of `relative` is written to.
///
/// The file is removed again if it is dropped before [`persist`].
pub(crate) fn scratch_file(scratch_dir: &Utf8Path, relative: &str) -> Result<NamedTempFile, DistroError> {
    let base = Utf8Path::new(relative).file_name().unwrap_or("download");
    tempfile::Builder::new()
        .prefix(&format!("distro-probe-{}.", base))
        .tempfile_in(scratch_dir)
        .map_err(|e| DistroError::io(format!("failed to create scratch file in {}", scratch_dir), e))
}

/// Keeps a finished download and hands its path to the caller.
pub(crate) fn persist(file: NamedTempFile) -> Result<Utf8PathBuf, DistroError> {
    let path = file
        .into_temp_path()
        .keep()
        .map_err(|e| DistroError::io("failed to keep downloaded file", e.error))?;
    Utf8PathBuf::from_path_buf(path)
        .map_err(|p| DistroError::Validation(format!("path is not valid UTF-8: {}", p.display())))
}

/// Copies `relative` from `reader` into `out`, reporting progress under
/// `text`.
///
/// Stops with [`DistroError::Interrupted`] between chunks once Ctrl-C was
/// pressed; the partial file is removed when `out`'s owner drops it.
pub(crate) fn copy_with_progress<R: Read>(
    reader: &mut R,
    out: &mut File,
    relative: &str,
    size: Option<u64>,
    text: &str,
    meter: &mut dyn ProgressMeter,
) -> Result<u64, DistroError> {
    let failed = |e: std::io::Error| DistroError::fetch(relative, format!("copy failed: {}", io_error_kind_message(&e)));
    meter.start(size, text);
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        interrupt::check()?;
        let n = reader.read(&mut buf).map_err(failed)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(failed)?;
        total += n as u64;
        meter.update(total);
    }
    out.flush().map_err(failed)?;
    meter.end(total);
    Ok(total)
}

/// The error for a probed file larger than [`MAX_SNIFF_BYTES`].
pub(crate) fn too_large_to_inspect(relative: &str) -> DistroError {
    DistroError::fetch(
        relative,
        format!("file too large to inspect (over {} bytes)", MAX_SNIFF_BYTES),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{CommandSpec, ExecutionResult};

    struct NoopExecutor;

    impl CommandExecutor for NoopExecutor {
        fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
            anyhow::bail!("unexpected command: {}", spec.display())
        }
    }

    fn settings() -> TransportSettings {
        TransportSettings::new(Arc::new(NoopExecutor))
    }

    #[test]
    fn join_relative_normalizes_slashes() {
        assert_eq!(join_relative("http://m/tree/", "/images/boot.iso"), "http://m/tree/images/boot.iso");
        assert_eq!(join_relative("/srv/tree", "images/boot.iso"), "/srv/tree/images/boot.iso");
    }

    #[test]
    fn select_fetcher_by_scheme() {
        let scratch = tempfile::tempdir().unwrap();
        let scratch = Utf8Path::from_path(scratch.path()).unwrap();
        let settings = settings();

        let cases = [
            ("http://mirror.example/f10/", FetcherKind::Http),
            ("ftp://mirror.example/f10/", FetcherKind::Ftp),
            ("nfs://server/export/f10", FetcherKind::Mounted),
            ("/nonexistent/boot.iso", FetcherKind::Mounted),
            (scratch.as_str(), FetcherKind::Direct),
        ];
        for (uri, expected) in cases {
            let fetcher = select_fetcher(uri, scratch, &settings).unwrap();
            assert_eq!(fetcher.kind(), expected, "wrong fetcher for {}", uri);
            assert_eq!(fetcher.location(), uri);
        }
    }

    #[test]
    fn scratch_file_is_removed_unless_persisted() {
        let scratch = tempfile::tempdir().unwrap();
        let scratch = Utf8Path::from_path(scratch.path()).unwrap();

        let dropped = scratch_file(scratch, "images/pxeboot/vmlinuz").unwrap();
        let dropped_path = dropped.path().to_path_buf();
        drop(dropped);
        assert!(!dropped_path.exists());

        let kept = persist(scratch_file(scratch, "images/pxeboot/vmlinuz").unwrap()).unwrap();
        assert!(kept.exists());
        assert!(kept.file_name().unwrap().starts_with("distro-probe-vmlinuz."));
        assert_eq!(kept.parent().unwrap(), scratch);
    }
}
