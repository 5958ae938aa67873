//! Top-level acquisition entry points.
//!
//! Each call selects a fetcher for the location, prepares it, walks the
//! distribution candidates until one matches and then fetches the matched
//! family's artifacts. The fetcher is cleaned up on every exit path.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

use crate::distro::{self, DistroFamily, HypervisorType, KernelInitrd};
use crate::error::DistroError;
use crate::fetcher::{Fetcher, PreparedFetcher, TransportSettings, select_fetcher};
use crate::progress::ProgressMeter;

/// Hints and scratch space for one acquisition.
#[derive(Debug, Clone)]
pub struct AcquireOptions {
    /// Mount points and downloads are created here.
    pub scratch_dir: Utf8PathBuf,
    pub hv_type: HypervisorType,
    /// Restricts probing to one family (plus the generic fallback).
    pub distro: Option<DistroFamily>,
    pub arch: String,
}

impl AcquireOptions {
    pub fn new(scratch_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            hv_type: HypervisorType::default(),
            distro: None,
            arch: distro::host_arch(),
        }
    }
}

/// What an acquisition produced. The caller owns and removes the files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionResult {
    KernelInitrd(KernelInitrd),
    Iso(Utf8PathBuf),
}

impl AcquisitionResult {
    /// Every local file the result refers to.
    pub fn paths(&self) -> Vec<&Utf8Path> {
        match self {
            Self::KernelInitrd(k) => vec![k.kernel.as_path(), k.initrd.as_path()],
            Self::Iso(path) => vec![path.as_path()],
        }
    }
}

impl From<KernelInitrd> for AcquisitionResult {
    fn from(value: KernelInitrd) -> Self {
        Self::KernelInitrd(value)
    }
}

/// Fetches the install kernel and initrd of the tree at `location`.
pub fn acquire_kernel(
    location: &str,
    options: &AcquireOptions,
    settings: &TransportSettings,
    meter: &mut dyn ProgressMeter,
) -> Result<KernelInitrd, DistroError> {
    let mut fetcher = select_fetcher(location, &options.scratch_dir, settings)?;
    acquire_kernel_with(fetcher.as_mut(), options, meter)
}

/// Fetches the boot ISO of the tree at `location`.
pub fn acquire_boot_disk(
    location: &str,
    options: &AcquireOptions,
    settings: &TransportSettings,
    meter: &mut dyn ProgressMeter,
) -> Result<Utf8PathBuf, DistroError> {
    let mut fetcher = select_fetcher(location, &options.scratch_dir, settings)?;
    acquire_boot_disk_with(fetcher.as_mut(), options, meter)
}

/// Identifies the family of the tree at `location` without fetching
/// any artifact.
pub fn detect_distro(
    location: &str,
    options: &AcquireOptions,
    settings: &TransportSettings,
) -> Result<DistroFamily, DistroError> {
    let mut fetcher = select_fetcher(location, &options.scratch_dir, settings)?;
    detect_distro_with(fetcher.as_mut(), options)
}

/// [`acquire_kernel`] over a caller-supplied fetcher.
pub fn acquire_kernel_with(
    fetcher: &mut dyn Fetcher,
    options: &AcquireOptions,
    meter: &mut dyn ProgressMeter,
) -> Result<KernelInitrd, DistroError> {
    with_store(fetcher, options, |sig, fetcher| sig.acquire_kernel(fetcher, meter))
}

/// [`acquire_boot_disk`] over a caller-supplied fetcher.
pub fn acquire_boot_disk_with(
    fetcher: &mut dyn Fetcher,
    options: &AcquireOptions,
    meter: &mut dyn ProgressMeter,
) -> Result<Utf8PathBuf, DistroError> {
    with_store(fetcher, options, |sig, fetcher| sig.acquire_boot_disk(fetcher, meter))
}

/// [`detect_distro`] over a caller-supplied fetcher.
pub fn detect_distro_with(fetcher: &mut dyn Fetcher, options: &AcquireOptions) -> Result<DistroFamily, DistroError> {
    with_store(fetcher, options, |sig, _| Ok(sig.family))
}

fn with_store<T>(
    fetcher: &mut dyn Fetcher,
    options: &AcquireOptions,
    action: impl FnOnce(&distro::DistroSignature, &mut dyn Fetcher) -> Result<T, DistroError>,
) -> Result<T, DistroError> {
    let uri = fetcher.location().to_string();
    info!("using {} fetcher for {}", fetcher.kind(), uri);

    let mut prepared = PreparedFetcher::prepare(fetcher).map_err(|e| match e {
        DistroError::Location(_) | DistroError::Interrupted => e,
        other => DistroError::Location(format!("{}: {}", uri, other)),
    })?;

    let candidates = distro::candidates(&uri, options.hv_type, &options.arch, options.distro);
    let result = distro::find_store(prepared.fetcher(), &candidates)
        .and_then(|matched| action(matched, prepared.fetcher()));
    prepared.finish();
    result
}
