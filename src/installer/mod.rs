//! Installers turn an install source into a boot configuration for the
//! guest's install run and for its first boot afterwards.
//!
//! [`DistroInstaller`] boots the distribution's own installer from a
//! kernel/initrd pair or a boot ISO; [`PxeInstaller`] leaves booting to
//! the network.

mod distro;
mod pxe;

use camino::{Utf8Path, Utf8PathBuf};
use strum::Display;

use crate::acquire::AcquireOptions;
use crate::distro::{DistroFamily, HypervisorType};
use crate::error::DistroError;
use crate::fetcher::TransportSettings;
use crate::progress::ProgressMeter;

pub use distro::DistroInstaller;
pub use pxe::PxeInstaller;

/// Device the guest firmware boots from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum BootDevice {
    Cdrom,
    Hd,
    Network,
}

/// How an install disk is attached to the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DiskDevice {
    Cdrom,
    Disk,
}

/// Backing of an install disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiskSource {
    Path(Utf8PathBuf),
    Volume { pool: String, volume: String },
}

/// Install media attached only for the install run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallDisk {
    pub source: DiskSource,
    pub device: DiskDevice,
    pub read_only: bool,
    /// Detached once installation has finished.
    pub transient: bool,
}

/// Direct kernel boot parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelBoot {
    pub kernel: Utf8PathBuf,
    pub initrd: Utf8PathBuf,
    pub args: String,
}

/// What the guest boots from. A kernel takes precedence over the boot
/// device when both are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    pub boot_device: BootDevice,
    pub kernel: Option<KernelBoot>,
}

/// Environment an installer prepares in.
#[derive(Debug, Clone, Copy)]
pub struct InstallContext<'a> {
    pub scratch_dir: &'a Utf8Path,
    pub hv_type: HypervisorType,
    pub arch: &'a str,
    /// Family hint, usually from the selected OS variant.
    pub distro: Option<DistroFamily>,
    pub settings: &'a TransportSettings,
}

impl InstallContext<'_> {
    pub fn acquire_options(&self) -> AcquireOptions {
        AcquireOptions {
            scratch_dir: self.scratch_dir.to_owned(),
            hv_type: self.hv_type,
            distro: self.distro,
            arch: self.arch.to_string(),
        }
    }
}

/// Prepares the install media for a guest and describes how it boots.
pub trait Installer {
    /// Acquires whatever the install run needs. Calling it again first
    /// releases what an earlier call acquired.
    fn prepare(&mut self, ctx: &InstallContext<'_>, meter: &mut dyn ProgressMeter) -> Result<(), DistroError>;

    /// Boot configuration for the install run (`install == true`) or for
    /// booting the installed system.
    fn boot_config(&self, install: bool) -> BootConfig;

    /// Media to attach during the install run.
    fn install_disk(&self) -> Option<&InstallDisk> {
        None
    }

    /// Removes temporary files created by [`prepare`](Self::prepare).
    fn cleanup(&mut self) {}
}
