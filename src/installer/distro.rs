use std::fs;

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use super::{BootConfig, BootDevice, DiskDevice, DiskSource, InstallContext, InstallDisk, Installer, KernelBoot};
use crate::acquire;
use crate::error::DistroError;
use crate::location::InstallLocation;
use crate::progress::ProgressMeter;

/// Boots the distribution's own installer.
///
/// In cdrom mode the guest boots a boot ISO: a local image or pool volume
/// is attached as is, a network tree has its ISO acquired. Otherwise the
/// installer kernel and initrd are booted directly, either the ones given
/// with [`with_kernel`](Self::with_kernel) or ones acquired from the tree.
#[derive(Debug, Default)]
pub struct DistroInstaller {
    location: Option<InstallLocation>,
    cdrom: bool,
    local_kernel: Option<(Utf8PathBuf, Utf8PathBuf)>,
    extra_args: Option<String>,
    kernel: Option<KernelBoot>,
    install_disk: Option<InstallDisk>,
    tmpfiles: Vec<Utf8PathBuf>,
}

impl DistroInstaller {
    pub fn new(location: Option<InstallLocation>) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    pub fn cdrom(mut self, cdrom: bool) -> Self {
        self.cdrom = cdrom;
        self
    }

    /// Boots this kernel and initrd instead of acquiring them.
    pub fn with_kernel(mut self, kernel: impl Into<Utf8PathBuf>, initrd: impl Into<Utf8PathBuf>) -> Self {
        self.local_kernel = Some((kernel.into(), initrd.into()));
        self
    }

    /// User kernel arguments, prepended to the ones the distribution needs.
    pub fn with_extra_args(mut self, args: impl Into<String>) -> Self {
        self.extra_args = Some(args.into());
        self
    }

    pub fn location(&self) -> Option<&InstallLocation> {
        self.location.as_ref()
    }

    /// Files acquired by the last [`prepare`](Installer::prepare).
    pub fn tmpfiles(&self) -> &[Utf8PathBuf] {
        &self.tmpfiles
    }

    fn prepare_cdrom(&mut self, ctx: &InstallContext<'_>, meter: &mut dyn ProgressMeter) -> Result<(), DistroError> {
        let source = match &self.location {
            // boot from a cdrom already allocated to the guest
            None => return Ok(()),
            Some(InstallLocation::PoolVolume { pool, volume }) => DiskSource::Volume {
                pool: pool.clone(),
                volume: volume.clone(),
            },
            Some(InstallLocation::LocalPath(path)) => DiskSource::Path(path.clone()),
            Some(location @ InstallLocation::Network(_)) => {
                let uri = location.to_string();
                let iso = acquire::acquire_boot_disk(&uri, &ctx.acquire_options(), ctx.settings, meter)?;
                self.tmpfiles.push(iso.clone());
                DiskSource::Path(iso)
            }
        };

        self.install_disk = Some(InstallDisk {
            source,
            device: DiskDevice::Cdrom,
            read_only: true,
            transient: true,
        });
        Ok(())
    }

    fn prepare_kernel(&mut self, ctx: &InstallContext<'_>, meter: &mut dyn ProgressMeter) -> Result<(), DistroError> {
        if let Some((kernel, initrd)) = &self.local_kernel {
            self.kernel = Some(KernelBoot {
                kernel: kernel.clone(),
                initrd: initrd.clone(),
                args: self.extra_args.clone().unwrap_or_default(),
            });
        } else {
            let uri = match &self.location {
                Some(location) => location.as_uri().ok_or_else(|| {
                    DistroError::Validation(format!(
                        "cannot acquire a kernel from storage volume {}; use cdrom mode",
                        location
                    ))
                })?,
                None => {
                    return Err(DistroError::Validation(
                        "an install location is required to acquire a kernel".to_string(),
                    ));
                }
            };
            let acquired = acquire::acquire_kernel(uri, &ctx.acquire_options(), ctx.settings, meter)?;
            self.tmpfiles.push(acquired.kernel.clone());
            self.tmpfiles.push(acquired.initrd.clone());

            let args = match &self.extra_args {
                Some(extra) if !acquired.extra_args.is_empty() => format!("{} {}", extra, acquired.extra_args),
                Some(extra) => extra.clone(),
                None => acquired.extra_args,
            };
            self.kernel = Some(KernelBoot {
                kernel: acquired.kernel,
                initrd: acquired.initrd,
                args,
            });
        }

        // local install media the kernel cannot read over the network
        if let Some(media) = self.location.as_ref().and_then(InstallLocation::local_media) {
            debug!("attaching {} as install disk", media);
            self.install_disk = Some(InstallDisk {
                source: DiskSource::Path(media.to_owned()),
                device: DiskDevice::Disk,
                read_only: true,
                transient: true,
            });
        }
        Ok(())
    }
}

impl Installer for DistroInstaller {
    fn prepare(&mut self, ctx: &InstallContext<'_>, meter: &mut dyn ProgressMeter) -> Result<(), DistroError> {
        self.cleanup();
        self.kernel = None;
        self.install_disk = None;

        if self.cdrom {
            self.prepare_cdrom(ctx, meter)
        } else {
            self.prepare_kernel(ctx, meter)
        }
    }

    fn boot_config(&self, install: bool) -> BootConfig {
        if !install {
            return BootConfig {
                boot_device: BootDevice::Hd,
                kernel: None,
            };
        }
        BootConfig {
            boot_device: if self.cdrom { BootDevice::Cdrom } else { BootDevice::Hd },
            kernel: if self.cdrom { None } else { self.kernel.clone() },
        }
    }

    fn install_disk(&self) -> Option<&InstallDisk> {
        self.install_disk.as_ref()
    }

    fn cleanup(&mut self) {
        for file in self.tmpfiles.drain(..) {
            debug!("removing {}", file);
            if let Err(e) = fs::remove_file(&file) {
                warn!("failed to remove temporary file {}: {}", file, e);
            }
        }
    }
}
