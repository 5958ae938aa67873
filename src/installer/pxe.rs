use super::{BootConfig, BootDevice, InstallContext, Installer};
use crate::error::DistroError;
use crate::progress::ProgressMeter;

/// Installs over PXE; nothing to acquire locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct PxeInstaller;

impl Installer for PxeInstaller {
    fn prepare(&mut self, _ctx: &InstallContext<'_>, _meter: &mut dyn ProgressMeter) -> Result<(), DistroError> {
        Ok(())
    }

    fn boot_config(&self, install: bool) -> BootConfig {
        BootConfig {
            boot_device: if install { BootDevice::Network } else { BootDevice::Hd },
            kernel: None,
        }
    }
}
