//! Mandriva trees; the root `VERSION` file names the distribution.

use super::{DistroSignature, HypervisorType, KernelLayout, read_text};
use crate::error::DistroError;
use crate::fetcher::Fetcher;

pub(super) fn probe(_sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    Ok(read_text(fetcher, "VERSION")?.is_some_and(|version| version.contains("Mandriva")))
}

pub(super) fn kernel_layout(sig: &DistroSignature, _fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
    if sig.hv_type == HypervisorType::Xen {
        return Err(sig.no_xen_support());
    }
    Ok(KernelLayout {
        kernel: "isolinux/alt0/vmlinuz".to_string(),
        initrd: "isolinux/alt0/all.rdz".to_string(),
        args: String::new(),
    })
}

pub(super) fn boot_iso(_sig: &DistroSignature, _fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
    Ok("install/images/boot.iso".to_string())
}
