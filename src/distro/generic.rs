//! Last-resort layout for trees no family probe recognised.
//!
//! The probe always matches; the layout lookups then try the well-known
//! kernel and ISO locations of every family and give up with
//! [`DistroError::NoInstallableDistro`] when none is present.

use super::{DistroSignature, HypervisorType, KernelLayout, first_present, suse_arch};
use crate::error::DistroError;
use crate::fetcher::Fetcher;

pub(super) fn probe(_sig: &DistroSignature, _fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    Ok(true)
}

fn kernel_candidates(sig: &DistroSignature) -> Vec<(String, String)> {
    let arch = suse_arch(&sig.arch);
    match sig.hv_type {
        HypervisorType::Xen => vec![
            ("images/xen/vmlinuz".to_string(), "images/xen/initrd.img".to_string()),
            (format!("boot/{}/vmlinuz-xen", arch), format!("boot/{}/initrd-xen", arch)),
            (
                "current/images/netboot/xen/vmlinuz".to_string(),
                "current/images/netboot/xen/initrd.gz".to_string(),
            ),
        ],
        HypervisorType::Hvm => vec![
            ("images/pxeboot/vmlinuz".to_string(), "images/pxeboot/initrd.img".to_string()),
            (format!("boot/{}/loader/linux", arch), format!("boot/{}/loader/initrd", arch)),
        ],
    }
}

const ISO_CANDIDATES: &[&str] = &[
    "images/boot.iso",
    "boot/boot.iso",
    "current/images/netboot/mini.iso",
    "install/images/boot.iso",
];

pub(super) fn kernel_layout(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
    for (kernel, initrd) in kernel_candidates(sig) {
        if fetcher.has_file(&kernel)? && fetcher.has_file(&initrd)? {
            return Ok(KernelLayout {
                kernel,
                initrd,
                args: String::new(),
            });
        }
    }
    Err(DistroError::NoInstallableDistro { uri: sig.uri.clone() })
}

pub(super) fn boot_iso(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
    first_present(fetcher, ISO_CANDIDATES)?
        .map(str::to_string)
        .ok_or_else(|| DistroError::NoInstallableDistro { uri: sig.uri.clone() })
}
