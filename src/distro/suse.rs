//! SUSE and openSUSE trees, identified by the YaST `directory.yast` index.

use super::{DistroSignature, HypervisorType, KernelLayout, suse_arch};
use crate::error::DistroError;
use crate::fetcher::Fetcher;

pub(super) fn probe(_sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    fetcher.has_file("directory.yast")
}

pub(super) fn kernel_layout(sig: &DistroSignature, _fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
    let arch = suse_arch(&sig.arch);
    let (kernel, initrd) = match sig.hv_type {
        HypervisorType::Xen => (
            format!("boot/{}/vmlinuz-xen", arch),
            format!("boot/{}/initrd-xen", arch),
        ),
        HypervisorType::Hvm => (
            format!("boot/{}/loader/linux", arch),
            format!("boot/{}/loader/initrd", arch),
        ),
    };
    let args = sig
        .network_uri()
        .map(|uri| format!("install={}", uri))
        .unwrap_or_default();
    Ok(KernelLayout { kernel, initrd, args })
}

pub(super) fn boot_iso(sig: &DistroSignature, _fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
    Ok(format!("boot/{}/boot.iso", suse_arch(&sig.arch)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::DistroFamily;
    use crate::distro::tests_support::MapFetcher;

    #[test]
    fn detects_yast_index() {
        let sig = DistroSignature::new(DistroFamily::Suse, "ftp://m/suse/", HypervisorType::Hvm, "i686");
        assert!(probe(&sig, &mut MapFetcher::with(&[("directory.yast", "boot\n")])).unwrap());
        assert!(!probe(&sig, &mut MapFetcher::with(&[])).unwrap());
    }

    #[test]
    fn layout_maps_ix86_and_points_installer_at_tree() {
        let sig = DistroSignature::new(DistroFamily::Suse, "ftp://m/suse/", HypervisorType::Hvm, "i686");
        let layout = kernel_layout(&sig, &mut MapFetcher::with(&[])).unwrap();
        assert_eq!(layout.kernel, "boot/i386/loader/linux");
        assert_eq!(layout.initrd, "boot/i386/loader/initrd");
        assert_eq!(layout.args, "install=ftp://m/suse/");
    }

    #[test]
    fn xen_layout() {
        let sig = DistroSignature::new(DistroFamily::Suse, "ftp://m/suse/", HypervisorType::Xen, "x86_64");
        let layout = kernel_layout(&sig, &mut MapFetcher::with(&[])).unwrap();
        assert_eq!(layout.kernel, "boot/x86_64/vmlinuz-xen");
        assert_eq!(layout.initrd, "boot/x86_64/initrd-xen");
        assert_eq!(boot_iso(&sig, &mut MapFetcher::with(&[])).unwrap(), "boot/x86_64/boot.iso");
    }
}
