//! Debian and Ubuntu installer trees (`dists/<suite>/main/installer-<arch>/`).
//!
//! Mirrors publish `current/images/MANIFEST` listing the netboot images;
//! Ubuntu CDs carry the same netboot files under `install/netboot/` with a
//! `version.info` instead.

use super::{DistroFamily, DistroSignature, HypervisorType, KernelLayout, debian_arch, read_text};
use crate::error::DistroError;
use crate::fetcher::Fetcher;

const MANIFEST: &str = "current/images/MANIFEST";
const CD_VERSION_INFO: &str = "install/netboot/version.info";

pub(super) fn probe_debian(_sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    let Some(manifest) = read_text(fetcher, MANIFEST)? else {
        return Ok(false);
    };
    Ok(manifest.contains("debian-installer") && !manifest.contains("ubuntu-installer"))
}

pub(super) fn probe_ubuntu(_sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    if let Some(info) = read_text(fetcher, CD_VERSION_INFO)?
        && info.to_ascii_lowercase().contains("ubuntu")
    {
        return Ok(true);
    }
    Ok(read_text(fetcher, MANIFEST)?.is_some_and(|manifest| manifest.contains("ubuntu-installer")))
}

/// Root of the netboot images, which differs between a mirror and a CD.
fn netboot_root(fetcher: &mut dyn Fetcher) -> Result<&'static str, DistroError> {
    if fetcher.has_file(MANIFEST)? {
        Ok("current/images/netboot")
    } else {
        Ok("install/netboot")
    }
}

pub(super) fn kernel_layout(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
    let root = netboot_root(fetcher)?;
    let (kernel, initrd) = match (sig.family, sig.hv_type) {
        (DistroFamily::Ubuntu, HypervisorType::Xen) => return Err(sig.no_xen_support()),
        (_, HypervisorType::Xen) => (format!("{}/xen/vmlinuz", root), format!("{}/xen/initrd.gz", root)),
        (family, HypervisorType::Hvm) => {
            let dir = format!("{}/{}-installer/{}", root, family, debian_arch(&sig.arch));
            (format!("{}/linux", dir), format!("{}/initrd.gz", dir))
        }
    };
    Ok(KernelLayout {
        kernel,
        initrd,
        args: String::new(),
    })
}

pub(super) fn boot_iso(_sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
    Ok(format!("{}/mini.iso", netboot_root(fetcher)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distro::tests_support::MapFetcher;

    const DEBIAN_MANIFEST: &str = "netboot/debian-installer/amd64/initrd.gz: netboot image\n";
    const UBUNTU_MANIFEST: &str = "netboot/ubuntu-installer/amd64/initrd.gz: netboot image\n";

    fn sig(family: DistroFamily, hv: HypervisorType) -> DistroSignature {
        DistroSignature::new(family, "http://m/debian/dists/lenny/main/installer-amd64/", hv, "x86_64")
    }

    #[test]
    fn manifest_tells_debian_from_ubuntu() {
        let mut debian = MapFetcher::with(&[(MANIFEST, DEBIAN_MANIFEST)]);
        let mut ubuntu = MapFetcher::with(&[(MANIFEST, UBUNTU_MANIFEST)]);
        assert!(probe_debian(&sig(DistroFamily::Debian, HypervisorType::Hvm), &mut debian).unwrap());
        assert!(!probe_ubuntu(&sig(DistroFamily::Ubuntu, HypervisorType::Hvm), &mut debian).unwrap());
        assert!(!probe_debian(&sig(DistroFamily::Debian, HypervisorType::Hvm), &mut ubuntu).unwrap());
        assert!(probe_ubuntu(&sig(DistroFamily::Ubuntu, HypervisorType::Hvm), &mut ubuntu).unwrap());
    }

    #[test]
    fn ubuntu_cd_is_detected_by_version_info() {
        let mut cd = MapFetcher::with(&[(CD_VERSION_INFO, "Ubuntu 8.04 \"Hardy Heron\"\n")]);
        let ubuntu = sig(DistroFamily::Ubuntu, HypervisorType::Hvm);
        assert!(probe_ubuntu(&ubuntu, &mut cd).unwrap());
        let layout = kernel_layout(&ubuntu, &mut cd).unwrap();
        assert_eq!(layout.kernel, "install/netboot/ubuntu-installer/amd64/linux");
        assert_eq!(boot_iso(&ubuntu, &mut cd).unwrap(), "install/netboot/mini.iso");
    }

    #[test]
    fn debian_layouts() {
        let mut fetcher = MapFetcher::with(&[(MANIFEST, DEBIAN_MANIFEST)]);
        let layout = kernel_layout(&sig(DistroFamily::Debian, HypervisorType::Hvm), &mut fetcher).unwrap();
        assert_eq!(layout.kernel, "current/images/netboot/debian-installer/amd64/linux");
        assert_eq!(layout.initrd, "current/images/netboot/debian-installer/amd64/initrd.gz");
        assert!(layout.args.is_empty());

        let layout = kernel_layout(&sig(DistroFamily::Debian, HypervisorType::Xen), &mut fetcher).unwrap();
        assert_eq!(layout.kernel, "current/images/netboot/xen/vmlinuz");
    }

    #[test]
    fn ubuntu_has_no_xen_kernel() {
        let mut fetcher = MapFetcher::with(&[(MANIFEST, UBUNTU_MANIFEST)]);
        let err = kernel_layout(&sig(DistroFamily::Ubuntu, HypervisorType::Xen), &mut fetcher).unwrap_err();
        assert!(matches!(err, DistroError::Acquisition(_)), "{}", err);
    }
}
