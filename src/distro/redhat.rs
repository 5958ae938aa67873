//! Fedora, RHEL, CentOS and Scientific Linux trees.
//!
//! All four share one layout: a `.treeinfo` at the root naming the family
//! and the image paths, `images/pxeboot/` for the network install kernel
//! and `images/xen/` for the paravirt one. Older trees lack `.treeinfo`
//! and are recognised by a family-specific package directory instead.

use tracing::debug;

use super::treeinfo::TreeInfo;
use super::{DistroFamily, DistroSignature, HypervisorType, KernelLayout, read_text};
use crate::error::DistroError;
use crate::fetcher::Fetcher;

const PXE_KERNEL: &str = "images/pxeboot/vmlinuz";
const PXE_INITRD: &str = "images/pxeboot/initrd.img";
const XEN_KERNEL: &str = "images/xen/vmlinuz";
const XEN_INITRD: &str = "images/xen/initrd.img";
const BOOT_ISO: &str = "images/boot.iso";

struct Flavor {
    /// Prefixes of `[general] family` in `.treeinfo`.
    treeinfo_families: &'static [&'static str],
    /// Directories whose presence identifies a tree without `.treeinfo`.
    markers: &'static [&'static str],
}

fn flavor(family: DistroFamily) -> Flavor {
    match family {
        DistroFamily::Rhel => Flavor {
            treeinfo_families: &["Red Hat Enterprise Linux"],
            markers: &["Server", "Client", "RedHat"],
        },
        DistroFamily::Centos => Flavor {
            treeinfo_families: &["CentOS"],
            markers: &["CentOS"],
        },
        DistroFamily::Sl => Flavor {
            treeinfo_families: &["Scientific Linux"],
            markers: &["SL"],
        },
        _ => Flavor {
            treeinfo_families: &["Fedora"],
            markers: &["Fedora"],
        },
    }
}

/// Reads and parses `.treeinfo`; a missing or unparsable file is `None`.
fn treeinfo(fetcher: &mut dyn Fetcher) -> Result<Option<TreeInfo>, DistroError> {
    let Some(contents) = read_text(fetcher, ".treeinfo")? else {
        return Ok(None);
    };
    match TreeInfo::parse(&contents) {
        Ok(info) => Ok(Some(info)),
        Err(e) => {
            debug!("ignoring unparsable .treeinfo: {}", e);
            Ok(None)
        }
    }
}

pub(super) fn probe(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
    let flavor = flavor(sig.family);

    if let Some(info) = treeinfo(fetcher)? {
        let family = info.family().unwrap_or_default();
        debug!(".treeinfo family is '{}'", family);
        return Ok(flavor
            .treeinfo_families
            .iter()
            .any(|prefix| family.starts_with(prefix)));
    }

    if !fetcher.has_file(PXE_KERNEL)? {
        return Ok(false);
    }
    for marker in flavor.markers {
        if fetcher.has_file(marker)? {
            debug!("found {} marker directory '{}'", sig.family, marker);
            return Ok(true);
        }
    }
    Ok(false)
}

pub(super) fn kernel_layout(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
    let info = treeinfo(fetcher)?.unwrap_or_default();
    let (section, default_kernel, default_initrd) = match sig.hv_type {
        HypervisorType::Xen => ("xen", XEN_KERNEL, XEN_INITRD),
        HypervisorType::Hvm => (sig.arch.as_str(), PXE_KERNEL, PXE_INITRD),
    };

    let kernel = info.image(section, "kernel").unwrap_or_else(|| default_kernel.to_string());
    let initrd = info.image(section, "initrd").unwrap_or_else(|| default_initrd.to_string());
    let args = sig
        .network_uri()
        .map(|uri| format!("method={}", uri))
        .unwrap_or_default();

    Ok(KernelLayout { kernel, initrd, args })
}

pub(super) fn boot_iso(sig: &DistroSignature, fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
    let info = treeinfo(fetcher)?.unwrap_or_default();
    Ok(info.image(&sig.arch, "boot.iso").unwrap_or_else(|| BOOT_ISO.to_string()))
}
