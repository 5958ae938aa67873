//! Distribution signatures and the ordered probe over them.
//!
//! Every supported family is described by a [`DistroSignature`] plus three
//! functions in a static table: a cheap probe that recognises the tree
//! layout, and the lookups that name its kernel/initrd pair and boot ISO.
//! [`candidates`] builds the ordered list for one acquisition and
//! [`find_store`] walks it until a probe matches.

mod debian;
mod generic;
mod mandriva;
mod redhat;
mod suse;
pub mod treeinfo;

#[cfg(test)]
pub(crate) mod tests_support;

use std::fmt;
use std::fs;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use tracing::{debug, info};

use crate::error::DistroError;
use crate::fetcher::Fetcher;
use crate::interrupt;
use crate::location::Scheme;
use crate::osdict;
use crate::progress::ProgressMeter;

/// Operating system families with a known install tree layout.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DistroFamily {
    Fedora,
    Rhel,
    Centos,
    /// Scientific Linux
    Sl,
    Suse,
    Debian,
    Ubuntu,
    Mandriva,
    /// Best-effort fallback for unrecognised trees.
    Generic,
}

impl DistroFamily {
    /// Probe order when no hint is given. Red Hat derivatives share a
    /// layout, so the more specific and more common ones come first.
    /// [`Generic`](Self::Generic) is appended separately, always last.
    pub const PROBE_ORDER: [Self; 8] = [
        Self::Fedora,
        Self::Rhel,
        Self::Centos,
        Self::Sl,
        Self::Suse,
        Self::Debian,
        Self::Ubuntu,
        Self::Mandriva,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Fedora => "Fedora",
            Self::Rhel => "Red Hat Enterprise Linux",
            Self::Centos => "CentOS",
            Self::Sl => "Scientific Linux",
            Self::Suse => "SUSE",
            Self::Debian => "Debian",
            Self::Ubuntu => "Ubuntu",
            Self::Mandriva => "Mandriva",
            Self::Generic => "Generic",
        }
    }

    /// Resolves a user or OS-table hint to a family.
    ///
    /// Accepts a family key (`fedora`), an OS variant key whose table entry
    /// names a distro (`fedora10`, `sles10`), a known alias (`opensuse`),
    /// or any string starting with a family key (`rhel5.4`).
    pub fn from_hint(hint: &str) -> Result<Self, DistroError> {
        let hint = hint.trim().to_ascii_lowercase();
        if let Ok(family) = Self::from_str(&hint) {
            return Ok(family);
        }

        if let Ok(dict) = osdict::os_dict()
            && let Some(distro) = dict.find_variant(&hint).and_then(|(_, entry)| entry.distro.as_deref())
            && let Ok(family) = Self::from_str(distro)
        {
            return Ok(family);
        }

        const ALIASES: &[(&str, DistroFamily)] = &[
            ("sles", DistroFamily::Suse),
            ("sled", DistroFamily::Suse),
            ("opensuse", DistroFamily::Suse),
            ("redhat", DistroFamily::Rhel),
            ("scientific", DistroFamily::Sl),
        ];
        if let Some((_, family)) = ALIASES.iter().find(|(alias, _)| hint.starts_with(alias)) {
            return Ok(*family);
        }

        let mut prefixed: Vec<Self> = Self::PROBE_ORDER
            .into_iter()
            .filter(|family| hint.starts_with(<&'static str>::from(*family)))
            .collect();
        // longest key wins so that a future "sles" key beats "sl"
        prefixed.sort_by_key(|family| std::cmp::Reverse(<&'static str>::from(*family).len()));
        prefixed
            .first()
            .copied()
            .ok_or_else(|| DistroError::Validation(format!("unknown distribution '{}'", hint)))
    }
}

/// Which kind of guest the artifacts must boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HypervisorType {
    /// Paravirtualised Xen guest; needs a Xen-aware kernel.
    Xen,
    /// Fully virtualised guest (KVM, QEMU, Xen HVM).
    #[default]
    Hvm,
}

impl FromStr for HypervisorType {
    type Err = DistroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xen" | "linux" => Ok(Self::Xen),
            "hvm" | "kvm" | "qemu" | "kqemu" => Ok(Self::Hvm),
            other => Err(DistroError::Validation(format!("unknown hypervisor type '{}'", other))),
        }
    }
}

impl fmt::Display for HypervisorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xen => f.write_str("xen"),
            Self::Hvm => f.write_str("hvm"),
        }
    }
}

/// Architecture of this host in the naming install trees use.
pub fn host_arch() -> String {
    match std::env::consts::ARCH {
        "x86" => "i686".to_string(),
        "powerpc64" => "ppc64".to_string(),
        "powerpc" => "ppc".to_string(),
        other => other.to_string(),
    }
}

fn is_ix86(arch: &str) -> bool {
    matches!(arch, "i386" | "i486" | "i586" | "i686")
}

/// Debian and Ubuntu name their architectures after dpkg.
pub(crate) fn debian_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        a if is_ix86(a) => "i386",
        other => other,
    }
}

pub(crate) fn suse_arch(arch: &str) -> &str {
    if is_ix86(arch) { "i386" } else { arch }
}

/// Kernel and initrd paths relative to the tree, plus the kernel
/// arguments the installer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelLayout {
    pub kernel: String,
    pub initrd: String,
    pub args: String,
}

/// Local copies of a kernel/initrd pair and the arguments to boot them with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelInitrd {
    pub kernel: Utf8PathBuf,
    pub initrd: Utf8PathBuf,
    pub extra_args: String,
}

type ProbeFn = fn(&DistroSignature, &mut dyn Fetcher) -> Result<bool, DistroError>;
type LayoutFn = fn(&DistroSignature, &mut dyn Fetcher) -> Result<KernelLayout, DistroError>;
type BootIsoFn = fn(&DistroSignature, &mut dyn Fetcher) -> Result<String, DistroError>;

/// Per-family behaviour.
struct FamilyOps {
    probe: ProbeFn,
    kernel_layout: LayoutFn,
    boot_iso: BootIsoFn,
}

fn ops(family: DistroFamily) -> FamilyOps {
    match family {
        DistroFamily::Fedora | DistroFamily::Rhel | DistroFamily::Centos | DistroFamily::Sl => FamilyOps {
            probe: redhat::probe,
            kernel_layout: redhat::kernel_layout,
            boot_iso: redhat::boot_iso,
        },
        DistroFamily::Suse => FamilyOps {
            probe: suse::probe,
            kernel_layout: suse::kernel_layout,
            boot_iso: suse::boot_iso,
        },
        DistroFamily::Debian => FamilyOps {
            probe: debian::probe_debian,
            kernel_layout: debian::kernel_layout,
            boot_iso: debian::boot_iso,
        },
        DistroFamily::Ubuntu => FamilyOps {
            probe: debian::probe_ubuntu,
            kernel_layout: debian::kernel_layout,
            boot_iso: debian::boot_iso,
        },
        DistroFamily::Mandriva => FamilyOps {
            probe: mandriva::probe,
            kernel_layout: mandriva::kernel_layout,
            boot_iso: mandriva::boot_iso,
        },
        DistroFamily::Generic => FamilyOps {
            probe: generic::probe,
            kernel_layout: generic::kernel_layout,
            boot_iso: generic::boot_iso,
        },
    }
}

/// Identifies one family's tree layout for one acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistroSignature {
    pub family: DistroFamily,
    /// Base URI of the tree, as given by the caller.
    pub uri: String,
    pub hv_type: HypervisorType,
    pub arch: String,
}

impl DistroSignature {
    pub fn new(family: DistroFamily, uri: &str, hv_type: HypervisorType, arch: &str) -> Self {
        Self {
            family,
            uri: uri.to_string(),
            hv_type,
            arch: arch.to_string(),
        }
    }

    /// The tree URI if the installer can reach it over the network.
    pub fn network_uri(&self) -> Option<&str> {
        Scheme::classify(&self.uri).is_network().then_some(self.uri.as_str())
    }

    /// Runs this family's probe. Only existence and small-file checks.
    pub fn is_valid_store(&self, fetcher: &mut dyn Fetcher) -> Result<bool, DistroError> {
        (ops(self.family).probe)(self, fetcher)
    }

    pub fn kernel_layout(&self, fetcher: &mut dyn Fetcher) -> Result<KernelLayout, DistroError> {
        (ops(self.family).kernel_layout)(self, fetcher)
    }

    pub fn boot_iso_path(&self, fetcher: &mut dyn Fetcher) -> Result<String, DistroError> {
        (ops(self.family).boot_iso)(self, fetcher)
    }

    /// Fetches the kernel and initrd of a matched tree.
    pub fn acquire_kernel(
        &self,
        fetcher: &mut dyn Fetcher,
        meter: &mut dyn ProgressMeter,
    ) -> Result<KernelInitrd, DistroError> {
        let layout = self.kernel_layout(fetcher)?;
        info!("{}: fetching kernel {} and initrd {}", self.family.label(), layout.kernel, layout.initrd);

        let kernel = self.fetch_artifact(fetcher, &layout.kernel, meter)?;
        let initrd = match self.fetch_artifact(fetcher, &layout.initrd, meter) {
            Ok(path) => path,
            Err(e) => {
                if let Err(rm) = fs::remove_file(&kernel) {
                    tracing::warn!("failed to remove {}: {}", kernel, rm);
                }
                return Err(e);
            }
        };

        Ok(KernelInitrd {
            kernel,
            initrd,
            extra_args: layout.args,
        })
    }

    /// Fetches the boot ISO of a matched tree.
    pub fn acquire_boot_disk(
        &self,
        fetcher: &mut dyn Fetcher,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        let iso = self.boot_iso_path(fetcher)?;
        info!("{}: fetching boot image {}", self.family.label(), iso);
        self.fetch_artifact(fetcher, &iso, meter)
    }

    /// A file missing after a positive match means a broken mirror.
    fn fetch_artifact(
        &self,
        fetcher: &mut dyn Fetcher,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        fetcher.fetch_file(relative, meter).map_err(|e| match e {
            DistroError::Fetch { path, reason } => DistroError::Acquisition(format!(
                "{} tree at {} matched but {} could not be fetched ({}); the mirror may be incomplete",
                self.family.label(),
                self.uri,
                path,
                reason
            )),
            other => other,
        })
    }

    /// Errors for families that have no paravirt Xen layout.
    pub(crate) fn no_xen_support(&self) -> DistroError {
        DistroError::Acquisition(format!(
            "{} trees do not provide a paravirt Xen kernel",
            self.family.label()
        ))
    }
}

/// Builds the ordered signature list for one acquisition.
///
/// A hinted family is tried exclusively; otherwise every family in
/// [`DistroFamily::PROBE_ORDER`]. The generic fallback always comes last.
pub fn candidates(
    uri: &str,
    hv_type: HypervisorType,
    arch: &str,
    hint: Option<DistroFamily>,
) -> Vec<DistroSignature> {
    let mut families: Vec<DistroFamily> = match hint {
        Some(DistroFamily::Generic) => Vec::new(),
        Some(family) => vec![family],
        None => DistroFamily::PROBE_ORDER.to_vec(),
    };
    families.push(DistroFamily::Generic);
    families
        .into_iter()
        .map(|family| DistroSignature::new(family, uri, hv_type, arch))
        .collect()
}

/// Returns the first candidate whose probe matches.
///
/// A probe that fails because a file is missing counts as "no match";
/// transport failures and a pending Ctrl-C abort the search.
pub fn find_store<'a>(
    fetcher: &mut dyn Fetcher,
    candidates: &'a [DistroSignature],
) -> Result<&'a DistroSignature, DistroError> {
    debug!("attempting to detect distro at {}", fetcher.location());
    for candidate in candidates {
        interrupt::check()?;
        debug!("probing {} at {}", candidate.family, candidate.uri);
        match candidate.is_valid_store(fetcher) {
            Ok(true) => {
                info!("detected {} tree at {}", candidate.family.label(), candidate.uri);
                return Ok(candidate);
            }
            Ok(false) => {}
            Err(e) if e.is_missing_file() => {
                debug!("{} probe found nothing: {}", candidate.family, e);
            }
            Err(e) => return Err(e),
        }
    }

    let uri = candidates
        .first()
        .map(|c| c.uri.clone())
        .unwrap_or_else(|| fetcher.location().to_string());
    Err(DistroError::NoInstallableDistro { uri })
}

/// Reads a small text file, treating absence as `None`.
pub(crate) fn read_text(fetcher: &mut dyn Fetcher, relative: &str) -> Result<Option<String>, DistroError> {
    match fetcher.read_file(relative) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.is_missing_file() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Returns the first path in `paths` that exists in the tree.
pub(crate) fn first_present<'p>(
    fetcher: &mut dyn Fetcher,
    paths: &[&'p str],
) -> Result<Option<&'p str>, DistroError> {
    for &path in paths {
        if fetcher.has_file(path)? {
            return Ok(Some(path));
        }
    }
    Ok(None)
}
