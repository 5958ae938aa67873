//! Parser for the `.treeinfo` file published at the root of Red Hat style
//! install trees.
//!
//! ```text
//! [general]
//! family = Fedora
//! version = 10
//! arch = x86_64
//!
//! [images-x86_64]
//! kernel = images/pxeboot/vmlinuz
//! initrd = images/pxeboot/initrd.img
//! boot.iso = images/boot.iso
//! ```

use crate::error::DistroError;

/// Sections and keys of a `.treeinfo` file.
pub struct TreeInfo {
    ini: tini::Ini,
}

impl Default for TreeInfo {
    fn default() -> Self {
        Self { ini: tini::Ini::new() }
    }
}

impl TreeInfo {
    pub fn parse(contents: &str) -> Result<Self, DistroError> {
        let ini = tini::Ini::from_string(contents).map_err(|e| DistroError::fetch(".treeinfo", e.to_string()))?;
        Ok(Self { ini })
    }

    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get::<String>(section, key).filter(|value| !value.is_empty())
    }

    /// `[general] family`, e.g. "Fedora" or "Red Hat Enterprise Linux Server".
    pub fn family(&self) -> Option<String> {
        self.get("general", "family")
    }

    /// Looks up `key` in the image section for `arch` (e.g. `images-x86_64`
    /// or `images-xen`).
    pub fn image(&self, arch: &str, key: &str) -> Option<String> {
        self.get(&format!("images-{}", arch), key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEDORA10: &str = "\
[general]
family = Fedora
timestamp = 1227142140.43
variant = Fedora
totaldiscs = 1
version = 10
discnum = 1
packagedir = Packages
arch = x86_64

[images-x86_64]
kernel = images/pxeboot/vmlinuz
initrd = images/pxeboot/initrd.img
boot.iso = images/boot.iso

[images-xen]
kernel = images/pxeboot/vmlinuz
initrd = images/pxeboot/initrd.img
";

    #[test]
    fn parses_general_and_images() {
        let info = TreeInfo::parse(FEDORA10).unwrap();
        assert_eq!(info.family().as_deref(), Some("Fedora"));
        assert_eq!(info.get("general", "version").as_deref(), Some("10"));
        assert_eq!(info.image("x86_64", "boot.iso").as_deref(), Some("images/boot.iso"));
        assert_eq!(info.image("xen", "kernel").as_deref(), Some("images/pxeboot/vmlinuz"));
        assert_eq!(info.image("i386", "kernel"), None);
    }

    #[test]
    fn comments_are_skipped() {
        let info = TreeInfo::parse("# generated by pungi\n[general]\n; release\nfamily = CentOS\n").unwrap();
        assert_eq!(info.family(), Some("CentOS".to_string()));
    }

    #[test]
    fn missing_section_or_key_is_none() {
        let info = TreeInfo::parse("[general]\nversion = 5.2\n").unwrap();
        assert_eq!(info.family(), None);
        assert_eq!(info.image("x86_64", "kernel"), None);
    }
}
