use anyhow::Result;
use distro_probe::distro::DistroFamily;
use distro_probe::osdict::{ClockMode, OsSelection, os_dict};

#[test]
fn test_find_variant_resolves_owning_type() -> Result<()> {
    let dict = os_dict()?;
    let (os_type, entry) = dict.find_variant("DebianLenny").expect("debianlenny is known");
    assert_eq!(os_type, "linux");
    assert_eq!(entry.label.as_deref(), Some("Debian Lenny"));
    assert!(dict.find_variant("plan9").is_none());
    Ok(())
}

#[test]
fn test_every_distro_key_is_a_family() -> Result<()> {
    let dict = os_dict()?;
    for (os_type, _) in dict.os_types() {
        for (variant, entry) in dict.variants(os_type).into_iter().flatten() {
            if let Some(distro) = &entry.distro {
                assert!(
                    DistroFamily::from_hint(distro).is_ok(),
                    "{} names unknown distro {}",
                    variant,
                    distro
                );
            }
        }
    }
    Ok(())
}

#[test]
fn test_kvm_specific_value_wins_over_all() -> Result<()> {
    let lenny = OsSelection::new(Some("Linux"), Some("debianlenny"))?;
    assert_eq!(lenny.device_param("net", "model", "kvm"), Some("virtio"));
    assert_eq!(lenny.device_param("net", "model", "KVM"), Some("virtio"));
    // no kvm rule for qemu, and the defaults leave the model to the hypervisor
    assert_eq!(lenny.device_param("net", "model", "qemu"), None);
    Ok(())
}

#[test]
fn test_type_level_value_applies_to_all_variants() -> Result<()> {
    let win2k3 = OsSelection::new(None, Some("win2k3"))?;
    assert_eq!(win2k3.device_param("input", "bus", "kvm"), Some("usb"));
    assert_eq!(win2k3.device_param("input", "type", "xen"), Some("tablet"));
    assert_eq!(win2k3.clock(), ClockMode::Localtime);
    assert!(win2k3.acpi());
    Ok(())
}

#[test]
fn test_variant_overrides_type_and_defaults() -> Result<()> {
    let msdos = OsSelection::new(Some("other"), Some("msdos"))?;
    assert!(!msdos.acpi());
    assert!(!msdos.apic());
    assert_eq!(msdos.label(), Some("MS-DOS"));
    assert_eq!(msdos.distro(), None);

    let openbsd = OsSelection::new(Some("unix"), Some("openbsd4"))?;
    assert_eq!(openbsd.device_param("net", "model", "kvm"), Some("pcnet"));
    assert_eq!(openbsd.device_param("input", "type", "kvm"), Some("mouse"));
    Ok(())
}

#[test]
fn test_type_only_selection() -> Result<()> {
    let windows = OsSelection::new(Some("windows"), None)?;
    assert_eq!(windows.label(), Some("Windows"));
    assert!(windows.continue_install());
    Ok(())
}

#[test]
fn test_variant_distro_feeds_family_hint() -> Result<()> {
    let selection = OsSelection::new(None, Some("ubuntuhardy"))?;
    let family = DistroFamily::from_hint(selection.distro().expect("ubuntu variant has a distro"))?;
    assert_eq!(family, DistroFamily::Ubuntu);
    Ok(())
}
