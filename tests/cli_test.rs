use anyhow::Result;
use clap::Parser;
use distro_probe::cli::{Cli, Commands, LogLevel};
use distro_probe::distro::HypervisorType;
use distro_probe::privilege::PrivilegeMethod;

#[test]
fn test_parse_kernel_command_defaults() -> Result<()> {
    let args = Cli::parse_from(["distro-probe", "kernel", "--location", "http://mirror.example/fedora10/"]);

    match args.command {
        Commands::Kernel(opts) => {
            assert_eq!(opts.location, "http://mirror.example/fedora10/");
            assert_eq!(opts.hv_type, HypervisorType::Hvm);
            assert_eq!(opts.distro, None);
            assert_eq!(opts.scratch_dir, None);
            assert_eq!(opts.log_level, LogLevel::Info);
            assert!(!opts.no_progress);
        }
        _ => panic!("Expected Kernel command"),
    }

    Ok(())
}

#[test]
fn test_parse_boot_disk_with_flags() -> Result<()> {
    let args = Cli::parse_from([
        "distro-probe",
        "boot-disk",
        "-l",
        "nfs://server/exports/sles10",
        "--distro",
        "sles10",
        "--type",
        "xen",
        "--arch",
        "i686",
        "--scratch-dir",
        "/srv/scratch",
        "--privilege",
        "sudo",
        "--log-level",
        "debug",
    ]);

    match args.command {
        Commands::BootDisk(opts) => {
            assert_eq!(opts.distro.as_deref(), Some("sles10"));
            assert_eq!(opts.hv_type, HypervisorType::Xen);
            assert_eq!(opts.arch.as_deref(), Some("i686"));
            assert_eq!(opts.scratch_dir.as_deref().map(|p| p.as_str()), Some("/srv/scratch"));
            assert_eq!(opts.privilege, Some(PrivilegeMethod::Sudo));
            assert_eq!(opts.log_level, LogLevel::Debug);
        }
        _ => panic!("Expected BootDisk command"),
    }

    Ok(())
}

#[test]
fn test_kvm_type_means_hvm() {
    let args = Cli::parse_from(["distro-probe", "detect", "-l", "/srv/tree", "-t", "kvm"]);
    match args.command {
        Commands::Detect(opts) => assert_eq!(opts.hv_type, HypervisorType::Hvm),
        _ => panic!("Expected Detect command"),
    }
}

#[test]
fn test_unknown_type_rejected() {
    assert!(Cli::try_parse_from(["distro-probe", "detect", "-l", "/srv/tree", "-t", "vmware"]).is_err());
}

#[test]
fn test_location_is_required() {
    assert!(Cli::try_parse_from(["distro-probe", "kernel"]).is_err());
}

#[test]
fn test_parse_osinfo() {
    let args = Cli::parse_from(["distro-probe", "osinfo", "--os-variant", "fedora10", "--hv", "xen"]);
    match args.command {
        Commands::Osinfo(opts) => {
            assert_eq!(opts.os_variant.as_deref(), Some("fedora10"));
            assert_eq!(opts.os_type, None);
            assert_eq!(opts.hv, "xen");
            assert!(!opts.list);
        }
        _ => panic!("Expected Osinfo command"),
    }
}

#[test]
fn test_log_level_per_command() {
    let args = Cli::parse_from(["distro-probe", "osinfo", "--list", "--log-level", "error"]);
    assert_eq!(args.command.log_level(), LogLevel::Error);
}
