use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::distro::HypervisorType;
use crate::privilege::PrivilegeMethod;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the installer kernel and initrd from an install tree
    Kernel(AcquireArgs),

    /// Fetch the boot ISO from an install tree
    BootDisk(AcquireArgs),

    /// Print the distribution family of an install tree
    Detect(AcquireArgs),

    /// Print installation defaults for an OS type or variant
    Osinfo(OsinfoArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

impl Commands {
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Kernel(opts) | Self::BootDisk(opts) | Self::Detect(opts) => opts.log_level,
            Self::Osinfo(opts) => opts.log_level,
            Self::Completions(_) => LogLevel::Warn,
        }
    }
}

#[derive(Args, Debug)]
pub struct AcquireArgs {
    /// Install source: http://, ftp://, nfs://, a directory, ISO image or device
    #[arg(short, long)]
    pub location: String,

    /// Directory for mount points and downloaded files
    #[arg(long)]
    pub scratch_dir: Option<Utf8PathBuf>,

    /// Distribution family or OS variant to look for (e.g. fedora, rhel5, debianlenny)
    #[arg(short, long)]
    pub distro: Option<String>,

    /// Target architecture (defaults to the host's)
    #[arg(long)]
    pub arch: Option<String>,

    /// Guest type: xen for a paravirt guest, hvm for full virtualization
    #[arg(short = 't', long = "type", default_value = "hvm", value_parser = parse_hv_type)]
    pub hv_type: HypervisorType,

    /// Wrap mount and umount with this privilege escalation command
    #[arg(long, value_enum)]
    pub privilege: Option<PrivilegeMethod>,

    /// Path to a YAML configuration file
    #[arg(short, long)]
    pub config: Option<Utf8PathBuf>,

    /// Do not show download progress
    #[arg(long)]
    pub no_progress: bool,

    /// Set the log level
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct OsinfoArgs {
    /// OS type (linux, windows, unix, other)
    #[arg(long)]
    pub os_type: Option<String>,

    /// OS variant (e.g. fedora10, winxp)
    #[arg(long)]
    pub os_variant: Option<String>,

    /// Hypervisor type device defaults are resolved for
    #[arg(long, default_value = "kvm")]
    pub hv: String,

    /// List the known OS types and variants instead
    #[arg(long)]
    pub list: bool,

    /// Set the log level
    #[arg(long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Maps directly to the levels of the `tracing` crate; `--log-level debug`
/// shows every probe attempt, `trace` every HTTP lookup.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

fn parse_hv_type(value: &str) -> Result<HypervisorType, String> {
    value.parse().map_err(|e: crate::error::DistroError| e.to_string())
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
