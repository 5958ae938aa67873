pub mod acquire;
pub mod cli;
pub mod config;
pub mod distro;
pub mod error;
pub mod executor;
pub mod fetcher;
pub mod installer;
pub mod interrupt;
pub mod location;
pub mod osdict;
pub mod privilege;
pub mod progress;

pub use error::DistroError;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::acquire::AcquireOptions;
use crate::config::Config;
use crate::distro::DistroFamily;
use crate::executor::CommandExecutor;
use crate::fetcher::TransportSettings;
use crate::location::{InstallLocation, ParseOptions};
use crate::osdict::OsSelection;
use crate::progress::{BarMeter, NullMeter, ProgressMeter};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder()
            .with_max_level(filter)
            .with_writer(io::stderr)
            .finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Everything an acquisition command needs, with flags applied over the
/// configuration file.
struct Resolved {
    uri: String,
    options: AcquireOptions,
    settings: TransportSettings,
}

fn resolve(opts: &cli::AcquireArgs, executor: Arc<dyn CommandExecutor>) -> Result<Resolved> {
    let mut config = match &opts.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };
    if let Some(dir) = &opts.scratch_dir {
        config.scratch_dir = dir.clone();
    }
    if let Some(arch) = &opts.arch {
        config.arch = Some(arch.clone());
    }
    if opts.privilege.is_some() {
        config.privilege = opts.privilege;
    }
    config.validate().context("configuration validation failed")?;

    let location = InstallLocation::parse(
        &opts.location,
        ParseOptions {
            remote_connection: false,
            allow_unprivileged_nfs: config.privilege.is_some(),
        },
    )?;
    let uri = location
        .as_uri()
        .with_context(|| format!("{} cannot be probed", location))?
        .to_string();

    let mut options = AcquireOptions::new(config.scratch_dir.clone());
    options.hv_type = opts.hv_type;
    options.distro = opts.distro.as_deref().map(DistroFamily::from_hint).transpose()?;
    if let Some(arch) = &config.arch {
        options.arch = arch.clone();
    }

    Ok(Resolved {
        uri,
        options,
        settings: config.transport_settings(executor),
    })
}

fn meter(opts: &cli::AcquireArgs) -> Box<dyn ProgressMeter> {
    if opts.no_progress {
        Box::new(NullMeter)
    } else {
        Box::new(BarMeter::new())
    }
}

pub fn run_kernel(opts: &cli::AcquireArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let resolved = resolve(opts, executor)?;
    let kernel = acquire::acquire_kernel(
        &resolved.uri,
        &resolved.options,
        &resolved.settings,
        meter(opts).as_mut(),
    )
    .with_context(|| format!("failed to acquire kernel from {}", resolved.uri))?;

    println!("kernel: {}", kernel.kernel);
    println!("initrd: {}", kernel.initrd);
    println!("args: {}", kernel.extra_args);
    Ok(())
}

pub fn run_boot_disk(opts: &cli::AcquireArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let resolved = resolve(opts, executor)?;
    let iso = acquire::acquire_boot_disk(
        &resolved.uri,
        &resolved.options,
        &resolved.settings,
        meter(opts).as_mut(),
    )
    .with_context(|| format!("failed to acquire boot disk from {}", resolved.uri))?;

    println!("{}", iso);
    Ok(())
}

pub fn run_detect(opts: &cli::AcquireArgs, executor: Arc<dyn CommandExecutor>) -> Result<()> {
    let resolved = resolve(opts, executor)?;
    let family = acquire::detect_distro(&resolved.uri, &resolved.options, &resolved.settings)
        .with_context(|| format!("failed to detect distribution at {}", resolved.uri))?;

    info!("{} is a {} tree", resolved.uri, family.label());
    println!("{}", family);
    Ok(())
}

pub fn run_osinfo(opts: &cli::OsinfoArgs) -> Result<()> {
    if opts.list {
        let dict = osdict::os_dict()?;
        for (os_type, entry) in dict.os_types() {
            println!("{}: {}", os_type, entry.label.as_deref().unwrap_or(os_type));
            for (variant, v) in dict.variants(os_type).into_iter().flatten() {
                println!("  {}: {}", variant, v.label.as_deref().unwrap_or(variant));
            }
        }
        return Ok(());
    }

    let selection = OsSelection::new(opts.os_type.as_deref(), opts.os_variant.as_deref())?;
    let unset = "-";
    println!("os_type: {}", selection.os_type().unwrap_or(unset));
    println!("variant: {}", selection.variant().unwrap_or(unset));
    println!("label: {}", selection.label().unwrap_or(unset));
    println!("distro: {}", selection.distro().unwrap_or(unset));
    println!("clock: {}", selection.clock());
    println!("continue: {}", selection.continue_install());
    println!("acpi: {}", selection.acpi());
    println!("apic: {}", selection.apic());
    for (device, attribute) in [("disk", "bus"), ("net", "model"), ("input", "type"), ("input", "bus")] {
        println!(
            "{}.{}: {}",
            device,
            attribute,
            selection.device_param(device, attribute, &opts.hv).unwrap_or(unset)
        );
    }
    Ok(())
}

pub fn generate_completions(shell: Shell) -> Result<()> {
    let mut cmd = cli::Cli::command();
    clap_complete::generate(shell, &mut cmd, env!("CARGO_PKG_NAME"), &mut io::stdout());
    Ok(())
}
