use std::process;
use std::sync::Arc;

use anyhow::Result;
use distro_probe::DistroError;
use distro_probe::cli::{self, Commands};
use distro_probe::executor::{CommandExecutor, RealCommandExecutor};
use distro_probe::interrupt;
use tracing::error;

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    if let Commands::Completions(opts) = &args.command {
        return distro_probe::generate_completions(opts.shell);
    }

    distro_probe::init_logging(args.command.log_level())?;
    interrupt::install_handler()?;

    let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor);
    let result = match &args.command {
        Commands::Kernel(opts) => distro_probe::run_kernel(opts, executor),
        Commands::BootDisk(opts) => distro_probe::run_boot_disk(opts, executor),
        Commands::Detect(opts) => distro_probe::run_detect(opts, executor),
        Commands::Osinfo(opts) => distro_probe::run_osinfo(opts),
        Commands::Completions(_) => Ok(()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        let interrupted = e.downcast_ref::<DistroError>().is_some_and(DistroError::is_interrupted);
        process::exit(if interrupted { interrupt::EXIT_INTERRUPTED } else { 1 });
    }

    Ok(())
}
