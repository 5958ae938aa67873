//! Cooperative handling of Ctrl-C.
//!
//! The signal handler only records that an interrupt arrived. Long-running
//! work (probing, downloads, mount and curl invocations) polls
//! [`check`] and returns [`DistroError::Interrupted`], so the call unwinds
//! through [`PreparedFetcher`](crate::fetcher::PreparedFetcher) and the
//! install source is unmounted before the process exits.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::error::DistroError;

/// Exit status for a run stopped by SIGINT (128 + 2).
pub const EXIT_INTERRUPTED: i32 = 130;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Installs the SIGINT handler.
///
/// The first Ctrl-C requests a graceful stop. A second one exits at once,
/// for work blocked somewhere no check can reach.
pub fn install_handler() -> Result<()> {
    ctrlc::set_handler(|| {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            process::exit(EXIT_INTERRUPTED);
        }
        eprintln!("interrupted, cleaning up (press Ctrl-C again to exit immediately)");
    })
    .context("failed to install Ctrl-C handler")
}

/// Records an interrupt as if SIGINT had arrived.
pub fn request() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Forgets a pending interrupt.
pub fn clear() {
    INTERRUPTED.store(false, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Fails with [`DistroError::Interrupted`] once an interrupt is pending.
pub fn check() -> Result<(), DistroError> {
    if is_requested() {
        Err(DistroError::Interrupted)
    } else {
        Ok(())
    }
}
