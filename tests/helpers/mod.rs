use std::collections::{BTreeMap, BTreeSet};
use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use distro_probe::DistroError;
use distro_probe::executor::{CommandExecutor, CommandSpec, ExecutionResult};
use distro_probe::fetcher::{Fetcher, FetcherKind};
use distro_probe::progress::ProgressMeter;

/// Fetcher over an in-memory tree that records how it is used.
///
/// `fetch_file` writes the file to `<scratch>/<relative>` so tests can
/// check exactly which tree paths were acquired.
#[allow(dead_code)]
pub struct SyntheticFetcher {
    pub files: BTreeMap<String, Vec<u8>>,
    pub scratch: Utf8PathBuf,
    pub prepare_calls: usize,
    pub cleanup_calls: usize,
    pub fail_prepare: bool,
    /// Lookups of these paths fail as if the server went away.
    pub broken_paths: BTreeSet<String>,
    /// Looking up this path panics.
    pub panic_on: Option<String>,
    /// Looking up this path records a Ctrl-C.
    pub interrupt_on: Option<String>,
    /// Every path looked up, in order.
    pub lookups: Vec<String>,
}

#[allow(dead_code)]
impl SyntheticFetcher {
    pub fn new(scratch: &Utf8Path) -> Self {
        Self {
            files: BTreeMap::new(),
            scratch: scratch.to_owned(),
            prepare_calls: 0,
            cleanup_calls: 0,
            fail_prepare: false,
            broken_paths: BTreeSet::new(),
            panic_on: None,
            interrupt_on: None,
            lookups: Vec::new(),
        }
    }

    pub fn with_file(mut self, relative: &str, contents: &str) -> Self {
        self.files.insert(relative.to_string(), contents.as_bytes().to_vec());
        self
    }

    fn lookup(&mut self, relative: &str) -> Result<Option<Vec<u8>>, DistroError> {
        self.lookups.push(relative.to_string());
        if self.panic_on.as_deref() == Some(relative) {
            panic!("lookup of {} panicked", relative);
        }
        if self.interrupt_on.as_deref() == Some(relative) {
            distro_probe::interrupt::request();
        }
        if self.broken_paths.contains(relative) {
            return Err(DistroError::Location(format!("connection reset while reading {}", relative)));
        }
        Ok(self.files.get(relative).cloned())
    }
}

impl Fetcher for SyntheticFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Custom
    }

    fn location(&self) -> &str {
        "http://mirror.example/fedora10/"
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        self.prepare_calls += 1;
        if self.fail_prepare {
            return Err(DistroError::Location("connection refused".to_string()));
        }
        Ok(())
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        Ok(self.lookup(relative)?.is_some())
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        self.lookup(relative)?.ok_or_else(|| DistroError::Fetch {
            path: relative.to_string(),
            reason: "HTTP status 404".to_string(),
        })
    }

    fn fetch_file(&mut self, relative: &str, meter: &mut dyn ProgressMeter) -> Result<Utf8PathBuf, DistroError> {
        let contents = self.read_file(relative)?;
        meter.start(Some(contents.len() as u64), relative);
        let target = self.scratch.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&target, &contents).unwrap();
        meter.end(contents.len() as u64);
        Ok(target)
    }

    fn cleanup(&mut self) {
        self.cleanup_calls += 1;
    }
}

/// Progress meter that remembers every call.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub struct RecordingMeter {
    pub started: Vec<(Option<u64>, String)>,
    pub ended: Vec<u64>,
}

impl ProgressMeter for RecordingMeter {
    fn start(&mut self, size: Option<u64>, text: &str) {
        self.started.push((size, text.to_string()));
    }

    fn update(&mut self, _amount: u64) {}

    fn end(&mut self, amount: u64) {
        self.ended.push(amount);
    }
}

pub type CommandCalls = Arc<Mutex<Vec<(String, Vec<String>)>>>;

/// Records commands and exits with `exit_code` for the given program,
/// zero otherwise.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: CommandCalls,
    pub fail: Option<(&'static str, i32)>,
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
        self.calls
            .lock()
            .unwrap()
            .push((spec.command.clone(), spec.args.clone()));
        let code = match self.fail {
            Some((command, code)) if command == spec.command => code,
            _ => 0,
        };
        Ok(ExecutionResult {
            status: ExitStatus::from_raw(code << 8),
        })
    }
}

/// Commands recorded so far, by program name.
#[allow(dead_code)]
pub fn commands(calls: &CommandCalls) -> Vec<String> {
    calls.lock().unwrap().iter().map(|(command, _)| command.clone()).collect()
}

/// `.treeinfo` of a Fedora 10 x86_64 tree.
#[allow(dead_code)]
pub const FEDORA10_TREEINFO: &str = "\
[general]
family = Fedora
version = 10
arch = x86_64

[images-x86_64]
kernel = images/pxeboot/vmlinuz
initrd = images/pxeboot/initrd.img
boot.iso = images/boot.iso
";
