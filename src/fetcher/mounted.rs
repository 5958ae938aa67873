//! Fetcher that mounts the install source into the scratch directory.
//!
//! NFS exports are mounted with `mount -o ro server:/path`, ISO images and
//! block devices with `mount -o ro,loop`. Once mounted, the tree is read
//! like a local directory. The mount point is a temporary directory under
//! the scratch directory; both are released by `cleanup`, and by `Drop`
//! as a last resort.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tracing::info;

use super::{DirectFetcher, Fetcher, FetcherKind, TransportSettings};
use crate::error::DistroError;
use crate::executor::{CommandExecutor, CommandSpec};
use crate::interrupt;
use crate::location;
use crate::privilege::PrivilegeMethod;
use crate::progress::ProgressMeter;

/// An active mount and the directory it lives in.
struct Mount {
    dir: TempDir,
    path: Utf8PathBuf,
    tree: DirectFetcher,
}

pub struct MountedFetcher {
    location: String,
    scratch_dir: Utf8PathBuf,
    executor: Arc<dyn CommandExecutor>,
    privilege: Option<PrivilegeMethod>,
    mount: Option<Mount>,
}

impl MountedFetcher {
    pub fn new(location: &str, scratch_dir: &Utf8Path, settings: &TransportSettings) -> Self {
        Self {
            location: location.to_string(),
            scratch_dir: scratch_dir.to_owned(),
            executor: Arc::clone(&settings.executor),
            privilege: settings.privilege,
            mount: None,
        }
    }

    /// Returns the mount point while the source is mounted.
    pub fn mount_point(&self) -> Option<&Utf8Path> {
        self.mount.as_ref().map(|m| m.path.as_path())
    }

    /// Builds the `mount` invocation for this location.
    fn mount_spec(&self, target: &Utf8Path) -> Result<CommandSpec, DistroError> {
        let (options, source) = if location::Scheme::classify(&self.location) == location::Scheme::Nfs {
            let normalized = location::normalize_nfs(&self.location)?;
            let export = normalized.trim_start_matches("nfs:").to_string();
            ("ro", export)
        } else {
            ("ro,loop", self.location.clone())
        };
        let args = vec!["-o".to_string(), options.to_string(), source, target.to_string()];
        Ok(CommandSpec::new("mount", args).with_privilege(self.privilege))
    }

    fn tree(&mut self) -> Result<&mut DirectFetcher, DistroError> {
        match self.mount.as_mut() {
            Some(mount) => Ok(&mut mount.tree),
            None => Err(DistroError::Location(format!("{} is not mounted", self.location))),
        }
    }

    /// Unmounts and removes the mount point, reporting the first failure.
    fn unmount(&mut self) -> Result<(), DistroError> {
        let Some(mount) = self.mount.take() else {
            return Ok(());
        };

        info!("unmounting {}", mount.path);
        let spec = CommandSpec::new("umount", vec![mount.path.to_string()]).with_privilege(self.privilege);
        let unmounted = match self.executor.execute(&spec) {
            Ok(result) if result.success() => Ok(()),
            Ok(result) => Err(DistroError::Cleanup(format!(
                "{} exited with {}",
                spec.display(),
                result.status
            ))),
            Err(e) => Err(DistroError::Cleanup(format!("{}: {:#}", spec.display(), e))),
        };

        match unmounted {
            Ok(()) => mount
                .dir
                .close()
                .map_err(|e| DistroError::Cleanup(format!("failed to remove mount point {}: {}", mount.path, e))),
            Err(e) => {
                // Removing a directory that is still a mount point would fail
                // or, worse, recurse into the mounted tree.
                let kept = mount.dir.keep();
                tracing::error!(
                    "leaving {} in place; manual cleanup may be required: umount {}",
                    kept.display(),
                    mount.path
                );
                Err(e)
            }
        }
    }
}

impl Fetcher for MountedFetcher {
    fn kind(&self) -> FetcherKind {
        FetcherKind::Mounted
    }

    fn location(&self) -> &str {
        &self.location
    }

    fn prepare(&mut self) -> Result<(), DistroError> {
        if self.mount.is_some() {
            return Ok(());
        }
        interrupt::check()?;

        let dir = tempfile::Builder::new()
            .prefix("distro-probe-mnt.")
            .tempdir_in(&self.scratch_dir)
            .map_err(|e| {
                DistroError::Location(format!(
                    "failed to create mount point in {}: {}",
                    self.scratch_dir,
                    crate::error::io_error_kind_message(&e)
                ))
            })?;
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).map_err(|p| {
            DistroError::Location(format!("mount point is not valid UTF-8: {}", p.display()))
        })?;

        let spec = self.mount_spec(&path)?;
        info!("mounting {} on {}", self.location, path);
        match self.executor.execute(&spec) {
            Ok(result) if result.success() => {}
            // mount shares the terminal's process group and dies with it
            Ok(_) | Err(_) if interrupt::is_requested() => return Err(DistroError::Interrupted),
            Ok(result) => {
                return Err(DistroError::Location(format!(
                    "mounting {} failed: {} exited with {}",
                    self.location,
                    spec.display(),
                    result.status
                )));
            }
            Err(e) => {
                return Err(DistroError::Location(format!(
                    "mounting {} failed: {:#}",
                    self.location, e
                )));
            }
        }

        let tree = DirectFetcher::for_mount(&self.location, &path, &self.scratch_dir);
        self.mount = Some(Mount { dir, path, tree });
        Ok(())
    }

    fn has_file(&mut self, relative: &str) -> Result<bool, DistroError> {
        self.tree()?.has_file(relative)
    }

    fn read_file(&mut self, relative: &str) -> Result<Vec<u8>, DistroError> {
        self.tree()?.read_file(relative)
    }

    fn fetch_file(
        &mut self,
        relative: &str,
        meter: &mut dyn ProgressMeter,
    ) -> Result<Utf8PathBuf, DistroError> {
        self.tree()?.fetch_file(relative, meter)
    }

    fn cleanup(&mut self) {
        if let Err(e) = self.unmount() {
            tracing::error!("{}", e);
        }
    }
}

impl Drop for MountedFetcher {
    fn drop(&mut self) {
        if self.mount.is_some() {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionResult;
    use crate::progress::NullMeter;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::sync::Mutex;

    /// Records commands; the `fail_on` call index exits non-zero.
    #[derive(Default)]
    struct MockMountExecutor {
        calls: Mutex<Vec<Vec<String>>>,
        fail_on: Option<usize>,
    }

    impl MockMountExecutor {
        fn failing_on(index: usize) -> Self {
            Self {
                fail_on: Some(index),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandExecutor for MockMountExecutor {
        fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult> {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            let mut line = vec![spec.command.clone()];
            line.extend(spec.args.iter().cloned());
            calls.push(line);

            let code = if self.fail_on == Some(index) { 32 } else { 0 };
            Ok(ExecutionResult {
                status: ExitStatus::from_raw(code << 8),
            })
        }
    }

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        (dir, path)
    }

    fn fetcher(location: &str, scratch: &Utf8Path, executor: &Arc<MockMountExecutor>) -> MountedFetcher {
        let executor: Arc<dyn CommandExecutor> = executor.clone();
        let mut settings = TransportSettings::new(executor);
        settings.privilege = Some(PrivilegeMethod::Sudo);
        MountedFetcher::new(location, scratch, &settings)
    }

    #[test]
    fn loop_mounts_images_and_unmounts_on_cleanup() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::default());
        let mut fetcher = fetcher("/srv/iso/Fedora-10-x86_64-DVD.iso", &scratch, &executor);

        fetcher.prepare().unwrap();
        let mount_point = fetcher.mount_point().unwrap().to_owned();
        assert!(mount_point.starts_with(&scratch));
        assert!(mount_point.is_dir());

        fetcher.cleanup();
        assert!(!mount_point.exists(), "mount point should be removed");

        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0],
            vec!["mount", "-o", "ro,loop", "/srv/iso/Fedora-10-x86_64-DVD.iso", mount_point.as_str()]
        );
        assert_eq!(calls[1], vec!["umount", mount_point.as_str()]);
    }

    #[test]
    fn nfs_locations_are_normalized() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::default());
        let mut fetcher = fetcher("nfs://server/export/f10", &scratch, &executor);

        fetcher.prepare().unwrap();
        fetcher.cleanup();

        let calls = executor.calls();
        assert_eq!(calls[0][1..4], ["-o", "ro", "server:/export/f10"]);
    }

    #[test]
    fn mount_failure_is_location_error_and_leaves_nothing_behind() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::failing_on(0));
        let mut fetcher = fetcher("/dev/sr0", &scratch, &executor);

        let err = fetcher.prepare().unwrap_err();
        assert!(err.is_location(), "{}", err);
        assert!(fetcher.mount_point().is_none());
        assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);

        fetcher.cleanup();
        assert_eq!(executor.calls().len(), 1, "nothing to unmount");
    }

    #[test]
    fn cleanup_is_idempotent() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::default());
        let mut fetcher = fetcher("/srv/boot.iso", &scratch, &executor);

        fetcher.prepare().unwrap();
        fetcher.cleanup();
        fetcher.cleanup();
        drop(fetcher);

        assert_eq!(executor.calls().len(), 2);
    }

    #[test]
    fn failed_umount_is_swallowed_and_mount_point_kept() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::failing_on(1));
        let mut fetcher = fetcher("/srv/boot.iso", &scratch, &executor);

        fetcher.prepare().unwrap();
        let mount_point = fetcher.mount_point().unwrap().to_owned();
        fetcher.cleanup();

        assert!(mount_point.exists(), "a still-mounted directory must not be removed");
        assert!(fetcher.mount_point().is_none());
    }

    #[test]
    fn drop_unmounts() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::default());
        {
            let mut fetcher = fetcher("/srv/boot.iso", &scratch, &executor);
            fetcher.prepare().unwrap();
        }
        let calls = executor.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1][0], "umount");
    }

    #[test]
    fn reads_through_the_mount_point() {
        let (_dir, scratch) = scratch();
        let executor = Arc::new(MockMountExecutor::default());
        let mut fetcher = fetcher("/srv/boot.iso", &scratch, &executor);

        assert!(fetcher.has_file("VERSION").unwrap_err().is_location());

        fetcher.prepare().unwrap();
        let mount_point = fetcher.mount_point().unwrap().to_owned();
        // the mock does not mount anything, so populate the directory by hand
        std::fs::write(mount_point.join("VERSION"), b"Mandriva Linux 2009.0").unwrap();

        assert!(fetcher.has_file("VERSION").unwrap());
        assert_eq!(fetcher.read_file("VERSION").unwrap(), b"Mandriva Linux 2009.0");
        let copy = fetcher.fetch_file("VERSION", &mut NullMeter).unwrap();
        assert!(copy.starts_with(&scratch));
        assert!(!copy.starts_with(&mount_point));
        std::fs::remove_file(mount_point.join("VERSION")).unwrap();
        fetcher.cleanup();
    }
}
