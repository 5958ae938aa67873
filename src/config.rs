//! Optional YAML configuration.
//!
//! ```yaml
//! scratch_dir: /var/tmp
//! arch: x86_64
//! privilege: sudo
//! http:
//!   timeout_secs: 60
//! ftp:
//!   user: mirror
//!   password: secret
//! ```
//!
//! Every field is optional; command line flags override the file.

use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

use crate::error::DistroError;
use crate::executor::CommandExecutor;
use crate::fetcher::TransportSettings;
use crate::privilege::PrivilegeMethod;

pub const DEFAULT_SCRATCH_DIR: &str = "/var/tmp";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: Utf8PathBuf,
    /// Target architecture; the host's when unset.
    #[serde(default)]
    pub arch: Option<String>,
    /// Escalation for mount and umount when not running as root.
    #[serde(default)]
    pub privilege: Option<PrivilegeMethod>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub ftp: FtpConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// FTP login; anonymous unless `user` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FtpConfig {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

fn default_scratch_dir() -> Utf8PathBuf {
    Utf8PathBuf::from(DEFAULT_SCRATCH_DIR)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            arch: None,
            privilege: None,
            http: HttpConfig::default(),
            ftp: FtpConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), DistroError> {
        if !self.scratch_dir.is_absolute() {
            return Err(DistroError::Config(format!(
                "scratch_dir must be an absolute path, got '{}'",
                self.scratch_dir
            )));
        }
        if self.http.timeout_secs == 0 {
            return Err(DistroError::Config("http.timeout_secs must be greater than 0".to_string()));
        }
        if self.ftp.password.is_some() && self.ftp.user.is_none() {
            return Err(DistroError::Config("ftp.password is set without ftp.user".to_string()));
        }
        if let Some(arch) = &self.arch
            && arch.trim().is_empty()
        {
            return Err(DistroError::Config("arch must not be empty".to_string()));
        }
        Ok(())
    }

    /// Transport settings for fetchers built from this configuration.
    pub fn transport_settings(&self, executor: Arc<dyn CommandExecutor>) -> TransportSettings {
        let mut settings = TransportSettings::new(executor);
        settings.privilege = self.privilege;
        settings.timeout = Duration::from_secs(self.http.timeout_secs);
        settings.ftp_credentials = self
            .ftp
            .user
            .as_ref()
            .map(|user| (user.clone(), self.ftp.password.clone().unwrap_or_default()));
        settings
    }
}

pub fn load_config(path: &Utf8Path) -> Result<Config> {
    let file = File::open(path).with_context(|| format!("failed to load file: {}", path))?;
    let reader = BufReader::new(file);
    let config: Config =
        serde_yaml::from_reader(reader).with_context(|| format!("failed to parse yaml: {}", path))?;
    Ok(config)
}
