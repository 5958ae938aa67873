//! Install source locations.
//!
//! A location string is classified once into a [`Scheme`] that decides the
//! fetcher, and user-facing input is validated once into an
//! [`InstallLocation`].

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use strum::Display;

use crate::error::DistroError;
use crate::privilege;

/// Transport class of a location string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Scheme {
    Http,
    Ftp,
    Nfs,
    /// An existing local directory holding an install tree.
    LocalDir,
    /// Anything else local: an ISO image or a block device to loop-mount.
    LocalDevice,
}

impl Scheme {
    /// Classifies `uri` by prefix, falling back to a filesystem check.
    pub fn classify(uri: &str) -> Self {
        if uri.starts_with("http://") || uri.starts_with("https://") {
            Self::Http
        } else if uri.starts_with("ftp://") {
            Self::Ftp
        } else if uri.starts_with("nfs://") || uri.starts_with("nfs:") {
            Self::Nfs
        } else if Utf8Path::new(uri).is_dir() {
            Self::LocalDir
        } else {
            Self::LocalDevice
        }
    }

    /// Returns true for schemes the installer reaches over the network.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http | Self::Ftp | Self::Nfs)
    }
}

/// Converts `nfs://server/path` into the `nfs:server:/path` form that
/// mount(8) and anaconda expect. Already-converted input is returned as is.
pub fn normalize_nfs(uri: &str) -> Result<String, DistroError> {
    let rest = match uri.strip_prefix("nfs://") {
        Some(rest) => rest,
        None => match uri.strip_prefix("nfs:") {
            Some(rest) => rest,
            None => {
                return Err(DistroError::Validation(format!("not an NFS location: {}", uri)));
            }
        },
    };

    let Some(slash) = rest.find('/') else {
        return Err(DistroError::Validation(
            "invalid NFS format: no path specified".to_string(),
        ));
    };
    let (host, path) = rest.split_at(slash);
    if host.trim_end_matches(':').is_empty() {
        return Err(DistroError::Validation(format!("invalid NFS format: no server in {}", uri)));
    }

    if host.ends_with(':') {
        Ok(format!("nfs:{}{}", host, path))
    } else {
        Ok(format!("nfs:{}:{}", host, path))
    }
}

/// A network install source with its normalised URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkUri {
    Http(String),
    Ftp(String),
    /// Stored in `nfs:server:/path` form.
    Nfs(String),
}

impl NetworkUri {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http(uri) | Self::Ftp(uri) | Self::Nfs(uri) => uri,
        }
    }
}

/// A validated install source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallLocation {
    /// Absolute path of a local tree, ISO image or device.
    LocalPath(Utf8PathBuf),
    /// A storage pool volume holding install media.
    PoolVolume { pool: String, volume: String },
    Network(NetworkUri),
}

/// Environment the location is parsed against.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// The hypervisor connection is remote, so local paths on this host
    /// are meaningless to it.
    pub remote_connection: bool,
    /// Skip the root check for NFS sources (mounting is delegated to a
    /// privilege escalation method).
    pub allow_unprivileged_nfs: bool,
}

impl InstallLocation {
    /// Validates `input` as an install source.
    pub fn parse(input: &str, options: ParseOptions) -> Result<Self, DistroError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(DistroError::Validation("install location must not be empty".to_string()));
        }

        let location = if !options.remote_connection && !input.contains("://") && Utf8Path::new(input).exists() {
            let path = std::path::absolute(input)
                .map_err(|e| DistroError::io(format!("failed to resolve path: {}", input), e))?;
            let path = Utf8PathBuf::from_path_buf(path).map_err(|p| {
                DistroError::Validation(format!("path is not valid UTF-8: {}", p.display()))
            })?;
            tracing::debug!("install location is a local file/path: {}", path);
            Self::LocalPath(path)
        } else if input.starts_with("nfs:") {
            Self::Network(NetworkUri::Nfs(normalize_nfs(input)?))
        } else if input.starts_with("http://") || input.starts_with("https://") {
            Self::Network(NetworkUri::Http(input.to_string()))
        } else if input.starts_with("ftp://") {
            Self::Network(NetworkUri::Ftp(input.to_string()))
        } else {
            return Err(DistroError::Validation(
                "install media location must be an NFS, HTTP or FTP network install source, \
                or an existing local file/device"
                    .to_string(),
            ));
        };

        if matches!(location, Self::Network(NetworkUri::Nfs(_)))
            && !options.allow_unprivileged_nfs
            && !privilege::running_as_root()
        {
            return Err(DistroError::Validation(
                "NFS installations are only supported as root".to_string(),
            ));
        }

        Ok(location)
    }

    pub fn pool_volume(pool: impl Into<String>, volume: impl Into<String>) -> Self {
        Self::PoolVolume {
            pool: pool.into(),
            volume: volume.into(),
        }
    }

    /// The string handed to the acquisition pipeline, if the location
    /// can be probed at all.
    pub fn as_uri(&self) -> Option<&str> {
        match self {
            Self::LocalPath(path) => Some(path.as_str()),
            Self::PoolVolume { .. } => None,
            Self::Network(uri) => Some(uri.as_str()),
        }
    }

    /// Returns the local path if this is a local, non-directory source.
    pub fn local_media(&self) -> Option<&Utf8Path> {
        match self {
            Self::LocalPath(path) if !path.is_dir() => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for InstallLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocalPath(path) => write!(f, "{}", path),
            Self::PoolVolume { pool, volume } => write!(f, "{}/{}", pool, volume),
            Self::Network(uri) => f.write_str(uri.as_str()),
        }
    }
}
