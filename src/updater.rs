// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Self-update.
//!
//! Clockwork ships as a single binary attached to each GitHub release. Updating
//! downloads the asset for the current platform into a staging directory
//! inside the installation root, and then swaps it in for the running binary.
//!
//! # Binary Replacement
//!
//! The swap is a two step transaction:
//!
//! 1. Rename the active binary to `<binary>.bak`.
//! 2. Rename the staged binary to the active binary's path.
//!
//! If the second step fails, the first is reversed so the user is never left
//! without a working binary. The backup is kept after a successful swap,
//! because some platforms refuse to delete a running executable.

use crate::path::staging_dir;

use serde::Deserialize;
use std::{
    ffi::OsString,
    fs::{self, File},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Published Clockwork release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Release {
    /// Version tag of the release.
    pub tag_name: String,

    /// Downloadable files of the release.
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// Downloadable file of a release.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Platforms that release assets are published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
}

impl Platform {
    /// Platform of the running binary, if releases exist for it.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "macos" => Some(Self::MacOs),
            "windows" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Substring that identifies this platform's asset name.
    pub fn asset_marker(&self) -> &'static str {
        match self {
            Self::Linux => "clockwork-linux",
            Self::MacOs => "clockwork-macos",
            Self::Windows => "clockwork-win",
        }
    }
}

/// Determine if release differs from the running version.
///
/// A leading "v" on either side is ignored.
pub fn is_newer(current: &str, release: &Release) -> bool {
    let strip = |version: &str| version.trim().trim_start_matches('v').to_string();
    strip(current) != strip(&release.tag_name)
}

/// Pick release asset for platform.
pub fn select_asset(release: &Release, platform: Platform) -> Option<&Asset> {
    release
        .assets
        .iter()
        .find(|asset| asset.name.contains(platform.asset_marker()))
}

/// Path the active binary is backed up to during replacement.
pub fn backup_path(active: &Path) -> PathBuf {
    let mut name = active
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".bak");
    active.with_file_name(name)
}

/// Swap staged binary in for the active binary.
///
/// # Errors
///
/// - Return [`UpdateError::Backup`] if the active binary cannot be moved
///   aside. Nothing has changed in that case.
/// - Return [`UpdateError::Replace`] if the staged binary cannot be moved
///   into place. The active binary has been restored in that case.
#[instrument(level = "debug")]
pub fn replace_binary(active: &Path, staged: &Path) -> Result<()> {
    if !active.exists() {
        debug!("no active binary at {}, moving staged binary in", active.display());
        return fs::rename(staged, active).map_err(|source| UpdateError::Replace {
            path: active.to_path_buf(),
            source,
        });
    }

    let backup = backup_path(active);
    fs::rename(active, &backup).map_err(|source| UpdateError::Backup {
        path: active.to_path_buf(),
        source,
    })?;

    if let Err(source) = fs::rename(staged, active) {
        warn!("failed to move new binary into place, restoring backup");
        if let Err(error) = fs::rename(&backup, active) {
            warn!("failed to restore {}: {error}", backup.display());
        }
        return Err(UpdateError::Replace {
            path: active.to_path_buf(),
            source,
        });
    }

    info!("replaced {}", active.display());
    Ok(())
}

/// Download and install newer Clockwork releases.
#[derive(Debug, Clone)]
pub struct Updater {
    client: reqwest::blocking::Client,
    release_url: String,
    install_root: PathBuf,
}

impl Updater {
    /// Construct new updater.
    pub fn new(release_url: impl Into<String>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            release_url: release_url.into(),
            install_root: install_root.into(),
        }
    }

    /// Directory that downloads are staged in.
    pub fn staging_dir(&self) -> PathBuf {
        staging_dir(&self.install_root)
    }

    /// Fetch metadata of the latest release.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::Network`] if the metadata cannot be fetched or
    ///   decoded.
    #[instrument(skip(self), level = "debug")]
    pub fn latest_release(&self) -> Result<Release> {
        debug!("fetch release metadata from {}", self.release_url);
        let release = self
            .client
            .get(&self.release_url)
            .header(reqwest::header::USER_AGENT, user_agent())
            .send()?
            .error_for_status()?
            .json::<Release>()?;

        Ok(release)
    }

    /// Download asset into the staging directory.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::Network`] if the download fails.
    /// - Return [`UpdateError::Io`] if the staged file cannot be written.
    #[instrument(skip(self, asset), level = "debug")]
    pub fn stage(&self, asset: &Asset) -> Result<PathBuf> {
        let dir = self.staging_dir();
        mkdirp::mkdirp(&dir).map_err(|source| UpdateError::Io {
            path: dir.clone(),
            source,
        })?;

        let staged = dir.join(format!("{}.tmp", asset.name));
        info!("download {} to {}", asset.browser_download_url, staged.display());
        if let Err(error) = self.download(&asset.browser_download_url, &staged) {
            // INVARIANT: Never leave a partial download behind.
            let _ = fs::remove_file(&staged);
            return Err(error);
        }

        make_executable(&staged)?;
        Ok(staged)
    }

    /// Download, stage, and swap in the platform's asset of a release.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::NoAsset`] if the release lacks an asset for
    ///   the current platform.
    /// - Return any error of [`Updater::stage`] or [`replace_binary`].
    pub fn apply(&self, release: &Release, active: &Path) -> Result<()> {
        let platform = Platform::current().ok_or_else(|| UpdateError::NoAsset {
            tag: release.tag_name.clone(),
        })?;
        let asset = select_asset(release, platform).ok_or_else(|| UpdateError::NoAsset {
            tag: release.tag_name.clone(),
        })?;

        let staged = self.stage(asset)?;
        replace_binary(active, &staged)
    }

    /// Remove leftover staged downloads.
    ///
    /// Returns the number of files removed.
    ///
    /// # Errors
    ///
    /// - Return [`UpdateError::Io`] if the staging directory cannot be read.
    pub fn cleanup_staging(&self) -> Result<usize> {
        let dir = self.staging_dir();
        if !dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(&dir).map_err(|source| UpdateError::Io {
            path: dir.clone(),
            source,
        })?;

        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "tmp") && fs::remove_file(&path).is_ok()
            {
                debug!("removed {}", path.display());
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn download(&self, url: &str, destination: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent())
            .send()?
            .error_for_status()?;

        let mut file = File::create(destination).map_err(|source| UpdateError::Io {
            path: destination.to_path_buf(),
            source,
        })?;
        response.copy_to(&mut file)?;

        Ok(())
    }
}

fn user_agent() -> &'static str {
    concat!("clockwork/", env!("CARGO_PKG_VERSION"))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).map_err(|source| {
        UpdateError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Self-update failures.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// Release metadata or asset could not be fetched.
    #[error("failed to download update: {0}")]
    Network(#[from] reqwest::Error),

    /// Release has no asset for this platform.
    #[error("release {tag} has no asset for this platform")]
    NoAsset { tag: String },

    /// Active binary could not be backed up.
    #[error("failed to back up {}", .path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staged binary could not be moved into place.
    #[error("failed to replace {}", .path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging directory could not be accessed.
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
pub type Result<T, E = UpdateError> = std::result::Result<T, E>;
