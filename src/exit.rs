// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Process exit codes.
//!
//! Scripts that drive Clockwork can tell failure classes apart by exit code.
//! The mapping below is stable.
//!
//! | Code | Failure class |
//! |------|---------------|
//! | 0    | success |
//! | 1    | general failure |
//! | 4    | manifest missing |
//! | 5    | package installation failure |
//! | 6    | download or network failure |
//! | 7    | required environment missing |
//! | 11   | package not found |
//! | 12   | manifest or registry malformed |

use crate::{
    command::CommandError,
    git::GitError,
    manifest::ManifestError,
    package::PackageError,
    path::PathError,
    registry::RegistryError,
    updater::UpdateError,
};

/// Failure classes reported through the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    General,
    ManifestMissing,
    InstallFailed,
    DownloadFailed,
    EnvironmentMissing,
    NotFound,
    Malformed,
}

impl Failure {
    /// Exit code of failure class.
    pub fn code(&self) -> i32 {
        match self {
            Self::General => 1,
            Self::ManifestMissing => 4,
            Self::InstallFailed => 5,
            Self::DownloadFailed => 6,
            Self::EnvironmentMissing => 7,
            Self::NotFound => 11,
            Self::Malformed => 12,
        }
    }

    /// Classify error by the first known cause in its chain.
    pub fn classify(error: &anyhow::Error) -> Self {
        error
            .chain()
            .find_map(|cause| {
                if let Some(error) = cause.downcast_ref::<PackageError>() {
                    return Some(Self::from_package(error));
                }
                if let Some(error) = cause.downcast_ref::<ManifestError>() {
                    return Some(Self::from_manifest(error));
                }
                if let Some(error) = cause.downcast_ref::<RegistryError>() {
                    return Some(Self::from_registry(error));
                }
                if cause.downcast_ref::<GitError>().is_some()
                    || cause.downcast_ref::<CommandError>().is_some()
                {
                    return Some(Self::InstallFailed);
                }
                if cause.downcast_ref::<UpdateError>().is_some() {
                    return Some(Self::DownloadFailed);
                }
                if cause.downcast_ref::<PathError>().is_some() {
                    return Some(Self::EnvironmentMissing);
                }
                None
            })
            .unwrap_or(Self::General)
    }

    fn from_package(error: &PackageError) -> Self {
        match error {
            PackageError::Manifest(error) => Self::from_manifest(error),
            PackageError::Registry(error) => Self::from_registry(error),
            PackageError::NotInstalled { .. } => Self::NotFound,
            PackageError::InvalidName { .. } => Self::Malformed,
            PackageError::Git(_) | PackageError::NoTags { .. } | PackageError::Io { .. } => {
                Self::InstallFailed
            }
            PackageError::Prompt(_) => Self::General,
        }
    }

    fn from_manifest(error: &ManifestError) -> Self {
        match error {
            ManifestError::NotFound { .. } => Self::ManifestMissing,
            ManifestError::Parse { .. } => Self::Malformed,
            _ => Self::General,
        }
    }

    fn from_registry(error: &RegistryError) -> Self {
        match error {
            RegistryError::Network(_) => Self::DownloadFailed,
            RegistryError::Parse(_) => Self::Malformed,
            RegistryError::NotFound { .. } => Self::NotFound,
        }
    }
}
