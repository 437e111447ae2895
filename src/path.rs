// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Environment variable naming the Clockwork installation root.
pub const INSTALL_ROOT_VAR: &str = "CLOCKWORK_HOME";

/// Environment variable overriding the settings file location.
pub const CONFIG_VAR: &str = "CLOCKWORK_CONFIG";

/// Determine absolute path to the settings file.
///
/// Uses `override_path` when given, e.g., from [`CONFIG_VAR`]. Otherwise
/// defaults to `$XDG_CONFIG_HOME/clockwork/config.toml`. Does not check if
/// the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoConfigDir`] if the configuration directory cannot
///   be determined.
pub fn settings_file(override_path: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = override_path.filter(|path| !path.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    dirs::config_dir()
        .map(|path| path.join("clockwork").join("config.toml"))
        .ok_or(PathError::NoConfigDir)
}

/// Determine Clockwork installation root.
///
/// # Errors
///
/// - Return [`PathError::MissingInstallRoot`] if `value` is absent or empty.
pub fn install_root(value: Option<OsString>) -> Result<PathBuf> {
    value
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .ok_or(PathError::MissingInstallRoot)
}

/// Directory that self-update downloads are staged in.
pub fn staging_dir(install_root: impl AsRef<Path>) -> PathBuf {
    install_root.as_ref().join(".clockwork").join("downloads")
}

/// Path resolution failures.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PathError {
    /// Installation root is not configured.
    #[error("environment variable {INSTALL_ROOT_VAR} is not set, reinstall Clockwork or point it at the installation directory")]
    MissingInstallRoot,

    /// Configuration directory cannot be determined.
    #[error("cannot determine absolute path to user's configuration directory")]
    NoConfigDir,
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn install_root_is_required() {
        assert!(matches!(
            install_root(None),
            Err(PathError::MissingInstallRoot)
        ));
        assert!(matches!(
            install_root(Some(OsString::new())),
            Err(PathError::MissingInstallRoot)
        ));
    }

    #[test]
    fn install_root_from_value() -> anyhow::Result<()> {
        let root = install_root(Some("/opt/clockwork".into()))?;
        assert_eq!(root, PathBuf::from("/opt/clockwork"));
        assert_eq!(
            staging_dir(&root),
            PathBuf::from("/opt/clockwork/.clockwork/downloads")
        );
        Ok(())
    }

    #[test]
    fn settings_file_override_wins() -> anyhow::Result<()> {
        let path = settings_file(Some("/tmp/clockwork.toml".into()))?;
        assert_eq!(path, PathBuf::from("/tmp/clockwork.toml"));
        Ok(())
    }
}
