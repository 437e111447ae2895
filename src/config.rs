// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User settings layout.
//!
//! Specify the layout of the settings file that tweaks how Clockwork behaves
//! for a given user. Every setting is optional, and a missing settings file
//! simply means "use the defaults".
//!
//! ```toml
//! registry_url = "https://example.com/registry.toml"
//! packages_dir = "packages"
//! tag_order = "semantic"
//! update_check = false
//! ```

use crate::{registry::DEFAULT_REGISTRY_URL, version::TagOrder};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    io::ErrorKind,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// GitHub API endpoint describing the latest Clockwork release.
pub const DEFAULT_RELEASE_URL: &str =
    "https://api.github.com/repos/Turtlepaw/clockwork/releases/latest";

/// Clockwork settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Registry document to resolve short package names with.
    pub registry_url: String,

    /// Directory holding working copies, relative to the project directory
    /// unless absolute.
    pub packages_dir: PathBuf,

    /// Ordering applied to remote tags.
    pub tag_order: TagOrder,

    /// Check for a newer Clockwork release on startup.
    pub update_check: bool,

    /// Release metadata endpoint used by the self-updater.
    pub release_url: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_REGISTRY_URL.into(),
            packages_dir: PathBuf::from("packages"),
            tag_order: TagOrder::default(),
            update_check: true,
            release_url: DEFAULT_RELEASE_URL.into(),
        }
    }
}

impl Settings {
    /// Load settings from file, or use defaults if the file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Io`] if the file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match read_to_string(path.as_ref()) {
            Ok(data) => data.parse(),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!("no settings at {}, using defaults", path.as_ref().display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.as_ref().to_path_buf(),
                source,
            }),
        }
    }

    /// Absolute packages directory for a project.
    pub fn packages_dir_for(&self, project_dir: impl AsRef<Path>) -> PathBuf {
        project_dir.as_ref().join(&self.packages_dir)
    }
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on packages directory.
        settings.packages_dir = PathBuf::from(
            shellexpand::full(settings.packages_dir.to_string_lossy().as_ref())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to read configuration file.
    #[error("failed to read settings {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("FACES", "/home/blah/faces")])]
    fn deserialize_settings() -> anyhow::Result<()> {
        let result: Settings = indoc! {r#"
            registry_url = "https://example.com/registry.toml"
            packages_dir = "$FACES/packages"
            tag_order = "semantic"
            update_check = false
        "#}
        .parse()?;

        let expect = Settings {
            registry_url: "https://example.com/registry.toml".into(),
            packages_dir: PathBuf::from("/home/blah/faces/packages"),
            tag_order: TagOrder::Semantic,
            update_check: false,
            release_url: DEFAULT_RELEASE_URL.into(),
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn empty_settings_use_defaults() -> anyhow::Result<()> {
        let result: Settings = "".parse()?;
        assert_eq!(result, Settings::default());
        Ok(())
    }

    #[test]
    fn missing_settings_file_uses_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let result = Settings::load(dir.path().join("config.toml"))?;
        assert_eq!(result, Settings::default());
        Ok(())
    }

    #[test]
    fn relative_packages_dir_joins_project() {
        let settings = Settings::default();
        assert_eq!(
            settings.packages_dir_for("/work/face"),
            PathBuf::from("/work/face/packages")
        );
    }

    #[test]
    fn serialize_settings() {
        let result = Settings::default().to_string();
        let expect = indoc! {r#"
            registry_url = "https://raw.githubusercontent.com/Turtlepaw/clockwork/refs/heads/main/registry.toml"
            packages_dir = "packages"
            tag_order = "lexicographic"
            update_check = true
            release_url = "https://api.github.com/repos/Turtlepaw/clockwork/releases/latest"
        "#};

        assert_eq!(result, expect);
    }
}
