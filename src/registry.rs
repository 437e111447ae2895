// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package registry.
//!
//! The __registry__ is a remote document that maps short package names to the
//! git repositories that host them, so users can write `clockwork add
//! xml-preprocessor` instead of a full URL. An entry may also pin the version
//! that should be installed by default.
//!
//! ```toml
//! [xml-preprocessor]
//! url = "https://github.com/Turtlepaw/xml-preprocessor.git"
//! version = "1.0.0"
//! ```
//!
//! The registry is never modified by Clockwork.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use tracing::{debug, info, instrument};

/// Location of the community registry.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://raw.githubusercontent.com/Turtlepaw/clockwork/refs/heads/main/registry.toml";

/// Where users can browse registry entries.
pub const REGISTRY_GUIDE_URL: &str =
    "https://clockwork-pkg.pages.dev/guides/packages#packages-in-the-registry";

/// Single registry entry.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RegistryEntry {
    /// Git remote hosting the package.
    pub url: String,

    /// Version to install by default.
    pub version: Option<String>,
}

/// Registry document layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Registry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl Registry {
    /// Lookup registry entry by short package name.
    ///
    /// # Errors
    ///
    /// - Return [`RegistryError::NotFound`] if no such entry exists.
    pub fn lookup(&self, name: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(name)
            .ok_or_else(|| RegistryError::NotFound { name: name.into() })
    }

    /// Iterate registry entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry))
    }
}

impl FromStr for Registry {
    type Err = RegistryError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data).map_err(RegistryError::Parse)
    }
}

/// Layer of indirection for registry retrieval.
pub trait RegistrySource {
    /// Fetch current registry document.
    fn fetch(&self) -> Result<Registry>;
}

/// Registry retrieved over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpRegistry {
    /// Construct new HTTP registry source.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl RegistrySource for HttpRegistry {
    #[instrument(skip(self), level = "debug")]
    fn fetch(&self) -> Result<Registry> {
        info!("fetch registry {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::USER_AGENT, concat!("clockwork/", env!("CARGO_PKG_VERSION")))
            .send()?
            .error_for_status()?;
        let data = response.text()?;
        debug!("registry document is {} bytes", data.len());

        data.parse()
    }
}

/// Registry held in memory.
#[derive(Default, Debug, Clone)]
pub struct StaticRegistry {
    registry: Registry,
}

impl StaticRegistry {
    /// Construct new in-memory registry source.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

impl RegistrySource for StaticRegistry {
    fn fetch(&self) -> Result<Registry> {
        Ok(self.registry.clone())
    }
}

/// Registry failures.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Registry document could not be fetched.
    #[error("failed to fetch registry: {0}")]
    Network(#[from] reqwest::Error),

    /// Registry document is malformed.
    #[error("failed to parse registry: {0}")]
    Parse(#[source] toml::de::Error),

    /// Package is not listed.
    #[error("package {name} not found in the registry")]
    NotFound { name: String },
}

/// Friendly result alias :3
pub type Result<T, E = RegistryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn deserialize_registry() -> anyhow::Result<()> {
        let registry: Registry = indoc! {r#"
            [xml-preprocessor]
            url = "https://example.com/xml-preprocessor.git"
            version = "1.0.0"

            [fonts]
            url = "https://example.com/fonts.git"
        "#}
        .parse()?;

        assert_eq!(
            registry.lookup("xml-preprocessor")?,
            &RegistryEntry {
                url: "https://example.com/xml-preprocessor.git".into(),
                version: Some("1.0.0".into()),
            }
        );
        assert_eq!(registry.lookup("fonts")?.version, None);
        assert_eq!(
            registry.iter().map(|(name, _)| name).collect::<Vec<_>>(),
            vec!["fonts", "xml-preprocessor"]
        );

        Ok(())
    }

    #[test]
    fn lookup_missing_entry() {
        let registry = Registry::default();
        assert!(matches!(
            registry.lookup("nope"),
            Err(RegistryError::NotFound { .. })
        ));
    }

    #[test]
    fn reject_malformed_registry() {
        let result = "[broken\nurl = 1".parse::<Registry>();
        assert!(matches!(result, Err(RegistryError::Parse(_))));
    }
}
