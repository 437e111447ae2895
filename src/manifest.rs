// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Project manifest layout and storage.
//!
//! Every Clockwork project, and every Clockwork package, carries a
//! __manifest__ at its top-level. The manifest names the project, lists its
//! dependencies, and optionally declares lifecycle scripts that run after the
//! project is installed or updated as somebody else's dependency.
//!
//! # Manifest Layout
//!
//! ```toml
//! name = "my-face"
//! version = "1.0.0"
//! description = ""
//! watchFaceFormatVersion = "2"
//!
//! [dependencies.foo]
//! url = "https://example.com/foo.git"
//! version = "1.2.0"
//!
//! [scripts]
//! postinstall = "echo installed"
//! ```
//!
//! # Accepted File Names
//!
//! Keys Clockwork does not know about are preserved across reads and writes.
//!
//! The manifest may be named by any of [`MANIFEST_NAMES`]. Reading and
//! writing always target the first of these that exists. Only
//! [`ManifestStore::init`] ever creates a new manifest file.

use crate::version::LATEST;

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::{read_to_string, write},
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, instrument};

/// Accepted manifest file names in priority order.
pub const MANIFEST_NAMES: [&str; 2] = ["clockwork.toml", "Clockwork.toml"];

/// Project manifest layout.
#[derive(Default, Debug, PartialEq, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Name used to identify the project.
    #[serde(default)]
    pub name: String,

    /// Version of the project itself.
    #[serde(default)]
    pub version: String,

    /// Brief description of the project.
    #[serde(default)]
    pub description: String,

    /// Watch Face Format version the project targets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_face_format_version: Option<FormatVersion>,

    /// Dependencies keyed by package name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, Dependency>,

    /// Lifecycle scripts keyed by event name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scripts: Option<BTreeMap<String, String>>,

    /// Any other keys, kept as-is so that rewriting the manifest never
    /// drops user-authored data.
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Manifest {
    /// Construct new manifest for a fresh project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    /// Lookup lifecycle script for target event.
    pub fn script(&self, event: LifecycleEvent) -> Option<&str> {
        self.scripts
            .as_ref()
            .and_then(|scripts| scripts.get(event.as_str()))
            .map(String::as_str)
    }
}

impl FromStr for Manifest {
    type Err = toml::de::Error;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        toml::de::from_str(data)
    }
}

impl Display for Manifest {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(|_| FmtError)?
                .as_str(),
        )
    }
}

/// Resolved package reference inside a manifest.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct Dependency {
    /// Git remote to clone the package from.
    pub url: String,

    /// Tag or branch to check out.
    #[serde(default = "latest")]
    pub version: String,
}

impl Dependency {
    /// Construct new dependency.
    pub fn new(url: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            version: version.into(),
        }
    }
}

fn latest() -> String {
    LATEST.into()
}

/// Watch Face Format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum FormatVersion {
    #[serde(rename = "1")]
    V1,

    #[serde(rename = "2")]
    V2,
}

impl Display for FormatVersion {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::V1 => fmt.write_str("1"),
            Self::V2 => fmt.write_str("2"),
        }
    }
}

/// Package lifecycle events that may carry a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    PostInstall,
    PostUpdate,
}

impl LifecycleEvent {
    /// Script key used in manifest.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostInstall => "postinstall",
            Self::PostUpdate => "postupdate",
        }
    }
}

impl Display for LifecycleEvent {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_str())
    }
}

/// Read and write the manifest of a project directory.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    /// Construct new manifest store for project directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Project directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate existing manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::NotFound`] if no accepted file name exists.
    pub fn locate(&self) -> Result<PathBuf> {
        MANIFEST_NAMES
            .iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
            .ok_or_else(|| ManifestError::NotFound {
                root: self.root.clone(),
            })
    }

    /// Read manifest.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::NotFound`] if no manifest exists.
    /// - Return [`ManifestError::Io`] if the manifest cannot be read.
    /// - Return [`ManifestError::Parse`] if the manifest is malformed.
    #[instrument(skip(self), level = "debug")]
    pub fn read(&self) -> Result<Manifest> {
        let path = self.locate()?;
        debug!("read manifest {}", path.display());
        let data = read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;

        data.parse()
            .map_err(|source| ManifestError::Parse { path, source })
    }

    /// Write manifest over existing manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::NotFound`] if no manifest exists.
    /// - Return [`ManifestError::Serialize`] if the manifest cannot be
    ///   serialized.
    /// - Return [`ManifestError::Io`] if the manifest cannot be written.
    #[instrument(skip(self, manifest), level = "debug")]
    pub fn write(&self, manifest: &Manifest) -> Result<()> {
        let path = self.locate()?;
        self.write_to(path, manifest)
    }

    /// Create new manifest file.
    ///
    /// # Errors
    ///
    /// - Return [`ManifestError::AlreadyExists`] if a manifest already exists.
    /// - Return [`ManifestError::Serialize`] if the manifest cannot be
    ///   serialized.
    /// - Return [`ManifestError::Io`] if the manifest cannot be written.
    #[instrument(skip(self, manifest), level = "debug")]
    pub fn init(&self, manifest: &Manifest) -> Result<PathBuf> {
        if let Ok(path) = self.locate() {
            return Err(ManifestError::AlreadyExists { path });
        }

        let path = self.root.join(MANIFEST_NAMES[0]);
        self.write_to(path.clone(), manifest)?;
        Ok(path)
    }

    fn write_to(&self, path: PathBuf, manifest: &Manifest) -> Result<()> {
        debug!("write manifest {}", path.display());
        let data = toml::ser::to_string_pretty(manifest)?;
        write(&path, data).map_err(|source| ManifestError::Io { path, source })
    }
}

/// Manifest storage failures.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// No accepted manifest file exists.
    #[error("no manifest found in {} (looked for {})", .root.display(), MANIFEST_NAMES.join(", "))]
    NotFound { root: PathBuf },

    /// Manifest file exists already.
    #[error("manifest {} already exists", .path.display())]
    AlreadyExists { path: PathBuf },

    /// Manifest file is malformed.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Manifest could not be serialized.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Manifest file could not be read or written.
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ManifestError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn sample() -> Manifest {
        Manifest {
            name: "my-face".into(),
            version: "1.0.0".into(),
            description: "a watch face".into(),
            watch_face_format_version: Some(FormatVersion::V2),
            dependencies: BTreeMap::from([(
                "foo".to_string(),
                Dependency::new("https://example.com/foo.git", "1.2.0"),
            )]),
            scripts: Some(BTreeMap::from([(
                "postinstall".to_string(),
                "echo hi".to_string(),
            )])),
            extra: toml::Table::new(),
        }
    }

    #[test]
    fn deserialize_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            name = "my-face"
            version = "1.0.0"
            description = "a watch face"
            watchFaceFormatVersion = "2"

            [dependencies.foo]
            url = "https://example.com/foo.git"
            version = "1.2.0"

            [scripts]
            postinstall = "echo hi"
        "#}
        .parse()?;

        assert_eq!(result, sample());
        assert_eq!(result.script(LifecycleEvent::PostInstall), Some("echo hi"));
        assert_eq!(result.script(LifecycleEvent::PostUpdate), None);

        Ok(())
    }

    #[test]
    fn deserialize_sparse_manifest() -> anyhow::Result<()> {
        let result: Manifest = indoc! {r#"
            name = "bare"

            [dependencies.foo]
            url = "https://example.com/foo.git"
        "#}
        .parse()?;

        assert_eq!(result.version, "");
        assert_eq!(result.watch_face_format_version, None);
        assert_eq!(result.dependencies["foo"].version, LATEST);

        Ok(())
    }

    #[test]
    fn reject_unknown_format_version() {
        let result = r#"watchFaceFormatVersion = "3""#.parse::<Manifest>();
        assert!(result.is_err());
    }

    #[test]
    fn serialize_manifest() {
        let result = Manifest::new("fresh").to_string();
        let expect = indoc! {r#"
            name = "fresh"
            version = "1.0.0"
            description = ""
        "#};

        assert_eq!(result, expect);
    }

    #[test]
    fn read_write_round_trip() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());
        store.init(&sample())?;

        let manifest = store.read()?;
        store.write(&manifest)?;
        assert_eq!(store.read()?, sample());

        Ok(())
    }

    #[test]
    fn read_write_keeps_unknown_keys() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write(
            dir.path().join(MANIFEST_NAMES[0]),
            indoc! {r#"
                name = "my-face"
                author = "me"

                [build]
                target = "wear"
            "#},
        )?;
        let store = ManifestStore::new(dir.path());

        let mut manifest = store.read()?;
        manifest
            .dependencies
            .insert("foo".into(), Dependency::new("https://example.com/foo.git", "1.2.0"));
        store.write(&manifest)?;

        let result = store.read()?;
        let expect: toml::Table = indoc! {r#"
            author = "me"

            [build]
            target = "wear"
        "#}
        .parse()?;
        assert_eq!(result.extra, expect);
        assert_eq!(result.dependencies.len(), 1);

        Ok(())
    }

    #[test]
    fn read_prefers_first_accepted_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path().join(MANIFEST_NAMES[1]), "name = \"second\"\n")?;
        let store = ManifestStore::new(dir.path());
        assert_eq!(store.read()?.name, "second");

        store.write(&Manifest::new("rewritten"))?;
        let data = read_to_string(dir.path().join(MANIFEST_NAMES[1]))?;
        assert!(data.contains("rewritten"));
        assert_eq!(store.read()?.name, "rewritten");

        Ok(())
    }

    #[test]
    fn read_and_write_require_existing_manifest() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());

        assert!(matches!(store.read(), Err(ManifestError::NotFound { .. })));
        assert!(matches!(
            store.write(&Manifest::new("nope")),
            Err(ManifestError::NotFound { .. })
        ));
        assert!(!dir.path().join(MANIFEST_NAMES[0]).exists());

        Ok(())
    }

    #[test]
    fn parse_error_names_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        write(dir.path().join(MANIFEST_NAMES[0]), "name = [unclosed")?;
        let store = ManifestStore::new(dir.path());

        match store.read() {
            Err(ManifestError::Parse { path, .. }) => {
                assert_eq!(path, dir.path().join(MANIFEST_NAMES[0]));
            }
            other => panic!("expected parse error, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn init_refuses_to_overwrite() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let store = ManifestStore::new(dir.path());
        store.init(&Manifest::new("first"))?;

        assert!(matches!(
            store.init(&Manifest::new("second")),
            Err(ManifestError::AlreadyExists { .. })
        ));
        assert_eq!(store.read()?.name, "first");

        Ok(())
    }
}
