// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package lifecycle management.
//!
//! A __package__ is a git repository that a project lists as a dependency in
//! its manifest. Each installed package lives in its own __working copy__ at
//! `packages/<name>` inside the project, which is owned exclusively by the
//! [`PackageManager`].
//!
//! # Package Lifecycle
//!
//! A package is either absent or installed. Adding a package resolves where
//! it lives and which version to use, clones it, and records it in the
//! manifest. Syncing brings every recorded package up to date: missing
//! working copies are cloned, working copies whose origin changed are cloned
//! again, and the rest are fetched and moved to the newest acceptable tag.
//! Uninstalling deletes the working copy and forgets the dependency.
//!
//! # Upgrade Policy
//!
//! A sync only moves packages across minor and patch versions unless major
//! upgrades are explicitly allowed. Major upgrades that were left unapplied
//! are reported back so the user can decide to run `clockwork upgrade`.
//! Packages pinned to a branch are never moved to a tag.
//!
//! # Lifecycle Scripts
//!
//! Packages may declare `postinstall` and `postupdate` scripts in their own
//! manifest. These run through the platform shell inside the package's
//! working copy. A failing script is reported, but never aborts the
//! operation that triggered it.

pub mod reference;

use crate::{
    command::CommandError,
    git::{Git, GitError},
    manifest::{Dependency, FormatVersion, LifecycleEvent, Manifest, ManifestError, ManifestStore},
    progress::Reporter,
    prompt::{PromptError, Prompter},
    registry::{RegistryError, RegistrySource, REGISTRY_GUIDE_URL},
    version::{is_downgrade, is_major_upgrade, resolve_version, upgrade_target, LATEST},
};
use reference::{check_name, package_name, PackageRef, Source};

use std::{
    fs::remove_dir_all,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Package that was just added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    pub name: String,
    pub url: String,
    pub version: String,
}

/// Version change applied to a package during sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub from: String,
    pub to: String,
}

/// Major upgrade left unapplied during sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upgradeable {
    pub name: String,
    pub current: String,
    pub available: String,
}

/// Package that failed to sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub name: String,
    pub reason: String,
}

/// Outcome of syncing every dependency of a project.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Packages whose working copy had to be cloned.
    pub installed: Vec<String>,

    /// Packages moved to another version.
    pub updated: Vec<Change>,

    /// Packages with a major upgrade available but not applied.
    pub upgradeable: Vec<Upgradeable>,

    /// Packages that could not be synced.
    pub failed: Vec<Failure>,
}

#[derive(Debug, Default)]
struct SyncOutcome {
    installed: bool,
    version: Option<String>,
    upgradeable: Option<String>,
}

/// Install, update, and uninstall the packages of a project.
pub struct PackageManager<'a> {
    manifests: ManifestStore,
    packages_dir: PathBuf,
    git: Git,
    registry: &'a dyn RegistrySource,
    prompter: &'a dyn Prompter,
    reporter: &'a dyn Reporter,
}

impl<'a> PackageManager<'a> {
    /// Construct new package manager.
    ///
    /// The manifest is read from `project_dir`, and working copies are
    /// placed in `packages_dir`.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        packages_dir: impl Into<PathBuf>,
        git: Git,
        registry: &'a dyn RegistrySource,
        prompter: &'a dyn Prompter,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            manifests: ManifestStore::new(project_dir),
            packages_dir: packages_dir.into(),
            git,
            registry,
            prompter,
            reporter,
        }
    }

    /// Manifest store of the project.
    pub fn manifests(&self) -> &ManifestStore {
        &self.manifests
    }

    /// Path to working copy of target package.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::InvalidName`] if `name` is not a plain
    ///   directory name, i.e., the working copy would not land directly
    ///   inside the packages directory.
    pub fn package_path(&self, name: &str) -> Result<PathBuf> {
        let path = self.packages_dir.join(check_name(name)?);

        // INVARIANT: Working copies always live directly in packages directory.
        if path.parent() != Some(self.packages_dir.as_path()) {
            return Err(PackageError::InvalidName { name: name.into() });
        }

        Ok(path)
    }

    /// Create manifest for new project.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Manifest`] if a manifest already exists or
    ///   cannot be written.
    pub fn init(&self, name: &str) -> Result<PathBuf> {
        self.reporter.begin("Initializing manifest...");
        match self.manifests.init(&Manifest::new(name)) {
            Ok(path) => {
                self.reporter
                    .finish(true, &format!("Created {}", path.display()));
                Ok(path)
            }
            Err(error) => {
                self.reporter.finish(false, "Failed to initialize manifest");
                Err(error.into())
            }
        }
    }

    /// List dependencies of the project in name order.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Manifest`] if the manifest cannot be read.
    pub fn list(&self) -> Result<Vec<(String, Dependency)>> {
        Ok(self.manifests.read()?.dependencies.into_iter().collect())
    }

    /// Add package to the project and install it.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Manifest`] if the manifest cannot be read or
    ///   written.
    /// - Return [`PackageError::Registry`] if a short name cannot be resolved.
    /// - Return [`PackageError::NoTags`] if the package has no tags and the
    ///   user declined to use its default branch.
    /// - Return [`PackageError::Git`] if the package cannot be cloned.
    #[instrument(skip(self), level = "debug")]
    pub fn add(&self, reference: &str) -> Result<Installed> {
        let reference = PackageRef::parse(reference);
        self.reporter.begin(&format!("Installing {reference}..."));

        match self.add_package(&reference) {
            Ok(installed) => {
                self.reporter.finish(
                    true,
                    &format!("Package {}@{} added", installed.name, installed.version),
                );
                Ok(installed)
            }
            Err(error) => {
                self.reporter
                    .finish(false, &format!("Failed to add {reference}"));
                Err(error)
            }
        }
    }

    /// Optionally add a package, then sync every dependency.
    ///
    /// # Errors
    ///
    /// - Return any error of [`PackageManager::add`] for `reference`.
    /// - Return [`PackageError::Manifest`] if the manifest cannot be read or
    ///   written while syncing.
    pub fn install(&self, reference: Option<&str>) -> Result<SyncReport> {
        if let Some(reference) = reference {
            self.add(reference)?;
        }

        self.sync(false)
    }

    /// Bring every dependency up to date.
    ///
    /// Failures of individual packages are reported and collected in the
    /// returned [`SyncReport`] without stopping the remaining packages.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::Manifest`] if the manifest cannot be read or
    ///   written.
    #[instrument(skip(self), level = "debug")]
    pub fn sync(&self, allow_major: bool) -> Result<SyncReport> {
        let mut manifest = self.manifests.read()?;
        let format = manifest.watch_face_format_version;
        let mut report = SyncReport::default();
        self.reporter.begin("Updating packages...");

        let dependencies = manifest
            .dependencies
            .iter()
            .map(|(name, dependency)| (name.clone(), dependency.clone()))
            .collect::<Vec<_>>();

        for (name, dependency) in dependencies {
            self.reporter.update(&format!("Updating {name}..."));
            let outcome = match self.sync_package(&name, &dependency, format, allow_major) {
                Ok(outcome) => outcome,
                Err(error) => {
                    warn!("failed to update {name}: {error}");
                    self.reporter
                        .warn(&format!("Failed to update {name}: {error}"));
                    report.failed.push(Failure {
                        name,
                        reason: error.to_string(),
                    });
                    continue;
                }
            };

            if outcome.installed {
                report.installed.push(name.clone());
            }

            let current = match outcome.version {
                Some(version) => {
                    if version != dependency.version {
                        report.updated.push(Change {
                            name: name.clone(),
                            from: dependency.version.clone(),
                            to: version.clone(),
                        });
                    }
                    if let Some(entry) = manifest.dependencies.get_mut(&name) {
                        entry.version = version.clone();
                    }
                    version
                }
                None => dependency.version.clone(),
            };

            if let Some(available) = outcome.upgradeable {
                report.upgradeable.push(Upgradeable {
                    name,
                    current,
                    available,
                });
            }
        }

        self.manifests.write(&manifest)?;
        self.reporter.finish(
            report.failed.is_empty(),
            &format!(
                "Packages up to date, {} can be upgraded with `clockwork upgrade`",
                report.upgradeable.len()
            ),
        );

        Ok(report)
    }

    /// Remove package from the project.
    ///
    /// # Errors
    ///
    /// - Return [`PackageError::NotInstalled`] if the manifest does not list
    ///   the package.
    /// - Return [`PackageError::Io`] if the working copy cannot be deleted.
    /// - Return [`PackageError::Manifest`] if the manifest cannot be read or
    ///   written.
    #[instrument(skip(self), level = "debug")]
    pub fn uninstall(&self, name: &str) -> Result<()> {
        self.reporter.begin(&format!("Uninstalling {name}..."));
        match self.uninstall_package(name) {
            Ok(()) => {
                self.reporter
                    .finish(true, &format!("Package {name} uninstalled"));
                Ok(())
            }
            Err(error) => {
                self.reporter
                    .finish(false, &format!("Failed to uninstall {name}"));
                Err(error)
            }
        }
    }

    fn add_package(&self, reference: &PackageRef) -> Result<Installed> {
        let mut manifest = self.manifests.read()?;
        let (url, pinned) = self.resolve_source(&reference.source)?;
        let name = package_name(&url)?;

        let version = if reference.version == LATEST {
            let latest = self.resolve_initial_version(&url, pinned)?;
            resolve_version(&reference.version, &latest)
        } else {
            reference.version.clone()
        };

        self.install_working_copy(&name, &url, &version)?;

        self.reporter.update("Adding package to manifest...");
        manifest
            .dependencies
            .insert(name.clone(), Dependency::new(url.as_str(), version.as_str()));
        self.manifests.write(&manifest)?;

        self.run_package_hooks(
            &name,
            manifest.watch_face_format_version,
            LifecycleEvent::PostInstall,
        );

        Ok(Installed { name, url, version })
    }

    fn resolve_source(&self, source: &Source) -> Result<(String, Option<String>)> {
        match source {
            Source::Url(url) => Ok((url.clone(), None)),
            Source::Registry(name) => {
                self.reporter
                    .update(&format!("Looking up {name} in the registry..."));
                let registry = self.registry.fetch()?;
                let entry = registry.lookup(name)?;
                debug!("registry resolved {name} to {}", entry.url);
                Ok((entry.url.clone(), entry.version.clone()))
            }
        }
    }

    fn resolve_initial_version(&self, url: &str, pinned: Option<String>) -> Result<String> {
        if let Some(version) = pinned {
            return Ok(version);
        }

        if let Some(tag) = self.git.latest_tag(url)? {
            return Ok(tag);
        }

        let use_branch = self
            .prompter
            .confirm("No tags for this package. Install default branch instead?", false)?;
        if !use_branch {
            return Err(PackageError::NoTags { url: url.into() });
        }

        Ok(self.git.default_branch(url))
    }

    fn install_working_copy(&self, name: &str, url: &str, version: &str) -> Result<()> {
        let path = self.package_path(name)?;

        // INVARIANT: Never clone over an existing directory.
        if path.exists() {
            debug!("remove existing working copy {}", path.display());
            remove_dir_all(&path).map_err(|source| PackageError::Io {
                path: path.clone(),
                source,
            })?;
        }

        mkdirp::mkdirp(&self.packages_dir).map_err(|source| PackageError::Io {
            path: self.packages_dir.clone(),
            source,
        })?;

        self.reporter.update(&format!("Cloning {url}..."));
        self.git.clone_repo(url, version, &path)?;

        Ok(())
    }

    fn sync_package(
        &self,
        name: &str,
        dependency: &Dependency,
        format: Option<FormatVersion>,
        allow_major: bool,
    ) -> Result<SyncOutcome> {
        let path = self.package_path(name)?;
        let mut outcome = SyncOutcome::default();

        // INVARIANT: Never check out or record the latest sentinel itself.
        let version = if dependency.version == LATEST {
            self.resolve_initial_version(&dependency.url, None)?
        } else {
            dependency.version.clone()
        };

        if !path.exists() {
            self.install_working_copy(name, &dependency.url, &version)?;
            outcome.installed = true;
        } else if self.git.origin_url(&path)? != dependency.url {
            self.reporter
                .update(&format!("URL changed for {name}, reinstalling..."));
            self.install_working_copy(name, &dependency.url, &version)?;
        } else {
            self.git.fetch_all(&path)?;
            let checkout = self
                .git
                .checkout(&path, &version)
                .and_then(|_| self.git.pull(&path, &version));
            if let Err(error) = checkout {
                debug!("checkout of {version} failed: {error}");
                self.reporter.warn(&format!(
                    "Could not checkout version {version} for {name}, using current version"
                ));
            }
        }

        let current = self.apply_upgrade(
            name,
            &path,
            &version,
            &dependency.url,
            allow_major,
            &mut outcome,
        );
        outcome.version = Some(current);

        let event = if outcome.installed {
            LifecycleEvent::PostInstall
        } else {
            LifecycleEvent::PostUpdate
        };
        self.run_package_hooks(name, format, event);

        Ok(outcome)
    }

    fn apply_upgrade(
        &self,
        name: &str,
        path: &Path,
        version: &str,
        url: &str,
        allow_major: bool,
        outcome: &mut SyncOutcome,
    ) -> String {
        let tags = match self.git.list_tags(url) {
            Ok(Some(tags)) => tags,
            Ok(None) => return version.into(),
            Err(error) => {
                self.reporter.warn(&format!(
                    "Could not list tags for {name}, keeping {version}: {error}"
                ));
                return version.into();
            }
        };

        if !tags.iter().any(|tag| tag == version) {
            debug!("{name} tracks {version}, which is not a tag");
            return version.into();
        }

        let mut current = version.to_string();
        if let Some(target) = upgrade_target(version, &tags, allow_major) {
            match self.git.checkout(path, target) {
                Ok(()) => {
                    info!("updated {name} from {version} to {target}");
                    self.reporter
                        .update(&format!("Updated {name} to {target}"));
                    current = target.to_string();
                }
                Err(error) => {
                    self.reporter.warn(&format!(
                        "Could not upgrade {name} to {target}: {error}"
                    ));
                }
            }
        }

        if let Some(latest) = tags.first() {
            if *latest != current
                && is_major_upgrade(&current, latest)
                && !is_downgrade(&current, latest)
            {
                outcome.upgradeable = Some(latest.clone());
            }
        }

        current
    }

    fn run_package_hooks(&self, name: &str, format: Option<FormatVersion>, event: LifecycleEvent) {
        let path = match self.package_path(name) {
            Ok(path) => path,
            Err(error) => {
                warn!("skip hooks of {name}: {error}");
                return;
            }
        };
        let manifest = match ManifestStore::new(&path).read() {
            Ok(manifest) => manifest,
            Err(error) => {
                self.reporter.warn(&format!(
                    "Failed to read manifest of {name}: {error}. Are you sure it's compatible with Clockwork?"
                ));
                return;
            }
        };

        if manifest.watch_face_format_version != format {
            self.reporter.warn(&format!(
                "Package {name} isn't compatible with this watch face format version"
            ));
        }

        if let Some(script) = manifest.script(event) {
            self.reporter
                .update(&format!("Running {event} script of {name}..."));
            if let Err(error) = self.git.runner().run_script(script, &path) {
                warn!("{event} script of {name} failed: {error}");
                self.reporter
                    .warn(&format!("{event} script of {name} failed: {error}"));
            }
        }
    }

    fn uninstall_package(&self, name: &str) -> Result<()> {
        let mut manifest = self.manifests.read()?;
        if manifest.dependencies.remove(name).is_none() {
            return Err(PackageError::NotInstalled { name: name.into() });
        }

        let path = self.package_path(name)?;
        if path.exists() {
            remove_dir_all(&path).map_err(|source| PackageError::Io {
                path: path.clone(),
                source,
            })?;
        }

        self.manifests.write(&manifest)?;
        Ok(())
    }
}

/// Package lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// Manifest cannot be read or written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Registry lookup fails.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Git operation fails.
    #[error(transparent)]
    Git(#[from] GitError),

    /// User prompt fails.
    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Package has no tags, and default branch was declined.
    #[error("installation aborted, no tags available for {url}")]
    NoTags { url: String },

    /// Package name would not be a plain directory inside the packages
    /// directory.
    #[error("invalid package name {name:?}")]
    InvalidName { name: String },

    /// Package is not listed in the manifest.
    #[error("package {name} is not installed")]
    NotInstalled { name: String },

    /// Working copy cannot be created or removed.
    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackageError {
    /// Remediation hint to show alongside the error, if any.
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Manifest(ManifestError::NotFound { .. }) => {
                Some("Run `clockwork init` to create a manifest.".into())
            }
            Self::Registry(RegistryError::NotFound { .. }) => Some(format!(
                "See {REGISTRY_GUIDE_URL} for the registry. If you meant to use a git URL, make sure it starts with \"https://\"."
            )),
            Self::Registry(_) => Some(
                "Check your network connection and the package name, or install with a direct git URL."
                    .into(),
            ),
            Self::Git(GitError::Command(CommandError::NotFound { .. })) => {
                Some("Install Git and try again.".into())
            }
            Self::NotInstalled { .. } => {
                Some("Run `clockwork packages` to list installed packages.".into())
            }
            Self::InvalidName { .. } => Some(
                "Package names come from the last segment of the git URL, which must be a plain directory name."
                    .into(),
            ),
            _ => None,
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = PackageError> = std::result::Result<T, E>;
