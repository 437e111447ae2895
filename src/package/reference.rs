// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package references given on the command line.

use super::{PackageError, Result};
use crate::version::LATEST;

use std::fmt::{Display, Formatter, Result as FmtResult};

const URL_SCHEMES: [&str; 4] = ["https://", "http://", "ssh://", "file://"];

/// Where a package reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Direct git URL.
    Url(String),

    /// Short name to look up in the registry.
    Registry(String),
}

/// Parsed package reference, e.g., `https://host/owner/repo.git@1.2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRef {
    pub source: Source,
    pub version: String,
}

impl PackageRef {
    /// Parse package reference.
    ///
    /// A trailing `@<version>` selects a tag or branch; without one the
    /// version is [`LATEST`]. The `@` of SSH shorthand such as
    /// `git@host:owner/repo.git` is not mistaken for a version separator.
    pub fn parse(reference: &str) -> Self {
        let (target, version) = split_version(reference.trim());
        let source = if is_url(target) {
            Source::Url(target.into())
        } else {
            Source::Registry(target.into())
        };

        Self {
            source,
            version: version.unwrap_or(LATEST).into(),
        }
    }
}

impl Display for PackageRef {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match &self.source {
            Source::Url(url) => fmt.write_str(url)?,
            Source::Registry(name) => fmt.write_str(name)?,
        }

        if self.version != LATEST {
            write!(fmt, "@{}", self.version)?;
        }

        Ok(())
    }
}

fn split_version(reference: &str) -> (&str, Option<&str>) {
    match reference.rsplit_once('@') {
        Some((target, version))
            if !target.is_empty()
                && !version.is_empty()
                && !version.contains('/')
                && !version.contains(':') =>
        {
            (target, Some(version))
        }
        _ => (reference, None),
    }
}

/// Determine if reference is a direct git URL rather than a registry name.
pub fn is_url(reference: &str) -> bool {
    URL_SCHEMES
        .iter()
        .any(|scheme| reference.starts_with(scheme))
        || is_scp_like(reference)
}

fn is_scp_like(reference: &str) -> bool {
    match reference.split_once(':') {
        Some((host, path)) => host.contains('@') && !host.contains('/') && !path.is_empty(),
        None => false,
    }
}

/// Derive package name from git URL.
///
/// Uses the last path segment with any `.git` extension removed.
///
/// # Errors
///
/// - Return [`PackageError::InvalidName`] if the segment is not a valid
///   package name, see [`check_name`].
pub fn package_name(url: &str) -> Result<String> {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    check_name(name).map(ToString::to_string)
}

/// Ensure package name is usable as a single directory name.
///
/// # Errors
///
/// - Return [`PackageError::InvalidName`] if `name` is empty, `.` or `..`,
///   or contains a path separator, drive separator, or NUL byte.
pub fn check_name(name: &str) -> Result<&str> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', ':', '\0']);
    if invalid {
        return Err(PackageError::InvalidName { name: name.into() });
    }

    Ok(name)
}
