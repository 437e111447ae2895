// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version resolution.
//!
//! Packages are versioned by the tags of their git repositories. Clockwork
//! never interprets a tag beyond splitting it on dots: the leading component
//! is the __major__ version, and any change to it is a major upgrade that
//! must be requested explicitly through `clockwork upgrade`.
//!
//! # Tag Ordering
//!
//! By default tags are ordered in descending lexicographic order, such that
//! "v10" sorts before "v9". Projects that tag with multi-digit components can
//! opt into [`TagOrder::Semantic`], which orders tags that parse as semantic
//! versions numerically.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sentinel version meaning "resolve at install time".
pub const LATEST: &str = "latest";

/// Branch used when the remote's default branch cannot be determined.
pub const FALLBACK_BRANCH: &str = "main";

/// Ordering strategy applied to remote tags.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOrder {
    /// Descending string order.
    #[default]
    Lexicographic,

    /// Descending semantic version order. Tags that do not parse as semantic
    /// versions come after those that do, in descending string order.
    Semantic,
}

impl TagOrder {
    /// Sort tags newest first.
    pub fn sort(&self, tags: &mut [String]) {
        match self {
            Self::Lexicographic => tags.sort_by(|a, b| b.cmp(a)),
            Self::Semantic => tags.sort_by(|a, b| semantic_cmp(b, a)),
        }
    }
}

fn semantic_cmp(a: &str, b: &str) -> Ordering {
    match (parse_semver(a), parse_semver(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

fn parse_semver(tag: &str) -> Option<semver::Version> {
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    semver::Version::parse(tag).ok()
}

/// Replace [`LATEST`] sentinel with latest tag.
pub fn resolve_version(requested: &str, latest: &str) -> String {
    if requested == LATEST {
        latest.into()
    } else {
        requested.into()
    }
}

/// Determine if moving from `current` to `candidate` changes the major
/// component.
pub fn is_major_upgrade(current: &str, candidate: &str) -> bool {
    major(current) != major(candidate)
}

fn major(version: &str) -> &str {
    version.split('.').next().unwrap_or(version)
}

/// Determine if `candidate` is an older release than `current`.
///
/// Only decidable when both parse as semantic versions. Otherwise `false`.
pub fn is_downgrade(current: &str, candidate: &str) -> bool {
    match (parse_semver(current), parse_semver(candidate)) {
        (Some(current), Some(candidate)) => candidate < current,
        _ => false,
    }
}

/// Pick the tag to upgrade to from a newest-first tag listing.
///
/// With `allow_major` the newest tag is picked. Otherwise the newest tag
/// that shares its major component with `current` is picked. Tags that are
/// semantically older than `current` are never picked, even if the listing
/// order puts them first. Returns `None` when nothing newer than `current`
/// qualifies.
pub fn upgrade_target<'a>(current: &str, tags: &'a [String], allow_major: bool) -> Option<&'a str> {
    let position = tags.iter().position(|tag| tag == current);
    let candidates = match position {
        Some(index) => &tags[..index],
        None => tags,
    };

    candidates
        .iter()
        .filter(|tag| !is_downgrade(current, tag))
        .find(|tag| allow_major || !is_major_upgrade(current, tag))
        .map(String::as_str)
}

/// Parse output of `git ls-remote --tags --refs` into tag names.
pub fn parse_tag_listing(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter_map(|reference| reference.strip_prefix("refs/tags/"))
        .map(|tag| tag.strip_suffix("^{}").unwrap_or(tag).to_string())
        .fold(Vec::new(), |mut tags, tag| {
            if !tags.contains(&tag) {
                tags.push(tag);
            }
            tags
        })
}

/// Parse output of `git ls-remote --symref <url> HEAD` into branch name.
pub fn parse_symbolic_head(listing: &str) -> Option<String> {
    listing.lines().find_map(|line| {
        let rest = line.strip_prefix("ref:")?;
        let reference = rest.split_whitespace().next()?;
        reference.strip_prefix("refs/heads/").map(ToString::to_string)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test_case("latest", "1.4.0", "1.4.0"; "sentinel resolves to latest tag")]
    #[test_case("1.2.0", "1.4.0", "1.2.0"; "concrete tag is kept")]
    #[test_case("main", "1.4.0", "main"; "branch is kept")]
    #[test]
    fn resolve_version_cases(requested: &str, latest: &str, expect: &str) {
        pretty_assertions::assert_eq!(resolve_version(requested, latest), expect);
    }

    #[test_case("1.2.0", "1.2.1", false; "patch")]
    #[test_case("1.2.0", "1.3.0", false; "minor")]
    #[test_case("1.2.0", "2.0.0", true; "major")]
    #[test_case("v1.9", "v2.0", true; "prefixed major")]
    #[test_case("3", "3.1", false; "missing trailing components")]
    #[test]
    fn is_major_upgrade_cases(current: &str, candidate: &str, expect: bool) {
        pretty_assertions::assert_eq!(is_major_upgrade(current, candidate), expect);
    }

    #[test]
    fn lexicographic_order_is_string_descending() {
        let mut result = tags(&["v9.0.0", "v10.0.0", "v1.0.0"]);
        TagOrder::Lexicographic.sort(&mut result);
        assert_eq!(result, tags(&["v9.0.0", "v10.0.0", "v1.0.0"]));
    }

    #[test]
    fn semantic_order_is_numeric_descending() {
        let mut result = tags(&["v9.0.0", "nightly", "v10.0.0", "1.0.0"]);
        TagOrder::Semantic.sort(&mut result);
        assert_eq!(result, tags(&["v10.0.0", "v9.0.0", "1.0.0", "nightly"]));
    }

    #[test_case(false, Some("1.3.0"); "minor upgrade only")]
    #[test_case(true, Some("2.0.0"); "major upgrade allowed")]
    #[test]
    fn upgrade_target_cases(allow_major: bool, expect: Option<&str>) {
        let listing = tags(&["2.0.0", "1.3.0", "1.2.0"]);
        pretty_assertions::assert_eq!(upgrade_target("1.2.0", &listing, allow_major), expect);
    }

    #[test]
    fn upgrade_target_ignores_older_tags() {
        let listing = tags(&["1.3.0", "1.2.0", "1.1.0"]);
        assert_eq!(upgrade_target("1.3.0", &listing, true), None);
    }

    #[test_case(false, None; "older minor in string order is skipped")]
    #[test_case(true, Some("2.0.0"); "major upgrade still found")]
    #[test]
    fn upgrade_target_never_downgrades(allow_major: bool, expect: Option<&str>) {
        let mut listing = tags(&["1.9.0", "1.10.0", "2.0.0"]);
        TagOrder::Lexicographic.sort(&mut listing);
        pretty_assertions::assert_eq!(listing, tags(&["2.0.0", "1.9.0", "1.10.0"]));
        pretty_assertions::assert_eq!(upgrade_target("1.10.0", &listing, allow_major), expect);
    }

    #[test_case("1.10.0", "1.9.0", true; "older minor")]
    #[test_case("1.9.0", "1.10.0", false; "newer minor")]
    #[test_case("main", "1.0.0", false; "branch is undecidable")]
    #[test]
    fn is_downgrade_cases(current: &str, candidate: &str, expect: bool) {
        pretty_assertions::assert_eq!(is_downgrade(current, candidate), expect);
    }

    #[test]
    fn parse_tag_listing_strips_refs() {
        let listing = indoc! {"
            1111111111111111111111111111111111111111\trefs/tags/1.2.0
            2222222222222222222222222222222222222222\trefs/tags/1.3.0
            3333333333333333333333333333333333333333\trefs/tags/1.3.0^{}
        "};
        assert_eq!(parse_tag_listing(listing), tags(&["1.2.0", "1.3.0"]));
    }

    #[test]
    fn parse_symbolic_head_finds_branch() {
        let listing = indoc! {"
            ref: refs/heads/trunk\tHEAD
            1111111111111111111111111111111111111111\tHEAD
        "};
        assert_eq!(parse_symbolic_head(listing), Some("trunk".into()));
        assert_eq!(parse_symbolic_head(""), None);
    }
}
