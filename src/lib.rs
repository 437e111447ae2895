// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Package manager for Watch Face Format projects.
//!
//! Clockwork fetches, versions, and tracks the dependencies of a watch face
//! project. Dependencies are plain git repositories. Which of them a project
//! uses, and at which tag or branch, is recorded in the project's manifest,
//! and each one is materialized as a working copy under `packages/`.
//!
//! # See Also
//!
//! 1. [`package`] for the install, update, and uninstall lifecycle.
//! 2. [`manifest`] for the manifest layout.
//! 3. [`updater`] for replacing the Clockwork binary itself.

pub mod command;
pub mod config;
pub mod exit;
pub mod git;
pub mod manifest;
pub mod package;
pub mod path;
pub mod progress;
pub mod prompt;
pub mod registry;
pub mod updater;
pub mod version;
