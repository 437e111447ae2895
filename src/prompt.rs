// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! User prompts.
//!
//! Some operations need a decision from the user, e.g., whether to fall back
//! to a package's default branch when it has no tags. Those decisions go
//! through the [`Prompter`] trait so that scripted and non-interactive
//! callers can answer them without a terminal.

use indicatif::MultiProgress;
use inquire::{Confirm, Text};
use std::{cell::RefCell, collections::VecDeque};
use tracing::{debug, instrument};

/// Capability to ask the user questions.
pub trait Prompter {
    /// Ask yes/no question.
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Ask for line of text.
    fn text(&self, message: &str, default: &str) -> Result<String>;
}

/// Prompt through the terminal.
///
/// Any progress spinners drawn by the shared [`MultiProgress`] are suspended
/// while the question is on screen.
#[derive(Debug, Clone)]
pub struct InquirePrompter {
    progress: MultiProgress,
}

impl InquirePrompter {
    /// Construct new terminal prompter.
    pub fn new(progress: MultiProgress) -> Self {
        Self { progress }
    }
}

impl Prompter for InquirePrompter {
    #[instrument(skip(self), level = "debug")]
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        self.progress.suspend(|| {
            Confirm::new(message)
                .with_default(default)
                .prompt()
                .map_err(PromptError::Inquire)
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn text(&self, message: &str, default: &str) -> Result<String> {
        self.progress.suspend(|| {
            Text::new(message)
                .with_default(default)
                .prompt()
                .map_err(PromptError::Inquire)
        })
    }
}

/// Answer every question with its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NonInteractive;

impl Prompter for NonInteractive {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        debug!("non-interactive answer to {message:?}: {default}");
        Ok(default)
    }

    fn text(&self, message: &str, default: &str) -> Result<String> {
        debug!("non-interactive answer to {message:?}: {default:?}");
        Ok(default.into())
    }
}

/// Scripted answer for [`ScriptedPrompter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Text(String),
}

/// Answer questions from a queue of scripted answers.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: RefCell<VecDeque<Answer>>,
    asked: RefCell<Vec<String>>,
}

impl ScriptedPrompter {
    /// Construct new scripted prompter.
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            asked: RefCell::new(Vec::new()),
        }
    }

    /// Questions asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }

    fn next(&self, message: &str) -> Result<Answer> {
        self.asked.borrow_mut().push(message.into());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| PromptError::Exhausted {
                message: message.into(),
            })
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message)? {
            Answer::Confirm(answer) => Ok(answer),
            Answer::Text(_) => Err(PromptError::Mismatch {
                message: message.into(),
            }),
        }
    }

    fn text(&self, message: &str, _default: &str) -> Result<String> {
        match self.next(message)? {
            Answer::Text(answer) => Ok(answer),
            Answer::Confirm(_) => Err(PromptError::Mismatch {
                message: message.into(),
            }),
        }
    }
}

/// Prompt failures.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Terminal prompt failed or was cancelled.
    #[error(transparent)]
    Inquire(#[from] inquire::InquireError),

    /// No scripted answer left.
    #[error("no scripted answer left for {message:?}")]
    Exhausted { message: String },

    /// Scripted answer has wrong kind.
    #[error("scripted answer has wrong kind for {message:?}")]
    Mismatch { message: String },
}

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
