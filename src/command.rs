// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External process execution.
//!
//! Clockwork delegates almost all of its real work to other programs: `git`
//! for fetching packages, and the platform shell for package lifecycle
//! scripts. This module locates those programs and runs them synchronously.
//!
//! # Locating Tools
//!
//! End users frequently install Git without adding it to their search path,
//! especially on Windows. Thus, locating a program first consults the search
//! path handed to the [`CommandRunner`], and then falls back to a fixed
//! listing of common install locations for the current platform.

use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, ExitStatus, Stdio},
};
use tracing::{debug, instrument};

/// Captured result of a finished external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Standard output with surrounding whitespace trimmed.
    pub stdout: String,

    /// Standard error with surrounding whitespace trimmed.
    pub stderr: String,

    /// Exit code, if the process was not killed by a signal.
    pub code: Option<i32>,
}

/// Run external programs with an explicit search path.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    search_path: Option<OsString>,
    cwd: PathBuf,
}

impl CommandRunner {
    /// Construct new command runner that searches `search_path` for programs.
    ///
    /// The search path uses the platform's `PATH` syntax. Programs given as
    /// relative paths are resolved against `cwd`.
    pub fn new(search_path: Option<OsString>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            search_path,
            cwd: cwd.into(),
        }
    }

    /// Construct new command runner from the current process environment.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(std::env::var_os("PATH"), cwd)
    }

    /// Locate absolute path of a program.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::NotFound`] if the program is neither on the
    ///   search path nor in any common install location.
    #[instrument(skip(self), level = "debug")]
    pub fn locate(&self, program: &str) -> Result<PathBuf> {
        if let Ok(path) = which::which_in(program, self.search_path.as_ref(), &self.cwd) {
            debug!("found {program} at {}", path.display());
            return Ok(path);
        }

        for pattern in common_locations(program) {
            let Ok(paths) = glob::glob(&pattern) else {
                continue;
            };

            if let Some(path) = paths.flatten().find(|path| path.is_file()) {
                debug!("found {program} at common location {}", path.display());
                return Ok(path);
            }
        }

        Err(CommandError::NotFound {
            program: program.into(),
        })
    }

    /// Run program to completion, capturing its output.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::NotFound`] if program cannot be located.
    /// - Return [`CommandError::Spawn`] if the process cannot be started.
    /// - Return [`CommandError::Failed`] if the process exits unsuccessfully.
    #[instrument(skip(self, args, cwd), level = "debug")]
    pub fn run(
        &self,
        program: &str,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
        cwd: Option<&Path>,
    ) -> Result<Output> {
        let bin = self.locate(program)?;
        let args = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect::<Vec<_>>();
        debug!("run {} {:?}", bin.display(), args);

        let mut command = Command::new(&bin);
        command.args(&args).stdin(Stdio::null());
        if let Some(search_path) = &self.search_path {
            command.env("PATH", search_path);
        }
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }

        let output = command.output().map_err(|source| CommandError::Spawn {
            program: program.into(),
            source,
        })?;
        let result = Output {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            code: output.status.code(),
        };

        if !output.status.success() {
            let message = if result.stderr.is_empty() {
                result.stdout.clone()
            } else {
                result.stderr.clone()
            };
            return Err(CommandError::Failed {
                program: program.into(),
                args: render_args(&args),
                code: result.code,
                message,
            });
        }

        Ok(result)
    }

    /// Run shell script through the platform shell with inherited stdio.
    ///
    /// Blocks until the script finishes.
    ///
    /// # Errors
    ///
    /// - Return [`CommandError::Spawn`] if the shell cannot be started.
    /// - Return [`CommandError::Script`] if the script exits unsuccessfully.
    #[instrument(skip(self, cwd), level = "debug")]
    pub fn run_script(&self, script: &str, cwd: &Path) -> Result<()> {
        let (shell, flag) = platform_shell();
        let mut command = Command::new(shell);
        command.arg(flag).arg(script).current_dir(cwd);
        if let Some(search_path) = &self.search_path {
            command.env("PATH", search_path);
        }

        let status = command
            .spawn()
            .and_then(|mut child| child.wait())
            .map_err(|source| CommandError::Spawn {
                program: shell.into(),
                source,
            })?;

        check_script_status(script, status)
    }
}

impl Default for CommandRunner {
    fn default() -> Self {
        Self::from_env()
    }
}

fn check_script_status(script: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        return Ok(());
    }

    Err(CommandError::Script {
        script: script.into(),
        code: status.code(),
    })
}

fn render_args(args: &[OsString]) -> String {
    args.iter()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(windows)]
fn platform_shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

#[cfg(not(windows))]
fn platform_shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}

/// Glob patterns of common install locations for a program.
#[cfg(windows)]
fn common_locations(program: &str) -> Vec<String> {
    let env_dir = |key: &str| std::env::var(key).ok().filter(|dir| !dir.is_empty());
    let program_files = env_dir("ProgramFiles");
    let program_files_x86 = env_dir("ProgramFiles(x86)");
    let local_app_data = env_dir("LOCALAPPDATA");
    let exe = format!("{program}.exe");

    let mut patterns = Vec::new();
    match program {
        "git" => {
            for base in [&program_files, &program_files_x86].into_iter().flatten() {
                patterns.push(format!(r"{base}\Git\cmd\{exe}"));
            }
            if let Some(base) = &local_app_data {
                patterns.push(format!(r"{base}\Programs\Git\cmd\{exe}"));
                patterns.push(format!(r"{base}\GitHub\PortableGit_*\cmd\{exe}"));
            }
        }
        "python" | "python3" => {
            for base in [&local_app_data, &program_files, &program_files_x86]
                .into_iter()
                .flatten()
            {
                patterns.push(format!(r"{base}\Python*\python.exe"));
                patterns.push(format!(r"{base}\Programs\Python\Python*\python.exe"));
            }
        }
        _ => {
            for base in [&program_files, &program_files_x86].into_iter().flatten() {
                patterns.push(format!(r"{base}\*\bin\{exe}"));
            }
        }
    }

    patterns
}

/// Glob patterns of common install locations for a program.
#[cfg(not(windows))]
fn common_locations(program: &str) -> Vec<String> {
    ["/usr/bin", "/usr/local/bin", "/opt/homebrew/bin", "/opt/local/bin"]
        .into_iter()
        .map(|dir| format!("{dir}/{program}"))
        .collect()
}

/// External process execution failures.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Program could not be located anywhere.
    #[error("{program} is not installed or could not be found in common locations")]
    NotFound { program: String },

    /// Process could not be started.
    #[error("failed to execute {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Process exited unsuccessfully.
    #[error("command `{program} {args}` failed ({}): {message}", display_code(.code))]
    Failed {
        program: String,
        args: String,
        code: Option<i32>,
        message: String,
    },

    /// Lifecycle script exited unsuccessfully.
    #[error("script `{script}` failed ({})", display_code(.code))]
    Script { script: String, code: Option<i32> },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".into(),
    }
}

/// Friendly result alias :3
pub type Result<T, E = CommandError> = std::result::Result<T, E>;
