// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use clockwork::{
    command::CommandRunner,
    config::Settings,
    exit::Failure,
    git::Git,
    package::{PackageError, PackageManager, SyncReport},
    path::{install_root, settings_file, CONFIG_VAR, INSTALL_ROOT_VAR},
    progress::{Reporter, SpinnerReporter},
    prompt::{InquirePrompter, NonInteractive, Prompter},
    registry::HttpRegistry,
    updater::{is_newer, Updater},
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use std::{env, path::PathBuf, process::exit};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "clockwork [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Show debug output.
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Never prompt, answer every question with its default.
    #[arg(long, global = true)]
    pub non_interactive: bool,

    /// Project directory to operate on instead of the current directory.
    #[arg(short, long, global = true, value_name = "dir")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let project_dir = match self.project {
            Some(dir) => dir,
            None => env::current_dir()?,
        };
        let install_root = install_root(env::var_os(INSTALL_ROOT_VAR))?;
        let settings = Settings::load(settings_file(env::var_os(CONFIG_VAR))?)?;
        debug!("Clockwork v{VERSION} in {}", project_dir.display());

        let progress = MultiProgress::new();
        let reporter = SpinnerReporter::new(progress.clone());
        let prompter: Box<dyn Prompter> = if self.non_interactive {
            Box::new(NonInteractive)
        } else {
            Box::new(InquirePrompter::new(progress.clone()))
        };

        let updater = Updater::new(settings.release_url.as_str(), install_root);
        let wants_update_check = settings.update_check
            && !self.non_interactive
            && !matches!(self.command, Command::SelfUpdate);
        if wants_update_check {
            match check_for_update(&updater, prompter.as_ref(), &reporter) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(error) => warn!("failed to check for updates: {error}"),
            }
        }

        let registry = HttpRegistry::new(settings.registry_url.as_str());
        let git = Git::new(CommandRunner::from_env(), settings.tag_order);
        let manager = PackageManager::new(
            &project_dir,
            settings.packages_dir_for(&project_dir),
            git,
            &registry,
            prompter.as_ref(),
            &reporter,
        );

        match self.command {
            Command::Install(opts) => run_install(&manager, opts),
            Command::Add(opts) => run_add(&manager, opts),
            Command::Update => run_sync(&manager, false),
            Command::Upgrade => run_sync(&manager, true),
            Command::Uninstall(opts) => run_uninstall(&manager, opts),
            Command::Packages => run_packages(&manager),
            Command::Init(opts) => run_init(&manager, prompter.as_ref(), &project_dir, opts),
            Command::SelfUpdate => run_self_update(&updater, prompter.as_ref(), &reporter),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Install a package, then sync all dependencies.
    #[command(visible_alias = "i", override_usage = "clockwork install [options] [package]")]
    Install(InstallOptions),

    /// Add a package to the manifest and install it.
    #[command(override_usage = "clockwork add [options] <package>")]
    Add(AddOptions),

    /// Update dependencies to their latest minor or patch versions.
    Update,

    /// Upgrade dependencies to their latest versions, including major ones.
    Upgrade,

    /// Uninstall packages.
    #[command(visible_alias = "remove", override_usage = "clockwork uninstall [options] <name>...")]
    Uninstall(UninstallOptions),

    /// List installed packages.
    Packages,

    /// Initialize the manifest for the project.
    #[command(visible_alias = "initialize", override_usage = "clockwork init [options] [name]")]
    Init(InitOptions),

    /// Update Clockwork itself.
    SelfUpdate,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    /// Git URL or registry name, optionally suffixed with @<version>.
    #[arg(value_name = "package")]
    pub reference: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AddOptions {
    /// Git URL or registry name, optionally suffixed with @<version>.
    #[arg(required = true, value_name = "package")]
    pub reference: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct UninstallOptions {
    /// Names of packages to uninstall.
    #[arg(required = true, value_name = "name")]
    pub names: Vec<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Project name, prompted for if omitted.
    #[arg(value_name = "name")]
    pub name: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let default_level = if cli.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = cli.run() {
        error!("{error:?}");
        if let Some(hint) = hint(&error) {
            info!("hint: {hint}");
        }
        exit(Failure::classify(&error).code());
    }

    exit(0)
}

fn hint(error: &anyhow::Error) -> Option<String> {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<PackageError>())
        .and_then(PackageError::hint)
}

fn run_install(manager: &PackageManager<'_>, opts: InstallOptions) -> Result<()> {
    let report = manager.install(opts.reference.as_deref())?;
    print_report(&report);
    Ok(())
}

fn run_add(manager: &PackageManager<'_>, opts: AddOptions) -> Result<()> {
    let installed = manager.add(&opts.reference)?;
    info!("Package {} added successfully", installed.name);
    Ok(())
}

fn run_sync(manager: &PackageManager<'_>, allow_major: bool) -> Result<()> {
    let report = manager.sync(allow_major)?;
    print_report(&report);
    Ok(())
}

fn run_uninstall(manager: &PackageManager<'_>, opts: UninstallOptions) -> Result<()> {
    for name in opts.names {
        manager.uninstall(&name)?;
    }

    Ok(())
}

fn run_packages(manager: &PackageManager<'_>) -> Result<()> {
    println!("Installed packages:");
    for (name, dependency) in manager.list()? {
        println!("  • {name}@{}", dependency.version);
    }

    Ok(())
}

fn run_init(
    manager: &PackageManager<'_>,
    prompter: &dyn Prompter,
    project_dir: &std::path::Path,
    opts: InitOptions,
) -> Result<()> {
    let name = match opts.name {
        Some(name) => name,
        None => {
            let default = project_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            prompter.text("Enter the project name:", &default)?
        }
    };

    manager.init(&name)?;
    Ok(())
}

fn run_self_update(updater: &Updater, prompter: &dyn Prompter, reporter: &dyn Reporter) -> Result<()> {
    check_for_update(updater, prompter, reporter)?;
    Ok(())
}

/// Offer to install a newer release, returning whether one was installed.
fn check_for_update(updater: &Updater, prompter: &dyn Prompter, reporter: &dyn Reporter) -> Result<bool> {
    reporter.begin("Checking for updates...");
    let release = match updater.latest_release() {
        Ok(release) => release,
        Err(error) => {
            reporter.finish(false, "Failed to check for updates");
            return Err(error.into());
        }
    };

    if let Err(error) = updater.cleanup_staging() {
        debug!("failed to clean staged downloads: {error}");
    }

    if !is_newer(VERSION, &release) {
        reporter.finish(true, "No updates available");
        return Ok(false);
    }
    reporter.finish(true, &format!("Clockwork {} is available", release.tag_name));

    let message = format!(
        "A newer version ({}) is available. Download the latest release?",
        release.tag_name
    );
    if !prompter.confirm(&message, false)? {
        return Ok(false);
    }

    reporter.begin("Downloading latest release...");
    let active = env::current_exe()?;
    if let Err(error) = updater.apply(&release, &active) {
        reporter.finish(false, "Update failed");
        return Err(error.into());
    }
    reporter.finish(true, &format!("Updated to {}, run clockwork again", release.tag_name));

    Ok(true)
}

fn print_report(report: &SyncReport) {
    for name in &report.installed {
        debug!("installed {name}");
    }

    for change in &report.updated {
        info!("{}: {} -> {}", change.name, change.from, change.to);
    }

    for upgrade in &report.upgradeable {
        info!(
            "{}: {} -> {} available with `clockwork upgrade`",
            upgrade.name, upgrade.current, upgrade.available
        );
    }

    for failure in &report.failed {
        warn!("{} was not updated: {}", failure.name, failure.reason);
    }
}
