// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use aurdesk::{
    aur::{AurClient, AurSearch},
    config::Config,
    desktop::{DesktopEntry, DesktopStore},
    install::{Installer, SystemBuilder},
    path::default_config_file,
    server::{serve, AppState},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use inquire::Confirm;
use std::{fs::read_to_string, io::ErrorKind, path::PathBuf, process::exit, time::Duration};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "aurdesk [options] <command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to configuration file to use instead of the default one.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    async fn run(self) -> Result<()> {
        let config = load_config(self.config)?;
        match self.command {
            Command::Serve => run_serve(config).await,
            Command::Search(opts) => run_search(config, opts).await,
            Command::Install(opts) => run_install(config, opts).await,
            Command::Desktop(opts) => run_desktop(config, opts.command),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Serve HTTP backend for graphical front-ends.
    #[command(override_usage = "aurdesk serve [options]")]
    Serve,

    /// Search AUR for packages.
    #[command(override_usage = "aurdesk search [options] <term>")]
    Search(SearchOptions),

    /// Clone, build, and install AUR package.
    #[command(override_usage = "aurdesk install [options] <package>")]
    Install(InstallOptions),

    /// Manage desktop entry launchers.
    #[command(override_usage = "aurdesk desktop [options] <desktop-command>")]
    Desktop(DesktopOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SearchOptions {
    /// Term to match package names and descriptions against.
    #[arg(required = true, value_name = "term")]
    pub term: String,

    /// Page of results to show.
    #[arg(short, long, value_name = "page", default_value = "1")]
    pub page: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InstallOptions {
    /// Name of AUR package to install.
    #[arg(required = true, value_name = "package")]
    pub package: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DesktopOptions {
    #[command(subcommand)]
    pub command: DesktopCommand,
}

#[derive(Debug, Clone, Subcommand)]
enum DesktopCommand {
    /// Write new desktop entry launcher.
    #[command(override_usage = "aurdesk desktop create [options] --name <name> --exec <exec>")]
    Create(CreateOptions),

    /// List desktop entry launchers.
    #[command(override_usage = "aurdesk desktop list [options]")]
    List,

    /// Remove desktop entry launcher. Does not uninstall the application.
    #[command(override_usage = "aurdesk desktop remove [options] <path>")]
    Remove(RemoveOptions),

    /// Show desktop entry launcher.
    #[command(override_usage = "aurdesk desktop show [options] <path>")]
    Show(ShowOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CreateOptions {
    /// Name of application.
    #[arg(short, long, value_name = "name")]
    pub name: String,

    /// Program to execute.
    #[arg(short, long, value_name = "exec")]
    pub exec: String,

    /// Kind of desktop entry.
    #[arg(short = 't', long = "type", value_name = "type", default_value = "Application")]
    pub entry_type: String,

    /// Version of the desktop entry specification followed.
    #[arg(long, value_name = "version")]
    pub entry_version: Option<String>,

    /// Tooltip of launcher.
    #[arg(long, value_name = "comment", default_value = "")]
    pub comment: String,

    /// Icon name or path to icon.
    #[arg(short, long, value_name = "icon", default_value = "")]
    pub icon: String,

    /// Run application in a terminal.
    #[arg(long)]
    pub terminal: bool,

    /// Semicolon separated menu categories.
    #[arg(long, value_name = "categories", default_value = "")]
    pub categories: String,

    /// Window manager class of application.
    #[arg(long, value_name = "class", default_value = "")]
    pub startup_wm_class: String,

    /// Also write a copy of the launcher into this directory.
    #[arg(long, value_name = "dir")]
    pub copy_to: Option<PathBuf>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct RemoveOptions {
    /// Paths of desktop entry files to remove.
    #[arg(required = true, value_name = "path")]
    pub paths: Vec<PathBuf>,

    /// Do not ask for confirmation.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ShowOptions {
    /// Path of desktop entry file to show.
    #[arg(required = true, value_name = "path")]
    pub path: PathBuf,
}

#[tokio::main]
async fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run().await {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

async fn run() -> Result<()> {
    Cli::parse().run().await
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(path) => path,
        None => default_config_file()?,
    };

    match read_to_string(&path) {
        Ok(data) => data
            .parse()
            .with_context(|| format!("failed to parse {:?}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(err) => Err(err).with_context(|| format!("failed to read {:?}", path.display())),
    }
}

async fn run_serve(config: Config) -> Result<()> {
    let aur = AurClient::new(&config.aur)?;
    let installer = Installer::new(
        SystemBuilder::default(),
        config.install.build_dir()?,
        config.aur.git_url.clone(),
    );

    serve(AppState::new(aur, installer), &config.server).await?;

    Ok(())
}

async fn run_search(config: Config, opts: SearchOptions) -> Result<()> {
    let aur = AurClient::new(&config.aur)?;
    let response = aur.search(&opts.term, &opts.page).await?;
    if !response.error.is_empty() {
        bail!("AUR error: {}", response.error);
    }

    if response.results.is_empty() {
        info!("no results found for {:?}", opts.term);
        return Ok(());
    }

    for package in response.results {
        println!(
            "{} {} ({:.2}) [{}]",
            package.name,
            package.version,
            package.popularity,
            package.maintainer.as_deref().unwrap_or("orphan"),
        );
        if let Some(description) = package.description {
            println!("    {description}");
        }
    }

    Ok(())
}

async fn run_install(config: Config, opts: InstallOptions) -> Result<()> {
    let bar = ProgressBar::new_spinner();
    bar.enable_steady_tick(Duration::from_millis(100));
    let installer = Installer::new(
        SystemBuilder::new(bar.clone()),
        config.install.build_dir()?,
        config.aur.git_url.clone(),
    );

    let package = opts.package;
    let result = tokio::task::spawn_blocking(move || installer.install(&package)).await?;
    bar.finish_and_clear();
    let installed = result?;
    info!("package page: {}", installed.page_url());

    Ok(())
}

fn run_desktop(config: Config, command: DesktopCommand) -> Result<()> {
    let store = DesktopStore::from_settings(&config.desktop)?;
    match command {
        DesktopCommand::Create(opts) => {
            let entry = DesktopEntry {
                entry_type: opts.entry_type,
                version: opts.entry_version,
                name: opts.name,
                comment: opts.comment,
                exec: opts.exec,
                icon: opts.icon,
                terminal: opts.terminal,
                categories: opts.categories,
                startup_wm_class: opts.startup_wm_class,
            };
            store.create(&entry, opts.copy_to.as_deref())?;
        }
        DesktopCommand::List => {
            for launcher in store.list() {
                let icon = match launcher.icon_path {
                    Some(path) => path.display().to_string(),
                    None => launcher.icon,
                };
                println!("{}\t{icon}", launcher.path.display());
            }
        }
        DesktopCommand::Remove(opts) => {
            for path in opts.paths {
                let confirmed = opts.yes
                    || Confirm::new(&format!(
                        "Remove {:?}? (This WON'T actually uninstall the App)",
                        path.display()
                    ))
                    .with_default(false)
                    .prompt()?;

                if confirmed {
                    store.remove(&path)?;
                } else {
                    info!("kept {:?}", path.display());
                }
            }
        }
        DesktopCommand::Show(opts) => {
            print!("{}", store.show(&opts.path)?);
        }
    }

    Ok(())
}
