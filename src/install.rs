// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! AUR package install pipeline.
//!
//! Installing an AUR package is done the same way a user would do it by hand:
//! clone the package's Git repository, enter it, and let makepkg build and
//! install whatever the PKGBUILD describes. Each package gets its own
//! directory inside of the __build directory__.
//!
//! # Pipeline
//!
//! 1. Validate package name. It ends up as both a path component and a URL
//!    component, so anything outside of the AUR package name charset is
//!    rejected before the file system is touched.
//! 2. Remove the package directory left behind by any previous install.
//! 3. Clone `<git_url><name>.git` into the package directory.
//! 4. Run `makepkg -si --noconfirm` inside of the package directory with
//!    `PACMAN_AUTH=pkexec` so pacman can elevate through polkit.
//!
//! The pipeline stops at the first failing step. Nothing is rolled back, so a
//! failed build leaves its clone around for inspection. The next install of
//! the same package wipes it in step 2 anyway.

use crate::aur::{git_clone_url, package_page_url};

use git2::{build::RepoBuilder, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    ffi::OsStr,
    fs::remove_dir_all,
    io::{pipe, ErrorKind, Read},
    path::{Path, PathBuf},
    process::{Command, Stdio},
    time,
};
use tracing::{debug, info, instrument};

/// Build and install steps of the pipeline.
///
/// Layer of indirection over external tools, i.e., Git and makepkg.
pub trait Builder: Send + Sync + 'static {
    /// Clone package repository at URL into target directory.
    fn clone_repo(&self, url: &str, path: &Path) -> Result<()>;

    /// Build and install package inside of its cloned repository.
    ///
    /// Returns combined stdout and stderr of the build.
    fn build(&self, path: &Path) -> Result<String>;
}

/// Builder that talks to libgit2 and the system's makepkg.
#[derive(Debug, Clone)]
pub struct SystemBuilder {
    bar: ProgressBar,
}

impl SystemBuilder {
    /// Construct new system builder reporting clone progress to a bar.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }

    /// Turn progress bar into a spinner ticking on its own.
    ///
    /// Makepkg gives no progress to report, so the spinner just shows that
    /// the build is still alive.
    fn spin(&self, message: String) -> Result<()> {
        let style =
            ProgressStyle::with_template("{elapsed_precise:.green}  {spinner:.yellow} {msg}")?;
        self.bar.set_style(style);
        self.bar.set_message(message);
        if !self.bar.is_hidden() {
            self.bar.enable_steady_tick(time::Duration::from_millis(100));
        }

        Ok(())
    }
}

impl Default for SystemBuilder {
    fn default() -> Self {
        Self::new(ProgressBar::hidden())
    }
}

impl Builder for SystemBuilder {
    /// Clone package repository through libgit2.
    ///
    /// AUR repositories are public, so no credentials are ever asked for.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError::Clone`] if libgit2 operations fail.
    /// - Return [`InstallError::ProgressStyle`] if progress bar cannot be styled.
    #[instrument(skip(self, path), level = "debug")]
    fn clone_repo(&self, url: &str, path: &Path) -> Result<()> {
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        self.bar.set_style(style);
        self.bar.set_message(url.to_string());

        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.transfer_progress(|progress| {
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                self.bar.set_length(progress.total_objects() as u64);
                self.bar.set_position(progress.received_objects() as u64);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        RepoBuilder::new().fetch_options(fo).clone(url, path)?;

        Ok(())
    }

    /// Run makepkg inside of cloned package repository.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError::Spawn`] if makepkg cannot be executed.
    /// - Return [`InstallError::Build`] if makepkg exits unsuccessfully.
    #[instrument(skip(self, path), level = "debug")]
    fn build(&self, path: &Path) -> Result<String> {
        self.spin(format!("makepkg {}", path.display()))?;
        let result = syscall_non_interactive(
            "makepkg",
            ["-si", "--noconfirm"],
            path,
            [("PACMAN_AUTH", "pkexec")],
        );
        self.bar.disable_steady_tick();

        result
    }
}

/// Outcome of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installed {
    /// Name of installed package.
    pub name: String,

    /// Directory the package was built in.
    pub package_dir: PathBuf,

    /// Combined output of the build.
    pub output: String,
}

impl Installed {
    /// Package page on the AUR web front-end.
    pub fn page_url(&self) -> String {
        package_page_url(&self.name)
    }
}

/// Install AUR packages into the system.
#[derive(Debug, Clone)]
pub struct Installer<B = SystemBuilder>
where
    B: Builder,
{
    builder: B,
    build_dir: PathBuf,
    git_url: String,
}

impl<B> Installer<B>
where
    B: Builder,
{
    /// Construct new installer.
    pub fn new(builder: B, build_dir: impl Into<PathBuf>, git_url: impl Into<String>) -> Self {
        Self {
            builder,
            build_dir: build_dir.into(),
            git_url: git_url.into(),
        }
    }

    /// Directory a given package gets cloned and built in.
    pub fn package_dir(&self, name: impl AsRef<str>) -> PathBuf {
        self.build_dir.join(name.as_ref())
    }

    /// Run full install pipeline for target package.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError::InvalidName`] if package name is not valid.
    /// - Return [`InstallError::BuildDir`] if build directory cannot be made.
    /// - Return [`InstallError::RemovePrevious`] if previous package
    ///   directory cannot be removed.
    /// - Return [`InstallError::Clone`] if package repository cannot be cloned.
    /// - Return [`InstallError::Spawn`] or [`InstallError::Build`] if package
    ///   cannot be built.
    #[instrument(skip(self), level = "debug")]
    pub fn install(&self, name: impl AsRef<str> + std::fmt::Debug) -> Result<Installed> {
        let name = name.as_ref();
        validate_package_name(name)?;
        info!("install {name}");

        mkdirp::mkdirp(&self.build_dir).map_err(|err| InstallError::BuildDir {
            source: err,
            path: self.build_dir.clone(),
        })?;

        let package_dir = self.package_dir(name);
        match remove_dir_all(&package_dir) {
            Ok(()) => debug!("removed previous directory {:?}", package_dir.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(InstallError::RemovePrevious {
                    source: err,
                    path: package_dir,
                })
            }
        }

        let url = git_clone_url(&self.git_url, name);
        info!("clone from {url}");
        self.builder.clone_repo(&url, &package_dir)?;

        info!("build {name} in {:?}", package_dir.display());
        let output = self.builder.build(&package_dir)?;

        let installed = Installed {
            name: name.to_string(),
            package_dir,
            output,
        };
        info!("installed {name}, see {}", installed.page_url());

        Ok(installed)
    }
}

/// Check that package name only uses the AUR package name charset.
///
/// Names are lowercase alphanumerics plus `@`, `.`, `_`, `+`, and `-`, and
/// may not start with a hyphen or a dot.
///
/// # Errors
///
/// - Return [`InstallError::InvalidName`] if name is not valid.
pub fn validate_package_name(name: &str) -> Result<()> {
    let valid_char =
        |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || "@._+-".contains(c);

    if name.is_empty()
        || name.starts_with(['-', '.'])
        || !name.chars().all(valid_char)
    {
        return Err(InstallError::InvalidName(name.to_string()));
    }

    Ok(())
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    current_dir: &Path,
    envs: impl IntoIterator<Item = (impl AsRef<OsStr>, impl AsRef<OsStr>)>,
) -> Result<String> {
    let program = cmd.as_ref().to_string_lossy().into_owned();
    let spawn_error = |err: std::io::Error| InstallError::Spawn {
        source: err,
        program: program.clone(),
    };

    // INVARIANT: Stdout and stderr share one pipe, so output stays interleaved.
    let (mut reader, writer) = pipe().map_err(spawn_error)?;
    let mut child = Command::new(cmd.as_ref())
        .args(args)
        .current_dir(current_dir)
        .envs(envs)
        .stdin(Stdio::null())
        .stdout(writer.try_clone().map_err(spawn_error)?)
        .stderr(writer)
        .spawn()
        .map_err(spawn_error)?;

    // INVARIANT: Command is dropped by now, so the child holds the only writers.
    let mut output = Vec::new();
    reader.read_to_end(&mut output).map_err(spawn_error)?;
    let status = child.wait().map_err(spawn_error)?;

    let message = String::from_utf8_lossy(output.as_slice()).into_owned();

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !status.success() {
        return Err(InstallError::Build { output: message });
    }

    Ok(message)
}

/// Install pipeline error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Package name is outside of the AUR package name charset.
    #[error("invalid package name: {0}")]
    InvalidName(String),

    /// Build directory cannot be created.
    #[error("failed to create build directory at {:?}", path.display())]
    BuildDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Directory of a previous install cannot be removed.
    #[error("failed to remove previous directory at {:?}", path.display())]
    RemovePrevious {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Package repository cannot be cloned.
    #[error(transparent)]
    Clone(#[from] git2::Error),

    /// External program cannot be executed.
    #[error("failed to execute {program}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Package build exits unsuccessfully.
    #[error("failed to build package:\n{output}")]
    Build { output: String },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    ProgressStyle(#[from] indicatif::style::TemplateError),
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
