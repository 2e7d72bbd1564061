// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the configuration file that aurdesk uses to simplify
//! the process of serialization and deserialization. File I/O is left to the
//! caller to figure out.
//!
//! # General Layout
//!
//! The configuration file is split into four tables: `[server]` for the HTTP
//! backend, `[aur]` for the endpoints of the Arch User Repository, `[install]`
//! for the install pipeline, and `[desktop]` for desktop entry management.
//! Every field is optional. Path fields that are left out are resolved to
//! XDG defaults through [`crate::path`] when asked for.

use crate::path::{
    default_applications_dir, default_build_dir, default_icon_dirs, default_scan_dirs, NoWayHome,
};

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Default address the HTTP backend listens on.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";

/// Default origin of the front-end allowed through CORS.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5174";

/// Default AUR RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://aur.archlinux.org/rpc/";

/// Default base URL that AUR package Git repositories live under.
pub const DEFAULT_GIT_URL: &str = "https://aur.archlinux.org/";

/// Full configuration layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// HTTP backend settings.
    pub server: ServerSettings,

    /// AUR endpoint settings.
    pub aur: AurSettings,

    /// Install pipeline settings.
    pub install: InstallSettings,

    /// Desktop entry settings.
    pub desktop: DesktopSettings,
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: Config = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every path field.
        if let Some(path) = config.install.build_dir.take() {
            config.install.build_dir = Some(expand(path)?);
        }
        if let Some(path) = config.desktop.applications_dir.take() {
            config.desktop.applications_dir = Some(expand(path)?);
        }
        if let Some(paths) = config.desktop.scan_dirs.take() {
            config.desktop.scan_dirs = Some(paths.into_iter().map(expand).collect::<Result<_>>()?);
        }
        if let Some(paths) = config.desktop.icon_dirs.take() {
            config.desktop.icon_dirs = Some(paths.into_iter().map(expand).collect::<Result<_>>()?);
        }

        Ok(config)
    }
}

impl Display for Config {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// HTTP backend settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Socket address to bind to.
    pub listen: String,

    /// Front-end origin allowed to issue cross-origin requests.
    pub allowed_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: DEFAULT_LISTEN.into(),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.into(),
        }
    }
}

/// AUR endpoint settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AurSettings {
    /// RPC endpoint used for package search.
    pub rpc_url: String,

    /// Base URL of package Git repositories, `<git_url><name>.git`.
    pub git_url: String,
}

impl Default for AurSettings {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.into(),
            git_url: DEFAULT_GIT_URL.into(),
        }
    }
}

/// Install pipeline settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstallSettings {
    /// Directory that packages are cloned and built in.
    pub build_dir: Option<PathBuf>,
}

impl InstallSettings {
    /// Resolve build directory, falling back to XDG cache default.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default cannot be determined.
    pub fn build_dir(&self) -> Result<PathBuf> {
        match &self.build_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(default_build_dir()?),
        }
    }
}

/// Desktop entry settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DesktopSettings {
    /// Directory new desktop entries are written to.
    pub applications_dir: Option<PathBuf>,

    /// Directories scanned for existing desktop entries.
    pub scan_dirs: Option<Vec<PathBuf>>,

    /// Directories searched when resolving icons by name.
    pub icon_dirs: Option<Vec<PathBuf>>,
}

impl DesktopSettings {
    /// Resolve launcher directory, falling back to XDG data default.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default cannot be determined.
    pub fn applications_dir(&self) -> Result<PathBuf> {
        match &self.applications_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(default_applications_dir()?),
        }
    }

    /// Resolve scan directories, falling back to defaults.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default cannot be determined.
    pub fn scan_dirs(&self) -> Result<Vec<PathBuf>> {
        match &self.scan_dirs {
            Some(paths) => Ok(paths.clone()),
            None => Ok(default_scan_dirs()?),
        }
    }

    /// Resolve icon directories, falling back to defaults.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::NoWayHome`] if default cannot be determined.
    pub fn icon_dirs(&self) -> Result<Vec<PathBuf>> {
        match &self.icon_dirs {
            Some(paths) => Ok(paths.clone()),
            None => Ok(default_icon_dirs()?),
        }
    }
}

fn expand(path: impl AsRef<Path>) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.as_ref().to_string_lossy().as_ref())?.into_owned(),
    ))
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Failed to resolve a default path.
    #[error(transparent)]
    NoWayHome(#[from] NoWayHome),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
