// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::PathBuf;

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to configuration file.
///
/// Uses XDG Base Directory path `$XDG_CONFIG_HOME/aurdesk/config.toml`. Does
/// not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("aurdesk").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to package build directory.
///
/// Uses `$XDG_CACHE_HOME/aurdesk/build`. Every AUR package gets cloned into
/// its own sub-directory here before makepkg runs.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_build_dir() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|path| path.join("aurdesk").join("build"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to user's application launcher directory.
///
/// New desktop entries are written here, i.e., `$XDG_DATA_HOME/applications`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_applications_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("applications"))
        .ok_or(NoWayHome)
}

/// Determine default set of directories to scan for desktop entries.
///
/// User launchers first, then system launchers, then Flatpak exports.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_scan_dirs() -> Result<Vec<PathBuf>> {
    let home = home_dir()?;
    Ok(vec![
        home.join(".local/share/applications"),
        PathBuf::from("/usr/share/applications"),
        home.join(".local/share/flatpak/exports/share/applications"),
    ])
}

/// Determine default set of directories to look up icons by name.
///
/// The hicolor theme root comes last, it is searched recursively for any
/// icon size when nothing else matched.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_icon_dirs() -> Result<Vec<PathBuf>> {
    Ok(vec![
        PathBuf::from("/usr/share/icons/hicolor/256x256/apps"),
        PathBuf::from("/usr/share/pixmaps"),
        home_dir()?.join(".local/share/icons"),
        PathBuf::from("/usr/share/icons/hicolor"),
    ])
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("HOME", "/home/blah")])]
    fn scan_dirs_follow_home() -> anyhow::Result<()> {
        let result = default_scan_dirs()?;
        let expect = vec![
            PathBuf::from("/home/blah/.local/share/applications"),
            PathBuf::from("/usr/share/applications"),
            PathBuf::from("/home/blah/.local/share/flatpak/exports/share/applications"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[sealed_test(env = [("HOME", "/home/blah"), ("XDG_CACHE_HOME", "/tmp/cache")])]
    fn build_dir_follows_xdg_cache_home() -> anyhow::Result<()> {
        assert_eq!(default_build_dir()?, PathBuf::from("/tmp/cache/aurdesk/build"));
        Ok(())
    }
}
