// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desktop entry management.
//!
//! Aurdesk can write new launchers for programs that do not ship one, which
//! is common for AUR packages that just drop a binary into `/usr/bin` or
//! `/opt`. It can also list every launcher the desktop knows about, and remove
//! the ones the user no longer wants. Removing a launcher does __not__
//! uninstall the application behind it.
//!
//! # Launcher Layout
//!
//! New launchers always go into the user's applications directory, normally
//! `$XDG_DATA_HOME/applications`, named `<Name>.desktop`. They are marked
//! executable, since some desktops refuse to launch untrusted entries
//! otherwise. The desktop database is refreshed afterwards so menus pick the
//! new launcher up without a relog.
//!
//! # See Also
//!
//! 1. [`DesktopEntry`]
//! 2. [`scan`]

pub mod entry;
pub mod scan;

pub use entry::DesktopEntry;

use crate::{
    config::{ConfigError, DesktopSettings},
    desktop::scan::{collect_desktop_files, icon_key, is_desktop_file, IconIndex},
};

use std::{
    fs::{read_to_string, remove_file, write},
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, instrument, warn};

/// Existing launcher found on the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launcher {
    /// Path to desktop entry file.
    pub path: PathBuf,

    /// Raw icon key of desktop entry.
    pub icon: String,

    /// Icon key resolved to an existing file, if possible.
    pub icon_path: Option<PathBuf>,
}

/// Set of launcher directories that desktop entries are managed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopStore {
    applications_dir: PathBuf,
    scan_dirs: Vec<PathBuf>,
    icon_dirs: Vec<PathBuf>,
}

impl DesktopStore {
    /// Construct new desktop store.
    pub fn new(
        applications_dir: impl Into<PathBuf>,
        scan_dirs: impl IntoIterator<Item = impl Into<PathBuf>>,
        icon_dirs: impl IntoIterator<Item = impl Into<PathBuf>>,
    ) -> Self {
        Self {
            applications_dir: applications_dir.into(),
            scan_dirs: scan_dirs.into_iter().map(Into::into).collect(),
            icon_dirs: icon_dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Construct desktop store from configuration settings.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::Config`] if default paths cannot be resolved.
    pub fn from_settings(settings: &DesktopSettings) -> Result<Self> {
        Ok(Self::new(
            settings.applications_dir()?,
            settings.scan_dirs()?,
            settings.icon_dirs()?,
        ))
    }

    /// Directory new launchers are written to.
    pub fn applications_dir(&self) -> &Path {
        self.applications_dir.as_path()
    }

    /// Write new launcher into applications directory.
    ///
    /// If `copy_to` is given, an identical copy of the launcher is written
    /// there as well. Refreshes the desktop database once written. A failed
    /// refresh is only warned about, because the launcher is already in
    /// place at that point.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::Entry`] if entry is missing required keys.
    /// - Return [`DesktopError::CreateDir`] if applications directory cannot
    ///   be created.
    /// - Return [`DesktopError::Write`] if launcher cannot be written.
    #[instrument(skip(self, entry), level = "debug")]
    pub fn create(&self, entry: &DesktopEntry, copy_to: Option<&Path>) -> Result<PathBuf> {
        entry.validate()?;
        let contents = entry.to_string();

        if let Some(dir) = copy_to {
            let copy = write_launcher(dir, &entry.file_name(), &contents)?;
            info!("desktop file created: {:?}", copy.display());
        }

        let path = write_launcher(&self.applications_dir, &entry.file_name(), &contents)?;
        info!("desktop file added to {:?}", self.applications_dir.display());

        match Command::new("update-desktop-database")
            .arg(&self.applications_dir)
            .output()
        {
            Ok(output) if output.status.success() => debug!("desktop database updated"),
            Ok(output) => warn!(
                "failed to update desktop database: {}",
                String::from_utf8_lossy(&output.stderr).trim_end()
            ),
            Err(err) => warn!("failed to update desktop database: {err}"),
        }

        Ok(path)
    }

    /// List every launcher under the scan directories.
    #[instrument(skip(self), level = "debug")]
    pub fn list(&self) -> Vec<Launcher> {
        let icons = IconIndex::new(&self.icon_dirs);
        collect_desktop_files(&self.scan_dirs)
            .into_iter()
            .map(|path| {
                let icon = icon_key(&path);
                let icon_path = icons.resolve(&path, &icon);
                if icon_path.is_none() && !icon.is_empty() {
                    debug!("cannot resolve icon {icon:?} of {:?}", path.display());
                }

                Launcher {
                    path,
                    icon,
                    icon_path,
                }
            })
            .collect()
    }

    /// Remove launcher file.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::NotDesktopFile`] if path lacks the ".desktop"
    ///   extension.
    /// - Return [`DesktopError::Remove`] if file cannot be removed.
    #[instrument(skip(self, path), level = "debug")]
    pub fn remove(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if !is_desktop_file(path) {
            return Err(DesktopError::NotDesktopFile(path.to_path_buf()));
        }

        remove_file(path).map_err(|err| DesktopError::Remove {
            source: err,
            path: path.to_path_buf(),
        })?;
        info!("removed {:?}", path.display());

        Ok(())
    }

    /// Read launcher file into a desktop entry.
    ///
    /// # Errors
    ///
    /// - Return [`DesktopError::Read`] if file cannot be read.
    /// - Return [`DesktopError::Entry`] if file is not a desktop entry.
    pub fn show(&self, path: impl AsRef<Path>) -> Result<DesktopEntry> {
        let path = path.as_ref();
        let contents = read_to_string(path).map_err(|err| DesktopError::Read {
            source: err,
            path: path.to_path_buf(),
        })?;

        Ok(contents.parse()?)
    }
}

fn write_launcher(dir: &Path, file_name: &str, contents: &str) -> Result<PathBuf> {
    mkdirp::mkdirp(dir).map_err(|err| DesktopError::CreateDir {
        source: err,
        path: dir.to_path_buf(),
    })?;

    let path = dir.join(file_name);
    write(&path, contents).map_err(|err| DesktopError::Write {
        source: err,
        path: path.clone(),
    })?;
    mark_executable(&path)?;

    Ok(path)
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::{
        fs::{set_permissions, Permissions},
        os::unix::fs::PermissionsExt,
    };

    set_permissions(path, Permissions::from_mode(0o755)).map_err(|err| DesktopError::Write {
        source: err,
        path: path.to_path_buf(),
    })
}

#[cfg(not(unix))]
fn mark_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Desktop entry management error types.
#[derive(Debug, thiserror::Error)]
pub enum DesktopError {
    /// Desktop entry is invalid.
    #[error(transparent)]
    Entry(#[from] crate::desktop::entry::EntryError),

    /// Launcher paths cannot be resolved.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Path is not a desktop entry file.
    #[error("{:?} is not a desktop entry file", .0.display())]
    NotDesktopFile(PathBuf),

    /// Launcher directory cannot be created.
    #[error("failed to create directory at {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Launcher cannot be written.
    #[error("failed to write desktop file at {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Launcher cannot be read.
    #[error("failed to read desktop file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Launcher cannot be removed.
    #[error("failed to remove desktop file at {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = DesktopError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desktop::entry::EntryError;
    use pretty_assertions::assert_eq;
    use std::fs::create_dir_all;

    fn store(root: &Path) -> DesktopStore {
        DesktopStore::new(
            root.join("applications"),
            [root.join("applications"), root.join("system")],
            [root.join("icons")],
        )
    }

    fn entry() -> DesktopEntry {
        DesktopEntry {
            name: "Foo".into(),
            exec: "/opt/foo/foo".into(),
            icon: "foo".into(),
            categories: "Utility;".into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_writes_executable_launcher() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());

        let path = store.create(&entry(), None)?;
        assert_eq!(path, tmp.path().join("applications").join("Foo.desktop"));
        assert_eq!(read_to_string(&path)?, entry().to_string());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path)?.permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        Ok(())
    }

    #[test]
    fn create_writes_copy() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let out = tmp.path().join("out");

        store.create(&entry(), Some(&out))?;
        assert!(out.join("Foo.desktop").is_file());
        assert!(tmp.path().join("applications").join("Foo.desktop").is_file());

        Ok(())
    }

    #[test]
    fn create_rejects_invalid_entry() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let bad = DesktopEntry {
            exec: String::new(),
            ..entry()
        };

        let result = store.create(&bad, None);
        assert!(matches!(
            result,
            Err(DesktopError::Entry(EntryError::MissingKey("Exec")))
        ));
        assert!(!tmp.path().join("applications").exists());

        Ok(())
    }

    #[test]
    fn list_pairs_launchers_with_icons() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        create_dir_all(tmp.path().join("system"))?;
        create_dir_all(tmp.path().join("icons"))?;
        write(tmp.path().join("icons").join("foo.png"), "")?;
        write(
            tmp.path().join("system").join("bar.desktop"),
            "[Desktop Entry]\nName=Bar\nIcon=bar\n",
        )?;
        store.create(&entry(), None)?;

        let result = store.list();
        let expect = vec![
            Launcher {
                path: tmp.path().join("applications").join("Foo.desktop"),
                icon: "foo".into(),
                icon_path: Some(tmp.path().join("icons").join("foo.png")),
            },
            Launcher {
                path: tmp.path().join("system").join("bar.desktop"),
                icon: "bar".into(),
                icon_path: None,
            },
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn remove_only_deletes_desktop_files() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let path = store.create(&entry(), None)?;
        let other = tmp.path().join("notes.txt");
        write(&other, "keep me")?;

        assert!(matches!(
            store.remove(&other),
            Err(DesktopError::NotDesktopFile(_))
        ));
        assert!(other.exists());

        store.remove(&path)?;
        assert!(!path.exists());
        assert!(matches!(
            store.remove(&path),
            Err(DesktopError::Remove { .. })
        ));

        Ok(())
    }

    #[test]
    fn show_parses_launcher() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let store = store(tmp.path());
        let path = store.create(&entry(), None)?;

        assert_eq!(store.show(&path)?, entry());

        Ok(())
    }
}
