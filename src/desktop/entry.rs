// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desktop entry layout.
//!
//! A desktop entry is an INI-like text file. Aurdesk only ever cares about
//! the `[Desktop Entry]` group, and only about the keys a launcher needs to
//! present and invoke an application. Localized keys such as `Name[de]`, and
//! any other group such as `[Desktop Action new-window]`, are skipped.
//!
//! # See Also
//!
//! - [Desktop Entry Specification](https://specifications.freedesktop.org/desktop-entry-spec/latest/)

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Header of the only group that gets read or written.
pub const DESKTOP_ENTRY_GROUP: &str = "[Desktop Entry]";

/// Launcher description for a single application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntry {
    /// Kind of entry, almost always "Application".
    pub entry_type: String,

    /// Version of the desktop entry specification the file follows.
    pub version: Option<String>,

    /// Name of the application.
    pub name: String,

    /// Tooltip for the entry.
    pub comment: String,

    /// Program to execute, possibly with arguments.
    pub exec: String,

    /// Icon name, or absolute path to icon.
    pub icon: String,

    /// Whether the program runs in a terminal window.
    pub terminal: bool,

    /// Semicolon separated menu categories.
    pub categories: String,

    /// Window manager class the application is known by.
    pub startup_wm_class: String,
}

impl Default for DesktopEntry {
    fn default() -> Self {
        Self {
            entry_type: "Application".into(),
            version: None,
            name: String::new(),
            comment: String::new(),
            exec: String::new(),
            icon: String::new(),
            terminal: false,
            categories: String::new(),
            startup_wm_class: String::new(),
        }
    }
}

impl DesktopEntry {
    /// Check that entry can be written as a launcher.
    ///
    /// # Errors
    ///
    /// - Return [`EntryError::MissingKey`] if "Name" or "Exec" is empty.
    /// - Return [`EntryError::InvalidName`] if name cannot be a file name.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(EntryError::MissingKey("Name"));
        }

        if self.exec.trim().is_empty() {
            return Err(EntryError::MissingKey("Exec"));
        }

        if self.name.contains('/') || self.name == "." || self.name == ".." {
            return Err(EntryError::InvalidName(self.name.clone()));
        }

        Ok(())
    }

    /// File name the entry is stored under.
    pub fn file_name(&self) -> String {
        format!("{}.desktop", self.name)
    }
}

impl Display for DesktopEntry {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        writeln!(fmt, "{DESKTOP_ENTRY_GROUP}")?;
        writeln!(fmt, "Name={}", self.name)?;
        writeln!(fmt, "Exec={}", self.exec)?;
        writeln!(fmt, "Icon={}", self.icon)?;
        writeln!(fmt, "Type={}", self.entry_type)?;
        if let Some(version) = &self.version {
            writeln!(fmt, "Version={version}")?;
        }
        writeln!(fmt, "Categories={}", self.categories)?;
        writeln!(fmt, "Terminal={}", self.terminal)?;
        writeln!(fmt, "Comment={}", self.comment)?;
        writeln!(fmt, "StartupWMClass={}", self.startup_wm_class)
    }
}

impl FromStr for DesktopEntry {
    type Err = EntryError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut entry = DesktopEntry::default();
        let mut found_group = false;
        let mut in_group = false;

        for line in data.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                in_group = line == DESKTOP_ENTRY_GROUP;
                found_group |= in_group;
                continue;
            }

            if !in_group {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            match key {
                "Type" => entry.entry_type = value.into(),
                "Version" => entry.version = Some(value.into()),
                "Name" => entry.name = value.into(),
                "Comment" => entry.comment = value.into(),
                "Exec" => entry.exec = value.into(),
                "Icon" => entry.icon = value.into(),
                "Terminal" => {
                    entry.terminal = value.parse().map_err(|_| EntryError::InvalidBool {
                        key: key.into(),
                        value: value.into(),
                    })?
                }
                "Categories" => entry.categories = value.into(),
                "StartupWMClass" => entry.startup_wm_class = value.into(),
                _ => continue,
            }
        }

        if !found_group {
            return Err(EntryError::MissingGroup);
        }

        Ok(entry)
    }
}

/// Desktop entry error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EntryError {
    /// No `[Desktop Entry]` group in file.
    #[error("missing [Desktop Entry] group")]
    MissingGroup,

    /// Required key is missing or empty.
    #[error("missing required key {0:?}")]
    MissingKey(&'static str),

    /// Name cannot be used as a file name.
    #[error("name {0:?} cannot be used as a file name")]
    InvalidName(String),

    /// Boolean key holds something other than "true" or "false".
    #[error("key {key:?} expects true or false, got {value:?}")]
    InvalidBool { key: String, value: String },
}

/// Friendly result alias :3
pub type Result<T, E = EntryError> = std::result::Result<T, E>;
