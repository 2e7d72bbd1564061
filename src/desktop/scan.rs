// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Desktop entry discovery.
//!
//! Walk launcher directories for `.desktop` files, and figure out which icon
//! each of them wants to be shown with. Nothing in here is fatal. Unreadable
//! directories are logged and skipped, and an icon that cannot be found is
//! just `None`.

use ignore::WalkBuilder;
use std::{
    cell::OnceCell,
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Collect every desktop entry file under target directories.
///
/// Walks each directory recursively in the order given. Entries of one
/// directory are visited sorted by file name. Symbolic links are followed,
/// since distributions like to link launchers in from elsewhere.
#[instrument(skip(dirs), level = "debug")]
pub fn collect_desktop_files(dirs: impl IntoIterator<Item = impl AsRef<Path>>) -> Vec<PathBuf> {
    let mut desktops = Vec::new();

    for dir in dirs {
        let walker = WalkBuilder::new(dir.as_ref())
            .standard_filters(false)
            .follow_links(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("error accessing {:?}: {err}", dir.as_ref().display());
                    continue;
                }
            };

            let is_file = entry.file_type().is_some_and(|kind| kind.is_file());
            if is_file && is_desktop_file(entry.path()) {
                debug!("found {:?}", entry.path().display());
                desktops.push(entry.into_path());
            }
        }
    }

    desktops
}

/// Check if path names a desktop entry file by its extension.
pub fn is_desktop_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .is_some_and(|ext| ext == "desktop")
}

/// Read icon key of desktop entry file.
///
/// Scans line by line for the first line starting with "Icon=". Returns an
/// empty string if the file cannot be opened, or has no icon key.
pub fn icon_key(path: impl AsRef<Path>) -> String {
    let file = match File::open(path.as_ref()) {
        Ok(file) => file,
        Err(err) => {
            warn!("error opening {:?}: {err}", path.as_ref().display());
            return String::new();
        }
    };

    BufReader::new(file)
        .lines()
        .map_while(Result::ok)
        .find_map(|line| line.strip_prefix("Icon=").map(str::to_owned))
        .unwrap_or_default()
}

/// Resolve icon key of desktop entry to an existing file.
///
/// Builds a throwaway [`IconIndex`]. Use [`IconIndex::resolve`] directly when
/// resolving icons of many desktop entries against the same directories.
pub fn resolve_icon(
    desktop_path: impl AsRef<Path>,
    icon: impl AsRef<str>,
    icon_dirs: &[PathBuf],
) -> Option<PathBuf> {
    IconIndex::new(icon_dirs).resolve(desktop_path, icon)
}

/// Icon lookup over a fixed set of icon directories.
///
/// Icon themes like hicolor nest one directory per size, so the recursive
/// lookup walks each icon directory at most once, on first need, and keeps
/// every icon file it found keyed by name.
#[derive(Debug, Default, Clone)]
pub struct IconIndex {
    dirs: Vec<PathBuf>,
    nested: OnceCell<HashMap<String, PathBuf>>,
}

impl IconIndex {
    /// Construct new icon index over icon directories, searched in order.
    pub fn new(icon_dirs: &[PathBuf]) -> Self {
        Self {
            dirs: icon_dirs.to_vec(),
            nested: OnceCell::new(),
        }
    }

    /// Resolve icon key of desktop entry to an existing file.
    ///
    /// Tries, in order:
    ///
    /// 1. The icon key itself if it is an absolute path.
    /// 2. The icon key relative to the directory of the desktop entry.
    /// 3. `<icon_dir>/<icon>.png` for each icon directory.
    /// 4. `<icon_dir>/**/<icon>.png` then `<icon_dir>/**/<icon>.svg` for each
    ///    icon directory, which covers icon themes like hicolor.
    pub fn resolve(&self, desktop_path: impl AsRef<Path>, icon: impl AsRef<str>) -> Option<PathBuf> {
        let icon = icon.as_ref();
        if icon.is_empty() {
            return None;
        }

        let icon_path = Path::new(icon);
        if icon_path.is_absolute() {
            return icon_path.is_file().then(|| icon_path.to_path_buf());
        }

        if let Some(parent) = desktop_path.as_ref().parent() {
            let sibling = parent.join(icon);
            if sibling.is_file() {
                return Some(sibling);
            }
        }

        let direct = self
            .dirs
            .iter()
            .map(|dir| dir.join(format!("{icon}.png")))
            .find(|path| path.is_file());
        if direct.is_some() {
            return direct;
        }

        self.nested().get(icon).cloned()
    }

    fn nested(&self) -> &HashMap<String, PathBuf> {
        self.nested.get_or_init(|| {
            let mut icons = HashMap::new();
            for ext in ["png", "svg"] {
                for dir in &self.dirs {
                    let pattern = format!(
                        "{}/**/*.{ext}",
                        glob::Pattern::escape(dir.to_string_lossy().as_ref())
                    );
                    let Ok(paths) = glob::glob(&pattern) else {
                        continue;
                    };

                    for path in paths.filter_map(Result::ok).filter(|path| path.is_file()) {
                        let Some(name) = path
                            .file_stem()
                            .map(|stem| stem.to_string_lossy().into_owned())
                        else {
                            continue;
                        };
                        icons.entry(name).or_insert(path);
                    }
                }
            }
            debug!("indexed {} icons", icons.len());
            icons
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs::{create_dir_all, write};

    #[test]
    fn collect_walks_dirs_in_order() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let user = tmp.path().join("user");
        let system = tmp.path().join("system");
        create_dir_all(user.join("wine"))?;
        create_dir_all(&system)?;
        write(user.join("zed.desktop"), "[Desktop Entry]\n")?;
        write(user.join("wine").join("notepad.desktop"), "[Desktop Entry]\n")?;
        write(user.join("notes.txt"), "not a launcher")?;
        write(system.join("firefox.desktop"), "[Desktop Entry]\n")?;

        let result = collect_desktop_files([&user, &tmp.path().join("missing"), &system]);
        let expect = vec![
            user.join("wine").join("notepad.desktop"),
            user.join("zed.desktop"),
            system.join("firefox.desktop"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn icon_key_takes_first_icon_line() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("foo.desktop");
        write(&path, "[Desktop Entry]\nName=Foo\nIcon=foo-icon\nIcon=other\n")?;
        assert_eq!(icon_key(&path), "foo-icon");

        let path = tmp.path().join("bar.desktop");
        write(&path, "[Desktop Entry]\nName=Bar\n")?;
        assert_eq!(icon_key(&path), "");

        assert_eq!(icon_key(tmp.path().join("missing.desktop")), "");

        Ok(())
    }

    #[test]
    fn resolve_icon_search_order() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let apps = tmp.path().join("apps");
        let pixmaps = tmp.path().join("pixmaps");
        let theme = tmp.path().join("hicolor");
        create_dir_all(&apps)?;
        create_dir_all(&pixmaps)?;
        create_dir_all(theme.join("48x48").join("apps"))?;
        create_dir_all(theme.join("scalable").join("apps"))?;

        let desktop = apps.join("foo.desktop");
        write(apps.join("local.png"), "")?;
        write(pixmaps.join("foo.png"), "")?;
        write(theme.join("48x48").join("apps").join("bar.png"), "")?;
        write(theme.join("scalable").join("apps").join("baz.svg"), "")?;
        let icon_dirs = vec![pixmaps.clone(), theme.clone()];

        let absolute = pixmaps.join("foo.png");
        assert_eq!(
            resolve_icon(&desktop, absolute.to_string_lossy(), &icon_dirs),
            Some(absolute)
        );
        assert_eq!(
            resolve_icon(&desktop, "local.png", &icon_dirs),
            Some(apps.join("local.png"))
        );
        assert_eq!(
            resolve_icon(&desktop, "foo", &icon_dirs),
            Some(pixmaps.join("foo.png"))
        );
        assert_eq!(
            resolve_icon(&desktop, "bar", &icon_dirs),
            Some(theme.join("48x48").join("apps").join("bar.png"))
        );
        assert_eq!(
            resolve_icon(&desktop, "baz", &icon_dirs),
            Some(theme.join("scalable").join("apps").join("baz.svg"))
        );
        assert_eq!(resolve_icon(&desktop, "nope", &icon_dirs), None);
        assert_eq!(resolve_icon(&desktop, "", &icon_dirs), None);

        Ok(())
    }

    #[test]
    fn icon_index_walks_theme_once() -> anyhow::Result<()> {
        let tmp = tempfile::tempdir()?;
        let pixmaps = tmp.path().join("pixmaps");
        let theme = tmp.path().join("hicolor");
        create_dir_all(&pixmaps)?;
        create_dir_all(theme.join("32x32").join("apps"))?;
        create_dir_all(theme.join("64x64").join("apps"))?;
        write(theme.join("32x32").join("apps").join("foo.png"), "")?;
        write(theme.join("64x64").join("apps").join("foo.png"), "")?;
        write(theme.join("64x64").join("apps").join("foo.svg"), "")?;

        let desktop = tmp.path().join("foo.desktop");
        let index = IconIndex::new(&[pixmaps.clone(), theme.clone()]);
        assert_eq!(
            index.resolve(&desktop, "foo"),
            Some(theme.join("32x32").join("apps").join("foo.png"))
        );

        // INVARIANT: Nested icons are indexed once, direct ones are always checked.
        write(theme.join("64x64").join("apps").join("late.png"), "")?;
        write(pixmaps.join("direct.png"), "")?;
        assert_eq!(index.resolve(&desktop, "late"), None);
        assert_eq!(index.resolve(&desktop, "direct"), Some(pixmaps.join("direct.png")));

        Ok(())
    }
}
