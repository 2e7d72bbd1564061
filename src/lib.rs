// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Headless AUR front-end.
//!
//! Aurdesk does the work behind a graphical AUR front-end: it searches the
//! Arch User Repository, installs packages from it through Git and makepkg,
//! and manages desktop entry launchers for whatever got installed. All of it
//! is reachable from the command line, and the search and install parts are
//! also served over HTTP for front-ends to call into.

pub mod aur;
pub mod config;
pub mod desktop;
pub mod install;
pub mod path;
pub mod server;
