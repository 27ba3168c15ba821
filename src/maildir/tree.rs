//-
// Copyright (c) 2024, the Mailsift authors.
//
// This file is part of Mailsift.
//
// Mailsift is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Mailsift is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Mailsift. If not, see <http://www.gnu.org/licenses/>.

//! Discovery of the folder structure under a maildir root.
//!
//! A directory is a leaf maildir when it has the `cur/`, `new/`, `tmp/`
//! triad as direct children; any other subdirectory is a candidate
//! container of further maildirs. Skimming classifies the whole tree and
//! drops every branch with no messages anywhere below it, except the root,
//! which is always retained so a caller can tell an empty account apart
//! from a scan failure.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::support::error::Error;

/// A maildir, or a directory containing other maildirs.
#[derive(Clone, Debug)]
pub struct Maildir {
    /// This maildir's location in the filesystem.
    pub path: PathBuf,

    /// Whether this directory holds messages directly, i.e. has the
    /// mandatory `cur/`, `new/`, `tmp/` triad.
    pub has_messages: bool,

    /// The sub-maildirs nested directly inside this directory, in
    /// filesystem enumeration order.
    pub folders: Vec<Maildir>,
}

impl Maildir {
    /// Whether this maildir or any folder below it holds messages.
    pub fn has_any_messages(&self) -> bool {
        self.has_messages
            || self.folders.iter().any(Maildir::has_any_messages)
    }
}

/// Skim the directory structure under `root` to find folders and messages.
///
/// The returned tree contains only branches which lead to messages; the
/// root itself is returned even if nothing below it does. Failure to stat
/// or read the root is fatal; a directory which disappears mid-scan is
/// treated as if it had never been there.
pub fn skim(root: &Path) -> Result<Maildir, Error> {
    let metadata =
        fs::metadata(root).map_err(|e| Error::io("stat", root, e))?;
    if !metadata.is_dir() {
        return Err(Error::NotAMaildir(root.to_owned()));
    }

    skim_dir(root)
}

fn skim_dir(path: &Path) -> Result<Maildir, Error> {
    let mut seen_cur = false;
    let mut seen_new = false;
    let mut seen_tmp = false;
    let mut candidates = Vec::new();

    let entries =
        fs::read_dir(path).map_err(|e| Error::io("listing", path, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("listing", path, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io("stat", entry.path(), e))?;
        if !file_type.is_dir() {
            continue;
        }

        match entry.file_name().to_str() {
            Some("cur") => seen_cur = true,
            Some("new") => seen_new = true,
            Some("tmp") => seen_tmp = true,
            _ => candidates.push(entry.path()),
        }
    }

    let mut folders = Vec::new();
    for candidate in candidates {
        let folder = match skim_dir(&candidate) {
            Ok(folder) => folder,
            // raced with a deletion; a vanished directory is not a folder
            Err(Error::Io { ref source, .. })
                if io::ErrorKind::NotFound == source.kind() =>
            {
                continue
            },
            Err(e) => return Err(e),
        };

        // branches with no messages anywhere below them are dropped
        if folder.has_messages || !folder.folders.is_empty() {
            folders.push(folder);
        }
    }

    Ok(Maildir {
        path: path.to_owned(),
        has_messages: seen_cur && seen_new && seen_tmp,
        folders,
    })
}
