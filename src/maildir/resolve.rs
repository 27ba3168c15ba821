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

//! Resolution of user-supplied message references.
//!
//! A reference is either a real path or the unique portion of a message
//! filename. The latter lets users address a message by a short stable name
//! without knowing its current flags or whether it is still in `new/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::support::error::Error;

/// Resolve `reference` relative to the current directory.
pub fn resolve(reference: &str) -> Result<PathBuf, Error> {
    resolve_in(Path::new(""), reference)
}

/// Resolve `reference` relative to the maildir at `base`.
///
/// If `reference` names an existing filesystem entry it is returned as-is.
/// Otherwise it is taken to be a unique and looked up in `cur/` and then,
/// only if `cur/` had no match at all, in `new/` (with the flags
/// wildcarded). Exactly one match resolves; zero is `NoSuchReference` and
/// several is `AmbiguousReference`, the latter being possible only on a
/// damaged maildir.
pub fn resolve_in(base: &Path, reference: &str) -> Result<PathBuf, Error> {
    let verbatim = base.join(reference);
    if fs::symlink_metadata(&verbatim).is_ok() {
        return Ok(verbatim);
    }

    let mut matches = unique_matches(&base.join("cur"), reference)?;
    if matches.is_empty() {
        matches = unique_matches(&base.join("new"), reference)?;
    }

    match matches.len() {
        0 => Err(Error::NoSuchReference(reference.to_owned())),
        1 => Ok(matches.pop().expect("pop from 1-element vec failed")),
        _ => Err(Error::AmbiguousReference(reference.to_owned())),
    }
}

/// List the entries of `dir` whose unique is exactly `reference`, whatever
/// their flags.
fn unique_matches(dir: &Path, reference: &str) -> Result<Vec<PathBuf>, Error> {
    let prefix = format!("{}:2,", reference);

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        // A maildir with no cur/ or new/ simply has no matches there.
        Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(Vec::new()),
        Err(e) => return Err(Error::io("listing", dir, e)),
    };

    let mut matches = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io("listing", dir, e))?;
        if entry.file_name().to_string_lossy().starts_with(&prefix) {
            matches.push(entry.path());
        }
    }

    Ok(matches)
}
