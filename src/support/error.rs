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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A string which was supposed to be a Maildir message path does not
    /// match the `[prefix/]{cur,new,tmp}/unique:2,flags` grammar.
    #[error("Invalid message path")]
    InvalidMessagePath,
    /// A reference matched no file, neither as a path nor as a unique.
    #[error("Ref matches zero files: {0:?}")]
    NoSuchReference(String),
    /// A reference matched more than one file. Uniques are supposed to be
    /// unique within a maildir, so this indicates the maildir itself is
    /// damaged.
    #[error("Ref matches multiple files: {0:?}")]
    AmbiguousReference(String),
    /// A delivery destination is missing one or more of the mandatory
    /// `cur/`, `new/`, `tmp/` subdirectories.
    #[error("Not a maildir: {0}")]
    NotAMaildir(PathBuf),
    /// An operation which requires a delivered message was applied to a
    /// message still staged in `tmp/`.
    #[error("Message has not been delivered yet")]
    MessageNotDelivered,
    #[error(transparent)]
    ConfigParse(#[from] toml::de::Error),
    /// A filesystem operation failed, with the operation and the path it
    /// was applied to.
    #[error("{op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error together with the operation and path it came from.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }
}
