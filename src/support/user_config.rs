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

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// The optional per-user configuration for mailsift.
///
/// This is stored in a file named `mailsift.toml` under
/// `$XDG_CONFIG_HOME/mailsift` (or `~/.config/mailsift`). A missing file is
/// the same as an empty one.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct UserConfig {
    /// The maildir to operate on when no explicit location is given on the
    /// command line.
    #[serde(default)]
    pub maildir: Option<PathBuf>,
}

impl UserConfig {
    /// Return the path of the configuration file, or `None` if no home
    /// directory can be determined from the environment.
    pub fn path() -> Option<PathBuf> {
        if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
            if !config_home.is_empty() {
                return Some(
                    PathBuf::from(config_home).join("mailsift/mailsift.toml"),
                );
            }
        }

        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config/mailsift/mailsift.toml"))
    }

    /// Load the configuration, falling back to the defaults if there is no
    /// configuration file.
    pub fn load() -> Result<UserConfig, Error> {
        let path = match UserConfig::path() {
            Some(path) => path,
            None => return Ok(UserConfig::default()),
        };

        let mut text = Vec::new();
        match fs::File::open(&path).and_then(|mut f| f.read_to_end(&mut text)) {
            Ok(_) => (),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                return Ok(UserConfig::default())
            },
            Err(e) => return Err(Error::io("reading", path, e)),
        }

        Ok(toml::from_slice(&text)?)
    }
}
