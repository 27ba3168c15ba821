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

//! The drivers behind each CLI subcommand.
//!
//! Everything here is glue: argument shapes come from `super::main`, the
//! actual Maildir semantics live in `crate::maildir`, and this module's job
//! is to connect them and turn errors into sensible exit codes.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use super::main::*;
use crate::maildir::path::{Flags, MessagePath};
use crate::maildir::query::{self, Query};
use crate::maildir::{deliver as delivery, resolve as resolution, tree};
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::user_config::UserConfig;

fn exit_code(e: &Error) -> Sysexit {
    match *e {
        Error::NoSuchReference(..) | Error::AmbiguousReference(..) => {
            EX_NOINPUT
        },
        Error::InvalidMessagePath | Error::MessageNotDelivered => EX_DATAERR,
        Error::NotAMaildir(..) => EX_CANTCREAT,
        Error::ConfigParse(..) => EX_CONFIG,
        Error::Io { .. } => EX_IOERR,
    }
}

fn fail(context: &str, e: Error) -> ! {
    eprintln!("{}: {}", context, e);
    exit_code(&e).exit()
}

fn parse_flags(text: &Option<String>) -> Flags {
    text.as_deref().unwrap_or("").chars().collect()
}

fn query_from_options(options: &QueryOptions) -> Query {
    Query {
        root: String::new(),
        flag_clear: parse_flags(&options.flag_clear),
        flag_set: parse_flags(&options.flag_set),
        only_new: options.only_new,
    }
}

fn folders_or_cwd(folders: Vec<String>) -> Vec<String> {
    if folders.is_empty() {
        vec![".".to_owned()]
    } else {
        folders
    }
}

pub(super) fn find(cmd: FindSubcommand) {
    let mut query = query_from_options(&cmd.query);
    for folder in folders_or_cwd(cmd.folders) {
        query.root = folder;
        if let Err(e) = query::find(&query, |path| println!("{}", path)) {
            fail(&query.root, e);
        }
    }
}

pub(super) fn count(cmd: CountSubcommand) {
    let mut query = query_from_options(&cmd.query);
    for folder in cmd.folders {
        query.root = folder;
        let mut n = 0u64;
        if let Err(e) = query::find(&query, |_| n += 1) {
            fail(&query.root, e);
        }
        println!("{}\t{}", query.root, n);
    }
}

pub(super) fn cur(cmd: CurSubcommand) {
    let mut failures = 0u32;

    for folder in folders_or_cwd(cmd.folders) {
        let query = Query {
            root: folder,
            only_new: true,
            ..Query::default()
        };

        // Plan the renames first instead of renaming while the directory
        // is still being enumerated.
        let mut renames = Vec::new();
        let result = query::find(&query, |mut path| {
            let src = path.to_string();
            if path.mark_current().is_err() {
                return;
            }
            let dst = path.to_string();
            if src != dst {
                renames.push((src, dst));
            }
        });
        if let Err(e) = result {
            fail(&query.root, e);
        }

        for (src, dst) in renames {
            debug!("mv {:?} {:?}", src, dst);
            if let Err(e) = fs::rename(&src, &dst) {
                eprintln!("renaming {}: {}", src, e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        die!(EX_IOERR, "some operations failed");
    }
}

pub(super) fn flags(cmd: FlagsSubcommand) {
    let clear = parse_flags(&cmd.clear);
    let set = parse_flags(&cmd.set);

    // Resolve everything up front so a bad reference aborts before any
    // message was touched.
    let mut paths = Vec::new();
    for reference in &cmd.references {
        let resolved = match resolution::resolve(reference) {
            Ok(resolved) => resolved,
            Err(e) => fail(reference, e),
        };
        match MessagePath::parse(&resolved.to_string_lossy()) {
            Ok(path) => paths.push(path),
            Err(e) => fail(reference, e),
        }
    }

    for mut path in paths {
        let src = path.to_string();
        for flag in clear.iter() {
            path.clear_flag(flag);
        }
        for flag in set.iter() {
            path.set_flag(flag);
        }

        let dst = path.to_string();
        if src == dst {
            continue;
        }

        debug!("mv {:?} {:?}", src, dst);
        if let Err(e) = fs::rename(&src, &dst) {
            fail(&src, Error::io("renaming", &src, e));
        }
    }
}

fn copy_message(
    reference: &str,
    destination: &Path,
) -> Result<PathBuf, Error> {
    let resolved = resolution::resolve(reference)?;
    let source = MessagePath::parse(&resolved.to_string_lossy())?;

    let content = fs::File::open(&resolved)
        .map_err(|e| Error::io("opening", &resolved, e))?;
    delivery::deliver(destination, content, source.flags())
}

pub(super) fn copy(cmd: CopySubcommand) {
    match copy_message(&cmd.message, &cmd.destination) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => fail(&cmd.message, e),
    }
}

fn move_message(
    reference: &str,
    destination: &Path,
) -> Result<PathBuf, Error> {
    let resolved = resolution::resolve(reference)?;
    let mut source = MessagePath::parse(&resolved.to_string_lossy())?;

    // A moved message has by definition been looked at, so settle it into
    // cur/ before anything else; the trash rename below then starts from
    // its final location.
    let original = source.to_string();
    source.mark_current()?;
    let current = source.to_string();
    if current != original {
        debug!("mv {:?} {:?}", original, current);
        fs::rename(&original, &current)
            .map_err(|e| Error::io("renaming", &original, e))?;
    }

    let content = fs::File::open(&current)
        .map_err(|e| Error::io("opening", current.as_str(), e))?;
    let delivered = delivery::deliver(destination, content, source.flags())?;

    source.set_flag('T');
    let trashed = source.to_string();
    if trashed != current {
        debug!("mv {:?} {:?}", current, trashed);
        fs::rename(&current, &trashed)
            .map_err(|e| Error::io("renaming", current.as_str(), e))?;
    }

    Ok(delivered)
}

pub(super) fn mv(cmd: MoveSubcommand) {
    match move_message(&cmd.message, &cmd.destination) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => fail(&cmd.message, e),
    }
}

pub(super) fn deliver(cmd: DeliverSubcommand) {
    let flags = parse_flags(&cmd.flags);
    let stdin = io::stdin();
    match delivery::deliver(&cmd.destination, stdin.lock(), &flags) {
        Ok(path) => println!("{}", path.display()),
        Err(e) => fail(&cmd.destination.display().to_string(), e),
    }
}

pub(super) fn resolve(cmd: ResolveSubcommand) {
    for reference in cmd.references {
        match resolution::resolve(&reference) {
            Ok(path) => println!("{}", path.display()),
            // informational command; report per item and keep going
            Err(e) => eprintln!("{}: {}", reference, e),
        }
    }
}

pub(super) fn unique(cmd: UniqueSubcommand) {
    for path in cmd.paths {
        match MessagePath::parse(&path) {
            Ok(parsed) => println!("{}", parsed.unique()),
            Err(_) => eprintln!("Invalid message filename: {}", path),
        }
    }
}

/// Locate the maildir to use when no explicit root is given: the
/// configuration file first, then $MAILDIR, then $HOME/Mail.
fn default_maildir() -> PathBuf {
    let config = match UserConfig::load() {
        Ok(config) => config,
        Err(e) => die!(EX_CONFIG, "{}", e),
    };
    if let Some(maildir) = config.maildir {
        return maildir;
    }

    if let Some(maildir) = env::var_os("MAILDIR") {
        if !maildir.is_empty() {
            return maildir.into();
        }
    }

    match env::var_os("HOME") {
        Some(home) => Path::new(&home).join("Mail"),
        None => die!(
            EX_CONFIG,
            "Can't locate a maildir: nothing configured and \
             neither MAILDIR nor HOME is set"
        ),
    }
}

fn print_tree(maildir: &tree::Maildir, depth: usize) {
    let name = maildir
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| maildir.path.display().to_string());

    let marker = if maildir.has_messages { "" } else { "/" };
    println!("{:indent$}{}{}", "", name, marker, indent = depth * 2);

    for folder in &maildir.folders {
        print_tree(folder, depth + 1);
    }
}

pub(super) fn folders(cmd: FoldersSubcommand) {
    let root = cmd.root.unwrap_or_else(default_maildir);

    let skimmed = match tree::skim(&root) {
        Ok(skimmed) => skimmed,
        Err(e) => fail(&root.display().to_string(), e),
    };

    if !skimmed.has_any_messages() {
        println!("No mail in {}", root.display());
        return;
    }

    print_tree(&skimmed, 0);
}
