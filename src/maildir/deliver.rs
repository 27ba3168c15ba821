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

//! Atomic delivery of new messages into a maildir.
//!
//! Delivery is the classic Maildir write-then-rename protocol: the message
//! is written in full under `tmp/`, where readers never look, and becomes
//! visible via a single same-filesystem rename into `new/`. Concurrent
//! deliverers need no coordination beyond that; the unique identifiers are
//! random with enough entropy that collisions are negligible.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::warn;
use rand::{rngs::OsRng, Rng};

use crate::maildir::path::Flags;
use crate::support::error::Error;

/// The alphabet for generated unique identifiers.
///
/// A base-32-like set of 32 symbols which leaves out `i`, `l`, `o`, and `z`
/// so no generated name contains visually ambiguous characters.
const UNIQUE_ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxy";

/// Length of a generated unique identifier.
///
/// 26 symbols at 5 bits each is 130 bits of entropy, slightly more than a
/// standard UUID.
const UNIQUE_LEN: usize = 26;

/// Generate a fresh unique identifier for a new message.
pub fn generate_unique() -> String {
    (0..UNIQUE_LEN)
        .map(|_| UNIQUE_ALPHABET[OsRng.gen_range(0, UNIQUE_ALPHABET.len())] as char)
        .collect()
}

/// Whether `path` is a valid maildir, i.e. a directory with all three of
/// the mandatory `cur/`, `new/`, and `tmp/` subdirectories.
pub fn is_maildir(path: &Path) -> bool {
    ["cur", "new", "tmp"]
        .iter()
        .all(|sub| path.join(sub).is_dir())
}

/// Deliver the message read from `content`, with the given flags, into the
/// maildir at `dst`, returning the path the message ends up at.
///
/// The destination is verified to be a maildir before anything is written.
/// The rename out of `tmp/` is the sole publication point: a failure at any
/// earlier step leaves nothing visible in `new/`. If the rename itself
/// fails, the fully-written message is stranded in `tmp/`; that is reported
/// but not cleaned up, since deleting it would delete mail.
pub fn deliver(
    dst: &Path,
    mut content: impl Read,
    flags: &Flags,
) -> Result<PathBuf, Error> {
    if !is_maildir(dst) {
        return Err(Error::NotAMaildir(dst.to_owned()));
    }

    let name = format!("{}:2,{}", generate_unique(), flags);
    let staged = dst.join("tmp").join(&name);

    let mut out = fs::File::create(&staged)
        .map_err(|e| Error::io("creating", &staged, e))?;
    io::copy(&mut content, &mut out)
        .map_err(|e| Error::io("writing", &staged, e))?;
    out.sync_all().map_err(|e| Error::io("syncing", &staged, e))?;
    drop(out);

    let published = dst.join("new").join(&name);
    if let Err(e) = fs::rename(&staged, &published) {
        warn!("orphaned message left at {}", staged.display());
        return Err(Error::io("publishing", &staged, e));
    }

    Ok(published)
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::maildir::path::MessagePath;

    #[test]
    fn generated_uniques_are_well_formed_and_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..4096 {
            let unique = generate_unique();
            assert_eq!(UNIQUE_LEN, unique.len());
            assert!(unique.bytes().all(|b| UNIQUE_ALPHABET.contains(&b)));
            assert!(seen.insert(unique));
        }
    }

    #[test]
    fn delivery_lands_in_new() {
        crate::init_test_log();

        let root = TempDir::new().unwrap();
        for sub in &["cur", "new", "tmp"] {
            fs::create_dir(root.path().join(sub)).unwrap();
        }

        let mut flags = Flags::new();
        flags.set('S');

        let content: &[u8] = b"Subject: hello\n\nA test message.\n";
        let delivered = deliver(root.path(), content, &flags).unwrap();

        assert_eq!(root.path().join("new"), delivered.parent().unwrap());
        assert_eq!(content.to_vec(), fs::read(&delivered).unwrap());

        let name = delivered.file_name().unwrap().to_str().unwrap();
        let parsed = MessagePath::parse(&format!("new/{}", name)).unwrap();
        assert_eq!("S", parsed.flag_string());
        assert_eq!(UNIQUE_LEN, parsed.unique().len());

        // nothing was left behind in the staging directory
        assert_eq!(
            0,
            fs::read_dir(root.path().join("tmp")).unwrap().count()
        );
    }

    #[test]
    fn published_messages_are_never_partially_visible() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        crate::init_test_log();

        let root = TempDir::new().unwrap();
        for sub in &["cur", "new", "tmp"] {
            fs::create_dir(root.path().join(sub)).unwrap();
        }

        let mut content = b"Subject: bulk\n\n".to_vec();
        content.resize(content.len() + 64 * 1024, b'm');

        let done = Arc::new(AtomicBool::new(false));
        let reader = {
            let new = root.path().join("new");
            let expected = content.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0usize;
                let mut sweep = |observed: &mut usize| {
                    for entry in fs::read_dir(&new).unwrap() {
                        let data = fs::read(entry.unwrap().path()).unwrap();
                        // anything visible here must be the whole message
                        assert_eq!(expected.len(), data.len());
                        assert_eq!(expected, data);
                        *observed += 1;
                    }
                };
                while !done.load(Ordering::SeqCst) {
                    sweep(&mut observed);
                }
                // catch deliveries which landed after the final poll
                sweep(&mut observed);
                observed
            })
        };

        for _ in 0..32 {
            deliver(root.path(), &content[..], &Flags::new()).unwrap();
        }
        done.store(true, Ordering::SeqCst);

        assert!(reader.join().unwrap() >= 32);
    }

    #[test]
    fn delivery_requires_a_maildir() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("cur")).unwrap();
        fs::create_dir(root.path().join("new")).unwrap();

        let content: &[u8] = b"x";
        assert_matches!(
            Err(Error::NotAMaildir(..)),
            deliver(root.path(), content, &Flags::new())
        );

        // the failed delivery wrote nothing at all
        assert_eq!(
            0,
            fs::read_dir(root.path().join("cur")).unwrap().count()
        );
        assert_eq!(
            0,
            fs::read_dir(root.path().join("new")).unwrap().count()
        );
    }

    #[test]
    fn is_maildir_requires_the_whole_triad() {
        let root = TempDir::new().unwrap();
        assert!(!is_maildir(root.path()));

        fs::create_dir(root.path().join("cur")).unwrap();
        fs::create_dir(root.path().join("new")).unwrap();
        assert!(!is_maildir(root.path()));

        fs::create_dir(root.path().join("tmp")).unwrap();
        assert!(is_maildir(root.path()));

        assert!(!is_maildir(&root.path().join("missing")));
    }
}
