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

//! Searching a maildir for messages which match flag criteria.

use std::fs;
use std::io;
use std::path::Path;

use crate::maildir::path::{Flags, MessagePath};
use crate::maildir::resolve;
use crate::support::error::Error;

/// The configuration of a single `find` invocation.
#[derive(Clone, Debug, Default)]
pub struct Query {
    /// The directory where the search begins. This may also be a message
    /// reference, in which case only the message it resolves to is
    /// considered.
    pub root: String,

    /// Flags which must all be clear for a message to match.
    pub flag_clear: Flags,

    /// Flags which must all be set for a message to match.
    pub flag_set: Flags,

    /// Consider only newly arrived messages, i.e. messages inside the
    /// maildir's `new/` directory.
    pub only_new: bool,
}

impl Query {
    fn matches(&self, path: &MessagePath) -> bool {
        self.flag_clear.iter().all(|flag| path.is_clear(flag))
            && self.flag_set.iter().all(|flag| path.is_set(flag))
    }
}

/// Invoke `visit` once for every matching message under `query.root`,
/// taken relative to the current directory.
pub fn find(
    query: &Query,
    visit: impl FnMut(MessagePath),
) -> Result<(), Error> {
    find_in(Path::new(""), query, visit)
}

/// Invoke `visit` once for every message under `query.root`, relative to
/// `base`, which matches the query, in filesystem enumeration order.
///
/// A directory root has its `cur/` (unless `only_new`) and `new/`
/// subdirectories scanned; entries whose names are not message paths are
/// silently skipped, since maildirs legitimately contain stray files. A
/// failure to read either subdirectory aborts the whole call. A root which
/// resolves to a single file is evaluated against the query directly.
pub fn find_in(
    base: &Path,
    query: &Query,
    mut visit: impl FnMut(MessagePath),
) -> Result<(), Error> {
    let mut consider = |p: &str| {
        if let Ok(path) = MessagePath::parse(p) {
            if query.matches(&path) {
                visit(path);
            }
        }
    };

    let named = base.join(&query.root);
    let (root, metadata) = match fs::metadata(&named) {
        Ok(metadata) => (named, metadata),
        Err(e) if io::ErrorKind::NotFound == e.kind() => {
            // not a path; maybe it is a message reference
            let resolved = resolve::resolve_in(base, &query.root)?;
            let metadata = fs::metadata(&resolved)
                .map_err(|e| Error::io("stat", &resolved, e))?;
            (resolved, metadata)
        },
        Err(e) => return Err(Error::io("stat", &named, e)),
    };

    if !metadata.is_dir() {
        consider(&root.to_string_lossy());
        return Ok(());
    }

    if !query.only_new {
        scan_dir(&root.join("cur"), &mut consider)?;
    }
    scan_dir(&root.join("new"), &mut consider)?;

    Ok(())
}

fn scan_dir(
    dir: &Path,
    consider: &mut impl FnMut(&str),
) -> Result<(), Error> {
    let entries =
        fs::read_dir(dir).map_err(|e| Error::io("listing", dir, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| Error::io("listing", dir, e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| Error::io("stat", entry.path(), e))?;
        if file_type.is_dir() {
            continue;
        }

        consider(&entry.path().to_string_lossy());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn sample_maildir() -> TempDir {
        let root = TempDir::new().unwrap();
        for sub in &["cur", "new", "tmp"] {
            fs::create_dir(root.path().join(sub)).unwrap();
        }
        fs::write(root.path().join("cur/aaa:2,S"), b"x").unwrap();
        fs::write(root.path().join("cur/bbb:2,RS"), b"x").unwrap();
        fs::write(root.path().join("cur/ccc:2,"), b"x").unwrap();
        fs::write(root.path().join("new/ddd:2,"), b"x").unwrap();
        // stray entries which must not break or pollute scans
        fs::write(root.path().join("cur/README"), b"not a message").unwrap();
        fs::create_dir(root.path().join("cur/oddball")).unwrap();
        root
    }

    fn uniques(query: &Query) -> Vec<String> {
        let mut found = Vec::new();
        find(query, |path| found.push(path.unique().to_owned())).unwrap();
        found.sort();
        found
    }

    fn query_for(root: &TempDir) -> Query {
        Query {
            root: root.path().to_string_lossy().into_owned(),
            ..Query::default()
        }
    }

    #[test]
    fn unfiltered_queries_see_cur_and_new() {
        let root = sample_maildir();
        assert_eq!(vec!["aaa", "bbb", "ccc", "ddd"], uniques(&query_for(&root)));
    }

    #[test]
    fn flag_set_requires_every_flag() {
        let root = sample_maildir();

        let mut query = query_for(&root);
        query.flag_set = "S".chars().collect();
        assert_eq!(vec!["aaa", "bbb"], uniques(&query));

        query.flag_set = "RS".chars().collect();
        assert_eq!(vec!["bbb"], uniques(&query));
    }

    #[test]
    fn flag_clear_requires_every_flag_absent() {
        let root = sample_maildir();

        let mut query = query_for(&root);
        query.flag_clear = "R".chars().collect();
        assert_eq!(vec!["aaa", "ccc", "ddd"], uniques(&query));

        query.flag_set = "S".chars().collect();
        assert_eq!(vec!["aaa"], uniques(&query));
    }

    #[test]
    fn only_new_is_restricted_to_new() {
        let root = sample_maildir();

        let mut query = query_for(&root);
        query.only_new = true;
        assert_eq!(vec!["ddd"], uniques(&query));
    }

    #[test]
    fn a_file_root_is_evaluated_directly() {
        let root = sample_maildir();

        let mut query = Query {
            root: root
                .path()
                .join("cur/aaa:2,S")
                .to_string_lossy()
                .into_owned(),
            ..Query::default()
        };
        assert_eq!(vec!["aaa"], uniques(&query));

        // the same file fails a non-matching predicate
        query.flag_clear = "S".chars().collect();
        assert!(uniques(&query).is_empty());
    }

    #[test]
    fn a_reference_root_is_resolved() {
        let root = sample_maildir();

        let query = Query {
            root: "ddd".to_owned(),
            ..Query::default()
        };
        let mut found = Vec::new();
        find_in(root.path(), &query, |path| {
            found.push(path.unique().to_owned())
        })
        .unwrap();
        assert_eq!(vec!["ddd"], found);
    }

    #[test]
    fn missing_roots_fail_as_references() {
        let root = sample_maildir();

        let query = Query {
            root: root.path().join("gone").to_string_lossy().into_owned(),
            ..Query::default()
        };
        assert_matches!(
            Err(Error::NoSuchReference(..)),
            find(&query, |_| panic!("visited something"))
        );
    }

    #[test]
    fn unreadable_subdirectories_abort_the_scan() {
        let root = TempDir::new().unwrap();
        // new/ and tmp/ but no cur/
        fs::create_dir(root.path().join("new")).unwrap();
        fs::create_dir(root.path().join("tmp")).unwrap();
        fs::write(root.path().join("new/abc:2,"), b"x").unwrap();

        let mut query = Query {
            root: root.path().to_string_lossy().into_owned(),
            ..Query::default()
        };
        assert_matches!(
            Err(Error::Io { .. }),
            find(&query, |_| ())
        );

        // restricting to new/ never touches the broken cur/
        query.only_new = true;
        assert_eq!(vec!["abc"], uniques(&query));
    }
}
