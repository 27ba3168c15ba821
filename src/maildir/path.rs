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

//! Parsing and manipulation of Maildir message paths.
//!
//! A message path has the shape `[prefix/]{cur,new,tmp}/unique:2,flags`.
//! The unique is a stable, opaque identifier which never changes over the
//! life of a message; the state segment and the flags are mutable metadata.
//! `:2,` is the fixed Maildir "info" version marker.
//!
//! Serialisation is canonical: flags are always emitted in ascending
//! character order, so two logically equal paths always produce the same
//! filename. Reference resolution depends on this, since it matches on the
//! literal `unique:2,` prefix instead of enumerating flag permutations.

use std::collections::BTreeSet;
use std::fmt;
use std::iter::FromIterator;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::support::error::Error;

lazy_static! {
    static ref MESSAGE_PATH: Regex =
        Regex::new(r"^(?:(.+)/)?(cur|new|tmp)/([^:]+):2,([A-Za-z]*)$")
            .expect("Built invalid message path regex?");
}

/// Which of the three Maildir subdirectories currently holds a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// The message has been seen by the mail reader.
    Cur,
    /// The message was delivered but not looked at yet.
    New,
    /// The message is still being written out and must not be read.
    Tmp,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            State::Cur => "cur",
            State::New => "new",
            State::Tmp => "tmp",
        }
    }

    fn from_segment(segment: &str) -> Option<State> {
        match segment {
            "cur" => Some(State::Cur),
            "new" => Some(State::New),
            "tmp" => Some(State::Tmp),
            _ => None,
        }
    }
}

/// An ordered, deduplicated set of single-character message status flags.
///
/// Maildir flags are letters, e.g. `S` for seen or `T` for trashed. The
/// `Display` form is the canonical ascending ordering used in filenames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flags(BTreeSet<char>);

impl Flags {
    pub fn new() -> Self {
        Flags::default()
    }

    /// Set `flag`. Setting a flag which is already set is a no-op.
    pub fn set(&mut self, flag: char) {
        self.0.insert(flag);
    }

    /// Clear `flag`. Clearing a flag which is not set is a no-op.
    pub fn clear(&mut self, flag: char) {
        self.0.remove(&flag);
    }

    pub fn is_set(&self, flag: char) -> bool {
        self.0.contains(&flag)
    }

    pub fn is_clear(&self, flag: char) -> bool {
        !self.is_set(flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the flags in ascending character order.
    pub fn iter(&self) -> impl Iterator<Item = char> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in self.iter() {
            write!(f, "{}", flag)?;
        }
        Ok(())
    }
}

impl FromIterator<char> for Flags {
    fn from_iter<I: IntoIterator<Item = char>>(it: I) -> Self {
        Flags(it.into_iter().collect())
    }
}

/// A parsed Maildir message path.
///
/// The prefix and unique together identify a logical message; the state and
/// flags are presentation metadata. Mutating a `MessagePath` never touches
/// the filesystem; callers rename the old serialised form to the new one
/// when they want a change to stick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessagePath {
    prefix: Option<String>,
    state: State,
    unique: String,
    flags: Flags,
}

impl MessagePath {
    /// Parse `path` as a Maildir message path.
    ///
    /// Anything that deviates from the grammar fails with
    /// `InvalidMessagePath`; there are no partial parses.
    pub fn parse(path: &str) -> Result<MessagePath, Error> {
        let captures = MESSAGE_PATH
            .captures(path)
            .ok_or(Error::InvalidMessagePath)?;

        Ok(MessagePath {
            prefix: captures.get(1).map(|m| m.as_str().to_owned()),
            state: State::from_segment(&captures[2])
                .expect("regex admitted unknown state segment"),
            unique: captures[3].to_owned(),
            flags: captures[4].chars().collect(),
        })
    }

    /// The directory path preceding the state segment, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// The unique portion of the path. The unique is stable across the
    /// life of a message even when its flags or other metadata change.
    pub fn unique(&self) -> &str {
        &self.unique
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// The canonical (ascending) flag string, as it appears after `:2,`.
    pub fn flag_string(&self) -> String {
        self.flags.to_string()
    }

    pub fn set_flag(&mut self, flag: char) {
        self.flags.set(flag);
    }

    pub fn clear_flag(&mut self, flag: char) {
        self.flags.clear(flag);
    }

    pub fn is_set(&self, flag: char) -> bool {
        self.flags.is_set(flag)
    }

    pub fn is_clear(&self, flag: char) -> bool {
        self.flags.is_clear(flag)
    }

    /// Transition the path from `new` to `cur`, i.e. mark the message as no
    /// longer newly arrived. Already-current messages are left alone.
    ///
    /// A message still in `tmp/` has not been delivered at all, so marking
    /// it current is a contract violation and is rejected.
    pub fn mark_current(&mut self) -> Result<(), Error> {
        match self.state {
            State::New => {
                self.state = State::Cur;
                Ok(())
            },
            State::Cur => Ok(()),
            State::Tmp => Err(Error::MessageNotDelivered),
        }
    }
}

impl FromStr for MessagePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        MessagePath::parse(s)
    }
}

impl fmt::Display for MessagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref prefix) = self.prefix {
            write!(f, "{}/", prefix)?;
        }
        write!(f, "{}/{}:2,{}", self.state.as_str(), self.unique, self.flags)
    }
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_mbsync_style_uniques() {
        let path = MessagePath::parse("cur/1525290638.35577_1.x1,U=30:2,").unwrap();
        assert_eq!(None, path.prefix());
        assert_eq!(State::Cur, path.state());
        assert_eq!("1525290638.35577_1.x1,U=30", path.unique());
        assert_eq!("", path.flag_string());

        let path = MessagePath::parse("cur/1525290638.35577_2.x1,U=31:2,T").unwrap();
        assert_eq!("1525290638.35577_2.x1,U=31", path.unique());
        assert_eq!("T", path.flag_string());
    }

    #[test]
    fn parses_prefixed_paths() {
        let path = MessagePath::parse("spam/deep/new/baz:2,RS").unwrap();
        assert_eq!(Some("spam/deep"), path.prefix());
        assert_eq!(State::New, path.state());
        assert_eq!("baz", path.unique());
        assert_eq!("spam/deep/new/baz:2,RS", path.to_string());
    }

    #[test]
    fn flag_string_is_canonically_ordered() {
        let path = MessagePath::parse("cur/foo:2,TSRF").unwrap();
        assert_eq!("FRST", path.flag_string());
        assert_eq!("cur/foo:2,FRST", path.to_string());
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_matches!(Err(Error::InvalidMessagePath), MessagePath::parse(""));
        assert_matches!(Err(Error::InvalidMessagePath), MessagePath::parse("foo"));
        assert_matches!(
            Err(Error::InvalidMessagePath),
            MessagePath::parse("cur/foo")
        );
        assert_matches!(
            Err(Error::InvalidMessagePath),
            MessagePath::parse("bogus/foo:2,S")
        );
        assert_matches!(
            Err(Error::InvalidMessagePath),
            MessagePath::parse("cur/:2,S")
        );
        // uniques must not contain colons
        assert_matches!(
            Err(Error::InvalidMessagePath),
            MessagePath::parse("cur/a:b:2,S")
        );
        // flags must be letters
        assert_matches!(
            Err(Error::InvalidMessagePath),
            MessagePath::parse("cur/foo:2,123")
        );
    }

    #[test]
    fn set_and_clear_are_idempotent() {
        let mut once = MessagePath::parse("cur/foo:2,S").unwrap();
        once.set_flag('T');
        let mut twice = once.clone();
        twice.set_flag('T');
        assert_eq!(once, twice);

        once.clear_flag('S');
        twice.clear_flag('S');
        twice.clear_flag('S');
        assert_eq!(once, twice);
    }

    #[test]
    fn unique_is_stable_under_flag_changes() {
        let mut path = MessagePath::parse("new/foo:2,DR").unwrap();
        path.set_flag('S');
        path.clear_flag('D');
        path.mark_current().unwrap();
        path.clear_flag('R');
        assert_eq!("foo", path.unique());
        assert_eq!("cur/foo:2,S", path.to_string());
    }

    #[test]
    fn mark_current_moves_new_to_cur() {
        let mut path = MessagePath::parse("new/foo:2,").unwrap();
        path.mark_current().unwrap();
        assert_eq!("cur/foo:2,", path.to_string());

        let mut path = MessagePath::parse("spam/new/baz:2,").unwrap();
        path.mark_current().unwrap();
        assert_eq!("spam/cur/baz:2,", path.to_string());
    }

    #[test]
    fn mark_current_is_a_noop_on_cur() {
        let mut path = MessagePath::parse("cur/foo:2,S").unwrap();
        path.mark_current().unwrap();
        assert_eq!("cur/foo:2,S", path.to_string());
    }

    #[test]
    fn mark_current_rejects_undelivered_messages() {
        let mut path = MessagePath::parse("tmp/foo:2,").unwrap();
        assert_matches!(Err(Error::MessageNotDelivered), path.mark_current());
        assert_eq!(State::Tmp, path.state());
    }

    proptest! {
        #[test]
        fn display_parse_round_trip(
            s in r"([a-z]{1,8}/){0,3}(cur|new|tmp)/[0-9a-z._,=-]{1,20}:2,[A-Za-z]{0,6}"
        ) {
            let parsed = MessagePath::parse(&s).unwrap();
            let reparsed = MessagePath::parse(&parsed.to_string()).unwrap();
            prop_assert_eq!(parsed, reparsed);
        }

        #[test]
        fn flags_serialise_in_ascending_order(
            flags in proptest::collection::vec(
                proptest::char::ranges(vec!['A'..='Z', 'a'..='z'].into()),
                0..8,
            )
        ) {
            let mut set = Flags::new();
            for &flag in &flags {
                set.set(flag);
            }

            let serialised: Vec<char> = set.to_string().chars().collect();
            let mut expected = flags;
            expected.sort();
            expected.dedup();
            prop_assert_eq!(expected, serialised);
        }
    }
}
