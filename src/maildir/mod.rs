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

//! The core Maildir operations: the message path codec, reference
//! resolution, atomic delivery, flag queries, and folder discovery.
//!
//! Nothing in here holds state between calls; the filesystem is the only
//! shared resource, and the only synchronisation relied upon is the
//! atomicity of same-filesystem renames.

pub mod deliver;
pub mod path;
pub mod query;
pub mod resolve;
pub mod tree;
