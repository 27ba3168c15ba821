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

use std::path::PathBuf;

use structopt::StructOpt;

use super::commands;
use crate::support::sysexits::*;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
struct Options {
    /// Log every operation performed, not just problems.
    #[structopt(short, long, global = true)]
    verbose: bool,

    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// List messages matching the given criteria.
    ///
    /// Each matching message's path is printed on its own line, in
    /// filesystem order.
    Find(FindSubcommand),
    /// Count the messages matching the given criteria in each folder.
    Count(CountSubcommand),
    /// Move newly arrived messages into cur/.
    Cur(CurSubcommand),
    /// Set and clear flags on messages.
    ///
    /// For example, `mailsift flags -s SR -c F msg` sets the S and R flags
    /// on `msg` while clearing F. The message is renamed in place; its
    /// unique never changes.
    Flags(FlagsSubcommand),
    /// Copy a message into another maildir.
    ///
    /// The copy is freshly delivered into the destination, so it gets a new
    /// unique, but keeps the source message's flags. The new path is
    /// printed on success.
    Copy(CopySubcommand),
    /// Move a message into another maildir.
    ///
    /// The source message is marked as current, copied to the destination,
    /// and then flagged as trashed.
    Move(MoveSubcommand),
    /// Deliver a message read from standard input.
    Deliver(DeliverSubcommand),
    /// Resolve message references to paths.
    ///
    /// A reference is either a path or the unique portion of a message
    /// filename. Failures are reported per reference without aborting the
    /// rest.
    Resolve(ResolveSubcommand),
    /// Print the unique portion of each message path.
    Unique(UniqueSubcommand),
    /// Show the folder structure under a maildir root.
    ///
    /// Folders with no messages anywhere below them are omitted. With no
    /// root given, the maildir comes from the configuration file, $MAILDIR,
    /// or $HOME/Mail, in that order.
    Folders(FoldersSubcommand),
}

#[derive(StructOpt, Default)]
pub(super) struct QueryOptions {
    /// Match when these flags are clear, like "ST".
    #[structopt(short = "c")]
    pub(super) flag_clear: Option<String>,

    /// Match when these flags are set, like "ST".
    #[structopt(short = "s")]
    pub(super) flag_set: Option<String>,

    /// Match only newly arrived messages.
    #[structopt(short = "N")]
    pub(super) only_new: bool,
}

#[derive(StructOpt)]
pub(super) struct FindSubcommand {
    #[structopt(flatten)]
    pub(super) query: QueryOptions,

    /// Folders to search [default: .]
    pub(super) folders: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct CountSubcommand {
    #[structopt(flatten)]
    pub(super) query: QueryOptions,

    /// Folders to count.
    #[structopt(required = true)]
    pub(super) folders: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct CurSubcommand {
    /// Folders whose new messages should move to cur/ [default: .]
    pub(super) folders: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct FlagsSubcommand {
    /// Flags to clear, like "ST".
    #[structopt(short = "c")]
    pub(super) clear: Option<String>,

    /// Flags to set, like "ST".
    #[structopt(short = "s")]
    pub(super) set: Option<String>,

    /// The messages to change.
    #[structopt(required = true)]
    pub(super) references: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct CopySubcommand {
    /// The message to copy.
    pub(super) message: String,

    /// The destination maildir.
    #[structopt(parse(from_os_str))]
    pub(super) destination: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct MoveSubcommand {
    /// The message to move.
    pub(super) message: String,

    /// The destination maildir.
    #[structopt(parse(from_os_str))]
    pub(super) destination: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct DeliverSubcommand {
    /// Flags to set on the delivered message, like "S".
    #[structopt(short = "s")]
    pub(super) flags: Option<String>,

    /// The destination maildir.
    #[structopt(parse(from_os_str))]
    pub(super) destination: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct ResolveSubcommand {
    /// The references to resolve.
    #[structopt(required = true)]
    pub(super) references: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct UniqueSubcommand {
    /// The message paths to examine.
    #[structopt(required = true)]
    pub(super) paths: Vec<String>,
}

#[derive(StructOpt)]
pub(super) struct FoldersSubcommand {
    /// The maildir root to skim.
    #[structopt(parse(from_os_str))]
    pub(super) root: Option<PathBuf>,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more
    // concise API
    let options = Options::from_clap(&match Options::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    crate::init_simple_log(options.verbose);

    match options.command {
        Command::Find(cmd) => commands::find(cmd),
        Command::Count(cmd) => commands::count(cmd),
        Command::Cur(cmd) => commands::cur(cmd),
        Command::Flags(cmd) => commands::flags(cmd),
        Command::Copy(cmd) => commands::copy(cmd),
        Command::Move(cmd) => commands::mv(cmd),
        Command::Deliver(cmd) => commands::deliver(cmd),
        Command::Resolve(cmd) => commands::resolve(cmd),
        Command::Unique(cmd) => commands::unique(cmd),
        Command::Folders(cmd) => commands::folders(cmd),
    }
}
