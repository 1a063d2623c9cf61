//! # CLI Behavior
//!
//! This is **one possible UI client** for ldadm, not the application itself.
//! The CLI is the only place that knows about terminal I/O, exit codes, and output
//! formatting. For the overall architecture, see the crate-level documentation.
//!
//! ## Ids From Standard Input
//!
//! Commands that take a list of ids (`user show`, `user suspend`, `project delete`,
//! `user unit assign`, ...) read them from standard input, one per line, when none
//! are given on the command line:
//!
//! ```text
//! ldadm user search '(loginShell=/bin/false)' | ldadm user suspend
//! ```
//!
//! When ids are given and standard input is also piped in, the arguments win and a
//! warning is logged.
//!
//! ## Interactive Creation
//!
//! `add` commands ask for each attribute on stderr and read answers from stdin.
//! An empty answer takes the default shown in brackets, `.` leaves the attribute
//! out, and `a; b` gives several values.
//!
//! ## Module Structure
//!
//! - `commands`: Context setup and per-command handlers
//! - `print`: Output formatting (names, entries, colored messages)
//! - `setup`: Argument parsing via clap

mod commands;
mod print;
pub mod setup;

pub use commands::run;
