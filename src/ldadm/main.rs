//! # ldadm CLI
//!
//! The binary is intentionally thin: the CLI lives in `cli/`, and this file only
//! invokes `cli::run()` and handles process termination.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (src/ldadm/cli/)                                 │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Logging, config, connection and dispatch (commands.rs)   │
//! │  - Terminal output (print.rs)                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (src/ldadm/api.rs)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors end the process with a one-line message on stderr and exit code 1.
//! At DEBUG level the causes behind the message are logged first.

mod cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
