//! # ldadm Architecture
//!
//! ldadm manages user accounts, organizational units, projects and servers kept in
//! an LDAP directory. It is a **library with a CLI client**: everything from the
//! API facade inward is UI agnostic and can be driven by any front end.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prompts, prints, exits                 │
//! │  - The ONLY place that knows about stdin/stdout/stderr      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands                                │
//! │  - Reads config sections on demand, builds shared mappings  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Users, units, projects, servers                          │
//! │  - Returns `CmdResult`, never prints                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engines (mapping.rs, resolver.rs, allocator.rs)            │
//! │  - Entry Mapping: lazy paged views over one subtree         │
//! │  - Attribute Resolver: templated, prompted new entries      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Directory Layer (directory/)                               │
//! │  - Abstract Directory trait                                 │
//! │  - LdapDirectory (production), InMemoryDirectory (testing)  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: No I/O Assumptions in Core
//!
//! From `api.rs` inward, code takes regular Rust arguments, returns
//! `Result<CmdResult>`, and never writes to stdout or stderr. Interactive input
//! reaches the resolver through the [`console::Prompt`] trait, so tests replay
//! scripted answers instead of typing them.
//!
//! ## Testing Strategy
//!
//! 1. **Engines and commands**: thorough unit tests against
//!    [`directory::memory::InMemoryDirectory`] and the shared fixtures.
//! 2. **API** (`api.rs`): dispatch tests, checking each method reaches the right
//!    subtree.
//! 3. **CLI**: integration tests in `tests/` for argument and configuration
//!    errors that need no server.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Per-object business logic
//! - [`mapping`]: Entry Mapping
//! - [`resolver`]: Attribute Resolver (templates, modifiers, hooks)
//! - [`allocator`]: Unique numeric id allocation
//! - [`directory`]: Directory trait and backends
//! - [`dn`], [`query`], [`schema`], [`model`]: LDAP data types
//! - [`config`]: YAML configuration
//! - [`console`]: Prompt seam, stdin id lists, entry formatting
//! - [`error`]: Error types

pub mod allocator;
pub mod api;
pub mod commands;
pub mod config;
pub mod console;
pub mod directory;
pub mod dn;
pub mod error;
pub mod mapping;
pub mod model;
pub mod query;
pub mod resolver;
pub mod schema;
