//! # API Facade
//!
//! The API layer is a **thin facade** over the command layer. It is the single
//! entry point for every ldadm operation, whichever UI drives it.
//!
//! ## Role and Responsibilities
//!
//! The API facade:
//! - **Dispatches** to the appropriate command function
//! - **Reads configuration lazily**: a command only needs the config sections it
//!   touches, so `ldadm server list` works without a `user` node
//! - **Builds the mappings** commands share (active users for project references,
//!   the subtree a unit command works in)
//! - **Returns structured types** (`Result<CmdResult>`); listings instead push
//!   each id or entry into a [`Listing`] as it arrives and then return any
//!   trailing error, so found items are never held back by a missing one
//!
//! ## What the API Does NOT Do
//!
//! - **Business logic**: that belongs in `commands/*.rs`
//! - **Terminal I/O**: prompts go through the [`Prompt`] the caller passes in
//! - **Presentation**: returns data structures, not strings
//!
//! ## Generic Over Directory
//!
//! `LdadmApi<D: Directory>` is generic over the directory backend:
//! - Production: `LdadmApi<LdapDirectory>`
//! - Testing: `LdadmApi<InMemoryDirectory>`
//!
//! ## Testing Strategy
//!
//! API tests verify that each method reaches the right command with the right
//! subtree and settings. Command behavior is tested in the command modules.

use crate::commands::{self, helpers};
use crate::config::LdadmConfig;
use crate::console::Prompt;
use crate::directory::Directory;
use crate::error::Result;
use crate::mapping::EntryMapping;

pub use crate::commands::{CmdMessage, CmdResult, Listed, Listing, MessageLevel};

/// Which managed subtree a unit command works in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitScope {
    Users,
    Projects,
    Servers,
}

/// The main API facade for ldadm operations.
pub struct LdadmApi<D: Directory> {
    dir: D,
    config: LdadmConfig,
    page_size: usize,
}

impl<D: Directory> LdadmApi<D> {
    pub fn new(dir: D, config: LdadmConfig, page_size: usize) -> Self {
        Self {
            dir,
            config,
            page_size,
        }
    }

    pub fn directory(&self) -> &D {
        &self.dir
    }

    pub fn config(&self) -> &LdadmConfig {
        &self.config
    }

    fn active_users(&self) -> Result<EntryMapping> {
        let settings = self.config.user()?;
        Ok(helpers::users(&settings, &settings.active_base, self.page_size))
    }

    /// The units mapping of a subtree and the mapping of what lives in it.
    fn unit_mappings(&self, scope: UnitScope) -> Result<(EntryMapping, EntryMapping)> {
        let members = match scope {
            UnitScope::Users => self.active_users()?,
            UnitScope::Projects => helpers::projects(&self.config.project()?, self.page_size),
            UnitScope::Servers => helpers::servers(&self.config.server()?, self.page_size),
        };
        Ok((helpers::units(members.base(), self.page_size), members))
    }

    // Users

    pub fn list_users(
        &mut self,
        suspended: bool,
        filter: Option<&str>,
        out: &mut dyn Listing,
    ) -> Result<()> {
        let settings = self.config.user()?;
        commands::user::list(&mut self.dir, &settings, self.page_size, suspended, filter, out)
    }

    pub fn show_users(
        &mut self,
        suspended: bool,
        ids: &[String],
        full: bool,
        out: &mut dyn Listing,
    ) -> Result<()> {
        let settings = self.config.user()?;
        commands::user::show(&mut self.dir, &settings, self.page_size, suspended, ids, full, out)
    }

    pub fn add_user(&mut self, prompt: &mut dyn Prompt, defaults: Option<&str>) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::add(&mut self.dir, prompt, &settings, self.page_size, defaults)
    }

    pub fn suspend_users(&mut self, ids: &[String]) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::suspend(&mut self.dir, &settings, self.page_size, ids)
    }

    pub fn restore_users(&mut self, ids: &[String]) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::restore(&mut self.dir, &settings, self.page_size, ids)
    }

    pub fn delete_users(&mut self, ids: &[String]) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::delete(&mut self.dir, &settings, self.page_size, ids)
    }

    pub fn rename_user(&mut self, old_id: &str, new_id: &str) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::rename(&mut self.dir, &settings, self.page_size, old_id, new_id)
    }

    pub fn reset_password(&mut self, id: &str) -> Result<CmdResult> {
        let settings = self.config.user()?;
        commands::user::passwd(&mut self.dir, &settings, self.page_size, id)
    }

    // Units

    pub fn list_units(&mut self, scope: UnitScope, out: &mut dyn Listing) -> Result<()> {
        let (units, _) = self.unit_mappings(scope)?;
        commands::unit::list(&mut self.dir, &units, out)
    }

    pub fn show_unit(
        &mut self,
        scope: UnitScope,
        unit: &str,
        full: bool,
        out: &mut dyn Listing,
    ) -> Result<()> {
        let (units, members) = self.unit_mappings(scope)?;
        commands::unit::show(&mut self.dir, &units, &members, unit, full, out)
    }

    pub fn add_unit(
        &mut self,
        scope: UnitScope,
        prompt: &mut dyn Prompt,
        parent: Option<&str>,
    ) -> Result<CmdResult> {
        let (units, _) = self.unit_mappings(scope)?;
        let settings = self.config.unit()?;
        commands::unit::add(&mut self.dir, prompt, &units, &settings, parent)
    }

    pub fn delete_units(&mut self, scope: UnitScope, names: &[String]) -> Result<CmdResult> {
        let (units, _) = self.unit_mappings(scope)?;
        commands::unit::delete(&mut self.dir, &units, names)
    }

    pub fn assign_unit(&mut self, scope: UnitScope, unit: &str, ids: &[String]) -> Result<CmdResult> {
        let (units, members) = self.unit_mappings(scope)?;
        commands::unit::assign(&mut self.dir, &units, &members, unit, ids)
    }

    // Projects

    pub fn list_projects(&mut self, out: &mut dyn Listing) -> Result<()> {
        let settings = self.config.project()?;
        commands::project::list(&mut self.dir, &settings, self.page_size, out)
    }

    pub fn show_projects(&mut self, ids: &[String], full: bool, out: &mut dyn Listing) -> Result<()> {
        let settings = self.config.project()?;
        commands::project::show(&mut self.dir, &settings, self.page_size, ids, full, out)
    }

    pub fn add_project(&mut self, prompt: &mut dyn Prompt, defaults: Option<&str>) -> Result<CmdResult> {
        let settings = self.config.project()?;
        let people = self.active_users()?;
        commands::project::add(&mut self.dir, prompt, &settings, &people, self.page_size, defaults)
    }

    pub fn delete_projects(&mut self, ids: &[String]) -> Result<CmdResult> {
        let settings = self.config.project()?;
        commands::project::delete(&mut self.dir, &settings, self.page_size, ids)
    }

    pub fn add_project_members(&mut self, project: &str, users: &[String]) -> Result<CmdResult> {
        let settings = self.config.project()?;
        let people = self.active_users()?;
        commands::project::add_members(&mut self.dir, &settings, &people, self.page_size, project, users)
    }

    pub fn add_project_servers(&mut self, project: &str, servers: &[String]) -> Result<CmdResult> {
        let settings = self.config.project()?;
        let servers_mapping = helpers::servers(&self.config.server()?, self.page_size);
        commands::project::add_servers(
            &mut self.dir,
            &settings,
            &servers_mapping,
            self.page_size,
            project,
            servers,
        )
    }

    pub fn set_project_manager(&mut self, project: &str, user: &str) -> Result<CmdResult> {
        let settings = self.config.project()?;
        let people = self.active_users()?;
        commands::project::manage(&mut self.dir, &settings, &people, self.page_size, project, user)
    }

    // Servers

    pub fn list_servers(&mut self, out: &mut dyn Listing) -> Result<()> {
        let settings = self.config.server()?;
        commands::server::list(&mut self.dir, &settings, self.page_size, out)
    }

    pub fn show_servers(&mut self, ids: &[String], full: bool, out: &mut dyn Listing) -> Result<()> {
        let settings = self.config.server()?;
        commands::server::show(&mut self.dir, &settings, self.page_size, ids, full, out)
    }

    pub fn add_server(&mut self, prompt: &mut dyn Prompt, defaults: Option<&str>) -> Result<CmdResult> {
        let settings = self.config.server()?;
        commands::server::add(&mut self.dir, prompt, &settings, self.page_size, defaults)
    }

    pub fn delete_servers(&mut self, ids: &[String]) -> Result<CmdResult> {
        let settings = self.config.server()?;
        commands::server::delete(&mut self.dir, &settings, self.page_size, ids)
    }
}
