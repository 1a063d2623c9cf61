//! # CLI Layer
//!
//! The CLI layer is the **only** place in the codebase that:
//! - Knows about terminal I/O (stdin, stdout, stderr)
//! - Sets up logging
//! - Opens the directory connection
//! - Formats output for human consumption
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: Convert shell arguments into typed commands via clap
//! 2. **Context Setup**: Load configuration, connect, build the `AppContext`
//! 3. **API Dispatch**: Call the matching `LdadmApi` method
//! 4. **Output**: Stream listings to stdout as they arrive, print the `CmdResult`
//!
//! ## Structure
//!
//! - `run()`: Main entry (called by `main.rs`)
//! - `init_context()`: Builds `AppContext` from the config file
//! - `handle_*()`: Per-object handlers that call the API and print the result

use super::print::{print_result, Printer};
use super::setup::{
    Cli, Commands, LogLevel, ProjectCommands, ServerCommands, UnitCommands, UserCommands,
};
use clap::Parser;
use ldadm::api::{LdadmApi, UnitScope};
use ldadm::config::{self, LdadmConfig};
use ldadm::console::{read_lines, Prompt};
use ldadm::directory::ldap::LdapDirectory;
use ldadm::error::{LdadmError, Result};
use std::error::Error;
use std::io::{BufRead, IsTerminal, Write};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

struct AppContext {
    api: LdadmApi<LdapDirectory>,
}

/// Asks on stderr and reads the answer from stdin.
struct StdioPrompt;

impl Prompt for StdioPrompt {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        let mut stderr = std::io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(LdadmError::Api(
                "Standard input closed while waiting for an answer".to_string(),
            ));
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let result = execute(&cli);
    if let Err(e) = &result {
        let mut source = e.source();
        while let Some(cause) = source {
            debug!("caused by: {}", cause);
            source = cause.source();
        }
    }
    result
}

/// `RUST_LOG`, when set, overrides the command line level.
fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn execute(cli: &Cli) -> Result<()> {
    let mut ctx = init_context(cli)?;
    match &cli.command {
        Commands::User { command } => handle_user(&mut ctx, command),
        Commands::Project { command } => handle_project(&mut ctx, command),
        Commands::Server { command } => handle_server(&mut ctx, command),
    }
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let path = config::locate(cli.config.as_deref())?;
    let config = LdadmConfig::load(&path)?;

    // Fail on a broken section before touching the network.
    match &cli.command {
        Commands::User { .. } => config.user().map(drop)?,
        Commands::Project { .. } => config.project().map(drop)?,
        Commands::Server { .. } => config.server().map(drop)?,
    }
    let ldap = config.ldap()?;

    let dir = LdapDirectory::connect(&ldap.connect)?;
    Ok(AppContext {
        api: LdadmApi::new(dir, config, ldap.page_size),
    })
}

/// Positional ids, or one id per line from stdin when there are none.
fn args_or_stdin(args: &[String]) -> Result<Vec<String>> {
    let stdin = std::io::stdin();
    if !args.is_empty() {
        if !stdin.is_terminal() {
            warn!("Standard input ignored, because arguments are present");
        }
        return Ok(args.to_vec());
    }
    debug!("reading ids from standard input");
    read_lines(stdin.lock())
}

fn handle_user(ctx: &mut AppContext, command: &UserCommands) -> Result<()> {
    let result = match command {
        UserCommands::List { suspended } => {
            return ctx.api.list_users(*suspended, None, &mut Printer)
        }
        UserCommands::Search { filter, suspended } => {
            return ctx
                .api
                .list_users(*suspended, Some(filter.as_str()), &mut Printer)
        }
        UserCommands::Show {
            full,
            suspended,
            ids,
        } => {
            let ids = args_or_stdin(ids)?;
            return ctx.api.show_users(*suspended, &ids, *full, &mut Printer);
        }
        UserCommands::Suspend { ids } => ctx.api.suspend_users(&args_or_stdin(ids)?)?,
        UserCommands::Restore { ids } => ctx.api.restore_users(&args_or_stdin(ids)?)?,
        UserCommands::Delete { ids } => ctx.api.delete_users(&args_or_stdin(ids)?)?,
        UserCommands::Add { defaults } => ctx.api.add_user(&mut StdioPrompt, defaults.as_deref())?,
        UserCommands::Passwd { user } => ctx.api.reset_password(user)?,
        UserCommands::Rename { old, new } => ctx.api.rename_user(old, new)?,
        UserCommands::Unit { command } => return handle_unit(ctx, UnitScope::Users, command),
    };
    print_result(&result);
    Ok(())
}

fn handle_unit(ctx: &mut AppContext, scope: UnitScope, command: &UnitCommands) -> Result<()> {
    let result = match command {
        UnitCommands::List => return ctx.api.list_units(scope, &mut Printer),
        UnitCommands::Show { full, unit } => {
            return ctx.api.show_unit(scope, unit, *full, &mut Printer)
        }
        UnitCommands::Add { parent } => {
            ctx.api
                .add_unit(scope, &mut StdioPrompt, parent.as_deref())?
        }
        UnitCommands::Delete { units } => ctx.api.delete_units(scope, &args_or_stdin(units)?)?,
        UnitCommands::Assign { unit, ids } => {
            ctx.api.assign_unit(scope, unit, &args_or_stdin(ids)?)?
        }
    };
    print_result(&result);
    Ok(())
}

fn handle_project(ctx: &mut AppContext, command: &ProjectCommands) -> Result<()> {
    let result = match command {
        ProjectCommands::List => return ctx.api.list_projects(&mut Printer),
        ProjectCommands::Show { full, ids } => {
            let ids = args_or_stdin(ids)?;
            return ctx.api.show_projects(&ids, *full, &mut Printer);
        }
        ProjectCommands::Add { defaults } => {
            ctx.api.add_project(&mut StdioPrompt, defaults.as_deref())?
        }
        ProjectCommands::Delete { ids } => ctx.api.delete_projects(&args_or_stdin(ids)?)?,
        ProjectCommands::Addmember { project, users } => ctx
            .api
            .add_project_members(project, &args_or_stdin(users)?)?,
        ProjectCommands::Addserver { project, servers } => ctx
            .api
            .add_project_servers(project, &args_or_stdin(servers)?)?,
        ProjectCommands::Manage { project, user } => ctx.api.set_project_manager(project, user)?,
        ProjectCommands::Unit { command } => {
            return handle_unit(ctx, UnitScope::Projects, command)
        }
    };
    print_result(&result);
    Ok(())
}

fn handle_server(ctx: &mut AppContext, command: &ServerCommands) -> Result<()> {
    let result = match command {
        ServerCommands::List => return ctx.api.list_servers(&mut Printer),
        ServerCommands::Show { full, ids } => {
            let ids = args_or_stdin(ids)?;
            return ctx.api.show_servers(&ids, *full, &mut Printer);
        }
        ServerCommands::Add { defaults } => {
            ctx.api.add_server(&mut StdioPrompt, defaults.as_deref())?
        }
        ServerCommands::Delete { ids } => ctx.api.delete_servers(&args_or_stdin(ids)?)?,
        ServerCommands::Unit { command } => return handle_unit(ctx, UnitScope::Servers, command),
    };
    print_result(&result);
    Ok(())
}
