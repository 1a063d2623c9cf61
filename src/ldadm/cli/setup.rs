use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Returns the version string, including git hash and commit date for non-release builds.
/// Format: "0.4.0" for releases, "0.4.0@abc1234 2024-01-15 14:30" for dev builds
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum LogLevel {
    #[value(name = "CRITICAL")]
    Critical,
    #[value(name = "ERROR")]
    Error,
    #[value(name = "WARNING")]
    Warning,
    #[value(name = "INFO")]
    Info,
    #[value(name = "DEBUG")]
    Debug,
}

impl LogLevel {
    /// The `tracing` filter directive for this level. There is nothing above
    /// `error` in tracing, so CRITICAL maps onto it.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Critical | LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "ldadm", bin_name = "ldadm", version = get_version())]
#[command(about = "Manage users, units, projects and servers in an LDAP directory", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: $LDADM_CONFIG, then ldadm.yml in the config dir)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Logging verbosity
    #[arg(
        short,
        long,
        global = true,
        value_enum,
        ignore_case = true,
        default_value_t = LogLevel::Warning
    )]
    pub loglevel: LogLevel,

    /// Log at least at INFO level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            self.loglevel.max(LogLevel::Info)
        } else {
            self.loglevel
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// User accounts
    #[command(display_order = 1)]
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Projects
    #[command(display_order = 2)]
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Servers
    #[command(display_order = 3)]
    Server {
        #[command(subcommand)]
        command: ServerCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List active (or suspended) user ids
    #[command(alias = "ls", display_order = 1)]
    List {
        /// List suspended users instead
        #[arg(long)]
        suspended: bool,
    },

    /// List users matching an LDAP filter
    #[command(alias = "find", display_order = 2)]
    Search {
        /// Search filter, e.g. '(loginShell=/bin/false)'
        filter: String,

        /// Search suspended users instead
        #[arg(long)]
        suspended: bool,
    },

    /// Show user details
    #[command(alias = "info", display_order = 3)]
    Show {
        /// Include operational attributes
        #[arg(long)]
        full: bool,

        /// Show suspended users instead
        #[arg(long)]
        suspended: bool,

        /// User ids; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Suspend active users
    #[command(visible_aliases = ["lock", "ban", "disable"], display_order = 4)]
    Suspend {
        /// User ids; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Restore suspended users
    #[command(visible_aliases = ["unlock", "unban", "enable"], display_order = 5)]
    Restore {
        /// User ids; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Delete suspended users
    #[command(aliases = ["remove", "rm"], display_order = 6)]
    Delete {
        /// User ids; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Create a user interactively
    #[command(alias = "create", display_order = 7)]
    Add {
        /// Offer the attributes of this user as defaults
        #[arg(long, value_name = "USER")]
        defaults: Option<String>,
    },

    /// Set a new random password and print it
    #[command(display_order = 8)]
    Passwd {
        /// User id
        user: String,
    },

    /// Change a user's id
    #[command(display_order = 9)]
    Rename {
        /// Current id
        old: String,
        /// New id
        new: String,
    },

    /// Organizational units of active users
    #[command(display_order = 10)]
    Unit {
        #[command(subcommand)]
        command: UnitCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum UnitCommands {
    /// List units
    #[command(alias = "ls", display_order = 1)]
    List,

    /// List the members of a unit
    #[command(alias = "info", display_order = 2)]
    Show {
        /// Include members of nested units
        #[arg(long)]
        full: bool,

        /// Unit name
        unit: String,
    },

    /// Create a unit interactively
    #[command(alias = "create", display_order = 3)]
    Add {
        /// Create the unit inside this one
        #[arg(long, value_name = "UNIT")]
        parent: Option<String>,
    },

    /// Delete empty units
    #[command(aliases = ["remove", "rm"], display_order = 4)]
    Delete {
        /// Unit names; read from stdin if omitted
        units: Vec<String>,
    },

    /// Move members into a unit
    #[command(display_order = 5)]
    Assign {
        /// Unit name
        unit: String,

        /// Member ids; read from stdin if omitted
        ids: Vec<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List project names
    #[command(alias = "ls", display_order = 1)]
    List,

    /// Show project details
    #[command(alias = "info", display_order = 2)]
    Show {
        /// Include operational attributes
        #[arg(long)]
        full: bool,

        /// Project names; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Create a project interactively
    #[command(alias = "create", display_order = 3)]
    Add {
        /// Offer the attributes of this project as defaults
        #[arg(long, value_name = "PROJECT")]
        defaults: Option<String>,
    },

    /// Delete projects
    #[command(aliases = ["remove", "rm"], display_order = 4)]
    Delete {
        /// Project names; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Add users to a project
    #[command(display_order = 5)]
    Addmember {
        /// Project name
        project: String,

        /// User ids; read from stdin if omitted
        users: Vec<String>,
    },

    /// Add servers to a project
    #[command(display_order = 6)]
    Addserver {
        /// Project name
        project: String,

        /// Server names; read from stdin if omitted
        servers: Vec<String>,
    },

    /// Make a user the project manager
    #[command(display_order = 7)]
    Manage {
        /// Project name
        project: String,

        /// User id
        user: String,
    },

    /// Organizational units of projects
    #[command(display_order = 8)]
    Unit {
        #[command(subcommand)]
        command: UnitCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ServerCommands {
    /// List server names
    #[command(alias = "ls", display_order = 1)]
    List,

    /// Show server details
    #[command(alias = "info", display_order = 2)]
    Show {
        /// Include operational attributes
        #[arg(long)]
        full: bool,

        /// Server names; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Create a server interactively
    #[command(alias = "create", display_order = 3)]
    Add {
        /// Offer the attributes of this server as defaults
        #[arg(long, value_name = "SERVER")]
        defaults: Option<String>,
    },

    /// Delete servers
    #[command(aliases = ["remove", "rm"], display_order = 4)]
    Delete {
        /// Server names; read from stdin if omitted
        ids: Vec<String>,
    },

    /// Organizational units of servers
    #[command(display_order = 5)]
    Unit {
        #[command(subcommand)]
        command: UnitCommands,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ldadm").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn suspend_aliases() {
        for alias in ["suspend", "lock", "ban", "disable"] {
            match parse(&["user", alias, "alice", "bob"]).command {
                Commands::User {
                    command: UserCommands::Suspend { ids },
                } => assert_eq!(ids, vec!["alice", "bob"]),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn ids_may_be_omitted() {
        match parse(&["project", "delete"]).command {
            Commands::Project {
                command: ProjectCommands::Delete { ids },
            } => assert!(ids.is_empty()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_unit_commands() {
        match parse(&["server", "unit", "assign", "dmz", "www1"]).command {
            Commands::Server {
                command: ServerCommands::Unit {
                    command: UnitCommands::Assign { unit, ids },
                },
            } => {
                assert_eq!(unit, "dmz");
                assert_eq!(ids, vec!["www1"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn loglevel_is_case_insensitive() {
        let cli = parse(&["--loglevel", "debug", "user", "list"]);
        assert_eq!(cli.log_level(), LogLevel::Debug);
        let cli = parse(&["user", "list", "-v"]);
        assert_eq!(cli.log_level(), LogLevel::Info);
        let cli = parse(&["-v", "--loglevel", "DEBUG", "user", "list"]);
        assert_eq!(cli.log_level(), LogLevel::Debug);
        assert_eq!(parse(&["user", "list"]).log_level(), LogLevel::Warning);
        assert!(Cli::try_parse_from(["ldadm", "--loglevel", "LOUD", "user", "list"]).is_err());
    }
}
