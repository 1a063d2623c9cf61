use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LdadmError {
    #[error("Configuration key not set: {path}")]
    Config { path: String },

    #[error("Configuration key {path} must be {expected}")]
    ConfigType { path: String, expected: &'static str },

    #[error("Config file '{}': {source}", path.display())]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config syntax error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("LDAP error: {0}")]
    Ldap(#[from] ldap3::LdapError),

    #[error("LDAP operation failed with code {code}: {message}")]
    Protocol { code: u32, message: String },

    #[error("Invalid DN: {0}")]
    InvalidDn(String),

    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),

    #[error("{kind} not found: {}", items.join(", "))]
    MissingObjects { kind: String, items: Vec<String> },

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Value already exists in {0}")]
    ValueExists(String),

    #[error("No such entry: {0}")]
    NoSuchObject(String),

    #[error("Entry has subordinates: {0}")]
    NotAllowedOnNonLeaf(String),

    #[error("Attribute not defined in schema: {0}")]
    UnknownAttribute(String),

    #[error("Object class not defined in schema: {0}")]
    UnknownObjectClass(String),

    #[error("{modifier}() is not a permitted modifier for {attribute}")]
    InvalidModifier { modifier: String, attribute: String },

    #[error("Invalid template for {attribute}: {message}")]
    InvalidTemplate { attribute: String, message: String },

    #[error("Templates depend on each other: {}", .0.join(" -> "))]
    CyclicTemplate(Vec<String>),

    #[error("Couldn't create a unique ID in {0} attempts")]
    Exhausted(usize),

    #[error("ID {id} already in use by a {subtree} entry")]
    NotUnique { id: String, subtree: String },

    #[error("{0}")]
    Hook(String),

    #[error("{0}")]
    Api(String),
}

impl LdadmError {
    pub fn config(path: impl Into<String>) -> Self {
        LdadmError::Config { path: path.into() }
    }

    pub fn missing(kind: impl Into<String>, items: impl IntoIterator<Item = String>) -> Self {
        LdadmError::MissingObjects {
            kind: kind.into(),
            items: items.into_iter().collect(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LdadmError>;
