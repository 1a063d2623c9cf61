use crate::model::DirectoryEntry;

pub mod helpers;
pub mod project;
pub mod server;
pub mod unit;
pub mod user;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct CmdMessage {
    pub level: MessageLevel,
    pub content: String,
}

impl CmdMessage {
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Info,
            content: content.into(),
        }
    }

    pub fn success(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Success,
            content: content.into(),
        }
    }

    pub fn warning(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Warning,
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            level: MessageLevel::Error,
            content: content.into(),
        }
    }
}

/// Receives listed ids and entries as the directory yields them.
///
/// Listing commands push every item here before a trailing error (such as ids
/// that were not found) is returned, so nothing found is lost.
pub trait Listing {
    fn name(&mut self, name: String);
    fn entry(&mut self, entry: DirectoryEntry);
}

/// A listing kept in memory.
#[derive(Debug, Default)]
pub struct Listed {
    pub names: Vec<String>,
    pub entries: Vec<DirectoryEntry>,
}

impl Listing for Listed {
    fn name(&mut self, name: String) {
        self.names.push(name);
    }

    fn entry(&mut self, entry: DirectoryEntry) {
        self.entries.push(entry);
    }
}

#[derive(Debug, Default)]
pub struct CmdResult {
    /// DNs written, moved or deleted.
    pub affected_dns: Vec<String>,
    /// A generated password to hand to the operator.
    pub secret: Option<String>,
    pub messages: Vec<CmdMessage>,
}

impl CmdResult {
    pub fn add_message(&mut self, message: CmdMessage) {
        self.messages.push(message);
    }

    pub fn with_affected_dns(mut self, dns: Vec<String>) -> Self {
        self.affected_dns = dns;
        self
    }

    pub fn with_secret(mut self, secret: String) -> Self {
        self.secret = Some(secret);
        self
    }
}
