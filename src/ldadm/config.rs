//! # Configuration
//!
//! ldadm reads one YAML file, `ldadm.yml`. It is looked up in this order:
//!
//! 1. the `--config` command line option,
//! 2. the `LDADM_CONFIG` environment variable,
//! 3. `ldadm.yml` in the platform config directory (`$XDG_CONFIG_HOME`, falling
//!    back to `~/.config` on Linux).
//!
//! Keys are read on demand, so a command only fails on the sections it actually
//! uses. A missing key, or one set to null, is reported with its dotted path
//! (`user.attr.uid`). The full layout:
//!
//! ```yaml
//! ldap:
//!   uri: ldaps://ldap.example.org
//!   binddn: cn=admin,dc=example,dc=org   # optional
//!   bindpw: secret                       # optional
//!   timeout: 30                          # seconds, optional
//!   paged_search_size: 500               # optional
//! user:
//!   objectclass: [inetOrgPerson, posixAccount]
//!   base: { active: "ou=people,...", suspended: "ou=suspended,..." }
//!   attr:
//!     uid: uid
//!     nuid: uidNumber
//!     passwd: userPassword
//!     templates: { homeDirectory: "/home/{uid}" }
//!     modify: { uid: lower }
//!   nuid: { min: 10000, max: 60000 }
//!   message_on_create: "Created {uid}"
//! unit:                                  # optional
//!   attr: { templates: {}, modify: {} }
//! project:
//!   objectclass: [project]
//!   base: "ou=projects,..."
//!   attr: { id: cn, manager: manager, member: member, server: seeAlso }
//! server:
//!   objectclass: [device]
//!   base: "ou=servers,..."
//!   attr: { id: cn }
//! ```

use crate::directory::ldap::ConnectOptions;
use crate::error::{LdadmError, Result};
use crate::mapping::DEFAULT_PAGE_SIZE;
use crate::resolver::Template;
use directories::BaseDirs;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CONFIG_FILENAME: &str = "ldadm.yml";
pub const CONFIG_ENV: &str = "LDADM_CONFIG";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Pick the config file: explicit path, then `$LDADM_CONFIG`, then the user
/// config directory.
pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    BaseDirs::new()
        .map(|dirs| dirs.config_dir().join(CONFIG_FILENAME))
        .ok_or_else(|| LdadmError::Api("Could not determine config dir".to_string()))
}

/// A subtree of the configuration that knows where it sits.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    path: String,
    value: Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTemplate {
    Single(String),
    List(Vec<String>),
}

/// Inclusive bounds for allocated numeric ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub min: u64,
    pub max: u64,
}

impl ConfigNode {
    pub fn root(value: Value) -> Self {
        Self {
            path: String::new(),
            value,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    /// The value at `key`, a dot-separated path relative to this node.
    pub fn node(&self, key: &str) -> Result<ConfigNode> {
        let mut node = self.clone();
        for part in key.split('.') {
            let path = node.child_path(part);
            let value = match node.value.get(part) {
                Some(Value::Null) | None => return Err(LdadmError::config(path)),
                Some(value) => value.clone(),
            };
            node = ConfigNode { path, value };
        }
        Ok(node)
    }

    /// Like [`ConfigNode::node`], but a missing key is `None`.
    pub fn optional(&self, key: &str) -> Result<Option<ConfigNode>> {
        match self.node(key) {
            Ok(node) => Ok(Some(node)),
            Err(LdadmError::Config { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn type_error(&self, expected: &'static str) -> LdadmError {
        LdadmError::ConfigType {
            path: self.path.clone(),
            expected,
        }
    }

    fn scalar(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn string(&self, key: &str) -> Result<String> {
        let node = self.node(key)?;
        node.scalar().ok_or_else(|| node.type_error("a string"))
    }

    pub fn optional_string(&self, key: &str) -> Result<Option<String>> {
        match self.optional(key)? {
            Some(node) => node.scalar().map(Some).ok_or_else(|| node.type_error("a string")),
            None => Ok(None),
        }
    }

    pub fn number(&self, key: &str) -> Result<u64> {
        let node = self.node(key)?;
        node.scalar()
            .and_then(|s| s.trim().parse().ok())
            .ok_or_else(|| node.type_error("a non-negative integer"))
    }

    pub fn optional_number(&self, key: &str) -> Result<Option<u64>> {
        match self.optional(key)? {
            Some(_) => self.number(key).map(Some),
            None => Ok(None),
        }
    }

    /// A scalar or a sequence of scalars.
    pub fn list(&self, key: &str) -> Result<Vec<String>> {
        let node = self.node(key)?;
        match &node.value {
            Value::Sequence(items) => items
                .iter()
                .map(|item| {
                    ConfigNode {
                        path: node.path.clone(),
                        value: item.clone(),
                    }
                    .scalar()
                    .ok_or_else(|| node.type_error("a list of strings"))
                })
                .collect(),
            _ => node
                .scalar()
                .map(|s| vec![s])
                .ok_or_else(|| node.type_error("a string or a list of strings")),
        }
    }

    fn deserialize<T: serde::de::DeserializeOwned>(&self, expected: &'static str) -> Result<T> {
        serde_yaml::from_value(self.value.clone()).map_err(|e| {
            debug!(path = %self.path, error = %e, "config value rejected");
            self.type_error(expected)
        })
    }

    /// `attr.templates`, `attr.modify` and `message_on_create` of an object node.
    pub fn entry_settings(&self) -> Result<EntrySettings> {
        let mut settings = EntrySettings::default();
        if let Some(node) = self.optional("attr.templates")? {
            let mapping: serde_yaml::Mapping =
                node.deserialize("a mapping of attribute names to templates")?;
            for (key, value) in mapping {
                let name = ConfigNode {
                    path: node.path.clone(),
                    value: key,
                }
                .scalar()
                .ok_or_else(|| node.type_error("keyed by attribute names"))?;
                let entry = ConfigNode {
                    path: node.child_path(&name),
                    value,
                };
                let template = match entry.deserialize("a string or a list of strings")? {
                    RawTemplate::Single(text) => Template::Single(text),
                    RawTemplate::List(texts) => Template::List(texts),
                };
                settings.templates.push((name, template));
            }
        }
        if let Some(node) = self.optional("attr.modify")? {
            let modifiers: BTreeMap<String, String> =
                node.deserialize("a mapping of attribute names to modifiers")?;
            settings.modifiers = modifiers.into_iter().collect();
        }
        settings.message = self.optional_string("message_on_create")?;
        Ok(settings)
    }
}

/// How new entries of one kind are pre-filled.
#[derive(Debug, Clone, Default)]
pub struct EntrySettings {
    pub templates: Vec<(String, Template)>,
    pub modifiers: Vec<(String, String)>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LdapSettings {
    pub connect: ConnectOptions,
    pub page_size: usize,
}

#[derive(Debug, Clone)]
pub struct UserSettings {
    pub object_classes: Vec<String>,
    pub active_base: String,
    pub suspended_base: String,
    pub uid_attr: String,
    pub nuid_attr: String,
    pub passwd_attr: String,
    pub nuid: IdRange,
    pub entry: EntrySettings,
}

#[derive(Debug, Clone)]
pub struct ProjectSettings {
    pub object_classes: Vec<String>,
    pub base: String,
    pub id_attr: String,
    pub manager_attr: String,
    pub member_attr: String,
    pub server_attr: String,
    pub entry: EntrySettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub object_classes: Vec<String>,
    pub base: String,
    pub id_attr: String,
    pub entry: EntrySettings,
}

/// The loaded configuration file.
#[derive(Debug, Clone)]
pub struct LdadmConfig {
    root: ConfigNode,
}

impl LdadmConfig {
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading config");
        let text = fs::read_to_string(path).map_err(|source| LdadmError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text)?;
        Ok(Self {
            root: ConfigNode::root(value),
        })
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    pub fn ldap(&self) -> Result<LdapSettings> {
        let node = self.root.node("ldap")?;
        let timeout = node.optional_number("timeout")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let page_size = node
            .optional_number("paged_search_size")?
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        Ok(LdapSettings {
            connect: ConnectOptions {
                uri: node.string("uri")?,
                bind_dn: node.optional_string("binddn")?,
                bind_password: node.optional_string("bindpw")?,
                timeout: Duration::from_secs(timeout),
            },
            page_size: page_size.max(1),
        })
    }

    pub fn user(&self) -> Result<UserSettings> {
        let node = self.root.node("user")?;
        Ok(UserSettings {
            object_classes: node.list("objectclass")?,
            active_base: node.string("base.active")?,
            suspended_base: node.string("base.suspended")?,
            uid_attr: node.string("attr.uid")?,
            nuid_attr: node.string("attr.nuid")?,
            passwd_attr: node.string("attr.passwd")?,
            nuid: IdRange {
                min: node.number("nuid.min")?,
                max: node.number("nuid.max")?,
            },
            entry: node.entry_settings()?,
        })
    }

    pub fn project(&self) -> Result<ProjectSettings> {
        let node = self.root.node("project")?;
        Ok(ProjectSettings {
            object_classes: node.list("objectclass")?,
            base: node.string("base")?,
            id_attr: node.string("attr.id")?,
            manager_attr: node.string("attr.manager")?,
            member_attr: node.string("attr.member")?,
            server_attr: node.string("attr.server")?,
            entry: node.entry_settings()?,
        })
    }

    pub fn server(&self) -> Result<ServerSettings> {
        let node = self.root.node("server")?;
        Ok(ServerSettings {
            object_classes: node.list("objectclass")?,
            base: node.string("base")?,
            id_attr: node.string("attr.id")?,
            entry: node.entry_settings()?,
        })
    }

    /// Units are optional; without a `unit` node they get no templates.
    pub fn unit(&self) -> Result<EntrySettings> {
        match self.root.optional("unit")? {
            Some(node) => node.entry_settings(),
            None => Ok(EntrySettings::default()),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_typed_sections() {
        let config = fixtures::config();
        let ldap = config.ldap().unwrap();
        assert_eq!(ldap.connect.uri, "ldap://localhost");
        assert_eq!(ldap.connect.bind_dn, None);
        assert_eq!(ldap.connect.timeout, Duration::from_secs(30));
        assert_eq!(ldap.page_size, 2);

        let user = config.user().unwrap();
        assert_eq!(user.object_classes.len(), 5);
        assert_eq!(user.nuid, IdRange { min: 2000, max: 2999 });
        assert_eq!(user.entry.templates.len(), 3);
        assert_eq!(user.entry.modifiers, vec![("uid".to_string(), "lower".to_string())]);
        assert_eq!(user.entry.message.as_deref(), Some("Welcome, {givenName}!"));

        let project = config.project().unwrap();
        assert_eq!(project.server_attr, "seeAlso");
        assert!(project.entry.templates.is_empty());
    }

    #[test]
    fn missing_key_reports_dotted_path() {
        let config = LdadmConfig::parse("user:\n  attr:\n    nuid: uidNumber\n").unwrap();
        match config.root().string("user.attr.uid") {
            Err(LdadmError::Config { path }) => assert_eq!(path, "user.attr.uid"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            config.user(),
            Err(LdadmError::Config { path }) if path == "user.objectclass"
        ));
    }

    #[test]
    fn null_counts_as_missing() {
        let config = LdadmConfig::parse("ldap:\n  uri:\n").unwrap();
        assert!(matches!(
            config.ldap(),
            Err(LdadmError::Config { path }) if path == "ldap.uri"
        ));
    }

    #[test]
    fn list_templates_and_wrong_types() {
        let config = LdadmConfig::parse(
            "server:\n  objectclass: device\n  base: ou=s\n  attr:\n    id: cn\n    templates:\n      host: [\"{cn}.example.org\", \"{cn}\"]\n",
        )
        .unwrap();
        let server = config.server().unwrap();
        assert_eq!(server.object_classes, vec!["device"]);
        assert_eq!(
            server.entry.templates,
            vec![(
                "host".to_string(),
                Template::List(vec!["{cn}.example.org".into(), "{cn}".into()])
            )]
        );

        let config = LdadmConfig::parse("user:\n  nuid:\n    min: lots\n").unwrap();
        assert!(matches!(
            config.root().number("user.nuid.min"),
            Err(LdadmError::ConfigType { path, .. }) if path == "user.nuid.min"
        ));
    }

    #[test]
    fn units_are_optional() {
        let settings = fixtures::config().unit().unwrap();
        assert!(settings.templates.is_empty());
        assert!(settings.message.is_none());
    }

    #[test]
    fn load_reports_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yml");
        let err = LdadmConfig::load(&missing).unwrap_err();
        assert!(err.to_string().starts_with("Config file '"));

        let path = dir.path().join(CONFIG_FILENAME);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(fixtures::CONFIG.as_bytes()).unwrap();
        assert!(LdadmConfig::load(&path).unwrap().user().is_ok());
    }

    #[test]
    fn explicit_path_wins() {
        let path = Path::new("/tmp/custom.yml");
        assert_eq!(locate(Some(path)).unwrap(), path);
    }
}
