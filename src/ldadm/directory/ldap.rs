use super::{Directory, Modification, SearchPage, SearchRequest};
use crate::error::{LdadmError, Result};
use crate::model::{AttributeMap, DirectoryEntry, SearchScope};
use crate::schema::{AttributeSchema, SchemaCatalog};
use ldap3::controls::{Control, ControlType, PagedResults};
use ldap3::{LdapConn, LdapConnSettings, LdapResult, Mod, Scope, SearchEntry};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

const SUCCESS: u32 = 0;
const ATTRIBUTE_OR_VALUE_EXISTS: u32 = 20;
const NO_SUCH_OBJECT: u32 = 32;
const NOT_ALLOWED_ON_NON_LEAF: u32 = 66;
const ENTRY_ALREADY_EXISTS: u32 = 68;

/// A bound synchronous session.
pub struct LdapDirectory {
    conn: LdapConn,
    catalog: Option<SchemaCatalog>,
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub uri: String,
    pub bind_dn: Option<String>,
    pub bind_password: Option<String>,
    pub timeout: Duration,
}

impl LdapDirectory {
    pub fn connect(options: &ConnectOptions) -> Result<Self> {
        debug!(uri = %options.uri, "connecting to directory");
        let settings = LdapConnSettings::new().set_conn_timeout(options.timeout);
        let mut conn = LdapConn::with_settings(settings, &options.uri)?;

        if let Some(bind_dn) = &options.bind_dn {
            debug!(bind_dn = %bind_dn, "performing simple bind");
            let password = options.bind_password.as_deref().unwrap_or("");
            let result = conn.simple_bind(bind_dn, password)?;
            check(result, bind_dn)?;
        }

        info!(uri = %options.uri, "directory connection established");
        Ok(Self {
            conn,
            catalog: None,
        })
    }

    /// Read and parse the subschema entry once per session.
    fn catalog(&mut self) -> Result<&SchemaCatalog> {
        if self.catalog.is_none() {
            let (entries, _) = self
                .conn
                .search("", Scope::Base, "(objectClass=*)", vec!["subschemaSubentry"])?
                .success()?;
            let schema_dn = entries
                .into_iter()
                .next()
                .map(SearchEntry::construct)
                .and_then(|e| e.attrs.get("subschemaSubentry").and_then(|v| v.first().cloned()))
                .unwrap_or_else(|| "cn=schema".to_string());
            debug!(schema_dn = %schema_dn, "reading server schema");

            let (entries, _) = self
                .conn
                .search(
                    &schema_dn,
                    Scope::Base,
                    "(objectClass=subschema)",
                    vec!["attributeTypes", "objectClasses"],
                )?
                .success()?;
            let entry = entries
                .into_iter()
                .next()
                .map(SearchEntry::construct)
                .ok_or_else(|| LdadmError::NoSuchObject(schema_dn.clone()))?;
            let values = |name: &str| -> Vec<String> {
                entry
                    .attrs
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(name))
                    .map(|(_, v)| v.clone())
                    .unwrap_or_default()
            };
            self.catalog = Some(SchemaCatalog::parse(
                values("attributeTypes"),
                values("objectClasses"),
            ));
        }
        self.catalog
            .as_ref()
            .ok_or_else(|| LdadmError::NoSuchObject("subschema".to_string()))
    }
}

impl Drop for LdapDirectory {
    fn drop(&mut self) {
        if let Err(e) = self.conn.unbind() {
            debug!(error = %e, "unbind failed");
        }
    }
}

/// Turn a non-success result code into the matching error.
fn check(result: LdapResult, dn: &str) -> Result<LdapResult> {
    match result.rc {
        SUCCESS => Ok(result),
        ATTRIBUTE_OR_VALUE_EXISTS => Err(LdadmError::ValueExists(dn.to_string())),
        NO_SUCH_OBJECT => Err(LdadmError::NoSuchObject(dn.to_string())),
        NOT_ALLOWED_ON_NON_LEAF => Err(LdadmError::NotAllowedOnNonLeaf(dn.to_string())),
        ENTRY_ALREADY_EXISTS => Err(LdadmError::AlreadyExists(dn.to_string())),
        code => Err(LdadmError::Protocol {
            code,
            message: if result.text.is_empty() {
                dn.to_string()
            } else {
                format!("{}: {}", dn, result.text)
            },
        }),
    }
}

fn value_set(values: &[String]) -> HashSet<&str> {
    values.iter().map(String::as_str).collect()
}

impl Directory for LdapDirectory {
    fn search_page(
        &mut self,
        request: &SearchRequest,
        cookie: Option<&[u8]>,
    ) -> Result<SearchPage> {
        let scope = match request.scope {
            SearchScope::Subtree => Scope::Subtree,
            SearchScope::OneLevel => Scope::OneLevel,
        };
        let filter = request.filter.to_string();
        let paging = PagedResults {
            size: request.page_size as i32,
            cookie: cookie.map(<[u8]>::to_vec).unwrap_or_default(),
        };
        debug!(base = %request.base, filter = %filter, "paged search");

        let result = self
            .conn
            .with_controls(paging)
            .search(&request.base, scope, &filter, request.attributes.clone())?;
        let (raw_entries, status) = (result.0, result.1);
        let status = check(status, &request.base)?;

        let mut next_cookie = None;
        for ctrl in &status.ctrls {
            if let Control(Some(ControlType::PagedResults), raw) = ctrl {
                let paged: PagedResults = raw.parse();
                if !paged.cookie.is_empty() {
                    next_cookie = Some(paged.cookie);
                }
            }
        }

        let entries = raw_entries
            .into_iter()
            .map(|raw| {
                let entry = SearchEntry::construct(raw);
                let attributes: AttributeMap = entry.attrs.into_iter().collect();
                DirectoryEntry::persisted(entry.dn, attributes)
            })
            .collect();

        Ok(SearchPage {
            entries,
            cookie: next_cookie,
        })
    }

    fn add(&mut self, dn: &str, attributes: &AttributeMap) -> Result<()> {
        let attrs: Vec<(&str, HashSet<&str>)> = attributes
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(name, values)| (name, value_set(values)))
            .collect();
        check(self.conn.add(dn, attrs)?, dn)?;
        info!(dn = %dn, "entry added");
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> Result<()> {
        check(self.conn.delete(dn)?, dn)?;
        info!(dn = %dn, "entry deleted");
        Ok(())
    }

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()> {
        let mods: Vec<Mod<&str>> = changes
            .iter()
            .map(|change| match change {
                Modification::Add(name, values) => Mod::Add(name.as_str(), value_set(values)),
                Modification::Replace(name, values) => {
                    Mod::Replace(name.as_str(), value_set(values))
                }
                Modification::Delete(name, values) => {
                    Mod::Delete(name.as_str(), value_set(values))
                }
            })
            .collect();
        check(self.conn.modify(dn, mods)?, dn)?;
        info!(dn = %dn, "entry modified");
        Ok(())
    }

    fn rename(&mut self, dn: &str, new_rdn: &str, new_superior: Option<&str>) -> Result<()> {
        check(self.conn.modifydn(dn, new_rdn, true, new_superior)?, dn)?;
        info!(dn = %dn, new_rdn = %new_rdn, new_superior = ?new_superior, "entry renamed");
        Ok(())
    }

    fn entry_schema(&mut self, object_classes: &[String]) -> Result<AttributeSchema> {
        self.catalog()?.entry_schema(object_classes)
    }
}
