use super::{Directory, Modification, SearchPage, SearchRequest};
use crate::dn::{normalize_dn, parent_dn, parse_rdn, split_dn};
use crate::error::{LdadmError, Result};
use crate::model::{AttributeMap, DirectoryEntry, SearchScope};
use crate::schema::{AttributeSchema, SchemaCatalog};
use std::collections::BTreeMap;

/// Entries held in a map keyed by normalized DN. Mirrors the server-side checks
/// ldadm depends on: parents must exist, names must be free, only leaves can be
/// deleted, and adding a value twice is refused.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: BTreeMap<String, DirectoryEntry>,
    catalog: SchemaCatalog,
    search_calls: usize,
}

fn normalize(dn: &str) -> Result<String> {
    if dn.is_empty() {
        Ok(String::new())
    } else {
        normalize_dn(dn)
    }
}

fn in_scope(key: &str, base: &str, scope: SearchScope) -> bool {
    let below = if base.is_empty() {
        Some(key)
    } else if key == base {
        return scope == SearchScope::Subtree;
    } else {
        key.strip_suffix(base).and_then(|p| p.strip_suffix(','))
    };
    match (below, scope) {
        (None, _) => false,
        (Some(_), SearchScope::Subtree) => true,
        // one RDN between the entry and the base
        (Some(prefix), SearchScope::OneLevel) => split_dn(prefix).is_ok_and(|r| r.len() == 1),
    }
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(mut self, catalog: SchemaCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Store an entry without any of the checks `add` performs. Used to create
    /// the suffix entries a tree hangs from.
    pub fn seed(&mut self, dn: &str, attributes: AttributeMap) -> Result<()> {
        self.entries
            .insert(normalize(dn)?, DirectoryEntry::persisted(dn, attributes));
        Ok(())
    }

    pub fn entry(&self, dn: &str) -> Option<&DirectoryEntry> {
        normalize(dn).ok().and_then(|key| self.entries.get(&key))
    }

    pub fn contains(&self, dn: &str) -> bool {
        self.entry(dn).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of pages served so far.
    pub fn search_calls(&self) -> usize {
        self.search_calls
    }

    fn existing_key(&self, dn: &str) -> Result<String> {
        let key = normalize(dn)?;
        if self.entries.contains_key(&key) {
            Ok(key)
        } else {
            Err(LdadmError::NoSuchObject(dn.to_string()))
        }
    }

    fn has_children(&self, key: &str) -> bool {
        self.entries
            .keys()
            .any(|k| in_scope(k, key, SearchScope::OneLevel))
    }
}

fn project(attributes: &AttributeMap, requested: &[String]) -> AttributeMap {
    if requested.iter().any(|a| a == "*") {
        return attributes.clone();
    }
    attributes
        .iter()
        .filter(|(name, _)| requested.iter().any(|r| r.eq_ignore_ascii_case(name)))
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect()
}

impl Directory for InMemoryDirectory {
    fn search_page(
        &mut self,
        request: &SearchRequest,
        cookie: Option<&[u8]>,
    ) -> Result<SearchPage> {
        self.search_calls += 1;
        let base = normalize(&request.base)?;
        if !base.is_empty() && !self.entries.contains_key(&base) {
            return Err(LdadmError::NoSuchObject(request.base.clone()));
        }

        let offset = match cookie {
            Some(bytes) => std::str::from_utf8(bytes)
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .ok_or_else(|| LdadmError::Protocol {
                    code: 2,
                    message: "invalid paged results cookie".to_string(),
                })?,
            None => 0,
        };

        let matching: Vec<&DirectoryEntry> = self
            .entries
            .iter()
            .filter(|(key, _)| in_scope(key, &base, request.scope))
            .filter(|(_, entry)| request.filter.matches(&entry.attributes))
            .map(|(_, entry)| entry)
            .collect();

        let size = if request.page_size == 0 {
            matching.len()
        } else {
            request.page_size
        };
        let end = (offset + size).min(matching.len());
        let entries = matching[offset.min(end)..end]
            .iter()
            .map(|entry| {
                DirectoryEntry::persisted(entry.dn(), project(&entry.attributes, &request.attributes))
            })
            .collect();
        let cookie = (end < matching.len()).then(|| end.to_string().into_bytes());

        Ok(SearchPage { entries, cookie })
    }

    fn add(&mut self, dn: &str, attributes: &AttributeMap) -> Result<()> {
        let key = normalize(dn)?;
        if self.entries.contains_key(&key) {
            return Err(LdadmError::AlreadyExists(dn.to_string()));
        }
        let parent = parent_dn(dn)?;
        if !parent.is_empty() {
            self.existing_key(&parent)?;
        }

        let mut attributes = attributes.clone();
        for component in parse_rdn(split_dn(dn)?[0])? {
            attributes.add_values(component.attribute.clone(), vec![component.value()?]);
        }
        self.entries
            .insert(key, DirectoryEntry::persisted(dn, attributes));
        Ok(())
    }

    fn delete(&mut self, dn: &str) -> Result<()> {
        let key = self.existing_key(dn)?;
        if self.has_children(&key) {
            return Err(LdadmError::NotAllowedOnNonLeaf(dn.to_string()));
        }
        self.entries.remove(&key);
        Ok(())
    }

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()> {
        let key = self.existing_key(dn)?;
        let mut attributes = self.entries[&key].attributes.clone();

        for change in changes {
            match change {
                Modification::Add(name, values) => {
                    let current = attributes.get(name).unwrap_or(&[]);
                    if values.iter().any(|v| current.contains(v)) {
                        return Err(LdadmError::ValueExists(name.clone()));
                    }
                    attributes.add_values(name.clone(), values.clone());
                }
                Modification::Replace(name, values) => {
                    if values.is_empty() {
                        attributes.remove(name);
                    } else {
                        attributes.set(name.clone(), values.clone());
                    }
                }
                Modification::Delete(name, values) => {
                    let current = attributes.get(name).map(<[String]>::to_vec).ok_or_else(|| {
                        LdadmError::Protocol {
                            code: 16,
                            message: format!("no such attribute: {}", name),
                        }
                    })?;
                    let remaining: Vec<String> = if values.is_empty() {
                        Vec::new()
                    } else {
                        if let Some(missing) = values.iter().find(|v| !current.contains(v)) {
                            return Err(LdadmError::Protocol {
                                code: 16,
                                message: format!("{} has no value {}", name, missing),
                            });
                        }
                        current.into_iter().filter(|v| !values.contains(v)).collect()
                    };
                    if remaining.is_empty() {
                        attributes.remove(name);
                    } else {
                        attributes.set(name.clone(), remaining);
                    }
                }
            }
        }

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.attributes = attributes;
        }
        Ok(())
    }

    fn rename(&mut self, dn: &str, new_rdn: &str, new_superior: Option<&str>) -> Result<()> {
        let old_key = self.existing_key(dn)?;
        let parent = match new_superior {
            Some(superior) => {
                if !superior.is_empty() {
                    self.existing_key(superior)?;
                }
                superior.to_string()
            }
            None => parent_dn(dn)?,
        };
        let new_dn = crate::dn::build_dn(new_rdn, &parent);
        let new_key = normalize(&new_dn)?;
        if new_key != old_key && self.entries.contains_key(&new_key) {
            return Err(LdadmError::AlreadyExists(new_dn));
        }

        // RDN values: old ones are dropped, new ones added
        let mut entry = self
            .entries
            .remove(&old_key)
            .ok_or_else(|| LdadmError::NoSuchObject(dn.to_string()))?;
        for component in parse_rdn(split_dn(dn)?[0])? {
            let value = component.value()?;
            if let Some(values) = entry.attributes.get(&component.attribute) {
                let remaining: Vec<String> =
                    values.iter().filter(|v| **v != value).cloned().collect();
                if remaining.is_empty() {
                    entry.attributes.remove(&component.attribute);
                } else {
                    entry.attributes.set(component.attribute.clone(), remaining);
                }
            }
        }
        for component in parse_rdn(new_rdn)? {
            entry
                .attributes
                .add_values(component.attribute.clone(), vec![component.value()?]);
        }
        entry.dn = Some(new_dn.clone());
        self.entries.insert(new_key, entry);

        // Subordinates follow their parent.
        let old_depth = split_dn(dn)?.len();
        let children: Vec<String> = self
            .entries
            .keys()
            .filter(|k| in_scope(k, &old_key, SearchScope::Subtree) && **k != old_key)
            .cloned()
            .collect();
        for child_key in children {
            if let Some(mut child) = self.entries.remove(&child_key) {
                let child_dn = child.dn().to_string();
                let rdns = split_dn(&child_dn)?;
                let prefix = rdns[..rdns.len() - old_depth].join(",");
                let moved = crate::dn::build_dn(&prefix, &new_dn);
                child.dn = Some(moved.clone());
                self.entries.insert(normalize(&moved)?, child);
            }
        }
        Ok(())
    }

    fn entry_schema(&mut self, object_classes: &[String]) -> Result<AttributeSchema> {
        self.catalog.entry_schema(object_classes)
    }
}
