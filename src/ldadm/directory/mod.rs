//! # Directory Layer
//!
//! The [`Directory`] trait is the only place ldadm talks to a server. Everything
//! above it (mappings, the resolver, the ID allocator, commands) is written against
//! the trait, so the whole core can be exercised without a network.
//!
//! ## Implementations
//!
//! - [`ldap::LdapDirectory`]: a bound `ldap3` session. Result codes that callers
//!   care about are turned into typed errors (`AlreadyExists`, `NoSuchObject`,
//!   `NotAllowedOnNonLeaf`, `ValueExists`); anything else becomes `Protocol`.
//! - [`memory::InMemoryDirectory`]: a sorted map of entries with the same error
//!   behaviour, used by tests.
//!
//! ## Paging
//!
//! Searches are paged. An implementation returns one [`SearchPage`] per call,
//! carrying an opaque cookie when more results remain. [`PagedSearch`] turns that
//! into a lazy iterator that fetches the next page only after the buffered one has
//! been drained.

use crate::error::Result;
use crate::model::{AttributeMap, DirectoryEntry, SearchScope};
use crate::query::Filter;
use crate::schema::AttributeSchema;
use std::collections::VecDeque;

pub mod ldap;
pub mod memory;

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: Filter,
    /// Attribute names to return; `*` for all user attributes.
    pub attributes: Vec<String>,
    pub page_size: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub entries: Vec<DirectoryEntry>,
    /// Present when the server has more results.
    pub cookie: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modification {
    Add(String, Vec<String>),
    Replace(String, Vec<String>),
    /// Remove the listed values, or the whole attribute when the list is empty.
    Delete(String, Vec<String>),
}

/// A connected directory session.
pub trait Directory {
    /// Fetch one page of results, starting a new search when `cookie` is `None`.
    fn search_page(&mut self, request: &SearchRequest, cookie: Option<&[u8]>)
        -> Result<SearchPage>;

    fn add(&mut self, dn: &str, attributes: &AttributeMap) -> Result<()>;

    fn delete(&mut self, dn: &str) -> Result<()>;

    fn modify(&mut self, dn: &str, changes: &[Modification]) -> Result<()>;

    /// Change the leaf RDN and optionally move the entry under `new_superior`.
    /// The old RDN value is removed from the entry.
    fn rename(&mut self, dn: &str, new_rdn: &str, new_superior: Option<&str>) -> Result<()>;

    /// Attributes permitted for entries with these object classes.
    fn entry_schema(&mut self, object_classes: &[String]) -> Result<AttributeSchema>;
}

/// Lazy iterator over every entry a paged search returns.
pub struct PagedSearch<'d, D: Directory> {
    dir: &'d mut D,
    request: SearchRequest,
    buffer: VecDeque<DirectoryEntry>,
    cookie: Option<Vec<u8>>,
    started: bool,
    failed: bool,
}

impl<'d, D: Directory> PagedSearch<'d, D> {
    pub fn new(dir: &'d mut D, request: SearchRequest) -> Self {
        Self {
            dir,
            request,
            buffer: VecDeque::new(),
            cookie: None,
            started: false,
            failed: false,
        }
    }

    fn exhausted(&self) -> bool {
        self.started && self.cookie.is_none()
    }
}

impl<D: Directory> Iterator for PagedSearch<'_, D> {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.buffer.pop_front() {
                return Some(Ok(entry));
            }
            if self.failed || self.exhausted() {
                return None;
            }
            let page = self.dir.search_page(&self.request, self.cookie.as_deref());
            self.started = true;
            match page {
                Ok(page) => {
                    tracing::debug!(
                        base = %self.request.base,
                        filter = %self.request.filter,
                        count = page.entries.len(),
                        "fetched search page"
                    );
                    self.buffer.extend(page.entries);
                    self.cookie = page.cookie.filter(|c| !c.is_empty());
                }
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
