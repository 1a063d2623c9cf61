//! # Entry Mapping
//!
//! [`EntryMapping`] is a lazy, selectable view over one subtree of the directory:
//! "the users under `ou=people`", "the projects under `ou=projects`". It owns no
//! connection; every operation borrows the [`Directory`] for as long as it needs it.
//!
//! ## Selections
//!
//! A mapping starts [`Selection::Unbounded`]. Selecting a free-form filter or a set
//! of ids narrows every later operation. Nothing touches the network until an
//! operation runs.
//!
//! With [`Selection::Ids`] every operation promises to account for every id: once
//! the results are drained, ids that never showed up are reported as
//! `MissingObjects`. For the iterators that error is the last item; for bulk writes
//! it is returned after the found entries have been processed. Nothing is rolled
//! back.
//!
//! ## Laziness
//!
//! [`EntryMapping::keys`], [`EntryMapping::dns`] and [`EntryMapping::values`] run a
//! single paged search and pull pages only as the caller consumes them.

use crate::directory::{Directory, PagedSearch, SearchRequest};
use crate::dn::{build_dn, build_rdn, leaf_rdn, normalize_dn, parse_rdn, rename_rdn};
use crate::error::{LdadmError, Result};
use crate::model::{AttributeMap, DirectoryEntry, Projection, SearchScope};
use crate::query::{select_query, Filter};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub const DEFAULT_PAGE_SIZE: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Unbounded,
    /// An RFC 4515 filter as typed by the user.
    Filter(String),
    Ids(BTreeSet<String>),
}

impl Selection {
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Selection::Ids(ids.into_iter().map(Into::into).collect())
    }
}

/// Where [`EntryMapping::move_to`] puts entries.
#[derive(Debug, Clone, Copy)]
pub enum Destination<'a> {
    Base(&'a str),
    Mapping(&'a EntryMapping),
}

impl Destination<'_> {
    fn base(&self) -> &str {
        match self {
            Destination::Base(dn) => dn,
            Destination::Mapping(mapping) => mapping.base(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryMapping {
    name: String,
    base: String,
    primary: String,
    object_classes: Vec<String>,
    scope: SearchScope,
    projection: Projection,
    page_size: usize,
    selection: Selection,
}

impl EntryMapping {
    /// `name` is the plural used in messages ("Users").
    pub fn new(name: impl Into<String>, base: impl Into<String>, primary: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: base.into(),
            primary: primary.into(),
            object_classes: Vec::new(),
            scope: SearchScope::Subtree,
            projection: Projection::None,
            page_size: DEFAULT_PAGE_SIZE,
            selection: Selection::Unbounded,
        }
    }

    pub fn with_object_classes<I, S>(mut self, classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.object_classes = classes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_scope(mut self, scope: SearchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Same subtree, keyed on another attribute.
    pub fn with_primary(mut self, primary: impl Into<String>) -> Self {
        self.primary = primary.into();
        self
    }

    /// Same mapping rooted somewhere else.
    pub fn rebased(&self, base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            selection: Selection::Unbounded,
            ..self.clone()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn primary_attribute(&self) -> &str {
        &self.primary
    }

    pub fn object_classes(&self) -> &[String] {
        &self.object_classes
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn select(&mut self, selection: Selection) -> &mut Self {
        self.selection = selection;
        self
    }

    fn selected(&self, selection: Selection) -> Self {
        Self {
            selection,
            ..self.clone()
        }
    }

    /// Ids the caller expects to see, without empty strings; `None` when the
    /// selection is not id-based.
    fn expected_ids(&self) -> Option<BTreeSet<String>> {
        match &self.selection {
            Selection::Ids(ids) => Some(ids.iter().filter(|id| !id.is_empty()).cloned().collect()),
            _ => None,
        }
    }

    /// The search this mapping would issue, or `None` when an id selection is
    /// empty and there is nothing to ask for.
    fn request(&self, projection: &Projection) -> Result<Option<SearchRequest>> {
        let selection = match &self.selection {
            Selection::Unbounded => None,
            Selection::Filter(text) => Some(Filter::parse(text)?),
            Selection::Ids(ids) => match select_query(&self.primary, ids) {
                Some(filter) => Some(filter),
                None => return Ok(None),
            },
        };
        let filter = match (Filter::object_classes(&self.object_classes), selection) {
            (Some(classes), Some(selected)) => classes.and(selected),
            (Some(classes), None) => classes,
            (None, Some(selected)) => selected,
            (None, None) => Filter::Present("objectClass".to_string()),
        };
        Ok(Some(SearchRequest {
            base: self.base.clone(),
            scope: self.scope,
            filter,
            attributes: projection.requested(&self.primary),
            page_size: self.page_size,
        }))
    }

    fn entries<'d, D: Directory>(
        &self,
        dir: &'d mut D,
        projection: &Projection,
    ) -> Result<Entries<'d, D>> {
        let request = self.request(projection)?;
        if request.is_none() {
            info!("No {} selected", self.name.to_lowercase());
        }
        Ok(Entries {
            search: request.map(|r| PagedSearch::new(dir, r)),
            kind: self.name.clone(),
            primary: self.primary.clone(),
            base_key: normalize_dn(&self.base).unwrap_or_else(|_| self.base.to_lowercase()),
            expected: self.expected_ids(),
            found: BTreeSet::new(),
            done: false,
        })
    }

    /// Full entries, with the attributes named by the mapping's projection.
    pub fn values<'d, D: Directory>(&self, dir: &'d mut D) -> Result<Entries<'d, D>> {
        self.entries(dir, &self.projection)
    }

    /// Scalar ids of the selected entries.
    pub fn keys<'d, D: Directory>(
        &self,
        dir: &'d mut D,
    ) -> Result<impl Iterator<Item = Result<String>> + 'd> {
        let primary = self.primary.clone();
        Ok(self
            .entries(dir, &Projection::None)?
            .map(move |entry| entry.map(|e| entry_name(&e, &primary))))
    }

    pub fn dns<'d, D: Directory>(
        &self,
        dir: &'d mut D,
    ) -> Result<impl Iterator<Item = Result<String>> + 'd> {
        Ok(self
            .entries(dir, &Projection::None)?
            .map(|entry| entry.map(|e| e.dn().to_string())))
    }

    /// The single entry named `id`.
    pub fn get<D: Directory>(&self, dir: &mut D, id: &str) -> Result<DirectoryEntry> {
        let single = self.selected(Selection::ids([id]));
        let mut entries = single.values(dir)?;
        match entries.next() {
            Some(entry) => entry,
            None => Err(LdadmError::missing(&self.name, vec![id.to_string()])),
        }
    }

    /// Resolve ids to DNs; any unknown id is an error.
    pub fn dns_of<D, I, S>(&self, dir: &mut D, ids: I) -> Result<Vec<String>>
    where
        D: Directory,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected(Selection::ids(ids)).dns(dir)?.collect()
    }

    /// Create an entry named after its primary attribute. Returns the new DN.
    pub fn insert<D: Directory>(&self, dir: &mut D, attributes: &AttributeMap) -> Result<String> {
        let id = attributes
            .first(&self.primary)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                LdadmError::Api(format!("New entry has no value for {}", self.primary))
            })?;
        let dn = build_dn(&build_rdn(&self.primary, id), &self.base);
        debug!(dn = %dn, "inserting entry");
        dir.add(&dn, attributes)?;
        Ok(dn)
    }

    /// Run the selection once, keeping the completeness error for later.
    fn materialize<D: Directory>(
        &self,
        dir: &mut D,
    ) -> Result<(Vec<DirectoryEntry>, Option<LdadmError>)> {
        let mut found = Vec::new();
        for entry in self.entries(dir, &Projection::None)? {
            match entry {
                Ok(entry) => found.push(entry),
                Err(missing @ LdadmError::MissingObjects { .. }) => return Ok((found, Some(missing))),
                Err(e) => return Err(e),
            }
        }
        Ok((found, None))
    }

    /// Delete every selected entry. Returns the deleted DNs.
    pub fn delete<D: Directory>(&self, dir: &mut D) -> Result<Vec<String>> {
        let (entries, missing) = self.materialize(dir)?;
        let mut deleted = Vec::new();
        for entry in entries {
            dir.delete(entry.dn())?;
            deleted.push(entry.dn().to_string());
        }
        match missing {
            Some(e) => Err(e),
            None => Ok(deleted),
        }
    }

    /// Move every selected entry under the destination, keeping its RDN. Returns
    /// the new DNs.
    pub fn move_to<D: Directory>(&self, dir: &mut D, destination: Destination<'_>) -> Result<Vec<String>> {
        let new_superior = destination.base().to_string();
        let (entries, missing) = self.materialize(dir)?;
        let mut moved = Vec::new();
        for entry in entries {
            let rdn = leaf_rdn(entry.dn())?.to_string();
            dir.rename(entry.dn(), &rdn, Some(&new_superior))?;
            moved.push(build_dn(&rdn, &new_superior));
        }
        match missing {
            Some(e) => Err(e),
            None => Ok(moved),
        }
    }

    /// Give the entry `old_id` the primary value `new_id`, keeping every other RDN
    /// component. Returns the new DN.
    pub fn rename<D: Directory>(&self, dir: &mut D, old_id: &str, new_id: &str) -> Result<String> {
        let entry = self.get(dir, old_id)?;
        let new_rdn = rename_rdn(entry.dn(), &self.primary, new_id)?;
        dir.rename(entry.dn(), &new_rdn, None)?;
        let parent = crate::dn::parent_dn(entry.dn())?;
        Ok(build_dn(&new_rdn, &parent))
    }

    /// True when the selection matches nothing. Stops at the first entry.
    pub fn is_empty<D: Directory>(&self, dir: &mut D) -> Result<bool> {
        match self.entries(dir, &Projection::None)?.next() {
            None | Some(Err(LdadmError::MissingObjects { .. })) => Ok(true),
            Some(Ok(_)) => Ok(false),
            Some(Err(e)) => Err(e),
        }
    }
}

/// Lazy search results with completeness tracking.
pub struct Entries<'d, D: Directory> {
    search: Option<PagedSearch<'d, D>>,
    kind: String,
    primary: String,
    base_key: String,
    expected: Option<BTreeSet<String>>,
    /// Lowercased primary values seen so far.
    found: BTreeSet<String>,
    done: bool,
}

impl<D: Directory> Entries<'_, D> {
    fn missing(&self) -> Option<LdadmError> {
        let expected = self.expected.as_ref()?;
        let missing: Vec<String> = expected
            .iter()
            .filter(|id| !self.found.contains(&id.to_lowercase()))
            .cloned()
            .collect();
        (!missing.is_empty()).then(|| LdadmError::missing(&self.kind, missing))
    }
}

impl<D: Directory> Iterator for Entries<'_, D> {
    type Item = Result<DirectoryEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(search) = self.search.as_mut() else {
            self.done = true;
            return None;
        };
        loop {
            match search.next() {
                Some(Ok(entry)) => {
                    // The base itself is not a member of the collection it roots.
                    if normalize_dn(entry.dn()).is_ok_and(|key| key == self.base_key) {
                        continue;
                    }
                    for value in entry.get(&self.primary).unwrap_or(&[]) {
                        self.found.insert(value.to_lowercase());
                    }
                    return Some(Ok(entry));
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                None => {
                    self.done = true;
                    return self.missing().map(Err);
                }
            }
        }
    }
}

/// The one name an entry is listed under.
///
/// A single value is used as is. With several values, the one that appears in the
/// RDN wins (the alphabetically first if more than one does), otherwise the
/// alphabetically first value.
pub fn entry_name(entry: &DirectoryEntry, primary: &str) -> String {
    let values = entry.get(primary).unwrap_or(&[]);
    match values {
        [] => entry.dn().to_string(),
        [only] => only.clone(),
        _ => {
            let in_rdn: BTreeSet<String> = leaf_rdn(entry.dn())
                .and_then(parse_rdn)
                .map(|components| {
                    components
                        .into_iter()
                        .filter(|c| c.attribute.eq_ignore_ascii_case(primary))
                        .filter_map(|c| c.value().ok())
                        .collect()
                })
                .unwrap_or_default();
            let sorted: BTreeSet<&String> = values.iter().collect();
            sorted
                .iter()
                .find(|v| in_rdn.contains(v.as_str()))
                .or_else(|| sorted.iter().next())
                .map(|v| v.to_string())
                .unwrap_or_default()
        }
    }
}
