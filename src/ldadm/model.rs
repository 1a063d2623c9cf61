//! Core data types: directory entries and their attribute maps.
//!
//! Attribute names in a directory are case-insensitive. [`AttributeMap`] keeps the
//! name as first written (so output shows the server's spelling) but looks names up
//! without regard to case. Alias handling (`sn` vs `surname`) is not done here; it
//! belongs to [`crate::schema::AttributeSchema`], which maps every alias to one
//! canonical name before anything is stored.

/// Attribute name → ordered values. Single-valued attributes hold one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: Vec<(String, Vec<String>)>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|i| self.entries[i].1.as_slice())
    }

    /// First value of an attribute, the usual way to read a scalar.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Replace all values of an attribute. An existing attribute keeps its position
    /// and original spelling.
    pub fn set(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    /// Append values, skipping ones already present.
    pub fn add_values(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(i) => {
                let current = &mut self.entries[i].1;
                for value in values {
                    if !current.contains(&value) {
                        current.push(value);
                    }
                }
            }
            None => self.entries.push((name, values)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, Vec<String>)> for AttributeMap {
    fn from_iter<T: IntoIterator<Item = (N, Vec<String>)>>(iter: T) -> Self {
        let mut map = AttributeMap::new();
        for (name, values) in iter {
            map.set(name, values);
        }
        map
    }
}

/// One directory record.
///
/// An entry without a DN is *virtual*: it has been assembled in memory (usually by
/// the [`crate::resolver::AttributeResolver`]) but not yet written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: Option<String>,
    pub attributes: AttributeMap,
}

impl DirectoryEntry {
    pub fn virtual_entry(attributes: AttributeMap) -> Self {
        Self {
            dn: None,
            attributes,
        }
    }

    pub fn persisted(dn: impl Into<String>, attributes: AttributeMap) -> Self {
        Self {
            dn: Some(dn.into()),
            attributes,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.dn.is_none()
    }

    pub fn dn(&self) -> &str {
        self.dn.as_deref().unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchScope {
    /// The base entry and everything below it.
    Subtree,
    /// Direct children of the base only.
    OneLevel,
}

/// Which attributes a search should bring back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Projection {
    /// Only the primary attribute.
    #[default]
    None,
    One(String),
    List(Vec<String>),
    /// Every user attribute.
    All,
}

impl Projection {
    /// Attribute list to send with a search. The primary attribute is always
    /// requested since completeness checks depend on it.
    pub fn requested(&self, primary: &str) -> Vec<String> {
        let mut attrs = match self {
            Projection::All => return vec!["*".to_string()],
            Projection::None => Vec::new(),
            Projection::One(name) => vec![name.clone()],
            Projection::List(names) => names.clone(),
        };
        if !attrs.iter().any(|a| a.eq_ignore_ascii_case(primary)) {
            attrs.push(primary.to_string());
        }
        attrs
    }
}
