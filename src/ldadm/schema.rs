//! Attribute schema.
//!
//! Directories publish their schema in a subschema entry as RFC 4512 definition
//! strings (`attributeTypes`, `objectClasses`). [`SchemaCatalog`] parses those once;
//! [`SchemaCatalog::entry_schema`] then flattens an object class set, following
//! `SUP` chains, into an [`AttributeSchema`]: the defined attributes, which of them
//! are mandatory, and an alias table so that `surname` and `SN` both resolve to `sn`.

use crate::error::{LdadmError, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDef {
    /// First declared name.
    pub name: String,
    /// Remaining declared names.
    pub aliases: Vec<String>,
    pub mandatory: bool,
}

impl AttributeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            mandatory: false,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }
}

/// The attributes an entry with a given object class set may carry.
#[derive(Debug, Clone, Default)]
pub struct AttributeSchema {
    attributes: Vec<AttributeDef>,
    lookup: HashMap<String, usize>,
}

impl AttributeSchema {
    pub fn new(attributes: Vec<AttributeDef>) -> Self {
        let mut schema = Self::default();
        for def in attributes {
            schema.push(def);
        }
        schema
    }

    fn push(&mut self, def: AttributeDef) {
        let index = match self.lookup.get(&def.name.to_lowercase()) {
            Some(&i) => {
                self.attributes[i].mandatory |= def.mandatory;
                i
            }
            None => {
                self.attributes.push(def.clone());
                self.attributes.len() - 1
            }
        };
        for name in std::iter::once(&def.name).chain(def.aliases.iter()) {
            self.lookup.entry(name.to_lowercase()).or_insert(index);
        }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDef> {
        self.lookup
            .get(&name.to_lowercase())
            .map(|&i| &self.attributes[i])
    }

    /// Canonical name for `name` or any of its aliases.
    pub fn canonical(&self, name: &str) -> Result<&str> {
        self.get(name)
            .map(|def| def.name.as_str())
            .ok_or_else(|| LdadmError::UnknownAttribute(name.to_string()))
    }

    pub fn is_mandatory(&self, name: &str) -> bool {
        self.get(name).is_some_and(|def| def.mandatory)
    }

    /// Attributes in declaration order: each class's superclasses first, MUST
    /// before MAY.
    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDef> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeTypeDef {
    pub oid: String,
    pub names: Vec<String>,
    pub sup: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectClassDef {
    pub oid: String,
    pub names: Vec<String>,
    pub sup: Vec<String>,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

/// Every attribute type and object class published by a server.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    attribute_types: Vec<AttributeTypeDef>,
    object_classes: Vec<ObjectClassDef>,
    type_lookup: HashMap<String, usize>,
    class_lookup: HashMap<String, usize>,
}

impl SchemaCatalog {
    /// Build from the raw `attributeTypes` and `objectClasses` values.
    /// Unparseable definitions are skipped with a debug trace.
    pub fn parse<A, O>(attribute_types: A, object_classes: O) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        O: IntoIterator,
        O::Item: AsRef<str>,
    {
        let mut catalog = Self::default();
        for text in attribute_types {
            match parse_attribute_type(text.as_ref()) {
                Some(def) => catalog.add_attribute_type(def),
                None => tracing::debug!(definition = text.as_ref(), "skipping attribute type"),
            }
        }
        for text in object_classes {
            match parse_object_class(text.as_ref()) {
                Some(def) => catalog.add_object_class(def),
                None => tracing::debug!(definition = text.as_ref(), "skipping object class"),
            }
        }
        catalog
    }

    pub fn add_attribute_type(&mut self, def: AttributeTypeDef) {
        let index = self.attribute_types.len();
        for key in def.names.iter().chain(std::iter::once(&def.oid)) {
            self.type_lookup.insert(key.to_lowercase(), index);
        }
        self.attribute_types.push(def);
    }

    pub fn add_object_class(&mut self, def: ObjectClassDef) {
        let index = self.object_classes.len();
        for key in def.names.iter().chain(std::iter::once(&def.oid)) {
            self.class_lookup.insert(key.to_lowercase(), index);
        }
        self.object_classes.push(def);
    }

    pub fn attribute_type(&self, name: &str) -> Option<&AttributeTypeDef> {
        self.type_lookup
            .get(&name.to_lowercase())
            .map(|&i| &self.attribute_types[i])
    }

    pub fn object_class(&self, name: &str) -> Option<&ObjectClassDef> {
        self.class_lookup
            .get(&name.to_lowercase())
            .map(|&i| &self.object_classes[i])
    }

    /// Flatten an object class set into the attributes its entries may carry.
    pub fn entry_schema<S: AsRef<str>>(&self, object_classes: &[S]) -> Result<AttributeSchema> {
        let mut schema = AttributeSchema::default();
        let mut visited = Vec::new();
        for class in object_classes {
            self.collect_class(class.as_ref(), &mut schema, &mut visited)?;
        }
        Ok(schema)
    }

    fn collect_class(
        &self,
        name: &str,
        schema: &mut AttributeSchema,
        visited: &mut Vec<String>,
    ) -> Result<()> {
        let key = name.to_lowercase();
        if visited.contains(&key) {
            return Ok(());
        }
        visited.push(key);

        let class = self
            .object_class(name)
            .ok_or_else(|| LdadmError::UnknownObjectClass(name.to_string()))?;
        for parent in &class.sup {
            self.collect_class(parent, schema, visited)?;
        }
        for attr in &class.must {
            schema.push(self.attribute_def(attr).mandatory());
        }
        for attr in &class.may {
            schema.push(self.attribute_def(attr));
        }
        Ok(())
    }

    fn attribute_def(&self, name: &str) -> AttributeDef {
        match self.attribute_type(name) {
            Some(def) if !def.names.is_empty() => {
                AttributeDef::new(def.names[0].clone()).with_aliases(def.names[1..].to_vec())
            }
            _ => AttributeDef::new(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Dollar,
    Quoted(String),
    Word(String),
}

fn tokenize(definition: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = definition.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '$' => tokens.push(Token::Dollar),
            '\'' => {
                let mut text = String::new();
                for c in chars.by_ref() {
                    if c == '\'' {
                        break;
                    }
                    text.push(c);
                }
                tokens.push(Token::Quoted(text));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = c.to_string();
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "()$'".contains(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    tokens
}

/// Keyword → values of a parsed definition, plus its leading OID.
struct Definition {
    oid: String,
    fields: HashMap<String, Vec<String>>,
}

impl Definition {
    fn values(&self, keyword: &str) -> Vec<String> {
        self.fields.get(keyword).cloned().unwrap_or_default()
    }
}

fn parse_definition(text: &str) -> Option<Definition> {
    let tokens = tokenize(text);
    let mut iter = tokens.into_iter().peekable();
    if iter.next()? != Token::Open {
        return None;
    }
    let oid = match iter.next()? {
        Token::Word(oid) => oid,
        _ => return None,
    };

    let mut fields = HashMap::new();
    while let Some(token) = iter.next() {
        let keyword = match token {
            Token::Word(keyword) => keyword.to_uppercase(),
            Token::Close => break,
            _ => return None,
        };
        let mut values = Vec::new();
        match iter.peek() {
            Some(Token::Open) => {
                iter.next();
                for token in iter.by_ref() {
                    match token {
                        Token::Close => break,
                        Token::Dollar => {}
                        Token::Word(v) | Token::Quoted(v) => values.push(v),
                        Token::Open => return None,
                    }
                }
            }
            Some(Token::Quoted(_)) => {
                if let Some(Token::Quoted(v)) = iter.next() {
                    values.push(v);
                }
            }
            Some(Token::Word(next)) if !is_keyword(next) => {
                if let Some(Token::Word(v)) = iter.next() {
                    values.push(v);
                }
            }
            // Flag keywords such as OBSOLETE or STRUCTURAL carry no value.
            _ => {}
        }
        fields.insert(keyword, values);
    }
    Some(Definition { oid, fields })
}

fn is_keyword(word: &str) -> bool {
    word.starts_with("X-")
        || matches!(
            word,
            "NAME"
                | "DESC"
                | "OBSOLETE"
                | "SUP"
                | "ABSTRACT"
                | "STRUCTURAL"
                | "AUXILIARY"
                | "MUST"
                | "MAY"
                | "EQUALITY"
                | "ORDERING"
                | "SUBSTR"
                | "SYNTAX"
                | "SINGLE-VALUE"
                | "COLLECTIVE"
                | "NO-USER-MODIFICATION"
                | "USAGE"
        )
}

pub fn parse_attribute_type(text: &str) -> Option<AttributeTypeDef> {
    let def = parse_definition(text)?;
    Some(AttributeTypeDef {
        names: def.values("NAME"),
        sup: def.values("SUP").into_iter().next(),
        oid: def.oid,
    })
}

pub fn parse_object_class(text: &str) -> Option<ObjectClassDef> {
    let def = parse_definition(text)?;
    Some(ObjectClassDef {
        names: def.values("NAME"),
        sup: def.values("SUP"),
        must: def.values("MUST"),
        may: def.values("MAY"),
        oid: def.oid,
    })
}

/// A small slice of the core and inetOrgPerson schemas, for tests that need a
/// realistic catalog without a server.
#[cfg(test)]
pub mod fixtures {
    pub const ATTRIBUTE_TYPES: &[&str] = &[
        "( 2.5.4.0 NAME 'objectClass' EQUALITY objectIdentifierMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )",
        "( 2.5.4.41 NAME 'name' EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} )",
        "( 2.5.4.3 NAME ( 'cn' 'commonName' ) SUP name )",
        "( 2.5.4.4 NAME ( 'sn' 'surname' ) SUP name )",
        "( 2.5.4.42 NAME ( 'givenName' 'gn' ) SUP name )",
        "( 2.5.4.11 NAME ( 'ou' 'organizationalUnitName' ) SUP name )",
        "( 2.5.4.13 NAME 'description' EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{1024} )",
        "( 2.5.4.35 NAME 'userPassword' EQUALITY octetStringMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.40{128} )",
        "( 0.9.2342.19200300.100.1.1 NAME ( 'uid' 'userid' ) EQUALITY caseIgnoreMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{256} )",
        "( 0.9.2342.19200300.100.1.3 NAME ( 'mail' 'rfc822Mailbox' ) SYNTAX 1.3.6.1.4.1.1466.115.121.1.26{256} )",
        "( 1.3.6.1.1.1.1.0 NAME 'uidNumber' EQUALITY integerMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )",
        "( 1.3.6.1.1.1.1.1 NAME 'gidNumber' EQUALITY integerMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )",
        "( 1.3.6.1.1.1.1.3 NAME 'homeDirectory' EQUALITY caseExactIA5Match SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )",
        "( 1.3.6.1.1.1.1.4 NAME 'loginShell' SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )",
        "( 2.5.4.31 NAME 'member' SUP distinguishedName )",
        "( 2.5.4.32 NAME 'owner' SUP distinguishedName )",
        "( 2.5.4.34 NAME 'seeAlso' SUP distinguishedName )",
        "( 0.9.2342.19200300.100.1.10 NAME 'manager' EQUALITY distinguishedNameMatch SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 )",
        "( 1.3.6.1.4.1.5923.1.1.1.1 NAME 'host' SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )",
    ];

    pub const OBJECT_CLASSES: &[&str] = &[
        "( 2.5.6.0 NAME 'top' ABSTRACT MUST objectClass )",
        "( 2.5.6.6 NAME 'person' DESC 'RFC2256: a person' SUP top STRUCTURAL MUST ( sn $ cn ) MAY ( userPassword $ seeAlso $ description ) )",
        "( 2.5.6.7 NAME 'organizationalPerson' SUP person STRUCTURAL MAY ( ou ) )",
        "( 2.16.840.1.113730.3.2.2 NAME 'inetOrgPerson' SUP organizationalPerson STRUCTURAL MAY ( givenName $ mail $ uid $ manager ) )",
        "( 1.3.6.1.1.1.2.0 NAME 'posixAccount' SUP top AUXILIARY MUST ( cn $ uid $ uidNumber $ gidNumber $ homeDirectory ) MAY ( userPassword $ loginShell $ description ) )",
        "( 2.5.6.5 NAME 'organizationalUnit' SUP top STRUCTURAL MUST ou MAY ( description $ seeAlso ) )",
        "( 2.5.6.9 NAME 'groupOfNames' SUP top STRUCTURAL MUST ( member $ cn ) MAY ( owner $ ou $ description $ seeAlso ) )",
        "( 1.3.6.1.4.1.99999.2.1 NAME 'project' SUP top STRUCTURAL MUST cn MAY ( manager $ member $ seeAlso $ description ) )",
        "( 2.5.6.14 NAME 'device' SUP top STRUCTURAL MUST cn MAY ( ou $ owner $ seeAlso $ description $ host ) )",
    ];

    pub fn catalog() -> super::SchemaCatalog {
        super::SchemaCatalog::parse(ATTRIBUTE_TYPES.iter(), OBJECT_CLASSES.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attribute_type_names_and_sup() {
        let def = parse_attribute_type("( 2.5.4.4 NAME ( 'sn' 'surname' ) SUP name )").unwrap();
        assert_eq!(def.oid, "2.5.4.4");
        assert_eq!(def.names, vec!["sn", "surname"]);
        assert_eq!(def.sup.as_deref(), Some("name"));
    }

    #[test]
    fn parses_object_class_lists() {
        let def = parse_object_class(
            "( 2.5.6.6 NAME 'person' DESC 'RFC2256: a person' SUP top STRUCTURAL MUST ( sn $ cn ) MAY userPassword )",
        )
        .unwrap();
        assert_eq!(def.names, vec!["person"]);
        assert_eq!(def.sup, vec!["top"]);
        assert_eq!(def.must, vec!["sn", "cn"]);
        assert_eq!(def.may, vec!["userPassword"]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_object_class("not a definition").is_none());
    }

    #[test]
    fn entry_schema_follows_superclasses() {
        let schema = fixtures::catalog()
            .entry_schema(&["inetOrgPerson", "posixAccount"])
            .unwrap();
        let names: Vec<&str> = schema.attributes().map(|d| d.name.as_str()).collect();
        assert_eq!(&names[..3], ["objectClass", "sn", "cn"]);
        assert!(names.contains(&"homeDirectory"));
        assert!(schema.is_mandatory("uid"));
        assert!(schema.is_mandatory("SN"));
        assert!(!schema.is_mandatory("mail"));
        // cn is declared by both person and posixAccount but listed once.
        assert_eq!(names.iter().filter(|n| **n == "cn").count(), 1);
    }

    #[test]
    fn aliases_resolve_to_first_name() {
        let schema = fixtures::catalog().entry_schema(&["inetOrgPerson"]).unwrap();
        assert_eq!(schema.canonical("surname").unwrap(), "sn");
        assert_eq!(schema.canonical("COMMONNAME").unwrap(), "cn");
        assert_eq!(schema.canonical("gn").unwrap(), "givenName");
        assert!(matches!(
            schema.canonical("shoeSize"),
            Err(LdadmError::UnknownAttribute(_))
        ));
    }

    #[test]
    fn unknown_object_class_is_an_error() {
        assert!(matches!(
            fixtures::catalog().entry_schema(&["nope"]),
            Err(LdadmError::UnknownObjectClass(_))
        ));
    }
}
