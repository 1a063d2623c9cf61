//! Search filters (RFC 4515).
//!
//! Filters are kept as a typed tree so they can be rendered for the wire, and
//! evaluated locally by [`crate::directory::memory::InMemoryDirectory`]. Free-form
//! filters typed by the user are parsed up front, so a malformed filter fails before
//! any network activity.

use crate::error::{LdadmError, Result};
use crate::model::AttributeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equals(String, String),
    Present(String),
    /// `attr=initial*any*...*final`; `None` for a missing initial or final part.
    Substring {
        attribute: String,
        initial: Option<String>,
        any: Vec<String>,
        last: Option<String>,
    },
    GreaterOrEqual(String, String),
    LessOrEqual(String, String),
    Approx(String, String),
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals(attribute.into(), value.into())
    }

    pub fn object_classes<I, S>(classes: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filters: Vec<Filter> = classes
            .into_iter()
            .map(|class| Filter::equals("objectClass", class))
            .collect();
        match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(Filter::And(filters)),
        }
    }

    /// AND two filters, flattening nested conjunctions.
    pub fn and(self, other: Filter) -> Self {
        let mut parts = match self {
            Filter::And(parts) => parts,
            single => vec![single],
        };
        match other {
            Filter::And(more) => parts.extend(more),
            single => parts.push(single),
        }
        Filter::And(parts)
    }

    /// Parse a filter string. Outer parentheses may be omitted (`uid=alice`).
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LdadmError::InvalidFilter("empty filter".to_string()));
        }
        let owned;
        let text = if trimmed.starts_with('(') {
            trimmed
        } else {
            owned = format!("({})", trimmed);
            &owned
        };

        let mut parser = Parser {
            input: text,
            chars: text.char_indices().collect(),
            pos: 0,
        };
        let filter = parser.filter()?;
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing characters"));
        }
        Ok(filter)
    }

    /// Evaluate the filter against an entry. Attribute names and values compare
    /// case-insensitively, which is what the common directory string syntaxes do.
    pub fn matches(&self, attributes: &AttributeMap) -> bool {
        let values = |name: &str| attributes.get(name).unwrap_or(&[]);
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(attributes)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(attributes)),
            Filter::Not(inner) => !inner.matches(attributes),
            Filter::Present(attr) => {
                attr.eq_ignore_ascii_case("objectClass") || !values(attr).is_empty()
            }
            Filter::Equals(attr, value) | Filter::Approx(attr, value) => {
                values(attr).iter().any(|v| v.eq_ignore_ascii_case(value))
            }
            Filter::GreaterOrEqual(attr, value) => values(attr)
                .iter()
                .any(|v| compare(v, value) != std::cmp::Ordering::Less),
            Filter::LessOrEqual(attr, value) => values(attr)
                .iter()
                .any(|v| compare(v, value) != std::cmp::Ordering::Greater),
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => values(attribute)
                .iter()
                .any(|v| substring_match(&v.to_lowercase(), initial, any, last)),
        }
    }
}

/// Integers compare numerically, everything else as case-folded strings.
fn compare(left: &str, right: &str) -> std::cmp::Ordering {
    match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(l), Ok(r)) => l.cmp(&r),
        _ => left.to_lowercase().cmp(&right.to_lowercase()),
    }
}

fn substring_match(
    value: &str,
    initial: &Option<String>,
    any: &[String],
    last: &Option<String>,
) -> bool {
    let mut rest = value;
    if let Some(initial) = initial {
        match rest.strip_prefix(initial.to_lowercase().as_str()) {
            Some(r) => rest = r,
            None => return false,
        }
    }
    for part in any {
        let part = part.to_lowercase();
        match rest.find(&part) {
            Some(i) => rest = &rest[i + part.len()..],
            None => return false,
        }
    }
    match last {
        Some(last) => rest.ends_with(&last.to_lowercase()),
        None => true,
    }
}

/// Escape a value for use inside a filter (RFC 4515).
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\5c"),
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(parts) => {
                write!(f, "(&")?;
                for part in parts {
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
            Filter::Or(parts) => {
                write!(f, "(|")?;
                for part in parts {
                    write!(f, "{}", part)?;
                }
                write!(f, ")")
            }
            Filter::Not(inner) => write!(f, "(!{})", inner),
            Filter::Equals(attr, value) => write!(f, "({}={})", attr, escape_filter_value(value)),
            Filter::Present(attr) => write!(f, "({}=*)", attr),
            Filter::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({}=", attribute)?;
                if let Some(initial) = initial {
                    write!(f, "{}", escape_filter_value(initial))?;
                }
                write!(f, "*")?;
                for part in any {
                    write!(f, "{}*", escape_filter_value(part))?;
                }
                if let Some(last) = last {
                    write!(f, "{}", escape_filter_value(last))?;
                }
                write!(f, ")")
            }
            Filter::GreaterOrEqual(attr, value) => {
                write!(f, "({}>={})", attr, escape_filter_value(value))
            }
            Filter::LessOrEqual(attr, value) => {
                write!(f, "({}<={})", attr, escape_filter_value(value))
            }
            Filter::Approx(attr, value) => write!(f, "({}~={})", attr, escape_filter_value(value)),
        }
    }
}

/// Build one filter matching any of `ids` on `primary_attr`.
///
/// Each id appears exactly once; empty ids are dropped. Returns `None` when nothing
/// is left to match.
pub fn select_query<I, S>(primary_attr: &str, ids: I) -> Option<Filter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::BTreeSet::new();
    let mut terms: Vec<Filter> = ids
        .into_iter()
        .filter(|id| !id.as_ref().is_empty())
        .filter(|id| seen.insert(id.as_ref().to_string()))
        .map(|id| Filter::equals(primary_attr, id.as_ref()))
        .collect();
    match terms.len() {
        0 => None,
        1 => terms.pop(),
        _ => Some(Filter::Or(terms)),
    }
}

struct Parser<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, what: &str) -> LdadmError {
        LdadmError::InvalidFilter(format!("{} at position {} in '{}'", what, self.pos, self.input))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            _ => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn filter(&mut self) -> Result<Filter> {
        self.expect('(')?;
        let filter = match self.peek() {
            Some('&') => {
                self.pos += 1;
                Filter::And(self.filter_list()?)
            }
            Some('|') => {
                self.pos += 1;
                Filter::Or(self.filter_list()?)
            }
            Some('!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            _ => self.item()?,
        };
        self.expect(')')?;
        Ok(filter)
    }

    fn filter_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        while self.peek() == Some('(') {
            filters.push(self.filter()?);
        }
        if filters.is_empty() {
            return Err(self.error("expected a nested filter"));
        }
        Ok(filters)
    }

    fn item(&mut self) -> Result<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '=' || c == '>' || c == '<' || c == '~' || c == '(' || c == ')' {
                break;
            }
            self.pos += 1;
        }
        let attribute: String = self.chars[start..self.pos].iter().map(|&(_, c)| c).collect();
        let attribute = attribute.trim().to_string();
        if attribute.is_empty() {
            return Err(self.error("missing attribute name"));
        }

        let operator = match self.peek() {
            Some('=') => {
                self.pos += 1;
                "="
            }
            Some(c @ ('>' | '<' | '~')) => {
                self.pos += 1;
                self.expect('=')?;
                match c {
                    '>' => ">=",
                    '<' => "<=",
                    _ => "~=",
                }
            }
            _ => return Err(self.error("expected a comparison operator")),
        };

        // Split the raw value on unescaped '*', unescaping each piece.
        let mut pieces = vec![String::new()];
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                ')' => break,
                '(' => return Err(self.error("unescaped '('")),
                '*' => {
                    self.flush(&mut bytes, &mut pieces)?;
                    pieces.push(String::new());
                    self.pos += 1;
                }
                '\\' => {
                    let hex: String = self
                        .chars
                        .get(self.pos + 1..self.pos + 3)
                        .map(|pair| pair.iter().map(|&(_, c)| c).collect())
                        .unwrap_or_default();
                    let byte = u8::from_str_radix(&hex, 16)
                        .map_err(|_| self.error("invalid escape sequence"))?;
                    bytes.push(byte);
                    self.pos += 3;
                }
                _ => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                    self.pos += 1;
                }
            }
        }
        self.flush(&mut bytes, &mut pieces)?;

        if pieces.len() == 1 {
            let value = pieces.remove(0);
            return Ok(match operator {
                ">=" => Filter::GreaterOrEqual(attribute, value),
                "<=" => Filter::LessOrEqual(attribute, value),
                "~=" => Filter::Approx(attribute, value),
                _ => Filter::Equals(attribute, value),
            });
        }
        if operator != "=" {
            return Err(self.error("wildcards are only allowed with '='"));
        }
        if pieces.len() == 2 && pieces.iter().all(String::is_empty) {
            return Ok(Filter::Present(attribute));
        }

        let last = pieces.pop().filter(|s| !s.is_empty());
        let initial = Some(pieces.remove(0)).filter(|s| !s.is_empty());
        let any = pieces.into_iter().filter(|s| !s.is_empty()).collect();
        Ok(Filter::Substring {
            attribute,
            initial,
            any,
            last,
        })
    }

    fn flush(&self, bytes: &mut Vec<u8>, pieces: &mut [String]) -> Result<()> {
        let text = String::from_utf8(std::mem::take(bytes))
            .map_err(|_| self.error("value is not valid UTF-8"))?;
        if let Some(current) = pieces.last_mut() {
            current.push_str(&text);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &[&str])]) -> AttributeMap {
        pairs
            .iter()
            .map(|(name, values)| {
                (
                    name.to_string(),
                    values.iter().map(|v| v.to_string()).collect(),
                )
            })
            .collect()
    }

    #[test]
    fn select_query_names_every_id_once() {
        let filter = select_query("uid", ["alice", "bob", "alice", ""]).unwrap();
        assert_eq!(filter.to_string(), "(|(uid=alice)(uid=bob))");

        let single = select_query("uid", ["alice"]).unwrap();
        assert_eq!(single.to_string(), "(uid=alice)");

        assert!(select_query("uid", Vec::<String>::new()).is_none());
    }

    #[test]
    fn select_query_escapes_filter_specials() {
        let filter = select_query("cn", ["a*b(c)"]).unwrap();
        assert_eq!(filter.to_string(), "(cn=a\\2ab\\28c\\29)");
    }

    #[test]
    fn parses_and_renders_nested_filters() {
        let text = "(&(givenName=Not)(|(sn=Sure)(!(uid=x*))))";
        let filter = Filter::parse(text).unwrap();
        assert_eq!(filter.to_string(), text);
    }

    #[test]
    fn bare_item_gets_parenthesized() {
        assert_eq!(
            Filter::parse("uidNumber>=1000").unwrap(),
            Filter::GreaterOrEqual("uidNumber".into(), "1000".into())
        );
    }

    #[test]
    fn parses_presence_and_substrings() {
        assert_eq!(
            Filter::parse("(mail=*)").unwrap(),
            Filter::Present("mail".into())
        );
        assert_eq!(
            Filter::parse("(cn=J*h*n)").unwrap(),
            Filter::Substring {
                attribute: "cn".into(),
                initial: Some("J".into()),
                any: vec!["h".into()],
                last: Some("n".into()),
            }
        );
    }

    #[test]
    fn rejects_malformed_filters() {
        for bad in ["", "(uid=a", "(&)", "(=x)", "(uid=a))", "(uid>=a*)", "(cn=\\zz)"] {
            assert!(
                matches!(Filter::parse(bad), Err(LdadmError::InvalidFilter(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn matches_entries() {
        let entry = attrs(&[
            ("uid", &["alice"]),
            ("cn", &["Alice Liddell"]),
            ("uidNumber", &["1200"]),
        ]);
        assert!(Filter::parse("(uid=ALICE)").unwrap().matches(&entry));
        assert!(Filter::parse("(cn=*lidd*)").unwrap().matches(&entry));
        assert!(Filter::parse("(uidNumber>=999)").unwrap().matches(&entry));
        assert!(!Filter::parse("(uidNumber<=999)").unwrap().matches(&entry));
        assert!(Filter::parse("(&(uid=alice)(!(mail=*)))")
            .unwrap()
            .matches(&entry));
    }

    #[test]
    fn and_flattens() {
        let filter = Filter::object_classes(["top", "person"])
            .unwrap()
            .and(Filter::equals("uid", "a"));
        assert_eq!(
            filter.to_string(),
            "(&(objectClass=top)(objectClass=person)(uid=a))"
        );
    }
}
