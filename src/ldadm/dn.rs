//! Distinguished names: escaping, parsing and RDN manipulation (RFC 4514).
//!
//! Nothing here touches the network. Malformed DNs are reported as
//! [`LdadmError::InvalidDn`] and callers must not go on to write anything.

use crate::error::{LdadmError, Result};

const SPECIAL: &str = "\"#+,;<=>\0\\";

fn is_hex_pair(value: &str) -> bool {
    value.len() % 2 == 0 && value.chars().all(|c| c.is_ascii_hexdigit())
}

/// Escape an attribute value for use in an RDN.
///
/// The value is taken literally: a backslash in it is data and comes out as
/// `\\`, so parsing the result gives back the exact input. A value of `#`
/// followed by hex pairs is a BER-encoded value and is returned as is.
pub fn escape_attribute_value(value: &str) -> String {
    if let Some(hex) = value.strip_prefix('#') {
        if !hex.is_empty() && is_hex_pair(hex) {
            return value.to_string();
        }
    }

    let last = value.chars().count().saturating_sub(1);
    let mut escaped = String::with_capacity(value.len() * 2);
    for (i, c) in value.chars().enumerate() {
        if SPECIAL.contains(c) || (c == ' ' && (i == 0 || i == last)) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Reverse of [`escape_attribute_value`]: `\X` becomes `X`, `\XX` hex pairs are
/// decoded as UTF-8 bytes.
pub fn unescape_attribute_value(value: &str) -> Result<String> {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let next = chars
            .next()
            .ok_or_else(|| LdadmError::InvalidDn(format!("dangling escape in '{}'", value)))?;
        match chars.peek() {
            Some(&second) if next.is_ascii_hexdigit() && second.is_ascii_hexdigit() => {
                chars.next();
                let pair: String = [next, second].iter().collect();
                let byte = u8::from_str_radix(&pair, 16)
                    .map_err(|_| LdadmError::InvalidDn(value.to_string()))?;
                bytes.push(byte);
            }
            _ => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(next.encode_utf8(&mut buf).as_bytes());
            }
        }
    }

    String::from_utf8(bytes)
        .map_err(|_| LdadmError::InvalidDn(format!("'{}' is not valid UTF-8", value)))
}

/// Split on a separator that is not preceded by a backslash.
fn split_unescaped(input: &str, separator: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == separator {
            parts.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    if escaped {
        return Err(LdadmError::InvalidDn(format!(
            "dangling escape in '{}'",
            input
        )));
    }
    parts.push(&input[start..]);
    Ok(parts)
}

/// One `attr=value` pair of an RDN. The value is kept in its escaped form so that
/// rebuilding an RDN reproduces untouched components byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RdnComponent {
    pub attribute: String,
    pub raw_value: String,
}

impl RdnComponent {
    pub fn new(attribute: impl Into<String>, value: &str) -> Self {
        Self {
            attribute: attribute.into(),
            raw_value: escape_attribute_value(value),
        }
    }

    pub fn value(&self) -> Result<String> {
        unescape_attribute_value(&self.raw_value)
    }
}

impl std::fmt::Display for RdnComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.attribute, self.raw_value)
    }
}

/// Decompose an RDN (`gn=John+sn=Doe`) into its components.
pub fn parse_rdn(rdn: &str) -> Result<Vec<RdnComponent>> {
    split_unescaped(rdn, '+')?
        .into_iter()
        .map(|part| {
            let (attribute, raw_value) = part
                .split_once('=')
                .ok_or_else(|| LdadmError::InvalidDn(format!("'{}' has no '='", rdn)))?;
            let attribute = attribute.trim();
            if attribute.is_empty() {
                return Err(LdadmError::InvalidDn(format!(
                    "'{}' has an empty attribute type",
                    rdn
                )));
            }
            // validates escapes
            unescape_attribute_value(raw_value)?;
            Ok(RdnComponent {
                attribute: attribute.to_string(),
                raw_value: raw_value.to_string(),
            })
        })
        .collect()
}

/// Split a DN into its RDN strings, leaf first.
pub fn split_dn(dn: &str) -> Result<Vec<&str>> {
    if dn.trim().is_empty() {
        return Err(LdadmError::InvalidDn("empty DN".to_string()));
    }
    let rdns: Vec<&str> = split_unescaped(dn, ',')?
        .into_iter()
        .map(str::trim_start)
        .collect();
    for rdn in &rdns {
        if rdn.is_empty() {
            return Err(LdadmError::InvalidDn(format!(
                "'{}' has an empty component",
                dn
            )));
        }
        parse_rdn(rdn)?;
    }
    Ok(rdns)
}

/// The leaf RDN of a DN.
pub fn leaf_rdn(dn: &str) -> Result<&str> {
    Ok(split_dn(dn)?[0])
}

/// Everything above the leaf RDN; empty for a single-component DN.
pub fn parent_dn(dn: &str) -> Result<String> {
    Ok(split_dn(dn)?[1..].join(","))
}

pub fn build_rdn(attribute: &str, value: &str) -> String {
    RdnComponent::new(attribute, value).to_string()
}

pub fn build_dn(rdn: &str, base: &str) -> String {
    if base.is_empty() {
        rdn.to_string()
    } else {
        format!("{},{}", rdn, base)
    }
}

/// Compute the RDN an entry gets when `target_attr` takes `new_value`.
///
/// Components of a multi-valued RDN that belong to other attributes are kept
/// unchanged and in their original order.
pub fn rename_rdn(existing_dn: &str, target_attr: &str, new_value: &str) -> Result<String> {
    let components = parse_rdn(leaf_rdn(existing_dn)?)?;
    if !components
        .iter()
        .any(|c| c.attribute.eq_ignore_ascii_case(target_attr))
    {
        return Err(LdadmError::InvalidDn(format!(
            "RDN of '{}' has no {} component",
            existing_dn, target_attr
        )));
    }

    let renamed: Vec<String> = components
        .into_iter()
        .map(|c| {
            if c.attribute.eq_ignore_ascii_case(target_attr) {
                RdnComponent::new(c.attribute, new_value).to_string()
            } else {
                c.to_string()
            }
        })
        .collect();

    Ok(renamed.join("+"))
}

/// Canonical form for comparing DNs: attribute types and values lowercased,
/// values unescaped and re-escaped, no spaces after separators.
pub fn normalize_dn(dn: &str) -> Result<String> {
    let mut rdns = Vec::new();
    for rdn in split_dn(dn)? {
        let mut parts = Vec::new();
        for component in parse_rdn(rdn)? {
            let value = component.value()?.to_lowercase();
            parts.push(format!(
                "{}={}",
                component.attribute.to_lowercase(),
                escape_attribute_value(&value)
            ));
        }
        rdns.push(parts.join("+"));
    }
    Ok(rdns.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_attribute_value("Doe, John"), "Doe\\, John");
        assert_eq!(escape_attribute_value("a+b"), "a\\+b");
        assert_eq!(escape_attribute_value("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_attribute_value("x<y>z;w=v"), "x\\<y\\>z\\;w\\=v");
        assert_eq!(escape_attribute_value("nul\0"), "nul\\\0");
    }

    #[test]
    fn escapes_leading_and_trailing_space() {
        assert_eq!(escape_attribute_value(" lead"), "\\ lead");
        assert_eq!(escape_attribute_value("trail "), "trail\\ ");
        assert_eq!(escape_attribute_value(" "), "\\ ");
    }

    #[test]
    fn backslashes_are_literal() {
        assert_eq!(escape_attribute_value("a\\,b"), "a\\\\\\,b");
        assert_eq!(escape_attribute_value("dir\\2C"), "dir\\\\2C");
        assert_eq!(escape_attribute_value("x\\ab"), "x\\\\ab");
        assert_eq!(escape_attribute_value("x\\ "), "x\\\\\\ ");
    }

    #[test]
    fn doubles_malformed_backslashes() {
        assert_eq!(escape_attribute_value("a\\qb"), "a\\\\qb");
        assert_eq!(escape_attribute_value("end\\"), "end\\\\");
        assert_eq!(escape_attribute_value("end\\4"), "end\\\\4");
        assert_eq!(escape_attribute_value("a\\4,"), "a\\\\4\\,");
    }

    #[test]
    fn hex_encoded_value_is_unchanged() {
        assert_eq!(escape_attribute_value("#04024869"), "#04024869");
        // odd number of hex digits is not a BER value
        assert_eq!(escape_attribute_value("#123"), "\\#123");
        assert_eq!(escape_attribute_value("#zz"), "\\#zz");
    }

    #[test]
    fn escape_round_trips() {
        for original in [
            "Doe, John",
            "a+b=c",
            "\"quoted\"",
            " both ",
            "back\\slash",
            "tail\\",
            "semi;colon<>",
            "ünïcödé, ok",
            "a\\,b",
            "x\\ab",
            "dir\\2C",
            "x\\ ",
            "\\\\",
        ] {
            let escaped = escape_attribute_value(original);
            let rdn = format!("cn={}", escaped);
            let parsed = parse_rdn(&rdn).unwrap();
            assert_eq!(parsed.len(), 1, "{}", rdn);
            assert_eq!(parsed[0].value().unwrap(), original, "{}", rdn);
        }
    }

    #[test]
    fn unescape_decodes_hex_pairs() {
        assert_eq!(unescape_attribute_value("a\\2Cb").unwrap(), "a,b");
        assert_eq!(unescape_attribute_value("\\C3\\BC").unwrap(), "ü");
        assert!(unescape_attribute_value("oops\\").is_err());
    }

    #[test]
    fn splits_dn_respecting_escapes() {
        let rdns = split_dn("cn=Doe\\, John,ou=people, dc=example,dc=org").unwrap();
        assert_eq!(
            rdns,
            vec!["cn=Doe\\, John", "ou=people", "dc=example", "dc=org"]
        );
        assert_eq!(
            parent_dn("uid=a,ou=people,dc=org").unwrap(),
            "ou=people,dc=org"
        );
    }

    #[test]
    fn rejects_malformed_dn() {
        assert!(matches!(split_dn(""), Err(LdadmError::InvalidDn(_))));
        assert!(matches!(split_dn("uid=a,,dc=x"), Err(LdadmError::InvalidDn(_))));
        assert!(matches!(split_dn("nonsense"), Err(LdadmError::InvalidDn(_))));
        assert!(matches!(split_dn("uid=a\\"), Err(LdadmError::InvalidDn(_))));
    }

    #[test]
    fn builds_dn_from_escaped_rdn() {
        let rdn = build_rdn("cn", "Doe, John");
        assert_eq!(build_dn(&rdn, "ou=people,dc=org"), "cn=Doe\\, John,ou=people,dc=org");
    }

    #[test]
    fn rename_replaces_only_target_component() {
        let rdn = rename_rdn("gn=John+sn=Doe,ou=people,dc=org", "gn", "Jack").unwrap();
        assert_eq!(rdn, "gn=Jack+sn=Doe");

        let rdn = rename_rdn("a=X+b=Y,dc=org", "a", "Z").unwrap();
        assert_eq!(rdn, "a=Z+b=Y");

        let rdn = rename_rdn("b=Y\\2C+a=X,dc=org", "A", "Z, Q").unwrap();
        assert_eq!(rdn, "b=Y\\2C+a=Z\\, Q");
    }

    #[test]
    fn rename_requires_target_in_rdn() {
        let err = rename_rdn("cn=John,dc=org", "uid", "jack").unwrap_err();
        assert!(matches!(err, LdadmError::InvalidDn(_)));
    }

    #[test]
    fn normalized_dns_compare_equal() {
        assert_eq!(
            normalize_dn("UID=Alice, OU=People,dc=Org").unwrap(),
            normalize_dn("uid=alice,ou=people,dc=org").unwrap()
        );
        assert_eq!(
            normalize_dn("cn=a\\2Cb,dc=org").unwrap(),
            normalize_dn("cn=a\\,b,dc=org").unwrap()
        );
    }
}
