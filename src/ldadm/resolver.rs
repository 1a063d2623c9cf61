//! # Attribute Resolver
//!
//! Builds the attribute set of a new entry interactively. For every attribute that
//! needs a value the resolver works out a default, offers it on the prompt, and
//! stores whatever the operator settles on.
//!
//! ## Where defaults come from
//!
//! 1. A **template** from the configuration, e.g. `homeDirectory: /home/{uid}`.
//!    Placeholders name other attributes; those are resolved first, depth-first, so
//!    the operator is asked for `uid` before `homeDirectory` is offered. A template
//!    can also be a list, producing a multi-valued default. An optional
//!    **modifier** (`lower`, `title`, ...) is applied to each rendered string.
//! 2. Otherwise the **reference entry** (`add --defaults SOMEONE`), if any.
//! 3. A **pre-resolve hook** then sees the default and may replace it (the user
//!    number allocator and the password generator work this way). A failing hook
//!    is logged and leaves no default.
//!
//! ## The prompt protocol
//!
//! The prompt reads `name [default]: `. A lone `.` omits the attribute. An empty
//! line accepts the default. Anything else is the value; `a; b` (semicolon followed
//! by whitespace) is a list. The result goes through the **post-resolve hook**,
//! which may translate it (user ids to DNs, for instance) or reject it, in which
//! case the question is asked again. An empty result is never stored.
//!
//! Each attribute is resolved at most once per entry; templates that refer to each
//! other in a loop are reported as `CyclicTemplate` instead of recursing forever.

use crate::console::Prompt;
use crate::directory::Directory;
use crate::error::{LdadmError, Result};
use crate::model::{AttributeMap, DirectoryEntry};
use crate::schema::AttributeSchema;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use tracing::{debug, error, warn};

static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*;\s+").expect("valid regex"));

/// String transforms a template default may be passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Capitalize,
    Casefold,
    Lower,
    Swapcase,
    Title,
    Upper,
}

impl FromStr for Modifier {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "capitalize" => Ok(Modifier::Capitalize),
            "casefold" => Ok(Modifier::Casefold),
            "lower" => Ok(Modifier::Lower),
            "swapcase" => Ok(Modifier::Swapcase),
            "title" => Ok(Modifier::Title),
            "upper" => Ok(Modifier::Upper),
            _ => Err(()),
        }
    }
}

impl Modifier {
    pub fn parse(name: &str, attribute: &str) -> Result<Self> {
        name.parse().map_err(|_| LdadmError::InvalidModifier {
            modifier: name.to_string(),
            attribute: attribute.to_string(),
        })
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Modifier::Lower | Modifier::Casefold => value.to_lowercase(),
            Modifier::Upper => value.to_uppercase(),
            Modifier::Capitalize => {
                let mut chars = value.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
                    None => String::new(),
                }
            }
            Modifier::Swapcase => value
                .chars()
                .flat_map(|c| {
                    if c.is_uppercase() {
                        c.to_lowercase().collect::<Vec<_>>()
                    } else {
                        c.to_uppercase().collect::<Vec<_>>()
                    }
                })
                .collect(),
            Modifier::Title => {
                let mut out = String::with_capacity(value.len());
                let mut in_word = false;
                for c in value.chars() {
                    if c.is_alphabetic() {
                        if in_word {
                            out.extend(c.to_lowercase());
                        } else {
                            out.extend(c.to_uppercase());
                        }
                        in_word = true;
                    } else {
                        out.push(c);
                        in_word = false;
                    }
                }
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// One parsed format string.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Format(Vec<Segment>);

impl Format {
    fn parse(text: &str, attribute: &str) -> Result<Self> {
        let invalid = |message: &str| LdadmError::InvalidTemplate {
            attribute: attribute.to_string(),
            message: format!("{} in '{}'", message, text),
        };
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') | None => return Err(invalid("unclosed placeholder")),
                            Some(c) => name.push(c),
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() {
                        return Err(invalid("empty placeholder"));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(name));
                }
                '}' => return Err(invalid("single '}'")),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Format(segments))
    }

    fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// A default-value template: one format string, or one per value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Template {
    Single(String),
    List(Vec<String>),
}

/// One format per default value.
#[derive(Debug, Clone)]
struct ParsedTemplate(Vec<Format>);

impl ParsedTemplate {
    fn parse(template: &Template, attribute: &str) -> Result<Self> {
        let formats = match template {
            Template::Single(text) => vec![Format::parse(text, attribute)?],
            Template::List(texts) => texts
                .iter()
                .map(|t| Format::parse(t, attribute))
                .collect::<Result<_>>()?,
        };
        Ok(Self(formats))
    }
}

/// Runs before the prompt with the computed default; returns the new default.
pub trait PreResolveHook<D> {
    fn call(&mut self, dir: &mut D, default: Option<Vec<String>>) -> Result<Option<Vec<String>>>;
}

/// Runs on the operator's answer; an error makes the resolver ask again.
pub trait PostResolveHook<D> {
    fn call(&mut self, dir: &mut D, value: Option<Vec<String>>) -> Result<Option<Vec<String>>>;
}

impl<D, F> PreResolveHook<D> for F
where
    F: FnMut(&mut D, Option<Vec<String>>) -> Result<Option<Vec<String>>>,
{
    fn call(&mut self, dir: &mut D, default: Option<Vec<String>>) -> Result<Option<Vec<String>>> {
        self(dir, default)
    }
}

impl<D, F> PostResolveHook<D> for F
where
    F: FnMut(&mut D, Option<Vec<String>>) -> Result<Option<Vec<String>>>,
{
    fn call(&mut self, dir: &mut D, value: Option<Vec<String>>) -> Result<Option<Vec<String>>> {
        self(dir, value)
    }
}

/// A finished virtual entry.
#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub attributes: AttributeMap,
    /// Rendered creation message, if one is configured.
    pub message: Option<String>,
}

pub struct AttributeResolver<'a, D: Directory> {
    dir: &'a mut D,
    prompt: &'a mut dyn Prompt,
    schema: AttributeSchema,
    object_classes: Vec<String>,
    primary: String,
    required: Vec<String>,
    templates: HashMap<String, ParsedTemplate>,
    modifiers: HashMap<String, Modifier>,
    message: Option<Format>,
    reference: Option<DirectoryEntry>,
    pre: HashMap<String, Box<dyn PreResolveHook<D> + 'a>>,
    post: HashMap<String, Box<dyn PostResolveHook<D> + 'a>>,
    attributes: AttributeMap,
    omitted: HashSet<String>,
    resolving: Vec<String>,
}

/// Treat `[]` and `[""]` as no value.
fn non_empty(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values.filter(|v| v.iter().any(|s| !s.is_empty()))
}

impl<'a, D: Directory> AttributeResolver<'a, D> {
    pub fn new(
        dir: &'a mut D,
        prompt: &'a mut dyn Prompt,
        schema: AttributeSchema,
        object_classes: Vec<String>,
        primary: &str,
    ) -> Result<Self> {
        let primary = schema.canonical(primary)?.to_string();
        Ok(Self {
            dir,
            prompt,
            schema,
            object_classes,
            primary,
            required: Vec::new(),
            templates: HashMap::new(),
            modifiers: HashMap::new(),
            message: None,
            reference: None,
            pre: HashMap::new(),
            post: HashMap::new(),
            attributes: AttributeMap::new(),
            omitted: HashSet::new(),
            resolving: Vec::new(),
        })
    }

    fn canonical(&self, name: &str) -> Result<String> {
        Ok(self.schema.canonical(name)?.to_string())
    }

    pub fn with_templates<I>(mut self, templates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, Template)>,
    {
        for (name, template) in templates {
            let key = self.canonical(&name)?;
            debug!(attribute = %key, "reading template");
            let parsed = ParsedTemplate::parse(&template, &key)?;
            self.templates.insert(key, parsed);
        }
        Ok(self)
    }

    pub fn with_modifiers<I>(mut self, modifiers: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, modifier) in modifiers {
            let modifier = Modifier::parse(&modifier, &name)?;
            let key = self.canonical(&name)?;
            debug!(attribute = %key, ?modifier, "reading modifier");
            self.modifiers.insert(key, modifier);
        }
        Ok(self)
    }

    pub fn with_message(mut self, template: Option<&str>) -> Result<Self> {
        self.message = template
            .map(|t| Format::parse(t, "message_on_create"))
            .transpose()?;
        Ok(self)
    }

    pub fn with_reference(mut self, reference: Option<DirectoryEntry>) -> Self {
        self.reference = reference;
        self
    }

    /// Always ask for this attribute, even when the schema makes it optional.
    pub fn require(mut self, name: &str) -> Result<Self> {
        let key = self.canonical(name)?;
        self.required.push(key);
        Ok(self)
    }

    pub fn pre_hook(mut self, name: &str, hook: impl PreResolveHook<D> + 'a) -> Result<Self> {
        let key = self.canonical(name)?;
        self.pre.insert(key, Box::new(hook));
        Ok(self)
    }

    pub fn post_hook(mut self, name: &str, hook: impl PostResolveHook<D> + 'a) -> Result<Self> {
        let key = self.canonical(name)?;
        self.post.insert(key, Box::new(hook));
        Ok(self)
    }

    /// Resolved values so far.
    pub fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Resolve one attribute (and, through its template, whatever it depends on).
    pub fn resolve(&mut self, name: &str) -> Result<()> {
        let key = self.canonical(name)?;
        if self.attributes.contains(&key) || self.omitted.contains(&key) {
            debug!(attribute = %key, "already resolved");
            return Ok(());
        }
        if let Some(start) = self.resolving.iter().position(|k| *k == key) {
            let mut chain = self.resolving[start..].to_vec();
            chain.push(key);
            return Err(LdadmError::CyclicTemplate(chain));
        }

        self.resolving.push(key.clone());
        let result = self.resolve_unguarded(&key);
        self.resolving.pop();
        result
    }

    fn resolve_unguarded(&mut self, key: &str) -> Result<()> {
        let mut default = if let Some(template) = self.templates.get(key).cloned() {
            debug!(attribute = %key, "rendering template");
            let modifier = self.modifiers.get(key).copied();
            let mut values = Vec::with_capacity(template.0.len());
            for format in &template.0 {
                let rendered = self.render(format)?;
                values.push(match modifier {
                    Some(m) => m.apply(&rendered),
                    None => rendered,
                });
            }
            Some(values)
        } else {
            self.reference_values(key)
        };

        if let Some(hook) = self.pre.get_mut(key) {
            debug!(attribute = %key, ?default, "calling pre-resolve hook");
            default = match hook.call(self.dir, default) {
                Ok(value) => value,
                Err(e) => {
                    warn!("{}", e);
                    None
                }
            };
        }
        let default = non_empty(default);

        let prompt = match &default {
            Some(values) => format!("{} [{}]: ", key, values.join("; ")),
            None => format!("{}: ", key),
        };

        loop {
            let response = self.prompt.ask(&prompt)?;
            if response == "." {
                debug!(attribute = %key, "omitted");
                self.omitted.insert(key.to_string());
                return Ok(());
            }

            let answer = if response.is_empty() {
                default.clone()
            } else {
                let pieces: Vec<String> = LIST_SEPARATOR
                    .split(&response)
                    .map(str::to_string)
                    .collect();
                if pieces.len() > 1 {
                    debug!(attribute = %key, ?pieces, "adding list");
                }
                Some(pieces)
            };

            let answer = match self.post.get_mut(key) {
                Some(hook) => match hook.call(self.dir, answer) {
                    Ok(value) => value,
                    Err(e) => {
                        error!("{}", e);
                        continue;
                    }
                },
                None => answer,
            };

            match non_empty(answer) {
                Some(values) => {
                    self.attributes.set(key, values);
                    return Ok(());
                }
                None => error!("{} requires a value", key),
            }
        }
    }

    fn reference_values(&self, key: &str) -> Option<Vec<String>> {
        let reference = self.reference.as_ref()?;
        let def = self.schema.get(key)?;
        std::iter::once(&def.name)
            .chain(def.aliases.iter())
            .find_map(|name| reference.get(name))
            .map(<[String]>::to_vec)
    }

    /// Render a format string, resolving every placeholder first.
    fn render(&mut self, format: &Format) -> Result<String> {
        let names: Vec<String> = format.placeholders().map(str::to_string).collect();
        for name in &names {
            self.resolve(name)?;
        }

        let mut out = String::new();
        for segment in &format.0 {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => {
                    let key = self.canonical(name)?;
                    // omitted attributes render as nothing
                    if let Some(values) = self.attributes.get(&key) {
                        out.push_str(&values.join("; "));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Resolve everything a new entry needs and hand back the result.
    ///
    /// The creation message goes first so that its placeholders are asked for in
    /// the order they appear there.
    pub fn build(mut self) -> Result<NewEntry> {
        let message = match self.message.take() {
            Some(format) => {
                debug!("rendering creation message");
                Some(self.render(&format)?)
            }
            None => None,
        };

        let wanted: Vec<(String, bool)> = self
            .schema
            .attributes()
            .map(|def| (def.name.clone(), def.mandatory))
            .collect();
        for (name, mandatory) in wanted {
            if name.eq_ignore_ascii_case("objectClass") {
                continue;
            }
            if mandatory
                || self.templates.contains_key(&name)
                || self.required.contains(&name)
                || name == self.primary
            {
                self.resolve(&name)?;
            }
        }
        self.attributes
            .set("objectClass", self.object_classes.clone());

        Ok(NewEntry {
            attributes: self.attributes,
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedPrompt;
    use crate::directory::memory::fixtures::{attrs, DirectoryFixture, USER_CLASSES};
    use crate::directory::memory::InMemoryDirectory;
    use std::cell::Cell;

    fn classes() -> Vec<String> {
        USER_CLASSES.iter().map(|s| s.to_string()).collect()
    }

    fn schema(dir: &mut InMemoryDirectory) -> AttributeSchema {
        dir.entry_schema(&classes()).unwrap()
    }

    fn templates(pairs: &[(&str, &str)]) -> Vec<(String, Template)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Template::Single(v.to_string())))
            .collect()
    }

    #[test]
    fn modifiers_match_their_names() {
        assert_eq!(Modifier::Capitalize.apply("hELLO wORLD"), "Hello world");
        assert_eq!(Modifier::Title.apply("mary-jane o'neil"), "Mary-Jane O'Neil");
        assert_eq!(Modifier::Swapcase.apply("AbC"), "aBc");
        assert_eq!(Modifier::Upper.apply("abc"), "ABC");
        assert!(matches!(
            Modifier::parse("reverse", "cn"),
            Err(LdadmError::InvalidModifier { .. })
        ));
    }

    #[test]
    fn template_parsing() {
        let format = Format::parse("/home/{uid}/{{x}}", "homeDirectory").unwrap();
        assert_eq!(format.placeholders().collect::<Vec<_>>(), vec!["uid"]);
        assert!(Format::parse("{uid", "x").is_err());
        assert!(Format::parse("a}b", "x").is_err());
        assert!(Format::parse("{}", "x").is_err());
    }

    #[test]
    fn template_dependencies_are_asked_first() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["Doe", "John", "", "jdoe", "1", "1", ""]);
        let entry = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_templates(templates(&[
                ("cn", "{givenName} {sn}"),
                ("homeDirectory", "/home/{uid}"),
            ]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(entry.attributes.first("cn"), Some("John Doe"));
        assert_eq!(entry.attributes.first("homeDirectory"), Some("/home/jdoe"));
        assert_eq!(entry.attributes.get("objectClass").unwrap().len(), 5);
        assert_eq!(
            prompt.asked()[..3],
            ["sn: ", "givenName: ", "cn [John Doe]: "]
        );
        assert_eq!(prompt.asked()[6], "homeDirectory [/home/jdoe]: ");
    }

    #[test]
    fn dot_omits_and_list_input_splits() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new([".", "a; b;c"]);
        let mut resolver =
            AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid").unwrap();
        resolver.resolve("description").unwrap();
        resolver.resolve("mail").unwrap();
        resolver.resolve("DESCRIPTION").unwrap();

        assert!(!resolver.attributes().contains("description"));
        assert_eq!(
            resolver.attributes().get("mail").unwrap(),
            ["a", "b;c"]
        );
    }

    #[test]
    fn empty_answer_without_default_asks_again() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["", "", "Smith"]);
        let mut resolver =
            AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid").unwrap();
        resolver.resolve("surname").unwrap();
        assert_eq!(resolver.attributes().first("sn"), Some("Smith"));
        drop(resolver);
        assert_eq!(prompt.asked().len(), 3);
    }

    #[test]
    fn cyclic_templates_are_reported() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_templates(templates(&[("cn", "{sn}"), ("sn", "{commonName}")]))
            .unwrap();
        match resolver.resolve("cn") {
            Err(LdadmError::CyclicTemplate(chain)) => assert_eq!(chain, vec!["cn", "sn", "cn"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn list_templates_apply_modifier_per_member() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["Jane", "", ""]);
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_templates(vec![(
                "mail".to_string(),
                Template::List(vec!["{gn}@example.org".into(), "{givenName}.x@example.org".into()]),
            )])
            .unwrap()
            .with_modifiers(vec![("mail".to_string(), "lower".to_string())])
            .unwrap();
        resolver.resolve("mail").unwrap();
        assert_eq!(
            resolver.attributes().get("mail").unwrap(),
            ["jane@example.org", "jane.x@example.org"]
        );
        drop(resolver);
        assert_eq!(
            prompt.asked()[1],
            "mail [jane@example.org; jane.x@example.org]: "
        );
    }

    #[test]
    fn each_attribute_is_resolved_once() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let calls = Cell::new(0);
        let mut prompt = ScriptedPrompt::new(["", "", ""]);
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_templates(templates(&[("cn", "{uid} A"), ("sn", "{uid} B")]))
            .unwrap()
            .pre_hook(
                "uid",
                |_: &mut InMemoryDirectory, _: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                    calls.set(calls.get() + 1);
                    Ok(Some(vec!["jdoe".to_string()]))
                },
            )
            .unwrap();
        resolver.resolve("cn").unwrap();
        resolver.resolve("sn").unwrap();
        assert_eq!(resolver.attributes().first("sn"), Some("jdoe B"));
        drop(resolver);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failing_pre_hook_drops_default() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["1234"]);
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .pre_hook(
                "uidNumber",
                |_: &mut InMemoryDirectory, _: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                    Err(LdadmError::Exhausted(50))
                },
            )
            .unwrap();
        resolver.resolve("uidNumber").unwrap();
        drop(resolver);
        assert_eq!(prompt.asked(), ["uidNumber: "]);
    }

    #[test]
    fn failing_post_hook_asks_again() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["bad", "good"]);
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .post_hook(
                "manager",
                |_: &mut InMemoryDirectory, v: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                    match v.as_deref() {
                        Some([one]) if one == "good" => Ok(Some(vec![format!("uid={}", one)])),
                        _ => Err(LdadmError::Hook("Unknown users: bad".into())),
                    }
                },
            )
            .unwrap();
        resolver.resolve("manager").unwrap();
        assert_eq!(resolver.attributes().first("manager"), Some("uid=good"));
    }

    #[test]
    fn reference_entry_supplies_defaults_by_alias() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let reference = DirectoryEntry::persisted(
            "uid=ref,ou=people,dc=example,dc=org",
            attrs(&[("surname", &["Reference"]), ("loginShell", &["/bin/zsh"])]),
        );
        let mut prompt = ScriptedPrompt::new(["", ""]);
        let mut resolver = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_reference(Some(reference));
        resolver.resolve("sn").unwrap();
        resolver.resolve("loginShell").unwrap();
        assert_eq!(resolver.attributes().first("sn"), Some("Reference"));
        assert_eq!(resolver.attributes().first("loginShell"), Some("/bin/zsh"));
    }

    #[test]
    fn message_is_rendered_first() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(["jdoe", "J", "D", "1", "1", "/h"]);
        let entry = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_message(Some("Created {uid}, {{welcome}}"))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(entry.message.as_deref(), Some("Created jdoe, {welcome}"));
        assert_eq!(prompt.asked()[0], "uid: ");
    }

    #[test]
    fn unknown_attribute_in_template_is_rejected() {
        let mut dir = DirectoryFixture::new().build();
        let schema = schema(&mut dir);
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        let result = AttributeResolver::new(&mut dir, &mut prompt, schema, classes(), "uid")
            .unwrap()
            .with_templates(templates(&[("shoeSize", "42")]));
        assert!(matches!(result, Err(LdadmError::UnknownAttribute(_))));
    }
}
