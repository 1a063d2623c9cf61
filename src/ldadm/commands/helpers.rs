use crate::commands::Listing;
use crate::config::{EntrySettings, ProjectSettings, ServerSettings, UserSettings};
use crate::console::Prompt;
use crate::directory::Directory;
use crate::error::{LdadmError, Result};
use crate::mapping::EntryMapping;
use crate::model::{DirectoryEntry, Projection, SearchScope};
use crate::resolver::AttributeResolver;

pub const UNIT_CLASS: &str = "organizationalUnit";
pub const UNIT_ATTRIBUTE: &str = "ou";

pub fn users(settings: &UserSettings, base: &str, page_size: usize) -> EntryMapping {
    EntryMapping::new("Users", base, settings.uid_attr.as_str())
        .with_object_classes(settings.object_classes.iter().cloned())
        .with_page_size(page_size)
}

pub fn projects(settings: &ProjectSettings, page_size: usize) -> EntryMapping {
    EntryMapping::new("Projects", settings.base.as_str(), settings.id_attr.as_str())
        .with_object_classes(settings.object_classes.iter().cloned())
        .with_page_size(page_size)
}

pub fn servers(settings: &ServerSettings, page_size: usize) -> EntryMapping {
    EntryMapping::new("Servers", settings.base.as_str(), settings.id_attr.as_str())
        .with_object_classes(settings.object_classes.iter().cloned())
        .with_page_size(page_size)
}

pub fn units(base: &str, page_size: usize) -> EntryMapping {
    EntryMapping::new("Units", base, UNIT_ATTRIBUTE)
        .with_object_classes([UNIT_CLASS])
        .with_page_size(page_size)
}

/// `mapping` restricted to the entries directly below `base` (or anywhere below it
/// with `full`).
pub fn members_of(mapping: &EntryMapping, base: &str, full: bool) -> EntryMapping {
    let scope = if full {
        SearchScope::Subtree
    } else {
        SearchScope::OneLevel
    };
    mapping.rebased(base).with_scope(scope)
}

/// Hand each id to `out` as its page arrives.
pub fn list_names<D: Directory>(
    mapping: &EntryMapping,
    dir: &mut D,
    out: &mut dyn Listing,
) -> Result<()> {
    for name in mapping.keys(dir)? {
        out.name(name?);
    }
    Ok(())
}

/// Hand each entry to `out` with every user attribute (plus operational ones
/// with `full`).
pub fn list_entries<D: Directory>(
    mapping: &EntryMapping,
    dir: &mut D,
    full: bool,
    out: &mut dyn Listing,
) -> Result<()> {
    let projection = if full {
        Projection::List(vec!["*".to_string(), "+".to_string()])
    } else {
        Projection::All
    };
    for entry in mapping.clone().with_projection(projection).values(dir)? {
        out.entry(entry?);
    }
    Ok(())
}

/// The reference entry for `add --defaults`.
pub fn reference_entry<D: Directory>(
    mapping: &EntryMapping,
    dir: &mut D,
    id: Option<&str>,
) -> Result<Option<DirectoryEntry>> {
    id.map(|id| mapping.clone().with_projection(Projection::All).get(dir, id))
        .transpose()
}

/// DNs for `ids`, with unknown ids reported as "Unknown <kind>: a, b".
pub fn dns_or_unknown<D, I, S>(mapping: &EntryMapping, dir: &mut D, ids: I) -> Result<Vec<String>>
where
    D: Directory,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    mapping.dns_of(dir, ids).map_err(|e| match e {
        LdadmError::MissingObjects { kind, items } => LdadmError::Hook(format!(
            "Unknown {}: {}",
            kind.to_lowercase(),
            items.join(", ")
        )),
        other => other,
    })
}

/// A resolver for a new entry of `mapping`'s kind, prepared from its settings.
pub fn entry_resolver<'a, D: Directory>(
    dir: &'a mut D,
    prompt: &'a mut dyn Prompt,
    mapping: &EntryMapping,
    settings: &EntrySettings,
    reference: Option<DirectoryEntry>,
) -> Result<AttributeResolver<'a, D>> {
    let classes = mapping.object_classes().to_vec();
    let schema = dir.entry_schema(&classes)?;
    AttributeResolver::new(dir, prompt, schema, classes, mapping.primary_attribute())?
        .with_templates(settings.templates.iter().cloned())?
        .with_modifiers(settings.modifiers.iter().cloned())?
        .with_message(settings.message.as_deref())
        .map(|resolver| resolver.with_reference(reference))
}
