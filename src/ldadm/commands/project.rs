//! Projects reference users (manager, members) and servers by DN. Operators
//! type ids; the commands translate them.

use crate::commands::helpers::{
    dns_or_unknown, entry_resolver, list_entries, list_names, projects, reference_entry,
};
use crate::commands::{CmdMessage, CmdResult, Listing};
use crate::config::ProjectSettings;
use crate::console::Prompt;
use crate::directory::{Directory, Modification};
use crate::dn::{leaf_rdn, parse_rdn};
use crate::error::{LdadmError, Result};
use crate::mapping::{EntryMapping, Selection};

pub fn list<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    page_size: usize,
    out: &mut dyn Listing,
) -> Result<()> {
    list_names(&projects(settings, page_size), dir, out)
}

pub fn show<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    page_size: usize,
    ids: &[String],
    full: bool,
    out: &mut dyn Listing,
) -> Result<()> {
    let mut mapping = projects(settings, page_size);
    mapping.select(Selection::ids(ids.iter().cloned()));
    list_entries(&mapping, dir, full, out)
}

/// Offer DN-valued defaults as the ids they name, so the operator sees and
/// types the same kind of value.
fn ids_from_dns(values: Option<Vec<String>>) -> Option<Vec<String>> {
    values.map(|values| {
        values
            .into_iter()
            .map(|value| {
                leaf_rdn(&value)
                    .and_then(parse_rdn)
                    .ok()
                    .and_then(|components| components.into_iter().next())
                    .and_then(|component| component.value().ok())
                    .unwrap_or(value)
            })
            .collect()
    })
}

/// Interactively build a new project. Manager and member answers are user ids
/// looked up among `people`; unknown ids are asked again.
pub fn add<D: Directory>(
    dir: &mut D,
    prompt: &mut dyn Prompt,
    settings: &ProjectSettings,
    people: &EntryMapping,
    page_size: usize,
    defaults: Option<&str>,
) -> Result<CmdResult> {
    let mapping = projects(settings, page_size);
    let reference = reference_entry(&mapping, dir, defaults)?;

    let mut resolver = entry_resolver(&mut *dir, prompt, &mapping, &settings.entry, reference)?;
    for attribute in [&settings.manager_attr, &settings.member_attr] {
        resolver = resolver
            .pre_hook(
                attribute,
                |_: &mut D, default: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                    Ok(ids_from_dns(default))
                },
            )?
            .post_hook(
                attribute,
                |dir: &mut D, value: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                    value
                        .map(|ids| dns_or_unknown(people, dir, ids))
                        .transpose()
                },
            )?;
    }
    let entry = resolver.build()?;
    let dn = mapping.insert(dir, &entry.attributes)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Project added: {}", dn)));
    if let Some(message) = entry.message {
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_affected_dns(vec![dn]))
}

pub fn delete<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    page_size: usize,
    ids: &[String],
) -> Result<CmdResult> {
    let mut mapping = projects(settings, page_size);
    mapping.select(Selection::ids(ids.iter().cloned()));
    let deleted = mapping.delete(dir)?;
    let mut result = CmdResult::default();
    for dn in &deleted {
        result.add_message(CmdMessage::success(format!("Project deleted: {}", dn)));
    }
    Ok(result.with_affected_dns(deleted))
}

/// Add the DNs of `names` (looked up in `targets`) to the project's `attribute`.
fn add_references<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    page_size: usize,
    project: &str,
    attribute: &str,
    targets: &EntryMapping,
    names: &[String],
) -> Result<String> {
    let project = projects(settings, page_size).get(dir, project)?;
    let dns = dns_or_unknown(targets, dir, names.iter().cloned())?;
    dir.modify(
        project.dn(),
        &[Modification::Add(attribute.to_string(), dns)],
    )?;
    Ok(project.dn().to_string())
}

pub fn add_members<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    people: &EntryMapping,
    page_size: usize,
    project: &str,
    names: &[String],
) -> Result<CmdResult> {
    if names.is_empty() {
        return Err(LdadmError::Api(format!(
            "Expected user IDs to assign to {}",
            project
        )));
    }
    let dn = add_references(
        dir,
        settings,
        page_size,
        project,
        &settings.member_attr,
        people,
        names,
    )
    .map_err(|e| match e {
        LdadmError::ValueExists(_) => {
            LdadmError::Api("One or more users already assigned to this project".to_string())
        }
        other => other,
    })?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Members added to {}", dn)));
    Ok(result.with_affected_dns(vec![dn]))
}

pub fn add_servers<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    servers: &EntryMapping,
    page_size: usize,
    project: &str,
    names: &[String],
) -> Result<CmdResult> {
    if names.is_empty() {
        return Err(LdadmError::Api(format!(
            "Expected server IDs to add to {}",
            project
        )));
    }
    let dn = add_references(
        dir,
        settings,
        page_size,
        project,
        &settings.server_attr,
        servers,
        names,
    )
    .map_err(|e| match e {
        LdadmError::ValueExists(_) => {
            LdadmError::Api("One or more servers already belong to this project".to_string())
        }
        other => other,
    })?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Servers added to {}", dn)));
    Ok(result.with_affected_dns(vec![dn]))
}

/// Make `user` (an active user) the project's only manager.
pub fn manage<D: Directory>(
    dir: &mut D,
    settings: &ProjectSettings,
    people: &EntryMapping,
    page_size: usize,
    project: &str,
    user: &str,
) -> Result<CmdResult> {
    let project = projects(settings, page_size).get(dir, project)?;
    let manager = people.get(dir, user)?;
    dir.modify(
        project.dn(),
        &[Modification::Replace(
            settings.manager_attr.clone(),
            vec![manager.dn().to_string()],
        )],
    )?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!(
        "Manager of {} set to {}",
        project.dn(),
        manager.dn()
    )));
    Ok(result.with_affected_dns(vec![project.dn().to_string()]))
}
