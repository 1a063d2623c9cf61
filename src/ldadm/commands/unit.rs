//! Organizational units inside a managed subtree (users, projects or servers).
//!
//! Every function takes the `units` mapping for the subtree (see
//! [`helpers::units`](super::helpers::units)) and, where members are involved,
//! the mapping for the objects that live in it.

use crate::commands::helpers::{entry_resolver, list_names, members_of};
use crate::commands::{CmdMessage, CmdResult, Listing};
use crate::config::EntrySettings;
use crate::console::Prompt;
use crate::directory::Directory;
use crate::error::{LdadmError, Result};
use crate::mapping::{Destination, EntryMapping, Selection};

pub fn list<D: Directory>(dir: &mut D, units: &EntryMapping, out: &mut dyn Listing) -> Result<()> {
    list_names(units, dir, out)
}

/// Members directly in `unit`, or anywhere below it with `full`.
pub fn show<D: Directory>(
    dir: &mut D,
    units: &EntryMapping,
    members: &EntryMapping,
    unit: &str,
    full: bool,
    out: &mut dyn Listing,
) -> Result<()> {
    let unit = units.get(dir, unit)?;
    list_names(&members_of(members, unit.dn(), full), dir, out)
}

pub fn add<D: Directory>(
    dir: &mut D,
    prompt: &mut dyn Prompt,
    units: &EntryMapping,
    settings: &EntrySettings,
    parent: Option<&str>,
) -> Result<CmdResult> {
    let target = match parent {
        Some(parent) => {
            let parent = units.get(dir, parent)?;
            units.rebased(parent.dn())
        }
        None => units.clone(),
    };

    let entry = entry_resolver(&mut *dir, prompt, &target, settings, None)?.build()?;
    let dn = target.insert(dir, &entry.attributes)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Unit added: {}", dn)));
    if let Some(message) = entry.message {
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_affected_dns(vec![dn]))
}

/// Only empty units can be deleted.
pub fn delete<D: Directory>(dir: &mut D, units: &EntryMapping, names: &[String]) -> Result<CmdResult> {
    let mut selected = units.clone();
    selected.select(Selection::ids(names.iter().cloned()));
    let deleted = selected.delete(dir).map_err(|e| match e {
        LdadmError::NotAllowedOnNonLeaf(_) => LdadmError::Api("One or more units not empty".to_string()),
        other => other,
    })?;
    let mut result = CmdResult::default();
    for dn in &deleted {
        result.add_message(CmdMessage::success(format!("Unit deleted: {}", dn)));
    }
    Ok(result.with_affected_dns(deleted))
}

/// Move the members named by `ids` directly below `unit`.
pub fn assign<D: Directory>(
    dir: &mut D,
    units: &EntryMapping,
    members: &EntryMapping,
    unit: &str,
    ids: &[String],
) -> Result<CmdResult> {
    let unit = units.get(dir, unit)?;
    let mut selected = members.clone();
    selected.select(Selection::ids(ids.iter().cloned()));
    let moved = selected.move_to(dir, Destination::Base(unit.dn()))?;
    let mut result = CmdResult::default();
    for dn in &moved {
        result.add_message(CmdMessage::success(format!("Moved to unit: {}", dn)));
    }
    Ok(result.with_affected_dns(moved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Listed;
    use crate::commands::helpers::{units, users};
    use crate::config::fixtures::config;
    use crate::console::ScriptedPrompt;
    use crate::directory::memory::fixtures::{DirectoryFixture, PEOPLE};

    const DEV: &str = "ou=dev,ou=people,dc=example,dc=org";

    fn people_units() -> EntryMapping {
        units(PEOPLE, 10)
    }

    fn people() -> EntryMapping {
        users(&config().user().unwrap(), PEOPLE, 10)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn list_excludes_the_subtree_root() {
        let mut dir = DirectoryFixture::new()
            .with_unit(PEOPLE, "dev")
            .with_unit(DEV, "backend")
            .build();
        let mut listed = Listed::default();
        list(&mut dir, &people_units(), &mut listed).unwrap();
        listed.names.sort();
        assert_eq!(listed.names, vec!["backend", "dev"]);
    }

    #[test]
    fn show_lists_members() {
        let mut dir = DirectoryFixture::new()
            .with_active_users(&["alice"])
            .with_unit(PEOPLE, "dev")
            .with_user_at(DEV, "bob")
            .with_unit(DEV, "backend")
            .with_user_at("ou=backend,ou=dev,ou=people,dc=example,dc=org", "carol")
            .build();
        let mut direct = Listed::default();
        show(&mut dir, &people_units(), &people(), "dev", false, &mut direct).unwrap();
        assert_eq!(direct.names, vec!["bob"]);

        let mut all = Listed::default();
        show(&mut dir, &people_units(), &people(), "dev", true, &mut all).unwrap();
        all.names.sort();
        assert_eq!(all.names, vec!["bob", "carol"]);

        let err = show(&mut dir, &people_units(), &people(), "ops", false, &mut Listed::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Units not found: ops");
    }

    #[test]
    fn add_under_parent() {
        let mut dir = DirectoryFixture::new().with_unit(PEOPLE, "dev").build();
        let mut prompt = ScriptedPrompt::new(["backend"]);
        let settings = config().unit().unwrap();
        let result = add(&mut dir, &mut prompt, &people_units(), &settings, Some("dev")).unwrap();

        let dn = "ou=backend,ou=dev,ou=people,dc=example,dc=org";
        assert_eq!(result.affected_dns, vec![dn]);
        assert_eq!(prompt.asked(), ["ou: "]);
        let entry = dir.entry(dn).unwrap();
        assert_eq!(entry.get("objectClass").unwrap(), ["organizationalUnit"]);
    }

    #[test]
    fn add_at_subtree_root() {
        let mut dir = DirectoryFixture::new().build();
        let mut prompt = ScriptedPrompt::new(["ops"]);
        let settings = config().unit().unwrap();
        add(&mut dir, &mut prompt, &people_units(), &settings, None).unwrap();
        assert!(dir.contains("ou=ops,ou=people,dc=example,dc=org"));
    }

    #[test]
    fn delete_refuses_non_empty_units() {
        let mut dir = DirectoryFixture::new()
            .with_unit(PEOPLE, "dev")
            .with_user_at(DEV, "bob")
            .with_unit(PEOPLE, "ops")
            .build();
        let err = delete(&mut dir, &people_units(), &strings(&["dev"])).unwrap_err();
        assert_eq!(err.to_string(), "One or more units not empty");

        let result = delete(&mut dir, &people_units(), &strings(&["ops"])).unwrap();
        assert_eq!(result.affected_dns, vec!["ou=ops,ou=people,dc=example,dc=org"]);
        assert!(!dir.contains("ou=ops,ou=people,dc=example,dc=org"));
    }

    #[test]
    fn assign_moves_members_below_unit() {
        let mut dir = DirectoryFixture::new()
            .with_active_users(&["alice", "bob"])
            .with_unit(PEOPLE, "dev")
            .build();
        let result = assign(
            &mut dir,
            &people_units(),
            &people(),
            "dev",
            &strings(&["alice"]),
        )
        .unwrap();
        assert_eq!(result.affected_dns, vec![format!("uid=alice,{}", DEV)]);
        assert!(dir.contains(&format!("uid=alice,{}", DEV)));

        let mut members = Listed::default();
        show(&mut dir, &people_units(), &people(), "dev", false, &mut members).unwrap();
        assert_eq!(members.names, vec!["alice"]);
    }
}
