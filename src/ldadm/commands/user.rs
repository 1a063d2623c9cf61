//! User accounts live in two subtrees: active and suspended. Suspending and
//! restoring move entries between them; only suspended accounts can be deleted.

use crate::allocator::UniqueIdAllocator;
use crate::commands::helpers::{entry_resolver, list_entries, list_names, reference_entry, users};
use crate::commands::{CmdMessage, CmdResult, Listing};
use crate::config::UserSettings;
use crate::console::Prompt;
use crate::directory::{Directory, Modification};
use crate::error::{LdadmError, Result};
use crate::mapping::{Destination, EntryMapping, Selection};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

const PASSWORD_MIN_LEN: usize = 10;
const PASSWORD_MAX_LEN: usize = 18;
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~0123456789";

/// A random password of random length over letters, digits and punctuation.
pub fn make_password<R: Rng>(rng: &mut R) -> String {
    let length = rng.gen_range(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN);
    (0..length)
        .filter_map(|_| PASSWORD_ALPHABET.choose(rng).map(|&b| b as char))
        .collect()
}

fn active(settings: &UserSettings, page_size: usize) -> EntryMapping {
    users(settings, &settings.active_base, page_size)
}

fn suspended(settings: &UserSettings, page_size: usize) -> EntryMapping {
    users(settings, &settings.suspended_base, page_size)
}

fn base_users(settings: &UserSettings, page_size: usize, only_suspended: bool) -> EntryMapping {
    if only_suspended {
        suspended(settings, page_size)
    } else {
        active(settings, page_size)
    }
}

pub fn list<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    only_suspended: bool,
    filter: Option<&str>,
    out: &mut dyn Listing,
) -> Result<()> {
    let mut mapping = base_users(settings, page_size, only_suspended);
    if let Some(filter) = filter {
        mapping.select(Selection::Filter(filter.to_string()));
    }
    list_names(&mapping, dir, out)
}

pub fn show<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    only_suspended: bool,
    ids: &[String],
    full: bool,
    out: &mut dyn Listing,
) -> Result<()> {
    let mut mapping = base_users(settings, page_size, only_suspended);
    mapping.select(Selection::ids(ids.iter().cloned()));
    list_entries(&mapping, dir, full, out)
}

fn move_users<D: Directory>(
    dir: &mut D,
    from: EntryMapping,
    to: &EntryMapping,
    ids: &[String],
    verb: &str,
) -> Result<CmdResult> {
    let mut from = from;
    from.select(Selection::ids(ids.iter().cloned()));
    let moved = from.move_to(dir, Destination::Mapping(to))?;
    let mut result = CmdResult::default();
    for dn in &moved {
        result.add_message(CmdMessage::success(format!("User {}: {}", verb, dn)));
    }
    Ok(result.with_affected_dns(moved))
}

pub fn suspend<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    ids: &[String],
) -> Result<CmdResult> {
    let to = suspended(settings, page_size);
    move_users(dir, active(settings, page_size), &to, ids, "suspended")
}

pub fn restore<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    ids: &[String],
) -> Result<CmdResult> {
    let to = active(settings, page_size);
    move_users(dir, suspended(settings, page_size), &to, ids, "restored")
}

/// Only suspended users can be deleted.
pub fn delete<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    ids: &[String],
) -> Result<CmdResult> {
    let mut mapping = suspended(settings, page_size);
    mapping.select(Selection::ids(ids.iter().cloned()));
    let deleted = mapping.delete(dir)?;
    let mut result = CmdResult::default();
    for dn in &deleted {
        result.add_message(CmdMessage::success(format!("User deleted: {}", dn)));
    }
    Ok(result.with_affected_dns(deleted))
}

pub fn rename<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    old_id: &str,
    new_id: &str,
) -> Result<CmdResult> {
    let dn = active(settings, page_size)
        .rename(dir, old_id, new_id)
        .map_err(|e| match e {
            LdadmError::AlreadyExists(_) => LdadmError::AlreadyExists(format!("User '{}'", new_id)),
            other => other,
        })?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("User renamed: {}", dn)));
    Ok(result.with_affected_dns(vec![dn]))
}

/// Set a fresh random password and return it.
pub fn passwd<D: Directory>(
    dir: &mut D,
    settings: &UserSettings,
    page_size: usize,
    id: &str,
) -> Result<CmdResult> {
    let user = active(settings, page_size).get(dir, id)?;
    let password = make_password(&mut rand::thread_rng());
    dir.modify(
        user.dn(),
        &[Modification::Replace(
            settings.passwd_attr.clone(),
            vec![password.clone()],
        )],
    )?;
    Ok(CmdResult::default()
        .with_affected_dns(vec![user.dn().to_string()])
        .with_secret(password))
}

fn allocator(settings: &UserSettings, page_size: usize) -> Result<UniqueIdAllocator> {
    Ok(
        UniqueIdAllocator::new(settings.nuid_attr.as_str(), settings.nuid.min, settings.nuid.max)?
            .with_subtree("suspended", suspended(settings, page_size))
            .with_subtree("active", active(settings, page_size)),
    )
}

/// Interactively build a new active user and write it.
///
/// The numeric id defaults to a free number, the password to a random one, and a
/// uid already taken in either subtree is refused.
pub fn add<D: Directory>(
    dir: &mut D,
    prompt: &mut dyn Prompt,
    settings: &UserSettings,
    page_size: usize,
    defaults: Option<&str>,
) -> Result<CmdResult> {
    let mapping = active(settings, page_size);
    let reference = reference_entry(&mapping, dir, defaults)?;
    let ids = allocator(settings, page_size)?;

    let entry = entry_resolver(&mut *dir, prompt, &mapping, &settings.entry, reference)?
        .require(&settings.passwd_attr)?
        .pre_hook(
            &settings.nuid_attr,
            |dir: &mut D, _: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                let number = ids.allocate(dir, &mut rand::thread_rng())?;
                Ok(Some(vec![number.to_string()]))
            },
        )?
        .pre_hook(
            &settings.uid_attr,
            |dir: &mut D, default: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                for uid in default.iter().flatten() {
                    ids.ensure_unique(dir, uid)?;
                }
                Ok(default)
            },
        )?
        .post_hook(
            &settings.uid_attr,
            |dir: &mut D, value: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                for uid in value.iter().flatten() {
                    ids.ensure_unique(dir, uid)?;
                }
                Ok(value)
            },
        )?
        .pre_hook(
            &settings.passwd_attr,
            |_: &mut D, _: Option<Vec<String>>| -> Result<Option<Vec<String>>> {
                Ok(Some(vec![make_password(&mut rand::thread_rng())]))
            },
        )?
        .build()?;
    debug!(attributes = ?entry.attributes, "final entry");

    let dn = mapping.insert(dir, &entry.attributes)?;
    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("User added: {}", dn)));
    if let Some(message) = entry.message.filter(|m| !m.is_empty()) {
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_affected_dns(vec![dn]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Listed;
    use crate::config::fixtures::config;
    use crate::console::ScriptedPrompt;
    use crate::directory::memory::fixtures::{DirectoryFixture, PEOPLE, SUSPENDED};
    use crate::directory::memory::InMemoryDirectory;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings() -> UserSettings {
        config().user().unwrap()
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn directory() -> InMemoryDirectory {
        DirectoryFixture::new()
            .with_active_users(&["alice", "bob", "carol"])
            .with_suspended_users(&["dave"])
            .build()
    }

    #[test]
    fn passwords_have_bounded_length() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let password = make_password(&mut rng);
            let len = password.chars().count();
            assert!((PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len));
            assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn lists_active_or_suspended() {
        let mut dir = directory();
        let mut active = Listed::default();
        list(&mut dir, &settings(), 2, false, None, &mut active).unwrap();
        assert_eq!(active.names, vec!["alice", "bob", "carol"]);
        let mut suspended = Listed::default();
        list(&mut dir, &settings(), 2, true, None, &mut suspended).unwrap();
        assert_eq!(suspended.names, vec!["dave"]);
    }

    #[test]
    fn search_applies_filter() {
        let mut dir = directory();
        let mut found = Listed::default();
        list(&mut dir, &settings(), 10, false, Some("(uid=b*)"), &mut found).unwrap();
        assert_eq!(found.names, vec!["bob"]);
        assert!(matches!(
            list(&mut dir, &settings(), 10, false, Some("(uid=b"), &mut Listed::default()),
            Err(LdadmError::InvalidFilter(_))
        ));
    }

    #[test]
    fn show_returns_all_attributes() {
        let mut dir = directory();
        let mut shown = Listed::default();
        show(&mut dir, &settings(), 10, false, &ids(&["bob"]), false, &mut shown).unwrap();
        assert_eq!(shown.entries.len(), 1);
        assert_eq!(shown.entries[0].get("homeDirectory").unwrap(), ["/home/bob"]);
    }

    #[test]
    fn show_emits_found_users_before_missing() {
        let mut dir = directory();
        let mut shown = Listed::default();
        let err = show(&mut dir, &settings(), 10, false, &ids(&["bob", "zed"]), false, &mut shown)
            .unwrap_err();
        assert_eq!(err.to_string(), "Users not found: zed");
        assert_eq!(shown.entries.len(), 1);
        assert_eq!(shown.entries[0].dn(), format!("uid=bob,{}", PEOPLE));
    }

    #[test]
    fn suspend_moves_found_users_and_reports_missing() {
        let mut dir = directory();
        let err = suspend(&mut dir, &settings(), 10, &ids(&["alice", "erin"])).unwrap_err();
        assert_eq!(err.to_string(), "Users not found: erin");
        assert!(dir.contains(&format!("uid=alice,{}", SUSPENDED)));
        assert!(!dir.contains(&format!("uid=alice,{}", PEOPLE)));
    }

    #[test]
    fn restore_moves_back() {
        let mut dir = directory();
        let result = restore(&mut dir, &settings(), 10, &ids(&["dave"])).unwrap();
        assert_eq!(result.affected_dns, vec![format!("uid=dave,{}", PEOPLE)]);
    }

    #[test]
    fn delete_only_touches_suspended() {
        let mut dir = directory();
        let err = delete(&mut dir, &settings(), 10, &ids(&["alice"])).unwrap_err();
        assert!(matches!(err, LdadmError::MissingObjects { .. }));
        assert!(dir.contains(&format!("uid=alice,{}", PEOPLE)));

        delete(&mut dir, &settings(), 10, &ids(&["dave"])).unwrap();
        assert!(!dir.contains(&format!("uid=dave,{}", SUSPENDED)));
    }

    #[test]
    fn rename_collision_has_domain_message() {
        let mut dir = directory();
        let err = rename(&mut dir, &settings(), 10, "bob", "alice").unwrap_err();
        assert!(matches!(&err, LdadmError::AlreadyExists(what) if what == "User 'alice'"));
        assert_eq!(err.to_string(), "User 'alice' already exists");
        assert!(dir.contains(&format!("uid=bob,{}", PEOPLE)));

        rename(&mut dir, &settings(), 10, "bob", "robert").unwrap();
        let renamed = dir.entry(&format!("uid=robert,{}", PEOPLE)).unwrap();
        assert_eq!(renamed.get("uid").unwrap(), ["robert"]);
    }

    #[test]
    fn passwd_replaces_password() {
        let mut dir = directory();
        let result = passwd(&mut dir, &settings(), 10, "carol").unwrap();
        let secret = result.secret.unwrap();
        let entry = dir.entry(&format!("uid=carol,{}", PEOPLE)).unwrap();
        assert_eq!(entry.get("userPassword").unwrap(), [secret]);
    }

    #[test]
    fn add_resolves_defaults_and_writes_entry() {
        let mut dir = directory();
        // givenName (for the message), sn, cn, userPassword, uid, uidNumber,
        // gidNumber, homeDirectory
        let mut prompt = ScriptedPrompt::new(["John", "Doe", "", "", "JDoe", "", "", ""]);
        let result = add(&mut dir, &mut prompt, &settings(), 10, None).unwrap();

        let dn = format!("uid=JDoe,{}", PEOPLE);
        assert_eq!(result.affected_dns, vec![dn.clone()]);
        assert_eq!(result.messages[1].content, "Welcome, John!");

        let entry = dir.entry(&dn).unwrap();
        assert_eq!(entry.get("cn").unwrap(), ["John Doe"]);
        assert_eq!(entry.get("homeDirectory").unwrap(), ["/home/JDoe"]);
        assert_eq!(entry.get("gidNumber").unwrap(), ["100"]);
        let number: u64 = entry.get("uidNumber").unwrap()[0].parse().unwrap();
        assert!((2000..=2999).contains(&number));
        assert!(!entry.get("userPassword").unwrap()[0].is_empty());
    }

    #[test]
    fn add_refuses_taken_uid() {
        let mut dir = directory();
        let mut prompt =
            ScriptedPrompt::new(["John", "Doe", "", "", "dave", "erin", "", "", ""]);
        add(&mut dir, &mut prompt, &settings(), 10, None).unwrap();
        assert!(dir.contains(&format!("uid=erin,{}", PEOPLE)));
        assert_eq!(prompt.asked()[4], "uid: ");
        assert_eq!(prompt.asked()[5], "uid: ");
    }

    #[test]
    fn add_with_defaults_offers_reference_values() {
        let mut dir = directory();
        let mut prompt = ScriptedPrompt::new(["Frank", "", "", "", "frank", "", "", ""]);
        add(&mut dir, &mut prompt, &settings(), 10, Some("bob")).unwrap();
        assert_eq!(prompt.asked()[0], "givenName: ");
        assert_eq!(prompt.asked()[1], "sn [bob]: ");
        // bob's uid is taken, so it is not offered
        assert_eq!(prompt.asked()[4], "uid: ");
        let entry = dir.entry(&format!("uid=frank,{}", PEOPLE)).unwrap();
        assert_eq!(entry.get("sn").unwrap(), ["bob"]);
    }
}
