use crate::commands::helpers::{entry_resolver, list_entries, list_names, reference_entry, servers};
use crate::commands::{CmdMessage, CmdResult, Listing};
use crate::config::ServerSettings;
use crate::console::Prompt;
use crate::directory::Directory;
use crate::error::Result;
use crate::mapping::Selection;

pub fn list<D: Directory>(
    dir: &mut D,
    settings: &ServerSettings,
    page_size: usize,
    out: &mut dyn Listing,
) -> Result<()> {
    list_names(&servers(settings, page_size), dir, out)
}

pub fn show<D: Directory>(
    dir: &mut D,
    settings: &ServerSettings,
    page_size: usize,
    ids: &[String],
    full: bool,
    out: &mut dyn Listing,
) -> Result<()> {
    let mut mapping = servers(settings, page_size);
    mapping.select(Selection::ids(ids.iter().cloned()));
    list_entries(&mapping, dir, full, out)
}

pub fn add<D: Directory>(
    dir: &mut D,
    prompt: &mut dyn Prompt,
    settings: &ServerSettings,
    page_size: usize,
    defaults: Option<&str>,
) -> Result<CmdResult> {
    let mapping = servers(settings, page_size);
    let reference = reference_entry(&mapping, dir, defaults)?;
    let entry = entry_resolver(&mut *dir, prompt, &mapping, &settings.entry, reference)?.build()?;
    let dn = mapping.insert(dir, &entry.attributes)?;

    let mut result = CmdResult::default();
    result.add_message(CmdMessage::success(format!("Server added: {}", dn)));
    if let Some(message) = entry.message {
        result.add_message(CmdMessage::info(message));
    }
    Ok(result.with_affected_dns(vec![dn]))
}

pub fn delete<D: Directory>(
    dir: &mut D,
    settings: &ServerSettings,
    page_size: usize,
    ids: &[String],
) -> Result<CmdResult> {
    let mut mapping = servers(settings, page_size);
    mapping.select(Selection::ids(ids.iter().cloned()));
    let deleted = mapping.delete(dir)?;
    let mut result = CmdResult::default();
    for dn in &deleted {
        result.add_message(CmdMessage::success(format!("Server deleted: {}", dn)));
    }
    Ok(result.with_affected_dns(deleted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Listed;
    use crate::config::fixtures::config;
    use crate::console::ScriptedPrompt;
    use crate::directory::memory::fixtures::DirectoryFixture;
    use crate::error::LdadmError;

    fn settings() -> ServerSettings {
        config().server().unwrap()
    }

    #[test]
    fn list_servers() {
        let mut dir = DirectoryFixture::new()
            .with_server("www1")
            .with_server("db1")
            .build();
        let mut listed = Listed::default();
        list(&mut dir, &settings(), 1, &mut listed).unwrap();
        assert_eq!(listed.names, vec!["db1", "www1"]);
    }

    #[test]
    fn show_reports_missing_servers() {
        let mut dir = DirectoryFixture::new().with_server("www1").build();
        let ids = vec!["www1".to_string(), "www2".to_string()];
        let mut shown = Listed::default();
        match show(&mut dir, &settings(), 10, &ids, false, &mut shown) {
            Err(LdadmError::MissingObjects { kind, items }) => {
                assert_eq!(kind, "Servers");
                assert_eq!(items, vec!["www2"]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(shown.entries.len(), 1);
        assert_eq!(shown.entries[0].get("cn").unwrap(), ["www1"]);
    }

    #[test]
    fn add_with_defaults_copies_reference() {
        let mut dir = DirectoryFixture::new().with_server("www1").build();
        let mut prompt = ScriptedPrompt::new(["www2"]);
        let result = add(&mut dir, &mut prompt, &settings(), 10, Some("www1")).unwrap();
        // cn is the only mandatory attribute; the reference offers its value
        assert_eq!(prompt.asked(), ["cn [www1]: "]);
        assert_eq!(result.affected_dns, vec!["cn=www2,ou=servers,dc=example,dc=org"]);
    }

    #[test]
    fn delete_servers() {
        let mut dir = DirectoryFixture::new().with_server("www1").build();
        delete(&mut dir, &settings(), 10, &["www1".to_string()]).unwrap();
        assert!(!dir.contains("cn=www1,ou=servers,dc=example,dc=org"));
    }
}
