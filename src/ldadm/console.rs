//! Console-facing pieces that the core needs but that do no terminal I/O themselves:
//! the [`Prompt`] seam used by the resolver, and the entry formatter used by `show`.

use crate::error::{LdadmError, Result};
use crate::model::DirectoryEntry;
use std::collections::VecDeque;
use std::io::BufRead;
use unicode_width::UnicodeWidthStr;

/// Asks the operator one question and returns the answer without its line ending.
pub trait Prompt {
    fn ask(&mut self, prompt: &str) -> Result<String>;
}

/// Replays canned answers; used by tests and non-interactive callers.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }

    /// Every prompt shown so far, in order.
    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl Prompt for ScriptedPrompt {
    fn ask(&mut self, prompt: &str) -> Result<String> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| LdadmError::Api(format!("No answer for prompt '{}'", prompt.trim())))
    }
}

/// Newline-delimited identifiers, blank lines skipped.
pub fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Render an entry as `name: value` lines.
///
/// Names are sorted and right-aligned against the longest one; extra values of a
/// multi-valued attribute go on continuation lines. The block ends with an empty
/// line so that consecutive entries stay apart.
pub fn format_entry(entry: &DirectoryEntry) -> String {
    let mut names: Vec<&str> = entry.attributes.names().collect();
    names.sort_by_key(|name| name.to_lowercase());
    let width = names.iter().map(|n| n.width()).max().unwrap_or(0) + 1;

    let mut out = String::new();
    for name in names {
        let values = entry.attributes.get(name).unwrap_or_default();
        let label = format!("{}:", name);
        for (i, value) in values.iter().enumerate() {
            let label = if i == 0 { label.as_str() } else { "" };
            let pad = width.saturating_sub(label.width());
            out.push_str(&" ".repeat(pad));
            out.push_str(label);
            out.push(' ');
            out.push_str(value);
            out.push('\n');
        }
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::fixtures::attrs;

    #[test]
    fn entry_names_are_sorted_and_right_aligned() {
        let entry = DirectoryEntry::persisted(
            "uid=alice,ou=people,dc=example,dc=org",
            attrs(&[
                ("uid", &["alice"]),
                ("mail", &["a@example.org", "alice@example.org"]),
                ("cn", &["Alice"]),
            ]),
        );
        let expected = "  cn: Alice\n\
                        mail: a@example.org\n      \
                        alice@example.org\n \
                        uid: alice\n\n";
        assert_eq!(format_entry(&entry), expected);
    }

    #[test]
    fn reads_identifiers_one_per_line() {
        let input = "alice\n\nbob\r\ncarol";
        assert_eq!(
            read_lines(input.as_bytes()).unwrap(),
            vec!["alice", "bob", "carol"]
        );
    }

    #[test]
    fn scripted_prompt_runs_dry() {
        let mut prompt = ScriptedPrompt::new(["yes"]);
        assert_eq!(prompt.ask("uid: ").unwrap(), "yes");
        assert!(prompt.ask("cn: ").is_err());
        assert_eq!(prompt.asked(), ["uid: ", "cn: "]);
    }
}
