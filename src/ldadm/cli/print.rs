use colored::Colorize;
use ldadm::api::{CmdMessage, CmdResult, Listing, MessageLevel};
use ldadm::model::DirectoryEntry;
use ldadm::console::format_entry;

pub(super) fn print_messages(messages: &[CmdMessage]) {
    for message in messages {
        match message.level {
            MessageLevel::Info => println!("{}", message.content.dimmed()),
            MessageLevel::Success => eprintln!("{}", message.content.green()),
            MessageLevel::Warning => eprintln!("{}", message.content.yellow()),
            MessageLevel::Error => eprintln!("{}", message.content.red()),
        }
    }
}

/// Prints listings as they arrive: names one per line, entries as blocks. Both
/// go to stdout so that they can be piped into another ldadm command.
pub(super) struct Printer;

impl Listing for Printer {
    fn name(&mut self, name: String) {
        println!("{}", name);
    }

    fn entry(&mut self, entry: DirectoryEntry) {
        print!("{}", format_entry(&entry));
    }
}

/// The generated secret, then status messages.
pub(super) fn print_result(result: &CmdResult) {
    if let Some(secret) = &result.secret {
        println!("{}", secret);
    }
    print_messages(&result.messages);
}
