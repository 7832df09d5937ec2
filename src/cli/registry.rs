use std::collections::HashMap;

use strsim::levenshtein;

use crate::cli::core::CommandResult;
use crate::cli::shell_context::ShellContext;

/// Typo distance under which an unknown command gets a suggestion.
const SUGGESTION_DISTANCE: usize = 3;

pub type CommandHandler = fn(&mut ShellContext, &[&str]) -> CommandResult;

pub struct CommandEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub handler: CommandHandler,
}

impl CommandEntry {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        usage: &'static str,
        handler: CommandHandler,
    ) -> Self {
        Self {
            name,
            description,
            usage,
            handler,
        }
    }
}

/// Shell commands in registration order. Lookups ignore ASCII case.
#[derive(Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
    index: HashMap<&'static str, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A second entry with the same name replaces the first in place.
    pub fn register(&mut self, entry: CommandEntry) {
        match self.index.get(entry.name) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(entry.name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&CommandEntry> {
        let key = name.to_ascii_lowercase();
        self.index.get(key.as_str()).map(|&slot| &self.entries[slot])
    }

    pub fn list(&self) -> &[CommandEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|entry| entry.name)
    }

    pub fn handler(&self, name: &str) -> Option<CommandHandler> {
        self.get(name).map(|entry| entry.handler)
    }

    /// Closest registered name, if the typo is small enough.
    pub fn suggest(&self, input: &str) -> Option<&'static str> {
        let needle = input.to_ascii_lowercase();
        self.names()
            .map(|name| (levenshtein(name, &needle), name))
            .filter(|(distance, _)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, name)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
        Ok(())
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry.register(CommandEntry::new("budget", "first", "budget", noop));
        registry.register(CommandEntry::new("record", "record", "record", noop));
        registry.register(CommandEntry::new("budget", "second", "budget", noop));
        registry
    }

    #[test]
    fn re_registration_keeps_the_original_slot() {
        let registry = registry();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["budget", "record"]);
        assert_eq!(registry.get("BUDGET").map(|entry| entry.description), Some("second"));
    }

    #[test]
    fn suggestions_need_a_close_match() {
        let registry = registry();
        assert_eq!(registry.suggest("recrod"), Some("record"));
        assert_eq!(registry.suggest("forecast"), None);
    }
}
