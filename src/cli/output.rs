use std::fmt;
use std::sync::RwLock;

use colored::Colorize;
use once_cell::sync::Lazy;

/// Message categories used by the CLI output helpers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Success,
    Warning,
    Error,
    Hint,
    Section,
}

#[derive(Clone, Copy, Debug)]
pub struct OutputPreferences {
    pub color_enabled: bool,
}

impl Default for OutputPreferences {
    fn default() -> Self {
        Self {
            color_enabled: true,
        }
    }
}

static PREFERENCES: Lazy<RwLock<OutputPreferences>> =
    Lazy::new(|| RwLock::new(OutputPreferences::default()));

/// Applies the preferences and forces `colored` on or off to match.
pub fn set_preferences(prefs: OutputPreferences) {
    if let Ok(mut guard) = PREFERENCES.write() {
        *guard = prefs;
    }
    colored::control::set_override(prefs.color_enabled);
}

fn preferences() -> OutputPreferences {
    PREFERENCES.read().map(|guard| *guard).unwrap_or_default()
}

fn label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Info => "INFO",
        MessageKind::Success => "OK",
        MessageKind::Warning => "WARNING",
        MessageKind::Error => "ERROR",
        MessageKind::Hint => "HINT",
        MessageKind::Section => "",
    }
}

pub(crate) fn render(kind: MessageKind, message: impl fmt::Display) -> String {
    let text = message.to_string();
    let plain = match kind {
        MessageKind::Section => format!("=== {} ===", text.trim()),
        MessageKind::Info => text,
        other => format!("{}: {text}", label(other)),
    };

    if !preferences().color_enabled {
        return plain;
    }

    match kind {
        MessageKind::Success => plain.bright_green().to_string(),
        MessageKind::Warning => plain.bright_yellow().to_string(),
        MessageKind::Error => plain.bright_red().to_string(),
        MessageKind::Hint => plain.dimmed().to_string(),
        MessageKind::Section => plain.bold().to_string(),
        MessageKind::Info => plain,
    }
}

pub fn print(kind: MessageKind, message: impl fmt::Display) {
    let formatted = render(kind, message);
    match kind {
        MessageKind::Section => println!("\n{formatted}"),
        _ => println!("{formatted}"),
    }
}

pub fn info(message: impl fmt::Display) {
    print(MessageKind::Info, message);
}

pub fn success(message: impl fmt::Display) {
    print(MessageKind::Success, message);
}

pub fn warning(message: impl fmt::Display) {
    print(MessageKind::Warning, message);
}

pub fn error(message: impl fmt::Display) {
    print(MessageKind::Error, message);
}

pub fn hint(message: impl fmt::Display) {
    print(MessageKind::Hint, message);
}

pub fn section(title: impl fmt::Display) {
    print(MessageKind::Section, title);
}

/// `12.50 USD`
pub fn money(amount: f64, currency: impl fmt::Display) -> String {
    format!("{amount:.2} {currency}")
}

/// `42.5%`
pub fn percent(value: f64) -> String {
    format!("{value:.1}%")
}
