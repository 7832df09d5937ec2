//! Shell commands, grouped by concern. Registration order is the order
//! `help` lists them in.

pub mod budget;
pub mod report;
pub mod system;

use crate::cli::registry::CommandRegistry;

pub(crate) fn register_all(registry: &mut CommandRegistry) {
    budget::definitions()
        .into_iter()
        .chain(report::definitions())
        .chain(system::definitions())
        .for_each(|entry| registry.register(entry));
}
