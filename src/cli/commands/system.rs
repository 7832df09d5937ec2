use crate::cli::core::{usage, CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::CommandEntry;
use crate::utils::build_info;

const CONFIG_USAGE: &str = "config [show|set <key> <value>|backup [note]|backups|restore <name>]";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "config",
            "View and change engine settings",
            CONFIG_USAGE,
            cmd_config,
        ),
        CommandEntry::new(
            "help",
            "Show available commands",
            "help [command]",
            cmd_help,
        ),
        CommandEntry::new("version", "Show build metadata", "version", cmd_version),
        CommandEntry::new("exit", "Exit the shell", "exit", cmd_exit),
    ]
}

fn cmd_config(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return config_show(context);
    };
    match action.to_ascii_lowercase().as_str() {
        "show" => config_show(context),
        "set" => {
            let Some((key, value)) = rest.split_first() else {
                return Err(usage("config set <key> <value>"));
            };
            if value.is_empty() && !key.eq_ignore_ascii_case("data_dir") {
                return Err(usage("config set <key> <value>"));
            }
            let mut next = context.config.clone();
            next.set_field(&key.to_ascii_lowercase(), &value.join(" "))?;
            context.config_manager.save(&next)?;
            context.replace_config(next);
            output::success(format!("Setting `{key}` updated."));
            if key.eq_ignore_ascii_case("data_dir") {
                output::hint("The new data directory is used from the next start.");
            }
            Ok(())
        }
        "backup" => {
            let note = (!rest.is_empty()).then(|| rest.join(" "));
            let name = context
                .config_manager
                .backup(&context.config, note.as_deref())?;
            output::success(format!("Configuration backed up as {name}."));
            Ok(())
        }
        "backups" => {
            let names = context.config_manager.list_backups()?;
            if names.is_empty() {
                output::info("No configuration backups.");
            }
            for name in names {
                output::info(format!("  {name}"));
            }
            Ok(())
        }
        "restore" => {
            let &[name] = rest else {
                return Err(usage("config restore <name>"));
            };
            let restored = context.config_manager.restore(name)?;
            context.config_manager.save(&restored)?;
            context.replace_config(restored);
            output::success(format!("Configuration restored from {name}."));
            Ok(())
        }
        other => Err(CommandError::InvalidArguments(format!(
            "unknown config subcommand `{other}`"
        ))),
    }
}

fn config_show(context: &ShellContext) -> CommandResult {
    let config = &context.config;
    output::section("Configuration");
    output::info(format!("  currency                 : {}", config.currency));
    output::info(format!("  locale                   : {}", config.locale));
    output::info(format!("  danger_threshold         : {}", config.danger_threshold));
    output::info(format!(
        "  default_alert_threshold  : {}",
        config.default_alert_threshold
    ));
    output::info(format!("  max_append_retries       : {}", config.max_append_retries));
    output::info(format!(
        "  zero_fill_monthly_report : {}",
        config.zero_fill_monthly_report
    ));
    output::info(format!("  ui_color_enabled         : {}", config.ui_color_enabled));
    output::info(format!("  data_dir                 : {}", context.data_dir.display()));
    output::info(format!(
        "  config file              : {}",
        context.config_manager.config_path().display()
    ));
    Ok(())
}

fn cmd_help(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if let Some(name) = args.first() {
        match context.registry.get(name) {
            Some(entry) => {
                output::section(format!("Help: {}", entry.name));
                output::info(format!("  {}", entry.description));
                output::info(format!("  usage: {}", entry.usage));
            }
            None => context.suggest_command(name),
        }
        return Ok(());
    }

    output::section("Available commands");
    let width = context.registry.names().map(str::len).max().unwrap_or(0);
    for entry in context.registry.list() {
        output::info(format!("  {:<width$}  {}", entry.name, entry.description));
    }
    output::hint("Use `help <command>` for details.");
    Ok(())
}

fn cmd_version(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let meta = build_info::current();
    output::section(format!("Wardrobe Budget {}", meta.version));
    for (label, value) in meta.fields() {
        output::info(format!("  {label:<11}: {value}"));
    }
    Ok(())
}

fn cmd_exit(_context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    Err(CommandError::ExitRequested)
}
