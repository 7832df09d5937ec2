use wardrobe_core::BudgetRequest;
use wardrobe_domain::{
    Budget, BudgetStatus, CurrencyCode, LabeledBudget, NewTransaction, SpendCategory,
};

use crate::cli::core::{
    parse_amount, parse_date, parse_year, split_options, usage, CommandError, CommandResult,
    ShellContext,
};
use crate::cli::output::{self, money, percent};
use crate::cli::registry::CommandEntry;

const BUDGET_USAGE: &str = "budget <user> <year> <total> [currency=<code>] [alert=<pct>] \
                            [<category>=<amount>...] [brands=<label>:<amount>,..] \
                            [occasions=<label>:<amount>,..]";
const RECORD_USAGE: &str = "record <user> <year> <item_id> <item_type> <amount> <category> \
                            [date=<YYYY-MM-DD>] [brand=..] [occasion=..] [store=..] [notes=..]";
const STATUS_USAGE: &str = "status <user> <year> <pause|cancel|resume>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "budget",
            "Create or update an annual budget",
            BUDGET_USAGE,
            cmd_budget,
        ),
        CommandEntry::new("budgets", "List a user's budgets", "budgets <user>", cmd_budgets),
        CommandEntry::new(
            "record",
            "Record a purchase against a budget",
            RECORD_USAGE,
            cmd_record,
        ),
        CommandEntry::new("show", "Show budget details", "show <user> <year>", cmd_show),
        CommandEntry::new(
            "refresh",
            "Recompute totals, projection, alerts and status",
            "refresh <user> <year>",
            cmd_refresh,
        ),
        CommandEntry::new(
            "status",
            "Pause, cancel or resume a budget",
            STATUS_USAGE,
            cmd_status,
        ),
        CommandEntry::new(
            "alerts",
            "List or acknowledge budget alerts",
            "alerts <user> <year> [ack]",
            cmd_alerts,
        ),
    ]
}

fn user_and_year<'a>(args: &[&'a str], text: &str) -> Result<(&'a str, i32), CommandError> {
    match args {
        &[user, year, ..] => Ok((user, parse_year(year)?)),
        _ => Err(usage(text)),
    }
}

fn cmd_budget(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, options) = split_options(args);
    let &[user, year, total] = positional.as_slice() else {
        return Err(usage(BUDGET_USAGE));
    };

    let mut request = BudgetRequest::new(user, parse_year(year)?, parse_amount(total)?);
    for (key, value) in options {
        match key.as_str() {
            "currency" => request.currency = Some(value.to_string()),
            "alert" => request = request.with_alert_threshold(parse_amount(value)?),
            "brands" => {
                for (label, amount) in parse_label_amounts(value)? {
                    request = request.with_brand_budget(label, amount);
                }
            }
            "occasions" => {
                for (label, amount) in parse_label_amounts(value)? {
                    request = request.with_occasion_budget(label, amount);
                }
            }
            _ => request = request.with_allocation(key, parse_amount(value)?),
        }
    }

    let budget = context.service.create_or_update_budget(&request)?;
    output::success(format!(
        "Budget {} for {} in {} set to {}.",
        budget.id,
        budget.user,
        budget.period.year(),
        money(budget.total_budget.amount, &budget.total_budget.currency)
    ));
    Ok(())
}

/// Reads `Label:amount` pairs separated by commas.
fn parse_label_amounts(value: &str) -> Result<Vec<(&str, f64)>, CommandError> {
    value
        .split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| match pair.rsplit_once(':') {
            Some((label, amount)) => Ok((label.trim(), parse_amount(amount.trim())?)),
            None => Err(CommandError::InvalidArguments(format!(
                "expected <label>:<amount>, got `{pair}`"
            ))),
        })
        .collect()
}

fn cmd_budgets(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let &[user] = args else {
        return Err(usage("budgets <user>"));
    };
    let budgets = context.service.list_budgets(user)?;
    if budgets.is_empty() {
        output::info(format!("No budgets for {user}."));
        return Ok(());
    }
    output::section(format!("Budgets for {user}"));
    for budget in budgets {
        output::info(format!(
            "  {}  {:<9}  {} of {}",
            budget.period.year(),
            budget.status,
            money(budget.spending.total_spent, &budget.total_budget.currency),
            money(budget.total_budget.amount, &budget.total_budget.currency),
        ));
    }
    Ok(())
}

fn cmd_record(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, options) = split_options(args);
    let &[user, year, item_id, item_type, amount, category] = positional.as_slice() else {
        return Err(usage(RECORD_USAGE));
    };

    let date = match options.get("date") {
        Some(value) => parse_date(value)?,
        None => context.clock.today(),
    };
    let mut draft = NewTransaction::new(item_id, item_type, parse_amount(amount)?, category, date);
    for (key, value) in &options {
        match key.as_str() {
            "date" => {}
            "brand" => draft = draft.with_brand(*value),
            "occasion" => draft = draft.with_occasion(*value),
            "store" => draft = draft.with_store(*value),
            "notes" => draft.notes = Some(value.to_string()),
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown record option `{other}`"
                )))
            }
        }
    }

    let budget = context.service.find_budget(user, parse_year(year)?)?;
    let known_alerts = budget.alerts.notifications.len();
    let updated = context.service.record_transaction(budget.id, &draft)?;
    output::success(format!(
        "Recorded {} ({}). Spent {} of {} ({}).",
        money(draft.amount, &updated.total_budget.currency),
        draft.category.trim().to_ascii_lowercase(),
        money(updated.spending.total_spent, &updated.total_budget.currency),
        money(updated.total_budget.amount, &updated.total_budget.currency),
        percent(updated.spending.percentage_used),
    ));
    for notification in updated.alerts.notifications.iter().skip(known_alerts) {
        output::warning(&notification.message);
    }
    Ok(())
}

fn cmd_show(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (user, year) = user_and_year(args, "show <user> <year>")?;
    let budget = context.service.find_budget(user, year)?;
    print_budget(&budget);
    Ok(())
}

fn cmd_refresh(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (user, year) = user_and_year(args, "refresh <user> <year>")?;
    let budget = context.service.find_budget(user, year)?;
    let refreshed = context.service.refresh_budget(budget.id)?;
    output::success(format!(
        "Budget refreshed: {} used, status {}.",
        percent(refreshed.spending.percentage_used),
        refreshed.status
    ));
    Ok(())
}

fn cmd_status(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let &[user, year, action] = args else {
        return Err(usage(STATUS_USAGE));
    };
    let status = match action.to_ascii_lowercase().as_str() {
        "pause" => BudgetStatus::Paused,
        "cancel" => BudgetStatus::Cancelled,
        "resume" => BudgetStatus::Active,
        other => {
            return Err(CommandError::InvalidArguments(format!(
                "unknown status action `{other}`"
            )))
        }
    };
    let budget = context.service.find_budget(user, parse_year(year)?)?;
    let updated = context.service.set_operator_status(budget.id, status)?;
    output::success(format!("Budget status is now {}.", updated.status));
    Ok(())
}

fn cmd_alerts(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (user, year) = user_and_year(args, "alerts <user> <year> [ack]")?;
    let acknowledge = match args.get(2) {
        None => false,
        Some(flag) if flag.eq_ignore_ascii_case("ack") => true,
        Some(_) => return Err(usage("alerts <user> <year> [ack]")),
    };

    let budget = context.service.find_budget(user, year)?;
    if acknowledge {
        let pending = budget.unacknowledged_alerts().count();
        context.service.acknowledge_alerts(budget.id)?;
        output::success(format!("Acknowledged {pending} alert(s)."));
        return Ok(());
    }

    if budget.alerts.notifications.is_empty() {
        output::info("No alerts.");
        return Ok(());
    }
    output::section(format!("Alerts for {user} {year}"));
    for notification in &budget.alerts.notifications {
        let marker = if notification.acknowledged { " " } else { "*" };
        output::info(format!(
            "{marker} {}  {:<8}  {}",
            notification.sent_at.format("%Y-%m-%d"),
            notification.level,
            notification.message
        ));
    }
    Ok(())
}

fn print_budget(budget: &Budget) {
    let currency = &budget.total_budget.currency;
    let spending = &budget.spending;
    output::section(format!("Budget {} {}", budget.user, budget.period.year()));
    output::info(format!("  Id          : {}", budget.id));
    output::info(format!("  Status      : {}", budget.status));
    output::info(format!("  Total       : {}", money(budget.total_budget.amount, currency)));
    output::info(format!(
        "  Spent       : {} ({})",
        money(spending.total_spent, currency),
        percent(spending.percentage_used)
    ));
    output::info(format!("  Remaining   : {}", money(spending.remaining_budget, currency)));
    output::info(format!(
        "  Per day     : {}",
        money(spending.average_spending_per_day, currency)
    ));
    output::info(format!("  Projected   : {}", money(spending.projected_spending, currency)));
    output::info(format!("  Purchases   : {}", budget.transaction_count()));

    output::info("  Categories  :");
    for category in SpendCategory::ALL {
        let entry = budget.category(category);
        let share = if entry.allocated > 0.0 {
            format!(
                "of {} ({}), {} left",
                money(entry.allocated, currency),
                percent(entry.percentage),
                money(budget.category_remaining(category), currency)
            )
        } else {
            "unallocated".to_string()
        };
        output::info(format!(
            "    {:<12} {} {share}",
            category.as_str(),
            money(entry.spent, currency)
        ));
    }
    print_sub_budgets("Brand plans", &budget.brand_budgets, currency);
    print_sub_budgets("Event plans", &budget.occasion_budgets, currency);
    print_breakdown("Brands", &spending.by_brand, currency);
    print_breakdown("Occasions", &spending.by_occasion, currency);

    let pending = budget.unacknowledged_alerts().count();
    if pending > 0 {
        output::warning(format!("{pending} unacknowledged alert(s). See `alerts`."));
    }
}

fn print_sub_budgets(title: &str, entries: &[LabeledBudget], currency: &CurrencyCode) {
    if entries.is_empty() {
        return;
    }
    output::info(format!("  {title:<11} :"));
    for entry in entries {
        output::info(format!(
            "    {:<12} {} of {}",
            entry.label,
            money(entry.spent, currency),
            money(entry.allocated, currency)
        ));
    }
}

fn print_breakdown(
    title: &str,
    totals: &std::collections::BTreeMap<String, f64>,
    currency: &CurrencyCode,
) {
    if totals.is_empty() {
        return;
    }
    output::info(format!("  {title:<11} :"));
    for (label, amount) in totals {
        output::info(format!("    {label:<12} {}", money(*amount, currency)));
    }
}
