use std::{fs, path::Path};

use uuid::Uuid;

use wardrobe_core::{InMemoryCatalog, PlanRequest, ReportFormat, ReportScope, SpendingSummary};
use wardrobe_domain::{ItemFamily, PurchaseRecord};

use crate::cli::core::{
    parse_amount, parse_date, parse_month, parse_year, split_options, usage, CommandError,
    CommandResult, ShellContext,
};
use crate::cli::output::{self, money, percent};
use crate::cli::registry::CommandEntry;

const SUMMARY_USAGE: &str = "summary <user> <year> [month] [json]";
const REPORT_USAGE: &str = "report <user> <year> [format=json|pdf|excel] [month=<1-12>] \
                            [brand=<name>] [event=<tag>] [out=<path>]";
const PLAN_USAGE: &str = "plan <user> <event> <estimated_budget> <YYYY-MM-DD>";
const CATALOG_USAGE: &str = "catalog <show|load <path>|add <user> <family> <category> <brand> \
                             <price> <YYYY-MM-DD> [worn=<n>] [age=<group>]>";

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "summary",
            "Spending by category compared with the budget",
            SUMMARY_USAGE,
            cmd_summary,
        ),
        CommandEntry::new(
            "report",
            "Full spending report across every store",
            REPORT_USAGE,
            cmd_report,
        ),
        CommandEntry::new(
            "plan",
            "Check whether an upcoming event fits this year's budget",
            PLAN_USAGE,
            cmd_plan,
        ),
        CommandEntry::new(
            "catalog",
            "Inspect or load the purchase catalog",
            CATALOG_USAGE,
            cmd_catalog,
        ),
    ]
}

fn cmd_summary(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (as_json, args): (bool, Vec<&str>) = match args.split_last() {
        Some((last, rest)) if last.eq_ignore_ascii_case("json") => (true, rest.to_vec()),
        _ => (false, args.to_vec()),
    };
    let (user, year, month) = match args.as_slice() {
        &[user, year] => (user, parse_year(year)?, None),
        &[user, year, month] => (user, parse_year(year)?, Some(parse_month(month)?)),
        _ => return Err(usage(SUMMARY_USAGE)),
    };

    let summary = context.service.get_spending_summary(user, year, month)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary, context.service.settings().currency.as_str());
    }
    Ok(())
}

fn print_summary(summary: &SpendingSummary, currency: &str) {
    let period = match summary.month {
        Some(month) => format!("{}-{month:02}", summary.year),
        None => summary.year.to_string(),
    };
    output::section(format!("Spending summary for {} {period}", summary.user));
    output::info(format!("  Total       : {}", money(summary.total_spending, currency)));
    for (category, amount) in &summary.spending_by_category {
        output::info(format!("    {:<12} {}", category.as_str(), money(*amount, currency)));
    }

    if summary.budget_comparison.is_empty() {
        output::info("  No budget to compare against.");
    } else {
        output::info("  Against budget:");
        for row in &summary.budget_comparison {
            output::info(format!(
                "    {:<12} {} of {} ({}), {} left",
                row.category.as_str(),
                money(row.spent, currency),
                money(row.allocated, currency),
                percent(row.percentage_used),
                money(row.remaining, currency),
            ));
        }
    }
    for alert in &summary.alerts {
        output::warning(&alert.message);
    }
}

fn cmd_report(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, options) = split_options(args);
    let &[user, year] = positional.as_slice() else {
        return Err(usage(REPORT_USAGE));
    };

    let mut scope = ReportScope::year(user, parse_year(year)?);
    let mut format = ReportFormat::default();
    let mut out = None;
    for (key, value) in options {
        match key.as_str() {
            "format" => format = value.parse()?,
            "month" => scope.month = Some(parse_month(value)?),
            "brand" => scope.brand = Some(value.to_string()),
            "event" => scope.event = Some(value.to_string()),
            "out" => out = Some(value),
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown report option `{other}`"
                )))
            }
        }
    }

    let report = context.service.generate_spending_report(&scope, format)?;
    let json = report.to_json()?;
    match out {
        Some(path) => {
            write_text(Path::new(path), &json)?;
            output::success(format!(
                "Report ({format}) for {} written to {path}.",
                scope.user
            ));
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn cmd_plan(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let &[user, event, amount, date] = args else {
        return Err(usage(PLAN_USAGE));
    };
    let request = PlanRequest {
        user: user.to_string(),
        event: event.to_string(),
        estimated_budget: parse_amount(amount)?,
        target_date: parse_date(date)?,
    };
    let plan = context.service.plan_future_budget(&request)?;
    let currency = context.service.settings().currency.as_str();

    output::section(format!("Plan for {} on {}", plan.event, plan.target_date));
    output::info(format!("  Estimate    : {}", money(plan.estimated_budget, currency)));
    output::info(format!("  Spent       : {}", money(plan.spent_this_year, currency)));
    output::info(format!("  Remaining   : {}", money(plan.remaining_budget, currency)));
    output::info(format!("  Months left : {}", plan.months_until_event));
    if plan.can_afford {
        output::success("Affordable within the current budget.");
    } else {
        output::warning(format!("Short by {}.", money(plan.shortfall, currency)));
    }
    for recommendation in &plan.recommendations {
        output::info(format!("  - {recommendation}"));
    }
    Ok(())
}

fn cmd_catalog(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some((action, rest)) = args.split_first() else {
        return catalog_show(context);
    };
    match action.to_ascii_lowercase().as_str() {
        "show" => catalog_show(context),
        "load" => {
            let &[path] = rest else {
                return Err(usage("catalog load <path>"));
            };
            let data = fs::read_to_string(path)?;
            let catalog = InMemoryCatalog::from_json(&data)?;
            save_catalog(context, catalog)?;
            output::success(format!(
                "Catalog loaded: {} purchase(s), {} outfit(s).",
                context.catalog.purchases.len(),
                context.catalog.combos.len()
            ));
            Ok(())
        }
        "add" => catalog_add(context, rest),
        other => Err(CommandError::InvalidArguments(format!(
            "unknown catalog subcommand `{other}`"
        ))),
    }
}

fn catalog_show(context: &ShellContext) -> CommandResult {
    output::section("Purchase catalog");
    for family in ItemFamily::ALL {
        let count = context
            .catalog
            .purchases
            .iter()
            .filter(|record| record.family == family)
            .count();
        output::info(format!("  {:<12} {count} item(s)", family.as_str()));
    }
    output::info(format!("  {:<12} {} outfit(s)", "stylecombo", context.catalog.combos.len()));
    Ok(())
}

fn catalog_add(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let (positional, options) = split_options(args);
    let &[user, family, category, brand, price, date] = positional.as_slice() else {
        return Err(usage(CATALOG_USAGE));
    };
    let family: ItemFamily = family
        .parse()
        .map_err(|_| CommandError::InvalidArguments(format!("unknown item family `{family}`")))?;
    let times_worn = match options.get("worn") {
        Some(value) => value.parse().map_err(|_| {
            CommandError::InvalidArguments(format!("`{value}` is not a wear count"))
        })?,
        None => 0,
    };
    let record = PurchaseRecord {
        id: Uuid::new_v4().to_string(),
        user: user.to_string(),
        family,
        category: category.to_string(),
        brand: brand.to_string(),
        final_price: parse_amount(price)?,
        purchase_date: parse_date(date)?,
        age_group: options.get("age").map(|value| value.to_string()),
        times_worn,
    };
    let counted_as = record.spend_category();

    let mut catalog = context.catalog.as_ref().clone();
    catalog.add_purchase(record)?;
    save_catalog(context, catalog)?;
    output::success(format!("Purchase added to {family} (counts as {counted_as})."));
    Ok(())
}

fn save_catalog(context: &mut ShellContext, catalog: InMemoryCatalog) -> CommandResult {
    let json = serde_json::to_string_pretty(&catalog)?;
    write_text(&context.catalog_path(), &json)?;
    context.replace_catalog(catalog);
    Ok(())
}

fn write_text(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, text)?;
    fs::rename(&tmp, path)
}
