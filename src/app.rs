//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads settings and sets up logging
//! - dispatches to fetch / etl / show / the dashboard

use chrono::NaiveDate;
use clap::Parser;

use crate::cli::{Command, DashArgs, DataArgs, FetchArgs, ShowArgs};
use crate::config::Settings;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `covid` binary.
pub fn run() -> Result<(), AppError> {
    // `covid` and `covid -s TX` behave like `covid dash ...`.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Fetch(args) => handle_fetch(args),
        Command::Etl(args) => handle_etl(args),
        Command::Show(args) => handle_show(args),
        Command::Dash(args) => handle_dash(args),
    }
}

fn settings_for(data: &DataArgs) -> Result<Settings, AppError> {
    Ok(Settings::from_env()?.with_data_dir(data.data_dir.as_deref()))
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let settings = settings_for(&args.data)?;
    let summary = pipeline::run_fetch(&settings, args.start, args.end, args.force)?;
    println!("{}", crate::report::format_fetch_summary(&summary));
    Ok(())
}

fn handle_etl(args: DataArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let settings = settings_for(&args)?;
    let summary = pipeline::run_etl(&settings)?;
    println!("{}", crate::report::format_etl_summary(&summary));
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    crate::logging::init_stderr();
    let settings = settings_for(&args.data)?;
    let table = pipeline::load_table(&settings)?;
    let Some((first, last)) = table.date_range() else {
        return Err(AppError::no_data("Case table is empty."));
    };

    let date = args.date.unwrap_or(last);
    match crate::report::headline(&table, args.state, date) {
        Some(h) => println!("{}", crate::report::format_headline(&h)),
        None => println!("No records for {} on or before {date}.\n", args.state.name()),
    }

    let from = args.from.unwrap_or(first);
    let to = args.to.unwrap_or(last);
    let window = table.for_state_between(args.state, from, to);
    let listed = &window[window.len().saturating_sub(args.rows)..];
    println!("{}", crate::report::format_records(listed));

    if !args.no_plot {
        let series: Vec<(NaiveDate, f64)> = crate::report::state_series(&table, args.state, args.metric)
            .into_iter()
            .filter(|(d, _)| *d >= from && *d <= to)
            .collect();
        let label = format!("{} {}", args.state.abbr(), args.metric.display_name());
        println!(
            "{}",
            crate::plot::render_ascii_series(&series, &label, args.date, args.width, args.height)
        );
    }
    Ok(())
}

fn handle_dash(args: DashArgs) -> Result<(), AppError> {
    let settings = settings_for(&args.data)?;
    crate::logging::init_file(&settings.log_path())?;
    let table = pipeline::load_table(&settings)?;
    crate::tui::run(table, &args)
}

/// Rewrite argv so `covid` defaults to `covid dash`.
///
/// Rules:
/// - `covid`                      -> `covid dash`
/// - `covid -s TX ...`            -> `covid dash -s TX ...`
/// - `covid --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("dash".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "fetch" | "etl" | "show" | "dash");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "dash flags".
    if arg1.starts_with('-') {
        argv.insert(1, "dash".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_opens_dashboard() {
        assert_eq!(rewrite_args(argv(&["covid"])), argv(&["covid", "dash"]));
        assert_eq!(
            rewrite_args(argv(&["covid", "-s", "TX"])),
            argv(&["covid", "dash", "-s", "TX"])
        );
    }

    #[test]
    fn subcommands_and_help_are_untouched() {
        assert_eq!(rewrite_args(argv(&["covid", "etl"])), argv(&["covid", "etl"]));
        assert_eq!(rewrite_args(argv(&["covid", "--help"])), argv(&["covid", "--help"]));
    }
}
