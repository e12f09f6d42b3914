//! CLI argument parsing module
//!
//! This module handles command-line argument parsing and application entry point.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::{Arg, ArgMatches, Command};

use crate::error::{RecookieError, Result};
use crate::output::OutputWriter;
use crate::settings::Settings;
use crate::store::{ChromiumStore, CookieStore};
use crate::sync::{sync, SyncRequest};

/// Main entry point for the CLI application
pub fn run() {
    crate::logging::init();

    let app = create_app();
    let matches = app.get_matches();

    match run_with_args(&matches) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("recookie: error: {}", e);
            std::process::exit(crate::exit_code::exit_code_for_error(&e));
        }
    }
}

/// Create the CLI application structure
fn create_app() -> Command {
    Command::new("recookie")
        .version(crate::VERSION)
        .about("Copy named browser cookies from one domain to another")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db")
                .long("db")
                .value_name("PATH")
                .help("Chromium Cookies database (default: newest Chrome profile)")
                .global(true),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .value_name("FILE")
                .help("Settings file location")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Silent mode")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("list")
                .about("List cookies on the origin domain, marking selected names")
                .arg(
                    Arg::new("origin")
                        .long("origin")
                        .value_name("DOMAIN")
                        .help("Origin domain (default: last used)"),
                ),
        )
        .subcommand(
            Command::new("select")
                .about("Edit the persisted cookie-name selection")
                .arg(
                    Arg::new("names")
                        .value_name("NAME")
                        .help("Cookie names")
                        .num_args(0..)
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    Arg::new("add")
                        .long("add")
                        .help("Add to the selection instead of replacing it")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .help("Remove from the selection")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("add"),
                )
                .arg(
                    Arg::new("clear")
                        .long("clear")
                        .help("Clear the selection")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with_all(["add", "remove"]),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("Copy the selected cookies from the origin domain to the target domain")
                .arg(
                    Arg::new("origin")
                        .long("origin")
                        .value_name("DOMAIN")
                        .help("Origin domain (default: last used)"),
                )
                .arg(
                    Arg::new("target")
                        .long("target")
                        .value_name("DOMAIN")
                        .help("Target domain (default: last used)"),
                )
                .arg(
                    Arg::new("names")
                        .long("names")
                        .value_name("NAME,NAME")
                        .help("Cookie names to sync (default: persisted selection)"),
                )
                .arg(
                    Arg::new("no-save")
                        .long("no-save")
                        .help("Do not persist the domains and selection used")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("show").about("Print the persisted settings"))
}

/// Run recookie with parsed command line arguments
fn run_with_args(matches: &ArgMatches) -> Result<()> {
    let output = OutputWriter::new(matches.get_flag("verbose"), matches.get_flag("silent"));
    let settings_path = settings_path_from_args(matches)?;
    let settings = Settings::load(&settings_path)?;

    match matches.subcommand() {
        Some(("list", sub)) => run_list(sub, &settings, &output),
        Some(("select", sub)) => run_select(sub, settings, &settings_path, &output),
        Some(("sync", sub)) => run_sync(sub, settings, &settings_path, &output),
        Some(("show", _)) => run_show(&settings, &output),
        _ => unreachable!("subcommand is required"),
    }
}

fn settings_path_from_args(matches: &ArgMatches) -> Result<PathBuf> {
    match matches.get_one::<String>("settings") {
        Some(path) => Ok(PathBuf::from(path)),
        None => Settings::default_path(),
    }
}

fn open_store(matches: &ArgMatches, output: &OutputWriter) -> Result<ChromiumStore> {
    let db_path = match matches.get_one::<String>("db") {
        Some(path) => PathBuf::from(path),
        None => ChromiumStore::locate(None)?,
    };
    output.write_verbose(&format!("using cookie database {:?}", db_path));
    ChromiumStore::open(&db_path)
}

fn required_domain(value: &str, which: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RecookieError::Config(format!(
            "No {} domain given and none persisted",
            which
        )));
    }
    if trimmed.contains("://") || trimmed.contains('/') || trimmed.contains(char::is_whitespace) {
        return Err(RecookieError::InvalidDomain(format!(
            "{:?} is not a bare domain name",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

fn run_list(matches: &ArgMatches, settings: &Settings, output: &OutputWriter) -> Result<()> {
    let origin = required_domain(
        matches
            .get_one::<String>("origin")
            .unwrap_or(&settings.origin_domain),
        "origin",
    )?;
    let store = open_store(matches, output)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| RecookieError::Config(format!("Failed to create async runtime: {}", e)))?;
    let cookies = rt.block_on(store.list_all())?;

    let origin_cookies: Vec<_> = cookies
        .into_iter()
        .filter(|cookie| cookie.domain == origin)
        .collect();
    let selected: HashSet<String> = settings.selected_names().into_iter().collect();
    output.write_cookie_list(&origin, &origin_cookies, &selected);
    Ok(())
}

fn run_select(
    matches: &ArgMatches,
    mut settings: Settings,
    settings_path: &Path,
    output: &OutputWriter,
) -> Result<()> {
    let names: Vec<String> = matches
        .get_many::<String>("names")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();

    let mut selection = settings.selected_names();
    if matches.get_flag("clear") {
        selection.clear();
    } else if matches.get_flag("add") {
        for name in names {
            if !selection.contains(&name) {
                selection.push(name);
            }
        }
    } else if matches.get_flag("remove") {
        selection.retain(|existing| !names.contains(existing));
    } else {
        selection = names;
    }

    settings.set_selected_names(&selection);
    settings.save(settings_path)?;

    if selection.is_empty() {
        output.write("No cookies selected");
    } else {
        output.write(&format!("Selected: {}", selection.join(", ")));
    }
    Ok(())
}

fn run_sync(
    matches: &ArgMatches,
    mut settings: Settings,
    settings_path: &Path,
    output: &OutputWriter,
) -> Result<()> {
    let origin = required_domain(
        matches
            .get_one::<String>("origin")
            .unwrap_or(&settings.origin_domain),
        "origin",
    )?;
    let target = required_domain(
        matches
            .get_one::<String>("target")
            .unwrap_or(&settings.target_domain),
        "target",
    )?;
    let names: Vec<String> = match matches.get_one::<String>("names") {
        Some(joined) => joined
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        None => settings.selected_names(),
    };

    // Persist the values actually used, like the popup did on every click.
    if !matches.get_flag("no-save") {
        settings.origin_domain = origin.clone();
        settings.target_domain = target.clone();
        settings.set_selected_names(&names);
        settings.save(settings_path)?;
    }

    let store = open_store(matches, output)?;
    let request = SyncRequest::new(names, &origin, &target);
    output.write_verbose(&format!(
        "syncing {} selected names from {} to {}",
        request.names.len(),
        request.origin_domain,
        request.target_domain
    ));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| RecookieError::Config(format!("Failed to create async runtime: {}", e)))?;
    let report = rt.block_on(sync(&store, &request))?;

    output.write_report(&report);
    if !report.is_clean() {
        return Err(RecookieError::SyncIncomplete {
            matched: report.matched,
            written: report.written,
        });
    }
    Ok(())
}

fn run_show(settings: &Settings, output: &OutputWriter) -> Result<()> {
    output.write(&format!("origin-domain: {}", settings.origin_domain));
    output.write(&format!("target-domain: {}", settings.target_domain));
    output.write(&format!(
        "cookie-names:  {}",
        settings.selected_names().join(",")
    ));
    Ok(())
}
