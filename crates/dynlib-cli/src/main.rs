//! Command-line interface for dynlib.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dynlib_core::config::env_vars;
use dynlib_core::{
    classify_lookup_failure, run_library_collator, Library, LoaderConfig, SystemLoader,
};
use serde::Serialize;
use tracing::info;

/// Open shared libraries, resolve symbols and run extension collators.
#[derive(Parser, Debug)]
#[command(name = "dynlib")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Loader configuration file (TOML).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Open a library, show it, and close it again.
    Open {
        /// Library path or bare name (searched the way the OS loader does).
        path: String,
    },
    /// Resolve symbols in a library.
    Pick {
        /// Library path or bare name.
        path: String,
        /// Symbol names to resolve.
        #[arg(required = true)]
        names: Vec<String>,
        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run an extension collator and print the value it returns.
    Collate {
        /// Extension library path.
        path: String,
        /// Name of the collator entry point.
        linkname: String,
    },
    /// Classify a loader diagnostic.
    Classify {
        /// Diagnostic text as reported by the OS loader.
        diagnostic: String,
    },
}

/// One line of `pick` output.
#[derive(Debug, Serialize)]
struct PickReport<'a> {
    name: &'a str,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // classify needs no loader
    if let Command::Classify { diagnostic } = &args.command {
        println!("{}", classify_lookup_failure(diagnostic).as_str());
        return Ok(());
    }

    let config = LoaderConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let loader = SystemLoader::with_config(config);

    match args.command {
        Command::Open { path } => run_open(&loader, &path),
        Command::Pick { path, names, json } => run_pick(&loader, &path, &names, json),
        Command::Collate { path, linkname } => run_collate(&loader, &path, &linkname),
        Command::Classify { .. } => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    // Check if JSON logging is requested
    let json_logging = std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false);

    let level = if verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("warn,dynlib={level},dynlib_core={level}"))
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
            .init();
    }
}

fn run_open(loader: &SystemLoader, path: &str) -> Result<()> {
    let library = Library::open_with(loader, path)?;
    println!("{library}");
    library.close()?;
    Ok(())
}

fn run_pick(loader: &SystemLoader, path: &str, names: &[String], json: bool) -> Result<()> {
    let library = Library::open_with(loader, path)?;
    let mut reports = Vec::with_capacity(names.len());

    for name in names {
        match library.pick(name) {
            Ok(symbol) => reports.push(PickReport {
                name,
                status: "found",
                address: Some(format!("{:#x}", symbol.address())),
            }),
            Err(e) if e.is_recoverable() => reports.push(PickReport {
                name,
                status: "not-found",
                address: None,
            }),
            Err(e) => {
                library.release()?;
                return Err(e.into());
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            match &report.address {
                Some(address) => println!("{}\t{}", report.name, address),
                None => println!("{}\t{}", report.name, report.status),
            }
        }
    }

    library.close()?;
    Ok(())
}

fn run_collate(loader: &SystemLoader, path: &str, linkname: &str) -> Result<()> {
    let library = Library::open_with(loader, path)?;
    let result = run_library_collator(&library, linkname);
    library.release()?;

    match result? {
        Some(value) => println!("{value}"),
        None => info!(linkname, "collator returned no value"),
    }
    Ok(())
}
