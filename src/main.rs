//! `rootfs-backup` — back up a directory tree to `.tar.gz`, or restore one.
//!
//! # Overview
//!
//! A thin orchestration layer around `tar`, a gzip-compatible compressor
//! (`pigz`, falling back to `gzip`) and, when installed, the `pv` progress
//! filter.  Its job is getting the checks, the confirmation and the exact
//! argument lists right; the archive format is tar's own.
//!
//! # Usage
//!
//! ```text
//! rootfs-backup --backup  /              /mnt/usb/pi.tar.gz
//! rootfs-backup --restore /mnt/usb/pi.tar.gz /mnt/sd
//! rootfs-backup --dry-run --backup / pi.tar.gz   # print the commands only
//! rootfs-backup --print-config
//! ```
//!
//! # Module layout
//!
//! | Module            | Responsibility                                   |
//! |-------------------|--------------------------------------------------|
//! | [`cli`]           | Argument types parsed by clap                    |
//! | [`config`]        | `Config` struct + TOML loader                    |
//! | [`host`]          | Working directory, uid and tool lookup           |
//! | [`paths`]         | Relative → absolute path resolution              |
//! | [`request`]       | Action/source/target validation                  |
//! | [`checks`]        | Root check and tool resolution                   |
//! | [`prompt`]        | Confirmation and acknowledgment prompts          |
//! | [`runner`]        | Argument list construction                       |
//! | [`exec`]          | Child process pipelines and output streaming     |
//! | [`ui`]            | Banners, status lines, spinner                   |
//! | [`commands::run`] | The backup/restore pipeline                      |

mod checks;
mod cli;
mod commands;
mod config;
mod error;
mod exec;
mod host;
mod logging;
mod paths;
mod prompt;
mod request;
mod runner;
mod ui;

use std::{io, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use cli::Cli;
use commands::run::Outcome;
use error::Error;

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match app(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn app(cli: &Cli) -> Result<()> {
    // Before the config is read: a broken file must not hide the usage text.
    if request::wants_help(&cli.args) {
        print!("{}", cli::usage());
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => config::load_config(path, true)?,
        None => match config::default_config_path() {
            Some(path) => config::load_config(&path, false)?,
            None => config::Config::default(),
        },
    };

    if cli.print_config {
        print!(
            "{}",
            toml::to_string_pretty(&cfg).context("serialising configuration")?
        );
        return Ok(());
    }

    let stdin = io::stdin();
    let mut prompt = prompt::Prompt::new(stdin.lock(), io::stdout());
    let mut executor = exec::SystemExecutor::new(io::stdout());

    match commands::run::run(cli, &cfg, &host::System, &mut prompt, &mut executor)? {
        Outcome::Help => print!("{}", cli::usage()),
        Outcome::Planned(plan) => tracing::debug!(?plan, "dry run"),
        Outcome::Declined => tracing::debug!("declined at confirmation"),
        Outcome::Completed(request) => {
            tracing::info!(action = %request.action, target = %request.target, "finished");
        },
    }
    Ok(())
}

/// Print `err` the way its kind deserves and pick the exit code.
fn report(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<Error>() {
        Some(Error::Usage(usage)) => {
            ui::error(err);
            tracing::debug!(?usage, "usage error");
            eprintln!();
            eprint!("{}", cli::usage());
            ExitCode::from(2)
        },
        Some(Error::Cancelled) => {
            ui::info("Canceled on user request. Exiting");
            ExitCode::FAILURE
        },
        _ => {
            ui::error(err);
            ExitCode::FAILURE
        },
    }
}
