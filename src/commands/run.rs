//! The backup/restore pipeline.
//!
//! # Stages (in order)
//!
//! | # | Stage        | Skipped by   | Description                                  |
//! |---|--------------|--------------|----------------------------------------------|
//! | 1 | Validate     | —            | Parse `<action> <source> <target>`           |
//! | 2 | Privileges   | `--dry-run`  | Must be uid 0                                |
//! | 3 | Requirements | —            | Resolve tar / compressor / progress filter   |
//! | 4 | Acknowledge  | `--dry-run`  | Only when a tool was degraded                |
//! | 5 | Confirm      | `--dry-run`  | Framed summary + `no`/`yes` menu             |
//! | 6 | Delete       | backup       | Empty the restore target                     |
//! | 7 | Archive      | `--dry-run`  | Run tar, streaming its output                |
//!
//! Any error aborts the remaining stages; the success banner is printed only
//! after stage 7 exits cleanly.

use std::io::{BufRead, Write};

use anyhow::Result;

use crate::{
    checks::{check_privileges, check_requirements},
    cli::Cli,
    config::Config,
    exec::Executor,
    host::Host,
    prompt::Prompt,
    request::{self, Action, BackupRequest, Parsed, SuffixPolicy},
    runner::{self, CommandPlan},
    ui,
};

/// How a run ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `--help` was given.
    Help,
    /// `--dry-run`: the plan was printed, nothing ran.
    Planned(CommandPlan),
    /// The user answered `no` at the confirmation prompt.
    Declined,
    /// The archiver finished successfully.
    Completed(BackupRequest),
}

/// Execute the pipeline for `cli.args`.
pub fn run<R: BufRead, W: Write>(
    cli: &Cli,
    cfg: &Config,
    host: &dyn Host,
    prompt: &mut Prompt<R, W>,
    executor: &mut dyn Executor,
) -> Result<Outcome> {
    // 1. Validate
    let policy = if cfg.validation.legacy_suffix_check {
        SuffixPolicy::Legacy
    } else {
        SuffixPolicy::Strict
    };
    // Only relative paths need it; a vanished cwd must not block `--help` or
    // absolute paths.
    let cwd = if request::needs_working_dir(&cli.args) {
        host.current_dir()?
    } else {
        String::new()
    };
    let request = match request::parse(&cli.args, &cwd, policy).map_err(crate::error::Error::from)? {
        Parsed::Help => return Ok(Outcome::Help),
        Parsed::Request(request) => request,
    };

    // 2. Privileges
    if !cli.dry_run {
        check_privileges(host)?;
    }

    // 3. Requirements
    let requirements = check_requirements(host, &cfg.tools)?;
    for degradation in &requirements.degraded {
        ui::warn(&degradation.hint(request.action.as_str()));
    }

    let plan = runner::build(&request, &requirements.tools, &cfg.backup.extra_excludes);

    if cli.dry_run {
        print_plan(&plan);
        return Ok(Outcome::Planned(plan));
    }

    // 4. Acknowledge
    if requirements.needs_acknowledgment {
        prompt.acknowledge(&requirements.acknowledgment_message())?;
    }

    // 5. Confirm
    if !prompt.confirm(&confirmation_lines(&request))? {
        ui::info("Process not confirmed. Exiting.");
        return Ok(Outcome::Declined);
    }

    // 6. Delete
    if let Some(delete) = &plan.delete {
        let label = format!("Deleting {}/*...", request.target);
        let spinner = ui::start_spinner(&label);
        if let Err(e) = executor.run(delete, false) {
            spinner.finish_and_clear();
            return Err(e);
        }
        ui::finish_spinner(&spinner, &label);
    }

    // 7. Archive
    executor.run(&plan.archive, true)?;

    ui::print_success(&success_message(&request));
    Ok(Outcome::Completed(request))
}

/// Lines shown inside the confirmation frame.
pub fn confirmation_lines(request: &BackupRequest) -> Vec<String> {
    let mut lines = vec![format!(
        "Everything set to {} {} to {}.",
        request.action, request.source, request.target
    )];
    if request.action == Action::Restore {
        lines.push(format!(
            "PLEASE NOTE: Everything in {} will be deleted.",
            request.target
        ));
    }
    lines
}

pub fn success_message(request: &BackupRequest) -> String {
    format!(
        "{} {} to {} successful.",
        request.source, request.action, request.target
    )
}

fn print_plan(plan: &CommandPlan) {
    if let Some(delete) = &plan.delete {
        println!("{delete}");
    }
    println!("{}", plan.archive);
}

// ─── Tests ────────────────────────────────────────────────────────────────────
