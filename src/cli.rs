//! Command-line interface definition.
//!
//! Options are parsed by clap; the `<ACTION> <SOURCE> <TARGET>` triple is
//! collected verbatim and validated by [`crate::request::parse`], because
//! actions are spelled like flags (`--backup`) and `--help` must be honoured
//! anywhere on the line, even after the positionals.

use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser};

const AFTER_HELP: &str = "\
Actions:
  --backup   Backup SOURCE directory to TARGET (.tar.gz)
  --restore  Restore SOURCE (.tar.gz) to TARGET directory
  --help     Print this help

Options must come before the action.";

#[derive(Parser, Debug)]
#[command(
    name    = "rootfs-backup",
    about   = "Back up a directory tree to a .tar.gz archive, or restore one",
    version,
    disable_help_flag = true,
    after_help = AFTER_HELP,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to `~/.config/rootfs-backup/config.toml`.  A missing file
    /// means built-in defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the effective configuration and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Validate and print the commands that would run, without running them.
    ///
    /// Skips the root check and all prompts.
    #[arg(long)]
    pub dry_run: bool,

    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// `<ACTION> <SOURCE> <TARGET>`, validated after parsing.
    #[arg(
        value_name = "ACTION SOURCE TARGET",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Full usage text, as printed for `--help` and after usage errors.
pub fn usage() -> String {
    Cli::command().render_help().to_string()
}
