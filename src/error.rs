//! Domain error types.
//!
//! Every failure that ends a run with a specific exit code or message is one
//! of these variants.  Orchestration code wraps them in `anyhow::Error` and
//! `main` downcasts back to pick the exit code.

use thiserror::Error;

/// Malformed command line.  Always reported together with the usage text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Missing parameters")]
    MissingArguments,

    #[error("Too many parameters")]
    TooManyArguments,

    #[error("Action could not be identified: '{0}'")]
    UnknownAction(String),

    #[error("Cannot specify .tar.gz file as source for backup")]
    ArchiveAsBackupSource,

    #[error("A .tar.gz file has to be specified as target")]
    BackupTargetNotArchive,

    #[error("A .tar.gz file has to be set as source to restore")]
    RestoreSourceNotArchive,

    #[error("Cannot specify .tar.gz file as target to restore")]
    ArchiveAsRestoreTarget,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error("Elevated privileges needed.\nPlease run as admin or with sudo.")]
    Privilege,

    #[error("required tool '{tool}' is not installed. {hint}")]
    Requirement { tool: String, hint: String },

    /// The user chose `(c)ancel` or closed stdin at a prompt.
    #[error("Canceled on user request")]
    Cancelled,

    #[error("`{command}` {}", describe_exit(.code))]
    Execution { command: String, code: Option<i32> },

    #[error("cannot use the current directory: {0}")]
    WorkingDirectory(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {code}"),
        None => "was terminated by a signal".into(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
