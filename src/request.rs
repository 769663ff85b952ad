//! Positional argument parsing and validation.
//!
//! Turns the raw `<action> <source> <target>` triple into a
//! [`BackupRequest`] whose paths are absolute and whose `.tar.gz` suffixes are
//! on the correct side for the action.  Nothing here touches the filesystem;
//! the working directory is passed in.

use std::fmt;

use crate::{error::UsageError, paths::resolve};

/// The two supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Directory → `.tar.gz`.
    Backup,
    /// `.tar.gz` → directory.
    Restore,
}

impl Action {
    /// Accepts `backup`/`restore` with or without a leading `--`.
    pub fn from_token(token: &str) -> Result<Self, UsageError> {
        match token.strip_prefix("--").unwrap_or(token) {
            "backup" => Ok(Self::Backup),
            "restore" => Ok(Self::Restore),
            other => Err(UsageError::UnknownAction(other.to_string())),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated invocation.  Both paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub action: Action,
    pub source: String,
    pub target: String,
}

/// How `.tar.gz` suffixes are recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuffixPolicy {
    /// Last two `.`-segments of the final path component must be `tar`, `gz`.
    #[default]
    Strict,
    /// Split the whole path on `.`; fewer than two segments always passes,
    /// and a required suffix is only rejected when neither segment matches.
    Legacy,
}

/// Result of [`parse`]: either a help request or something to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    Help,
    Request(BackupRequest),
}

pub const HELP_FLAG: &str = "--help";

/// Parse and validate the positional arguments.
///
/// `--help` anywhere wins over every other check.  Otherwise exactly three
/// arguments are required, both paths are resolved against `cwd`, and the
/// action's suffix rules are enforced.
pub fn parse(args: &[String], cwd: &str, policy: SuffixPolicy) -> Result<Parsed, UsageError> {
    if wants_help(args) {
        return Ok(Parsed::Help);
    }

    let [action, source, target] = args else {
        return Err(if args.len() < 3 {
            UsageError::MissingArguments
        } else {
            UsageError::TooManyArguments
        });
    };

    let source = resolve(source, cwd);
    let target = resolve(target, cwd);
    let action = Action::from_token(action)?;

    match action {
        Action::Backup => {
            if is_archive(&source, policy) == Some(true) {
                return Err(UsageError::ArchiveAsBackupSource);
            }
            if is_archive(&target, policy) == Some(false) && !legacy_partial_match(&target, policy) {
                return Err(UsageError::BackupTargetNotArchive);
            }
        },
        Action::Restore => {
            if is_archive(&source, policy) == Some(false) && !legacy_partial_match(&source, policy) {
                return Err(UsageError::RestoreSourceNotArchive);
            }
            if is_archive(&target, policy) == Some(true) {
                return Err(UsageError::ArchiveAsRestoreTarget);
            }
        },
    }

    tracing::debug!(%action, %source, %target, "validated request");
    Ok(Parsed::Request(BackupRequest {
        action,
        source,
        target,
    }))
}

/// Whether `--help` appears anywhere in `args`.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == HELP_FLAG)
}

/// Whether [`parse`] will read `cwd`: only when it gets as far as resolving
/// paths and at least one of them is relative.
pub fn needs_working_dir(args: &[String]) -> bool {
    if wants_help(args) {
        return false;
    }
    match args {
        [_, source, target] => !source.starts_with('/') || !target.starts_with('/'),
        _ => false,
    }
}

/// Whether `path` ends in `.tar.gz`.
///
/// `None` means the check is skipped: under [`SuffixPolicy::Legacy`] a path
/// with fewer than two `.`-segments is never judged.
fn is_archive(path: &str, policy: SuffixPolicy) -> Option<bool> {
    let subject = match policy {
        SuffixPolicy::Strict => path.rsplit('/').next().unwrap_or(path),
        SuffixPolicy::Legacy => path,
    };
    let segments: Vec<&str> = subject.split('.').collect();
    match segments.as_slice() {
        [.., "tar", "gz"] => Some(true),
        [_, _, ..] => Some(false),
        _ => match policy {
            SuffixPolicy::Strict => Some(false),
            SuffixPolicy::Legacy => None,
        },
    }
}

/// Legacy releases only rejected a missing `.tar.gz` when *both* of the last
/// two segments were wrong, so `x.tar.bz2` and `x.zip.gz` slipped through.
fn legacy_partial_match(path: &str, policy: SuffixPolicy) -> bool {
    if policy != SuffixPolicy::Legacy {
        return false;
    }
    let mut rev = path.rsplit('.');
    let last = rev.next();
    let second = rev.next();
    second == Some("tar") || last == Some("gz")
}
