//! Access to process-global state: working directory, user id, installed
//! tools.
//!
//! Everything that would otherwise be an ambient lookup goes through the
//! [`Host`] trait so validation, the privilege gate and tool resolution can be
//! tested against a [`fake::FakeHost`] without touching the real system.

use crate::error::{Error, Result};

pub trait Host {
    /// Current working directory as a UTF-8 string.
    fn current_dir(&self) -> Result<String>;

    /// Effective numeric user id of this process.
    fn effective_uid(&self) -> u32;

    /// Whether an executable called `name` can be found on `PATH`.
    fn has_tool(&self, name: &str) -> bool;
}

/// The real machine.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl Host for System {
    fn current_dir(&self) -> Result<String> {
        let cwd = std::env::current_dir().map_err(|e| Error::WorkingDirectory(e.to_string()))?;
        cwd.into_os_string()
            .into_string()
            .map_err(|raw| Error::WorkingDirectory(format!("{} is not valid UTF-8", raw.to_string_lossy())))
    }

    fn effective_uid(&self) -> u32 {
        nix::unistd::Uid::effective().as_raw()
    }

    fn has_tool(&self, name: &str) -> bool {
        let found = which::which(name);
        tracing::debug!(tool = name, found = ?found.as_ref().ok(), "tool lookup");
        found.is_ok()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_current_dir_is_absolute() {
        let cwd = System.current_dir().unwrap();
        assert!(cwd.starts_with('/'), "got {cwd}");
    }

    #[test]
    fn system_finds_sh() {
        assert!(System.has_tool("sh"));
    }

    #[test]
    fn system_misses_unknown_tool() {
        assert!(!System.has_tool("definitely-not-a-real-tool-xyz"));
    }
}
