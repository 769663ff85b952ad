//! Configuration types and loading logic.
//!
//! `Config` is a direct 1-to-1 mapping of `config.toml`.  Every field has a
//! `Default` impl so the file is entirely optional: without one, the tool
//! prefers `pigz` and `pv`, degrades gracefully when they are missing, and
//! applies only the built-in exclusion list.
//!
//! # File format
//!
//! ```toml
//! [tools]
//! archiver            = "tar"
//! compressor          = "pigz"    # parallel gzip
//! fallback_compressor = "gzip"    # used when `compressor` is missing
//! progress            = "pv"      # progress bar filter
//! policy              = "degrade" # or "strict"
//!
//! [validation]
//! legacy_suffix_check = false
//!
//! [backup]
//! extra_excludes = ["./srv/cache/*"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root configuration object, deserialised from `config.toml`.
#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// External programs and how strictly their presence is enforced.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Argument validation knobs.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Additions to the backup command.
    #[serde(default)]
    pub backup: BackupConfig,
}

// ─── [tools] ──────────────────────────────────────────────────────────────────

/// How missing tools are handled.
#[derive(Debug, Deserialize, Serialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequirementPolicy {
    /// Archiver and preferred compressor are both mandatory.
    Strict,
    /// Fall back to the slower compressor and drop the progress bar, after
    /// warning the user.
    #[default]
    Degrade,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ToolsConfig {
    /// Archiver; must understand GNU tar flags (`-c -x -p -v -I -C -f`).
    #[serde(default = "default_archiver")]
    pub archiver: String,

    /// Preferred compression filter, passed to the archiver via `-I`.
    #[serde(default = "default_compressor")]
    pub compressor: String,

    /// Single-threaded replacement for `compressor`.
    #[serde(default = "default_fallback_compressor")]
    pub fallback_compressor: String,

    /// Progress-display filter placed in the data stream.
    #[serde(default = "default_progress")]
    pub progress: String,

    #[serde(default)]
    pub policy: RequirementPolicy,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            archiver: default_archiver(),
            compressor: default_compressor(),
            fallback_compressor: default_fallback_compressor(),
            progress: default_progress(),
            policy: RequirementPolicy::default(),
        }
    }
}

// ─── [validation] ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    /// Check `.tar.gz` suffixes against the whole path string and let paths
    /// with fewer than two `.`-segments through, as older releases did.
    ///
    /// Off by default: an extensionless backup target is then rejected.
    #[serde(default)]
    pub legacy_suffix_check: bool,
}

// ─── [backup] ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Default, Clone, PartialEq, Eq)]
pub struct BackupConfig {
    /// Extra tar `--exclude` patterns, relative to the archive root
    /// (`./…`).  Appended after the built-in list.
    #[serde(default)]
    pub extra_excludes: Vec<String>,
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

// These free functions are required by `#[serde(default = "…")]`.

pub fn default_archiver() -> String {
    "tar".into()
}

pub fn default_compressor() -> String {
    "pigz".into()
}

pub fn default_fallback_compressor() -> String {
    "gzip".into()
}

pub fn default_progress() -> String {
    "pv".into()
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// `~/.config/rootfs-backup/config.toml` for the invoking user (usually
/// `/root/.config/…` since the tool runs as root).
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|d| d.join("rootfs-backup").join("config.toml"))
}

/// Read and parse a `Config` from `path`.
///
/// A missing file yields the defaults.  `explicit` marks a path the user
/// passed with `--config`; a missing explicit file is still not an error but
/// earns a warning, since it is most likely a typo.
///
/// Returns an error if the file exists but cannot be read or is not valid
/// TOML.
pub fn load_config(path: &Path, explicit: bool) -> Result<Config> {
    if !path.exists() {
        if explicit {
            tracing::warn!(
                "config file '{}' not found, using defaults",
                path.display()
            );
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
        }
        return Ok(Config::default());
    }

    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;

    toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
