//! Pre-flight gates: superuser check and external tool resolution.

use crate::{
    config::{RequirementPolicy, ToolsConfig},
    error::{Error, Result},
    host::Host,
};

// ─── Privileges ───────────────────────────────────────────────────────────────

/// Fail unless running as uid 0.
///
/// Archiving a whole root filesystem needs to read files of every owner and
/// mode, and a restore must be able to write anywhere under the target.
pub fn check_privileges(host: &dyn Host) -> Result<()> {
    let uid = host.effective_uid();
    tracing::debug!(uid, "privilege check");
    if uid == 0 { Ok(()) } else { Err(Error::Privilege) }
}

// ─── Tools ────────────────────────────────────────────────────────────────────

/// The programs the command builder will use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolChoice {
    pub archiver: String,
    pub compressor: String,
    /// `None` when no progress filter is available; the archiver then lists
    /// processed files instead.
    pub progress: Option<String>,
}

/// A tool that was missing and has been worked around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Degradation {
    /// `missing` replaced by `fallback`.
    Compressor { missing: String, fallback: String },
    /// No progress bar; file listing instead.
    Progress { missing: String },
}

impl Degradation {
    /// One-line hint shown to the user.
    pub fn hint(&self, action: &str) -> String {
        match self {
            Self::Compressor { missing, fallback } => format!(
                "By installing {missing} the speed of the {action} can be improved. \
                 Using {fallback} as alternative."
            ),
            Self::Progress { missing } => format!(
                "By installing {missing} a statusbar will be shown. Listing processed files instead."
            ),
        }
    }

    pub fn missing(&self) -> &str {
        match self {
            Self::Compressor { missing, .. } | Self::Progress { missing } => missing,
        }
    }
}

/// Output of [`check_requirements`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirements {
    pub tools: ToolChoice,
    pub degraded: Vec<Degradation>,
    /// Whether the user has to acknowledge `degraded` before continuing.
    pub needs_acknowledgment: bool,
}

impl Requirements {
    /// Prompt text asking the user to acknowledge the degradations.
    pub fn acknowledgment_message(&self) -> String {
        let missing: Vec<&str> = self.degraded.iter().map(Degradation::missing).collect();
        format!(
            "Abort with <ctrl> + <c> to install {} for best user experience or proceed with <enter>.",
            missing.join(" and ")
        )
    }
}

/// Resolve which tools to use, according to `cfg.policy`.
///
/// The archiver is always mandatory.  Under [`RequirementPolicy::Strict`] the
/// preferred compressor is mandatory too and a missing progress filter is
/// merely reported.  Under [`RequirementPolicy::Degrade`] a missing compressor
/// falls back to `cfg.fallback_compressor` (which must exist) and both
/// degradations require the user's acknowledgment.
pub fn check_requirements(host: &dyn Host, cfg: &ToolsConfig) -> Result<Requirements> {
    require(host, &cfg.archiver)?;

    let mut degraded = Vec::new();

    let compressor = if host.has_tool(&cfg.compressor) {
        cfg.compressor.clone()
    } else {
        match cfg.policy {
            RequirementPolicy::Strict => return Err(missing(&cfg.compressor)),
            RequirementPolicy::Degrade => {
                require(host, &cfg.fallback_compressor)?;
                degraded.push(Degradation::Compressor {
                    missing: cfg.compressor.clone(),
                    fallback: cfg.fallback_compressor.clone(),
                });
                cfg.fallback_compressor.clone()
            },
        }
    };

    let progress = if host.has_tool(&cfg.progress) {
        Some(cfg.progress.clone())
    } else {
        degraded.push(Degradation::Progress {
            missing: cfg.progress.clone(),
        });
        None
    };

    let needs_acknowledgment = cfg.policy == RequirementPolicy::Degrade && !degraded.is_empty();

    let tools = ToolChoice {
        archiver: cfg.archiver.clone(),
        compressor,
        progress,
    };
    tracing::info!(?tools, degraded = degraded.len(), "resolved tools");

    Ok(Requirements {
        tools,
        degraded,
        needs_acknowledgment,
    })
}

fn require(host: &dyn Host, tool: &str) -> Result<()> {
    if host.has_tool(tool) { Ok(()) } else { Err(missing(tool)) }
}

fn missing(tool: &str) -> Error {
    Error::Requirement {
        tool: tool.to_string(),
        hint: format!("Install it with your package manager, e.g. `apt install {tool}`."),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
