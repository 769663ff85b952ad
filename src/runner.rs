//! Command construction.
//!
//! This module is responsible for *building* the argument lists that will be
//! passed to tar, the compressor and the progress filter.  It deliberately
//! does **not** execute anything; execution lives in [`crate::exec`].
//!
//! Commands are argument vectors, never shell strings: paths go to the child
//! process verbatim, so a target named `x; rm -rf /` is just an odd filename.
//! The one place a shell is involved (the pre-restore delete, which relies on
//! glob expansion) passes the path as a positional parameter rather than
//! splicing it into the script.

use std::fmt;

use crate::{
    checks::ToolChoice,
    request::{Action, BackupRequest},
};

// ─── Exclusions ───────────────────────────────────────────────────────────────

/// Always excluded from a backup, relative to the archive root.
///
/// Virtual and volatile mount points, logs, the apt download cache, kernel
/// header trees, and per-user trash/cache directories.
pub const FIXED_EXCLUDES: [&str; 13] = [
    "./proc/*",
    "./tmp/*",
    "./mnt/*",
    "./dev/*",
    "./sys/*",
    "./run/*",
    "./media/*",
    "./var/log/*",
    "./var/cache/apt/archives/*",
    "./usr/src/linux-headers*",
    "./home/*/.gvfs/*",
    "./home/*/.cache/*",
    "./home/*/.local/share/Trash/*",
];

/// Script for the pre-restore delete; `$1` is the target directory.
const DELETE_CONTENTS_SCRIPT: &str = r#"rm -r -- "$1"/*"#;

// ─── Command types ────────────────────────────────────────────────────────────

/// One program with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Program followed by arguments, as one vector.
    pub fn argv(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Stages connected stdout → stdin, optionally writing the final stdout to a
/// file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    pub stages: Vec<Invocation>,
    pub stdout_to: Option<String>,
}

impl Pipeline {
    pub fn single(stage: Invocation) -> Self {
        Self {
            stages: vec![stage],
            stdout_to: None,
        }
    }
}

/// Shell-like rendering, for logs, error messages and `--dry-run`.
impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            let words: Vec<String> = stage.argv().into_iter().map(quote).collect();
            f.write_str(&words.join(" "))?;
        }
        if let Some(path) = &self.stdout_to {
            write!(f, " > {}", quote(path))?;
        }
        Ok(())
    }
}

/// Single-quote `word` when it contains anything a POSIX shell would
/// interpret.
fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Everything needed to carry out a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    /// Restore only: empties the target directory first.
    pub delete: Option<Pipeline>,
    /// The backup or the extraction.
    pub archive: Pipeline,
}

// ─── Builders ─────────────────────────────────────────────────────────────────

/// Build the commands for `request`.
pub fn build(request: &BackupRequest, tools: &ToolChoice, extra_excludes: &[String]) -> CommandPlan {
    match request.action {
        Action::Backup => CommandPlan {
            delete: None,
            archive: build_backup(request, tools, extra_excludes),
        },
        Action::Restore => CommandPlan {
            delete: Some(build_delete(&request.target)),
            archive: build_restore(request, tools),
        },
    }
}

/// `--exclude=` arguments for a backup of `source` into `target`.
///
/// The fixed list, then the target's top-level directory and the target file
/// so the archive never contains itself, then `extra`.
///
/// The whole top-level directory goes, not just the target's parent: a target
/// of `/home/pi/pi.tar.gz` drops everything under `./home/*` from the backup.
/// Keep archives on a dedicated mount point to avoid losing data that way.
/// The directory pattern is skipped when the fixed list already has it.
pub fn exclude_args(source: &str, target: &str, extra: &[String]) -> Vec<String> {
    let anchored = anchor(source, target);
    let top_dir = anchored
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    let top_pattern = format!("./{top_dir}/*");

    let mut args: Vec<String> = FIXED_EXCLUDES
        .iter()
        .map(|p| format!("--exclude={p}"))
        .collect();
    if !FIXED_EXCLUDES.contains(&top_pattern.as_str()) {
        args.push(format!("--exclude={top_pattern}"));
    }
    args.push(format!("--exclude=.{anchored}"));
    args.extend(extra.iter().map(|p| format!("--exclude={p}")));
    args
}

/// `target` as seen from inside the archive: relative to `source` when it lies
/// below it, else the absolute path.  Always starts with `/`.
fn anchor(source: &str, target: &str) -> String {
    let root = source.trim_end_matches('/');
    match target.strip_prefix(root) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => target.to_string(),
    }
}

/// `tar -cp[v] -I <compressor> -C <source> <excludes…> ./ -f <target|->`,
/// piped through the progress filter into `target` when one is available.
pub fn build_backup(request: &BackupRequest, tools: &ToolChoice, extra_excludes: &[String]) -> Pipeline {
    let verbose = tools.progress.is_none();
    let mut args = vec![
        if verbose { "-cpv" } else { "-cp" }.to_string(),
        "-I".into(),
        tools.compressor.clone(),
        "-C".into(),
        request.source.clone(),
    ];
    args.extend(exclude_args(&request.source, &request.target, extra_excludes));
    args.extend(["./".into(), "-f".into()]);

    match &tools.progress {
        Some(progress) => {
            args.push("-".into());
            Pipeline {
                stages: vec![
                    Invocation::new(&tools.archiver, args),
                    Invocation::new(progress, Vec::<String>::new()),
                ],
                stdout_to: Some(request.target.clone()),
            }
        },
        None => {
            args.push(request.target.clone());
            Pipeline::single(Invocation::new(&tools.archiver, args))
        },
    }
}

/// `[pv <source> |] tar -xp[v] -I <compressor> -f <source|-> -C <target>`.
pub fn build_restore(request: &BackupRequest, tools: &ToolChoice) -> Pipeline {
    let (flags, input) = match tools.progress {
        Some(_) => ("-xp", "-"),
        None => ("-xpv", request.source.as_str()),
    };
    let tar = Invocation::new(&tools.archiver, [
        flags,
        "-I",
        tools.compressor.as_str(),
        "-f",
        input,
        "-C",
        request.target.as_str(),
    ]);

    match &tools.progress {
        Some(progress) => Pipeline {
            stages: vec![Invocation::new(progress, [request.source.as_str()]), tar],
            stdout_to: None,
        },
        None => Pipeline::single(tar),
    }
}

/// Remove everything matching `<target>/*`, leaving `target` itself alone.
pub fn build_delete(target: &str) -> Pipeline {
    Pipeline::single(Invocation::new("sh", [
        "-c",
        DELETE_CONTENTS_SCRIPT,
        "sh",
        target,
    ]))
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn tools(progress: bool) -> ToolChoice {
        ToolChoice {
            archiver: "tar".into(),
            compressor: "pigz".into(),
            progress: progress.then(|| "pv".into()),
        }
    }

    fn backup(source: &str, target: &str) -> BackupRequest {
        BackupRequest {
            action: Action::Backup,
            source: source.into(),
            target: target.into(),
        }
    }

    fn restore(source: &str, target: &str) -> BackupRequest {
        BackupRequest {
            action: Action::Restore,
            source: source.into(),
            target: target.into(),
        }
    }

    // ── exclusions ────────────────────────────────────────────────────────────

    #[test]
    fn every_fixed_exclusion_appears_exactly_once() {
        for target in ["/out/img.tar.gz", "/mnt/usb/img.tar.gz", "/tmp/img.tar.gz"] {
            let plan = build(&backup("/data", target), &tools(true), &[]);
            let args = &plan.archive.stages[0].args;
            for pattern in FIXED_EXCLUDES {
                let arg = format!("--exclude={pattern}");
                assert_eq!(
                    args.iter().filter(|a| **a == arg).count(),
                    1,
                    "{arg} should appear once for {target}"
                );
            }
        }
    }

    #[test]
    fn nested_target_excludes_its_whole_top_level_directory() {
        let args = exclude_args("/", "/home/pi/pi.tar.gz", &[]);
        let n = args.len();
        assert_eq!(args[n - 2], "--exclude=./home/*");
        assert_eq!(args[n - 1], "--exclude=./home/pi/pi.tar.gz");
    }

    #[test]
    fn trash_and_cache_patterns_are_separate_arguments() {
        let args = exclude_args("/", "/out/img.tar.gz", &[]);
        assert!(args.contains(&"--exclude=./home/*/.cache/*".to_string()));
        assert!(args.contains(&"--exclude=./home/*/.local/share/Trash/*".to_string()));
        assert!(args.iter().all(|a| a.matches("--exclude=").count() == 1));
    }

    #[test]
    fn target_under_fixed_directory_adds_only_the_file() {
        let args = exclude_args("/", "/mnt/usb/pi.tar.gz", &[]);
        assert_eq!(args.len(), FIXED_EXCLUDES.len() + 1);
        assert_eq!(args.last().unwrap(), "--exclude=./mnt/usb/pi.tar.gz");
    }

    #[test]
    fn target_inside_source_is_anchored_to_source() {
        let args = exclude_args("/srv", "/srv/backups/site.tar.gz", &[]);
        let n = args.len();
        assert_eq!(args[n - 2], "--exclude=./backups/*");
        assert_eq!(args[n - 1], "--exclude=./backups/site.tar.gz");
    }

    #[test]
    fn target_outside_source_keeps_absolute_anchor() {
        let args = exclude_args("/srv", "/out/site.tar.gz", &[]);
        let n = args.len();
        assert_eq!(args[n - 2], "--exclude=./out/*");
        assert_eq!(args[n - 1], "--exclude=./out/site.tar.gz");
    }

    #[test]
    fn sibling_with_common_prefix_is_not_inside_source() {
        assert_eq!(anchor("/srv", "/srv2/a.tar.gz"), "/srv2/a.tar.gz");
        assert_eq!(anchor("/", "/a.tar.gz"), "/a.tar.gz");
    }

    #[test]
    fn extra_excludes_follow_fixed_ones() {
        let args = exclude_args("/", "/out/a.tar.gz", &["./srv/cache/*".into()]);
        assert_eq!(args.last().unwrap(), "--exclude=./srv/cache/*");
        assert_eq!(args.len(), FIXED_EXCLUDES.len() + 3);
    }

    // ── backup ────────────────────────────────────────────────────────────────

    #[test]
    fn backup_references_source_root_and_target() {
        let plan = build(&backup("/data", "/out/img.tar.gz"), &tools(false), &[]);
        assert!(plan.delete.is_none());
        let tar = &plan.archive.stages[0];
        let c = tar.args.iter().position(|a| a == "-C").unwrap();
        assert_eq!(tar.args[c + 1], "/data");
        let f = tar.args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(tar.args[f - 1], "./");
        assert_eq!(tar.args[f + 1], "/out/img.tar.gz");
    }

    #[test]
    fn backup_with_progress_pipes_into_target() {
        let plan = build(&backup("/data", "/out/img.tar.gz"), &tools(true), &[]);
        let p = &plan.archive;
        assert_eq!(p.stages.len(), 2);
        assert_eq!(p.stages[0].args[0], "-cp");
        assert_eq!(p.stages[0].args.last().unwrap(), "-");
        assert_eq!(p.stages[1].argv(), vec!["pv"]);
        assert_eq!(p.stdout_to.as_deref(), Some("/out/img.tar.gz"));
    }

    #[test]
    fn backup_without_progress_lists_files() {
        let plan = build(&backup("/data", "/out/img.tar.gz"), &tools(false), &[]);
        assert_eq!(plan.archive.stages.len(), 1);
        assert_eq!(plan.archive.stages[0].args[0], "-cpv");
        assert!(plan.archive.stdout_to.is_none());
    }

    #[test]
    fn backup_uses_chosen_compressor() {
        let mut t = tools(false);
        t.compressor = "gzip".into();
        let plan = build(&backup("/", "/out/a.tar.gz"), &t, &[]);
        assert_eq!(plan.archive.stages[0].args[1..3], ["-I", "gzip"]);
    }

    // ── restore ───────────────────────────────────────────────────────────────

    #[test]
    fn restore_deletes_contents_not_directory() {
        let plan = build(&restore("/out/img.tar.gz", "/mnt/sd"), &tools(true), &[]);
        let delete = plan.delete.expect("restore needs a delete step");
        let argv = delete.stages[0].argv();
        assert_eq!(argv, vec!["sh", "-c", r#"rm -r -- "$1"/*"#, "sh", "/mnt/sd"]);
        assert!(!argv.contains(&"/mnt/sd/"));
    }

    #[test]
    fn restore_with_progress_reads_through_pv() {
        let plan = build(&restore("/out/img.tar.gz", "/mnt/sd"), &tools(true), &[]);
        let p = &plan.archive;
        assert_eq!(p.stages[0].argv(), vec!["pv", "/out/img.tar.gz"]);
        assert_eq!(p.stages[1].argv(), vec![
            "tar", "-xp", "-I", "pigz", "-f", "-", "-C", "/mnt/sd"
        ]);
        assert!(p.stdout_to.is_none());
    }

    #[test]
    fn restore_without_progress_reads_file_directly() {
        let plan = build(&restore("/out/img.tar.gz", "/mnt/sd"), &tools(false), &[]);
        assert_eq!(plan.archive.stages.len(), 1);
        assert_eq!(plan.archive.stages[0].argv(), vec![
            "tar",
            "-xpv",
            "-I",
            "pigz",
            "-f",
            "/out/img.tar.gz",
            "-C",
            "/mnt/sd"
        ]);
    }

    #[test]
    fn restore_ignores_extra_excludes() {
        let extra = vec!["./srv/*".to_string()];
        let plan = build(&restore("/a.tar.gz", "/mnt/sd"), &tools(false), &extra);
        assert!(plan.archive.stages[0].args.iter().all(|a| !a.starts_with("--exclude")));
    }

    // ── rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn display_quotes_only_when_needed() {
        let p = Pipeline {
            stages: vec![
                Invocation::new("pv", ["/my backups/it's.tar.gz"]),
                Invocation::new("tar", ["-xp", "-f", "-", "-C", "/mnt/sd"]),
            ],
            stdout_to: None,
        };
        assert_eq!(
            p.to_string(),
            r"pv '/my backups/it'\''s.tar.gz' | tar -xp -f - -C /mnt/sd"
        );
    }

    #[test]
    fn display_shows_redirect() {
        let plan = build(&backup("/", "/out/a.tar.gz"), &tools(true), &[]);
        assert!(plan.archive.to_string().ends_with("| pv > /out/a.tar.gz"));
    }

    #[test]
    fn display_quotes_globs() {
        assert_eq!(quote("--exclude=./proc/*"), "'--exclude=./proc/*'");
        assert_eq!(quote(""), "''");
    }

    // ── insta snapshots ───────────────────────────────────────────────────────
    // These lock down the exact argument vectors so any unintended change is
    // immediately visible in the diff.

    #[test]
    fn snapshot_backup_with_progress() {
        let plan = build(&backup("/", "/mnt/usb/pi.tar.gz"), &tools(true), &[]);
        insta::assert_debug_snapshot!(plan.archive.stages[0].argv(), @r#"
        [
            "tar",
            "-cp",
            "-I",
            "pigz",
            "-C",
            "/",
            "--exclude=./proc/*",
            "--exclude=./tmp/*",
            "--exclude=./mnt/*",
            "--exclude=./dev/*",
            "--exclude=./sys/*",
            "--exclude=./run/*",
            "--exclude=./media/*",
            "--exclude=./var/log/*",
            "--exclude=./var/cache/apt/archives/*",
            "--exclude=./usr/src/linux-headers*",
            "--exclude=./home/*/.gvfs/*",
            "--exclude=./home/*/.cache/*",
            "--exclude=./home/*/.local/share/Trash/*",
            "--exclude=./mnt/usb/pi.tar.gz",
            "./",
            "-f",
            "-",
        ]
        "#);
    }

    #[test]
    fn snapshot_restore_without_progress() {
        let plan = build(&restore("/mnt/usb/pi.tar.gz", "/mnt/sd"), &tools(false), &[]);
        insta::assert_snapshot!(plan.archive.to_string(), @"tar -xpv -I pigz -f /mnt/usb/pi.tar.gz -C /mnt/sd");
    }
}
