//! Child process execution.
//!
//! [`spawn`] starts every stage of a [`Pipeline`] at once, wiring each
//! stage's stdout into the next one's stdin.  The last stage's stdout either
//! goes to the pipeline's output file, is exposed as a lazy line iterator
//! ([`Execution`]), or is discarded.
//!
//! The [`Executor`] trait is the seam the backup pipeline in
//! [`crate::commands::run`] talks to, so tests can record what would have run
//! instead of running it.

use std::{
    fs::File,
    io::{BufRead, BufReader, Lines, Write},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
};

use anyhow::{Context, Result};

use crate::{error::Error, runner::Pipeline};

// ─── Executor seam ────────────────────────────────────────────────────────────

pub trait Executor {
    /// Run `pipeline` to completion.
    ///
    /// With `stream` on, output is forwarded line by line and a non-zero exit
    /// from any stage is an [`Error::Execution`].  With `stream` off, output
    /// is discarded and exit codes are ignored.
    fn run(&mut self, pipeline: &Pipeline, stream: bool) -> Result<()>;
}

/// Runs pipelines for real, forwarding output to `out`.
pub struct SystemExecutor<W> {
    out: W,
}

impl<W: Write> SystemExecutor<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Executor for SystemExecutor<W> {
    fn run(&mut self, pipeline: &Pipeline, stream: bool) -> Result<()> {
        run_pipeline(pipeline, stream, &mut self.out)
    }
}

// ─── Running pipelines ────────────────────────────────────────────────────────

/// A started pipeline.
///
/// Iterating yields the last stage's stdout one line at a time as the child
/// produces it; nothing is buffered beyond the current line.  Call
/// [`Execution::wait`] afterwards to reap the children.
pub struct Execution {
    children: Vec<(String, Child)>,
    lines: Option<Lines<BufReader<ChildStdout>>>,
}

impl Iterator for Execution {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.lines.as_mut()?.next()
    }
}

impl Execution {
    /// Wait for every stage, in order.  Returns each stage's program name and
    /// exit status.
    pub fn wait(mut self) -> Result<Vec<(String, ExitStatus)>> {
        // Close our end of the pipe so a still-writing child gets EPIPE
        // instead of blocking forever.
        self.lines = None;
        self.children
            .into_iter()
            .map(|(program, mut child)| {
                let status = child
                    .wait()
                    .with_context(|| format!("waiting for {program}"))?;
                tracing::debug!(%program, %status, "stage finished");
                Ok((program, status))
            })
            .collect()
    }
}

/// Start all stages of `pipeline`.
///
/// With `stream` on, stderr is inherited and the last stage's stdout is
/// captured for iteration (unless redirected to a file).  With `stream` off,
/// stdout and stderr of every stage go to `/dev/null`.
pub fn spawn(pipeline: &Pipeline, stream: bool) -> Result<Execution> {
    let Some(last_index) = pipeline.stages.len().checked_sub(1) else {
        anyhow::bail!("cannot run an empty pipeline");
    };

    // Opened up front so a bad path fails before any stage is running.
    let mut redirect = match &pipeline.stdout_to {
        Some(path) => Some(File::create(path).with_context(|| format!("creating {path}"))?),
        None => None,
    };

    let mut children: Vec<(String, Child)> = Vec::with_capacity(pipeline.stages.len());
    let mut upstream: Option<ChildStdout> = None;

    for (index, stage) in pipeline.stages.iter().enumerate() {
        let is_last = index == last_index;
        let mut cmd = Command::new(&stage.program);
        cmd.args(&stage.args);

        if let Some(prev) = upstream.take() {
            cmd.stdin(Stdio::from(prev));
        }

        cmd.stderr(if stream { Stdio::inherit() } else { Stdio::null() });

        let stdout = match (is_last, redirect.take_if(|_| is_last), stream) {
            (false, _, _) => Stdio::piped(),
            (true, Some(file), _) => Stdio::from(file),
            (true, None, true) => Stdio::piped(),
            (true, None, false) => Stdio::null(),
        };
        cmd.stdout(stdout);

        tracing::debug!(argv = ?stage.argv(), "spawning");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                for (_, mut started) in children.drain(..) {
                    let _ = started.kill();
                    let _ = started.wait();
                }
                return Err(e).with_context(|| format!("failed to spawn: {}", stage.program));
            },
        };

        let out = child.stdout.take();
        children.push((stage.program.clone(), child));
        if is_last {
            upstream = out;
        } else {
            upstream = Some(out.context("child stdout was not captured")?);
        }
    }

    Ok(Execution {
        children,
        lines: upstream.map(|stdout| BufReader::new(stdout).lines()),
    })
}

/// Spawn `pipeline`, forward its output to `out` as it arrives, and check
/// exit codes when `stream` is on.
pub fn run_pipeline(pipeline: &Pipeline, stream: bool, out: &mut dyn Write) -> Result<()> {
    tracing::info!(command = %pipeline, stream, "running");
    let mut execution = spawn(pipeline, stream)?;

    for line in execution.by_ref() {
        let line = line.context("reading command output")?;
        writeln!(out, "{line}")?;
        out.flush()?;
    }

    let statuses = execution.wait()?;
    if !stream {
        if let Some((program, status)) = statuses.iter().find(|(_, status)| !status.success()) {
            tracing::debug!(%program, %status, "unchecked stage failed");
        }
        return Ok(());
    }

    match statuses.into_iter().find(|(_, status)| !status.success()) {
        Some((program, status)) => {
            tracing::warn!(%program, %status, "stage failed");
            Err(Error::Execution {
                command: pipeline.to_string(),
                code: status.code(),
            }
            .into())
        },
        None => Ok(()),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
