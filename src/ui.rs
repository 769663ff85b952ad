//! Terminal UI — framed banners, status lines and the delete-step spinner.
//!
//! Everything the operator reads (apart from the streamed archiver output and
//! the interactive prompt in [`crate::prompt`]) is printed from here, so the
//! look stays consistent.  Banner layout is built by the pure [`frame`]
//! function so it can be tested without a terminal.

use std::time::Duration;

use console::{measure_text_width, style};
use indicatif::{ProgressBar, ProgressStyle};

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames — same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}
fn icon_warn() -> console::StyledObject<&'static str> {
    style("!").yellow().bold()
}

// ─── Banners ──────────────────────────────────────────────────────────────────

/// Surround `lines` with a row of `*` above and below, as wide as the longest
/// line.
pub fn frame<S: AsRef<str>>(lines: &[S]) -> String {
    let width = lines
        .iter()
        .map(|l| measure_text_width(l.as_ref()))
        .max()
        .unwrap_or(0);
    let border = "*".repeat(width);
    let mut out = String::with_capacity((width + 1) * (lines.len() + 2));
    out.push_str(&border);
    for line in lines {
        out.push('\n');
        out.push_str(line.as_ref());
    }
    out.push('\n');
    out.push_str(&border);
    out
}

/// Final banner after the archiver exited cleanly.
pub fn print_success(message: &str) {
    println!();
    println!("{}", style(frame(&[message])).cyan().bold());
    println!("  {}  done", icon_ok());
}

// ─── Status lines ─────────────────────────────────────────────────────────────

pub fn info(message: &str) {
    println!("{} {message}", style("Info:").cyan().bold());
}

pub fn warn(message: &str) {
    println!("  {}  {}", icon_warn(), style(message).yellow());
}

/// Report a fatal error, including its `anyhow` cause chain.
pub fn error(err: &anyhow::Error) {
    eprintln!("  {}  {} {err}", icon_err(), style("Error:").red().bold());
    for cause in err.chain().skip(1) {
        eprintln!("      {} {cause}", style("caused by:").dim());
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

/// Create and start an indeterminate spinner for `label`.
///
/// The spinner ticks at ~80 ms and is cleared by [`finish_spinner`].
pub fn start_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::with_template("  {spinner:.cyan}  {msg}") {
        pb.set_style(template.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Clear `pb` and leave a static `✓ label DONE` line behind.
pub fn finish_spinner(pb: &ProgressBar, label: &str) {
    pb.finish_and_clear();
    println!("  {}  {label}{}", icon_ok(), style("DONE").bold());
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_sizes_border_to_longest_line() {
        let framed = frame(&["short", "a much longer line"]);
        let lines: Vec<&str> = framed.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "*".repeat(18));
        assert_eq!(lines[1], "short");
        assert_eq!(lines[2], "a much longer line");
        assert_eq!(lines[3], "*".repeat(18));
    }

    #[test]
    fn frame_counts_characters_not_bytes() {
        let framed = frame(&["ünïcödé"]);
        assert!(framed.starts_with("*******\n"));
    }

    #[test]
    fn frame_of_nothing_is_two_empty_borders() {
        let empty: [&str; 0] = [];
        assert_eq!(frame(&empty), "\n");
    }

    #[test]
    fn snapshot_success_frame() {
        insta::assert_snapshot!(
            frame(&["/ backup to /mnt/usb/pi.tar.gz successful."]),
            @r"
        ******************************************
        / backup to /mnt/usb/pi.tar.gz successful.
        ******************************************
        "
        );
    }

    #[test]
    fn spinner_lifecycle_does_not_panic() {
        let pb = start_spinner("Deleting /tmp/x/*...");
        finish_spinner(&pb, "Deleting /tmp/x/*...");
    }
}
