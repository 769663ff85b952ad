//! Interactive yes/no gate and acknowledgment prompt.
//!
//! [`Prompt`] is generic over its input and output so tests can drive it with
//! a byte slice and capture what it printed.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::{error::Error, ui::frame};

const OPTIONS: [&str; 2] = ["no", "yes"];

pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Show `lines` framed in `*`, then ask `no`/`yes` until a valid index is
    /// entered.
    ///
    /// `c`/`C` or end of input returns [`Error::Cancelled`].  There is no
    /// retry limit.
    pub fn confirm<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<bool> {
        let mut menu = frame(lines);
        for (index, option) in OPTIONS.iter().enumerate() {
            menu.push_str(&format!("\n[{index}]\t{option}"));
        }

        loop {
            writeln!(self.output, "{menu}")?;
            write!(self.output, "Make selection to proceed or (c)ancel: ")?;
            self.output.flush()?;

            let answer = self.read_answer()?;
            writeln!(self.output)?;

            match answer.parse::<usize>().ok().and_then(|i| OPTIONS.get(i)) {
                Some(choice) => {
                    tracing::debug!(choice, "confirmation answered");
                    return Ok(*choice == "yes");
                },
                None => writeln!(self.output, "Error: Option could not be evaluated")?,
            }
        }
    }

    /// Print `message` and wait for Enter.
    pub fn acknowledge(&mut self, message: &str) -> Result<()> {
        write!(self.output, "{message} ")?;
        self.output.flush()?;
        self.read_answer()?;
        Ok(())
    }

    /// One trimmed line of input; cancellation on `c`/`C` or EOF.
    fn read_answer(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading answer from stdin")?;
        let answer = line.trim();
        if read == 0 || answer.eq_ignore_ascii_case("c") {
            return Err(Error::Cancelled.into());
        }
        Ok(answer.to_string())
    }
}
