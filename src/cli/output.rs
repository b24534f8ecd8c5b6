//! Output formatting for rgmgmt
//!
//! Provides colored step headers, item lines and the pause prompt used by a
//! sample run.

use colored::Colorize;
use serde_json::Value;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};
use tracing::warn;

use rgmgmt::sample::Reporter;

/// Console output for a run
pub struct OutputFormatter<W: Write = io::Stdout> {
    /// Destination for run output
    out: W,
    /// Source for the pause prompt
    input: Box<dyn BufRead>,
    /// Use colored output
    use_color: bool,
    /// Verbosity level
    verbosity: u8,
    /// Start time for duration calculations
    start_time: Instant,
    /// Set once writing to `out` has failed
    write_failed: bool,
}

impl OutputFormatter {
    /// Create a formatter writing to stdout and reading from stdin
    pub fn new(use_color: bool, verbosity: u8) -> Self {
        Self::with_io(
            io::stdout(),
            Box::new(io::BufReader::new(io::stdin())),
            use_color,
            verbosity,
        )
    }
}

impl<W: Write> OutputFormatter<W> {
    /// Create a formatter over arbitrary streams
    pub fn with_io(out: W, input: Box<dyn BufRead>, use_color: bool, verbosity: u8) -> Self {
        // Respect NO_COLOR environment variable
        let use_color = use_color && std::env::var_os("NO_COLOR").is_none();

        Self {
            out,
            input,
            use_color,
            verbosity,
            start_time: Instant::now(),
            write_failed: false,
        }
    }

    /// Consume the formatter, returning its output stream
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        let result = writeln!(self.out, "{}", text);
        self.check(result);
    }

    /// Log the first failed write; later output is attempted but not reported.
    fn check(&mut self, result: io::Result<()>) {
        if let Err(e) = result {
            if !self.write_failed {
                warn!(error = %e, "Failed to write output");
                self.write_failed = true;
            }
        }
    }

    /// Whether any write to the output stream failed
    pub fn write_failed(&self) -> bool {
        self.write_failed
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "ERROR:".red().bold(), message);
        } else {
            eprintln!("ERROR: {}", message);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "HINT:".cyan().bold(), message);
        } else {
            eprintln!("HINT: {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.use_color {
            eprintln!("{} {}", "WARNING:".yellow().bold(), message);
        } else {
            eprintln!("WARNING: {}", message);
        }
    }

    /// Print the closing line of a successful run
    pub fn finished(&mut self) {
        let elapsed = format_duration(self.start_time.elapsed());
        let text = format!("Sample completed in {}", elapsed);
        let text = if self.use_color {
            text.green().bold().to_string()
        } else {
            text
        };
        self.line(&text);
    }

    /// Flush output
    pub fn flush(&mut self) {
        let result = self.out.flush();
        self.check(result);
    }
}

impl<W: Write> Reporter for OutputFormatter<W> {
    fn step(&mut self, message: &str) {
        let text = if self.use_color {
            message.cyan().bold().to_string()
        } else {
            message.to_string()
        };
        self.line(&text);
    }

    fn item(&mut self, label: &str, name: &str, id: &str) {
        let text = if self.verbosity >= 1 {
            format!("\t{} Name: {}, Id: {}", label, name, id)
        } else {
            format!("\tName: {}, Id: {}", name, id)
        };
        self.line(&text);
    }

    fn template(&mut self, template: &Value) {
        match serde_json::to_string_pretty(template) {
            Ok(text) => self.line(&text),
            Err(e) => self.warning(&format!("Could not render template: {}", e)),
        }
    }

    fn end_step(&mut self) {
        self.line("");
    }

    fn confirm(&mut self, prompt: &str) -> io::Result<()> {
        let text = if self.use_color {
            prompt.yellow().to_string()
        } else {
            prompt.to_string()
        };
        self.line(&text);
        self.out.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(())
    }
}

/// Format a duration as a human-readable string
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}.{:03}s", secs, millis)
    } else {
        format!("{}ms", millis)
    }
}
