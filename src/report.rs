//! Human-readable progress reporting.
//!
//! The validator never decides anything based on what it reports; the
//! reporter is a one-way sink. `ConsoleReporter` renders styled lines with
//! crossterm, `SilentReporter` discards everything for headless runs.

use crossterm::style::Stylize;
use std::io::{self, Write};

/// Sink for status lines emitted during a validation run
pub trait Reporter {
    /// Title panel shown once at the start of a run
    fn banner(&mut self, title: &str, target: &str);
    /// Start of a workflow stage
    fn section(&mut self, title: &str);
    /// Echo of a remote command about to run
    fn command(&mut self, host: &str, command: &str);
    fn success(&mut self, message: &str);
    /// Indented supporting line under the previous status
    fn detail(&mut self, message: &str);
    fn note(&mut self, message: &str);
    fn warning(&mut self, message: &str);
    fn failure(&mut self, message: &str);
    /// Final verdict line of a successful run
    fn finished(&mut self, message: &str);
}

impl<R: Reporter + ?Sized> Reporter for &mut R {
    fn banner(&mut self, title: &str, target: &str) {
        (**self).banner(title, target)
    }
    fn section(&mut self, title: &str) {
        (**self).section(title)
    }
    fn command(&mut self, host: &str, command: &str) {
        (**self).command(host, command)
    }
    fn success(&mut self, message: &str) {
        (**self).success(message)
    }
    fn detail(&mut self, message: &str) {
        (**self).detail(message)
    }
    fn note(&mut self, message: &str) {
        (**self).note(message)
    }
    fn warning(&mut self, message: &str) {
        (**self).warning(message)
    }
    fn failure(&mut self, message: &str) {
        (**self).failure(message)
    }
    fn finished(&mut self, message: &str) {
        (**self).finished(message)
    }
}

/// Styled terminal output
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    // Reporting is best-effort: a closed stdout must not abort the run
    fn line(&mut self, text: impl std::fmt::Display) {
        let _ = writeln!(self.out, "{}", text);
        let _ = self.out.flush();
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn banner(&mut self, title: &str, target: &str) {
        let body = [title.to_string(), format!("Target: {}", target)];
        let width = body.iter().map(|l| l.chars().count()).max().unwrap_or(0) + 2;
        let border = "─".repeat(width);

        self.line(format!("╭{}╮", border).cyan());
        self.line(format!(
            "{} {}{} {}",
            "│".cyan(),
            title.bold().cyan(),
            " ".repeat(width - 2 - title.chars().count()),
            "│".cyan()
        ));
        self.line(format!(
            "{} {:<pad$} {}",
            "│".cyan(),
            body[1],
            "│".cyan(),
            pad = width - 2
        ));
        self.line(format!("╰{}╯", border).cyan());
    }

    fn section(&mut self, title: &str) {
        self.line(format!("\n{}", title.bold()));
    }

    fn command(&mut self, host: &str, command: &str) {
        self.line(format!("$ ssh {} {:?}", host, command).dim());
    }

    fn success(&mut self, message: &str) {
        self.line(format!("{} {}", "✓".green(), message));
    }

    fn detail(&mut self, message: &str) {
        self.line(format!("  {}", message));
    }

    fn note(&mut self, message: &str) {
        self.line(format!("{} {}", "Note:".yellow(), message));
    }

    fn warning(&mut self, message: &str) {
        self.line(format!("{} {}", "!".yellow(), message));
    }

    fn failure(&mut self, message: &str) {
        self.line(format!("{} {}", "✗".red(), message));
    }

    fn finished(&mut self, message: &str) {
        self.line(format!("\n{}", format!("✓ {}", message).bold().green()));
    }
}

/// Discards everything; used with `--quiet`
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn banner(&mut self, _title: &str, _target: &str) {}
    fn section(&mut self, _title: &str) {}
    fn command(&mut self, _host: &str, _command: &str) {}
    fn success(&mut self, _message: &str) {}
    fn detail(&mut self, _message: &str) {}
    fn note(&mut self, _message: &str) {}
    fn warning(&mut self, _message: &str) {}
    fn failure(&mut self, _message: &str) {}
    fn finished(&mut self, _message: &str) {}
}
