// ============================================================================
// diag.rs — Uniform diagnostic channel for recoverable conditions
// ============================================================================

use colored::Colorize;

/// Collects the warnings raised during a conversion run. Everything reported
/// here is recoverable: the run continues and the generated output carries a
/// matching marker so the problem can be fixed without re-running the tool.
#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: Vec<String>,
    quiet: bool,
}

impl Diagnostics {
    pub fn new(quiet: bool) -> Self {
        Self {
            messages: Vec::new(),
            quiet,
        }
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        if !self.quiet {
            eprintln!("{} {}", "[WARN]".yellow().bold(), msg);
        }
        self.messages.push(msg);
    }

    pub fn note(&self, msg: impl AsRef<str>) {
        if !self.quiet {
            println!("{} {}", "[INFO]".cyan(), msg.as_ref());
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.messages
    }

    pub fn warning_count(&self) -> usize {
        self.messages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_are_collected() {
        let mut diag = Diagnostics::new(true);
        diag.warn("first");
        diag.warn(format!("second {}", 2));
        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.warnings()[1], "second 2");
    }
}
