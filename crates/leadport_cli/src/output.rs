//! Terminal output helpers.
//!
//! Human-facing results go to stdout through [`Output`]; progress logging goes
//! to stderr through `tracing`.

use owo_colors::OwoColorize;

#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    _private: (),
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress line, e.g. "Connecting to database..."
    pub fn status(&self, message: &str) {
        println!("{} {}", "•".bright_blue(), message);
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", "!".yellow(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        println!("{} {}", "✗".red(), message.red());
    }

    /// Aligned key/value line.
    pub fn kv(&self, key: &str, value: &str) {
        println!("  {:<14} {}", format!("{key}:").dimmed(), value);
    }

    pub fn section(&self, title: &str) {
        println!();
        println!("{}", title.bold());
    }
}
