use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use unicode_width::UnicodeWidthStr;

use crate::utils::format_bytes;

/// Terminal output helpers
pub struct UI {
    term: Term,
}

impl UI {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn supports_color(&self) -> bool {
        self.term.features().colors_supported()
    }

    /// Helper method to conditionally apply color based on terminal support
    fn colorize<F>(&self, text: &str, color_fn: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        if self.supports_color() {
            color_fn(text)
        } else {
            text.to_string()
        }
    }

    /// Print a success message (color only if supported)
    pub fn success(&self, message: &str) {
        let output = self.colorize(message, |m| m.green().bold().to_string());
        println!("{}", output);
    }

    /// Print an error message (color only if supported)
    pub fn error(&self, message: &str) {
        let output = self.colorize(message, |m| m.red().bold().to_string());
        eprintln!("{}", output);
    }

    /// Print a warning message (color only if supported)
    pub fn warning(&self, message: &str) {
        let output = self.colorize(message, |m| m.yellow().bold().to_string());
        println!("{}", output);
    }

    /// Print an info message (color only if supported)
    pub fn info(&self, message: &str) {
        let output = self.colorize(message, |m| m.blue().bold().to_string());
        println!("{}", output);
    }

    /// Print a plain line through the terminal handle
    pub fn line(&self, message: &str) {
        println!("{}", message);
    }

    /// Format session status with appropriate color (if supported)
    pub fn format_session_status(&self, logged_in: bool) -> String {
        let text = if logged_in { "Logged in" } else { "Not logged in" };

        if self.supports_color() {
            if logged_in {
                text.green().to_string()
            } else {
                text.red().to_string()
            }
        } else {
            text.to_string()
        }
    }

    /// Format an optional profile field, dimming the placeholder
    pub fn format_user_field(&self, value: Option<&str>) -> String {
        match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => self.colorize("-", |m| m.dimmed().to_string()),
        }
    }

    /// Print an aligned key/value block with a title
    pub fn card(&self, title: &str, rows: Vec<(&str, String)>) {
        let heading = self.colorize(title, |m| m.bold().to_string());
        println!("{}", heading);

        let key_width = rows.iter().map(|(k, _)| k.width()).max().unwrap_or(0);
        for (key, value) in rows {
            let padding = " ".repeat(key_width - key.width());
            println!("  {}{}  {}", key, padding, value);
        }
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

/// Progress bar rendering 0-100 upload percentages
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{msg} [{bar:30}] {pos}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_message(message.to_string());
    bar
}

/// Human readable size with emphasis when colors are available
pub fn format_size_colored(bytes: u64) -> String {
    let formatted = format_bytes(bytes);
    if Term::stdout().features().colors_supported() {
        formatted.cyan().to_string()
    } else {
        formatted
    }
}
