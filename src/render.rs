//! Status and error output for the CLI boundary.
//!
//! This is for the tool's own messages (errors, listings, confirmations),
//! styled with named crossterm colors. Swatch rendering that must reference
//! specific 4-bit registers lives in [`crate::display`] instead.

use crossterm::style::{Color, Stylize};

const LABEL_WARNING: &str = "warning:";
const LABEL_ERROR: &str = "error:";

/// Terminal renderer for CLI messages, with optional color output.
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Plain informational line on stdout.
    pub fn message(&self, msg: &str) {
        println!("{msg}");
    }

    pub fn warn(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_WARNING.with(Color::Yellow).bold());
        } else {
            eprintln!("{LABEL_WARNING} {msg}");
        }
    }

    pub fn error(&self, msg: &str) {
        if self.color {
            eprintln!("{} {msg}", LABEL_ERROR.with(Color::Red).bold());
        } else {
            eprintln!("{LABEL_ERROR} {msg}");
        }
    }
}
