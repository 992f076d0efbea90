//! Terminal styles.
//!
//! Output code asks for a style by what the text *is* (a heading, a timestamp,
//! a warning) and never picks colors inline. `console` drops the escape codes
//! when stdout is not a terminal.

use console::Style;

pub fn heading() -> Style {
    Style::new().bold()
}

pub fn label() -> Style {
    Style::new().cyan()
}

/// Metadata such as timestamps and counts.
pub fn muted() -> Style {
    Style::new().color256(246).italic()
}

pub fn accent() -> Style {
    Style::new().yellow()
}

pub fn success() -> Style {
    Style::new().green()
}

pub fn warning() -> Style {
    Style::new().red().bold()
}
