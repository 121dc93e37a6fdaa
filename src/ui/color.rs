//! Terminal colors for report output

use crate::core::types::Percent;

pub struct Colors;

impl Colors {
    pub const RESET: &'static str = "\x1b[0m";
    pub const BOLD: &'static str = "\x1b[1m";
    pub const DIM: &'static str = "\x1b[2m";

    pub const BRIGHT_RED: &'static str = "\x1b[91m";
    pub const BRIGHT_GREEN: &'static str = "\x1b[92m";
    pub const BRIGHT_YELLOW: &'static str = "\x1b[93m";
    pub const BRIGHT_CYAN: &'static str = "\x1b[96m";
}

/// Apply color to text if terminal supports it
pub fn colorize(text: &str, color: &str) -> String {
    if supports_formatting() {
        format!("{color}{text}{}", Colors::RESET)
    } else {
        text.to_string()
    }
}

/// Whether ANSI escapes should be written to stdout
pub fn supports_formatting() -> bool {
    use std::env;
    use std::io::IsTerminal;

    if env::var("NO_COLOR").is_ok() || env::var("FORCE_COLOR").as_deref() == Ok("0") {
        return false;
    }
    if env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    // Disable formatting when running tests
    if cfg!(test) {
        return false;
    }

    if !std::io::stdout().is_terminal() {
        return false;
    }

    !matches!(env::var("TERM").as_deref(), Ok("dumb") | Ok(""))
}

/// Color for a change where growth is good.
pub fn change_color(change: Percent) -> &'static str {
    let value = change.value();
    if value.is_nan() || value == 0.0 {
        Colors::DIM
    } else if value > 0.0 {
        Colors::BRIGHT_GREEN
    } else {
        Colors::BRIGHT_RED
    }
}

/// Signed percentage, colored by direction.
pub fn colorize_change(change: Percent) -> String {
    let text = if change.value() > 0.0 && change.value().is_finite() {
        format!("+{change}")
    } else {
        change.to_string()
    };
    colorize(&text, change_color(change))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn test_colorize__plain_under_test() {
        assert_eq!(colorize("clicks", Colors::BRIGHT_CYAN), "clicks");
    }

    #[test]
    fn test_change_color() {
        assert_eq!(change_color(Percent(12.5)), Colors::BRIGHT_GREEN);
        assert_eq!(change_color(Percent::INFINITY), Colors::BRIGHT_GREEN);
        assert_eq!(change_color(Percent(-3.0)), Colors::BRIGHT_RED);
        assert_eq!(change_color(Percent(0.0)), Colors::DIM);
    }

    #[test]
    fn test_colorize_change__sign() {
        assert_eq!(colorize_change(Percent(12.5)), "+12.50%");
        assert_eq!(colorize_change(Percent(-40.0)), "-40.00%");
        assert_eq!(colorize_change(Percent::INFINITY), "Infinity");
    }
}
