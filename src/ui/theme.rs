//! Terminal styles for CLI output

use owo_colors::Style;
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub info: Style,
    pub answer: Style,
    pub dim: Style,
    pub muted: Style,
}

impl Theme {
    /// Colored on a terminal unless `NO_COLOR` is set
    pub fn detect() -> Self {
        let colored = std::env::var_os("NO_COLOR").is_none() && console::Term::stdout().is_term();
        Self::new(colored)
    }

    pub fn new(colored: bool) -> Self {
        let pick = |style: Style| if colored { style } else { Style::new() };
        Self {
            header: pick(Style::new().cyan().bold()),
            success: pick(Style::new().green().bold()),
            error: pick(Style::new().red().bold()),
            info: pick(Style::new().magenta()),
            answer: pick(Style::new().white().bold()),
            dim: pick(Style::new().white().dimmed()),
            muted: pick(Style::new().bright_black()),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

#[cfg(test)]
mod tests {
    use super::*;
    use owo_colors::OwoColorize;

    #[test]
    fn test_plain_theme_adds_no_escapes() {
        let theme = Theme::new(false);
        assert_eq!("answer".style(theme.answer).to_string(), "answer");

        let theme = Theme::new(true);
        assert!("answer".style(theme.answer).to_string().contains('\u{1b}'));
    }
}
