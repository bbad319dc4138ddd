//! Output switches shared by the CLI and the `ui` helpers

use std::sync::OnceLock;

static QUIET: OnceLock<bool> = OnceLock::new();

/// `ASKDOC_QUIET=1` (or `true`) silences the decorative CLI output; answers
/// and errors are still printed
pub fn is_quiet() -> bool {
    *QUIET.get_or_init(|| std::env::var("ASKDOC_QUIET").is_ok_and(|v| parse_flag(&v)))
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
