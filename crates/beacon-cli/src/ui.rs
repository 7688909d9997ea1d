//! Colored terminal status output.
//!
//! Status lines go to stderr with a glyph prefix so they are visually
//! distinct from proxied request logs and build output. Color handling
//! is delegated to `owo-colors`, which respects `NO_COLOR` and terminal
//! capabilities on its own.

use owo_colors::OwoColorize;

/// Print a success message to stderr.
pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print an info message to stderr.
pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a warning message to stderr.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message.yellow());
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message.red());
}

/// Check if running in a CI environment.
///
/// CI suppresses color, terminal clearing, browser opening, and the
/// stdin-EOF shutdown path.
pub fn is_ci() -> bool {
    std::env::var("CI").is_ok()
        || std::env::var("GITHUB_ACTIONS").is_ok()
        || std::env::var("GITLAB_CI").is_ok()
        || std::env::var("CIRCLECI").is_ok()
        || std::env::var("TRAVIS").is_ok()
}

/// Clear the terminal before the dev server takes over the screen.
///
/// Skipped in CI, where the full scrollback should be kept.
pub fn clear_terminal() {
    if is_ci() {
        return;
    }
    let _ = console::Term::stdout().clear_screen();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_messages_do_not_panic() {
        success("success message");
        info("info message");
        warning("warning message");
        error("error message");
    }

    #[test]
    fn test_is_ci_with_ci_var() {
        std::env::set_var("CI", "true");
        assert!(is_ci());
        std::env::remove_var("CI");
    }
}
