pub mod banner;
pub mod tui;

/// Prints the welcome banner and applies the theme for all subsequent inquire prompts.
/// Call once at startup, after tracing init.
pub fn init_ui(live: bool) {
    banner::print_welcome(live);
    tui::apply_theme();
}
