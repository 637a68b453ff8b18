//! Small helpers shared by the binary and printers.

use owo_colors::OwoColorize;

/// Colors are used for human output unless `NO_COLOR` is set.
pub fn use_colors(json: bool) -> bool {
    !json && std::env::var_os("NO_COLOR").is_none()
}

fn prefix(label: &str, paint: fn(&str) -> String) -> String {
    if use_colors(false) {
        paint(label)
    } else {
        label.to_string()
    }
}

pub fn error_prefix() -> String {
    prefix("error:", |s| s.red().bold().to_string())
}

pub fn note_prefix() -> String {
    prefix("note:", |s| s.yellow().bold().to_string())
}
