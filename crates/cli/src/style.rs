//! Shared styling utilities for terminal output.

use console::Style;

/// Create a success-styled string (green with checkmark).
pub fn success(msg: &str) -> String {
    let style = Style::new().green();
    format!("{} {}", style.apply_to("✓"), msg)
}

/// Create an error-styled string (red with cross).
pub fn error(msg: &str) -> String {
    let style = Style::new().red();
    format!("{} {}", style.apply_to("✗"), msg)
}

/// Create a warning-styled string (yellow).
pub fn warn(msg: &str) -> String {
    let style = Style::new().yellow();
    format!("{} {}", style.apply_to("⚠"), msg)
}

/// Create a header-styled string (bold, white).
pub fn header(msg: &str) -> String {
    let style = Style::new().bold();
    style.apply_to(msg).to_string()
}

/// Create a dim-styled string.
pub fn dim(msg: &str) -> String {
    let style = Style::new().dim();
    style.apply_to(msg).to_string()
}

/// A conflict marker line (cyan).
pub fn marker(line: &str) -> String {
    let style = Style::new().cyan();
    style.apply_to(line).to_string()
}

/// A control rendered above its marker line, bold when the control asks
/// for it.
pub fn control(text: &str, bold: bool) -> String {
    let style = if bold {
        Style::new().magenta().bold()
    } else {
        Style::new().magenta()
    };
    style.apply_to(format!("[{text}]")).to_string()
}
