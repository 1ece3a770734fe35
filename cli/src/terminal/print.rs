//! Report output. Everything goes through tracing on [`PRINT_TARGET`] so
//! the formatter prints it raw and the spinner layer can stay out of its way.

use colored::*;
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::terminal::colors;

pub const TOTAL_WIDTH: usize = 64;
pub const PRINT_TARGET: &str = "fathom::print";

pub fn print(msg: &str) {
    info!(target: PRINT_TARGET, raw_msg = msg);
}

pub fn blank() {
    print("");
}

pub fn banner(quiet: u8) {
    if quiet > 0 {
        return;
    }

    let text = format!("⟦ FATHOM v{} ⟧ ", env!("CARGO_PKG_VERSION"));
    let side = "═".repeat(TOTAL_WIDTH.saturating_sub(text.width()) / 2).bright_black();
    print(&format!("{side}{}{side}", text.bright_green().bold()));
}

pub fn header(msg: &str, quiet: u8) {
    if quiet > 0 {
        return;
    }

    let title = format!("⟦ {} ⟧", msg.to_uppercase());
    let dashes = TOTAL_WIDTH.saturating_sub(title.width());
    let left = "─".repeat(dashes / 2).bright_black();
    let right = "─".repeat(dashes - dashes / 2).bright_black();
    print(&format!("{left}{}{right}", title.bright_green()));
}

/// Closes a report.
pub fn rule() {
    print(&"═".repeat(TOTAL_WIDTH).color(colors::SEPARATOR).to_string());
}

pub fn nothing_found(what: &str) {
    print(&format!("{} {}", "∅".color(colors::REJECTED), format!("no {what}").color(colors::MUTED)));
}

/// `key....: value` lines with the colons lined up.
pub fn key_values(rows: &[(&str, ColoredString)]) {
    let width = rows.iter().map(|(key, _)| key.width()).max().unwrap_or(0);
    for (key, value) in rows {
        let dots = ".".repeat(width + 1 - key.width());
        print(&format!(
            "{} {}{}{} {}",
            ">".color(colors::SEPARATOR),
            key.color(colors::PRIMARY),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}

pub fn tree_head(idx: usize, name: &str) {
    let idx = format!("[{}]", idx.to_string().color(colors::ACCENT));
    print(&format!("{} {}", idx.color(colors::SEPARATOR), name.color(colors::PRIMARY)));
}

/// One level of `├─ key: value` branches under a [`tree_head`].
pub fn tree(branches: Vec<(String, ColoredString)>) {
    let width = branches.iter().map(|(k, _)| k.width()).max().unwrap_or(0);
    let last = branches.len().saturating_sub(1);
    for (i, (key, value)) in branches.iter().enumerate() {
        let branch = if i == last { "└─" } else { "├─" };
        let dots = ".".repeat(width + 1 - key.width());
        print(&format!(
            " {} {}{}{} {}",
            branch.bright_black(),
            key.color(colors::TEXT_DEFAULT),
            dots.color(colors::SEPARATOR),
            ":".color(colors::SEPARATOR),
            value
        ));
    }
}
