use colored::Color;

pub const PRIMARY: Color = Color::BrightGreen;
pub const ACCENT: Color = Color::BrightYellow;
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::White;
pub const MUTED: Color = Color::BrightBlack;

pub const IP_ADDR: Color = Color::BrightCyan;
pub const MAC_ADDR: Color = Color::Yellow;
pub const NAME: Color = Color::BrightBlue;
pub const REJECTED: Color = Color::Red;
