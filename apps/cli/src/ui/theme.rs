use console::style;
use std::fmt;

/// The palette shared by every DevPath screen.
pub struct Theme;

impl Theme {
    /// Headings and tool names.
    pub fn primary(text: impl fmt::Display) -> String {
        style(text).cyan().bold().to_string()
    }

    pub fn bold(text: impl fmt::Display) -> String {
        style(text).bold().to_string()
    }

    /// Environment variable names.
    pub fn secondary(text: impl fmt::Display) -> String {
        style(text).magenta().to_string()
    }

    pub fn success(text: impl fmt::Display) -> String {
        style(text).green().bold().to_string()
    }

    pub fn warning(text: impl fmt::Display) -> String {
        style(text).yellow().bold().to_string()
    }

    pub fn error(text: impl fmt::Display) -> String {
        style(text).red().bold().to_string()
    }

    /// Paths, stamps and other metadata.
    pub fn muted(text: impl fmt::Display) -> String {
        style(text).dim().to_string()
    }
}

pub enum Icon {
    Search,
    Check,
    Gear,
    Shield,
    Package,
}

impl fmt::Display for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let icon = match self {
            Icon::Search => "🔎",
            Icon::Check => "✔",
            Icon::Gear => "⚙️ ",
            Icon::Shield => "🛡️ ",
            Icon::Package => "📦",
        };
        write!(f, "{}", icon)
    }
}
