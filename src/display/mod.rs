//! Display formatting for terminal output
//!
//! Small helpers shared by the CLI handlers and the Markdown report.

use crate::models::FileCategory;

/// Format a byte count with a binary unit
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Format a percentage with appropriate precision
pub fn format_percentage(pct: f64) -> String {
    if pct < 0.1 && pct > 0.0 {
        format!("{:.2}%", pct)
    } else if pct < 10.0 {
        format!("{:.1}%", pct)
    } else {
        format!("{:.0}%", pct)
    }
}

/// Create a simple bar chart representation
pub fn format_bar(value: usize, max_value: usize, width: usize) -> String {
    if max_value == 0 || value == 0 {
        return "░".repeat(width);
    }

    let filled = ((value as f64 / max_value as f64) * width as f64).round() as usize;
    let filled = filled.min(width);

    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

/// Category label with a terminal color hint
pub fn format_category_colored(category: FileCategory) -> String {
    match category {
        FileCategory::Essential => format!("\x1b[32m{}\x1b[0m", category),
        FileCategory::NonEssential => format!("\x1b[33m{}\x1b[0m", category),
        FileCategory::Uncertain => format!("\x1b[36m{}\x1b[0m", category),
    }
}

/// Shorten a path from the left so it fits in `width` characters
pub fn truncate_path(path: &str, width: usize) -> String {
    let len = path.chars().count();
    if len <= width || width < 4 {
        return path.to_string();
    }
    let tail: String = path.chars().skip(len - (width - 3)).collect();
    format!("...{}", tail)
}

/// Format a separator line
pub fn separator(width: usize) -> String {
    "─".repeat(width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KiB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.05), "0.05%");
        assert_eq!(format_percentage(5.34), "5.3%");
        assert_eq!(format_percentage(100.0), "100%");
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(5, 10, 4), "██░░");
        assert_eq!(format_bar(0, 10, 3), "░░░");
    }

    #[test]
    fn test_truncate_path() {
        assert_eq!(truncate_path("src/a.php", 20), "src/a.php");
        assert_eq!(truncate_path("src/Domain/Pet/Pet.php", 12), "...t/Pet.php");
    }
}
