//! Formatted output helpers for CLI commands.
//!
//! Provides headings, aligned tables, and the post-generation summary.

use std::fmt::Write as _;

use ahab_compose::manifest::Manifest;

const RULE: char = '\u{2550}';

/// Formats a title underlined with a double rule.
#[must_use]
pub fn heading(title: &str) -> String {
    let rule: String = std::iter::repeat_n(RULE, title.chars().count()).collect();
    format!("{title}\n{rule}\n\n")
}

/// Formats rows as left-aligned columns separated by two spaces.
///
/// The last column is not padded, so lines carry no trailing whitespace.
#[must_use]
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = headers.iter().map(|h| (*h).to_string()).collect();
    for row in std::iter::once(&header).chain(rows) {
        let last = row.len().saturating_sub(1);
        let mut line = String::new();
        for (i, (cell, width)) in row.iter().zip(&widths).enumerate() {
            if i == last {
                line.push_str(cell);
            } else {
                let _ = write!(line, "{cell:<width$}  ");
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Formats a count with a naively pluralized noun (e.g., "3 services").
#[must_use]
pub fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("{count} {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// Formats the section counts of a written manifest.
#[must_use]
pub fn summary(manifest: &Manifest) -> String {
    format!(
        "Summary:\n  Services: {}\n  Networks: {}\n  Volumes: {}\n",
        manifest.services.len(),
        manifest.networks.len(),
        manifest.volumes.len()
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn heading_is_underlined_to_title_width() {
        assert_eq!(heading("Plan"), "Plan\n\u{2550}\u{2550}\u{2550}\u{2550}\n\n");
    }

    #[test]
    fn table_aligns_columns() {
        let rows = vec![
            vec!["apache".to_string(), "webserver".to_string(), "httpd".to_string()],
            vec!["php".to_string(), "application".to_string(), "php".to_string()],
        ];
        let text = table(&["MODULE", "ROLE", "IMAGE"], &rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "MODULE  ROLE         IMAGE");
        assert_eq!(lines[1], "apache  webserver    httpd");
        assert_eq!(lines[2], "php     application  php");
    }

    #[test]
    fn table_drops_trailing_whitespace_for_empty_last_cell() {
        let rows = vec![vec!["redis".to_string(), String::new()]];
        let text = table(&["MODULE", "DEPENDS ON"], &rows);
        assert_eq!(text.lines().nth(1), Some("redis"));
    }

    #[test]
    fn plural_handles_one_and_many() {
        assert_eq!(plural(1, "module"), "1 module");
        assert_eq!(plural(0, "service"), "0 services");
        assert_eq!(plural(3, "service"), "3 services");
    }

    #[test]
    fn summary_counts_sections() {
        let manifest = Manifest {
            version: "3.8".into(),
            services: BTreeMap::new(),
            networks: BTreeMap::new(),
            volumes: BTreeMap::new(),
        };
        assert_eq!(
            summary(&manifest),
            "Summary:\n  Services: 0\n  Networks: 0\n  Volumes: 0\n"
        );
    }
}
