use console::{Alignment, measure_text_width, pad_str, style};

/// Widest any single column may grow before its cells are truncated.
pub const MAX_COLUMN_WIDTH: usize = 32;

/// Plain-text table with a bold header row.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
    empty_message: &'static str,
}

impl Table {
    pub fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
            empty_message: "No rows",
        }
    }

    pub fn empty_message(mut self, message: &'static str) -> Self {
        self.empty_message = message;
        self
    }

    /// Add a row. Missing cells render blank; extra cells are ignored.
    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                self.rows
                    .iter()
                    .filter_map(|row| row.get(i))
                    .map(|cell| measure_text_width(cell))
                    .chain(std::iter::once(measure_text_width(header)))
                    .max()
                    .unwrap_or(0)
                    .min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut out = String::new();

        let header: Vec<String> = self
            .headers
            .iter()
            .zip(&widths)
            .map(|(h, w)| style(pad_str(h, *w, Alignment::Left, Some("…"))).bold().to_string())
            .collect();
        out.push_str(header.join("  ").trim_end());
        out.push('\n');

        if self.rows.is_empty() {
            out.push_str(&style(self.empty_message).dim().to_string());
            out.push('\n');
            return out;
        }

        for row in &self.rows {
            let cells: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    pad_str(cell, *w, Alignment::Left, Some("…")).into_owned()
                })
                .collect();
            out.push_str(cells.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

/// Cell text for an optional value; `-` when missing or blank.
pub fn cell(value: Option<&str>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.replace(['\n', '\r', '\t'], " "),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(s: &str) -> String {
        console::strip_ansi_codes(s).into_owned()
    }

    #[test]
    fn test_render_aligns_columns() {
        let mut table = Table::new(vec!["Name", "Domain"]);
        table.push(vec!["Asha".into(), "a.com".into()]);
        table.push(vec!["Bo".into(), "longer.example.com".into()]);

        let out = plain(&table.render());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Name  Domain");
        assert_eq!(lines[1], "Asha  a.com");
        assert_eq!(lines[2], "Bo    longer.example.com");
    }

    #[test]
    fn test_render_truncates_wide_cells() {
        let mut table = Table::new(vec!["UA"]);
        table.push(vec!["x".repeat(100)]);
        let out = plain(&table.render());
        let row = out.lines().nth(1).unwrap();
        assert_eq!(measure_text_width(row), MAX_COLUMN_WIDTH);
        assert!(row.ends_with('…'));
    }

    #[test]
    fn test_render_empty_table_shows_message() {
        let table = Table::new(vec!["IP"]).empty_message("No visits yet");
        let out = plain(&table.render());
        assert!(out.contains("No visits yet"));
    }

    #[test]
    fn test_cell_placeholder_and_sanitizing() {
        assert_eq!(cell(None), "-");
        assert_eq!(cell(Some("  ")), "-");
        assert_eq!(cell(Some("a\nb")), "a b");
    }
}
