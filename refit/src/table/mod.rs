use std::fmt::Write;

/// A plain-text table with left-aligned, space-padded columns. Rows may have different lengths;
/// every column is as wide as its widest cell.
#[derive(Default, Debug, Clone)]
pub struct Table {
    rows: Vec<Vec<String>>,
    widths: Vec<usize>,
}

impl Table {
    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let row: Vec<String> = cells.into_iter().map(Into::into).collect();
        for (idx, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match self.widths.get_mut(idx) {
                Some(w) => *w = (*w).max(width),
                None => self.widths.push(width),
            }
        }
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (ridx, row) in self.rows.iter().enumerate() {
            if ridx > 0 {
                out.push('\n');
            }
            let mut line = String::new();
            for (cell, &width) in row.iter().zip(&self.widths) {
                let _ = write!(line, "{cell:<width$} ");
            }
            out.push_str(line.trim_end());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Table;

    #[test]
    fn columns_align() {
        let mut table = Table::default();
        table.row(["", "a", "b"]);
        table.row(["-> q0", "x1", "y0"]);
        table.row(["long-name", "x1", "y0"]);
        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("-> q0"));
        // every data line is padded to the same column starts
        assert_eq!(lines[1].find("x1"), lines[2].find("x1"));
    }
}
