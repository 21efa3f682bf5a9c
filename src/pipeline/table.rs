//! Table accumulation for the HTML→Markdown converter.
//!
//! Cells are collected while the tokenizer walks `<table>`; Markdown can only
//! be written once the whole table is known, because the column count is
//! the widest row and the divider depends on the header row.

use crate::error::ConvertError;

/// Column alignment declared on a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

impl Alignment {
    /// Parse an `align` attribute value.
    pub fn from_attr(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Alignment::Left),
            "right" => Some(Alignment::Right),
            "center" => Some(Alignment::Center),
            _ => None,
        }
    }

    /// Look for a `text-align` declaration in a `style` attribute.
    pub fn from_style(style: &str) -> Option<Self> {
        let style = style.to_ascii_lowercase();
        let decl = style
            .split(';')
            .find_map(|d| d.split_once(':').filter(|(k, _)| k.trim() == "text-align"))?;
        Self::from_attr(decl.1)
    }

    fn divider(align: Option<Self>) -> &'static str {
        match align {
            Some(Alignment::Left) => ":---",
            Some(Alignment::Right) => "---:",
            Some(Alignment::Center) => ":---:",
            None => "---",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableCell {
    pub text: String,
    pub align: Option<Alignment>,
}

#[derive(Debug, Clone, Default)]
pub struct TableRow {
    pub is_header: bool,
    pub cells: Vec<TableCell>,
}

/// Rows of one `<table>`, in document order.
#[derive(Debug, Default)]
pub struct TableAccumulator {
    rows: Vec<TableRow>,
    row: Option<TableRow>,
    cell: Option<TableCell>,
}

impl TableAccumulator {
    pub fn start_row(&mut self) {
        self.finish_row();
        self.row = Some(TableRow::default());
    }

    pub fn finish_row(&mut self) {
        self.finish_cell();
        if let Some(row) = self.row.take() {
            self.rows.push(row);
        }
    }

    /// Open a cell. A cell outside any row is a structural error.
    pub fn start_cell(&mut self, header: bool, align: Option<Alignment>) -> Result<(), ConvertError> {
        self.finish_cell();
        let row = self.row.as_mut().ok_or_else(|| {
            ConvertError::Parse("table cell opened outside of a table row".into())
        })?;
        if header {
            row.is_header = true;
        }
        self.cell = Some(TableCell {
            text: String::new(),
            align,
        });
        Ok(())
    }

    pub fn finish_cell(&mut self) {
        if let Some(mut cell) = self.cell.take() {
            cell.text = cell.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if let Some(row) = self.row.as_mut() {
                row.cells.push(cell);
            }
        }
    }

    /// The open cell, if any. All emission is routed here while it exists.
    pub fn cell_mut(&mut self) -> Option<&mut TableCell> {
        self.cell.as_mut()
    }

    pub fn cell(&self) -> Option<&TableCell> {
        self.cell.as_ref()
    }

    pub fn in_cell(&self) -> bool {
        self.cell.is_some()
    }

    /// Render the collected rows as a Markdown table.
    ///
    /// Returns `None` for a table without rows.
    pub fn render(mut self) -> Option<String> {
        self.finish_row();
        if self.rows.is_empty() {
            return None;
        }

        let header_idx = self.rows.iter().position(|r| r.is_header).unwrap_or(0);
        let header = self.rows.remove(header_idx);
        let body = self.rows;

        let cols = body
            .iter()
            .map(|r| r.cells.len())
            .chain(std::iter::once(header.cells.len()))
            .max()
            .unwrap_or(0)
            .max(1);

        let mut lines = Vec::with_capacity(body.len() + 2);
        lines.push(render_row(&header.cells, cols, |c| c.text.as_str()));
        lines.push(render_row(&header.cells, cols, |c| Alignment::divider(c.align)));
        for row in &body {
            lines.push(render_row(&row.cells, cols, |c| c.text.as_str()));
        }
        Some(lines.join("\n"))
    }
}

fn render_row<'a>(
    cells: &'a [TableCell],
    cols: usize,
    field: impl Fn(&'a TableCell) -> &'a str,
) -> String {
    static EMPTY: TableCell = TableCell {
        text: String::new(),
        align: None,
    };
    let parts: Vec<&str> = (0..cols)
        .map(|i| field(cells.get(i).unwrap_or(&EMPTY)))
        .collect();
    format!("| {} |", parts.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_row(t: &mut TableAccumulator, header: bool, cells: &[(&str, Option<Alignment>)]) {
        t.start_row();
        for (text, align) in cells {
            t.start_cell(header, *align).unwrap();
            t.cell_mut().unwrap().text.push_str(text);
        }
        t.finish_row();
    }

    #[test]
    fn test_header_from_th_row() {
        let mut t = TableAccumulator::default();
        push_row(&mut t, true, &[("Name", None), ("Qty", Some(Alignment::Right))]);
        push_row(&mut t, false, &[("apple", None), ("3", None)]);
        assert_eq!(
            t.render().unwrap(),
            "| Name | Qty |\n| --- | ---: |\n| apple | 3 |"
        );
    }

    #[test]
    fn test_first_row_is_header_without_th() {
        let mut t = TableAccumulator::default();
        push_row(&mut t, false, &[("a", None), ("b", None)]);
        push_row(&mut t, false, &[("c", None), ("d", None)]);
        let md = t.render().unwrap();
        assert!(md.starts_with("| a | b |\n| --- | --- |"));
    }

    #[test]
    fn test_flagged_row_wins_over_first_row() {
        let mut t = TableAccumulator::default();
        push_row(&mut t, false, &[("x", None)]);
        push_row(&mut t, true, &[("H", Some(Alignment::Center))]);
        let md = t.render().unwrap();
        assert_eq!(md, "| H |\n| :---: |\n| x |");
    }

    #[test]
    fn test_short_rows_are_padded() {
        let mut t = TableAccumulator::default();
        push_row(&mut t, true, &[("A", None), ("B", None)]);
        push_row(&mut t, false, &[("1", None), ("2", None), ("3", None)]);
        push_row(&mut t, false, &[("4", None)]);
        let md = t.render().unwrap();
        for line in md.lines() {
            assert_eq!(line.matches('|').count(), 4, "line: {line}");
        }
    }

    #[test]
    fn test_cell_outside_row_is_error() {
        let mut t = TableAccumulator::default();
        assert!(t.start_cell(false, None).is_err());
    }

    #[test]
    fn test_alignment_from_style() {
        assert_eq!(
            Alignment::from_style("color: red; TEXT-ALIGN: center"),
            Some(Alignment::Center)
        );
        assert_eq!(Alignment::from_style("color: red"), None);
    }

    #[test]
    fn test_empty_table_renders_nothing() {
        assert!(TableAccumulator::default().render().is_none());
    }
}
