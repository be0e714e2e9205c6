//! Typed column formatting for tabular exports.

/// A named column that formats one field of `T`.
pub struct Column<T> {
    pub header: &'static str,
    format: fn(&T) -> String,
}

impl<T> Column<T> {
    pub fn new(header: &'static str, format: fn(&T) -> String) -> Self {
        Self { header, format }
    }

    pub fn render(&self, row: &T) -> String {
        (self.format)(row)
    }
}

/// An ordered set of columns over rows of `T`.
pub struct Table<T> {
    columns: Vec<Column<T>>,
}

impl<T> Table<T> {
    pub fn new(columns: Vec<Column<T>>) -> Self {
        Self { columns }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header).collect()
    }

    pub fn render_row(&self, row: &T) -> Vec<String> {
        self.columns.iter().map(|c| c.render(row)).collect()
    }

    /// Render rows as CSV, one line per row, every cell escaped.
    pub fn to_csv<'r, I>(&self, rows: I, include_header: bool) -> String
    where
        T: 'r,
        I: IntoIterator<Item = &'r T>,
    {
        let mut csv = String::new();

        if include_header {
            push_line(&mut csv, self.headers().into_iter().map(str::to_string));
        }
        for row in rows {
            push_line(&mut csv, self.render_row(row).into_iter());
        }

        csv
    }
}

fn push_line(csv: &mut String, cells: impl Iterator<Item = String>) {
    let line: Vec<String> = cells.map(|cell| escape_csv(&cell)).collect();
    csv.push_str(&line.join(","));
    csv.push('\n');
}

/// Quote a CSV cell when it holds a comma, quote or line break.
pub fn escape_csv(s: &str) -> String {
    if s.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub(crate) fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
