//! Markdown output buffer and the small renderers that feed it.

use std::io::{self, Write};

use serde_json::Value;

use crate::state::ConversionState;

const CODE_FENCE: &str = "```";

/// Ordered, append-only list of output lines.
///
/// A single entry may contain embedded newlines (table header + underline,
/// REPL output); flattening joins entries with `\n` and adds no trailing
/// newline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownBuffer {
    lines: Vec<String>,
}

impl MarkdownBuffer {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// Append a Markdown body verbatim. An absent body appends nothing.
    pub fn push_markdown(&mut self, body: Option<&str>) {
        if let Some(body) = body {
            self.push(body);
        }
    }

    /// Wrap a body in a fenced code block. Both fences are emitted even when
    /// the body is absent.
    pub fn push_code(&mut self, language: &str, body: Option<&str>) {
        self.push(format!("{CODE_FENCE}{language}"));
        self.push_markdown(body);
        self.push(CODE_FENCE);
    }

    /// Render one table row.
    ///
    /// Empty rows are skipped and single-field rows are written as raw lines.
    /// A header row carries its `|-|` underline in the same entry.
    pub fn push_row(&mut self, row: &TableRow, header: bool) {
        let cells = row.cells();
        match cells.as_slice() {
            [] => {}
            [single] => self.push(*single),
            _ => {
                let mut line = String::from("|");
                let mut underline = String::from("|");
                for cell in &cells {
                    line.push_str(cell);
                    line.push('|');
                    underline.push_str("-|");
                }
                if header {
                    line.push('\n');
                    line.push_str(&underline);
                }
                self.push(line);
            }
        }
    }

    /// Put `block` in front of everything accumulated so far.
    pub fn prepend(&mut self, block: Vec<String>) {
        self.lines.splice(0..0, block);
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn render(&self) -> String {
        self.lines.join("\n")
    }

    pub fn write_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(self.render().as_bytes())?;
        out.flush()
    }
}

/// A table row as found in a result payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRow {
    /// Tab-delimited line.
    Delimited(String),
    /// Already split cells.
    Cells(Vec<String>),
}

impl TableRow {
    pub fn cells(&self) -> Vec<&str> {
        match self {
            TableRow::Delimited(line) if line.is_empty() => Vec::new(),
            TableRow::Delimited(line) => line.split('\t').collect(),
            TableRow::Cells(cells) => cells.iter().map(String::as_str).collect(),
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(line) => TableRow::Delimited(line.clone()),
            Value::Array(cells) => TableRow::Cells(cells.iter().map(cell_text).collect()),
            other => TableRow::Delimited(other.to_string()),
        }
    }
}

impl From<&str> for TableRow {
    fn from(line: &str) -> Self {
        TableRow::Delimited(line.to_string())
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// YAML-ish front matter placed at the top of every converted notebook.
pub fn header_block(title: &str, state: &ConversionState) -> Vec<String> {
    vec![
        "---".to_string(),
        format!("title: {title}"),
        format!("author(s): {}", state.user),
        "tags: ".to_string(),
        format!("created_at: {}", state.date_created_label()),
        format!("updated_at: {}", state.date_updated_label()),
        "---".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_markdown_skips_absent_body() {
        let mut buffer = MarkdownBuffer::default();
        buffer.push_markdown(None);
        assert!(buffer.is_empty());
        buffer.push_markdown(Some("sample body"));
        assert_eq!(buffer.lines(), ["sample body"]);
    }

    #[test]
    fn test_push_code_always_fences() {
        let mut buffer = MarkdownBuffer::default();
        buffer.push_code("scala", None);
        assert_eq!(buffer.lines(), ["```scala", "```"]);
        buffer.push_code("scala", Some("sample body"));
        assert_eq!(
            buffer.lines(),
            ["```scala", "```", "```scala", "sample body", "```"]
        );
    }

    #[test]
    fn test_push_row_variants() {
        let cases: [(&str, &[&str]); 4] = [
            ("", &[]),
            ("test", &["test"]),
            ("test\ttest2", &["|test|test2|"]),
            ("test\t\ttest2", &["|test||test2|"]),
        ];
        for (input, expected) in cases {
            let mut buffer = MarkdownBuffer::default();
            buffer.push_row(&TableRow::from(input), false);
            assert_eq!(buffer.lines(), expected, "row {input:?}");
        }
    }

    #[test]
    fn test_push_row_header() {
        let mut buffer = MarkdownBuffer::default();
        buffer.push_row(&TableRow::from("test\ttest2"), true);
        assert_eq!(buffer.lines(), ["|test|test2|\n|-|-|"]);
    }

    #[test]
    fn test_push_row_single_field_is_repeatable() {
        let mut buffer = MarkdownBuffer::default();
        let row = TableRow::Cells(vec!["only".to_string()]);
        buffer.push_row(&row, false);
        buffer.push_row(&row, false);
        assert_eq!(buffer.lines(), ["only", "only"]);
    }

    #[test]
    fn test_row_from_json_cells() {
        let row = TableRow::from_value(&serde_json::json!(["a", 1, null, true]));
        assert_eq!(row.cells(), ["a", "1", "", "true"]);
    }

    #[test]
    fn test_header_block_defaults() {
        let mut state = ConversionState::default();
        state.user = "tester".to_string();
        assert_eq!(
            header_block("title", &state),
            [
                "---",
                "title: title",
                "author(s): tester",
                "tags: ",
                "created_at: N/A",
                "updated_at: N/A",
                "---"
            ]
        );
    }

    #[test]
    fn test_render_has_no_trailing_newline() {
        let mut buffer = MarkdownBuffer::default();
        buffer.push("a");
        buffer.push("b");
        buffer.prepend(vec!["top".to_string()]);
        assert_eq!(buffer.render(), "top\na\nb");
    }
}
