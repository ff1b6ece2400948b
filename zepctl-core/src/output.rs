//! Renderers for paragraph results.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::Result;
use crate::images::ImageStore;
use crate::markdown::{MarkdownBuffer, TableRow};
use crate::schema::NotebookSchema;
use crate::state::ConversionState;

/// Line written in place of a failed paragraph's output.
pub const ERROR_MARKER: &str = ":heavy_exclamation_mark:";

/// Rows kept from a table whose result was truncated by the interpreter.
pub const DEFAULT_TABLE_ROW_LIMIT: usize = 20;

/// Language label of the fenced block wrapping REPL output.
const REPL_LANGUAGE: &str = "python";

const REPL_BANNER: [&str; 2] = ["Output:", "-------"];

/// Render REPL text as a commented code block.
pub fn build_repl_result(buffer: &mut MarkdownBuffer, msg: &str) {
    let body = REPL_BANNER
        .iter()
        .copied()
        .chain(msg.split('\n').map(str::trim))
        .map(|line| format!("# {line}"))
        .collect::<Vec<_>>()
        .join("\n");
    buffer.push_code(REPL_LANGUAGE, Some(&body));
}

#[derive(Debug, Deserialize)]
struct TablePayload {
    data: Vec<Value>,
    #[serde(default)]
    exceeded: Option<Value>,
}

impl TablePayload {
    fn exceeded(&self) -> bool {
        self.exceeded
            .as_ref()
            .is_some_and(|flag| flag.as_i64() != Some(-1))
    }
}

/// Rows of a table payload, either the JSON `{data, exceeded}` form or plain
/// newline separated text.
pub fn table_rows(msg: &str, row_limit: usize) -> Vec<TableRow> {
    match serde_json::from_str::<TablePayload>(msg) {
        Ok(payload) => {
            let take = if payload.exceeded() {
                row_limit
            } else {
                payload.data.len()
            };
            payload
                .data
                .iter()
                .take(take)
                .map(TableRow::from_value)
                .collect()
        }
        Err(_) => msg.split('\n').map(TableRow::from).collect(),
    }
}

/// Render a table result; the first row is the header.
pub fn build_table(buffer: &mut MarkdownBuffer, msg: &str, row_limit: usize) {
    let rows = table_rows(msg, row_limit);
    let Some((header, body)) = rows.split_first() else {
        return;
    };

    buffer.push_row(header, true);
    for row in body {
        buffer.push_row(row, false);
    }
}

/// Extract, decode and store the image embedded in an HTML result.
///
/// Messages without an image are ignored.
pub fn build_image<S: NotebookSchema>(
    state: &mut ConversionState,
    schema: &S,
    images: &ImageStore,
    msg: &str,
) -> Result<()> {
    let Some(found) = schema.find_image(msg) else {
        debug!(schema = S::KIND.as_str(), "no image in html result");
        return Ok(());
    };

    let index = state.next_image_index();
    let png = schema.decode_image(found)?;
    images.write(index, &png)?;
    state.buffer.push(images.markdown_link(index));
    Ok(())
}
