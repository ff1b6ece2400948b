use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{ConvertError, Result};
use crate::images::ImageStore;
use crate::input::{self, FALLBACK_LANGUAGE};
use crate::markdown::header_block;
use crate::output::{self, DEFAULT_TABLE_ROW_LIMIT, ERROR_MARKER};
use crate::schema::{
    LegacySchema, NewSchema, NotebookSchema, OutputType, ResultRoute, SchemaKind,
};
use crate::state::ConversionState;

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Directory receiving `images/`. `None` means the working directory.
    pub output_dir: Option<PathBuf>,
    /// Directory written into image links. `None` links to the `images/`
    /// directory beside the Markdown.
    pub image_link_dir: Option<PathBuf>,
    /// Language for paragraphs with neither a directive nor an editor mode.
    pub default_language: String,
    pub table_row_limit: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            image_link_dir: None,
            default_language: FALLBACK_LANGUAGE.to_string(),
            table_row_limit: DEFAULT_TABLE_ROW_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversionSummary {
    pub schema: SchemaKind,
    pub title: String,
    pub paragraphs: usize,
    pub images: u32,
}

/// Converts one notebook. Create a fresh converter per notebook; the state it
/// accumulates is consumed by [`Converter::convert`].
#[derive(Debug)]
pub struct Converter<S: NotebookSchema> {
    schema: S,
    options: ConvertOptions,
    images: ImageStore,
    state: ConversionState,
}

impl<S: NotebookSchema> Converter<S> {
    pub fn new(schema: S, options: ConvertOptions) -> Self {
        let mut images = ImageStore::new(options.output_dir.as_deref());
        if let Some(link_dir) = &options.image_link_dir {
            images = images.with_link_dir(link_dir.clone());
        }
        Self {
            schema,
            options,
            images,
            state: ConversionState::default(),
        }
    }

    pub fn state(&self) -> &ConversionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ConversionState {
        &mut self.state
    }

    /// Walk the paragraphs in document order, returning how many were seen.
    pub fn build_markdown_body(&mut self, notebook: &Value) -> Result<usize> {
        let paragraphs = notebook
            .get("paragraphs")
            .and_then(Value::as_array)
            .ok_or_else(|| ConvertError::missing_field("paragraphs", "notebook"))?;

        for (idx, paragraph) in paragraphs.iter().enumerate() {
            debug!(index = idx, schema = S::KIND.as_str(), "processing paragraph");
            self.process_paragraph(paragraph)?;
        }

        Ok(paragraphs.len())
    }

    pub fn process_paragraph(&mut self, paragraph: &Value) -> Result<()> {
        if let Some(user) = paragraph.get("user").and_then(Value::as_str) {
            self.state.user = user.to_string();
        }

        if let Some(value) = paragraph.get("dateCreated") {
            self.state.process_date_created(date_text(value)?)?;
        }
        if let Some(value) = paragraph.get("dateUpdated") {
            self.state.process_date_updated(date_text(value)?)?;
        }
        if let Some(title) = paragraph.get("title").and_then(Value::as_str) {
            input::process_title(&mut self.state.buffer, title);
        }
        if let Some(config) = paragraph.get("config") {
            input::process_config(&mut self.state, config);
        }
        if let Some(text) = paragraph.get("text").and_then(Value::as_str) {
            let default_language = self
                .state
                .language
                .clone()
                .unwrap_or_else(|| self.options.default_language.clone());
            input::process_input(&mut self.state.buffer, text, &default_language);
        }

        if paragraph.get(S::RESULT_KEY).is_some() {
            self.process_results(paragraph)?;
        }

        Ok(())
    }

    /// Route the paragraph's result block to the matching renderer.
    pub fn process_results(&mut self, paragraph: &Value) -> Result<()> {
        match self.schema.route(paragraph) {
            ResultRoute::Render { kind, payload } => self.render_output(kind, payload),
            ResultRoute::Error => {
                self.state.buffer.push(ERROR_MARKER);
                Ok(())
            }
            ResultRoute::Skip => Ok(()),
        }
    }

    fn render_output(&mut self, kind: OutputType, msg: &str) -> Result<()> {
        debug!(?kind, "rendering result");
        match kind {
            OutputType::Html => {
                output::build_image(&mut self.state, &self.schema, &self.images, msg)
            }
            OutputType::Text => {
                output::build_repl_result(&mut self.state.buffer, msg);
                Ok(())
            }
            OutputType::Table => {
                output::build_table(&mut self.state.buffer, msg, self.options.table_row_limit);
                Ok(())
            }
        }
    }

    pub fn build_header(&mut self, title: &str) {
        let header = header_block(title, &self.state);
        self.state.buffer.prepend(header);
    }

    /// Render `notebook` as Markdown into `out`, writing images on the way.
    #[instrument(skip_all, fields(schema = S::KIND.as_str()))]
    pub fn convert<W: Write + ?Sized>(
        mut self,
        notebook: &Value,
        out: &mut W,
    ) -> Result<ConversionSummary> {
        let title = notebook
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ConvertError::missing_field("name", "notebook"))?;

        let paragraphs = self.build_markdown_body(notebook)?;
        self.build_header(title);
        self.state.buffer.write_to(out)?;

        Ok(ConversionSummary {
            schema: S::KIND,
            title: title.to_string(),
            paragraphs,
            images: self.state.image_index,
        })
    }
}

fn date_text(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| ConvertError::invalid_timestamp(value.to_string(), "expected a string"))
}

/// Convert with the converter matching `kind`.
pub fn convert_notebook<W: Write + ?Sized>(
    kind: SchemaKind,
    notebook: &Value,
    options: ConvertOptions,
    out: &mut W,
) -> Result<ConversionSummary> {
    match kind {
        SchemaKind::Legacy => Converter::new(LegacySchema, options).convert(notebook, out),
        SchemaKind::New => Converter::new(NewSchema, options).convert(notebook, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy() -> Converter<LegacySchema> {
        Converter::new(LegacySchema, ConvertOptions::default())
    }

    #[test]
    fn test_process_results() {
        let mut zc = legacy();
        zc.process_results(&json!({})).unwrap();
        assert!(zc.state().buffer.is_empty());

        zc.process_results(&json!({"result": {"code": "SUCCESS", "msg": ""}}))
            .unwrap();
        assert!(zc.state().buffer.is_empty());

        zc.process_results(&json!({
            "result": {
                "code": "SUCCESS",
                "msg": "one ring to bring them all",
                "type": "TEXT"
            }
        }))
        .unwrap();
        assert_eq!(
            zc.state().buffer.lines(),
            [
                "```python",
                "# Output:\n# -------\n# one ring to bring them all",
                "```"
            ]
        );
    }

    #[test]
    fn test_error_result_renders_marker() {
        let mut zc = legacy();
        zc.build_markdown_body(&json!({
            "paragraphs": [{"result": {"code": "ERROR", "msg": "stack trace", "type": "TEXT"}}]
        }))
        .unwrap();
        assert_eq!(zc.state().buffer.lines(), [ERROR_MARKER]);
    }

    #[test]
    fn test_paragraph_keys_processed_in_order() {
        let mut zc = legacy();
        zc.process_paragraph(&json!({
            "text": "%md body",
            "title": "Heading",
            "user": "gandalf",
            "config": {"editorMode": "ace/mode/python"},
            "dateCreated": "Feb 28, 2017 3:44:54 PM"
        }))
        .unwrap();

        assert_eq!(zc.state().user, "gandalf");
        assert_eq!(zc.state().language.as_deref(), Some("python"));
        assert_eq!(zc.state().buffer.lines(), ["#### Heading", "body"]);
    }

    #[test]
    fn test_editor_mode_applies_to_same_paragraph() {
        let mut zc = legacy();
        zc.process_paragraph(&json!({
            "config": {"editorMode": "ace/mode/python"},
            "text": "print(1)"
        }))
        .unwrap();
        assert_eq!(zc.state().buffer.lines(), ["```python", "print(1)", "```"]);
    }

    #[test]
    fn test_user_last_writer_wins() {
        let mut zc = legacy();
        zc.build_markdown_body(&json!({
            "paragraphs": [{"user": "frodo"}, {}, {"user": "sam"}]
        }))
        .unwrap();
        assert_eq!(zc.state().user, "sam");
        assert!(zc.state().buffer.is_empty());
    }

    #[test]
    fn test_malformed_date_is_fatal() {
        let mut zc = legacy();
        let err = zc
            .process_paragraph(&json!({"dateUpdated": "31/31/2017"}))
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidTimestamp { .. }));

        let err = zc
            .process_paragraph(&json!({"dateCreated": 1488296694}))
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_convert_writes_header_and_body() {
        let notebook = json!({
            "name": "Shire census",
            "paragraphs": [
                {
                    "user": "bilbo",
                    "dateCreated": "Feb 28, 2017 3:44:54 PM",
                    "dateUpdated": "Feb 28, 2017 4:44:54 PM",
                    "text": "%md # Hobbits"
                }
            ]
        });

        let mut out = Vec::new();
        let summary = legacy().convert(&notebook, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "---\ntitle: Shire census\nauthor(s): bilbo\ntags: \n\
             created_at: 2017-02-28 15:44:54\nupdated_at: 2017-02-28 16:44:54\n---\n# Hobbits"
        );
        assert_eq!(summary.paragraphs, 1);
        assert_eq!(summary.images, 0);
        assert_eq!(summary.schema, SchemaKind::Legacy);
    }

    #[test]
    fn test_convert_requires_name() {
        let mut out = Vec::new();
        let err = legacy()
            .convert(&json!({"paragraphs": []}), &mut out)
            .unwrap_err();
        assert!(matches!(err, ConvertError::MissingField { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_configured_default_language() {
        let options = ConvertOptions {
            default_language: "sql".to_string(),
            ..Default::default()
        };
        let mut zc = Converter::new(NewSchema, options);
        zc.process_paragraph(&json!({"text": "select 1"})).unwrap();
        assert_eq!(zc.state().buffer.lines(), ["```sql", "select 1", "```"]);
    }
}
