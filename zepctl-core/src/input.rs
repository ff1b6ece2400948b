//! Handlers for the input side of a paragraph: title, editor config and the
//! code/markdown text itself.

use serde_json::Value;

use crate::markdown::MarkdownBuffer;
use crate::state::ConversionState;

/// Leading character of an interpreter directive such as `%pyspark`.
pub const DIRECTIVE_MARKER: char = '%';

/// Language used when neither a directive nor an editor mode names one.
pub const FALLBACK_LANGUAGE: &str = "scala";

/// Directive language whose body is written as Markdown instead of code.
pub const MARKDOWN_LANGUAGE: &str = "md";

/// Paragraph text split into its language and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParagraphInput {
    pub language: String,
    pub body: Option<String>,
}

/// Split raw paragraph text on the first whitespace run.
///
/// `%lang body` yields `lang` and the remainder (absent when nothing
/// follows the directive). Text without a leading directive is returned whole
/// (trimmed) under `default_language`.
pub fn parse_input_text(text: &str, default_language: &str) -> ParagraphInput {
    let trimmed = text.trim_start();
    let (token, rest) = match trimmed.find(char::is_whitespace) {
        Some(idx) => (&trimmed[..idx], trimmed[idx..].trim_start()),
        None => (trimmed, ""),
    };

    match token.strip_prefix(DIRECTIVE_MARKER) {
        Some(language) => ParagraphInput {
            language: normalize_language(language).to_string(),
            body: (!rest.is_empty()).then(|| rest.to_string()),
        },
        None => ParagraphInput {
            language: default_language.to_string(),
            body: Some(text.trim().to_string()),
        },
    }
}

fn normalize_language(language: &str) -> &str {
    match language {
        "pyspark" => "python",
        other => other,
    }
}

/// Classify paragraph text and append it as Markdown or as a code block.
pub fn process_input(buffer: &mut MarkdownBuffer, text: &str, default_language: &str) {
    let input = parse_input_text(text, default_language);
    if input.language == MARKDOWN_LANGUAGE {
        buffer.push_markdown(input.body.as_deref());
    } else {
        buffer.push_code(&input.language, input.body.as_deref());
    }
}

pub fn process_title(buffer: &mut MarkdownBuffer, title: &str) {
    buffer.push(format!("#### {title}"));
}

/// Infer the default code language from `config.editorMode`.
pub fn process_config(state: &mut ConversionState, config: &Value) {
    let Some(mode) = config.get("editorMode").and_then(Value::as_str) else {
        return;
    };

    if let Some(language) = language_for_mode(mode) {
        state.language = Some(language.to_string());
    }
}

/// Trailing segment of an editor mode: `ace/mode/python` -> `python`.
pub fn mode_name(mode: &str) -> &str {
    mode.rsplit('/').next().unwrap_or(mode)
}

fn language_for_mode(mode: &str) -> Option<&'static str> {
    match mode_name(mode) {
        "scala" => Some("scala"),
        "python" => Some("python"),
        "sql" => Some("sql"),
        "r" => Some("r"),
        _ => None,
    }
}
