//! The two notebook layouts handled by the converter.
//!
//! Zeppelin 0.6 stores a single `result` block per paragraph and renders
//! charts as inline SVG. Zeppelin 0.7 moved to a `results` block holding a
//! list of messages, with charts embedded as base64 PNG data URIs.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::images::{decode_base64_png, render_svg_png};
use crate::input::mode_name;

const STATUS_SUCCESS: &str = "SUCCESS";
const STATUS_ERROR: &str = "ERROR";

/// Output types that have a renderer. Anything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Html,
    Text,
    Table,
}

impl OutputType {
    pub fn from_export_value(value: &str) -> Option<Self> {
        match value {
            "HTML" => Some(OutputType::Html),
            "TEXT" => Some(OutputType::Text),
            "TABLE" => Some(OutputType::Table),
            _ => None,
        }
    }
}

/// What the result block of a paragraph asks the converter to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultRoute<'p> {
    Render { kind: OutputType, payload: &'p str },
    Error,
    Skip,
}

/// Schema-specific parts of a conversion.
pub trait NotebookSchema {
    const KIND: SchemaKind;

    /// Paragraph key holding the result block.
    const RESULT_KEY: &'static str;

    fn route<'p>(&self, paragraph: &'p Value) -> ResultRoute<'p>;

    /// Locate the encoded image inside an HTML result message.
    fn find_image<'m>(&self, msg: &'m str) -> Option<&'m str>;

    /// Turn a located image into PNG bytes.
    fn decode_image(&self, found: &str) -> Result<Vec<u8>>;
}

/// Zeppelin 0.6.x notebooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySchema;

/// Zeppelin 0.7.x notebooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewSchema;

static SVG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<svg.*</svg>").unwrap());

static BASE64_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"base64,(.*?)""#).unwrap());

const EMPTY_SVG: &str = "<svg></svg>";

impl NotebookSchema for LegacySchema {
    const KIND: SchemaKind = SchemaKind::Legacy;
    const RESULT_KEY: &'static str = "result";

    fn route<'p>(&self, paragraph: &'p Value) -> ResultRoute<'p> {
        let Some(result) = paragraph.get(Self::RESULT_KEY) else {
            return ResultRoute::Skip;
        };

        match result.get("code").and_then(Value::as_str) {
            Some(STATUS_SUCCESS) => {
                let payload = match result.get("msg").and_then(Value::as_str) {
                    Some(msg) if !msg.is_empty() => msg,
                    _ => return ResultRoute::Skip,
                };
                result
                    .get("type")
                    .and_then(Value::as_str)
                    .and_then(OutputType::from_export_value)
                    .map_or(ResultRoute::Skip, |kind| ResultRoute::Render { kind, payload })
            }
            Some(STATUS_ERROR) => ResultRoute::Error,
            _ => ResultRoute::Skip,
        }
    }

    fn find_image<'m>(&self, msg: &'m str) -> Option<&'m str> {
        SVG_RE
            .find(msg)
            .map(|m| m.as_str())
            .filter(|svg| *svg != EMPTY_SVG)
    }

    fn decode_image(&self, found: &str) -> Result<Vec<u8>> {
        render_svg_png(found)
    }
}

impl NotebookSchema for NewSchema {
    const KIND: SchemaKind = SchemaKind::New;
    const RESULT_KEY: &'static str = "results";

    fn route<'p>(&self, paragraph: &'p Value) -> ResultRoute<'p> {
        let Some(results) = paragraph.get(Self::RESULT_KEY) else {
            return ResultRoute::Skip;
        };

        let code = results.get("code").and_then(Value::as_str);
        if code == Some(STATUS_ERROR) {
            return ResultRoute::Error;
        }
        if code != Some(STATUS_SUCCESS) {
            return ResultRoute::Skip;
        }

        let Some(mode) = paragraph.pointer("/config/editorMode").and_then(Value::as_str) else {
            return ResultRoute::Skip;
        };
        if matches!(mode_name(mode), "text" | "markdown") {
            return ResultRoute::Skip;
        }

        let Some(first) = results
            .get("msg")
            .and_then(Value::as_array)
            .and_then(|msgs| msgs.first())
        else {
            return ResultRoute::Skip;
        };

        let kind = first
            .get("type")
            .and_then(Value::as_str)
            .and_then(OutputType::from_export_value);
        let payload = first.get("data").and_then(Value::as_str);

        match (kind, payload) {
            (Some(kind), Some(payload)) => ResultRoute::Render { kind, payload },
            _ => ResultRoute::Skip,
        }
    }

    fn find_image<'m>(&self, msg: &'m str) -> Option<&'m str> {
        BASE64_RE
            .captures(msg)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn decode_image(&self, found: &str) -> Result<Vec<u8>> {
        decode_base64_png(found)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Legacy,
    New,
}

impl SchemaKind {
    /// Notebooks whose paragraphs carry a `results` block use the new layout.
    pub fn detect(notebook: &Value) -> SchemaKind {
        let has_results = notebook
            .get("paragraphs")
            .and_then(Value::as_array)
            .is_some_and(|paragraphs| {
                paragraphs
                    .iter()
                    .any(|p| p.get(NewSchema::RESULT_KEY).is_some())
            });

        if has_results {
            SchemaKind::New
        } else {
            SchemaKind::Legacy
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaKind::Legacy => "legacy",
            SchemaKind::New => "new",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Schema choice as configured: a fixed layout or detection per notebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaSelector {
    #[default]
    Auto,
    Legacy,
    New,
}

impl SchemaSelector {
    pub fn resolve(&self, notebook: &Value) -> SchemaKind {
        match self {
            SchemaSelector::Auto => SchemaKind::detect(notebook),
            SchemaSelector::Legacy => SchemaKind::Legacy,
            SchemaSelector::New => SchemaKind::New,
        }
    }
}

impl FromStr for SchemaSelector {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SchemaSelector::Auto),
            "legacy" => Ok(SchemaSelector::Legacy),
            "new" => Ok(SchemaSelector::New),
            other => Err(format!("unsupported schema '{other}'")),
        }
    }
}
