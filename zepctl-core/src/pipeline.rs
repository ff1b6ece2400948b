use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::config::ZepConfig;
use crate::convert::{convert_notebook, ConversionSummary};
use crate::error::ConvertError;
use crate::images::{relative_to, IMAGES_DIR};
use crate::schema::SchemaSelector;

/// File name Zeppelin gives every notebook inside its notebook directory.
pub const NOTEBOOK_FILE_NAME: &str = "note.json";

/// Read and parse a notebook export.
pub fn load_notebook(path: impl AsRef<Path>) -> crate::error::Result<Value> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    parse_notebook(&data, path)
}

/// Parse notebook JSON, checking it has a paragraph list.
pub fn parse_notebook(data: &str, source: &Path) -> crate::error::Result<Value> {
    let value: Value = serde_json::from_str(data)
        .map_err(|err| ConvertError::json(source.display().to_string(), err))?;

    if !value.get("paragraphs").is_some_and(Value::is_array) {
        return Err(ConvertError::invalid_format(
            source,
            "expected an object with a 'paragraphs' list",
        ));
    }
    Ok(value)
}

#[derive(Debug, Clone)]
pub struct FileOptions {
    pub schema: SchemaSelector,
    /// Directory receiving `images/`; defaults to the Markdown file's directory.
    pub images_dir: Option<PathBuf>,
}

/// Convert a single notebook file. Markdown goes to `output`, or to stdout
/// when `None`.
///
/// The notebook is rendered in memory first, so a failed conversion leaves
/// no Markdown file behind.
#[instrument(skip_all, fields(input = %input.as_ref().display()))]
pub fn convert_file(
    input: impl AsRef<Path>,
    output: Option<&Path>,
    opts: &FileOptions,
    config: &ZepConfig,
) -> Result<ConversionSummary> {
    let input = input.as_ref();
    let notebook =
        load_notebook(input).with_context(|| format!("failed to load notebook {:?}", input))?;
    let kind = opts.schema.resolve(&notebook);

    let markdown_dir = output.map(|path| {
        path.parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
    });
    let images_dir = opts
        .images_dir
        .clone()
        .or_else(|| markdown_dir.map(Path::to_path_buf));

    let mut options = config.convert_options(images_dir);
    options.image_link_dir = match (markdown_dir, &opts.images_dir) {
        (Some(markdown_dir), Some(dir)) => Some(relative_to(markdown_dir, &dir.join(IMAGES_DIR))),
        (None, Some(dir)) => Some(dir.join(IMAGES_DIR)),
        (_, None) => None,
    };

    let mut rendered = Vec::new();
    let summary = convert_notebook(kind, &notebook, options, &mut rendered)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {:?}", parent))?;
            }
            fs::write(path, &rendered).with_context(|| format!("failed to write {:?}", path))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&rendered)?;
            stdout.flush()?;
        }
    }

    info!(
        schema = %summary.schema,
        paragraphs = summary.paragraphs,
        images = summary.images,
        "converted {:?}",
        summary.title
    );
    Ok(summary)
}

/// Find every `note.json` under `root`, sorted by path.
pub fn discover_notebooks(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    if !root.exists() {
        return Err(ConvertError::invalid_format(root, "input directory does not exist").into());
    }

    let mut found = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to walk {:?}", root))?;
        if entry.file_type().is_file() && entry.file_name() == NOTEBOOK_FILE_NAME {
            found.push(entry.into_path());
        }
    }
    found.sort();
    Ok(found)
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    pub schema: SchemaSelector,
    pub show_progress: bool,
}

#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub input: PathBuf,
    pub markdown: PathBuf,
    pub summary: ConversionSummary,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<BatchEntry>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Convert every notebook under `input_dir` in parallel.
///
/// Each notebook gets its own converter and its own directory
/// `<output_dir>/<notebook dir name>/`, so no image numbering is shared.
/// A failing notebook does not stop the others; failures are collected in
/// the report.
#[instrument(skip_all)]
pub fn convert_batch(
    input_dir: impl AsRef<Path>,
    opts: &BatchOptions,
    config: &ZepConfig,
) -> Result<BatchReport> {
    let input_dir = input_dir.as_ref();
    let notebooks = discover_notebooks(input_dir)?;
    info!("found {} notebook(s) under {:?}", notebooks.len(), input_dir);

    fs::create_dir_all(&opts.output_dir)
        .with_context(|| format!("failed to create directory {:?}", opts.output_dir))?;

    let progress_bar = maybe_bounded_pb(opts.show_progress, notebooks.len());

    // Limit parallelism to avoid overwhelming the filesystem
    let threads = num_cpus::get().min(8);
    let results: Vec<(PathBuf, Result<BatchEntry>)> = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build thread pool")?
        .install(|| {
            notebooks
                .par_iter()
                .map(|path| {
                    let result = convert_batch_entry(path, input_dir, opts, config);
                    if let Some(pb) = progress_bar.as_ref() {
                        pb.inc(1);
                    }
                    (path.clone(), result)
                })
                .collect()
        });

    let mut report = BatchReport::default();
    for (path, result) in results {
        match result {
            Ok(entry) => report.converted.push(entry),
            Err(err) => {
                warn!("failed to convert {:?}: {:#}", path, err);
                report.failed.push((path, format!("{err:#}")));
            }
        }
    }

    let summary = format!(
        "Batch complete: {} converted, {} failed, written under {:?}",
        report.converted.len(),
        report.failed.len(),
        opts.output_dir
    );
    if let Some(pb) = progress_bar {
        pb.finish_with_message(summary.clone());
    }
    info!(target: "zepctl::batch", "{}", summary);

    Ok(report)
}

fn convert_batch_entry(
    path: &Path,
    input_dir: &Path,
    opts: &BatchOptions,
    config: &ZepConfig,
) -> Result<BatchEntry> {
    let notebook =
        load_notebook(path).with_context(|| format!("failed to load notebook {:?}", path))?;
    let kind = opts.schema.resolve(&notebook);

    let note_dir = opts.output_dir.join(notebook_dir(path, input_dir));
    fs::create_dir_all(&note_dir)
        .with_context(|| format!("failed to create directory {:?}", note_dir))?;

    let title = notebook.get("name").and_then(Value::as_str).unwrap_or("");
    let markdown = note_dir.join(format!("{}.md", markdown_stem(title)));
    debug!(input = %path.display(), output = %markdown.display(), %kind, "converting notebook");

    let file =
        File::create(&markdown).with_context(|| format!("failed to create {:?}", markdown))?;
    let mut writer = BufWriter::new(file);
    let options = config.convert_options(Some(note_dir));
    let summary = convert_notebook(kind, &notebook, options, &mut writer)
        .with_context(|| format!("failed to convert {:?}", path))?;
    writer.flush()?;

    Ok(BatchEntry {
        input: path.to_path_buf(),
        markdown,
        summary,
    })
}

/// Output directory of one notebook, relative to the batch output directory.
///
/// Zeppelin keeps each notebook in a directory named after its id; the whole
/// path below `input_dir` is kept so equally named directories in different
/// folders stay apart.
fn notebook_dir(path: &Path, input_dir: &Path) -> PathBuf {
    path.parent()
        .and_then(|parent| parent.strip_prefix(input_dir).ok())
        .filter(|relative| !relative.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("notebook"))
}

fn markdown_stem(title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        "notebook".to_string()
    } else {
        slug
    }
}

/// Convert string to filesystem-safe slug
pub fn slugify(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '-',
        })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .take(100) // Limit length
        .collect()
}

fn new_bounded_pb(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len.max(1) as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} {elapsed_precise} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏ "),
    );
    pb.set_length(len as u64);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn maybe_bounded_pb(show_progress: bool, len: usize) -> Option<ProgressBar> {
    if !show_progress {
        return None;
    }
    let pb = new_bounded_pb(len);
    if pb.is_hidden() {
        None
    } else {
        Some(pb)
    }
}
