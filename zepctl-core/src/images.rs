//! Decoding of embedded notebook images and writing them next to the
//! Markdown output.

use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use resvg::{tiny_skia, usvg};
use tracing::debug;

use crate::error::{ConvertError, Result};

/// Name of the directory images are written to, relative to the output dir.
pub const IMAGES_DIR: &str = "images";

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

const XML_PREAMBLE: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"no\"?>\n",
    "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\"\n",
    "  \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
);

/// Sequentially numbered PNG files under `<output_dir>/images`.
#[derive(Debug, Clone)]
pub struct ImageStore {
    images_dir: PathBuf,
    /// Directory written into Markdown links.
    link_dir: PathBuf,
}

impl ImageStore {
    /// Images go under `output_dir`, or the working directory when `None`.
    /// Links point at `images/` beside the Markdown file.
    pub fn new(output_dir: Option<&Path>) -> Self {
        let images_dir = match output_dir {
            Some(dir) => dir.join(IMAGES_DIR),
            None => PathBuf::from(IMAGES_DIR),
        };
        Self {
            images_dir,
            link_dir: PathBuf::from(IMAGES_DIR),
        }
    }

    /// Link images through `link_dir` instead of the sibling `images/`.
    pub fn with_link_dir(mut self, link_dir: impl Into<PathBuf>) -> Self {
        self.link_dir = link_dir.into();
        self
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn file_name(index: u32) -> String {
        format!("output_{index}.png")
    }

    /// Write `bytes` as `output_<index>.png`, creating the directory if needed.
    pub fn write(&self, index: u32, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.images_dir)?;
        let path = self.images_dir.join(Self::file_name(index));
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote image");
        Ok(path)
    }

    /// Markdown reference to an image.
    pub fn markdown_link(&self, index: u32) -> String {
        let dir = self.link_dir.to_string_lossy().replace('\\', "/");
        let dir = dir.trim_end_matches('/');
        format!("\n![png]({dir}/{})\n", Self::file_name(index))
    }
}

/// `target` as a path relative to `base`. Relative inputs are resolved
/// against the working directory first.
pub fn relative_to(base: &Path, target: &Path) -> PathBuf {
    let cwd = env::current_dir().unwrap_or_default();
    let base = normalize(&cwd.join(base));
    let target = normalize(&cwd.join(target));

    let common = base
        .components()
        .zip(target.components())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in base.components().skip(common) {
        relative.push("..");
    }
    for component in target.components().skip(common) {
        relative.push(component);
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// Drop `.` and fold `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Decode a base64 PNG payload.
pub fn decode_base64_png(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

/// Turn an extracted `<svg>` fragment into a standalone SVG document.
///
/// HTML-embedded charts usually omit the SVG namespace, which the XML parser
/// needs to recognize the root element.
pub fn svg_document(fragment: &str) -> String {
    let open_tag_end = fragment.find('>').unwrap_or(fragment.len());
    let fragment = if fragment[..open_tag_end].contains("xmlns=") {
        fragment.to_string()
    } else {
        fragment.replacen("<svg", &format!("<svg xmlns=\"{SVG_NAMESPACE}\""), 1)
    };
    format!("{XML_PREAMBLE}{fragment}")
}

/// Rasterize an SVG fragment to PNG bytes.
pub fn render_svg_png(fragment: &str) -> Result<Vec<u8>> {
    let document = svg_document(fragment);
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_str(&document, &options)
        .map_err(|err| ConvertError::svg_render(err.to_string()))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        ConvertError::svg_render(format!(
            "invalid canvas size {}x{}",
            size.width(),
            size.height()
        ))
    })?;
    resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|err| ConvertError::svg_render(err.to_string()))
}
