pub mod config;
pub mod convert;
pub mod error;
pub mod images;
pub mod input;
pub mod markdown;
pub mod output;
pub mod pipeline;
pub mod schema;
pub mod state;

pub use config::ZepConfig;
pub use convert::{convert_notebook, ConversionSummary, ConvertOptions, Converter};
pub use error::{ConvertError, Result};
pub use markdown::{MarkdownBuffer, TableRow};
pub use pipeline::{convert_batch, convert_file, discover_notebooks, load_notebook};
pub use schema::{LegacySchema, NewSchema, NotebookSchema, SchemaKind, SchemaSelector};
pub use state::{ConversionState, Timestamp};
