//! zepctl CLI - Zeppelin notebook to Markdown conversion
//!
//! This is the main entry point for the zepctl command-line tool, which provides:
//! - Single notebook conversion (`convert`), Markdown to a file or stdout
//! - Bulk conversion of a Zeppelin notebook directory (`batch`)
//! - Schema detection for a notebook export (`detect`)

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::info;
use zepctl_core::pipeline::{convert_batch, convert_file, BatchOptions, FileOptions};
use zepctl_core::{load_notebook, SchemaSelector, ZepConfig};

mod tracing_setup;
mod ui;

/// Output directory used by `batch` when neither `--out` nor the config names one
const DEFAULT_BATCH_OUT: &str = "zepctl-out";

#[derive(Parser, Debug)]
#[command(
    name = "zepctl",
    author,
    version,
    about = "Convert Apache Zeppelin notebooks to Markdown",
    long_about = "Convert Zeppelin note.json exports (0.6 legacy and 0.7 layouts) to Markdown, \
                  extracting embedded charts as PNG images."
)]
struct Cli {
    /// Suppress progress bars (for script consumption)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Path to the TOML configuration file (default: ~/.zepctl/config.toml)
    #[arg(long, value_name = "PATH", global = true, env = "ZEPCTL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a single notebook to Markdown
    Convert(ConvertArgs),
    /// Convert every note.json found under a directory
    Batch(BatchArgs),
    /// Print the schema (legacy or new) of a notebook
    Detect(DetectArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// Input notebook JSON file
    #[arg(long = "in", short = 'i', value_name = "PATH")]
    input: PathBuf,

    /// Output Markdown file (default: stdout)
    #[arg(long = "out", short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,

    /// Directory for extracted images (default: directory of --out, else working directory)
    #[arg(long = "dir", short = 'd', value_name = "DIR")]
    directory: Option<PathBuf>,

    /// Notebook schema
    #[arg(long, value_enum)]
    schema: Option<SchemaArg>,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Zeppelin notebook directory to scan for note.json files
    #[arg(long = "in", short = 'i', value_name = "DIR")]
    input: PathBuf,

    /// Output directory (one sub-directory per notebook)
    #[arg(long = "out", short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// Notebook schema
    #[arg(long, value_enum)]
    schema: Option<SchemaArg>,

    /// Disable the progress bar
    #[arg(long = "no-progress", action = ArgAction::SetTrue)]
    no_progress: bool,
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// Input notebook JSON file
    #[arg(long = "in", short = 'i', value_name = "PATH")]
    input: PathBuf,
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SchemaArg {
    /// Detect from the notebook contents
    Auto,
    /// Zeppelin 0.6 (`result` block, SVG charts)
    Legacy,
    /// Zeppelin 0.7 (`results` block, base64 PNG charts)
    New,
}

impl From<SchemaArg> for SchemaSelector {
    fn from(value: SchemaArg) -> Self {
        match value {
            SchemaArg::Auto => SchemaSelector::Auto,
            SchemaArg::Legacy => SchemaSelector::Legacy,
            SchemaArg::New => SchemaSelector::New,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_setup::init(&tracing_setup::TracingConfig { debug: cli.debug }).ok();
    ui::init_quiet_mode(cli.quiet);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Convert(args) => run_convert(args, &config)?,
        Commands::Batch(args) => run_batch(args, &config)?,
        Commands::Detect(args) => run_detect(args)?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<ZepConfig> {
    match &cli.config {
        Some(path) => ZepConfig::load_from(path)
            .with_context(|| format!("failed to load configuration {:?}", path)),
        None => ZepConfig::load().context("failed to load configuration"),
    }
}

fn schema_or_config(arg: Option<SchemaArg>, config: &ZepConfig) -> SchemaSelector {
    arg.map(SchemaSelector::from)
        .unwrap_or(config.convert.schema)
}

fn run_convert(args: ConvertArgs, config: &ZepConfig) -> Result<()> {
    let opts = FileOptions {
        schema: schema_or_config(args.schema, config),
        images_dir: args.directory,
    };

    info!("converting {:?} -> {:?}", args.input, args.output);

    convert_file(&args.input, args.output.as_deref(), &opts, config)
        .context("failed to convert notebook")?;
    Ok(())
}

fn run_batch(args: BatchArgs, config: &ZepConfig) -> Result<()> {
    let output_dir = args
        .output
        .or_else(|| config.output.dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_BATCH_OUT));

    let opts = BatchOptions {
        output_dir: output_dir.clone(),
        schema: schema_or_config(args.schema, config),
        show_progress: !args.no_progress && !ui::is_quiet(),
    };

    info!("batch converting {:?} -> {:?}", args.input, output_dir);

    let report =
        convert_batch(&args.input, &opts, config).context("failed to run batch conversion")?;

    for entry in &report.converted {
        println!(
            "{} -> {} ({} schema, {} image(s))",
            entry.input.display(),
            entry.markdown.display(),
            entry.summary.schema,
            entry.summary.images
        );
    }
    for (path, reason) in &report.failed {
        eprintln!("failed: {}: {}", path.display(), reason);
    }

    if !report.is_success() {
        bail!(
            "{} of {} notebook(s) failed to convert",
            report.failed.len(),
            report.failed.len() + report.converted.len()
        );
    }
    Ok(())
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let notebook = load_notebook(&args.input)
        .with_context(|| format!("failed to load notebook {:?}", args.input))?;
    println!("{}", SchemaSelector::Auto.resolve(&notebook));
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
