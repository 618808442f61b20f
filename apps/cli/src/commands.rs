//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use tracing::info;

use docpipe_core::stages::{
    ExtractTextCitations, MarkupCitations, ParseHtml, PdfToText, SerialiseHtml,
};
use docpipe_core::{
    Pipeline, PipelineContext, Stage, parse_and_clean, split_paragraphs, strip_block_whitespace,
};
use docpipe_dom::{parse_xml, to_xml_string};
use docpipe_matchers::{CitationKind, CitationMatcher, TreeFlavor};
use docpipe_shared::{
    AppConfig, CleanupOptions, FrbrUri, PdfOptions, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docpipe: find and mark up citations in legal documents.
#[derive(Parser)]
#[command(
    name = "docpipe",
    version,
    about = "Find and mark up citations in legal documents, and clean converted HTML.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.docpipe/docpipe.toml.
    #[arg(long, global = true, env = "DOCPIPE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// How to read the input file of `cite`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum InputFormat {
    Text,
    Html,
    Xml,
    Pdf,
}

impl InputFormat {
    /// Guess from the file extension, falling back to plain text.
    fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("html" | "htm") => Self::Html,
            Some("xml") => Self::Xml,
            Some("pdf") => Self::Pdf,
            _ => Self::Text,
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Extract citations from a document, or mark them up in place.
    Cite {
        /// Citation flavor: achpr or act.
        #[arg(short, long)]
        kind: CitationKind,

        /// Identifier of the document being processed, e.g. /akn/za/act/2000/1.
        #[arg(long)]
        frbr_uri: FrbrUri,

        /// Input format. Guessed from the file extension when omitted.
        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Print the annotated document instead of the citation list
        /// (html and xml input only).
        #[arg(long)]
        markup: bool,

        /// Input file.
        file: PathBuf,
    },

    /// Parse, clean and split the paragraphs of an HTML file.
    Clean {
        /// Input HTML file.
        file: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file.
    Init,
    /// Print the resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing
// ---------------------------------------------------------------------------

/// Initialize the tracing subscriber. Logs go to stderr so stdout stays
/// clean for command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docpipe=warn",
        1 => "docpipe=info",
        2 => "docpipe=debug",
        _ => "docpipe=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Cite {
            kind,
            frbr_uri,
            input_format,
            markup,
            file,
        } => {
            let config = resolve_config(cli.config.as_deref())?;
            let format = input_format.unwrap_or_else(|| InputFormat::from_path(&file));
            cmd_cite(&config, kind, frbr_uri, format, markup, &file)
        }
        Command::Clean { file } => {
            let config = resolve_config(cli.config.as_deref())?;
            cmd_clean(&config, &file)
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(cli.config.as_deref()),
        },
    }
}

fn resolve_config(path: Option<&Path>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn read_input(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).wrap_err_with(|| format!("failed to read {}", path.display()))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_cite(
    config: &AppConfig,
    kind: CitationKind,
    frbr_uri: FrbrUri,
    format: InputFormat,
    markup: bool,
    file: &Path,
) -> Result<()> {
    info!(%kind, %frbr_uri, ?format, file = %file.display(), "citing");

    if markup && matches!(format, InputFormat::Text | InputFormat::Pdf) {
        bail!("--markup needs html or xml input");
    }

    let extract = || ExtractTextCitations {
        kind,
        config: config.citations.clone(),
    };

    let mut context = PipelineContext::default().with_frbr_uri(frbr_uri);
    let stages: Vec<Box<dyn Stage>> = match format {
        InputFormat::Text => {
            context.text = Some(read_input(file)?);
            vec![Box::new(extract())]
        }
        InputFormat::Pdf => {
            context.pdf_file = Some(file.to_path_buf());
            vec![
                Box::new(PdfToText {
                    cropbox: None,
                    options: PdfOptions::from(config),
                }),
                Box::new(extract()),
            ]
        }
        InputFormat::Html => {
            context.html_text = Some(read_input(file)?);
            vec![
                Box::new(ParseHtml),
                Box::new(MarkupCitations {
                    kind,
                    flavor: TreeFlavor::Html,
                    config: config.citations.clone(),
                }),
                Box::new(SerialiseHtml),
            ]
        }
        InputFormat::Xml => return cite_xml(config, kind, &context, markup, file),
    };

    Pipeline::new("cite", stages).run(&mut context)?;

    if markup {
        let html = context
            .html_text
            .ok_or_else(|| eyre!("pipeline produced no markup"))?;
        println!("{html}");
    } else {
        println!("{}", serde_json::to_string_pretty(&context.citations)?);
    }
    Ok(())
}

/// XML has no parse or serialise stage, so the matcher is driven directly.
fn cite_xml(
    config: &AppConfig,
    kind: CitationKind,
    context: &PipelineContext,
    markup: bool,
    file: &Path,
) -> Result<()> {
    let frbr_uri = context
        .frbr_uri
        .as_ref()
        .ok_or_else(|| eyre!("no document identity"))?;
    let mut doc = parse_xml(&read_input(file)?)?;
    let mut matcher = CitationMatcher::with_config(kind, &config.citations);
    let citations = matcher.markup_xml_matches(frbr_uri, &mut doc)?;

    if markup {
        println!("{}", to_xml_string(&doc, doc.root()));
    } else {
        println!("{}", serde_json::to_string_pretty(citations)?);
    }
    Ok(())
}

fn cmd_clean(config: &AppConfig, file: &Path) -> Result<()> {
    let options = CleanupOptions::from(config);
    let mut context = PipelineContext::from_html_text(read_input(file)?);

    parse_and_clean(&options).run(&mut context)?;
    split_paragraphs(&options).run(&mut context)?;
    strip_block_whitespace(&options).run(&mut context)?;
    SerialiseHtml.run(&mut context)?;

    let html = context
        .html_text
        .ok_or_else(|| eyre!("pipeline produced no markup"))?;
    println!("{html}");
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = resolve_config(path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
