//! Application configuration for docpipe.
//!
//! User config lives at `~/.docpipe/docpipe.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DocpipeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docpipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docpipe";

// ---------------------------------------------------------------------------
// Config structs (matching docpipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Citation extraction settings.
    #[serde(default)]
    pub citations: CitationsConfig,

    /// Tag sets used by the HTML cleanup passes.
    #[serde(default)]
    pub cleanup: CleanupConfig,

    /// External PDF text extraction.
    #[serde(default)]
    pub pdf: PdfConfig,
}

/// `[citations]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationsConfig {
    /// Characters of context kept before a plain-text match.
    #[serde(default = "default_context_length")]
    pub prefix_length: usize,

    /// Characters of context kept after a plain-text match.
    #[serde(default = "default_context_length")]
    pub suffix_length: usize,
}

impl Default for CitationsConfig {
    fn default() -> Self {
        Self {
            prefix_length: default_context_length(),
            suffix_length: default_context_length(),
        }
    }
}

fn default_context_length() -> usize {
    30
}

/// `[cleanup]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// Inline tags merged when directly adjacent.
    #[serde(default = "default_merge_tags")]
    pub merge_tags: Vec<String>,

    /// Inline tags removed when empty.
    #[serde(default = "default_unwrap_tags")]
    pub unwrap_tags: Vec<String>,

    /// Paragraph-like tags pruned when they carry no content.
    #[serde(default = "default_paragraph_tags")]
    pub paragraph_tags: Vec<String>,

    /// Tags that make an otherwise blank paragraph worth keeping.
    #[serde(default = "default_meaningful_tags")]
    pub meaningful_tags: Vec<String>,

    /// Block tags whose leading/trailing whitespace is stripped.
    #[serde(default = "default_strip_tags")]
    pub strip_tags: Vec<String>,

    /// Forced line-break marker tag.
    #[serde(default = "default_break_tag")]
    pub break_tag: String,

    /// Containers split at break markers.
    #[serde(default = "default_break_containers")]
    pub break_containers: Vec<String>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            merge_tags: default_merge_tags(),
            unwrap_tags: default_unwrap_tags(),
            paragraph_tags: default_paragraph_tags(),
            meaningful_tags: default_meaningful_tags(),
            strip_tags: default_strip_tags(),
            break_tag: default_break_tag(),
            break_containers: default_break_containers(),
        }
    }
}

fn tags(list: &str) -> Vec<String> {
    list.split_whitespace().map(String::from).collect()
}
fn default_merge_tags() -> Vec<String> {
    tags("b i sup sub")
}
fn default_unwrap_tags() -> Vec<String> {
    tags("a b i sup sub")
}
fn default_paragraph_tags() -> Vec<String> {
    tags("p")
}
fn default_meaningful_tags() -> Vec<String> {
    tags("img br table hr")
}
fn default_strip_tags() -> Vec<String> {
    tags("p h1 h2 h3 h4 h5 h6 li")
}
fn default_break_tag() -> String {
    "br".into()
}
fn default_break_containers() -> Vec<String> {
    tags("p")
}

/// `[pdf]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Text extraction executable.
    #[serde(default = "default_pdf_command")]
    pub command: String,

    /// Extra arguments passed before the input file.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            command: default_pdf_command(),
            extra_args: Vec::new(),
        }
    }
}

fn default_pdf_command() -> String {
    "pdftotext".into()
}

// ---------------------------------------------------------------------------
// Runtime options (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime tag sets for the cleanup transforms.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub merge_tags: Vec<String>,
    pub unwrap_tags: Vec<String>,
    pub paragraph_tags: Vec<String>,
    pub meaningful_tags: Vec<String>,
    pub strip_tags: Vec<String>,
    pub break_tag: String,
    pub break_containers: Vec<String>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CleanupOptions {
    fn from(config: &AppConfig) -> Self {
        let c = &config.cleanup;
        Self {
            merge_tags: c.merge_tags.clone(),
            unwrap_tags: c.unwrap_tags.clone(),
            paragraph_tags: c.paragraph_tags.clone(),
            meaningful_tags: c.meaningful_tags.clone(),
            strip_tags: c.strip_tags.clone(),
            break_tag: c.break_tag.clone(),
            break_containers: c.break_containers.clone(),
        }
    }
}

/// Runtime settings for the PDF text extraction collaborator.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Executable to run.
    pub command: String,
    /// Arguments inserted after the encoding flags.
    pub extra_args: Vec<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PdfOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            command: config.pdf.command.clone(),
            extra_args: config.pdf.extra_args.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docpipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocpipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docpipe/docpipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocpipeError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocpipeError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocpipeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocpipeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocpipeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("prefix_length"));
        assert!(toml_str.contains("pdftotext"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.citations.prefix_length, 30);
        assert_eq!(parsed.cleanup.break_tag, "br");
        assert_eq!(parsed.cleanup.merge_tags, vec!["b", "i", "sup", "sub"]);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[citations]
prefix_length = 10

[pdf]
extra_args = ["-layout"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.citations.prefix_length, 10);
        assert_eq!(config.citations.suffix_length, 30);
        assert_eq!(config.pdf.command, "pdftotext");
        assert_eq!(config.pdf.extra_args, vec!["-layout"]);
        assert_eq!(config.cleanup.paragraph_tags, vec!["p"]);
    }

    #[test]
    fn runtime_options_from_app_config() {
        let mut app = AppConfig::default();
        app.cleanup.break_containers = vec!["p".into(), "li".into()];
        app.pdf.command = "mutool".into();

        let cleanup = CleanupOptions::from(&app);
        assert_eq!(cleanup.break_containers, vec!["p", "li"]);
        assert_eq!(cleanup.unwrap_tags.len(), 5);

        let pdf = PdfOptions::from(&app);
        assert_eq!(pdf.command, "mutool");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/nonexistent/docpipe.toml")).unwrap_err();
        assert!(matches!(err, DocpipeError::Io { .. }));
    }
}
