//! Plain-text extraction from PDF files with `pdftotext` (Poppler).
//!
//! The tool writes UTF-8 text to stdout with a form feed between pages,
//! which is what paged citation extraction expects.

use std::path::Path;
use std::process::Command;

use tracing::{info, instrument, warn};

use docpipe_shared::{DocpipeError, PdfOptions, Result};

/// Region of each page to extract, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropBox {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropBox {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// `-x -y -W -H` arguments, with values truncated to whole points.
    fn args(&self) -> Vec<String> {
        let values = [self.left, self.top, self.width, self.height];
        ["-x", "-y", "-W", "-H"]
            .into_iter()
            .zip(values)
            .flat_map(|(flag, value)| [flag.to_string(), (value.trunc() as i64).to_string()])
            .collect()
    }
}

/// Extract the text of a PDF file.
///
/// Runs `<command> -enc UTF-8 [extra args] [cropbox] <file> -` and waits for
/// it. Failing to start the tool, a non-zero exit or non-UTF-8 output is an
/// [`DocpipeError::Extraction`]. Nothing is retried.
#[instrument(skip_all, fields(path = %path.display(), command = %options.command))]
pub fn pdf_to_text(path: &Path, cropbox: Option<CropBox>, options: &PdfOptions) -> Result<String> {
    let mut command = Command::new(&options.command);
    command.args(["-enc", "UTF-8"]).args(&options.extra_args);
    if let Some(cropbox) = cropbox {
        command.args(cropbox.args());
    }
    command.arg(path).arg("-");

    let output = command.output().map_err(|e| {
        DocpipeError::Extraction(format!(
            "failed to run `{}`: {e}. Is it installed?",
            options.command
        ))
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = %output.status, stderr = %stderr.trim(), "text extraction failed");
        return Err(DocpipeError::Extraction(format!(
            "`{}` exited with {}: {}",
            options.command,
            output.status,
            stderr.trim()
        )));
    }

    let text = String::from_utf8(output.stdout)
        .map_err(|e| DocpipeError::Extraction(format!("output is not UTF-8: {e}")))?;
    info!(chars = text.len(), "extracted text");
    Ok(text)
}
