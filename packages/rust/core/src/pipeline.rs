//! A pipeline is a named list of stages run in order over one shared context.

use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, instrument};

use docpipe_dom::Document;
use docpipe_shared::{DocpipeError, ExtractedCitation, FrbrUri, Result};

/// Everything a stage may read or write. Stages document which fields they
/// use, and fail with [`DocpipeError::Pipeline`] when an input is missing.
#[derive(Debug, Default)]
pub struct PipelineContext {
    /// PDF file to extract text from.
    pub pdf_file: Option<PathBuf>,
    /// Plain text, usually with form-feed page breaks.
    pub text: Option<String>,
    /// Markup text, before parsing or after serialising.
    pub html_text: Option<String>,
    /// Parsed tree.
    pub html: Option<Document>,
    /// Identity of the document being processed.
    pub frbr_uri: Option<FrbrUri>,
    /// Citations found so far, in the order they were found.
    pub citations: Vec<ExtractedCitation>,
}

impl PipelineContext {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_html_text(html_text: impl Into<String>) -> Self {
        Self {
            html_text: Some(html_text.into()),
            ..Self::default()
        }
    }

    pub fn with_frbr_uri(mut self, frbr_uri: FrbrUri) -> Self {
        self.frbr_uri = Some(frbr_uri);
        self
    }
}

/// One step of a pipeline.
pub trait Stage: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Transform the context in place.
    fn run(&self, context: &mut PipelineContext) -> Result<()>;
}

/// Error for a stage whose input field is empty.
pub(crate) fn missing(stage: &dyn Stage, field: &str) -> DocpipeError {
    DocpipeError::pipeline(stage.name(), format!("context has no {field}"))
}

pub struct Pipeline {
    pub name: String,
    pub description: String,
    pub stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, stages: Vec<Box<dyn Stage>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            stages,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Run every stage in order, stopping at the first error.
    #[instrument(skip_all, fields(pipeline = %self.name))]
    pub fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let start = Instant::now();
        for stage in &self.stages {
            debug!(stage = stage.name(), "running stage");
            stage.run(context)?;
        }
        info!(
            stages = self.stages.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "pipeline complete"
        );
        Ok(())
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("stages", &stages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Append(&'static str);

    impl Stage for Append {
        fn name(&self) -> &'static str {
            "Append"
        }

        fn run(&self, context: &mut PipelineContext) -> Result<()> {
            let text = context.text.as_mut().ok_or_else(|| missing(self, "text"))?;
            text.push_str(self.0);
            Ok(())
        }
    }

    struct Clear;

    impl Stage for Clear {
        fn name(&self) -> &'static str {
            "Clear"
        }

        fn run(&self, context: &mut PipelineContext) -> Result<()> {
            context.text = None;
            Ok(())
        }
    }

    #[test]
    fn stages_run_in_order() {
        let pipeline = Pipeline::new("letters", vec![Box::new(Append("a")), Box::new(Append("b"))]);
        let mut context = PipelineContext::from_text(">");
        pipeline.run(&mut context).unwrap();
        assert_eq!(context.text.as_deref(), Some(">ab"));
    }

    #[test]
    fn first_error_stops_the_run() {
        let pipeline = Pipeline::new(
            "broken",
            vec![Box::new(Append("a")), Box::new(Clear), Box::new(Append("b"))],
        );
        let mut context = PipelineContext::from_text("");
        let err = pipeline.run(&mut context).unwrap_err();
        assert_eq!(err.to_string(), "pipeline error in stage Append: context has no text");
        assert!(context.text.is_none());
    }

    #[test]
    fn debug_lists_stage_names() {
        let pipeline = Pipeline::new("p", vec![Box::new(Clear)]).with_description("clears");
        assert_eq!(pipeline.description, "clears");
        assert!(format!("{pipeline:?}").contains("[\"Clear\"]"));
    }
}
