//! Stock stages and pipelines.
//!
//! Each stage notes the context fields it reads and writes.

use std::path::Path;

use tracing::{debug, info};

use docpipe_dom::{parse_html, to_html_string};
use docpipe_html as cleanup;
use docpipe_matchers::{CitationKind, CitationMatcher, TreeFlavor};
use docpipe_shared::{CitationsConfig, CleanupOptions, PdfOptions, Result};

use crate::pdf::{CropBox, pdf_to_text};
use crate::pipeline::{Pipeline, PipelineContext, Stage, missing};

// ---------------------------------------------------------------------------
// Markup text
// ---------------------------------------------------------------------------

/// Reads `text`, writes `html_text`.
pub struct TextToHtmlText;

impl Stage for TextToHtmlText {
    fn name(&self) -> &'static str {
        "TextToHtmlText"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let text = context.text.as_deref().ok_or_else(|| missing(self, "text"))?;
        context.html_text = Some(cleanup::text_to_html(text));
        Ok(())
    }
}

/// Reads and writes `html_text`.
pub struct NormaliseHtmlTextWhitespace;

impl Stage for NormaliseHtmlTextWhitespace {
    fn name(&self) -> &'static str {
        "NormaliseHtmlTextWhitespace"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let html_text = context
            .html_text
            .as_deref()
            .ok_or_else(|| missing(self, "html_text"))?;
        context.html_text = Some(cleanup::normalise_whitespace(html_text));
        Ok(())
    }
}

/// Reads `html_text`, writes `html`.
///
/// A fragment keeps the root it was written with: a `div` stays a `div`
/// and is not renamed to `body`. Use [`ExtractBody`] and [`BodyToDiv`] to
/// reshape the root.
pub struct ParseHtml;

impl Stage for ParseHtml {
    fn name(&self) -> &'static str {
        "ParseHtml"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let html_text = context
            .html_text
            .as_deref()
            .ok_or_else(|| missing(self, "html_text"))?;
        context.html = Some(parse_html(html_text)?);
        Ok(())
    }
}

/// Reads `html`, writes `html_text`.
pub struct SerialiseHtml;

impl Stage for SerialiseHtml {
    fn name(&self) -> &'static str {
        "SerialiseHtml"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_ref().ok_or_else(|| missing(self, "html"))?;
        context.html_text = Some(to_html_string(doc, doc.root()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tree shape
// ---------------------------------------------------------------------------

/// Makes the first `body` element the root, if there is one. Reads and
/// writes `html`.
pub struct ExtractBody;

impl Stage for ExtractBody {
    fn name(&self) -> &'static str {
        "ExtractBody"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        if let Some(&body) = doc.find_all(doc.root(), &["body"]).first() {
            doc.set_root(body);
        }
        Ok(())
    }
}

/// Renames the root to `div`. Reads and writes `html`.
pub struct BodyToDiv;

impl Stage for BodyToDiv {
    fn name(&self) -> &'static str {
        "BodyToDiv"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        let root = doc.root();
        doc.set_tag(root, "div");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Cleanups (all read and write `html`)
// ---------------------------------------------------------------------------

pub struct MergeUl;

impl Stage for MergeUl {
    fn name(&self) -> &'static str {
        "MergeUl"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::merge_ul(doc)?;
        Ok(())
    }
}

pub struct CleanTables;

impl Stage for CleanTables {
    fn name(&self) -> &'static str {
        "CleanTables"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::clean_tables(doc);
        Ok(())
    }
}

pub struct StripParaWhitespace;

impl Stage for StripParaWhitespace {
    fn name(&self) -> &'static str {
        "StripParaWhitespace"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::strip_para_whitespace(doc);
        Ok(())
    }
}

pub struct StripWhitespace {
    pub tags: Vec<String>,
}

impl Stage for StripWhitespace {
    fn name(&self) -> &'static str {
        "StripWhitespace"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::strip_whitespace(doc, &self.tags);
        Ok(())
    }
}

/// Splits containers at forced line breaks.
pub struct SplitPOnBr {
    pub break_tag: String,
    pub containers: Vec<String>,
}

impl Stage for SplitPOnBr {
    fn name(&self) -> &'static str {
        "SplitPOnBr"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::split_at_breaks(doc, &self.break_tag, &self.containers)?;
        Ok(())
    }
}

pub struct MergeAdjacentInlines {
    pub tags: Vec<String>,
}

impl Stage for MergeAdjacentInlines {
    fn name(&self) -> &'static str {
        "MergeAdjacentInlines"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        let merged = cleanup::merge_adjacent_inlines(doc, &self.tags);
        debug!(merged, "merged adjacent inlines");
        Ok(())
    }
}

pub struct RemoveEmptyInlines {
    pub tags: Vec<String>,
}

impl Stage for RemoveEmptyInlines {
    fn name(&self) -> &'static str {
        "RemoveEmptyInlines"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        let removed = cleanup::remove_empty_inlines(doc, &self.tags)?;
        debug!(removed, "removed empty inlines");
        Ok(())
    }
}

pub struct RemoveEmptyParagraphs {
    pub paragraph_tags: Vec<String>,
    pub meaningful_tags: Vec<String>,
}

impl Stage for RemoveEmptyParagraphs {
    fn name(&self) -> &'static str {
        "RemoveEmptyParagraphs"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        let removed =
            cleanup::remove_empty_paragraphs(doc, &self.paragraph_tags, &self.meaningful_tags)?;
        debug!(removed, "removed empty paragraphs");
        Ok(())
    }
}

/// Runs all the inline normalization passes until nothing changes.
pub struct NormalizeInlines {
    pub options: CleanupOptions,
}

impl Stage for NormalizeInlines {
    fn name(&self) -> &'static str {
        "NormalizeInlines"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;
        cleanup::normalize(doc, &self.options)
    }
}

// ---------------------------------------------------------------------------
// Citations
// ---------------------------------------------------------------------------

/// Marks up citations in `html`, appending what it finds to `citations`.
/// Also reads `frbr_uri`.
pub struct MarkupCitations {
    pub kind: CitationKind,
    pub flavor: TreeFlavor,
    pub config: CitationsConfig,
}

impl Stage for MarkupCitations {
    fn name(&self) -> &'static str {
        "MarkupCitations"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let frbr_uri = context
            .frbr_uri
            .as_ref()
            .ok_or_else(|| missing(self, "frbr_uri"))?;
        let doc = context.html.as_mut().ok_or_else(|| missing(self, "html"))?;

        let mut matcher = CitationMatcher::with_config(self.kind, &self.config);
        let found = matcher.markup_tree_matches(frbr_uri, doc, self.flavor)?;
        context.citations.extend_from_slice(found);
        Ok(())
    }
}

/// Finds citations in paged plain `text`, appending them to `citations`.
/// Also reads `frbr_uri`.
pub struct ExtractTextCitations {
    pub kind: CitationKind,
    pub config: CitationsConfig,
}

impl Stage for ExtractTextCitations {
    fn name(&self) -> &'static str {
        "ExtractTextCitations"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let frbr_uri = context
            .frbr_uri
            .as_ref()
            .ok_or_else(|| missing(self, "frbr_uri"))?;
        let text = context.text.as_deref().ok_or_else(|| missing(self, "text"))?;

        let mut matcher = CitationMatcher::with_config(self.kind, &self.config);
        let found = matcher.extract_text_matches(frbr_uri, text);
        context.citations.extend_from_slice(found);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PDF
// ---------------------------------------------------------------------------

/// Reads `pdf_file`, writes `text`.
pub struct PdfToText {
    pub cropbox: Option<CropBox>,
    pub options: PdfOptions,
}

impl Stage for PdfToText {
    fn name(&self) -> &'static str {
        "PdfToText"
    }

    fn run(&self, context: &mut PipelineContext) -> Result<()> {
        let path: &Path = context
            .pdf_file
            .as_deref()
            .ok_or_else(|| missing(self, "pdf_file"))?;
        context.text = Some(pdf_to_text(path, self.cropbox, &self.options)?);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stock pipelines
// ---------------------------------------------------------------------------

/// Parse markup text and do the basic cleaning.
pub fn parse_and_clean(options: &CleanupOptions) -> Pipeline {
    info!("building parse-and-clean pipeline");
    Pipeline::new(
        "Parse and clean",
        vec![
            Box::new(NormaliseHtmlTextWhitespace),
            Box::new(ParseHtml),
            Box::new(ExtractBody),
            Box::new(MergeUl),
            Box::new(CleanTables),
            Box::new(MergeAdjacentInlines {
                tags: options.merge_tags.clone(),
            }),
            Box::new(RemoveEmptyInlines {
                tags: options.unwrap_tags.clone(),
            }),
            Box::new(StripParaWhitespace),
        ],
    )
    .with_description("Parse HTML and do basic cleaning.")
}

/// Split paragraphs at line breaks and tidy what the split leaves behind.
pub fn split_paragraphs(options: &CleanupOptions) -> Pipeline {
    Pipeline::new(
        "Split paragraphs",
        vec![
            Box::new(SplitPOnBr {
                break_tag: options.break_tag.clone(),
                containers: options.break_containers.clone(),
            }),
            Box::new(NormalizeInlines {
                options: options.clone(),
            }),
        ],
    )
    .with_description("Split paragraphs on line breaks and normalize inline markup.")
}

/// Trim leading and trailing whitespace inside block elements.
pub fn strip_block_whitespace(options: &CleanupOptions) -> Pipeline {
    Pipeline::new(
        "Strip block whitespace",
        vec![Box::new(StripWhitespace {
            tags: options.strip_tags.clone(),
        })],
    )
    .with_description("Strip whitespace at the edges of paragraphs, headings and list items.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use docpipe_shared::{DocpipeError, FrbrUri};

    fn serialised(context: &PipelineContext) -> String {
        let doc = context.html.as_ref().unwrap();
        to_html_string(doc, doc.root())
    }

    #[test]
    fn text_to_tree_and_back() {
        let pipeline = Pipeline::new(
            "text",
            vec![Box::new(TextToHtmlText), Box::new(ParseHtml), Box::new(SerialiseHtml)],
        );
        let mut context = PipelineContext::from_text("one\ntwo & three");
        pipeline.run(&mut context).unwrap();
        assert_eq!(
            context.html_text.as_deref(),
            Some("<div>\n<p>one</p>\n<p>two &amp; three</p>\n</div>")
        );
    }

    #[test]
    fn missing_input_names_the_stage() {
        let mut context = PipelineContext::default();
        let err = SerialiseHtml.run(&mut context).unwrap_err();
        assert!(matches!(
            err,
            DocpipeError::Pipeline { ref stage, .. } if stage == "SerialiseHtml"
        ));
    }

    #[test]
    fn body_becomes_div_root() {
        let pipeline = Pipeline::new(
            "body",
            vec![Box::new(ParseHtml), Box::new(ExtractBody), Box::new(BodyToDiv)],
        );
        let mut context =
            PipelineContext::from_html_text("<html><head><title>t</title></head><body><p>x</p></body></html>");
        pipeline.run(&mut context).unwrap();
        assert_eq!(serialised(&context), "<div><p>x</p></div>");
    }

    #[test]
    fn stock_parse_and_clean() {
        let mut context = PipelineContext::from_html_text(
            "<html><body><ul><li>a</li></ul>\n<ul><li>b</li></ul><p>&nbsp; x <b>1</b><b>2</b><i></i></p></body></html>",
        );
        parse_and_clean(&CleanupOptions::default())
            .run(&mut context)
            .unwrap();
        assert_eq!(
            serialised(&context),
            "<body><ul><li>a</li><li>b</li></ul> <p>x <b>12</b></p></body>"
        );
    }

    #[test]
    fn stock_split_paragraphs() {
        let mut context =
            PipelineContext::from_html_text("<div><p>a <b>b<br>c</b></p><p>d<br></p></div>");
        let options = CleanupOptions::default();
        let pipeline = Pipeline::new("parse", vec![Box::new(ParseHtml)]);
        pipeline.run(&mut context).unwrap();
        split_paragraphs(&options).run(&mut context).unwrap();
        assert_eq!(
            serialised(&context),
            "<div><p>a <b>b</b></p><p><b>c</b></p><p>d</p></div>"
        );
    }

    #[test]
    fn strip_whitespace_stage_uses_its_tags() {
        let mut context = PipelineContext::from_html_text("<div><p> a </p><li> b </li></div>");
        let pipeline = Pipeline::new(
            "strip",
            vec![
                Box::new(ParseHtml),
                Box::new(StripWhitespace {
                    tags: vec!["p".into()],
                }),
            ],
        );
        pipeline.run(&mut context).unwrap();
        assert_eq!(serialised(&context), "<div><p>a</p><li> b </li></div>");
    }

    #[test]
    fn stock_strip_block_whitespace() {
        let mut context = PipelineContext::from_html_text(
            "<div><p> a </p><li> b <i>c</i> </li><h1> d </h1><span> e </span></div>",
        );
        let pipeline = Pipeline::new("parse", vec![Box::new(ParseHtml)]);
        pipeline.run(&mut context).unwrap();
        strip_block_whitespace(&CleanupOptions::default())
            .run(&mut context)
            .unwrap();
        assert_eq!(
            serialised(&context),
            "<div><p>a</p><li>b <i>c</i></li><h1>d</h1><span> e </span></div>"
        );
    }

    #[test]
    fn div_fragment_root_is_kept() {
        let mut context = PipelineContext::from_html_text("<div><p>x</p></div>");
        Pipeline::new("parse", vec![Box::new(ParseHtml)])
            .run(&mut context)
            .unwrap();
        assert_eq!(serialised(&context), "<div><p>x</p></div>");
    }

    #[test]
    fn markup_citations_stage() {
        let frbr_uri = FrbrUri::parse("/akn/za/act/2000/1").unwrap();
        let mut context =
            PipelineContext::from_html_text("<div><p>See Act 5 of 2019.</p></div>")
                .with_frbr_uri(frbr_uri);
        let pipeline = Pipeline::new(
            "cite",
            vec![
                Box::new(ParseHtml),
                Box::new(MarkupCitations {
                    kind: CitationKind::Act,
                    flavor: TreeFlavor::Html,
                    config: CitationsConfig::default(),
                }),
                Box::new(SerialiseHtml),
            ],
        );
        pipeline.run(&mut context).unwrap();
        assert_eq!(
            context.html_text.as_deref(),
            Some(r#"<div><p>See <a href="/akn/za/act/2019/5">Act 5 of 2019</a>.</p></div>"#)
        );
        assert_eq!(context.citations.len(), 1);
        assert_eq!(context.citations[0].href, "/akn/za/act/2019/5");
    }

    #[test]
    fn pdf_stage_needs_a_file() {
        let stage = PdfToText {
            cropbox: None,
            options: PdfOptions::default(),
        };
        let err = stage.run(&mut PipelineContext::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "pipeline error in stage PdfToText: context has no pdf_file"
        );
    }

    #[test]
    fn text_citations_need_a_document_identity() {
        let stage = ExtractTextCitations {
            kind: CitationKind::Act,
            config: CitationsConfig::default(),
        };
        let mut context = PipelineContext::from_text("Act 5 of 2019");
        assert!(stage.run(&mut context).is_err());

        let mut context = context.with_frbr_uri(FrbrUri::parse("/akn/za/act/2000/1").unwrap());
        stage.run(&mut context).unwrap();
        assert_eq!(context.citations[0].page, Some(0));
        assert_eq!(context.citations[0].text, "Act 5 of 2019");
    }
}
