//! Document processing pipelines for docpipe.
//!
//! - [`pipeline`]: the [`Stage`] trait, [`Pipeline`] runner and shared [`PipelineContext`]
//! - [`stages`]: the stock stages and the stock `parse_and_clean`, `split_paragraphs` and
//!   `strip_block_whitespace` pipelines
//! - [`pdf`]: plain-text extraction from PDF files through an external tool

pub mod pdf;
pub mod pipeline;
pub mod stages;

pub use pdf::{CropBox, pdf_to_text};
pub use pipeline::{Pipeline, PipelineContext, Stage};
pub use stages::{parse_and_clean, split_paragraphs, strip_block_whitespace};
