//! HTML tree transforms: paragraph splitting, inline normalization and the
//! cosmetic cleanups applied to converted documents.

pub mod cleanup;
pub mod inline;
pub mod paragraphs;

pub use cleanup::{
    clean_tables, merge_ul, normalise_whitespace, strip_para_whitespace, strip_whitespace,
    text_to_html,
};
pub use inline::{merge_adjacent_inlines, normalize, remove_empty_inlines, remove_empty_paragraphs};
pub use paragraphs::split_at_breaks;
