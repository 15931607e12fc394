//! Markdown-to-block conversion for generated reports.
//!
//! The converter is deliberately small: a fixed set of line rules, flat
//! inline spans, and no HTML. Output is structured so any front end can
//! render it identically.

mod block;
mod inline;
mod parser;
mod render;

pub use block::{spans_to_plain, Block, BlockGroup, Inline};
pub use inline::parse_inline;
pub use parser::{group_blocks, parse_blocks};
pub use render::to_plain_text;
