//! Plain-text rendering for terminals.

use super::block::{Block, BlockGroup, Inline};
use super::parser::group_blocks;

const RULE_WIDTH: usize = 40;

/// Renders blocks as plain text.
///
/// Groups are separated by a blank line; list items stay on consecutive
/// lines. Inline formatting markers are dropped and links render as
/// `text <url>`.
#[must_use]
pub fn to_plain_text(blocks: &[Block]) -> String {
    let rendered: Vec<String> = group_blocks(blocks)
        .into_iter()
        .map(|group| match group {
            BlockGroup::Single(block) => render_block(block),
            BlockGroup::UnorderedList(items) | BlockGroup::OrderedList(items) => items
                .into_iter()
                .map(render_block)
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();
    rendered.join("\n\n")
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Heading { level, spans } => {
            let text = spans_text(spans);
            let width = text.chars().count();
            match level {
                1 => format!("{text}\n{}", "=".repeat(width)),
                2 => format!("{text}\n{}", "-".repeat(width)),
                _ => text,
            }
        }
        Block::Paragraph { spans } => spans_text(spans),
        Block::Bullet { spans } => format!("  - {}", spans_text(spans)),
        Block::Numbered { index, spans } => format!("  {index}. {}", spans_text(spans)),
        Block::Blockquote { spans } => format!("  | {}", spans_text(spans)),
        Block::HorizontalRule => "-".repeat(RULE_WIDTH),
        Block::CodeBlock { text, .. } => text
            .lines()
            .map(|line| format!("    {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn spans_text(spans: &[Inline]) -> String {
    spans
        .iter()
        .map(|span| match span {
            Inline::Link { text, url } => format!("{text} <{url}>"),
            other => other.plain().to_string(),
        })
        .collect()
}
