//! Line-oriented block parser for generated reports.

use regex::Regex;
use std::sync::LazyLock;

use super::block::{Block, BlockGroup};
use super::inline::parse_inline;

const FENCE: &str = "```";

static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-*_]{3,}$").expect("horizontal rule pattern is valid"));

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,3})\s+(.*)$").expect("heading pattern is valid"));

static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("numbered item pattern is valid"));

struct OpenFence<'a> {
    language: Option<String>,
    lines: Vec<&'a str>,
}

impl OpenFence<'_> {
    fn into_block(self) -> Block {
        Block::CodeBlock {
            language: self.language,
            text: self.lines.join("\n"),
        }
    }
}

/// Parses report markdown into an ordered list of blocks.
///
/// Never fails: unbalanced inline markers stay literal and an unterminated
/// code fence is flushed as a code block at end of input.
#[must_use]
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<&str> = Vec::new();
    let mut fence: Option<OpenFence<'_>> = None;

    for line in markdown.lines() {
        if fence.is_some() {
            if line.trim() == FENCE {
                if let Some(open) = fence.take() {
                    blocks.push(open.into_block());
                }
            } else if let Some(open) = fence.as_mut() {
                open.lines.push(line);
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            flush_paragraph(&mut paragraph, &mut blocks);
            continue;
        }

        if let Some(info) = trimmed.strip_prefix(FENCE) {
            flush_paragraph(&mut paragraph, &mut blocks);
            let info = info.trim();
            fence = Some(OpenFence {
                language: (!info.is_empty()).then(|| info.to_string()),
                lines: Vec::new(),
            });
            continue;
        }

        if let Some(block) = structural_block(trimmed) {
            flush_paragraph(&mut paragraph, &mut blocks);
            blocks.push(block);
            continue;
        }

        paragraph.push(trimmed);
    }

    flush_paragraph(&mut paragraph, &mut blocks);
    if let Some(open) = fence {
        blocks.push(open.into_block());
    }
    blocks
}

/// Matches a trimmed, non-blank line against the single-line block rules.
fn structural_block(line: &str) -> Option<Block> {
    if HORIZONTAL_RULE.is_match(line) {
        return Some(Block::HorizontalRule);
    }

    if let Some(caps) = HEADING.captures(line) {
        let level = u8::try_from(caps[1].len()).unwrap_or(3);
        return Some(Block::Heading {
            level,
            spans: parse_inline(&caps[2]),
        });
    }

    if let Some(quote) = line.strip_prefix("> ") {
        return Some(Block::Blockquote {
            spans: parse_inline(quote.trim_start()),
        });
    }

    if let Some(item) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(Block::Bullet {
            spans: parse_inline(item.trim_start()),
        });
    }

    NUMBERED.captures(line).map(|caps| Block::Numbered {
        index: caps[1].to_string(),
        spans: parse_inline(&caps[2]),
    })
}

fn flush_paragraph(lines: &mut Vec<&str>, blocks: &mut Vec<Block>) {
    if lines.is_empty() {
        return;
    }
    let text = lines.join(" ");
    lines.clear();
    blocks.push(Block::Paragraph {
        spans: parse_inline(&text),
    });
}

/// Gathers consecutive bullets and consecutive numbered items into lists.
///
/// A bullet directly followed by a numbered item starts a new list, as does
/// any other block in between.
#[must_use]
pub fn group_blocks(blocks: &[Block]) -> Vec<BlockGroup<'_>> {
    let mut groups: Vec<BlockGroup<'_>> = Vec::new();

    for block in blocks {
        match (block, groups.last_mut()) {
            (Block::Bullet { .. }, Some(BlockGroup::UnorderedList(items)))
            | (Block::Numbered { .. }, Some(BlockGroup::OrderedList(items))) => items.push(block),
            (Block::Bullet { .. }, _) => groups.push(BlockGroup::UnorderedList(vec![block])),
            (Block::Numbered { .. }, _) => groups.push(BlockGroup::OrderedList(vec![block])),
            _ => groups.push(BlockGroup::Single(block)),
        }
    }

    groups
}
