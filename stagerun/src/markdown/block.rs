//! Block and inline node types produced by the report parser.

use serde::Serialize;

/// One inline span within a block's text.
///
/// Spans are flat: formatting never nests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    /// Unformatted text.
    Text {
        /// The text.
        text: String,
    },
    /// `**bold**`
    Bold {
        /// The text.
        text: String,
    },
    /// `*italic*`
    Italic {
        /// The text.
        text: String,
    },
    /// `` `code` ``
    Code {
        /// The text.
        text: String,
    },
    /// `[text](url)`
    Link {
        /// Link text.
        text: String,
        /// Target.
        url: String,
    },
}

impl Inline {
    /// Creates a text span.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a bold span.
    #[must_use]
    pub fn bold(text: impl Into<String>) -> Self {
        Self::Bold { text: text.into() }
    }

    /// Creates an italic span.
    #[must_use]
    pub fn italic(text: impl Into<String>) -> Self {
        Self::Italic { text: text.into() }
    }

    /// Creates a code span.
    #[must_use]
    pub fn code(text: impl Into<String>) -> Self {
        Self::Code { text: text.into() }
    }

    /// Creates a link span.
    #[must_use]
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Link {
            text: text.into(),
            url: url.into(),
        }
    }

    /// The visible text of the span.
    #[must_use]
    pub fn plain(&self) -> &str {
        match self {
            Self::Text { text }
            | Self::Bold { text }
            | Self::Italic { text }
            | Self::Code { text }
            | Self::Link { text, .. } => text,
        }
    }
}

/// Concatenates the visible text of a span sequence.
#[must_use]
pub fn spans_to_plain(spans: &[Inline]) -> String {
    spans.iter().map(Inline::plain).collect()
}

/// One structural block of a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// `#`, `##` or `###` heading.
    Heading {
        /// 1 to 3.
        level: u8,
        /// Heading text.
        spans: Vec<Inline>,
    },
    /// Consecutive plain lines joined with a space.
    Paragraph {
        /// Paragraph text.
        spans: Vec<Inline>,
    },
    /// `- item` or `* item`.
    Bullet {
        /// Item text.
        spans: Vec<Inline>,
    },
    /// `1. item`; the index is kept as written.
    Numbered {
        /// Literal index digits.
        index: String,
        /// Item text.
        spans: Vec<Inline>,
    },
    /// `> quote`, one block per line.
    Blockquote {
        /// Quote text.
        spans: Vec<Inline>,
    },
    /// `---`, `***` or `___`.
    HorizontalRule,
    /// Fenced code, verbatim.
    CodeBlock {
        /// Text after the opening fence, if any.
        language: Option<String>,
        /// Content lines joined with `\n`.
        text: String,
    },
}

impl Block {
    /// The block's inline spans, if it has any.
    #[must_use]
    pub fn spans(&self) -> Option<&[Inline]> {
        match self {
            Self::Heading { spans, .. }
            | Self::Paragraph { spans }
            | Self::Bullet { spans }
            | Self::Numbered { spans, .. }
            | Self::Blockquote { spans } => Some(spans),
            Self::HorizontalRule | Self::CodeBlock { .. } => None,
        }
    }

    /// Short name of the block kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Heading { .. } => "heading",
            Self::Paragraph { .. } => "paragraph",
            Self::Bullet { .. } => "bullet",
            Self::Numbered { .. } => "numbered",
            Self::Blockquote { .. } => "blockquote",
            Self::HorizontalRule => "horizontal_rule",
            Self::CodeBlock { .. } => "code_block",
        }
    }
}

/// Blocks with consecutive list items gathered into lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockGroup<'a> {
    /// Any non-list block.
    Single(&'a Block),
    /// A run of consecutive bullets.
    UnorderedList(Vec<&'a Block>),
    /// A run of consecutive numbered items.
    OrderedList(Vec<&'a Block>),
}
