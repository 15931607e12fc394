//! Inline span scanner.
//!
//! A single left-to-right pass. At each position the marker under the cursor
//! decides which span may start there; a marker without a valid closing
//! counterpart stays literal text.

use super::block::Inline;

/// Splits `text` into flat inline spans.
#[must_use]
pub fn parse_inline(text: &str) -> Vec<Inline> {
    let mut spans = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];

        if rest.starts_with("**") {
            if let Some((inner, consumed)) = match_bold(rest) {
                flush(&mut literal, &mut spans);
                spans.push(Inline::bold(inner));
                pos += consumed;
            } else {
                literal.push_str("**");
                pos += 2;
            }
            continue;
        }

        let matched = match rest.as_bytes()[0] {
            b'*' if !literal.ends_with('*') => {
                match_italic(rest).map(|(inner, n)| (Inline::italic(inner), n))
            }
            b'`' => match_code(rest).map(|(inner, n)| (Inline::code(inner), n)),
            b'[' => match_link(rest).map(|(label, url, n)| (Inline::link(label, url), n)),
            _ => None,
        };

        if let Some((span, consumed)) = matched {
            flush(&mut literal, &mut spans);
            spans.push(span);
            pos += consumed;
            continue;
        }

        let Some(ch) = rest.chars().next() else { break };
        literal.push(ch);
        pos += ch.len_utf8();
    }

    flush(&mut literal, &mut spans);
    spans
}

fn flush(literal: &mut String, spans: &mut Vec<Inline>) {
    if !literal.is_empty() {
        spans.push(Inline::text(std::mem::take(literal)));
    }
}

/// Byte length of the first char of `s`.
fn first_char_len(s: &str) -> Option<usize> {
    s.chars().next().map(char::len_utf8)
}

/// `**x**` with at least one inner char, shortest match.
fn match_bold(rest: &str) -> Option<(&str, usize)> {
    let start = 2 + first_char_len(&rest[2..])?;
    let close = start + rest[start..].find("**")?;
    Some((&rest[2..close], close + 2))
}

/// `*x*` where neither star touches another star.
fn match_italic(rest: &str) -> Option<(&str, usize)> {
    let bytes = rest.as_bytes();
    if bytes.get(1) == Some(&b'*') {
        return None;
    }
    let start = 1 + first_char_len(&rest[1..])?;
    let close = rest[start..]
        .match_indices('*')
        .map(|(i, _)| start + i)
        .find(|&i| bytes[i - 1] != b'*' && bytes.get(i + 1) != Some(&b'*'))?;
    Some((&rest[1..close], close + 1))
}

/// `` `x` `` with at least one inner char.
fn match_code(rest: &str) -> Option<(&str, usize)> {
    let start = 1 + first_char_len(&rest[1..])?;
    let close = start + rest[start..].find('`')?;
    Some((&rest[1..close], close + 1))
}

/// `[text](url)` with non-empty text and url.
fn match_link(rest: &str) -> Option<(&str, &str, usize)> {
    let label_end = 1 + rest[1..].find(']')?;
    if label_end == 1 {
        return None;
    }
    let after = &rest[label_end + 1..];
    if !after.starts_with('(') {
        return None;
    }
    let url_start = label_end + 2;
    let url_end = url_start + rest[url_start..].find(')')?;
    if url_end == url_start {
        return None;
    }
    Some((&rest[1..label_end], &rest[url_start..url_end], url_end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plain_text() {
        assert_eq!(parse_inline("just words"), vec![Inline::text("just words")]);
        assert!(parse_inline("").is_empty());
    }

    #[test]
    fn test_all_span_kinds() {
        let spans =
            parse_inline("A **bold** and *italic* with `code` and [link](https://example.com).");
        assert_eq!(
            spans,
            vec![
                Inline::text("A "),
                Inline::bold("bold"),
                Inline::text(" and "),
                Inline::italic("italic"),
                Inline::text(" with "),
                Inline::code("code"),
                Inline::text(" and "),
                Inline::link("link", "https://example.com"),
                Inline::text("."),
            ]
        );
    }

    #[test]
    fn test_bold_is_not_split_into_italics() {
        assert_eq!(parse_inline("**x**"), vec![Inline::bold("x")]);
        assert_eq!(
            parse_inline("**a** *b*"),
            vec![Inline::bold("a"), Inline::text(" "), Inline::italic("b")]
        );
    }

    #[test]
    fn test_unmatched_markers_stay_literal() {
        assert_eq!(parse_inline("**open"), vec![Inline::text("**open")]);
        assert_eq!(parse_inline("2 * 3"), vec![Inline::text("2 * 3")]);
        assert_eq!(parse_inline("a `tick"), vec![Inline::text("a `tick")]);
        assert_eq!(parse_inline("[label] (url)"), vec![Inline::text("[label] (url)")]);
        assert_eq!(parse_inline("[](url)"), vec![Inline::text("[](url)")]);
        assert_eq!(parse_inline("****"), vec![Inline::text("****")]);
    }

    #[test]
    fn test_italic_needs_non_adjacent_stars() {
        // The closing star of `*a**` touches another star.
        assert_eq!(parse_inline("*a**"), vec![Inline::text("*a**")]);
        assert_eq!(parse_inline("*a* b"), vec![Inline::italic("a"), Inline::text(" b")]);
    }

    #[test]
    fn test_shortest_match() {
        assert_eq!(
            parse_inline("`a` `b`"),
            vec![Inline::code("a"), Inline::text(" "), Inline::code("b")]
        );
        assert_eq!(
            parse_inline("**a** x **b**"),
            vec![Inline::bold("a"), Inline::text(" x "), Inline::bold("b")]
        );
    }

    #[test]
    fn test_spans_do_not_nest() {
        assert_eq!(parse_inline("`**x**`"), vec![Inline::code("**x**")]);
        assert_eq!(
            parse_inline("[**a**](u)"),
            vec![Inline::link("**a**", "u")]
        );
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            parse_inline("é **ü** *ñ*"),
            vec![
                Inline::text("é "),
                Inline::bold("ü"),
                Inline::text(" "),
                Inline::italic("ñ"),
            ]
        );
    }
}
