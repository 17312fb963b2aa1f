//! Tag scanner
//!
//! Splits raw template text into literal spans and recognized tags. Literal
//! text is never interpreted; a `{` that does not start a valid tag is kept
//! as text and scanning resumes right after it.

use crate::parser::ast::{Spanned, Tag};
use crate::parser::grammar::{parse_directive, parse_insert, Head};
use crate::parser::lexer::{lex, Span, Token};

/// Brace escapes, checked before anything else
const BRACE_ESCAPES: [(&str, char); 4] = [("{{}", '{'), ("{}}", '}'), ("{<}", '{'), ("{>}", '}')];

/// Result of one [`scan`] step
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned<'s> {
    /// Literal text before the tag
    pub literal: &'s str,
    /// The recognized tag; `None` when the brace turned out to be literal text
    pub tag: Option<Spanned<Tag>>,
    /// Bytes consumed from the scanned text, always at least one
    pub consumed: usize,
}

/// A piece of template source in scan order
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Tag {
        /// Tag with its span in the full source
        tag: Spanned<Tag>,
        /// 1-based line the tag starts on
        line: usize,
    },
}

/// Find the next tag in `remaining`.
///
/// Returns `None` when no `{` is left, in which case all of `remaining` is
/// literal text.
pub fn scan(remaining: &str) -> Option<Scanned<'_>> {
    let open = remaining.find('{')?;
    let before = &remaining[..open];
    let after = &remaining[open..];

    // comments also swallow the whitespace around them
    if let Some(len) = comment_len(after) {
        let literal = before.trim_end();
        let end = open + len;
        let end = end + whitespace_len(&remaining[end..]);
        return Some(Scanned {
            literal,
            tag: Some(Spanned::new(Tag::Comment, literal.len()..end)),
            consumed: end,
        });
    }

    for (pattern, ch) in BRACE_ESCAPES {
        if after.starts_with(pattern) {
            let end = open + pattern.len();
            return Some(Scanned {
                literal: before,
                tag: Some(Spanned::new(Tag::Brace(ch), open..end)),
                consumed: end,
            });
        }
    }

    let body_start = open + 1;
    let Some(delimited) = delimit(&remaining[body_start..]) else {
        return Some(literal_brace(remaining, open));
    };
    let body = &remaining[body_start..body_start + delimited.body_len];
    let Some(tag) = recognize(body, &delimited.tokens) else {
        return Some(literal_brace(remaining, open));
    };

    let end = body_start + delimited.close_end;
    let consumed = if delimited.eat_whitespace {
        end + whitespace_len(&remaining[end..])
    } else {
        end
    };
    Some(Scanned {
        literal: before,
        tag: Some(Spanned::new(tag, open..end)),
        consumed,
    })
}

/// Scan a whole template into text and tag segments.
pub fn tokenize(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut offset = 0;
    let mut line = 1;

    while let Some(scanned) = scan(&source[offset..]) {
        push_text(&mut segments, scanned.literal);
        if let Some(tag) = scanned.tag {
            let span = offset + tag.span.start..offset + tag.span.end;
            let tag_line = line + count_lines(&source[offset..span.start]);
            segments.push(Segment::Tag {
                tag: Spanned::new(tag.node, span),
                line: tag_line,
            });
        }
        line += count_lines(&source[offset..offset + scanned.consumed]);
        offset += scanned.consumed;
    }
    push_text(&mut segments, &source[offset..]);

    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(Segment::Text(existing)) => existing.push_str(text),
        _ => segments.push(Segment::Text(text.to_string())),
    }
}

fn count_lines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

fn whitespace_len(text: &str) -> usize {
    text.len() - text.trim_start().len()
}

/// Length of a `{* ... *}` comment at the start of `text`
fn comment_len(text: &str) -> Option<usize> {
    let inner = text.strip_prefix("{*")?;
    inner.find("*}").map(|end| end + 4)
}

/// The brace at `open` is plain text
fn literal_brace(remaining: &str, open: usize) -> Scanned<'_> {
    Scanned {
        literal: &remaining[..open + 1],
        tag: None,
        consumed: open + 1,
    }
}

/// Tokens of a tag body, up to its closing brace
struct Delimited {
    tokens: Vec<(Token, Span)>,
    body_len: usize,
    close_end: usize,
    eat_whitespace: bool,
}

/// Lex from just after `{` to the first `}` or `*}` outside nested brackets.
fn delimit(text: &str) -> Option<Delimited> {
    let mut depth = 0usize;
    let mut tokens = Vec::new();

    for item in lex(text) {
        let (token, span) = item.ok()?;
        match &token {
            Token::BraceClose | Token::StarClose if depth == 0 => {
                return Some(Delimited {
                    tokens,
                    body_len: span.start,
                    close_end: span.end,
                    eat_whitespace: token == Token::StarClose,
                });
            }
            Token::StarClose => return None,
            Token::BraceOpen | Token::BracketOpen | Token::ParenOpen => depth += 1,
            Token::BraceClose | Token::BracketClose | Token::ParenClose => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        tokens.push((token, span));
    }
    None
}

/// Try the directive named by the leading word, then a plain insert.
fn recognize(body: &str, tokens: &[(Token, Span)]) -> Option<Tag> {
    let all: Vec<Token> = tokens.iter().map(|(token, _)| token.clone()).collect();

    let lead = whitespace_len(body);
    let word_len = head_word_len(&body[lead..]);
    let word = &body[lead..lead + word_len];
    if let Some(head) = Head::from_word(word) {
        let head_end = lead + word_len;
        let split = tokens
            .iter()
            .position(|(_, span)| span.start >= head_end)
            .unwrap_or(tokens.len());
        if let Some(tag) = parse_directive(head, &all[split..]) {
            return Some(tag);
        }
        // a hyphenated directive word would otherwise read as subtraction
        if word.contains('-') {
            return None;
        }
    }

    parse_insert(&all)
}

/// `[/]letter[letter|digit|_|-]*`
fn head_word_len(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut len = usize::from(bytes.first() == Some(&b'/'));
    if !bytes.get(len).is_some_and(u8::is_ascii_alphabetic) {
        return 0;
    }
    while bytes
        .get(len)
        .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-')
    {
        len += 1;
    }
    len
}
