//! Lexer for tag bodies using logos
//!
//! Literal template text is never lexed; the scanner hands this lexer the
//! bytes after an opening `{` and stops at the first closing brace at depth 0.

use logos::{Lexer, Logos};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Comparison and boolean operators (longer first)
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,
    #[token("&&")]
    And,
    #[token("||")]
    Or,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    /// Closing brace that also eats the whitespace following the tag
    #[token("*}")]
    StarClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token("/")]
    Slash,

    // Literals
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Reserved context slot: `$`, `$$`, `$k`, `$keys`, `$0`, ...
    #[regex(r"\$(\$|[a-z]+|[0-9])?", |lex| lex.slice().to_string())]
    Slot(String),

    /// Raw numeral text; may contain several `.`-separated digit groups
    #[regex(r"[0-9]+", lex_number)]
    Number(String),

    #[regex(r#""([^"\\]|\\.)*""#, lex_string)]
    #[regex(r#"'([^'\\]|\\.)*'"#, lex_string)]
    Str(String),
}

/// Extend a digit run over any number of `.digits` groups.
fn lex_number(lex: &mut Lexer<Token>) -> String {
    let rest = lex.remainder().as_bytes();
    let mut extra = 0;
    while rest.get(extra) == Some(&b'.') && rest.get(extra + 1).is_some_and(u8::is_ascii_digit) {
        extra += 1;
        while rest.get(extra).is_some_and(u8::is_ascii_digit) {
            extra += 1;
        }
    }
    lex.bump(extra);
    lex.slice().to_string()
}

/// Strip the quotes and resolve backslash escapes.
fn lex_string(lex: &mut Lexer<Token>) -> String {
    let slice = lex.slice();
    unescape(&slice[1..slice.len() - 1])
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans, stopping at the first invalid byte
pub fn lex(input: &str) -> impl Iterator<Item = Result<(Token, Span), Span>> + '_ {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(span),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input).map(|r| r.expect("valid token").0).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            tokens("== != <= >= < > && || + -"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::LessOrEqual,
                Token::GreaterOrEqual,
                Token::Less,
                Token::Greater,
                Token::And,
                Token::Or,
                Token::Plus,
                Token::Minus,
            ]
        );
    }

    #[test]
    fn test_slots() {
        assert_eq!(
            tokens("$ $$ $k $keys $0"),
            vec![
                Token::Slot("$".to_string()),
                Token::Slot("$$".to_string()),
                Token::Slot("$k".to_string()),
                Token::Slot("$keys".to_string()),
                Token::Slot("$0".to_string()),
            ]
        );
    }

    #[test]
    fn test_multi_dot_number_is_one_token() {
        assert_eq!(
            tokens("rows.0.1"),
            vec![
                Token::Ident("rows".to_string()),
                Token::Dot,
                Token::Number("0.1".to_string()),
            ]
        );
        assert_eq!(tokens("1.2.3"), vec![Token::Number("1.2.3".to_string())]);
    }

    #[test]
    fn test_number_stops_before_field() {
        assert_eq!(
            tokens("3.name"),
            vec![
                Token::Number("3".to_string()),
                Token::Dot,
                Token::Ident("name".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_with_escapes() {
        assert_eq!(
            tokens(r#"'it\'s' "say \"hi\"\n""#),
            vec![
                Token::Str("it's".to_string()),
                Token::Str("say \"hi\"\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_star_close() {
        assert_eq!(
            tokens("name *}"),
            vec![Token::Ident("name".to_string()), Token::StarClose]
        );
    }

    #[test]
    fn test_invalid_byte_is_an_error() {
        let result: Vec<_> = lex("a ; b").collect();
        assert!(result.iter().any(|r| r.is_err()));
    }
}
