//! Tag body grammars using chumsky
//!
//! The scanner splits a tag into its directive word (`each`, `if-not-empty`,
//! `/if`, ...) and the remaining tokens. Each directive has its own tail
//! grammar; anything else is parsed as a plain expression insert.

use chumsky::input::ValueInput;
use chumsky::prelude::*;
use serde_json::Value;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

type Extra<'a> = extra::Err<Rich<'a, Token>>;

/// Directive word at the start of a tag body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Head {
    Else,
    ElseIf(TestKind, bool),
    CloseIf,
    CloseEach,
    Each,
    If(TestKind, bool),
    Include,
    Insert(InsertMode),
}

impl Head {
    /// Recognize a directive word such as `else-unless-empty` or `/each`
    pub fn from_word(word: &str) -> Option<Self> {
        let head = match word {
            "else" => Head::Else,
            "/if" | "/unless" => Head::CloseIf,
            "/each" => Head::CloseEach,
            "each" => Head::Each,
            "tmpl" => Head::Include,
            "esc" => Head::Insert(InsertMode::Escaped),
            "raw" => Head::Insert(InsertMode::Raw),
            "json" => Head::Insert(InsertMode::Json),
            "raw-json" => Head::Insert(InsertMode::RawJson),
            _ => {
                return match word.strip_prefix("else-") {
                    Some(rest) => conditional_word(rest).map(|(kind, neg)| Head::ElseIf(kind, neg)),
                    None => conditional_word(word).map(|(kind, neg)| Head::If(kind, neg)),
                };
            }
        };
        Some(head)
    }
}

/// `(if|if-not|unless)[-empty|-key|-val|-value|-first|-last]`
fn conditional_word(word: &str) -> Option<(TestKind, bool)> {
    let (negated, rest) = if let Some(rest) = word.strip_prefix("if-not") {
        (true, rest)
    } else if let Some(rest) = word.strip_prefix("unless") {
        (true, rest)
    } else if let Some(rest) = word.strip_prefix("if") {
        (false, rest)
    } else {
        return None;
    };

    let kind = match rest {
        "" => TestKind::Truthy,
        "-empty" => TestKind::Empty,
        "-key" => TestKind::Key,
        "-val" | "-value" => TestKind::Value,
        "-first" => TestKind::First,
        "-last" => TestKind::Last,
        _ => return None,
    };
    Some((kind, negated))
}

/// Parse the tokens following a directive word
pub fn parse_directive(head: Head, tail: &[Token]) -> Option<Tag> {
    let tag = match head {
        Head::Else | Head::CloseIf | Head::CloseEach => {
            if !tail.is_empty() {
                return None;
            }
            match head {
                Head::Else => Tag::Else(None),
                Head::CloseIf => Tag::CloseIf,
                _ => Tag::CloseEach,
            }
        }
        Head::ElseIf(kind, negated) => Tag::Else(Some(run(condition_tail(kind, negated), tail)?)),
        Head::If(kind, negated) => Tag::If(run(condition_tail(kind, negated), tail)?),
        Head::Each => run(each_tail(), tail)?,
        Head::Include => run(include_tail(), tail)?,
        Head::Insert(mode) => Tag::Insert {
            expr: run(expression().then_ignore(end()), tail)?,
            mode,
        },
    };
    Some(tag)
}

/// Parse a whole tag body as an escaped insert: `{user.name}`
pub fn parse_insert(tokens: &[Token]) -> Option<Tag> {
    let expr = run(expression().then_ignore(end()), tokens)?;
    Some(Tag::Insert {
        expr,
        mode: InsertMode::Escaped,
    })
}

/// Parse a standalone expression
pub fn parse_expression(tokens: &[Token]) -> Option<Expr> {
    run(expression().then_ignore(end()), tokens)
}

fn run<'a, T>(parser: impl Parser<'a, &'a [Token], T, Extra<'a>>, tokens: &'a [Token]) -> Option<T> {
    match parser.parse(tokens).into_result() {
        Ok(value) => Some(value),
        Err(errors) => {
            tracing::trace!(?errors, "tag body rejected");
            None
        }
    }
}

fn keyword<'a, I>(word: &str) -> impl Parser<'a, I, Token, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    just(Token::Ident(word.to_string()))
}

fn identifier<'a, I>() -> impl Parser<'a, I, String, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! { Token::Ident(name) => name }
}

/// Integer text stays an integer; anything with a fraction becomes a float.
/// Multi-dot numerals such as `1.2.3` are rejected.
fn number_literal(text: &str, negative: bool) -> Option<Value> {
    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            return Some(Value::from(if negative { -n } else { n }));
        }
    }
    let n: f64 = text.parse().ok()?;
    serde_json::Number::from_f64(if negative { -n } else { n }).map(Value::Number)
}

pub(crate) fn expression<'a, I>() -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let ident = identifier();

        let number = choice((just(Token::Minus).to(true), just(Token::Plus).to(false)))
            .or_not()
            .then(select! { Token::Number(text) => text })
            .try_map(|(negative, text), span| {
                number_literal(&text, negative.unwrap_or(false))
                    .map(Expr::Literal)
                    .ok_or_else(|| Rich::custom(span, format!("malformed number '{}'", text)))
            });

        let string = select! { Token::Str(s) => Expr::Literal(Value::String(s)) };

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        // `.0.1` arrives as one number token and splits into two fields
        let field = just(Token::Dot).ignore_then(choice((
            ident.clone().map(|name| vec![Segment::Field(name)]),
            select! { Token::Number(text) => text }.map(|text: String| {
                text.split('.')
                    .map(|part| Segment::Field(part.to_string()))
                    .collect::<Vec<_>>()
            }),
        )));

        let segment = choice((
            field,
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(|index| vec![Segment::Index(index)]),
            args.map(|args| vec![Segment::Call(args)]),
        ));

        let root = choice((
            ident.clone().map(Root::Local),
            select! { Token::Slot(sigil) => sigil }.try_map(|sigil: String, span| {
                Slot::from_sigil(&sigil)
                    .map(Root::Slot)
                    .ok_or_else(|| Rich::custom(span, format!("unknown slot '{}'", sigil)))
            }),
        ));

        let variable = root
            .then(segment.repeated().collect::<Vec<_>>())
            .map(|(root, segments)| Expr::Variable {
                root,
                path: segments.into_iter().flatten().collect(),
            });

        let group = expr
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
            .map(|inner| Expr::Group(Box::new(inner)));

        // `{name}` without a value is shorthand for `{name: name}`
        let object = ident
            .then(just(Token::Colon).ignore_then(expr.clone()).or_not())
            .map(|(key, value)| {
                let value = value.unwrap_or_else(|| Expr::local(key.clone()));
                (key, value)
            })
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Object);

        let array = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        let operand = choice((group, object, array, variable, string, number));

        let operator = select! {
            Token::EqEq => BinaryOp::Eq,
            Token::NotEq => BinaryOp::NotEq,
            Token::LessOrEqual => BinaryOp::LessOrEqual,
            Token::GreaterOrEqual => BinaryOp::GreaterOrEqual,
            Token::Less => BinaryOp::Less,
            Token::Greater => BinaryOp::Greater,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
        };

        // No precedence: `a > b && c` is `(a > b) && c`
        operand
            .clone()
            .then(operator.then(operand).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| {
                if rest.is_empty() {
                    first
                } else {
                    Expr::Binary {
                        first: Box::new(first),
                        rest,
                    }
                }
            })
    })
}

/// `X [as K] [at I] in EXPR` or just `EXPR`
///
/// `X` binds the element, the word after `as` the key and the word after
/// `at` the position, so `items as v at i in items` binds `v` to the key.
fn each_tail<'a, I>() -> impl Parser<'a, I, Tag, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let long = identifier()
        .then(keyword("as").ignore_then(identifier()).or_not())
        .then(keyword("at").ignore_then(identifier()).or_not())
        .then_ignore(keyword("in"))
        .then(expression())
        .then_ignore(end())
        .map(|(((value, key), index), collection)| Tag::Each {
            binding: EachBinding {
                value: Some(value),
                key,
                index,
            },
            collection,
        });

    let short = expression().then_ignore(end()).map(|collection| Tag::Each {
        binding: EachBinding::default(),
        collection,
    });

    choice((long, short))
}

/// `[EXPR [in EXPR2]]`, validated against what the test kind needs
fn condition_tail<'a, I>(
    kind: TestKind,
    negated: bool,
) -> impl Parser<'a, I, Condition, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    expression()
        .or_not()
        .then(keyword("in").ignore_then(expression()).or_not())
        .then_ignore(end())
        .try_map(move |(subject, haystack), span| {
            let valid = match kind {
                TestKind::Truthy | TestKind::Empty => subject.is_some() && haystack.is_none(),
                TestKind::Key | TestKind::Value => subject.is_some() && haystack.is_some(),
                TestKind::First | TestKind::Last => subject.is_none() && haystack.is_none(),
            };
            if !valid {
                return Err(Rich::custom(span, "wrong operands for conditional"));
            }
            Ok(Condition {
                kind,
                negated,
                subject,
                haystack,
            })
        })
}

/// `ID PARAM...` where ID is `name`, `some-name` or a quoted string
fn include_tail<'a, I>() -> impl Parser<'a, I, Tag, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let id = choice((
        select! { Token::Str(s) => s },
        identifier()
            .separated_by(just(Token::Minus))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(|parts| parts.join("-")),
    ));

    let param = identifier()
        .then(just(Token::Colon).ignore_then(expression()).or_not())
        .then_ignore(just(Token::Comma).or_not())
        .map(|(name, value)| {
            let value = value.unwrap_or_else(|| Expr::local(name.clone()));
            (name, value)
        });

    id.then(param.repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(id, params)| Tag::Include { id, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;

    fn toks(input: &str) -> Vec<Token> {
        lex(input).map(|r| r.expect("valid token").0).collect()
    }

    fn expr(input: &str) -> Expr {
        parse_expression(&toks(input)).expect("Should parse")
    }

    #[test]
    fn test_head_words() {
        assert_eq!(Head::from_word("each"), Some(Head::Each));
        assert_eq!(Head::from_word("/unless"), Some(Head::CloseIf));
        assert_eq!(Head::from_word("if-not-empty"), Some(Head::If(TestKind::Empty, true)));
        assert_eq!(Head::from_word("unless-last"), Some(Head::If(TestKind::Last, true)));
        assert_eq!(Head::from_word("if-value"), Some(Head::If(TestKind::Value, false)));
        assert_eq!(
            Head::from_word("else-if-key"),
            Some(Head::ElseIf(TestKind::Key, false))
        );
        assert_eq!(Head::from_word("raw-json"), Some(Head::Insert(InsertMode::RawJson)));
        assert_eq!(Head::from_word("iffy"), None);
        assert_eq!(Head::from_word("else-each"), None);
    }

    #[test]
    fn test_variable_path() {
        assert_eq!(
            expr("user.names[0].first"),
            Expr::Variable {
                root: Root::Local("user".to_string()),
                path: vec![
                    Segment::Field("names".to_string()),
                    Segment::Index(Expr::Literal(Value::from(0))),
                    Segment::Field("first".to_string()),
                ],
            }
        );
    }

    #[test]
    fn test_numeric_fields_split() {
        assert_eq!(expr("rows.0.1").to_string(), "rows.0.1");
        match expr("rows.0.1") {
            Expr::Variable { path, .. } => assert_eq!(path.len(), 2),
            other => panic!("Expected variable, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_dot_literal_rejected() {
        assert_eq!(parse_expression(&toks("1.2.3")), None);
    }

    #[test]
    fn test_flat_chain() {
        match expr("a > 5 && b") {
            Expr::Binary { first, rest } => {
                assert_eq!(*first, Expr::local("a"));
                assert_eq!(rest.len(), 2);
                assert_eq!(rest[0].0, BinaryOp::Greater);
                assert_eq!(rest[1].0, BinaryOp::And);
            }
            other => panic!("Expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_minus_without_spaces_is_subtraction() {
        assert_eq!(expr("x-1").to_string(), "x - 1");
        assert_eq!(expr("x - -1").to_string(), "x - -1");
    }

    #[test]
    fn test_object_and_array_literals() {
        assert_eq!(expr("{a: 1, b}").to_string(), "{a: 1, b: b}");
        assert_eq!(expr("[1, 'two', (x)]").to_string(), r#"[1, "two", (x)]"#);
    }

    #[test]
    fn test_calls() {
        assert_eq!(expr("num(x)").to_string(), "num(x)");
        assert_eq!(expr("name.upper()").to_string(), "name.upper()");
    }

    #[test]
    fn test_slots() {
        assert_eq!(
            expr("$.title"),
            Expr::Variable {
                root: Root::Slot(Slot::Element),
                path: vec![Segment::Field("title".to_string())],
            }
        );
        assert_eq!(parse_expression(&toks("$nope")), None);
    }

    #[test]
    fn test_each_forms() {
        let tag = parse_directive(Head::Each, &toks("v as k at i in items")).expect("long form");
        match tag {
            Tag::Each { binding, collection } => {
                assert_eq!(binding.value.as_deref(), Some("v"));
                assert_eq!(binding.key.as_deref(), Some("k"));
                assert_eq!(binding.index.as_deref(), Some("i"));
                assert_eq!(collection, Expr::local("items"));
            }
            other => panic!("Expected each, got {:?}", other),
        }

        let tag = parse_directive(Head::Each, &toks("book.chapters")).expect("short form");
        match tag {
            Tag::Each { binding, .. } => assert_eq!(binding, EachBinding::default()),
            other => panic!("Expected each, got {:?}", other),
        }

        // the word after `as` is the key, even when it reads like an element name
        let tag = parse_directive(Head::Each, &toks("items as v at i in items")).expect("Should parse");
        match tag {
            Tag::Each { binding, .. } => {
                assert_eq!(binding.value.as_deref(), Some("items"));
                assert_eq!(binding.key.as_deref(), Some("v"));
                assert_eq!(binding.index.as_deref(), Some("i"));
            }
            other => panic!("Expected each, got {:?}", other),
        }
    }

    #[test]
    fn test_condition_operands_validated() {
        let key = Head::If(TestKind::Key, false);
        assert!(parse_directive(key, &toks("'a' in obj")).is_some());
        assert!(parse_directive(key, &toks("'a'")).is_none());

        let first = Head::If(TestKind::First, false);
        assert!(parse_directive(first, &[]).is_some());
        assert!(parse_directive(first, &toks("x")).is_none());

        let plain = Head::If(TestKind::Truthy, true);
        assert!(parse_directive(plain, &[]).is_none());
    }

    #[test]
    fn test_include() {
        let tag = parse_directive(Head::Include, &toks("user-card item: $, index: $i user"))
            .expect("Should parse");
        match tag {
            Tag::Include { id, params } => {
                assert_eq!(id, "user-card");
                let names: Vec<_> = params.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["item", "index", "user"]);
                assert_eq!(params[2].1, Expr::local("user"));
            }
            other => panic!("Expected include, got {:?}", other),
        }
    }

    #[test]
    fn test_close_tags_reject_operands() {
        assert_eq!(parse_directive(Head::CloseIf, &[]), Some(Tag::CloseIf));
        assert_eq!(parse_directive(Head::CloseEach, &toks("x")), None);
    }
}
