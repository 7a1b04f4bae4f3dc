//! A `nom`-based tokenizer for XPath 1.0 expressions.
//!
//! Besides splitting the input, the lexer applies the disambiguation rules of
//! XPath 1.0 §3.7: when the previous token can end an operand, `*` is the
//! multiply operator and `and`/`or`/`div`/`mod` are operator names; a name
//! followed by `(` is a function name or node type, and a name followed by
//! `::` is an axis name.

use crate::error::XPathError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit0, digit1, multispace0},
    combinator::{map, opt, recognize, value},
    sequence::{delimited, pair, preceded},
};

const NODE_TYPE_NAMES: &[&str] = &["comment", "text", "processing-instruction", "node"];

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Dot,
    DotDot,
    At,
    Comma,
    ColonColon,
    // Operators
    Slash,
    DoubleSlash,
    Pipe,
    Plus,
    Minus,
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    Multiply,
    And,
    Or,
    Div,
    Mod,
    // Literals and names
    Literal(String),
    Number(f64),
    NameTest {
        prefix: Option<String>,
        local_name: String,
    },
    Wildcard {
        prefix: Option<String>,
    },
    NodeType(String),
    FunctionName(String),
    AxisName(String),
    Variable(String),
}

impl TokenKind {
    fn is_operator(&self) -> bool {
        matches!(
            self,
            TokenKind::Slash
                | TokenKind::DoubleSlash
                | TokenKind::Pipe
                | TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Equals
                | TokenKind::NotEquals
                | TokenKind::LessThan
                | TokenKind::LessThanOrEqual
                | TokenKind::GreaterThan
                | TokenKind::GreaterThanOrEqual
                | TokenKind::Multiply
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::Div
                | TokenKind::Mod
        )
    }

    /// True when a token following this one must be read as an operator.
    fn ends_operand(&self) -> bool {
        !self.is_operator()
            && !matches!(
                self,
                TokenKind::At
                    | TokenKind::ColonColon
                    | TokenKind::LeftParen
                    | TokenKind::LeftBracket
                    | TokenKind::Comma
            )
    }
}

/// A lexical token with its raw text and byte offset into the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'s> {
    pub kind: TokenKind,
    pub lexeme: &'s str,
    pub offset: usize,
}

/// Splits `source` into tokens. Fails on an unrecognized character or an
/// unterminated string literal.
pub fn tokenize(source: &str) -> Result<Vec<Token<'_>>, XPathError> {
    let mut tokens: Vec<Token<'_>> = Vec::new();
    let mut rest = skip_whitespace(source);

    while !rest.is_empty() {
        let offset = source.len() - rest.len();
        let operator_context = tokens.last().is_some_and(|t| t.kind.ends_operand());

        let (remaining, kind) = next_token(rest, operator_context)
            .map_err(|(message, hint)| XPathError::syntax(source, offset, message, hint))?;

        let lexeme = &rest[..rest.len() - remaining.len()];
        tokens.push(Token {
            kind,
            lexeme,
            offset,
        });
        rest = skip_whitespace(remaining);
    }
    Ok(tokens)
}

type LexFailure = (String, Option<&'static str>);

fn skip_whitespace(input: &str) -> &str {
    let parsed: IResult<&str, &str> = multispace0(input);
    parsed.map_or(input, |(rest, _)| rest)
}

fn next_token(input: &str, operator_context: bool) -> Result<(&str, TokenKind), LexFailure> {
    if let Ok((rest, kind)) = number_literal(input) {
        return Ok((rest, kind));
    }
    if let Ok((rest, kind)) = symbol(input) {
        return Ok((rest, kind));
    }
    if input.starts_with('*') {
        let kind = if operator_context {
            TokenKind::Multiply
        } else {
            TokenKind::Wildcard { prefix: None }
        };
        return Ok((&input[1..], kind));
    }
    if input.starts_with(['"', '\'']) {
        return string_literal(input).map_err(|_| {
            (
                "string literal is never closed".to_string(),
                Some("unterminated string literal"),
            )
        });
    }
    if input.starts_with('$') {
        return variable_reference(input).map_err(|_| {
            (
                "expected a variable name after '$'".to_string(),
                None,
            )
        });
    }
    if nc_name(input).is_ok() {
        return name_token(input, operator_context);
    }

    let unexpected = input.chars().next().unwrap_or_default();
    Err((format!("unexpected character '{}'", unexpected), None))
}

fn symbol(input: &str) -> IResult<&str, TokenKind> {
    alt((
        alt((
            value(TokenKind::DoubleSlash, tag("//")),
            value(TokenKind::Slash, tag("/")),
            value(TokenKind::ColonColon, tag("::")),
            value(TokenKind::DotDot, tag("..")),
            value(TokenKind::Dot, tag(".")),
            value(TokenKind::NotEquals, tag("!=")),
            value(TokenKind::LessThanOrEqual, tag("<=")),
            value(TokenKind::GreaterThanOrEqual, tag(">=")),
            value(TokenKind::LessThan, tag("<")),
            value(TokenKind::GreaterThan, tag(">")),
            value(TokenKind::Equals, tag("=")),
        )),
        alt((
            value(TokenKind::LeftParen, char('(')),
            value(TokenKind::RightParen, char(')')),
            value(TokenKind::LeftBracket, char('[')),
            value(TokenKind::RightBracket, char(']')),
            value(TokenKind::At, char('@')),
            value(TokenKind::Comma, char(',')),
            value(TokenKind::Pipe, char('|')),
            value(TokenKind::Plus, char('+')),
            value(TokenKind::Minus, char('-')),
        )),
    ))
    .parse(input)
}

// XPath 1.0 numbers: digits with an optional fraction, or a bare fraction. No exponent.
fn number_literal(input: &str) -> IResult<&str, TokenKind> {
    let (rest, text) = recognize(alt((
        recognize(pair(digit1, opt(pair(char('.'), digit0)))),
        recognize(pair(char('.'), digit1)),
    )))
    .parse(input)?;
    let number = text.parse::<f64>().unwrap_or(f64::NAN);
    Ok((rest, TokenKind::Number(number)))
}

fn string_literal(input: &str) -> IResult<&str, TokenKind> {
    map(
        alt((
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
        )),
        |s: &str| TokenKind::Literal(s.to_string()),
    )
    .parse(input)
}

fn variable_reference(input: &str) -> IResult<&str, TokenKind> {
    map(preceded(char('$'), q_name), |name: &str| {
        TokenKind::Variable(name.to_string())
    })
    .parse(input)
}

fn nc_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '-' || c == '.'),
    ))
    .parse(input)
}

fn q_name(input: &str) -> IResult<&str, &str> {
    recognize(pair(nc_name, opt(pair(char(':'), nc_name)))).parse(input)
}

fn name_token(input: &str, operator_context: bool) -> Result<(&str, TokenKind), LexFailure> {
    let Ok((rest, first)) = nc_name(input) else {
        return Err(("expected a name".to_string(), None));
    };

    if operator_context {
        let kind = match first {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "div" => TokenKind::Div,
            "mod" => TokenKind::Mod,
            other => {
                return Err((
                    format!("expected an operator, found '{}'", other),
                    Some("missing operator between operands"),
                ));
            }
        };
        return Ok((rest, kind));
    }

    let wildcard: IResult<&str, char> = preceded(char(':'), char('*')).parse(rest);
    if let Ok((after, _)) = wildcard {
        return Ok((
            after,
            TokenKind::Wildcard {
                prefix: Some(first.to_string()),
            },
        ));
    }

    let (rest, prefix, local_name) = match preceded(char(':'), nc_name).parse(rest) {
        Ok((after, local)) => (after, Some(first), local),
        Err(_) => (rest, None, first),
    };

    let lookahead = skip_whitespace(rest);
    if prefix.is_none() && lookahead.starts_with("::") {
        return Ok((rest, TokenKind::AxisName(local_name.to_string())));
    }
    if lookahead.starts_with('(') {
        if prefix.is_none() && NODE_TYPE_NAMES.contains(&local_name) {
            return Ok((rest, TokenKind::NodeType(local_name.to_string())));
        }
        let qualified = &input[..input.len() - rest.len()];
        return Ok((rest, TokenKind::FunctionName(qualified.to_string())));
    }

    Ok((
        rest,
        TokenKind::NameTest {
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_slashes_and_dots_are_distinguished() {
        assert_eq!(
            kinds("//a/../."),
            vec![
                TokenKind::DoubleSlash,
                TokenKind::NameTest {
                    prefix: None,
                    local_name: "a".into()
                },
                TokenKind::Slash,
                TokenKind::DotDot,
                TokenKind::Slash,
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn test_star_and_operator_names_depend_on_preceding_token() {
        assert_eq!(
            kinds("div * div"),
            vec![
                TokenKind::NameTest {
                    prefix: None,
                    local_name: "div".into()
                },
                TokenKind::Multiply,
                TokenKind::NameTest {
                    prefix: None,
                    local_name: "div".into()
                },
            ]
        );
        assert_eq!(
            kinds("3 div *"),
            vec![
                TokenKind::Number(3.0),
                TokenKind::Div,
                TokenKind::Wildcard { prefix: None },
            ]
        );
    }

    #[test]
    fn test_axis_names_only_before_double_colon() {
        assert_eq!(
            kinds("child::child"),
            vec![
                TokenKind::AxisName("child".into()),
                TokenKind::ColonColon,
                TokenKind::NameTest {
                    prefix: None,
                    local_name: "child".into()
                },
            ]
        );
    }

    #[test]
    fn test_function_names_and_node_types() {
        assert_eq!(
            kinds("text() | fn:count (x)"),
            vec![
                TokenKind::NodeType("text".into()),
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Pipe,
                TokenKind::FunctionName("fn:count".into()),
                TokenKind::LeftParen,
                TokenKind::NameTest {
                    prefix: None,
                    local_name: "x".into()
                },
                TokenKind::RightParen,
            ]
        );
    }

    #[test]
    fn test_literals_numbers_variables() {
        assert_eq!(
            kinds(r#"'a"b' "c" 1.5 .5 $ns:v"#),
            vec![
                TokenKind::Literal("a\"b".into()),
                TokenKind::Literal("c".into()),
                TokenKind::Number(1.5),
                TokenKind::Number(0.5),
                TokenKind::Variable("ns:v".into()),
            ]
        );
    }

    #[test]
    fn test_prefixed_names_and_wildcards() {
        assert_eq!(
            kinds("svg:rect/svg:*"),
            vec![
                TokenKind::NameTest {
                    prefix: Some("svg".into()),
                    local_name: "rect".into()
                },
                TokenKind::Slash,
                TokenKind::Wildcard {
                    prefix: Some("svg".into())
                },
            ]
        );
    }

    #[test]
    fn test_offsets_and_lexemes() {
        let tokens = tokenize("a  != 'x'").unwrap();
        assert_eq!(tokens[1].lexeme, "!=");
        assert_eq!(tokens[1].offset, 3);
        assert_eq!(tokens[2].lexeme, "'x'");
        assert_eq!(tokens[2].offset, 6);
    }

    #[test]
    fn test_unterminated_literal_is_syntax_error() {
        let err = tokenize("foo = 'bar").unwrap_err();
        match err {
            XPathError::Syntax { offset, hint, .. } => {
                assert_eq!(offset, 6);
                assert_eq!(hint.as_deref(), Some("unterminated string literal"));
            }
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_character() {
        assert!(matches!(
            tokenize("a # b"),
            Err(XPathError::Syntax { offset: 2, .. })
        ));
    }
}
