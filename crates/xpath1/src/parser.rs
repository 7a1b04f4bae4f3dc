//! A recursive-descent parser for the XPath 1.0 expression language.
//!
//! Consumes the token stream produced by [`crate::lexer::tokenize`] and builds
//! an [`Expression`]. Each precedence level is one method; the binary levels
//! share [`Parser::binary_level`].

use super::ast::*;
use crate::error::{EvaluationErrorKind, XPathError};
use crate::lexer::{Token, TokenKind, tokenize};

// Each nesting level costs parser and evaluator stack, so deep queries are
// rejected before they can exhaust it. A parenthesised group, argument list,
// predicate or unary minus costs `GROUP_COST`; each operator in a chain costs 1.
const MAX_DEPTH: usize = 1024;
const GROUP_COST: usize = 8;

// --- Main Public Parser ---

/// Parses a complete XPath 1.0 expression. Does not consult any cache.
pub fn parse_expression(input: &str) -> Result<Expression, XPathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(XPathError::syntax(
            input,
            0,
            "empty expression",
            Some("missing operand"),
        ));
    }

    let mut parser = Parser {
        source: input,
        tokens: &tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;

    if let Some(token) = parser.peek() {
        let hint = match token.kind {
            TokenKind::RightParen => Some("unbalanced parentheses"),
            TokenKind::RightBracket => Some("unbalanced brackets"),
            _ => None,
        };
        return Err(XPathError::syntax(
            input,
            token.offset,
            format!("unexpected '{}' after complete expression", token.lexeme),
            hint,
        ));
    }
    Ok(expr)
}

type ParseResult<T> = Result<T, XPathError>;

struct Parser<'t, 's> {
    source: &'s str,
    tokens: &'t [Token<'s>],
    pos: usize,
    depth: usize,
}

impl<'t, 's> Parser<'t, 's> {
    // --- Token helpers ---

    fn peek(&self) -> Option<&'t Token<'s>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&'t TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token<'s>> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn current_offset(&self) -> usize {
        self.peek().map_or(self.source.len(), |t| t.offset)
    }

    fn error(&self, message: impl Into<String>, hint: Option<&str>) -> XPathError {
        XPathError::syntax(self.source, self.current_offset(), message, hint)
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str, hint: Option<&str>) -> ParseResult<()> {
        if self.eat(kind) {
            return Ok(());
        }
        let found = match self.peek() {
            Some(token) => format!("found '{}'", token.lexeme),
            None => "reached end of expression".to_string(),
        };
        Err(self.error(format!("expected '{}', {}", expected, found), hint))
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        cost: usize,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        if self.depth + cost > MAX_DEPTH {
            return Err(self.error(
                format!("nesting exceeds the limit of {}", MAX_DEPTH),
                Some("expression nested too deeply"),
            ));
        }
        self.depth += cost;
        let result = parse(self);
        self.depth -= cost;
        result
    }

    // --- Expression Parsers (in order of precedence) ---

    fn expression(&mut self) -> ParseResult<Expression> {
        self.or_expr()
    }

    fn binary_level(
        &mut self,
        sub_expr: fn(&mut Self) -> ParseResult<Expression>,
        op_for: fn(&TokenKind) -> Option<BinaryOperator>,
    ) -> ParseResult<Expression> {
        let mut left = sub_expr(self)?;
        let mut chain = 0;
        while let Some(op) = self.peek_kind().and_then(op_for) {
            self.pos += 1;
            chain += 1;
            // The left operand is `chain` levels deep by now.
            let right = self.nested(chain, sub_expr)?;
            left = Expression::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn or_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::and_expr, |k| {
            matches!(k, TokenKind::Or).then_some(BinaryOperator::Or)
        })
    }

    fn and_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::equality_expr, |k| {
            matches!(k, TokenKind::And).then_some(BinaryOperator::And)
        })
    }

    fn equality_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::relational_expr, |k| match k {
            TokenKind::Equals => Some(BinaryOperator::Equals),
            TokenKind::NotEquals => Some(BinaryOperator::NotEquals),
            _ => None,
        })
    }

    fn relational_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::additive_expr, |k| match k {
            TokenKind::LessThan => Some(BinaryOperator::LessThan),
            TokenKind::LessThanOrEqual => Some(BinaryOperator::LessThanOrEqual),
            TokenKind::GreaterThan => Some(BinaryOperator::GreaterThan),
            TokenKind::GreaterThanOrEqual => Some(BinaryOperator::GreaterThanOrEqual),
            _ => None,
        })
    }

    fn additive_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::multiplicative_expr, |k| match k {
            TokenKind::Plus => Some(BinaryOperator::Plus),
            TokenKind::Minus => Some(BinaryOperator::Minus),
            _ => None,
        })
    }

    fn multiplicative_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::unary_expr, |k| match k {
            TokenKind::Multiply => Some(BinaryOperator::Multiply),
            TokenKind::Div => Some(BinaryOperator::Divide),
            TokenKind::Mod => Some(BinaryOperator::Modulo),
            _ => None,
        })
    }

    fn unary_expr(&mut self) -> ParseResult<Expression> {
        if self.eat(&TokenKind::Minus) {
            let expr = self.nested(GROUP_COST, Self::unary_expr)?;
            return Ok(Expression::UnaryOp {
                op: UnaryOperator::Minus,
                expr: Box::new(expr),
            });
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> ParseResult<Expression> {
        self.binary_level(Self::path_expr, |k| {
            matches!(k, TokenKind::Pipe).then_some(BinaryOperator::Union)
        })
    }

    /// A location path, or a filter expression optionally continued by a path.
    fn path_expr(&mut self) -> ParseResult<Expression> {
        match self.peek_kind() {
            Some(TokenKind::Slash) | Some(TokenKind::DoubleSlash) => self.absolute_location_path(),
            Some(kind) if starts_step(kind) => {
                let mut steps = Vec::new();
                self.relative_location_path(&mut steps)?;
                Ok(Expression::LocationPath(LocationPath {
                    start_point: None,
                    is_absolute: false,
                    steps,
                }))
            }
            _ => {
                let filter = self.filter_expr()?;
                if !matches!(
                    self.peek_kind(),
                    Some(TokenKind::Slash) | Some(TokenKind::DoubleSlash)
                ) {
                    return Ok(filter);
                }
                let mut steps = Vec::new();
                self.continue_path(&mut steps)?;
                Ok(Expression::LocationPath(LocationPath {
                    start_point: Some(Box::new(filter)),
                    is_absolute: false,
                    steps,
                }))
            }
        }
    }

    fn filter_expr(&mut self) -> ParseResult<Expression> {
        let primary = self.primary_expr()?;
        let predicates = self.predicates()?;
        if predicates.is_empty() {
            Ok(primary)
        } else {
            Ok(Expression::Filter {
                primary: Box::new(primary),
                predicates,
            })
        }
    }

    fn primary_expr(&mut self) -> ParseResult<Expression> {
        let Some(token) = self.peek() else {
            return Err(self.error("expected an expression", Some("missing operand")));
        };
        match &token.kind {
            TokenKind::Variable(name) => {
                self.pos += 1;
                Ok(Expression::Variable(name.clone()))
            }
            TokenKind::Literal(s) => {
                self.pos += 1;
                Ok(Expression::Literal(s.clone()))
            }
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok(Expression::Number(*n))
            }
            TokenKind::LeftParen => {
                self.pos += 1;
                let expr = self.nested(GROUP_COST, Self::expression)?;
                self.expect(&TokenKind::RightParen, ")", Some("unbalanced parentheses"))?;
                Ok(expr)
            }
            TokenKind::FunctionName(name) => {
                self.pos += 1;
                let args = self.nested(GROUP_COST, Self::arguments)?;
                Ok(Expression::FunctionCall {
                    name: name.clone(),
                    args,
                })
            }
            _ => Err(self.error(
                format!("expected an expression, found '{}'", token.lexeme),
                Some("missing operand"),
            )),
        }
    }

    fn arguments(&mut self) -> ParseResult<Vec<Expression>> {
        self.expect(&TokenKind::LeftParen, "(", None)?;
        let mut args = Vec::new();
        if self.eat(&TokenKind::RightParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RightParen, ")", Some("unbalanced parentheses"))?;
            return Ok(args);
        }
    }

    // --- Path Parsers ---

    fn absolute_location_path(&mut self) -> ParseResult<Expression> {
        let mut steps = Vec::new();
        if self.eat(&TokenKind::DoubleSlash) {
            steps.push(Step::descendant_or_self());
            self.relative_location_path(&mut steps)?;
        } else {
            self.expect(&TokenKind::Slash, "/", None)?;
            // A lone `/` selects the root node.
            if self.peek_kind().is_some_and(starts_step) {
                self.relative_location_path(&mut steps)?;
            }
        }
        Ok(Expression::LocationPath(LocationPath {
            start_point: None,
            is_absolute: true,
            steps,
        }))
    }

    fn relative_location_path(&mut self, steps: &mut Vec<Step>) -> ParseResult<()> {
        steps.push(self.step()?);
        self.continue_path(steps)
    }

    // After the first step, subsequent steps MUST be preceded by / or //.
    fn continue_path(&mut self, steps: &mut Vec<Step>) -> ParseResult<()> {
        loop {
            if self.eat(&TokenKind::DoubleSlash) {
                steps.push(Step::descendant_or_self());
            } else if !self.eat(&TokenKind::Slash) {
                return Ok(());
            }
            steps.push(self.step()?);
        }
    }

    fn step(&mut self) -> ParseResult<Step> {
        if self.eat(&TokenKind::Dot) {
            return Ok(Step::new(
                Axis::SelfAxis,
                NodeTest::NodeType(NodeTypeTest::Node),
            ));
        }
        if self.eat(&TokenKind::DotDot) {
            return Ok(Step::new(
                Axis::Parent,
                NodeTest::NodeType(NodeTypeTest::Node),
            ));
        }

        let axis = if self.eat(&TokenKind::At) {
            Axis::Attribute
        } else if let Some(TokenKind::AxisName(name)) = self.peek_kind() {
            let axis = Axis::from_name(name).ok_or_else(|| {
                XPathError::evaluation(self.source, EvaluationErrorKind::UnknownAxis(name.clone()))
            })?;
            self.pos += 1;
            self.expect(&TokenKind::ColonColon, "::", None)?;
            axis
        } else {
            Axis::Child
        };

        let node_test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn node_test(&mut self) -> ParseResult<NodeTest> {
        let Some(token) = self.advance() else {
            return Err(self.error("expected a node test", Some("missing step after '/'")));
        };
        match &token.kind {
            TokenKind::NameTest { prefix, local_name } => Ok(NodeTest::Name {
                prefix: prefix.clone(),
                local_name: local_name.clone(),
            }),
            TokenKind::Wildcard { prefix } => Ok(NodeTest::Wildcard {
                prefix: prefix.clone(),
            }),
            TokenKind::NodeType(name) => {
                self.expect(&TokenKind::LeftParen, "(", None)?;
                let test = match name.as_str() {
                    "text" => NodeTypeTest::Text,
                    "comment" => NodeTypeTest::Comment,
                    "processing-instruction" => {
                        let target = match self.peek_kind() {
                            Some(TokenKind::Literal(target)) => {
                                self.pos += 1;
                                Some(target.clone())
                            }
                            _ => None,
                        };
                        NodeTypeTest::ProcessingInstruction(target)
                    }
                    _ => NodeTypeTest::Node,
                };
                self.expect(&TokenKind::RightParen, ")", Some("unbalanced parentheses"))?;
                Ok(NodeTest::NodeType(test))
            }
            _ => {
                self.pos -= 1;
                Err(self.error(
                    format!("expected a node test, found '{}'", token.lexeme),
                    None,
                ))
            }
        }
    }

    fn predicates(&mut self) -> ParseResult<Vec<Expression>> {
        let mut predicates = Vec::new();
        while self.eat(&TokenKind::LeftBracket) {
            predicates.push(self.nested(GROUP_COST, Self::expression)?);
            self.expect(&TokenKind::RightBracket, "]", Some("unbalanced brackets"))?;
        }
        Ok(predicates)
    }
}

fn starts_step(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::NameTest { .. }
            | TokenKind::Wildcard { .. }
            | TokenKind::NodeType(_)
            | TokenKind::AxisName(_)
            | TokenKind::At
            | TokenKind::Dot
            | TokenKind::DotDot
    )
}
