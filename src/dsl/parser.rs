//! Parser for the filter language.
//!
//! Grammar (in rough EBNF, loosest first):
//!
//! or_expr    = and_expr (("or" | ",") or_expr)?
//! and_expr   = equality (("and" | ";") and_expr)?
//! equality   = comparison (("=" | "<>" | "!=") comparison)?
//! comparison = unary ((">" | "<" | ">=" | "<=") comparison)?
//! unary      = "!" unary | value
//! value      = NUMBER | "true" | "false" | "null" | DATETIME | STRING
//!            | "(" or_expr ")" | member_path
//! member_path = IDENT (("." | "?.") IDENT)*
//!
//! Chains recurse on their right-hand side, so `a or b or c` is
//! `a or (b or c)`.

use std::sync::Arc;

use super::ast::{CompareOp, Literal, Node};
use super::lexer::tokenize;
use super::literal::{coerce, decode_number, decode_string, decode_timestamp};
use super::token::{Token, TokenKind};
use crate::error::ParseError;
use crate::registry::{Registry, StaticType, TypeKey, ValueType};

/// Deepest nesting of groups, negations and operator chains accepted.
const MAX_DEPTH: usize = 256;

/// Parser state.
struct Parser<'r, 's> {
    registry: &'r Registry,
    root: TypeKey,
    tokens: Vec<Token<'s>>,
    pos: usize,
    depth: usize,
    eof: Token<'s>,
}

fn syntax(token: Token<'_>, message: &str) -> ParseError {
    ParseError::Syntax {
        offset: token.offset(),
        message: message.to_owned(),
    }
}

fn comparison_op(token: Token<'_>) -> Option<CompareOp> {
    if token.kind() != TokenKind::Operator {
        return None;
    }
    match token.text() {
        ">" => Some(CompareOp::Gt),
        "<" => Some(CompareOp::Lt),
        ">=" => Some(CompareOp::Ge),
        "<=" => Some(CompareOp::Le),
        _ => None,
    }
}

/// Operands of `and`, `or` and `!` must be boolean.
fn expect_bool(node: Node, at: Token<'_>) -> Result<Node, ParseError> {
    let ty = node.value_type();
    if ty.value == ValueType::Bool {
        Ok(node)
    } else {
        Err(ParseError::Type {
            offset: at.offset(),
            message: format!("Expected a Bool operand, found {}", ty),
        })
    }
}

impl<'r, 's> Parser<'r, 's> {
    fn new(registry: &'r Registry, root: TypeKey, tokens: Vec<Token<'s>>, eof: Token<'s>) -> Self {
        Parser {
            registry,
            root,
            tokens,
            pos: 0,
            depth: 0,
            eof,
        }
    }

    fn peek(&self) -> Token<'s> {
        self.tokens.get(self.pos).copied().unwrap_or(self.eof)
    }

    fn advance(&mut self) -> Token<'s> {
        let tok = self.peek();
        self.pos += 1;
        tok
    }

    /// Consume the next token if it is one of `lexemes`.
    fn eat_operator(&mut self, lexemes: &[&str]) -> Option<Token<'s>> {
        let tok = self.peek();
        if lexemes.iter().any(|lexeme| tok.is_operator(lexeme)) {
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    /// Run `parse` one nesting level deeper, failing at `at` past `MAX_DEPTH`.
    fn nested(
        &mut self,
        at: Token<'s>,
        parse: fn(&mut Self) -> Result<Node, ParseError>,
    ) -> Result<Node, ParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(syntax(at, "Expression nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_or(&mut self) -> Result<Node, ParseError> {
        let start = self.peek();
        let lhs = self.parse_and()?;
        if self.eat_operator(&["or", ","]).is_none() {
            return Ok(lhs);
        }
        let lhs = expect_bool(lhs, start)?;
        let rhs_start = self.peek();
        let rhs = expect_bool(self.nested(rhs_start, Self::parse_or)?, rhs_start)?;
        Ok(Node::or(lhs, rhs))
    }

    fn parse_and(&mut self) -> Result<Node, ParseError> {
        let start = self.peek();
        let lhs = self.parse_equality()?;
        if self.eat_operator(&["and", ";"]).is_none() {
            return Ok(lhs);
        }
        let lhs = expect_bool(lhs, start)?;
        let rhs_start = self.peek();
        let rhs = expect_bool(self.nested(rhs_start, Self::parse_and)?, rhs_start)?;
        Ok(Node::and(lhs, rhs))
    }

    fn parse_equality(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_comparison()?;
        let Some(op) = self.eat_operator(&["=", "<>", "!="]) else {
            return Ok(lhs);
        };

        let rhs_start = self.peek();
        let rhs = self.parse_comparison()?;
        let rhs = self.coerce_operand(rhs, lhs.value_type(), rhs_start)?;
        let equal = Node::compare(CompareOp::Eq, lhs, rhs);
        if op.text() == "=" {
            Ok(equal)
        } else {
            Ok(Node::not(equal))
        }
    }

    fn parse_comparison(&mut self) -> Result<Node, ParseError> {
        let lhs = self.parse_unary()?;
        let Some(op) = comparison_op(self.peek()) else {
            return Ok(lhs);
        };
        self.pos += 1;

        let rhs_start = self.peek();
        let rhs = self.nested(rhs_start, Self::parse_comparison)?;
        let rhs = self.coerce_operand(rhs, lhs.value_type(), rhs_start)?;
        Ok(Node::compare(op, lhs, rhs))
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        if self.eat_operator(&["!"]).is_none() {
            return self.parse_value();
        }
        let start = self.peek();
        let operand = expect_bool(self.nested(start, Self::parse_unary)?, start)?;
        Ok(Node::not(operand))
    }

    fn parse_value(&mut self) -> Result<Node, ParseError> {
        let tok = self.advance();
        let literal = |message: String| ParseError::Literal {
            offset: tok.offset(),
            message,
        };

        match tok.kind() {
            TokenKind::Number => {
                let number = decode_number(tok.text()).map_err(literal)?;
                Ok(Node::literal(Literal::Number(number)))
            }
            TokenKind::True => Ok(Node::literal(Literal::Bool(true))),
            TokenKind::False => Ok(Node::literal(Literal::Bool(false))),
            TokenKind::Null => Ok(Node::literal(Literal::Null(StaticType::null()))),
            TokenKind::String => Ok(Node::literal(Literal::String(decode_string(tok.text())))),
            TokenKind::DateTime => {
                let timestamp = decode_timestamp(tok.text()).map_err(literal)?;
                Ok(Node::literal(Literal::Timestamp(timestamp)))
            }
            TokenKind::Operator if tok.text() == "(" => {
                let inner = self.nested(tok, Self::parse_or)?;
                if self.eat_operator(&[")"]).is_none() {
                    return Err(syntax(self.peek(), "Expected ')'"));
                }
                Ok(inner)
            }
            TokenKind::Identifier => self.parse_member_path(tok),
            _ => Err(syntax(tok, "Expected identifier")),
        }
    }

    fn parse_member_path(&mut self, first: Token<'s>) -> Result<Node, ParseError> {
        let mut node = self.resolve(Node::Root(self.root), first, false)?;

        while let Some(sep) = self.eat_operator(&[".", "?."]) {
            let segment = self.advance();
            if segment.kind() != TokenKind::Identifier {
                return Err(syntax(segment, "Expected identifier"));
            }
            node = self.resolve(node, segment, sep.text() == "?.")?;
        }

        Ok(node)
    }

    /// Look `segment` up on the static type of `base`.
    fn resolve(&self, base: Node, segment: Token<'s>, null_safe: bool) -> Result<Node, ParseError> {
        let owner = base.value_type();
        let member = owner
            .object()
            .and_then(|key| self.registry.lookup(key, segment.text()));

        match member {
            Some(member) => Ok(Node::member(base, Arc::clone(member), null_safe)),
            None => Err(ParseError::Resolution {
                offset: segment.offset(),
                member: segment.text().to_owned(),
                owner: owner.value.to_string(),
            }),
        }
    }

    /// Literal right-hand operands take the type of the left-hand side.
    fn coerce_operand(
        &self,
        rhs: Node,
        target: StaticType,
        at: Token<'s>,
    ) -> Result<Node, ParseError> {
        match rhs {
            Node::Literal(literal) => coerce(literal, target)
                .map(Node::Literal)
                .map_err(|message| ParseError::Type {
                    offset: at.offset(),
                    message,
                }),
            other => Ok(other),
        }
    }
}

/// Parse filter text into a boolean expression over `root`.
pub(crate) fn parse_filter(
    registry: &Registry,
    root: TypeKey,
    source: &str,
) -> Result<Node, ParseError> {
    let mut tokens = Vec::new();
    let mut eof = Token::new(TokenKind::EndOfFile, "", source.len());
    for tok in tokenize(source) {
        match tok.kind() {
            TokenKind::Whitespace => {}
            TokenKind::Error => {
                return Err(ParseError::Lexical {
                    offset: tok.offset(),
                    text: tok.text().to_owned(),
                });
            }
            TokenKind::EndOfFile => eof = tok,
            _ => tokens.push(tok),
        }
    }
    tracing::trace!("Parser: {} significant tokens", tokens.len());

    let mut parser = Parser::new(registry, root, tokens, eof);
    let ast = parser.parse_or()?;

    // Ensure we consumed all tokens
    let next = parser.peek();
    if next.kind() != TokenKind::EndOfFile {
        return Err(syntax(next, "Expected end of statement"));
    }

    let ty = ast.value_type();
    if ty.value != ValueType::Bool {
        return Err(ParseError::Type {
            offset: 0,
            message: format!("Filter must be a Bool expression, found {}", ty),
        });
    }

    Ok(ast)
}
