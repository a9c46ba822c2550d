//! AST types for the filter language.

use rust_decimal::Decimal;
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::registry::{MemberDescriptor, StaticType, TypeKey, Value, ValueType};

/// Timestamp rendering the tokenizer reads back: milliseconds only when present.
const WHOLE_SECONDS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
);
const MILLISECONDS: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3][offset_hour sign:mandatory]:[offset_minute]"
);

/// A decoded literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Number(Decimal),
    String(String),
    Timestamp(OffsetDateTime),
    /// `null`, carrying the type it stands in for.
    Null(StaticType),
}

impl Literal {
    pub fn static_type(&self) -> StaticType {
        match self {
            Literal::Bool(_) => StaticType::of(ValueType::Bool),
            Literal::Number(_) => StaticType::of(ValueType::Number),
            Literal::String(_) => StaticType::of(ValueType::String),
            Literal::Timestamp(_) => StaticType::of(ValueType::Timestamp),
            Literal::Null(ty) => *ty,
        }
    }

    pub fn to_value(&self) -> Value<'_> {
        match self {
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s.as_str().into()),
            Literal::Timestamp(ts) => Value::Timestamp(*ts),
            Literal::Null(_) => Value::Null,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => {
                f.write_str("'")?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\r' => f.write_str("\\r")?,
                        '\t' => f.write_str("\\t")?,
                        '\u{8}' => f.write_str("\\b")?,
                        '\u{b}' => f.write_str("\\v")?,
                        c => write!(f, "{}", c)?,
                    }
                }
                f.write_str("'")
            }
            Literal::Timestamp(ts) => {
                let format = if ts.nanosecond() == 0 {
                    WHOLE_SECONDS
                } else {
                    MILLISECONDS
                };
                let text = ts.format(format).map_err(|_| fmt::Error)?;
                f.write_str(&text)
            }
            Literal::Null(_) => write!(f, "null"),
        }
    }
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq, // =
    Ne, // !=
    Lt, // <
    Le, // <=
    Gt, // >
    Ge, // >=
}

impl CompareOp {
    pub fn is_ordering(self) -> bool {
        !matches!(self, CompareOp::Eq | CompareOp::Ne)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "="),
            CompareOp::Ne => write!(f, "!="),
            CompareOp::Lt => write!(f, "<"),
            CompareOp::Le => write!(f, "<="),
            CompareOp::Gt => write!(f, ">"),
            CompareOp::Ge => write!(f, ">="),
        }
    }
}

/// Boolean connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::And => write!(f, "and"),
            LogicalOp::Or => write!(f, "or"),
        }
    }
}

/// One segment of a member path.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberAccess {
    pub base: Box<Node>,
    pub member: Arc<MemberDescriptor>,
    /// Reached through `?.`: a null base ends the chain with null.
    pub null_safe: bool,
    value_type: StaticType,
}

impl MemberAccess {
    pub fn new(base: Node, member: Arc<MemberDescriptor>, null_safe: bool) -> Self {
        let guarded = null_safe || base.in_null_safe_chain();
        let value_type = if guarded {
            member.value_type().to_nullable()
        } else {
            member.value_type()
        };
        Self {
            base: Box::new(base),
            member,
            null_safe,
            value_type,
        }
    }

    pub fn value_type(&self) -> StaticType {
        self.value_type
    }
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Literal),

    /// The instance the predicate is evaluated against.
    Root(TypeKey),

    Member(MemberAccess),

    Compare {
        op: CompareOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    Logical {
        op: LogicalOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    Not(Box<Node>),
}

impl Node {
    pub fn literal(literal: Literal) -> Self {
        Node::Literal(literal)
    }

    pub fn member(base: Node, member: Arc<MemberDescriptor>, null_safe: bool) -> Self {
        Node::Member(MemberAccess::new(base, member, null_safe))
    }

    pub fn compare(op: CompareOp, lhs: Node, rhs: Node) -> Self {
        Node::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn and(lhs: Node, rhs: Node) -> Self {
        Node::Logical {
            op: LogicalOp::And,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn or(lhs: Node, rhs: Node) -> Self {
        Node::Logical {
            op: LogicalOp::Or,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn not(operand: Node) -> Self {
        Node::Not(Box::new(operand))
    }

    pub fn value_type(&self) -> StaticType {
        match self {
            Node::Literal(literal) => literal.static_type(),
            Node::Root(key) => StaticType::of(ValueType::Object(*key)),
            Node::Member(access) => access.value_type(),
            Node::Compare { .. } | Node::Logical { .. } | Node::Not(_) => StaticType::bool(),
        }
    }

    /// True when some `?.` earlier in this member chain may end it with null.
    pub fn in_null_safe_chain(&self) -> bool {
        match self {
            Node::Member(access) => access.null_safe || access.base.in_null_safe_chain(),
            _ => false,
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(literal) => write!(f, "{}", literal),
            Node::Root(_) => Ok(()),
            Node::Member(access) => match access.base.as_ref() {
                Node::Root(_) => write!(f, "{}", access.member.name()),
                base => {
                    let sep = if access.null_safe { "?." } else { "." };
                    write!(f, "{}{}{}", base, sep, access.member.name())
                }
            },
            Node::Compare { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Node::Logical { op, lhs, rhs } => write!(f, "({} {} {})", lhs, op, rhs),
            Node::Not(operand) => write!(f, "!{}", operand),
        }
    }
}
