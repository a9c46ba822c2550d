//! Reference evaluator for parsed filters.

use std::cmp::Ordering;

use super::ast::{CompareOp, LogicalOp, MemberAccess, Node};
use crate::error::EvalError;
use crate::registry::{ObjectRef, Value};

/// Progress along a member chain. `Ended` means a `?.` met a null base.
enum Chain<'a> {
    Value(Value<'a>),
    Ended,
}

/// Evaluate `node` with `root` standing in for the filtered instance.
pub fn evaluate<'a>(node: &'a Node, root: ObjectRef<'a>) -> Result<Value<'a>, EvalError> {
    match node {
        Node::Literal(literal) => Ok(literal.to_value()),

        Node::Root(_) => Ok(Value::Object(root)),

        Node::Member(access) => match follow(access, root)? {
            Chain::Value(value) => Ok(value),
            Chain::Ended => Ok(Value::Null),
        },

        Node::Compare { op, lhs, rhs } => {
            let lhs = evaluate(lhs, root)?;
            let rhs = evaluate(rhs, root)?;
            compare(*op, &lhs, &rhs).map(Value::Bool)
        }

        Node::Logical { op, lhs, rhs } => {
            let lhs = truth(evaluate(lhs, root)?)?;
            match op {
                LogicalOp::And if !lhs => Ok(Value::Bool(false)),
                LogicalOp::Or if lhs => Ok(Value::Bool(true)),
                _ => truth(evaluate(rhs, root)?).map(Value::Bool),
            }
        }

        Node::Not(inner) => truth(evaluate(inner, root)?).map(|b| Value::Bool(!b)),
    }
}

fn follow<'a>(access: &'a MemberAccess, root: ObjectRef<'a>) -> Result<Chain<'a>, EvalError> {
    let base = match access.base.as_ref() {
        Node::Member(inner) => match follow(inner, root)? {
            Chain::Value(value) => value,
            Chain::Ended => return Ok(Chain::Ended),
        },
        other => evaluate(other, root)?,
    };

    let member = &access.member;
    match base {
        Value::Object(owner) if owner.key() == member.declaring_type() => {
            Ok(Chain::Value(member.read(owner)))
        }
        Value::Null if access.null_safe => Ok(Chain::Ended),
        Value::Null => Err(EvalError::NullReference {
            member: member.name().to_owned(),
        }),
        other => Err(EvalError::NotAnObject {
            member: member.name().to_owned(),
            found: other.value_type(),
        }),
    }
}

/// `null` reads as false in a boolean context.
fn truth(value: Value<'_>) -> Result<bool, EvalError> {
    match value {
        Value::Bool(b) => Ok(b),
        Value::Null => Ok(false),
        other => Err(EvalError::NotBoolean {
            found: other.value_type(),
        }),
    }
}

fn compare(op: CompareOp, lhs: &Value<'_>, rhs: &Value<'_>) -> Result<bool, EvalError> {
    if lhs.is_null() || rhs.is_null() {
        let equal = lhs.is_null() && rhs.is_null();
        return Ok(match op {
            CompareOp::Eq => equal,
            CompareOp::Ne => !equal,
            _ => false,
        });
    }

    let ordering = match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.cmp(b),
        (Value::Timestamp(a), Value::Timestamp(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) if !op.is_ordering() => a.cmp(b),
        (Value::String(a), Value::String(b)) if !op.is_ordering() => a.cmp(b),
        (Value::Object(a), Value::Object(b)) if !op.is_ordering() && a.key() == b.key() => {
            if a == b {
                Ordering::Equal
            } else {
                Ordering::Less
            }
        }
        (a, b) if a.value_type() == b.value_type() => {
            return Err(EvalError::Unordered {
                op,
                operand: a.value_type(),
            });
        }
        (a, b) => {
            return Err(EvalError::TypeMismatch {
                op,
                left: a.value_type(),
                right: b.value_type(),
            });
        }
    };

    Ok(match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    })
}
