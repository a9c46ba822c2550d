//! Boolean filter language over whitelisted host members.
//!
//! Syntax:
//!   Member                  - boolean member
//!   Member.Child            - member of a member
//!   Member?.Child           - null-safe: a null `Member` makes the chain null
//!   a = b, a != b, a <> b   - equality
//!   a > b, a >= b, ...      - ordering (numbers and timestamps)
//!   expr1 and expr2         - AND (also `;`)
//!   expr1 or expr2          - OR (also `,`, lower precedence than AND)
//!   !expr                   - NOT
//!   (expr)                  - grouping
//!
//! Literals: `42`, `3.14`, `'text'`, `"text"`, `true`, `false`, `null`,
//! `2019-01-01`, `2019-01-01T12:00:00.000+01:00`.

mod ast;
mod eval;
mod lexer;
mod literal;
mod parser;
mod token;

pub use ast::*;
pub use eval::evaluate;
pub use lexer::{Tokenizer, tokenize};
pub(crate) use parser::parse_filter;
pub use token::{Token, TokenKind};
