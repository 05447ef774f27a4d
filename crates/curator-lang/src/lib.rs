pub mod ast;
pub mod data;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::*;
pub use data::{Dataset, DatasetError, Value};
pub use eval::{evaluate, evaluate_expr, EvalError};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
