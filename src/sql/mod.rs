//! SQL front end: tokens, lexer, AST and the recursive-descent parser.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::Statement;
pub use lexer::Lexer;
pub use parser::{parse_batch, Parser};
pub use token::{SpannedToken, Token};
