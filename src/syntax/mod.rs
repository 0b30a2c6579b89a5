//! YANG concrete-syntax reader.
//!
//! Turns source text into [`DeclaredStatement`](crate::stmt::DeclaredStatement)
//! trees. The reactor itself only ever sees declared trees; this reader exists
//! so builds can be driven from text.
//!
//! Lexer (logos) → tokens → recursive descent → declared tree

mod lexer;
mod parser;

pub use lexer::Token;
pub use parser::{SyntaxError, parse_source};
