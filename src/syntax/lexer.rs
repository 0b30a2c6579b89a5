//! Tokenizer for YANG concrete syntax.
//!
//! Comments and whitespace are skipped by the lexer. Quoted strings keep their
//! quotes; the parser unquotes them because double-quoted strings need the
//! column of the opening quote for indentation stripping.

use logos::{FilterResult, Lexer, Logos};

/// A YANG token.
#[derive(Logos, Copy, Clone, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
pub enum Token {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    /// String concatenation operator between quoted strings.
    #[token("+", priority = 3)]
    Plus,
    #[regex(r#""([^"\\]|\\[\s\S])*""#)]
    DoubleQuoted,
    #[regex(r"'[^']*'")]
    SingleQuoted,
    /// Keyword or unquoted string. Cannot contain comment openers.
    #[regex(r#"([^ \t\r\n\f;{}"'/]|/[^ \t\r\n\f;{}"'/*])+"#)]
    Word,
    /// Never emitted: the callback skips the comment or fails.
    #[token("/*", block_comment)]
    BlockComment,
}

/// Skip a `/* ... */` comment. An unterminated comment is an error.
fn block_comment(lex: &mut Lexer<Token>) -> FilterResult<(), ()> {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            FilterResult::Skip
        }
        None => FilterResult::Error(()),
    }
}

impl Token {
    /// Tokens that can serve as a statement argument.
    pub fn is_string(self) -> bool {
        matches!(self, Token::DoubleQuoted | Token::SingleQuoted | Token::Word)
    }

    pub fn is_quoted(self) -> bool {
        matches!(self, Token::DoubleQuoted | Token::SingleQuoted)
    }
}
