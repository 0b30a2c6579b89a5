//! Recursive-descent reader from tokens to [`DeclaredStatement`] trees.
//!
//! ```text
//! statement = keyword [argument] (";" | "{" statement* "}")
//! argument  = string | quoted ("+" quoted)*
//! ```

use std::ops::Range;
use std::sync::Arc;

use logos::Logos;
use smol_str::SmolStr;
use thiserror::Error;

use super::lexer::Token;
use crate::base::{LineIndex, SourceRef, TextSize};
use crate::stmt::{DeclaredStatement, StatementKind};

/// A source that could not be read into a statement tree.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{at}: {message}")]
pub struct SyntaxError {
    pub at: SourceRef,
    pub message: String,
}

/// Read one YANG source into its declared statement tree.
///
/// `name` is used for source references only (usually the file name).
pub fn parse_source(name: &str, text: &str) -> Result<DeclaredStatement, SyntaxError> {
    let mut parser = Parser::new(name, text)?;
    let root = parser.statement()?;
    if let Some((_, span)) = parser.peek() {
        return Err(parser.error_at(span.start, "unexpected content after the top-level statement"));
    }
    Ok(root)
}

struct Parser<'a> {
    name: Arc<str>,
    text: &'a str,
    lines: LineIndex,
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(name: &str, text: &'a str) -> Result<Self, SyntaxError> {
        let mut parser = Self {
            name: Arc::from(name),
            text,
            lines: LineIndex::new(text),
            tokens: Vec::new(),
            pos: 0,
        };
        let mut lexer = Token::lexer(text);
        while let Some(token) = lexer.next() {
            match token {
                Ok(token) => parser.tokens.push((token, lexer.span())),
                Err(()) => {
                    return Err(parser.error_at(
                        lexer.span().start,
                        format!("unrecognized input '{}'", lexer.slice()),
                    ));
                }
            }
        }
        Ok(parser)
    }

    fn source_ref(&self, offset: usize) -> SourceRef {
        let position = self.lines.line_col(TextSize::from(offset as u32));
        SourceRef::new(self.name.clone(), position)
    }

    fn error_at(&self, offset: usize, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            at: self.source_ref(offset),
            message: message.into(),
        }
    }

    fn error_eof(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(self.text.len(), message)
    }

    fn peek(&self) -> Option<(Token, Range<usize>)> {
        self.tokens.get(self.pos).cloned()
    }

    fn bump(&mut self) -> Option<(Token, Range<usize>)> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn statement(&mut self) -> Result<DeclaredStatement, SyntaxError> {
        let (token, span) = self
            .bump()
            .ok_or_else(|| self.error_eof("expected a statement"))?;
        if token != Token::Word {
            return Err(self.error_at(span.start, "expected a statement keyword"));
        }
        let keyword_text = &self.text[span.clone()];
        let kind = StatementKind::parse(keyword_text).ok_or_else(|| {
            self.error_at(span.start, format!("unknown statement '{}'", keyword_text))
        })?;
        let source_ref = self.source_ref(span.start);

        let argument = match self.peek() {
            Some((token, _)) if token.is_string() => Some(self.argument()?),
            _ => None,
        };

        let (token, end) = self
            .bump()
            .ok_or_else(|| self.error_eof(format!("'{}' is not terminated", kind)))?;
        let mut substatements = Vec::new();
        match token {
            Token::Semicolon => {}
            Token::LBrace => loop {
                match self.peek() {
                    Some((Token::RBrace, _)) => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => substatements.push(Arc::new(self.statement()?)),
                    None => {
                        return Err(self.error_eof(format!("'{}' block is not closed", kind)));
                    }
                }
            },
            _ => {
                return Err(self.error_at(end.start, format!("expected ';' or '{{' after '{}'", kind)));
            }
        }

        Ok(DeclaredStatement::new(kind, argument, substatements, source_ref))
    }

    fn argument(&mut self) -> Result<SmolStr, SyntaxError> {
        let (token, span) = self
            .bump()
            .ok_or_else(|| self.error_eof("expected an argument"))?;
        let mut value = self.unquote(token, span.clone());
        if !token.is_quoted() {
            return Ok(SmolStr::new(value));
        }
        while let Some((Token::Plus, plus)) = self.peek() {
            self.pos += 1;
            match self.bump() {
                Some((next, span)) if next.is_quoted() => value.push_str(&self.unquote(next, span)),
                _ => return Err(self.error_at(plus.end, "expected a quoted string after '+'")),
            }
        }
        Ok(SmolStr::new(value))
    }

    fn unquote(&self, token: Token, span: Range<usize>) -> String {
        let raw = &self.text[span.clone()];
        match token {
            Token::SingleQuoted => raw[1..raw.len() - 1].to_string(),
            Token::DoubleQuoted => {
                let column = self.lines.line_col(TextSize::from(span.start as u32)).col as usize;
                unescape(&strip_indentation(&raw[1..raw.len() - 1], column + 1))
            }
            _ => raw.to_string(),
        }
    }
}

/// Strip layout whitespace from continuation lines of a double-quoted string
/// and trailing whitespace before each line break.
fn strip_indentation(body: &str, indent: usize) -> String {
    let mut out = String::with_capacity(body.len());
    for (i, line) in body.split('\n').enumerate() {
        if i > 0 {
            let trimmed_len = out.trim_end_matches([' ', '\t']).len();
            out.truncate(trimmed_len);
            out.push('\n');
            let mut width = 0;
            let mut rest = line;
            while width < indent {
                match rest.chars().next() {
                    Some(' ') => width += 1,
                    Some('\t') => width += 8,
                    _ => break,
                }
                rest = &rest[1..];
            }
            out.push_str(rest);
        } else {
            out.push_str(line);
        }
    }
    out
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Keyword;

    #[test]
    fn test_parse_module() {
        let module = parse_source(
            "foo.yang",
            "module foo {\n  namespace \"urn:foo\";\n  prefix f;\n  leaf a { type string; }\n}\n",
        )
        .unwrap();
        assert_eq!(module.keyword(), Some(Keyword::Module));
        assert_eq!(module.raw_argument(), Some("foo"));
        assert_eq!(module.substatements().len(), 3);
        assert_eq!(module.first_argument(Keyword::Namespace), Some("urn:foo"));

        let leaf = module.find_first(Keyword::Leaf).unwrap();
        assert_eq!(leaf.source_ref().to_string(), "foo.yang:4:3");
        assert_eq!(leaf.first_argument(Keyword::Type), Some("string"));
    }

    #[test]
    fn test_parse_concatenation_and_escapes() {
        let stmt = parse_source("x", r#"description "a\tb" + 'c\n' + "\"d\"";"#).unwrap();
        assert_eq!(stmt.raw_argument(), Some("a\tbc\\n\"d\""));
    }

    #[test]
    fn test_parse_strips_indentation() {
        let text = "description \"first\n             second  \n   third\";";
        let stmt = parse_source("x", text).unwrap();
        assert_eq!(stmt.raw_argument(), Some("first\nsecond\nthird"));
    }

    #[test]
    fn test_parse_extension_keyword() {
        let stmt = parse_source("x", "container c { ext:note \"hi\"; }").unwrap();
        assert!(stmt.substatements()[0].kind().is_extension());
    }

    #[test]
    fn test_parse_block_comments() {
        let text = "container c/* one */{ /** starred * text **/ leaf a { type string; } }";
        let stmt = parse_source("x", text).unwrap();
        assert_eq!(stmt.raw_argument(), Some("c"));
        assert_eq!(stmt.substatements().len(), 1);

        let err = parse_source("x", "container c { /* open\n}").unwrap_err();
        assert_eq!(err.at.to_string(), "x:1:15");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_source("x", "module m {").is_err());
        assert!(parse_source("x", "bogus x;").is_err());
        assert!(parse_source("x", "leaf a; leaf b;").is_err());
        assert!(parse_source("x", "description \"a\" + b;").is_err());

        let err = parse_source("bad.yang", "module m {\n  leaf x }\n}").unwrap_err();
        assert_eq!(err.at.to_string(), "bad.yang:2:10");
    }
}
