//! `pattern` restrictions: XML Schema regular expressions compiled with the
//! `regex` crate.
//!
//! XSD patterns are implicitly anchored, treat `^` and `$` as literals, and
//! spell class subtraction as `[a-z-[aeiou]]`. Translation rewrites those into
//! `regex` syntax before compiling.

use std::fmt;

use regex::Regex;
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("unknown unicode block '{0}'")]
    UnknownBlock(SmolStr),
    #[error("invalid pattern '{pattern}': {message}")]
    Syntax { pattern: SmolStr, message: String },
}

/// A compiled `pattern` restriction.
#[derive(Clone)]
pub struct Pattern {
    source: SmolStr,
    compiled: Regex,
    invert_match: bool,
}

impl Pattern {
    /// Translate and compile an XSD pattern.
    pub fn new(source: &str, invert_match: bool) -> Result<Self, PatternError> {
        let translated = translate(source)?;
        let compiled = Regex::new(&translated).map_err(|e| PatternError::Syntax {
            pattern: source.into(),
            message: syntax_message(&e.to_string()),
        })?;
        Ok(Self {
            source: source.into(),
            compiled,
            invert_match,
        })
    }

    /// The pattern as written.
    pub fn regex(&self) -> &str {
        &self.source
    }

    /// The anchored `regex` translation.
    pub fn translated(&self) -> &str {
        self.compiled.as_str()
    }

    pub fn invert_match(&self) -> bool {
        self.invert_match
    }

    /// Whether `value` satisfies the restriction, honoring `invert-match`.
    pub fn matches(&self, value: &str) -> bool {
        self.compiled.is_match(value) != self.invert_match
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.invert_match == other.invert_match
    }
}

impl Eq for Pattern {}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("regex", &self.source)
            .field("invert_match", &self.invert_match)
            .finish()
    }
}

fn syntax_message(message: &str) -> String {
    message
        .lines()
        .rev()
        .find(|l| l.starts_with("error:"))
        .unwrap_or(message)
        .trim_start_matches("error:")
        .trim()
        .to_string()
}

const NAME_START: &str = r"_:\p{L}";
const NAME_CHAR: &str = r"\-._:\p{L}\p{Nd}";

/// Rewrite an XSD regular expression into anchored `regex` syntax.
pub(crate) fn translate(xsd: &str) -> Result<String, PatternError> {
    let mut out = String::with_capacity(xsd.len() + 8);
    out.push_str("^(?:");
    let mut depth = 0usize;
    let mut chars = xsd.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                let Some(escaped) = chars.next() else {
                    return Err(PatternError::Syntax {
                        pattern: xsd.into(),
                        message: "trailing backslash".into(),
                    });
                };
                match escaped {
                    'p' | 'P' if chars.peek() == Some(&'{') => {
                        chars.next();
                        let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                        push_property(&mut out, &name, escaped == 'P')?;
                    }
                    'i' => push_class(&mut out, NAME_START, false),
                    'I' => push_class(&mut out, NAME_START, true),
                    'c' => push_class(&mut out, NAME_CHAR, false),
                    'C' => push_class(&mut out, NAME_CHAR, true),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            }
            '[' => {
                depth += 1;
                out.push('[');
            }
            ']' if depth > 0 => {
                depth -= 1;
                out.push(']');
            }
            '-' if depth > 0 && chars.peek() == Some(&'[') => out.push_str("--"),
            '^' | '$' if depth == 0 => {
                out.push('\\');
                out.push(ch);
            }
            '&' | '~' if depth > 0 => {
                out.push('\\');
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }
    out.push_str(")$");
    Ok(out)
}

fn push_class(out: &mut String, body: &str, negated: bool) {
    out.push('[');
    if negated {
        out.push('^');
    }
    out.push_str(body);
    out.push(']');
}

/// `\p{IsBlock}` becomes a code point range; categories pass through.
fn push_property(out: &mut String, name: &str, negated: bool) -> Result<(), PatternError> {
    match name.strip_prefix("Is") {
        Some(block) => {
            let (lo, hi) = unicode_block(block).ok_or_else(|| PatternError::UnknownBlock(block.into()))?;
            push_class(out, &format!(r"\x{{{:X}}}-\x{{{:X}}}", lo, hi), negated);
        }
        None => {
            out.push_str(if negated { r"\P{" } else { r"\p{" });
            out.push_str(name);
            out.push('}');
        }
    }
    Ok(())
}

fn unicode_block(name: &str) -> Option<(u32, u32)> {
    let range = match name {
        "BasicLatin" => (0x0000, 0x007F),
        "Latin-1Supplement" => (0x0080, 0x00FF),
        "LatinExtended-A" => (0x0100, 0x017F),
        "LatinExtended-B" => (0x0180, 0x024F),
        "IPAExtensions" => (0x0250, 0x02AF),
        "SpacingModifierLetters" => (0x02B0, 0x02FF),
        "CombiningDiacriticalMarks" => (0x0300, 0x036F),
        "Greek" | "GreekandCoptic" => (0x0370, 0x03FF),
        "Cyrillic" => (0x0400, 0x04FF),
        "Armenian" => (0x0530, 0x058F),
        "Hebrew" => (0x0590, 0x05FF),
        "Arabic" => (0x0600, 0x06FF),
        "Devanagari" => (0x0900, 0x097F),
        "Thai" => (0x0E00, 0x0E7F),
        "Georgian" => (0x10A0, 0x10FF),
        "HangulJamo" => (0x1100, 0x11FF),
        "LatinExtendedAdditional" => (0x1E00, 0x1EFF),
        "GreekExtended" => (0x1F00, 0x1FFF),
        "GeneralPunctuation" => (0x2000, 0x206F),
        "SuperscriptsandSubscripts" => (0x2070, 0x209F),
        "CurrencySymbols" => (0x20A0, 0x20CF),
        "LetterlikeSymbols" => (0x2100, 0x214F),
        "NumberForms" => (0x2150, 0x218F),
        "Arrows" => (0x2190, 0x21FF),
        "MathematicalOperators" => (0x2200, 0x22FF),
        "MiscellaneousTechnical" => (0x2300, 0x23FF),
        "BoxDrawing" => (0x2500, 0x257F),
        "BlockElements" => (0x2580, 0x259F),
        "GeometricShapes" => (0x25A0, 0x25FF),
        "MiscellaneousSymbols" => (0x2600, 0x26FF),
        "Dingbats" => (0x2700, 0x27BF),
        "CJKSymbolsandPunctuation" => (0x3000, 0x303F),
        "Hiragana" => (0x3040, 0x309F),
        "Katakana" => (0x30A0, 0x30FF),
        "CJKUnifiedIdeographs" => (0x4E00, 0x9FFF),
        "HangulSyllables" => (0xAC00, 0xD7AF),
        "PrivateUseArea" => (0xE000, 0xF8FF),
        "AlphabeticPresentationForms" => (0xFB00, 0xFB4F),
        "HalfwidthandFullwidthForms" => (0xFF00, 0xFFEF),
        "Specials" => (0xFFF0, 0xFFFF),
        _ => return None,
    };
    Some(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("[a-z]+", "^(?:[a-z]+)$")]
    #[case("a^b$", r"^(?:a\^b\$)$")]
    #[case("[^a$]", "^(?:[^a$])$")]
    #[case("[a-z-[aeiou]]", "^(?:[a-z--[aeiou]])$")]
    #[case(r"\p{IsBasicLatin}", r"^(?:[\x{0}-\x{7F}])$")]
    #[case(r"\p{Lu}\P{Nd}", r"^(?:\p{Lu}\P{Nd})$")]
    #[case(r"\i\c*", r"^(?:[_:\p{L}][\-._:\p{L}\p{Nd}]*)$")]
    fn test_translate(#[case] xsd: &str, #[case] expected: &str) {
        assert_eq!(translate(xsd).unwrap(), expected);
    }

    #[test]
    fn test_pattern_is_anchored() {
        let pattern = Pattern::new("[a-z]+", false).unwrap();
        assert!(pattern.matches("abc"));
        assert!(!pattern.matches("abc1"));
        assert!(!pattern.matches("1abc"));
    }

    #[test]
    fn test_alternation_stays_anchored() {
        let pattern = Pattern::new("up|down", false).unwrap();
        assert!(pattern.matches("down"));
        assert!(!pattern.matches("upward"));
    }

    #[test]
    fn test_class_subtraction() {
        let pattern = Pattern::new("[a-z-[aeiou]]+", false).unwrap();
        assert!(pattern.matches("xyz"));
        assert!(!pattern.matches("xaz"));
    }

    #[test]
    fn test_block_escape() {
        let pattern = Pattern::new(r"\p{IsBasicLatin}+", false).unwrap();
        assert!(pattern.matches("plain"));
        assert!(!pattern.matches("naïve"));
    }

    #[test]
    fn test_invert_match() {
        let pattern = Pattern::new("admin", true).unwrap();
        assert!(pattern.matches("operator"));
        assert!(!pattern.matches("admin"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(Pattern::new("[a-", false), Err(PatternError::Syntax { .. })));
        assert!(matches!(Pattern::new("a\\", false), Err(PatternError::Syntax { .. })));
        assert!(matches!(
            Pattern::new(r"\p{IsKlingon}", false),
            Err(PatternError::UnknownBlock(name)) if name == "Klingon"
        ));
    }
}
