//! Typed statement arguments.
//!
//! Every core keyword declares an [`ArgumentShape`]; the raw string from the
//! declared tree is parsed into an [`Argument`] at Statement-Definition time.
//! Some grammar is version dependent: `if-feature` boolean expressions are only
//! accepted in YANG 1.1 sources.

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

use super::qname::{PrefixedName, Revision, is_identifier};

/// A raw argument that does not fit the shape its statement requires.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid {expected} '{text}'")]
pub struct ArgumentError {
    pub expected: &'static str,
    pub text: SmolStr,
}

impl ArgumentError {
    pub fn new(expected: &'static str, text: impl Into<SmolStr>) -> Self {
        Self {
            expected,
            text: text.into(),
        }
    }
}

// ============================================================================
// ENUMERATED ARGUMENT VALUES
// ============================================================================

/// The YANG language version a source declares.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum YangVersion {
    #[default]
    V1,
    V1_1,
}

impl YangVersion {
    pub fn parse(text: &str) -> Result<Self, ArgumentError> {
        match text {
            "1" | "1.0" => Ok(YangVersion::V1),
            "1.1" => Ok(YangVersion::V1_1),
            _ => Err(ArgumentError::new("yang-version", text)),
        }
    }
}

impl fmt::Display for YangVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YangVersion::V1 => "1",
            YangVersion::V1_1 => "1.1",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    Current,
    Deprecated,
    Obsolete,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum OrderedBy {
    #[default]
    System,
    User,
}

/// The four `deviate` instructions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DeviateKind {
    NotSupported,
    Add,
    Replace,
    Delete,
}

impl fmt::Display for DeviateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviateKind::NotSupported => "not-supported",
            DeviateKind::Add => "add",
            DeviateKind::Replace => "replace",
            DeviateKind::Delete => "delete",
        })
    }
}

// ============================================================================
// SCHEMA NODE IDENTIFIER
// ============================================================================

/// A schema node identifier: `/a:b/a:c` (absolute) or `b/c` (descendant).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SchemaNodeId {
    pub absolute: bool,
    pub steps: Vec<PrefixedName>,
}

impl SchemaNodeId {
    pub fn parse(text: &str) -> Result<Self, ArgumentError> {
        let trimmed = text.trim();
        let (absolute, rest) = match trimmed.strip_prefix('/') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let steps = rest
            .split('/')
            .map(|step| PrefixedName::parse(step.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ArgumentError::new("schema node identifier", text))?;
        Ok(Self { absolute, steps })
    }
}

impl fmt::Debug for SchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for SchemaNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if self.absolute || i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}

// ============================================================================
// IF-FEATURE EXPRESSIONS
// ============================================================================

/// A parsed `if-feature` predicate.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum IfFeatureExpr {
    Feature(PrefixedName),
    Not(Box<IfFeatureExpr>),
    And(Vec<IfFeatureExpr>),
    Or(Vec<IfFeatureExpr>),
}

impl IfFeatureExpr {
    /// Parse an expression. YANG 1.0 only allows a single feature reference.
    pub fn parse(text: &str, version: YangVersion) -> Result<Self, ArgumentError> {
        let err = || ArgumentError::new("if-feature expression", text);
        let tokens = tokenize_if_feature(text);
        let mut parser = IfFeatureParser { tokens, pos: 0 };
        let expr = parser.parse_or().ok_or_else(err)?;
        if parser.pos != parser.tokens.len() {
            return Err(err());
        }
        if version == YangVersion::V1 && !matches!(expr, IfFeatureExpr::Feature(_)) {
            return Err(ArgumentError::new("YANG 1.0 if-feature reference", text));
        }
        Ok(expr)
    }

    /// Evaluate against a feature oracle, short-circuiting like the boolean
    /// operators it models.
    pub fn evaluate<E>(
        &self,
        oracle: &mut impl FnMut(&PrefixedName) -> Result<bool, E>,
    ) -> Result<bool, E> {
        match self {
            IfFeatureExpr::Feature(name) => oracle(name),
            IfFeatureExpr::Not(inner) => Ok(!inner.evaluate(oracle)?),
            IfFeatureExpr::And(terms) => {
                for term in terms {
                    if !term.evaluate(oracle)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            IfFeatureExpr::Or(terms) => {
                for term in terms {
                    if term.evaluate(oracle)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Every feature referenced by this expression, in textual order.
    pub fn features(&self) -> Vec<&PrefixedName> {
        let mut out = Vec::new();
        self.collect_features(&mut out);
        out
    }

    fn collect_features<'a>(&'a self, out: &mut Vec<&'a PrefixedName>) {
        match self {
            IfFeatureExpr::Feature(name) => out.push(name),
            IfFeatureExpr::Not(inner) => inner.collect_features(out),
            IfFeatureExpr::And(terms) | IfFeatureExpr::Or(terms) => {
                for term in terms {
                    term.collect_features(out);
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum IfFeatureToken<'a> {
    Open,
    Close,
    Word(&'a str),
}

fn tokenize_if_feature(text: &str) -> Vec<IfFeatureToken<'_>> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (i, c) in text.char_indices() {
        let delimiter = c.is_whitespace() || c == '(' || c == ')';
        if delimiter {
            if let Some(s) = start.take() {
                tokens.push(IfFeatureToken::Word(&text[s..i]));
            }
            match c {
                '(' => tokens.push(IfFeatureToken::Open),
                ')' => tokens.push(IfFeatureToken::Close),
                _ => {}
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        tokens.push(IfFeatureToken::Word(&text[s..]));
    }
    tokens
}

struct IfFeatureParser<'a> {
    tokens: Vec<IfFeatureToken<'a>>,
    pos: usize,
}

impl IfFeatureParser<'_> {
    fn peek_word(&self) -> Option<&str> {
        match self.tokens.get(self.pos) {
            Some(IfFeatureToken::Word(w)) => Some(*w),
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Option<IfFeatureExpr> {
        let mut terms = vec![self.parse_and()?];
        while self.peek_word() == Some("or") {
            self.pos += 1;
            terms.push(self.parse_and()?);
        }
        Some(if terms.len() == 1 {
            terms.remove(0)
        } else {
            IfFeatureExpr::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Option<IfFeatureExpr> {
        let mut factors = vec![self.parse_factor()?];
        while self.peek_word() == Some("and") {
            self.pos += 1;
            factors.push(self.parse_factor()?);
        }
        Some(if factors.len() == 1 {
            factors.remove(0)
        } else {
            IfFeatureExpr::And(factors)
        })
    }

    fn parse_factor(&mut self) -> Option<IfFeatureExpr> {
        match *self.tokens.get(self.pos)? {
            IfFeatureToken::Open => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.tokens.get(self.pos) {
                    Some(IfFeatureToken::Close) => {
                        self.pos += 1;
                        Some(inner)
                    }
                    _ => None,
                }
            }
            IfFeatureToken::Close => None,
            IfFeatureToken::Word("not") => {
                self.pos += 1;
                Some(IfFeatureExpr::Not(Box::new(self.parse_factor()?)))
            }
            IfFeatureToken::Word(word) => {
                if matches!(word, "and" | "or") {
                    return None;
                }
                let name = PrefixedName::parse(word).ok()?;
                self.pos += 1;
                Some(IfFeatureExpr::Feature(name))
            }
        }
    }
}

// ============================================================================
// ARGUMENT
// ============================================================================

/// The argument grammar a statement expects.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArgumentShape {
    /// No argument allowed (`input`, `output`).
    None,
    /// Free-form string.
    String,
    /// A single YANG identifier.
    Identifier,
    /// `[prefix:]identifier`.
    PrefixedName,
    SchemaNodeId,
    Boolean,
    /// Integer within inclusive bounds.
    Integer { min: i64, max: i64 },
    /// Positive integer or `unbounded`.
    MaxElements,
    Revision,
    Status,
    OrderedBy,
    Deviate,
    YangVersion,
    IfFeature,
    /// Space separated list of node identifiers (`key`).
    KeyList,
    /// Only `invert-match`.
    Modifier,
}

/// A parsed statement argument.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Argument {
    None,
    String(SmolStr),
    Identifier(SmolStr),
    PrefixedName(PrefixedName),
    SchemaNodeId(SchemaNodeId),
    Boolean(bool),
    Integer(i64),
    /// `None` is `unbounded`.
    MaxElements(Option<u64>),
    Revision(Revision),
    Status(Status),
    OrderedBy(OrderedBy),
    Deviate(DeviateKind),
    YangVersion(YangVersion),
    IfFeature(IfFeatureExpr),
    KeyList(Vec<PrefixedName>),
}

impl Argument {
    /// Parse a raw argument against a shape.
    pub fn parse(
        shape: ArgumentShape,
        raw: Option<&str>,
        version: YangVersion,
    ) -> Result<Argument, ArgumentError> {
        let text = match (shape, raw) {
            (ArgumentShape::None, None) => return Ok(Argument::None),
            (ArgumentShape::None, Some(raw)) => {
                return Err(ArgumentError::new("empty argument", raw));
            }
            (_, None) => return Err(ArgumentError::new("argument", "")),
            (_, Some(raw)) => raw,
        };

        match shape {
            ArgumentShape::None => Ok(Argument::None),
            ArgumentShape::String => Ok(Argument::String(SmolStr::new(text))),
            ArgumentShape::Identifier => {
                if is_identifier(text) {
                    Ok(Argument::Identifier(SmolStr::new(text)))
                } else {
                    Err(ArgumentError::new("identifier", text))
                }
            }
            ArgumentShape::PrefixedName => PrefixedName::parse(text).map(Argument::PrefixedName),
            ArgumentShape::SchemaNodeId => SchemaNodeId::parse(text).map(Argument::SchemaNodeId),
            ArgumentShape::Boolean => match text {
                "true" => Ok(Argument::Boolean(true)),
                "false" => Ok(Argument::Boolean(false)),
                _ => Err(ArgumentError::new("boolean", text)),
            },
            ArgumentShape::Integer { min, max } => match text.parse::<i64>() {
                Ok(value) if (min..=max).contains(&value) => Ok(Argument::Integer(value)),
                _ => Err(ArgumentError::new("integer", text)),
            },
            ArgumentShape::MaxElements => match text {
                "unbounded" => Ok(Argument::MaxElements(None)),
                _ => match text.parse::<u64>() {
                    Ok(value) if value > 0 => Ok(Argument::MaxElements(Some(value))),
                    _ => Err(ArgumentError::new("max-elements value", text)),
                },
            },
            ArgumentShape::Revision => Revision::parse(text).map(Argument::Revision),
            ArgumentShape::Status => match text {
                "current" => Ok(Argument::Status(Status::Current)),
                "deprecated" => Ok(Argument::Status(Status::Deprecated)),
                "obsolete" => Ok(Argument::Status(Status::Obsolete)),
                _ => Err(ArgumentError::new("status", text)),
            },
            ArgumentShape::OrderedBy => match text {
                "system" => Ok(Argument::OrderedBy(OrderedBy::System)),
                "user" => Ok(Argument::OrderedBy(OrderedBy::User)),
                _ => Err(ArgumentError::new("ordered-by value", text)),
            },
            ArgumentShape::Deviate => match text {
                "not-supported" => Ok(Argument::Deviate(DeviateKind::NotSupported)),
                "add" => Ok(Argument::Deviate(DeviateKind::Add)),
                "replace" => Ok(Argument::Deviate(DeviateKind::Replace)),
                "delete" => Ok(Argument::Deviate(DeviateKind::Delete)),
                _ => Err(ArgumentError::new("deviate kind", text)),
            },
            ArgumentShape::YangVersion => YangVersion::parse(text).map(Argument::YangVersion),
            ArgumentShape::IfFeature => IfFeatureExpr::parse(text, version).map(Argument::IfFeature),
            ArgumentShape::KeyList => {
                let keys = text
                    .split_whitespace()
                    .map(PrefixedName::parse)
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|_| ArgumentError::new("key list", text))?;
                if keys.is_empty() {
                    return Err(ArgumentError::new("key list", text));
                }
                Ok(Argument::KeyList(keys))
            }
            ArgumentShape::Modifier => match text {
                "invert-match" => Ok(Argument::String(SmolStr::new(text))),
                _ => Err(ArgumentError::new("modifier", text)),
            },
        }
    }

    pub fn as_identifier(&self) -> Option<&SmolStr> {
        match self {
            Argument::Identifier(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_prefixed_name(&self) -> Option<&PrefixedName> {
        match self {
            Argument::PrefixedName(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_schema_node_id(&self) -> Option<&SchemaNodeId> {
        match self {
            Argument::SchemaNodeId(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Argument::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_if_feature(&self) -> Option<&IfFeatureExpr> {
        match self {
            Argument::IfFeature(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn as_deviate(&self) -> Option<DeviateKind> {
        match self {
            Argument::Deviate(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn as_revision(&self) -> Option<&Revision> {
        match self {
            Argument::Revision(rev) => Some(rev),
            _ => None,
        }
    }

    pub fn as_key_list(&self) -> Option<&[PrefixedName]> {
        match self {
            Argument::KeyList(keys) => Some(keys),
            _ => None,
        }
    }

    /// Any string-valued argument.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(s) | Argument::Identifier(s) => Some(s),
            _ => None,
        }
    }
}
