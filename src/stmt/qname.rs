//! Qualified names, revisions and prefixed references.

use std::fmt;

use smol_str::SmolStr;

use super::argument::ArgumentError;

// ============================================================================
// REVISION
// ============================================================================

/// A module revision date in `YYYY-MM-DD` form.
///
/// The textual form sorts chronologically, so ordering compares the string.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(SmolStr);

impl Revision {
    /// Parse and validate a revision date.
    pub fn parse(text: &str) -> Result<Self, ArgumentError> {
        let bytes = text.as_bytes();
        let shape_ok = bytes.len() == 10
            && bytes[4] == b'-'
            && bytes[7] == b'-'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !shape_ok {
            return Err(ArgumentError::new("revision date", text));
        }
        let month: u32 = text[5..7].parse().unwrap_or(0);
        let day: u32 = text[8..10].parse().unwrap_or(0);
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return Err(ArgumentError::new("revision date", text));
        }
        Ok(Self(SmolStr::new(text)))
    }

    /// The date as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({})", self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// QNAME
// ============================================================================

/// The namespace half of a [`QName`]: module namespace URI plus revision.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QNameModule {
    pub namespace: SmolStr,
    pub revision: Option<Revision>,
}

impl QNameModule {
    pub fn new(namespace: impl Into<SmolStr>, revision: Option<Revision>) -> Self {
        Self {
            namespace: namespace.into(),
            revision,
        }
    }
}

impl fmt::Debug for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "{}?revision={}", self.namespace, rev),
            None => f.write_str(&self.namespace),
        }
    }
}

/// A namespace-qualified name.
///
/// Schema nodes, identities, features, typedefs and groupings are all keyed by
/// QName once their defining module is known.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub module: QNameModule,
    pub local: SmolStr,
}

impl QName {
    pub fn new(module: QNameModule, local: impl Into<SmolStr>) -> Self {
        Self {
            module,
            local: local.into(),
        }
    }

    /// Same namespace, different local name.
    pub fn sibling(&self, local: impl Into<SmolStr>) -> Self {
        Self::new(self.module.clone(), local)
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}){}", self.module, self.local)
    }
}

// ============================================================================
// PREFIXED NAME
// ============================================================================

/// An unresolved `[prefix:]identifier` reference as written in source.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixedName {
    pub prefix: Option<SmolStr>,
    pub local: SmolStr,
}

impl PrefixedName {
    /// Parse `prefix:identifier` or a bare `identifier`.
    pub fn parse(text: &str) -> Result<Self, ArgumentError> {
        let (prefix, local) = match text.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, text),
        };
        if prefix.is_some_and(|p| !is_identifier(p)) || !is_identifier(local) {
            return Err(ArgumentError::new("identifier reference", text));
        }
        Ok(Self {
            prefix: prefix.map(SmolStr::new),
            local: SmolStr::new(local),
        })
    }

    /// An unprefixed reference.
    pub fn local(local: impl Into<SmolStr>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }
}

impl fmt::Debug for PrefixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for PrefixedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// Check the YANG `identifier` production: a letter or underscore followed by
/// letters, digits, underscores, hyphens and dots.
pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revision_parse() {
        assert!(Revision::parse("2024-02-29").is_ok());
        assert!(Revision::parse("2024-13-01").is_err());
        assert!(Revision::parse("2024-1-01").is_err());
        assert!(Revision::parse("abcd-ef-gh").is_err());
    }

    #[test]
    fn test_revision_orders_chronologically() {
        let older = Revision::parse("2019-06-30").unwrap();
        let newer = Revision::parse("2020-01-01").unwrap();
        assert!(older < newer);
    }

    #[test]
    fn test_prefixed_name_parse() {
        let name = PrefixedName::parse("if:interface-ref").unwrap();
        assert_eq!(name.prefix.as_deref(), Some("if"));
        assert_eq!(name.local, "interface-ref");

        let bare = PrefixedName::parse("ifIndex").unwrap();
        assert_eq!(bare.prefix, None);
        assert_eq!(bare.to_string(), "ifIndex");

        assert!(PrefixedName::parse("1abc").is_err());
        assert!(PrefixedName::parse("a:b:c").is_err());
        assert!(PrefixedName::parse(":x").is_err());
    }

    #[test]
    fn test_qname_display() {
        let module = QNameModule::new("urn:bar", Revision::parse("2013-07-03").ok());
        let qname = QName::new(module, "ifEntry");
        assert_eq!(qname.to_string(), "(urn:bar?revision=2013-07-03)ifEntry");
        assert_eq!(qname.sibling("ifIndex").local, "ifIndex");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("_x.y-z9"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("-x"));
        assert!(!is_identifier("a b"));
    }
}
