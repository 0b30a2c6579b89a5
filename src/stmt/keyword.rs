//! Statement keywords.
//!
//! The core YANG keywords form a closed enumeration; everything else is an
//! extension statement addressed through a `prefix:name` keyword.

use std::fmt;

use super::qname::PrefixedName;

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        /// A core YANG keyword (RFC 7950 section 14).
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            /// All core keywords, in declaration order.
            pub const ALL: &'static [Keyword] = &[$(Keyword::$variant,)*];

            /// The keyword as written in YANG source.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }

            /// Look up a core keyword by its source spelling.
            pub fn from_keyword(text: &str) -> Option<Keyword> {
                match text {
                    $($text => Some(Keyword::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

keywords! {
    Action => "action",
    Anydata => "anydata",
    Anyxml => "anyxml",
    Argument => "argument",
    Augment => "augment",
    Base => "base",
    BelongsTo => "belongs-to",
    Bit => "bit",
    Case => "case",
    Choice => "choice",
    Config => "config",
    Contact => "contact",
    Container => "container",
    Default => "default",
    Description => "description",
    Deviate => "deviate",
    Deviation => "deviation",
    Enum => "enum",
    ErrorAppTag => "error-app-tag",
    ErrorMessage => "error-message",
    Extension => "extension",
    Feature => "feature",
    FractionDigits => "fraction-digits",
    Grouping => "grouping",
    Identity => "identity",
    IfFeature => "if-feature",
    Import => "import",
    Include => "include",
    Input => "input",
    Key => "key",
    Leaf => "leaf",
    LeafList => "leaf-list",
    Length => "length",
    List => "list",
    Mandatory => "mandatory",
    MaxElements => "max-elements",
    MinElements => "min-elements",
    Modifier => "modifier",
    Module => "module",
    Must => "must",
    Namespace => "namespace",
    Notification => "notification",
    OrderedBy => "ordered-by",
    Organization => "organization",
    Output => "output",
    Path => "path",
    Pattern => "pattern",
    Position => "position",
    Prefix => "prefix",
    Presence => "presence",
    Range => "range",
    Reference => "reference",
    Refine => "refine",
    RequireInstance => "require-instance",
    Revision => "revision",
    RevisionDate => "revision-date",
    Rpc => "rpc",
    Status => "status",
    Submodule => "submodule",
    Type => "type",
    Typedef => "typedef",
    Unique => "unique",
    Units => "units",
    Uses => "uses",
    Value => "value",
    When => "when",
    YangVersion => "yang-version",
    YinElement => "yin-element",
}

impl Keyword {
    /// Data definition statements: the nodes a grouping, augment or data node
    /// may contain (RFC 7950 `data-def-stmt`), excluding `uses`.
    pub const fn is_data_definition(self) -> bool {
        matches!(
            self,
            Keyword::Container
                | Keyword::Leaf
                | Keyword::LeafList
                | Keyword::List
                | Keyword::Choice
                | Keyword::Anydata
                | Keyword::Anyxml
        )
    }

    /// Statements that occupy the schema tree namespace of their parent and can
    /// therefore be addressed by a schema node identifier.
    pub const fn is_schema_tree(self) -> bool {
        self.is_data_definition()
            || matches!(
                self,
                Keyword::Case
                    | Keyword::Rpc
                    | Keyword::Action
                    | Keyword::Input
                    | Keyword::Output
                    | Keyword::Notification
            )
    }

    /// Statements that are copied when a grouping is instantiated or an augment
    /// is spliced into its target.
    pub const fn is_copied_schema_content(self) -> bool {
        self.is_schema_tree() && !matches!(self, Keyword::Rpc | Keyword::Input | Keyword::Output)
    }

    /// Statements whose argument is an identifier naming a schema node.
    pub const fn names_schema_node(self) -> bool {
        self.is_schema_tree() && !matches!(self, Keyword::Input | Keyword::Output)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a statement node: a core keyword or an extension QName.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatementKind {
    /// One of the closed set of YANG keywords.
    Core(Keyword),
    /// An extension use, `prefix:name`, resolved at Statement-Definition time.
    Extension(PrefixedName),
}

impl StatementKind {
    /// Classify a raw keyword token.
    ///
    /// Returns `None` for an unprefixed word that is not a core keyword.
    pub fn parse(text: &str) -> Option<StatementKind> {
        if let Some(keyword) = Keyword::from_keyword(text) {
            return Some(StatementKind::Core(keyword));
        }
        let name = PrefixedName::parse(text).ok()?;
        name.prefix.is_some().then_some(StatementKind::Extension(name))
    }

    /// The core keyword, if this is not an extension statement.
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            StatementKind::Core(keyword) => Some(*keyword),
            StatementKind::Extension(_) => None,
        }
    }

    /// Check for a specific core keyword.
    #[inline]
    pub fn is(&self, keyword: Keyword) -> bool {
        matches!(self, StatementKind::Core(k) if *k == keyword)
    }

    /// Whether this is an extension (unknown) statement.
    pub fn is_extension(&self) -> bool {
        matches!(self, StatementKind::Extension(_))
    }
}

impl From<Keyword> for StatementKind {
    fn from(keyword: Keyword) -> Self {
        StatementKind::Core(keyword)
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Core(keyword) => f.write_str(keyword.as_str()),
            StatementKind::Extension(name) => write!(f, "{}", name),
        }
    }
}
