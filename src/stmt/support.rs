//! Statement support descriptors.
//!
//! Core keywords form a closed table: each maps to a [`StatementSupport`] giving
//! its argument shape, the YANG version that introduced it and the substatements
//! it may carry with their cardinality. Extension keywords are open: every
//! `extension` statement registers an [`ExtensionSupport`] in an
//! [`ExtensionTable`], which the reactor consults when it meets `prefix:name`.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::argument::{ArgumentShape, DeviateKind, YangVersion};
use super::keyword::Keyword;
use super::keyword::Keyword as K;
use super::qname::QName;

// ============================================================================
// CARDINALITY
// ============================================================================

/// How many times a substatement may appear.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cardinality {
    /// 0..1
    Optional,
    /// 1
    Mandatory,
    /// 0..n
    Any,
    /// 1..n
    AtLeastOne,
}

impl Cardinality {
    pub const fn min(self) -> usize {
        match self {
            Cardinality::Optional | Cardinality::Any => 0,
            Cardinality::Mandatory | Cardinality::AtLeastOne => 1,
        }
    }

    /// `None` means unbounded.
    pub const fn max(self) -> Option<usize> {
        match self {
            Cardinality::Optional | Cardinality::Mandatory => Some(1),
            Cardinality::Any | Cardinality::AtLeastOne => None,
        }
    }
}

/// One allowed substatement of a core statement.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SubstatementRule {
    pub keyword: Keyword,
    pub cardinality: Cardinality,
    /// First YANG version allowing this substatement here.
    pub since: YangVersion,
    /// Narrower cardinality enforced in YANG 1.0 sources.
    pub yang10: Option<Cardinality>,
}

impl SubstatementRule {
    const fn new(keyword: Keyword, cardinality: Cardinality) -> Self {
        Self {
            keyword,
            cardinality,
            since: YangVersion::V1,
            yang10: None,
        }
    }

    const fn v11(mut self) -> Self {
        self.since = YangVersion::V1_1;
        self
    }

    const fn narrowed_in_yang10(mut self, cardinality: Cardinality) -> Self {
        self.yang10 = Some(cardinality);
        self
    }

    /// Cardinality in effect for a source of the given version.
    pub fn cardinality_for(&self, version: YangVersion) -> Cardinality {
        match (version, self.yang10) {
            (YangVersion::V1, Some(narrow)) => narrow,
            _ => self.cardinality,
        }
    }
}

const fn opt(keyword: Keyword) -> SubstatementRule {
    SubstatementRule::new(keyword, Cardinality::Optional)
}

const fn one(keyword: Keyword) -> SubstatementRule {
    SubstatementRule::new(keyword, Cardinality::Mandatory)
}

const fn any(keyword: Keyword) -> SubstatementRule {
    SubstatementRule::new(keyword, Cardinality::Any)
}

const fn many(keyword: Keyword) -> SubstatementRule {
    SubstatementRule::new(keyword, Cardinality::AtLeastOne)
}

// ============================================================================
// STATEMENT SUPPORT
// ============================================================================

/// Outcome of asking whether a substatement is allowed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RuleLookup {
    Allowed(Cardinality),
    /// Allowed here, but only in YANG 1.1 sources.
    RequiresYang11,
    NotAllowed,
}

/// Descriptor for a core statement kind.
#[derive(Copy, Clone, Debug)]
pub struct StatementSupport {
    pub keyword: Keyword,
    pub argument: ArgumentShape,
    pub since: YangVersion,
    pub substatements: &'static [SubstatementRule],
}

impl StatementSupport {
    /// Look up the descriptor for a core keyword.
    pub fn of(keyword: Keyword) -> StatementSupport {
        let (argument, substatements) = descriptor(keyword);
        let since = match keyword {
            Keyword::Action | Keyword::Anydata | Keyword::Modifier => YangVersion::V1_1,
            _ => YangVersion::V1,
        };
        StatementSupport {
            keyword,
            argument,
            since,
            substatements,
        }
    }

    /// Check whether `child` may appear under this statement in a source of the
    /// given version.
    pub fn rule_for(&self, child: Keyword, version: YangVersion) -> RuleLookup {
        match self.substatements.iter().find(|r| r.keyword == child) {
            None => RuleLookup::NotAllowed,
            Some(rule) if rule.since > version => RuleLookup::RequiresYang11,
            Some(rule) => RuleLookup::Allowed(rule.cardinality_for(version)),
        }
    }

    /// Substatements with a lower bound, for the missing-statement check.
    pub fn required(&self, version: YangVersion) -> impl Iterator<Item = Keyword> + '_ {
        self.substatements
            .iter()
            .filter(move |r| r.since <= version && r.cardinality_for(version).min() > 0)
            .map(|r| r.keyword)
    }
}

const MODULE: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Augment),
    any(K::Choice),
    opt(K::Contact),
    any(K::Container),
    opt(K::Description),
    any(K::Deviation),
    any(K::Extension),
    any(K::Feature),
    any(K::Grouping),
    any(K::Identity),
    any(K::Import),
    any(K::Include),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    one(K::Namespace),
    any(K::Notification),
    opt(K::Organization),
    one(K::Prefix),
    opt(K::Reference),
    any(K::Revision),
    any(K::Rpc),
    any(K::Typedef),
    any(K::Uses),
    opt(K::YangVersion),
];

const SUBMODULE: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Augment),
    one(K::BelongsTo),
    any(K::Choice),
    opt(K::Contact),
    any(K::Container),
    opt(K::Description),
    any(K::Deviation),
    any(K::Extension),
    any(K::Feature),
    any(K::Grouping),
    any(K::Identity),
    any(K::Import),
    any(K::Include),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Notification),
    opt(K::Organization),
    opt(K::Reference),
    any(K::Revision),
    any(K::Rpc),
    any(K::Typedef),
    any(K::Uses),
    opt(K::YangVersion),
];

const IMPORT: &[SubstatementRule] = &[
    opt(K::Description).v11(),
    one(K::Prefix),
    opt(K::Reference).v11(),
    opt(K::RevisionDate),
];

const INCLUDE: &[SubstatementRule] = &[
    opt(K::Description).v11(),
    opt(K::Reference).v11(),
    opt(K::RevisionDate),
];

const BELONGS_TO: &[SubstatementRule] = &[one(K::Prefix)];

const DESCRIBED: &[SubstatementRule] = &[opt(K::Description), opt(K::Reference)];

const EXTENSION: &[SubstatementRule] = &[
    opt(K::Argument),
    opt(K::Description),
    opt(K::Reference),
    opt(K::Status),
];

const ARGUMENT: &[SubstatementRule] = &[opt(K::YinElement)];

const FEATURE: &[SubstatementRule] = &[
    opt(K::Description),
    any(K::IfFeature),
    opt(K::Reference),
    opt(K::Status),
];

const IDENTITY: &[SubstatementRule] = &[
    any(K::Base).narrowed_in_yang10(Cardinality::Optional),
    opt(K::Description),
    any(K::IfFeature).v11(),
    opt(K::Reference),
    opt(K::Status),
];

const TYPEDEF: &[SubstatementRule] = &[
    opt(K::Default),
    opt(K::Description),
    opt(K::Reference),
    opt(K::Status),
    one(K::Type),
    opt(K::Units),
];

const TYPE: &[SubstatementRule] = &[
    any(K::Base).narrowed_in_yang10(Cardinality::Optional),
    any(K::Bit),
    any(K::Enum),
    opt(K::FractionDigits),
    opt(K::Length),
    opt(K::Path),
    any(K::Pattern),
    opt(K::Range),
    opt(K::RequireInstance),
    any(K::Type),
];

const CONSTRAINT: &[SubstatementRule] = &[
    opt(K::Description),
    opt(K::ErrorAppTag),
    opt(K::ErrorMessage),
    opt(K::Reference),
];

const PATTERN: &[SubstatementRule] = &[
    opt(K::Description),
    opt(K::ErrorAppTag),
    opt(K::ErrorMessage),
    opt(K::Modifier).v11(),
    opt(K::Reference),
];

const ENUM: &[SubstatementRule] = &[
    opt(K::Description),
    any(K::IfFeature).v11(),
    opt(K::Reference),
    opt(K::Status),
    opt(K::Value),
];

const BIT: &[SubstatementRule] = &[
    opt(K::Description),
    any(K::IfFeature).v11(),
    opt(K::Position),
    opt(K::Reference),
    opt(K::Status),
];

const CONTAINER: &[SubstatementRule] = &[
    any(K::Action).v11(),
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    opt(K::Config),
    any(K::Container),
    opt(K::Description),
    any(K::Grouping),
    any(K::IfFeature),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Must),
    any(K::Notification).v11(),
    opt(K::Presence),
    opt(K::Reference),
    opt(K::Status),
    any(K::Typedef),
    any(K::Uses),
    opt(K::When),
];

const LEAF: &[SubstatementRule] = &[
    opt(K::Config),
    opt(K::Default),
    opt(K::Description),
    any(K::IfFeature),
    opt(K::Mandatory),
    any(K::Must),
    opt(K::Reference),
    opt(K::Status),
    one(K::Type),
    opt(K::Units),
    opt(K::When),
];

const LEAF_LIST: &[SubstatementRule] = &[
    opt(K::Config),
    any(K::Default).v11(),
    opt(K::Description),
    any(K::IfFeature),
    opt(K::MaxElements),
    opt(K::MinElements),
    any(K::Must),
    opt(K::OrderedBy),
    opt(K::Reference),
    opt(K::Status),
    one(K::Type),
    opt(K::Units),
    opt(K::When),
];

const LIST: &[SubstatementRule] = &[
    any(K::Action).v11(),
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    opt(K::Config),
    any(K::Container),
    opt(K::Description),
    any(K::Grouping),
    any(K::IfFeature),
    opt(K::Key),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    opt(K::MaxElements),
    opt(K::MinElements),
    any(K::Must),
    any(K::Notification).v11(),
    opt(K::OrderedBy),
    opt(K::Reference),
    opt(K::Status),
    any(K::Typedef),
    any(K::Unique),
    any(K::Uses),
    opt(K::When),
];

const CHOICE: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Case),
    any(K::Choice).v11(),
    opt(K::Config),
    any(K::Container),
    opt(K::Default),
    opt(K::Description),
    any(K::IfFeature),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    opt(K::Mandatory),
    opt(K::Reference),
    opt(K::Status),
    opt(K::When),
];

const CASE: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    any(K::Container),
    opt(K::Description),
    any(K::IfFeature),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    opt(K::Reference),
    opt(K::Status),
    any(K::Uses),
    opt(K::When),
];

const ANYDATA: &[SubstatementRule] = &[
    opt(K::Config),
    opt(K::Description),
    any(K::IfFeature),
    opt(K::Mandatory),
    any(K::Must),
    opt(K::Reference),
    opt(K::Status),
    opt(K::When),
];

const GROUPING: &[SubstatementRule] = &[
    any(K::Action).v11(),
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    any(K::Container),
    opt(K::Description),
    any(K::Grouping),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Notification).v11(),
    opt(K::Reference),
    opt(K::Status),
    any(K::Typedef),
    any(K::Uses),
];

const USES: &[SubstatementRule] = &[
    any(K::Augment),
    opt(K::Description),
    any(K::IfFeature),
    any(K::Refine),
    opt(K::Reference),
    opt(K::Status),
    opt(K::When),
];

const REFINE: &[SubstatementRule] = &[
    opt(K::Config),
    any(K::Default),
    opt(K::Description),
    any(K::IfFeature).v11(),
    opt(K::Mandatory),
    opt(K::MaxElements),
    opt(K::MinElements),
    any(K::Must),
    opt(K::Presence),
    opt(K::Reference),
];

const AUGMENT: &[SubstatementRule] = &[
    any(K::Action).v11(),
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Case),
    any(K::Choice),
    any(K::Container),
    opt(K::Description),
    any(K::IfFeature),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Notification).v11(),
    opt(K::Reference),
    opt(K::Status),
    any(K::Uses),
    opt(K::When),
];

const RPC: &[SubstatementRule] = &[
    opt(K::Description),
    any(K::Grouping),
    any(K::IfFeature),
    opt(K::Input),
    opt(K::Output),
    opt(K::Reference),
    opt(K::Status),
    any(K::Typedef),
];

const INPUT: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    any(K::Container),
    any(K::Grouping),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Must).v11(),
    any(K::Typedef),
    any(K::Uses),
];

const NOTIFICATION: &[SubstatementRule] = &[
    any(K::Anydata).v11(),
    any(K::Anyxml),
    any(K::Choice),
    any(K::Container),
    opt(K::Description),
    any(K::Grouping),
    any(K::IfFeature).v11(),
    any(K::Leaf),
    any(K::LeafList),
    any(K::List),
    any(K::Must).v11(),
    opt(K::Reference),
    opt(K::Status),
    any(K::Typedef),
    any(K::Uses),
];

const DEVIATION: &[SubstatementRule] = &[
    opt(K::Description),
    many(K::Deviate),
    opt(K::Reference),
];

const DEVIATE: &[SubstatementRule] = &[
    opt(K::Config),
    any(K::Default),
    opt(K::Mandatory),
    opt(K::MaxElements),
    opt(K::MinElements),
    any(K::Must),
    opt(K::Type),
    any(K::Unique),
    opt(K::Units),
];

const WHEN: &[SubstatementRule] = &[opt(K::Description), opt(K::Reference)];

const NONE: &[SubstatementRule] = &[];

fn descriptor(keyword: Keyword) -> (ArgumentShape, &'static [SubstatementRule]) {
    use super::argument::ArgumentShape as A;
    match keyword {
        K::Action => (A::Identifier, RPC),
        K::Anydata | K::Anyxml => (A::Identifier, ANYDATA),
        K::Argument => (A::Identifier, ARGUMENT),
        K::Augment => (A::SchemaNodeId, AUGMENT),
        K::Base => (A::PrefixedName, NONE),
        K::BelongsTo => (A::Identifier, BELONGS_TO),
        K::Bit => (A::Identifier, BIT),
        K::Case => (A::Identifier, CASE),
        K::Choice => (A::Identifier, CHOICE),
        K::Config => (A::Boolean, NONE),
        K::Contact => (A::String, NONE),
        K::Container => (A::Identifier, CONTAINER),
        K::Default => (A::String, NONE),
        K::Description => (A::String, NONE),
        K::Deviate => (A::Deviate, DEVIATE),
        K::Deviation => (A::SchemaNodeId, DEVIATION),
        K::Enum => (A::String, ENUM),
        K::ErrorAppTag => (A::String, NONE),
        K::ErrorMessage => (A::String, NONE),
        K::Extension => (A::Identifier, EXTENSION),
        K::Feature => (A::Identifier, FEATURE),
        K::FractionDigits => (A::Integer { min: 1, max: 18 }, NONE),
        K::Grouping => (A::Identifier, GROUPING),
        K::Identity => (A::Identifier, IDENTITY),
        K::IfFeature => (A::IfFeature, NONE),
        K::Import => (A::Identifier, IMPORT),
        K::Include => (A::Identifier, INCLUDE),
        K::Input | K::Output => (A::None, INPUT),
        K::Key => (A::KeyList, NONE),
        K::Leaf => (A::Identifier, LEAF),
        K::LeafList => (A::Identifier, LEAF_LIST),
        K::Length => (A::String, CONSTRAINT),
        K::List => (A::Identifier, LIST),
        K::Mandatory => (A::Boolean, NONE),
        K::MaxElements => (A::MaxElements, NONE),
        K::MinElements => (
            A::Integer {
                min: 0,
                max: u32::MAX as i64,
            },
            NONE,
        ),
        K::Modifier => (A::Modifier, NONE),
        K::Module => (A::Identifier, MODULE),
        K::Must => (A::String, CONSTRAINT),
        K::Namespace => (A::String, NONE),
        K::Notification => (A::Identifier, NOTIFICATION),
        K::OrderedBy => (A::OrderedBy, NONE),
        K::Organization => (A::String, NONE),
        K::Path => (A::String, NONE),
        K::Pattern => (A::String, PATTERN),
        K::Position => (
            A::Integer {
                min: 0,
                max: u32::MAX as i64,
            },
            NONE,
        ),
        K::Prefix => (A::Identifier, NONE),
        K::Presence => (A::String, NONE),
        K::Range => (A::String, CONSTRAINT),
        K::Reference => (A::String, NONE),
        K::Refine => (A::SchemaNodeId, REFINE),
        K::RequireInstance => (A::Boolean, NONE),
        K::Revision => (A::Revision, DESCRIBED),
        K::RevisionDate => (A::Revision, NONE),
        K::Rpc => (A::Identifier, RPC),
        K::Status => (A::Status, NONE),
        K::Submodule => (A::Identifier, SUBMODULE),
        K::Type => (A::PrefixedName, TYPE),
        K::Typedef => (A::Identifier, TYPEDEF),
        K::Unique => (A::String, NONE),
        K::Units => (A::String, NONE),
        K::Uses => (A::PrefixedName, USES),
        K::Value => (
            A::Integer {
                min: i32::MIN as i64,
                max: i32::MAX as i64,
            },
            NONE,
        ),
        K::When => (A::String, WHEN),
        K::YangVersion => (A::YangVersion, NONE),
        K::YinElement => (A::Boolean, NONE),
    }
}

/// Keywords a `deviate` of the given kind may carry.
pub fn deviate_allows(kind: DeviateKind, keyword: Keyword) -> bool {
    use super::argument::DeviateKind as D;
    match kind {
        D::NotSupported => false,
        D::Add => matches!(
            keyword,
            K::Config
                | K::Default
                | K::Mandatory
                | K::MaxElements
                | K::MinElements
                | K::Must
                | K::Unique
                | K::Units
        ),
        D::Replace => matches!(
            keyword,
            K::Config
                | K::Default
                | K::Mandatory
                | K::MaxElements
                | K::MinElements
                | K::Type
                | K::Units
        ),
        D::Delete => matches!(keyword, K::Default | K::Must | K::Unique | K::Units),
    }
}

// ============================================================================
// EXTENSIONS
// ============================================================================

/// Descriptor registered by an `extension` statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionSupport {
    pub name: QName,
    /// Name of the extension's argument, if it takes one.
    pub argument: Option<SmolStr>,
    pub yin_element: bool,
}

/// The open table of extension descriptors for one build.
#[derive(Clone, Debug, Default)]
pub struct ExtensionTable {
    entries: FxHashMap<QName, ExtensionSupport>,
}

impl ExtensionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Returns the previous one on a duplicate.
    pub fn register(&mut self, support: ExtensionSupport) -> Option<ExtensionSupport> {
        self.entries.insert(support.name.clone(), support)
    }

    pub fn get(&self, name: &QName) -> Option<&ExtensionSupport> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
