//! Resolved type definitions.
//!
//! A [`TypeDefinition`] is one link of a chain rooted at a built-in type:
//! built-in → typedef → ... → anonymous restricted type. Restrictions are
//! recorded per link; the `inherited_*` accessors walk toward the root.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;

use super::pattern::Pattern;
use crate::stmt::QName;

// ============================================================================
// BUILT-IN TYPES
// ============================================================================

/// The YANG built-in types (RFC 7950 section 4.2.4).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Binary,
    Bits,
    Boolean,
    Decimal64,
    Empty,
    Enumeration,
    Identityref,
    InstanceIdentifier,
    Int8,
    Int16,
    Int32,
    Int64,
    Leafref,
    String,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Union,
}

impl BuiltinType {
    pub fn from_name(name: &str) -> Option<BuiltinType> {
        Some(match name {
            "binary" => BuiltinType::Binary,
            "bits" => BuiltinType::Bits,
            "boolean" => BuiltinType::Boolean,
            "decimal64" => BuiltinType::Decimal64,
            "empty" => BuiltinType::Empty,
            "enumeration" => BuiltinType::Enumeration,
            "identityref" => BuiltinType::Identityref,
            "instance-identifier" => BuiltinType::InstanceIdentifier,
            "int8" => BuiltinType::Int8,
            "int16" => BuiltinType::Int16,
            "int32" => BuiltinType::Int32,
            "int64" => BuiltinType::Int64,
            "leafref" => BuiltinType::Leafref,
            "string" => BuiltinType::String,
            "uint8" => BuiltinType::Uint8,
            "uint16" => BuiltinType::Uint16,
            "uint32" => BuiltinType::Uint32,
            "uint64" => BuiltinType::Uint64,
            "union" => BuiltinType::Union,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuiltinType::Binary => "binary",
            BuiltinType::Bits => "bits",
            BuiltinType::Boolean => "boolean",
            BuiltinType::Decimal64 => "decimal64",
            BuiltinType::Empty => "empty",
            BuiltinType::Enumeration => "enumeration",
            BuiltinType::Identityref => "identityref",
            BuiltinType::InstanceIdentifier => "instance-identifier",
            BuiltinType::Int8 => "int8",
            BuiltinType::Int16 => "int16",
            BuiltinType::Int32 => "int32",
            BuiltinType::Int64 => "int64",
            BuiltinType::Leafref => "leafref",
            BuiltinType::String => "string",
            BuiltinType::Uint8 => "uint8",
            BuiltinType::Uint16 => "uint16",
            BuiltinType::Uint32 => "uint32",
            BuiltinType::Uint64 => "uint64",
            BuiltinType::Union => "union",
        }
    }

    /// Value bounds of the integer types.
    pub fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            BuiltinType::Int8 => (i8::MIN.into(), i8::MAX.into()),
            BuiltinType::Int16 => (i16::MIN.into(), i16::MAX.into()),
            BuiltinType::Int32 => (i32::MIN.into(), i32::MAX.into()),
            BuiltinType::Int64 => (i64::MIN.into(), i64::MAX.into()),
            BuiltinType::Uint8 => (0, u8::MAX.into()),
            BuiltinType::Uint16 => (0, u16::MAX.into()),
            BuiltinType::Uint32 => (0, u32::MAX.into()),
            BuiltinType::Uint64 => (0, u64::MAX.into()),
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        self.integer_bounds().is_some()
    }

    /// Types a `range` restriction applies to.
    pub fn is_numeric(self) -> bool {
        self.is_integer() || self == BuiltinType::Decimal64
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// INTERVALS
// ============================================================================

/// A range or length bound.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    Integer(i128),
    Decimal(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Integer(v) => v as f64,
            Number::Decimal(v) => v,
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Number::Integer(a), Number::Integer(b)) => Some(a.cmp(b)),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(v) => write!(f, "{}", v),
            Number::Decimal(v) => write!(f, "{}", v),
        }
    }
}

/// One inclusive interval of a `range` or `length` restriction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Interval {
    pub min: Number,
    pub max: Number,
}

impl Interval {
    pub fn new(min: Number, max: Number) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, other: &Interval) -> bool {
        self.min <= other.min && other.max <= self.max
    }
}

// ============================================================================
// RESTRICTIONS
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumMember {
    pub name: SmolStr,
    pub value: i32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMember {
    pub name: SmolStr,
    pub position: u32,
}

/// Restrictions declared on one link of a type chain.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Restrictions {
    pub ranges: Option<Vec<Interval>>,
    pub lengths: Option<Vec<Interval>>,
    pub patterns: Vec<Pattern>,
    pub enums: Vec<EnumMember>,
    pub bits: Vec<BitMember>,
    pub fraction_digits: Option<u8>,
    pub path: Option<SmolStr>,
    pub require_instance: Option<bool>,
    pub identity_bases: Vec<QName>,
    pub union_members: Vec<Arc<TypeDefinition>>,
}

impl Restrictions {
    pub fn is_empty(&self) -> bool {
        *self == Restrictions::default()
    }
}

// ============================================================================
// TYPE DEFINITION
// ============================================================================

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Builtin,
    Typedef,
    /// A `type` statement that adds restrictions to its base.
    Restricted,
}

/// One link of a resolved type chain.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDefinition {
    name: QName,
    kind: TypeKind,
    builtin: BuiltinType,
    base: Option<Arc<TypeDefinition>>,
    restrictions: Restrictions,
    units: Option<SmolStr>,
    default: Option<SmolStr>,
}

impl TypeDefinition {
    /// The root of every chain.
    pub fn builtin(builtin: BuiltinType) -> Self {
        Self {
            name: QName::new(Default::default(), builtin.as_str()),
            kind: TypeKind::Builtin,
            builtin,
            base: None,
            restrictions: Restrictions::default(),
            units: None,
            default: None,
        }
    }

    pub fn typedef(
        name: QName,
        base: Arc<TypeDefinition>,
        units: Option<SmolStr>,
        default: Option<SmolStr>,
    ) -> Self {
        Self {
            name,
            kind: TypeKind::Typedef,
            builtin: base.builtin,
            base: Some(base),
            restrictions: Restrictions::default(),
            units,
            default,
        }
    }

    /// An anonymous type narrowing `base`. Takes the base's name.
    pub fn restricted(base: Arc<TypeDefinition>, restrictions: Restrictions) -> Self {
        Self {
            name: base.name.clone(),
            kind: TypeKind::Restricted,
            builtin: base.builtin,
            base: Some(base),
            restrictions,
            units: None,
            default: None,
        }
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// The built-in type at the root of the chain.
    pub fn builtin_type(&self) -> BuiltinType {
        self.builtin
    }

    pub fn base(&self) -> Option<&Arc<TypeDefinition>> {
        self.base.as_ref()
    }

    /// Restrictions declared on this link only.
    pub fn restrictions(&self) -> &Restrictions {
        &self.restrictions
    }

    pub fn units(&self) -> Option<&str> {
        self.units.as_deref()
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// This link followed by its bases, down to the built-in root.
    pub fn chain(&self) -> impl Iterator<Item = &TypeDefinition> {
        std::iter::successors(Some(self), |def| def.base.as_deref())
    }

    pub fn effective_units(&self) -> Option<&str> {
        self.chain().find_map(|def| def.units())
    }

    pub fn effective_default(&self) -> Option<&str> {
        self.chain().find_map(|def| def.default_value())
    }

    /// Nearest declared ranges along the chain.
    pub fn inherited_ranges(&self) -> Option<&[Interval]> {
        self.chain().find_map(|def| def.restrictions.ranges.as_deref())
    }

    pub fn inherited_lengths(&self) -> Option<&[Interval]> {
        self.chain().find_map(|def| def.restrictions.lengths.as_deref())
    }

    /// Every pattern on the chain, root-most definition first.
    pub fn inherited_patterns(&self) -> Vec<&Pattern> {
        let mut links: Vec<&TypeDefinition> = self.chain().collect();
        links.reverse();
        links
            .into_iter()
            .flat_map(|def| def.restrictions.patterns.iter())
            .collect()
    }

    /// Nearest declared enum set along the chain.
    pub fn inherited_enums(&self) -> &[EnumMember] {
        self.chain()
            .map(|def| def.restrictions.enums.as_slice())
            .find(|enums| !enums.is_empty())
            .unwrap_or(&[])
    }

    pub fn inherited_bits(&self) -> &[BitMember] {
        self.chain()
            .map(|def| def.restrictions.bits.as_slice())
            .find(|bits| !bits.is_empty())
            .unwrap_or(&[])
    }

    pub fn inherited_fraction_digits(&self) -> Option<u8> {
        self.chain().find_map(|def| def.restrictions.fraction_digits)
    }

    pub fn inherited_path(&self) -> Option<&str> {
        self.chain().find_map(|def| def.restrictions.path.as_deref())
    }

    pub fn inherited_identity_bases(&self) -> &[QName] {
        self.chain()
            .map(|def| def.restrictions.identity_bases.as_slice())
            .find(|bases| !bases.is_empty())
            .unwrap_or(&[])
    }

    pub fn inherited_union_members(&self) -> &[Arc<TypeDefinition>] {
        self.chain()
            .map(|def| def.restrictions.union_members.as_slice())
            .find(|members| !members.is_empty())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::QNameModule;

    fn qname(local: &str) -> QName {
        QName::new(QNameModule::new("urn:t", None), local)
    }

    #[test]
    fn test_builtin_names() {
        assert_eq!(BuiltinType::from_name("uint16"), Some(BuiltinType::Uint16));
        assert_eq!(BuiltinType::from_name("instance-identifier").map(|b| b.as_str()), Some("instance-identifier"));
        assert_eq!(BuiltinType::from_name("float"), None);
        assert_eq!(BuiltinType::Int8.integer_bounds(), Some((-128, 127)));
        assert!(BuiltinType::Decimal64.is_numeric());
        assert!(!BuiltinType::String.is_numeric());
    }

    #[test]
    fn test_chain_inheritance() {
        let root = Arc::new(TypeDefinition::builtin(BuiltinType::String));
        let restricted = Arc::new(TypeDefinition::restricted(
            root,
            Restrictions {
                patterns: vec![Pattern::new("[a-z]+", false).unwrap()],
                ..Restrictions::default()
            },
        ));
        let typedef = Arc::new(TypeDefinition::typedef(qname("name"), restricted, Some("chars".into()), None));
        let leaf = TypeDefinition::restricted(
            typedef.clone(),
            Restrictions {
                patterns: vec![Pattern::new("x.*", true).unwrap()],
                ..Restrictions::default()
            },
        );

        assert_eq!(leaf.kind(), TypeKind::Restricted);
        assert_eq!(leaf.name(), typedef.name());
        assert_eq!(leaf.builtin_type(), BuiltinType::String);
        assert_eq!(leaf.effective_units(), Some("chars"));
        assert_eq!(leaf.chain().count(), 4);
        let patterns: Vec<_> = leaf.inherited_patterns().iter().map(|p| p.regex()).collect();
        assert_eq!(patterns, vec!["[a-z]+", "x.*"]);
    }

    #[test]
    fn test_interval_containment() {
        let outer = Interval::new(Number::Integer(0), Number::Integer(100));
        assert!(outer.contains(&Interval::new(Number::Integer(10), Number::Integer(20))));
        assert!(!outer.contains(&Interval::new(Number::Integer(-1), Number::Integer(20))));
        assert!(outer.contains(&Interval::new(Number::Decimal(0.5), Number::Decimal(99.5))));
    }
}
