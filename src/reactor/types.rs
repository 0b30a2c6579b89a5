//! Type linking.
//!
//! Every `type` statement resolves to a [`TypeDefinition`] whose base is
//! either a built-in type or the resolved definition of a typedef. A `type`
//! that adds restrictions becomes a new anonymous link in the chain; one that
//! adds none shares its base. A typedef is resolved as soon as its `type` is.

use std::sync::Arc;

use smol_str::SmolStr;

use super::action::{Outcome, Stop};
use super::context::{BuildContext, StmtId};
use super::namespace::DefinitionKind;
use crate::effective::{
    BitMember, BuiltinType, EnumMember, Interval, Number, Pattern, Resolution, Restrictions,
    TypeDefinition, TypeKind,
};
use crate::error::InferenceError;
use crate::stmt::{Keyword, PrefixedName, QName};

pub(crate) fn link(ctx: &mut BuildContext<'_>, ty: StmtId) -> Outcome {
    match resolve(ctx, ty) {
        Ok(()) => Outcome::Applied,
        Err(Stop::Poisoned) => {
            ctx.poisoned.insert(ty);
            Outcome::Applied
        }
        Err(stop) => stop.into(),
    }
}

fn builtin_named(name: &PrefixedName) -> Option<BuiltinType> {
    match name.prefix {
        None => BuiltinType::from_name(&name.local),
        Some(_) => None,
    }
}

fn resolve(ctx: &mut BuildContext<'_>, ty: StmtId) -> Result<(), Stop> {
    let Some(name) = ctx.get(ty).argument.as_prefixed_name().cloned() else {
        return Ok(());
    };
    let at = ctx.get(ty).source_ref.clone();
    let pending = |message: &str| Stop::Pending(InferenceError::invalid_type(&at, name.to_string(), message));

    let base = match builtin_named(&name) {
        Some(builtin) => Arc::new(TypeDefinition::builtin(builtin)),
        None => {
            let typedef = ctx.lookup_definition(DefinitionKind::Typedef, ty, &name)?;
            if ctx.poisoned.contains(&typedef) {
                return Err(Stop::Poisoned);
            }
            match ctx.get(typedef).resolution.as_deref() {
                Some(Resolution::Type(def)) => def.clone(),
                _ => return Err(pending("base typedef is not resolved yet")),
            }
        }
    };

    let mut members = Vec::new();
    for member in ctx.children_with(ty, Keyword::Type).collect::<Vec<_>>() {
        if ctx.poisoned.contains(&member) {
            return Err(Stop::Poisoned);
        }
        match ctx.resolution_of(member).as_deref() {
            Some(Resolution::Type(def)) => members.push(def.clone()),
            _ => return Err(pending("union member type is not resolved yet")),
        }
    }

    let restrictions = collect_restrictions(ctx, ty, &name, &base, members)?;
    let def = if restrictions.is_empty() {
        base
    } else {
        Arc::new(TypeDefinition::restricted(base, restrictions))
    };
    ctx.get_mut(ty).resolution = Some(Arc::new(Resolution::Type(def.clone())));

    if let Some(parent) = ctx.get(ty).parent {
        if ctx.get(parent).is(Keyword::Typedef) {
            let raw_of = |keyword| ctx.child(parent, keyword).and_then(|c| ctx.get(c).raw.clone());
            let units = raw_of(Keyword::Units);
            let default = raw_of(Keyword::Default);
            let typedef = ctx.get(parent);
            let qname = QName::new(
                typedef.module.clone(),
                typedef.argument.as_identifier().cloned().unwrap_or_default(),
            );
            let resolved = TypeDefinition::typedef(qname, def, units, default);
            ctx.get_mut(parent).resolution = Some(Arc::new(Resolution::Type(Arc::new(resolved))));
        }
    }
    Ok(())
}

// ============================================================================
// RESTRICTIONS
// ============================================================================

fn collect_restrictions(
    ctx: &BuildContext<'_>,
    ty: StmtId,
    name: &PrefixedName,
    base: &TypeDefinition,
    members: Vec<Arc<TypeDefinition>>,
) -> Result<Restrictions, InferenceError> {
    let at = &ctx.get(ty).source_ref;
    let builtin = base.builtin_type();
    let invalid = |message: String| InferenceError::invalid_type(at, name.to_string(), message);
    let not_applicable =
        |keyword: Keyword| invalid(format!("'{}' is not applicable to {}", keyword, builtin));

    let mut restrictions = Restrictions::default();
    if let Some(digits) = ctx
        .child(ty, Keyword::FractionDigits)
        .and_then(|c| ctx.get(c).argument.as_integer())
    {
        if builtin != BuiltinType::Decimal64 {
            return Err(not_applicable(Keyword::FractionDigits));
        }
        if base.kind() != TypeKind::Builtin {
            return Err(invalid("fraction-digits can only be set on decimal64 itself".into()));
        }
        restrictions.fraction_digits = Some(digits as u8);
    }

    for child in ctx.children(ty).iter().copied() {
        let stmt = ctx.get(child);
        if !stmt.supported {
            continue;
        }
        let raw = stmt.raw.as_deref().unwrap_or_default();
        match stmt.keyword() {
            Some(Keyword::Range) => {
                if !builtin.is_numeric() {
                    return Err(not_applicable(Keyword::Range));
                }
                let digits = restrictions
                    .fraction_digits
                    .or_else(|| base.inherited_fraction_digits());
                let bounds = numeric_bounds(base, digits);
                let ranges = parse_intervals(raw, &bounds, builtin == BuiltinType::Decimal64)
                    .map_err(&invalid)?;
                restrictions.ranges = Some(ranges);
            }
            Some(Keyword::Length) => {
                if !matches!(builtin, BuiltinType::String | BuiltinType::Binary) {
                    return Err(not_applicable(Keyword::Length));
                }
                let bounds = base.inherited_lengths().map(<[Interval]>::to_vec).unwrap_or_else(|| {
                    vec![Interval::new(Number::Integer(0), Number::Integer(u64::MAX.into()))]
                });
                restrictions.lengths = Some(parse_intervals(raw, &bounds, false).map_err(&invalid)?);
            }
            Some(Keyword::Pattern) => {
                if builtin != BuiltinType::String {
                    return Err(not_applicable(Keyword::Pattern));
                }
                let invert_match = ctx
                    .child(child, Keyword::Modifier)
                    .is_some_and(|m| ctx.get(m).raw.as_deref() == Some("invert-match"));
                let pattern = Pattern::new(raw, invert_match).map_err(|e| invalid(e.to_string()))?;
                restrictions.patterns.push(pattern);
            }
            Some(Keyword::Path) => {
                if builtin != BuiltinType::Leafref {
                    return Err(not_applicable(Keyword::Path));
                }
                restrictions.path = Some(SmolStr::new(raw));
            }
            Some(Keyword::RequireInstance) => {
                if !matches!(builtin, BuiltinType::Leafref | BuiltinType::InstanceIdentifier) {
                    return Err(not_applicable(Keyword::RequireInstance));
                }
                restrictions.require_instance = stmt.argument.as_bool();
            }
            Some(Keyword::Base) => {
                if builtin != BuiltinType::Identityref {
                    return Err(not_applicable(Keyword::Base));
                }
                if let Some(identity) = stmt.argument.as_prefixed_name() {
                    ctx.lookup_identity(child, identity)?;
                    restrictions.identity_bases.push(ctx.qname_for(child, identity)?);
                }
            }
            Some(Keyword::Type) if builtin != BuiltinType::Union => {
                return Err(not_applicable(Keyword::Type));
            }
            Some(Keyword::Enum) if builtin != BuiltinType::Enumeration => {
                return Err(not_applicable(Keyword::Enum));
            }
            Some(Keyword::Bit) if builtin != BuiltinType::Bits => {
                return Err(not_applicable(Keyword::Bit));
            }
            _ => {}
        }
    }

    restrictions.enums = assign_enums(ctx, ty, base).map_err(&invalid)?;
    restrictions.bits = assign_bits(ctx, ty, base).map_err(&invalid)?;
    restrictions.union_members = members;

    if base.kind() == TypeKind::Builtin {
        let missing = match builtin {
            BuiltinType::Enumeration if restrictions.enums.is_empty() => Some("at least one enum"),
            BuiltinType::Bits if restrictions.bits.is_empty() => Some("at least one bit"),
            BuiltinType::Decimal64 if restrictions.fraction_digits.is_none() => Some("fraction-digits"),
            BuiltinType::Leafref if restrictions.path.is_none() => Some("a path"),
            BuiltinType::Identityref if restrictions.identity_bases.is_empty() => Some("a base identity"),
            BuiltinType::Union if restrictions.union_members.is_empty() => Some("member types"),
            _ => None,
        };
        if let Some(missing) = missing {
            return Err(invalid(format!("{} requires {}", builtin, missing)));
        }
    }
    Ok(restrictions)
}

/// Effective value space a derived `range` must stay within.
fn numeric_bounds(base: &TypeDefinition, fraction_digits: Option<u8>) -> Vec<Interval> {
    if let Some(ranges) = base.inherited_ranges() {
        return ranges.to_vec();
    }
    match base.builtin_type().integer_bounds() {
        Some((min, max)) => vec![Interval::new(Number::Integer(min), Number::Integer(max))],
        None => {
            let scale = 10f64.powi(i32::from(fraction_digits.unwrap_or(0)));
            vec![Interval::new(
                Number::Decimal(i64::MIN as f64 / scale),
                Number::Decimal(i64::MAX as f64 / scale),
            )]
        }
    }
}

fn parse_bound(text: &str, min: Number, max: Number, decimal: bool) -> Result<Number, String> {
    match text {
        "min" => Ok(min),
        "max" => Ok(max),
        _ if decimal => text
            .parse::<f64>()
            .map(Number::Decimal)
            .map_err(|_| format!("invalid bound '{}'", text)),
        _ => text
            .parse::<i128>()
            .map(Number::Integer)
            .map_err(|_| format!("invalid bound '{}'", text)),
    }
}

/// Parse `a..b | c | min..max` against the base's intervals. Each interval
/// must be ascending, disjoint from the previous one and inside the base.
pub(crate) fn parse_intervals(text: &str, base: &[Interval], decimal: bool) -> Result<Vec<Interval>, String> {
    let (Some(first), Some(last)) = (base.first(), base.last()) else {
        return Err("base type has no bounds".into());
    };
    let mut intervals: Vec<Interval> = Vec::new();
    for part in text.split('|') {
        let part = part.trim();
        let (low, high) = match part.split_once("..") {
            Some((low, high)) => (low.trim(), high.trim()),
            None => (part, part),
        };
        let interval = Interval::new(
            parse_bound(low, first.min, last.max, decimal)?,
            parse_bound(high, first.min, last.max, decimal)?,
        );
        if interval.min > interval.max {
            return Err(format!("interval '{}' is not ascending", part));
        }
        if intervals.last().is_some_and(|prev| prev.max >= interval.min) {
            return Err(format!("interval '{}' overlaps or precedes the previous one", part));
        }
        if !base.iter().any(|b| b.contains(&interval)) {
            return Err(format!("interval '{}' is outside the base type's bounds", part));
        }
        intervals.push(interval);
    }
    Ok(intervals)
}

// ============================================================================
// ENUM & BIT ASSIGNMENT
// ============================================================================

/// Omitted values and positions follow the highest one assigned so far.
fn assign_enums(ctx: &BuildContext<'_>, ty: StmtId, base: &TypeDefinition) -> Result<Vec<EnumMember>, String> {
    let inherited = base.inherited_enums();
    let mut members: Vec<EnumMember> = Vec::new();
    let mut next: i64 = 0;
    for member in ctx.children_with(ty, Keyword::Enum) {
        let name = ctx.get(member).raw.clone().unwrap_or_default();
        let explicit = ctx
            .child(member, Keyword::Value)
            .and_then(|v| ctx.get(v).argument.as_integer());
        let value = if inherited.is_empty() {
            explicit.unwrap_or(next)
        } else {
            let Some(original) = inherited.iter().find(|m| m.name == name) else {
                return Err(format!("enum '{}' is not defined in the base type", name));
            };
            if explicit.is_some_and(|v| v != i64::from(original.value)) {
                return Err(format!("enum '{}' must keep value {}", name, original.value));
            }
            i64::from(original.value)
        };
        let Ok(value) = i32::try_from(value) else {
            return Err(format!("enum '{}' value {} is out of range", name, value));
        };
        if members.iter().any(|m| m.name == name) {
            return Err(format!("duplicate enum '{}'", name));
        }
        if let Some(clash) = members.iter().find(|m| m.value == value) {
            return Err(format!("enum '{}' reuses value {} of '{}'", name, value, clash.name));
        }
        next = next.max(i64::from(value) + 1);
        members.push(EnumMember { name, value });
    }
    Ok(members)
}

fn assign_bits(ctx: &BuildContext<'_>, ty: StmtId, base: &TypeDefinition) -> Result<Vec<BitMember>, String> {
    let inherited = base.inherited_bits();
    let mut members: Vec<BitMember> = Vec::new();
    let mut next: i64 = 0;
    for member in ctx.children_with(ty, Keyword::Bit) {
        let name = ctx.get(member).raw.clone().unwrap_or_default();
        let explicit = ctx
            .child(member, Keyword::Position)
            .and_then(|p| ctx.get(p).argument.as_integer());
        let position = if inherited.is_empty() {
            explicit.unwrap_or(next)
        } else {
            let Some(original) = inherited.iter().find(|m| m.name == name) else {
                return Err(format!("bit '{}' is not defined in the base type", name));
            };
            if explicit.is_some_and(|p| p != i64::from(original.position)) {
                return Err(format!("bit '{}' must keep position {}", name, original.position));
            }
            i64::from(original.position)
        };
        let Ok(position) = u32::try_from(position) else {
            return Err(format!("bit '{}' position {} is out of range", name, position));
        };
        if members.iter().any(|m| m.name == name) {
            return Err(format!("duplicate bit '{}'", name));
        }
        if let Some(clash) = members.iter().find(|m| m.position == position) {
            return Err(format!("bit '{}' reuses position {} of '{}'", name, position, clash.name));
        }
        next = next.max(i64::from(position) + 1);
        members.push(BitMember { name, position });
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn int_bounds(min: i128, max: i128) -> Vec<Interval> {
        vec![Interval::new(Number::Integer(min), Number::Integer(max))]
    }

    #[test]
    fn test_parse_intervals_with_min_max() {
        let parsed = parse_intervals("min..10 | 20..max", &int_bounds(0, 255), false).unwrap();
        assert_eq!(
            parsed,
            vec![
                Interval::new(Number::Integer(0), Number::Integer(10)),
                Interval::new(Number::Integer(20), Number::Integer(255)),
            ]
        );
    }

    #[rstest]
    #[case::outside_base("0..300")]
    #[case::descending("10..1")]
    #[case::overlapping("1..10 | 5..20")]
    #[case::garbage("one..two")]
    fn test_parse_intervals_rejects(#[case] text: &str) {
        assert!(parse_intervals(text, &int_bounds(0, 255), false).is_err());
    }

    #[test]
    fn test_parse_decimal_intervals() {
        let bounds = vec![Interval::new(Number::Decimal(-10.0), Number::Decimal(10.0))];
        let parsed = parse_intervals("-2.5..2.5", &bounds, true).unwrap();
        assert_eq!(parsed[0].min, Number::Decimal(-2.5));
    }

    #[test]
    fn test_numeric_bounds_narrow_through_chain() {
        let root = Arc::new(TypeDefinition::builtin(BuiltinType::Uint8));
        assert_eq!(numeric_bounds(&root, None), int_bounds(0, 255));
        let narrowed = TypeDefinition::restricted(
            root,
            Restrictions {
                ranges: Some(int_bounds(1, 10)),
                ..Restrictions::default()
            },
        );
        assert_eq!(numeric_bounds(&narrowed, None), int_bounds(1, 10));
    }
}
