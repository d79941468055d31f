//! Type resolution: turns type entries into owned [`Type`] values with resolved byte sizes.

use std::collections::{HashMap, HashSet};

use gimli::DwTag;
use tracing::{debug, warn};

use crate::analysis::attribute::decode_integer;
use crate::analysis::image::{AttrValue, DebugEntry, DebugImage};
use crate::model::{EntryId, Type, TypeKind, Variable};

const MISSING_TYPE_NAME: &str = "<missing type>";
const MAX_NAME_DEPTH: usize = 64;

/// Resolves type entries of one image, memoized by entry id.
///
/// The cache only ever holds canonical, unwrapped results. Qualifier names are applied to the
/// clone handed back to the caller.
#[derive(Debug)]
pub struct TypeResolver<'image> {
    image: &'image DebugImage,
    cache: HashMap<EntryId, Type>,
    in_progress: HashSet<EntryId>,
}

impl<'image> TypeResolver<'image> {
    pub fn new(image: &'image DebugImage) -> Self {
        Self {
            image,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn image(&self) -> &'image DebugImage {
        self.image
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn resolve(&mut self, id: EntryId) -> Type {
        let image = self.image;
        let Some(entry) = image.entry(id) else {
            debug!(entry = %id, "type reference points at a missing entry");
            return Type::unresolved(id, gimli::DW_TAG_null, MISSING_TYPE_NAME);
        };

        let qualifier = is_qualifier(entry.tag);
        if !qualifier && let Some(cached) = self.cache.get(&id) {
            return cached.clone();
        }
        // Only reachable through malformed input: a type containing itself by value.
        if !self.in_progress.insert(id) {
            warn!(entry = %id, "type contains itself by value; leaving it unresolved");
            return Type::unresolved(id, entry.tag, self.type_name(id));
        }

        let resolved = if qualifier {
            self.resolve_qualifier(entry)
        } else {
            self.resolve_uncached(entry)
        };
        self.in_progress.remove(&id);
        if !qualifier {
            self.cache.insert(id, resolved.clone());
        }
        resolved
    }

    /// Display name of a type entry, computed without resolving members or sizes.
    pub fn type_name(&self, id: EntryId) -> String {
        self.type_name_at_depth(id, 0)
    }

    fn type_name_at_depth(&self, id: EntryId, depth: usize) -> String {
        if depth > MAX_NAME_DEPTH {
            return "...".to_string();
        }
        let Some(entry) = self.image.entry(id) else {
            return MISSING_TYPE_NAME.to_string();
        };
        let target_name = |depth: usize| {
            entry
                .reference(gimli::DW_AT_type)
                .map(|target| self.type_name_at_depth(target, depth + 1))
        };

        match entry.tag {
            gimli::DW_TAG_base_type => own_name_or(entry, "unnamed base type"),
            gimli::DW_TAG_structure_type | gimli::DW_TAG_class_type => {
                own_name_or(entry, "unnamed struct")
            }
            gimli::DW_TAG_union_type => own_name_or(entry, "unnamed union"),
            gimli::DW_TAG_enumeration_type => own_name_or(entry, "unnamed enum"),
            gimli::DW_TAG_pointer_type => {
                format!("{}*", target_name(depth).unwrap_or_else(|| "void".to_string()))
            }
            gimli::DW_TAG_reference_type | gimli::DW_TAG_rvalue_reference_type => {
                format!("{}&", target_name(depth).unwrap_or_else(|| "void".to_string()))
            }
            gimli::DW_TAG_typedef => match entry.name() {
                Some(name) => name.to_string(),
                None => target_name(depth).unwrap_or_else(|| "void".to_string()),
            },
            gimli::DW_TAG_const_type | gimli::DW_TAG_volatile_type => match entry.name() {
                Some(name) => name.to_string(),
                None => format!(
                    "{} {}",
                    qualifier_keyword(entry.tag),
                    target_name(depth).unwrap_or_else(|| "void".to_string())
                ),
            },
            gimli::DW_TAG_array_type => {
                let element = target_name(depth).unwrap_or_else(|| MISSING_TYPE_NAME.to_string());
                let dimensions = array_dimensions(self.image, entry);
                format!("{element}{}", dimension_suffix(&dimensions))
            }
            other => entry
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("unhandled type ({other})")),
        }
    }

    fn resolve_qualifier(&mut self, entry: &DebugEntry) -> Type {
        let explicit_size = entry.udata(gimli::DW_AT_byte_size);
        let Some(target) = entry.reference(gimli::DW_AT_type) else {
            return Type {
                id: entry.id,
                tag: entry.tag,
                name: self.type_name(entry.id),
                size: explicit_size,
                kind: TypeKind::Base,
            };
        };

        let mut resolved = self.resolve(target);
        resolved.name = match (entry.name(), entry.tag) {
            (Some(name), _) => name.to_string(),
            (None, gimli::DW_TAG_typedef) => resolved.name,
            (None, tag) => format!("{} {}", qualifier_keyword(tag), resolved.name),
        };
        if explicit_size.is_some() {
            resolved.size = explicit_size;
        }
        resolved
    }

    fn resolve_uncached(&mut self, entry: &DebugEntry) -> Type {
        let explicit_size = entry.udata(gimli::DW_AT_byte_size);
        let name = self.type_name(entry.id);

        let (size, kind) = match entry.tag {
            gimli::DW_TAG_array_type => return self.resolve_array(entry, explicit_size),
            gimli::DW_TAG_pointer_type
            | gimli::DW_TAG_reference_type
            | gimli::DW_TAG_rvalue_reference_type => (
                explicit_size.or(Some(u64::from(self.image.pointer_width()))),
                TypeKind::Pointer {
                    pointee: entry.reference(gimli::DW_AT_type),
                },
            ),
            gimli::DW_TAG_structure_type | gimli::DW_TAG_class_type => {
                let members = self.resolve_members(entry);
                let size = explicit_size.or_else(|| composite_size(&members));
                (size, TypeKind::Struct { members })
            }
            gimli::DW_TAG_union_type => {
                let members = self.resolve_members(entry);
                let size = explicit_size.or_else(|| composite_size(&members));
                (size, TypeKind::Union { members })
            }
            _ => (explicit_size, TypeKind::Base),
        };

        Type {
            id: entry.id,
            tag: entry.tag,
            name,
            size,
            kind,
        }
    }

    fn resolve_members(&mut self, entry: &DebugEntry) -> Vec<Variable> {
        let image = self.image;
        let mut members = Vec::new();
        for member in image.children(entry.id) {
            if member.tag != gimli::DW_TAG_member {
                continue;
            }
            let Some(type_ref) = member.reference(gimli::DW_AT_type) else {
                debug!(member = %member.id, "member without a type; skipping");
                continue;
            };
            let offset = match member.attr(gimli::DW_AT_data_member_location) {
                None => 0,
                Some(value) => decode_integer(value, image.endian()).unwrap_or_else(|error| {
                    warn!(member = %member.id, %error, "member offset not decodable; using 0");
                    0
                }),
            };
            members.push(Variable {
                id: member.id,
                name: member.name().unwrap_or("<anonymous>").to_string(),
                location: offset,
                ty: self.resolve(type_ref),
            });
        }
        members
    }

    fn resolve_array(&mut self, entry: &DebugEntry, explicit_size: Option<u64>) -> Type {
        let element = match entry.reference(gimli::DW_AT_type) {
            Some(target) => self.resolve(target),
            None => Type::unresolved(entry.id, gimli::DW_TAG_null, MISSING_TYPE_NAME),
        };
        let element_name = element.name.clone();
        let dimensions = array_dimensions(self.image, entry);

        // Build innermost dimension first so `int[2][3]` is two arrays of `int[3]`.
        let mut resolved = element;
        for (index, &count) in dimensions.iter().enumerate().rev() {
            let size = resolved
                .size
                .and_then(|element_size| element_size.checked_mul(count));
            resolved = Type {
                id: entry.id,
                tag: entry.tag,
                name: format!("{element_name}{}", dimension_suffix(&dimensions[index..])),
                size,
                kind: TypeKind::Array {
                    element: Box::new(resolved),
                    count,
                },
            };
        }
        if explicit_size.is_some() {
            resolved.size = explicit_size;
        }
        resolved
    }
}

/// Element counts of an array entry, outermost dimension first.
///
/// A subrange with neither a count nor an upper bound counts as zero elements.
pub fn array_dimensions(image: &DebugImage, entry: &DebugEntry) -> Vec<u64> {
    let mut dimensions = image
        .children(entry.id)
        .filter(|child| child.tag == gimli::DW_TAG_subrange_type)
        .map(subrange_count)
        .collect::<Vec<_>>();
    if dimensions.is_empty() {
        warn!(array = %entry.id, "array without a subrange; treating it as zero-length");
        dimensions.push(0);
    }
    dimensions
}

fn subrange_count(subrange: &DebugEntry) -> u64 {
    if let Some(count) = subrange.udata(gimli::DW_AT_count) {
        return count;
    }
    match subrange.attr(gimli::DW_AT_upper_bound) {
        Some(AttrValue::Udata(upper_bound)) => upper_bound.saturating_add(1),
        // `int flexible[]` is emitted with an upper bound of -1.
        Some(AttrValue::Sdata(upper_bound)) => u64::try_from(upper_bound.saturating_add(1)).unwrap_or(0),
        _ => {
            warn!(
                subrange = %subrange.id,
                "subrange has neither a count nor an upper bound; using 0"
            );
            0
        }
    }
}

fn composite_size(members: &[Variable]) -> Option<u64> {
    members
        .iter()
        .filter_map(|member| member.ty.size.map(|size| member.location.saturating_add(size)))
        .max()
}

fn dimension_suffix(dimensions: &[u64]) -> String {
    dimensions.iter().map(|count| format!("[{count}]")).collect()
}

fn own_name_or(entry: &DebugEntry, fallback: &str) -> String {
    entry.name().unwrap_or(fallback).to_string()
}

fn is_qualifier(tag: DwTag) -> bool {
    matches!(
        tag,
        gimli::DW_TAG_typedef | gimli::DW_TAG_const_type | gimli::DW_TAG_volatile_type
    )
}

fn qualifier_keyword(tag: DwTag) -> &'static str {
    match tag {
        gimli::DW_TAG_const_type => "const",
        gimli::DW_TAG_volatile_type => "volatile",
        _ => "typedef",
    }
}
