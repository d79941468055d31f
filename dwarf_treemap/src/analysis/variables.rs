use tracing::{debug, warn};

use crate::analysis::attribute::decode_integer;
use crate::analysis::image::{CompileUnit, DebugEntry, DebugImage};
use crate::analysis::types::TypeResolver;
use crate::error::DecodeError;
use crate::model::{AddressRange, EntryId, Variable};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitVariables {
    pub unit: CompileUnit,
    pub variables: Vec<Variable>,
}

/// Collects the variables of every unit in `image` with one shared resolver.
pub fn collect_image(image: &DebugImage, range: Option<AddressRange>) -> Vec<UnitVariables> {
    let mut resolver = TypeResolver::new(image);
    let units = image
        .units()
        .iter()
        .map(|unit| UnitVariables {
            unit: unit.clone(),
            variables: collect_variables(&mut resolver, unit, range),
        })
        .collect::<Vec<_>>();
    debug!(
        units = units.len(),
        cached_types = resolver.cached_len(),
        "collected variables for image"
    );
    units
}

/// Collects the top-level variables of one compile unit, in entry order.
///
/// Variables that fail to decode are skipped with a warning; the rest of the unit still resolves.
pub fn collect_variables(
    resolver: &mut TypeResolver<'_>,
    unit: &CompileUnit,
    range: Option<AddressRange>,
) -> Vec<Variable> {
    let image = resolver.image();
    let mut variables = Vec::new();

    for entry in top_level_entries(image, unit.root) {
        if entry.tag != gimli::DW_TAG_variable {
            continue;
        }
        match collect_one(resolver, entry) {
            Ok(Some(variable)) => {
                if range.is_none_or(|range| range.contains(variable.location)) {
                    variables.push(variable);
                }
            }
            Ok(None) => {}
            Err(error) => {
                warn!(entry = %entry.id, %error, "skipping variable with undecodable location");
            }
        }
    }

    debug!(
        unit = unit.offset,
        count = variables.len(),
        "collected unit variables"
    );
    variables
}

/// Depth-first walk that does not descend into function bodies.
fn top_level_entries(image: &DebugImage, root: EntryId) -> Vec<&DebugEntry> {
    let mut ordered = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(entry) = image.entry(id) else {
            continue;
        };
        ordered.push(entry);
        if is_scope_boundary(entry) {
            continue;
        }
        stack.extend(entry.children.iter().rev().copied());
    }
    ordered
}

fn is_scope_boundary(entry: &DebugEntry) -> bool {
    matches!(
        entry.tag,
        gimli::DW_TAG_subprogram | gimli::DW_TAG_lexical_block | gimli::DW_TAG_inlined_subroutine
    )
}

fn collect_one(
    resolver: &mut TypeResolver<'_>,
    entry: &DebugEntry,
) -> Result<Option<Variable>, DecodeError> {
    let image = resolver.image();
    if entry.flag(gimli::DW_AT_declaration) {
        return Ok(None);
    }

    let origins = [gimli::DW_AT_abstract_origin, gimli::DW_AT_specification]
        .into_iter()
        .filter_map(|attr| entry.reference(attr))
        .filter_map(|id| image.entry(id))
        .collect::<Vec<_>>();

    let type_ref = entry.reference(gimli::DW_AT_type).or_else(|| {
        origins
            .iter()
            .find_map(|origin| origin.reference(gimli::DW_AT_type))
    });
    let Some(type_ref) = type_ref else {
        return Ok(None);
    };

    let location = match entry
        .attr(gimli::DW_AT_location)
        .or_else(|| entry.attr(gimli::DW_AT_data_member_location))
    {
        Some(value) => decode_integer(value, image.endian())?,
        None => 0,
    };

    Ok(Some(Variable {
        id: entry.id,
        name: variable_name(entry, &origins),
        location,
        ty: resolver.resolve(type_ref),
    }))
}

fn variable_name(entry: &DebugEntry, origins: &[&DebugEntry]) -> String {
    if let Some(name) = entry
        .name()
        .or_else(|| origins.iter().find_map(|origin| origin.name()))
    {
        return name.to_string();
    }
    std::iter::once(entry)
        .chain(origins.iter().copied())
        .find_map(linkage_name)
        .map(demangle_symbol)
        .unwrap_or_else(|| "<anonymous>".to_string())
}

fn linkage_name(entry: &DebugEntry) -> Option<&str> {
    [gimli::DW_AT_linkage_name, gimli::DW_AT_MIPS_linkage_name]
        .into_iter()
        .find_map(|attr| match entry.attr(attr)? {
            crate::analysis::image::AttrValue::String(name) => Some(name.as_str()),
            _ => None,
        })
}

pub fn demangle_symbol(raw_symbol_name: &str) -> String {
    if let Ok(demangled) = rustc_demangle::try_demangle(raw_symbol_name) {
        return format!("{demangled:#}");
    }
    raw_symbol_name.to_string()
}
