use std::borrow::Cow;
use std::path::{Path, PathBuf};

use gimli::{AttributeValue, EndianSlice, RunTimeEndian, Section};
use object::{Object, ObjectSection};
use tracing::{debug, warn};

use crate::analysis::image::{AttrValue, CompileUnit, DebugEntry, DebugImage, DebugImageBuilder};
use crate::error::TreemapError;
use crate::model::EntryId;

type Reader<'data> = EndianSlice<'data, RunTimeEndian>;

pub fn read_image_bytes(binary_path: &Path) -> Result<Vec<u8>, TreemapError> {
    std::fs::read(binary_path).map_err(|source| TreemapError::Io {
        path: binary_path.to_path_buf(),
        source,
    })
}

/// Parses an object file and materialises its DWARF entry tree.
///
/// A container without `.debug_info` is not an error: the returned image simply has no units.
pub fn load_image(data: &[u8]) -> Result<DebugImage, TreemapError> {
    let file = object::File::parse(data)?;
    let endian = if file.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    let pointer_width = if file.is_64() { 8 } else { 4 };
    let mut builder = DebugImageBuilder::new(pointer_width, endian);

    if file.section_by_name(".debug_info").is_none() {
        debug!("object file has no .debug_info section");
        return Ok(builder.build());
    }

    let load_section = |id: gimli::SectionId| -> Result<Cow<[u8]>, gimli::Error> {
        let Some(section) = file.section_by_name(id.name()) else {
            return Ok(Cow::Borrowed(&[]));
        };
        Ok(section.uncompressed_data().unwrap_or_else(|error| {
            warn!(section = id.name(), %error, "cannot decompress section; treating it as empty");
            Cow::Borrowed(&[])
        }))
    };
    let dwarf_cow = gimli::Dwarf::load(load_section)?;
    let dwarf = dwarf_cow.borrow(|section| EndianSlice::new(section, endian));

    let mut units = dwarf.units();
    while let Some(header) = units.next()? {
        let unit = dwarf.unit(header)?;
        load_unit(&dwarf, &unit, &mut builder)?;
    }

    let image = builder.build();
    debug!(
        units = image.units().len(),
        entries = image.entry_count(),
        pointer_width,
        "loaded debug image"
    );
    Ok(image)
}

fn load_unit(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    builder: &mut DebugImageBuilder,
) -> Result<(), TreemapError> {
    let mut tree = unit.entries_tree(None)?;
    let root = load_node(dwarf, unit, tree.root()?, None, builder)?;

    let offset = unit
        .header
        .offset()
        .as_debug_info_offset()
        .map(|offset| offset.0 as u64)
        .unwrap_or(root.0);
    builder.push_unit(CompileUnit {
        offset,
        length: unit.header.unit_length() as u64,
        name: unit_full_path(unit),
        root,
    });
    Ok(())
}

fn load_node(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    node: gimli::EntriesTreeNode<'_, '_, '_, Reader<'_>>,
    parent: Option<EntryId>,
    builder: &mut DebugImageBuilder,
) -> Result<EntryId, TreemapError> {
    let entry = node.entry();
    let id = entry_id(unit, entry.offset());

    let mut attrs = Vec::new();
    let mut iter = entry.attrs();
    while let Some(attr) = iter.next()? {
        attrs.push((attr.name(), convert_attr(dwarf, unit, &attr, builder.endian())));
    }
    builder.push_entry(
        parent,
        DebugEntry {
            id,
            tag: entry.tag(),
            attrs,
            children: Vec::new(),
        },
    );

    let mut children = node.children();
    while let Some(child) = children.next()? {
        load_node(dwarf, unit, child, Some(id), builder)?;
    }
    Ok(id)
}

fn entry_id(unit: &gimli::Unit<Reader<'_>>, offset: gimli::UnitOffset) -> EntryId {
    offset
        .to_debug_info_offset(&unit.header)
        .map(|global| EntryId(global.0 as u64))
        .unwrap_or(EntryId(offset.0 as u64))
}

fn convert_attr(
    dwarf: &gimli::Dwarf<Reader<'_>>,
    unit: &gimli::Unit<Reader<'_>>,
    attr: &gimli::Attribute<Reader<'_>>,
    endian: RunTimeEndian,
) -> AttrValue {
    // Blocks are kept raw so the decoder sees the original form, not gimli's exprloc view.
    if let AttributeValue::Block(block) = attr.raw_value() {
        let trailing = byte_after(dwarf.debug_info.reader().slice(), block.slice());
        return AttrValue::block_followed_by(block.slice(), trailing, endian);
    }
    if attr.name() == gimli::DW_AT_upper_bound
        && let Some(bound) = signed_bound(&attr.value(), unit.header.address_size())
    {
        return AttrValue::Sdata(bound);
    }

    match attr.value() {
        AttributeValue::Addr(address) => AttrValue::Address(address),
        AttributeValue::DebugAddrIndex(index) => dwarf
            .address(unit, index)
            .map(AttrValue::Address)
            .unwrap_or_else(|_| AttrValue::Unsupported("DebugAddrIndex".to_string())),
        AttributeValue::Udata(value) => AttrValue::Udata(value),
        AttributeValue::Data1(value) => AttrValue::Udata(value.into()),
        AttributeValue::Data2(value) => AttrValue::Udata(value.into()),
        AttributeValue::Data4(value) => AttrValue::Udata(value.into()),
        AttributeValue::Data8(value) => AttrValue::Udata(value),
        AttributeValue::Sdata(value) => AttrValue::Sdata(value),
        AttributeValue::Flag(flag) => AttrValue::Flag(flag),
        AttributeValue::Encoding(encoding) => AttrValue::Udata(encoding.0.into()),
        AttributeValue::Exprloc(expression) => AttrValue::exprloc(expression.0.slice()),
        AttributeValue::UnitRef(offset) => AttrValue::Ref(entry_id(unit, offset)),
        AttributeValue::DebugInfoRef(offset) => AttrValue::Ref(EntryId(offset.0 as u64)),
        other => match dwarf.attr_string(unit, other.clone()) {
            Ok(text) => AttrValue::String(text.to_string_lossy().into_owned()),
            Err(_) => AttrValue::Unsupported(value_kind(&other)),
        },
    }
}

/// The `.debug_info` byte right after `payload`, when `payload` lies inside that section.
fn byte_after(section: &[u8], payload: &[u8]) -> Option<u8> {
    if !section.as_ptr_range().contains(&payload.as_ptr()) {
        return None;
    }
    let start = (payload.as_ptr() as usize) - (section.as_ptr() as usize);
    section.get(start.checked_add(payload.len())?).copied()
}

/// Data forms at least as wide as an address are sign-extended: `int tail[]` is emitted with
/// an all-ones upper bound. Narrower forms carry small positive bounds and stay unsigned.
fn signed_bound(value: &AttributeValue<Reader<'_>>, address_size: u8) -> Option<i64> {
    let width = match value {
        AttributeValue::Data1(_) => 1,
        AttributeValue::Data2(_) => 2,
        AttributeValue::Data4(_) => 4,
        AttributeValue::Data8(_) => 8,
        _ => return None,
    };
    if width < address_size {
        return None;
    }
    value.sdata_value()
}

fn value_kind(value: &AttributeValue<Reader<'_>>) -> String {
    let rendered = format!("{value:?}");
    rendered
        .split('(')
        .next()
        .unwrap_or(rendered.as_str())
        .to_string()
}

fn unit_full_path(unit: &gimli::Unit<Reader<'_>>) -> Option<String> {
    let name = unit.name?.to_string_lossy().into_owned();
    let path = PathBuf::from(&name);
    if path.is_absolute() {
        return Some(name);
    }
    match unit.comp_dir {
        Some(comp_dir) => Some(
            PathBuf::from(comp_dir.to_string_lossy().as_ref())
                .join(path)
                .display()
                .to_string(),
        ),
        None => Some(name),
    }
}
