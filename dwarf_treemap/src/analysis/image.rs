//! Owned, already-decoded view of the debug-information entry tree.
//!
//! The loader fills a [`DebugImage`] from an object file; tests build one directly
//! through [`DebugImageBuilder`]. Everything downstream only sees this model.

use std::collections::HashMap;

use gimli::{DwAt, DwTag, Endianity, RunTimeEndian};
use tracing::debug;

use crate::model::EntryId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Udata(u64),
    Sdata(i64),
    Address(u64),
    Flag(bool),
    String(String),
    Ref(EntryId),
    /// ULEB128 expression length followed by the expression bytes.
    Exprloc(Vec<u8>),
    /// One-byte length prefix followed by the payload.
    Block1(Vec<u8>),
    /// Two-byte length prefix followed by the payload.
    Block2(Vec<u8>),
    /// Four-byte length prefix followed by the payload.
    Block4(Vec<u8>),
    Unsupported(String),
}

impl AttrValue {
    /// Encodes `expression` the way `DW_FORM_exprloc` stores it.
    pub fn exprloc(expression: &[u8]) -> Self {
        let mut raw = Vec::with_capacity(expression.len() + 1);
        gimli::leb128::write::unsigned(&mut raw, expression.len() as u64).ok();
        raw.extend_from_slice(expression);
        Self::Exprloc(raw)
    }

    /// A `DW_OP_addr <address>` location expression in the image's byte order.
    pub fn address_expression(address: u64, pointer_width: u8, endian: RunTimeEndian) -> Self {
        let bytes = if endian.is_little_endian() {
            address.to_le_bytes()
        } else {
            address.to_be_bytes()
        };
        let width = usize::from(pointer_width).min(8);
        let operand = if endian.is_little_endian() {
            &bytes[..width]
        } else {
            &bytes[8 - width..]
        };
        let mut expression = Vec::with_capacity(width + 1);
        expression.push(gimli::DW_OP_addr.0);
        expression.extend_from_slice(operand);
        Self::exprloc(&expression)
    }

    /// Encodes `payload` as the smallest block form that can hold its length.
    pub fn block(payload: &[u8], endian: RunTimeEndian) -> Self {
        Self::block_followed_by(payload, None, endian)
    }

    /// Like [`AttrValue::block`], keeping the byte that follows the block in its section.
    ///
    /// Block decoding reads one byte past the declared length, so the loader hands that byte
    /// along; it is the first byte of the next attribute or entry.
    pub fn block_followed_by(payload: &[u8], trailing: Option<u8>, endian: RunTimeEndian) -> Self {
        let length = payload.len() as u64;
        let (prefix_width, wrap): (usize, fn(Vec<u8>) -> AttrValue) = if length <= 0xff {
            (1, AttrValue::Block1)
        } else if length <= 0xffff {
            (2, AttrValue::Block2)
        } else {
            (4, AttrValue::Block4)
        };
        let prefix = if endian.is_little_endian() {
            length.to_le_bytes()[..prefix_width].to_vec()
        } else {
            length.to_be_bytes()[8 - prefix_width..].to_vec()
        };
        let mut raw = prefix;
        raw.extend_from_slice(payload);
        raw.extend(trailing);
        wrap(raw)
    }

    pub fn form_name(&self) -> String {
        match self {
            AttrValue::Udata(_) => "udata".to_string(),
            AttrValue::Sdata(_) => "sdata".to_string(),
            AttrValue::Address(_) => "addr".to_string(),
            AttrValue::Flag(_) => "flag".to_string(),
            AttrValue::String(_) => "string".to_string(),
            AttrValue::Ref(_) => "ref".to_string(),
            AttrValue::Exprloc(_) => "exprloc".to_string(),
            AttrValue::Block1(_) => "block1".to_string(),
            AttrValue::Block2(_) => "block2".to_string(),
            AttrValue::Block4(_) => "block4".to_string(),
            AttrValue::Unsupported(form) => form.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugEntry {
    pub id: EntryId,
    pub tag: DwTag,
    pub attrs: Vec<(DwAt, AttrValue)>,
    pub children: Vec<EntryId>,
}

impl DebugEntry {
    pub fn new(id: EntryId, tag: DwTag) -> Self {
        Self {
            id,
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: DwAt) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|(attr_name, _)| *attr_name == name)
            .map(|(_, value)| value)
    }

    pub fn name(&self) -> Option<&str> {
        match self.attr(gimli::DW_AT_name)? {
            AttrValue::String(name) => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn reference(&self, name: DwAt) -> Option<EntryId> {
        match self.attr(name)? {
            AttrValue::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn udata(&self, name: DwAt) -> Option<u64> {
        match self.attr(name)? {
            AttrValue::Udata(value) => Some(*value),
            AttrValue::Sdata(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn flag(&self, name: DwAt) -> bool {
        matches!(self.attr(name), Some(AttrValue::Flag(true)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileUnit {
    pub offset: u64,
    pub length: u64,
    pub name: Option<String>,
    pub root: EntryId,
}

#[derive(Debug, Clone)]
pub struct DebugImage {
    pointer_width: u8,
    endian: RunTimeEndian,
    units: Vec<CompileUnit>,
    entries: HashMap<EntryId, DebugEntry>,
}

impl DebugImage {
    pub fn pointer_width(&self) -> u8 {
        self.pointer_width
    }

    pub fn endian(&self) -> RunTimeEndian {
        self.endian
    }

    pub fn units(&self) -> &[CompileUnit] {
        &self.units
    }

    pub fn has_debug_info(&self) -> bool {
        !self.units.is_empty()
    }

    pub fn entry(&self, id: EntryId) -> Option<&DebugEntry> {
        self.entries.get(&id)
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn children(&self, id: EntryId) -> impl Iterator<Item = &DebugEntry> + '_ {
        self.entries
            .get(&id)
            .map(|entry| entry.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.entries.get(child))
    }
}

#[derive(Debug)]
pub struct DebugImageBuilder {
    image: DebugImage,
    next_offset: u64,
}

impl DebugImageBuilder {
    pub fn new(pointer_width: u8, endian: RunTimeEndian) -> Self {
        Self {
            image: DebugImage {
                pointer_width,
                endian,
                units: Vec::new(),
                entries: HashMap::new(),
            },
            next_offset: 0x0b,
        }
    }

    pub fn endian(&self) -> RunTimeEndian {
        self.image.endian
    }

    pub fn push_unit(&mut self, unit: CompileUnit) {
        self.image.units.push(unit);
    }

    /// Inserts an entry with a caller-chosen id and links it under `parent`.
    pub fn push_entry(&mut self, parent: Option<EntryId>, entry: DebugEntry) {
        let id = entry.id;
        self.next_offset = self.next_offset.max(id.0 + 1);
        self.image.entries.insert(id, entry);
        let Some(parent) = parent else {
            return;
        };
        match self.image.entries.get_mut(&parent) {
            Some(parent_entry) => parent_entry.children.push(id),
            None => debug!(%parent, child = %id, "parent entry missing; child left detached"),
        }
    }

    pub fn add_unit(&mut self, name: &str) -> EntryId {
        let root = self.allocate();
        let mut entry = DebugEntry::new(root, gimli::DW_TAG_compile_unit);
        entry
            .attrs
            .push((gimli::DW_AT_name, AttrValue::String(name.to_string())));
        self.push_entry(None, entry);
        self.push_unit(CompileUnit {
            offset: root.0,
            length: 0,
            name: Some(name.to_string()),
            root,
        });
        root
    }

    pub fn add_entry(&mut self, parent: EntryId, tag: DwTag) -> EntryId {
        let id = self.allocate();
        self.push_entry(Some(parent), DebugEntry::new(id, tag));
        id
    }

    pub fn set_attr(&mut self, id: EntryId, name: DwAt, value: AttrValue) -> &mut Self {
        match self.image.entries.get_mut(&id) {
            Some(entry) => {
                entry.attrs.retain(|(attr_name, _)| *attr_name != name);
                entry.attrs.push((name, value));
            }
            None => debug!(entry = %id, "attribute set on a missing entry"),
        }
        self
    }

    pub fn base_type(&mut self, parent: EntryId, name: &str, byte_size: u64) -> EntryId {
        let id = self.add_entry(parent, gimli::DW_TAG_base_type);
        self.set_attr(id, gimli::DW_AT_name, AttrValue::String(name.to_string()))
            .set_attr(id, gimli::DW_AT_byte_size, AttrValue::Udata(byte_size));
        id
    }

    pub fn pointer_to(&mut self, parent: EntryId, pointee: Option<EntryId>) -> EntryId {
        let id = self.add_entry(parent, gimli::DW_TAG_pointer_type);
        if let Some(pointee) = pointee {
            self.set_attr(id, gimli::DW_AT_type, AttrValue::Ref(pointee));
        }
        id
    }

    /// Adds a typedef, const or volatile wrapper around `target`.
    pub fn qualifier(
        &mut self,
        parent: EntryId,
        tag: DwTag,
        name: Option<&str>,
        target: Option<EntryId>,
    ) -> EntryId {
        let id = self.add_entry(parent, tag);
        if let Some(name) = name {
            self.set_attr(id, gimli::DW_AT_name, AttrValue::String(name.to_string()));
        }
        if let Some(target) = target {
            self.set_attr(id, gimli::DW_AT_type, AttrValue::Ref(target));
        }
        id
    }

    /// Adds a struct, class or union entry; members are attached with [`Self::member`].
    pub fn composite(
        &mut self,
        parent: EntryId,
        tag: DwTag,
        name: Option<&str>,
        byte_size: Option<u64>,
    ) -> EntryId {
        let id = self.add_entry(parent, tag);
        if let Some(name) = name {
            self.set_attr(id, gimli::DW_AT_name, AttrValue::String(name.to_string()));
        }
        if let Some(byte_size) = byte_size {
            self.set_attr(id, gimli::DW_AT_byte_size, AttrValue::Udata(byte_size));
        }
        id
    }

    pub fn member(
        &mut self,
        composite: EntryId,
        name: &str,
        ty: EntryId,
        offset: Option<u64>,
    ) -> EntryId {
        let id = self.add_entry(composite, gimli::DW_TAG_member);
        self.set_attr(id, gimli::DW_AT_name, AttrValue::String(name.to_string()))
            .set_attr(id, gimli::DW_AT_type, AttrValue::Ref(ty));
        if let Some(offset) = offset {
            self.set_attr(id, gimli::DW_AT_data_member_location, AttrValue::Udata(offset));
        }
        id
    }

    /// Adds an array type with one subrange per entry of `counts`, outermost dimension first.
    pub fn array_of(&mut self, parent: EntryId, element: EntryId, counts: &[u64]) -> EntryId {
        let id = self.add_entry(parent, gimli::DW_TAG_array_type);
        self.set_attr(id, gimli::DW_AT_type, AttrValue::Ref(element));
        for &count in counts {
            let subrange = self.add_entry(id, gimli::DW_TAG_subrange_type);
            self.set_attr(subrange, gimli::DW_AT_count, AttrValue::Udata(count));
        }
        id
    }

    pub fn variable(
        &mut self,
        parent: EntryId,
        name: &str,
        ty: Option<EntryId>,
        location: Option<AttrValue>,
    ) -> EntryId {
        let id = self.add_entry(parent, gimli::DW_TAG_variable);
        self.set_attr(id, gimli::DW_AT_name, AttrValue::String(name.to_string()));
        if let Some(ty) = ty {
            self.set_attr(id, gimli::DW_AT_type, AttrValue::Ref(ty));
        }
        if let Some(location) = location {
            self.set_attr(id, gimli::DW_AT_location, location);
        }
        id
    }

    pub fn build(self) -> DebugImage {
        self.image
    }

    fn allocate(&mut self) -> EntryId {
        let id = EntryId(self.next_offset);
        self.next_offset += 1;
        id
    }
}
