use gimli::DwTag;

/// Offset of a debug-information entry, unique within one loaded image.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct EntryId(pub u64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<0x{:x}>", self.0)
    }
}

/// A resolved type. Every `Type` is an owned value; two variables never share one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub id: EntryId,
    pub tag: DwTag,
    pub name: String,
    /// `None` when the size could not be resolved. Never coerced to zero here.
    pub size: Option<u64>,
    pub kind: TypeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Base,
    /// The pointee is only referenced, never resolved, so self-referential types terminate.
    Pointer {
        pointee: Option<EntryId>,
    },
    Struct {
        members: Vec<Variable>,
    },
    Union {
        members: Vec<Variable>,
    },
    Array {
        element: Box<Type>,
        count: u64,
    },
}

/// Arrays with more elements than this are shown as one block instead of element by element.
pub const MAX_EXPANDED_ELEMENTS: u64 = 1 << 16;

impl Type {
    pub fn unresolved(id: EntryId, tag: DwTag, name: impl Into<String>) -> Self {
        Self {
            id,
            tag,
            name: name.into(),
            size: None,
            kind: TypeKind::Base,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Struct { .. } | TypeKind::Union { .. } | TypeKind::Array { .. }
        )
    }

    /// Element type and count of an array small enough to expand element by element.
    pub fn expandable_elements(&self) -> Option<(&Type, u64)> {
        match &self.kind {
            TypeKind::Array { element, count } if *count <= MAX_EXPANDED_ELEMENTS => {
                Some((element.as_ref(), *count))
            }
            _ => None,
        }
    }

    pub fn members(&self) -> &[Variable] {
        match &self.kind {
            TypeKind::Struct { members } | TypeKind::Union { members } => members,
            TypeKind::Base | TypeKind::Pointer { .. } | TypeKind::Array { .. } => &[],
        }
    }
}

/// A named, located, typed thing: a global variable, a struct member, or an array element.
///
/// For members `location` is the byte offset inside the parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub id: EntryId,
    pub name: String,
    pub location: u64,
    pub ty: Type,
}

impl Variable {
    pub fn size(&self) -> Option<u64> {
        self.ty.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AddressRange {
    pub low: u64,
    pub high: u64,
}

impl AddressRange {
    pub fn contains(self, address: u64) -> bool {
        (self.low..=self.high).contains(&address)
    }
}

/// One rectangle of the rendered treemap.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TreemapRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    pub size: u64,
}

impl TreemapRect {
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct OverviewNode {
    pub address: u64,
    pub type_name: String,
    pub name: String,
    pub bytes: Option<u64>,
    pub children: Vec<OverviewNode>,
}
