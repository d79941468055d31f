use dwarf_treemap::layout::Rect;
use dwarf_treemap::model::{EntryId, TreemapRect, Type, TypeKind, Variable};
use dwarf_treemap::partition::{PartitionOptions, partition};

fn base(name: &str, size: Option<u64>) -> Type {
    Type {
        id: EntryId(0),
        tag: gimli::DW_TAG_base_type,
        name: name.to_string(),
        size,
        kind: TypeKind::Base,
    }
}

fn composite(name: &str, size: u64, union: bool, members: Vec<Variable>) -> Type {
    Type {
        id: EntryId(0),
        tag: if union {
            gimli::DW_TAG_union_type
        } else {
            gimli::DW_TAG_structure_type
        },
        name: name.to_string(),
        size: Some(size),
        kind: if union {
            TypeKind::Union { members }
        } else {
            TypeKind::Struct { members }
        },
    }
}

fn array(element: Type, count: u64) -> Type {
    Type {
        id: EntryId(0),
        tag: gimli::DW_TAG_array_type,
        name: format!("{}[{count}]", element.name),
        size: element.size.map(|size| size * count),
        kind: TypeKind::Array {
            element: Box::new(element),
            count,
        },
    }
}

fn var(name: &str, location: u64, ty: Type) -> Variable {
    Variable {
        id: EntryId(0),
        name: name.to_string(),
        location,
        ty,
    }
}

fn options(depth: u32, border: f64) -> PartitionOptions {
    PartitionOptions { depth, border }
}

fn labels(rects: &[TreemapRect]) -> Vec<&str> {
    rects.iter().map(|rect| rect.label.as_str()).collect()
}

const BOUNDS: Rect = Rect {
    x: 0.0,
    y: 0.0,
    width: 100.0,
    height: 100.0,
};

#[test]
fn leaf_areas_cover_the_canvas_without_borders() {
    let variables = vec![
        var("a", 0x10, base("int", Some(4))),
        var("b", 0x18, base("double", Some(8))),
        var("c", 0x20, array(base("char", Some(1)), 4)),
    ];

    let rects = partition(&variables, BOUNDS, options(0, 0.0));
    assert_eq!(rects.len(), 3);
    let total = rects.iter().map(TreemapRect::area).sum::<f64>();
    assert!((total - BOUNDS.area()).abs() <= 1e-6);
}

#[test]
fn top_level_variables_are_placed_largest_first() {
    let variables = vec![
        var("small", 0, base("char", Some(1))),
        var("large", 0, base("double", Some(8))),
        var("medium", 0, base("int", Some(4))),
    ];

    let rects = partition(&variables, BOUNDS, options(0, 0.0));
    assert_eq!(
        labels(&rects),
        vec!["double large", "int medium", "char small"]
    );
}

#[test]
fn depth_zero_emits_composites_as_single_rects() {
    let inner = composite("S", 8, false, vec![
        var("a", 0, base("int", Some(4))),
        var("b", 4, base("int", Some(4))),
    ]);
    let variables = vec![var("s", 0x100, inner)];

    let rects = partition(&variables, BOUNDS, options(0, 2.0));
    assert_eq!(labels(&rects), vec!["S s"]);
    assert_eq!(rects[0].size, 8);
    assert_eq!((rects[0].width, rects[0].height), (100.0, 100.0));
}

#[test]
fn struct_children_are_laid_out_inside_the_border() {
    let inner = composite("Inner", 8, false, vec![
        var("a", 0, base("int", Some(4))),
        var("b", 4, base("int", Some(4))),
    ]);
    let outer = composite("Outer", 8, false, vec![var("i", 0, inner)]);
    let variables = vec![var("outer", 0x200, outer)];

    let rects = partition(&variables, BOUNDS, options(1, 2.0));
    assert_eq!(labels(&rects), vec!["Inner outer.i"]);
    let rect = &rects[0];
    assert_eq!((rect.x, rect.y), (2.0, 2.0));
    assert_eq!((rect.width, rect.height), (96.0, 96.0));

    let deeper = partition(&variables, BOUNDS, options(2, 2.0));
    let mut deeper_labels = labels(&deeper);
    deeper_labels.sort_unstable();
    assert_eq!(deeper_labels, vec!["int outer.i.a", "int outer.i.b"]);
    for rect in &deeper {
        assert!(rect.x >= 4.0 - 1e-9 && rect.y >= 4.0 - 1e-9);
        assert!(rect.x + rect.width <= 96.0 + 1e-9);
        assert!(rect.y + rect.height <= 96.0 + 1e-9);
    }
}

#[test]
fn union_shows_only_its_largest_member_over_the_whole_rect() {
    let number = composite("Number", 8, true, vec![
        var("x", 0, base("int", Some(4))),
        var("y", 0, base("double", Some(8))),
    ]);
    let variables = vec![var("u", 0x300, number)];

    let rects = partition(&variables, BOUNDS, options(1, 5.0));
    assert_eq!(rects.len(), 1);
    assert_eq!(rects[0].label, "double u.y");
    assert_eq!(
        (rects[0].x, rects[0].y, rects[0].width, rects[0].height),
        (0.0, 0.0, 100.0, 100.0)
    );
}

#[test]
fn array_elements_are_named_by_index() {
    let variables = vec![var("arr", 0x400, array(base("int", Some(4)), 4))];

    let rects = partition(&variables, BOUNDS, options(1, 0.0));
    let mut names = labels(&rects);
    names.sort_unstable();
    assert_eq!(
        names,
        vec!["int arr[0]", "int arr[1]", "int arr[2]", "int arr[3]"]
    );
    for rect in &rects {
        assert!((rect.area() - 2500.0).abs() <= 1e-6);
    }
}

#[test]
fn unresolved_and_zero_sizes_take_no_area() {
    let variables = vec![
        var("opaque", 0, base("struct opaque", None)),
        var("empty", 0, array(base("int", Some(4)), 0)),
        var("counter", 0, base("int", Some(4))),
    ];

    let rects = partition(&variables, BOUNDS, options(3, 0.0));
    assert_eq!(labels(&rects), vec!["int counter"]);
}

#[test]
fn composite_without_placeable_children_is_emitted_itself() {
    let hollow = composite("Hollow", 16, false, vec![var("blob", 0, base("blob", None))]);
    let variables = vec![var("h", 0, hollow)];

    let rects = partition(&variables, BOUNDS, options(3, 1.0));
    assert_eq!(labels(&rects), vec!["Hollow h"]);
    assert_eq!(rects[0].size, 16);
}

#[test]
fn partition_is_deterministic() {
    let inner = composite("Pair", 12, false, vec![
        var("first", 0, base("int", Some(4))),
        var("second", 4, base("double", Some(8))),
    ]);
    let variables = vec![
        var("pairs", 0x10, array(inner, 3)),
        var("flag", 0x60, base("bool", Some(1))),
    ];

    let first = partition(&variables, BOUNDS, options(4, 1.0));
    let second = partition(&variables, BOUNDS, options(4, 1.0));
    assert_eq!(first, second);
    assert!(!first.is_empty());
}

#[test]
fn arrays_too_large_to_expand_are_drawn_whole() {
    let variables = vec![var("table", 0, array(base("char", Some(1)), 1 << 40))];

    let rects = partition(&variables, BOUNDS, options(2, 0.0));
    assert_eq!(labels(&rects), vec!["char[1099511627776] table"]);
    assert_eq!(rects[0].size, 1 << 40);
}
