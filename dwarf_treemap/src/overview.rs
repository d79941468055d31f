use std::fmt::Write as _;

use crate::model::{OverviewNode, Type, TypeKind, Variable};

/// Nested summary of the variables: address, type, name and size, down to `depth` levels.
///
/// Member addresses are the parent address plus the member offset; array element `i` sits at
/// the base address plus `i` element sizes.
pub fn overview<'a>(
    variables: impl IntoIterator<Item = &'a Variable>,
    depth: u32,
) -> Vec<OverviewNode> {
    variables
        .into_iter()
        .map(|variable| build_node(&variable.name, variable.location, &variable.ty, depth))
        .collect()
}

fn build_node(name: &str, address: u64, ty: &Type, depth: u32) -> OverviewNode {
    let children = if depth == 0 {
        Vec::new()
    } else {
        match &ty.kind {
            TypeKind::Base | TypeKind::Pointer { .. } => Vec::new(),
            TypeKind::Struct { members } | TypeKind::Union { members } => members
                .iter()
                .map(|member| {
                    build_node(
                        &member.name,
                        address.saturating_add(member.location),
                        &member.ty,
                        depth - 1,
                    )
                })
                .collect(),
            TypeKind::Array { .. } => {
                let Some((element, count)) = ty.expandable_elements() else {
                    return leaf(name, address, ty);
                };
                let stride = element.size.unwrap_or(0);
                (0..count)
                    .map(|index| {
                        build_node(
                            &format!("[{index}]"),
                            address.saturating_add(index.saturating_mul(stride)),
                            element,
                            depth - 1,
                        )
                    })
                    .collect()
            }
        }
    };

    OverviewNode {
        children,
        ..leaf(name, address, ty)
    }
}

fn leaf(name: &str, address: u64, ty: &Type) -> OverviewNode {
    OverviewNode {
        address,
        type_name: ty.name.clone(),
        name: name.to_string(),
        bytes: ty.size,
        children: Vec::new(),
    }
}

/// Renders the overview as indented text, one line per node.
pub fn render_overview(nodes: &[OverviewNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, 0, &mut out);
    }
    out
}

fn render_node(node: &OverviewNode, indent: usize, out: &mut String) {
    let size = node
        .bytes
        .map(format_bytes)
        .unwrap_or_else(|| "unknown size".to_string());
    let _ = writeln!(
        out,
        "{:indent$}0x{:08x} {} {} ({size})",
        "",
        node.address,
        node.type_name,
        node.name,
        indent = indent * 2
    );
    for child in &node.children {
        render_node(child, indent + 1, out);
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = 1024.0 * 1024.0;

    let bytes_f64 = bytes as f64;
    if bytes_f64 >= MIB {
        return format!("{:.2} MiB", bytes_f64 / MIB);
    }
    if bytes_f64 >= KIB {
        return format!("{:.2} KiB", bytes_f64 / KIB);
    }
    format!("{bytes} B")
}
