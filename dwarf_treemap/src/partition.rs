//! Recursive treemap partitioning of a resolved variable forest.

use std::borrow::Cow;

use tracing::debug;

use crate::layout::{Rect, layout_treemap};
use crate::model::{TreemapRect, Type, TypeKind, Variable};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartitionOptions {
    /// Composite levels that may still be expanded below the top-level variables.
    pub depth: u32,
    /// Inset applied on all four sides of a struct or array before laying out its children.
    pub border: f64,
}

/// Lays the variables out in `bounds` and expands composites up to `options.depth` levels.
///
/// Variables are placed largest first; unresolved and zero sizes take no area.
pub fn partition<'a>(
    variables: impl IntoIterator<Item = &'a Variable>,
    bounds: Rect,
    options: PartitionOptions,
) -> Vec<TreemapRect> {
    let nodes = sorted_by_size(variables.into_iter().map(Node::from_variable).collect());
    let mut out = Vec::new();
    place_children(&nodes, bounds, options.depth, None, options.border, &mut out);
    out
}

#[derive(Debug, Clone)]
struct Node<'a> {
    name: Cow<'a, str>,
    ty: &'a Type,
}

impl<'a> Node<'a> {
    fn from_variable(variable: &'a Variable) -> Self {
        Self {
            name: Cow::Borrowed(variable.name.as_str()),
            ty: &variable.ty,
        }
    }

    fn area_weight(&self) -> u64 {
        self.ty.size.unwrap_or(0)
    }
}

fn sorted_by_size(mut nodes: Vec<Node<'_>>) -> Vec<Node<'_>> {
    nodes.sort_by(|left, right| right.area_weight().cmp(&left.area_weight()));
    nodes
}

fn child_path(parent: Option<&str>, child: &str) -> String {
    match parent {
        None => child.to_string(),
        Some(parent) if child.starts_with('[') => format!("{parent}{child}"),
        Some(parent) => format!("{parent}.{child}"),
    }
}

/// Returns how many children received a rectangle.
fn place_children(
    children: &[Node<'_>],
    bounds: Rect,
    depth: u32,
    parent_path: Option<&str>,
    border: f64,
    out: &mut Vec<TreemapRect>,
) -> usize {
    let sizes = children.iter().map(Node::area_weight).collect::<Vec<_>>();
    let placements = layout_treemap(&sizes, bounds);
    for placement in &placements {
        let child = &children[placement.index];
        let path = child_path(parent_path, &child.name);
        place_node(child, placement.rect, depth, &path, border, out);
    }
    placements.len()
}

fn place_node(
    node: &Node<'_>,
    rect: Rect,
    depth: u32,
    path: &str,
    border: f64,
    out: &mut Vec<TreemapRect>,
) {
    if depth == 0 {
        emit(node, rect, path, out);
        return;
    }

    match &node.ty.kind {
        TypeKind::Base | TypeKind::Pointer { .. } => emit(node, rect, path, out),
        TypeKind::Struct { members } => {
            let children = sorted_by_size(members.iter().map(Node::from_variable).collect());
            expand(node, &children, rect, depth, path, border, out);
        }
        TypeKind::Union { members } => {
            // Members alias the same storage: only the largest is shown, over the whole rectangle.
            let largest = sorted_by_size(members.iter().map(Node::from_variable).collect())
                .into_iter()
                .next()
                .filter(|member| member.area_weight() > 0);
            match largest {
                Some(member) => {
                    let member_path = child_path(Some(path), &member.name);
                    place_node(&member, rect, depth - 1, &member_path, border, out);
                }
                None => emit(node, rect, path, out),
            }
        }
        TypeKind::Array { count, .. } => match node.ty.expandable_elements() {
            Some((element, count)) => {
                let children = (0..count)
                    .map(|index| Node {
                        name: Cow::Owned(format!("[{index}]")),
                        ty: element,
                    })
                    .collect::<Vec<_>>();
                expand(node, &children, rect, depth, path, border, out);
            }
            None => {
                debug!(path, count, "array too large to expand; drawing it whole");
                emit(node, rect, path, out);
            }
        },
    }
}

fn expand(
    node: &Node<'_>,
    children: &[Node<'_>],
    rect: Rect,
    depth: u32,
    path: &str,
    border: f64,
    out: &mut Vec<TreemapRect>,
) {
    let placed = rect
        .inset(border)
        .map(|inner| place_children(children, inner, depth - 1, Some(path), border, out))
        .unwrap_or(0);
    if placed == 0 {
        emit(node, rect, path, out);
    }
}

fn emit(node: &Node<'_>, rect: Rect, path: &str, out: &mut Vec<TreemapRect>) {
    out.push(TreemapRect {
        x: rect.x,
        y: rect.y,
        width: rect.width,
        height: rect.height,
        label: format!("{} {}", node.ty.name, path),
        size: node.area_weight(),
    });
}
