//! Contains pure functions for collecting nodes along each XPath axis.
//!
//! Every collector appends in axis order: document order for forward axes,
//! nearest-first (reverse document order) for reverse axes.

use crate::ast::Axis;
use crate::datasource::{DataSource, NodeId, NodeType};

/// A collector resolved once per step at compile time.
pub type AxisCollector = fn(&dyn DataSource, NodeId, &mut Vec<NodeId>);

pub fn collector(axis: Axis) -> AxisCollector {
    match axis {
        Axis::Child => collect_child_nodes,
        Axis::Descendant => collect_descendant_nodes,
        Axis::DescendantOrSelf => collect_descendant_or_self_nodes,
        Axis::Attribute => collect_attribute_nodes,
        Axis::Namespace => collect_namespace_nodes,
        Axis::Parent => collect_parent_nodes,
        Axis::Ancestor => collect_ancestor_nodes,
        Axis::AncestorOrSelf => collect_ancestor_or_self_nodes,
        Axis::SelfAxis => collect_self_nodes,
        Axis::FollowingSibling => collect_following_sibling_nodes,
        Axis::PrecedingSibling => collect_preceding_sibling_nodes,
        Axis::Following => collect_following_nodes,
        Axis::Preceding => collect_preceding_nodes,
    }
}

fn is_attached(source: &dyn DataSource, node: NodeId) -> bool {
    matches!(
        source.node_type(node),
        NodeType::Attribute | NodeType::Namespace
    )
}

pub fn collect_self_nodes(_source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    results.push(node);
}

pub fn collect_child_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    results.extend(source.children(node));
}

pub fn collect_attribute_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    if source.node_type(node) == NodeType::Element {
        results.extend(source.attributes(node));
    }
}

pub fn collect_namespace_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    if source.node_type(node) == NodeType::Element {
        results.extend(source.namespaces(node));
    }
}

pub fn collect_descendant_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    // Pre-order walk with an explicit stack; children are pushed reversed.
    let mut stack: Vec<NodeId> = source.children(node).collect();
    stack.reverse();
    while let Some(current) = stack.pop() {
        results.push(current);
        let start = stack.len();
        stack.extend(source.children(current));
        stack[start..].reverse();
    }
}

pub fn collect_descendant_or_self_nodes(
    source: &dyn DataSource,
    node: NodeId,
    results: &mut Vec<NodeId>,
) {
    results.push(node);
    collect_descendant_nodes(source, node, results);
}

pub fn collect_parent_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    if let Some(parent) = source.parent(node) {
        results.push(parent);
    }
}

pub fn collect_ancestor_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    let mut current = source.parent(node);
    while let Some(p) = current {
        results.push(p);
        current = source.parent(p);
    }
}

pub fn collect_ancestor_or_self_nodes(
    source: &dyn DataSource,
    node: NodeId,
    results: &mut Vec<NodeId>,
) {
    results.push(node);
    collect_ancestor_nodes(source, node, results);
}

pub fn collect_following_sibling_nodes(
    source: &dyn DataSource,
    node: NodeId,
    results: &mut Vec<NodeId>,
) {
    if is_attached(source, node) {
        return;
    }
    if let Some(parent) = source.parent(node) {
        results.extend(source.children(parent).skip_while(|&s| s != node).skip(1));
    }
}

pub fn collect_preceding_sibling_nodes(
    source: &dyn DataSource,
    node: NodeId,
    results: &mut Vec<NodeId>,
) {
    if is_attached(source, node) {
        return;
    }
    if let Some(parent) = source.parent(node) {
        let start = results.len();
        results.extend(source.children(parent).take_while(|&s| s != node));
        results[start..].reverse();
    }
}

pub fn collect_following_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    let mut current = node;
    // The following axis of an attribute starts with its element's content.
    if is_attached(source, node) {
        let Some(owner) = source.parent(node) else {
            return;
        };
        collect_descendant_nodes(source, owner, results);
        current = owner;
    }
    while let Some(parent) = source.parent(current) {
        for sibling in source.children(parent).skip_while(|&s| s != current).skip(1) {
            collect_descendant_or_self_nodes(source, sibling, results);
        }
        current = parent;
    }
}

pub fn collect_preceding_nodes(source: &dyn DataSource, node: NodeId, results: &mut Vec<NodeId>) {
    let mut current = node;
    if is_attached(source, node) {
        let Some(owner) = source.parent(node) else {
            return;
        };
        current = owner;
    }
    // Each level is gathered in document order, then emitted nearest-first.
    let mut level = Vec::new();
    while let Some(parent) = source.parent(current) {
        level.clear();
        for sibling in source.children(parent).take_while(|&s| s != current) {
            collect_descendant_or_self_nodes(source, sibling, &mut level);
        }
        results.extend(level.iter().rev());
        current = parent;
    }
}
