//! Defines the core abstraction for a navigable, read-only document tree.
use std::cmp::Ordering;
use std::fmt;

/// An opaque handle to a node, minted by a [`DataSource`].
///
/// Handles carry no lifetime so that compiled expressions, which capture no
/// document state, can be cached once and evaluated against any document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    pub const fn new(raw: u64) -> Self {
        NodeId(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:#x})", self.0)
    }
}

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

impl fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => f.write_str(self.local_part),
        }
    }
}

/// The type of a node in the document tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Namespace,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The contract every document backend fulfils for the engine.
///
/// The engine is written exclusively against this trait, so any tree (an XML
/// DOM, a JSON view, a test fixture) that can answer these questions can be
/// queried. Implementations must be read-only from the engine's perspective.
pub trait DataSource {
    /// The type of the node (Element, Text, Attribute, etc.).
    fn node_type(&self, node: NodeId) -> NodeType;

    /// The qualified name of the node. Returns `None` for text, comment and root
    /// nodes. For a processing instruction this is its target, for a namespace
    /// node the bound prefix (`None` prefix and empty local part for the default
    /// namespace).
    fn name(&self, node: NodeId) -> Option<QName<'_>>;

    /// The namespace URI of an element or attribute, `None` when it has none.
    fn namespace_uri(&self, node: NodeId) -> Option<&str>;

    /// The string value of the node, as defined by the XPath 1.0 `string()` function.
    /// - For an element or the root, the concatenation of all descendant text nodes.
    /// - For a text, comment or processing instruction, its content.
    /// - For an attribute, its value. For a namespace node, its URI.
    fn string_value(&self, node: NodeId) -> String;

    /// The parent node. Attributes and namespace nodes report their owning element.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// The child nodes in document order. Never yields attributes or namespace nodes.
    fn children(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_>;

    /// The attribute nodes of an element, empty for anything else.
    fn attributes(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_>;

    /// The in-scope namespace nodes of an element, empty for anything else.
    fn namespaces(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_>;

    /// Total document order between two handles of the same document.
    fn compare_order(&self, a: NodeId, b: NodeId) -> Ordering;

    /// The root of the tree containing `node`.
    fn root_of(&self, node: NodeId) -> NodeId {
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }
}

/// Sorts a node list into document order and drops duplicates.
pub fn sort_document_order(source: &dyn DataSource, nodes: &mut Vec<NodeId>) {
    nodes.sort_by(|a, b| source.compare_order(*a, *b));
    nodes.dedup();
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct MockNodeData {
        node_type: NodeType,
        prefix: Option<String>,
        local_name: Option<String>,
        namespace_uri: Option<String>,
        value: String,
        parent: Option<usize>,
        children: Vec<usize>,
        attributes: Vec<usize>,
        namespaces: Vec<usize>,
    }

    impl MockNodeData {
        fn new(node_type: NodeType, parent: Option<usize>) -> Self {
            Self {
                node_type,
                prefix: None,
                local_name: None,
                namespace_uri: None,
                value: String::new(),
                parent,
                children: vec![],
                attributes: vec![],
                namespaces: vec![],
            }
        }
    }

    /// An in-memory tree where node ids are indexes into a flat arena.
    #[derive(Debug)]
    pub struct MockTree {
        nodes: Vec<MockNodeData>,
        // Document-order rank for each node index.
        order: Vec<usize>,
    }

    impl MockTree {
        pub fn root(&self) -> NodeId {
            NodeId::new(0)
        }

        fn data(&self, node: NodeId) -> Option<&MockNodeData> {
            self.nodes.get(node.get() as usize)
        }
    }

    /// Builds a [`MockTree`] node by node. Index 0 is always the root.
    #[derive(Debug)]
    pub struct MockTreeBuilder {
        nodes: Vec<MockNodeData>,
    }

    impl Default for MockTreeBuilder {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockTreeBuilder {
        pub fn new() -> Self {
            Self {
                nodes: vec![MockNodeData::new(NodeType::Root, None)],
            }
        }

        pub fn root(&self) -> NodeId {
            NodeId::new(0)
        }

        fn push(&mut self, data: MockNodeData) -> usize {
            self.nodes.push(data);
            self.nodes.len() - 1
        }

        pub fn element(&mut self, parent: NodeId, name: &str) -> NodeId {
            self.element_ns(parent, None, name, None)
        }

        pub fn element_ns(
            &mut self,
            parent: NodeId,
            prefix: Option<&str>,
            local_name: &str,
            namespace_uri: Option<&str>,
        ) -> NodeId {
            let parent_idx = parent.get() as usize;
            let mut data = MockNodeData::new(NodeType::Element, Some(parent_idx));
            data.prefix = prefix.map(str::to_string);
            data.local_name = Some(local_name.to_string());
            data.namespace_uri = namespace_uri.map(str::to_string);
            let id = self.push(data);
            self.nodes[parent_idx].children.push(id);
            NodeId::new(id as u64)
        }

        pub fn attribute(&mut self, element: NodeId, name: &str, value: &str) -> NodeId {
            self.attribute_ns(element, None, name, None, value)
        }

        pub fn attribute_ns(
            &mut self,
            element: NodeId,
            prefix: Option<&str>,
            local_name: &str,
            namespace_uri: Option<&str>,
            value: &str,
        ) -> NodeId {
            let parent_idx = element.get() as usize;
            let mut data = MockNodeData::new(NodeType::Attribute, Some(parent_idx));
            data.prefix = prefix.map(str::to_string);
            data.local_name = Some(local_name.to_string());
            data.namespace_uri = namespace_uri.map(str::to_string);
            data.value = value.to_string();
            let id = self.push(data);
            self.nodes[parent_idx].attributes.push(id);
            NodeId::new(id as u64)
        }

        pub fn namespace(&mut self, element: NodeId, prefix: Option<&str>, uri: &str) -> NodeId {
            let parent_idx = element.get() as usize;
            let mut data = MockNodeData::new(NodeType::Namespace, Some(parent_idx));
            data.local_name = Some(prefix.unwrap_or_default().to_string());
            data.value = uri.to_string();
            let id = self.push(data);
            self.nodes[parent_idx].namespaces.push(id);
            NodeId::new(id as u64)
        }

        pub fn text(&mut self, parent: NodeId, content: &str) -> NodeId {
            self.leaf(parent, NodeType::Text, None, content)
        }

        pub fn comment(&mut self, parent: NodeId, content: &str) -> NodeId {
            self.leaf(parent, NodeType::Comment, None, content)
        }

        pub fn processing_instruction(&mut self, parent: NodeId, target: &str, value: &str) -> NodeId {
            self.leaf(parent, NodeType::ProcessingInstruction, Some(target), value)
        }

        fn leaf(&mut self, parent: NodeId, node_type: NodeType, name: Option<&str>, value: &str) -> NodeId {
            let parent_idx = parent.get() as usize;
            let mut data = MockNodeData::new(node_type, Some(parent_idx));
            data.local_name = name.map(str::to_string);
            data.value = value.to_string();
            let id = self.push(data);
            self.nodes[parent_idx].children.push(id);
            NodeId::new(id as u64)
        }

        pub fn build(self) -> MockTree {
            let mut order = vec![0; self.nodes.len()];
            let mut rank = 0;
            let mut stack = vec![0usize];
            while let Some(idx) = stack.pop() {
                order[idx] = rank;
                rank += 1;
                let data = &self.nodes[idx];
                for &ns in &data.namespaces {
                    order[ns] = rank;
                    rank += 1;
                }
                for &attr in &data.attributes {
                    order[attr] = rank;
                    rank += 1;
                }
                stack.extend(data.children.iter().rev());
            }
            MockTree {
                nodes: self.nodes,
                order,
            }
        }
    }

    impl DataSource for MockTree {
        fn node_type(&self, node: NodeId) -> NodeType {
            self.data(node).map_or(NodeType::Root, |d| d.node_type)
        }

        fn name(&self, node: NodeId) -> Option<QName<'_>> {
            let data = self.data(node)?;
            data.local_name.as_deref().map(|local_part| QName {
                prefix: data.prefix.as_deref(),
                local_part,
            })
        }

        fn namespace_uri(&self, node: NodeId) -> Option<&str> {
            self.data(node)?.namespace_uri.as_deref()
        }

        fn string_value(&self, node: NodeId) -> String {
            let Some(data) = self.data(node) else {
                return String::new();
            };
            match data.node_type {
                NodeType::Root | NodeType::Element => {
                    let mut out = String::new();
                    let mut stack: Vec<usize> = data.children.iter().rev().copied().collect();
                    while let Some(idx) = stack.pop() {
                        let child = &self.nodes[idx];
                        if child.node_type == NodeType::Text {
                            out.push_str(&child.value);
                        }
                        stack.extend(child.children.iter().rev());
                    }
                    out
                }
                _ => data.value.clone(),
            }
        }

        fn parent(&self, node: NodeId) -> Option<NodeId> {
            self.data(node)?.parent.map(|p| NodeId::new(p as u64))
        }

        fn children(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
            match self.data(node) {
                Some(data) => Box::new(data.children.iter().map(|&i| NodeId::new(i as u64))),
                None => Box::new(std::iter::empty()),
            }
        }

        fn attributes(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
            match self.data(node) {
                Some(data) => Box::new(data.attributes.iter().map(|&i| NodeId::new(i as u64))),
                None => Box::new(std::iter::empty()),
            }
        }

        fn namespaces(&self, node: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
            match self.data(node) {
                Some(data) => Box::new(data.namespaces.iter().map(|&i| NodeId::new(i as u64))),
                None => Box::new(std::iter::empty()),
            }
        }

        fn compare_order(&self, a: NodeId, b: NodeId) -> Ordering {
            let rank = |n: NodeId| self.order.get(n.get() as usize).copied().unwrap_or(usize::MAX);
            rank(a).cmp(&rank(b))
        }
    }

    /// Handles into the tree returned by [`create_test_tree`].
    #[derive(Debug, Clone, Copy)]
    pub struct TestNodes {
        pub root: NodeId,
        pub para1: NodeId,
        pub para1_id: NodeId,
        pub para1_lang: NodeId,
        pub hello: NodeId,
        pub comment: NodeId,
        pub div: NodeId,
        pub pi: NodeId,
        pub para2: NodeId,
        pub world: NodeId,
    }

    /// Creates a simple mock tree for testing:
    /// <root>
    ///   <para id="p1" xml:lang="en">Hello</para>
    ///   <!-- comment node -->
    ///   <div></div>
    ///   <?pi-target pi-value?>
    ///   <para>World</para>
    /// </root>
    ///
    /// The outer `<root>` element is the single child of the document root.
    pub fn create_test_tree() -> (MockTree, TestNodes) {
        let mut b = MockTreeBuilder::new();
        let doc = b.root();
        let root = b.element(doc, "root");
        let para1 = b.element(root, "para");
        let para1_id = b.attribute(para1, "id", "p1");
        let para1_lang = b.attribute_ns(
            para1,
            Some("xml"),
            "lang",
            Some("http://www.w3.org/XML/1998/namespace"),
            "en",
        );
        let hello = b.text(para1, "Hello");
        let comment = b.comment(root, " comment node ");
        let div = b.element(root, "div");
        let pi = b.processing_instruction(root, "pi-target", "pi-value");
        let para2 = b.element(root, "para");
        let world = b.text(para2, "World");
        (
            b.build(),
            TestNodes {
                root,
                para1,
                para1_id,
                para1_lang,
                hello,
                comment,
                div,
                pi,
                para2,
                world,
            },
        )
    }

    #[cfg(test)]
    mod unit {
        use super::*;

        #[test]
        fn test_mock_document_order_places_attributes_before_children() {
            let (tree, n) = create_test_tree();
            assert_eq!(tree.compare_order(n.para1, n.para1_id), Ordering::Less);
            assert_eq!(tree.compare_order(n.para1_lang, n.hello), Ordering::Less);
            assert_eq!(tree.compare_order(n.world, n.div), Ordering::Greater);
        }

        #[test]
        fn test_mock_string_values() {
            let (tree, n) = create_test_tree();
            assert_eq!(tree.string_value(tree.root()), "HelloWorld");
            assert_eq!(tree.string_value(n.para1_id), "p1");
            assert_eq!(tree.string_value(n.comment), " comment node ");
            assert_eq!(tree.root_of(n.para1_lang), tree.root());
        }

        #[test]
        fn test_sort_document_order_dedups() {
            let (tree, n) = create_test_tree();
            let mut nodes = vec![n.para2, n.para1, n.para2, n.root];
            sort_document_order(&tree, &mut nodes);
            assert_eq!(nodes, vec![n.root, n.para1, n.para2]);
        }
    }
}
