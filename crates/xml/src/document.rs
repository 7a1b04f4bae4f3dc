// XML datasource implementation using roxmltree
use oxpath_xpath1::{DataSource, NodeId, NodeType, QName, XML_NAMESPACE};
use roxmltree::Node;
use std::cmp::Ordering;

// A handle packs the roxmltree node index into the high 32 bits and a slot
// into the low ones: 0 for the node itself, then namespace nodes, then
// attributes. roxmltree indexes nodes in document order, so comparing raw
// handles gives document order.
const NAMESPACE_BASE: u64 = 1;
const ATTRIBUTE_BASE: u64 = 0x1_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Node,
    Namespace(usize),
    Attribute(usize),
}

/// Wrapper around `roxmltree::Document` providing data source capabilities.
///
/// Attributes and namespace declarations are plain data in roxmltree; this
/// wrapper gives each one its own [`NodeId`] so they can be selected.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
}

// A namespaced attribute always carries a prefix, so the default namespace
// is skipped even when it is bound to the same URI.
fn attribute_prefix<'input>(node: Node<'_, 'input>, uri: &str) -> Option<&'input str> {
    if uri == XML_NAMESPACE {
        return Some("xml");
    }
    node.namespaces()
        .find(|ns| ns.uri() == uri && ns.name().is_some())
        .and_then(|ns| ns.name())
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, roxmltree::Error> {
        let doc = roxmltree::Document::parse(text)?;
        log::debug!("Parsed XML document with {} nodes", doc.descendants().count());
        Ok(Self { doc })
    }

    /// The document (root) node.
    pub fn root(&self) -> NodeId {
        encode(self.doc.root(), Slot::Node)
    }

    /// The single top-level element.
    pub fn document_element(&self) -> NodeId {
        encode(self.doc.root_element(), Slot::Node)
    }

    pub fn document(&self) -> &roxmltree::Document<'input> {
        &self.doc
    }

    /// The handle for a roxmltree node of this document.
    pub fn node_id(&self, node: Node<'_, 'input>) -> NodeId {
        encode(node, Slot::Node)
    }

    /// The roxmltree node behind a handle. Attribute and namespace handles
    /// resolve to their owning element.
    pub fn node(&self, id: NodeId) -> Option<Node<'_, 'input>> {
        self.resolve(id).map(|(node, _)| node)
    }

    fn resolve(&self, id: NodeId) -> Option<(Node<'_, 'input>, Slot)> {
        let raw = id.get();
        let index = u32::try_from(raw >> 32).ok()?;
        let node = self.doc.get_node(roxmltree::NodeId::new(index))?;
        let slot = raw & 0xFFFF_FFFF;
        let slot = if slot == 0 {
            Slot::Node
        } else if slot < ATTRIBUTE_BASE {
            Slot::Namespace((slot - NAMESPACE_BASE) as usize)
        } else {
            Slot::Attribute((slot - ATTRIBUTE_BASE) as usize)
        };
        Some((node, slot))
    }
}

fn encode(node: Node<'_, '_>, slot: Slot) -> NodeId {
    let index = u64::from(node.id().get()) << 32;
    let slot = match slot {
        Slot::Node => 0,
        Slot::Namespace(i) => NAMESPACE_BASE + i as u64,
        Slot::Attribute(i) => ATTRIBUTE_BASE + i as u64,
    };
    NodeId::new(index | slot)
}

impl DataSource for XmlDocument<'_> {
    fn node_type(&self, id: NodeId) -> NodeType {
        match self.resolve(id) {
            Some((node, Slot::Node)) => match node.node_type() {
                roxmltree::NodeType::Root => NodeType::Root,
                roxmltree::NodeType::Element => NodeType::Element,
                roxmltree::NodeType::Text => NodeType::Text,
                roxmltree::NodeType::Comment => NodeType::Comment,
                roxmltree::NodeType::PI => NodeType::ProcessingInstruction,
            },
            Some((_, Slot::Namespace(_))) => NodeType::Namespace,
            Some((_, Slot::Attribute(_))) => NodeType::Attribute,
            None => NodeType::Root,
        }
    }

    fn name(&self, id: NodeId) -> Option<QName<'_>> {
        let (node, slot) = self.resolve(id)?;
        match slot {
            Slot::Node if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    prefix: tag.namespace().and_then(|uri| node.lookup_prefix(uri)),
                    local_part: tag.name(),
                })
            }
            Slot::Node => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            Slot::Namespace(index) => node.namespaces().nth(index).map(|ns| QName {
                prefix: None,
                local_part: ns.name().unwrap_or(""),
            }),
            Slot::Attribute(index) => node.attributes().nth(index).map(|attr| QName {
                prefix: attr.namespace().and_then(|uri| attribute_prefix(node, uri)),
                local_part: attr.name(),
            }),
        }
    }

    fn namespace_uri(&self, id: NodeId) -> Option<&str> {
        let (node, slot) = self.resolve(id)?;
        match slot {
            Slot::Node if node.is_element() => node.tag_name().namespace(),
            Slot::Attribute(index) => node.attributes().nth(index)?.namespace(),
            _ => None,
        }
    }

    fn string_value(&self, id: NodeId) -> String {
        let Some((node, slot)) = self.resolve(id) else {
            return String::new();
        };
        match slot {
            Slot::Node => match node.node_type() {
                roxmltree::NodeType::Root | roxmltree::NodeType::Element => node
                    .descendants()
                    .filter(|n| n.is_text())
                    .filter_map(|n| n.text())
                    .collect(),
                roxmltree::NodeType::Text | roxmltree::NodeType::Comment => {
                    node.text().unwrap_or("").to_string()
                }
                roxmltree::NodeType::PI => node
                    .pi()
                    .and_then(|pi| pi.value)
                    .unwrap_or("")
                    .to_string(),
            },
            Slot::Namespace(index) => node
                .namespaces()
                .nth(index)
                .map(|ns| ns.uri().to_string())
                .unwrap_or_default(),
            Slot::Attribute(index) => node
                .attributes()
                .nth(index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        let (node, slot) = self.resolve(id)?;
        match slot {
            Slot::Node => node.parent().map(|p| encode(p, Slot::Node)),
            // Attributes and namespace nodes belong to their element.
            Slot::Namespace(_) | Slot::Attribute(_) => Some(encode(node, Slot::Node)),
        }
    }

    fn children(&self, id: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
        match self.resolve(id) {
            Some((node, Slot::Node)) => Box::new(node.children().map(|c| encode(c, Slot::Node))),
            _ => Box::new(std::iter::empty()),
        }
    }

    fn attributes(&self, id: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
        match self.resolve(id) {
            Some((node, Slot::Node)) if node.is_element() => {
                let count = node.attributes().len();
                Box::new((0..count).map(move |i| encode(node, Slot::Attribute(i))))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn namespaces(&self, id: NodeId) -> Box<dyn Iterator<Item = NodeId> + '_> {
        match self.resolve(id) {
            Some((node, Slot::Node)) if node.is_element() => {
                let count = node.namespaces().count();
                Box::new((0..count).map(move |i| encode(node, Slot::Namespace(i))))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn compare_order(&self, a: NodeId, b: NodeId) -> Ordering {
        a.get().cmp(&b.get())
    }
}
