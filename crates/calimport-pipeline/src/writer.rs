//! Document writer collaborator interface.
//!
//! The pipeline produces [`OutputNode`] trees; something else owns the
//! document they land in. [`DocumentWriter`] is that seam: the host
//! implements it against its storage, and [`write_nodes`] drives it,
//! flattening each output tree depth-first under a parent node.

use calimport_core::{OutputNode, TemplateNode};
use calimport_providers::ProviderResult;

/// An opaque reference to a node in the host document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef(pub String);

impl NodeRef {
    /// Creates a reference from a host-specific id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Writes rendered nodes into the host document.
///
/// `create_node` creates a single node from `node.text` under `parent` at
/// the given sibling position and returns its reference; children are driven
/// separately by [`write_nodes`].
pub trait DocumentWriter {
    /// Creates one node and returns its reference.
    fn create_node(
        &mut self,
        parent: &NodeRef,
        node: &OutputNode,
        order: usize,
    ) -> ProviderResult<NodeRef>;

    /// Replaces the text of an existing node.
    fn update_node(&mut self, node: &NodeRef, content: &OutputNode) -> ProviderResult<()>;

    /// Reads a subtree back as a template (the edit flow re-renders in place).
    fn read_subtree(&self, node: &NodeRef) -> ProviderResult<TemplateNode>;
}

/// Writes a full output list under `parent`, depth-first, preserving order.
///
/// Returns the references of the top-level nodes.
pub fn write_nodes(
    writer: &mut dyn DocumentWriter,
    parent: &NodeRef,
    nodes: &[OutputNode],
) -> ProviderResult<Vec<NodeRef>> {
    let mut refs = Vec::with_capacity(nodes.len());
    for (order, node) in nodes.iter().enumerate() {
        refs.push(write_tree(writer, parent, node, order)?);
    }
    Ok(refs)
}

fn write_tree(
    writer: &mut dyn DocumentWriter,
    parent: &NodeRef,
    node: &OutputNode,
    order: usize,
) -> ProviderResult<NodeRef> {
    let node_ref = writer.create_node(parent, node, order)?;
    for (child_order, child) in node.children.iter().enumerate() {
        write_tree(writer, &node_ref, child, child_order)?;
    }
    Ok(node_ref)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug, Clone)]
    struct WrittenNode {
        parent: NodeRef,
        order: usize,
        text: String,
    }

    /// Records every write for inspection.
    #[derive(Default)]
    struct FakeWriter {
        nodes: HashMap<NodeRef, WrittenNode>,
        next_id: usize,
    }

    impl DocumentWriter for FakeWriter {
        fn create_node(
            &mut self,
            parent: &NodeRef,
            node: &OutputNode,
            order: usize,
        ) -> ProviderResult<NodeRef> {
            let node_ref = NodeRef::new(format!("node-{}", self.next_id));
            self.next_id += 1;
            self.nodes.insert(
                node_ref.clone(),
                WrittenNode {
                    parent: parent.clone(),
                    order,
                    text: node.text.clone(),
                },
            );
            Ok(node_ref)
        }

        fn update_node(&mut self, node: &NodeRef, content: &OutputNode) -> ProviderResult<()> {
            if let Some(written) = self.nodes.get_mut(node) {
                written.text = content.text.clone();
            }
            Ok(())
        }

        fn read_subtree(&self, node: &NodeRef) -> ProviderResult<TemplateNode> {
            let written = &self.nodes[node];
            Ok(TemplateNode::leaf(written.text.clone()))
        }
    }

    #[test]
    fn writes_flat_list_in_order() {
        let mut writer = FakeWriter::default();
        let parent = NodeRef::new("root");
        let nodes = vec![OutputNode::leaf("first"), OutputNode::leaf("second")];

        let refs = write_nodes(&mut writer, &parent, &nodes).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(writer.nodes[&refs[0]].order, 0);
        assert_eq!(writer.nodes[&refs[1]].order, 1);
        assert_eq!(writer.nodes[&refs[1]].text, "second");
    }

    #[test]
    fn children_land_under_their_parent() {
        let mut writer = FakeWriter::default();
        let parent = NodeRef::new("root");
        let tree = OutputNode {
            text: "event".to_string(),
            children: vec![OutputNode::leaf("detail-a"), OutputNode::leaf("detail-b")],
        };

        let refs = write_nodes(&mut writer, &parent, &[tree]).unwrap();
        let root_ref = &refs[0];

        let children: Vec<_> = writer
            .nodes
            .values()
            .filter(|n| n.parent == *root_ref)
            .collect();
        assert_eq!(children.len(), 2);
        assert!(children.iter().any(|n| n.text == "detail-a" && n.order == 0));
        assert!(children.iter().any(|n| n.text == "detail-b" && n.order == 1));
    }

    #[test]
    fn update_and_read_back() {
        let mut writer = FakeWriter::default();
        let parent = NodeRef::new("root");
        let refs = write_nodes(&mut writer, &parent, &[OutputNode::leaf("before")]).unwrap();

        writer
            .update_node(&refs[0], &OutputNode::leaf("after"))
            .unwrap();
        assert_eq!(writer.read_subtree(&refs[0]).unwrap().text, "after");
    }
}
