//! Data Nodes and Blocks
//!
//! This module defines the storage units that live in the data graph.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::naming::NamingMap;

/// Serial numbers tag nodes in trace output, so that a node's creation
/// and reclamation can be matched up.
fn next_serial() -> u64 {
    static SERIALS: AtomicU64 = AtomicU64::new(1);
    SERIALS.fetch_add(1, Ordering::Relaxed)
}

/// How long a node's payload lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Lives until the node itself is garbage collected.
    Persistent,

    /// Discarded whenever the enclosing block's cache is cleared, and
    /// rebuilt on the next visit.
    Cached,
}

/// One call site's storage.
pub(crate) struct DataNode {
    serial: u64,
    kind: NodeKind,
    payload: Option<Rc<dyn Any>>,
}

impl DataNode {
    pub(crate) fn new(kind: NodeKind, payload: Rc<dyn Any>) -> Self {
        Self {
            serial: next_serial(),
            kind,
            payload: Some(payload),
        }
    }

    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn payload(&self) -> Option<&Rc<dyn Any>> {
        self.payload.as_ref()
    }

    /// Install a new payload, handing back the old one so the caller can drop
    /// it outside of any borrow.
    pub(crate) fn replace(
        &mut self,
        kind: NodeKind,
        payload: Rc<dyn Any>,
    ) -> Option<Rc<dyn Any>> {
        self.kind = kind;
        self.payload.replace(payload)
    }
}

/// An ordered sequence of data nodes.
///
/// Blocks are themselves stored as node payloads (for conditionals, loops
/// and other nested scopes), so reclaiming a node reclaims everything below
/// it.
#[derive(Default)]
pub struct DataBlock {
    nodes: RefCell<Vec<DataNode>>,
    cache_clear: Cell<bool>,
}

impl DataBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes currently stored directly in this block.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    pub(crate) fn nodes(&self) -> &RefCell<Vec<DataNode>> {
        &self.nodes
    }

    pub(crate) fn mark_active(&self) {
        self.cache_clear.set(false);
    }

    /// Drop every node at or after `len`, last first.
    pub(crate) fn truncate(&self, len: usize) -> usize {
        let mut tail = {
            let mut nodes = self.nodes.borrow_mut();
            if nodes.len() <= len {
                return 0;
            }
            nodes.split_off(len)
        };
        let count = tail.len();
        while let Some(node) = tail.pop() {
            tracing::trace!(node = node.serial(), "reclaiming data node");
            drop(node);
        }
        count
    }

    /// Destroy every node in the block.
    pub fn clear(&self) {
        self.truncate(0);
    }

    /// Discard cached payloads in this block and every nested block.
    /// Persistent payloads survive.
    pub fn clear_cache(&self) {
        if self.cache_clear.replace(true) {
            return;
        }
        let mut discarded = Vec::new();
        let mut nested = Vec::new();
        {
            let mut nodes = self.nodes.borrow_mut();
            for node in nodes.iter_mut() {
                match node.kind {
                    NodeKind::Cached => discarded.extend(node.payload.take()),
                    NodeKind::Persistent => {
                        if let Some(payload) = &node.payload {
                            nested.push(payload.clone());
                        }
                    }
                }
            }
        }
        drop(discarded);
        for payload in nested {
            if let Some(block) = payload.downcast_ref::<DataBlock>() {
                block.clear_cache();
            } else if let Some(naming) = payload.downcast_ref::<RefCell<NamingMap>>() {
                naming.borrow().clear_cache();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with(payloads: &[(NodeKind, i32)]) -> DataBlock {
        let block = DataBlock::new();
        for (kind, value) in payloads {
            block
                .nodes()
                .borrow_mut()
                .push(DataNode::new(*kind, Rc::new(*value)));
        }
        block
    }

    #[test]
    fn replacing_a_payload_keeps_the_serial() {
        let block = block_with(&[(NodeKind::Persistent, 1), (NodeKind::Cached, 2)]);
        let mut nodes = block.nodes().borrow_mut();
        assert_ne!(nodes[0].serial(), nodes[1].serial());

        let serial = nodes[1].serial();
        let previous = nodes[1].replace(NodeKind::Persistent, Rc::new(5));
        assert!(previous.is_some());
        assert_eq!(nodes[1].serial(), serial);
        assert_eq!(nodes[1].kind(), NodeKind::Persistent);
    }

    #[test]
    fn truncate_drops_trailing_nodes() {
        let block = block_with(&[(NodeKind::Persistent, 1), (NodeKind::Persistent, 2)]);
        assert_eq!(block.truncate(1), 1);
        assert_eq!(block.len(), 1);
        assert_eq!(block.truncate(5), 0);
        block.clear();
        assert!(block.is_empty());
    }

    #[test]
    fn clear_cache_keeps_persistent_payloads() {
        let block = block_with(&[(NodeKind::Persistent, 1), (NodeKind::Cached, 2)]);
        block.clear_cache();
        let nodes = block.nodes().borrow();
        assert!(nodes[0].payload().is_some());
        assert!(nodes[1].payload().is_none());
    }

    #[test]
    fn clear_cache_recurses_into_nested_blocks() {
        let inner = Rc::new(block_with(&[(NodeKind::Cached, 3)]));
        let outer = DataBlock::new();
        outer
            .nodes()
            .borrow_mut()
            .push(DataNode::new(NodeKind::Persistent, inner.clone()));

        outer.clear_cache();
        assert!(inner.nodes().borrow()[0].payload().is_none());
        assert!(outer.nodes().borrow()[0].payload().is_some());
    }
}
