//! Data Graph
//!
//! This module implements the persistent, position-keyed storage that lets a
//! controller function re-run from scratch on every pass yet remember state
//! per call site.
//!
//! # Overview
//!
//! The data graph is a tree of blocks:
//!
//! - A block is an ordered list of data nodes.
//! - A node holds one call site's payload, created lazily on the first visit.
//! - Nested scopes (conditionals, loops, component bodies) store a child
//!   block as a node payload.
//!
//! # Design Decisions
//!
//! 1. Nodes are matched by traversal order, not by a key. A call site that
//!    sits at a stable position gets the same node every pass. Where
//!    positions are unstable (keyed loops), a [`NamingMap`] re-anchors storage
//!    to an explicit identity.
//!
//! 2. Garbage collection only happens on passes that enable it (refreshes),
//!    so event dispatches that skip parts of the tree never destroy state.
//!
//! 3. Payloads are reference counted (`Rc<dyn Any>`), so callers can hold on
//!    to their storage while the traversal continues to mutate the graph.

mod keyed;
mod naming;
mod node;
mod traversal;

use std::rc::Rc;

pub use keyed::KeyedData;
pub use naming::{NamingMap, NamingSlot};
pub use node::{DataBlock, NodeKind};
pub use traversal::{DataTraversal, ScopedDataTraversal};

/// The root of a data graph.
#[derive(Default)]
pub struct DataGraph {
    root: Rc<DataBlock>,
}

impl DataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> &Rc<DataBlock> {
        &self.root
    }

    /// Total number of live nodes, including those in nested blocks.
    pub fn node_count(&self) -> usize {
        count_nodes(&self.root)
    }
}

fn count_nodes(block: &DataBlock) -> usize {
    let nodes = block.nodes().borrow();
    nodes.len()
        + nodes
            .iter()
            .filter_map(|node| node.payload())
            .map(|payload| {
                if let Some(nested) = payload.downcast_ref::<DataBlock>() {
                    count_nodes(nested)
                } else if let Some(naming) = payload.downcast_ref::<NamingSlot>() {
                    naming.borrow().blocks().map(|b| count_nodes(b)).sum()
                } else {
                    0
                }
            })
            .sum::<usize>()
}
