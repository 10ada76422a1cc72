//! Data Traversal
//!
//! A traversal walks the data graph in lockstep with the controller. Each
//! block on the stack keeps a cursor; every `get_data` call claims the node
//! under the cursor and advances it. Nodes are therefore identified purely by
//! the order in which the controller asks for them.
//!
//! When a block is left after a successful, garbage-collecting pass, any
//! nodes past the cursor were not reached this time and are reclaimed. Errors
//! unwind the stack without reclaiming anything, since a partially executed
//! block says nothing about which nodes are still needed.

use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use smallvec::SmallVec;

use super::node::{DataBlock, DataNode, NodeKind};
use super::DataGraph;

struct ActiveBlock {
    block: Rc<DataBlock>,
    cursor: usize,
}

/// The state of one pass over a [`DataGraph`].
pub struct DataTraversal {
    stack: SmallVec<[ActiveBlock; 8]>,
    gc_enabled: bool,
    cache_clearing_enabled: bool,
}

impl DataTraversal {
    /// Begin a traversal at the graph's root block.
    pub fn new(graph: &DataGraph, gc_enabled: bool, cache_clearing_enabled: bool) -> Self {
        let root = graph.root().clone();
        root.mark_active();
        let mut stack = SmallVec::new();
        stack.push(ActiveBlock {
            block: root,
            cursor: 0,
        });
        Self {
            stack,
            gc_enabled,
            cache_clearing_enabled,
        }
    }

    /// Whether unvisited nodes are reclaimed during this traversal.
    pub fn gc_enabled(&self) -> bool {
        self.gc_enabled
    }

    /// Whether cached data in skipped blocks is discarded.
    pub fn cache_clearing_enabled(&self) -> bool {
        self.cache_clearing_enabled
    }

    /// Number of blocks currently open, including the root.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Fetch persistent storage for the current call site.
    ///
    /// Returns the stored value and whether it was created by this call.
    pub fn get_data<T: Default + 'static>(&mut self) -> (Rc<T>, bool) {
        self.claim_node(NodeKind::Persistent)
    }

    /// Fetch storage that is discarded whenever the enclosing block's cache
    /// is cleared.
    pub fn get_cached_data<T: Default + 'static>(&mut self) -> (Rc<T>, bool) {
        self.claim_node(NodeKind::Cached)
    }

    fn claim_node<T: Default + 'static>(&mut self, kind: NodeKind) -> (Rc<T>, bool) {
        let Some(active) = self.stack.last_mut() else {
            debug_assert!(false, "data requested outside of a traversal");
            return (Rc::new(T::default()), true);
        };
        let index = active.cursor;
        active.cursor += 1;

        let mut nodes = active.block.nodes().borrow_mut();
        if let Some(node) = nodes.get_mut(index) {
            if let Some(payload) = node.payload() {
                match payload.clone().downcast::<T>() {
                    Ok(value) => return (value, false),
                    Err(_) => {
                        debug_assert!(
                            false,
                            "data node {} requested with a different type",
                            node.serial()
                        );
                        tracing::warn!(
                            node = node.serial(),
                            expected = std::any::type_name::<T>(),
                            "data node type mismatch; replacing payload"
                        );
                    }
                }
            }
            let value = Rc::new(T::default());
            let previous = node.replace(kind, value.clone() as Rc<dyn Any>);
            drop(nodes);
            drop(previous);
            (value, true)
        } else {
            let value = Rc::new(T::default());
            nodes.push(DataNode::new(kind, value.clone() as Rc<dyn Any>));
            (value, true)
        }
    }

    /// Make `block` the current block. Pair with [`leave_block`](Self::leave_block).
    pub fn enter_block(&mut self, block: Rc<DataBlock>) {
        block.mark_active();
        self.stack.push(ActiveBlock { block, cursor: 0 });
    }

    /// Close the current block. Trailing nodes are reclaimed only when the
    /// block completed and garbage collection is enabled.
    pub fn leave_block(&mut self, completed: bool) {
        if self.stack.len() <= 1 {
            debug_assert!(false, "leave_block called without a matching enter_block");
            return;
        }
        if let Some(active) = self.stack.pop() {
            self.finalize(active, completed);
        }
    }

    fn finalize(&self, active: ActiveBlock, completed: bool) {
        if completed && self.gc_enabled {
            let reclaimed = active.block.truncate(active.cursor);
            if reclaimed > 0 {
                tracing::trace!(reclaimed, "garbage collected trailing data nodes");
            }
        }
    }

    fn finish(&mut self) {
        while self.stack.len() > 1 {
            debug_assert!(false, "traversal finished with open blocks");
            self.stack.pop();
        }
        if let Some(root) = self.stack.pop() {
            self.finalize(root, true);
        }
    }
}

/// Guard that finalizes the root block when dropped.
///
/// Call [`abandon`](Self::abandon) when the pass failed; the root is then
/// left untouched.
pub struct ScopedDataTraversal {
    traversal: DataTraversal,
    abandoned: bool,
}

impl ScopedDataTraversal {
    pub fn new(graph: &DataGraph, gc_enabled: bool, cache_clearing_enabled: bool) -> Self {
        Self {
            traversal: DataTraversal::new(graph, gc_enabled, cache_clearing_enabled),
            abandoned: false,
        }
    }

    pub fn abandon(&mut self) {
        self.abandoned = true;
    }
}

impl Deref for ScopedDataTraversal {
    type Target = DataTraversal;

    fn deref(&self) -> &DataTraversal {
        &self.traversal
    }
}

impl DerefMut for ScopedDataTraversal {
    fn deref_mut(&mut self) -> &mut DataTraversal {
        &mut self.traversal
    }
}

impl Drop for ScopedDataTraversal {
    fn drop(&mut self) {
        if !self.abandoned && !std::thread::panicking() {
            self.traversal.finish();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn storage_is_keyed_by_position() {
        let graph = DataGraph::new();
        let (first, second) = {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            let (a, created_a) = traversal.get_data::<Cell<i32>>();
            let (b, created_b) = traversal.get_data::<Cell<i32>>();
            assert!(created_a && created_b);
            a.set(1);
            b.set(2);
            (a, b)
        };

        let mut traversal = ScopedDataTraversal::new(&graph, true, true);
        let (a, created_a) = traversal.get_data::<Cell<i32>>();
        let (b, created_b) = traversal.get_data::<Cell<i32>>();
        assert!(!created_a && !created_b);
        assert!(Rc::ptr_eq(&a, &first));
        assert!(Rc::ptr_eq(&b, &second));
        assert_eq!(b.get(), 2);
    }

    #[test]
    fn unvisited_nodes_are_collected() {
        let graph = DataGraph::new();
        {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.get_data::<i32>();
            traversal.get_data::<i32>();
        }
        assert_eq!(graph.node_count(), 2);
        {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.get_data::<i32>();
        }
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn no_collection_without_gc() {
        let graph = DataGraph::new();
        {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.get_data::<i32>();
            traversal.get_data::<i32>();
        }
        {
            let mut traversal = ScopedDataTraversal::new(&graph, false, false);
            traversal.get_data::<i32>();
        }
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn abandoned_traversal_keeps_everything() {
        let graph = DataGraph::new();
        {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.get_data::<i32>();
            traversal.get_data::<i32>();
        }
        {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.abandon();
        }
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn nested_blocks_collect_independently() {
        let graph = DataGraph::new();
        let run = |inner_nodes: usize| {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            let (block, _) = traversal.get_data::<DataBlock>();
            traversal.enter_block(block);
            for _ in 0..inner_nodes {
                traversal.get_data::<i32>();
            }
            traversal.leave_block(true);
            traversal.get_data::<i32>();
        };
        run(3);
        assert_eq!(graph.node_count(), 5);
        run(1);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn cached_data_is_rebuilt_after_clearing() {
        let graph = DataGraph::new();
        let first = {
            let mut traversal = ScopedDataTraversal::new(&graph, true, true);
            traversal.get_cached_data::<Cell<i32>>().0
        };
        first.set(5);
        graph.root().clear_cache();

        let mut traversal = ScopedDataTraversal::new(&graph, true, true);
        let (second, created) = traversal.get_cached_data::<Cell<i32>>();
        assert!(created);
        assert_eq!(second.get(), 0);
    }
}
