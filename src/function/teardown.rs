use crate::{config::Config, edge::Edge, function::Node, types::EdgeList};
use core::mem;
use std::sync::Arc;

impl<C: Config> Drop for Node<C> {
    /// Releases the successors this node exclusively owns without recursing.
    ///
    /// Left to the default drop glue, a long chain where each node holds the
    /// last reference to the next would drop one node per stack frame. Instead
    /// every successor whose last reference we hold is unwrapped, stripped of
    /// its own edges (which go onto the worklist), and only then dropped, so
    /// its own `drop` finds nothing left to release.
    fn drop(&mut self) {
        let mut worklist: Vec<Arc<Node<C>>> = take_successors(self.next_edges.get_mut()).collect();
        while let Some(successor) = worklist.pop() {
            // `into_inner` succeeds for exactly one of the concurrent releasers.
            if let Some(mut successor) = Arc::into_inner(successor) {
                worklist.extend(take_successors(successor.next_edges.get_mut()));
            }
        }
    }
}

fn take_successors<C: Config>(edges: &mut EdgeList<C>) -> impl Iterator<Item = Arc<Node<C>>> {
    mem::take(edges).into_iter().filter_map(Edge::into_function)
}
