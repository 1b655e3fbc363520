use crate::error::GraphError;
use crate::store::{GraphStore, NodeId};
use std::collections::{HashSet, VecDeque};

/// Topological order over every node of the store.
///
/// Roots are taken in creation order, so the result is deterministic.
pub fn sort(store: &GraphStore) -> Result<Vec<NodeId>, GraphError> {
    sort_from(store, store.node_ids())
}

/// Topological order over the nodes reachable (upstream) from `roots`.
/// Roots from another store are skipped.
///
/// Every dependency appears before its consumer. Uses an explicit stack with
/// three-colour marking; meeting a node that is still in progress means the
/// dependency relation has a cycle through it.
pub fn sort_from(
    store: &GraphStore,
    roots: impl IntoIterator<Item = NodeId>,
) -> Result<Vec<NodeId>, GraphError> {
    let count = store.count();
    let mut order = Vec::with_capacity(count);
    let mut state = vec![VisitState::None; count];
    // (node, index of the next parent to visit)
    let mut stack: Vec<(NodeId, usize)> = Vec::new();

    for root in roots {
        if !store.contains(root) || state[root.index()] != VisitState::None {
            continue;
        }
        state[root.index()] = VisitState::Visiting;
        stack.push((root, 0));

        while let Some(&(node, next)) = stack.last() {
            match store.get_parents(node).get(next) {
                Some(&parent) => {
                    let top = stack.len() - 1;
                    stack[top].1 += 1;
                    match state[parent.index()] {
                        VisitState::Visited => {}
                        VisitState::Visiting => return Err(GraphError::Cycle(parent)),
                        VisitState::None => {
                            state[parent.index()] = VisitState::Visiting;
                            stack.push((parent, 0));
                        }
                    }
                }
                None => {
                    state[node.index()] = VisitState::Visited;
                    order.push(node);
                    stack.pop();
                }
            }
        }
    }

    Ok(order)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting, // Used for cycle detection
    Visited,
}

/// All nodes `start_nodes` depend on, transitively, including themselves.
/// Ids from another store are ignored.
pub fn upstream_from(store: &GraphStore, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut visited = HashSet::new();
    let mut queue: VecDeque<NodeId> = start_nodes.iter().copied().filter(|&id| store.contains(id)).collect();

    while let Some(node) = queue.pop_front() {
        if visited.insert(node) {
            queue.extend(store.get_parents(node).iter().copied());
        }
    }
    visited
}

/// All nodes that depend on `start_nodes`, transitively, including themselves.
/// Ids from another store are ignored.
pub fn downstream_from(store: &GraphStore, start_nodes: &[NodeId]) -> HashSet<NodeId> {
    let mut seen: HashSet<NodeId> = start_nodes.iter().copied().filter(|&id| store.contains(id)).collect();
    let mut pending: Vec<NodeId> = seen.iter().copied().collect();

    while let Some(node) = pending.pop() {
        for child in store.children(node) {
            if seen.insert(child) {
                pending.push(child);
            }
        }
    }
    seen
}
