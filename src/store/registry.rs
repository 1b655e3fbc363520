use super::types::*;
use std::fmt;

const NO_CHILD: u32 = u32::MAX;

/// Signature of a client-supplied hint function.
pub type HintFn = Box<dyn Fn(&[Value]) -> Result<Value, String>>;

/// A registered hint: a named client function used as an operator.
pub struct Hint {
    pub name: String,
    /// Operand count, fixed at registration.
    pub arity: usize,
    pub(crate) func: HintFn,
}

impl Hint {
    pub fn call(&self, args: &[Value]) -> Result<Value, String> {
        (self.func)(args)
    }
}

impl fmt::Debug for Hint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hint")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Arena owning every node, edge and constraint of one graph.
///
/// Only the `Builder` inserts; everything else reads.
#[derive(Debug)]
pub struct GraphStore {
    graph_id: GraphId,

    // Columnar Arrays
    pub(crate) kinds: Vec<NodeKind>,
    pub(crate) meta: Vec<NodeMetadata>,

    // Topology (CSR-ish + Adjacency)
    pub(crate) parents_flat: Vec<NodeId>,
    pub(crate) parents_ranges: Vec<(u32, u32)>, // (start, count)

    // Downstream traversal helpers
    pub(crate) first_child: Vec<u32>,
    pub(crate) child_targets: Vec<NodeId>,
    pub(crate) next_child: Vec<u32>,

    pub(crate) constraints: Vec<Constraint>,
    pub(crate) hints: Vec<Hint>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self {
            graph_id: GraphId::fresh(),
            kinds: Vec::new(),
            meta: Vec::new(),
            parents_flat: Vec::new(),
            parents_ranges: Vec::new(),
            first_child: Vec::new(),
            child_targets: Vec::new(),
            next_child: Vec::new(),
            constraints: Vec::new(),
            hints: Vec::new(),
        }
    }
}

impl GraphStore {
    pub fn new() -> Self { Self::default() }
    pub fn graph_id(&self) -> GraphId { self.graph_id }
    pub fn count(&self) -> usize { self.kinds.len() }

    /// True if `id` was minted by this store.
    pub fn contains(&self, id: NodeId) -> bool {
        id.graph() == self.graph_id && id.index() < self.count()
    }

    pub(crate) fn add_node(&mut self, kind: NodeKind, parents: &[NodeId], meta: NodeMetadata) -> NodeId {
        let id = NodeId::new(self.graph_id, self.count());

        let offset = self.parents_flat.len() as u32;
        self.parents_ranges.push((offset, parents.len() as u32));
        self.parents_flat.extend_from_slice(parents);

        // Prepend `id` to each parent's child list.
        for parent in parents {
            let head = &mut self.first_child[parent.index()];
            self.next_child.push(*head);
            *head = self.child_targets.len() as u32;
            self.child_targets.push(id);
        }

        self.kinds.push(kind);
        self.meta.push(meta);
        self.first_child.push(NO_CHILD);
        id
    }

    pub(crate) fn add_hint(&mut self, name: String, arity: usize, func: HintFn) -> HintId {
        let id = HintId::new(self.graph_id, self.hints.len());
        self.hints.push(Hint { name, arity, func });
        id
    }

    pub(crate) fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Operands of `id`. The id must belong to this store.
    #[inline(always)]
    pub(crate) fn get_parents(&self, id: NodeId) -> &[NodeId] {
        let (start, count) = self.parents_ranges[id.index()];
        &self.parents_flat[start as usize..(start + count) as usize]
    }

    /// Direct dependents of `id`, newest first.
    pub(crate) fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut edge = self.first_child[id.index()];
        std::iter::from_fn(move || {
            if edge == NO_CHILD {
                return None;
            }
            let child = self.child_targets[edge as usize];
            edge = self.next_child[edge as usize];
            Some(child)
        })
    }

    /// Direct dependents of `id`, in creation order.
    pub(crate) fn get_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<NodeId> = self.children(id).collect();
        children.reverse();
        children
    }

    pub fn node(&self, id: NodeId) -> Option<Node<'_>> {
        if !self.contains(id) {
            return None;
        }
        let idx = id.index();
        Some(Node {
            id,
            kind: &self.kinds[idx],
            dependencies: self.get_parents(id),
            meta: &self.meta[idx],
        })
    }

    /// All node ids in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.count()).map(move |i| NodeId::new(self.graph_id, i))
    }

    pub fn inputs(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(move |id| matches!(self.kinds[id.index()], NodeKind::Input))
    }

    pub fn constraints(&self) -> &[Constraint] { &self.constraints }

    /// Hint lookup for ids already validated against this store.
    pub(crate) fn hint(&self, id: HintId) -> &Hint { &self.hints[id.index()] }

    /// The hint behind `id`, if it was registered with this store.
    pub fn get_hint(&self, id: HintId) -> Option<&Hint> {
        if id.graph() != self.graph_id {
            return None;
        }
        self.hints.get(id.index())
    }

    /// Display name of a node: its label, else the constant value, else the id.
    pub(crate) fn display_name(&self, id: NodeId) -> String {
        let idx = id.index();
        if let Some(label) = &self.meta[idx].label {
            return label.clone();
        }
        match &self.kinds[idx] {
            NodeKind::Constant(v) => v.to_string(),
            _ => id.to_string(),
        }
    }

    /// Operator tag for display, resolving hint names.
    pub(crate) fn operator_name(&self, op: &Operator) -> String {
        match op {
            Operator::Hint { id, .. } => self.hint(*id).name.clone(),
            other => other.symbol().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled(label: &str) -> NodeMetadata {
        NodeMetadata { label: Some(label.into()) }
    }

    #[test]
    fn test_children_are_reported_in_creation_order() {
        let mut store = GraphStore::new();
        let a = store.add_node(NodeKind::Input, &[], labeled("a"));
        let b = store.add_node(NodeKind::Operation(Operator::Neg), &[a], labeled("b"));
        let c = store.add_node(NodeKind::Operation(Operator::Add), &[a, b], labeled("c"));

        assert_eq!(store.get_children(a), vec![b, c]);
        assert_eq!(store.get_children(b), vec![c]);
        assert!(store.get_children(c).is_empty());
        assert_eq!(store.get_parents(c), &[a, b]);
    }

    #[test]
    fn test_ids_from_another_store_are_foreign() {
        let mut first = GraphStore::new();
        let mut second = GraphStore::new();
        let a = first.add_node(NodeKind::Input, &[], NodeMetadata::default());
        let _ = second.add_node(NodeKind::Input, &[], NodeMetadata::default());

        let h = first.add_hint("id".into(), 1, Box::new(|args: &[Value]| Ok(args[0])));

        assert!(first.contains(a));
        assert!(!second.contains(a));
        assert!(second.node(a).is_none());
        assert!(first.get_hint(h).is_some());
        assert!(second.get_hint(h).is_none());
    }

    #[test]
    fn test_display_name_falls_back_to_value_then_id() {
        let mut store = GraphStore::new();
        let x = store.add_node(NodeKind::Input, &[], NodeMetadata::default());
        let five = store.add_node(NodeKind::Constant(Value::Int(5)), &[], NodeMetadata::default());
        let sum = store.add_node(NodeKind::Operation(Operator::Add), &[x, five], labeled("x + 5"));

        assert_eq!(store.display_name(x), "n0");
        assert_eq!(store.display_name(five), "5");
        assert_eq!(store.display_name(sum), "x + 5");
    }
}
