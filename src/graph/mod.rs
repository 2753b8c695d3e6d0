pub mod compose;
pub mod dsl;
pub mod node;
pub mod shape_infer;
pub mod verifier;

pub use node::Node;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// Ordered sequence of nodes plus designated output node indices (spec §3).
///
/// A `Graph` is grown monotonically through `GraphBuilder` and then handed to
/// an `Engine` by value — since the engine takes ownership, the caller has no
/// remaining handle to mutate it, which is how this port enforces the "frozen
/// once given to the engine" lifecycle rule without a runtime flag (ported
/// idea, not ported mechanism: the teacher's `Engine` instead borrows a
/// `&ir::Graph` for its whole lifetime).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    outputs: Vec<NodeId>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a node and returns its index. Only `GraphBuilder` (and the
    /// composers built on top of it) calls this; it is the single mutation
    /// point of the graph, matching the design note that composer helpers
    /// must never hold references across appends — callers only ever see
    /// the returned `NodeId`, never a borrow into `nodes`.
    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub(crate) fn set_outputs(&mut self, outputs: Vec<NodeId>) {
        self.outputs = outputs;
    }
}
