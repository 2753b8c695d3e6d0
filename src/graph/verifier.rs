//! Static verifier for the computation graph (spec §4.4 phase 1: Validate).
//!
//! Ported from the teacher's `graph::verifier::Verifier`: an independent
//! pass that recomputes every node's shape from scratch rather than trusting
//! what the builder stored, so that a `Graph` built by `push_node` directly
//! (bypassing `GraphBuilder`) or deserialized from JSON still gets checked.
//! Internal to this pass, failures are aggregated with `anyhow`, matching
//! the teacher's `graph::verifier`/`graph::memory_planner` style; the engine
//! boundary lifts the result into a `VectoriaError::Structural`/`Shape`.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context, Result};
use tracing::debug;

use crate::graph::node::Node;
use crate::graph::shape_infer::infer_output_shape;
use crate::graph::Graph;
use crate::types::{NodeId, TensorShape};

pub struct Verifier;

impl Verifier {
    /// Validates invariants 1-5 (spec §3) and returns the map of predicted
    /// shapes per node, which `engine::memory_planner` reuses for sizing.
    pub fn verify(graph: &Graph) -> Result<HashMap<NodeId, TensorShape>> {
        let nodes = graph.nodes();
        debug!(node_count = nodes.len(), "verifier: starting static analysis");

        if nodes.is_empty() {
            bail!("graph has no nodes");
        }

        let mut predicted_shapes = HashMap::with_capacity(nodes.len());

        for (i, node) in nodes.iter().enumerate() {
            let id = NodeId(i);
            match node {
                Node::Input { shape, .. } | Node::Parameter { shape, .. } | Node::Constant { shape, .. } => {
                    predicted_shapes.insert(id, shape.clone());
                }
                Node::Op {
                    op,
                    inputs,
                    output_shape,
                    int_params,
                    ..
                } => {
                    let mut input_shapes = Vec::with_capacity(inputs.len());
                    for &input_id in inputs {
                        // Invariant 1: strict forward reference.
                        if input_id.index() >= i {
                            bail!(
                                "node {} ({}) references input {} which is not an earlier node",
                                i,
                                op.name(),
                                input_id
                            );
                        }
                        // Invariant 2: no self-reference (implied by the
                        // check above, kept explicit for clarity).
                        if input_id == id {
                            bail!("node {} references itself", i);
                        }
                        let shape = predicted_shapes.get(&input_id).ok_or_else(|| {
                            anyhow!("node {} uses input {} with no recorded shape", i, input_id)
                        })?;
                        input_shapes.push(shape.clone());
                    }

                    let recomputed = infer_output_shape(*op, &input_shapes, int_params)
                        .with_context(|| format!("shape error at node {} ({})", i, op.name()))?;

                    if &recomputed != output_shape {
                        bail!(
                            "node {} ({}) stored output shape {:?} disagrees with recomputed shape {:?}",
                            i,
                            op.name(),
                            output_shape.dims(),
                            recomputed.dims()
                        );
                    }

                    predicted_shapes.insert(id, recomputed);
                }
            }
        }

        // Invariant 3: every designated output index is valid.
        for &out in graph.outputs() {
            if out.index() >= nodes.len() {
                bail!("designated output {} is not a valid node index", out);
            }
        }

        debug!("verifier: graph validated, all shapes consistent");
        Ok(predicted_shapes)
    }
}
