//! Deployment validation and the CoreML-style lowering sink (spec §6).
//! Grounded on the original's `lowering/validation.cpp` and
//! `lowering/coreml_lowering.cpp`; those two free functions become
//! `validate_for_deployment` and `lower_to_package` here, and the loose
//! `dtype_to_mil`/`shape_to_mil` helpers move into `coreml` alongside them.

pub mod coreml;

use crate::errors::{VectoriaError, VectoriaResult};
use crate::graph::{Graph, Node};

pub use coreml::lower_to_package;

/// Structural pre-check before `export_to_coreml`/`lower_to_package` opens
/// any file, ported from `validation.cpp`: an empty graph is rejected, and
/// every op input index must be in range. Every `OpType` this IR defines is
/// "structurally supported" here exactly as the original's `switch` accepts
/// all of them (including `Concat`/`Slice`, which the original comment notes
/// as "supported structurally") — whether a given op can actually be
/// *printed* as MIL is a separate, narrower question `coreml::write_statement`
/// answers at serialization time, matching the original's split between a
/// permissive `validate_for_deployment` and a stricter lowering `switch`.
pub fn validate_for_deployment(graph: &Graph) -> VectoriaResult<()> {
    if graph.is_empty() {
        return Err(VectoriaError::structural("empty graph cannot be deployed"));
    }

    for (i, node) in graph.nodes().iter().enumerate() {
        if let Node::Op { inputs, .. } = node {
            for input in inputs {
                if input.index() >= graph.len() {
                    return Err(VectoriaError::structural(format!(
                        "node {} references out-of-range input {}",
                        i, input
                    )));
                }
            }
        }
    }

    Ok(())
}
