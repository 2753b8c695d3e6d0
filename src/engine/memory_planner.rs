//! Buffer planning (spec §4.4 phase 4 "Plan"). Ported in spirit from the
//! teacher's `graph::memory_planner::MemoryPlanner`, but this version
//! allocates one buffer per node rather than recycling buffers by
//! liveness: the spec is explicit ("asks A for one buffer per node") and
//! node buffers must remain independently addressable for the caller's
//! `get_buffer(node)` handle across the whole compiled lifetime, which a
//! reused-buffer plan would not allow.

use crate::arena::{Arena, BufferHandle, BUFFER_ALIGNMENT};
use crate::errors::VectoriaResult;
use crate::graph::{Graph, Node};
use crate::trace::{EventType, Tracer};

/// Allocates one arena buffer per node (sized element-count × byte-width)
/// and copies `Constant` payloads in immediately, so `execute()` never has
/// to special-case constants beyond skipping their dispatch.
pub fn plan(graph: &Graph, arena: &mut Arena, tracer: &mut Tracer) -> VectoriaResult<Vec<BufferHandle>> {
    let mut buffers = Vec::with_capacity(graph.len());

    for (i, node) in graph.nodes().iter().enumerate() {
        let byte_size = node.shape().element_count() * node.dtype().byte_width();
        let handle = arena.allocate(byte_size, BUFFER_ALIGNMENT)?;
        tracer.log(EventType::MemoryAllocation, Some(i), format!("{} bytes", byte_size));
        buffers.push(handle);
    }

    for (i, node) in graph.nodes().iter().enumerate() {
        if let Node::Constant { data, .. } = node {
            arena.view_f32_mut(buffers[i]).copy_from_slice(data);
        }
    }

    Ok(buffers)
}
