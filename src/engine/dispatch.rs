//! Per-op argument materialization and kernel dispatch (spec §4.4
//! "Dispatch rules per primitive op"). Ported from the original's inline
//! dispatch comments in `engine.cpp`/`kernel_abi.hpp` — there is no
//! dispatch table in the original (the placeholder `execute()` never grew
//! one), so this module is new code grounded directly on the spec's
//! dispatch-rule prose rather than on a specific source file, using the
//! same `KernelFamily` seam the reference/vector families already share.

use crate::arena::{Arena, BufferHandle};
use crate::errors::{VectoriaError, VectoriaResult};
use crate::graph::shape_infer::resolve_slice_bound;
use crate::graph::Graph;
use crate::kernels::{BinaryOpKind, BroadcastKind, KernelFamily, ReduceOpKind, UnaryOpKind};
use crate::trace::{EventType, Tracer};
use crate::types::{NodeId, OpType, TensorShape};

/// Everything `dispatch_op` needs to pick a kernel family, independent of
/// `Engine`'s state machine so this module never has to borrow `Engine`
/// itself (avoiding the aliasing that would cause between `&Engine` and
/// `&mut Arena`/`&mut Tracer`, both of which `Engine` also owns).
pub struct DispatchContext<'a> {
    pub reference: &'a dyn KernelFamily,
    pub vector: Option<&'a dyn KernelFamily>,
    pub policy: crate::config::KernelPolicy,
    pub mode: crate::config::ExecutionMode,
}

impl<'a> DispatchContext<'a> {
    /// Resolves which family services a given call, applying spec §4.4's
    /// fallback policy. `vector_eligible` is the caller's answer to
    /// "does the vector family's own shape constraints allow this call".
    fn resolve_family(&self, vector_eligible: bool) -> VectoriaResult<(&'a dyn KernelFamily, String)> {
        use crate::config::{ExecutionMode, KernelPolicy};

        match self.policy {
            KernelPolicy::Reference => Ok((self.reference, "Reference".to_string())),
            KernelPolicy::Vector => match (self.vector, vector_eligible) {
                (Some(family), true) => Ok((family, format!("SIMD-{}", family.name()))),
                _ => match self.mode {
                    ExecutionMode::Research => Ok((self.reference, "Reference (SIMD fallback)".to_string())),
                    ExecutionMode::Deployment => Err(VectoriaError::policy(
                        "vector kernel requested but unavailable for this node and deployment mode forbids fallback",
                    )),
                },
            },
        }
    }
}

/// Resolves the elementwise broadcast kind for `Add`/`Sub`/`Mul`/`Div`
/// (spec §4.4). Per §4.2's shape-inference rule the output shape is always
/// `shape(A)`, so a well-formed graph never has B's element count exceed
/// A's; that asymmetry is what lets this resolve without knowing which
/// operand the composer intended as the "broadcast" side.
fn resolve_broadcast(shape_a: &TensorShape, shape_b: &TensorShape) -> VectoriaResult<(BroadcastKind, usize, usize)> {
    let count_a = shape_a.element_count();
    let count_b = shape_b.element_count();

    if count_a == count_b {
        return Ok((BroadcastKind::Equal, 1, count_a));
    }
    if count_b > count_a {
        return Err(VectoriaError::shape(format!(
            "broadcast operand has {} elements, larger than the {} of the output-shaped operand",
            count_b, count_a
        )));
    }
    if count_a % count_b != 0 {
        return Err(VectoriaError::shape(format!(
            "broadcast shapes incompatible: {} is not a multiple of {}",
            count_a, count_b
        )));
    }

    let inner = *shape_a.dims().last().unwrap_or(&count_a);
    let outer = count_a / inner;

    if count_b == outer {
        Ok((BroadcastKind::Column, outer, inner))
    } else if count_b == inner {
        Ok((BroadcastKind::Row, outer, inner))
    } else if count_b == 1 {
        Ok((BroadcastKind::Scalar, outer, inner))
    } else {
        Err(VectoriaError::shape(format!(
            "broadcast operand count {} matches neither outer ({}) nor inner ({}) nor scalar",
            count_b, outer, inner
        )))
    }
}

fn binary_op_kind(op: OpType) -> BinaryOpKind {
    match op {
        OpType::Add => BinaryOpKind::Add,
        OpType::Sub => BinaryOpKind::Sub,
        OpType::Mul => BinaryOpKind::Mul,
        OpType::Div => BinaryOpKind::Div,
        _ => unreachable!("binary_op_kind called on non-binary op"),
    }
}

fn unary_op_kind(op: OpType) -> UnaryOpKind {
    match op {
        OpType::ReLU => UnaryOpKind::ReLU,
        OpType::Exp => UnaryOpKind::Exp,
        OpType::Sqrt => UnaryOpKind::Sqrt,
        OpType::Log => UnaryOpKind::Log,
        _ => unreachable!("unary_op_kind called on non-unary op"),
    }
}

/// Runs one op node: gathers its inputs as owned copies (sidesteps the
/// arena-aliasing that reading/writing overlapping byte ranges would
/// otherwise require `unsafe` to resolve safely), computes its output,
/// writes it back into the node's own buffer, and emits the
/// `KernelDispatch` trace event.
#[tracing::instrument(skip(ctx, graph, buffers, arena, tracer), name = "kernel_dispatch")]
pub fn dispatch_op(
    ctx: &DispatchContext,
    graph: &Graph,
    buffers: &[BufferHandle],
    arena: &mut Arena,
    tracer: &mut Tracer,
    node_id: NodeId,
) -> VectoriaResult<()> {
    let node = graph
        .node(node_id)
        .ok_or_else(|| VectoriaError::structural(format!("no such node {}", node_id)))?;
    let (op, inputs, int_params) = node
        .as_op()
        .ok_or_else(|| VectoriaError::structural(format!("node {} is not an op node", node_id)))?;

    let input_data: Vec<Vec<f32>> = inputs
        .iter()
        .map(|&id| arena.view_f32(buffers[id.index()]).to_vec())
        .collect();
    let input_shapes: Vec<TensorShape> = inputs
        .iter()
        .map(|&id| graph.node(id).expect("forward-reference invariant").shape().clone())
        .collect();

    let output_shape = node.shape().clone();
    let output_count = output_shape.element_count();
    let mut output = vec![0.0f32; output_count];

    let tag = match op {
        OpType::Add | OpType::Sub | OpType::Mul | OpType::Div => {
            let (kind, outer, inner) = resolve_broadcast(&input_shapes[0], &input_shapes[1])?;
            let count = outer * inner;
            let vector_eligible = kind == BroadcastKind::Equal && count >= 1;
            let (family, tag) = ctx.resolve_family(vector_eligible)?;
            let status = family.binary(binary_op_kind(op), kind, &input_data[0], &input_data[1], &mut output, outer, inner);
            check_status(status, op)?;
            tag
        }
        OpType::MatMul => {
            let (m, k) = (input_shapes[0].dims()[0], input_shapes[0].dims()[1]);
            let n = input_shapes[1].dims()[1];
            let vector_eligible = ctx.vector.map(|v| v.gemm_supported(m, n, k)).unwrap_or(false);
            let (family, tag) = ctx.resolve_family(vector_eligible)?;
            let status = family.gemm(&input_data[0], &input_data[1], &mut output, m, n, k, k, n, n, 1.0, 0.0);
            check_status(status, op)?;
            tag
        }
        OpType::BiasAdd => {
            let (m, n) = (input_shapes[0].dims()[0], input_shapes[0].dims()[1]);
            let vector_eligible = ctx
                .vector
                .map(|v| v.elementwise_supported(BroadcastKind::Row, m * n))
                .unwrap_or(false);
            let (family, tag) = ctx.resolve_family(vector_eligible)?;
            let status = family.bias_add(&input_data[0], &input_data[1], &mut output, m, n);
            check_status(status, op)?;
            tag
        }
        OpType::ReLU | OpType::Exp | OpType::Sqrt | OpType::Log => {
            let vector_eligible = ctx
                .vector
                .map(|v| v.elementwise_supported(BroadcastKind::Equal, output_count))
                .unwrap_or(false);
            let (family, tag) = ctx.resolve_family(vector_eligible)?;
            let status = family.unary(unary_op_kind(op), &input_data[0], &mut output);
            check_status(status, op)?;
            tag
        }
        OpType::ReduceSum | OpType::ReduceMax => {
            let input_shape = &input_shapes[0];
            let (outer, inner) = if input_shape.rank() <= 1 {
                (1, input_shape.element_count())
            } else {
                let inner = *input_shape.dims().last().unwrap();
                (input_shape.element_count() / inner, inner)
            };
            let vector_eligible = ctx.vector.map(|v| v.reduction_supported(outer, inner)).unwrap_or(false);
            let (family, tag) = ctx.resolve_family(vector_eligible)?;
            let reduce_kind = if op == OpType::ReduceSum { ReduceOpKind::Sum } else { ReduceOpKind::Max };
            let status = family.reduce(reduce_kind, &input_data[0], &mut output, outer, inner);
            check_status(status, op)?;
            tag
        }
        // Structural ops move data, they don't reduce or accumulate, so
        // there is nothing for a vector family to do differently than the
        // reference family (both families implement the identical loop,
        // see `kernels::vector`); they are unconditionally eligible rather
        // than subject to the elementwise/reduction/gemm fallback gate.
        OpType::Transpose => {
            let (family, tag) = ctx.resolve_family(true)?;
            let status = family.transpose(&input_data[0], &mut output, input_shapes[0].dims(), int_params);
            check_status(status, op)?;
            tag
        }
        OpType::Reshape => {
            let (family, tag) = ctx.resolve_family(true)?;
            let status = family.reshape_copy(&input_data[0], &mut output);
            check_status(status, op)?;
            tag
        }
        OpType::Concat => {
            let axis = *int_params.first().ok_or_else(|| VectoriaError::structural("Concat missing axis"))? as usize;
            let refs: Vec<&[f32]> = input_data.iter().map(|v| v.as_slice()).collect();
            let shape_refs: Vec<&[usize]> = input_shapes.iter().map(|s| s.dims()).collect();
            let (family, tag) = ctx.resolve_family(true)?;
            let status = family.concat(&refs, &shape_refs, axis, &mut output);
            check_status(status, op)?;
            tag
        }
        OpType::Slice => {
            if int_params.len() != 3 {
                return Err(VectoriaError::structural("Slice requires int_params [axis, start, end]"));
            }
            let axis = int_params[0] as usize;
            let dim = input_shapes[0].dims()[axis] as i64;
            let start = resolve_slice_bound(int_params[1], dim)? as usize;
            let end = resolve_slice_bound(int_params[2], dim)? as usize;
            let (family, tag) = ctx.resolve_family(true)?;
            let status = family.slice(&input_data[0], input_shapes[0].dims(), axis, start, end, &mut output);
            check_status(status, op)?;
            tag
        }
    };

    arena.view_f32_mut(buffers[node_id.index()]).copy_from_slice(&output);
    tracing::trace!(node = node_id.index(), family = %tag, "kernel dispatch resolved");
    tracer.log(
        EventType::KernelDispatch,
        Some(node_id.index()),
        format!("{} inputs={:?}", tag, inputs.iter().map(|i| i.index()).collect::<Vec<_>>()),
    );

    Ok(())
}

fn check_status(status: crate::kernels::KernelStatus, op: OpType) -> VectoriaResult<()> {
    use crate::kernels::KernelStatus;
    match status {
        KernelStatus::Success => Ok(()),
        KernelStatus::InvalidAlignment => Err(VectoriaError::kernel(format!("{}: invalid alignment", op.name()))),
        KernelStatus::InvalidShape => Err(VectoriaError::kernel(format!("{}: invalid shape", op.name()))),
        KernelStatus::UnsupportedDType => Err(VectoriaError::kernel(format!("{}: unsupported dtype", op.name()))),
    }
}
