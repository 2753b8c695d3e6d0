//! Per-op shape inference rules (spec §4.2). Used both at append time by
//! `GraphBuilder` (so a node's output shape is computed and stored once,
//! as the append happens) and again by `graph::verifier::Verifier` as an
//! independent re-check, the way the teacher's `Verifier::verify` recomputes
//! `output_shape` from scratch rather than trusting the stored value.

use crate::errors::{VectoriaError, VectoriaResult};
use crate::types::{DataType, IntParams, OpType, TensorShape};

/// Computes the output shape of `op` given its resolved input shapes and
/// integer parameters. `int_params` carries axes/perm/slice-bounds/reshape
/// targets depending on `op`, exactly as spec §3 describes for `Node::Op`.
pub fn infer_output_shape(
    op: OpType,
    input_shapes: &[TensorShape],
    int_params: &IntParams,
) -> VectoriaResult<TensorShape> {
    match op {
        OpType::Add | OpType::Sub | OpType::Mul | OpType::Div => {
            require_arity(op, input_shapes, 2)?;
            // Output shape is shape(A); broadcast is resolved at execution time (spec §4.4).
            Ok(input_shapes[0].clone())
        }
        OpType::MatMul => {
            require_arity(op, input_shapes, 2)?;
            let a = &input_shapes[0];
            let b = &input_shapes[1];
            if a.rank() != 2 || b.rank() != 2 {
                return Err(VectoriaError::shape(format!(
                    "MatMul requires rank-2 inputs, got ranks {} and {}",
                    a.rank(),
                    b.rank()
                )));
            }
            let (m, k_a) = (a.dims()[0], a.dims()[1]);
            let (k_b, n) = (b.dims()[0], b.dims()[1]);
            if k_a != k_b {
                return Err(VectoriaError::shape(format!(
                    "MatMul inner dimension mismatch: A is [{}, {}], B is [{}, {}]",
                    m, k_a, k_b, n
                )));
            }
            Ok(TensorShape::from_dims(vec![m, n]))
        }
        OpType::BiasAdd => {
            require_arity(op, input_shapes, 2)?;
            let input = &input_shapes[0];
            let bias = &input_shapes[1];
            if input.rank() != 2 {
                return Err(VectoriaError::shape("BiasAdd input must be rank 2 [M, N]"));
            }
            let n = input.dims()[1];
            let bias_ok = match bias.dims() {
                [bn] => *bn == n,
                [1, bn] => *bn == n,
                _ => false,
            };
            if !bias_ok {
                return Err(VectoriaError::shape(format!(
                    "BiasAdd bias shape {:?} incompatible with input last dim {}",
                    bias.dims(),
                    n
                )));
            }
            Ok(input.clone())
        }
        OpType::ReLU | OpType::Exp | OpType::Sqrt | OpType::Log => {
            require_arity(op, input_shapes, 1)?;
            Ok(input_shapes[0].clone())
        }
        OpType::ReduceSum | OpType::ReduceMax => {
            require_arity(op, input_shapes, 1)?;
            let input = &input_shapes[0];
            if input.rank() == 0 {
                return Err(VectoriaError::shape(format!(
                    "{} requires rank >= 1",
                    op.name()
                )));
            }
            if input.rank() == 1 {
                Ok(TensorShape::scalar())
            } else {
                Ok(TensorShape::from_dims(
                    input.dims()[..input.rank() - 1].to_vec(),
                ))
            }
        }
        OpType::Transpose => {
            require_arity(op, input_shapes, 1)?;
            let input = &input_shapes[0];
            let perm = int_params;
            if perm.len() != input.rank() {
                return Err(VectoriaError::shape(format!(
                    "Transpose perm length {} does not match input rank {}",
                    perm.len(),
                    input.rank()
                )));
            }
            validate_permutation(perm, input.rank())?;
            let dims: Vec<usize> = perm.iter().map(|&p| input.dims()[p as usize]).collect();
            Ok(TensorShape::from_dims(dims))
        }
        OpType::Reshape => {
            require_arity(op, input_shapes, 1)?;
            let input = &input_shapes[0];
            let target_dims: Vec<usize> = int_params.iter().map(|&d| d as usize).collect();
            let target = TensorShape::from_dims(target_dims);
            if target.element_count() != input.element_count() {
                return Err(VectoriaError::shape(format!(
                    "Reshape element count mismatch: input has {}, target has {}",
                    input.element_count(),
                    target.element_count()
                )));
            }
            Ok(target)
        }
        OpType::Concat => {
            if input_shapes.is_empty() {
                return Err(VectoriaError::shape("Concat requires at least one input"));
            }
            let axis = *int_params.first().ok_or_else(|| {
                VectoriaError::shape("Concat requires an axis int_param")
            })? as usize;
            let rank = input_shapes[0].rank();
            if axis >= rank {
                return Err(VectoriaError::shape(format!(
                    "Concat axis {} out of range for rank {}",
                    axis, rank
                )));
            }
            let mut concat_dim_total = 0usize;
            for (i, shape) in input_shapes.iter().enumerate() {
                if shape.rank() != rank {
                    return Err(VectoriaError::shape(format!(
                        "Concat input {} has rank {}, expected {}",
                        i,
                        shape.rank(),
                        rank
                    )));
                }
                for (d, (&dim, &dim0)) in shape.dims().iter().zip(input_shapes[0].dims()).enumerate() {
                    if d != axis && dim != dim0 {
                        return Err(VectoriaError::shape(format!(
                            "Concat input {} disagrees on non-concat dimension {}: {} vs {}",
                            i, d, dim, dim0
                        )));
                    }
                }
                concat_dim_total += shape.dims()[axis];
            }
            let mut out_dims = input_shapes[0].dims().to_vec();
            out_dims[axis] = concat_dim_total;
            Ok(TensorShape::from_dims(out_dims))
        }
        OpType::Slice => {
            require_arity(op, input_shapes, 1)?;
            let input = &input_shapes[0];
            if int_params.len() != 3 {
                return Err(VectoriaError::shape(
                    "Slice requires int_params [axis, start, end]",
                ));
            }
            let axis = int_params[0] as usize;
            if axis >= input.rank() {
                return Err(VectoriaError::shape(format!(
                    "Slice axis {} out of range for rank {}",
                    axis,
                    input.rank()
                )));
            }
            let dim = input.dims()[axis] as i64;
            let start = resolve_slice_bound(int_params[1], dim)?;
            let end = resolve_slice_bound(int_params[2], dim)?;
            if start > end || end > dim {
                return Err(VectoriaError::shape(format!(
                    "Slice bounds [{}, {}) invalid for axis of size {}",
                    start, end, dim
                )));
            }
            let mut out_dims = input.dims().to_vec();
            out_dims[axis] = (end - start) as usize;
            Ok(TensorShape::from_dims(out_dims))
        }
    }
}

/// Negative indices wrap once (spec §4.2 Slice rule). Reused by
/// `engine::dispatch` to resolve the same bounds again at execution time.
pub(crate) fn resolve_slice_bound(value: i64, dim: i64) -> VectoriaResult<i64> {
    let resolved = if value < 0 { value + dim } else { value };
    if resolved < 0 || resolved > dim {
        return Err(VectoriaError::shape(format!(
            "slice bound {} out of range for dimension of size {}",
            value, dim
        )));
    }
    Ok(resolved)
}

fn validate_permutation(perm: &IntParams, rank: usize) -> VectoriaResult<()> {
    let mut seen = vec![false; rank];
    for &p in perm {
        if p < 0 || p as usize >= rank {
            return Err(VectoriaError::shape(format!(
                "perm index {} out of range for rank {}",
                p, rank
            )));
        }
        if std::mem::replace(&mut seen[p as usize], true) {
            return Err(VectoriaError::shape(format!(
                "perm is not a permutation: index {} repeated",
                p
            )));
        }
    }
    Ok(())
}

fn require_arity(op: OpType, shapes: &[TensorShape], expected: usize) -> VectoriaResult<()> {
    if shapes.len() != expected {
        return Err(VectoriaError::structural(format!(
            "{} expects {} input(s), got {}",
            op.name(),
            expected,
            shapes.len()
        )));
    }
    Ok(())
}

/// Output dtype inference: every primitive op in this version is
/// dtype-preserving except for the purely structural ones, which are also
/// dtype-preserving. Arithmetic ops additionally require F32 inputs (spec
/// §3: "other types may appear in the IR but must not flow into arithmetic
/// ops in this version").
pub fn infer_output_dtype(op: OpType, input_dtypes: &[DataType]) -> VectoriaResult<DataType> {
    let arithmetic = !matches!(op, OpType::Reshape | OpType::Transpose | OpType::Concat | OpType::Slice);
    if arithmetic {
        for (i, dt) in input_dtypes.iter().enumerate() {
            if !dt.is_arithmetic() {
                return Err(VectoriaError::shape(format!(
                    "{} input {} has non-arithmetic dtype {:?}",
                    op.name(),
                    i,
                    dt
                )));
            }
        }
    }
    Ok(input_dtypes.first().copied().unwrap_or(DataType::F32))
}
