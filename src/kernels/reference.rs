//! Scalar reference kernels (spec §4.4, §6 "Reference" family). Ported
//! line-for-line from the original's `core/src/kernels/*_ref.cpp`: naive
//! loops, row-major indexing, no blocking or vectorization. This family is
//! always compiled in and is the correctness oracle every other family is
//! checked against.

use super::{BinaryOpKind, BroadcastKind, KernelFamily, KernelStatus, ReduceOpKind, UnaryOpKind};

#[derive(Debug, Default)]
pub struct ReferenceFamily;

impl KernelFamily for ReferenceFamily {
    fn name(&self) -> &'static str {
        "Reference"
    }

    fn gemm(
        &self,
        a: &[f32],
        b: &[f32],
        c: &mut [f32],
        m: usize,
        n: usize,
        k: usize,
        lda: usize,
        ldb: usize,
        ldc: usize,
        alpha: f32,
        beta: f32,
    ) -> KernelStatus {
        if a.len() < m * lda || b.len() < (k.saturating_sub(1)) * ldb + n || c.len() < (m.saturating_sub(1)) * ldc + n {
            return KernelStatus::InvalidShape;
        }
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0f32;
                for p in 0..k {
                    sum += a[i * lda + p] * b[p * ldb + j];
                }
                let c_idx = i * ldc + j;
                c[c_idx] = alpha * sum + beta * c[c_idx];
            }
        }
        KernelStatus::Success
    }

    fn unary(&self, op: UnaryOpKind, input: &[f32], output: &mut [f32]) -> KernelStatus {
        if input.len() != output.len() {
            return KernelStatus::InvalidShape;
        }
        let f: fn(f32) -> f32 = match op {
            UnaryOpKind::ReLU => |x| x.max(0.0),
            UnaryOpKind::Exp => f32::exp,
            UnaryOpKind::Sqrt => f32::sqrt,
            UnaryOpKind::Log => f32::ln,
        };
        for (o, i) in output.iter_mut().zip(input.iter()) {
            *o = f(*i);
        }
        KernelStatus::Success
    }

    fn binary(
        &self,
        op: BinaryOpKind,
        kind: BroadcastKind,
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        outer: usize,
        inner: usize,
    ) -> KernelStatus {
        let f: fn(f32, f32) -> f32 = match op {
            BinaryOpKind::Add => |x, y| x + y,
            BinaryOpKind::Sub => |x, y| x - y,
            BinaryOpKind::Mul => |x, y| x * y,
            BinaryOpKind::Div => |x, y| x / y,
        };
        match kind {
            BroadcastKind::Equal => {
                let count = outer * inner;
                if a.len() < count || b.len() < count || out.len() < count {
                    return KernelStatus::InvalidShape;
                }
                for i in 0..count {
                    out[i] = f(a[i], b[i]);
                }
            }
            BroadcastKind::Scalar => {
                let count = outer * inner;
                if a.len() < count || b.is_empty() || out.len() < count {
                    return KernelStatus::InvalidShape;
                }
                let scalar = b[0];
                for i in 0..count {
                    out[i] = f(a[i], scalar);
                }
            }
            BroadcastKind::Column => {
                if a.len() < outer * inner || b.len() < outer || out.len() < outer * inner {
                    return KernelStatus::InvalidShape;
                }
                for i in 0..outer {
                    for j in 0..inner {
                        out[i * inner + j] = f(a[i * inner + j], b[i]);
                    }
                }
            }
            BroadcastKind::Row => {
                if a.len() < outer * inner || b.len() < inner || out.len() < outer * inner {
                    return KernelStatus::InvalidShape;
                }
                for i in 0..outer {
                    for j in 0..inner {
                        out[i * inner + j] = f(a[i * inner + j], b[j]);
                    }
                }
            }
        }
        KernelStatus::Success
    }

    fn bias_add(&self, input: &[f32], bias: &[f32], output: &mut [f32], m: usize, n: usize) -> KernelStatus {
        if input.len() < m * n || bias.len() < n || output.len() < m * n {
            return KernelStatus::InvalidShape;
        }
        for i in 0..m {
            for j in 0..n {
                output[i * n + j] = input[i * n + j] + bias[j];
            }
        }
        KernelStatus::Success
    }

    fn reduce(&self, op: ReduceOpKind, input: &[f32], output: &mut [f32], outer: usize, inner: usize) -> KernelStatus {
        if input.len() < outer * inner || output.len() < outer {
            return KernelStatus::InvalidShape;
        }
        for i in 0..outer {
            let row = &input[i * inner..i * inner + inner];
            output[i] = match op {
                ReduceOpKind::Sum => row.iter().sum(),
                ReduceOpKind::Max => row.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            };
        }
        KernelStatus::Success
    }

    fn transpose(&self, input: &[f32], output: &mut [f32], input_shape: &[usize], perm: &[i64]) -> KernelStatus {
        let count: usize = input_shape.iter().product();
        if input.len() < count || output.len() < count || perm.len() != input_shape.len() {
            return KernelStatus::InvalidShape;
        }
        let output_shape: Vec<usize> = perm.iter().map(|&p| input_shape[p as usize]).collect();

        let mut in_indices = vec![0usize; input_shape.len()];
        for i in 0..count {
            unravel_index(i, input_shape, &mut in_indices);
            let out_indices: Vec<usize> = perm.iter().map(|&p| in_indices[p as usize]).collect();
            let out_idx = ravel_index(&out_indices, &output_shape);
            output[out_idx] = input[i];
        }
        KernelStatus::Success
    }

    fn reshape_copy(&self, input: &[f32], output: &mut [f32]) -> KernelStatus {
        if input.len() != output.len() {
            return KernelStatus::InvalidShape;
        }
        output.copy_from_slice(input);
        KernelStatus::Success
    }

    fn concat(&self, inputs: &[&[f32]], input_shapes: &[&[usize]], axis: usize, output: &mut [f32]) -> KernelStatus {
        if inputs.is_empty() || inputs.len() != input_shapes.len() {
            return KernelStatus::InvalidShape;
        }
        let rank = input_shapes[0].len();
        if axis >= rank {
            return KernelStatus::InvalidShape;
        }
        let outer_count: usize = input_shapes[0][..axis].iter().product();
        let inner_count: usize = input_shapes[0][axis + 1..].iter().product();

        let mut dst = 0usize;
        for o in 0..outer_count {
            for (k, input) in inputs.iter().enumerate() {
                let concat_dim_size = input_shapes[k][axis];
                let copy_size = concat_dim_size * inner_count;
                let src_start = o * copy_size;
                if input.len() < src_start + copy_size || output.len() < dst + copy_size {
                    return KernelStatus::InvalidShape;
                }
                output[dst..dst + copy_size].copy_from_slice(&input[src_start..src_start + copy_size]);
                dst += copy_size;
            }
        }
        KernelStatus::Success
    }

    fn slice(
        &self,
        input: &[f32],
        input_shape: &[usize],
        axis: usize,
        start: usize,
        end: usize,
        output: &mut [f32],
    ) -> KernelStatus {
        if axis >= input_shape.len() || start > end || end > input_shape[axis] {
            return KernelStatus::InvalidShape;
        }
        let rank = input_shape.len();
        let outer_count: usize = input_shape[..axis].iter().product();
        let inner_count: usize = input_shape[axis + 1..rank].iter().product();
        let input_dim_size = input_shape[axis];
        let slice_dim_size = end - start;

        for o in 0..outer_count {
            let src_start = (o * input_dim_size + start) * inner_count;
            let dst_start = o * slice_dim_size * inner_count;
            let len = slice_dim_size * inner_count;
            if input.len() < src_start + len || output.len() < dst_start + len {
                return KernelStatus::InvalidShape;
            }
            output[dst_start..dst_start + len].copy_from_slice(&input[src_start..src_start + len]);
        }
        KernelStatus::Success
    }

    fn supports_broadcast_kind(&self, _kind: BroadcastKind) -> bool {
        true
    }

    fn elementwise_supported(&self, _kind: BroadcastKind, _count: usize) -> bool {
        true
    }

    fn reduction_supported(&self, _outer: usize, _inner: usize) -> bool {
        true
    }

    fn gemm_supported(&self, _m: usize, _n: usize, _k: usize) -> bool {
        true
    }
}

fn unravel_index(mut index: usize, shape: &[usize], multi_indices: &mut [usize]) {
    for i in (0..shape.len()).rev() {
        multi_indices[i] = index % shape[i];
        index /= shape[i];
    }
}

fn ravel_index(multi_indices: &[usize], shape: &[usize]) -> usize {
    let mut index = 0usize;
    let mut stride = 1usize;
    for i in (0..shape.len()).rev() {
        index += multi_indices[i] * stride;
        stride *= shape[i];
    }
    index
}
