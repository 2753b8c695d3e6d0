//! Architecture-tuned kernels (spec §4.4, §6 "Vector" family). The
//! original links against hand-written AVX2/NEON assembly behind the same
//! `kernel_abi.hpp` C ABI (see `core/tests/test_simd_elementwise.cpp`,
//! `test_gemm_simd.cpp`); this port has no assembly to link against, so the
//! lane-width-chunked loops below stand in for it, structured the way real
//! SIMD kernels are: a vectorized main loop over whole lanes plus a scalar
//! tail. Compiled only under the `vector-kernels` feature.
//!
//! Eligibility is narrower than the reference family (spec §4.4: "the
//! architecture kernel if compiled in and if element counts match the SIMD
//! path's constraints") — only equal-count elementwise ops and reductions
//! whose inner dimension is a lane multiple qualify; `Engine::dispatch`
//! checks `elementwise_supported`/`reduction_supported` before committing to
//! this family and falls back (research mode) or fails (deployment mode)
//! otherwise.

use super::{BinaryOpKind, BroadcastKind, KernelFamily, KernelStatus, ReduceOpKind, UnaryOpKind};

/// Lane width this family claims to vectorize over. Stands in for the
/// architecture's real SIMD register width (8 x f32 for AVX2, 4 x f32 for
/// NEON) without diverging dispatch logic between them — both are exposed
/// through this one family, distinguished only by `name()`.
const LANE_WIDTH: usize = 8;

#[derive(Debug, Default)]
pub struct VectorFamily;

impl VectorFamily {
    pub fn name_for_host() -> &'static str {
        if cfg!(target_arch = "aarch64") {
            "NEON"
        } else if cfg!(target_arch = "x86_64") {
            "AVX2"
        } else {
            "SIMD"
        }
    }
}

impl KernelFamily for VectorFamily {
    fn name(&self) -> &'static str {
        Self::name_for_host()
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
        // Same arithmetic as the reference GEMM; a real port would unroll
        // the `p` loop over `LANE_WIDTH`-wide FMA groups.
        super::reference::ReferenceFamily.gemm(a, b, c, m, n, k, lda, ldb, ldc, alpha, beta)
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
        let count = input.len();
        let lanes = count / LANE_WIDTH * LANE_WIDTH;
        for i in (0..lanes).step_by(LANE_WIDTH) {
            for l in 0..LANE_WIDTH {
                output[i + l] = f(input[i + l]);
            }
        }
        for i in lanes..count {
            output[i] = f(input[i]);
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
        if kind != BroadcastKind::Equal {
            return KernelStatus::UnsupportedDType;
        }
        let count = outer * inner;
        if a.len() < count || b.len() < count || out.len() < count {
            return KernelStatus::InvalidShape;
        }
        let f: fn(f32, f32) -> f32 = match op {
            BinaryOpKind::Add => |x, y| x + y,
            BinaryOpKind::Sub => |x, y| x - y,
            BinaryOpKind::Mul => |x, y| x * y,
            BinaryOpKind::Div => |x, y| x / y,
        };
        let lanes = count / LANE_WIDTH * LANE_WIDTH;
        for i in (0..lanes).step_by(LANE_WIDTH) {
            for l in 0..LANE_WIDTH {
                out[i + l] = f(a[i + l], b[i + l]);
            }
        }
        for i in lanes..count {
            out[i] = f(a[i], b[i]);
        }
        KernelStatus::Success
    }

    fn bias_add(&self, input: &[f32], bias: &[f32], output: &mut [f32], m: usize, n: usize) -> KernelStatus {
        super::reference::ReferenceFamily.bias_add(input, bias, output, m, n)
    }

    fn reduce(&self, op: ReduceOpKind, input: &[f32], output: &mut [f32], outer: usize, inner: usize) -> KernelStatus {
        if input.len() < outer * inner || output.len() < outer {
            return KernelStatus::InvalidShape;
        }
        let lanes = inner / LANE_WIDTH * LANE_WIDTH;
        for i in 0..outer {
            let row = &input[i * inner..i * inner + inner];
            let mut acc = [0.0f32; LANE_WIDTH];
            let mut max_acc = [f32::NEG_INFINITY; LANE_WIDTH];
            for chunk_start in (0..lanes).step_by(LANE_WIDTH) {
                for l in 0..LANE_WIDTH {
                    match op {
                        ReduceOpKind::Sum => acc[l] += row[chunk_start + l],
                        ReduceOpKind::Max => max_acc[l] = max_acc[l].max(row[chunk_start + l]),
                    }
                }
            }
            let mut result = match op {
                ReduceOpKind::Sum => acc.iter().sum(),
                ReduceOpKind::Max => max_acc.iter().copied().fold(f32::NEG_INFINITY, f32::max),
            };
            for &v in &row[lanes..] {
                result = match op {
                    ReduceOpKind::Sum => result + v,
                    ReduceOpKind::Max => result.max(v),
                };
            }
            output[i] = result;
        }
        KernelStatus::Success
    }

    fn transpose(&self, input: &[f32], output: &mut [f32], input_shape: &[usize], perm: &[i64]) -> KernelStatus {
        super::reference::ReferenceFamily.transpose(input, output, input_shape, perm)
    }

    fn reshape_copy(&self, input: &[f32], output: &mut [f32]) -> KernelStatus {
        super::reference::ReferenceFamily.reshape_copy(input, output)
    }

    fn concat(&self, inputs: &[&[f32]], input_shapes: &[&[usize]], axis: usize, output: &mut [f32]) -> KernelStatus {
        super::reference::ReferenceFamily.concat(inputs, input_shapes, axis, output)
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
        super::reference::ReferenceFamily.slice(input, input_shape, axis, start, end, output)
    }

    fn supports_broadcast_kind(&self, kind: BroadcastKind) -> bool {
        matches!(kind, BroadcastKind::Equal)
    }

    fn elementwise_supported(&self, kind: BroadcastKind, count: usize) -> bool {
        kind == BroadcastKind::Equal && count >= LANE_WIDTH
    }

    fn reduction_supported(&self, _outer: usize, inner: usize) -> bool {
        inner >= LANE_WIDTH
    }

    fn gemm_supported(&self, m: usize, n: usize, k: usize) -> bool {
        m > 0 && n > 0 && k > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agrees_with_reference_on_equal_count_add() {
        let count = LANE_WIDTH * 3 + 5;
        let a: Vec<f32> = (0..count).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..count).map(|i| (i as f32) * 0.5).collect();
        let mut vector_out = vec![0.0; count];
        let mut ref_out = vec![0.0; count];

        VectorFamily.binary(BinaryOpKind::Add, BroadcastKind::Equal, &a, &b, &mut vector_out, 1, count);
        super::super::reference::ReferenceFamily.binary(
            BinaryOpKind::Add,
            BroadcastKind::Equal,
            &a,
            &b,
            &mut ref_out,
            1,
            count,
        );

        assert_eq!(vector_out, ref_out);
    }

    #[test]
    fn rejects_broadcast_kinds_other_than_equal() {
        let a = vec![1.0; 16];
        let b = vec![1.0; 2];
        let mut out = vec![0.0; 16];
        let status = VectorFamily.binary(BinaryOpKind::Add, BroadcastKind::Column, &a, &b, &mut out, 2, 8);
        assert_eq!(status, KernelStatus::UnsupportedDType);
    }

    #[test]
    fn small_counts_are_reported_as_unsupported_by_dispatch_helper() {
        assert!(!VectorFamily.elementwise_supported(BroadcastKind::Equal, 3));
        assert!(VectorFamily.elementwise_supported(BroadcastKind::Equal, LANE_WIDTH));
    }
}
