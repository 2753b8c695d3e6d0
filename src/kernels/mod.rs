//! Kernel ABI (spec §4.4, §6). Mirrors the original's `kernel_abi.hpp`
//! status-returning C ABI, but expressed as a Rust trait over slices rather
//! than raw pointer/count pairs crossing an `extern "C"` boundary — there is
//! no actual hand-written assembly in this version, so the pointer-based
//! contract the original enforces for linking against `.s` files is
//! unnecessary; a `&[f32]`/`&mut [f32]` pair already carries its own length.
//!
//! Two families implement `KernelFamily`: [`reference::ReferenceFamily`]
//! (always available, scalar, the correctness oracle) and
//! [`vector::VectorFamily`] (behind the `vector-kernels` feature,
//! architecture-tuned, eligible only for the shapes it declares support
//! for via `elementwise_supported`/`reduction_supported`).

pub mod reference;

#[cfg(feature = "vector-kernels")]
pub mod vector;

/// Status a kernel call returns, mirroring `VectoriaStatus` in the
/// original's `kernel_abi.hpp` exactly (including the ordering of variants).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelStatus {
    Success,
    InvalidAlignment,
    InvalidShape,
    UnsupportedDType,
}

impl KernelStatus {
    pub fn is_success(self) -> bool {
        matches!(self, KernelStatus::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOpKind {
    ReLU,
    Exp,
    Sqrt,
    Log,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOpKind {
    Sum,
    Max,
}

/// Which of the three broadcast shapes spec §4.4 enumerates an elementwise
/// binary dispatch resolved to, plus `Equal` for the no-broadcast case.
/// `Column`/`Row`/`Scalar` name the *shorter* operand's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastKind {
    /// `shape(A) == shape(B)`, plain elementwise.
    Equal,
    /// `B` is `[outer]` against `A`'s `[outer, inner]`: `Out[i,j] = A[i,j] op B[i]`.
    Column,
    /// `B` is `[inner]` or `[1, inner]` against `A`'s `[outer, inner]`: `Out[i,j] = A[i,j] op B[j]`.
    Row,
    /// `B` is rank-0 or a single element: `Out[i] = A[i] op B[0]`.
    Scalar,
}

/// One kernel family: a set of primitive op implementations sharing a
/// correctness/performance tradeoff. `Engine::dispatch` picks a family per
/// node per `EngineConfig::kernel_policy` (spec §4.4 "Run" phase) and calls
/// through this trait, never the concrete struct, so the dispatch logic
/// does not care which family it got.
pub trait KernelFamily: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// `C = alpha * (A * B) + beta * C`, row-major, with explicit leading
    /// dimensions so a kernel can operate on a sub-matrix view.
    #[allow(clippy::too_many_arguments)]
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
    ) -> KernelStatus;

    fn unary(&self, op: UnaryOpKind, input: &[f32], output: &mut [f32]) -> KernelStatus;

    /// Dispatches on `kind` to the equal-count or one of the three
    /// broadcast loops. `outer`/`inner` are interpreted per `kind`: for
    /// `Equal` and `Scalar` only `inner` (the total/element count) is used.
    fn binary(
        &self,
        op: BinaryOpKind,
        kind: BroadcastKind,
        a: &[f32],
        b: &[f32],
        out: &mut [f32],
        outer: usize,
        inner: usize,
    ) -> KernelStatus;

    /// `Out[i, j] = In[i, j] + Bias[j]`, `In`/`Out`: `[m, n]`, `Bias`: `[n]`.
    fn bias_add(&self, input: &[f32], bias: &[f32], output: &mut [f32], m: usize, n: usize) -> KernelStatus;

    /// Reduces the last axis of `[outer, inner]` down to `[outer]`.
    fn reduce(&self, op: ReduceOpKind, input: &[f32], output: &mut [f32], outer: usize, inner: usize) -> KernelStatus;

    fn transpose(&self, input: &[f32], output: &mut [f32], input_shape: &[usize], perm: &[i64]) -> KernelStatus;

    /// Element-preserving copy backing `Reshape` (row-major layout never
    /// changes, only the shape metadata does, so the kernel is a memcpy).
    fn reshape_copy(&self, input: &[f32], output: &mut [f32]) -> KernelStatus;

    fn concat(&self, inputs: &[&[f32]], input_shapes: &[&[usize]], axis: usize, output: &mut [f32]) -> KernelStatus;

    #[allow(clippy::too_many_arguments)]
    fn slice(
        &self,
        input: &[f32],
        input_shape: &[usize],
        axis: usize,
        start: usize,
        end: usize,
        output: &mut [f32],
    ) -> KernelStatus;

    /// Whether this family has an elementwise path for `kind` at all
    /// (distinct from whether a *given* call's element count is eligible,
    /// which `elementwise_supported` answers). The reference family always
    /// returns `true`; the vector family only supports `Equal`.
    fn supports_broadcast_kind(&self, kind: BroadcastKind) -> bool;

    /// Whether this family can actually carry out an elementwise op of
    /// `count` elements — the vector family requires full-lane multiples,
    /// anything else is ineligible and the caller must fall back.
    fn elementwise_supported(&self, kind: BroadcastKind, count: usize) -> bool;

    /// Whether this family can carry out a reduction of the given shape.
    fn reduction_supported(&self, outer: usize, inner: usize) -> bool;

    /// Whether this family can carry out a GEMM of the given dimensions.
    fn gemm_supported(&self, m: usize, n: usize, k: usize) -> bool;
}
