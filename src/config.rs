//! Engine configuration (spec §4.3): the policy knobs that pick which
//! kernel family to prefer and how strictly to enforce it. `EngineConfig`
//! is plain data, `Serialize`/`Deserialize` so it can round-trip through
//! whatever configuration surface embeds this engine (the teacher's
//! training configs are loaded the same way, via `serde` + a config file or
//! CLI flags, never hand-rolled parsing).

use serde::{Deserialize, Serialize};

/// Which kernel family `Engine::compile` should prefer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelPolicy {
    /// Scalar, portable, always-correct kernels.
    Reference,
    /// Architecture-tuned kernels where compiled in and shape-eligible.
    Vector,
}

impl Default for KernelPolicy {
    fn default() -> Self {
        KernelPolicy::Reference
    }
}

/// How strictly the engine enforces `KernelPolicy::Vector` (spec §4.4
/// "Mode gate" phase).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// A vector kernel that cannot handle a node's shape silently falls
    /// back to the reference kernel, with a trace/log entry recording it.
    Research,
    /// The same situation is a hard `VectoriaError::Policy` failure.
    Deployment,
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::Research
    }
}

/// Engine-wide configuration, fixed for the lifetime of a compiled graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    pub kernel_policy: KernelPolicy,
    pub execution_mode: ExecutionMode,
}

impl EngineConfig {
    pub fn new(kernel_policy: KernelPolicy, execution_mode: ExecutionMode) -> Self {
        Self {
            kernel_policy,
            execution_mode,
        }
    }
}
