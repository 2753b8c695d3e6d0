pub mod arena;
pub mod capabilities;
pub mod config;
pub mod engine;
pub mod errors;
pub mod graph;
pub mod kernels;
pub mod lowering;
pub mod macros;
pub mod trace;
pub mod types;

pub use config::{EngineConfig, ExecutionMode, KernelPolicy};
pub use engine::Engine;
pub use errors::{VectoriaError, VectoriaResult};
pub use graph::{dsl::GraphBuilder, Graph};
pub use types::{DataType, NodeId, OpType, TensorShape};
