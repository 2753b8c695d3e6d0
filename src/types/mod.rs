use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the computation graph.
///
/// Also its position in the graph's node sequence (invariant 4, spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(idx: usize) -> Self {
        NodeId(idx)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Element data type. Only F32 has arithmetic kernels in this version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    F32,
    F16,
    I32,
    I8,
}

impl DataType {
    /// Byte width of a single element.
    pub fn byte_width(self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F16 => 2,
            DataType::I32 => 4,
            DataType::I8 => 1,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(self, DataType::F32)
    }
}

/// Ordered sequence of non-negative dimensions. Rank 0 is a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorShape(pub Vec<usize>);

impl TensorShape {
    pub fn scalar() -> Self {
        TensorShape(Vec::new())
    }

    pub fn from_dims(dims: impl Into<Vec<usize>>) -> Self {
        TensorShape(dims.into())
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    /// Product of dims; 1 for rank 0, per spec §3.
    pub fn element_count(&self) -> usize {
        self.0.iter().product()
    }
}

impl From<Vec<usize>> for TensorShape {
    fn from(dims: Vec<usize>) -> Self {
        TensorShape(dims)
    }
}

impl From<&[usize]> for TensorShape {
    fn from(dims: &[usize]) -> Self {
        TensorShape(dims.to_vec())
    }
}

/// The closed set of primitive operation kinds. Higher-level primitives
/// (Softmax, LayerNorm, Attention, ...) are composer subgraphs, never
/// members of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpType {
    Add,
    Sub,
    Mul,
    Div,
    MatMul,
    BiasAdd,
    ReLU,
    ReduceSum,
    ReduceMax,
    Exp,
    Sqrt,
    Log,
    Transpose,
    Reshape,
    Concat,
    Slice,
}

impl OpType {
    pub fn name(self) -> &'static str {
        match self {
            OpType::Add => "Add",
            OpType::Sub => "Sub",
            OpType::Mul => "Mul",
            OpType::Div => "Div",
            OpType::MatMul => "MatMul",
            OpType::BiasAdd => "BiasAdd",
            OpType::ReLU => "ReLU",
            OpType::ReduceSum => "ReduceSum",
            OpType::ReduceMax => "ReduceMax",
            OpType::Exp => "Exp",
            OpType::Sqrt => "Sqrt",
            OpType::Log => "Log",
            OpType::Transpose => "Transpose",
            OpType::Reshape => "Reshape",
            OpType::Concat => "Concat",
            OpType::Slice => "Slice",
        }
    }

    pub fn is_elementwise_binary(self) -> bool {
        matches!(self, OpType::Add | OpType::Sub | OpType::Mul | OpType::Div)
    }

    pub fn arity(self) -> OpArity {
        match self {
            OpType::Add | OpType::Sub | OpType::Mul | OpType::Div => OpArity::Exact(2),
            OpType::MatMul => OpArity::Exact(2),
            OpType::BiasAdd => OpArity::Exact(2),
            OpType::ReLU | OpType::Exp | OpType::Sqrt | OpType::Log => OpArity::Exact(1),
            OpType::ReduceSum | OpType::ReduceMax => OpArity::Exact(1),
            OpType::Transpose | OpType::Reshape | OpType::Slice => OpArity::Exact(1),
            OpType::Concat => OpArity::AtLeast(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpArity {
    Exact(usize),
    AtLeast(usize),
}

/// Extra integer parameters an op carries (axes, perm vector, slice bounds,
/// reshape target). Interpretation is op-specific; see `graph::node`.
pub type IntParams = Vec<i64>;
