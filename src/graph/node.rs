use serde::{Deserialize, Serialize};

use crate::types::{DataType, IntParams, NodeId, OpType, TensorShape};

/// A node in the computation graph (spec §3). Index is the node's position
/// in the graph's node sequence and also its identity (invariant 4);
/// `Node` itself carries no index — `Graph` assigns it implicitly via
/// position, the way the teacher's `graph::Node` variants carry only
/// payload and the index lives in the enclosing `Vec`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Node {
    /// Data written by the caller between compile and execute.
    Input {
        name: String,
        shape: TensorShape,
        dtype: DataType,
    },
    /// Data written by the caller; semantically constant across executions.
    Parameter {
        name: String,
        shape: TensorShape,
        dtype: DataType,
    },
    /// Literal payload embedded at compile time.
    Constant {
        shape: TensorShape,
        dtype: DataType,
        data: Vec<f32>,
    },
    Op {
        op: OpType,
        inputs: Vec<NodeId>,
        output_shape: TensorShape,
        output_dtype: DataType,
        int_params: IntParams,
    },
}

impl Node {
    pub fn shape(&self) -> &TensorShape {
        match self {
            Node::Input { shape, .. } => shape,
            Node::Parameter { shape, .. } => shape,
            Node::Constant { shape, .. } => shape,
            Node::Op { output_shape, .. } => output_shape,
        }
    }

    pub fn dtype(&self) -> DataType {
        match self {
            Node::Input { dtype, .. } => *dtype,
            Node::Parameter { dtype, .. } => *dtype,
            Node::Constant { dtype, .. } => *dtype,
            Node::Op { output_dtype, .. } => *output_dtype,
        }
    }

    pub fn as_op(&self) -> Option<(OpType, &[NodeId], &IntParams)> {
        match self {
            Node::Op {
                op,
                inputs,
                int_params,
                ..
            } => Some((*op, inputs.as_slice(), int_params)),
            _ => None,
        }
    }

    pub fn is_writable_by_caller(&self) -> bool {
        matches!(self, Node::Input { .. } | Node::Parameter { .. })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Input { .. } => "Input",
            Node::Parameter { .. } => "Parameter",
            Node::Constant { .. } => "Constant",
            Node::Op { op, .. } => op.name(),
        }
    }
}
