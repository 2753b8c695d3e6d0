//! Mutation-scoped graph builder (spec §4.2 construction contract).
//!
//! Ported from the teacher's `graph::dsl::GraphBuilder`, which wraps a
//! `&mut Graph` and exposes one method per op. Every append here computes
//! and stores the output shape/dtype immediately (shape inference happens at
//! append time, not lazily), and every method returns a plain `NodeId` —
//! never a reference into the graph — so composer helpers built on top of
//! this builder can freely keep appending without fighting the borrow
//! checker (design note: "never holding references across appends").

use crate::errors::{VectoriaError, VectoriaResult};
use crate::graph::node::Node;
use crate::graph::shape_infer::{infer_output_dtype, infer_output_shape};
use crate::graph::Graph;
use crate::types::{DataType, IntParams, NodeId, OpType, TensorShape};

pub struct GraphBuilder<'a> {
    graph: &'a mut Graph,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(graph: &'a mut Graph) -> Self {
        Self { graph }
    }

    pub fn input(&mut self, name: impl Into<String>, shape: impl Into<TensorShape>, dtype: DataType) -> NodeId {
        self.graph.push_node(Node::Input {
            name: name.into(),
            shape: shape.into(),
            dtype,
        })
    }

    pub fn parameter(&mut self, name: impl Into<String>, shape: impl Into<TensorShape>, dtype: DataType) -> NodeId {
        self.graph.push_node(Node::Parameter {
            name: name.into(),
            shape: shape.into(),
            dtype,
        })
    }

    pub fn constant(&mut self, shape: impl Into<TensorShape>, data: Vec<f32>) -> VectoriaResult<NodeId> {
        let shape = shape.into();
        if data.len() != shape.element_count() {
            return Err(VectoriaError::shape(format!(
                "constant data has {} elements, shape implies {}",
                data.len(),
                shape.element_count()
            )));
        }
        Ok(self.graph.push_node(Node::Constant {
            shape,
            dtype: DataType::F32,
            data,
        }))
    }

    /// Convenience for the rank-0 constants composers lean on heavily
    /// (LayerNorm's `N`/`eps`, Attention's scale factor, CrossEntropy's
    /// `-1.0`) — ported from the original's `mk_const` closure.
    pub fn scalar_const(&mut self, value: f32) -> NodeId {
        self.graph.push_node(Node::Constant {
            shape: TensorShape::scalar(),
            dtype: DataType::F32,
            data: vec![value],
        })
    }

    /// Public shape lookup, used by composer subgraphs to size the
    /// primitive nodes they emit (e.g. LayerNorm reading its input's last
    /// dimension to build the `N` constant).
    pub fn shape(&self, id: NodeId) -> VectoriaResult<TensorShape> {
        self.shape_of(id)
    }

    fn shape_of(&self, id: NodeId) -> VectoriaResult<TensorShape> {
        self.graph
            .node(id)
            .map(|n| n.shape().clone())
            .ok_or_else(|| VectoriaError::structural(format!("no such node {}", id)))
    }

    fn dtype_of(&self, id: NodeId) -> VectoriaResult<DataType> {
        self.graph
            .node(id)
            .map(|n| n.dtype())
            .ok_or_else(|| VectoriaError::structural(format!("no such node {}", id)))
    }

    /// Appends an op node after checking invariants 1-2 (forward-reference
    /// only, no self-reference) and running shape/dtype inference.
    fn op(&mut self, op: OpType, inputs: Vec<NodeId>, int_params: IntParams) -> VectoriaResult<NodeId> {
        let next_index = self.graph.len();

        match op.arity() {
            crate::types::OpArity::Exact(n) if inputs.len() != n => {
                return Err(VectoriaError::structural(format!(
                    "{} expects {} input(s), got {}",
                    op.name(),
                    n,
                    inputs.len()
                )));
            }
            crate::types::OpArity::AtLeast(n) if inputs.len() < n => {
                return Err(VectoriaError::structural(format!(
                    "{} expects at least {} input(s), got {}",
                    op.name(),
                    n,
                    inputs.len()
                )));
            }
            _ => {}
        }

        for &input in &inputs {
            if input.index() >= next_index {
                return Err(VectoriaError::structural(format!(
                    "node {} references input {} which is not an earlier node (invariant 1)",
                    next_index, input
                )));
            }
        }

        let input_shapes: Vec<TensorShape> = inputs
            .iter()
            .map(|&id| self.shape_of(id))
            .collect::<VectoriaResult<_>>()?;
        let input_dtypes: Vec<DataType> = inputs
            .iter()
            .map(|&id| self.dtype_of(id))
            .collect::<VectoriaResult<_>>()?;

        let output_shape = infer_output_shape(op, &input_shapes, &int_params)?;
        let output_dtype = infer_output_dtype(op, &input_dtypes)?;

        Ok(self.graph.push_node(Node::Op {
            op,
            inputs,
            output_shape,
            output_dtype,
            int_params,
        }))
    }

    pub fn add(&mut self, a: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Add, vec![a, b], IntParams::new())
    }

    pub fn sub(&mut self, a: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Sub, vec![a, b], IntParams::new())
    }

    pub fn mul(&mut self, a: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Mul, vec![a, b], IntParams::new())
    }

    pub fn div(&mut self, a: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Div, vec![a, b], IntParams::new())
    }

    pub fn matmul(&mut self, a: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::MatMul, vec![a, b], IntParams::new())
    }

    pub fn bias_add(&mut self, input: NodeId, bias: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::BiasAdd, vec![input, bias], IntParams::new())
    }

    pub fn relu(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::ReLU, vec![x], IntParams::new())
    }

    pub fn reduce_sum(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::ReduceSum, vec![x], IntParams::new())
    }

    pub fn reduce_max(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::ReduceMax, vec![x], IntParams::new())
    }

    pub fn exp(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Exp, vec![x], IntParams::new())
    }

    pub fn sqrt(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Sqrt, vec![x], IntParams::new())
    }

    pub fn log(&mut self, x: NodeId) -> VectoriaResult<NodeId> {
        self.op(OpType::Log, vec![x], IntParams::new())
    }

    pub fn transpose(&mut self, x: NodeId, perm: &[i64]) -> VectoriaResult<NodeId> {
        self.op(OpType::Transpose, vec![x], perm.to_vec())
    }

    pub fn reshape(&mut self, x: NodeId, target_shape: &[usize]) -> VectoriaResult<NodeId> {
        let int_params: IntParams = target_shape.iter().map(|&d| d as i64).collect();
        self.op(OpType::Reshape, vec![x], int_params)
    }

    pub fn concat(&mut self, inputs: &[NodeId], axis: i64) -> VectoriaResult<NodeId> {
        self.op(OpType::Concat, inputs.to_vec(), vec![axis])
    }

    pub fn slice(&mut self, x: NodeId, axis: i64, start: i64, end: i64) -> VectoriaResult<NodeId> {
        self.op(OpType::Slice, vec![x], vec![axis, start, end])
    }

    /// Linear transformation `XW + B`, the teacher's `linear` DSL helper
    /// generalized from a training layer to a plain primitive composition.
    pub fn linear(&mut self, x: NodeId, w: NodeId, b: NodeId) -> VectoriaResult<NodeId> {
        let xw = self.matmul(x, w)?;
        self.bias_add(xw, b)
    }

    pub fn set_outputs(&mut self, outputs: Vec<NodeId>) -> VectoriaResult<()> {
        for &id in &outputs {
            if id.index() >= self.graph.len() {
                return Err(VectoriaError::structural(format!(
                    "output node {} does not exist",
                    id
                )));
            }
        }
        self.graph.set_outputs(outputs);
        Ok(())
    }
}
