//! CoreML-style MIL text serializer (spec §6). Ported from the original's
//! `export_to_coreml`/`dtype_to_mil`/`shape_to_mil` in
//! `lowering/coreml_lowering.cpp`, including its exact internal-naming rule:
//! an `Input` node used as an operand is printed under its declared name,
//! every other node (including a `Parameter` or `Constant` used as an
//! operand) is printed as `n{index}`.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::{VectoriaError, VectoriaResult};
use crate::graph::{Graph, Node};
use crate::types::{DataType, NodeId, OpType, TensorShape};

use super::validate_for_deployment;

pub fn dtype_to_mil(dtype: DataType) -> &'static str {
    match dtype {
        DataType::F32 => "fp32",
        DataType::F16 => "fp16",
        DataType::I32 => "int32",
        DataType::I8 => {
            debug!("lowering: narrowing I8 to fp32, MIL has no int8 tensor type in this version");
            "fp32"
        }
    }
}

pub fn shape_to_mil(shape: &TensorShape) -> String {
    let dims: Vec<String> = shape.dims().iter().map(|d| d.to_string()).collect();
    format!("({})", dims.join(", "))
}

/// Base MIL call name for `op`, used by `write_statement` to print it.
/// `Concat`/`Slice` have no entry in spec §6's mapping table and hit the
/// original's `default: throw` arm in `coreml_lowering.cpp`'s `switch`; they
/// are "structurally supported" by `validate_for_deployment` but rejected
/// here, at the narrower point where a graph actually needs to be printed.
fn mil_op_name(op: OpType) -> Option<&'static str> {
    match op {
        OpType::Add => Some("add"),
        OpType::Sub => Some("sub"),
        OpType::Mul => Some("mul"),
        OpType::Div => Some("real_div"),
        OpType::ReLU => Some("relu"),
        OpType::MatMul => Some("matmul"),
        OpType::ReduceSum => Some("reduce_sum"),
        OpType::ReduceMax => Some("reduce_max"),
        OpType::Exp => Some("exp"),
        OpType::Sqrt => Some("sqrt"),
        OpType::Log => Some("log"),
        OpType::Transpose => Some("transpose"),
        OpType::Reshape => Some("reshape"),
        OpType::BiasAdd => Some("add"),
        OpType::Concat | OpType::Slice => None,
    }
}

fn operand_name(graph: &Graph, id: NodeId) -> String {
    match graph.node(id) {
        Some(Node::Input { name, .. }) => name.clone(),
        _ => id.to_string(),
    }
}

fn write_statement(graph: &Graph, id: NodeId, op: OpType, inputs: &[NodeId], int_params: &[i64]) -> VectoriaResult<String> {
    let name = mil_op_name(op)
        .ok_or_else(|| VectoriaError::policy(format!("{} has no CoreML lowering", op.name())))?;
    let args: Vec<String> = inputs.iter().map(|&i| operand_name(graph, i)).collect();

    let call = match op {
        OpType::Add | OpType::Sub | OpType::Mul | OpType::Div | OpType::BiasAdd => {
            format!("{}(x={}, y={})", name, args[0], args[1])
        }
        OpType::ReLU | OpType::Exp | OpType::Sqrt | OpType::Log => {
            format!("{}(x={})", name, args[0])
        }
        OpType::MatMul => format!("{}(x={}, y={})", name, args[0], args[1]),
        OpType::ReduceSum | OpType::ReduceMax => {
            format!("{}(x={}, axes=[-1], keep_dims=false)", name, args[0])
        }
        OpType::Transpose => {
            let perm: Vec<String> = int_params.iter().map(|p| p.to_string()).collect();
            format!("{}(x={}, perm=[{}])", name, args[0], perm.join(", "))
        }
        OpType::Reshape => {
            let shape = graph
                .node(id)
                .expect("node just looked up by its own id")
                .shape();
            let dims: Vec<String> = shape.dims().iter().map(|d| d.to_string()).collect();
            format!("{}(x={}, shape=[{}])", name, args[0], dims.join(", "))
        }
        OpType::Concat | OpType::Slice => {
            return Err(VectoriaError::policy(format!(
                "{} has no CoreML lowering in this version",
                op.name()
            )))
        }
    };

    Ok(format!("  {} = {};", id, call))
}

/// Serializes `graph` to `<path>/Data/com.apple.CoreML/model.mil`, creating
/// the directory layout as needed. Validates first so a rejected graph
/// never leaves a partial file on disk.
pub fn lower_to_package(graph: &Graph, path: impl AsRef<Path>) -> VectoriaResult<()> {
    validate_for_deployment(graph)?;

    let mil_dir = path.as_ref().join("Data").join("com.apple.CoreML");
    fs::create_dir_all(&mil_dir)?;

    let mut body = String::new();
    body.push_str("graph main(\n");

    let mut inputs_written = 0usize;
    for node in graph.nodes() {
        if let Node::Input { name, shape, dtype } = node {
            if inputs_written > 0 {
                body.push_str(",\n");
            }
            body.push_str(&format!("    {}: tensor<{}, {}>", name, dtype_to_mil(*dtype), shape_to_mil(shape)));
            inputs_written += 1;
        }
    }
    body.push_str(") {\n");

    for (i, node) in graph.nodes().iter().enumerate() {
        if let Node::Op { op, inputs, int_params, .. } = node {
            let statement = write_statement(graph, NodeId::from(i), *op, inputs, int_params)?;
            body.push_str(&statement);
            body.push('\n');
        }
    }

    if !graph.outputs().is_empty() {
        let refs: Vec<String> = graph.outputs().iter().map(|&id| id.to_string()).collect();
        body.push_str(&format!("  return({});\n", refs.join(", ")));
    }
    body.push_str("}\n");

    fs::write(mil_dir.join("model.mil"), body)?;
    Ok(())
}
