//! Higher-level primitives expressed purely as rewrites into primitive ops
//! (spec §4.2). Every function here only calls `GraphBuilder` methods — no
//! composer introduces a new runtime kernel, and none mutates an
//! already-appended node. Ported node-for-node from the original's
//! `core/src/graph/{softmax,logsoftmax,stable_softmax,crossentropy,
//! layernorm,attention,multi_head_attention,transformer_encoder}.cpp`.

use crate::errors::{VectoriaError, VectoriaResult};
use crate::graph::dsl::GraphBuilder;
use crate::types::NodeId;

/// `max <- ReduceMax(x); s <- Sub(x, max); e <- Exp(s); sum <- ReduceSum(e);
/// y <- Div(e, sum)`. Sub/Div broadcast the reduced `[outer]` shape against
/// the original `[outer, inner]` shape (column-vector broadcast, §4.4).
pub fn softmax(gb: &mut GraphBuilder<'_>, x: NodeId) -> VectoriaResult<NodeId> {
    let max = gb.reduce_max(x)?;
    let s = gb.sub(x, max)?;
    let e = gb.exp(s)?;
    let sum = gb.reduce_sum(e)?;
    gb.div(e, sum)
}

/// `max <- ReduceMax(x); s <- Sub(x, max); e <- Exp(s); sum <- ReduceSum(e);
/// lg <- Log(sum); y <- Sub(s, lg)`.
pub fn log_softmax(gb: &mut GraphBuilder<'_>, x: NodeId) -> VectoriaResult<NodeId> {
    let max = gb.reduce_max(x)?;
    let s = gb.sub(x, max)?;
    let e = gb.exp(s)?;
    let sum = gb.reduce_sum(e)?;
    let lg = gb.log(sum)?;
    gb.sub(s, lg)
}

/// `Exp(LogSoftmax(x))`.
pub fn stable_softmax(gb: &mut GraphBuilder<'_>, x: NodeId) -> VectoriaResult<NodeId> {
    let ls = log_softmax(gb, x)?;
    gb.exp(ls)
}

/// `-ReduceSum(target * LogSoftmax(logits))`, with the negation realized as
/// a scalar-broadcast `Mul` by a `-1.0` constant rather than a dedicated
/// negate op, matching the original exactly.
pub fn cross_entropy(gb: &mut GraphBuilder<'_>, logits: NodeId, target: NodeId) -> VectoriaResult<NodeId> {
    let log_probs = log_softmax(gb, logits)?;
    let weighted = gb.mul(target, log_probs)?;
    let sum = gb.reduce_sum(weighted)?;
    let neg_one = gb.scalar_const(-1.0);
    gb.mul(sum, neg_one)
}

/// Along the last axis, epsilon = 1e-5. `mu <- ReduceSum(x)/N; d <- x-mu;
/// v <- ReduceSum(d^2)/N; s <- sqrt(v+eps); n <- d/s; y <- BiasAdd(n*gamma,
/// beta)`, with `gamma` row-broadcast via `Mul` and `beta` via `BiasAdd`.
/// `N` and `eps` are materialized as rank-0 `Constant` nodes, as the
/// original does, rather than threaded through as op parameters.
pub fn layer_norm(gb: &mut GraphBuilder<'_>, x: NodeId, gamma: NodeId, beta: NodeId) -> VectoriaResult<NodeId> {
    let in_shape = gb.shape(x)?;
    if in_shape.rank() == 0 {
        return Err(VectoriaError::shape("LayerNorm input cannot be rank 0"));
    }
    let last_dim = *in_shape.dims().last().unwrap();
    if last_dim == 0 {
        return Err(VectoriaError::shape("LayerNorm last dimension must be non-zero"));
    }

    let n_const = gb.scalar_const(last_dim as f32);
    let eps_const = gb.scalar_const(1e-5);

    let sum = gb.reduce_sum(x)?;
    let mean = gb.div(sum, n_const)?;
    let diff = gb.sub(x, mean)?;
    let sq_diff = gb.mul(diff, diff)?;
    let var_sum = gb.reduce_sum(sq_diff)?;
    let var = gb.div(var_sum, n_const)?;
    let var_eps = gb.add(var, eps_const)?;
    let std = gb.sqrt(var_eps)?;
    let norm = gb.div(diff, std)?;

    let scaled = gb.mul(norm, gamma)?;
    gb.bias_add(scaled, beta)
}

/// 2-D only: `KT <- Transpose(K,[1,0]); S <- MatMul(Q,KT); Ss <- Mul(S,
/// 1/sqrt(dk)); P <- StableSoftmax(Ss); O <- MatMul(P,V)`.
pub fn attention(gb: &mut GraphBuilder<'_>, q: NodeId, k: NodeId, v: NodeId) -> VectoriaResult<NodeId> {
    let q_shape = gb.shape(q)?;
    let k_shape = gb.shape(k)?;
    let v_shape = gb.shape(v)?;

    if q_shape.rank() != 2 || k_shape.rank() != 2 || v_shape.rank() != 2 {
        return Err(VectoriaError::shape(
            "Attention currently supports only 2D tensors [T, d]",
        ));
    }
    let d_k = q_shape.dims()[1];
    if k_shape.dims()[1] != d_k {
        return Err(VectoriaError::shape("Attention: Q and K feature dimension mismatch"));
    }
    if k_shape.dims()[0] != v_shape.dims()[0] {
        return Err(VectoriaError::shape("Attention: K and V sequence length mismatch"));
    }

    let k_t = gb.transpose(k, &[1, 0])?;
    let scores = gb.matmul(q, k_t)?;
    let scale = gb.scalar_const(1.0 / (d_k as f32).sqrt());
    let scaled = gb.mul(scores, scale)?;
    let probs = stable_softmax(gb, scaled)?;
    gb.matmul(probs, v)
}

/// Linear projections, reshape `[T, d_model] -> [T, h, dk]`, transpose to
/// `[h, T, dk]`, per-head `attention` over axis-0 slices (each reshaped back
/// to 2D before and after, since `attention` is 2D-only), concat along the
/// head-feature axis, final output projection.
#[allow(clippy::too_many_arguments)]
pub fn multi_head_attention(
    gb: &mut GraphBuilder<'_>,
    x: NodeId,
    w_q: NodeId,
    w_k: NodeId,
    w_v: NodeId,
    w_o: NodeId,
    num_heads: usize,
) -> VectoriaResult<NodeId> {
    let x_shape = gb.shape(x)?;
    if x_shape.rank() != 2 {
        return Err(VectoriaError::shape("MultiHeadAttention input must be 2D [T, d_model]"));
    }
    let seq_len = x_shape.dims()[0];
    let d_model = x_shape.dims()[1];
    if num_heads == 0 || d_model % num_heads != 0 {
        return Err(VectoriaError::shape(format!(
            "d_model {} is not divisible by num_heads {}",
            d_model, num_heads
        )));
    }
    let d_k = d_model / num_heads;

    let q_all = gb.matmul(x, w_q)?;
    let k_all = gb.matmul(x, w_k)?;
    let v_all = gb.matmul(x, w_v)?;

    let split_shape = [seq_len, num_heads, d_k];
    let q_split = gb.reshape(q_all, &split_shape)?;
    let k_split = gb.reshape(k_all, &split_shape)?;
    let v_split = gb.reshape(v_all, &split_shape)?;

    let q_trans = gb.transpose(q_split, &[1, 0, 2])?;
    let k_trans = gb.transpose(k_split, &[1, 0, 2])?;
    let v_trans = gb.transpose(v_split, &[1, 0, 2])?;

    let mut head_outputs = Vec::with_capacity(num_heads);
    for h in 0..num_heads {
        let h = h as i64;
        let q_h = gb.slice(q_trans, 0, h, h + 1)?;
        let k_h = gb.slice(k_trans, 0, h, h + 1)?;
        let v_h = gb.slice(v_trans, 0, h, h + 1)?;

        let head_shape = [seq_len, d_k];
        let q_h_2d = gb.reshape(q_h, &head_shape)?;
        let k_h_2d = gb.reshape(k_h, &head_shape)?;
        let v_h_2d = gb.reshape(v_h, &head_shape)?;

        head_outputs.push(attention(gb, q_h_2d, k_h_2d, v_h_2d)?);
    }

    let concat_heads = gb.concat(&head_outputs, 1)?;
    gb.matmul(concat_heads, w_o)
}

/// `x -> MHA -> Add(residual) -> LayerNorm1 -> (MatMul;BiasAdd;ReLU;MatMul;
/// BiasAdd) -> Add(residual) -> LayerNorm2`.
#[allow(clippy::too_many_arguments)]
pub fn transformer_encoder(
    gb: &mut GraphBuilder<'_>,
    x: NodeId,
    w_q: NodeId,
    w_k: NodeId,
    w_v: NodeId,
    w_o: NodeId,
    num_heads: usize,
    gamma1: NodeId,
    beta1: NodeId,
    w1: NodeId,
    b1: NodeId,
    w2: NodeId,
    b2: NodeId,
    gamma2: NodeId,
    beta2: NodeId,
) -> VectoriaResult<NodeId> {
    let x_shape = gb.shape(x)?;
    if x_shape.rank() != 2 {
        return Err(VectoriaError::shape("TransformerEncoder input must be 2D [T, d_model]"));
    }

    let mha_out = multi_head_attention(gb, x, w_q, w_k, w_v, w_o, num_heads)?;
    let add1 = gb.add(x, mha_out)?;
    let ln1 = layer_norm(gb, add1, gamma1, beta1)?;

    let w1_shape = gb.shape(w1)?;
    if w1_shape.rank() != 2 {
        return Err(VectoriaError::shape("TransformerEncoder FFN W1 must be 2D"));
    }

    let ffn1_mm = gb.matmul(ln1, w1)?;
    let ffn1_bias = gb.bias_add(ffn1_mm, b1)?;
    let ffn1_relu = gb.relu(ffn1_bias)?;

    let ffn2_mm = gb.matmul(ffn1_relu, w2)?;
    let ffn2_bias = gb.bias_add(ffn2_mm, b2)?;

    let add2 = gb.add(ln1, ffn2_bias)?;
    layer_norm(gb, add2, gamma2, beta2)
}
