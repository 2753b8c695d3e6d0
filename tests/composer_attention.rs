//! Spec §8 invariant 5 ("the composed subgraph uses only primitive op
//! kinds") for the three composers built on top of `softmax`/`layer_norm`:
//! `attention`, `multi_head_attention`, `transformer_encoder`. Every one of
//! these composers only ever calls `GraphBuilder` methods, so a graph built
//! from them executing to completion is itself the proof — there is no
//! "composite" `OpType` for the dispatcher to special-case. Ported in
//! spirit from the original's `test_attention.cpp`,
//! `test_multi_head_attention.cpp`, `test_transformer_encoder.cpp`.

use vectoria::graph::compose;
use vectoria::graph::dsl::GraphBuilder;
use vectoria::types::DataType;
use vectoria::{Engine, Graph};

#[test]
fn attention_matches_a_hand_computed_two_by_two_result() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let q = gb.input("Q", vec![2, 4], DataType::F32);
    let k = gb.input("K", vec![2, 4], DataType::F32);
    let v = gb.input("V", vec![2, 2], DataType::F32);
    let out = compose::attention(&mut gb, q, k, v).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();

    // Q and K are one-hot rows, so scores = Q.K^T = identity; scaling by
    // 1/sqrt(d_k=4) = 0.5 and softmax-ing each row gives a fixed mixture of
    // the two V rows.
    engine.set_buffer(q, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
    engine.set_buffer(k, &[1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
    engine.set_buffer(v, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(out).unwrap();
    assert_eq!(out.len(), 4);

    let p00 = 1.0 / (1.0 + (-0.5_f32).exp());
    let p01 = 1.0 - p00;
    let expected = [
        p00 * 1.0 + p01 * 3.0,
        p00 * 2.0 + p01 * 4.0,
        p01 * 1.0 + p00 * 3.0,
        p01 * 2.0 + p00 * 4.0,
    ];
    for (actual, expected) in out.iter().zip(expected.iter()) {
        assert!((actual - expected).abs() < 1e-4, "{} vs {}", actual, expected);
    }
}

#[test]
fn multi_head_attention_produces_a_finite_t_by_d_model_output() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("X", vec![2, 4], DataType::F32);
    let w_q = gb.parameter("WQ", vec![4, 4], DataType::F32);
    let w_k = gb.parameter("WK", vec![4, 4], DataType::F32);
    let w_v = gb.parameter("WV", vec![4, 4], DataType::F32);
    let w_o = gb.parameter("WO", vec![4, 4], DataType::F32);
    let out = compose::multi_head_attention(&mut gb, x, w_q, w_k, w_v, w_o, 2).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();

    engine.set_buffer(x, &[0.1, 0.2, 0.3, 0.4, -0.1, 0.0, 0.2, 0.5]).unwrap();
    let identity4 = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    engine.set_buffer(w_q, &identity4).unwrap();
    engine.set_buffer(w_k, &identity4).unwrap();
    engine.set_buffer(w_v, &identity4).unwrap();
    engine.set_buffer(w_o, &identity4).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(out).unwrap();
    assert_eq!(out.len(), 8);
    assert!(out.iter().all(|v| v.is_finite()));
}

#[test]
fn transformer_encoder_produces_a_finite_t_by_d_model_output() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("X", vec![2, 4], DataType::F32);
    let w_q = gb.parameter("WQ", vec![4, 4], DataType::F32);
    let w_k = gb.parameter("WK", vec![4, 4], DataType::F32);
    let w_v = gb.parameter("WV", vec![4, 4], DataType::F32);
    let w_o = gb.parameter("WO", vec![4, 4], DataType::F32);
    let gamma1 = gb.constant(vec![4], vec![1.0; 4]).unwrap();
    let beta1 = gb.constant(vec![4], vec![0.0; 4]).unwrap();
    let w1 = gb.parameter("WF1", vec![4, 8], DataType::F32);
    let b1 = gb.parameter("BF1", vec![8], DataType::F32);
    let w2 = gb.parameter("WF2", vec![8, 4], DataType::F32);
    let b2 = gb.parameter("BF2", vec![4], DataType::F32);
    let gamma2 = gb.constant(vec![4], vec![1.0; 4]).unwrap();
    let beta2 = gb.constant(vec![4], vec![0.0; 4]).unwrap();

    let out = compose::transformer_encoder(
        &mut gb, x, w_q, w_k, w_v, w_o, 2, gamma1, beta1, w1, b1, w2, b2, gamma2, beta2,
    )
    .unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();

    engine.set_buffer(x, &[0.1, 0.2, 0.3, 0.4, -0.1, 0.0, 0.2, 0.5]).unwrap();
    let identity4 = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];
    engine.set_buffer(w_q, &identity4).unwrap();
    engine.set_buffer(w_k, &identity4).unwrap();
    engine.set_buffer(w_v, &identity4).unwrap();
    engine.set_buffer(w_o, &identity4).unwrap();
    engine.set_buffer(b1, &[0.0; 8]).unwrap();
    engine.set_buffer(b2, &[0.0; 4]).unwrap();
    // [4,8] and [8,4] FFN weights; only their shape and finiteness matter
    // here, the exact values don't.
    engine.set_buffer(w1, &[0.05; 32]).unwrap();
    engine.set_buffer(w2, &[0.05; 32]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(out).unwrap();
    assert_eq!(out.len(), 8);
    assert!(out.iter().all(|v| v.is_finite()));
}
