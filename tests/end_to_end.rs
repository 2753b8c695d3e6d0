//! Spec §8 "Concrete end-to-end scenarios", one test per numbered scenario.

use vectoria::graph::compose;
use vectoria::graph::dsl::GraphBuilder;
use vectoria::types::DataType;
use vectoria::{Engine, Graph};

#[test]
fn scenario_1_two_by_two_gemm() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.input("A", vec![2, 2], DataType::F32);
    let b = gb.input("B", vec![2, 2], DataType::F32);
    let c = gb.matmul(a, b).unwrap();
    gb.set_outputs(vec![c]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(a, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    engine.set_buffer(b, &[0.5, 1.0, 1.5, 2.0]).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(c).unwrap(), &[3.5, 5.0, 7.5, 11.0]);
}

#[test]
fn scenario_2_gemm_bias_add_relu() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("X", vec![1, 4], DataType::F32);
    let w = gb.input("W", vec![4, 4], DataType::F32);
    let bias = gb.input("Bias", vec![4], DataType::F32);
    let xw = gb.matmul(x, w).unwrap();
    let biased = gb.bias_add(xw, bias).unwrap();
    let out = gb.relu(biased).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let identity = [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0];

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[1.0, 1.0, 1.0, 1.0]).unwrap();
    engine.set_buffer(w, &identity).unwrap();
    engine.set_buffer(bias, &[-2.0, -0.5, 0.0, 2.0]).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(out).unwrap(), &[0.0, 0.5, 1.0, 3.0]);
}

#[test]
fn scenario_3_softmax_stability_on_extreme_logits() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 3], DataType::F32);
    let y = compose::stable_softmax(&mut gb, x).unwrap();
    gb.set_outputs(vec![y]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[0.0, 0.0, 0.0, 1000.0, 1000.0, 1000.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(y).unwrap();
    for v in out {
        assert!((v - 1.0 / 3.0).abs() < 1e-4, "{}", v);
    }
}

#[test]
fn scenario_4_cross_entropy() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let logits = gb.input("logits", vec![2, 3], DataType::F32);
    let target = gb.input("target", vec![2, 3], DataType::F32);
    let loss = compose::cross_entropy(&mut gb, logits, target).unwrap();
    gb.set_outputs(vec![loss]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(logits, &[100.0, 0.0, 0.0, 0.0, 0.0, 0.0]).unwrap();
    engine.set_buffer(target, &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(loss).unwrap();
    assert!((out[0] - 0.0).abs() < 1e-3, "{}", out[0]);
    assert!((out[1] - 3.0_f32.ln()).abs() < 1e-3, "{}", out[1]);
}

#[test]
fn scenario_5_concat_axis_0() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.input("a", vec![2, 2], DataType::F32);
    let b = gb.input("b", vec![3, 2], DataType::F32);
    let out = gb.concat(&[a, b], 0).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(a, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    engine.set_buffer(b, &[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]).unwrap();
    engine.execute().unwrap();

    assert_eq!(
        engine.get_buffer(out).unwrap(),
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]
    );
}

#[test]
fn scenario_6_concat_axis_1() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.input("a", vec![2, 2], DataType::F32);
    let b = gb.input("b", vec![2, 1], DataType::F32);
    let out = gb.concat(&[a, b], 1).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(a, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    engine.set_buffer(b, &[5.0, 6.0]).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(out).unwrap(), &[1.0, 2.0, 5.0, 3.0, 4.0, 6.0]);
}

#[test]
fn scenario_7_structural_transpose_then_reshape() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 3], DataType::F32);
    let t = gb.transpose(x, &[1, 0]).unwrap();
    let out = gb.reshape(t, &[6]).unwrap();
    gb.set_outputs(vec![out]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(out).unwrap(), &[1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
}

#[test]
fn scenario_8_fifty_executions_are_bitwise_deterministic() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.input("A", vec![2, 2], DataType::F32);
    let b = gb.input("B", vec![2, 2], DataType::F32);
    let c = gb.matmul(a, b).unwrap();
    gb.set_outputs(vec![c]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(a, &[1.0, 2.0, 3.0, 4.0]).unwrap();
    engine.set_buffer(b, &[0.5, 1.0, 1.5, 2.0]).unwrap();

    let mut reference_output = None;
    let mut reference_event_count = None;
    for _ in 0..50 {
        engine.execute().unwrap();
        let out = engine.get_buffer(c).unwrap().to_vec();
        let event_count = engine.trace().events().len();
        match (&reference_output, reference_event_count) {
            (None, _) => {
                reference_output = Some(out);
                reference_event_count = Some(event_count);
            }
            (Some(prev_out), Some(prev_count)) => {
                assert_eq!(prev_out, &out);
                assert_eq!(prev_count, event_count);
            }
            _ => unreachable!(),
        }
    }
}
