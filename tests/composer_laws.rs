//! Spec §8 "Laws": algebraic properties of the composer subgraphs, checked
//! end-to-end through `Engine` rather than by inspecting the expanded IR.

use vectoria::graph::compose;
use vectoria::graph::dsl::GraphBuilder;
use vectoria::types::DataType;
use vectoria::{Engine, Graph};

#[test]
fn softmax_rows_sum_to_one() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 4], DataType::F32);
    let y = compose::softmax(&mut gb, x).unwrap();
    gb.set_outputs(vec![y]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[0.1, 0.2, 0.3, 0.4, -1.0, 5.0, 2.0, 0.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(y).unwrap();
    for row in out.chunks(4) {
        let sum: f32 = row.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "row {:?} sums to {}", row, sum);
    }
}

#[test]
fn exp_log_softmax_matches_stable_softmax() {
    let data = [0.0_f32, 0.0, 0.0, 1000.0, 1000.0, 1000.0];

    let mut logsoft_graph = Graph::new();
    let (logsoft_x, logsoft_y) = {
        let mut gb = GraphBuilder::new(&mut logsoft_graph);
        let x = gb.input("x", vec![2, 3], DataType::F32);
        let ls = compose::log_softmax(&mut gb, x).unwrap();
        let y = gb.exp(ls).unwrap();
        gb.set_outputs(vec![y]).unwrap();
        (x, y)
    };
    let mut engine_a = Engine::create();
    engine_a.validate(logsoft_graph).unwrap();
    engine_a.compile().unwrap();
    engine_a.set_buffer(logsoft_x, &data).unwrap();
    engine_a.execute().unwrap();
    let via_logsoftmax = engine_a.get_buffer(logsoft_y).unwrap().to_vec();

    let mut stable_graph = Graph::new();
    let (stable_x, stable_y) = {
        let mut gb = GraphBuilder::new(&mut stable_graph);
        let x = gb.input("x", vec![2, 3], DataType::F32);
        let y = compose::stable_softmax(&mut gb, x).unwrap();
        gb.set_outputs(vec![y]).unwrap();
        (x, y)
    };
    let mut engine_b = Engine::create();
    engine_b.validate(stable_graph).unwrap();
    engine_b.compile().unwrap();
    engine_b.set_buffer(stable_x, &data).unwrap();
    engine_b.execute().unwrap();
    let via_stable_softmax = engine_b.get_buffer(stable_y).unwrap();

    for (a, b) in via_logsoftmax.iter().zip(via_stable_softmax.iter()) {
        assert!((a - b).abs() < 1e-5, "{} vs {}", a, b);
    }
}

#[test]
fn layer_norm_output_has_zero_mean_and_unit_variance() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 4], DataType::F32);
    let gamma = gb.constant(vec![4], vec![1.0; 4]).unwrap();
    let beta = gb.constant(vec![4], vec![0.0; 4]).unwrap();
    let y = compose::layer_norm(&mut gb, x, gamma, beta).unwrap();
    gb.set_outputs(vec![y]).unwrap();

    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[1.0, 2.0, 3.0, 4.0, -5.0, 0.0, 5.0, 10.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(y).unwrap();
    for row in out.chunks(4) {
        let mean: f32 = row.iter().sum::<f32>() / 4.0;
        let var: f32 = row.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / 4.0;
        assert!(mean.abs() < 1e-3, "mean {} too far from 0", mean);
        assert!((var - 1.0).abs() < 1e-3, "variance {} too far from 1", var);
    }
}

#[test]
fn transpose_of_transpose_by_inverse_permutation_is_bitwise_identity() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 3], DataType::F32);
    let t = gb.transpose(x, &[1, 0]).unwrap();
    let back = gb.transpose(t, &[1, 0]).unwrap();
    gb.set_outputs(vec![back]).unwrap();

    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &data).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(back).unwrap(), &data);
}

#[test]
fn reshape_preserves_elements_under_linear_index() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 3], DataType::F32);
    let y = gb.reshape(x, &[6]).unwrap();
    gb.set_outputs(vec![y]).unwrap();

    let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let mut engine = Engine::create();
    engine.validate(graph).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &data).unwrap();
    engine.execute().unwrap();

    assert_eq!(engine.get_buffer(y).unwrap(), &data);
}
