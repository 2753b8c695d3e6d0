//! Spec §3: a `Graph` is plain data and round-trips through `serde_json`
//! unchanged, the same way it would cross an FFI boundary as a serialized
//! blob rather than a live object graph.

use vectoria::graph::compose;
use vectoria::graph::dsl::GraphBuilder;
use vectoria::types::DataType;
use vectoria::{Engine, Graph};

#[test]
fn graph_round_trips_through_json_and_still_executes() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input("x", vec![2, 3], DataType::F32);
    let gamma = gb.constant(vec![3], vec![1.0, 1.0, 1.0]).unwrap();
    let beta = gb.constant(vec![3], vec![0.0, 0.0, 0.0]).unwrap();
    let y = compose::layer_norm(&mut gb, x, gamma, beta).unwrap();
    gb.set_outputs(vec![y]).unwrap();

    let json = serde_json::to_string(&graph).unwrap();
    let restored: Graph = serde_json::from_str(&json).unwrap();

    assert_eq!(restored.len(), graph.len());
    assert_eq!(restored.outputs(), graph.outputs());

    let mut engine = Engine::create();
    engine.validate(restored).unwrap();
    engine.compile().unwrap();
    engine.set_buffer(x, &[1.0, 2.0, 3.0, -5.0, 0.0, 5.0]).unwrap();
    engine.execute().unwrap();

    let out = engine.get_buffer(y).unwrap();
    assert_eq!(out.len(), 6);
}
