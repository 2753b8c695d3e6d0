//! Declarative macros for graph construction, adapted from the teacher's
//! `model!`/`linear!` sugar around its training DSL to the new
//! `graph::dsl::GraphBuilder`.

/// Opens a `GraphBuilder` scope over `$graph` and runs `$body` with it bound
/// to `$builder`, mirroring the teacher's `model!` macro shape.
#[macro_export]
macro_rules! model {
    ($graph:expr, $builder:ident => { $($body:tt)* }) => {{
        let mut $builder = $crate::graph::dsl::GraphBuilder::new($graph);
        $($body)*
    }};
}

/// Shorthand for `GraphBuilder::linear`, kept for parity with the teacher's
/// `linear!` helper.
#[macro_export]
macro_rules! linear {
    ($builder:ident, $x:expr, $w:expr, $b:expr) => {
        $builder.linear($x, $w, $b)
    };
}
