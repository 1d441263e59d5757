//! Computation-graph substrate with a low-overhead per-thread range profiler.
//!
//! The graph is a DAG of [`Node`]s. Each node wraps one operation (a
//! [`Function`]) and owns its outgoing [`Edge`]s, which point at the input
//! slots of the nodes that consume its results during a backward traversal.
//! Nodes carry a sequence number drawn at creation; within one creating thread
//! it orders nodes by creation, and the traversal prioritizes higher numbers.
//!
//! This crate only defines the graph shape, connectivity and instrumentation:
//! it neither computes gradients nor schedules the traversal.
//!
//! The [`profiler`] records named time ranges. Every thread appends to its own
//! event list without synchronizing with other threads; `disable` seals and
//! consolidates all lists into one report.
//!
//! Key modules:
//! - `config`: binds the value and error types via the `Config` trait.
//! - `variable`: the interface the graph consumes from the tensor type.
//! - `function`: the `Function` trait, the `Node` type, hooks and anomaly
//!   metadata.
//! - `edge`: edges and helpers to collect them from values.
//! - `profiler`: the profiler state machine, event lists and scoped ranges.
//!
//! Quick start:
//! 1. Implement `Variable` for your value type and bind it in a `Config`.
//! 2. Implement `Function` for each operation kind.
//! 3. While recording an operation, build its node with
//!    `Node::new(op, collect_next_edges(&inputs))` and attach the outputs with
//!    `create_gradient_edge`.

/// Public interface to configure the graph.
///
/// Exposes the `Config` trait which binds the value type flowing along edges
/// and the error type of failing operations.
pub mod config;
/// Edges between nodes and helpers building them from values.
pub mod edge;
/// Graph vertices and the per-operation `Function` interface.
///
/// Contains the connectivity API, hook storage, anomaly metadata and the
/// iterative teardown that keeps dropping long chains off the call stack.
pub mod function;
/// Process-wide gradient recording switch.
pub mod grad_mode;
/// Per-input descriptors.
pub mod input_metadata;
/// Range profiler with per-thread, lock-free event lists.
pub mod profiler;
/// Node sequence numbers.
pub mod sequence;
mod sync;
/// Core type aliases shared across the crate.
pub mod types;
/// The tensor-like value interface consumed by the graph.
pub mod variable;

pub use crate::{
    config::Config,
    edge::{
        Edge, EdgeCollector, any_variable_requires_grad, collect_next_edges,
        create_gradient_edge,
    },
    function::{AnomalyMetadata, Function, GraphError, Node, PostHook, PreHook, Traceable},
    grad_mode::{GradMode, NoGradGuard},
    input_metadata::InputMetadata,
    profiler::{Profiler, ProfilerError, ProfilerState, RecordFunction},
    sequence::{SequenceNrAllocator, next_sequence_nr},
    variable::{DType, Device, TensorMeta, Variable},
};
